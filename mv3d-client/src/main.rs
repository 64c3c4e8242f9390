use glam::{Mat4, Vec2};
use glow::HasContext;

use crate::{abs::*, config::ViewerConfig, render::model::GpuModel};

mod abs;
mod config;
mod input;
mod logging;
mod render;

#[macro_export]
macro_rules! shader_program {
    ($name:ident, $gl:expr) => {
        $crate::abs::ShaderProgram::from_sources(
            &$gl,
            include_str!(concat!("render/shaders/", stringify!($name), "/vert.glsl")),
            include_str!(concat!("render/shaders/", stringify!($name), "/frag.glsl")),
        )
    };
}

fn main() {
    let config = match ViewerConfig::from_env(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = logging::init(config.log_level()) {
        eprintln!("Failed to set up logging: {e}");
    }

    if let Err(e) = run(&config) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &ViewerConfig) -> Result<(), String> {
    let mut app = App::new(&config.window)?;

    unsafe {
        app.gl.enable(glow::DEPTH_TEST);
        app.gl.enable(glow::BLEND);
        app.gl
            .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        if config.model.srgb_textures {
            app.gl.enable(glow::FRAMEBUFFER_SRGB);
        }
        let [r, g, b, a] = config.clear_color;
        app.gl.clear_color(r, g, b, a);
    }

    let shader_program = shader_program!(model, app.gl)?;

    log::info!("Loading model {}", config.model.path.display());
    let model = GpuModel::load(
        &app.gl,
        &config.model.path,
        &config.import,
        config.model.srgb_textures,
    )?;

    let model_matrix = Mat4::from_scale(glam::Vec3::splat(config.model.scale));
    let mut camera = config.camera.to_camera();
    if config.model.frame_on_load {
        let scaled = model.bounds().and_then(|bounds| {
            mv3d_core::Aabb::from_points([
                model_matrix.transform_point3(bounds.min),
                model_matrix.transform_point3(bounds.max),
            ])
        });
        if let Some(bounds) = scaled {
            camera.frame(&bounds);
        }
    }

    let (width, height) = app.drawable_size();
    let mut aspect_ratio = width as f32 / height.max(1) as f32;
    unsafe {
        app.gl.viewport(0, 0, width as i32, height as i32);
    }

    let mut keyboard_state = input::KeyboardState::default();
    let mut mouse_state = input::MouseState::default();

    let mut last_frame_time = std::time::Instant::now();

    'running: loop {
        let now = std::time::Instant::now();
        let delta_time = now.duration_since(last_frame_time).as_secs_f32();
        last_frame_time = now;

        mouse_state.delta = Vec2::ZERO;

        for event in app.event_pump.poll_iter() {
            match event {
                sdl2::event::Event::Quit { .. } => break 'running,
                sdl2::event::Event::Window {
                    win_event: sdl2::event::WindowEvent::SizeChanged(..),
                    ..
                } => {
                    let (width, height) = app.window.drawable_size();
                    unsafe {
                        app.gl.viewport(0, 0, width as i32, height as i32);
                    }
                    aspect_ratio = width as f32 / height.max(1) as f32;
                }
                sdl2::event::Event::KeyDown {
                    keycode: Some(sdl2::keyboard::Keycode::Escape),
                    repeat: false,
                    ..
                } => {
                    mouse_state.grabbed = !mouse_state.grabbed;
                    app.sdl.mouse().set_relative_mouse_mode(mouse_state.grabbed);
                }
                sdl2::event::Event::KeyDown {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => {
                    keyboard_state.down.insert(keycode);
                }
                sdl2::event::Event::KeyUp {
                    keycode: Some(keycode),
                    ..
                } => {
                    keyboard_state.down.remove(&keycode);
                }
                sdl2::event::Event::MouseMotion { xrel, yrel, .. } => {
                    mouse_state.delta += Vec2::new(xrel as f32, yrel as f32);
                }
                _ => {}
            }
        }

        input::update_camera(&mut camera, &keyboard_state, &mouse_state, delta_time);

        unsafe {
            app.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        shader_program.use_program();
        shader_program.set_uniform("u_projection", camera.projection_matrix(aspect_ratio));
        shader_program.set_uniform("u_view", camera.view_matrix());
        shader_program.set_uniform("u_model", model_matrix);
        shader_program.set_uniform("u_view_pos", camera.position);
        model.draw(&shader_program);
        shader_program.unbind();

        app.window.gl_swap_window();
    }

    app.sdl.mouse().set_relative_mouse_mode(false);
    Ok(())
}
