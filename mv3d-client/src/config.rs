//! Viewer configuration.
//!
//! The configuration is a JSON file. Its location is taken from the
//! `MV3D_CONFIG` environment variable, falling back to
//! `<config dir>/modelview3d/config.json`. A missing file means defaults;
//! every field may be omitted.

use std::path::{Path, PathBuf};

use mv3d_core::ImportOptions;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "MV3D_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub model: ModelConfig,
    pub import: ImportOptions,
    pub camera: CameraConfig,
    pub clear_color: [f32; 4],
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            model: ModelConfig::default(),
            import: ImportOptions::default(),
            camera: CameraConfig::default(),
            clear_color: [1.0, 1.0, 1.0, 1.0],
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Width and height are ignored when this is set.
    pub fullscreen: bool,
    pub vsync: bool,
    /// OpenGL core profile version as `[major, minor]`.
    pub gl_version: [u8; 2],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "ModelView3D".to_string(),
            width: 1024,
            height: 768,
            fullscreen: false,
            vsync: true,
            gl_version: [3, 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Uniform scale applied through the model matrix.
    pub scale: f32,
    /// Upload diffuse textures as sRGB.
    pub srgb_textures: bool,
    /// Place the camera so the whole model is visible on startup.
    pub frame_on_load: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("objects/nanosuit/nanosuit.obj"),
            scale: 1.0,
            srgb_textures: false,
            frame_on_load: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            move_speed: 2.5,
            mouse_sensitivity: 0.1,
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self) -> mv3d_core::camera::Camera {
        mv3d_core::camera::Camera {
            fov_y_degrees: self.fov_degrees,
            near: self.near,
            far: self.far,
            move_speed: self.move_speed,
            mouse_sensitivity: self.mouse_sensitivity,
            ..Default::default()
        }
    }
}

impl ViewerConfig {
    /// Default location of the configuration file, if the platform has a
    /// configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modelview3d").join("config.json"))
    }

    /// Resolves the configuration path from the environment or the platform
    /// default.
    pub fn resolve_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(Self::default_path)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| e.to_string())
    }

    /// Reads the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_json(&s).map_err(|e| format!("{}: {}", path.display(), e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("{}: {}", path.display(), e)),
        }
    }

    /// Loads the configuration and applies command-line overrides. The first
    /// argument, if any, replaces the model path.
    pub fn from_env<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut config = match Self::resolve_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    fn apply_args<I: IntoIterator<Item = String>>(&mut self, args: I) {
        if let Some(model) = args.into_iter().nth(1) {
            self.model.path = PathBuf::from(model);
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(ViewerConfig::from_json("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ViewerConfig::from_json(
            r#"{
                "window": { "width": 800, "fullscreen": true },
                "model": { "path": "assets/duck.glb", "scale": 0.2 },
                "import": { "flip_uvs": false },
                "clear_color": [0.1, 0.1, 0.2, 1.0],
                "log_level": "debug"
            }"#,
        )
        .unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 768);
        assert!(config.window.fullscreen);
        assert_eq!(config.model.path, PathBuf::from("assets/duck.glb"));
        assert_eq!(config.model.scale, 0.2);
        assert!(config.model.frame_on_load);
        assert!(!config.import.flip_uvs);
        assert!(config.import.triangulate);
        assert_eq!(config.clear_color, [0.1, 0.1, 0.2, 1.0]);
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(ViewerConfig::from_json(r#"{ "window": 3 }"#).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ViewerConfig::load(Path::new("no/such/config.json")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_first_argument_overrides_model_path() {
        let mut config = ViewerConfig::default();
        config.apply_args(["modelview3d".to_string(), "cube.obj".to_string()]);
        assert_eq!(config.model.path, PathBuf::from("cube.obj"));

        config.apply_args(["modelview3d".to_string()]);
        assert_eq!(config.model.path, PathBuf::from("cube.obj"));
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let config = ViewerConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_camera_config_carries_over() {
        let camera = CameraConfig {
            fov_degrees: 60.0,
            ..Default::default()
        }
        .to_camera();
        assert_eq!(camera.fov_y_degrees, 60.0);
        assert_eq!(camera.yaw, -90.0);
    }
}
