//! Post-processing steps applied to every mesh after import.

use glam::{Vec2, Vec3};

use crate::{
    import::ImportOptions,
    scene::{Face, ImportedScene, SceneMesh},
};

/// Runs the steps enabled in `options` over all meshes of the scene.
pub fn apply(scene: &mut ImportedScene, options: &ImportOptions) {
    for mesh in &mut scene.meshes {
        if options.triangulate {
            triangulate(mesh);
        }
        if options.gen_normals && mesh.normals.is_none() {
            generate_smooth_normals(mesh);
        }
        if options.calc_tangent_space && mesh.tangents.is_none() {
            calc_tangent_space(mesh);
        }
        if options.flip_uvs {
            flip_uvs(mesh);
        }
    }
}

/// Splits polygons into triangle fans and drops degenerate faces.
pub fn triangulate(mesh: &mut SceneMesh) {
    let mut faces = Vec::with_capacity(mesh.faces.len());
    for face in mesh.faces.drain(..) {
        match face.indices.len() {
            0..=2 => {}
            3 => faces.push(face),
            _ => {
                let first = face.indices[0];
                for pair in face.indices[1..].windows(2) {
                    faces.push(Face::from([first, pair[0], pair[1]]));
                }
            }
        }
    }
    mesh.faces = faces;
}

/// Generates area-weighted smooth normals from the triangle faces.
pub fn generate_smooth_normals(mesh: &mut SceneMesh) {
    let mut normals = vec![Vec3::ZERO; mesh.vertex_count()];
    for [a, b, c] in mesh.triangles() {
        let (Some(&p0), Some(&p1), Some(&p2)) = (
            mesh.positions.get(a),
            mesh.positions.get(b),
            mesh.positions.get(c),
        ) else {
            continue;
        };
        // Unnormalized, so larger triangles weigh more.
        let face_normal = (p1 - p0).cross(p2 - p0);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }
    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }
    mesh.normals = Some(normals);
}

/// Computes per-vertex tangents and bitangents from the UV gradients of the
/// triangles. Meshes without texture coordinates are left untouched.
pub fn calc_tangent_space(mesh: &mut SceneMesh) {
    let Some(uvs) = mesh.tex_coords.as_ref() else {
        return;
    };
    let count = mesh.vertex_count();
    let mut tangents = vec![Vec3::ZERO; count];
    let mut bitangents = vec![Vec3::ZERO; count];

    for [a, b, c] in mesh.triangles() {
        if a >= count || b >= count || c >= count || uvs.len() < count {
            continue;
        }
        let edge1 = mesh.positions[b] - mesh.positions[a];
        let edge2 = mesh.positions[c] - mesh.positions[a];
        let duv1: Vec2 = uvs[b] - uvs[a];
        let duv2: Vec2 = uvs[c] - uvs[a];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        let r = 1.0 / det;
        // Collinear UVs, or deltas so small the inverse overflows
        if det == 0.0 || !r.is_finite() {
            continue;
        }
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;
        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    let normals = mesh.normals.as_deref();
    for i in 0..count {
        let mut tangent = tangents[i];
        if let Some(n) = normals.and_then(|n| n.get(i)) {
            // Gram-Schmidt against the vertex normal
            tangent -= *n * n.dot(tangent);
        }
        tangents[i] = tangent.normalize_or_zero();
        bitangents[i] = bitangents[i].normalize_or_zero();
    }

    mesh.tangents = Some(tangents);
    mesh.bitangents = Some(bitangents);
}

/// Mirrors the V texture coordinate so images stored top row first sample
/// the right way up.
pub fn flip_uvs(mesh: &mut SceneMesh) {
    if let Some(uvs) = mesh.tex_coords.as_mut() {
        for uv in uvs {
            uv.y = 1.0 - uv.y;
        }
    }
}
