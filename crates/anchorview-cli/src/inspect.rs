//! glTF placement inspection
//!
//! Computes the same bounding volume the scene hosts measure at runtime, from
//! the primitives reachable through the default scene's node hierarchy, and
//! runs it through the placement engine.

use anchorview_core::{compose_placement, compute_base_transform, BaseTransform, BoundingVolume, ModelConfig, Placement};
use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use gltf::Gltf;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub volume: BoundingVolume,
    pub primitives: usize,
    pub base: BaseTransform,
    pub placement: Placement,
}

pub fn inspect(path: &Path, config: Option<&ModelConfig>) -> Result<InspectReport> {
    let (volume, primitives) = model_bounds(path)?;
    if volume.is_empty() {
        tracing::warn!(path = %path.display(), "model has no geometry");
    }
    let base = compute_base_transform(&volume);
    Ok(InspectReport {
        volume,
        primitives,
        base,
        placement: compose_placement(&base, config),
    })
}

/// Bounds of every mesh primitive under the default scene, in scene space
pub fn model_bounds(path: &Path) -> Result<(BoundingVolume, usize)> {
    let gltf = Gltf::open(path).with_context(|| format!("Failed to open glTF file: {}", path.display()))?;
    let buffers = gltf::import_buffers(&gltf.document, path.parent(), gltf.blob.clone())
        .with_context(|| format!("Failed to load buffers for {}", path.display()))?;

    let mut volume = BoundingVolume::EMPTY;
    let mut primitives = 0;
    if let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) {
        for node in scene.nodes() {
            visit_node(&node, Mat4::IDENTITY, &buffers, &mut volume, &mut primitives)?;
        }
    }
    Ok((volume, primitives))
}

fn visit_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    volume: &mut BoundingVolume,
    primitives: &mut usize,
) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let positions = reader
                .read_positions()
                .with_context(|| format!("Mesh primitive {} missing positions", primitive.index()))?;
            for p in positions {
                volume.extend(world.transform_point3(Vec3::from(p)));
            }
            *primitives += 1;
        }
    }

    for child in node.children() {
        visit_node(&child, world, buffers, volume, primitives)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    /// Single triangle (0,0,0) (2,0,0) (0,1,0) with the given node list
    fn write_model(dir: &Path, nodes: &str) -> std::path::PathBuf {
        let mut bytes = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        let json = format!(
            r#"{{
                "asset": {{"version": "2.0"}},
                "scene": 0,
                "scenes": [{{"nodes": [0]}}],
                "nodes": {nodes},
                "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}}}]}}],
                "buffers": [{{"byteLength": 36, "uri": "{uri}"}}],
                "bufferViews": [{{"buffer": 0, "byteOffset": 0, "byteLength": 36}}],
                "accessors": [{{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                                "min": [0, 0, 0], "max": [2, 1, 0]}}]
            }}"#
        );
        let path = dir.join("model.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_bounds_follow_node_translation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), r#"[{"mesh": 0, "translation": [1, 0, 0]}]"#);

        let (volume, primitives) = model_bounds(&path).unwrap();
        assert_eq!(primitives, 1);
        assert_eq!(volume.min, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(volume.max, Vec3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn test_bounds_compose_parent_transforms() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(
            dir.path(),
            r#"[{"children": [1], "scale": [2, 2, 2]}, {"mesh": 0, "translation": [1, 0, 0]}]"#,
        );

        let (volume, _) = model_bounds(&path).unwrap();
        assert!((volume.min - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!((volume.max - Vec3::new(6.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_inspect_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), r#"[{"mesh": 0, "translation": [1, 0, 0]}]"#);

        let report = inspect(&path, None).unwrap();
        // Longest side is 2 units
        assert!((report.base.scale - 0.25).abs() < 1e-6);
        assert_eq!(report.base.center_offset, Vec3::new(-2.0, -0.5, 0.0));
        assert!((report.placement.position - Vec3::new(-0.5, -0.125, 0.0)).length() < 1e-6);

        let config = ModelConfig {
            scale: 2.0,
            ..ModelConfig::IDENTITY
        };
        let report = inspect(&path, Some(&config)).unwrap();
        assert!((report.placement.scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&dir.path().join("missing.glb"), None).is_err());
    }
}
