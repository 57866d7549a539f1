//! Editor preview scene: reference grid, marker image and live edits
//!
//! The placed asset goes through the same session, placement and lighting
//! plugins as the tracking host; only the anchor is fixed at the origin.

use std::sync::{Arc, Mutex};

use anchorview_core::{ModelConfig, PlacementTarget};
use anchorview_scene::lighting::no_shadows;
use anchorview_scene::{ArSession, EndSession, PlacedModel, ShadowSettings, StartSession};
use base64::Engine;
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::alpha::AlphaMode;

use crate::bridge::ViewerCommand;
use crate::camera::OrbitCamera;
use crate::capture::CaptureState;

/// Reference grid extent (edge length) and division count
pub const GRID_SIZE: f32 = 2.0;
pub const GRID_DIVISIONS: u32 = 20;
pub const AXES_LENGTH: f32 = 0.5;

pub struct PreviewPlugin;

impl Plugin for PreviewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PreviewState>()
            .init_resource::<PendingMarkerImage>()
            .add_systems(Startup, spawn_reference_grid)
            .add_systems(
                Update,
                (apply_commands, spawn_marker_image)
                    .chain()
                    .before(anchorview_scene::SessionSet::Drive),
            );
    }
}

/// What the author is currently previewing
#[derive(Debug, Clone, Resource)]
pub struct PreviewState {
    pub model_url: Option<String>,
    pub target_image_url: Option<String>,
    pub config: Option<ModelConfig>,
    pub show_grid: bool,
    /// Bumped per marker image request so late loads are dropped
    image_request: u64,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            model_url: None,
            target_image_url: None,
            config: None,
            show_grid: true,
            image_request: 0,
        }
    }
}

/// Grid lines and axes helper, toggled together
#[derive(Component)]
pub struct ReferenceGrid;

/// Textured plane showing the marker photograph
#[derive(Component)]
pub struct MarkerImage;

/// Decoded marker image bytes waiting to be turned into a texture
#[derive(Resource, Default, Clone)]
pub struct PendingMarkerImage(pub Arc<Mutex<Option<(u64, Result<Vec<u8>, String>)>>>);

fn apply_commands(
    mut commands: Commands,
    mut reader: MessageReader<ViewerCommand>,
    mut state: ResMut<PreviewState>,
    mut shadows: ResMut<ShadowSettings>,
    mut orbit: ResMut<OrbitCamera>,
    mut capture: ResMut<CaptureState>,
    session: Res<ArSession>,
    mut models: Query<&mut PlacedModel>,
    mut grid: Query<&mut Visibility, With<ReferenceGrid>>,
    images: Query<Entity, With<MarkerImage>>,
    pending_image: Res<PendingMarkerImage>,
    mut start: MessageWriter<StartSession>,
    mut end: MessageWriter<EndSession>,
) {
    // The session starts after the whole batch so it picks up the final config
    let mut load = None;
    for command in reader.read() {
        match command.clone() {
            ViewerCommand::LoadModel(url) => {
                tracing::info!(%url, "previewing model");
                state.model_url = Some(url.clone());
                load = Some(url);
            }
            ViewerCommand::SetConfig(config) => {
                state.config = config;
                // Live update: the placement is recomposed, the asset is not reloaded
                if let Some(rig) = session.rig {
                    if let Ok(mut model) = models.get_mut(rig.model) {
                        model.config = config;
                    }
                }
            }
            ViewerCommand::SetTargetImage(url) => {
                for entity in images.iter() {
                    commands.entity(entity).despawn();
                }
                state.image_request += 1;
                state.target_image_url = url.clone();
                if let Some(url) = url {
                    request_marker_image(&url, state.image_request, &pending_image);
                }
            }
            ViewerCommand::SetShadows(enabled) => shadows.enabled = enabled,
            ViewerCommand::SetGrid(visible) => {
                state.show_grid = visible;
                for mut visibility in grid.iter_mut() {
                    *visibility = if visible { Visibility::Inherited } else { Visibility::Hidden };
                }
            }
            ViewerCommand::SetAutoRotate(enabled) => orbit.auto_rotate = enabled,
            ViewerCommand::Capture => capture.request(),
        }
    }

    if let Some(url) = load {
        if session.lifecycle.is_mounted() || session.lifecycle.camera_held() {
            end.write(EndSession);
        }
        start.write(StartSession {
            target: PlacementTarget::fixed(url, state.config),
        });
    }
}

/// Bytes of a `data:` URL, or `None` if `url` is not one
pub fn decode_data_url(url: &str) -> Option<Result<Vec<u8>, String>> {
    let rest = url.strip_prefix("data:")?;
    let Some((meta, payload)) = rest.split_once(',') else {
        return Some(Err("data URL without payload".to_string()));
    };
    if !meta.ends_with(";base64") {
        return Some(Err("only base64 data URLs are supported".to_string()));
    }
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| e.to_string()),
    )
}

/// Plane footprint for an image: 1 unit deep, width following the aspect ratio
pub fn marker_plane_size(width: u32, height: u32) -> Vec2 {
    if width == 0 || height == 0 {
        return Vec2::ONE;
    }
    Vec2::new(width as f32 / height as f32, 1.0)
}

fn request_marker_image(url: &str, request: u64, pending: &PendingMarkerImage) {
    let fill = move |slot: &PendingMarkerImage, result: Result<Vec<u8>, String>| {
        if let Ok(mut guard) = slot.0.lock() {
            *guard = Some((request, result));
        }
    };

    if let Some(decoded) = decode_data_url(url) {
        fill(pending, decoded);
        return;
    }

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending = pending.clone();
        let url = url.to_string();
        spawn_local(async move {
            let result = match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => response.binary().await.map_err(|e| format!("{e:?}")),
                Ok(response) => Err(format!("marker image request failed with status {}", response.status())),
                Err(e) => Err(format!("{e:?}")),
            };
            fill(&pending, result);
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fill(pending, Err(format!("cannot fetch {url} outside the browser")));
}

fn spawn_marker_image(
    mut commands: Commands,
    state: Res<PreviewState>,
    pending: Res<PendingMarkerImage>,
    mut images: ResMut<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some((request, result)) = pending.0.lock().ok().and_then(|mut slot| slot.take()) else {
        return;
    };
    if request != state.image_request {
        tracing::debug!(request, "dropping superseded marker image");
        return;
    }

    let decoded = result.and_then(|bytes| image::load_from_memory(&bytes).map_err(|e| e.to_string()));
    let dynamic = match decoded {
        Ok(dynamic) => dynamic,
        Err(e) => {
            tracing::warn!("Failed to load marker image: {}", e);
            return;
        }
    };

    let size = marker_plane_size(dynamic.width(), dynamic.height());
    let texture = images.add(Image::from_dynamic(
        dynamic,
        true,
        RenderAssetUsages::RENDER_WORLD,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(size.x, size.y))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color_texture: Some(texture),
            perceptual_roughness: 1.0,
            double_sided: true,
            cull_mode: None,
            ..default()
        })),
        Transform::IDENTITY,
        bevy::light::NotShadowCaster,
        MarkerImage,
    ));
}

/// Ground grid (`GRID_SIZE` across, `GRID_DIVISIONS` cells) plus an XYZ axes helper
fn spawn_reference_grid(
    mut commands: Commands,
    state: Res<PreviewState>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let visibility = if state.show_grid {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    let thickness = 0.002;
    let half = GRID_SIZE / 2.0;
    let step = GRID_SIZE / GRID_DIVISIONS as f32;

    let line_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.8, 0.8, 0.8, 0.1),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let center_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.0, 0.0, 0.0, 0.1),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    // Lines along X (varying Z) and along Z (varying X)
    let line_x = meshes.add(Cuboid::new(GRID_SIZE, thickness, thickness));
    let line_z = meshes.add(Cuboid::new(thickness, thickness, GRID_SIZE));

    for i in 0..=GRID_DIVISIONS {
        let offset = -half + i as f32 * step;
        let material = if i == GRID_DIVISIONS / 2 {
            center_material.clone()
        } else {
            line_material.clone()
        };
        commands.spawn((
            Mesh3d(line_x.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_xyz(0.0, 0.0, offset),
            no_shadows(),
            ReferenceGrid,
            visibility,
        ));
        commands.spawn((
            Mesh3d(line_z.clone()),
            MeshMaterial3d(material),
            Transform::from_xyz(offset, 0.0, 0.0),
            no_shadows(),
            ReferenceGrid,
            visibility,
        ));
    }

    let axes = [
        (Vec3::X, Color::srgb(0.9, 0.2, 0.2)),
        (Vec3::Y, Color::srgb(0.2, 0.9, 0.2)),
        (Vec3::Z, Color::srgb(0.2, 0.2, 0.9)),
    ];
    let axis_mesh = meshes.add(Cylinder::new(thickness, AXES_LENGTH));
    for (direction, color) in axes {
        let material = materials.add(StandardMaterial {
            base_color: color,
            unlit: true,
            ..default()
        });
        // Cylinders are Y-aligned; rotate onto the axis and shift so they start at the origin
        commands.spawn((
            Mesh3d(axis_mesh.clone()),
            MeshMaterial3d(material),
            Transform::from_translation(direction * AXES_LENGTH / 2.0)
                .with_rotation(Quat::from_rotation_arc(Vec3::Y, direction)),
            no_shadows(),
            ReferenceGrid,
            visibility,
        ));
    }
}
