//! Asset loading and placement application
//!
//! A model entity is spawned hidden under the interaction node with a
//! [`ModelRequest`]. Once the glTF is loaded and its scene instance is spawned,
//! the bounds are measured, the placement is composed and written, and only
//! then is the model made visible. No frame ever shows the raw transform.

use anchorview_core::placement::compute_base_transform;
use anchorview_core::{compose_placement, BoundingVolume};
use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use bevy::camera::primitives::MeshAabb;
use bevy::scene::SceneInstance;

use crate::session::SessionSet;
use crate::types::{ArSession, ModelPlaced, ModelRequest, PlacedModel};

pub struct ModelLoadingPlugin;

impl Plugin for ModelLoadingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (begin_model_loads, spawn_loaded_scenes, measure_spawned_scenes)
                .chain()
                .after(SessionSet::Drive),
        );
        app.add_systems(Update, sync_placements.after(measure_spawned_scenes));
    }
}

/// glTF load in flight for a model entity
#[derive(Component)]
pub struct LoadingModel {
    pub gltf: Handle<Gltf>,
}

/// Scene spawned but bounds not yet measured
#[derive(Component)]
pub struct AwaitingBounds;

fn begin_model_loads(
    mut commands: Commands,
    requests: Query<(Entity, &ModelRequest, &PlacedModel)>,
    session: Res<ArSession>,
    asset_server: Res<AssetServer>,
) {
    for (entity, request, model) in requests.iter() {
        commands.entity(entity).remove::<ModelRequest>();
        if !session.accepts(model.generation) {
            tracing::debug!(generation = %model.generation, "dropping model request from ended session");
            continue;
        }
        tracing::info!(url = %request.url, generation = %model.generation, "loading model");
        let gltf = asset_server.load::<Gltf>(request.url.clone());
        commands.entity(entity).insert(LoadingModel { gltf });
    }
}

fn spawn_loaded_scenes(
    mut commands: Commands,
    loading: Query<(Entity, &LoadingModel, &PlacedModel)>,
    mut session: ResMut<ArSession>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    for (entity, load, model) in loading.iter() {
        match asset_server.get_load_state(load.gltf.id()) {
            Some(LoadState::Loaded) => {
                commands.entity(entity).remove::<LoadingModel>();
                if !session.accepts(model.generation) {
                    tracing::debug!(generation = %model.generation, "ignoring model loaded for ended session");
                    continue;
                }
                let scene = gltf_assets
                    .get(&load.gltf)
                    .and_then(|gltf| gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()));
                match scene {
                    Some(scene) => {
                        commands.entity(entity).insert((SceneRoot(scene), AwaitingBounds));
                    }
                    None => {
                        session.lifecycle.asset_failed(model.generation, "asset contains no scene");
                    }
                }
            }
            Some(LoadState::Failed(err)) => {
                commands.entity(entity).remove::<LoadingModel>();
                // Logged by the lifecycle; the anchor simply stays empty
                session.lifecycle.asset_failed(model.generation, err.to_string());
            }
            _ => {
                // Still loading
            }
        }
    }
}

fn measure_spawned_scenes(
    mut commands: Commands,
    mut pending: Query<(Entity, &SceneInstance, &mut PlacedModel), With<AwaitingBounds>>,
    scene_spawner: Res<SceneSpawner>,
    session: Res<ArSession>,
    children_query: Query<&Children>,
    transform_query: Query<&Transform>,
    mesh_query: Query<&Mesh3d>,
    meshes: Res<Assets<Mesh>>,
    mut placed: MessageWriter<ModelPlaced>,
) {
    for (entity, instance, mut model) in pending.iter_mut() {
        if !scene_spawner.instance_is_ready(**instance) {
            continue;
        }
        commands.entity(entity).remove::<AwaitingBounds>();
        if !session.accepts(model.generation) {
            continue;
        }

        let volume = model_bounds(entity, &children_query, &transform_query, &mesh_query, &meshes);
        let base = compute_base_transform(&volume);
        tracing::info!(
            size = ?volume.size(),
            scale = base.scale,
            generation = %model.generation,
            "model measured"
        );
        model.base = Some(base);
        placed.write(ModelPlaced {
            generation: model.generation,
            entity,
        });
    }
}

/// Write the composed placement whenever the base or the author config changes
fn sync_placements(mut models: Query<(&PlacedModel, &mut Transform, &mut Visibility), Changed<PlacedModel>>) {
    for (model, mut transform, mut visibility) in models.iter_mut() {
        let Some(base) = model.base else {
            continue;
        };
        let placement = compose_placement(&base, model.config.as_ref());
        *transform = Transform {
            translation: placement.position,
            rotation: placement.rotation,
            scale: Vec3::splat(placement.scale),
        };
        *visibility = Visibility::Inherited;
    }
}

/// Bounds of every mesh below `root`, in the root's local space (root transform excluded)
pub fn model_bounds(
    root: Entity,
    children_query: &Query<&Children>,
    transform_query: &Query<&Transform>,
    mesh_query: &Query<&Mesh3d>,
    meshes: &Assets<Mesh>,
) -> BoundingVolume {
    fn collect(
        entity: Entity,
        to_root: Mat4,
        children_query: &Query<&Children>,
        transform_query: &Query<&Transform>,
        mesh_query: &Query<&Mesh3d>,
        meshes: &Assets<Mesh>,
        volume: &mut BoundingVolume,
    ) {
        if let Ok(mesh_handle) = mesh_query.get(entity) {
            if let Some(aabb) = meshes.get(&mesh_handle.0).and_then(|mesh| mesh.compute_aabb()) {
                let center = Vec3::from(aabb.center);
                let half = Vec3::from(aabb.half_extents);
                let local = BoundingVolume::new(center - half, center + half);
                *volume = volume.union(&local.transformed(&to_root));
            }
        }

        if let Ok(children) = children_query.get(entity) {
            for child in children.iter() {
                let local = transform_query
                    .get(child)
                    .map(|t| Mat4::from(t.compute_affine()))
                    .unwrap_or(Mat4::IDENTITY);
                collect(child, to_root * local, children_query, transform_query, mesh_query, meshes, volume);
            }
        }
    }

    let mut volume = BoundingVolume::EMPTY;
    collect(root, Mat4::IDENTITY, children_query, transform_query, mesh_query, meshes, &mut volume);
    volume
}
