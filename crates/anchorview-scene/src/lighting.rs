//! Lighting rig and shadow catcher

use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use bevy::render::alpha::AlphaMode;

use crate::types::MarkerFrame;

/// Side length of the shadow catcher plane
pub const SHADOW_PLANE_SIZE: f32 = 10.0;

/// Darkening applied where the catcher is in shadow
pub const SHADOW_OPACITY: f32 = 0.3;

pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ShadowSettings>()
            .add_systems(Startup, setup_lighting)
            .add_systems(Update, (spawn_shadow_catchers, apply_shadow_settings).chain());
    }
}

/// Shadow catcher visibility and shadow casting, toggled together
#[derive(Debug, Clone, Resource)]
pub struct ShadowSettings {
    pub enabled: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Marker component for the shadow-casting key light
#[derive(Component)]
pub struct KeyLight;

/// Marker component for the ground plane that only shows shadows
#[derive(Component)]
pub struct ShadowCatcher;

fn setup_lighting(mut commands: Commands, settings: Res<ShadowSettings>) {
    // Sky/ground fill standing in for a hemisphere light
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.85, 0.85, 0.82),
        brightness: 600.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: settings.enabled,
            shadow_depth_bias: -0.0001,
            ..default()
        },
        Transform::from_xyz(2.0, 4.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
        KeyLight,
    ));

    commands.insert_resource(bevy::light::DirectionalLightShadowMap { size: 1024 });
}

/// Give every new marker frame its own shadow catcher, so it follows the anchor
fn spawn_shadow_catchers(
    mut commands: Commands,
    frames: Query<Entity, Added<MarkerFrame>>,
    settings: Res<ShadowSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if frames.is_empty() {
        return;
    }

    // Multiply blending: lit areas leave the background untouched, shadowed areas darken it
    let shade = 1.0 - SHADOW_OPACITY;
    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::rgb(shade, shade, shade),
        perceptual_roughness: 1.0,
        reflectance: 0.0,
        alpha_mode: AlphaMode::Multiply,
        ..default()
    });
    let mesh = meshes.add(Plane3d::default().mesh().size(SHADOW_PLANE_SIZE, SHADOW_PLANE_SIZE));

    let visibility = if settings.enabled {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    for frame in frames.iter() {
        let catcher = commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                // Slightly above the marker image to avoid z-fighting
                Transform::from_xyz(0.0, 0.001, 0.0),
                NotShadowCaster,
                ShadowCatcher,
                visibility,
            ))
            .id();
        commands.entity(frame).add_child(catcher);
    }
}

fn apply_shadow_settings(
    settings: Res<ShadowSettings>,
    mut catchers: Query<&mut Visibility, With<ShadowCatcher>>,
    mut lights: Query<&mut DirectionalLight, With<KeyLight>>,
) {
    if !settings.is_changed() {
        return;
    }

    for mut visibility in catchers.iter_mut() {
        *visibility = if settings.enabled {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
    for mut light in lights.iter_mut() {
        light.shadows_enabled = settings.enabled;
    }
}

/// Exclude a subtree's meshes from shadow reception (overlays, helpers)
pub fn no_shadows() -> (NotShadowCaster, NotShadowReceiver) {
    (NotShadowCaster, NotShadowReceiver)
}
