//! Damped orbit camera for the editor preview (Y up)

use std::f32::consts::TAU;

use anchorview_scene::{PointerCapture, SessionCamera};
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

pub const MIN_DISTANCE: f32 = 0.5;
pub const MAX_DISTANCE: f32 = 10.0;

/// Seconds per full turn while auto-rotating
pub const AUTO_ROTATE_PERIOD: f32 = 30.0;

/// Keeps the camera off the poles so `look_at` stays well defined
const MAX_ELEVATION: f32 = 1.5;

pub struct OrbitCameraPlugin;

impl Plugin for OrbitCameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrbitCamera>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, update_orbit_camera);
    }
}

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct OrbitCamera {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub auto_rotate: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        // Equivalent to sitting at (0, 1.5, 1.5) looking at the origin
        let distance = Vec2::new(1.5, 1.5).length();
        Self {
            distance,
            target_distance: distance,
            azimuth: 0.0,
            elevation: std::f32::consts::FRAC_PI_4,
            target: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.05,
            auto_rotate: false,
        }
    }
}

impl OrbitCamera {
    /// Camera position for the current (smoothed) orbit parameters
    pub fn translation(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            )
    }

    pub fn zoom(&mut self, factor: f32) {
        self.target_distance = (self.target_distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * self.sensitivity;
        self.elevation = (self.elevation + delta.y * self.sensitivity).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Advance smoothing and auto-rotation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if self.auto_rotate {
            self.azimuth = (self.azimuth + TAU / AUTO_ROTATE_PERIOD * dt).rem_euclid(TAU);
        }
        let lerp_factor = 1.0 - (-self.smooth_factor * 60.0 * dt).exp();
        self.distance += (self.target_distance - self.distance) * lerp_factor;
    }
}

fn spawn_camera(mut commands: Commands, settings: Res<OrbitCamera>) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 45f32.to_radians(),
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        Transform::from_translation(settings.translation()).looking_at(settings.target, Vec3::Y),
        SessionCamera,
    ));
}

fn update_orbit_camera(
    mut camera_query: Query<&mut Transform, With<SessionCamera>>,
    mut settings: ResMut<OrbitCamera>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    capture: Res<PointerCapture>,
    time: Res<Time>,
) {
    // The editor UI owns the pointer; drain input so it isn't applied later
    let total_motion: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let scroll: f32 = mouse_wheel.read().map(|s| s.y).sum();

    if !capture.captured {
        if mouse_button.pressed(MouseButton::Left) {
            settings.orbit(total_motion);
        }

        if scroll != 0.0 {
            let zoom_speed = settings.zoom_speed;
            settings.zoom(1.0 - scroll * zoom_speed * 0.3);
        }

        let touches: Vec<_> = touch_input.iter().collect();
        match touches.as_slice() {
            [touch] => settings.orbit(touch.delta()),
            [t1, t2] => {
                let curr_dist = t1.position().distance(t2.position());
                let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
                settings.zoom(prev_dist / curr_dist.max(1.0));
            }
            _ => {}
        }
    }

    settings.step(time.delta_secs());

    for mut transform in camera_query.iter_mut() {
        transform.translation = settings.translation();
        transform.look_at(settings.target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_initial_view() {
        let camera = OrbitCamera::default();
        let position = camera.translation();
        assert!((position - Vec3::new(0.0, 1.5, 1.5)).length() < 1e-5);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.zoom(100.0);
        assert_eq!(camera.target_distance, MAX_DISTANCE);
        camera.zoom(0.0001);
        assert_eq!(camera.target_distance, MIN_DISTANCE);
    }

    #[test]
    fn test_auto_rotate_completes_one_turn_per_period() {
        let mut camera = OrbitCamera {
            auto_rotate: true,
            ..default()
        };
        let steps = 600;
        for _ in 0..steps {
            camera.step(AUTO_ROTATE_PERIOD / steps as f32);
        }
        let wrapped = camera.azimuth.min(TAU - camera.azimuth);
        assert!(wrapped < 1e-3, "azimuth {}", camera.azimuth);
    }

    #[test]
    fn test_auto_rotate_off_keeps_azimuth() {
        let mut camera = OrbitCamera::default();
        camera.step(1.0);
        assert_eq!(camera.azimuth, 0.0);
    }

    #[test]
    fn test_elevation_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.orbit(Vec2::new(0.0, 10_000.0));
        assert_eq!(camera.elevation, MAX_ELEVATION);
    }

    #[test]
    fn test_captured_pointer_does_not_orbit() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(bevy::input::InputPlugin)
            .insert_resource(PointerCapture { captured: true })
            .init_resource::<OrbitCamera>()
            .add_systems(Update, update_orbit_camera);
        let camera = app.world_mut().spawn((Transform::default(), SessionCamera)).id();

        app.world_mut()
            .resource_mut::<ButtonInput<MouseButton>>()
            .press(MouseButton::Left);
        app.world_mut().write_message(MouseMotion {
            delta: Vec2::new(200.0, 0.0),
        });
        app.update();

        assert_eq!(app.world().resource::<OrbitCamera>().azimuth, 0.0);
        let transform = app.world().get::<Transform>(camera).unwrap();
        assert!((transform.translation - Vec3::new(0.0, 1.5, 1.5)).length() < 1e-4);
    }
}
