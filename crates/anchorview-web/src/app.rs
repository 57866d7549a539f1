//! Bevy application setup

use anchorview_scene::{AnchorScenePlugin, SceneHostConfig, SessionCamera, SessionEnded};
use bevy::prelude::*;
use bevy_egui::{EguiGlobalSettings, EguiPlugin, PrimaryEguiContext};
use bevy_picking::{DefaultPickingPlugins, prelude::MeshPickingPlugin};

use crate::item::{query_param, ItemPlugin};
use crate::loader::{TrackerLoaderPlugin, DEFAULT_TRACKER_URL};
use crate::ui::OverlayPlugin;

/// The marker-tracking render host: shared scene, tracker loading, overlay and camera
///
/// Expects the app to already carry the windowing, picking and egui plugins.
pub struct ArSessionPlugin {
    pub tracker_url: String,
}

impl Default for ArSessionPlugin {
    fn default() -> Self {
        Self {
            tracker_url: DEFAULT_TRACKER_URL.to_string(),
        }
    }
}

impl Plugin for ArSessionPlugin {
    fn build(&self, app: &mut App) {
        // The overlay gets its own camera so it renders while the session camera is off
        app.insert_resource(EguiGlobalSettings {
            auto_create_primary_context: false,
            ..default()
        })
            .insert_resource(SceneHostConfig::default())
            .add_plugins(AnchorScenePlugin)
            .add_plugins(TrackerLoaderPlugin {
                script_url: self.tracker_url.clone(),
            })
            .add_plugins(OverlayPlugin)
            .add_systems(Startup, spawn_cameras);
    }
}

/// Session camera at the origin looking down -Z; anchor poses arrive in this space.
/// It stays inactive until tracking starts so nothing renders over the video early.
fn spawn_cameras(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Camera {
            is_active: false,
            clear_color: ClearColorConfig::Custom(Color::NONE),
            ..default()
        },
        Transform::IDENTITY,
        SessionCamera,
    ));

    commands.spawn((
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        PrimaryEguiContext,
    ));
}

/// Standalone page: go back in history once the session is torn down
fn leave_on_end(mut ended: MessageReader<SessionEnded>) {
    if ended.read().count() == 0 {
        return;
    }
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            if let Err(e) = history.back() {
                tracing::error!("Failed to navigate back: {:?}", e);
            }
        }
    }
}

/// Run the Bevy application
pub fn run() {
    let tracker_url = query_param("tracker").unwrap_or_else(|| DEFAULT_TRACKER_URL.to_string());

    App::new()
        .insert_resource(ClearColor(Color::NONE)) // Video shows through the canvas
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Anchorview AR".to_string(),
                    canvas: Some("#anchorview-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    transparent: true,
                    // Pinch must reach the app instead of zooming the page
                    prevent_default_event_handling: true,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: "".to_string(),
                // Don't look for .meta files - CDNs don't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .add_plugins(ArSessionPlugin { tracker_url })
        .add_plugins(ItemPlugin)
        .add_systems(Update, leave_on_end)
        .run();
}
