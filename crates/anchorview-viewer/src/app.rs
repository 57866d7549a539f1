//! Bevy application setup

use anchorview_scene::{AnchorScenePlugin, CapabilityStatus, SceneHostConfig, StaticAnchorBackend, TrackingCapability};
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{DefaultPickingPlugins, prelude::MeshPickingPlugin};

use crate::bridge::BridgePlugin;
use crate::camera::OrbitCameraPlugin;
use crate::capture::CapturePlugin;
use crate::preview::PreviewPlugin;
use crate::ui::ToolbarPlugin;

/// Run the Bevy application
pub fn run() {
    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb_u8(0xf0, 0xf0, 0xf0)))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Anchorview Preview".to_string(),
                    canvas: Some("#preview-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: "".to_string(),
                // Don't look for .meta files - asset hosts don't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        // No tracking: the anchor sits at the origin and the pointer drives the camera
        .insert_resource(SceneHostConfig::editor())
        .add_plugins(AnchorScenePlugin)
        .insert_resource(CapabilityStatus::Ready)
        .add_plugins(OrbitCameraPlugin)
        .add_plugins(CapturePlugin)
        .add_plugins(BridgePlugin)
        .add_plugins(PreviewPlugin)
        .add_plugins(ToolbarPlugin);
    app.insert_non_send_resource(TrackingCapability::new(StaticAnchorBackend::default()));
    app.run();
}
