//! Bevy application setup

use anchorview_web::loader::DEFAULT_TRACKER_URL;
use anchorview_web::ArSessionPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{DefaultPickingPlugins, prelude::MeshPickingPlugin};

use crate::menu::MenuPlugin;

/// Run the Bevy application
pub fn run() {
    // Bundles ship the tracking library next to index.html
    let tracker_url = anchorview_web::item::query_param("tracker").unwrap_or_else(|| DEFAULT_TRACKER_URL.to_string());

    App::new()
        .insert_resource(ClearColor(Color::NONE))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Anchorview Menu".to_string(),
                    canvas: Some("#anchorview-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    transparent: true,
                    prevent_default_event_handling: true,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: "".to_string(),
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .add_plugins(ArSessionPlugin { tracker_url })
        .add_plugins(MenuPlugin)
        .run();
}
