//! Menu listing and switching between the menu and an item's AR session

use std::sync::{Arc, Mutex};

use anchorview_core::bundle::MANIFEST_FILE;
use anchorview_core::{BundleItem, BundleManifest, PlacementTarget};
use anchorview_scene::{SessionEnded, StartSession};
use anchorview_web::ui::OverlayState;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

pub const VIEW_IN_AR: &str = "View in AR";
pub const AR_UNAVAILABLE: &str = "AR Unavailable";

pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MenuState>()
            .init_resource::<PendingManifest>()
            .add_message::<OpenItem>()
            .add_systems(Startup, fetch_manifest)
            .add_systems(
                Update,
                (receive_manifest, return_to_menu, open_items)
                    .chain()
                    .before(anchorview_scene::SessionSet::Drive),
            )
            .add_systems(EguiPrimaryContextPass, menu_system);
    }
}

/// What the bundle page is showing
#[derive(Resource, Default)]
pub struct MenuState {
    pub manifest: Option<BundleManifest>,
    pub load_error: Option<String>,
    /// Item whose AR session is open; `None` shows the menu
    pub active: Option<String>,
}

/// Manifest fetch result
#[derive(Resource, Default, Clone)]
pub struct PendingManifest(pub Arc<Mutex<Option<Result<BundleManifest, String>>>>);

/// Request to open an item's AR session
#[derive(Message, Debug, Clone)]
pub struct OpenItem {
    pub id: String,
}

/// Label and enabled state of an item's AR button
pub fn ar_button(item: &BundleItem) -> (&'static str, bool) {
    let has_model = item.model_url.as_deref().is_some_and(|m| !m.trim().is_empty());
    let label = if has_model { VIEW_IN_AR } else { AR_UNAVAILABLE };
    (label, item.has_ar_data())
}

pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

fn fetch_manifest(pending: Res<PendingManifest>) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending = pending.0.clone();
        spawn_local(async move {
            tracing::info!("Fetching manifest from: {}", MANIFEST_FILE);
            let result = match gloo_net::http::Request::get(MANIFEST_FILE).send().await {
                Ok(response) if response.ok() => match response.text().await {
                    Ok(text) => BundleManifest::from_json(&text).map_err(|e| e.to_string()),
                    Err(e) => Err(format!("failed to read {MANIFEST_FILE}: {e:?}")),
                },
                Ok(response) => Err(format!("{MANIFEST_FILE} request failed with status {}", response.status())),
                Err(e) => Err(format!("failed to fetch {MANIFEST_FILE}: {e:?}")),
            };
            if let Ok(mut slot) = pending.lock() {
                *slot = Some(result);
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = &pending;
        tracing::info!("manifest fetch needs a browser page");
    }
}

fn receive_manifest(pending: Res<PendingManifest>, mut state: ResMut<MenuState>) {
    let Some(result) = pending.0.lock().ok().and_then(|mut slot| slot.take()) else {
        return;
    };
    match result {
        Ok(manifest) => {
            tracing::info!(
                items = manifest.items.len(),
                ar_ready = manifest.ar_ready_count(),
                "menu loaded"
            );
            state.manifest = Some(manifest);
            state.load_error = None;
        }
        Err(e) => {
            tracing::error!("Failed to load menu: {}", e);
            state.load_error = Some(e);
        }
    }
}

fn open_items(
    mut requests: MessageReader<OpenItem>,
    mut state: ResMut<MenuState>,
    mut overlay: ResMut<OverlayState>,
    mut start: MessageWriter<StartSession>,
) {
    for request in requests.read() {
        if state.active.is_some() {
            tracing::warn!(id = %request.id, "an item is already open");
            continue;
        }
        let Some(item) = state.manifest.as_ref().and_then(|m| m.get(&request.id)) else {
            tracing::warn!(id = %request.id, "unknown menu item");
            continue;
        };
        if !item.has_ar_data() {
            continue;
        }

        let menu_item = item.to_menu_item();
        overlay.title = Some(menu_item.name.clone());
        start.write(StartSession {
            target: PlacementTarget::from_menu_item(&menu_item),
        });
        state.active = Some(request.id.clone());
    }
}

/// Teardown already ran when `SessionEnded` arrives
fn return_to_menu(mut ended: MessageReader<SessionEnded>, mut state: ResMut<MenuState>) {
    if ended.read().count() > 0 {
        state.active = None;
    }
}

fn menu_system(mut contexts: EguiContexts, state: Res<MenuState>, mut open: MessageWriter<OpenItem>) {
    if state.active.is_some() {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(manifest) = &state.manifest else {
            ui.centered_and_justified(|ui| match &state.load_error {
                Some(e) => ui.colored_label(egui::Color32::RED, format!("Menu unavailable: {e}")),
                None => ui.label("Loading menu..."),
            });
            return;
        };

        ui.heading(&manifest.title);
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for item in &manifest.items {
                    egui::Frame::group(ui.style()).inner_margin(12.0).show(ui, |ui| {
                        ui.set_width(240.0);
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new(&item.name).strong().size(16.0));
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                ui.label(egui::RichText::new(format_price(item.price)).monospace());
                            });
                        });
                        if !item.description.is_empty() {
                            ui.label(egui::RichText::new(&item.description).small());
                        }
                        if let Some(calories) = item.calories {
                            ui.label(egui::RichText::new(format!("{calories} kcal")).small().weak());
                        }
                        let (label, enabled) = ar_button(item);
                        let button = egui::Button::new(label).min_size(egui::vec2(ui.available_width(), 32.0));
                        if ui.add_enabled(enabled, button).clicked() {
                            open.write(OpenItem { id: item.id.clone() });
                        }
                    });
                }
            });
        });
    });
}
