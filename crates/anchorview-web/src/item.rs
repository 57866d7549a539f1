//! Resolving which menu item the page wants to place
//!
//! The host page either embeds the item as JSON
//! (`<script type="application/json" id="anchorview-item">`) or links it with
//! `?item=<url>`. Whatever arrives is turned into a [`StartSession`].

use std::sync::{Arc, Mutex};

use anchorview_core::{MenuItem, PlacementTarget};
use anchorview_scene::StartSession;
use bevy::prelude::*;

use crate::ui::OverlayState;

/// Id of the inline item element
pub const ITEM_ELEMENT_ID: &str = "anchorview-item";

pub struct ItemPlugin;

impl Plugin for ItemPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingItem>()
            .add_systems(Startup, request_item)
            .add_systems(Update, start_pending_item.before(anchorview_scene::SessionSet::Drive));
    }
}

/// Item load result filled in by the page lookup or the fetch callback
#[derive(Resource, Default, Clone)]
pub struct PendingItem(pub Arc<Mutex<Option<Result<MenuItem, String>>>>);

impl PendingItem {
    pub fn fill(&self, result: Result<MenuItem, String>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(result);
        }
    }

    fn take(&self) -> Option<Result<MenuItem, String>> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

pub fn parse_item(json: &str) -> Result<MenuItem, String> {
    serde_json::from_str(json).map_err(|e| format!("invalid menu item: {e}"))
}

/// Read a query parameter from the page URL
#[cfg(target_arch = "wasm32")]
pub fn query_param(name: &str) -> Option<String> {
    let href = web_sys::window()?.location().href().ok()?;
    let url = web_sys::Url::new(&href).ok()?;
    url.search_params().get(name)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn query_param(_name: &str) -> Option<String> {
    None
}

fn request_item(pending: Res<PendingItem>) {
    #[cfg(target_arch = "wasm32")]
    {
        let inline = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(ITEM_ELEMENT_ID))
            .and_then(|el| el.text_content());
        if let Some(json) = inline {
            pending.fill(parse_item(&json));
            return;
        }

        let Some(url) = query_param("item") else {
            pending.fill(Err("no item on this page".to_string()));
            return;
        };

        use wasm_bindgen_futures::spawn_local;
        let pending = pending.clone();
        spawn_local(async move {
            tracing::info!("Fetching item from: {}", url);
            let result = match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => match response.text().await {
                    Ok(text) => parse_item(&text),
                    Err(e) => Err(format!("failed to read item: {e:?}")),
                },
                Ok(response) => Err(format!("item request failed with status {}", response.status())),
                Err(e) => Err(format!("failed to fetch item: {e:?}")),
            };
            pending.fill(result);
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = &pending;
        tracing::info!("item lookup needs a browser page");
    }
}

fn start_pending_item(
    pending: Res<PendingItem>,
    mut overlay: ResMut<OverlayState>,
    mut start: MessageWriter<StartSession>,
) {
    let Some(result) = pending.take() else {
        return;
    };

    let target = match result {
        Ok(item) => {
            overlay.title = Some(item.name.clone());
            PlacementTarget::from_menu_item(&item)
        }
        Err(e) => {
            // Still start: the empty target surfaces as the missing-data error
            tracing::error!("Failed to load item: {}", e);
            PlacementTarget {
                name: String::new(),
                marker: None,
                asset: None,
                config: None,
            }
        }
    };
    start.write(StartSession { target });
}
