//! Lazy loading of the tracking library script
//!
//! The script is injected at most once per page. Every caller gets the same
//! shared slot, which the script's load/error callbacks fill in; a Bevy system
//! turns the filled slot into a [`CapabilityReady`] message and inserts the
//! tracking backend.

use std::sync::{Arc, Mutex, OnceLock};

use anchorview_scene::{CapabilityReady, CapabilityStatus, TrackingCapability};
use bevy::prelude::*;

use crate::tracking::WebTracker;

/// Default location of the tracker script, relative to the page
pub const DEFAULT_TRACKER_URL: &str = "./tracker/anchor-tracker.js";

/// Global class the tracker script must define
pub const TRACKER_GLOBAL: &str = "AnchorTracker";

type LoadSlot = Arc<Mutex<Option<Result<(), String>>>>;

/// Process-wide loader state; the script tag is only ever injected once
static LOADER: OnceLock<LoadSlot> = OnceLock::new();

pub struct TrackerLoaderPlugin {
    pub script_url: String,
}

impl Default for TrackerLoaderPlugin {
    fn default() -> Self {
        Self {
            script_url: DEFAULT_TRACKER_URL.to_string(),
        }
    }
}

impl Plugin for TrackerLoaderPlugin {
    fn build(&self, app: &mut App) {
        let slot = ensure_loaded(&self.script_url);
        app.insert_resource(PendingCapability { slot, published: false })
            .insert_resource(CapabilityStatus::Loading)
            .add_systems(Update, publish_capability.before(anchorview_scene::SessionSet::Drive));
    }
}

/// Load result shared with the script callbacks
#[derive(Resource)]
pub struct PendingCapability {
    slot: LoadSlot,
    published: bool,
}

/// Start loading the tracker script unless that already happened, returning the shared result slot
pub fn ensure_loaded(script_url: &str) -> LoadSlot {
    LOADER
        .get_or_init(|| {
            let slot: LoadSlot = Arc::default();
            inject_script(script_url, slot.clone());
            slot
        })
        .clone()
}

#[cfg(target_arch = "wasm32")]
fn inject_script(script_url: &str, slot: LoadSlot) {
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    fn finish(slot: &LoadSlot, result: Result<(), String>) {
        if let Ok(mut guard) = slot.lock() {
            guard.get_or_insert(result);
        }
    }

    let Some(window) = web_sys::window() else {
        finish(&slot, Err("no window".to_string()));
        return;
    };

    // Already provided by the page (bundled or loaded by a previous app)
    if js_sys::Reflect::has(&window, &JsValue::from_str(TRACKER_GLOBAL)).unwrap_or(false) {
        finish(&slot, Ok(()));
        return;
    }

    let Some(document) = window.document() else {
        finish(&slot, Err("no document".to_string()));
        return;
    };
    let script = match document
        .create_element("script")
        .map_err(|e| format!("{e:?}"))
        .and_then(|el| el.dyn_into::<web_sys::HtmlScriptElement>().map_err(|_| "not a script element".to_string()))
    {
        Ok(script) => script,
        Err(e) => {
            finish(&slot, Err(e));
            return;
        }
    };
    script.set_src(script_url);
    script.set_async(true);

    let onload_slot = slot.clone();
    let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
        let defined = web_sys::window()
            .map(|w| js_sys::Reflect::has(&w, &JsValue::from_str(TRACKER_GLOBAL)).unwrap_or(false))
            .unwrap_or(false);
        if defined {
            finish(&onload_slot, Ok(()));
        } else {
            finish(&onload_slot, Err(format!("script loaded but did not define {TRACKER_GLOBAL}")));
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    script.set_onload(Some(onload.as_ref().unchecked_ref()));
    onload.forget();

    let onerror_slot = slot.clone();
    let url = script_url.to_string();
    let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
        finish(&onerror_slot, Err(format!("failed to load {url}")));
    }) as Box<dyn FnMut(web_sys::Event)>);
    script.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    let appended = document
        .head()
        .map(|head| head.append_child(&script).is_ok())
        .unwrap_or(false);
    if !appended {
        finish(&slot, Err("could not append tracker script".to_string()));
    } else {
        tracing::info!(url = %script_url, "injecting tracker script");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn inject_script(_script_url: &str, slot: LoadSlot) {
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(Err("tracking requires a browser".to_string()));
    }
}

/// Publish the load result exactly once and inject the backend on success
fn publish_capability(world: &mut World) {
    let result = {
        let Some(pending) = world.get_resource::<PendingCapability>() else {
            return;
        };
        if pending.published {
            return;
        }
        let Ok(guard) = pending.slot.try_lock() else {
            return;
        };
        match guard.as_ref() {
            Some(result) => result.clone(),
            None => return,
        }
    };

    if result.is_ok() {
        world.insert_non_send_resource(TrackingCapability::new(WebTracker::new()));
    }
    if let Some(mut pending) = world.get_resource_mut::<PendingCapability>() {
        pending.published = true;
    }
    world.write_message(CapabilityReady { result });
}
