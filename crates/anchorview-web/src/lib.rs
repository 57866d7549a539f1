//! Anchorview Web - Marker-tracking AR session in the browser
//!
//! Loads the tracking library on demand, places the item's 3D asset on the
//! printed marker and lets the user rotate and scale it. The session plugin is
//! public so other frontends (the exported bundle) can host the same session.

mod app;
pub mod item;
pub mod loader;
mod media;
pub mod tracking;
pub mod ui;

pub use app::ArSessionPlugin;

#[cfg(feature = "entry")]
use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[cfg(feature = "entry")]
#[wasm_bindgen(start)]
pub fn main() {
    init_logging();
    app::run();
}

/// Install panic hook and logging for a frontend embedding [`ArSessionPlugin`]
pub fn init_logging() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Filter to WARN to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );
}
