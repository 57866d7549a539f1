//! Anchorview Viewer - Editor preview of a placement
//!
//! Shows the asset exactly as the AR session would place it, but anchored at
//! the origin of a Y-up scene with an orbit camera, reference grid, marker
//! photograph and thumbnail capture. The authoring page drives it through the
//! exported functions in [`bridge`].

mod app;
pub mod bridge;
pub mod camera;
pub mod capture;
pub mod preview;
mod ui;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build()
    );

    app::run();
}
