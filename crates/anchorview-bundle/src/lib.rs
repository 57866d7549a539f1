//! Anchorview Bundle - Self-contained menu site
//!
//! Lists the items of an exported `bundle.json` and opens the AR session for
//! the chosen item in the same page. Closing the session returns to the menu.

mod app;
pub mod menu;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    anchorview_web::init_logging();
    app::run();
}
