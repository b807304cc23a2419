//! checkout-web
//!
//! Leptos WASM card widget for zero-total checkouts. Loaded by the script
//! tags the server renders next to the `#zero-order-card` mount point.

mod api;
mod app;
mod components;
mod stripe;
mod surface;

pub use app::WidgetConfig;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::task::spawn_local(async {
        if let Err(e) = app::start().await {
            tracing::warn!(error = %e, "Card widget did not start");
        }
    });
}
