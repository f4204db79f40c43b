//! WASM bridge exposing the cap table engine to the browser UI.

mod scenario;

pub use scenario::WasmScenario;

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
