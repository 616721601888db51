//! scene-walker
//!
//! A first-person viewer for glTF scenes that runs natively and in the browser. It loads one
//! `.glb` model next to a small test scene, lights it with a shadow-casting directional
//! light and lets you fly through it with pointer-lock mouse look and the keyboard.
//!
//! High-level modules
//! - `camera`: camera pose, projection and their uniform
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `controls`: pointer-lock mouse look
//! - `data_structures`: engine data models (geometry, meshes, instances, textures, lights)
//! - `flow`: event loop and the flow abstraction driving it
//! - `movement`: keyboard movement flags and the per-frame camera update
//! - `pipelines`: the lit pipeline and the shadow pipeline
//! - `resources`: helpers to fetch files and parse glTF models
//! - `render`: render composition handed from flows to the engine
//! - `viewer`: the scene walker itself
//!

pub mod camera;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod flow;
pub mod movement;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewer;

pub use viewer::{ViewerConfig, ViewerEvent, ViewerState, run_viewer};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run_viewer(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
