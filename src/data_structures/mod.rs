//! Engine data structures: geometry, materials, textures, lights, scene graphs, and instances.
//!
//! - `geometry` holds CPU-side vertex/index data and the primitive shapes
//! - `model` contains mesh and material definitions, GPU resources for drawing them
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-node transformation data
//! - `light` describes the directional light and its shadow camera
//! - `scene_graph` enables hierarchical scene organization

pub mod geometry;
pub mod instance;
pub mod light;
pub mod model;
pub mod scene_graph;
pub mod texture;
