//! Render composition and pipeline batching.
//!
//! Flows describe what to draw with a [`Render`] value. The engine flattens it into a
//! list of [`Instanced`] draws, renders the shadow casters among them into the shadow
//! map and then draws all of them with the lit pipeline.

use crate::data_structures::model::{Material, Mesh};

/// Data for one instanced draw: a mesh, its material and the instance buffer.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub amount: usize,
    /// Whether the draw also goes into the shadow pass.
    pub cast_shadow: bool,
}

/// Specifies what a flow wants rendered this frame.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instanced object
/// - `Defaults(Vec<Instanced>)` renders a batch of instanced objects
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, basics: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Default(instanced) => basics.push(instanced),
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(basics)),
            Render::None => (),
        }
    }

    /// Number of draws this render flattens to.
    pub fn len(&self) -> usize {
        match self {
            Render::None => 0,
            Render::Default(_) => 1,
            Render::Defaults(vec) => vec.len(),
            Render::Composed(renders) => renders.iter().map(Render::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
