//! Scene graph and hierarchical scene organization.
//!
//! Provides the [`SceneNode`] trait and its two node kinds: [`ContainerNode`] groups
//! children under a shared transform and [`MeshNode`] carries geometry, a material and
//! shadow flags. Geometry stays on the CPU until the first [`SceneNode::write_to_buffers`],
//! so whole subtrees can be built (and tested) without a GPU and handed across threads.
//! [`Scene`] is the top-level container plus the directional light.

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        geometry::MeshData,
        instance::{Instance, InstanceRaw},
        light::DirectionalLight,
        model::{self, MaterialData},
    },
    render::{Instanced, Render},
};

/// Whether a mesh takes part in the shadow pass and whether it samples the shadow map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shadow {
    pub cast: bool,
    pub receive: bool,
}

impl Shadow {
    pub const BOTH: Shadow = Shadow {
        cast: true,
        receive: true,
    };
}

pub trait SceneNode: Send {
    fn name(&self) -> &str;

    fn get_local_transform(&self) -> &Instance;

    fn set_local_transform(&mut self, instance: Instance);

    fn get_world_transform(&self) -> &Instance;

    /// Recompute this node's world transform from `parent` and recurse into the children.
    fn update_world_transforms(&mut self, parent: &Instance);

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn as_mesh(&self) -> Option<&MeshNode> {
        None
    }

    fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        None
    }

    /// Create missing GPU resources and upload the current world transforms.
    fn write_to_buffers(&mut self, ctx: &Context);

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

/// Visit `node` and all of its descendants depth-first, parents before children.
pub fn traverse(node: &dyn SceneNode, visit: &mut dyn FnMut(&dyn SceneNode)) {
    visit(node);
    for child in node.get_children() {
        traverse(child.as_ref(), visit);
    }
}

pub fn traverse_mut(node: &mut dyn SceneNode, visit: &mut dyn FnMut(&mut dyn SceneNode)) {
    visit(&mut *node);
    for child in node.get_children_mut() {
        traverse_mut(child.as_mut(), visit);
    }
}

/// Number of mesh nodes in the subtree rooted at `node`.
pub fn count_meshes(node: &dyn SceneNode) -> usize {
    let mut meshes = 0;
    traverse(node, &mut |n| {
        if n.as_mesh().is_some() {
            meshes += 1;
        }
    });
    meshes
}

pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Instance,
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: vec![],
            local: Instance::default(),
            world: Instance::default(),
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn get_world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn write_to_buffers(&mut self, ctx: &Context) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(ctx));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// GPU side of a [`MeshNode`]; created on first upload.
struct GpuMesh {
    mesh: model::Mesh,
    material: model::Material,
    instance_buffer: wgpu::Buffer,
}

pub struct MeshNode {
    name: String,
    children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Instance,
    geometry: MeshData,
    material: MaterialData,
    pub shadow: Shadow,
    gpu: Option<GpuMesh>,
}

impl MeshNode {
    pub fn new(name: &str, geometry: MeshData, material: MaterialData) -> Self {
        Self {
            name: name.to_string(),
            children: vec![],
            local: Instance::default(),
            world: Instance::default(),
            geometry,
            material,
            shadow: Shadow::default(),
            gpu: None,
        }
    }

    pub fn with_shadow(mut self, shadow: Shadow) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn with_transform(mut self, local: Instance) -> Self {
        self.local = local;
        self
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn geometry(&self) -> &MeshData {
        &self.geometry
    }

    pub fn material(&self) -> &MaterialData {
        &self.material
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    fn upload(&self, ctx: &Context) -> GpuMesh {
        let mesh = model::Mesh::new(&ctx.device, &self.name, &self.geometry);
        let material =
            model::Material::new(&ctx.device, &ctx.queue, &self.material, &ctx.material_layout);
        let instance_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&[self.world.to_raw(self.shadow.receive)]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        GpuMesh {
            mesh,
            material,
            instance_buffer,
        }
    }
}

impl SceneNode for MeshNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn get_world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn as_mesh(&self) -> Option<&MeshNode> {
        Some(self)
    }

    fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        Some(self)
    }

    fn write_to_buffers(&mut self, ctx: &Context) {
        if self.geometry.is_empty() {
            warn!("mesh {} has no triangles and is not uploaded", self.name);
        } else {
            match &self.gpu {
                Some(gpu) => {
                    let raw: [InstanceRaw; 1] = [self.world.to_raw(self.shadow.receive)];
                    ctx.queue
                        .write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&raw));
                }
                None => self.gpu = Some(self.upload(ctx)),
            }
        }
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(ctx));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        let own = self.gpu.as_ref().map(|gpu| Instanced {
            instance: &gpu.instance_buffer,
            mesh: &gpu.mesh,
            material: &gpu.material,
            amount: 1,
            cast_shadow: self.shadow.cast,
        });
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain(own)
            .collect()
    }
}

/// The top-level container every rendered node hangs off, plus the light.
pub struct Scene {
    root: ContainerNode,
    pub sun: DirectionalLight,
}

impl Scene {
    pub fn new(sun: DirectionalLight) -> Self {
        Self {
            root: ContainerNode::new("scene"),
            sun,
        }
    }

    /// Attach a subtree and return its index among the scene's direct children.
    pub fn add(&mut self, node: Box<dyn SceneNode>) -> usize {
        self.root.add_child(node);
        self.root.children.len() - 1
    }

    pub fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        self.root.get_children()
    }

    pub fn child_mut(&mut self, idx: usize) -> Option<&mut Box<dyn SceneNode>> {
        self.root.children.get_mut(idx)
    }

    pub fn root(&self) -> &dyn SceneNode {
        &self.root
    }

    pub fn update_world_transforms(&mut self) {
        self.root.update_world_transforms(&Instance::default());
    }

    pub fn write_to_buffers(&mut self, ctx: &Context) {
        self.root.write_to_buffers(ctx);
    }
}

impl<'a> From<&'a Scene> for Render<'a> {
    fn from(scene: &'a Scene) -> Self {
        Render::Defaults(scene.root.get_render())
    }
}
