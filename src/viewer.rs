//! The scene walker: a lit test scene, one glTF model and first-person controls.
//!
//! [`ViewerState`] holds everything that changes while the viewer runs and is driven
//! purely through [`ViewerState::dispatch`], [`ViewerState::look`] and
//! [`ViewerState::advance_frame`], so it can be exercised without a window or GPU.
//! [`Viewer`] is the flow that translates window input into those calls.

use cgmath::{Deg, Point3, Quaternion, Rad, Rotation3, Vector3};
use instant::Duration;
use log::{error, info, warn};
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    camera::Camera,
    context::Context,
    controls::PointerLockControls,
    data_structures::{
        geometry::{box_geometry, plane_geometry},
        instance::Instance,
        light::{DirectionalLight, ShadowCamera},
        model::MaterialData,
        scene_graph::{MeshNode, Scene, SceneNode, Shadow, traverse_mut},
    },
    flow::{self, EventFuture, GraphicsFlow, Out},
    movement::{MovementController, TimeStep},
    render::Render,
    resources,
};

/// Tunables of the viewer. `Default` gives the stock scene.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Asset requested at startup, relative to the page (browser) or working directory.
    pub model_path: String,
    /// World units per second.
    pub speed: f32,
    pub time_step: TimeStep,
    /// Radians per pixel of mouse motion.
    pub look_sensitivity: f32,
    /// Radians the test cube turns about X and Y every frame.
    pub cube_spin: f32,
    pub model_offset: Vector3<f32>,
    pub model_yaw: Deg<f32>,
    pub camera_start: Point3<f32>,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub ground_plane: bool,
    pub sun: DirectionalLight,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: "Races.glb".to_string(),
            speed: 10.0,
            time_step: TimeStep::Fixed(0.1),
            look_sensitivity: 0.002,
            cube_spin: 0.01,
            model_offset: Vector3::new(0.0, -40.0, 0.0),
            model_yaw: Deg(45.0),
            camera_start: Point3::new(0.0, 0.0, 5.0),
            fov: 75.0,
            ground_plane: false,
            sun: default_sun(),
        }
    }
}

fn default_sun() -> DirectionalLight {
    DirectionalLight {
        position: Point3::new(50.0, 50.0, 50.0),
        target: Point3::new(0.0, 0.0, 0.0),
        cast_shadow: true,
        shadow: ShadowCamera {
            left: -100.0,
            right: 200.0,
            top: 100.0,
            bottom: -100.0,
            near: 0.5,
            far: 500.0,
            map_size: 2048,
        },
        ..DirectionalLight::new(0xffa500, 8.0)
    }
}

/// Everything the viewer reacts to.
pub enum ViewerEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    PointerLockChange(bool),
    LoadComplete(Box<dyn SceneNode>),
    LoadError(anyhow::Error),
}

impl std::fmt::Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyDown(code) => f.debug_tuple("KeyDown").field(code).finish(),
            Self::KeyUp(code) => f.debug_tuple("KeyUp").field(code).finish(),
            Self::PointerLockChange(locked) => {
                f.debug_tuple("PointerLockChange").field(locked).finish()
            }
            Self::LoadComplete(node) => f.debug_tuple("LoadComplete").field(&node.name()).finish(),
            Self::LoadError(e) => f.debug_tuple("LoadError").field(e).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed(String),
}

/// Build the static part of the scene. Returns the scene and the index of the cube.
pub fn assemble_scene(config: &ViewerConfig) -> (Scene, usize) {
    let mut scene = Scene::new(config.sun.clone());

    let cube = MeshNode::new(
        "cube",
        box_geometry(1.0, 1.0, 1.0),
        MaterialData::from_hex("cube", 0x00ff00),
    )
    .with_shadow(Shadow::BOTH)
    .with_transform(Instance::from(Vector3::new(-15.0, 0.0, 0.0)));
    let cube = scene.add(Box::new(cube));

    if config.ground_plane {
        let ground = MeshNode::new(
            "ground",
            plane_geometry(75.0, 75.0),
            MaterialData::from_hex("ground", 0xffff00),
        )
        .with_shadow(Shadow {
            cast: false,
            receive: true,
        })
        .with_transform(Instance {
            position: Vector3::new(0.0, -25.0, 0.0),
            rotation: Quaternion::from_angle_x(Deg(-90.0)),
            ..Default::default()
        });
        scene.add(Box::new(ground));
    }

    scene.update_world_transforms();
    (scene, cube)
}

pub struct ViewerState {
    pub config: ViewerConfig,
    pub scene: Scene,
    cube: usize,
    cube_angles: (Rad<f32>, Rad<f32>),
    pub camera: Camera,
    pub controls: PointerLockControls,
    pub movement: MovementController,
    pub load: LoadStatus,
}

impl ViewerState {
    pub fn new(config: ViewerConfig) -> Self {
        let (scene, cube) = assemble_scene(&config);
        Self {
            camera: Camera::new(config.camera_start, Rad(0.0), Rad(0.0)),
            controls: PointerLockControls::new(config.look_sensitivity),
            movement: MovementController::new(config.speed, config.time_step),
            scene,
            cube,
            cube_angles: (Rad(0.0), Rad(0.0)),
            load: LoadStatus::Pending,
            config,
        }
    }

    pub fn dispatch(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::KeyDown(code) => {
                self.movement.flags.handle_key(code, true);
            }
            ViewerEvent::KeyUp(code) => {
                self.movement.flags.handle_key(code, false);
            }
            ViewerEvent::PointerLockChange(locked) => self.controls.set_locked(locked),
            ViewerEvent::LoadComplete(model) => self.attach_model(model),
            ViewerEvent::LoadError(e) => {
                error!("could not load {}: {:#}", self.config.model_path, e);
                self.load = LoadStatus::Failed(format!("{:#}", e));
            }
        }
    }

    fn attach_model(&mut self, mut model: Box<dyn SceneNode>) {
        traverse_mut(model.as_mut(), &mut |node| {
            if let Some(mesh) = node.as_mesh_mut() {
                mesh.shadow = Shadow::BOTH;
            }
        });
        let mut local = model.get_local_transform().clone();
        local.position = self.config.model_offset;
        local.rotation = Quaternion::from_angle_y(self.config.model_yaw) * local.rotation;
        model.set_local_transform(local);

        info!("loaded {} ({})", self.config.model_path, model.name());
        self.scene.add(model);
        self.scene.update_world_transforms();
        self.load = LoadStatus::Loaded;
    }

    /// Mouse look; ignored unless the pointer is locked.
    pub fn look(&mut self, dx: f64, dy: f64) -> bool {
        self.controls.look(&mut self.camera, dx, dy)
    }

    /// Per-frame update: spin the cube, move the camera, refresh world transforms.
    pub fn advance_frame(&mut self, dt: Duration) {
        let spin = Rad(self.config.cube_spin);
        self.cube_angles.0 += spin;
        self.cube_angles.1 += spin;
        let (x, y) = self.cube_angles;
        if let Some(cube) = self.scene.child_mut(self.cube) {
            let mut local = cube.get_local_transform().clone();
            local.rotation = Quaternion::from_angle_x(x) * Quaternion::from_angle_y(y);
            cube.set_local_transform(local);
        }

        self.movement.update(&mut self.camera, dt);
        self.scene.update_world_transforms();
    }

    pub fn cube(&self) -> Option<&dyn SceneNode> {
        self.scene.children().get(self.cube).map(|node| node.as_ref())
    }

    /// The single asynchronous asset request issued at startup.
    pub fn model_request(&self) -> EventFuture<ViewerEvent> {
        let path = self.config.model_path.clone();
        Box::pin(async move {
            match resources::load_model_glb(&path).await {
                Ok(model) => ViewerEvent::LoadComplete(model),
                Err(e) => ViewerEvent::LoadError(e),
            }
        })
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

/// Flow driving a [`ViewerState`] from window input.
#[derive(Debug, Default)]
pub struct Viewer;

impl Viewer {
    // Natively the platform does not report lock changes, so the grab result is the change.
    fn request_lock(&self, ctx: &Context, state: &mut ViewerState) {
        match ctx.lock_pointer() {
            Ok(()) => {
                if cfg!(not(target_arch = "wasm32")) {
                    state.dispatch(ViewerEvent::PointerLockChange(true));
                }
            }
            Err(e) => warn!("pointer lock request failed: {:#}", e),
        }
    }

    fn release_lock(&self, ctx: &Context, state: &mut ViewerState) {
        if state.controls.is_locked() {
            ctx.unlock_pointer();
            state.dispatch(ViewerEvent::PointerLockChange(false));
        }
    }
}

impl GraphicsFlow<ViewerState, ViewerEvent> for Viewer {
    fn on_init(&mut self, ctx: &mut Context, state: &mut ViewerState) -> Out<ViewerEvent> {
        ctx.set_light(&state.scene.sun);
        ctx.projection.set_fovy(Deg(state.config.fov));
        ctx.camera.write(&ctx.queue, &state.camera, &ctx.projection);

        info!("requesting {}", state.config.model_path);
        state.load = LoadStatus::Pending;
        Out::FutEvent(vec![state.model_request()])
    }

    fn on_update(&mut self, ctx: &Context, state: &mut ViewerState, dt: Duration) -> Out<ViewerEvent> {
        state.advance_frame(dt);
        state.scene.write_to_buffers(ctx);
        ctx.camera.write(&ctx.queue, &state.camera, &ctx.projection);
        Out::Empty
    }

    fn on_device_events(
        &mut self,
        _ctx: &Context,
        state: &mut ViewerState,
        event: &DeviceEvent,
    ) -> Out<ViewerEvent> {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.look(*dx, *dy);
        }
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        ctx: &Context,
        state: &mut ViewerState,
        event: &WindowEvent,
    ) -> Out<ViewerEvent> {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                // the browser releases pointer lock on Escape by itself
                if cfg!(not(target_arch = "wasm32"))
                    && *code == KeyCode::Escape
                    && key_state.is_pressed()
                {
                    self.release_lock(ctx, state);
                }
                let event = match key_state {
                    ElementState::Pressed => ViewerEvent::KeyDown(*code),
                    ElementState::Released => ViewerEvent::KeyUp(*code),
                };
                state.dispatch(event);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !state.controls.is_locked() => self.request_lock(ctx, state),
            WindowEvent::Focused(false) if cfg!(not(target_arch = "wasm32")) => {
                self.release_lock(ctx, state)
            }
            _ => {}
        }
        Out::Empty
    }

    fn on_pointer_lock_change(
        &mut self,
        _ctx: &Context,
        state: &mut ViewerState,
        locked: bool,
    ) -> Out<ViewerEvent> {
        state.dispatch(ViewerEvent::PointerLockChange(locked));
        Out::Empty
    }

    fn on_custom_events(
        &mut self,
        _ctx: &Context,
        state: &mut ViewerState,
        event: ViewerEvent,
    ) -> Option<ViewerEvent> {
        state.dispatch(event);
        None
    }

    fn on_render<'a>(&'a self, state: &'a ViewerState) -> Render<'a> {
        Render::from(&state.scene)
    }
}

/// Open the viewer window (or canvas) and run until it is closed.
pub fn run_viewer(config: ViewerConfig) -> anyhow::Result<()> {
    let flows: Vec<Box<dyn GraphicsFlow<ViewerState, ViewerEvent>>> = vec![Box::new(Viewer)];
    flow::run(ViewerState::new(config), flows)
}
