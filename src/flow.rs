//! Flow control and application event loop.
//!
//! A "flow" is a piece of application logic that reacts to input, updates its state every
//! frame and says what to render. The engine owns the window, the GPU [`Context`] and the
//! application state, forwards events to the flows and renders what they return.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for flows that handle events and rendering
//! - [`Out<E>`] is the output type for async events and context configuration
//!
//! # Lifecycle
//!
//! Each frame the engine:
//! 1. distributes window/device/custom events to the flows as they arrive
//! 2. calls `on_update` on all flows
//! 3. collects the flows' renders
//! 4. renders the shadow casters into the shadow map
//! 5. renders everything with the lit pipeline and presents the frame

use std::{fmt::Debug, iter, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::Context,
    data_structures::{model::DrawModel, texture::Texture},
    render::{Instanced, Render},
};

/// A future resolving to an application event.
///
/// Natively futures run on the tokio runtime and have to be `Send`; in the browser they
/// run on the JS event loop via `spawn_local`.
#[cfg(not(target_arch = "wasm32"))]
pub type EventFuture<E> = futures::future::BoxFuture<'static, E>;
#[cfg(target_arch = "wasm32")]
pub type EventFuture<E> = futures::future::LocalBoxFuture<'static, E>;

/// Output of every lifecycle hook.
///
/// `Out::FutEvent` resolves each future in the background and puts its event in the event
/// queue; it reaches the flows again through `on_custom_events`. Frames keep rendering
/// while the futures are pending.
///
/// `Out::Configure` modifies the Context, for instance to change the light or clear colour.
///
/// `Empty` is the default output used when nothing needs to be handled.
pub enum Out<E> {
    FutEvent(Vec<EventFuture<E>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl<E> Default for Out<E> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing application logic on top of the engine.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once the GPU context exists; configure the context here
/// 2. `on_window_events()` and `on_device_events()` are called for each winit input event
/// 3. `on_pointer_lock_change()` is called whenever the platform grants or revokes pointer lock
/// 4. `on_update()` is called every frame before rendering
/// 5. `on_custom_events()` is called for resolved [`Out::FutEvent`]s
/// 6. `on_render()` is called each frame and specifies what to draw
pub trait GraphicsFlow<S, E> {
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<E>;

    /// Called every frame with the time elapsed since the previous one.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<E>;

    /// Handle raw device events (mouse motion independent of the cursor).
    fn on_device_events(&mut self, ctx: &Context, state: &mut S, event: &DeviceEvent) -> Out<E>;

    /// Handle window events (keyboard, mouse buttons, focus, resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<E>;

    fn on_pointer_lock_change(&mut self, ctx: &Context, state: &mut S, locked: bool) -> Out<E>;

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    fn on_render<'a>(&'a self, state: &'a S) -> Render<'a>;
}

impl<S, E> Debug for dyn GraphicsFlow<S, E> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State> AppState<State> {
    async fn new(window: Arc<Window>, state: State) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            state,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut basics: Vec<Instanced> = Vec::new();
        graphics_flows
            .iter()
            .for_each(|flow| flow.on_render(&self.state).set_pipelines(&mut basics));
        basics.retain(|instanced| {
            let drawable = instanced.amount > 0 && instanced.instance.size() > 0;
            if !drawable {
                log::warn!("you attempted to render {} with zero instances", instanced.mesh.name);
            }
            drawable
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.light.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            shadow_pass.set_pipeline(&self.ctx.pipelines.shadow);
            for instanced in basics.iter().filter(|instanced| instanced.cast_shadow) {
                shadow_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                shadow_pass.draw_shadow_caster(
                    instanced.mesh,
                    0..instanced.amount as u32,
                    &self.ctx.light.shadow_bind_group,
                );
            }
        }
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in basics {
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_mesh_instanced(
                    instanced.mesh,
                    instanced.material,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    #[allow(dead_code)]
    Initialized(AppState<State>),
    #[allow(dead_code)]
    PointerLock(bool),
    Custom(Event),
    #[allow(dead_code)]
    Exit,
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::PointerLock(locked) => f.debug_tuple("PointerLock").field(locked).finish(),
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
    state: Option<AppState<State>>,
    // Handed to the AppState once the GPU context exists.
    pending_state: Option<State>,
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    last_time: Instant,
}

impl<State, Event> App<State, Event>
where
    State: Send + 'static,
    Event: Send + 'static,
{
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        state: State,
        graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            pending_state: Some(state),
            graphics_flows,
            last_time: Instant::now(),
        })
    }

    /// Run `on_init` on all flows once the AppState is in place.
    fn init_flows(&mut self) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        for flow in self.graphics_flows.iter_mut() {
            let events = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                &mut app_state.ctx,
                self.proxy.clone(),
                events,
            );
        }
        self.last_time = Instant::now();
        app_state.ctx.window.request_redraw();
    }
}

impl<State, Event> ApplicationHandler<FlowEvent<State, Event>> for App<State, Event>
where
    State: Send + 'static,
    Event: Send + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // resumed may fire again on some platforms; the state moves into the AppState once
        let Some(state) = self.pending_state.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("scene-walker");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            window_attributes = window_attributes.with_append(true);
            if let Some(window) = web_sys::window() {
                let width = window.inner_width().ok().and_then(|w| w.as_f64());
                let height = window.inner_height().ok().and_then(|h| h.as_f64());
                if let (Some(width), Some(height)) = (width, height) {
                    window_attributes = window_attributes
                        .with_inner_size(winit::dpi::LogicalSize::new(width, height));
                }
            }
            listen_pointer_lock(self.proxy.clone());
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(AppState::new(window, state)) {
                Ok(app_state) => {
                    self.state = Some(app_state);
                    self.init_flows();
                }
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match AppState::new(window, state).await {
                    Ok(app_state) => FlowEvent::Initialized(app_state),
                    Err(e) => {
                        log::error!(
                            "App initialization failed. Cannot create the main context: {:#}",
                            e
                        );
                        FlowEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Initialized(app_state) => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(app_state);
                self.init_flows();
            }
            FlowEvent::PointerLock(locked) => {
                if let Some(state) = &mut self.state {
                    for flow in self.graphics_flows.iter_mut() {
                        let events = flow.on_pointer_lock_change(&state.ctx, &mut state.state, locked);
                        handle_flow_output(
                            #[cfg(not(target_arch = "wasm32"))]
                            &self.async_runtime,
                            &mut state.ctx,
                            self.proxy.clone(),
                            events,
                        );
                    }
                }
            }
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    let result = self
                        .graphics_flows
                        .iter_mut()
                        .fold(Some(custom_event), |event, flow| {
                            flow.on_custom_events(&state.ctx, &mut state.state, event?)
                        });
                    if result.is_some() {
                        log::warn!("Custom event was not consumed by any flow");
                    }
                }
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        for flow in self.graphics_flows.iter_mut() {
            let events = flow.on_device_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                &mut state.ctx,
                self.proxy.clone(),
                events,
            );
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        for flow in self.graphics_flows.iter_mut() {
            let events = flow.on_window_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                &mut state.ctx,
                self.proxy.clone(),
                events,
            );
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                for flow in self.graphics_flows.iter_mut() {
                    let events = flow.on_update(&state.ctx, &mut state.state, dt);
                    handle_flow_output(
                        #[cfg(not(target_arch = "wasm32"))]
                        &self.async_runtime,
                        &mut state.ctx,
                        self.proxy.clone(),
                        events,
                    );
                }

                match state.render(&self.graphics_flows) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn handle_flow_output<State, Event>(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    ctx: &mut Context,
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
    out: Out<Event>,
) where
    State: Send + 'static,
    Event: Send + 'static,
{
    match out {
        // Resolve in the background and hand the events back to winit
        Out::FutEvent(futures) => {
            for future in futures {
                let proxy = proxy.clone();
                let deliver = async move {
                    let event = future.await;
                    if proxy.send_event(FlowEvent::Custom(event)).is_err() {
                        log::warn!("Event loop was closed before the event could be processed");
                    }
                };
                #[cfg(not(target_arch = "wasm32"))]
                async_runtime.spawn(deliver);
                #[cfg(target_arch = "wasm32")]
                wasm_bindgen_futures::spawn_local(deliver);
            }
        }
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

/// Forward the document's `pointerlockchange` to the event loop.
#[cfg(target_arch = "wasm32")]
fn listen_pointer_lock<State, Event>(proxy: EventLoopProxy<FlowEvent<State, Event>>)
where
    State: Send + 'static,
    Event: Send + 'static,
{
    use wasm_bindgen::{JsCast, closure::Closure};

    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        log::error!("no document to listen for pointer lock changes on");
        return;
    };
    let lock_owner = document.clone();
    let on_change = Closure::<dyn FnMut()>::new(move || {
        let locked = lock_owner.pointer_lock_element().is_some();
        if proxy.send_event(FlowEvent::PointerLock(locked)).is_err() {
            log::warn!("pointer lock change arrived after the event loop closed");
        }
    });
    if let Err(e) = document
        .add_event_listener_with_callback("pointerlockchange", on_change.as_ref().unchecked_ref())
    {
        log::error!("cannot listen for pointer lock changes: {:?}", e);
    }
    // the listener lives as long as the page
    on_change.forget();
}

/// Open the window and run `graphics_flows` over `state` until the window closes.
pub fn run<State, Event>(
    state: State,
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
) -> anyhow::Result<()>
where
    State: Send + 'static,
    Event: Send + 'static,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    #[allow(unused_mut)]
    let mut app: App<State, Event> = App::new(&event_loop, state, graphics_flows)?;

    #[cfg(not(target_arch = "wasm32"))]
    event_loop.run_app(&mut app)?;

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}
