use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::{dpi::PhysicalSize, event_loop::EventLoopProxy, window::Window};

use wgpu::{
    Adapter, CommandEncoderDescriptor, Device, ExperimentalFeatures, Features, Instance, Limits,
    MemoryHints, PowerPreference, Queue, RequestAdapterOptions, Surface, SurfaceConfiguration,
    SurfaceError, Texture, TextureFormat, TextureView, TextureViewDescriptor,
};

use deskscape_3d::{Layouts, Renderer3D, create_bind_group_layouts};
use deskscape_camera::update_camera_buffer;

pub mod config;
pub mod gpu_scene;
pub mod loader;
pub mod view;

pub use config::{AssetKind, AssetSpec, DEFAULT_CONFIG_FILE, SceneConfig};
pub use gpu_scene::GpuScene;
pub use loader::{AssetEvent, AssetLoader, AssetSink, CancelToken, LoadKey};
pub use view::{ClickOutcome, LoadRequest, LoadStatus, OfficeView};

pub type RcWindow = Arc<Window>;

/// Everything the winit event loop receives from other threads.
pub enum RuntimeEvent {
    GraphicsReady(Box<Graphics>),
    Asset(AssetEvent),
}

impl AssetSink for EventLoopProxy<RuntimeEvent> {
    fn send(&self, event: AssetEvent) -> bool {
        self.send_event(RuntimeEvent::Asset(event)).is_ok()
    }
}

/// Offscreen colour target the scene renders into; shown as an egui image.
pub struct Viewport {
    pub color: Texture,
    pub color_view: TextureView,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl Viewport {
    pub fn new(device: &wgpu::Device, format: TextureFormat, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("viewport_color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            color,
            color_view,
            width,
            height,
            format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        *self = Viewport::new(device, self.format, width, height);
    }
}

pub async fn create_graphics(window: RcWindow, proxy: EventLoopProxy<RuntimeEvent>) -> Result<()> {
    let instance = Instance::default();
    let surface = instance
        .create_surface(Arc::clone(&window))
        .context("create surface")?;

    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("no compatible GPU adapter")?;
    log::info!("adapter: {:?}", adapter.get_info());

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: Features::empty(),
            required_limits: Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
            memory_hints: MemoryHints::Performance,
            trace: Default::default(),
            experimental_features: ExperimentalFeatures::disabled(),
        })
        .await
        .context("request device")?;

    let size = window.inner_size();
    let width = size.width.max(1);
    let height = size.height.max(1);

    let surface_config = surface
        .get_default_config(&adapter, width, height)
        .context("surface is not supported by the adapter")?;
    surface.configure(&device, &surface_config);

    let layouts: Layouts = create_bind_group_layouts(&device);

    let viewport = Viewport::new(
        &device,
        surface_config.format,
        surface_config.width,
        surface_config.height,
    );

    let renderer = Renderer3D::new(
        &device,
        surface_config.format,
        surface_config.width,
        surface_config.height,
        &layouts,
    );

    let gfx = Graphics {
        window,
        instance,
        surface,
        surface_config,
        adapter,
        device,
        queue,
        layouts,
        renderer,
        gpu_scene: GpuScene::new(),
        viewport,
        last_frame_time: Instant::now(),
    };

    if proxy.send_event(RuntimeEvent::GraphicsReady(Box::new(gfx))).is_err() {
        log::warn!("event loop closed before graphics were ready");
    }
    Ok(())
}

#[allow(dead_code)]
pub struct Graphics {
    pub(crate) window: RcWindow,
    pub viewport: Viewport,
    instance: Instance,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    adapter: Adapter,
    device: Device,
    queue: Queue,
    layouts: Layouts,
    renderer: Renderer3D,
    gpu_scene: GpuScene,
    last_frame_time: Instant,
}

impl Graphics {
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn viewport_view(&self) -> &TextureView {
        &self.viewport.color_view
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport.width, self.viewport.height)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.surface_config.width = new_size.width.max(1);
        self.surface_config.height = new_size.height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
        self.viewport.resize(
            &self.device,
            self.surface_config.width,
            self.surface_config.height,
        );
        self.renderer
            .resize(&self.device, self.viewport.width, self.viewport.height);
    }

    /// Advances `view` by the time since the previous draw, renders it into
    /// the viewport texture and lets `overlay` paint onto the swapchain.
    pub fn draw<F>(&mut self, view: &mut OfficeView, overlay: F)
    where
        F: FnOnce(&mut Self, &TextureView, &mut wgpu::CommandEncoder),
    {
        let now = Instant::now();
        let dt = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        view.frame(dt);

        self.gpu_scene
            .sync(&self.device, &self.queue, &self.layouts, view);
        update_camera_buffer(&self.queue, &self.renderer.globals_buf, view.camera());
        self.renderer.write_lights(&self.queue, &view.lights_uniform());
        self.renderer.set_clear_color(view.graph().background);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::warn!("surface {e}, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(e) => {
                log::error!("could not acquire frame: {e}");
                return;
            }
        };

        let swap_view = frame.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        {
            let items = self.gpu_scene.draw_items(view);
            self.renderer
                .render(&mut encoder, &self.viewport.color_view, &items);
        }
        overlay(self, &swap_view, &mut encoder);
        self.queue.submit(Some(encoder.finish()));
        frame.present();
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn surface_config(&self) -> &SurfaceConfiguration {
        &self.surface_config
    }
}
