use deskscape_camera::ndc_from_pixels;
use deskscape_runtime::{
    AssetLoader, Graphics, LoadStatus, OfficeView, RcWindow, RuntimeEvent, SceneConfig,
    create_graphics,
};
use egui::Sense;
use egui::load::SizedTexture;
use glam::Vec2;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{StartCause, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

const FPS: u64 = 120;
const FRAME_TIME: Duration = Duration::from_nanos(1_000_000_000 / FPS);

enum State {
    Ready(Box<ReadyState>),
    Init(Option<EventLoopProxy<RuntimeEvent>>),
    Closed,
}

struct ReadyState {
    gfx: Box<Graphics>,
    view: OfficeView,
    loader: AssetLoader<EventLoopProxy<RuntimeEvent>>,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    viewport_tex_id: egui::TextureId,
}

struct ShellUi {
    show_debug_panel: bool,
}

pub struct App {
    state: State,
    config: Option<SceneConfig>,
    proxy: EventLoopProxy<RuntimeEvent>,
    render_target: Instant,
    ui: ShellUi,
}

impl App {
    pub fn new(event_loop: &EventLoop<RuntimeEvent>, config: SceneConfig) -> Self {
        Self {
            state: State::Init(Some(event_loop.create_proxy())),
            config: Some(config),
            proxy: event_loop.create_proxy(),
            render_target: Instant::now(),
            ui: ShellUi {
                show_debug_panel: true,
            },
        }
    }

    fn init_egui_for_graphics(
        gfx: &Graphics,
    ) -> (
        egui::Context,
        egui_winit::State,
        egui_wgpu::Renderer,
        egui::TextureId,
    ) {
        let egui_ctx = egui::Context::default();
        let viewport_id = egui_ctx.viewport_id();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            viewport_id,
            gfx.window(),
            None,
            None,
            None,
        );

        let mut egui_renderer = egui_wgpu::Renderer::new(
            gfx.device(),
            gfx.surface_config().format,
            egui_wgpu::RendererOptions::default(),
        );

        let viewport_tex_id = egui_renderer.register_native_texture(
            gfx.device(),
            gfx.viewport_view(),
            wgpu::FilterMode::Linear,
        );

        (egui_ctx, egui_state, egui_renderer, viewport_tex_id)
    }

    fn graphics_ready(&mut self, gfx: Box<Graphics>) {
        let Some(config) = self.config.take() else {
            log::warn!("graphics arrived twice, ignoring");
            return;
        };
        let (width, height) = gfx.viewport_size();
        let mut view = OfficeView::new(config, width, height);
        let mut loader = AssetLoader::new(self.proxy.clone());
        view.dispatch_requests(&mut loader);

        let (egui_ctx, egui_state, egui_renderer, viewport_tex_id) =
            App::init_egui_for_graphics(&gfx);

        gfx.request_redraw();
        self.state = State::Ready(Box::new(ReadyState {
            gfx,
            view,
            loader,
            egui_ctx,
            egui_state,
            egui_renderer,
            viewport_tex_id,
        }));
    }

    fn draw(&mut self) {
        if let State::Ready(ready) = &mut self.state {
            Self::draw_shell(ready, &mut self.ui);
        }
    }

    fn resized(&mut self, size: PhysicalSize<u32>) {
        if let State::Ready(ready) = &mut self.state {
            ready.gfx.resize(size);
            let (width, height) = ready.gfx.viewport_size();
            ready.view.resize(width, height);
            ready.egui_renderer.free_texture(&ready.viewport_tex_id);
            ready.viewport_tex_id = ready.egui_renderer.register_native_texture(
                ready.gfx.device(),
                ready.gfx.viewport_view(),
                wgpu::FilterMode::Linear,
            );
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let State::Ready(ready) = &mut self.state {
            ready.view.teardown();
        }
        self.state = State::Closed;
        event_loop.exit();
    }

    fn draw_shell(ready: &mut ReadyState, ui_state: &mut ShellUi) {
        let raw_input = ready.egui_state.take_egui_input(ready.gfx.window());
        let viewport_tex_id = ready.viewport_tex_id;
        let (viewport_w, viewport_h) = ready.gfx.viewport_size();
        let (viewport_w, viewport_h) = (viewport_w as f32, viewport_h as f32);
        let egui_ctx = ready.egui_ctx.clone();
        let view = &mut ready.view;

        let full_output = egui_ctx.run(raw_input, |ctx| {
            egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
                egui::MenuBar::new().ui(ui, |ui| {
                    ui.menu_button("View", |ui| {
                        ui.checkbox(&mut ui_state.show_debug_panel, "Show debug panel");
                    });
                    ui.menu_button("Help", |ui| {
                        ui.label("WASD to move, wheel to zoom.");
                        ui.label("Left drag orbits, right drag pans.");
                        ui.label("Click the monitor to zoom in on it.");
                    });
                });
            });

            egui::TopBottomPanel::bottom("debug_panel")
                .resizable(true)
                .default_height(140.0)
                .show_animated(ctx, ui_state.show_debug_panel, |ui| {
                    ui.heading("Scene");
                    ui.separator();

                    ui.horizontal(|ui| {
                        ui.label("Camera eye:");
                        ui.monospace(format!("{:.2}", view.camera().position));
                    });
                    ui.horizontal(|ui| {
                        ui.label("Orbit target:");
                        ui.monospace(format!("{:.2}", view.controls().target));
                    });
                    if let Some(zoom) = view.zoom() {
                        ui.horizontal(|ui| {
                            ui.label("Zoom:");
                            ui.monospace(format!(
                                "{:.0}% to {:.2}, facing {:.2}",
                                zoom.progress() * 100.0,
                                zoom.destination(),
                                zoom.focus()
                            ));
                        });
                    }
                    if let Some(mixer) = view.mixer() {
                        ui.horizontal(|ui| {
                            ui.label("Clip:");
                            ui.monospace(format!("{} @ {:.2}s", mixer.clip_name(), mixer.time()));
                        });
                    }

                    ui.separator();
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        for (key, status) in view.load_status() {
                            let text = match status {
                                LoadStatus::Pending => "pending".to_string(),
                                LoadStatus::Loading(p) => format!("{p:.0}%"),
                                LoadStatus::Loaded => "loaded".to_string(),
                                LoadStatus::Failed(e) => format!("failed: {e}"),
                            };
                            ui.horizontal(|ui| {
                                ui.label(format!("{key}:"));
                                ui.monospace(text);
                            });
                        }
                    });
                });

            egui::CentralPanel::default().show(ctx, |ui| {
                let available = ui.available_size();

                if available.x > 0.0 && available.y > 0.0 && viewport_w > 0.0 && viewport_h > 0.0 {
                    let tex_aspect = viewport_w / viewport_h;
                    let panel_aspect = available.x / available.y;
                    let (w, h) = if panel_aspect > tex_aspect {
                        let h = available.y;
                        let w = h * tex_aspect;
                        (w, h)
                    } else {
                        let w = available.x;
                        let h = w / tex_aspect;
                        (w, h)
                    };

                    let sized = SizedTexture::new(viewport_tex_id, egui::vec2(w, h));
                    let image = egui::Image::from_texture(sized).sense(Sense::click_and_drag());
                    let response = ui.add(image);
                    let rect = response.rect;

                    if response.clicked()
                        && let Some(pos) = response.interact_pointer_pos()
                    {
                        let local = pos - rect.min;
                        let ndc = ndc_from_pixels(local.x, local.y, rect.width(), rect.height());
                        view.click(ndc);
                    }
                    let delta = response.drag_delta();
                    if response.dragged_by(egui::PointerButton::Primary) {
                        view.drag(Vec2::new(delta.x, delta.y));
                    } else if response.dragged_by(egui::PointerButton::Secondary) {
                        view.pan(Vec2::new(delta.x, delta.y));
                    }
                    if response.hovered() {
                        let scroll = ctx.input(|i| i.raw_scroll_delta.y);
                        if scroll != 0.0 {
                            view.scroll(-scroll);
                        }
                    }
                } else {
                    ui.label("Viewport area is too small.");
                }
            });
        });

        let egui::FullOutput {
            platform_output,
            textures_delta,
            shapes,
            pixels_per_point,
            ..
        } = full_output;

        ready
            .egui_state
            .handle_platform_output(ready.gfx.window(), platform_output);

        let paint_jobs = ready.egui_ctx.tessellate(shapes, pixels_per_point);
        let egui_renderer = &mut ready.egui_renderer;

        ready.gfx.draw(&mut ready.view, |gfx_inner, swap_view, encoder| {
            for (id, image_delta) in &textures_delta.set {
                egui_renderer.update_texture(gfx_inner.device(), gfx_inner.queue(), *id, image_delta);
            }
            for id in &textures_delta.free {
                egui_renderer.free_texture(id);
            }

            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [
                    gfx_inner.surface_config().width,
                    gfx_inner.surface_config().height,
                ],
                pixels_per_point,
            };

            egui_renderer.update_buffers(
                gfx_inner.device(),
                gfx_inner.queue(),
                encoder,
                &paint_jobs,
                &screen_descriptor,
            );

            let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_overlay_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut rpass = rpass.forget_lifetime();
            egui_renderer.render(&mut rpass, &paint_jobs, &screen_descriptor);
        });
    }
}

impl ApplicationHandler<RuntimeEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let State::Init(proxy) = &mut self.state
            && let Some(proxy) = proxy.take()
        {
            let win_attr = Window::default_attributes().with_title("deskscape");
            let window: RcWindow = match event_loop.create_window(win_attr) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    log::error!("could not create window: {e}");
                    event_loop.exit();
                    return;
                }
            };
            if let Err(e) = pollster::block_on(create_graphics(window, proxy)) {
                log::error!("{e:#}");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: RuntimeEvent) {
        match event {
            RuntimeEvent::GraphicsReady(gfx) => self.graphics_ready(gfx),
            RuntimeEvent::Asset(event) => {
                if let State::Ready(ready) = &mut self.state {
                    ready.view.handle_asset_event(event);
                    ready.view.dispatch_requests(&mut ready.loader);
                    ready.gfx.request_redraw();
                }
            }
        }
    }

    fn new_events(&mut self, _event_loop: &ActiveEventLoop, _cause: StartCause) {
        if self.render_target <= Instant::now() {
            self.render_target += FRAME_TIME;
            if let State::Ready(ready) = &mut self.state {
                ready.gfx.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::Resized(size) => self.resized(size),
            WindowEvent::RedrawRequested => {
                self.draw();
                let now = Instant::now();
                if self.render_target <= now {
                    self.render_target = now + FRAME_TIME;
                    if let State::Ready(ready) = &mut self.state {
                        ready.gfx.request_redraw();
                    }
                }
            }
            WindowEvent::CloseRequested => self.close(event_loop),
            other => {
                if let State::Ready(ready) = &mut self.state {
                    let response = ready.egui_state.on_window_event(ready.gfx.window(), &other);
                    if response.repaint {
                        ready.gfx.request_redraw();
                    }
                    if matches!(other, WindowEvent::KeyboardInput { .. })
                        && !ready.egui_ctx.wants_keyboard_input()
                    {
                        ready.view.handle_window_event(&other);
                    }
                }
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        match self.state {
            State::Closed => event_loop.set_control_flow(ControlFlow::Wait),
            _ => event_loop.set_control_flow(ControlFlow::WaitUntil(self.render_target)),
        }
    }
}
