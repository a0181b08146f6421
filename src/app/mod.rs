mod egui_host;
mod input;
mod loading;
mod timing;

pub use loading::{AppEvent, LoadPhase};

use crate::assets::LoadedModel;
use crate::config::ViewerConfig;
use crate::render::pick::{PointerSample, Viewport};
use crate::render::{OrbitControls, PerspectiveCamera, Renderer};
use crate::scene::setup::Stage;
use crate::ui::tooltip::{HoverController, TooltipState};
use crate::ui::{self, OverlayFrame, OverlayTextures};
use egui_host::EguiHost;
use input::{Drag, InputState};
use loading::LoadRequest;
use timing::FrameTiming;

use std::cell::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub struct App {
    config: ViewerConfig,
    stage: Stage,
    proxy: EventLoopProxy<AppEvent>,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    egui: Option<EguiHost>,
    overlay_textures: OverlayTextures,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    input: InputState,
    hover: HoverController,
    tooltip: TooltipState,
    /// Set once, when the scene finishes loading.
    model: OnceCell<LoadedModel>,
    phase: LoadPhase,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(config: ViewerConfig, proxy: EventLoopProxy<AppEvent>) -> Self {
        let window = &config.window;
        let aspect = window.width as f32 / window.height.max(1) as f32;
        Self {
            stage: Stage::build(&config),
            proxy,
            window: None,
            renderer: None,
            egui: None,
            overlay_textures: OverlayTextures::default(),
            camera: PerspectiveCamera::from_config(&config.camera, aspect),
            controls: OrbitControls::new(&config.controls),
            input: InputState::default(),
            hover: HoverController::new(&config.presentation),
            tooltip: TooltipState::default(),
            model: OnceCell::new(),
            phase: LoadPhase::Loading,
            timing: FrameTiming::new(config.window.title.clone()),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            config,
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) {
        let attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        let renderer = match pollster::block_on(Renderer::new(window.clone(), &self.stage)) {
            Ok(renderer) => renderer,
            Err(err) => {
                log::error!("Failed to initialize renderer: {}", err);
                show_error_dialog("Renderer unavailable", &err.to_string());
                event_loop.exit();
                return;
            }
        };

        let size = renderer.size();
        self.camera.set_viewport(size.width, size.height);
        self.egui = Some(EguiHost::new(&window, renderer.max_texture_side()));
        self.renderer = Some(renderer);
        self.target_frame_duration = timing::target_frame_duration(&window);
        self.next_frame_time = Instant::now() + self.target_frame_duration;
        self.window = Some(window);

        let request = LoadRequest {
            assets: self.config.assets.clone(),
            placement: self.config.model.clone(),
            presentation: self.config.presentation.clone(),
        };
        log::info!(
            "Loading environment {} then model {}",
            request.assets.environment.display(),
            request.assets.model.display()
        );
        if let Err(err) = loading::spawn(self.proxy.clone(), request) {
            log::error!("Failed to start asset loader: {}", err);
            self.fail_loading(err.to_string());
        }
    }

    fn fail_loading(&mut self, message: String) {
        self.phase = LoadPhase::Failed(message.clone());
        show_error_dialog("Failed to load scene", &message);
    }

    fn viewport(&self) -> Viewport {
        let size = match (&self.renderer, &self.window) {
            (Some(renderer), _) => renderer.size(),
            (None, Some(window)) => window.inner_size(),
            (None, None) => PhysicalSize::new(0, 0),
        };
        Viewport::new(size.width, size.height)
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size);
        }
        self.camera.set_viewport(new_size.width, new_size.height);
    }

    fn handle_cursor_moved(&mut self, sample: PointerSample) {
        if matches!(self.phase, LoadPhase::Ready) {
            match self.input.handle_cursor(sample) {
                Some(Drag::Rotate(delta)) => self.controls.rotate(delta),
                Some(Drag::Pan(delta)) => self.controls.pan(delta),
                None => {}
            }
        }
        let viewport = self.viewport();
        self.hover.handle_pointer_move(
            sample,
            viewport,
            Some(&self.camera),
            self.model.get(),
            &mut self.tooltip,
        );
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(renderer), Some(egui)) =
            (self.window.as_ref(), self.renderer.as_mut(), self.egui.as_mut())
        else {
            return;
        };
        self.timing.update(Some(window), Instant::now());

        let ready = matches!(self.phase, LoadPhase::Ready);
        if ready {
            self.controls
                .apply_movement(&self.input.movement(), self.timing.frame_dt);
            self.controls
                .update(&mut self.camera, renderer.size().height as f32);
        }

        let frame = OverlayFrame {
            phase: &self.phase,
            presentation: &self.config.presentation,
            tooltip: &self.tooltip,
            textures: &self.overlay_textures,
        };
        let paint = egui.run(window, |ctx| ui::draw_overlays(ctx, &frame));

        let render_start = Instant::now();
        let camera = ready.then_some(&self.camera);
        if let Err(err) = renderer.render_frame(camera, paint) {
            log::error!("Rendering stopped: {}", err);
            event_loop.exit();
            return;
        }
        self.timing
            .set_render_ms(render_start.elapsed().as_secs_f32() * 1000.0);
    }
}

fn show_error_dialog(title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        self.init_graphics(event_loop);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::DecorationsLoaded(decorations) => {
                if let Some(background) = &decorations.background {
                    if let Some(renderer) = &mut self.renderer {
                        renderer.set_background(background);
                    }
                }
                if let (Some(egui), Some(renderer)) = (&self.egui, &self.renderer) {
                    self.overlay_textures = OverlayTextures::upload(
                        egui.context(),
                        &decorations,
                        &self.config.presentation,
                        renderer.max_texture_side(),
                    );
                }
            }
            AppEvent::SceneLoaded(Ok(scene)) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.set_environment(&scene.environment);
                    renderer.set_model(&scene.model);
                }
                if self.config.camera.frame_model {
                    self.camera
                        .frame_bounds_preserve_orientation(&scene.model.bounds);
                }
                let name = scene.model.name.clone();
                if self.model.set(scene.model).is_err() {
                    log::warn!("Ignoring second scene load for '{}'", name);
                    return;
                }
                self.phase = LoadPhase::Ready;
                log::info!("Scene ready: '{}'", name);
            }
            AppEvent::SceneLoaded(Err(err)) => {
                log::error!("Failed to load scene: {}", err);
                self.fail_loading(err.to_string());
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let egui_consumed = match (&mut self.egui, &self.window) {
            (Some(egui), Some(window)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }
                if !egui_consumed {
                    self.input
                        .handle_key(event.physical_key, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
                if let Some(window) = &self.window {
                    self.target_frame_duration = timing::target_frame_duration(window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_moved(PointerSample {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }
            WindowEvent::CursorLeft { .. } => self.input.cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                if !egui_consumed || state == ElementState::Released {
                    self.input.handle_button(button, state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !egui_consumed && matches!(self.phase, LoadPhase::Ready) {
                    self.controls.zoom(input::wheel_steps(delta));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: ViewerConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, event_loop.create_proxy());
    event_loop.run_app(&mut app)?;
    Ok(())
}
