//! Platform layer: windowing & event loop.
//!
//! Window input updates an explicit [`OrbitInput`]; every redraw turns it
//! into a camera and hands it to the renderer.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use asset::ObjOptions;
use corelib::{orbit::OrbitInput, transform::Transform};
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Pixels per wheel "line" for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f64 = 40.0;

/// Startup configuration, filled from the command line.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub model_path: PathBuf,
    pub minimap: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 800,
            height: 500,
            model_path: PathBuf::from("assets/table.obj"),
            minimap: true,
        }
    }
}

struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    input: OrbitInput,
    /// Set when startup fails inside the event loop; returned from [`run`].
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            gpu: None,
            input: OrbitInput::new(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Billiard Table")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mut gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.config.backends,
            self.config.minimap,
        ))
        .context("Failed to initialise GPU")?;

        gpu.load_model(
            &self.config.model_path,
            &ObjOptions::default(),
            Transform::identity(),
        )
        .with_context(|| format!("Failed to load model {}", self.config.model_path.display()))?;

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        let (w, h) = gpu.size();
        let camera = self.input.camera(w as f32 / h as f32);

        match gpu.render(&camera) {
            Ok(()) => {}
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface lost ({err:?}); reconfiguring");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::Timeout) => log::warn!("Surface timeout; skipping frame"),
            Err(err) => {
                log::error!("Render error: {err:?}, exiting");
                event_loop.exit();
            }
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            log::error!("{err:#}");
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    log::info!("Escape pressed. Exiting event loop.");
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                log::debug!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.input.set_dragging(state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
                };
                self.input.scroll(lines);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open the window, load the model and run until the window closes.
pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .context("Event loop error")?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_800_by_500_with_minimap() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (800, 500));
        assert!(config.minimap);
        assert_eq!(config.model_path, PathBuf::from("assets/table.obj"));
    }
}
