//! Firesteel renderer bring-up demo.
//!
//! Opens a window, bootstraps the Vulkan render context, rebuilds the
//! swapchain on resize, and tears everything down in order on close.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::sync::Arc;

use anyhow::Context as _;
use firesteel_gpu::{ContextConfig, RenderContext};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Firesteel viewer starting...");

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut viewer = Viewer {
        config: ContextConfig::new("firesteel_app").with_size(WIDTH, HEIGHT),
        state: None,
    };

    event_loop.run_app(&mut viewer)?;
    Ok(())
}

/// Application handler driving the bring-up demo.
struct Viewer {
    config: ContextConfig,
    state: Option<ViewerState>,
}

/// Live window and render context.
struct ViewerState {
    ctx: RenderContext,
    // Window must outlive the context's surface; the context drops first.
    #[allow(dead_code)]
    window: Arc<Window>,
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                let bundle = state.ctx.swapchain();
                info!(
                    "Renderer ready: {}x{}, {} image(s), format {:?}, queue families {:?}",
                    bundle.extent.width,
                    bundle.extent.height,
                    bundle.frames.len(),
                    bundle.format,
                    state.ctx.queue_families(),
                );
                self.state = Some(state);
            }
            Err(e) => {
                error!("Failed to initialize renderer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                // Dropping the state tears down image views, swapchain,
                // surface, device, debug messenger, and instance in order.
                self.state = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = handle_resize(state, size) {
                        error!("Resize error: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

impl Viewer {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<ViewerState> {
        let window_attrs = Window::default_attributes()
            .with_title("Hello firesteel!")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let ctx = unsafe { RenderContext::new(&self.config, window.as_ref())? };

        Ok(ViewerState { ctx, window })
    }
}

/// Rebuild the swapchain for the new extent, skipping zero-sized frames.
fn handle_resize(state: &mut ViewerState, size: PhysicalSize<u32>) -> anyhow::Result<()> {
    if size.width == 0 || size.height == 0 {
        return Ok(());
    }

    state.ctx.wait_idle()?;
    unsafe {
        state.ctx.rebuild_swapchain(size.width, size.height)?;
    }

    info!("Resized to {}x{}", size.width, size.height);
    Ok(())
}
