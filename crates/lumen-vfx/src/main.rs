mod app;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, WindowAttributes, WindowId};

use app::App;

struct LumenApp {
    app: Option<App>,
    effect_path: Option<PathBuf>,
}

impl LumenApp {
    fn new(effect_path: Option<PathBuf>) -> Self {
        Self {
            app: None,
            effect_path,
        }
    }
}

impl ApplicationHandler for LumenApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("Lumen VFX")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match App::new(window, self.effect_path.as_deref()) {
            Ok(app) => {
                app.window.request_redraw();
                self.app = Some(app);
                log::info!("Lumen VFX initialized");
            }
            Err(e) => {
                log::error!("Failed to initialize app: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = self.app.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                app.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => {
                    app.shutdown();
                    event_loop.exit();
                }
                KeyCode::KeyF => {
                    let window = &app.window;
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                    } else {
                        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                    }
                }
                KeyCode::Space => app.trigger_bursts(),
                KeyCode::KeyP => app.toggle_emitting(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                app.update();

                match app.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let w = app.gpu.surface_config.width;
                        let h = app.gpu.surface_config.height;
                        app.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory");
                        app.shutdown();
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {e}");
                    }
                }

                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Optional effect file; the built-in demo effect otherwise.
    let effect_path = std::env::args_os().nth(1).map(PathBuf::from);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LumenApp::new(effect_path);
    event_loop.run_app(&mut app)?;

    Ok(())
}
