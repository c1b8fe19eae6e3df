//! The windowed run: a `winit` event loop driving the renderer.

use stratum_agents::Renderer;
use stratum_core::config::RenderTechnique;
use stratum_core::platform::{Key, Window};
use stratum_core::ApplicationData;
use stratum_infra::platform::input::translate_key;
use stratum_infra::{ShaderWatcher, WgpuBackend, WinitWindow, WinitWindowBuilder};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

/// State owned by the event loop.
struct App {
    data: ApplicationData,
    window: Option<WinitWindow>,
    renderer: Option<Renderer>,
    _watcher: Option<ShaderWatcher>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(data: ApplicationData) -> Self {
        Self {
            data,
            window: None,
            renderer: None,
            _watcher: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_data = &self.data.window_data;
        let window = WinitWindowBuilder::new()
            .with_title(window_data.title.clone())
            .with_dimensions(window_data.width, window_data.height)
            .build(event_loop)?;
        let (width, height) = window.inner_size();

        let mut backend = WgpuBackend::new(window.clone_handle_arc());
        let renderer = crate::create_renderer(&mut backend, &self.data, width, height)?;
        self._watcher = crate::watch_shaders(&self.data, &renderer);
        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Stops the loop and keeps the first error for `run` to return.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, key: Key) {
        match key {
            Key::Escape => {
                log::info!("Escape pressed, exiting");
                event_loop.exit();
            }
            Key::F5 => {
                if let Some(renderer) = &self.renderer {
                    log::info!("Reload requested");
                    renderer.request_reload();
                }
            }
            Key::Tab => {
                let render_data = &mut self.data.render_data;
                render_data.technique = match render_data.technique {
                    RenderTechnique::Forward => RenderTechnique::Deferred,
                    RenderTechnique::Deferred => RenderTechnique::Forward,
                };
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        log::info!("Creating window and renderer...");
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.winit_id() != id {
            return;
        }
        window.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting event loop...");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(err) = renderer.resize(size.width, size.height) {
                        self.fail(event_loop, err.into());
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                if let Some(key) = translate_key(event.physical_key) {
                    self.on_key(event_loop, key);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(err) = renderer.render_frame(&mut self.data) {
                        self.fail(event_loop, err.into());
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

pub fn run(data: ApplicationData) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(data);
    event_loop.run_app(&mut app)?;

    if let Some(renderer) = app.renderer.take() {
        renderer.shutdown()?;
    }
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
