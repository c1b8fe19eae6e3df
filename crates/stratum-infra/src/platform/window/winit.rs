// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A `winit`-based implementation of the engine's `Window` trait.

use crate::platform::input::{translate_window_event, InputChange};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use stratum_core::platform::{Key, StratumWindowHandle, Window as StratumWindow};
use winit::{
    dpi::LogicalSize, error::OsError, event::WindowEvent, event_loop::ActiveEventLoop,
    window::Window,
};

#[derive(Debug, Default)]
struct InputState {
    pressed: HashSet<Key>,
    cursor: Option<(f64, f64)>,
}

/// A wrapper around a `winit::window::Window` that implements the engine's `Window` trait.
///
/// Key and cursor state is fed by [`handle_event`](Self::handle_event) from the
/// event loop and polled by the application once per frame. Clones share the
/// window and its input state.
#[derive(Debug, Clone)]
pub struct WinitWindow {
    inner: Arc<Window>,
    input: Arc<Mutex<InputState>>,
}

/// A builder for creating `WinitWindow` instances.
pub struct WinitWindowBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl WinitWindowBuilder {
    /// Creates a new `WinitWindowBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            title: "Stratum".to_string(),
            width: 1280,
            height: 720,
        }
    }

    /// Sets the title of the window to be built.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial inner dimensions of the window to be built.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builds the `WinitWindow` using the provided `winit` event loop.
    ///
    /// # Errors
    /// Returns an `OsError` if the underlying `winit` window creation fails.
    pub fn build(self, event_loop: &ActiveEventLoop) -> Result<WinitWindow, OsError> {
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.title,
            self.width,
            self.height
        );

        let window_attributes = Window::default_attributes()
            .with_title(self.title)
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_visible(true);

        let window = event_loop.create_window(window_attributes)?;

        log::info!("Winit window created successfully (id: {:?}).", window.id());
        Ok(WinitWindow {
            inner: Arc::new(window),
            input: Arc::new(Mutex::new(InputState::default())),
        })
    }
}

impl Default for WinitWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WinitWindow {
    /// Updates the key and cursor state from a window event.
    pub fn handle_event(&self, event: &WindowEvent) {
        let Some(change) = translate_window_event(event) else {
            return;
        };
        let Ok(mut input) = self.input.lock() else {
            return;
        };
        match change {
            InputChange::KeyPressed(key) => {
                input.pressed.insert(key);
            }
            InputChange::KeyReleased(key) => {
                input.pressed.remove(&key);
            }
            InputChange::CursorMoved(x, y) => input.cursor = Some((x, y)),
            InputChange::CursorLeft => input.cursor = None,
        }
    }

    /// The `winit` window id, for matching events.
    pub fn winit_id(&self) -> winit::window::WindowId {
        self.inner.id()
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.inner.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.inner.display_handle()
    }
}

impl StratumWindow for WinitWindow {
    fn inner_size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    fn scale_factor(&self) -> f64 {
        self.inner.scale_factor()
    }

    fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    fn clone_handle_arc(&self) -> StratumWindowHandle {
        self.inner.clone()
    }

    /// Returns a stable, unique identifier for the window.
    fn id(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.inner.id().hash(&mut hasher);
        hasher.finish()
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.input
            .lock()
            .map(|input| input.pressed.contains(&key))
            .unwrap_or(false)
    }

    fn cursor_position(&self) -> Option<(f64, f64)> {
        self.input.lock().ok().and_then(|input| input.cursor)
    }
}
