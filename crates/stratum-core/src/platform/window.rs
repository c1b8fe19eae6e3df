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

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// The windowing handle traits graphics backends need, combined into one
/// object-safe trait.
pub trait WindowHandle: HasWindowHandle + HasDisplayHandle {}

impl<T: HasWindowHandle + HasDisplayHandle> WindowHandle for T {}

/// A shared, thread-safe handle a backend can create a surface from.
pub type StratumWindowHandle = Arc<dyn WindowHandle + Send + Sync>;

/// Keys the sandbox polls each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Exit the application.
    Escape,
    /// Reload every pass.
    F5,
    /// Switch between the forward and deferred techniques.
    Tab,
}

/// The behavior the engine needs from a window.
///
/// Any windowing backend can implement this trait to host the renderer.
pub trait Window: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Physical size of the client area.
    fn inner_size(&self) -> (u32, u32);

    /// DPI scale factor.
    fn scale_factor(&self) -> f64;

    /// Asks the event loop for another frame.
    fn request_redraw(&self);

    /// A shared handle for surface creation.
    fn clone_handle_arc(&self) -> StratumWindowHandle;

    /// A process-unique window id.
    fn id(&self) -> u64;

    /// Whether `key` is currently held.
    fn is_key_down(&self, key: Key) -> bool;

    /// Cursor position in physical pixels, if inside the window.
    fn cursor_position(&self) -> Option<(f64, f64)>;
}
