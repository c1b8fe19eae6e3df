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

//! The editor overlay seam.

use crate::config::ApplicationData;
use crate::renderer::{RenderContext, RenderError};

/// An immediate-mode overlay drawn on top of the final image.
///
/// [`build_frame`](Self::build_frame) runs before any command is recorded and
/// may edit the application data; those edits reach the scene on the next
/// sync. [`render`](Self::render) runs after the last pass, with the back
/// buffer still in the render-target state.
pub trait EditorOverlay {
    /// Builds the widgets for this frame.
    fn build_frame(&mut self, data: &mut ApplicationData);

    /// Records the overlay draw commands.
    fn render(&mut self, context: &mut RenderContext) -> Result<(), RenderError>;
}

/// An overlay that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEditor;

impl EditorOverlay for NullEditor {
    fn build_frame(&mut self, _data: &mut ApplicationData) {}

    fn render(&mut self, _context: &mut RenderContext) -> Result<(), RenderError> {
        Ok(())
    }
}
