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

//! The render pass contract and the per-frame data passes draw from.

use crate::config::RenderPassData;
use crate::renderer::api::{GpuDescriptorHandle, IndexBufferView, VertexBufferView};
use crate::renderer::context::RenderContext;
use crate::renderer::error::RenderError;
use crate::renderer::shadow::CascadeSet;

/// One indexed draw of one sub-mesh of one enabled model instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    /// Object constants table (root slot 1).
    pub object_table: GpuDescriptorHandle,
    /// Albedo texture table, bound after the pass inputs.
    pub albedo_table: GpuDescriptorHandle,
    /// Vertex buffer of the mesh.
    pub vertex_buffer: VertexBufferView,
    /// Index buffer of the mesh.
    pub index_buffer: IndexBufferView,
    /// First index of the sub-mesh.
    pub first_index: u32,
    /// Index count of the sub-mesh.
    pub index_count: u32,
    /// Base vertex of the sub-mesh.
    pub base_vertex: i32,
}

/// Everything a pass needs beyond the render context for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameData<'a> {
    /// Mesh draws, in scene order.
    pub draws: &'a [DrawItem],
    /// This frame's shadow cascades.
    pub cascades: &'a CascadeSet,
    /// Cube map table for the sky, if one was loaded.
    pub skybox: Option<GpuDescriptorHandle>,
}

/// A stage of the frame pipeline.
///
/// The lifecycle is `initialize` once, `render` every frame (re-initializing
/// first when a reload was requested), then `shutdown`. Passes never keep
/// references to context resources across frames; they look targets up by
/// name every time they render.
pub trait RenderPass {
    /// The factory name of the pass.
    fn name(&self) -> &str;

    /// The configured wiring.
    fn data(&self) -> &RenderPassData;

    /// Creates output textures, compiles shaders, and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Shader and pipeline failures are fatal and are not retried.
    fn initialize(&mut self, context: &mut RenderContext) -> Result<(), RenderError>;

    /// Marks the pass for re-initialization at its next `render`.
    fn request_reload(&mut self);

    /// Records the pass into the shared command list.
    fn render(&mut self, context: &mut RenderContext, frame: &FrameData<'_>)
        -> Result<(), RenderError>;

    /// Releases the pipeline and any pass-owned resources.
    fn shutdown(&mut self, context: &mut RenderContext);
}
