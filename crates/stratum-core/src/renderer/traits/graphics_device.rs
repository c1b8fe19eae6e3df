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

//! Defines the `GraphicsDevice` trait, the core abstraction over a GPU.

use crate::renderer::api::{
    Command, DescriptorHeapDesc, DescriptorHeapId, DescriptorHeapInfo, CpuDescriptorHandle,
    FenceId, Format, PipelineDesc, PipelineId, ResourceDesc, ResourceId, ResourceState,
    ShaderId, ShaderSource, ViewDesc,
};
use crate::renderer::error::{PipelineError, RenderError, ResourceError, ShaderError};
use std::fmt::Debug;

/// Parameters for the swap chain created during device initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    /// Width of the back buffers in pixels.
    pub width: u32,
    /// Height of the back buffers in pixels.
    pub height: u32,
    /// Number of back buffers.
    pub buffer_count: u32,
    /// Whether presentation waits for vertical sync.
    pub vsync: bool,
}

/// A trait representing an explicit, state-tracked graphics device.
///
/// The device exposes the resource model the render core is written against:
/// resources with explicit states, descriptor heaps written by index, and a
/// recorded command stream executed in one call. Backends (the `wgpu` backend,
/// the headless recording backend) implement this trait in `stratum-infra`.
///
/// All methods take `&self`. Implementations use interior mutability so the
/// device can be shared behind an `Arc`.
pub trait GraphicsDevice: Send + Sync + Debug {
    // --- Queue & swap chain ---

    /// Creates the direct command queue.
    fn create_command_queue(&self) -> Result<(), RenderError>;

    /// Creates the swap chain for the device's window (or a virtual one when headless).
    fn create_swap_chain(&self, desc: &SwapChainDesc) -> Result<(), RenderError>;

    /// Returns the texel format of the back buffers.
    fn swap_chain_format(&self) -> Format;

    /// Returns the number of back buffers.
    fn back_buffer_count(&self) -> u32;

    /// Returns the resource backing back buffer `index`.
    ///
    /// Back buffers start in [`ResourceState::Present`].
    fn back_buffer(&self, index: u32) -> Result<ResourceId, ResourceError>;

    /// Returns the index of the back buffer the next frame renders into.
    fn current_back_buffer_index(&self) -> u32;

    /// Drops every reference the device holds to the back buffers so the swap chain can be resized.
    fn release_back_buffers(&self);

    /// Resizes the swap chain. Back buffers must have been released first.
    fn resize_swap_chain(&self, width: u32, height: u32) -> Result<(), RenderError>;

    // --- Resources ---

    /// Creates a buffer or texture in the given initial state.
    ///
    /// # Arguments
    ///
    /// * `desc` - Shape, format, and usage of the resource.
    /// * `initial_state` - The state the resource is created in.
    fn create_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
    ) -> Result<ResourceId, ResourceError>;

    /// Destroys a resource and releases its GPU memory.
    fn destroy_resource(&self, id: ResourceId);

    /// Writes bytes into a buffer at `offset`.
    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Uploads tightly packed texel rows into `layer` of a texture.
    fn write_texture(&self, id: ResourceId, layer: u32, data: &[u8]) -> Result<(), ResourceError>;

    // --- Descriptors ---

    /// Creates a descriptor heap and reports its base addresses and increment.
    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, ResourceError>;

    /// Writes a view into the descriptor at `handle`, replacing whatever it held.
    fn create_view(
        &self,
        heap: DescriptorHeapId,
        handle: CpuDescriptorHandle,
        view: &ViewDesc,
    ) -> Result<(), ResourceError>;

    // --- Shaders & pipelines ---

    /// Compiles one shader stage.
    fn compile_shader(&self, source: &ShaderSource) -> Result<ShaderId, ShaderError>;

    /// Builds a pipeline-state object and its root signature.
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineId, PipelineError>;

    /// Releases a pipeline-state object. Using it afterwards is an error.
    fn destroy_pipeline(&self, id: PipelineId);

    // --- Submission ---

    /// Executes a closed command list on the queue.
    fn execute_command_list(&self, commands: &[Command]) -> Result<(), RenderError>;

    /// Presents the current back buffer and advances to the next one.
    fn present(&self) -> Result<(), RenderError>;

    // --- Fences ---

    /// Creates a fence with the given initial completed value.
    fn create_fence(&self, initial_value: u64) -> Result<FenceId, RenderError>;

    /// Enqueues a signal of `value` on the queue, after all previously submitted work.
    fn signal_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError>;

    /// Returns the last value the GPU has reached on `fence`.
    fn fence_completed_value(&self, fence: FenceId) -> u64;

    /// Blocks the calling thread until `fence` reaches `value`. There is no timeout.
    fn wait_for_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError>;
}
