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

//! The recorded command stream submitted to a [`GraphicsDevice`].
//!
//! Commands are recorded on the CPU into a [`CommandList`] whose backing storage
//! is lent by a per-frame [`CommandAllocator`], then handed to the backend in one
//! `execute_command_list` call.
//!
//! [`GraphicsDevice`]: crate::renderer::traits::GraphicsDevice

use super::handle::{
    CpuDescriptorHandle, DescriptorHeapId, GpuDescriptorHandle, PipelineId, ResourceId,
};
use super::state::Barrier;

/// The rectangle rasterization is mapped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Minimum depth.
    pub min_depth: f32,
    /// Maximum depth.
    pub max_depth: f32,
}

impl Viewport {
    /// A full-target viewport with the `[0, 1]` depth range.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

/// A vertex buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferView {
    /// The buffer.
    pub resource: ResourceId,
    /// Bound size in bytes.
    pub size: u64,
    /// Distance between two vertices.
    pub stride: u32,
}

/// An index buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferView {
    /// The buffer.
    pub resource: ResourceId,
    /// Bound size in bytes.
    pub size: u64,
    /// Index width.
    pub format: IndexFormat,
}

/// A single recorded GPU command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// One batched resource-barrier call.
    Barrier(Vec<Barrier>),
    /// Makes the given heaps visible to descriptor-table bindings.
    SetDescriptorHeaps(Vec<DescriptorHeapId>),
    /// Sets the viewport and a matching scissor rectangle.
    SetViewport(Viewport),
    /// Clears a render-target view.
    ClearRenderTarget {
        /// The view to clear.
        rtv: CpuDescriptorHandle,
        /// Clear color.
        color: [f32; 4],
    },
    /// Clears a depth-stencil view.
    ClearDepthStencil {
        /// The view to clear.
        dsv: CpuDescriptorHandle,
        /// Clear depth.
        depth: f32,
    },
    /// Binds the output-merger targets.
    SetRenderTargets {
        /// Color targets, in slot order.
        rtvs: Vec<CpuDescriptorHandle>,
        /// Depth target, if any.
        dsv: Option<CpuDescriptorHandle>,
    },
    /// Binds a pipeline-state object and its root signature.
    SetPipelineState(PipelineId),
    /// Binds a descriptor table to a root slot.
    SetRootDescriptorTable {
        /// Root slot index.
        slot: u32,
        /// GPU address of the first descriptor of the table.
        table: GpuDescriptorHandle,
    },
    /// Binds vertex buffer slot 0.
    SetVertexBuffer(VertexBufferView),
    /// Binds the index buffer.
    SetIndexBuffer(IndexBufferView),
    /// Non-indexed draw.
    Draw {
        /// Number of vertices.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Number of indices.
        index_count: u32,
        /// Number of instances.
        instance_count: u32,
        /// First index read from the index buffer.
        first_index: u32,
        /// Value added to each index.
        base_vertex: i32,
    },
    /// Opens a named debug region.
    BeginEvent(String),
    /// Closes the innermost debug region.
    EndEvent,
}

/// Backing storage for one frame's worth of commands.
///
/// Each swap-chain buffer owns one allocator. Resetting a [`CommandList`] with
/// an allocator reuses the allocator's memory for the new recording.
#[derive(Debug, Default)]
pub struct CommandAllocator {
    storage: Vec<Command>,
    resets: u64,
}

impl CommandAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a command list was reset onto this allocator.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }
}

/// A sequentially recorded list of [`Command`]s.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: Vec<Command>,
    recording: bool,
}

impl CommandList {
    /// Creates a closed, empty command list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the previous recording and opens the list on `allocator`'s storage.
    pub fn reset(&mut self, allocator: &mut CommandAllocator) {
        self.commands.clear();
        std::mem::swap(&mut self.commands, &mut allocator.storage);
        self.commands.clear();
        allocator.resets += 1;
        self.recording = true;
    }

    /// Ends the recording. The list can then be executed.
    pub fn close(&mut self) {
        self.recording = false;
    }

    /// Returns `true` between [`reset`](Self::reset) and [`close`](Self::close).
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Appends a command to the list.
    pub fn record(&mut self, command: Command) {
        debug_assert!(self.recording, "recording into a closed command list");
        self.commands.push(command);
    }

    /// Records one barrier call for all `barriers`. Does nothing for an empty batch.
    pub fn resource_barrier(&mut self, barriers: &[Barrier]) {
        if !barriers.is_empty() {
            self.record(Command::Barrier(barriers.to_vec()));
        }
    }

    /// Records a viewport change.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.record(Command::SetViewport(viewport));
    }

    /// Records a color clear.
    pub fn clear_render_target(&mut self, rtv: CpuDescriptorHandle, color: [f32; 4]) {
        self.record(Command::ClearRenderTarget { rtv, color });
    }

    /// Records a depth clear.
    pub fn clear_depth_stencil(&mut self, dsv: CpuDescriptorHandle, depth: f32) {
        self.record(Command::ClearDepthStencil { dsv, depth });
    }

    /// Records an output-merger binding.
    pub fn set_render_targets(
        &mut self,
        rtvs: &[CpuDescriptorHandle],
        dsv: Option<CpuDescriptorHandle>,
    ) {
        self.record(Command::SetRenderTargets {
            rtvs: rtvs.to_vec(),
            dsv,
        });
    }

    /// Records a pipeline binding.
    pub fn set_pipeline_state(&mut self, pipeline: PipelineId) {
        self.record(Command::SetPipelineState(pipeline));
    }

    /// Records a descriptor-table binding.
    pub fn set_root_descriptor_table(&mut self, slot: u32, table: GpuDescriptorHandle) {
        self.record(Command::SetRootDescriptorTable { slot, table });
    }

    /// Binds the vertex buffer at slot 0.
    pub fn set_vertex_buffer(&mut self, view: VertexBufferView) {
        self.record(Command::SetVertexBuffer(view));
    }

    /// Binds the index buffer.
    pub fn set_index_buffer(&mut self, view: IndexBufferView) {
        self.record(Command::SetIndexBuffer(view));
    }

    /// Records a non-indexed draw.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.record(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    /// Records an indexed draw of `index_count` indices starting at `first_index`.
    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) {
        self.record(Command::DrawIndexed {
            index_count,
            instance_count: 1,
            first_index,
            base_vertex,
        });
    }

    /// Opens a named debug region.
    pub fn begin_event(&mut self, name: impl Into<String>) {
        self.record(Command::BeginEvent(name.into()));
    }

    /// Closes the innermost debug region.
    pub fn end_event(&mut self) {
        self.record(Command::EndEvent);
    }

    /// Iterates over every individual barrier recorded so far, in order.
    pub fn barriers(&self) -> impl Iterator<Item = &Barrier> + '_ {
        self.commands.iter().flat_map(|command| match command {
            Command::Barrier(batch) => batch.as_slice(),
            _ => &[],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::ResourceState;

    #[test]
    fn reset_opens_and_clears_the_list() {
        let mut allocator = CommandAllocator::new();
        let mut list = CommandList::new();
        assert!(!list.is_recording());

        list.reset(&mut allocator);
        list.draw(3, 1);
        list.close();
        assert_eq!(list.commands().len(), 1);

        list.reset(&mut allocator);
        assert!(list.is_recording());
        assert!(list.commands().is_empty());
        assert_eq!(allocator.reset_count(), 2);
    }

    #[test]
    fn empty_barrier_batch_records_nothing() {
        let mut allocator = CommandAllocator::new();
        let mut list = CommandList::new();
        list.reset(&mut allocator);
        list.resource_barrier(&[]);
        assert!(list.commands().is_empty());
    }

    #[test]
    fn barriers_flattens_batches() {
        let mut allocator = CommandAllocator::new();
        let mut list = CommandList::new();
        list.reset(&mut allocator);
        let barrier = |id| Barrier {
            resource: ResourceId(id),
            before: ResourceState::Common,
            after: ResourceState::RenderTarget,
        };
        list.resource_barrier(&[barrier(1), barrier(2)]);
        list.draw(6, 1);
        list.resource_barrier(&[barrier(3)]);

        let ids: Vec<u64> = list.barriers().map(|b| b.resource.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
