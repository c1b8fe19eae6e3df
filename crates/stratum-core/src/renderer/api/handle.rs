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

//! Opaque identifiers and descriptor handles handed out by a [`GraphicsDevice`].
//!
//! [`GraphicsDevice`]: crate::renderer::traits::GraphicsDevice

/// An opaque handle to a GPU buffer or texture owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

/// An opaque handle to a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u64);

/// An opaque handle to a pipeline-state object (pipeline + root signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub u64);

/// An opaque handle to a backend fence object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub u64);

/// An opaque handle to a backend descriptor heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHeapId(pub u64);

/// A CPU-side descriptor address, used when writing views into a heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CpuDescriptorHandle {
    /// The raw address of the descriptor.
    pub ptr: u64,
}

/// A GPU-side descriptor address, used when binding descriptor tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GpuDescriptorHandle {
    /// The raw address of the descriptor.
    pub ptr: u64,
}

impl CpuDescriptorHandle {
    /// Returns the handle `count` descriptors further, for a heap with the given increment.
    pub fn offset(self, count: u32, increment: u32) -> Self {
        Self {
            ptr: self
                .ptr
                .wrapping_add(u64::from(count).wrapping_mul(u64::from(increment))),
        }
    }
}

impl GpuDescriptorHandle {
    /// Returns the handle `count` descriptors further, for a heap with the given increment.
    pub fn offset(self, count: u32, increment: u32) -> Self {
        Self {
            ptr: self
                .ptr
                .wrapping_add(u64::from(count).wrapping_mul(u64::from(increment))),
        }
    }
}
