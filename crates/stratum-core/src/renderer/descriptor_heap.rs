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

//! Fixed-capacity descriptor heaps and the bounded regions carved out of them.

use crate::renderer::api::{
    CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapId, DescriptorHeapInfo,
    DescriptorHeapType, GpuDescriptorHandle, ViewDesc,
};
use crate::renderer::error::{DescriptorError, RenderError, ResourceError};
use crate::renderer::traits::GraphicsDevice;

/// A hand-indexed table of view descriptors.
///
/// The heap only maps an index to a handle. Which index belongs to whom is
/// decided by the [`HeapRegion`]s its owner carves out of it.
#[derive(Debug, Clone)]
pub struct DescriptorHeap {
    id: DescriptorHeapId,
    heap_type: DescriptorHeapType,
    capacity: u32,
    shader_visible: bool,
    cpu_base: CpuDescriptorHandle,
    gpu_base: GpuDescriptorHandle,
    increment: u32,
}

impl DescriptorHeap {
    /// Creates a heap of `capacity` descriptors on `device`.
    ///
    /// # Errors
    ///
    /// A zero capacity or a device failure is a configuration error the
    /// renderer cannot recover from; callers propagate it up to process exit.
    pub fn initialize(
        device: &dyn GraphicsDevice,
        heap_type: DescriptorHeapType,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<Self, RenderError> {
        if capacity == 0 {
            return Err(DescriptorError::ZeroCapacity { heap_type }.into());
        }
        let info = device.create_descriptor_heap(&DescriptorHeapDesc {
            heap_type,
            capacity,
            shader_visible,
        })?;
        log::debug!(
            "Created {heap_type:?} descriptor heap: {capacity} slots, increment {} bytes",
            info.increment
        );
        Ok(Self::from_info(info, heap_type, capacity, shader_visible))
    }

    /// Builds a heap from base addresses reported by a backend.
    pub fn from_info(
        info: DescriptorHeapInfo,
        heap_type: DescriptorHeapType,
        capacity: u32,
        shader_visible: bool,
    ) -> Self {
        Self {
            id: info.id,
            heap_type,
            capacity,
            shader_visible,
            cpu_base: info.cpu_base,
            gpu_base: info.gpu_base,
            increment: info.increment,
        }
    }

    /// The backend handle of the heap.
    pub fn id(&self) -> DescriptorHeapId {
        self.id
    }

    /// The kind of views stored in the heap.
    pub fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    /// Number of descriptors.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether shaders can index the heap.
    pub fn is_shader_visible(&self) -> bool {
        self.shader_visible
    }

    /// Distance in bytes between two descriptors.
    pub fn descriptor_size(&self) -> u32 {
        self.increment
    }

    /// CPU handle of descriptor `index`: `cpu_base + index * descriptor_size`.
    ///
    /// The index is not checked against the capacity. Bounded allocation is
    /// the job of [`HeapRegion`].
    pub fn cpu_handle(&self, index: u32) -> CpuDescriptorHandle {
        self.cpu_base.offset(index, self.increment)
    }

    /// GPU handle of descriptor `index`: `gpu_base + index * descriptor_size`.
    ///
    /// Unchecked, like [`cpu_handle`](Self::cpu_handle).
    pub fn gpu_handle(&self, index: u32) -> GpuDescriptorHandle {
        self.gpu_base.offset(index, self.increment)
    }

    /// Writes `view` into descriptor `index`.
    pub fn write_view(
        &self,
        device: &dyn GraphicsDevice,
        index: u32,
        view: &ViewDesc,
    ) -> Result<(), ResourceError> {
        device.create_view(self.id, self.cpu_handle(index), view)
    }
}

/// A contiguous index range of a heap with a monotonic allocation counter.
///
/// There is no free list: slots are handed out once and reused only by
/// rewriting the view in place (on resize, for example).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapRegion {
    name: &'static str,
    start: u32,
    end: u32,
    next: u32,
}

impl HeapRegion {
    /// Declares the region `[start, end)` of `heap`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::RegionOutOfHeap`] if the range does not fit in the heap.
    pub fn new(
        name: &'static str,
        heap: &DescriptorHeap,
        start: u32,
        end: u32,
    ) -> Result<Self, DescriptorError> {
        if end > heap.capacity() || start > end {
            return Err(DescriptorError::RegionOutOfHeap {
                region: name,
                end,
                heap_capacity: heap.capacity(),
            });
        }
        Ok(Self {
            name,
            start,
            end,
            next: start,
        })
    }

    /// Hands out the next free index of the region.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::RegionExhausted`] once the high-water mark
    /// reaches the end of the region. Nothing is written past it.
    pub fn allocate(&mut self) -> Result<u32, DescriptorError> {
        if self.next >= self.end {
            return Err(DescriptorError::RegionExhausted {
                region: self.name,
                capacity: self.capacity(),
            });
        }
        let index = self.next;
        self.next += 1;
        Ok(index)
    }

    /// Number of slots in the region.
    pub fn capacity(&self) -> u32 {
        self.end - self.start
    }

    /// Number of slots handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next - self.start
    }

    /// Returns the region name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap(capacity: u32) -> DescriptorHeap {
        DescriptorHeap::from_info(
            DescriptorHeapInfo {
                id: DescriptorHeapId(1),
                cpu_base: CpuDescriptorHandle { ptr: 0x1000 },
                gpu_base: GpuDescriptorHandle { ptr: 0xFF00_0000 },
                increment: 32,
            },
            DescriptorHeapType::CbvSrvUav,
            capacity,
            true,
        )
    }

    #[test]
    fn handle_arithmetic_is_base_plus_index_times_size() {
        let heap = heap(16);
        for index in 0..16 {
            assert_eq!(heap.cpu_handle(index).ptr, 0x1000 + u64::from(index) * 32);
            assert_eq!(heap.gpu_handle(index).ptr, 0xFF00_0000 + u64::from(index) * 32);
            assert_eq!(
                heap.gpu_handle(index).ptr - 0xFF00_0000,
                heap.cpu_handle(index).ptr - 0x1000
            );
        }
    }

    #[test]
    fn handle_arithmetic_does_not_check_capacity() {
        let heap = heap(4);
        assert_eq!(heap.cpu_handle(10).ptr, 0x1000 + 10 * 32);
    }

    #[test]
    fn region_allocates_monotonically_until_exhausted() {
        let heap = heap(16);
        let mut region = HeapRegion::new("textures", &heap, 12, 15).unwrap();
        assert_eq!(region.allocate(), Ok(12));
        assert_eq!(region.allocate(), Ok(13));
        assert_eq!(region.allocate(), Ok(14));
        assert_eq!(
            region.allocate(),
            Err(DescriptorError::RegionExhausted {
                region: "textures",
                capacity: 3
            })
        );
        assert_eq!(region.allocated(), 3);
    }

    #[test]
    fn region_must_fit_in_heap() {
        let heap = heap(8);
        assert!(matches!(
            HeapRegion::new("objects", &heap, 4, 9),
            Err(DescriptorError::RegionOutOfHeap { end: 9, .. })
        ));
    }
}
