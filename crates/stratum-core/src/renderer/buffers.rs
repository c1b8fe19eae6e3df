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

//! Upload-and-bind wrappers for per-draw buffer data.

use crate::renderer::api::{
    GpuDescriptorHandle, IndexBufferView, IndexFormat, ResourceDesc, ResourceState,
    ResourceUsage, VertexBufferView, ViewDesc,
};
use crate::renderer::descriptor_heap::{DescriptorHeap, HeapRegion};
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::resource::Resource;
use crate::renderer::traits::GraphicsDevice;
use crate::renderer::MeshVertex;
use bytemuck::Pod;
use std::marker::PhantomData;

/// A constant buffer holding one `T`, with its view in a shader-visible heap.
#[derive(Debug)]
pub struct ConstantBuffer<T: Pod> {
    resource: Resource,
    heap_index: u32,
    table: GpuDescriptorHandle,
    _marker: PhantomData<T>,
}

impl<T: Pod> ConstantBuffer<T> {
    /// Creates the buffer, uploads `initial`, and writes a CBV into the next slot of `region`.
    pub fn create(
        device: &dyn GraphicsDevice,
        heap: &DescriptorHeap,
        region: &mut HeapRegion,
        label: &str,
        initial: &T,
    ) -> Result<Self, RenderError> {
        let size = std::mem::size_of::<T>() as u64;
        let heap_index = region.allocate()?;
        let resource = Resource::create(
            device,
            ResourceDesc::buffer(label, size, ResourceUsage::Constant),
            ResourceState::VertexAndConstantBuffer,
        )?;
        device.write_buffer(resource.id(), 0, bytemuck::bytes_of(initial))?;
        heap.write_view(
            device,
            heap_index,
            &ViewDesc::ConstantBuffer {
                resource: resource.id(),
                size,
            },
        )?;
        Ok(Self {
            resource,
            heap_index,
            table: heap.gpu_handle(heap_index),
            _marker: PhantomData,
        })
    }

    /// Overwrites the buffer contents.
    pub fn update(&self, device: &dyn GraphicsDevice, value: &T) -> Result<(), ResourceError> {
        device.write_buffer(self.resource.id(), 0, bytemuck::bytes_of(value))
    }

    /// The descriptor table to bind.
    pub fn table(&self) -> GpuDescriptorHandle {
        self.table
    }

    /// The heap slot of the view.
    pub fn heap_index(&self) -> u32 {
        self.heap_index
    }

    /// Destroys the buffer. The heap slot stays reserved.
    pub fn release(self, device: &dyn GraphicsDevice) {
        self.resource.release(device);
    }
}

/// A vertex buffer of [`MeshVertex`] data.
#[derive(Debug)]
pub struct VertexBuffer {
    resource: Resource,
    view: VertexBufferView,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Creates the buffer and uploads `vertices`.
    pub fn create(
        device: &dyn GraphicsDevice,
        label: &str,
        vertices: &[MeshVertex],
    ) -> Result<Self, ResourceError> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let resource = Resource::create(
            device,
            ResourceDesc::buffer(label, bytes.len() as u64, ResourceUsage::Vertex),
            ResourceState::VertexAndConstantBuffer,
        )?;
        device.write_buffer(resource.id(), 0, bytes)?;
        let view = VertexBufferView {
            resource: resource.id(),
            size: bytes.len() as u64,
            stride: std::mem::size_of::<MeshVertex>() as u32,
        };
        Ok(Self {
            resource,
            view,
            vertex_count: vertices.len() as u32,
        })
    }

    /// The binding view.
    pub fn view(&self) -> VertexBufferView {
        self.view
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Destroys the buffer.
    pub fn release(self, device: &dyn GraphicsDevice) {
        self.resource.release(device);
    }
}

/// A 32-bit index buffer.
#[derive(Debug)]
pub struct IndexBuffer {
    resource: Resource,
    view: IndexBufferView,
    index_count: u32,
}

impl IndexBuffer {
    /// Creates the buffer and uploads `indices`.
    pub fn create(
        device: &dyn GraphicsDevice,
        label: &str,
        indices: &[u32],
    ) -> Result<Self, ResourceError> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let resource = Resource::create(
            device,
            ResourceDesc::buffer(label, bytes.len() as u64, ResourceUsage::Index),
            ResourceState::IndexBuffer,
        )?;
        device.write_buffer(resource.id(), 0, bytes)?;
        let view = IndexBufferView {
            resource: resource.id(),
            size: bytes.len() as u64,
            format: IndexFormat::Uint32,
        };
        Ok(Self {
            resource,
            view,
            index_count: indices.len() as u32,
        })
    }

    /// The binding view.
    pub fn view(&self) -> IndexBufferView {
        self.view
    }

    /// Number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Destroys the buffer.
    pub fn release(self, device: &dyn GraphicsDevice) {
        self.resource.release(device);
    }
}
