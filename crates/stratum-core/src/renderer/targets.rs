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

//! Render targets, depth buffers, and named render-target textures.
//!
//! Each type owns the heap slots it was given at creation. Recreating one (on
//! resize) rewrites the views in those same slots, so descriptor indices stay
//! valid for the whole process lifetime.

use crate::renderer::api::{
    CpuDescriptorHandle, Format, GpuDescriptorHandle, ResourceDesc, ResourceState,
    ResourceUsage, TextureKind, ViewDesc,
};
use crate::renderer::descriptor_heap::DescriptorHeap;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::resource::Resource;
use crate::renderer::traits::GraphicsDevice;

/// A swap-chain back buffer and its render-target view.
#[derive(Debug)]
pub struct RenderTarget {
    resource: Resource,
    back_buffer_index: u32,
    rtv_index: u32,
    rtv: CpuDescriptorHandle,
}

impl RenderTarget {
    /// Wraps back buffer `back_buffer_index` and writes its RTV into slot `rtv_index`.
    pub fn create(
        device: &dyn GraphicsDevice,
        rtv_heap: &DescriptorHeap,
        rtv_index: u32,
        back_buffer_index: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let id = device.back_buffer(back_buffer_index)?;
        let resource = Resource::from_existing(
            id,
            ResourceDesc::texture_2d(
                format!("Back Buffer {back_buffer_index}"),
                width,
                height,
                device.swap_chain_format(),
                ResourceUsage::RenderTarget,
            ),
            ResourceState::Present,
        );
        rtv_heap.write_view(
            device,
            rtv_index,
            &ViewDesc::RenderTarget {
                resource: id,
                array_layer: None,
            },
        )?;
        Ok(Self {
            resource,
            back_buffer_index,
            rtv_index,
            rtv: rtv_heap.cpu_handle(rtv_index),
        })
    }

    /// The tracked back buffer.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The tracked back buffer, mutably.
    pub fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    /// The render-target view.
    pub fn rtv(&self) -> CpuDescriptorHandle {
        self.rtv
    }

    /// The RTV heap slot.
    pub fn rtv_index(&self) -> u32 {
        self.rtv_index
    }

    /// The swap-chain buffer this target wraps.
    pub fn back_buffer_index(&self) -> u32 {
        self.back_buffer_index
    }
}

/// A depth texture with one DSV per array layer and an optional SRV.
#[derive(Debug)]
pub struct DepthBuffer {
    resource: Resource,
    label: String,
    layers: u32,
    dsv_indices: Vec<u32>,
    dsvs: Vec<CpuDescriptorHandle>,
    srv_index: u32,
    srv: GpuDescriptorHandle,
}

impl DepthBuffer {
    /// Creates a `Depth32Float` texture of `dsv_indices.len()` layers.
    ///
    /// A DSV is written into every slot of `dsv_indices` (one per layer) and an
    /// SRV into slot `srv_index` of the shader-visible heap. Layered buffers are
    /// viewed as [`TextureKind::DepthArray`].
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        device: &dyn GraphicsDevice,
        dsv_heap: &DescriptorHeap,
        dsv_indices: Vec<u32>,
        srv_heap: &DescriptorHeap,
        srv_index: u32,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let layers = dsv_indices.len().max(1) as u32;
        let resource = Self::create_resource(device, label, width, height, layers)?;
        let buffer = Self {
            resource,
            label: label.to_string(),
            layers,
            dsvs: dsv_indices.iter().map(|i| dsv_heap.cpu_handle(*i)).collect(),
            dsv_indices,
            srv_index,
            srv: srv_heap.gpu_handle(srv_index),
        };
        buffer.write_views(device, dsv_heap, srv_heap)?;
        Ok(buffer)
    }

    fn create_resource(
        device: &dyn GraphicsDevice,
        label: &str,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<Resource, ResourceError> {
        Resource::create(
            device,
            ResourceDesc::texture_array(
                label,
                width.max(1),
                height.max(1),
                layers,
                Format::Depth32Float,
                ResourceUsage::DepthStencil,
            ),
            ResourceState::DepthWrite,
        )
    }

    fn write_views(
        &self,
        device: &dyn GraphicsDevice,
        dsv_heap: &DescriptorHeap,
        srv_heap: &DescriptorHeap,
    ) -> Result<(), ResourceError> {
        let layered = self.layers > 1;
        for (layer, index) in self.dsv_indices.iter().enumerate() {
            dsv_heap.write_view(
                device,
                *index,
                &ViewDesc::DepthStencil {
                    resource: self.resource.id(),
                    array_layer: layered.then_some(layer as u32),
                },
            )?;
        }
        srv_heap.write_view(
            device,
            self.srv_index,
            &ViewDesc::ShaderResource {
                resource: self.resource.id(),
                kind: if layered {
                    TextureKind::DepthArray
                } else {
                    TextureKind::Depth
                },
            },
        )
    }

    /// Destroys the texture, keeping the heap slots.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        device.destroy_resource(self.resource.id());
    }

    /// Creates a new texture at `(width, height)` and rewrites the views in place.
    ///
    /// The previous texture must have been [`release`](Self::release)d.
    pub fn recreate(
        &mut self,
        device: &dyn GraphicsDevice,
        dsv_heap: &DescriptorHeap,
        srv_heap: &DescriptorHeap,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.resource = Self::create_resource(device, &self.label, width, height, self.layers)?;
        self.write_views(device, dsv_heap, srv_heap)?;
        Ok(())
    }

    /// The tracked texture.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The tracked texture, mutably.
    pub fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    /// The DSV of `layer`.
    pub fn dsv(&self, layer: u32) -> CpuDescriptorHandle {
        self.dsvs
            .get(layer as usize)
            .copied()
            .unwrap_or_default()
    }

    /// The SRV descriptor table.
    pub fn srv(&self) -> GpuDescriptorHandle {
        self.srv
    }

    /// Number of array layers.
    pub fn layers(&self) -> u32 {
        self.layers
    }
}

/// A named, screen-sized color texture written by one pass and read by later ones.
#[derive(Debug)]
pub struct RenderTargetTexture {
    name: String,
    format: Format,
    resource: Resource,
    rtv_index: u32,
    rtv: CpuDescriptorHandle,
    srv_index: u32,
    srv: GpuDescriptorHandle,
}

impl RenderTargetTexture {
    /// Creates the texture and writes its RTV and SRV.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        device: &dyn GraphicsDevice,
        rtv_heap: &DescriptorHeap,
        rtv_index: u32,
        srv_heap: &DescriptorHeap,
        srv_index: u32,
        name: &str,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let resource = Self::create_resource(device, name, format, width, height)?;
        let texture = Self {
            name: name.to_string(),
            format,
            resource,
            rtv_index,
            rtv: rtv_heap.cpu_handle(rtv_index),
            srv_index,
            srv: srv_heap.gpu_handle(srv_index),
        };
        texture.write_views(device, rtv_heap, srv_heap)?;
        Ok(texture)
    }

    fn create_resource(
        device: &dyn GraphicsDevice,
        name: &str,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Resource, ResourceError> {
        Resource::create(
            device,
            ResourceDesc::texture_2d(
                name,
                width.max(1),
                height.max(1),
                format,
                ResourceUsage::RenderTarget,
            ),
            ResourceState::PixelShaderResource,
        )
    }

    fn write_views(
        &self,
        device: &dyn GraphicsDevice,
        rtv_heap: &DescriptorHeap,
        srv_heap: &DescriptorHeap,
    ) -> Result<(), ResourceError> {
        rtv_heap.write_view(
            device,
            self.rtv_index,
            &ViewDesc::RenderTarget {
                resource: self.resource.id(),
                array_layer: None,
            },
        )?;
        srv_heap.write_view(
            device,
            self.srv_index,
            &ViewDesc::ShaderResource {
                resource: self.resource.id(),
                kind: TextureKind::Color,
            },
        )
    }

    /// Destroys the texture, keeping the heap slots.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        device.destroy_resource(self.resource.id());
    }

    /// Creates a new texture at `(width, height)` and rewrites the views in place.
    pub fn recreate(
        &mut self,
        device: &dyn GraphicsDevice,
        rtv_heap: &DescriptorHeap,
        srv_heap: &DescriptorHeap,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.resource = Self::create_resource(device, &self.name, self.format, width, height)?;
        self.write_views(device, rtv_heap, srv_heap)?;
        Ok(())
    }

    /// The pool key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The texel format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The tracked texture.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The tracked texture, mutably.
    pub fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    /// The render-target view.
    pub fn rtv(&self) -> CpuDescriptorHandle {
        self.rtv
    }

    /// The SRV descriptor table.
    pub fn srv(&self) -> GpuDescriptorHandle {
        self.srv
    }
}
