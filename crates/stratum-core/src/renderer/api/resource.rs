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

//! Descriptors for creating resources, views, and descriptor heaps.

use super::format::Format;
use super::handle::{CpuDescriptorHandle, DescriptorHeapId, GpuDescriptorHandle, ResourceId};

/// The shape of a GPU resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDimension {
    /// A linear buffer of `size` bytes.
    Buffer {
        /// Size in bytes.
        size: u64,
    },
    /// A 2D texture, optionally layered.
    Texture2D {
        /// Width in texels.
        width: u32,
        /// Height in texels.
        height: u32,
        /// Number of array layers (6 for cubemaps).
        array_layers: u32,
        /// Texel format.
        format: Format,
    },
}

/// How a resource is going to be used over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    /// A constant buffer written from the CPU every frame.
    Constant,
    /// A vertex buffer.
    Vertex,
    /// An index buffer.
    Index,
    /// A texture sampled by shaders and filled by uploads.
    Sampled,
    /// A color attachment that is also sampled by later passes.
    RenderTarget,
    /// A depth attachment that is also sampled by later passes.
    DepthStencil,
}

/// Parameters for [`GraphicsDevice::create_resource`](crate::renderer::traits::GraphicsDevice::create_resource).
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDesc {
    /// A debug label.
    pub label: String,
    /// Shape and format of the resource.
    pub dimension: ResourceDimension,
    /// Intended usage.
    pub usage: ResourceUsage,
}

impl ResourceDesc {
    /// Describes a buffer.
    pub fn buffer(label: impl Into<String>, size: u64, usage: ResourceUsage) -> Self {
        Self {
            label: label.into(),
            dimension: ResourceDimension::Buffer { size },
            usage,
        }
    }

    /// Describes a single-layer 2D texture.
    pub fn texture_2d(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: Format,
        usage: ResourceUsage,
    ) -> Self {
        Self::texture_array(label, width, height, 1, format, usage)
    }

    /// Describes a layered 2D texture.
    pub fn texture_array(
        label: impl Into<String>,
        width: u32,
        height: u32,
        array_layers: u32,
        format: Format,
        usage: ResourceUsage,
    ) -> Self {
        Self {
            label: label.into(),
            dimension: ResourceDimension::Texture2D {
                width,
                height,
                array_layers,
                format,
            },
            usage,
        }
    }

    /// Returns the `(width, height)` of a texture, or `(size, 1)` for buffers.
    pub fn extent(&self) -> (u32, u32) {
        match self.dimension {
            ResourceDimension::Buffer { size } => (size as u32, 1),
            ResourceDimension::Texture2D { width, height, .. } => (width, height),
        }
    }

    /// Returns the texel format of a texture.
    pub fn format(&self) -> Option<Format> {
        match self.dimension {
            ResourceDimension::Buffer { .. } => None,
            ResourceDimension::Texture2D { format, .. } => Some(format),
        }
    }
}

/// How a shader samples a texture bound through a descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// A filterable color texture.
    Color,
    /// A single depth texture.
    Depth,
    /// A layered depth texture compared against (cascaded shadow maps).
    DepthArray,
    /// A six-layer cubemap.
    Cube,
}

/// A view written into a descriptor heap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDesc {
    /// A constant-buffer view covering `size` bytes.
    ConstantBuffer {
        /// The buffer being viewed.
        resource: ResourceId,
        /// Size in bytes.
        size: u64,
    },
    /// A shader-resource view.
    ShaderResource {
        /// The texture being viewed.
        resource: ResourceId,
        /// How the shader samples it.
        kind: TextureKind,
    },
    /// A render-target view, optionally targeting a single array layer.
    RenderTarget {
        /// The texture being viewed.
        resource: ResourceId,
        /// The array layer, or `None` for layer 0 of a plain texture.
        array_layer: Option<u32>,
    },
    /// A depth-stencil view, optionally targeting a single array layer.
    DepthStencil {
        /// The texture being viewed.
        resource: ResourceId,
        /// The array layer, or `None` for layer 0 of a plain texture.
        array_layer: Option<u32>,
    },
}

/// The kind of views a descriptor heap holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapType {
    /// Constant-buffer and shader-resource views.
    CbvSrvUav,
    /// Render-target views.
    Rtv,
    /// Depth-stencil views.
    Dsv,
}

/// Parameters for creating a descriptor heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapDesc {
    /// Kind of views stored in the heap.
    pub heap_type: DescriptorHeapType,
    /// Number of descriptors.
    pub capacity: u32,
    /// Whether shaders can index the heap (CBV/SRV heaps only).
    pub shader_visible: bool,
}

/// The base addresses a backend reports for a freshly created heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapInfo {
    /// The backend handle of the heap.
    pub id: DescriptorHeapId,
    /// The CPU address of descriptor 0.
    pub cpu_base: CpuDescriptorHandle,
    /// The GPU address of descriptor 0. Zero for non shader-visible heaps.
    pub gpu_base: GpuDescriptorHandle,
    /// The distance in bytes between two consecutive descriptors.
    pub increment: u32,
}
