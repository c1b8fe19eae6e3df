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

//! The render core: the API-shaped GPU model, its primitives, the render
//! context, the pass contract, and the cascade math.

pub mod api;
pub mod buffers;
pub mod constants;
pub mod context;
pub mod descriptor_heap;
pub mod device;
pub mod error;
pub mod fence;
pub mod pass;
pub mod pass_graph;
pub mod resource;
pub mod shadow;
pub mod targets;
#[cfg(test)]
pub(crate) mod test_device;
pub mod traits;

pub use self::buffers::{ConstantBuffer, IndexBuffer, VertexBuffer};
pub use self::constants::{
    CascadeConstants, FrameConstants, GpuPointLight, MeshVertex, ObjectConstants, PassParams,
    CASCADE_COUNT, MAX_POINT_LIGHTS,
};
pub use self::context::{ContextSettings, RenderContext, DEPTH_INPUT, SHADOW_MAP_INPUT};
pub use self::descriptor_heap::{DescriptorHeap, HeapRegion};
pub use self::device::{Device, DeviceConfig};
pub use self::error::{DescriptorError, PipelineError, RenderError, ResourceError, ShaderError};
pub use self::fence::Fence;
pub use self::pass::{DrawItem, FrameData, RenderPass};
pub use self::pass_graph::{sort_passes, PassGraphError};
pub use self::resource::Resource;
pub use self::shadow::{compute_cascades, Cascade, CascadeCamera, CascadeSet};
pub use self::targets::{DepthBuffer, RenderTarget, RenderTargetTexture};
pub use self::traits::{GraphicsBackend, GraphicsDevice};
