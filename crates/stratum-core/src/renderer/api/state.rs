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

//! Resource states and the barriers that move a resource between them.

use super::handle::ResourceId;

/// The usage a GPU resource is currently declared for.
///
/// Every command that touches a resource assumes one of these states. The
/// recorded state on a [`Resource`](crate::renderer::Resource) must match
/// that assumption, otherwise a [`Barrier`] has to be recorded first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Initial state of freshly created resources.
    Common,
    /// Ready to be handed to the presentation engine.
    Present,
    /// Bound as a color attachment.
    RenderTarget,
    /// Bound as a writable depth attachment.
    DepthWrite,
    /// Bound as a read-only depth attachment.
    DepthRead,
    /// Sampled from a pixel shader.
    PixelShaderResource,
    /// Sampled from a non-pixel shader stage.
    NonPixelShaderResource,
    /// Destination of a copy or upload.
    CopyDest,
    /// Source of a copy.
    CopySource,
    /// Read as vertex or constant-buffer data.
    VertexAndConstantBuffer,
    /// Read as index data.
    IndexBuffer,
    /// Generic read state of upload-heap resources.
    GenericRead,
}

impl ResourceState {
    /// Returns `true` if a shader may sample the resource in this state.
    pub fn is_shader_readable(self) -> bool {
        matches!(
            self,
            ResourceState::PixelShaderResource | ResourceState::NonPixelShaderResource
        )
    }

    /// Returns `true` if a fixed-function output stage may write the resource in this state.
    pub fn is_writable_attachment(self) -> bool {
        matches!(self, ResourceState::RenderTarget | ResourceState::DepthWrite)
    }
}

/// A single state transition recorded on a command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    /// The resource being transitioned.
    pub resource: ResourceId,
    /// The state the resource is leaving.
    pub before: ResourceState,
    /// The state the resource is entering.
    pub after: ResourceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_and_writable_states_are_disjoint() {
        let all = [
            ResourceState::Common,
            ResourceState::Present,
            ResourceState::RenderTarget,
            ResourceState::DepthWrite,
            ResourceState::DepthRead,
            ResourceState::PixelShaderResource,
            ResourceState::NonPixelShaderResource,
            ResourceState::CopyDest,
            ResourceState::CopySource,
            ResourceState::VertexAndConstantBuffer,
            ResourceState::IndexBuffer,
            ResourceState::GenericRead,
        ];
        for state in all {
            assert!(!(state.is_shader_readable() && state.is_writable_attachment()));
        }
        assert!(ResourceState::PixelShaderResource.is_shader_readable());
        assert!(ResourceState::DepthWrite.is_writable_attachment());
    }
}
