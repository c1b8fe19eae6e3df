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

//! Pipeline-state descriptions: shaders, root signature, and fixed-function state.

use super::format::Format;
use super::handle::ShaderId;
use super::resource::TextureKind;

/// The programmable stage a shader module is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Pixel (fragment) stage.
    Pixel,
    /// Compute stage.
    Compute,
    /// Geometry stage.
    Geometry,
}

impl ShaderStage {
    /// The entry point the engine's shaders use for this stage.
    pub fn default_entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Pixel => "fs_main",
            ShaderStage::Compute => "cs_main",
            ShaderStage::Geometry => "gs_main",
        }
    }
}

/// Shader text handed to [`GraphicsDevice::compile_shader`](crate::renderer::traits::GraphicsDevice::compile_shader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// The path the source was read from, used in diagnostics.
    pub path: String,
    /// The stage the module is compiled for.
    pub stage: ShaderStage,
    /// The entry point function name.
    pub entry_point: String,
    /// The WGSL source text.
    pub code: String,
}

/// One slot of a root signature. Every slot is a descriptor table of one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootParameter {
    /// A table holding one constant-buffer view.
    ConstantBuffer,
    /// A table holding one shader-resource view, paired with a static sampler.
    ShaderResource(TextureKind),
}

/// Which triangle faces are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// Keep every triangle.
    None,
    /// Discard front faces.
    Front,
    /// Discard back faces.
    #[default]
    Back,
}

/// Comparison used by depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// Pass if the incoming value is smaller.
    #[default]
    Less,
    /// Pass if the incoming value is smaller or equal.
    LessEqual,
    /// Pass if the values are equal.
    Equal,
    /// Always pass.
    Always,
}

/// Output-merger blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Overwrite the target.
    #[default]
    Opaque,
    /// `src + dst`.
    Additive,
    /// Classic `src * a + dst * (1 - a)`.
    AlphaBlend,
}

/// Rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterizerState {
    /// Face culling.
    pub cull_mode: CullMode,
    /// Constant depth bias, in depth units.
    pub depth_bias: i32,
    /// Slope-scaled depth bias.
    pub slope_scaled_depth_bias: f32,
}

/// Depth-stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Whether depth testing is enabled.
    pub test_enabled: bool,
    /// Whether passing fragments write depth.
    pub write_enabled: bool,
    /// The depth comparison.
    pub compare: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: true,
            write_enabled: true,
            compare: CompareFunction::Less,
        }
    }
}

impl DepthState {
    /// Depth test and write disabled.
    pub const DISABLED: DepthState = DepthState {
        test_enabled: false,
        write_enabled: false,
        compare: CompareFunction::Always,
    };
}

/// The vertex input a pipeline expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexLayout {
    /// No vertex buffer, vertices are generated from the vertex index.
    #[default]
    None,
    /// Interleaved [`MeshVertex`](crate::renderer::MeshVertex) data.
    Mesh,
}

/// The fixed-function part of a pipeline, shared by every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Formats of the bound render targets, in slot order.
    pub render_target_formats: Vec<Format>,
    /// Format of the depth attachment, if any.
    pub depth_format: Option<Format>,
    /// Rasterizer state.
    pub rasterizer: RasterizerState,
    /// Blending applied to every render target.
    pub blend: BlendMode,
    /// Depth-stencil state.
    pub depth: DepthState,
    /// MSAA sample count.
    pub sample_count: u32,
    /// Vertex input.
    pub vertex_layout: VertexLayout,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_target_formats: Vec::new(),
            depth_format: None,
            rasterizer: RasterizerState::default(),
            blend: BlendMode::Opaque,
            depth: DepthState::DISABLED,
            sample_count: 1,
            vertex_layout: VertexLayout::None,
        }
    }
}

/// Parameters for [`GraphicsDevice::create_pipeline`](crate::renderer::traits::GraphicsDevice::create_pipeline).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    /// A debug label.
    pub label: String,
    /// The compiled vertex shader.
    pub vertex_shader: ShaderId,
    /// The compiled pixel shader. `None` for depth-only pipelines.
    pub pixel_shader: Option<ShaderId>,
    /// The root signature, one entry per slot.
    pub root_parameters: Vec<RootParameter>,
    /// Fixed-function state.
    pub config: PipelineConfig,
}
