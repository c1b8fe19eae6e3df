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

use super::fixed3_array;
use serde::{Deserialize, Serialize};

/// Which of the two configured pass lists is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTechnique {
    /// `forward_render_passes`.
    #[default]
    Forward,
    /// `deferred_render_passes`.
    Deferred,
}

/// One entry of a configured pass list.
///
/// Input and output names refer to the named render-target textures of the
/// render context, plus the reserved `depth` and `shadow_map` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPassData {
    /// Name registered in the pass factory.
    pub name: String,
    /// Textures read by the pass, bound in this order.
    #[serde(default)]
    pub input: Vec<String>,
    /// Textures written by the pass, bound in this order.
    #[serde(default)]
    pub output: Vec<String>,
    /// Vertex shader file, relative to the shader directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_shader_name: Option<String>,
    /// Pixel shader file, relative to the shader directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_shader_name: Option<String>,
    /// Compute shader file. Recorded only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_shader_name: Option<String>,
    /// Geometry shader file. Recorded only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_shader_name: Option<String>,
    /// Clear outputs before drawing. `false` draws over an earlier pass's result.
    #[serde(default = "default_true")]
    pub clear_outputs: bool,
}

fn default_true() -> bool {
    true
}

impl RenderPassData {
    /// A pass with no inputs, no outputs, and `<name>.wgsl` as both shaders.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let shader = format!("{name}.wgsl");
        Self {
            name,
            input: Vec::new(),
            output: Vec::new(),
            vertex_shader_name: Some(shader.clone()),
            pixel_shader_name: Some(shader),
            compute_shader_name: None,
            geometry_shader_name: None,
            clear_outputs: true,
        }
    }

    /// Sets the input names.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the output names.
    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Draw over the outputs instead of clearing them.
    pub fn without_clear(mut self) -> Self {
        self.clear_outputs = false;
        self
    }
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderData {
    /// Active pass list.
    pub technique: RenderTechnique,
    /// Directory shader names are resolved against.
    pub shader_directory: String,
    /// Reload every pass when a file in `shader_directory` changes.
    pub watch_shaders: bool,
    /// Edge length of every shadow cascade, in texels.
    pub shadow_map_size: u32,
    /// Back-buffer clear color.
    #[serde(with = "fixed3_array")]
    pub clear_color: [f32; 4],
    /// Passes of the forward technique.
    pub forward_render_passes: Vec<RenderPassData>,
    /// Passes of the deferred technique.
    pub deferred_render_passes: Vec<RenderPassData>,
}

impl RenderData {
    /// The pass list of the active technique.
    pub fn active_passes(&self) -> &[RenderPassData] {
        match self.technique {
            RenderTechnique::Forward => &self.forward_render_passes,
            RenderTechnique::Deferred => &self.deferred_render_passes,
        }
    }
}

impl Default for RenderData {
    fn default() -> Self {
        Self {
            technique: RenderTechnique::Forward,
            shader_directory: "assets/shaders".to_string(),
            watch_shaders: false,
            shadow_map_size: 2048,
            clear_color: [0.05, 0.05, 0.08, 1.0],
            forward_render_passes: default_forward_passes(),
            deferred_render_passes: default_deferred_passes(),
        }
    }
}

fn post_process_chain() -> Vec<RenderPassData> {
    vec![
        RenderPassData::new("skybox")
            .with_outputs(["lighting_target"])
            .without_clear(),
        RenderPassData::new("bloom_extract")
            .with_inputs(["lighting_target"])
            .with_outputs(["bloom_bright"]),
        RenderPassData::new("bloom_blur")
            .with_inputs(["bloom_bright"])
            .with_outputs(["bloom_blurred"]),
        RenderPassData::new("bloom_combine")
            .with_inputs(["lighting_target", "bloom_blurred"])
            .with_outputs(["bloom_combined"]),
        RenderPassData::new("tonemapping")
            .with_inputs(["bloom_combined"])
            .with_outputs(["ldr_target"]),
        RenderPassData::new("fxaa")
            .with_inputs(["ldr_target"])
            .with_outputs(["fxaa_target"]),
        RenderPassData::new("final").with_inputs(["fxaa_target"]),
    ]
}

/// The shipped forward pass list.
pub fn default_forward_passes() -> Vec<RenderPassData> {
    let mut passes = vec![
        RenderPassData::new("shadow_map").with_outputs(["shadow_map"]),
        RenderPassData::new("depth_prepass"),
        RenderPassData::new("forward")
            .with_inputs(["shadow_map"])
            .with_outputs(["lighting_target"]),
    ];
    passes.extend(post_process_chain());
    passes
}

/// The shipped deferred pass list.
pub fn default_deferred_passes() -> Vec<RenderPassData> {
    let mut passes = vec![
        RenderPassData::new("shadow_map").with_outputs(["shadow_map"]),
        RenderPassData::new("geometry").with_outputs(["gbuffer_albedo", "gbuffer_normal"]),
        RenderPassData::new("ssao")
            .with_inputs(["depth", "gbuffer_normal"])
            .with_outputs(["ssao_target"]),
        RenderPassData::new("lighting")
            .with_inputs([
                "gbuffer_albedo",
                "gbuffer_normal",
                "depth",
                "shadow_map",
                "ssao_target",
            ])
            .with_outputs(["lighting_target"]),
    ];
    passes.extend(post_process_chain());
    passes
}
