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

//! Full-screen passes: deferred shading, ambient occlusion, and the post chain.
//!
//! Every pass here draws the same six-vertex quad. They differ by output
//! format, by the parameters bound at slot 1, and by the final pass drawing
//! into the back buffer instead of a named texture.

use super::pass_base::{
    base_root_parameters, draw_full_screen, PassBase, PipelineSetup, TargetBinding, OBJECT_SLOT,
};
use std::path::PathBuf;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::api::{CullMode, Format, PipelineConfig, RasterizerState};
use stratum_core::renderer::{
    ConstantBuffer, FrameData, PassParams, RenderContext, RenderError, RenderPass,
};

/// The full-screen strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostProcessKind {
    /// Screen-space ambient occlusion from depth and normals.
    Ssao,
    /// Deferred shading of the G-buffer.
    Lighting,
    /// Keeps the pixels above the bloom threshold.
    BloomExtract,
    /// Blurs the bright pixels.
    BloomBlur,
    /// Adds the blurred highlights back onto the scene.
    BloomCombine,
    /// Maps HDR color to display range and applies gamma.
    Tonemapping,
    /// Fast approximate anti-aliasing.
    Fxaa,
    /// Copies the finished image into the back buffer.
    Final,
}

impl PostProcessKind {
    /// Every full-screen strategy.
    pub const ALL: [PostProcessKind; 8] = [
        PostProcessKind::Ssao,
        PostProcessKind::Lighting,
        PostProcessKind::BloomExtract,
        PostProcessKind::BloomBlur,
        PostProcessKind::BloomCombine,
        PostProcessKind::Tonemapping,
        PostProcessKind::Fxaa,
        PostProcessKind::Final,
    ];

    /// The factory name.
    pub fn name(self) -> &'static str {
        match self {
            PostProcessKind::Ssao => "ssao",
            PostProcessKind::Lighting => "lighting",
            PostProcessKind::BloomExtract => "bloom_extract",
            PostProcessKind::BloomBlur => "bloom_blur",
            PostProcessKind::BloomCombine => "bloom_combine",
            PostProcessKind::Tonemapping => "tonemapping",
            PostProcessKind::Fxaa => "fxaa",
            PostProcessKind::Final => "final",
        }
    }

    fn output_format(self) -> Format {
        match self {
            PostProcessKind::Ssao => Format::R8Unorm,
            PostProcessKind::Tonemapping | PostProcessKind::Fxaa | PostProcessKind::Final => {
                Format::Rgba8Unorm
            }
            _ => Format::Rgba16Float,
        }
    }

    /// The constants bound at slot 1.
    pub fn default_params(self) -> PassParams {
        let values = match self {
            // radius, bias, intensity, sample count
            PostProcessKind::Ssao => [0.5, 0.025, 1.0, 16.0],
            // ambient, shadow bias, filter radius in texels
            PostProcessKind::Lighting => [0.03, 0.0015, 1.0, 0.0],
            // threshold, soft knee
            PostProcessKind::BloomExtract => [1.0, 0.5, 0.0, 0.0],
            // radius in texels
            PostProcessKind::BloomBlur => [1.5, 0.0, 0.0, 0.0],
            // bloom intensity
            PostProcessKind::BloomCombine => [0.6, 0.0, 0.0, 0.0],
            // exposure, gamma
            PostProcessKind::Tonemapping => [1.0, 2.2, 0.0, 0.0],
            // edge threshold, minimum edge threshold, subpixel blend
            PostProcessKind::Fxaa => [0.125, 0.0312, 0.75, 0.0],
            PostProcessKind::Final => [0.0; 4],
        };
        PassParams {
            values,
            extra: [0.0; 4],
        }
    }
}

/// A pass that shades every pixel of its outputs from its inputs.
#[derive(Debug)]
pub struct PostProcessPass {
    kind: PostProcessKind,
    base: PassBase,
    params: Option<ConstantBuffer<PassParams>>,
}

impl PostProcessPass {
    /// Creates an uninitialized pass.
    pub fn new(kind: PostProcessKind, data: RenderPassData, shader_directory: PathBuf) -> Self {
        Self {
            kind,
            base: PassBase::new(data, shader_directory),
            params: None,
        }
    }

    /// The strategy this pass runs.
    pub fn kind(&self) -> PostProcessKind {
        self.kind
    }

    /// Overwrites the constants bound at slot 1.
    pub fn set_params(
        &self,
        context: &RenderContext,
        params: &PassParams,
    ) -> Result<(), RenderError> {
        let buffer = self.params.as_ref().ok_or(RenderError::NotInitialized)?;
        buffer.update(context.gpu(), params)?;
        Ok(())
    }

    fn draws_to_back_buffer(&self) -> bool {
        self.base.data().output.is_empty()
    }
}

impl RenderPass for PostProcessPass {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn data(&self) -> &RenderPassData {
        self.base.data()
    }

    fn initialize(&mut self, context: &mut RenderContext) -> Result<(), RenderError> {
        let format = self.kind.output_format();
        let render_target_formats = if self.draws_to_back_buffer() {
            vec![context.swap_chain_format()]
        } else {
            self.base.create_outputs(context, |_| format)?
        };

        if self.params.is_none() {
            let label = format!("{} Params", self.base.name());
            let params = self.kind.default_params();
            self.params = Some(context.create_constant_buffer(&label, &params)?);
        }

        let mut root_parameters = base_root_parameters();
        root_parameters.extend(self.base.input_parameters(context)?);

        let config = PipelineConfig {
            render_target_formats,
            rasterizer: RasterizerState {
                cull_mode: CullMode::None,
                ..Default::default()
            },
            ..Default::default()
        };
        self.base.build_pipeline(
            context,
            PipelineSetup {
                root_parameters,
                config,
                pixel_shader: true,
            },
        )
    }

    fn request_reload(&mut self) {
        self.base.request_reload();
    }

    fn render(
        &mut self,
        context: &mut RenderContext,
        _frame: &FrameData<'_>,
    ) -> Result<(), RenderError> {
        if self.base.take_reload() {
            log::info!("Reloading pass '{}'", self.base.name());
            self.initialize(context)?;
        }
        let params = self
            .params
            .as_ref()
            .map(ConstantBuffer::table)
            .ok_or(RenderError::NotInitialized)?;

        let binding = if self.draws_to_back_buffer() {
            TargetBinding::BackBuffer { depth: false }
        } else {
            TargetBinding::Outputs { depth: false }
        };
        self.base.begin(context, binding)?;
        context.command_list().set_root_descriptor_table(OBJECT_SLOT, params);
        draw_full_screen(context);
        self.base.end(context);
        Ok(())
    }

    fn shutdown(&mut self, context: &mut RenderContext) {
        self.base.shutdown(context);
        if let Some(params) = self.params.take() {
            params.release(context.gpu());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::{self, Harness};
    use stratum_core::renderer::api::{Command, ResourceState};

    fn render_one_frame(harness: &mut Harness, passes: &mut [PostProcessPass]) -> Vec<Command> {
        test_support::begin_frame(&mut harness.context);
        let frame = test_support::frame(&harness.draws, &harness.cascades, None);
        for pass in passes.iter_mut() {
            pass.render(&mut harness.context, &frame).unwrap();
        }
        test_support::end_frame(&mut harness.context, &harness.device)
    }

    #[test]
    fn outputs_take_the_format_of_their_stage() {
        let mut harness = Harness::new(&["ssao", "tonemapping"]);
        let dir = harness.shader_dir();
        let mut ssao = PostProcessPass::new(
            PostProcessKind::Ssao,
            RenderPassData::new("ssao")
                .with_inputs(["depth"])
                .with_outputs(["ssao_target"]),
            dir.clone(),
        );
        ssao.initialize(&mut harness.context).unwrap();
        let mut tonemapping = PostProcessPass::new(
            PostProcessKind::Tonemapping,
            RenderPassData::new("tonemapping")
                .with_inputs(["ssao_target"])
                .with_outputs(["ldr_target"]),
            dir,
        );
        tonemapping.initialize(&mut harness.context).unwrap();

        let ssao_target = harness.context.render_texture("ssao_target").unwrap();
        assert_eq!(ssao_target.format(), Format::R8Unorm);
        let ldr = harness.context.render_texture("ldr_target").unwrap();
        assert_eq!(ldr.format(), Format::Rgba8Unorm);
    }

    #[test]
    fn final_pass_draws_a_quad_into_the_back_buffer() {
        let mut harness = Harness::new(&["tonemapping", "final"]);
        let dir = harness.shader_dir();
        let mut passes = vec![
            PostProcessPass::new(
                PostProcessKind::Tonemapping,
                RenderPassData::new("tonemapping").with_outputs(["ldr_target"]),
                dir.clone(),
            ),
            PostProcessPass::new(
                PostProcessKind::Final,
                RenderPassData::new("final").with_inputs(["ldr_target"]),
                dir,
            ),
        ];
        for pass in &mut passes {
            pass.initialize(&mut harness.context).unwrap();
        }

        let commands = render_one_frame(&mut harness, &mut passes);
        let back_buffer = harness.context.render_targets()[0].rtv();
        let last_targets = commands
            .iter()
            .rev()
            .find_map(|c| match c {
                Command::SetRenderTargets { rtvs, dsv } => Some((rtvs.clone(), *dsv)),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_targets, (vec![back_buffer], None));
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::Draw { vertex_count: 6, instance_count: 1 })));

        let ldr = harness.context.render_texture("ldr_target").unwrap();
        assert_eq!(
            harness.device.resource_state(ldr.resource().id()),
            Some(ResourceState::PixelShaderResource)
        );
    }

    #[test]
    fn passes_reading_depth_do_not_bind_it() {
        let mut harness = Harness::new(&["ssao"]);
        let mut passes = vec![PostProcessPass::new(
            PostProcessKind::Ssao,
            RenderPassData::new("ssao")
                .with_inputs(["depth"])
                .with_outputs(["ssao_target"]),
            harness.shader_dir(),
        )];
        passes[0].initialize(&mut harness.context).unwrap();

        let commands = render_one_frame(&mut harness, &mut passes);
        let ssao_rtv = harness.context.render_texture("ssao_target").unwrap().rtv();
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetRenderTargets { rtvs, dsv: None } if rtvs == &vec![ssao_rtv]
        )));
    }

    #[test]
    fn params_are_bound_at_slot_one() {
        let mut harness = Harness::new(&["bloom_extract"]);
        let mut passes = vec![PostProcessPass::new(
            PostProcessKind::BloomExtract,
            RenderPassData::new("bloom_extract").with_outputs(["bloom_bright"]),
            harness.shader_dir(),
        )];
        passes[0].initialize(&mut harness.context).unwrap();
        passes[0]
            .set_params(&harness.context, &PassParams::default())
            .unwrap();

        let commands = render_one_frame(&mut harness, &mut passes);
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::SetRootDescriptorTable { slot: 1, .. })));
    }
}
