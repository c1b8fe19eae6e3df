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

//! Draws the sky cube map behind everything already in the depth buffer.

use super::pass_base::{
    base_root_parameters, draw_full_screen, PassBase, PipelineSetup, TargetBinding, OBJECT_SLOT,
};
use std::path::PathBuf;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::api::{
    CompareFunction, CullMode, DepthState, Format, PipelineConfig, RasterizerState,
    RootParameter, TextureKind,
};
use stratum_core::renderer::{
    ConstantBuffer, FrameData, PassParams, RenderContext, RenderError, RenderPass,
};

/// A full-screen pass at the far plane, depth-tested against the scene.
///
/// The pass is skipped on frames without a cube map.
#[derive(Debug)]
pub struct SkyboxPass {
    base: PassBase,
    params: Option<ConstantBuffer<PassParams>>,
    reported_missing: bool,
}

impl SkyboxPass {
    /// Creates an uninitialized pass.
    pub fn new(data: RenderPassData, shader_directory: PathBuf) -> Self {
        Self {
            base: PassBase::new(data, shader_directory),
            params: None,
            reported_missing: false,
        }
    }

    fn binding(&self) -> TargetBinding {
        if self.base.data().output.is_empty() {
            TargetBinding::BackBuffer { depth: true }
        } else {
            TargetBinding::Outputs { depth: true }
        }
    }
}

impl RenderPass for SkyboxPass {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn data(&self) -> &RenderPassData {
        self.base.data()
    }

    fn initialize(&mut self, context: &mut RenderContext) -> Result<(), RenderError> {
        let render_target_formats = if self.base.data().output.is_empty() {
            vec![context.swap_chain_format()]
        } else {
            self.base.create_outputs(context, |_| Format::Rgba16Float)?
        };

        if self.params.is_none() {
            // intensity
            let params = PassParams {
                values: [1.0, 0.0, 0.0, 0.0],
                extra: [0.0; 4],
            };
            self.params = Some(context.create_constant_buffer("Skybox Params", &params)?);
        }

        let mut root_parameters = base_root_parameters();
        root_parameters.extend(self.base.input_parameters(context)?);
        root_parameters.push(RootParameter::ShaderResource(TextureKind::Cube));

        let config = PipelineConfig {
            render_target_formats,
            depth_format: Some(Format::Depth32Float),
            rasterizer: RasterizerState {
                cull_mode: CullMode::None,
                ..Default::default()
            },
            depth: DepthState {
                test_enabled: true,
                write_enabled: false,
                compare: CompareFunction::LessEqual,
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
        frame: &FrameData<'_>,
    ) -> Result<(), RenderError> {
        if self.base.take_reload() {
            log::info!("Reloading pass '{}'", self.base.name());
            self.initialize(context)?;
        }
        let Some(cube) = frame.skybox else {
            if !self.reported_missing {
                log::debug!("No cube map loaded, skipping pass '{}'", self.base.name());
                self.reported_missing = true;
            }
            return Ok(());
        };
        let params = self
            .params
            .as_ref()
            .map(ConstantBuffer::table)
            .ok_or(RenderError::NotInitialized)?;

        let cube_slot = self.base.begin(context, self.binding())?;
        let list = context.command_list();
        list.set_root_descriptor_table(OBJECT_SLOT, params);
        list.set_root_descriptor_table(cube_slot, cube);
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
    use stratum_core::renderer::api::Command;

    fn skybox(harness: &mut Harness) -> SkyboxPass {
        let data = RenderPassData::new("skybox")
            .with_outputs(["lighting_target"])
            .without_clear();
        let mut pass = SkyboxPass::new(data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();
        pass
    }

    #[test]
    fn draws_over_its_output_without_clearing() {
        let mut harness = Harness::new(&["skybox"]);
        let mut pass = skybox(&mut harness);
        let cube = harness.cube_table();

        test_support::begin_frame(&mut harness.context);
        let frame = test_support::frame(&harness.draws, &harness.cascades, Some(cube));
        pass.render(&mut harness.context, &frame).unwrap();
        let commands = test_support::end_frame(&mut harness.context, &harness.device);

        let target = harness.context.render_texture("lighting_target").unwrap().rtv();
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::ClearRenderTarget { rtv, .. } if *rtv == target)));
        let dsv = harness.context.depth_dsv();
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetRenderTargets { rtvs, dsv: Some(d) } if rtvs == &vec![target] && *d == dsv
        )));
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetRootDescriptorTable { slot: 2, table } if *table == cube
        )));
    }

    #[test]
    fn frames_without_a_cube_map_record_nothing() {
        let mut harness = Harness::new(&["skybox"]);
        let mut pass = skybox(&mut harness);

        test_support::begin_frame(&mut harness.context);
        let frame = test_support::frame(&harness.draws, &harness.cascades, None);
        pass.render(&mut harness.context, &frame).unwrap();
        let commands = test_support::end_frame(&mut harness.context, &harness.device);

        assert!(!commands.iter().any(|c| matches!(c, Command::Draw { .. })));
        assert!(!commands.iter().any(|c| matches!(c, Command::BeginEvent(_))));
    }
}
