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

//! Shadow pass lane implementation - renders scene depth into every cascade.

use super::pass_base::{
    base_root_parameters, draw_meshes, PassBase, PipelineSetup, FIRST_INPUT_SLOT,
};
use bytemuck::Zeroable;
use std::path::PathBuf;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::api::{
    CompareFunction, CullMode, DepthState, Format, PipelineConfig, RasterizerState,
    ResourceState, RootParameter, VertexLayout, Viewport,
};
use stratum_core::renderer::{
    CascadeConstants, ConstantBuffer, FrameData, RenderContext, RenderError, RenderPass,
    CASCADE_COUNT, SHADOW_MAP_INPUT,
};

/// Root slot of the per-cascade constants.
const CASCADE_SLOT: u32 = FIRST_INPUT_SLOT;

/// Constant depth bias applied while rendering casters, in depth units.
const DEPTH_BIAS: i32 = 2;
/// Slope-scaled depth bias applied while rendering casters.
const SLOPE_SCALED_DEPTH_BIAS: f32 = 2.0;

/// A rendering lane dedicated to producing the cascaded shadow map.
///
/// Each cascade is one layer of the context's shadow map. The lane clears a
/// layer, binds it as the only target, and draws every caster with that
/// cascade's light view-projection. Inputs, if any are configured, are bound
/// after the cascade constants.
#[derive(Debug)]
pub struct ShadowPassLane {
    base: PassBase,
    cascades: Vec<ConstantBuffer<CascadeConstants>>,
}

impl ShadowPassLane {
    /// Creates a new `ShadowPassLane`.
    pub fn new(data: RenderPassData, shader_directory: PathBuf) -> Self {
        Self {
            base: PassBase::new(data, shader_directory),
            cascades: Vec::new(),
        }
    }
}

impl RenderPass for ShadowPassLane {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn data(&self) -> &RenderPassData {
        self.base.data()
    }

    fn initialize(&mut self, context: &mut RenderContext) -> Result<(), RenderError> {
        for output in &self.base.data().output {
            if output != SHADOW_MAP_INPUT {
                log::warn!(
                    "Shadow pass '{}' only writes '{SHADOW_MAP_INPUT}', ignoring output '{output}'",
                    self.base.name()
                );
            }
        }

        // --- 1. Cascade constants, created once ---
        while self.cascades.len() < CASCADE_COUNT {
            let label = format!("Shadow Cascade {}", self.cascades.len());
            let buffer = context.create_constant_buffer(&label, &CascadeConstants::zeroed())?;
            self.cascades.push(buffer);
        }

        // --- 2. Depth-only pipeline ---
        let mut root_parameters = base_root_parameters();
        root_parameters.push(RootParameter::ConstantBuffer);
        root_parameters.extend(self.base.input_parameters(context)?);

        let config = PipelineConfig {
            depth_format: Some(Format::Depth32Float),
            rasterizer: RasterizerState {
                cull_mode: CullMode::Back,
                depth_bias: DEPTH_BIAS,
                slope_scaled_depth_bias: SLOPE_SCALED_DEPTH_BIAS,
            },
            depth: DepthState {
                test_enabled: true,
                write_enabled: true,
                compare: CompareFunction::Less,
            },
            vertex_layout: VertexLayout::Mesh,
            ..Default::default()
        };
        self.base.build_pipeline(
            context,
            PipelineSetup {
                root_parameters,
                config,
                pixel_shader: false,
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

        self.base.open(context)?;
        context.transition_shadow_map(ResourceState::DepthWrite);

        let (size, _) = context.shadow_map().resource().extent();
        let layers = context.shadow_map().layers() as usize;
        for (layer, (cascade, buffer)) in frame
            .cascades
            .cascades
            .iter()
            .zip(&self.cascades)
            .take(layers)
            .enumerate()
        {
            buffer.update(
                context.gpu(),
                &CascadeConstants {
                    view_projection: cascade.view_projection.to_cols_array_2d(),
                    params: [layer as f32, cascade.near, cascade.far, 0.0],
                },
            )?;

            let dsv = context.shadow_map().dsv(layer as u32);
            let list = context.command_list();
            list.clear_depth_stencil(dsv, 1.0);
            list.set_render_targets(&[], Some(dsv));
            list.set_viewport(Viewport::from_size(size, size));

            self.base.bind_frame_and_inputs(context, CASCADE_SLOT + 1)?;
            context
                .command_list()
                .set_root_descriptor_table(CASCADE_SLOT, buffer.table());
            draw_meshes(context, frame.draws, None);
        }

        context.bind_viewport();
        self.base.end(context);
        Ok(())
    }

    fn shutdown(&mut self, context: &mut RenderContext) {
        self.base.shutdown(context);
        for buffer in self.cascades.drain(..) {
            buffer.release(context.gpu());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::{self, Harness};
    use stratum_core::renderer::api::Command;

    #[test]
    fn every_cascade_gets_its_own_layer_and_viewport() {
        let mut harness = Harness::new(&["shadow_map"]);
        let data = RenderPassData::new("shadow_map").with_outputs(["shadow_map"]);
        let mut pass = ShadowPassLane::new(data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();

        test_support::begin_frame(&mut harness.context);
        let frame = test_support::frame(&harness.draws, &harness.cascades, None);
        pass.render(&mut harness.context, &frame).unwrap();
        let commands = test_support::end_frame(&mut harness.context, &harness.device);

        let cleared: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::ClearDepthStencil { dsv, .. } => Some(*dsv),
                _ => None,
            })
            .collect();
        let shadow_map = harness.context.shadow_map();
        let expected: Vec<_> = (0..CASCADE_COUNT as u32).map(|l| shadow_map.dsv(l)).collect();
        // the main depth buffer is cleared first by the frame bracket
        assert_eq!(&cleared[1..], expected.as_slice());

        let shadow_viewports = commands
            .iter()
            .filter(|c| matches!(c, Command::SetViewport(v) if v.width == 16.0))
            .count();
        assert_eq!(shadow_viewports, CASCADE_COUNT);
        assert_eq!(
            commands
                .iter()
                .filter(|c| matches!(c, Command::DrawIndexed { .. }))
                .count(),
            CASCADE_COUNT * harness.draws.len()
        );
        assert!(matches!(
            commands.iter().rev().find(|c| matches!(c, Command::SetViewport(_))),
            Some(Command::SetViewport(v)) if v.width == 64.0
        ));
    }

    #[test]
    fn shadow_pipeline_has_no_pixel_stage() {
        let mut harness = Harness::new(&[]);
        std::fs::write(harness.shader_dir().join("shadow_map.wgsl"), "fn vs_main() {}").unwrap();
        let data = RenderPassData::new("shadow_map").with_outputs(["shadow_map"]);
        let mut pass = ShadowPassLane::new(data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();

        let compiled = harness.device.compiled_shader_paths();
        assert_eq!(compiled.len(), 1);
        assert!(compiled[0].ends_with("shadow_map.wgsl"));
        pass.shutdown(&mut harness.context);
        assert_eq!(harness.device.pipeline_count(), 0);
    }
}
