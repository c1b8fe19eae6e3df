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

//! Passes that draw the scene's meshes into the main depth buffer.

use super::pass_base::{base_root_parameters, draw_meshes, PassBase, PipelineSetup, TargetBinding};
use std::path::PathBuf;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::api::{
    CompareFunction, DepthState, Format, PipelineConfig, RasterizerState, RootParameter,
    TextureKind, VertexLayout,
};
use stratum_core::renderer::{FrameData, RenderContext, RenderError, RenderPass};

/// The mesh-drawing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshPassKind {
    /// Depth only, so later passes shade each pixel once.
    DepthPrepass,
    /// Lit and shadowed color into an HDR target.
    Forward,
    /// Albedo and normals into the G-buffer.
    Geometry,
}

impl MeshPassKind {
    /// Every mesh strategy.
    pub const ALL: [MeshPassKind; 3] = [
        MeshPassKind::DepthPrepass,
        MeshPassKind::Forward,
        MeshPassKind::Geometry,
    ];

    /// The factory name.
    pub fn name(self) -> &'static str {
        match self {
            MeshPassKind::DepthPrepass => "depth_prepass",
            MeshPassKind::Forward => "forward",
            MeshPassKind::Geometry => "geometry",
        }
    }

    fn output_format(self, index: usize) -> Format {
        match (self, index) {
            (MeshPassKind::Geometry, 0) => Format::Rgba8Unorm,
            _ => Format::Rgba16Float,
        }
    }

    fn samples_albedo(self) -> bool {
        !matches!(self, MeshPassKind::DepthPrepass)
    }

    fn depth_state(self) -> DepthState {
        let compare = match self {
            MeshPassKind::Forward => CompareFunction::LessEqual,
            _ => CompareFunction::Less,
        };
        DepthState {
            test_enabled: true,
            write_enabled: true,
            compare,
        }
    }
}

/// A pass that issues one indexed draw per sub-mesh of every enabled instance.
#[derive(Debug)]
pub struct MeshPass {
    kind: MeshPassKind,
    base: PassBase,
}

impl MeshPass {
    /// Creates an uninitialized pass.
    pub fn new(kind: MeshPassKind, data: RenderPassData, shader_directory: PathBuf) -> Self {
        Self {
            kind,
            base: PassBase::new(data, shader_directory),
        }
    }

    /// The strategy this pass runs.
    pub fn kind(&self) -> MeshPassKind {
        self.kind
    }

    fn binding(&self) -> TargetBinding {
        if self.base.data().output.is_empty() {
            TargetBinding::DepthOnly
        } else {
            TargetBinding::Outputs { depth: true }
        }
    }
}

impl RenderPass for MeshPass {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn data(&self) -> &RenderPassData {
        self.base.data()
    }

    fn initialize(&mut self, context: &mut RenderContext) -> Result<(), RenderError> {
        let kind = self.kind;
        let formats = self
            .base
            .create_outputs(context, |index| kind.output_format(index))?;

        let mut root_parameters = base_root_parameters();
        root_parameters.extend(self.base.input_parameters(context)?);
        if kind.samples_albedo() {
            root_parameters.push(RootParameter::ShaderResource(TextureKind::Color));
        }

        let config = PipelineConfig {
            render_target_formats: formats,
            depth_format: Some(Format::Depth32Float),
            rasterizer: RasterizerState::default(),
            depth: kind.depth_state(),
            vertex_layout: VertexLayout::Mesh,
            ..Default::default()
        };
        self.base.build_pipeline(
            context,
            PipelineSetup {
                root_parameters,
                config,
                pixel_shader: kind.samples_albedo(),
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

        let next_slot = self.base.begin(context, self.binding())?;
        let albedo_slot = self.kind.samples_albedo().then_some(next_slot);
        draw_meshes(context, frame.draws, albedo_slot);
        self.base.end(context);
        Ok(())
    }

    fn shutdown(&mut self, context: &mut RenderContext) {
        self.base.shutdown(context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::{self, Harness};
    use stratum_core::renderer::api::{Command, ResourceState};

    fn render_one_frame(harness: &mut Harness, pass: &mut MeshPass) -> Vec<Command> {
        test_support::begin_frame(&mut harness.context);
        let frame = test_support::frame(&harness.draws, &harness.cascades, None);
        pass.render(&mut harness.context, &frame).unwrap();
        test_support::end_frame(&mut harness.context, &harness.device)
    }

    #[test]
    fn forward_creates_its_output_and_binds_albedo_after_inputs() {
        let mut harness = Harness::new(&["forward"]);
        let data = RenderPassData::new("forward")
            .with_inputs(["shadow_map"])
            .with_outputs(["lighting_target"]);
        let mut pass = MeshPass::new(MeshPassKind::Forward, data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();

        let target = harness.context.render_texture("lighting_target").unwrap();
        assert_eq!(target.format(), Format::Rgba16Float);

        let commands = render_one_frame(&mut harness, &mut pass);
        let slots: Vec<u32> = commands
            .iter()
            .filter_map(|c| match c {
                Command::SetRootDescriptorTable { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        // frame, shadow map, then object and albedo for the single draw
        assert_eq!(slots, vec![0, 2, 1, 3]);
        assert_eq!(
            commands
                .iter()
                .filter(|c| matches!(c, Command::DrawIndexed { .. }))
                .count(),
            harness.draws.len()
        );
    }

    #[test]
    fn depth_prepass_binds_only_the_depth_buffer() {
        let mut harness = Harness::new(&["depth_prepass"]);
        let data = RenderPassData::new("depth_prepass");
        let mut pass = MeshPass::new(MeshPassKind::DepthPrepass, data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();

        let commands = render_one_frame(&mut harness, &mut pass);
        let dsv = harness.context.depth_dsv();
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetRenderTargets { rtvs, dsv: Some(d) } if rtvs.is_empty() && *d == dsv
        )));
        let depth = harness.context.depth_buffer().resource().id();
        assert_eq!(
            harness.device.resource_state(depth),
            Some(ResourceState::DepthWrite)
        );
    }

    #[test]
    fn geometry_writes_two_gbuffer_targets() {
        let mut harness = Harness::new(&["geometry"]);
        let data =
            RenderPassData::new("geometry").with_outputs(["gbuffer_albedo", "gbuffer_normal"]);
        let mut pass = MeshPass::new(MeshPassKind::Geometry, data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();

        let albedo = harness.context.render_texture("gbuffer_albedo").unwrap();
        let normal = harness.context.render_texture("gbuffer_normal").unwrap();
        assert_eq!(albedo.format(), Format::Rgba8Unorm);
        assert_eq!(normal.format(), Format::Rgba16Float);

        let commands = render_one_frame(&mut harness, &mut pass);
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::SetRenderTargets { rtvs, .. } if rtvs.len() == 2)));
    }

    #[test]
    fn missing_input_fails_initialization() {
        let mut harness = Harness::new(&["forward"]);
        let data = RenderPassData::new("forward")
            .with_inputs(["nowhere"])
            .with_outputs(["lighting_target"]);
        let mut pass = MeshPass::new(MeshPassKind::Forward, data, harness.shader_dir());
        match pass.initialize(&mut harness.context) {
            Err(RenderError::MissingPassInput { pass, input }) => {
                assert_eq!(pass, "forward");
                assert_eq!(input, "nowhere");
            }
            other => panic!("expected a missing input, got {other:?}"),
        }
    }

    #[test]
    fn reload_replaces_the_pipeline() {
        let mut harness = Harness::new(&["depth_prepass"]);
        let data = RenderPassData::new("depth_prepass");
        let mut pass = MeshPass::new(MeshPassKind::DepthPrepass, data, harness.shader_dir());
        pass.initialize(&mut harness.context).unwrap();
        let before = pass.base.pipeline().unwrap();

        pass.request_reload();
        let commands = render_one_frame(&mut harness, &mut pass);

        let after = pass.base.pipeline().unwrap();
        assert_ne!(before, after);
        assert_eq!(harness.device.pipeline_count(), 1);
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::BeginEvent(name) if name == "depth_prepass")));
    }
}
