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

//! The render algorithm every pass shares.
//!
//! A pass owns a [`PassBase`] holding its configured wiring, its pipeline, and
//! the reload flag. The concrete pass decides the pipeline state, the render
//! targets, and the draw step; the base performs the rest of the frame
//! sequence in a fixed order:
//!
//! 1. open a debug event named after the pass,
//! 2. transition the inputs to the shader-readable state,
//! 3. bind the pipeline,
//! 4. transition, clear, and bind the outputs,
//! 5. bind the frame constants at slot 0,
//! 6. bind the inputs at slots 2 and up.

use super::shader_source::load_shader_source;
use std::path::PathBuf;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::api::{
    Format, PipelineConfig, PipelineDesc, PipelineId, ResourceState, RootParameter, ShaderId,
    ShaderSource, ShaderStage,
};
use stratum_core::renderer::{DrawItem, RenderContext, RenderError};

/// Root slot of the per-frame constants.
pub const FRAME_SLOT: u32 = 0;
/// Root slot of the per-object constants (mesh passes) or pass parameters (full-screen passes).
pub const OBJECT_SLOT: u32 = 1;
/// Root slot of the first pass input.
pub const FIRST_INPUT_SLOT: u32 = 2;
/// Vertices of the full-screen quad, two triangles generated from the vertex index.
pub const FULL_SCREEN_VERTEX_COUNT: u32 = 6;

/// Where a pass draws to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetBinding {
    /// The declared outputs, plus the main depth buffer when `depth` is set.
    Outputs {
        /// Bind the main depth buffer.
        depth: bool,
    },
    /// The current back buffer, plus the main depth buffer when `depth` is set.
    BackBuffer {
        /// Bind the main depth buffer.
        depth: bool,
    },
    /// The main depth buffer alone.
    DepthOnly,
}

/// What a pass asks [`PassBase::build_pipeline`] for.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSetup {
    /// Root signature, one entry per slot.
    pub root_parameters: Vec<RootParameter>,
    /// Fixed-function state.
    pub config: PipelineConfig,
    /// Compile the pixel stage. Depth-only passes skip it.
    pub pixel_shader: bool,
}

/// Wiring, pipeline, and reload state shared by every concrete pass.
#[derive(Debug)]
pub struct PassBase {
    data: RenderPassData,
    shader_directory: PathBuf,
    pipeline: Option<PipelineId>,
    reload_requested: bool,
}

impl PassBase {
    /// A pass that resolves its shader names against `shader_directory`.
    pub fn new(data: RenderPassData, shader_directory: impl Into<PathBuf>) -> Self {
        Self {
            data,
            shader_directory: shader_directory.into(),
            pipeline: None,
            reload_requested: false,
        }
    }

    /// The configured name.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The configured wiring.
    pub fn data(&self) -> &RenderPassData {
        &self.data
    }

    /// The current pipeline, once initialized.
    pub fn pipeline(&self) -> Option<PipelineId> {
        self.pipeline
    }

    /// Flags the pass for re-initialization at its next render.
    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    /// Returns and clears the reload flag.
    pub fn take_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Initialization
    // ─────────────────────────────────────────────────────────────────────

    /// Creates every declared output that does not exist yet and returns the
    /// formats of all outputs, in declaration order.
    ///
    /// `format_of` gives the format of the output at an index; outputs created
    /// by an earlier pass keep theirs.
    pub fn create_outputs(
        &self,
        context: &mut RenderContext,
        format_of: impl Fn(usize) -> Format,
    ) -> Result<Vec<Format>, RenderError> {
        let mut formats = Vec::with_capacity(self.data.output.len());
        for (index, name) in self.data.output.iter().enumerate() {
            context.create_rtt(name, format_of(index))?;
            let format = context
                .render_texture(name)
                .map(|texture| texture.format())
                .ok_or_else(|| RenderError::Internal(format!("render texture '{name}' vanished")))?;
            formats.push(format);
        }
        Ok(formats)
    }

    /// One shader-resource root parameter per declared input.
    ///
    /// # Errors
    ///
    /// [`RenderError::MissingPassInput`] for an input no earlier pass created.
    pub fn input_parameters(
        &self,
        context: &RenderContext,
    ) -> Result<Vec<RootParameter>, RenderError> {
        self.data
            .input
            .iter()
            .map(|name| {
                context
                    .input_kind(name)
                    .map(RootParameter::ShaderResource)
                    .ok_or_else(|| RenderError::MissingPassInput {
                        pass: self.data.name.clone(),
                        input: name.clone(),
                    })
            })
            .collect()
    }

    /// Compiles the configured shaders and replaces the pipeline.
    ///
    /// The previous pipeline, if any, is destroyed once the new one exists.
    /// Failures are logged with the shader path and returned; they are not retried.
    pub fn build_pipeline(
        &mut self,
        context: &RenderContext,
        setup: PipelineSetup,
    ) -> Result<(), RenderError> {
        for (stage, file) in [
            ("compute", &self.data.compute_shader_name),
            ("geometry", &self.data.geometry_shader_name),
        ] {
            if let Some(file) = file {
                log::debug!(
                    "Pass '{}': {stage} shader '{file}' recorded, not compiled",
                    self.data.name
                );
            }
        }

        let vertex_shader = self.compile(context, ShaderStage::Vertex)?;
        let pixel_shader = if setup.pixel_shader {
            Some(self.compile(context, ShaderStage::Pixel)?)
        } else {
            None
        };

        let desc = PipelineDesc {
            label: self.data.name.clone(),
            vertex_shader,
            pixel_shader,
            root_parameters: setup.root_parameters,
            config: setup.config,
        };
        let pipeline = context.gpu().create_pipeline(&desc).map_err(|e| {
            log::error!("Pass '{}': pipeline creation failed: {e}", self.data.name);
            e
        })?;

        if let Some(old) = self.pipeline.replace(pipeline) {
            context.gpu().destroy_pipeline(old);
        }
        log::debug!(
            "Pass '{}' built pipeline {:?} with {} root slots",
            self.data.name,
            pipeline,
            desc.root_parameters.len()
        );
        Ok(())
    }

    fn shader_file(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.data.vertex_shader_name.as_deref(),
            ShaderStage::Pixel => self.data.pixel_shader_name.as_deref(),
            ShaderStage::Compute => self.data.compute_shader_name.as_deref(),
            ShaderStage::Geometry => self.data.geometry_shader_name.as_deref(),
        }
    }

    fn compile(
        &self,
        context: &RenderContext,
        stage: ShaderStage,
    ) -> Result<ShaderId, RenderError> {
        let file = self.shader_file(stage).ok_or_else(|| {
            RenderError::InitializationFailed(format!(
                "pass '{}' has no {stage:?} shader configured",
                self.data.name
            ))
        })?;
        let path = self.shader_directory.join(file);

        let result = load_shader_source(&self.shader_directory, file).and_then(|code| {
            context.gpu().compile_shader(&ShaderSource {
                path: path.display().to_string(),
                stage,
                entry_point: stage.default_entry_point().to_string(),
                code,
            })
        });
        result.map_err(|e| {
            log::error!(
                "Pass '{}': {stage:?} shader '{}' failed: {e}",
                self.data.name,
                path.display()
            );
            e.into()
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Render
    // ─────────────────────────────────────────────────────────────────────

    /// Steps 1 to 6 of the shared sequence. Returns the first root slot after the inputs.
    pub fn begin(
        &self,
        context: &mut RenderContext,
        binding: TargetBinding,
    ) -> Result<u32, RenderError> {
        self.open(context)?;
        self.bind_targets(context, binding)?;
        self.bind_frame_and_inputs(context, FIRST_INPUT_SLOT)
    }

    /// Opens the debug event, transitions the inputs, and binds the pipeline.
    pub fn open(&self, context: &mut RenderContext) -> Result<(), RenderError> {
        let pipeline = self.pipeline.ok_or(RenderError::NotInitialized)?;
        context.command_list().begin_event(self.data.name.clone());
        context.transition_inputs(&self.data.name, &self.data.input)?;
        context.command_list().set_pipeline_state(pipeline);
        Ok(())
    }

    /// Transitions, clears, and binds the render targets.
    pub fn bind_targets(
        &self,
        context: &mut RenderContext,
        binding: TargetBinding,
    ) -> Result<(), RenderError> {
        match binding {
            TargetBinding::Outputs { depth } => {
                let rtvs = context.prepare_outputs(
                    &self.data.name,
                    &self.data.output,
                    self.data.clear_outputs,
                )?;
                context.bind_render_targets(&rtvs, depth);
            }
            TargetBinding::BackBuffer { depth } => {
                context.transition_back_buffer(ResourceState::RenderTarget)?;
                let rtv = context.back_buffer_rtv()?;
                context.bind_render_targets(&[rtv], depth);
            }
            TargetBinding::DepthOnly => context.bind_render_targets(&[], true),
        }
        Ok(())
    }

    /// Binds the frame constants at slot 0 and the inputs from `first_slot` on.
    ///
    /// Returns the first slot after the inputs.
    pub fn bind_frame_and_inputs(
        &self,
        context: &mut RenderContext,
        first_slot: u32,
    ) -> Result<u32, RenderError> {
        let frame = context.frame_table();
        context.command_list().set_root_descriptor_table(FRAME_SLOT, frame);

        let mut slot = first_slot;
        for input in &self.data.input {
            let table = context.input_table(&self.data.name, input)?;
            context.command_list().set_root_descriptor_table(slot, table);
            slot += 1;
        }
        Ok(slot)
    }

    /// Closes the debug event.
    pub fn end(&self, context: &mut RenderContext) {
        context.command_list().end_event();
    }

    /// Destroys the pipeline.
    pub fn shutdown(&mut self, context: &RenderContext) {
        if let Some(pipeline) = self.pipeline.take() {
            context.gpu().destroy_pipeline(pipeline);
        }
    }
}

/// Root parameters shared by every pass: the frame and the per-object (or
/// per-pass) constant buffers.
pub fn base_root_parameters() -> Vec<RootParameter> {
    vec![RootParameter::ConstantBuffer, RootParameter::ConstantBuffer]
}

/// Draws the full-screen quad.
pub fn draw_full_screen(context: &mut RenderContext) {
    context.command_list().draw(FULL_SCREEN_VERTEX_COUNT, 1);
}

/// Issues one indexed draw per item, binding its object constants at slot 1
/// and, when `albedo_slot` is set, its albedo texture there.
pub fn draw_meshes(context: &mut RenderContext, draws: &[DrawItem], albedo_slot: Option<u32>) {
    let list = context.command_list();
    for draw in draws {
        list.set_root_descriptor_table(OBJECT_SLOT, draw.object_table);
        if let Some(slot) = albedo_slot {
            list.set_root_descriptor_table(slot, draw.albedo_table);
        }
        list.set_vertex_buffer(draw.vertex_buffer);
        list.set_index_buffer(draw.index_buffer);
        list.draw_indexed(draw.index_count, draw.first_index, draw.base_vertex);
    }
}
