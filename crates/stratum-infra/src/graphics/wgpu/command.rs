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

//! Turns a recorded [`Command`] stream into `wgpu` render passes.
//!
//! The engine records D3D12-style commands: clears, target bindings, and
//! state changes are independent calls. `wgpu` wants them grouped into
//! render passes whose attachments and load operations are fixed up front.
//! Translation runs in two phases:
//!
//! 1. [`translate`] walks the commands under the device lock and resolves
//!    every handle into owned `wgpu` objects, cutting the stream into
//!    [`Step`]s. A pass segment opens at the first draw after a target change.
//!    Pending clears of its attachments become `LoadOp::Clear`; other pending
//!    clears are flushed as clear-only passes.
//! 2. [`encode`] replays the steps on a command encoder without any lock held.

use super::context::WgpuGraphicsContext;
use super::conversions::IntoWgpu;
use super::device::{ResourceKind, WgpuState, SAMPLER_BINDING_BASE};
use crate::graphics::{decode_cpu_handle, decode_gpu_handle};
use std::collections::BTreeMap;
use std::ops::Range;
use stratum_core::renderer::api::{
    Command, CpuDescriptorHandle, GpuDescriptorHandle, IndexBufferView, PipelineId,
    ResourceId, RootParameter, TextureKind, VertexBufferView, ViewDesc, Viewport,
};
use stratum_core::renderer::{PipelineError, RenderError, ResourceError};

/// Identifies a cached bind group: the pipeline and the `(heap, index)` of each root table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct BindGroupKey {
    pub pipeline: PipelineId,
    pub tables: Vec<(u64, u32)>,
}

pub(crate) enum Step {
    PushDebugGroup(String),
    PopDebugGroup,
    Pass(PassSegment),
}

struct ColorAttachment {
    view: wgpu::TextureView,
    clear: Option<[f32; 4]>,
}

struct DepthAttachment {
    view: wgpu::TextureView,
    clear: Option<f32>,
}

pub(crate) struct PassSegment {
    label: String,
    size: (u32, u32),
    colors: Vec<ColorAttachment>,
    depth: Option<DepthAttachment>,
    ops: Vec<DrawOp>,
}

enum DrawOp {
    Viewport(Viewport),
    Pipeline(wgpu::RenderPipeline),
    BindGroup(wgpu::BindGroup),
    VertexBuffer(wgpu::Buffer, u64),
    IndexBuffer(wgpu::Buffer, wgpu::IndexFormat, u64),
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

#[derive(Default, Clone, Copy)]
struct Dirty {
    viewport: bool,
    pipeline: bool,
    tables: bool,
    vertex_buffer: bool,
    index_buffer: bool,
}

impl Dirty {
    fn all() -> Self {
        Self {
            viewport: true,
            pipeline: true,
            tables: true,
            vertex_buffer: true,
            index_buffer: true,
        }
    }
}

enum BoundResource {
    Buffer(wgpu::Buffer),
    Texture(wgpu::TextureView, TextureKind),
}

struct Translator<'a> {
    state: &'a mut WgpuState,
    context: &'a mut WgpuGraphicsContext,
    device: &'a wgpu::Device,
    steps: Vec<Step>,
    open: Option<PassSegment>,
    events: Vec<String>,

    rtvs: Vec<CpuDescriptorHandle>,
    dsv: Option<CpuDescriptorHandle>,
    pending_colors: Vec<(u64, [f32; 4])>,
    pending_depths: Vec<(u64, f32)>,

    viewport: Option<Viewport>,
    pipeline: Option<PipelineId>,
    tables: BTreeMap<u32, GpuDescriptorHandle>,
    vertex_buffer: Option<VertexBufferView>,
    index_buffer: Option<IndexBufferView>,
    dirty: Dirty,
}

/// Resolves `commands` into encodable steps.
pub(crate) fn translate(
    state: &mut WgpuState,
    context: &mut WgpuGraphicsContext,
    device: &wgpu::Device,
    commands: &[Command],
) -> Result<Vec<Step>, RenderError> {
    let mut translator = Translator {
        state,
        context,
        device,
        steps: Vec::new(),
        open: None,
        events: Vec::new(),
        rtvs: Vec::new(),
        dsv: None,
        pending_colors: Vec::new(),
        pending_depths: Vec::new(),
        viewport: None,
        pipeline: None,
        tables: BTreeMap::new(),
        vertex_buffer: None,
        index_buffer: None,
        dirty: Dirty::all(),
    };
    for command in commands {
        translator.apply(command)?;
    }
    translator.finish()
}

impl Translator<'_> {
    fn apply(&mut self, command: &Command) -> Result<(), RenderError> {
        match command {
            // wgpu tracks states and heap bindings itself.
            Command::Barrier(_) | Command::SetDescriptorHeaps(_) => {}
            Command::SetViewport(viewport) => {
                self.viewport = Some(*viewport);
                self.dirty.viewport = true;
            }
            Command::ClearRenderTarget { rtv, color } => {
                self.close();
                self.pending_colors.retain(|(ptr, _)| *ptr != rtv.ptr);
                self.pending_colors.push((rtv.ptr, *color));
            }
            Command::ClearDepthStencil { dsv, depth } => {
                self.close();
                self.pending_depths.retain(|(ptr, _)| *ptr != dsv.ptr);
                self.pending_depths.push((dsv.ptr, *depth));
            }
            Command::SetRenderTargets { rtvs, dsv } => {
                self.close();
                self.rtvs = rtvs.clone();
                self.dsv = *dsv;
            }
            Command::SetPipelineState(id) => {
                self.pipeline = Some(*id);
                self.tables.clear();
                self.dirty.pipeline = true;
                self.dirty.tables = true;
            }
            Command::SetRootDescriptorTable { slot, table } => {
                self.tables.insert(*slot, *table);
                self.dirty.tables = true;
            }
            Command::SetVertexBuffer(view) => {
                self.vertex_buffer = Some(*view);
                self.dirty.vertex_buffer = true;
            }
            Command::SetIndexBuffer(view) => {
                self.index_buffer = Some(*view);
                self.dirty.index_buffer = true;
            }
            Command::Draw {
                vertex_count,
                instance_count,
            } => {
                self.prepare_draw()?;
                self.push_op(DrawOp::Draw {
                    vertices: 0..*vertex_count,
                    instances: 0..*instance_count,
                });
            }
            Command::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
            } => {
                self.prepare_draw()?;
                self.push_op(DrawOp::DrawIndexed {
                    indices: *first_index..first_index + index_count,
                    base_vertex: *base_vertex,
                    instances: 0..*instance_count,
                });
            }
            Command::BeginEvent(name) => {
                self.close();
                self.events.push(name.clone());
                self.steps.push(Step::PushDebugGroup(name.clone()));
            }
            Command::EndEvent => {
                self.close();
                if self.events.pop().is_none() {
                    return Err(RenderError::RenderingFailed(
                        "EndEvent without a matching BeginEvent".to_string(),
                    ));
                }
                self.steps.push(Step::PopDebugGroup);
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Step>, RenderError> {
        self.close();
        if let Some(name) = self.events.last() {
            return Err(RenderError::RenderingFailed(format!(
                "debug event '{name}' was never ended"
            )));
        }
        self.flush_clears(&[], None)?;
        Ok(self.steps)
    }

    fn close(&mut self) {
        if let Some(segment) = self.open.take() {
            self.steps.push(Step::Pass(segment));
        }
    }

    fn push_op(&mut self, op: DrawOp) {
        if let Some(segment) = self.open.as_mut() {
            segment.ops.push(op);
        }
    }

    // --- Pass segments ---

    fn open_segment(&mut self) -> Result<(), RenderError> {
        if self.rtvs.is_empty() && self.dsv.is_none() {
            return Err(RenderError::RenderingFailed(
                "draw recorded with no render target bound".to_string(),
            ));
        }
        let keep_colors: Vec<u64> = self.rtvs.iter().map(|h| h.ptr).collect();
        let keep_depth = self.dsv.map(|h| h.ptr);
        self.flush_clears(&keep_colors, keep_depth)?;

        let mut size = None;
        let mut colors = Vec::with_capacity(self.rtvs.len());
        for rtv in self.rtvs.clone() {
            let (view, extent) = self.target_view(rtv.ptr)?;
            size.get_or_insert(extent);
            colors.push(ColorAttachment {
                view,
                clear: take_clear(&mut self.pending_colors, rtv.ptr),
            });
        }
        let depth = match self.dsv {
            Some(dsv) => {
                let (view, extent) = self.target_view(dsv.ptr)?;
                size.get_or_insert(extent);
                Some(DepthAttachment {
                    view,
                    clear: take_clear(&mut self.pending_depths, dsv.ptr),
                })
            }
            None => None,
        };

        self.open = Some(PassSegment {
            label: self
                .events
                .last()
                .cloned()
                .unwrap_or_else(|| "Stratum Pass".to_string()),
            size: size.unwrap_or((1, 1)),
            colors,
            depth,
            ops: Vec::new(),
        });
        self.dirty = Dirty::all();
        Ok(())
    }

    /// Emits clear-only passes for pending clears not in `keep_colors`/`keep_depth`.
    fn flush_clears(
        &mut self,
        keep_colors: &[u64],
        keep_depth: Option<u64>,
    ) -> Result<(), RenderError> {
        let colors: Vec<(u64, [f32; 4])> = self
            .pending_colors
            .iter()
            .copied()
            .filter(|(ptr, _)| !keep_colors.contains(ptr))
            .collect();
        let depths: Vec<(u64, f32)> = self
            .pending_depths
            .iter()
            .copied()
            .filter(|(ptr, _)| Some(*ptr) != keep_depth)
            .collect();
        self.pending_colors.retain(|(ptr, _)| keep_colors.contains(ptr));
        self.pending_depths.retain(|(ptr, _)| Some(*ptr) == keep_depth);

        for (ptr, color) in colors {
            let (view, size) = self.target_view(ptr)?;
            self.steps.push(Step::Pass(PassSegment {
                label: "Clear".to_string(),
                size,
                colors: vec![ColorAttachment {
                    view,
                    clear: Some(color),
                }],
                depth: None,
                ops: Vec::new(),
            }));
        }
        for (ptr, depth) in depths {
            let (view, size) = self.target_view(ptr)?;
            self.steps.push(Step::Pass(PassSegment {
                label: "Clear Depth".to_string(),
                size,
                colors: Vec::new(),
                depth: Some(DepthAttachment {
                    view,
                    clear: Some(depth),
                }),
                ops: Vec::new(),
            }));
        }
        Ok(())
    }

    /// Resolves an RTV or DSV address to a single-layer view and the target size.
    fn target_view(&mut self, ptr: u64) -> Result<(wgpu::TextureView, (u32, u32)), RenderError> {
        let (heap, index) = decode_cpu_handle(ptr);
        let view = self
            .state
            .heaps
            .get(&heap)
            .and_then(|h| h.views.get(index as usize).copied().flatten())
            .ok_or(ResourceError::InvalidHandle)?;
        let (resource, layer) = match view {
            ViewDesc::RenderTarget {
                resource,
                array_layer,
            }
            | ViewDesc::DepthStencil {
                resource,
                array_layer,
            } => (resource, array_layer.unwrap_or(0)),
            _ => return Err(ResourceError::InvalidHandle.into()),
        };
        let entry = self
            .state
            .resources
            .get(&resource)
            .ok_or(ResourceError::NotFound)?;
        let size = entry.desc.extent();
        let view = match &entry.kind {
            ResourceKind::Texture(texture) => texture.create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: layer,
                array_layer_count: Some(1),
                ..Default::default()
            }),
            ResourceKind::BackBuffer => self
                .context
                .current_frame_texture()
                .map_err(|e| RenderError::SurfaceAcquisitionFailed(e.to_string()))?
                .create_view(&wgpu::TextureViewDescriptor::default()),
            ResourceKind::Buffer(_) => return Err(ResourceError::InvalidHandle.into()),
        };
        Ok((view, size))
    }

    // --- Draw state ---

    fn prepare_draw(&mut self) -> Result<(), RenderError> {
        if self.open.is_none() {
            self.open_segment()?;
        }
        let pipeline_id = self.pipeline.ok_or_else(|| {
            RenderError::RenderingFailed("draw recorded with no pipeline bound".to_string())
        })?;
        let dirty = std::mem::take(&mut self.dirty);
        let mut ops = Vec::new();

        if dirty.viewport {
            if let (Some(viewport), Some(segment)) = (self.viewport, self.open.as_ref()) {
                ops.push(DrawOp::Viewport(clamp_viewport(viewport, segment.size)));
            }
        }
        if dirty.pipeline {
            let entry = self.state.pipelines.get(&pipeline_id).ok_or_else(|| {
                RenderError::ResourceError(ResourceError::Pipeline(
                    PipelineError::InvalidPipeline { id: pipeline_id },
                ))
            })?;
            ops.push(DrawOp::Pipeline(entry.pipeline.clone()));
        }
        if dirty.pipeline || dirty.tables {
            ops.push(DrawOp::BindGroup(self.bind_group(pipeline_id)?));
        }
        if dirty.vertex_buffer {
            if let Some(view) = self.vertex_buffer {
                ops.push(DrawOp::VertexBuffer(self.buffer(view.resource)?, view.size));
            }
        }
        if dirty.index_buffer {
            if let Some(view) = self.index_buffer {
                ops.push(DrawOp::IndexBuffer(
                    self.buffer(view.resource)?,
                    view.format.into_wgpu(),
                    view.size,
                ));
            }
        }
        if let Some(segment) = self.open.as_mut() {
            segment.ops.extend(ops);
        }
        Ok(())
    }

    fn buffer(&self, id: ResourceId) -> Result<wgpu::Buffer, RenderError> {
        match self.state.resources.get(&id).map(|e| &e.kind) {
            Some(ResourceKind::Buffer(buffer)) => Ok(buffer.clone()),
            Some(_) => Err(ResourceError::InvalidHandle.into()),
            None => Err(ResourceError::NotFound.into()),
        }
    }

    /// Gathers the bound root tables into one bind group, reusing a cached one when possible.
    fn bind_group(&mut self, pipeline_id: PipelineId) -> Result<wgpu::BindGroup, RenderError> {
        let entry = self.state.pipelines.get(&pipeline_id).ok_or_else(|| {
            RenderError::ResourceError(ResourceError::Pipeline(
                PipelineError::InvalidPipeline { id: pipeline_id },
            ))
        })?;
        let mut tables = Vec::with_capacity(entry.root_parameters.len());
        for slot in 0..entry.root_parameters.len() as u32 {
            let table = self.tables.get(&slot).ok_or_else(|| {
                RenderError::RenderingFailed(format!(
                    "pipeline '{}' draws with root slot {slot} unbound",
                    entry.label
                ))
            })?;
            tables.push(decode_gpu_handle(table.ptr));
        }
        let key = BindGroupKey {
            pipeline: pipeline_id,
            tables,
        };
        if let Some(group) = self.state.bind_groups.get(&key) {
            return Ok(group.clone());
        }

        let mut bound = Vec::with_capacity(key.tables.len());
        for (&(heap, index), param) in key.tables.iter().zip(&entry.root_parameters) {
            let view = self
                .state
                .heaps
                .get(&heap)
                .and_then(|h| h.views.get(index as usize).copied().flatten())
                .ok_or(ResourceError::InvalidHandle)?;
            bound.push(self.bound_resource(view, *param)?);
        }

        let mut entries = Vec::with_capacity(bound.len() * 2);
        for (slot, resource) in bound.iter().enumerate() {
            let slot = slot as u32;
            match resource {
                BoundResource::Buffer(buffer) => entries.push(wgpu::BindGroupEntry {
                    binding: slot,
                    resource: buffer.as_entire_binding(),
                }),
                BoundResource::Texture(view, kind) => {
                    entries.push(wgpu::BindGroupEntry {
                        binding: slot,
                        resource: wgpu::BindingResource::TextureView(view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: SAMPLER_BINDING_BASE + slot,
                        resource: wgpu::BindingResource::Sampler(self.state.samplers.for_kind(*kind)),
                    });
                }
            }
        }
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&entry.label),
            layout: &entry.layout,
            entries: &entries,
        });
        self.state.bind_groups.insert(key, group.clone());
        Ok(group)
    }

    fn bound_resource(&self, view: ViewDesc, param: RootParameter) -> Result<BoundResource, RenderError> {
        match (view, param) {
            (ViewDesc::ConstantBuffer { resource, .. }, RootParameter::ConstantBuffer) => {
                Ok(BoundResource::Buffer(self.buffer(resource)?))
            }
            (ViewDesc::ShaderResource { resource, .. }, RootParameter::ShaderResource(kind)) => {
                let texture = match self.state.resources.get(&resource).map(|e| &e.kind) {
                    Some(ResourceKind::Texture(texture)) => texture,
                    Some(_) => return Err(ResourceError::InvalidHandle.into()),
                    None => return Err(ResourceError::NotFound.into()),
                };
                let (dimension, aspect, layers) = match kind {
                    TextureKind::Color => (wgpu::TextureViewDimension::D2, wgpu::TextureAspect::All, Some(1)),
                    TextureKind::Cube => (wgpu::TextureViewDimension::Cube, wgpu::TextureAspect::All, Some(6)),
                    TextureKind::Depth => (
                        wgpu::TextureViewDimension::D2,
                        wgpu::TextureAspect::DepthOnly,
                        Some(1),
                    ),
                    TextureKind::DepthArray => (
                        wgpu::TextureViewDimension::D2Array,
                        wgpu::TextureAspect::DepthOnly,
                        None,
                    ),
                };
                let view = texture.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(dimension),
                    aspect,
                    array_layer_count: layers,
                    ..Default::default()
                });
                Ok(BoundResource::Texture(view, kind))
            }
            (view, param) => Err(RenderError::RenderingFailed(format!(
                "view {view:?} does not match root parameter {param:?}"
            ))),
        }
    }
}

fn take_clear<T: Copy>(pending: &mut Vec<(u64, T)>, ptr: u64) -> Option<T> {
    let position = pending.iter().position(|(p, _)| *p == ptr)?;
    Some(pending.remove(position).1)
}

fn clamp_viewport(viewport: Viewport, (width, height): (u32, u32)) -> Viewport {
    let x = viewport.x.clamp(0.0, width as f32 - 1.0);
    let y = viewport.y.clamp(0.0, height as f32 - 1.0);
    Viewport {
        x,
        y,
        width: viewport.width.clamp(1.0, width as f32 - x),
        height: viewport.height.clamp(1.0, height as f32 - y),
        min_depth: viewport.min_depth.clamp(0.0, 1.0),
        max_depth: viewport.max_depth.clamp(0.0, 1.0),
    }
}

/// Replays translated steps on `encoder`.
pub(crate) fn encode(encoder: &mut wgpu::CommandEncoder, steps: &[Step]) {
    for step in steps {
        match step {
            Step::PushDebugGroup(name) => encoder.push_debug_group(name),
            Step::PopDebugGroup => encoder.pop_debug_group(),
            Step::Pass(segment) => encode_pass(encoder, segment),
        }
    }
}

fn encode_pass(encoder: &mut wgpu::CommandEncoder, segment: &PassSegment) {
    let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = segment
        .colors
        .iter()
        .map(|color| {
            Some(wgpu::RenderPassColorAttachment {
                view: &color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: match color.clear {
                        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        })
        .collect();
    let depth_stencil_attachment =
        segment
            .depth
            .as_ref()
            .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: match depth.clear {
                        Some(value) => wgpu::LoadOp::Clear(value),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            });

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(&segment.label),
        color_attachments: &color_attachments,
        depth_stencil_attachment,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    for op in &segment.ops {
        match op {
            DrawOp::Viewport(v) => {
                pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth)
            }
            DrawOp::Pipeline(pipeline) => pass.set_pipeline(pipeline),
            DrawOp::BindGroup(group) => pass.set_bind_group(0, group, &[]),
            DrawOp::VertexBuffer(buffer, size) => pass.set_vertex_buffer(0, buffer.slice(..*size)),
            DrawOp::IndexBuffer(buffer, format, size) => {
                pass.set_index_buffer(buffer.slice(..*size), *format)
            }
            DrawOp::Draw {
                vertices,
                instances,
            } => pass.draw(vertices.clone(), instances.clone()),
            DrawOp::DrawIndexed {
                indices,
                base_vertex,
                instances,
            } => pass.draw_indexed(indices.clone(), *base_vertex, instances.clone()),
        }
    }
    log::trace!(
        "Encoded pass '{}' ({} color, depth: {}, {} ops)",
        segment.label,
        segment.colors.len(),
        segment.depth.is_some(),
        segment.ops.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_is_clamped_to_the_attachment() {
        let viewport = Viewport::from_size(4096, 4096);
        let clamped = clamp_viewport(viewport, (1024, 768));
        assert_eq!(clamped.width, 1024.0);
        assert_eq!(clamped.height, 768.0);
        assert_eq!(clamped.x, 0.0);
    }

    #[test]
    fn pending_clear_is_taken_once() {
        let mut pending = vec![(1u64, 0.5f32), (2, 1.0)];
        assert_eq!(take_clear(&mut pending, 2), Some(1.0));
        assert_eq!(take_clear(&mut pending, 2), None);
        assert_eq!(pending.len(), 1);
    }
}
