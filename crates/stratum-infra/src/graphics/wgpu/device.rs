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

//! Implements the explicit-state [`GraphicsDevice`] contract on top of `wgpu`.
//!
//! `wgpu` tracks resource states and descriptor memory itself, so this device
//! keeps the engine's model as bookkeeping: descriptor heaps are tables of
//! [`ViewDesc`]s addressed through fake handles, barriers are accepted and
//! ignored, and root descriptor tables are gathered into one bind group per draw.

use super::command::{self, BindGroupKey};
use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_texture_format, IntoWgpu};
use crate::graphics::{cpu_heap_base, decode_cpu_handle, gpu_heap_base, DESCRIPTOR_INCREMENT};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use stratum_core::renderer::api::{
    Command, CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapId, DescriptorHeapInfo,
    DescriptorHeapType, FenceId, Format, GpuDescriptorHandle, PipelineDesc, PipelineId,
    ResourceDesc, ResourceDimension, ResourceId, ResourceState, ResourceUsage, RootParameter,
    ShaderId, ShaderSource, ShaderStage, TextureKind, VertexLayout, ViewDesc,
};
use stratum_core::renderer::traits::{GraphicsDevice, SwapChainDesc};
use stratum_core::renderer::{PipelineError, RenderError, ResourceError, ShaderError};
use stratum_core::renderer::MeshVertex;

/// Binding index of the sampler paired with the texture bound at root slot `slot`.
///
/// Root slot `n` maps to `@group(0) @binding(n)`, its sampler to
/// `@group(0) @binding(SAMPLER_BINDING_BASE + n)`.
pub const SAMPLER_BINDING_BASE: u32 = 16;

// --- Bookkeeping entries ---

pub(crate) enum ResourceKind {
    Buffer(wgpu::Buffer),
    Texture(wgpu::Texture),
    /// A swap-chain image. Resolves to whichever surface texture is current.
    BackBuffer,
}

pub(crate) struct ResourceEntry {
    pub desc: ResourceDesc,
    pub kind: ResourceKind,
}

pub(crate) struct HeapEntry {
    pub desc: DescriptorHeapDesc,
    pub views: Vec<Option<ViewDesc>>,
}

struct ShaderEntry {
    module: wgpu::ShaderModule,
    entry_point: String,
    stage: ShaderStage,
}

pub(crate) struct PipelineEntry {
    pub label: String,
    pub pipeline: wgpu::RenderPipeline,
    pub layout: wgpu::BindGroupLayout,
    pub root_parameters: Vec<RootParameter>,
}

struct FenceEntry {
    completed: Arc<AtomicU64>,
    signaled: u64,
}

pub(crate) struct Samplers {
    pub linear: wgpu::Sampler,
    pub comparison: wgpu::Sampler,
}

impl Samplers {
    fn new(device: &wgpu::Device) -> Self {
        let linear = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Stratum Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let comparison = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Stratum Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self { linear, comparison }
    }

    pub fn for_kind(&self, kind: TextureKind) -> &wgpu::Sampler {
        match kind {
            TextureKind::Depth | TextureKind::DepthArray => &self.comparison,
            TextureKind::Color | TextureKind::Cube => &self.linear,
        }
    }
}

/// Everything the device tracks behind its state lock.
pub(crate) struct WgpuState {
    pub resources: HashMap<ResourceId, ResourceEntry>,
    pub heaps: HashMap<u64, HeapEntry>,
    shaders: HashMap<ShaderId, ShaderEntry>,
    pub pipelines: HashMap<PipelineId, PipelineEntry>,
    fences: HashMap<FenceId, FenceEntry>,
    pub samplers: Samplers,
    pub bind_groups: HashMap<BindGroupKey, wgpu::BindGroup>,
    back_buffers: Vec<ResourceId>,
    buffer_count: u32,
    current_back_buffer: u32,
    queue_created: bool,
}

impl WgpuState {
    fn create_back_buffers(&mut self, next_id: &AtomicU64, width: u32, height: u32, format: Format) {
        self.back_buffers = (0..self.buffer_count)
            .map(|i| {
                let id = ResourceId(next_id.fetch_add(1, Ordering::Relaxed));
                self.resources.insert(
                    id,
                    ResourceEntry {
                        desc: ResourceDesc::texture_2d(
                            format!("Back Buffer {i}"),
                            width,
                            height,
                            format,
                            ResourceUsage::RenderTarget,
                        ),
                        kind: ResourceKind::BackBuffer,
                    },
                );
                id
            })
            .collect();
    }

    /// Drops every cached bind group that reads descriptor `index` of `heap`.
    fn invalidate_bind_groups(&mut self, heap: u64, index: u32) {
        self.bind_groups
            .retain(|key, _| !key.tables.iter().any(|t| *t == (heap, index)));
    }
}

/// A [`GraphicsDevice`] backed by a `wgpu` device, queue, and window surface.
pub struct WgpuDevice {
    context: Mutex<WgpuGraphicsContext>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: Format,
    state: Mutex<WgpuState>,
    next_id: AtomicU64,
    // Raised from the device-lost callback.
    lost: Arc<AtomicBool>,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl WgpuDevice {
    /// Wraps an initialized graphics context.
    pub(crate) fn new(context: WgpuGraphicsContext) -> Result<Self, RenderError> {
        let format = from_wgpu_texture_format(context.surface_config.format).ok_or_else(|| {
            RenderError::InitializationFailed(format!(
                "unsupported surface format {:?}",
                context.surface_config.format
            ))
        })?;
        let device = context.device.clone();
        let queue = context.queue.clone();
        let samplers = Samplers::new(&device);
        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });
        log::info!(
            "WgpuDevice created on \"{}\" with surface format {:?}",
            context.adapter_name,
            format
        );
        Ok(Self {
            context: Mutex::new(context),
            device,
            queue,
            format,
            state: Mutex::new(WgpuState {
                resources: HashMap::new(),
                heaps: HashMap::new(),
                shaders: HashMap::new(),
                pipelines: HashMap::new(),
                fences: HashMap::new(),
                samplers,
                bind_groups: HashMap::new(),
                back_buffers: Vec::new(),
                buffer_count: 0,
                current_back_buffer: 0,
                queue_created: false,
            }),
            next_id: AtomicU64::new(1),
            lost,
        })
    }

    fn check_lost(&self) -> Result<(), RenderError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(RenderError::DeviceLost);
        }
        Ok(())
    }

    fn generate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, WgpuState>, ResourceError> {
        self.state
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned (state): {e}")))
    }

    fn lock_context(&self) -> Result<MutexGuard<'_, WgpuGraphicsContext>, RenderError> {
        self.context.lock().map_err(|e| {
            RenderError::Internal(format!("Mutex poisoned (context): {e}"))
        })
    }

    /// Blocks until the GPU went through all submitted work.
    pub fn poll_device_blocking(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("Failed to poll device: {e:?}");
        }
    }

    fn create_bind_group_layout(&self, label: &str, params: &[RootParameter]) -> wgpu::BindGroupLayout {
        let mut entries = Vec::with_capacity(params.len() * 2);
        for (slot, param) in params.iter().enumerate() {
            let slot = slot as u32;
            let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
            match param {
                RootParameter::ConstantBuffer => entries.push(wgpu::BindGroupLayoutEntry {
                    binding: slot,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }),
                RootParameter::ShaderResource(kind) => {
                    let (sample_type, view_dimension, sampler) = match kind {
                        TextureKind::Color => (
                            wgpu::TextureSampleType::Float { filterable: true },
                            wgpu::TextureViewDimension::D2,
                            wgpu::SamplerBindingType::Filtering,
                        ),
                        TextureKind::Cube => (
                            wgpu::TextureSampleType::Float { filterable: true },
                            wgpu::TextureViewDimension::Cube,
                            wgpu::SamplerBindingType::Filtering,
                        ),
                        TextureKind::Depth => (
                            wgpu::TextureSampleType::Depth,
                            wgpu::TextureViewDimension::D2,
                            wgpu::SamplerBindingType::Comparison,
                        ),
                        TextureKind::DepthArray => (
                            wgpu::TextureSampleType::Depth,
                            wgpu::TextureViewDimension::D2Array,
                            wgpu::SamplerBindingType::Comparison,
                        ),
                    };
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: slot,
                        visibility,
                        ty: wgpu::BindingType::Texture {
                            sample_type,
                            view_dimension,
                            multisampled: false,
                        },
                        count: None,
                    });
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: SAMPLER_BINDING_BASE + slot,
                        visibility,
                        ty: wgpu::BindingType::Sampler(sampler),
                        count: None,
                    });
                }
            }
        }
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} Root Signature")),
                entries: &entries,
            })
    }
}

fn texture_usages(usage: ResourceUsage) -> wgpu::TextureUsages {
    match usage {
        ResourceUsage::RenderTarget | ResourceUsage::DepthStencil => {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        }
        _ => wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    }
}

fn buffer_usages(usage: ResourceUsage) -> wgpu::BufferUsages {
    let usage = match usage {
        ResourceUsage::Constant => wgpu::BufferUsages::UNIFORM,
        ResourceUsage::Vertex => wgpu::BufferUsages::VERTEX,
        ResourceUsage::Index => wgpu::BufferUsages::INDEX,
        _ => wgpu::BufferUsages::empty(),
    };
    usage | wgpu::BufferUsages::COPY_DST
}

impl GraphicsDevice for WgpuDevice {
    // --- Queue & swap chain ---

    fn create_command_queue(&self) -> Result<(), RenderError> {
        // The queue comes with the device; this only marks the step as done.
        self.lock()?.queue_created = true;
        Ok(())
    }

    fn create_swap_chain(&self, desc: &SwapChainDesc) -> Result<(), RenderError> {
        self.lock_context()?
            .configure(desc.width, desc.height, desc.vsync);
        let mut state = self.lock()?;
        state.buffer_count = desc.buffer_count.max(1);
        state.current_back_buffer = 0;
        state.create_back_buffers(&self.next_id, desc.width.max(1), desc.height.max(1), self.format);
        log::info!(
            "Swap chain created: {}x{}, {} buffers, vsync {}",
            desc.width,
            desc.height,
            state.buffer_count,
            desc.vsync
        );
        Ok(())
    }

    fn swap_chain_format(&self) -> Format {
        self.format
    }

    fn back_buffer_count(&self) -> u32 {
        self.state.lock().map(|s| s.buffer_count).unwrap_or(0)
    }

    fn back_buffer(&self, index: u32) -> Result<ResourceId, ResourceError> {
        self.lock()?
            .back_buffers
            .get(index as usize)
            .copied()
            .ok_or(ResourceError::OutOfBounds)
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.state
            .lock()
            .map(|s| s.current_back_buffer)
            .unwrap_or(0)
    }

    fn release_back_buffers(&self) {
        if let Ok(mut state) = self.state.lock() {
            let released = std::mem::take(&mut state.back_buffers);
            for id in released {
                state.resources.remove(&id);
            }
        }
        if let Ok(mut context) = self.context.lock() {
            context.discard_frame();
        }
    }

    fn resize_swap_chain(&self, width: u32, height: u32) -> Result<(), RenderError> {
        {
            let state = self.lock()?;
            if !state.back_buffers.is_empty() {
                return Err(RenderError::RenderingFailed(
                    "swap chain resized while its back buffers are still referenced".to_string(),
                ));
            }
        }
        self.lock_context()?.resize(width, height);
        let mut state = self.lock()?;
        state.current_back_buffer = 0;
        state.create_back_buffers(&self.next_id, width.max(1), height.max(1), self.format);
        Ok(())
    }

    // --- Resources ---

    fn create_resource(
        &self,
        desc: &ResourceDesc,
        _initial_state: ResourceState,
    ) -> Result<ResourceId, ResourceError> {
        let kind = match desc.dimension {
            ResourceDimension::Buffer { size } => {
                if size == 0 {
                    return Err(ResourceError::BackendError(format!(
                        "resource '{}' has an empty extent",
                        desc.label
                    )));
                }
                ResourceKind::Buffer(self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&desc.label),
                    // Uniform bindings and queue writes need 16- and 4-byte multiples.
                    size: size.next_multiple_of(16),
                    usage: buffer_usages(desc.usage),
                    mapped_at_creation: false,
                }))
            }
            ResourceDimension::Texture2D {
                width,
                height,
                array_layers,
                format,
            } => {
                if width == 0 || height == 0 || array_layers == 0 {
                    return Err(ResourceError::BackendError(format!(
                        "resource '{}' has an empty extent",
                        desc.label
                    )));
                }
                ResourceKind::Texture(self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&desc.label),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: array_layers,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: format.into_wgpu(),
                    usage: texture_usages(desc.usage),
                    view_formats: &[],
                }))
            }
        };
        let id = ResourceId(self.generate_id());
        self.lock()?.resources.insert(
            id,
            ResourceEntry {
                desc: desc.clone(),
                kind,
            },
        );
        log::trace!("Created resource '{}' ({:?})", desc.label, id);
        Ok(id)
    }

    fn destroy_resource(&self, id: ResourceId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match state.resources.remove(&id).map(|e| e.kind) {
            Some(ResourceKind::Buffer(buffer)) => buffer.destroy(),
            Some(ResourceKind::Texture(texture)) => texture.destroy(),
            Some(ResourceKind::BackBuffer) | None => {}
        }
    }

    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let state = self.lock()?;
        let entry = state.resources.get(&id).ok_or(ResourceError::NotFound)?;
        let (ResourceKind::Buffer(buffer), ResourceDimension::Buffer { size }) =
            (&entry.kind, entry.desc.dimension)
        else {
            return Err(ResourceError::InvalidHandle);
        };
        if offset + data.len() as u64 > size {
            return Err(ResourceError::OutOfBounds);
        }
        // Queue writes must cover a multiple of four bytes.
        if data.len() % 4 == 0 {
            self.queue.write_buffer(buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(data.len().next_multiple_of(4), 0);
            self.queue.write_buffer(buffer, offset, &padded);
        }
        Ok(())
    }

    fn write_texture(&self, id: ResourceId, layer: u32, data: &[u8]) -> Result<(), ResourceError> {
        let state = self.lock()?;
        let entry = state.resources.get(&id).ok_or(ResourceError::NotFound)?;
        let (
            ResourceKind::Texture(texture),
            ResourceDimension::Texture2D {
                width,
                height,
                array_layers,
                format,
            },
        ) = (&entry.kind, entry.desc.dimension)
        else {
            return Err(ResourceError::InvalidHandle);
        };
        let row_bytes = width * format.bytes_per_pixel();
        if layer >= array_layers || data.len() != (row_bytes * height) as usize {
            return Err(ResourceError::OutOfBounds);
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_bytes),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    // --- Descriptors ---

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, ResourceError> {
        if desc.capacity == 0 {
            return Err(stratum_core::renderer::DescriptorError::ZeroCapacity {
                heap_type: desc.heap_type,
            }
            .into());
        }
        let id = self.generate_id();
        self.lock()?.heaps.insert(
            id,
            HeapEntry {
                desc: *desc,
                views: vec![None; desc.capacity as usize],
            },
        );
        log::debug!(
            "Descriptor heap {id} created: {:?} x{}",
            desc.heap_type,
            desc.capacity
        );
        Ok(DescriptorHeapInfo {
            id: DescriptorHeapId(id),
            cpu_base: CpuDescriptorHandle {
                ptr: cpu_heap_base(id),
            },
            gpu_base: GpuDescriptorHandle {
                ptr: if desc.shader_visible {
                    gpu_heap_base(id)
                } else {
                    0
                },
            },
            increment: DESCRIPTOR_INCREMENT,
        })
    }

    fn create_view(
        &self,
        heap: DescriptorHeapId,
        handle: CpuDescriptorHandle,
        view: &ViewDesc,
    ) -> Result<(), ResourceError> {
        let mut state = self.lock()?;
        let (handle_heap, index) = decode_cpu_handle(handle.ptr);
        if handle_heap != heap.0 {
            return Err(ResourceError::InvalidHandle);
        }
        let entry = state
            .heaps
            .get_mut(&heap.0)
            .ok_or(ResourceError::InvalidHandle)?;
        let compatible = matches!(
            (entry.desc.heap_type, view),
            (
                DescriptorHeapType::CbvSrvUav,
                ViewDesc::ConstantBuffer { .. } | ViewDesc::ShaderResource { .. }
            ) | (DescriptorHeapType::Rtv, ViewDesc::RenderTarget { .. })
                | (DescriptorHeapType::Dsv, ViewDesc::DepthStencil { .. })
        );
        if !compatible {
            return Err(ResourceError::InvalidHandle);
        }
        *entry
            .views
            .get_mut(index as usize)
            .ok_or(ResourceError::OutOfBounds)? = Some(*view);
        state.invalidate_bind_groups(heap.0, index);
        Ok(())
    }

    // --- Shaders & pipelines ---

    fn compile_shader(&self, source: &ShaderSource) -> Result<ShaderId, ShaderError> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&source.path),
                source: wgpu::ShaderSource::Wgsl(source.code.as_str().into()),
            });
        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
            .map(|m| match &m.location {
                Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
                None => m.message.clone(),
            })
            .collect();
        if !errors.is_empty() {
            return Err(ShaderError::CompilationError {
                label: source.path.clone(),
                details: errors.join("\n"),
            });
        }

        let id = ShaderId(self.generate_id());
        let mut state = self.state.lock().map_err(|e| ShaderError::CompilationError {
            label: source.path.clone(),
            details: format!("Mutex poisoned (state): {e}"),
        })?;
        state.shaders.insert(
            id,
            ShaderEntry {
                module,
                entry_point: source.entry_point.clone(),
                stage: source.stage,
            },
        );
        log::debug!("Compiled {:?} shader '{}'", source.stage, source.path);
        Ok(id)
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineId, PipelineError> {
        let layout = self.create_bind_group_layout(&desc.label, &desc.root_parameters);
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", desc.label)),
                bind_group_layouts: &[Some(&layout)],
                immediate_size: 0,
            });

        let mut state = self.state.lock().map_err(|e| PipelineError::CompilationFailed {
            label: desc.label.clone(),
            details: format!("Mutex poisoned (state): {e}"),
        })?;
        let shader = |id: ShaderId, stage: ShaderStage| {
            state
                .shaders
                .get(&id)
                .filter(|s| s.stage == stage)
                .ok_or_else(|| PipelineError::InvalidShaderModule {
                    id,
                    pipeline_label: desc.label.clone(),
                })
        };
        let vertex = shader(desc.vertex_shader, ShaderStage::Vertex)?;
        let pixel = desc
            .pixel_shader
            .map(|id| shader(id, ShaderStage::Pixel))
            .transpose()?;

        let config = &desc.config;
        let mesh_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        let mesh_layout = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &mesh_attributes,
        }];
        let buffers: &[wgpu::VertexBufferLayout] = match config.vertex_layout {
            VertexLayout::None => &[],
            VertexLayout::Mesh => &mesh_layout,
        };
        let targets: Vec<Option<wgpu::ColorTargetState>> = config
            .render_target_formats
            .iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format: format.into_wgpu(),
                    blend: config.blend.into_wgpu(),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();
        let depth_stencil = config.depth_format.map(|format| wgpu::DepthStencilState {
            format: format.into_wgpu(),
            depth_write_enabled: Some(config.depth.write_enabled),
            depth_compare: if config.depth.test_enabled {
                Some(config.depth.compare.into_wgpu())
            } else {
                Some(wgpu::CompareFunction::Always)
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: config.rasterizer.depth_bias,
                slope_scale: config.rasterizer.slope_scaled_depth_bias,
                clamp: 0.0,
            },
        });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&desc.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(&vertex.entry_point),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers,
                },
                fragment: pixel.map(|pixel| wgpu::FragmentState {
                    module: &pixel.module,
                    entry_point: Some(&pixel.entry_point),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &targets,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: config.rasterizer.cull_mode.into_wgpu(),
                    ..Default::default()
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: config.sample_count.max(1),
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            });

        let id = PipelineId(self.generate_id());
        state.pipelines.insert(
            id,
            PipelineEntry {
                label: desc.label.clone(),
                pipeline,
                layout,
                root_parameters: desc.root_parameters.clone(),
            },
        );
        log::debug!("Pipeline '{}' created as {:?}", desc.label, id);
        Ok(id)
    }

    fn destroy_pipeline(&self, id: PipelineId) {
        if let Ok(mut state) = self.state.lock() {
            state.pipelines.remove(&id);
            state.bind_groups.retain(|key, _| key.pipeline != id);
        }
    }

    // --- Submission ---

    fn execute_command_list(&self, commands: &[Command]) -> Result<(), RenderError> {
        self.check_lost()?;
        let mut state = self.lock()?;
        if !state.queue_created {
            return Err(RenderError::NotInitialized);
        }
        let mut context = self.lock_context()?;
        let steps = command::translate(&mut state, &mut context, &self.device, commands)?;
        drop(context);
        drop(state);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Stratum Frame Encoder"),
            });
        command::encode(&mut encoder, &steps);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&self) -> Result<(), RenderError> {
        self.check_lost()?;
        self.lock_context()?
            .present()
            .map_err(|e| RenderError::SurfaceAcquisitionFailed(e.to_string()))?;
        let mut state = self.lock()?;
        state.current_back_buffer = (state.current_back_buffer + 1) % state.buffer_count.max(1);
        Ok(())
    }

    // --- Fences ---

    fn create_fence(&self, initial_value: u64) -> Result<FenceId, RenderError> {
        let id = FenceId(self.generate_id());
        self.lock()?.fences.insert(
            id,
            FenceEntry {
                completed: Arc::new(AtomicU64::new(initial_value)),
                signaled: initial_value,
            },
        );
        Ok(id)
    }

    fn signal_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError> {
        let mut state = self.lock()?;
        let entry = state
            .fences
            .get_mut(&fence)
            .ok_or(RenderError::ResourceError(ResourceError::NotFound))?;
        entry.signaled = entry.signaled.max(value);
        let completed = Arc::clone(&entry.completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }

    fn fence_completed_value(&self, fence: FenceId) -> u64 {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.fences.get(&fence).map(|f| f.completed.load(Ordering::Acquire)))
            .unwrap_or(0)
    }

    fn wait_for_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError> {
        let (completed, signaled) = {
            let state = self.lock()?;
            let entry = state
                .fences
                .get(&fence)
                .ok_or(RenderError::ResourceError(ResourceError::NotFound))?;
            (Arc::clone(&entry.completed), entry.signaled)
        };
        if value > signaled {
            return Err(RenderError::RenderingFailed(format!(
                "waiting for fence value {value} that was never signaled (last signal {signaled})"
            )));
        }
        while completed.load(Ordering::Acquire) < value {
            self.device
                .poll(wgpu::PollType::wait_indefinitely())
                .map_err(|e| RenderError::Internal(format!("Device poll failed: {e:?}")))?;
        }
        Ok(())
    }
}
