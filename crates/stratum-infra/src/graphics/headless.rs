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

//! A graphics backend with no GPU behind it.
//!
//! [`HeadlessDevice`] implements the whole [`GraphicsDevice`] contract in
//! memory. It keeps every executed command list and validates it against the
//! explicit-state rules the render core relies on:
//!
//! - a barrier's `before` state must match the resource's current state;
//! - render targets and depth targets must be in a writable state when bound or cleared;
//! - at draw time every root slot of the bound pipeline must hold a view of
//!   the right kind, and every sampled texture must be shader-readable;
//! - a back buffer must be in the present state when presented.
//!
//! Fences are modeled fully: a signal is only reached when the test (or the
//! auto-complete mode) says the GPU got there, and waiting blocks on a
//! [`Condvar`] until then.

use crate::graphics::{
    cpu_heap_base, decode_cpu_handle, decode_gpu_handle, gpu_heap_base, DESCRIPTOR_INCREMENT,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use stratum_core::renderer::api::{
    Command, CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapId, DescriptorHeapInfo,
    DescriptorHeapType, FenceId, Format, GpuDescriptorHandle, PipelineDesc, PipelineId,
    ResourceDesc, ResourceDimension, ResourceId, ResourceState, ResourceUsage, RootParameter,
    ShaderId, ShaderSource, ViewDesc,
};
use stratum_core::renderer::traits::{
    AdapterInfo, AdapterKind, GraphicsBackend, GraphicsDevice, SwapChainDesc,
};
use stratum_core::renderer::{
    DescriptorError, PipelineError, RenderError, ResourceError, ShaderError,
};

/// Format of the virtual back buffers.
pub const HEADLESS_SWAP_CHAIN_FORMAT: Format = Format::Bgra8Unorm;

type CallLog = Arc<Mutex<Vec<String>>>;

fn log_call(calls: &CallLog, name: &str) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(name.to_string());
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────

/// The [`GraphicsBackend`] of the headless device.
#[derive(Debug)]
pub struct HeadlessBackend {
    adapters: Vec<AdapterInfo>,
    auto_complete_fences: bool,
    factory_created: bool,
    calls: CallLog,
    device: Option<Arc<HeadlessDevice>>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// A backend exposing one discrete and one software adapter, whose fences
    /// complete as soon as they are signaled.
    pub fn new() -> Self {
        Self {
            adapters: vec![
                AdapterInfo {
                    index: 0,
                    name: "Headless Discrete Adapter".to_string(),
                    kind: AdapterKind::Discrete,
                    api: "Headless".to_string(),
                    dedicated_video_memory: 4 << 30,
                },
                AdapterInfo {
                    index: 1,
                    name: "Headless Software Rasterizer".to_string(),
                    kind: AdapterKind::Software,
                    api: "Headless".to_string(),
                    dedicated_video_memory: 0,
                },
            ],
            auto_complete_fences: true,
            factory_created: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            device: None,
        }
    }

    /// Replaces the adapters the backend reports.
    pub fn with_adapters(mut self, adapters: Vec<AdapterInfo>) -> Self {
        self.adapters = adapters;
        self
    }

    /// Sets whether signaled fence values complete immediately.
    ///
    /// With auto-completion off, fence values are only reached through
    /// [`HeadlessDevice::complete_fence`].
    pub fn with_fence_auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete_fences = enabled;
        self
    }

    /// The device created by [`GraphicsBackend::create_device`], if any.
    pub fn device(&self) -> Option<Arc<HeadlessDevice>> {
        self.device.clone()
    }

    /// Every initialization call made on the backend and its device, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn enable_debug_layer(&mut self, enabled: bool) -> Result<(), RenderError> {
        log_call(&self.calls, "enable_debug_layer");
        log::debug!("Headless backend: debug layer {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn create_factory(&mut self) -> Result<(), RenderError> {
        log_call(&self.calls, "create_factory");
        self.factory_created = true;
        Ok(())
    }

    fn enumerate_adapters(&mut self) -> Result<Vec<AdapterInfo>, RenderError> {
        log_call(&self.calls, "enumerate_adapters");
        if !self.factory_created {
            return Err(RenderError::InitializationFailed(
                "adapters enumerated before the factory was created".to_string(),
            ));
        }
        Ok(self.adapters.clone())
    }

    fn create_device(
        &mut self,
        adapter: &AdapterInfo,
    ) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        log_call(&self.calls, "create_device");
        if !self.adapters.contains(adapter) {
            return Err(RenderError::InitializationFailed(format!(
                "unknown adapter \"{}\"",
                adapter.name
            )));
        }
        let device = Arc::new(HeadlessDevice::new(
            Arc::clone(&self.calls),
            self.auto_complete_fences,
        ));
        self.device = Some(Arc::clone(&device));
        Ok(device)
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Device state
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct TrackedResource {
    desc: ResourceDesc,
    state: ResourceState,
}

#[derive(Debug)]
struct HeapSlots {
    desc: DescriptorHeapDesc,
    views: Vec<Option<ViewDesc>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct FenceValues {
    signaled: u64,
    completed: u64,
}

#[derive(Debug)]
struct SwapChain {
    desc: SwapChainDesc,
    back_buffers: Vec<ResourceId>,
    current: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    queue_created: bool,
    swap_chain: Option<SwapChain>,
    resources: HashMap<ResourceId, TrackedResource>,
    heaps: HashMap<u64, HeapSlots>,
    shaders: HashMap<ShaderId, ShaderSource>,
    pipelines: HashMap<PipelineId, PipelineDesc>,
    fences: HashMap<FenceId, FenceValues>,
    executed: Vec<Vec<Command>>,
    presented: u64,
}

impl HeadlessState {
    fn resource_mut(&mut self, id: ResourceId) -> Result<&mut TrackedResource, RenderError> {
        self.resources
            .get_mut(&id)
            .ok_or(RenderError::ResourceError(ResourceError::NotFound))
    }

    fn cpu_view(&self, handle: CpuDescriptorHandle) -> Option<ViewDesc> {
        let (heap, index) = decode_cpu_handle(handle.ptr);
        self.heaps.get(&heap)?.views.get(index as usize).copied().flatten()
    }

    fn gpu_view(&self, handle: GpuDescriptorHandle) -> Option<ViewDesc> {
        let (heap, index) = decode_gpu_handle(handle.ptr);
        let slots = self.heaps.get(&heap)?;
        if !slots.desc.shader_visible {
            return None;
        }
        slots.views.get(index as usize).copied().flatten()
    }

    fn create_back_buffers(&mut self, next_id: &AtomicU64, width: u32, height: u32) {
        let Some(count) = self.swap_chain.as_ref().map(|s| s.desc.buffer_count.max(1)) else {
            return;
        };
        let mut back_buffers = Vec::with_capacity(count as usize);
        for index in 0..count {
            let id = ResourceId(next_id.fetch_add(1, Ordering::Relaxed));
            self.resources.insert(
                id,
                TrackedResource {
                    desc: ResourceDesc::texture_2d(
                        format!("Headless Back Buffer {index}"),
                        width,
                        height,
                        HEADLESS_SWAP_CHAIN_FORMAT,
                        ResourceUsage::RenderTarget,
                    ),
                    state: ResourceState::Present,
                },
            );
            back_buffers.push(id);
        }
        if let Some(swap_chain) = self.swap_chain.as_mut() {
            swap_chain.back_buffers = back_buffers;
            swap_chain.desc.width = width;
            swap_chain.desc.height = height;
            swap_chain.current = 0;
        }
    }

    /// Replays `commands` against the tracked resource states.
    fn validate(&mut self, commands: &[Command]) -> Result<(), RenderError> {
        let mut pipeline: Option<PipelineId> = None;
        let mut tables: HashMap<u32, GpuDescriptorHandle> = HashMap::new();
        let mut targets_bound = false;
        let mut open_events = 0usize;

        for command in commands {
            match command {
                Command::Barrier(barriers) => {
                    for barrier in barriers {
                        let tracked = self.resource_mut(barrier.resource)?;
                        if tracked.state != barrier.before {
                            return Err(RenderError::RenderingFailed(format!(
                                "barrier on '{}' expects {:?}, but the resource is in {:?}",
                                tracked.desc.label, barrier.before, tracked.state
                            )));
                        }
                        tracked.state = barrier.after;
                    }
                }
                Command::SetDescriptorHeaps(heaps) => {
                    for heap in heaps {
                        if !self.heaps.contains_key(&heap.0) {
                            return Err(ResourceError::InvalidHandle.into());
                        }
                    }
                }
                Command::SetViewport(_) => {}
                Command::ClearRenderTarget { rtv, .. } => {
                    self.expect_attachment(*rtv, ResourceState::RenderTarget)?;
                }
                Command::ClearDepthStencil { dsv, .. } => {
                    self.expect_attachment(*dsv, ResourceState::DepthWrite)?;
                }
                Command::SetRenderTargets { rtvs, dsv } => {
                    for rtv in rtvs {
                        self.expect_attachment(*rtv, ResourceState::RenderTarget)?;
                    }
                    if let Some(dsv) = dsv {
                        self.expect_attachment(*dsv, ResourceState::DepthWrite)?;
                    }
                    targets_bound = !rtvs.is_empty() || dsv.is_some();
                }
                Command::SetPipelineState(id) => {
                    if !self.pipelines.contains_key(id) {
                        return Err(PipelineError::InvalidPipeline { id: *id }.into());
                    }
                    pipeline = Some(*id);
                    tables.clear();
                }
                Command::SetRootDescriptorTable { slot, table } => {
                    if self.gpu_view(*table).is_none() {
                        return Err(RenderError::RenderingFailed(format!(
                            "root slot {slot} bound to an empty or non shader-visible descriptor"
                        )));
                    }
                    tables.insert(*slot, *table);
                }
                Command::SetVertexBuffer(view) => {
                    self.resource_mut(view.resource)?;
                }
                Command::SetIndexBuffer(view) => {
                    self.resource_mut(view.resource)?;
                }
                Command::Draw { .. } | Command::DrawIndexed { .. } => {
                    let id = pipeline.ok_or_else(|| {
                        RenderError::RenderingFailed("draw without a pipeline".to_string())
                    })?;
                    if !targets_bound {
                        return Err(RenderError::RenderingFailed(
                            "draw without render targets".to_string(),
                        ));
                    }
                    self.validate_root_tables(id, &tables)?;
                }
                Command::BeginEvent(_) => open_events += 1,
                Command::EndEvent => {
                    open_events = open_events.checked_sub(1).ok_or_else(|| {
                        RenderError::RenderingFailed("unbalanced EndEvent".to_string())
                    })?;
                }
            }
        }

        if open_events != 0 {
            return Err(RenderError::RenderingFailed(format!(
                "{open_events} debug events left open"
            )));
        }
        Ok(())
    }

    fn expect_attachment(
        &self,
        handle: CpuDescriptorHandle,
        state: ResourceState,
    ) -> Result<(), RenderError> {
        let resource = match self.cpu_view(handle) {
            Some(ViewDesc::RenderTarget { resource, .. }) if state == ResourceState::RenderTarget => {
                resource
            }
            Some(ViewDesc::DepthStencil { resource, .. }) if state == ResourceState::DepthWrite => {
                resource
            }
            _ => return Err(ResourceError::InvalidHandle.into()),
        };
        let tracked = self
            .resources
            .get(&resource)
            .ok_or(RenderError::ResourceError(ResourceError::NotFound))?;
        if tracked.state != state {
            return Err(RenderError::RenderingFailed(format!(
                "'{}' used as an attachment while in {:?}",
                tracked.desc.label, tracked.state
            )));
        }
        Ok(())
    }

    fn validate_root_tables(
        &self,
        pipeline: PipelineId,
        tables: &HashMap<u32, GpuDescriptorHandle>,
    ) -> Result<(), RenderError> {
        let desc = self
            .pipelines
            .get(&pipeline)
            .ok_or(PipelineError::InvalidPipeline { id: pipeline })?;
        for (slot, parameter) in desc.root_parameters.iter().enumerate() {
            let view = tables
                .get(&(slot as u32))
                .and_then(|table| self.gpu_view(*table))
                .ok_or_else(|| {
                    RenderError::RenderingFailed(format!(
                        "pipeline '{}' draws with root slot {slot} unbound",
                        desc.label
                    ))
                })?;
            match (parameter, view) {
                (RootParameter::ConstantBuffer, ViewDesc::ConstantBuffer { .. }) => {}
                (RootParameter::ShaderResource(_), ViewDesc::ShaderResource { resource, .. }) => {
                    let tracked = self
                        .resources
                        .get(&resource)
                        .ok_or(RenderError::ResourceError(ResourceError::NotFound))?;
                    if !tracked.state.is_shader_readable() {
                        return Err(RenderError::RenderingFailed(format!(
                            "pipeline '{}' samples '{}' while it is in {:?}",
                            desc.label, tracked.desc.label, tracked.state
                        )));
                    }
                }
                _ => {
                    return Err(RenderError::RenderingFailed(format!(
                        "pipeline '{}' root slot {slot} holds the wrong kind of view",
                        desc.label
                    )))
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Device
// ─────────────────────────────────────────────────────────────────────────

/// An in-memory [`GraphicsDevice`] that records and validates everything it executes.
#[derive(Debug)]
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
    fence_reached: Condvar,
    auto_complete: AtomicBool,
    lost: AtomicBool,
    next_id: AtomicU64,
    calls: CallLog,
}

impl HeadlessDevice {
    fn new(calls: CallLog, auto_complete: bool) -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
            fence_reached: Condvar::new(),
            auto_complete: AtomicBool::new(auto_complete),
            lost: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            calls,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HeadlessState>, ResourceError> {
        self.state
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned (state): {e}")))
    }

    fn generate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // --- Inspection ---

    /// Every command list executed so far, oldest first.
    pub fn executed_command_lists(&self) -> Vec<Vec<Command>> {
        self.lock().map(|s| s.executed.clone()).unwrap_or_default()
    }

    /// The most recently executed command list.
    pub fn last_command_list(&self) -> Option<Vec<Command>> {
        self.lock().ok().and_then(|s| s.executed.last().cloned())
    }

    /// Number of successful presents.
    pub fn present_count(&self) -> u64 {
        self.lock().map(|s| s.presented).unwrap_or(0)
    }

    /// Simulates a lost device: every later submission and present fails.
    pub fn lose_device(&self) {
        log::warn!("Headless device marked as lost");
        self.lost.store(true, Ordering::Release);
    }

    fn check_lost(&self) -> Result<(), RenderError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(RenderError::DeviceLost);
        }
        Ok(())
    }

    /// The state the device believes `id` is in after everything executed so far.
    pub fn resource_state(&self, id: ResourceId) -> Option<ResourceState> {
        self.lock().ok()?.resources.get(&id).map(|r| r.state)
    }

    /// The creation parameters of a live resource.
    pub fn resource_desc(&self, id: ResourceId) -> Option<ResourceDesc> {
        self.lock().ok()?.resources.get(&id).map(|r| r.desc.clone())
    }

    /// Number of live resources, back buffers included.
    pub fn live_resource_count(&self) -> usize {
        self.lock().map(|s| s.resources.len()).unwrap_or(0)
    }

    /// Number of live pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.lock().map(|s| s.pipelines.len()).unwrap_or(0)
    }

    /// Paths of every shader compiled so far.
    pub fn compiled_shader_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lock()
            .map(|s| s.shaders.values().map(|src| src.path.clone()).collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// The view written at `handle`.
    pub fn view(&self, handle: CpuDescriptorHandle) -> Option<ViewDesc> {
        self.lock().ok()?.cpu_view(handle)
    }

    /// The highest value ever signaled on `fence`.
    pub fn fence_signaled_value(&self, fence: FenceId) -> u64 {
        self.lock()
            .ok()
            .and_then(|s| s.fences.get(&fence).map(|f| f.signaled))
            .unwrap_or(0)
    }

    // --- External stimuli ---

    /// Marks `fence` as having reached `value` and wakes every waiter.
    pub fn complete_fence(&self, fence: FenceId, value: u64) {
        if let Ok(mut state) = self.state.lock() {
            let values = state.fences.entry(fence).or_default();
            values.completed = values.completed.max(value);
        }
        self.fence_reached.notify_all();
    }

    /// Sets whether signals complete immediately.
    pub fn set_fence_auto_complete(&self, enabled: bool) {
        self.auto_complete.store(enabled, Ordering::Release);
    }
}

impl GraphicsDevice for HeadlessDevice {
    // --- Queue & swap chain ---

    fn create_command_queue(&self) -> Result<(), RenderError> {
        log_call(&self.calls, "create_command_queue");
        self.lock()?.queue_created = true;
        Ok(())
    }

    fn create_swap_chain(&self, desc: &SwapChainDesc) -> Result<(), RenderError> {
        log_call(&self.calls, "create_swap_chain");
        let mut state = self.lock()?;
        if !state.queue_created {
            return Err(RenderError::InitializationFailed(
                "swap chain created before the command queue".to_string(),
            ));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::InitializationFailed(format!(
                "swap chain size {}x{} is empty",
                desc.width, desc.height
            )));
        }
        state.swap_chain = Some(SwapChain {
            desc: *desc,
            back_buffers: Vec::new(),
            current: 0,
        });
        state.create_back_buffers(&self.next_id, desc.width, desc.height);
        Ok(())
    }

    fn swap_chain_format(&self) -> Format {
        HEADLESS_SWAP_CHAIN_FORMAT
    }

    fn back_buffer_count(&self) -> u32 {
        self.lock()
            .ok()
            .and_then(|s| s.swap_chain.as_ref().map(|c| c.desc.buffer_count.max(1)))
            .unwrap_or(0)
    }

    fn back_buffer(&self, index: u32) -> Result<ResourceId, ResourceError> {
        let state = self.lock()?;
        state
            .swap_chain
            .as_ref()
            .and_then(|c| c.back_buffers.get(index as usize).copied())
            .ok_or(ResourceError::OutOfBounds)
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.lock()
            .ok()
            .and_then(|s| s.swap_chain.as_ref().map(|c| c.current))
            .unwrap_or(0)
    }

    fn release_back_buffers(&self) {
        if let Ok(mut state) = self.state.lock() {
            let released = state
                .swap_chain
                .as_mut()
                .map(|c| std::mem::take(&mut c.back_buffers))
                .unwrap_or_default();
            for id in released {
                state.resources.remove(&id);
            }
        }
    }

    fn resize_swap_chain(&self, width: u32, height: u32) -> Result<(), RenderError> {
        let mut state = self.lock()?;
        match state.swap_chain.as_ref() {
            None => return Err(RenderError::NotInitialized),
            Some(chain) if !chain.back_buffers.is_empty() => {
                return Err(RenderError::RenderingFailed(
                    "swap chain resized while its back buffers are still referenced".to_string(),
                ))
            }
            Some(_) => {}
        }
        state.create_back_buffers(&self.next_id, width.max(1), height.max(1));
        log::debug!("Headless swap chain resized to {width}x{height}");
        Ok(())
    }

    // --- Resources ---

    fn create_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
    ) -> Result<ResourceId, ResourceError> {
        let empty = match desc.dimension {
            ResourceDimension::Buffer { size } => size == 0,
            ResourceDimension::Texture2D {
                width,
                height,
                array_layers,
                ..
            } => width == 0 || height == 0 || array_layers == 0,
        };
        if empty {
            return Err(ResourceError::BackendError(format!(
                "resource '{}' has an empty extent",
                desc.label
            )));
        }
        let id = ResourceId(self.generate_id());
        self.lock()?.resources.insert(
            id,
            TrackedResource {
                desc: desc.clone(),
                state: initial_state,
            },
        );
        Ok(id)
    }

    fn destroy_resource(&self, id: ResourceId) {
        if let Ok(mut state) = self.state.lock() {
            state.resources.remove(&id);
        }
    }

    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let state = self.lock()?;
        let tracked = state.resources.get(&id).ok_or(ResourceError::NotFound)?;
        match tracked.desc.dimension {
            ResourceDimension::Buffer { size } if offset + data.len() as u64 <= size => Ok(()),
            ResourceDimension::Buffer { .. } => Err(ResourceError::OutOfBounds),
            ResourceDimension::Texture2D { .. } => Err(ResourceError::InvalidHandle),
        }
    }

    fn write_texture(&self, id: ResourceId, layer: u32, data: &[u8]) -> Result<(), ResourceError> {
        let state = self.lock()?;
        let tracked = state.resources.get(&id).ok_or(ResourceError::NotFound)?;
        match tracked.desc.dimension {
            ResourceDimension::Texture2D {
                width,
                height,
                array_layers,
                format,
            } => {
                let expected = (width * height * format.bytes_per_pixel()) as usize;
                if layer >= array_layers || data.len() != expected {
                    return Err(ResourceError::OutOfBounds);
                }
                Ok(())
            }
            ResourceDimension::Buffer { .. } => Err(ResourceError::InvalidHandle),
        }
    }

    // --- Descriptors ---

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, ResourceError> {
        if desc.capacity == 0 {
            return Err(DescriptorError::ZeroCapacity {
                heap_type: desc.heap_type,
            }
            .into());
        }
        let id = self.generate_id();
        self.lock()?.heaps.insert(
            id,
            HeapSlots {
                desc: *desc,
                views: vec![None; desc.capacity as usize],
            },
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
        let resource = match view {
            ViewDesc::ConstantBuffer { resource, .. }
            | ViewDesc::ShaderResource { resource, .. }
            | ViewDesc::RenderTarget { resource, .. }
            | ViewDesc::DepthStencil { resource, .. } => *resource,
        };
        if !state.resources.contains_key(&resource) {
            return Err(ResourceError::NotFound);
        }
        let (handle_heap, index) = decode_cpu_handle(handle.ptr);
        if handle_heap != heap.0 {
            return Err(ResourceError::InvalidHandle);
        }
        let slots = state
            .heaps
            .get_mut(&heap.0)
            .ok_or(ResourceError::InvalidHandle)?;
        let compatible = matches!(
            (slots.desc.heap_type, view),
            (
                DescriptorHeapType::CbvSrvUav,
                ViewDesc::ConstantBuffer { .. } | ViewDesc::ShaderResource { .. }
            ) | (DescriptorHeapType::Rtv, ViewDesc::RenderTarget { .. })
                | (DescriptorHeapType::Dsv, ViewDesc::DepthStencil { .. })
        );
        if !compatible {
            return Err(ResourceError::InvalidHandle);
        }
        let slot = slots
            .views
            .get_mut(index as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        *slot = Some(*view);
        Ok(())
    }

    // --- Shaders & pipelines ---

    fn compile_shader(&self, source: &ShaderSource) -> Result<ShaderId, ShaderError> {
        if source.code.trim().is_empty() {
            return Err(ShaderError::CompilationError {
                label: source.path.clone(),
                details: "the shader source is empty".to_string(),
            });
        }
        if !source.code.contains(&format!("fn {}", source.entry_point)) {
            return Err(ShaderError::CompilationError {
                label: source.path.clone(),
                details: format!("entry point '{}' not found", source.entry_point),
            });
        }
        let id = ShaderId(self.generate_id());
        let mut state = self.state.lock().map_err(|e| ShaderError::CompilationError {
            label: source.path.clone(),
            details: format!("Mutex poisoned (state): {e}"),
        })?;
        state.shaders.insert(id, source.clone());
        Ok(id)
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineId, PipelineError> {
        let mut state = self.state.lock().map_err(|e| PipelineError::CompilationFailed {
            label: desc.label.clone(),
            details: format!("Mutex poisoned (state): {e}"),
        })?;
        for shader in std::iter::once(desc.vertex_shader).chain(desc.pixel_shader) {
            if !state.shaders.contains_key(&shader) {
                return Err(PipelineError::InvalidShaderModule {
                    id: shader,
                    pipeline_label: desc.label.clone(),
                });
            }
        }
        let id = PipelineId(self.generate_id());
        state.pipelines.insert(id, desc.clone());
        Ok(id)
    }

    fn destroy_pipeline(&self, id: PipelineId) {
        if let Ok(mut state) = self.state.lock() {
            state.pipelines.remove(&id);
        }
    }

    // --- Submission ---

    fn execute_command_list(&self, commands: &[Command]) -> Result<(), RenderError> {
        self.check_lost()?;
        let mut state = self.lock()?;
        if !state.queue_created {
            return Err(RenderError::NotInitialized);
        }
        state.validate(commands)?;
        state.executed.push(commands.to_vec());
        log::trace!("Headless device executed {} commands", commands.len());
        Ok(())
    }

    fn present(&self) -> Result<(), RenderError> {
        self.check_lost()?;
        let mut state = self.lock()?;
        let (back_buffer, count) = {
            let chain = state.swap_chain.as_ref().ok_or(RenderError::NotInitialized)?;
            let id = chain
                .back_buffers
                .get(chain.current as usize)
                .copied()
                .ok_or_else(|| {
                    RenderError::SurfaceAcquisitionFailed("back buffers were released".to_string())
                })?;
            (id, chain.back_buffers.len() as u32)
        };
        let tracked = state.resource_mut(back_buffer)?;
        if tracked.state != ResourceState::Present {
            return Err(RenderError::RenderingFailed(format!(
                "'{}' presented while in {:?}",
                tracked.desc.label, tracked.state
            )));
        }
        if let Some(chain) = state.swap_chain.as_mut() {
            chain.current = (chain.current + 1) % count.max(1);
        }
        state.presented += 1;
        Ok(())
    }

    // --- Fences ---

    fn create_fence(&self, initial_value: u64) -> Result<FenceId, RenderError> {
        let id = FenceId(self.generate_id());
        self.lock()?.fences.insert(
            id,
            FenceValues {
                signaled: initial_value,
                completed: initial_value,
            },
        );
        Ok(id)
    }

    fn signal_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError> {
        {
            let mut state = self.lock()?;
            let values = state
                .fences
                .get_mut(&fence)
                .ok_or(RenderError::ResourceError(ResourceError::InvalidHandle))?;
            values.signaled = values.signaled.max(value);
            if self.auto_complete.load(Ordering::Acquire) {
                values.completed = values.completed.max(value);
            }
        }
        self.fence_reached.notify_all();
        Ok(())
    }

    fn fence_completed_value(&self, fence: FenceId) -> u64 {
        self.lock()
            .ok()
            .and_then(|s| s.fences.get(&fence).map(|f| f.completed))
            .unwrap_or(0)
    }

    fn wait_for_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError> {
        let mut state = self.lock()?;
        loop {
            let values = state
                .fences
                .get(&fence)
                .copied()
                .ok_or(RenderError::ResourceError(ResourceError::InvalidHandle))?;
            if values.completed >= value {
                return Ok(());
            }
            state = self.fence_reached.wait(state).map_err(|e| {
                RenderError::Internal(format!("Mutex poisoned (fence wait): {e}"))
            })?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stratum_core::renderer::api::{Barrier, PipelineConfig, ShaderStage, TextureKind};

    fn device() -> Arc<HeadlessDevice> {
        let mut backend = HeadlessBackend::new();
        backend.create_factory().unwrap();
        let adapters = backend.enumerate_adapters().unwrap();
        backend.create_device(&adapters[0]).unwrap();
        let device = backend.device().unwrap();
        device.create_command_queue().unwrap();
        device
            .create_swap_chain(&SwapChainDesc {
                width: 64,
                height: 32,
                buffer_count: 2,
                vsync: true,
            })
            .unwrap();
        device
    }

    fn texture(device: &HeadlessDevice, state: ResourceState) -> ResourceId {
        device
            .create_resource(
                &ResourceDesc::texture_2d("t", 4, 4, Format::Rgba8Unorm, ResourceUsage::RenderTarget),
                state,
            )
            .unwrap()
    }

    #[test]
    fn barrier_before_state_must_match() {
        let device = device();
        let id = texture(&device, ResourceState::Common);
        let wrong = Command::Barrier(vec![Barrier {
            resource: id,
            before: ResourceState::RenderTarget,
            after: ResourceState::PixelShaderResource,
        }]);
        assert!(device.execute_command_list(&[wrong]).is_err());

        let right = Command::Barrier(vec![Barrier {
            resource: id,
            before: ResourceState::Common,
            after: ResourceState::RenderTarget,
        }]);
        device.execute_command_list(&[right]).unwrap();
        assert_eq!(device.resource_state(id), Some(ResourceState::RenderTarget));
    }

    #[test]
    fn present_requires_the_present_state_and_rotates_buffers() {
        let device = device();
        assert_eq!(device.current_back_buffer_index(), 0);
        device.present().unwrap();
        assert_eq!(device.current_back_buffer_index(), 1);
        device.present().unwrap();
        assert_eq!(device.current_back_buffer_index(), 0);

        let back_buffer = device.back_buffer(0).unwrap();
        device
            .execute_command_list(&[Command::Barrier(vec![Barrier {
                resource: back_buffer,
                before: ResourceState::Present,
                after: ResourceState::RenderTarget,
            }])])
            .unwrap();
        assert!(device.present().is_err());
        assert_eq!(device.present_count(), 2);
    }

    #[test]
    fn resize_needs_released_back_buffers() {
        let device = device();
        assert!(device.resize_swap_chain(128, 64).is_err());
        device.release_back_buffers();
        device.resize_swap_chain(128, 64).unwrap();
        let id = device.back_buffer(1).unwrap();
        assert_eq!(device.resource_desc(id).unwrap().extent(), (128, 64));
    }

    #[test]
    fn a_lost_device_rejects_submission_and_present() {
        let device = device();
        device.execute_command_list(&[]).unwrap();
        device.lose_device();

        assert!(matches!(
            device.execute_command_list(&[]),
            Err(RenderError::DeviceLost)
        ));
        assert!(matches!(device.present(), Err(RenderError::DeviceLost)));
        assert_eq!(device.present_count(), 0);
    }

    #[test]
    fn views_are_checked_against_the_heap_type() {
        let device = device();
        let heap = device
            .create_descriptor_heap(&DescriptorHeapDesc {
                heap_type: DescriptorHeapType::Rtv,
                capacity: 2,
                shader_visible: false,
            })
            .unwrap();
        let id = texture(&device, ResourceState::Common);
        let srv = ViewDesc::ShaderResource {
            resource: id,
            kind: TextureKind::Color,
        };
        assert!(device.create_view(heap.id, heap.cpu_base, &srv).is_err());

        let rtv = ViewDesc::RenderTarget {
            resource: id,
            array_layer: None,
        };
        device.create_view(heap.id, heap.cpu_base, &rtv).unwrap();
        assert_eq!(device.view(heap.cpu_base), Some(rtv));

        let past_end = heap.cpu_base.offset(2, heap.increment);
        assert!(matches!(
            device.create_view(heap.id, past_end, &rtv),
            Err(ResourceError::OutOfBounds)
        ));
    }

    #[test]
    fn draws_need_every_root_slot_bound() {
        let device = device();
        let shader = device
            .compile_shader(&ShaderSource {
                path: "fullscreen.wgsl".into(),
                stage: ShaderStage::Vertex,
                entry_point: "vs_main".into(),
                code: "fn vs_main() {}".into(),
            })
            .unwrap();
        let pipeline = device
            .create_pipeline(&PipelineDesc {
                label: "p".into(),
                vertex_shader: shader,
                pixel_shader: None,
                root_parameters: vec![RootParameter::ConstantBuffer],
                config: PipelineConfig::default(),
            })
            .unwrap();
        let heap = device
            .create_descriptor_heap(&DescriptorHeapDesc {
                heap_type: DescriptorHeapType::Rtv,
                capacity: 1,
                shader_visible: false,
            })
            .unwrap();
        let target = texture(&device, ResourceState::RenderTarget);
        device
            .create_view(
                heap.id,
                heap.cpu_base,
                &ViewDesc::RenderTarget {
                    resource: target,
                    array_layer: None,
                },
            )
            .unwrap();

        let commands = [
            Command::SetPipelineState(pipeline),
            Command::SetRenderTargets {
                rtvs: vec![heap.cpu_base],
                dsv: None,
            },
            Command::Draw {
                vertex_count: 6,
                instance_count: 1,
            },
        ];
        let err = device.execute_command_list(&commands).unwrap_err();
        assert!(err.to_string().contains("root slot 0 unbound"));
    }

    #[test]
    fn shader_without_its_entry_point_fails() {
        let device = device();
        let result = device.compile_shader(&ShaderSource {
            path: "broken.wgsl".into(),
            stage: ShaderStage::Pixel,
            entry_point: "fs_main".into(),
            code: "fn vs_main() {}".into(),
        });
        assert!(matches!(result, Err(ShaderError::CompilationError { .. })));
    }

    #[test]
    fn fence_wait_is_released_by_external_completion() {
        let device = device();
        device.set_fence_auto_complete(false);
        let fence = device.create_fence(0).unwrap();
        device.signal_fence(fence, 1).unwrap();
        assert_eq!(device.fence_completed_value(fence), 0);
        assert_eq!(device.fence_signaled_value(fence), 1);

        let completer = Arc::clone(&device);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            completer.complete_fence(fence, 1);
        });
        device.wait_for_fence(fence, 1).unwrap();
        assert_eq!(device.fence_completed_value(fence), 1);
        handle.join().unwrap();
    }

    #[test]
    fn enumeration_requires_a_factory() {
        let mut backend = HeadlessBackend::new();
        assert!(backend.enumerate_adapters().is_err());
        assert_eq!(backend.calls(), vec!["enumerate_adapters".to_string()]);
    }
}
