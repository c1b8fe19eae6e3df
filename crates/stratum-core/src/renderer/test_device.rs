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

//! A bookkeeping-only device for the core's unit tests.
//!
//! It remembers live resources and the views written into heap slots, and
//! completes every fence signal immediately.

use crate::renderer::api::{
    Command, CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapId, DescriptorHeapInfo,
    FenceId, Format, GpuDescriptorHandle, PipelineDesc, PipelineId, ResourceDesc, ResourceId,
    ResourceState, ResourceUsage, ShaderId, ShaderSource, ViewDesc,
};
use crate::renderer::error::{PipelineError, RenderError, ResourceError, ShaderError};
use crate::renderer::traits::{
    AdapterInfo, AdapterKind, GraphicsBackend, GraphicsDevice, SwapChainDesc,
};
use crate::renderer::{ContextSettings, Device, DeviceConfig, RenderContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const INCREMENT: u32 = 32;
const GPU_BIT: u64 = 1 << 63;

#[derive(Debug, Default)]
struct State {
    resources: HashMap<ResourceId, ResourceDesc>,
    back_buffers: Vec<ResourceId>,
    buffer_count: u32,
    current: u32,
    views: HashMap<u64, ViewDesc>,
    fences: HashMap<FenceId, u64>,
}

#[derive(Debug, Default)]
pub(crate) struct TestDevice {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl TestDevice {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn create_back_buffers(&self, width: u32, height: u32) {
        let ids: Vec<ResourceId> = (0..self.lock().buffer_count)
            .map(|_| ResourceId(self.next()))
            .collect();
        let mut state = self.lock();
        for (index, id) in ids.iter().enumerate() {
            state.resources.insert(
                *id,
                ResourceDesc::texture_2d(
                    format!("Back Buffer {index}"),
                    width,
                    height,
                    Format::Bgra8UnormSrgb,
                    ResourceUsage::RenderTarget,
                ),
            );
        }
        state.back_buffers = ids;
        state.current = 0;
    }

    pub(crate) fn live_resource_count(&self) -> usize {
        self.lock().resources.len()
    }

    pub(crate) fn is_live(&self, id: ResourceId) -> bool {
        self.lock().resources.contains_key(&id)
    }

    /// The device-side extent of `id`.
    pub(crate) fn extent(&self, id: ResourceId) -> Option<(u32, u32)> {
        self.lock().resources.get(&id).map(ResourceDesc::extent)
    }

    pub(crate) fn view(&self, handle: CpuDescriptorHandle) -> Option<ViewDesc> {
        self.lock().views.get(&handle.ptr).copied()
    }

    pub(crate) fn shader_view(&self, handle: GpuDescriptorHandle) -> Option<ViewDesc> {
        self.lock().views.get(&(handle.ptr & !GPU_BIT)).copied()
    }
}

impl GraphicsDevice for TestDevice {
    fn create_command_queue(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn create_swap_chain(&self, desc: &SwapChainDesc) -> Result<(), RenderError> {
        self.lock().buffer_count = desc.buffer_count;
        self.create_back_buffers(desc.width, desc.height);
        Ok(())
    }

    fn swap_chain_format(&self) -> Format {
        Format::Bgra8UnormSrgb
    }

    fn back_buffer_count(&self) -> u32 {
        self.lock().buffer_count
    }

    fn back_buffer(&self, index: u32) -> Result<ResourceId, ResourceError> {
        self.lock()
            .back_buffers
            .get(index as usize)
            .copied()
            .ok_or(ResourceError::OutOfBounds)
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.lock().current
    }

    fn release_back_buffers(&self) {
        let mut state = self.lock();
        for id in std::mem::take(&mut state.back_buffers) {
            state.resources.remove(&id);
        }
    }

    fn resize_swap_chain(&self, width: u32, height: u32) -> Result<(), RenderError> {
        if !self.lock().back_buffers.is_empty() {
            return Err(RenderError::RenderingFailed(
                "back buffers still referenced".to_string(),
            ));
        }
        self.create_back_buffers(width, height);
        Ok(())
    }

    fn create_resource(
        &self,
        desc: &ResourceDesc,
        _initial_state: ResourceState,
    ) -> Result<ResourceId, ResourceError> {
        let id = ResourceId(self.next());
        self.lock().resources.insert(id, desc.clone());
        Ok(id)
    }

    fn destroy_resource(&self, id: ResourceId) {
        self.lock().resources.remove(&id);
    }

    fn write_buffer(&self, id: ResourceId, _offset: u64, _data: &[u8]) -> Result<(), ResourceError> {
        self.is_live(id).then_some(()).ok_or(ResourceError::NotFound)
    }

    fn write_texture(&self, id: ResourceId, _layer: u32, _data: &[u8]) -> Result<(), ResourceError> {
        self.is_live(id).then_some(()).ok_or(ResourceError::NotFound)
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, ResourceError> {
        let id = self.next();
        Ok(DescriptorHeapInfo {
            id: DescriptorHeapId(id),
            cpu_base: CpuDescriptorHandle { ptr: id << 32 },
            gpu_base: GpuDescriptorHandle {
                ptr: if desc.shader_visible { GPU_BIT | (id << 32) } else { 0 },
            },
            increment: INCREMENT,
        })
    }

    fn create_view(
        &self,
        _heap: DescriptorHeapId,
        handle: CpuDescriptorHandle,
        view: &ViewDesc,
    ) -> Result<(), ResourceError> {
        self.lock().views.insert(handle.ptr, *view);
        Ok(())
    }

    fn compile_shader(&self, _source: &ShaderSource) -> Result<ShaderId, ShaderError> {
        Ok(ShaderId(self.next()))
    }

    fn create_pipeline(&self, _desc: &PipelineDesc) -> Result<PipelineId, PipelineError> {
        Ok(PipelineId(self.next()))
    }

    fn destroy_pipeline(&self, _id: PipelineId) {}

    fn execute_command_list(&self, _commands: &[Command]) -> Result<(), RenderError> {
        Ok(())
    }

    fn present(&self) -> Result<(), RenderError> {
        let mut state = self.lock();
        state.current = (state.current + 1) % state.buffer_count.max(1);
        Ok(())
    }

    fn create_fence(&self, initial_value: u64) -> Result<FenceId, RenderError> {
        let id = FenceId(self.next());
        self.lock().fences.insert(id, initial_value);
        Ok(id)
    }

    fn signal_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError> {
        self.lock().fences.insert(fence, value);
        Ok(())
    }

    fn fence_completed_value(&self, fence: FenceId) -> u64 {
        self.lock().fences.get(&fence).copied().unwrap_or(0)
    }

    fn wait_for_fence(&self, _fence: FenceId, _value: u64) -> Result<(), RenderError> {
        Ok(())
    }
}

struct TestBackend(Arc<TestDevice>);

impl GraphicsBackend for TestBackend {
    fn enable_debug_layer(&mut self, _enabled: bool) -> Result<(), RenderError> {
        Ok(())
    }

    fn create_factory(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn enumerate_adapters(&mut self) -> Result<Vec<AdapterInfo>, RenderError> {
        Ok(vec![AdapterInfo {
            index: 0,
            name: "test".into(),
            kind: AdapterKind::Discrete,
            api: "test".into(),
            dedicated_video_memory: 0,
        }])
    }

    fn create_device(
        &mut self,
        _adapter: &AdapterInfo,
    ) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        Ok(self.0.clone())
    }
}

/// A `width` x `height` context with two back buffers and 16px shadow cascades.
pub(crate) fn test_context(width: u32, height: u32) -> (RenderContext, Arc<TestDevice>) {
    let gpu = Arc::new(TestDevice::default());
    let device = Device::initialize(
        &mut TestBackend(gpu.clone()),
        &DeviceConfig {
            debug_layer: false,
            swap_chain: SwapChainDesc {
                width,
                height,
                buffer_count: 2,
                vsync: false,
            },
        },
    )
    .unwrap();
    let context = RenderContext::initialize(
        device,
        ContextSettings {
            width,
            height,
            shadow_map_size: 16,
            clear_color: [0.0; 4],
        },
    )
    .unwrap();
    (context, gpu)
}
