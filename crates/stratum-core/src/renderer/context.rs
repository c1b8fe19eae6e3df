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

//! The frame-wide owner of every GPU-visible shared resource.
//!
//! [`RenderContext`] aggregates the [`Device`], the three descriptor heaps and
//! their regions, the back-buffer render targets, the main depth buffer, the
//! cascaded shadow map, and the pool of named render-target textures that
//! passes exchange data through. It is handed to passes as an explicit
//! `&mut RenderContext`; only the main thread mutates it.

use crate::renderer::api::{
    Command, CommandList, CpuDescriptorHandle, DescriptorHeapType, Format, GpuDescriptorHandle,
    ResourceState, TextureKind, ViewDesc, Viewport,
};
use crate::renderer::buffers::ConstantBuffer;
use crate::renderer::constants::{FrameConstants, CASCADE_COUNT};
use crate::renderer::descriptor_heap::{DescriptorHeap, HeapRegion};
use crate::renderer::device::Device;
use crate::renderer::error::RenderError;
use crate::renderer::fence::Fence;
use crate::renderer::targets::{DepthBuffer, RenderTarget, RenderTargetTexture};
use crate::renderer::traits::GraphicsDevice;
use bytemuck::Pod;
use std::collections::HashMap;

/// Capacity of the shader-visible CBV/SRV heap.
pub const CBV_SRV_HEAP_CAPACITY: u32 = 1024;
/// Capacity of the render-target-view heap.
pub const RTV_HEAP_CAPACITY: u32 = 64;
/// Capacity of the depth-stencil-view heap.
pub const DSV_HEAP_CAPACITY: u32 = 8;

/// CBV/SRV slots `[0, 8)`: frame constants, depth and shadow-map SRVs.
const FRAME_SRV_REGION: (u32, u32) = (0, 8);
/// CBV/SRV slots `[8, 72)`: shader views of named render-target textures.
const RTT_SRV_REGION: (u32, u32) = (8, 72);
/// CBV/SRV slots `[72, 584)`: per-object and per-pass constant buffers.
const OBJECT_CBV_REGION: (u32, u32) = (72, 584);
/// CBV/SRV slots `[584, 1024)`: user-loaded textures.
const TEXTURE_SRV_REGION: (u32, u32) = (584, CBV_SRV_HEAP_CAPACITY);
/// RTV slots `[0, 4)`: back buffers.
const BACK_BUFFER_RTV_REGION: (u32, u32) = (0, 4);
/// RTV slots `[4, 64)`: named render-target textures.
const RTT_RTV_REGION: (u32, u32) = (4, RTV_HEAP_CAPACITY);
/// DSV slot 0: main depth buffer.
const MAIN_DSV_REGION: (u32, u32) = (0, 1);
/// DSV slots `[1, 1 + CASCADE_COUNT)`: one per shadow cascade.
const SHADOW_DSV_REGION: (u32, u32) = (1, 1 + CASCADE_COUNT as u32);

/// Pass input name that resolves to the main depth buffer.
pub const DEPTH_INPUT: &str = "depth";
/// Pass input name that resolves to the cascaded shadow map.
pub const SHADOW_MAP_INPUT: &str = "shadow_map";

/// Sizes and colors the context is created with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextSettings {
    /// Initial back-buffer width.
    pub width: u32,
    /// Initial back-buffer height.
    pub height: u32,
    /// Edge length of every shadow cascade.
    pub shadow_map_size: u32,
    /// Color the back buffer is cleared to each frame.
    pub clear_color: [f32; 4],
}

#[derive(Debug)]
struct HeapRegions {
    frame: HeapRegion,
    render_textures: HeapRegion,
    objects: HeapRegion,
    textures: HeapRegion,
    back_buffers: HeapRegion,
    render_texture_targets: HeapRegion,
}

/// The shared-mutable-state hub every pass reads and writes through.
#[derive(Debug)]
pub struct RenderContext {
    device: Device,
    srv_heap: DescriptorHeap,
    rtv_heap: DescriptorHeap,
    dsv_heap: DescriptorHeap,
    regions: HeapRegions,
    render_targets: Vec<RenderTarget>,
    depth_buffer: DepthBuffer,
    shadow_map: DepthBuffer,
    render_textures: HashMap<String, RenderTargetTexture>,
    frame_constants: ConstantBuffer<FrameConstants>,
    fence: Fence,
    frame_index: u32,
    width: u32,
    height: u32,
    viewport: Viewport,
    settings: ContextSettings,
}

impl RenderContext {
    /// Creates the heaps, the back-buffer targets, the main depth buffer, the
    /// shadow map, and the frame constant buffer.
    ///
    /// Heap capacities are compile-time constants. Failing to create any of
    /// these objects is fatal for the renderer.
    pub fn initialize(device: Device, settings: ContextSettings) -> Result<Self, RenderError> {
        let gpu = device.gpu();
        let (width, height) = (settings.width.max(1), settings.height.max(1));

        // --- 1. Heaps & regions ---
        let srv_heap = DescriptorHeap::initialize(
            gpu,
            DescriptorHeapType::CbvSrvUav,
            CBV_SRV_HEAP_CAPACITY,
            true,
        )?;
        let rtv_heap =
            DescriptorHeap::initialize(gpu, DescriptorHeapType::Rtv, RTV_HEAP_CAPACITY, false)?;
        let dsv_heap =
            DescriptorHeap::initialize(gpu, DescriptorHeapType::Dsv, DSV_HEAP_CAPACITY, false)?;

        let mut regions = HeapRegions {
            frame: HeapRegion::new("frame", &srv_heap, FRAME_SRV_REGION.0, FRAME_SRV_REGION.1)?,
            render_textures: HeapRegion::new(
                "render textures",
                &srv_heap,
                RTT_SRV_REGION.0,
                RTT_SRV_REGION.1,
            )?,
            objects: HeapRegion::new(
                "objects",
                &srv_heap,
                OBJECT_CBV_REGION.0,
                OBJECT_CBV_REGION.1,
            )?,
            textures: HeapRegion::new(
                "textures",
                &srv_heap,
                TEXTURE_SRV_REGION.0,
                TEXTURE_SRV_REGION.1,
            )?,
            back_buffers: HeapRegion::new(
                "back buffers",
                &rtv_heap,
                BACK_BUFFER_RTV_REGION.0,
                BACK_BUFFER_RTV_REGION.1,
            )?,
            render_texture_targets: HeapRegion::new(
                "render texture targets",
                &rtv_heap,
                RTT_RTV_REGION.0,
                RTT_RTV_REGION.1,
            )?,
        };
        let mut main_dsv = HeapRegion::new("main depth", &dsv_heap, MAIN_DSV_REGION.0, MAIN_DSV_REGION.1)?;
        let mut shadow_dsv = HeapRegion::new(
            "shadow cascades",
            &dsv_heap,
            SHADOW_DSV_REGION.0,
            SHADOW_DSV_REGION.1,
        )?;

        // --- 2. Frame constants ---
        let frame_constants = ConstantBuffer::create(
            gpu,
            &srv_heap,
            &mut regions.frame,
            "Frame Constants",
            &FrameConstants::default(),
        )?;

        // --- 3. Back buffers ---
        let mut render_targets = Vec::new();
        for index in 0..gpu.back_buffer_count() {
            let rtv_index = regions.back_buffers.allocate()?;
            render_targets.push(RenderTarget::create(
                gpu, &rtv_heap, rtv_index, index, width, height,
            )?);
        }

        // --- 4. Depth buffer & shadow map ---
        let depth_buffer = DepthBuffer::create(
            gpu,
            &dsv_heap,
            vec![main_dsv.allocate()?],
            &srv_heap,
            regions.frame.allocate()?,
            "Main Depth Buffer",
            width,
            height,
        )?;
        let shadow_dsvs = (0..CASCADE_COUNT)
            .map(|_| shadow_dsv.allocate())
            .collect::<Result<Vec<_>, _>>()?;
        let shadow_map = DepthBuffer::create(
            gpu,
            &dsv_heap,
            shadow_dsvs,
            &srv_heap,
            regions.frame.allocate()?,
            "Cascaded Shadow Map",
            settings.shadow_map_size,
            settings.shadow_map_size,
        )?;

        let fence = Fence::new(device.gpu_arc())?;
        let frame_index = gpu.current_back_buffer_index();

        log::info!(
            "RenderContext initialized: {}x{}, {} back buffers, {}px shadow cascades",
            width,
            height,
            render_targets.len(),
            settings.shadow_map_size
        );

        Ok(Self {
            device,
            srv_heap,
            rtv_heap,
            dsv_heap,
            regions,
            render_targets,
            depth_buffer,
            shadow_map,
            render_textures: HashMap::new(),
            frame_constants,
            fence,
            frame_index,
            width,
            height,
            viewport: Viewport::from_size(width, height),
            settings,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    /// The device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The backend device.
    pub fn gpu(&self) -> &dyn GraphicsDevice {
        self.device.gpu()
    }

    /// The shared command list.
    pub fn command_list(&mut self) -> &mut CommandList {
        self.device.command_list()
    }

    /// Current back-buffer width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current back-buffer height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Index of the back buffer being rendered.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// The full-screen viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Format of the back buffers.
    pub fn swap_chain_format(&self) -> Format {
        self.device.gpu().swap_chain_format()
    }

    /// The shader-visible CBV/SRV heap.
    pub fn srv_heap(&self) -> &DescriptorHeap {
        &self.srv_heap
    }

    /// The back-buffer render targets.
    pub fn render_targets(&self) -> &[RenderTarget] {
        &self.render_targets
    }

    /// The main depth buffer.
    pub fn depth_buffer(&self) -> &DepthBuffer {
        &self.depth_buffer
    }

    /// The cascaded shadow map.
    pub fn shadow_map(&self) -> &DepthBuffer {
        &self.shadow_map
    }

    /// Looks up a named render-target texture.
    pub fn render_texture(&self, name: &str) -> Option<&RenderTargetTexture> {
        self.render_textures.get(name)
    }

    /// Iterates over every named render-target texture.
    pub fn render_textures(&self) -> impl Iterator<Item = &RenderTargetTexture> + '_ {
        self.render_textures.values()
    }

    /// Descriptor table of the per-frame constants (root slot 0).
    pub fn frame_table(&self) -> GpuDescriptorHandle {
        self.frame_constants.table()
    }

    /// The frame fence.
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resource creation
    // ─────────────────────────────────────────────────────────────────────

    /// Creates the render-target texture `name` if it does not exist yet.
    ///
    /// The texture is sized to the current back buffer and takes the next slot
    /// of the render-texture regions. A second call with the same name is a no-op,
    /// whatever the format.
    pub fn create_rtt(&mut self, name: &str, format: Format) -> Result<(), RenderError> {
        if self.render_textures.contains_key(name) {
            return Ok(());
        }
        let rtv_index = self.regions.render_texture_targets.allocate()?;
        let srv_index = self.regions.render_textures.allocate()?;
        let texture = RenderTargetTexture::create(
            self.device.gpu(),
            &self.rtv_heap,
            rtv_index,
            &self.srv_heap,
            srv_index,
            name,
            format,
            self.width,
            self.height,
        )?;
        log::debug!("Created render target texture '{name}' ({format:?})");
        self.render_textures.insert(name.to_string(), texture);
        Ok(())
    }

    /// Creates a constant buffer whose view lives in the object region.
    pub fn create_constant_buffer<T: Pod>(
        &mut self,
        label: &str,
        initial: &T,
    ) -> Result<ConstantBuffer<T>, RenderError> {
        ConstantBuffer::create(
            self.device.gpu(),
            &self.srv_heap,
            &mut self.regions.objects,
            label,
            initial,
        )
    }

    /// Writes a shader-resource view for a loaded texture into the next texture slot.
    ///
    /// # Errors
    ///
    /// Fails once the texture region is full; nothing is written past its end.
    pub fn register_texture(
        &mut self,
        view: &ViewDesc,
    ) -> Result<GpuDescriptorHandle, RenderError> {
        let index = self.regions.textures.allocate()?;
        self.srv_heap.write_view(self.device.gpu(), index, view)?;
        Ok(self.srv_heap.gpu_handle(index))
    }

    /// Uploads the per-frame constants.
    pub fn update_frame_constants(&self, constants: &FrameConstants) -> Result<(), RenderError> {
        self.frame_constants.update(self.device.gpu(), constants)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resize
    // ─────────────────────────────────────────────────────────────────────

    /// Resizes the swap chain and every screen-sized resource.
    ///
    /// In order: the back-buffer targets and the depth buffer are released,
    /// the swap chain is resized, then every target, the depth buffer, and
    /// every named render-target texture are recreated at `(width, height)` in
    /// their existing heap slots. Zero sizes (minimized windows) are ignored.
    pub fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize request to zero dimensions: {width}x{height}");
            return Ok(());
        }
        log::info!("RenderContext: resizing to {width}x{height}");
        self.fence.flush()?;

        // --- 1. Release everything bound to the swap chain ---
        let rtv_indices: Vec<u32> = self.render_targets.iter().map(|t| t.rtv_index()).collect();
        self.render_targets.clear();
        let gpu = self.device.gpu();
        gpu.release_back_buffers();
        self.depth_buffer.release(gpu);

        // --- 2. Resize the swap chain ---
        gpu.resize_swap_chain(width, height)?;
        self.width = width;
        self.height = height;
        self.viewport = Viewport::from_size(width, height);

        // --- 3. Recreate at the new size ---
        for (index, rtv_index) in rtv_indices.into_iter().enumerate() {
            self.render_targets.push(RenderTarget::create(
                gpu,
                &self.rtv_heap,
                rtv_index,
                index as u32,
                width,
                height,
            )?);
        }
        self.depth_buffer
            .recreate(gpu, &self.dsv_heap, &self.srv_heap, width, height)?;
        for texture in self.render_textures.values_mut() {
            texture.release(gpu);
            texture.recreate(gpu, &self.rtv_heap, &self.srv_heap, width, height)?;
        }
        self.frame_index = gpu.current_back_buffer_index();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Frame bracket
    // ─────────────────────────────────────────────────────────────────────

    /// Reopens the command list on the current frame's allocator.
    pub fn reset_command_list(&mut self) {
        self.device.reset_command_list(self.frame_index);
    }

    /// Makes the CBV/SRV heap visible to descriptor-table bindings.
    pub fn bind_descriptor_heaps(&mut self) {
        let heap = self.srv_heap.id();
        self.device
            .command_list()
            .record(Command::SetDescriptorHeaps(vec![heap]));
    }

    /// Sets the full-screen viewport.
    pub fn bind_viewport(&mut self) {
        let viewport = self.viewport;
        self.device.command_list().set_viewport(viewport);
    }

    /// Transitions the current back buffer to render-target state, clears it
    /// and the main depth buffer, and binds both.
    pub fn clear_render_targets(&mut self) -> Result<(), RenderError> {
        let color = self.settings.clear_color;
        let rtv = self.current_target_mut()?.rtv();
        self.transition_back_buffer(ResourceState::RenderTarget)?;
        let depth_dsv = self.depth_buffer.dsv(0);
        let list = self.device.command_list();
        self.depth_buffer
            .resource_mut()
            .transition_state(ResourceState::DepthWrite, list);
        list.clear_render_target(rtv, color);
        list.clear_depth_stencil(depth_dsv, 1.0);
        self.set_render_target()
    }

    /// Binds the current back buffer and the main depth buffer as the active targets.
    pub fn set_render_target(&mut self) -> Result<(), RenderError> {
        let rtv = self.current_target_mut()?.rtv();
        let dsv = self.depth_buffer.dsv(0);
        self.device.command_list().set_render_targets(&[rtv], Some(dsv));
        Ok(())
    }

    /// Transitions the current back buffer back to the present state.
    pub fn prepare_for_present(&mut self) -> Result<(), RenderError> {
        self.transition_back_buffer(ResourceState::Present)
    }

    /// Ends the recording of this frame's commands.
    pub fn close_command_list(&mut self) {
        self.device.command_list().close();
    }

    /// Closes the command list if still open, and executes it.
    pub fn submit(&mut self) -> Result<(), RenderError> {
        self.device.execute_command_list()
    }

    /// Presents the current back buffer and moves to the next one.
    pub fn present(&mut self) -> Result<(), RenderError> {
        self.device.gpu().present()?;
        self.frame_index = self.device.gpu().current_back_buffer_index();
        Ok(())
    }

    /// Signals the frame fence and blocks until the GPU has reached it.
    pub fn wait_for_previous_frame(&mut self) -> Result<(), RenderError> {
        self.fence.flush()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pass helpers
    // ─────────────────────────────────────────────────────────────────────

    fn current_target_mut(&mut self) -> Result<&mut RenderTarget, RenderError> {
        let index = self.frame_index as usize;
        self.render_targets.get_mut(index).ok_or_else(|| {
            RenderError::Internal(format!("no render target for back buffer {index}"))
        })
    }

    /// Transitions the current back buffer to `state`.
    pub fn transition_back_buffer(&mut self, state: ResourceState) -> Result<(), RenderError> {
        let index = self.frame_index as usize;
        let target = self.render_targets.get_mut(index).ok_or_else(|| {
            RenderError::Internal(format!("no render target for back buffer {index}"))
        })?;
        target
            .resource_mut()
            .transition_state(state, self.device.command_list());
        Ok(())
    }

    /// The render-target view of the current back buffer.
    pub fn back_buffer_rtv(&mut self) -> Result<CpuDescriptorHandle, RenderError> {
        Ok(self.current_target_mut()?.rtv())
    }

    /// The DSV of the main depth buffer.
    pub fn depth_dsv(&self) -> CpuDescriptorHandle {
        self.depth_buffer.dsv(0)
    }

    /// Transitions the main depth buffer to `state`.
    pub fn transition_depth(&mut self, state: ResourceState) {
        self.depth_buffer
            .resource_mut()
            .transition_state(state, self.device.command_list());
    }

    /// Transitions the whole shadow map to `state`.
    pub fn transition_shadow_map(&mut self, state: ResourceState) {
        self.shadow_map
            .resource_mut()
            .transition_state(state, self.device.command_list());
    }

    /// Returns how a pass input is sampled, or `None` if nothing provides it.
    pub fn input_kind(&self, name: &str) -> Option<TextureKind> {
        match name {
            DEPTH_INPUT => Some(TextureKind::Depth),
            SHADOW_MAP_INPUT => Some(TextureKind::DepthArray),
            _ => self
                .render_textures
                .contains_key(name)
                .then_some(TextureKind::Color),
        }
    }

    /// Returns the SRV table of a pass input.
    ///
    /// # Errors
    ///
    /// [`RenderError::MissingPassInput`] if no texture with that name exists.
    pub fn input_table(&self, pass: &str, name: &str) -> Result<GpuDescriptorHandle, RenderError> {
        match name {
            DEPTH_INPUT => Ok(self.depth_buffer.srv()),
            SHADOW_MAP_INPUT => Ok(self.shadow_map.srv()),
            _ => self
                .render_textures
                .get(name)
                .map(|texture| texture.srv())
                .ok_or_else(|| RenderError::MissingPassInput {
                    pass: pass.to_string(),
                    input: name.to_string(),
                }),
        }
    }

    /// Transitions every named input to the pixel-shader-readable state in one barrier call.
    pub fn transition_inputs(&mut self, pass: &str, inputs: &[String]) -> Result<(), RenderError> {
        let mut barriers = Vec::new();
        for name in inputs {
            let resource = match name.as_str() {
                DEPTH_INPUT => self.depth_buffer.resource_mut(),
                SHADOW_MAP_INPUT => self.shadow_map.resource_mut(),
                _ => self
                    .render_textures
                    .get_mut(name)
                    .ok_or_else(|| RenderError::MissingPassInput {
                        pass: pass.to_string(),
                        input: name.clone(),
                    })?
                    .resource_mut(),
            };
            resource.transition_state_batched(ResourceState::PixelShaderResource, &mut barriers);
        }
        self.device.command_list().resource_barrier(&barriers);
        Ok(())
    }

    /// Transitions every named output to the render-target state, clears them
    /// when `clear` is set, and returns their views in order.
    ///
    /// Outputs are expected to exist already (see [`create_rtt`](Self::create_rtt)).
    pub fn prepare_outputs(
        &mut self,
        pass: &str,
        outputs: &[String],
        clear: bool,
    ) -> Result<Vec<CpuDescriptorHandle>, RenderError> {
        let mut barriers = Vec::new();
        let mut rtvs = Vec::with_capacity(outputs.len());
        for name in outputs {
            let texture = self.render_textures.get_mut(name).ok_or_else(|| {
                RenderError::MissingPassInput {
                    pass: pass.to_string(),
                    input: name.clone(),
                }
            })?;
            texture
                .resource_mut()
                .transition_state_batched(ResourceState::RenderTarget, &mut barriers);
            rtvs.push(texture.rtv());
        }
        let list = self.device.command_list();
        list.resource_barrier(&barriers);
        if clear {
            for rtv in &rtvs {
                list.clear_render_target(*rtv, [0.0, 0.0, 0.0, 0.0]);
            }
        }
        Ok(rtvs)
    }

    /// Binds `rtvs` as the active targets, plus the main depth buffer when `with_depth` is set.
    pub fn bind_render_targets(&mut self, rtvs: &[CpuDescriptorHandle], with_depth: bool) {
        let dsv = if with_depth {
            self.transition_depth(ResourceState::DepthWrite);
            Some(self.depth_buffer.dsv(0))
        } else {
            None
        };
        self.device.command_list().set_render_targets(rtvs, dsv);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shutdown
    // ─────────────────────────────────────────────────────────────────────

    /// Waits for the GPU and releases every resource the context owns.
    pub fn shutdown(mut self) -> Result<(), RenderError> {
        self.fence.flush()?;
        let gpu = self.device.gpu();
        for texture in self.render_textures.values_mut() {
            texture.release(gpu);
        }
        self.depth_buffer.release(gpu);
        self.shadow_map.release(gpu);
        self.render_targets.clear();
        gpu.release_back_buffers();
        self.frame_constants.release(gpu);
        log::info!("RenderContext shut down.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::ResourceId;
    use crate::renderer::test_device::test_context;

    #[test]
    fn create_rtt_is_idempotent_per_name() {
        let (mut context, gpu) = test_context(64, 32);
        context.create_rtt("hdr", Format::Rgba16Float).unwrap();
        let first = context.render_texture("hdr").unwrap();
        let (id, rtv, srv) = (first.resource().id(), first.rtv(), first.srv());
        let live = gpu.live_resource_count();

        context.create_rtt("hdr", Format::R8Unorm).unwrap();

        assert_eq!(context.render_textures().count(), 1);
        let again = context.render_texture("hdr").unwrap();
        assert_eq!(again.resource().id(), id);
        assert_eq!(again.rtv(), rtv);
        assert_eq!(again.srv(), srv);
        assert_eq!(again.format(), Format::Rgba16Float);
        assert_eq!(gpu.live_resource_count(), live);
    }

    #[test]
    fn distinct_rtts_take_distinct_slots() {
        let (mut context, _gpu) = test_context(64, 32);
        context.create_rtt("a", Format::Rgba16Float).unwrap();
        context.create_rtt("b", Format::Rgba16Float).unwrap();

        let a = context.render_texture("a").unwrap();
        let b = context.render_texture("b").unwrap();
        assert_ne!(a.rtv(), b.rtv());
        assert_ne!(a.srv(), b.srv());
        assert_eq!(a.resource().extent(), (64, 32));
    }

    #[test]
    fn resize_recreates_every_screen_resource_in_place() {
        let (mut context, gpu) = test_context(64, 32);
        context.create_rtt("lighting", Format::Rgba16Float).unwrap();
        context.create_rtt("ldr", Format::Rgba8Unorm).unwrap();

        let old_targets: Vec<(ResourceId, CpuDescriptorHandle)> = context
            .render_targets()
            .iter()
            .map(|t| (t.resource().id(), t.rtv()))
            .collect();
        let old_depth = context.depth_buffer().resource().id();
        let depth_slots = (context.depth_buffer().dsv(0), context.depth_buffer().srv());
        let old_rtts: Vec<(String, ResourceId, CpuDescriptorHandle, GpuDescriptorHandle)> = context
            .render_textures()
            .map(|t| (t.name().to_string(), t.resource().id(), t.rtv(), t.srv()))
            .collect();
        let shadow = context.shadow_map().resource().id();
        let live = gpu.live_resource_count();

        context.set_window_size(128, 96).unwrap();

        assert_eq!((context.width(), context.height()), (128, 96));
        assert_eq!(context.viewport(), Viewport::from_size(128, 96));
        assert_eq!(gpu.live_resource_count(), live);

        assert_eq!(context.render_targets().len(), old_targets.len());
        for (target, (old_id, old_rtv)) in context.render_targets().iter().zip(&old_targets) {
            let id = target.resource().id();
            assert!(!gpu.is_live(*old_id));
            assert_eq!(target.rtv(), *old_rtv);
            assert_eq!(target.resource().extent(), (128, 96));
            assert_eq!(gpu.extent(id), Some((128, 96)));
            assert_eq!(
                gpu.view(*old_rtv),
                Some(ViewDesc::RenderTarget {
                    resource: id,
                    array_layer: None
                })
            );
        }

        let depth = context.depth_buffer();
        assert!(!gpu.is_live(old_depth));
        assert_eq!((depth.dsv(0), depth.srv()), depth_slots);
        assert_eq!(gpu.extent(depth.resource().id()), Some((128, 96)));
        assert!(matches!(
            gpu.shader_view(depth.srv()),
            Some(ViewDesc::ShaderResource { resource, .. }) if resource == depth.resource().id()
        ));

        for (name, old_id, old_rtv, old_srv) in &old_rtts {
            let texture = context.render_texture(name).unwrap();
            let id = texture.resource().id();
            assert!(!gpu.is_live(*old_id));
            assert_eq!((texture.rtv(), texture.srv()), (*old_rtv, *old_srv));
            assert_eq!(gpu.extent(id), Some((128, 96)));
            assert_eq!(
                gpu.shader_view(*old_srv),
                Some(ViewDesc::ShaderResource {
                    resource: id,
                    kind: TextureKind::Color
                })
            );
        }

        // the shadow map is not screen sized
        assert_eq!(context.shadow_map().resource().id(), shadow);
        assert_eq!(gpu.extent(shadow), Some((16, 16)));
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let (mut context, gpu) = test_context(64, 32);
        let depth = context.depth_buffer().resource().id();

        context.set_window_size(0, 96).unwrap();

        assert_eq!((context.width(), context.height()), (64, 32));
        assert!(gpu.is_live(depth));
        assert_eq!(context.fence().last_signaled(), 0);
    }
}
