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

//! The logical device: adapter, queue, swap chain, allocators, and the shared command list.

use crate::renderer::api::{CommandAllocator, CommandList};
use crate::renderer::error::RenderError;
use crate::renderer::traits::{
    select_adapter, AdapterInfo, GraphicsBackend, GraphicsDevice, SwapChainDesc,
};
use std::sync::Arc;

/// Parameters for [`Device::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Enable the API validation layer.
    pub debug_layer: bool,
    /// The swap chain to create.
    pub swap_chain: SwapChainDesc,
}

/// Owns the GPU device, one command allocator per back buffer, and the single
/// command list every frame is recorded into.
#[derive(Debug)]
pub struct Device {
    gpu: Arc<dyn GraphicsDevice>,
    adapter: AdapterInfo,
    allocators: Vec<CommandAllocator>,
    command_list: CommandList,
}

impl Device {
    /// Brings a device up from a native backend.
    ///
    /// The steps run in a fixed order: debug layer, factory, adapter selection
    /// (discrete first, software adapters skipped), logical device, command queue,
    /// swap chain, one command allocator per back buffer, and finally the shared
    /// command list. Any failing step aborts initialization.
    pub fn initialize(
        backend: &mut dyn GraphicsBackend,
        config: &DeviceConfig,
    ) -> Result<Self, RenderError> {
        log::info!("Initializing graphics device...");

        // --- 1. Debug layer & factory ---
        backend.enable_debug_layer(config.debug_layer)?;
        backend.create_factory()?;

        // --- 2. Adapter selection ---
        let adapters = backend.enumerate_adapters()?;
        for adapter in &adapters {
            log::debug!(
                " -> Found adapter \"{}\" ({:?}, {})",
                adapter.name,
                adapter.kind,
                adapter.api
            );
        }
        let adapter = select_adapter(&adapters)?;
        log::info!(
            "Using graphics adapter: \"{}\" ({:?}, {})",
            adapter.name,
            adapter.kind,
            adapter.api
        );

        // --- 3. Logical device, queue & swap chain ---
        let gpu = backend.create_device(&adapter)?;
        gpu.create_command_queue()?;
        gpu.create_swap_chain(&config.swap_chain)?;
        log::info!(
            "Swap chain created: {}x{}, {} buffers, vsync {}",
            config.swap_chain.width,
            config.swap_chain.height,
            config.swap_chain.buffer_count,
            config.swap_chain.vsync
        );

        // --- 4. Allocators & command list ---
        let allocators = (0..gpu.back_buffer_count())
            .map(|_| CommandAllocator::new())
            .collect();

        Ok(Self {
            gpu,
            adapter,
            allocators,
            command_list: CommandList::new(),
        })
    }

    /// The backend device.
    pub fn gpu(&self) -> &dyn GraphicsDevice {
        self.gpu.as_ref()
    }

    /// A shared handle to the backend device.
    pub fn gpu_arc(&self) -> Arc<dyn GraphicsDevice> {
        Arc::clone(&self.gpu)
    }

    /// The adapter the device was created on.
    pub fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// The shared command list.
    pub fn command_list(&mut self) -> &mut CommandList {
        &mut self.command_list
    }

    /// Reopens the command list on the allocator of `frame_index`.
    pub fn reset_command_list(&mut self, frame_index: u32) {
        let slot = frame_index as usize % self.allocators.len().max(1);
        match self.allocators.get_mut(slot) {
            Some(allocator) => self.command_list.reset(allocator),
            None => {
                let mut scratch = CommandAllocator::new();
                self.command_list.reset(&mut scratch);
            }
        }
    }

    /// Closes the command list and executes it on the queue.
    pub fn execute_command_list(&mut self) -> Result<(), RenderError> {
        if self.command_list.is_recording() {
            self.command_list.close();
        }
        self.gpu.execute_command_list(self.command_list.commands())
    }
}
