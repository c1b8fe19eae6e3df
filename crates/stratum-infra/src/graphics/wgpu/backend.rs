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

//! The `wgpu` implementation of [`GraphicsBackend`].

use super::context::WgpuGraphicsContext;
use super::conversions::adapter_kind_from_wgpu;
use super::device::WgpuDevice;
use std::sync::Arc;
use stratum_core::platform::StratumWindowHandle;
use stratum_core::renderer::traits::{AdapterInfo, GraphicsBackend, GraphicsDevice};
use stratum_core::renderer::RenderError;
use wgpu::{Adapter, Backend, Instance, RequestAdapterOptions};

/// Creates `wgpu` devices presenting to one window.
///
/// The backend follows the device initialization order step by step: the
/// debug flag is recorded, then the instance is created, the adapters are
/// collected, and finally the chosen adapter opens a device and a surface.
pub struct WgpuBackend {
    window: StratumWindowHandle,
    debug_layer: bool,
    instance: Option<Instance>,
    adapters: Vec<Adapter>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("debug_layer", &self.debug_layer)
            .field("instance_created", &self.instance.is_some())
            .field("adapters", &self.adapters.len())
            .finish()
    }
}

impl WgpuBackend {
    /// A backend that will present to `window`.
    pub fn new(window: StratumWindowHandle) -> Self {
        Self {
            window,
            debug_layer: false,
            instance: None,
            adapters: Vec::new(),
        }
    }

    /// Returns a readable name for a `wgpu` backend.
    fn backend_name(backend: Backend) -> &'static str {
        match backend {
            Backend::Vulkan => "Vulkan",
            Backend::Metal => "Metal",
            Backend::Dx12 => "DirectX 12",
            Backend::Gl => "OpenGL",
            Backend::BrowserWebGpu => "WebGPU",
            #[allow(unreachable_patterns)]
            _ => "Unknown",
        }
    }

    /// Asks the instance for its preferred adapter under each power preference.
    async fn collect_adapters(instance: &Instance) -> Vec<Adapter> {
        let mut adapters: Vec<Adapter> = Vec::new();
        let requests = [
            (wgpu::PowerPreference::HighPerformance, false),
            (wgpu::PowerPreference::LowPower, false),
            (wgpu::PowerPreference::None, true),
        ];
        for (power_preference, force_fallback_adapter) in requests {
            match instance
                .request_adapter(&RequestAdapterOptions {
                    power_preference,
                    compatible_surface: None,
                    force_fallback_adapter,
                })
                .await
            {
                Ok(adapter) => {
                    let info = adapter.get_info();
                    let known = adapters.iter().any(|a| {
                        let other = a.get_info();
                        other.name == info.name && other.backend == info.backend
                    });
                    if !known {
                        adapters.push(adapter);
                    }
                }
                Err(e) => log::debug!("No adapter for {power_preference:?}: {e}"),
            }
        }
        adapters
    }
}

impl GraphicsBackend for WgpuBackend {
    fn enable_debug_layer(&mut self, enabled: bool) -> Result<(), RenderError> {
        self.debug_layer = enabled;
        if enabled {
            log::info!("WGPU validation enabled.");
        }
        Ok(())
    }

    fn create_factory(&mut self) -> Result<(), RenderError> {
        let mut descriptor = wgpu::InstanceDescriptor::new_without_display_handle();
        descriptor.flags = if self.debug_layer {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        };
        self.instance = Some(Instance::new(descriptor));
        log::debug!("WGPU instance created.");
        Ok(())
    }

    fn enumerate_adapters(&mut self) -> Result<Vec<AdapterInfo>, RenderError> {
        let instance = self.instance.as_ref().ok_or(RenderError::NotInitialized)?;
        self.adapters = pollster::block_on(Self::collect_adapters(instance));

        let infos = self
            .adapters
            .iter()
            .enumerate()
            .map(|(index, adapter)| {
                let info = adapter.get_info();
                log::info!(
                    "Adapter {index}: \"{}\" ({:?}, {})",
                    info.name,
                    info.device_type,
                    Self::backend_name(info.backend)
                );
                AdapterInfo {
                    index,
                    name: info.name,
                    kind: adapter_kind_from_wgpu(info.device_type),
                    api: Self::backend_name(info.backend).to_string(),
                    // wgpu does not report memory sizes.
                    dedicated_video_memory: 0,
                }
            })
            .collect();
        Ok(infos)
    }

    fn create_device(
        &mut self,
        adapter: &AdapterInfo,
    ) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        let instance = self.instance.as_ref().ok_or(RenderError::NotInitialized)?;
        let selected = self
            .adapters
            .get(adapter.index)
            .cloned()
            .ok_or(RenderError::NoSuitableAdapter)?;
        let context = pollster::block_on(WgpuGraphicsContext::new(
            instance,
            self.window.clone(),
            selected,
        ))
        .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;
        let device = WgpuDevice::new(context)?;
        Ok(Arc::new(device))
    }
}
