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

use super::conversions::from_wgpu_texture_format;
use anyhow::{anyhow, Result};
use stratum_core::platform::StratumWindowHandle;
use wgpu::{Adapter, Instance, SurfaceTargetUnsafe};

/// Holds the core `wgpu` state objects required for rendering.
///
/// The context is created on a pre-selected adapter and owns the surface the
/// swap chain presents to. The surface is configured separately, once the
/// swap-chain parameters are known.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    /// The window surface.
    pub surface: wgpu::Surface<'static>,
    /// The adapter the device was opened on.
    pub adapter: wgpu::Adapter,
    /// The logical device.
    pub device: wgpu::Device,
    /// The queue of `device`.
    pub queue: wgpu::Queue,
    /// Configuration for the surface's swapchain behavior.
    pub surface_config: wgpu::SurfaceConfiguration,
    surface_configured: bool,

    // The frame acquired for the current back buffer, if any
    current_frame: Option<wgpu::SurfaceTexture>,

    /// Name of the adapter, for logs.
    pub adapter_name: String,
}

impl WgpuGraphicsContext {
    /// Creates the surface for `window_handle` and the logical device on `adapter`.
    ///
    /// ## Arguments
    /// * `instance` - The instance the adapter was enumerated from.
    /// * `window_handle` - The window to present to.
    /// * `adapter` - The pre-selected adapter.
    pub async fn new(
        instance: &Instance,
        window_handle: StratumWindowHandle,
        adapter: Adapter,
    ) -> Result<Self> {
        log::info!("Initializing WGPU Graphics Context with pre-selected adapter...");

        // --- 1. Create Surface ---
        let surface_target = unsafe {
            SurfaceTargetUnsafe::from_window(&window_handle)
                .map_err(|e| anyhow!("Failed to create surface target: {}", e))?
        };
        let surface = unsafe { instance.create_surface_unsafe(surface_target)? };
        log::debug!("WGPU surface created for the window.");

        let adapter_info = adapter.get_info();

        // --- 2. Create Logical Device and Command Queue from Adapter ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Stratum Logical Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        // --- 3. Pick the surface format ---
        // Tonemapping writes display-encoded values, so a linear surface format is preferred.
        let surface_caps = surface.get_capabilities(&adapter);
        let known = |f: &wgpu::TextureFormat| from_wgpu_texture_format(*f).is_some();
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb() && known(f))
            .or_else(|| surface_caps.formats.iter().copied().find(known))
            .ok_or_else(|| anyhow!("The surface reports no format the engine can render to"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: 1,
            height: 1,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Ok(WgpuGraphicsContext {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            surface_configured: false,
            current_frame: None,
            adapter_name: adapter_info.name,
        })
    }

    /// Configures the swap chain for the first time.
    ///
    /// With `vsync` the present mode is FIFO; otherwise mailbox is used when
    /// available.
    pub fn configure(&mut self, width: u32, height: u32, vsync: bool) {
        let caps = self.surface.get_capabilities(&self.adapter);
        self.surface_config.present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(wgpu::PresentMode::Fifo) // Fifo is guaranteed to be supported
        };
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
        self.surface_configured = true;
    }

    /// Reconfigures the underlying surface (swapchain) when the window is resized.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            log::info!(
                "WGPUGraphicsContext: Resizing surface configuration to {new_width}x{new_height}"
            );
            self.current_frame = None;
            self.surface_config.width = new_width;
            self.surface_config.height = new_height;
            self.surface.configure(&self.device, &self.surface_config);
        } else {
            log::warn!(
                "WGPUGraphicsContext: Ignoring resize request to zero dimensions: {new_width}x{new_height}"
            );
        }
    }

    /// Whether [`configure`](Self::configure) has run.
    pub fn is_configured(&self) -> bool {
        self.surface_configured
    }

    /// Returns the texture of the frame being rendered, acquiring it on first use.
    ///
    /// A lost or outdated surface is reconfigured once before giving up.
    pub fn current_frame_texture(&mut self) -> Result<wgpu::Texture> {
        if self.current_frame.is_none() {
            let frame = match self.surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(frame)
                | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => frame,
                wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                    log::warn!("Surface lost or outdated, reconfiguring");
                    self.surface.configure(&self.device, &self.surface_config);
                    match self.surface.get_current_texture() {
                        wgpu::CurrentSurfaceTexture::Success(frame)
                        | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => frame,
                        e => return Err(anyhow!("Failed to acquire surface texture: {e:?}")),
                    }
                }
                e => return Err(anyhow!("Failed to acquire surface texture: {e:?}")),
            };
            self.current_frame = Some(frame);
        }
        self.current_frame
            .as_ref()
            .map(|frame| frame.texture.clone())
            .ok_or_else(|| anyhow!("No surface frame acquired"))
    }

    /// Presents the acquired frame, acquiring an empty one if nothing was drawn.
    pub fn present(&mut self) -> Result<()> {
        if self.current_frame.is_none() {
            self.current_frame_texture()?;
        }
        if let Some(frame) = self.current_frame.take() {
            frame.present();
        }
        Ok(())
    }

    /// Drops the acquired frame without presenting it.
    pub fn discard_frame(&mut self) {
        self.current_frame = None;
    }

    /// Returns the size of the surface configuration.
    pub fn get_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}
