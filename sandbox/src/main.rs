//! Loads a configuration and renders it, in a window or headless.
//!
//! Usage: `sandbox [config.json]`, defaulting to `assets/config.json`.

mod app;
mod headless;

use anyhow::Context;
use std::path::{Path, PathBuf};
use stratum_agents::Renderer;
use stratum_core::renderer::traits::{GraphicsBackend, SwapChainDesc};
use stratum_core::renderer::{Device, DeviceConfig};
use stratum_core::ApplicationData;
use stratum_infra::{logging, ShaderWatcher};
use stratum_lanes::{FileAssetLoader, RenderPassFactory};

const DEFAULT_CONFIG: &str = "assets/config.json";

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let data = ApplicationData::load(&config_path)
        .with_context(|| format!("Failed to load '{}'", config_path.display()))?;
    logging::init(data.window_data.log_file.as_deref().map(Path::new))?;
    log::info!("Loaded configuration '{}'", config_path.display());

    let result = if data.window_data.headless {
        headless::run(data)
    } else {
        app::run(data)
    };
    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}

/// Opens a device on `backend` and builds the renderer for `data`.
///
/// Asset paths are resolved against the working directory.
pub(crate) fn create_renderer(
    backend: &mut dyn GraphicsBackend,
    data: &ApplicationData,
    width: u32,
    height: u32,
) -> anyhow::Result<Renderer> {
    let device = Device::initialize(
        backend,
        &DeviceConfig {
            debug_layer: data.window_data.debug_layer,
            swap_chain: SwapChainDesc {
                width,
                height,
                buffer_count: 2,
                vsync: data.window_data.vsync,
            },
        },
    )
    .context("Failed to initialize the graphics device")?;

    let mut data = data.clone();
    data.window_data.width = width;
    data.window_data.height = height;
    let renderer = Renderer::new(
        device,
        &data,
        &FileAssetLoader::new("."),
        RenderPassFactory::with_builtin_passes(),
    )
    .context("Failed to create the renderer")?;
    Ok(renderer)
}

/// Starts the shader watcher when `watch_shaders` is set.
///
/// A watcher that cannot start only disables hot reload.
pub(crate) fn watch_shaders(data: &ApplicationData, renderer: &Renderer) -> Option<ShaderWatcher> {
    if !data.render_data.watch_shaders {
        return None;
    }
    match ShaderWatcher::watch(&data.render_data.shader_directory, renderer.reload_flag()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            log::warn!(
                "Shader hot reload disabled, cannot watch '{}': {err}",
                data.render_data.shader_directory
            );
            None
        }
    }
}
