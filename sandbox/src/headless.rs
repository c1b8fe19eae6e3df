//! Renders a fixed number of frames without a window.

use stratum_core::ApplicationData;
use stratum_infra::HeadlessBackend;

pub fn run(mut data: ApplicationData) -> anyhow::Result<()> {
    let (width, height) = (data.window_data.width, data.window_data.height);
    let frames = data.window_data.headless_frames;
    log::info!("Running {frames} headless frames at {width}x{height}");

    let mut backend = HeadlessBackend::new();
    let mut renderer = crate::create_renderer(&mut backend, &data, width, height)?;
    let _watcher = crate::watch_shaders(&data, &renderer);

    for _ in 0..frames {
        renderer.render_frame(&mut data)?;
    }

    if let Some(device) = backend.device() {
        log::info!(
            "Presented {} frames, {} command lists executed",
            device.present_count(),
            device.executed_command_lists().len()
        );
    }
    renderer.shutdown()?;
    Ok(())
}
