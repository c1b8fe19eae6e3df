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

//! Resize, reload, fence, error, and shutdown behavior of the renderer.

mod common;

use common::{app_data, shadowed_forward_passes, start, workspace_root, HEIGHT, WIDTH};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use stratum_agents::RendererError;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::RenderError;
use stratum_core::ApplicationData;
use stratum_lanes::PassFactoryError;

#[test]
fn resize_rebuilds_screen_targets_in_place() {
    let mut data = app_data(shadowed_forward_passes());
    let (mut renderer, device) = start(&data);
    renderer.render_frame(&mut data).unwrap();

    let rtv_before = renderer.context().render_texture("lighting_target").unwrap().rtv();
    let live_before = device.live_resource_count();
    renderer.resize(128, 96).unwrap();

    let context = renderer.context();
    assert_eq!((context.width(), context.height()), (128, 96));
    assert_eq!(device.live_resource_count(), live_before);

    let lighting = context.render_texture("lighting_target").unwrap();
    assert_eq!(lighting.rtv(), rtv_before);
    let screen_sized = context
        .render_targets()
        .iter()
        .map(|target| target.resource().id())
        .chain([context.depth_buffer().resource().id()])
        .chain(context.render_textures().map(|texture| texture.resource().id()));
    for id in screen_sized {
        assert_eq!(device.resource_desc(id).unwrap().extent(), (128, 96));
    }
    renderer.render_frame(&mut data).unwrap();
}

#[test]
fn lost_device_fails_the_frame() {
    let mut data = app_data(shadowed_forward_passes());
    let (mut renderer, device) = start(&data);
    renderer.render_frame(&mut data).unwrap();

    device.lose_device();
    let err = renderer.render_frame(&mut data).unwrap_err();
    assert!(matches!(err, RendererError::Render(RenderError::DeviceLost)));
}

#[test]
fn zero_and_unchanged_sizes_are_ignored() {
    let data = app_data(shadowed_forward_passes());
    let (mut renderer, _device) = start(&data);
    let fence_before = renderer.context().fence().last_signaled();

    renderer.resize(0, 720).unwrap();
    renderer.resize(WIDTH, HEIGHT).unwrap();

    assert_eq!(renderer.context().width(), WIDTH);
    assert_eq!(renderer.context().fence().last_signaled(), fence_before);
}

#[test]
fn raised_reload_flag_recompiles_every_pass_once() {
    let mut data = app_data(shadowed_forward_passes());
    let (mut renderer, device) = start(&data);
    renderer.render_frame(&mut data).unwrap();
    let compiled = device.compiled_shader_paths().len();
    // the shadow pass has no pixel stage
    assert_eq!(compiled, 7);

    renderer.reload_flag().store(true, Ordering::Release);
    renderer.render_frame(&mut data).unwrap();
    assert_eq!(device.compiled_shader_paths().len(), 2 * compiled);
    assert!(!renderer.reload_flag().load(Ordering::Acquire));

    renderer.render_frame(&mut data).unwrap();
    assert_eq!(device.compiled_shader_paths().len(), 2 * compiled);
    assert_eq!(device.pipeline_count(), 4);
}

#[test]
fn every_frame_waits_for_its_own_fence_ticket() {
    let mut data = app_data(shadowed_forward_passes());
    let (mut renderer, device) = start(&data);
    for _ in 0..3 {
        renderer.render_frame(&mut data).unwrap();
    }
    let fence = renderer.context().fence();
    assert_eq!(device.fence_signaled_value(fence.id()), fence.last_signaled());
    assert!(fence.completed_value() >= fence.last_signaled());
    assert_eq!(device.present_count(), 3);
    assert_eq!(device.executed_command_lists().len(), 3);
}

#[test]
fn frame_blocks_until_the_gpu_reaches_the_ticket() {
    let mut data = app_data(shadowed_forward_passes());
    let (mut renderer, device) = start(&data);
    device.set_fence_auto_complete(false);

    let fence = renderer.context().fence().id();
    let ticket = renderer.context().fence().last_signaled() + 1;
    let gpu = device.clone();
    let completer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        gpu.complete_fence(fence, ticket);
    });

    renderer.render_frame(&mut data).unwrap();
    completer.join().unwrap();
    assert!(renderer.context().fence().completed_value() >= ticket);
}

#[test]
fn unregistered_pass_names_fail_construction() {
    let mut passes = shadowed_forward_passes();
    passes.insert(1, RenderPassData::new("motion_blur"));
    let data = app_data(passes);

    let mut backend = stratum_infra::HeadlessBackend::new();
    let device = headless_device(&mut backend, &data);
    let err = stratum_agents::Renderer::new(
        device,
        &data,
        &stratum_lanes::FileAssetLoader::new(workspace_root()),
        stratum_lanes::RenderPassFactory::with_builtin_passes(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RendererError::Factory(PassFactoryError::UnknownPass(ref name)) if name == "motion_blur"
    ));
}

#[test]
fn inputs_nobody_produces_fail_construction() {
    let passes = vec![
        RenderPassData::new("tonemapping")
            .with_inputs(["lighting_target"])
            .with_outputs(["ldr_target"]),
        RenderPassData::new("final").with_inputs(["ldr_target"]),
    ];
    let data = app_data(passes);

    let mut backend = stratum_infra::HeadlessBackend::new();
    let device = headless_device(&mut backend, &data);
    let err = stratum_agents::Renderer::new(
        device,
        &data,
        &stratum_lanes::FileAssetLoader::new(workspace_root()),
        stratum_lanes::RenderPassFactory::with_builtin_passes(),
    )
    .unwrap_err();
    assert!(matches!(err, RendererError::PassGraph(_)));
    assert!(err.to_string().starts_with("Invalid pass list"));
}

#[test]
fn shutdown_releases_pipelines_and_resources() {
    let mut data = app_data(shadowed_forward_passes());
    let (mut renderer, device) = start(&data);
    renderer.render_frame(&mut data).unwrap();
    assert!(device.pipeline_count() > 0);

    renderer.shutdown().unwrap();
    assert_eq!(device.pipeline_count(), 0);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn shipped_configuration_renders_headless() {
    let mut data = ApplicationData::load(workspace_root().join("assets/config.json")).unwrap();
    data.render_data.shader_directory = workspace_root()
        .join(&data.render_data.shader_directory)
        .display()
        .to_string();
    data.window_data.width = WIDTH;
    data.window_data.height = HEIGHT;
    data.render_data.shadow_map_size = 32;

    let (mut renderer, device) = start(&data);
    renderer.render_frame(&mut data).unwrap();
    assert_eq!(renderer.draws().len(), 3);
    assert_eq!(device.present_count(), 1);
}

fn headless_device(
    backend: &mut stratum_infra::HeadlessBackend,
    data: &ApplicationData,
) -> stratum_core::renderer::Device {
    use stratum_core::renderer::traits::SwapChainDesc;
    use stratum_core::renderer::{Device, DeviceConfig};

    Device::initialize(
        backend,
        &DeviceConfig {
            debug_layer: false,
            swap_chain: SwapChainDesc {
                width: data.window_data.width,
                height: data.window_data.height,
                buffer_count: 2,
                vsync: false,
            },
        },
    )
    .unwrap()
}
