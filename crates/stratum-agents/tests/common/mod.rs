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

//! Shared fixtures: a headless renderer over the shipped shaders and cube.

use std::path::PathBuf;
use std::sync::Arc;
use stratum_agents::Renderer;
use stratum_core::config::{
    AssetData, CameraData, DirectionalLightData, ModelInstanceData, RenderPassData,
    SceneObjectData,
};
use stratum_core::renderer::traits::SwapChainDesc;
use stratum_core::renderer::{Device, DeviceConfig};
use stratum_core::ApplicationData;
use stratum_infra::{HeadlessBackend, HeadlessDevice};
use stratum_lanes::{FileAssetLoader, RenderPassFactory};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 32;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// A 64x32 forward setup drawing one cube with `passes`.
pub fn app_data(passes: Vec<RenderPassData>) -> ApplicationData {
    let mut data = ApplicationData::default();
    data.window_data.width = WIDTH;
    data.window_data.height = HEIGHT;
    data.render_data.shader_directory = workspace_root()
        .join("assets/shaders")
        .display()
        .to_string();
    data.render_data.shadow_map_size = 32;
    data.render_data.forward_render_passes = passes;
    data.assets_data.assets = vec![AssetData::Model {
        name: "cube".into(),
        path: "assets/models/cube.obj".into(),
    }];
    data.scene_data.objects = vec![
        SceneObjectData::Camera(CameraData::default()),
        SceneObjectData::DirectionalLight(DirectionalLightData::default()),
        SceneObjectData::ModelInstance(ModelInstanceData::new("crate", "cube")),
    ];
    data
}

/// The minimal shadowed forward chain.
pub fn shadowed_forward_passes() -> Vec<RenderPassData> {
    vec![
        RenderPassData::new("shadow_map").with_outputs(["shadow_map"]),
        RenderPassData::new("forward")
            .with_inputs(["shadow_map"])
            .with_outputs(["lighting_target"]),
        RenderPassData::new("tonemapping")
            .with_inputs(["lighting_target"])
            .with_outputs(["tonemapped_target"]),
        RenderPassData::new("final").with_inputs(["tonemapped_target"]),
    ]
}

pub fn start(data: &ApplicationData) -> (Renderer, Arc<HeadlessDevice>) {
    let mut backend = HeadlessBackend::new();
    let device = Device::initialize(
        &mut backend,
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
    .unwrap();
    let headless = backend.device().unwrap();
    let loader = FileAssetLoader::new(workspace_root());
    let renderer = Renderer::new(
        device,
        data,
        &loader,
        RenderPassFactory::with_builtin_passes(),
    )
    .unwrap();
    (renderer, headless)
}
