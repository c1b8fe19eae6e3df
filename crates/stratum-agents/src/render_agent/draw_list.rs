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

//! Turns scene instances into per-sub-mesh draws.

use std::collections::HashSet;
use stratum_core::asset::AssetCache;
use stratum_core::renderer::{
    ConstantBuffer, DrawItem, ObjectConstants, RenderContext, RenderError,
};
use stratum_core::scene::Scene;

/// Per-instance object constants and the draws built from them.
///
/// Constant buffers are indexed like `Scene::instances` and updated in place
/// every frame. The list only grows: a shrinking scene keeps its spare
/// buffers for later instances, so object heap slots are not leaked by edits.
#[derive(Debug, Default)]
pub struct DrawList {
    objects: Vec<ConstantBuffer<ObjectConstants>>,
    draws: Vec<DrawItem>,
    reported: HashSet<String>,
}

impl DrawList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads every instance's constants and rebuilds the draws.
    ///
    /// Disabled instances keep their buffer but draw nothing. Instances whose
    /// model is not loaded are skipped; an unknown albedo texture falls back
    /// to the default one. Both are reported once per name.
    pub fn update(
        &mut self,
        scene: &Scene,
        assets: &AssetCache,
        context: &mut RenderContext,
    ) -> Result<(), RenderError> {
        let default_albedo = assets.default_albedo().ok_or(RenderError::NotInitialized)?;
        self.draws.clear();

        for (index, instance) in scene.instances.iter().enumerate() {
            let constants = instance.object_constants();
            match self.objects.get(index) {
                Some(buffer) => buffer.update(context.gpu(), &constants)?,
                None => {
                    let label = format!("{} Object Constants", instance.name);
                    let buffer = context.create_constant_buffer(&label, &constants)?;
                    self.objects.push(buffer);
                }
            }
            if !instance.enabled {
                continue;
            }

            let Some(mesh) = assets.mesh(&instance.model) else {
                if self.reported.insert(instance.model.clone()) {
                    log::warn!(
                        "Instance '{}' uses unknown model '{}', not drawing it",
                        instance.name,
                        instance.model
                    );
                }
                continue;
            };
            let albedo_table = match instance.albedo_texture.as_deref() {
                None => default_albedo,
                Some(name) => match assets.texture(name) {
                    Some(texture) => texture.table(),
                    None => {
                        if self.reported.insert(name.to_string()) {
                            log::warn!("Unknown albedo texture '{name}', using the default");
                        }
                        default_albedo
                    }
                },
            };

            let object_table = self.objects[index].table();
            self.draws.extend(mesh.sub_meshes.iter().map(|sub_mesh| DrawItem {
                object_table,
                albedo_table,
                vertex_buffer: mesh.vertex_buffer.view(),
                index_buffer: mesh.index_buffer.view(),
                first_index: sub_mesh.first_index,
                index_count: sub_mesh.index_count,
                base_vertex: sub_mesh.base_vertex,
            }));
        }
        Ok(())
    }

    /// This frame's draws, in scene order.
    pub fn draws(&self) -> &[DrawItem] {
        &self.draws
    }

    /// Number of object constant buffers alive.
    pub fn object_buffer_count(&self) -> usize {
        self.objects.len()
    }

    /// Destroys every object constant buffer.
    pub fn release(&mut self, context: &RenderContext) {
        self.draws.clear();
        for buffer in self.objects.drain(..) {
            buffer.release(context.gpu());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use stratum_core::asset::{AssetLoadError, AssetLoader, CpuMesh, CpuTexture, SubMesh};
    use stratum_core::config::{AssetData, AssetsData, ModelInstanceData, SceneData, SceneObjectData};
    use stratum_core::renderer::traits::SwapChainDesc;
    use stratum_core::renderer::{ContextSettings, Device, DeviceConfig, MeshVertex};
    use stratum_infra::HeadlessBackend;

    struct TwoPartLoader;

    impl AssetLoader for TwoPartLoader {
        fn load_model(&self, _path: &Path) -> Result<CpuMesh, AssetLoadError> {
            let vertex = MeshVertex {
                position: [0.0; 3],
                normal: [0.0, 1.0, 0.0],
                uv: [0.0; 2],
            };
            Ok(CpuMesh {
                vertices: vec![vertex; 6],
                indices: vec![0, 1, 2, 0, 1, 2],
                sub_meshes: vec![
                    SubMesh {
                        first_index: 0,
                        index_count: 3,
                        base_vertex: 0,
                    },
                    SubMesh {
                        first_index: 3,
                        index_count: 3,
                        base_vertex: 3,
                    },
                ],
            })
        }

        fn load_texture(&self, path: &Path) -> Result<CpuTexture, AssetLoadError> {
            Err(format!("no texture at {}", path.display()).into())
        }
    }

    fn context() -> RenderContext {
        let mut backend = HeadlessBackend::new();
        let device = Device::initialize(
            &mut backend,
            &DeviceConfig {
                debug_layer: false,
                swap_chain: SwapChainDesc {
                    width: 32,
                    height: 32,
                    buffer_count: 2,
                    vsync: false,
                },
            },
        )
        .unwrap();
        RenderContext::initialize(
            device,
            ContextSettings {
                width: 32,
                height: 32,
                shadow_map_size: 16,
                clear_color: [0.0; 4],
            },
        )
        .unwrap()
    }

    fn scene_data(instances: Vec<ModelInstanceData>) -> SceneData {
        SceneData {
            objects: instances
                .into_iter()
                .map(SceneObjectData::ModelInstance)
                .collect(),
        }
    }

    #[test]
    fn one_draw_per_sub_mesh_of_enabled_known_instances() {
        let mut context = context();
        let mut assets = AssetCache::new();
        let declared = AssetsData {
            assets: vec![AssetData::Model {
                name: "ship".into(),
                path: "ship.obj".into(),
            }],
        };
        assets.load_all(&declared, &TwoPartLoader, &mut context).unwrap();

        let mut hidden = ModelInstanceData::new("hidden", "ship");
        hidden.enabled = false;
        let mut textured = ModelInstanceData::new("textured", "ship");
        textured.albedo_texture = Some("missing".into());
        let scene = Scene::from_data(&scene_data(vec![
            ModelInstanceData::new("a", "ship"),
            hidden,
            ModelInstanceData::new("ghost", "unknown"),
            textured,
        ]));

        let mut list = DrawList::new();
        list.update(&scene, &assets, &mut context).unwrap();

        assert_eq!(list.object_buffer_count(), 4);
        let draws = list.draws();
        assert_eq!(draws.len(), 4);
        assert_eq!(draws[1].first_index, 3);
        assert_eq!(draws[1].base_vertex, 3);
        assert_ne!(draws[0].object_table, draws[2].object_table);
        let default_albedo = assets.default_albedo().unwrap();
        assert!(draws.iter().all(|d| d.albedo_table == default_albedo));
    }

    #[test]
    fn buffers_are_reused_when_the_scene_shrinks() {
        let mut context = context();
        let mut assets = AssetCache::new();
        assets
            .load_all(&AssetsData::default(), &TwoPartLoader, &mut context)
            .unwrap();
        let mut list = DrawList::new();

        let three = Scene::from_data(&scene_data(vec![
            ModelInstanceData::new("a", "ship"),
            ModelInstanceData::new("b", "ship"),
            ModelInstanceData::new("c", "ship"),
        ]));
        list.update(&three, &assets, &mut context).unwrap();
        let one = Scene::from_data(&scene_data(vec![ModelInstanceData::new("a", "ship")]));
        list.update(&one, &assets, &mut context).unwrap();
        list.update(&three, &assets, &mut context).unwrap();

        assert_eq!(list.object_buffer_count(), 3);
        list.release(&context);
        assert_eq!(list.object_buffer_count(), 0);
    }
}
