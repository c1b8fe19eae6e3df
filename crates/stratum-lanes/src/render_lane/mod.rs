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

//! The concrete render passes.
//!
//! | Name | Lane | Draws |
//! |------|------|-------|
//! | `shadow_map` | [`ShadowPassLane`] | casters into each cascade layer |
//! | `depth_prepass`, `forward`, `geometry` | [`MeshPass`] | scene meshes |
//! | `skybox` | [`SkyboxPass`] | cube map at the far plane |
//! | `ssao`, `lighting`, `bloom_*`, `tonemapping`, `fxaa`, `final` | [`PostProcessPass`] | full-screen quad |

mod factory;
mod mesh_lanes;
pub mod pass_base;
mod post_process_lanes;
mod shader_source;
mod shadow_pass_lane;
mod skybox_lane;

pub use self::factory::{PassConstructor, PassFactoryError, RenderPassFactory};
pub use self::mesh_lanes::{MeshPass, MeshPassKind};
pub use self::pass_base::{PassBase, PipelineSetup, TargetBinding};
pub use self::post_process_lanes::{PostProcessKind, PostProcessPass};
pub use self::shader_source::load_shader_source;
pub use self::shadow_pass_lane::ShadowPassLane;
pub use self::skybox_lane::SkyboxPass;

#[cfg(test)]
pub(crate) mod test_support {
    use bytemuck::Zeroable;
    use glam::{Mat4, Vec3};
    use std::path::PathBuf;
    use std::sync::Arc;
    use stratum_core::renderer::api::{
        Command, Format, GpuDescriptorHandle, ResourceDesc, ResourceState, ResourceUsage,
        TextureKind, ViewDesc,
    };
    use stratum_core::renderer::traits::SwapChainDesc;
    use stratum_core::renderer::{
        compute_cascades, CascadeCamera, CascadeSet, ConstantBuffer, ContextSettings, Device,
        DeviceConfig, DrawItem, FrameData, IndexBuffer, MeshVertex, ObjectConstants,
        RenderContext, Resource, VertexBuffer,
    };
    use stratum_infra::{HeadlessBackend, HeadlessDevice};

    /// A headless 64x32 context, a shader directory, and one draw.
    pub struct Harness {
        pub context: RenderContext,
        pub device: Arc<HeadlessDevice>,
        pub draws: Vec<DrawItem>,
        pub cascades: CascadeSet,
        dir: tempfile::TempDir,
    }

    impl Harness {
        /// Writes `<name>.wgsl` with both entry points for every name.
        pub fn new(shaders: &[&str]) -> Self {
            let mut backend = HeadlessBackend::new();
            let device = Device::initialize(
                &mut backend,
                &DeviceConfig {
                    debug_layer: false,
                    swap_chain: SwapChainDesc {
                        width: 64,
                        height: 32,
                        buffer_count: 2,
                        vsync: true,
                    },
                },
            )
            .unwrap();
            let headless = backend.device().unwrap();
            let mut context = RenderContext::initialize(
                device,
                ContextSettings {
                    width: 64,
                    height: 32,
                    shadow_map_size: 16,
                    clear_color: [0.0, 0.0, 0.0, 1.0],
                },
            )
            .unwrap();

            let dir = tempfile::tempdir().unwrap();
            for name in shaders {
                std::fs::write(
                    dir.path().join(format!("{name}.wgsl")),
                    "fn vs_main() {}\nfn fs_main() {}\n",
                )
                .unwrap();
            }

            let draws = vec![triangle(&mut context)];
            let camera = CascadeCamera {
                view: Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y),
                fov_y: 1.0,
                aspect: 2.0,
                near: 0.1,
                far: 50.0,
            };
            let cascades = compute_cascades(&camera, Vec3::new(-0.3, -1.0, -0.2));

            Self {
                context,
                device: headless,
                draws,
                cascades,
                dir,
            }
        }

        pub fn shader_dir(&self) -> PathBuf {
            self.dir.path().to_path_buf()
        }

        /// Registers a six-layer cube texture and returns its table.
        pub fn cube_table(&mut self) -> GpuDescriptorHandle {
            let resource = Resource::create(
                self.context.gpu(),
                ResourceDesc::texture_array(
                    "Sky",
                    1,
                    1,
                    6,
                    Format::Rgba8UnormSrgb,
                    ResourceUsage::Sampled,
                ),
                ResourceState::PixelShaderResource,
            )
            .unwrap();
            self.context
                .register_texture(&ViewDesc::ShaderResource {
                    resource: resource.id(),
                    kind: TextureKind::Cube,
                })
                .unwrap()
        }
    }

    fn triangle(context: &mut RenderContext) -> DrawItem {
        let vertex = |x: f32, y: f32| MeshVertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [x, y],
        };
        let gpu = context.gpu();
        let vertices = VertexBuffer::create(
            gpu,
            "Triangle Vertices",
            &[vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)],
        )
        .unwrap();
        let indices = IndexBuffer::create(gpu, "Triangle Indices", &[0, 1, 2]).unwrap();
        let albedo = Resource::create(
            gpu,
            ResourceDesc::texture_2d(
                "Albedo",
                1,
                1,
                Format::Rgba8UnormSrgb,
                ResourceUsage::Sampled,
            ),
            ResourceState::PixelShaderResource,
        )
        .unwrap();
        let albedo_id = albedo.id();
        let vertex_buffer = vertices.view();
        let index_buffer = indices.view();
        let index_count = indices.index_count();

        let object: ConstantBuffer<ObjectConstants> = context
            .create_constant_buffer("Triangle Object", &ObjectConstants::zeroed())
            .unwrap();
        let albedo_table = context
            .register_texture(&ViewDesc::ShaderResource {
                resource: albedo_id,
                kind: TextureKind::Color,
            })
            .unwrap();

        DrawItem {
            object_table: object.table(),
            albedo_table,
            vertex_buffer,
            index_buffer,
            first_index: 0,
            index_count,
            base_vertex: 0,
        }
    }

    pub fn frame<'a>(
        draws: &'a [DrawItem],
        cascades: &'a CascadeSet,
        skybox: Option<GpuDescriptorHandle>,
    ) -> FrameData<'a> {
        FrameData {
            draws,
            cascades,
            skybox,
        }
    }

    /// The frame bracket up to the passes.
    pub fn begin_frame(context: &mut RenderContext) {
        context.reset_command_list();
        context.bind_descriptor_heaps();
        context.bind_viewport();
        context.clear_render_targets().unwrap();
    }

    /// The frame bracket after the passes. Returns what the device executed.
    pub fn end_frame(context: &mut RenderContext, device: &HeadlessDevice) -> Vec<Command> {
        context.prepare_for_present().unwrap();
        context.submit().unwrap();
        context.present().unwrap();
        context.wait_for_previous_frame().unwrap();
        device.last_command_list().unwrap()
    }
}
