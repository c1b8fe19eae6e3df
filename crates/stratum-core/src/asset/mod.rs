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

//! CPU-side asset data, the loader seam, and the renderer-owned GPU asset cache.

use crate::config::{AssetData, AssetsData, TextureUsage};
use crate::renderer::api::{
    Format, GpuDescriptorHandle, ResourceDesc, ResourceState, ResourceUsage, TextureKind,
    ViewDesc,
};
use crate::renderer::{
    IndexBuffer, MeshVertex, RenderContext, RenderError, Resource, VertexBuffer,
};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

/// Error type returned by [`AssetLoader`] implementations.
pub type AssetLoadError = Box<dyn Error + Send + Sync>;

/// A contiguous index range of a mesh drawn with one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    /// First index in the index buffer.
    pub first_index: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Added to every index before fetching a vertex.
    pub base_vertex: i32,
}

/// Decoded mesh data ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuMesh {
    /// Interleaved vertices.
    pub vertices: Vec<MeshVertex>,
    /// Triangle-list indices.
    pub indices: Vec<u32>,
    /// Draw ranges, one per source object.
    pub sub_meshes: Vec<SubMesh>,
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTexture {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub pixels: Vec<u8>,
}

impl CpuTexture {
    /// The procedural stand-in used when a texture of `usage` cannot be loaded.
    pub fn placeholder(usage: TextureUsage) -> Self {
        match usage {
            TextureUsage::Albedo => Self::solid([255, 255, 255, 255]),
            TextureUsage::Normal => Self::solid([128, 128, 255, 255]),
            TextureUsage::Generic => {
                const SIZE: u32 = 8;
                let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
                for y in 0..SIZE {
                    for x in 0..SIZE {
                        let texel = if (x + y) % 2 == 0 {
                            [255, 0, 255, 255]
                        } else {
                            [0, 0, 0, 255]
                        };
                        pixels.extend_from_slice(&texel);
                    }
                }
                Self {
                    width: SIZE,
                    height: SIZE,
                    pixels,
                }
            }
        }
    }

    fn solid(texel: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: texel.to_vec(),
        }
    }
}

/// Decodes model and image files.
pub trait AssetLoader {
    /// Loads a model as one vertex/index buffer pair with one sub-mesh per object.
    fn load_model(&self, path: &Path) -> Result<CpuMesh, AssetLoadError>;

    /// Loads an image as RGBA8.
    fn load_texture(&self, path: &Path) -> Result<CpuTexture, AssetLoadError>;
}

/// A mesh resident on the GPU.
#[derive(Debug)]
pub struct GpuMesh {
    /// The vertex buffer.
    pub vertex_buffer: VertexBuffer,
    /// The index buffer.
    pub index_buffer: IndexBuffer,
    /// Draw ranges.
    pub sub_meshes: Vec<SubMesh>,
}

/// A texture resident on the GPU, with its shader view.
#[derive(Debug)]
pub struct GpuTexture {
    resource: Resource,
    table: GpuDescriptorHandle,
}

impl GpuTexture {
    /// The descriptor table to bind.
    pub fn table(&self) -> GpuDescriptorHandle {
        self.table
    }

    /// The texture resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

/// Every GPU asset the renderer draws with, keyed by asset name.
///
/// The cache is owned by the renderer: built once by [`load_all`](Self::load_all)
/// and emptied by [`clear`](Self::clear) at shutdown.
#[derive(Debug, Default)]
pub struct AssetCache {
    meshes: HashMap<String, GpuMesh>,
    textures: HashMap<String, GpuTexture>,
    cubemaps: HashMap<String, GpuTexture>,
    default_albedo: Option<GpuTexture>,
}

impl AssetCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and uploads every declared asset.
    ///
    /// A model that fails to load aborts with [`RenderError::AssetLoadFailed`].
    /// A texture that fails is replaced by the placeholder of its usage and
    /// logged as a warning.
    pub fn load_all(
        &mut self,
        assets: &AssetsData,
        loader: &dyn AssetLoader,
        context: &mut RenderContext,
    ) -> Result<(), RenderError> {
        if self.default_albedo.is_none() {
            self.default_albedo = Some(upload_texture(
                context,
                "Default Albedo",
                &[CpuTexture::placeholder(TextureUsage::Albedo)],
                texture_format(TextureUsage::Albedo),
            )?);
        }

        for asset in &assets.assets {
            match asset {
                AssetData::Model { name, path } => {
                    let mesh = loader.load_model(Path::new(path)).map_err(|err| {
                        RenderError::AssetLoadFailed {
                            path: path.clone(),
                            reason: err.to_string(),
                        }
                    })?;
                    log::info!(
                        "Loaded model '{name}' from '{path}': {} vertices, {} sub-meshes",
                        mesh.vertices.len(),
                        mesh.sub_meshes.len()
                    );
                    let gpu_mesh = upload_mesh(context, name, mesh)?;
                    self.meshes.insert(name.clone(), gpu_mesh);
                }
                AssetData::Texture { name, path, usage } => {
                    let pixels = load_or_placeholder(loader, path, *usage);
                    let texture = upload_texture(context, name, &[pixels], texture_format(*usage))?;
                    self.textures.insert(name.clone(), texture);
                }
                AssetData::Cubemap { name, faces } => {
                    let mut loaded: Vec<CpuTexture> = faces
                        .iter()
                        .map(|face| load_or_placeholder(loader, face, TextureUsage::Generic))
                        .collect();
                    let (width, height) = (loaded[0].width, loaded[0].height);
                    if loaded.iter().any(|f| f.width != width || f.height != height) {
                        log::warn!("Cube map '{name}' has faces of different sizes, using placeholders");
                        loaded = vec![CpuTexture::placeholder(TextureUsage::Generic); 6];
                    }
                    // sky faces are color images
                    let texture = upload_texture(context, name, &loaded, Format::Rgba8UnormSrgb)?;
                    self.cubemaps.insert(name.clone(), texture);
                }
            }
        }
        Ok(())
    }

    /// Looks up a mesh.
    pub fn mesh(&self, name: &str) -> Option<&GpuMesh> {
        self.meshes.get(name)
    }

    /// Looks up a texture.
    pub fn texture(&self, name: &str) -> Option<&GpuTexture> {
        self.textures.get(name)
    }

    /// Looks up a cube map.
    pub fn cubemap(&self, name: &str) -> Option<&GpuTexture> {
        self.cubemaps.get(name)
    }

    /// Any loaded cube map, preferring the lexically first name.
    pub fn first_cubemap(&self) -> Option<&GpuTexture> {
        self.cubemaps
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, texture)| texture)
    }

    /// The white texture bound for instances without an albedo texture.
    pub fn default_albedo(&self) -> Option<GpuDescriptorHandle> {
        self.default_albedo.as_ref().map(GpuTexture::table)
    }

    /// Number of loaded meshes, textures, and cube maps.
    pub fn len(&self) -> usize {
        self.meshes.len() + self.textures.len() + self.cubemaps.len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroys every GPU resource. Heap slots are not reclaimed.
    pub fn clear(&mut self, context: &RenderContext) {
        let gpu = context.gpu();
        for (_, mesh) in self.meshes.drain() {
            mesh.vertex_buffer.release(gpu);
            mesh.index_buffer.release(gpu);
        }
        let textures = self.textures.drain().chain(self.cubemaps.drain()).map(|(_, t)| t);
        for texture in textures.chain(self.default_albedo.take()) {
            texture.resource.release(gpu);
        }
    }
}

fn load_or_placeholder(loader: &dyn AssetLoader, path: &str, usage: TextureUsage) -> CpuTexture {
    match loader.load_texture(Path::new(path)) {
        Ok(texture) if texture.pixels.len() == (texture.width * texture.height * 4) as usize => {
            texture
        }
        Ok(_) => {
            log::warn!("Texture '{path}' has an inconsistent pixel buffer, using a placeholder");
            CpuTexture::placeholder(usage)
        }
        Err(err) => {
            log::warn!("Failed to load texture '{path}' ({err}), using a placeholder");
            CpuTexture::placeholder(usage)
        }
    }
}

fn upload_mesh(
    context: &RenderContext,
    name: &str,
    mut mesh: CpuMesh,
) -> Result<GpuMesh, RenderError> {
    if mesh.sub_meshes.is_empty() {
        mesh.sub_meshes.push(SubMesh {
            first_index: 0,
            index_count: mesh.indices.len() as u32,
            base_vertex: 0,
        });
    }
    let gpu = context.gpu();
    Ok(GpuMesh {
        vertex_buffer: VertexBuffer::create(gpu, &format!("{name} Vertices"), &mesh.vertices)?,
        index_buffer: IndexBuffer::create(gpu, &format!("{name} Indices"), &mesh.indices)?,
        sub_meshes: mesh.sub_meshes,
    })
}

/// Albedo is stored sRGB encoded; normals and generic data are linear.
fn texture_format(usage: TextureUsage) -> Format {
    match usage {
        TextureUsage::Albedo => Format::Rgba8UnormSrgb,
        TextureUsage::Normal | TextureUsage::Generic => Format::Rgba8Unorm,
    }
}

/// Uploads one layer per entry of `layers`; six layers make a cube map.
fn upload_texture(
    context: &mut RenderContext,
    name: &str,
    layers: &[CpuTexture],
    format: Format,
) -> Result<GpuTexture, RenderError> {
    let (width, height) = layers
        .first()
        .map(|l| (l.width, l.height))
        .ok_or_else(|| RenderError::Internal(format!("texture '{name}' has no layers")))?;
    let gpu = context.gpu();
    let resource = Resource::create(
        gpu,
        ResourceDesc::texture_array(
            name,
            width,
            height,
            layers.len() as u32,
            format,
            ResourceUsage::Sampled,
        ),
        ResourceState::PixelShaderResource,
    )?;
    for (layer, texture) in layers.iter().enumerate() {
        gpu.write_texture(resource.id(), layer as u32, &texture.pixels)?;
    }
    let kind = if layers.len() == 6 {
        TextureKind::Cube
    } else {
        TextureKind::Color
    };
    let table = context.register_texture(&ViewDesc::ShaderResource {
        resource: resource.id(),
        kind,
    })?;
    Ok(GpuTexture { resource, table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::test_device::test_context;

    struct PixelLoader;

    impl AssetLoader for PixelLoader {
        fn load_model(&self, path: &Path) -> Result<CpuMesh, AssetLoadError> {
            Err(format!("no model at {}", path.display()).into())
        }

        fn load_texture(&self, _path: &Path) -> Result<CpuTexture, AssetLoadError> {
            Ok(CpuTexture::placeholder(TextureUsage::Albedo))
        }
    }

    fn texture(name: &str, usage: TextureUsage) -> AssetData {
        AssetData::Texture {
            name: name.into(),
            path: format!("{name}.png"),
            usage,
        }
    }

    #[test]
    fn only_albedo_textures_are_srgb() {
        let (mut context, _gpu) = test_context(8, 8);
        let declared = AssetsData {
            assets: vec![
                texture("bricks", TextureUsage::Albedo),
                texture("bricks_normal", TextureUsage::Normal),
                texture("roughness", TextureUsage::Generic),
            ],
        };
        let mut cache = AssetCache::new();
        cache.load_all(&declared, &PixelLoader, &mut context).unwrap();

        let format = |name: &str| cache.texture(name).unwrap().resource().desc().format();
        assert_eq!(format("bricks"), Some(Format::Rgba8UnormSrgb));
        assert_eq!(format("bricks_normal"), Some(Format::Rgba8Unorm));
        assert_eq!(format("roughness"), Some(Format::Rgba8Unorm));
    }

    #[test]
    fn placeholders_match_their_usage() {
        let albedo = CpuTexture::placeholder(TextureUsage::Albedo);
        assert_eq!((albedo.width, albedo.height), (1, 1));
        assert_eq!(albedo.pixels, vec![255, 255, 255, 255]);

        let normal = CpuTexture::placeholder(TextureUsage::Normal);
        assert_eq!(normal.pixels, vec![128, 128, 255, 255]);

        let checker = CpuTexture::placeholder(TextureUsage::Generic);
        assert_eq!((checker.width, checker.height), (8, 8));
        assert_eq!(checker.pixels.len(), 8 * 8 * 4);
        assert_eq!(&checker.pixels[0..4], &[255, 0, 255, 255]);
        assert_eq!(&checker.pixels[4..8], &[0, 0, 0, 255]);
    }
}
