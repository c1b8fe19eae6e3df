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

//! Defines a lane for loading OBJ mesh assets.

use super::{AssetLoadError, AssetLoaderLane};
use std::io::Cursor;
use stratum_core::asset::{CpuMesh, SubMesh};
use stratum_core::renderer::MeshVertex;

/// Normal used when the file carries none.
const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// Lane for loading OBJ mesh assets.
///
/// Every object of the file becomes one [`SubMesh`] of a single vertex and
/// index buffer pair. Faces are triangulated and the texture V axis is flipped
/// to a top-left origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjLoaderLane;

impl AssetLoaderLane<CpuMesh> for ObjLoaderLane {
    fn load(&self, bytes: &[u8]) -> Result<CpuMesh, AssetLoadError> {
        let (models, _materials) = tobj::load_obj_buf(
            &mut Cursor::new(bytes),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            // materials are configured as textures, not read from .mtl files
            |_| Ok(Default::default()),
        )?;

        // a comment-only file still yields one model with an empty mesh
        if models.iter().all(|model| model.mesh.indices.is_empty()) {
            return Err(AssetLoadError::NoModels);
        }

        let mut mesh = CpuMesh::default();
        for model in models.iter().filter(|model| !model.mesh.indices.is_empty()) {
            let source = &model.mesh;
            let base_vertex = mesh.vertices.len() as i32;
            let first_index = mesh.indices.len() as u32;

            for (i, position) in source.positions.chunks_exact(3).enumerate() {
                let normal = source
                    .normals
                    .get(i * 3..i * 3 + 3)
                    .map_or(DEFAULT_NORMAL, |n| [n[0], n[1], n[2]]);
                let uv = source
                    .texcoords
                    .get(i * 2..i * 2 + 2)
                    .map_or([0.0, 0.0], |t| [t[0], 1.0 - t[1]]);
                mesh.vertices.push(MeshVertex {
                    position: [position[0], position[1], position[2]],
                    normal,
                    uv,
                });
            }
            mesh.indices.extend_from_slice(&source.indices);
            mesh.sub_meshes.push(SubMesh {
                first_index,
                index_count: source.indices.len() as u32,
                base_vertex,
            });
            log::trace!(
                "OBJ object '{}': {} indices from vertex {base_vertex}",
                model.name,
                source.indices.len()
            );
        }

        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_TRIANGLES: &str = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
o second
v 0 0 1
v 1 0 1
v 0 1 1
v 1 1 1
f 4 5 7 6
";

    #[test]
    fn each_object_becomes_a_sub_mesh() {
        let mesh = ObjLoaderLane.load(TWO_TRIANGLES.as_bytes()).unwrap();

        assert_eq!(mesh.sub_meshes.len(), 2);
        assert_eq!(
            mesh.sub_meshes[0],
            SubMesh {
                first_index: 0,
                index_count: 3,
                base_vertex: 0
            }
        );
        // the quad is triangulated
        assert_eq!(mesh.sub_meshes[1].first_index, 3);
        assert_eq!(mesh.sub_meshes[1].index_count, 6);
        assert_eq!(mesh.sub_meshes[1].base_vertex, 3);
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.indices.len(), 9);
    }

    #[test]
    fn missing_attributes_get_defaults_and_v_is_flipped() {
        let mesh = ObjLoaderLane.load(TWO_TRIANGLES.as_bytes()).unwrap();

        let top = mesh.vertices[2];
        assert_relative_eq!(top.uv[1], 0.0);
        assert_eq!(top.normal, [0.0, 0.0, 1.0]);

        let untextured = mesh.vertices[3];
        assert_eq!(untextured.uv, [0.0, 0.0]);
        assert_eq!(untextured.normal, DEFAULT_NORMAL);
    }

    #[test]
    fn empty_files_are_rejected() {
        let err = ObjLoaderLane.load(b"# nothing here\n").unwrap_err();
        assert!(matches!(err, AssetLoadError::NoModels));

        let err = ObjLoaderLane.load(b"o lonely\nv 0 0 0\n").unwrap_err();
        assert!(matches!(err, AssetLoadError::NoModels));
    }

    #[test]
    fn objects_without_faces_add_no_sub_mesh() {
        let source = format!("o empty\n{TWO_TRIANGLES}");
        let mesh = ObjLoaderLane.load(source.as_bytes()).unwrap();

        assert_eq!(mesh.sub_meshes.len(), 2);
        assert!(mesh.sub_meshes.iter().all(|sub_mesh| sub_mesh.index_count > 0));
    }
}
