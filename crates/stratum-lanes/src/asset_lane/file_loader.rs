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

//! The filesystem-backed [`AssetLoader`] the renderer uses by default.

use super::{AssetLoadError, AssetLoaderLane, ObjLoaderLane, TextureLoaderLane};
use std::path::{Path, PathBuf};
use stratum_core::asset::{self, AssetLoader, CpuMesh, CpuTexture};

/// Reads asset files relative to a root directory and decodes them with the
/// OBJ and texture lanes.
#[derive(Debug, Clone, Default)]
pub struct FileAssetLoader {
    root: PathBuf,
    meshes: ObjLoaderLane,
    textures: TextureLoaderLane,
}

impl FileAssetLoader {
    /// Resolves relative asset paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// The directory relative paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, AssetLoadError> {
        let full_path = self.root.join(path);
        log::debug!("Reading asset '{}'", full_path.display());
        std::fs::read(&full_path).map_err(|source| AssetLoadError::Io {
            path: full_path,
            source,
        })
    }
}

impl AssetLoader for FileAssetLoader {
    fn load_model(&self, path: &Path) -> Result<CpuMesh, asset::AssetLoadError> {
        let bytes = self.read(path)?;
        Ok(self.meshes.load(&bytes)?)
    }

    fn load_texture(&self, path: &Path) -> Result<CpuTexture, asset::AssetLoadError> {
        let bytes = self.read(path)?;
        Ok(self.textures.load(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_against_the_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("models")).unwrap();
        std::fs::write(
            dir.path().join("models/tri.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();

        let loader = FileAssetLoader::new(dir.path());
        let mesh = loader.load_model(Path::new("models/tri.obj")).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.sub_meshes.len(), 1);
    }

    #[test]
    fn missing_files_report_the_full_path() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileAssetLoader::new(dir.path());

        let err = loader.load_texture(Path::new("missing.png")).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Failed to read"), "{message}");
        assert!(message.contains("missing.png"), "{message}");
    }
}
