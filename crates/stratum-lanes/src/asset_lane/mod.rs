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

//! CPU-side decoding of the model and image files the asset cache uploads.

mod file_loader;
mod obj_loader_lane;
mod texture_loader_lane;

pub use file_loader::FileAssetLoader;
pub use obj_loader_lane::ObjLoaderLane;
pub use texture_loader_lane::TextureLoaderLane;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or decoding an asset file.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    /// The file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The OBJ parser rejected the file.
    #[error("Failed to parse OBJ data: {0}")]
    Obj(#[from] tobj::LoadError),
    /// The OBJ file parsed but holds no geometry.
    #[error("No models found in OBJ data")]
    NoModels,
    /// The image decoder rejected the file.
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// A lane that decodes one kind of asset from the raw bytes of a file.
pub trait AssetLoaderLane<A> {
    /// Parses `bytes` into an asset.
    fn load(&self, bytes: &[u8]) -> Result<A, AssetLoadError>;
}
