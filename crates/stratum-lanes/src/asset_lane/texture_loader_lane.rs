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

//! Texture decoding.

use super::{AssetLoadError, AssetLoaderLane};
use stratum_core::asset::CpuTexture;

/// A lane dedicated to decoding image files into RGBA8 pixels on the CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureLoaderLane;

impl AssetLoaderLane<CpuTexture> for TextureLoaderLane {
    fn load(&self, bytes: &[u8]) -> Result<CpuTexture, AssetLoadError> {
        // Kept in sRGB space; the GPU texture is created with an sRGB format.
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(CpuTexture {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}
