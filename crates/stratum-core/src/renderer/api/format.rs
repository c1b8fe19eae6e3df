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

//! Texel formats understood by the render core.

use serde::{Deserialize, Serialize};

/// The texel format of a texture resource or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// 8-bit normalized RGBA, linear.
    Rgba8Unorm,
    /// 8-bit normalized RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit normalized BGRA, linear.
    Bgra8Unorm,
    /// 8-bit normalized BGRA, sRGB encoded.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA, the default HDR format.
    Rgba16Float,
    /// 8-bit normalized single channel.
    R8Unorm,
    /// 16-bit float single channel.
    R16Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl Format {
    /// Returns `true` for depth formats.
    pub fn is_depth(self) -> bool {
        matches!(self, Format::Depth32Float)
    }

    /// Returns `true` for sRGB-encoded formats.
    pub fn is_srgb(self) -> bool {
        matches!(self, Format::Rgba8UnormSrgb | Format::Bgra8UnormSrgb)
    }

    /// Size of one texel in bytes.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Format::R8Unorm => 1,
            Format::R16Float => 2,
            Format::Rgba8Unorm
            | Format::Rgba8UnormSrgb
            | Format::Bgra8Unorm
            | Format::Bgra8UnormSrgb
            | Format::Depth32Float => 4,
            Format::Rgba16Float => 8,
        }
    }
}
