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

use serde::{Deserialize, Serialize};

/// What a texture is sampled as, which decides its placeholder on load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureUsage {
    /// Base color. Falls back to opaque white.
    Albedo,
    /// Tangent-space normals. Falls back to a flat normal.
    Normal,
    /// Anything else. Falls back to a magenta/black checker.
    #[default]
    Generic,
}

/// One asset declaration, dispatched on its `"type"` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetData {
    /// A Wavefront OBJ model.
    Model {
        /// Key model instances refer to.
        name: String,
        /// File path.
        path: String,
    },
    /// A 2D image.
    Texture {
        /// Key model instances refer to.
        name: String,
        /// File path.
        path: String,
        /// Sampling role.
        #[serde(default)]
        usage: TextureUsage,
    },
    /// Six images forming a cube map, in `+X, -X, +Y, -Y, +Z, -Z` order.
    Cubemap {
        /// Key of the cube map.
        name: String,
        /// Face file paths.
        faces: [String; 6],
    },
}

impl AssetData {
    /// The asset key.
    pub fn name(&self) -> &str {
        match self {
            AssetData::Model { name, .. }
            | AssetData::Texture { name, .. }
            | AssetData::Cubemap { name, .. } => name,
        }
    }
}

/// All declared assets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsData {
    /// Declarations, loaded in order.
    pub assets: Vec<AssetData>,
}
