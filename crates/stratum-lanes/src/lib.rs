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

//! # Stratum Lanes
//!
//! The hot path of the renderer: every concrete [`RenderPass`] the engine ships,
//! the factory that builds them from the configured pass lists, and the file
//! loaders that feed the asset cache.
//!
//! [`RenderPass`]: stratum_core::renderer::RenderPass

#![warn(missing_docs)]

pub mod asset_lane;
pub mod render_lane;

pub use asset_lane::{
    AssetLoadError, AssetLoaderLane, FileAssetLoader, ObjLoaderLane, TextureLoaderLane,
};
pub use render_lane::{PassFactoryError, RenderPassFactory};
