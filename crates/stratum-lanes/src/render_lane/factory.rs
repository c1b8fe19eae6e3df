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

//! Name to constructor registry that turns configured pass lists into passes.

use super::mesh_lanes::{MeshPass, MeshPassKind};
use super::post_process_lanes::{PostProcessKind, PostProcessPass};
use super::shadow_pass_lane::ShadowPassLane;
use super::skybox_lane::SkyboxPass;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use stratum_core::config::RenderPassData;
use stratum_core::renderer::RenderPass;
use thiserror::Error;

/// Builds a pass from its configured wiring and the shader directory.
pub type PassConstructor = Box<dyn Fn(RenderPassData, &Path) -> Box<dyn RenderPass> + Send + Sync>;

/// Errors raised by the [`RenderPassFactory`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PassFactoryError {
    /// No constructor is registered under the configured name.
    #[error("Unknown render pass type: '{0}'")]
    UnknownPass(String),
}

/// Creates passes by name.
///
/// [`with_builtin_passes`](Self::with_builtin_passes) registers every pass the
/// engine ships; applications may register more, or replace a built-in one,
/// with [`register`](Self::register).
pub struct RenderPassFactory {
    constructors: HashMap<String, PassConstructor>,
}

impl fmt::Debug for RenderPassFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPassFactory")
            .field("registered", &self.registered_names())
            .finish()
    }
}

impl Default for RenderPassFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPassFactory {
    /// A factory with nothing registered.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A factory with the shadow, mesh, skybox, and full-screen passes registered.
    pub fn with_builtin_passes() -> Self {
        let mut factory = Self::new();
        factory.register("shadow_map", |data, dir| {
            Box::new(ShadowPassLane::new(data, dir.to_path_buf()))
        });
        factory.register("skybox", |data, dir| {
            Box::new(SkyboxPass::new(data, dir.to_path_buf()))
        });
        for kind in MeshPassKind::ALL {
            factory.register(kind.name(), move |data, dir| {
                Box::new(MeshPass::new(kind, data, dir.to_path_buf()))
            });
        }
        for kind in PostProcessKind::ALL {
            factory.register(kind.name(), move |data, dir| {
                Box::new(PostProcessPass::new(kind, data, dir.to_path_buf()))
            });
        }
        factory
    }

    /// Registers `constructor` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(RenderPassData, &Path) -> Box<dyn RenderPass> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .constructors
            .insert(name.clone(), Box::new(constructor))
            .is_some()
        {
            log::debug!("Render pass '{name}' re-registered");
        }
    }

    /// Whether a constructor is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Every registered name, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the pass `data.name` names.
    ///
    /// # Errors
    ///
    /// [`PassFactoryError::UnknownPass`] if nothing is registered under that name.
    pub fn create(
        &self,
        data: &RenderPassData,
        shader_directory: &Path,
    ) -> Result<Box<dyn RenderPass>, PassFactoryError> {
        let constructor = self
            .constructors
            .get(&data.name)
            .ok_or_else(|| PassFactoryError::UnknownPass(data.name.clone()))?;
        Ok(constructor(data.clone(), shader_directory))
    }

    /// Builds every pass of a list, in order.
    pub fn create_all(
        &self,
        passes: &[RenderPassData],
        shader_directory: &Path,
    ) -> Result<Vec<Box<dyn RenderPass>>, PassFactoryError> {
        passes
            .iter()
            .map(|data| self.create(data, shader_directory))
            .collect()
    }
}
