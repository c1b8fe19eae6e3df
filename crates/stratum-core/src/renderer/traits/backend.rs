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

//! Defines the `GraphicsBackend` trait, the entry point of device creation.

use crate::renderer::error::RenderError;
use crate::renderer::traits::GraphicsDevice;
use std::sync::Arc;

/// The class of hardware behind an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// A dedicated GPU.
    Discrete,
    /// A GPU sharing memory with the CPU.
    Integrated,
    /// A virtualized GPU.
    Virtual,
    /// A software rasterizer (WARP, llvmpipe, ...).
    Software,
    /// Anything the backend could not classify.
    Unknown,
}

/// A physical adapter reported by [`GraphicsBackend::enumerate_adapters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Backend-specific position of the adapter in the enumeration.
    pub index: usize,
    /// Human-readable adapter name.
    pub name: String,
    /// Hardware class.
    pub kind: AdapterKind,
    /// Name of the native API behind the adapter.
    pub api: String,
    /// Dedicated video memory in bytes, zero when unknown.
    pub dedicated_video_memory: u64,
}

/// A native graphics API, driven step by step by [`Device::initialize`].
///
/// Each step is called exactly once and in declaration order.
///
/// [`Device::initialize`]: crate::renderer::Device::initialize
pub trait GraphicsBackend {
    /// Enables the API validation layer when `enabled` is `true`.
    fn enable_debug_layer(&mut self, enabled: bool) -> Result<(), RenderError>;

    /// Creates the API factory/instance.
    fn create_factory(&mut self) -> Result<(), RenderError>;

    /// Lists every physical adapter the factory can see.
    fn enumerate_adapters(&mut self) -> Result<Vec<AdapterInfo>, RenderError>;

    /// Creates the logical device on the selected adapter.
    fn create_device(
        &mut self,
        adapter: &AdapterInfo,
    ) -> Result<Arc<dyn GraphicsDevice>, RenderError>;
}

/// Picks the adapter to render with.
///
/// Software adapters are skipped. Among the rest, a discrete GPU wins over an
/// integrated one, which wins over virtual and unknown adapters. Ties go to
/// the adapter with more dedicated memory, then to the earlier one.
pub fn select_adapter(adapters: &[AdapterInfo]) -> Result<AdapterInfo, RenderError> {
    fn rank(kind: AdapterKind) -> u8 {
        match kind {
            AdapterKind::Discrete => 3,
            AdapterKind::Integrated => 2,
            AdapterKind::Virtual | AdapterKind::Unknown => 1,
            AdapterKind::Software => 0,
        }
    }

    let mut best: Option<&AdapterInfo> = None;
    for adapter in adapters {
        if adapter.kind == AdapterKind::Software {
            log::info!("Skipping software adapter \"{}\".", adapter.name);
            continue;
        }
        let better = match best {
            None => true,
            Some(current) => {
                (rank(adapter.kind), adapter.dedicated_video_memory)
                    > (rank(current.kind), current.dedicated_video_memory)
            }
        };
        if better {
            best = Some(adapter);
        }
    }

    best.cloned().ok_or(RenderError::NoSuitableAdapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(index: usize, kind: AdapterKind, memory: u64) -> AdapterInfo {
        AdapterInfo {
            index,
            name: format!("adapter-{index}"),
            kind,
            api: "test".into(),
            dedicated_video_memory: memory,
        }
    }

    #[test]
    fn discrete_adapter_is_preferred() {
        let adapters = [
            adapter(0, AdapterKind::Integrated, 0),
            adapter(1, AdapterKind::Discrete, 4 << 30),
            adapter(2, AdapterKind::Software, 0),
        ];
        assert_eq!(select_adapter(&adapters).unwrap().index, 1);
    }

    #[test]
    fn software_adapters_are_rejected() {
        let adapters = [adapter(0, AdapterKind::Software, 0)];
        assert!(matches!(
            select_adapter(&adapters),
            Err(RenderError::NoSuitableAdapter)
        ));
    }

    #[test]
    fn ties_go_to_larger_memory_then_first() {
        let adapters = [
            adapter(0, AdapterKind::Discrete, 2 << 30),
            adapter(1, AdapterKind::Discrete, 8 << 30),
            adapter(2, AdapterKind::Discrete, 8 << 30),
        ];
        assert_eq!(select_adapter(&adapters).unwrap().index, 1);
    }
}
