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

//! Concrete implementations of the contracts declared in `stratum-core`.
//!
//! - [`graphics::wgpu`]: a [`GraphicsBackend`](stratum_core::renderer::GraphicsBackend)
//!   and [`GraphicsDevice`](stratum_core::renderer::GraphicsDevice) on top of `wgpu`.
//! - [`graphics::headless`]: a recording device with no GPU, for headless runs and tests.
//! - [`platform`]: the `winit` window.
//! - [`watcher`]: the `notify`-based shader directory watcher.
//! - [`logging`]: `env_logger` setup.

#![warn(missing_docs)]

pub mod graphics;
pub mod logging;
#[cfg(feature = "platform")]
pub mod platform;
pub mod watcher;

pub use graphics::headless::{HeadlessBackend, HeadlessDevice};
#[cfg(feature = "graphics")]
pub use graphics::wgpu::{WgpuBackend, WgpuDevice};
#[cfg(feature = "platform")]
pub use platform::window::{WinitWindow, WinitWindowBuilder};
pub use watcher::ShaderWatcher;
