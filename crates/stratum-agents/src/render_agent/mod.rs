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

//! Acts as the agent for the rendering subsystem.
//!
//! It decides *which* passes run and in what order, keeps the per-frame
//! constants and the draw list current, and delegates the GPU command
//! recording to the passes in `stratum_lanes::render_lane`.

mod draw_list;
mod frame_constants;
mod renderer;

pub use draw_list::DrawList;
pub use frame_constants::frame_constants;
pub use renderer::{Renderer, RendererError};
