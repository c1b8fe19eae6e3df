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

/// Window and process settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowData {
    /// Window title.
    pub title: String,
    /// Initial client width in physical pixels.
    pub width: u32,
    /// Initial client height in physical pixels.
    pub height: u32,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    /// Run without a window on the recording backend.
    pub headless: bool,
    /// Number of frames rendered in headless mode.
    pub headless_frames: u32,
    /// Also write the log to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    /// Enable the graphics API validation layer.
    pub debug_layer: bool,
}

impl Default for WindowData {
    fn default() -> Self {
        Self {
            title: "Stratum".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            headless: false,
            headless_frames: 3,
            log_file: None,
            debug_layer: cfg!(debug_assertions),
        }
    }
}
