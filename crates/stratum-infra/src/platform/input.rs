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

//! Translation from `winit` input events to the engine's keys.

use stratum_core::platform::Key;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A change of key or cursor state extracted from a window event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputChange {
    /// A key the engine polls went down.
    KeyPressed(Key),
    /// A key the engine polls went up.
    KeyReleased(Key),
    /// The cursor moved to a physical position.
    CursorMoved(f64, f64),
    /// The cursor left the window.
    CursorLeft,
}

/// Maps a physical key to an engine key, if the engine polls it.
pub fn translate_key(key: PhysicalKey) -> Option<Key> {
    match key {
        PhysicalKey::Code(KeyCode::Escape) => Some(Key::Escape),
        PhysicalKey::Code(KeyCode::F5) => Some(Key::F5),
        PhysicalKey::Code(KeyCode::Tab) => Some(Key::Tab),
        _ => None,
    }
}

/// Extracts the input change carried by `event`, if any.
pub fn translate_window_event(event: &WindowEvent) -> Option<InputChange> {
    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            let key = translate_key(event.physical_key)?;
            Some(match event.state {
                ElementState::Pressed => InputChange::KeyPressed(key),
                ElementState::Released => InputChange::KeyReleased(key),
            })
        }
        WindowEvent::CursorMoved { position, .. } => {
            Some(InputChange::CursorMoved(position.x, position.y))
        }
        WindowEvent::CursorLeft { .. } => Some(InputChange::CursorLeft),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polled_keys_are_translated() {
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::F5)), Some(Key::F5));
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::Tab)), Some(Key::Tab));
        assert_eq!(
            translate_key(PhysicalKey::Code(KeyCode::Escape)),
            Some(Key::Escape)
        );
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::KeyW)), None);
    }

    #[test]
    fn unrelated_events_carry_no_input() {
        assert_eq!(translate_window_event(&WindowEvent::Focused(true)), None);
    }
}
