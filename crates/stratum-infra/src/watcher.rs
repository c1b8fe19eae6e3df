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

//! Watches the shader directory and raises a reload flag on change.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A file watcher that sets a shared flag whenever a `.wgsl` file under the
/// watched directory is created, modified, or removed.
///
/// Events are coalesced: any number of changes between two frames raise the
/// flag once. The consumer clears it with a swap. Watching stops when the
/// value is dropped.
pub struct ShaderWatcher {
    _watcher: RecommendedWatcher,
    flag: Arc<AtomicBool>,
}

impl std::fmt::Debug for ShaderWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderWatcher")
            .field("pending", &self.flag.load(Ordering::Relaxed))
            .finish()
    }
}

impl ShaderWatcher {
    /// Starts watching `dir` recursively. Changes are reported through `flag`.
    pub fn watch(dir: impl AsRef<Path>, flag: Arc<AtomicBool>) -> notify::Result<Self> {
        let dir = dir.as_ref();
        let sink = Arc::clone(&flag);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_shader_change(&event) => {
                    log::debug!("Shader change detected: {:?}", event.paths);
                    sink.store(true, Ordering::Release);
                }
                Ok(_) => {}
                Err(err) => log::warn!("Shader watcher error: {err}"),
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::Recursive)?;
        log::info!("Watching '{}' for shader changes", dir.display());
        Ok(Self {
            _watcher: watcher,
            flag,
        })
    }

    /// The flag this watcher raises.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Returns whether a change happened since the last call, and clears the flag.
    pub fn take_change(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}

fn is_shader_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.extension().is_some_and(|ext| ext == "wgsl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    #[test]
    fn only_wgsl_changes_count() {
        let shader = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("shaders/forward.wgsl"));
        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("shaders/notes.txt"));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("shaders/forward.wgsl"));

        assert!(is_shader_change(&shader));
        assert!(!is_shader_change(&other));
        assert!(!is_shader_change(&access));
    }

    #[test]
    fn writing_a_shader_raises_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let watcher = ShaderWatcher::watch(dir.path(), Arc::clone(&flag)).unwrap();

        std::fs::write(dir.path().join("final.wgsl"), "fn vs_main() {}").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !flag.load(Ordering::Acquire) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(watcher.take_change());
    }
}
