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

//! Reading WGSL files from the shader directory.
//!
//! WGSL has no include mechanism, so shared declarations (the frame constants,
//! the full-screen quad) live in their own files and are spliced in with a
//! `#include "file.wgsl"` line. Each file is spliced at most once per shader.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use stratum_core::renderer::ShaderError;

const INCLUDE_DIRECTIVE: &str = "#include";

/// Reads `file` from `directory` and expands its include lines.
///
/// # Errors
///
/// [`ShaderError::LoadError`] if the file or any file it includes cannot be
/// read, or if an include line is malformed.
pub fn load_shader_source(directory: &Path, file: &str) -> Result<String, ShaderError> {
    let mut seen = HashSet::new();
    let mut out = String::new();
    expand(directory, &directory.join(file), &mut seen, &mut out)?;
    Ok(out)
}

fn expand(
    directory: &Path,
    path: &Path,
    seen: &mut HashSet<PathBuf>,
    out: &mut String,
) -> Result<(), ShaderError> {
    if !seen.insert(path.to_path_buf()) {
        return Ok(());
    }
    let text = std::fs::read_to_string(path).map_err(|e| ShaderError::LoadError {
        path: path.display().to_string(),
        source_error: e.to_string(),
    })?;

    for line in text.lines() {
        match line.trim_start().strip_prefix(INCLUDE_DIRECTIVE) {
            Some(rest) => {
                let name = parse_include(rest).ok_or_else(|| ShaderError::LoadError {
                    path: path.display().to_string(),
                    source_error: format!("malformed include line: {line}"),
                })?;
                expand(directory, &directory.join(name), seen, out)?;
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn parse_include(rest: &str) -> Option<&str> {
    let name = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn includes_are_spliced_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("common.wgsl"), "struct Frame { x: f32 }").unwrap();
        fs::write(
            dir.path().join("pass.wgsl"),
            "#include \"common.wgsl\"\n#include \"common.wgsl\"\nfn vs_main() {}",
        )
        .unwrap();

        let source = load_shader_source(dir.path(), "pass.wgsl").unwrap();
        assert_eq!(source.matches("struct Frame").count(), 1);
        assert!(source.ends_with("fn vs_main() {}\n"));
    }

    #[test]
    fn include_cycles_terminate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.wgsl"), "#include \"b.wgsl\"\nfn a() {}").unwrap();
        fs::write(dir.path().join("b.wgsl"), "#include \"a.wgsl\"\nfn b() {}").unwrap();

        let source = load_shader_source(dir.path(), "a.wgsl").unwrap();
        assert!(source.contains("fn a()"));
        assert!(source.contains("fn b()"));
    }

    #[test]
    fn missing_files_report_their_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pass.wgsl"), "#include \"gone.wgsl\"").unwrap();

        match load_shader_source(dir.path(), "pass.wgsl") {
            Err(ShaderError::LoadError { path, .. }) => assert!(path.ends_with("gone.wgsl")),
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_include_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pass.wgsl"), "#include common.wgsl").unwrap();
        assert!(load_shader_source(dir.path(), "pass.wgsl").is_err());
    }
}
