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

//! Load-time ordering of a configured pass list.
//!
//! Every writer of a name runs before every reader of it, and writers of the
//! same name keep their declared order, so a pass drawing over a texture
//! without clearing it still lands before the texture is read. The
//! context-owned `depth` and `shadow_map` textures always exist, so reading
//! them never requires a producer. The result is a stable topological order:
//! a list that is already valid comes back unchanged.

use crate::config::RenderPassData;
use crate::graph::topological_sort;
use crate::renderer::context::{DEPTH_INPUT, SHADOW_MAP_INPUT};
use std::fmt;

/// Why a pass list cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassGraphError {
    /// A pass reads a texture nothing writes.
    MissingProducer {
        /// The reading pass.
        pass: String,
        /// The unproduced texture.
        input: String,
    },
    /// The passes depend on each other in a loop.
    Cycle {
        /// Passes left unordered, in declaration order.
        passes: Vec<String>,
    },
}

impl fmt::Display for PassGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassGraphError::MissingProducer { pass, input } => {
                write!(f, "Pass '{pass}' reads '{input}', but no pass writes it")
            }
            PassGraphError::Cycle { passes } => {
                write!(f, "Pass dependencies form a cycle among: {}", passes.join(", "))
            }
        }
    }
}

impl std::error::Error for PassGraphError {}

fn is_context_owned(name: &str) -> bool {
    name == DEPTH_INPUT || name == SHADOW_MAP_INPUT
}

/// Returns the `(before, after)` edges of `passes`, as list indices.
///
/// Writers of one name are chained in declared order, and each writer of an
/// input precedes the pass reading it.
pub fn pass_dependencies(passes: &[RenderPassData]) -> Result<Vec<(usize, usize)>, PassGraphError> {
    let mut edges = Vec::new();
    for (index, pass) in passes.iter().enumerate() {
        for output in &pass.output {
            let previous = (0..index).rev().find(|i| passes[*i].output.contains(output));
            if let Some(previous) = previous {
                edges.push((previous, index));
            }
        }
    }

    for (reader, pass) in passes.iter().enumerate() {
        for input in &pass.input {
            let mut produced = false;
            for (producer, candidate) in passes.iter().enumerate() {
                if producer != reader && candidate.output.contains(input) {
                    edges.push((producer, reader));
                    produced = true;
                }
            }
            if !produced && !is_context_owned(input) {
                return Err(PassGraphError::MissingProducer {
                    pass: pass.name.clone(),
                    input: input.clone(),
                });
            }
        }
    }

    edges.sort_unstable();
    edges.dedup();
    Ok(edges)
}

/// Orders `passes` so every producer runs before its readers.
pub fn sort_passes(passes: Vec<RenderPassData>) -> Result<Vec<RenderPassData>, PassGraphError> {
    let edges = pass_dependencies(&passes)?;
    let order = topological_sort(0..passes.len(), edges).map_err(|_| {
        let emitted = peel_acyclic(&passes);
        PassGraphError::Cycle {
            passes: passes
                .iter()
                .enumerate()
                .filter(|(index, _)| !emitted.contains(index))
                .map(|(_, pass)| pass.name.clone())
                .collect(),
        }
    })?;

    if order.iter().enumerate().any(|(i, index)| i != *index) {
        log::info!("Reordered render passes to satisfy their dependencies");
    }
    let mut slots: Vec<Option<RenderPassData>> = passes.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

/// Indices Kahn's algorithm can emit before it stalls on a cycle.
fn peel_acyclic(passes: &[RenderPassData]) -> Vec<usize> {
    let edges = pass_dependencies(passes).unwrap_or_default();
    let mut in_degree = vec![0usize; passes.len()];
    for (_, reader) in &edges {
        in_degree[*reader] += 1;
    }
    let mut ready: Vec<usize> = (0..passes.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut emitted = Vec::new();
    while let Some(node) = ready.pop() {
        emitted.push(node);
        for (producer, reader) in &edges {
            if *producer == node {
                in_degree[*reader] -= 1;
                if in_degree[*reader] == 0 {
                    ready.push(*reader);
                }
            }
        }
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_deferred_passes, default_forward_passes};

    fn names(passes: &[RenderPassData]) -> Vec<&str> {
        passes.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn shipped_lists_are_already_ordered() {
        for list in [default_forward_passes(), default_deferred_passes()] {
            let before: Vec<String> = list.iter().map(|p| p.name.clone()).collect();
            let sorted = sort_passes(list).unwrap();
            assert_eq!(names(&sorted), before);
        }
    }

    #[test]
    fn producers_are_moved_before_readers() {
        let passes = vec![
            RenderPassData::new("final").with_inputs(["ldr"]),
            RenderPassData::new("tonemapping")
                .with_inputs(["hdr"])
                .with_outputs(["ldr"]),
            RenderPassData::new("forward").with_outputs(["hdr"]),
        ];
        let sorted = sort_passes(passes).unwrap();
        assert_eq!(names(&sorted), ["forward", "tonemapping", "final"]);
    }

    #[test]
    fn context_owned_inputs_need_no_producer() {
        let passes = vec![RenderPassData::new("ssao")
            .with_inputs(["depth", "shadow_map"])
            .with_outputs(["ao"])];
        assert!(sort_passes(passes).is_ok());
    }

    #[test]
    fn missing_producer_is_reported() {
        let passes = vec![RenderPassData::new("final").with_inputs(["nowhere"])];
        assert_eq!(
            sort_passes(passes).unwrap_err(),
            PassGraphError::MissingProducer {
                pass: "final".into(),
                input: "nowhere".into()
            }
        );
    }

    #[test]
    fn cycles_are_reported_with_their_members() {
        let passes = vec![
            RenderPassData::new("source").with_outputs(["s"]),
            RenderPassData::new("a").with_inputs(["s", "b_out"]).with_outputs(["a_out"]),
            RenderPassData::new("b").with_inputs(["a_out"]).with_outputs(["b_out"]),
        ];
        match sort_passes(passes).unwrap_err() {
            PassGraphError::Cycle { passes } => assert_eq!(passes, ["a", "b"]),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn every_writer_of_an_input_precedes_its_reader() {
        let passes = vec![
            RenderPassData::new("forward").with_outputs(["hdr"]),
            RenderPassData::new("skybox").with_outputs(["hdr"]).without_clear(),
            RenderPassData::new("bloom").with_inputs(["hdr"]).with_outputs(["bright"]),
        ];
        let edges = pass_dependencies(&passes).unwrap();
        assert_eq!(edges, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn overlay_writers_are_moved_before_the_reader() {
        let passes = vec![
            RenderPassData::new("bloom_extract")
                .with_inputs(["hdr"])
                .with_outputs(["bright"]),
            RenderPassData::new("forward").with_outputs(["hdr"]),
            RenderPassData::new("skybox").with_outputs(["hdr"]).without_clear(),
        ];
        let sorted = sort_passes(passes).unwrap();
        assert_eq!(names(&sorted), ["forward", "skybox", "bloom_extract"]);
    }

    #[test]
    fn writers_of_one_name_keep_their_declared_order() {
        let passes = vec![
            RenderPassData::new("final").with_inputs(["hdr"]),
            RenderPassData::new("skybox").with_outputs(["hdr"]).without_clear(),
            RenderPassData::new("forward").with_outputs(["hdr"]),
        ];
        let sorted = sort_passes(passes).unwrap();
        assert_eq!(names(&sorted), ["skybox", "forward", "final"]);
    }
}
