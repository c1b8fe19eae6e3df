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

//! A stable implementation of Kahn's algorithm for topological sorting.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError;

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The graph contains at least one cycle")
    }
}

impl std::error::Error for CycleError {}

/// Performs a stable topological sort on a generic directed graph.
///
/// Whenever several nodes are ready at the same time, the one that appeared
/// first in `nodes` is emitted first. An input that is already in a valid
/// order is therefore returned unchanged.
///
/// # Arguments
///
/// * `nodes`: An iterator over the unique nodes in the graph, in their preferred order.
/// * `edges`: An iterator over the directed edges, represented as `(parent, child)` tuples.
///
/// # Returns
///
/// * `Ok(Vec<T>)`: A vector of nodes in a valid topological order.
/// * `Err(CycleError)`: If the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError>
where
    T: Copy + Eq + Hash,
{
    let node_list: Vec<T> = nodes.into_iter().collect();
    if node_list.is_empty() {
        return Ok(Vec::new());
    }

    let position: HashMap<T, usize> = node_list
        .iter()
        .enumerate()
        .map(|(index, node)| (*node, index))
        .collect();

    let mut adjacency_list: Vec<Vec<usize>> = vec![Vec::new(); node_list.len()];
    let mut in_degree: Vec<usize> = vec![0; node_list.len()];

    // 1. Build adjacency list and in-degree counts from edges.
    for (parent, child) in edges {
        if let (Some(&p), Some(&c)) = (position.get(&parent), position.get(&child)) {
            adjacency_list[p].push(c);
            in_degree[c] += 1;
        }
    }

    // 2. Seed the ready set with every root node (in-degree of 0).
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    // 3. Always pop the earliest declared ready node.
    let mut sorted_list = Vec::with_capacity(node_list.len());
    while let Some(Reverse(parent)) = ready.pop() {
        sorted_list.push(node_list[parent]);
        for &child in &adjacency_list[parent] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    // 4. Check for cycles.
    if sorted_list.len() != node_list.len() {
        Err(CycleError)
    } else {
        Ok(sorted_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph_sorts_to_empty() {
        let sorted = topological_sort(Vec::<u32>::new(), Vec::new()).unwrap();
        assert!(sorted.is_empty());
    }

    #[test]
    fn valid_order_is_preserved() {
        let sorted = topological_sort([0, 1, 2, 3], [(0, 1), (1, 2), (0, 3)]).unwrap();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn out_of_order_consumer_is_moved_after_its_producer() {
        // Node 0 consumes what node 2 produces.
        let sorted = topological_sort([0, 1, 2], [(2, 0)]).unwrap();
        assert_eq!(sorted, vec![1, 2, 0]);
    }

    #[test]
    fn cycle_is_reported() {
        let result = topological_sort([0, 1, 2], [(0, 1), (1, 2), (2, 0)]);
        assert_eq!(result, Err(CycleError));
    }

    #[test]
    fn edges_to_unknown_nodes_are_ignored() {
        let sorted = topological_sort([5, 6], [(5, 6), (6, 42)]).unwrap();
        assert_eq!(sorted, vec![5, 6]);
    }
}
