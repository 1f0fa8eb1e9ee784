// Copyright 2025 Taxotome Contributors
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

//! Hierarchy traversal
//!
//! Breadth-first walks over the inferred parent/child hierarchy, driving an
//! arbitrary set of visitors in one pass. Two disciplines are provided:
//! nearest-first (plain BFS, each node visited at its shortest distance from
//! the start) and furthest-first (a node is visited only once all of its
//! parents have been, at its longest distance).

use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use taxotome_core::Nid;

/// Parent/child adjacency as the traversals need it.
pub trait HierarchyProvider {
    fn parents(&self, nid: Nid) -> Vec<Nid>;
    fn children(&self, nid: Nid) -> Vec<Nid>;
}

/// Callback invoked once per visited node with the node's level.
pub trait GraphVisitor {
    fn visit(&mut self, nid: Nid, level: u32);
}

/// In-memory adjacency built from inferred navigation results.
#[derive(Debug, Default)]
pub struct NavigationGraph {
    parents: AHashMap<Nid, Vec<Nid>>,
    children: AHashMap<Nid, Vec<Nid>>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, parent: Nid, child: Nid) {
        self.parents.entry(child).or_default().push(parent);
        self.children.entry(parent).or_default().push(child);
    }

    pub fn node_count(&self) -> usize {
        let mut nodes: AHashSet<Nid> = self.parents.keys().copied().collect();
        nodes.extend(self.children.keys());
        nodes.len()
    }

    /// Build the adjacency from a classified orchestrator's direct-parent
    /// answers.
    pub fn from_orchestrator(
        orchestrator: &crate::orchestrator::ClassificationOrchestrator,
    ) -> crate::Result<Self> {
        let mut graph = NavigationGraph::new();
        for nid in orchestrator.concept_set()? {
            if let Some(parents) = orchestrator.parents(nid)? {
                for parent in parents {
                    graph.add_edge(parent, nid);
                }
            }
        }
        Ok(graph)
    }
}

impl HierarchyProvider for NavigationGraph {
    fn parents(&self, nid: Nid) -> Vec<Nid> {
        self.parents.get(&nid).cloned().unwrap_or_default()
    }

    fn children(&self, nid: Nid) -> Vec<Nid> {
        self.children.get(&nid).cloned().unwrap_or_default()
    }
}

/// Nearest-first walk from `start` over child edges. Every reachable node is
/// visited exactly once, at its shortest distance from `start`.
///
/// When a node has several parents at different depths, the shortest path
/// wins; a visitor deriving per-node statistics from these levels sees the
/// minimum, not the maximum, path length.
pub fn breadth_first_nearest(
    hierarchy: &dyn HierarchyProvider,
    start: Nid,
    visitors: &mut [&mut dyn GraphVisitor],
) {
    let mut seen: AHashSet<Nid> = AHashSet::new();
    let mut queue: VecDeque<(Nid, u32)> = VecDeque::new();
    seen.insert(start);
    queue.push_back((start, 0));
    while let Some((nid, level)) = queue.pop_front() {
        for visitor in visitors.iter_mut() {
            visitor.visit(nid, level);
        }
        for child in hierarchy.children(nid) {
            if seen.insert(child) {
                queue.push_back((child, level + 1));
            }
        }
    }
}

/// Furthest-first walk from `start` over child edges. A node is visited only
/// once every one of its parents has been visited, at one more than the
/// deepest parent level. Nodes with a parent outside the walk (a path that
/// bypasses `start`) are never visited.
pub fn breadth_first_furthest(
    hierarchy: &dyn HierarchyProvider,
    start: Nid,
    visitors: &mut [&mut dyn GraphVisitor],
) {
    let mut levels: AHashMap<Nid, u32> = AHashMap::new();
    let mut queue: VecDeque<Nid> = VecDeque::new();
    levels.insert(start, 0);
    for visitor in visitors.iter_mut() {
        visitor.visit(start, 0);
    }
    queue.push_back(start);
    while let Some(nid) = queue.pop_front() {
        for child in hierarchy.children(nid) {
            if levels.contains_key(&child) {
                continue;
            }
            let parents = hierarchy.parents(child);
            let level = parents
                .iter()
                .try_fold(0u32, |deepest, p| levels.get(p).map(|&l| deepest.max(l + 1)));
            // `None` means a parent is not yet (or never) visited; the
            // child is reconsidered when its last parent is dequeued.
            if let Some(level) = level {
                levels.insert(child, level);
                for visitor in visitors.iter_mut() {
                    visitor.visit(child, level);
                }
                queue.push_back(child);
            }
        }
    }
}

/// Visitor computing, for every node seen by a furthest-first walk, the pair
/// of shortest and longest path lengths from the start.
///
/// The maximum comes from the walk's own levels. The minimum is derived from
/// the parents' minima as each node is visited, which the furthest-first
/// order makes safe: all parents are finalized before the node arrives.
pub struct LevelStatsVisitor<'a> {
    hierarchy: &'a dyn HierarchyProvider,
    stats: AHashMap<Nid, (u32, u32)>,
}

impl<'a> LevelStatsVisitor<'a> {
    pub fn new(hierarchy: &'a dyn HierarchyProvider) -> Self {
        LevelStatsVisitor {
            hierarchy,
            stats: AHashMap::new(),
        }
    }

    /// `(shortest, longest)` path length for `nid`, if it was visited.
    pub fn levels(&self, nid: Nid) -> Option<(u32, u32)> {
        self.stats.get(&nid).copied()
    }

    pub fn into_stats(self) -> AHashMap<Nid, (u32, u32)> {
        self.stats
    }
}

impl GraphVisitor for LevelStatsVisitor<'_> {
    fn visit(&mut self, nid: Nid, level: u32) {
        let shortest = self
            .hierarchy
            .parents(nid)
            .iter()
            .filter_map(|p| self.stats.get(p).map(|&(min, _)| min + 1))
            .min()
            .unwrap_or(0);
        self.stats.insert(nid, (shortest, level));
    }
}
