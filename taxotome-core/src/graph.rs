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

//! Logical definition graphs
//!
//! A `DefinitionGraph` is the rooted tree form of one concept's logical
//! definition: a definition root over necessary/sufficient sets, whose
//! members are concept references, existential restrictions, and role
//! groups. Stored as a flat vertex table with inline child lists.
//!
//! Equality between two definitions is structural isomorphism under root
//! correspondence, never pointer or ordering equality: sibling order carries
//! no meaning, so the new and old forms of a definition compare equal exactly
//! when their trees match label-for-label under some pairing of children.
//! This comparison is what keeps re-classification from rewriting semantics
//! whose content did not actually change.

use crate::Nid;
use smallvec::SmallVec;

/// Index of the definition root vertex in every graph.
pub const ROOT: u32 = 0;

/// Typical fan-out is small: a necessary set with a handful of members.
type ChildList = SmallVec<[u32; 4]>;

/// Meaning of one vertex in a definition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLabel {
    /// Root of every definition graph.
    DefinitionRoot,
    /// Conditions every instance of the concept satisfies.
    NecessarySet,
    /// Conditions sufficient to recognize an instance of the concept.
    SufficientSet,
    /// Conjunction of the child expressions.
    And,
    /// Reference to another concept.
    ConceptRef(Nid),
    /// Existential restriction over the given role; the filler expression is
    /// the vertex's single child.
    SomeRole(Nid),
    /// Grouping of relationships that belong together semantically.
    RoleGroup,
}

/// Rooted logical definition tree.
#[derive(Debug, Clone, Default)]
pub struct DefinitionGraph {
    labels: Vec<VertexLabel>,
    children: Vec<ChildList>,
}

impl DefinitionGraph {
    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label of vertex `v`.
    pub fn label(&self, v: u32) -> VertexLabel {
        self.labels[v as usize]
    }

    /// Child vertex indices of `v`.
    pub fn children(&self, v: u32) -> &[u32] {
        &self.children[v as usize]
    }

    /// Structural isomorphism under root correspondence.
    ///
    /// Two graphs are isomorphic when their roots carry the same label and
    /// the children of corresponding vertices can be paired off such that
    /// every pair is itself isomorphic. Sibling order is ignored.
    pub fn is_isomorphic(&self, other: &DefinitionGraph) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() && other.is_empty();
        }
        self.iso_at(ROOT, other, ROOT)
    }

    fn iso_at(&self, v: u32, other: &DefinitionGraph, w: u32) -> bool {
        if self.label(v) != other.label(w) {
            return false;
        }
        let mine = self.children(v);
        let theirs = other.children(w);
        if mine.len() != theirs.len() {
            return false;
        }
        let mut used = vec![false; theirs.len()];
        self.match_children(mine, 0, other, theirs, &mut used)
    }

    /// Backtracking multiset match of child subtrees. Fan-out is small in
    /// practice, so the worst case stays cheap.
    fn match_children(
        &self,
        mine: &[u32],
        at: usize,
        other: &DefinitionGraph,
        theirs: &[u32],
        used: &mut [bool],
    ) -> bool {
        if at == mine.len() {
            return true;
        }
        for (i, &w) in theirs.iter().enumerate() {
            if used[i] || !self.iso_at(mine[at], other, w) {
                continue;
            }
            used[i] = true;
            if self.match_children(mine, at + 1, other, theirs, used) {
                return true;
            }
            used[i] = false;
        }
        false
    }
}

/// Incremental constructor for a `DefinitionGraph`. The root vertex exists
/// from the start; children are attached to existing vertices.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: DefinitionGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            graph: DefinitionGraph {
                labels: vec![VertexLabel::DefinitionRoot],
                children: vec![ChildList::new()],
            },
        }
    }

    /// Append a vertex labelled `label` as a child of `parent`, returning the
    /// new vertex's index.
    pub fn add(&mut self, parent: u32, label: VertexLabel) -> u32 {
        let v = self.graph.labels.len() as u32;
        self.graph.labels.push(label);
        self.graph.children.push(ChildList::new());
        self.graph.children[parent as usize].push(v);
        v
    }

    pub fn build(self) -> DefinitionGraph {
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
