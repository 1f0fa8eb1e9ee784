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

//! Versioned entities
//!
//! Concepts and semantics are append-only version lists. A semantic belongs
//! to one pattern and references one concept; its single field holds either a
//! logical definition graph or a parent/child navigation pair. New semantics
//! get a deterministic, content-addressed identifier derived from the
//! (pattern, referenced concept) pair, so independent runs that create "the
//! same" semantic agree on its identity.

use crate::stamp::{Stamp, Status, ViewCoordinate};
use std::collections::BTreeSet;
use taxotome_core::{DefinitionGraph, Nid, PatternId};

/// The single field value of a semantic version.
#[derive(Debug, Clone)]
pub enum SemanticField {
    /// A stated or inferred logical definition.
    Definition(DefinitionGraph),
    /// Direct parent and child concept sets from classification.
    Navigation {
        parents: BTreeSet<Nid>,
        children: BTreeSet<Nid>,
    },
}

/// One version of a semantic: the field value under a stamp.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    pub stamp: Stamp,
    pub field: SemanticField,
}

/// A semantic entity with its full version history.
#[derive(Debug, Clone)]
pub struct SemanticEntity {
    pub id: u128,
    pub pattern: PatternId,
    pub referenced: Nid,
    pub versions: Vec<SemanticVersion>,
}

impl SemanticEntity {
    /// Latest version visible under `coordinate`, if any.
    pub fn latest(&self, coordinate: &ViewCoordinate) -> Option<&SemanticVersion> {
        self.versions
            .iter()
            .filter(|v| coordinate.includes(v.stamp.time))
            .max_by_key(|v| v.stamp.time)
    }
}

/// A concept entity: identity plus a status-bearing stamp history.
#[derive(Debug, Clone)]
pub struct ConceptEntity {
    pub nid: Nid,
    pub stamps: Vec<Stamp>,
}

impl ConceptEntity {
    /// Status of the latest version visible under `coordinate`.
    pub fn status(&self, coordinate: &ViewCoordinate) -> Option<Status> {
        self.stamps
            .iter()
            .filter(|s| coordinate.includes(s.time))
            .max_by_key(|s| s.time)
            .map(|s| s.status)
    }
}

/// Deterministic semantic identifier for the semantic of `pattern` that
/// references `referenced`. Content-addressed: blake3 of the two ids,
/// truncated to 128 bits.
pub fn derive_semantic_id(pattern: PatternId, referenced: Nid) -> u128 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&pattern.to_le_bytes());
    hasher.update(&referenced.to_le_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    u128::from_le_bytes(bytes)
}
