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

//! In-memory versioned store
//!
//! Reference implementation of `VersionedStore`. All tables live behind one
//! reader-writer lock: commits take the write side, so a reader observes
//! either none or all of a transaction's writes. Seeding methods
//! (`add_concept`, `add_semantic_version`) write directly, outside any
//! transaction, and exist for loading fixtures and prior history.

use crate::semantic::{ConceptEntity, SemanticEntity, SemanticField, SemanticVersion};
use crate::stamp::{Stamp, Status, ViewCoordinate};
use crate::store::{StoreError, VersionedStore};
use crate::transaction::{PendingWrite, Transaction};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use taxotome_core::{Nid, PatternId};
use tracing::debug;

#[derive(Default)]
struct Tables {
    concepts: AHashMap<Nid, ConceptEntity>,
    semantics: AHashMap<u128, SemanticEntity>,
    /// Pattern -> semantic ids in insertion order.
    pattern_index: AHashMap<PatternId, Vec<u128>>,
    /// (referenced concept, pattern) -> semantic ids.
    reference_index: AHashMap<(Nid, PatternId), Vec<u128>>,
}

impl Tables {
    fn insert_semantic(
        &mut self,
        id: u128,
        pattern: PatternId,
        referenced: Nid,
        field: SemanticField,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        if self.semantics.contains_key(&id) {
            return Err(StoreError::DuplicateCreate(id));
        }
        self.semantics.insert(
            id,
            SemanticEntity {
                id,
                pattern,
                referenced,
                versions: vec![SemanticVersion { stamp, field }],
            },
        );
        self.pattern_index.entry(pattern).or_default().push(id);
        self.reference_index
            .entry((referenced, pattern))
            .or_default()
            .push(id);
        Ok(())
    }

    fn append_version(
        &mut self,
        id: u128,
        field: SemanticField,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        let entity = self
            .semantics
            .get_mut(&id)
            .ok_or(StoreError::UnknownSemantic(id))?;
        entity.versions.push(SemanticVersion { stamp, field });
        Ok(())
    }
}

/// Map-backed `VersionedStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a version (status only) to a concept, creating it on first use.
    pub fn add_concept(&self, nid: Nid, stamp: Stamp) {
        let mut tables = self.tables.write();
        tables
            .concepts
            .entry(nid)
            .or_insert_with(|| ConceptEntity { nid, stamps: Vec::new() })
            .stamps
            .push(stamp);
    }

    /// Seed a semantic version directly, creating the semantic if needed.
    /// Unlike transactional writes this takes effect immediately.
    pub fn add_semantic_version(
        &self,
        id: u128,
        pattern: PatternId,
        referenced: Nid,
        field: SemanticField,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.semantics.contains_key(&id) {
            tables.append_version(id, field, stamp)
        } else {
            tables.insert_semantic(id, pattern, referenced, field, stamp)
        }
    }

    /// Number of semantics of `pattern`.
    pub fn pattern_len(&self, pattern: PatternId) -> usize {
        self.tables
            .read()
            .pattern_index
            .get(&pattern)
            .map_or(0, Vec::len)
    }
}

impl VersionedStore for MemoryStore {
    fn for_each_semantic(&self, pattern: PatternId, f: &mut dyn FnMut(&SemanticEntity)) {
        let tables = self.tables.read();
        let Some(ids) = tables.pattern_index.get(&pattern) else {
            return;
        };
        for id in ids {
            if let Some(entity) = tables.semantics.get(id) {
                f(entity);
            }
        }
    }

    fn for_each_semantic_parallel(&self, pattern: PatternId, f: &(dyn Fn(&SemanticEntity) + Sync)) {
        let ids: Vec<u128> = {
            let tables = self.tables.read();
            match tables.pattern_index.get(&pattern) {
                Some(ids) => ids.clone(),
                None => return,
            }
        };
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        let chunk = ids.len().div_ceil(workers).max(1);
        std::thread::scope(|scope| {
            for slice in ids.chunks(chunk) {
                scope.spawn(move || {
                    let tables = self.tables.read();
                    for id in slice {
                        if let Some(entity) = tables.semantics.get(id) {
                            f(entity);
                        }
                    }
                });
            }
        });
    }

    fn semantic(&self, id: u128) -> Option<SemanticEntity> {
        self.tables.read().semantics.get(&id).cloned()
    }

    fn semantics_referencing(&self, referenced: Nid, pattern: PatternId) -> Vec<u128> {
        self.tables
            .read()
            .reference_index
            .get(&(referenced, pattern))
            .cloned()
            .unwrap_or_default()
    }

    fn concept_status(&self, nid: Nid, coordinate: &ViewCoordinate) -> Option<Status> {
        self.tables
            .read()
            .concepts
            .get(&nid)
            .and_then(|c| c.status(coordinate))
    }

    fn commit(&self, txn: &Transaction) -> Result<DateTime<Utc>, StoreError> {
        if !txn.mark_committed() {
            return Err(StoreError::AlreadyCommitted);
        }
        let writes = txn.take_writes();
        let commit_time = Utc::now();
        let stamp = Stamp { time: commit_time, ..txn.stamp() };

        let mut tables = self.tables.write();

        // Validate before applying anything: a failed commit must leave the
        // store exactly as it was.
        for write in &writes {
            match write {
                PendingWrite::CreateSemantic { id, .. } => {
                    if tables.semantics.contains_key(id) {
                        return Err(StoreError::DuplicateCreate(*id));
                    }
                }
                PendingWrite::UpdateField { id, .. } => {
                    if !tables.semantics.contains_key(id) {
                        return Err(StoreError::UnknownSemantic(*id));
                    }
                }
            }
        }
        for write in writes {
            match write {
                PendingWrite::CreateSemantic { id, pattern, referenced, field } => {
                    tables.insert_semantic(id, pattern, referenced, field, stamp)?;
                }
                PendingWrite::UpdateField { id, field } => {
                    tables.append_version(id, field, stamp)?;
                }
            }
        }
        debug!(components = txn.components(), %commit_time, "transaction committed");
        Ok(commit_time)
    }
}
