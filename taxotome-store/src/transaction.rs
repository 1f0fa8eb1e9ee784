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

//! Single-commit transactions
//!
//! A transaction accumulates writes from many worker threads and lands them
//! in one atomic commit. Registration (`add_component`, `create_semantic`,
//! `update_field`) is safe under concurrent access; `commit` on the store is
//! the single serialized step. A transaction dropped without commit leaves no
//! trace in the store.

use crate::semantic::SemanticField;
use crate::stamp::Stamp;
use dashmap::DashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use taxotome_core::{Nid, PatternId};

/// A write staged in a transaction.
#[derive(Debug, Clone)]
pub enum PendingWrite {
    /// Create a new semantic with an initial version.
    CreateSemantic {
        id: u128,
        pattern: PatternId,
        referenced: Nid,
        field: SemanticField,
    },
    /// Append a new version to an existing semantic.
    UpdateField { id: u128, field: SemanticField },
}

/// One unit of history: all writes of a run under one provenance stamp.
pub struct Transaction {
    stamp: Stamp,
    components: DashSet<u128>,
    writes: Mutex<Vec<PendingWrite>>,
    staged: AtomicUsize,
    committed: AtomicBool,
}

impl Transaction {
    /// Open a transaction that will write under `stamp`. The stamp's time is
    /// replaced by the commit instant when the transaction lands.
    pub fn new(stamp: Stamp) -> Self {
        Transaction {
            stamp,
            components: DashSet::new(),
            writes: Mutex::new(Vec::new()),
            staged: AtomicUsize::new(0),
            committed: AtomicBool::new(false),
        }
    }

    /// The run's provenance stamp.
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Register a component as touched by this transaction.
    pub fn add_component(&self, id: u128) {
        self.components.insert(id);
    }

    pub fn components(&self) -> usize {
        self.components.len()
    }

    /// Stage creation of a new semantic.
    pub fn create_semantic(
        &self,
        id: u128,
        pattern: PatternId,
        referenced: Nid,
        field: SemanticField,
    ) {
        self.add_component(id);
        self.writes.lock().push(PendingWrite::CreateSemantic {
            id,
            pattern,
            referenced,
            field,
        });
        self.staged.fetch_add(1, Ordering::Relaxed);
    }

    /// Stage a new version of an existing semantic's field.
    pub fn update_field(&self, id: u128, field: SemanticField) {
        self.add_component(id);
        self.writes.lock().push(PendingWrite::UpdateField { id, field });
        self.staged.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of writes staged so far. Progress counter for long runs.
    pub fn staged(&self) -> usize {
        self.staged.load(Ordering::Relaxed)
    }

    /// Mark the transaction committed. Returns `false` if it already was.
    /// Store-internal.
    pub(crate) fn mark_committed(&self) -> bool {
        !self.committed.swap(true, Ordering::SeqCst)
    }

    /// Drain the staged writes for commit. Store-internal.
    pub(crate) fn take_writes(&self) -> Vec<PendingWrite> {
        std::mem::take(&mut *self.writes.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::Status;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn stamp() -> Stamp {
        Stamp {
            status: Status::Active,
            time: Utc::now(),
            author: 1,
            module: 2,
            path: 3,
        }
    }

    #[test]
    fn concurrent_staging_loses_nothing() {
        let txn = Transaction::new(stamp());
        std::thread::scope(|scope| {
            for t in 0..4u128 {
                let txn = &txn;
                scope.spawn(move || {
                    for i in 0..100u128 {
                        txn.update_field(
                            t * 1000 + i,
                            SemanticField::Navigation {
                                parents: BTreeSet::new(),
                                children: BTreeSet::new(),
                            },
                        );
                    }
                });
            }
        });
        assert_eq!(txn.staged(), 400);
        assert_eq!(txn.components(), 400);
        assert_eq!(txn.take_writes().len(), 400);
    }
}
