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

//! Store trait surface
//!
//! `VersionedStore` is everything the classification pipeline needs from the
//! knowledge store: pattern enumeration (sequential or parallel), latest
//! version resolution, reference lookup, and atomic commit of a staged
//! transaction. `ViewCalculator` binds a store to one view coordinate.

use crate::semantic::{SemanticEntity, SemanticField};
use crate::stamp::{Status, ViewCoordinate};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taxotome_core::{Nid, PatternId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown semantic: {0:#034x}")]
    UnknownSemantic(u128),

    #[error("semantic already exists: {0:#034x}")]
    DuplicateCreate(u128),

    #[error("transaction already committed")]
    AlreadyCommitted,
}

/// The versioned knowledge store as seen by the classification pipeline.
pub trait VersionedStore: Send + Sync {
    /// Visit every semantic of `pattern`, in insertion order.
    fn for_each_semantic(&self, pattern: PatternId, f: &mut dyn FnMut(&SemanticEntity));

    /// Visit every semantic of `pattern` from a pool of worker threads.
    /// Visit order is unspecified; `f` must be safe to call concurrently.
    fn for_each_semantic_parallel(&self, pattern: PatternId, f: &(dyn Fn(&SemanticEntity) + Sync));

    /// Snapshot of one semantic with its full version history.
    fn semantic(&self, id: u128) -> Option<SemanticEntity>;

    /// Ids of all semantics of `pattern` referencing `referenced`.
    fn semantics_referencing(&self, referenced: Nid, pattern: PatternId) -> Vec<u128>;

    /// Status of a concept's latest version under `coordinate`; `None` if
    /// the concept is unknown or has no version visible at the coordinate.
    fn concept_status(&self, nid: Nid, coordinate: &ViewCoordinate) -> Option<Status>;

    /// Land every staged write of `txn` atomically, all under the
    /// transaction's stamp with its time set to the commit instant. Returns
    /// that instant. No staged write is visible to readers before this call
    /// returns.
    fn commit(&self, txn: &Transaction) -> Result<DateTime<Utc>, StoreError>;
}

/// A store bound to one view coordinate: the read context of a run.
#[derive(Clone)]
pub struct ViewCalculator {
    store: Arc<dyn VersionedStore>,
    coordinate: ViewCoordinate,
}

impl ViewCalculator {
    pub fn new(store: Arc<dyn VersionedStore>, coordinate: ViewCoordinate) -> Self {
        ViewCalculator { store, coordinate }
    }

    pub fn coordinate(&self) -> &ViewCoordinate {
        &self.coordinate
    }

    pub fn store(&self) -> &Arc<dyn VersionedStore> {
        &self.store
    }

    pub fn concept_status(&self, nid: Nid) -> Option<Status> {
        self.store.concept_status(nid, &self.coordinate)
    }

    /// Latest field of a semantic under this view.
    pub fn latest_field(&self, semantic_id: u128) -> Option<SemanticField> {
        self.store
            .semantic(semantic_id)?
            .latest(&self.coordinate)
            .map(|v| v.field.clone())
    }

    pub fn for_each_semantic_parallel(
        &self,
        pattern: PatternId,
        f: &(dyn Fn(&SemanticEntity) + Sync),
    ) {
        self.store.for_each_semantic_parallel(pattern, f);
    }
}
