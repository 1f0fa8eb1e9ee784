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

//! Taxotome Reasoner
//!
//! The pluggable subsumption engine contract and its backends. Backends are
//! selected at runtime through a name-keyed registry; nothing in the
//! pipeline assumes one backend's object model. The native EL++ saturation
//! engine ships built in; a batch-only variant of it exists for deployments
//! that forbid in-session incremental updates.

pub mod batch;
pub mod native;

pub use batch::{BatchElReasoner, BATCH_EL};
pub use native::{NativeElReasoner, NATIVE_EL};

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use taxotome_core::{AxiomDelta, ClassificationModel, DefinitionGraph, Nid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The backend cannot apply a delta to a live session. Distinct from any
    /// generic unimplemented error so callers can detect it and fall back to
    /// a full reclassification.
    #[error("backend '{backend}' does not support incremental re-classification")]
    IncrementalUnsupported { backend: &'static str },

    #[error("no reasoner backend registered under '{0}'")]
    UnknownBackend(String),

    #[error("no classification model loaded")]
    ModelNotLoaded,
}

/// A subsumption engine consuming one classification model.
///
/// Query operations return `None` for a concept the backend has no model
/// for; callers treat that as "skip, do not write", never as an empty
/// hierarchy.
pub trait ReasonerService: Send + Sync {
    /// Registry name of the backend.
    fn name(&self) -> &'static str;

    /// Whether `apply_delta` can succeed on this backend.
    fn supports_incremental(&self) -> bool;

    /// Take ownership of the model's axioms for this session.
    fn load(&mut self, model: &ClassificationModel) -> Result<(), ReasonerError>;

    /// Compute (or recompute) the full subsumption closure.
    fn classify(&mut self) -> Result<(), ReasonerError>;

    /// Apply a single concept's axiom delta to the live session and bring
    /// query results up to date without a full reclassification.
    fn apply_delta(&mut self, nid: Nid, delta: &AxiomDelta) -> Result<(), ReasonerError>;

    /// Direct parents of `nid`, if the backend has a model for it.
    fn parents(&self, nid: Nid) -> Option<BTreeSet<Nid>>;

    /// Direct children of `nid`.
    fn children(&self, nid: Nid) -> Option<BTreeSet<Nid>>;

    /// The equivalence class of `nid`, including `nid` itself.
    fn equivalents(&self, nid: Nid) -> Option<BTreeSet<Nid>>;

    /// The necessary normal form of `nid` as a definition graph.
    fn necessary_normal_form(&self, nid: Nid) -> Option<DefinitionGraph>;

    /// Every concept in the classified set, sorted.
    fn concept_set(&self) -> Vec<Nid>;

    fn concept_count(&self) -> usize;
}

/// Factory for one backend instance.
pub type BackendFactory = fn() -> Box<dyn ReasonerService>;

/// Runtime service lookup for reasoner backends.
pub struct ReasonerRegistry {
    factories: RwLock<BTreeMap<String, BackendFactory>>,
}

impl ReasonerRegistry {
    /// Registry with the built-in backends registered.
    pub fn with_builtin() -> Self {
        let registry = ReasonerRegistry {
            factories: RwLock::new(BTreeMap::new()),
        };
        registry.register(NATIVE_EL, || Box::new(NativeElReasoner::new()));
        registry.register(BATCH_EL, || Box::new(BatchElReasoner::new()));
        registry
    }

    pub fn register(&self, name: &str, factory: BackendFactory) {
        self.factories.write().insert(name.to_owned(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn ReasonerService>, ReasonerError> {
        self.factories
            .read()
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ReasonerError::UnknownBackend(name.to_owned()))
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }
}

impl Default for ReasonerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
