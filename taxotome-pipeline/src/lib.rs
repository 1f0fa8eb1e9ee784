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

//! Taxotome Pipeline
//!
//! The classification run end to end: extract a classification model from
//! the versioned store, hand it to a reasoner backend, and write the
//! inferred results back under one transaction. The orchestrator sequences
//! these phases; the builder, writer, traversal, and justification modules
//! do the work.

pub mod builder;
pub mod justification;
pub mod orchestrator;
pub mod progress;
pub mod traversal;
pub mod writer;

pub use builder::{BuildReport, OntologyDataBuilder};
pub use justification::{minimal_hitting_sets, EntailmentSupport, EntailmentSupportBuilder};
pub use orchestrator::{ClassificationOrchestrator, OrchestratorState, RunContext};
pub use progress::{ProgressSnapshot, RunProgress};
pub use traversal::{
    breadth_first_furthest, breadth_first_nearest, GraphVisitor, HierarchyProvider,
    LevelStatsVisitor, NavigationGraph,
};
pub use writer::{ClassifierResults, InferredResultsWriter};

use taxotome_core::{CatalogError, Nid, PatternId};
use taxotome_reasoner::ReasonerError;
use taxotome_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stated definition graph that cannot be translated to axioms. The
    /// concept is reported and skipped; the run continues, so this variant
    /// surfaces only from the single-concept incremental path.
    #[error("malformed definition for concept {nid}: {reason}")]
    MalformedDefinition { nid: Nid, reason: String },

    /// More than one inferred semantic of the same pattern references one
    /// concept. Writing would be ambiguous; the run aborts before commit.
    #[error("concept {nid} has {count} semantics of pattern {pattern}, expected at most one")]
    DuplicateInferredSemantic {
        pattern: PatternId,
        nid: Nid,
        count: usize,
    },

    /// A phase was invoked out of order. Programming error by the caller.
    #[error("invalid phase transition: expected {expected}, state is {actual}")]
    SequencingViolation {
        expected: &'static str,
        actual: &'static str,
    },

    /// Explicit useful axioms combined with justification or repair
    /// families. The builder cannot tell which source is authoritative.
    #[error("explicit useful axioms cannot be combined with justification or repair sets")]
    AmbiguousUsefulAxioms,

    /// The model violated its counting invariant after construction.
    #[error("inconsistent classification model: {0}")]
    ModelInvariant(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Reasoner(#[from] ReasonerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
