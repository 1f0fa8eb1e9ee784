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

//! Classification orchestrator
//!
//! Sequences one run: extract the model from the store, load it into the
//! reasoner, classify, then answer hierarchy queries. Phases are explicit
//! states; invoking a phase or query out of order is a sequencing violation,
//! not a silent empty answer.
//!
//! After a full classification, backends that support it accept single
//! definition edits through `process_incremental` without leaving the
//! classified state.

use crate::builder::OntologyDataBuilder;
use crate::progress::{ProgressSnapshot, RunProgress};
use crate::{PipelineError, Result};
use std::collections::BTreeSet;
use std::fmt;
use taxotome_core::{
    AxiomDelta, ClassificationModel, DefinitionGraph, MetadataCatalog, Nid, PatternId,
};
use taxotome_reasoner::ReasonerService;
use taxotome_store::ViewCalculator;
use tracing::{info, instrument};

/// Where in the run the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Uninitialized,
    DataExtracted,
    DataLoaded,
    Classified,
}

impl OrchestratorState {
    fn as_str(self) -> &'static str {
        match self {
            OrchestratorState::Uninitialized => "uninitialized",
            OrchestratorState::DataExtracted => "data-extracted",
            OrchestratorState::DataLoaded => "data-loaded",
            OrchestratorState::Classified => "classified",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The store view and pattern bindings of one run.
#[derive(Clone)]
pub struct RunContext {
    pub view: ViewCalculator,
    pub stated_pattern: PatternId,
    pub inferred_axioms_pattern: PatternId,
    pub inferred_navigation_pattern: PatternId,
}

/// Drives one classification run over one reasoner backend.
pub struct ClassificationOrchestrator {
    catalog: MetadataCatalog,
    reasoner: Box<dyn ReasonerService>,
    context: Option<RunContext>,
    model: Option<ClassificationModel>,
    build_failures: Vec<(Nid, String)>,
    state: OrchestratorState,
    incremental_ready: bool,
    progress: RunProgress,
}

impl ClassificationOrchestrator {
    pub fn new(reasoner: Box<dyn ReasonerService>, catalog: MetadataCatalog) -> Self {
        ClassificationOrchestrator {
            catalog,
            reasoner,
            context: None,
            model: None,
            build_failures: Vec::new(),
            state: OrchestratorState::Uninitialized,
            incremental_ready: false,
            progress: RunProgress::new(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Whether `process_incremental` is currently usable.
    pub fn incremental_ready(&self) -> bool {
        self.incremental_ready
    }

    pub fn backend_name(&self) -> &'static str {
        self.reasoner.name()
    }

    pub fn context(&self) -> Option<&RunContext> {
        self.context.as_ref()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Per-concept build failures of the last extraction.
    pub fn build_failures(&self) -> &[(Nid, String)] {
        &self.build_failures
    }

    /// Bind the run to a store view and its pattern ids. Valid only before
    /// extraction starts.
    pub fn init(&mut self, context: RunContext) -> Result<()> {
        self.expect_state(OrchestratorState::Uninitialized, "init")?;
        self.context = Some(context);
        Ok(())
    }

    /// Phase one: build the classification model from the stated definitions.
    #[instrument(skip(self), fields(backend = self.reasoner.name()))]
    pub fn extract_data(&mut self) -> Result<()> {
        self.expect_state(OrchestratorState::Uninitialized, "extract_data")?;
        let context = self.context.clone().ok_or(PipelineError::SequencingViolation {
            expected: "init before extract_data",
            actual: "no run context",
        })?;
        let builder = OntologyDataBuilder::new(&self.catalog);
        let report = builder.build(&context.view, context.stated_pattern, &self.progress)?;
        self.build_failures = report.failures;
        self.model = Some(report.model);
        self.state = OrchestratorState::DataExtracted;
        Ok(())
    }

    /// Phase two: hand the model's axioms to the reasoner backend.
    pub fn load_data(&mut self) -> Result<()> {
        self.expect_state(OrchestratorState::DataExtracted, "load_data")?;
        let model = self.model.as_ref().ok_or(PipelineError::SequencingViolation {
            expected: "extract_data before load_data",
            actual: "no model",
        })?;
        self.reasoner.load(model)?;
        self.state = OrchestratorState::DataLoaded;
        Ok(())
    }

    /// Phase three: compute the subsumption closure. Callable again from the
    /// classified state to force a full reclassification.
    #[instrument(skip(self), fields(backend = self.reasoner.name()))]
    pub fn compute_inferences(&mut self) -> Result<()> {
        if self.state != OrchestratorState::DataLoaded
            && self.state != OrchestratorState::Classified
        {
            return Err(PipelineError::SequencingViolation {
                expected: OrchestratorState::DataLoaded.as_str(),
                actual: self.state.as_str(),
            });
        }
        if self.state == OrchestratorState::Classified {
            // Reclassification picks up model edits made since the last
            // load, e.g. after an incremental attempt a backend refused.
            let model = self.model.as_ref().ok_or(PipelineError::SequencingViolation {
                expected: "extract_data before compute_inferences",
                actual: "no model",
            })?;
            self.reasoner.load(model)?;
        }
        self.reasoner.classify()?;
        self.state = OrchestratorState::Classified;
        self.incremental_ready = self.reasoner.supports_incremental();
        info!(
            concepts = self.reasoner.concept_count(),
            incremental_ready = self.incremental_ready,
            "classification complete"
        );
        Ok(())
    }

    /// Re-translate one edited definition and apply its axiom delta to the
    /// live reasoner session. Stays in the classified state. Errors with
    /// `ReasonerError::IncrementalUnsupported` (wrapped) on backends that
    /// cannot do this; callers fall back to `compute_inferences`.
    pub fn process_incremental(&mut self, nid: Nid, graph: &DefinitionGraph) -> Result<AxiomDelta> {
        self.expect_state(OrchestratorState::Classified, "process_incremental")?;
        let model = self.model.as_ref().ok_or(PipelineError::SequencingViolation {
            expected: "extract_data before process_incremental",
            actual: "no model",
        })?;
        let builder = OntologyDataBuilder::new(&self.catalog);
        let delta = builder.build_incremental(nid, graph, model)?;
        if !delta.is_empty() {
            self.reasoner.apply_delta(nid, &delta)?;
        }
        Ok(delta)
    }

    /// Direct parents of `nid`; `None` when the backend has no model for it.
    pub fn parents(&self, nid: Nid) -> Result<Option<BTreeSet<Nid>>> {
        self.expect_classified("parents")?;
        Ok(self.reasoner.parents(nid))
    }

    pub fn children(&self, nid: Nid) -> Result<Option<BTreeSet<Nid>>> {
        self.expect_classified("children")?;
        Ok(self.reasoner.children(nid))
    }

    /// Equivalence class of `nid`, including `nid` itself.
    pub fn equivalents(&self, nid: Nid) -> Result<Option<BTreeSet<Nid>>> {
        self.expect_classified("equivalents")?;
        Ok(self.reasoner.equivalents(nid))
    }

    pub fn necessary_normal_form(&self, nid: Nid) -> Result<Option<DefinitionGraph>> {
        self.expect_classified("necessary_normal_form")?;
        Ok(self.reasoner.necessary_normal_form(nid))
    }

    /// Every classified concept, sorted.
    pub fn concept_set(&self) -> Result<Vec<Nid>> {
        self.expect_classified("concept_set")?;
        Ok(self.reasoner.concept_set())
    }

    pub fn concept_count(&self) -> Result<usize> {
        self.expect_classified("concept_count")?;
        Ok(self.reasoner.concept_count())
    }

    pub(crate) fn record_written(&self) {
        self.progress.record_written();
    }

    fn expect_state(&self, expected: OrchestratorState, _op: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(PipelineError::SequencingViolation {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn expect_classified(&self, op: &'static str) -> Result<()> {
        self.expect_state(OrchestratorState::Classified, op)
    }
}
