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

//! Batch-only EL++ backend
//!
//! The native engine behind a full-reclassification-only contract: every
//! change requires a fresh classify call. `apply_delta` reports the named
//! `IncrementalUnsupported` error so orchestrating code can detect it and
//! fall back, rather than mistaking it for a missing feature.

use crate::native::NativeElReasoner;
use crate::{ReasonerError, ReasonerService};
use std::collections::BTreeSet;
use taxotome_core::{AxiomDelta, ClassificationModel, DefinitionGraph, Nid};

pub const BATCH_EL: &str = "batch-el";

pub struct BatchElReasoner {
    inner: NativeElReasoner,
}

impl BatchElReasoner {
    pub fn new() -> Self {
        BatchElReasoner { inner: NativeElReasoner::new() }
    }
}

impl Default for BatchElReasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasonerService for BatchElReasoner {
    fn name(&self) -> &'static str {
        BATCH_EL
    }

    fn supports_incremental(&self) -> bool {
        false
    }

    fn load(&mut self, model: &ClassificationModel) -> Result<(), ReasonerError> {
        self.inner.load(model)
    }

    fn classify(&mut self) -> Result<(), ReasonerError> {
        self.inner.classify()
    }

    fn apply_delta(&mut self, _nid: Nid, _delta: &AxiomDelta) -> Result<(), ReasonerError> {
        Err(ReasonerError::IncrementalUnsupported { backend: BATCH_EL })
    }

    fn parents(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
        self.inner.parents(nid)
    }

    fn children(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
        self.inner.children(nid)
    }

    fn equivalents(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
        self.inner.equivalents(nid)
    }

    fn necessary_normal_form(&self, nid: Nid) -> Option<DefinitionGraph> {
        self.inner.necessary_normal_form(nid)
    }

    fn concept_set(&self) -> Vec<Nid> {
        self.inner.concept_set()
    }

    fn concept_count(&self) -> usize {
        self.inner.concept_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_application_is_reported_as_unsupported() {
        let model = ClassificationModel::new();
        model.register_concept(1, true);
        let mut reasoner = BatchElReasoner::new();
        reasoner.load(&model).unwrap();
        reasoner.classify().unwrap();
        assert!(matches!(
            reasoner.apply_delta(1, &AxiomDelta::default()),
            Err(ReasonerError::IncrementalUnsupported { backend: BATCH_EL })
        ));
    }
}
