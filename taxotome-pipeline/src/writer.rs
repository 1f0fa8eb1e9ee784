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

//! Inferred results writer
//!
//! Stages every inferred-axiom and navigation semantic of a classified run
//! into one transaction and commits it atomically. Workers compare each
//! inferred definition against the stored one by structural isomorphism and
//! each navigation pair by set equality, so an unchanged concept stages no
//! write at all. A rerun over an unchanged ontology commits an empty
//! transaction.
//!
//! Any fatal staging error abandons the transaction before commit; the
//! store is left exactly as it was.

use crate::orchestrator::{ClassificationOrchestrator, RunContext};
use crate::{PipelineError, Result};
use chrono::Utc;
use dashmap::DashSet;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use taxotome_core::{Nid, PatternId};
use taxotome_store::{derive_semantic_id, SemanticField, Status, Transaction, ViewCoordinate};
use tracing::{info, warn};

/// Summary of one committed run.
#[derive(Debug, Serialize)]
pub struct ClassifierResults {
    /// Size of the classified concept set.
    pub classified_count: usize,
    /// Non-singleton equivalence classes, each sorted, sorted overall.
    pub equivalent_sets: Vec<Vec<Nid>>,
    /// Concepts whose inferred definition changed in this run.
    pub changed_axioms: Vec<Nid>,
    /// Concepts whose parent or child set changed in this run.
    pub changed_navigation: Vec<Nid>,
    /// Concepts the backend had no model for. Nothing was written for them.
    pub model_not_found: usize,
    /// Per-concept staging failures that did not abort the run.
    pub item_failures: Vec<(Nid, String)>,
    /// The run's view coordinate advanced to the commit instant; reading at
    /// this coordinate sees everything this run wrote.
    pub commit_coordinate: ViewCoordinate,
}

impl ClassifierResults {
    pub fn summary_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Writes a classified run's inferences back to the store.
#[derive(Default)]
pub struct InferredResultsWriter;

impl InferredResultsWriter {
    pub fn new() -> Self {
        InferredResultsWriter
    }

    /// Stage and commit all inferred results of `orchestrator`'s run.
    pub fn write(&self, orchestrator: &ClassificationOrchestrator) -> Result<ClassifierResults> {
        let concepts = orchestrator.concept_set()?;
        let context = orchestrator
            .context()
            .ok_or(PipelineError::SequencingViolation {
                expected: "init before write",
                actual: "no run context",
            })?
            .clone();

        let stamp = context.view.coordinate().mint_stamp(Status::Active, Utc::now());
        let txn = Transaction::new(stamp);

        let equivalent_sets: DashSet<Vec<Nid>> = DashSet::new();
        let changed_axioms: DashSet<Nid> = DashSet::new();
        let changed_navigation: DashSet<Nid> = DashSet::new();
        let model_not_found = AtomicUsize::new(0);
        let item_failures: Mutex<Vec<(Nid, String)>> = Mutex::new(Vec::new());
        let fatal: Mutex<Option<PipelineError>> = Mutex::new(None);

        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        let chunk = concepts.len().div_ceil(workers).max(1);
        std::thread::scope(|scope| {
            for slice in concepts.chunks(chunk) {
                let txn = &txn;
                let context = &context;
                let equivalent_sets = &equivalent_sets;
                let changed_axioms = &changed_axioms;
                let changed_navigation = &changed_navigation;
                let model_not_found = &model_not_found;
                let item_failures = &item_failures;
                let fatal = &fatal;
                scope.spawn(move || {
                    for &nid in slice {
                        if fatal.lock().is_some() {
                            return;
                        }
                        let staged = stage_concept(
                            nid,
                            orchestrator,
                            context,
                            txn,
                            equivalent_sets,
                            changed_axioms,
                            changed_navigation,
                            model_not_found,
                            item_failures,
                        );
                        match staged {
                            Ok(()) => orchestrator.record_written(),
                            Err(err) => {
                                let mut guard = fatal.lock();
                                if guard.is_none() {
                                    *guard = Some(err);
                                }
                                return;
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = fatal.into_inner() {
            // The transaction is dropped uncommitted; no staged write lands.
            warn!(error = %err, "write-back aborted before commit");
            return Err(err);
        }

        let staged = txn.staged();
        let commit_time = context.view.store().commit(&txn)?;

        let mut equivalent_sets: Vec<Vec<Nid>> = equivalent_sets.into_iter().collect();
        equivalent_sets.sort();
        let mut changed_axioms: Vec<Nid> = changed_axioms.into_iter().collect();
        changed_axioms.sort_unstable();
        let mut changed_navigation: Vec<Nid> = changed_navigation.into_iter().collect();
        changed_navigation.sort_unstable();
        let mut item_failures = item_failures.into_inner();
        item_failures.sort();

        info!(
            concepts = concepts.len(),
            staged,
            changed_axioms = changed_axioms.len(),
            changed_navigation = changed_navigation.len(),
            "inferred results committed"
        );

        Ok(ClassifierResults {
            classified_count: concepts.len(),
            equivalent_sets,
            changed_axioms,
            changed_navigation,
            model_not_found: model_not_found.into_inner(),
            item_failures,
            commit_coordinate: context.view.coordinate().advanced_to(commit_time),
        })
    }
}

/// Stage one concept's inferred definition and navigation writes.
#[allow(clippy::too_many_arguments)]
fn stage_concept(
    nid: Nid,
    orchestrator: &ClassificationOrchestrator,
    context: &RunContext,
    txn: &Transaction,
    equivalent_sets: &DashSet<Vec<Nid>>,
    changed_axioms: &DashSet<Nid>,
    changed_navigation: &DashSet<Nid>,
    model_not_found: &AtomicUsize,
    item_failures: &Mutex<Vec<(Nid, String)>>,
) -> Result<()> {
    let Some(equivalents) = orchestrator.equivalents(nid)? else {
        // The backend has no model for this concept. Record the skip and
        // write nothing; an empty write would destroy existing results.
        warn!(nid, "backend has no model for concept, skipping write-back");
        model_not_found.fetch_add(1, Ordering::Relaxed);
        item_failures
            .lock()
            .push((nid, "no model in backend".to_owned()));
        return Ok(());
    };
    if equivalents.len() > 1 {
        equivalent_sets.insert(equivalents.iter().copied().collect());
    }

    match orchestrator.necessary_normal_form(nid)? {
        Some(graph) => {
            if stage_field(
                context,
                txn,
                context.inferred_axioms_pattern,
                nid,
                SemanticField::Definition(graph),
            )? {
                changed_axioms.insert(nid);
            }
        }
        None => {
            warn!(nid, "no necessary normal form produced, skipping definition");
            item_failures
                .lock()
                .push((nid, "no necessary normal form produced".to_owned()));
        }
    }

    let parents = orchestrator.parents(nid)?.unwrap_or_default();
    let children = orchestrator.children(nid)?.unwrap_or_default();
    if stage_field(
        context,
        txn,
        context.inferred_navigation_pattern,
        nid,
        SemanticField::Navigation { parents, children },
    )? {
        changed_navigation.insert(nid);
    }

    Ok(())
}

/// Stage `field` for the semantic of `pattern` referencing `nid`, unless the
/// stored value is already equivalent. Returns whether a write was staged.
fn stage_field(
    context: &RunContext,
    txn: &Transaction,
    pattern: PatternId,
    nid: Nid,
    field: SemanticField,
) -> Result<bool> {
    let ids = context.view.store().semantics_referencing(nid, pattern);
    match ids.as_slice() {
        [] => {
            txn.create_semantic(derive_semantic_id(pattern, nid), pattern, nid, field);
            Ok(true)
        }
        [id] => {
            let unchanged = match (context.view.latest_field(*id), &field) {
                (Some(SemanticField::Definition(old)), SemanticField::Definition(new)) => {
                    old.is_isomorphic(new)
                }
                (
                    Some(SemanticField::Navigation {
                        parents: old_parents,
                        children: old_children,
                    }),
                    SemanticField::Navigation { parents, children },
                ) => old_parents == *parents && old_children == *children,
                _ => false,
            };
            if unchanged {
                Ok(false)
            } else {
                txn.update_field(*id, field);
                Ok(true)
            }
        }
        many => Err(PipelineError::DuplicateInferredSemantic {
            pattern,
            nid,
            count: many.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::RunContext;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use taxotome_core::{
        AxiomDelta, ClassificationModel, DefinitionGraph, GraphBuilder, MetadataCatalog,
        PatternId, VertexLabel, ROOT,
    };
    use taxotome_reasoner::{NativeElReasoner, ReasonerError, ReasonerService};
    use taxotome_store::{MemoryStore, Stamp, VersionedStore, ViewCalculator};

    const STATED: PatternId = 11;
    const INFERRED_AX: PatternId = 12;
    const INFERRED_NAV: PatternId = 13;

    fn stamp() -> Stamp {
        Stamp {
            status: Status::Active,
            time: Utc::now(),
            author: 1,
            module: 2,
            path: 3,
        }
    }

    fn parents_graph(parents: &[Nid]) -> DefinitionGraph {
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::NecessarySet);
        let and = b.add(set, VertexLabel::And);
        for &p in parents {
            b.add(and, VertexLabel::ConceptRef(p));
        }
        b.build()
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (nid, parents) in [(1, vec![0]), (2, vec![1]), (3, vec![2])] {
            store.add_concept(nid, stamp());
            store
                .add_semantic_version(
                    derive_semantic_id(STATED, nid),
                    STATED,
                    nid,
                    SemanticField::Definition(parents_graph(&parents)),
                    stamp(),
                )
                .unwrap();
        }
        store
    }

    fn classified(store: Arc<MemoryStore>) -> ClassificationOrchestrator {
        let mut orch = ClassificationOrchestrator::new(
            Box::new(NativeElReasoner::new()),
            MetadataCatalog::empty(),
        );
        orch.init(RunContext {
            view: ViewCalculator::new(store, ViewCoordinate::now(1, 2, 3)),
            stated_pattern: STATED,
            inferred_axioms_pattern: INFERRED_AX,
            inferred_navigation_pattern: INFERRED_NAV,
        })
        .unwrap();
        orch.extract_data().unwrap();
        orch.load_data().unwrap();
        orch.compute_inferences().unwrap();
        orch
    }

    #[test]
    fn first_run_creates_inferred_semantics() {
        let store = seeded_store();
        let orch = classified(Arc::clone(&store));
        let results = InferredResultsWriter::new().write(&orch).unwrap();

        assert_eq!(results.classified_count, 3);
        assert_eq!(results.changed_axioms, vec![1, 2, 3]);
        assert_eq!(results.changed_navigation, vec![1, 2, 3]);
        assert_eq!(store.pattern_len(INFERRED_AX), 3);
        assert_eq!(store.pattern_len(INFERRED_NAV), 3);

        // Reading at the commit coordinate sees the new navigation.
        let view = ViewCalculator::new(store, results.commit_coordinate);
        let id = view.store().semantics_referencing(3, INFERRED_NAV)[0];
        match view.latest_field(id) {
            Some(SemanticField::Navigation { parents, .. }) => {
                assert_eq!(parents, [2].into_iter().collect());
            }
            other => panic!("unexpected field: {other:?}"),
        }
    }

    #[test]
    fn unchanged_rerun_stages_nothing() {
        let store = seeded_store();
        let first = InferredResultsWriter::new()
            .write(&classified(Arc::clone(&store)))
            .unwrap();

        let mut orch = ClassificationOrchestrator::new(
            Box::new(NativeElReasoner::new()),
            MetadataCatalog::empty(),
        );
        orch.init(RunContext {
            view: ViewCalculator::new(store.clone(), first.commit_coordinate),
            stated_pattern: STATED,
            inferred_axioms_pattern: INFERRED_AX,
            inferred_navigation_pattern: INFERRED_NAV,
        })
        .unwrap();
        orch.extract_data().unwrap();
        orch.load_data().unwrap();
        orch.compute_inferences().unwrap();

        let second = InferredResultsWriter::new().write(&orch).unwrap();
        assert!(second.changed_axioms.is_empty());
        assert!(second.changed_navigation.is_empty());
        assert_eq!(store.pattern_len(INFERRED_AX), 3);
    }

    #[test]
    fn duplicate_inferred_semantic_aborts_before_commit() {
        let store = seeded_store();
        // Two navigation semantics referencing the same concept.
        for id in [9001u128, 9002u128] {
            store
                .add_semantic_version(
                    id,
                    INFERRED_NAV,
                    2,
                    SemanticField::Navigation {
                        parents: BTreeSet::new(),
                        children: BTreeSet::new(),
                    },
                    stamp(),
                )
                .unwrap();
        }
        let before_ax = store.pattern_len(INFERRED_AX);

        let orch = classified(Arc::clone(&store));
        let result = InferredResultsWriter::new().write(&orch);
        assert!(matches!(
            result,
            Err(PipelineError::DuplicateInferredSemantic { nid: 2, count: 2, .. })
        ));
        // Nothing landed, not even writes staged before the failure.
        assert_eq!(store.pattern_len(INFERRED_AX), before_ax);
    }

    /// Backend that claims concept 2 but answers no queries for it.
    struct HollowBackend;

    impl ReasonerService for HollowBackend {
        fn name(&self) -> &'static str {
            "hollow"
        }
        fn supports_incremental(&self) -> bool {
            false
        }
        fn load(&mut self, _model: &ClassificationModel) -> std::result::Result<(), ReasonerError> {
            Ok(())
        }
        fn classify(&mut self) -> std::result::Result<(), ReasonerError> {
            Ok(())
        }
        fn apply_delta(
            &mut self,
            _nid: Nid,
            _delta: &AxiomDelta,
        ) -> std::result::Result<(), ReasonerError> {
            Err(ReasonerError::IncrementalUnsupported { backend: "hollow" })
        }
        fn parents(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
            (nid == 1).then(BTreeSet::new)
        }
        fn children(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
            (nid == 1).then(BTreeSet::new)
        }
        fn equivalents(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
            (nid == 1).then(|| [1].into_iter().collect())
        }
        fn necessary_normal_form(&self, nid: Nid) -> Option<DefinitionGraph> {
            (nid == 1).then(|| parents_graph_for_test())
        }
        fn concept_set(&self) -> Vec<Nid> {
            vec![1, 2]
        }
        fn concept_count(&self) -> usize {
            2
        }
    }

    fn parents_graph_for_test() -> DefinitionGraph {
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::NecessarySet);
        let and = b.add(set, VertexLabel::And);
        b.add(and, VertexLabel::ConceptRef(0));
        b.build()
    }

    #[test]
    fn model_not_found_concepts_are_counted_and_skipped() {
        let store = seeded_store();
        let mut orch = ClassificationOrchestrator::new(
            Box::new(HollowBackend),
            MetadataCatalog::empty(),
        );
        orch.init(RunContext {
            view: ViewCalculator::new(store.clone(), ViewCoordinate::now(1, 2, 3)),
            stated_pattern: STATED,
            inferred_axioms_pattern: INFERRED_AX,
            inferred_navigation_pattern: INFERRED_NAV,
        })
        .unwrap();
        orch.extract_data().unwrap();
        orch.load_data().unwrap();
        orch.compute_inferences().unwrap();

        let results = InferredResultsWriter::new().write(&orch).unwrap();
        assert_eq!(results.model_not_found, 1);
        assert_eq!(results.changed_axioms, vec![1]);
        // The skip is reported per concept, not just counted.
        assert_eq!(results.item_failures.len(), 1);
        assert_eq!(results.item_failures[0].0, 2);
        // Concept 2 got no writes at all.
        assert!(store.semantics_referencing(2, INFERRED_AX).is_empty());
        assert!(store.semantics_referencing(2, INFERRED_NAV).is_empty());
    }
}
