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

//! End-to-end classification runs over an in-memory store: extract,
//! classify, write back, reclassify incrementally.

use std::collections::BTreeSet;
use std::sync::Arc;
use taxotome_core::{
    DefinitionGraph, GraphBuilder, MetadataCatalog, Nid, PatternId, VertexLabel, ROOT,
};
use taxotome_pipeline::{
    ClassificationOrchestrator, InferredResultsWriter, NavigationGraph, RunContext,
};
use taxotome_reasoner::NativeElReasoner;
use taxotome_store::{
    derive_semantic_id, MemoryStore, SemanticField, Stamp, Status, VersionedStore, ViewCalculator,
    ViewCoordinate,
};

const STATED: PatternId = 11;
const INFERRED_AX: PatternId = 12;
const INFERRED_NAV: PatternId = 13;

const THING: Nid = 1;
const FINDING: Nid = 100;
const X: Nid = 110;
const Y: Nid = 111;
const F1: Nid = 120;
const F2: Nid = 121;
const SITE: Nid = 200;

fn stamp() -> Stamp {
    Stamp {
        status: Status::Active,
        time: chrono::Utc::now(),
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

/// `concept ≡ base ⊓ ∃site.filler`.
fn finding_graph(base: Nid, filler: Nid) -> DefinitionGraph {
    let mut b = GraphBuilder::new();
    let set = b.add(ROOT, VertexLabel::SufficientSet);
    let and = b.add(set, VertexLabel::And);
    b.add(and, VertexLabel::ConceptRef(base));
    let some = b.add(and, VertexLabel::SomeRole(SITE));
    b.add(some, VertexLabel::ConceptRef(filler));
    b.build()
}

fn seed(store: &MemoryStore, nid: Nid, graph: DefinitionGraph) {
    store.add_concept(nid, stamp());
    store
        .add_semantic_version(
            derive_semantic_id(STATED, nid),
            STATED,
            nid,
            SemanticField::Definition(graph),
            stamp(),
        )
        .unwrap();
}

/// Store with two defined findings whose site fillers are related:
/// `Y ⊑ X`, `F1 ≡ Finding ⊓ ∃site.X`, `F2 ≡ Finding ⊓ ∃site.Y`.
fn finding_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed(&store, THING, parents_graph(&[0]));
    seed(&store, FINDING, parents_graph(&[THING]));
    seed(&store, X, parents_graph(&[THING]));
    seed(&store, Y, parents_graph(&[X]));
    seed(&store, F1, finding_graph(FINDING, X));
    seed(&store, F2, finding_graph(FINDING, Y));
    store
}

fn run(store: Arc<MemoryStore>, coordinate: ViewCoordinate) -> ClassificationOrchestrator {
    let mut orch = ClassificationOrchestrator::new(
        Box::new(NativeElReasoner::new()),
        MetadataCatalog::empty(),
    );
    orch.init(RunContext {
        view: ViewCalculator::new(store, coordinate),
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

fn nids(set: &[Nid]) -> Option<BTreeSet<Nid>> {
    Some(set.iter().copied().collect())
}

/// A defined concept with a narrower existential filler classifies under
/// the one with the broader filler.
#[test]
fn narrower_filler_subsumes_under_broader_finding() {
    let orch = run(finding_store(), ViewCoordinate::now(1, 2, 3));

    assert_eq!(orch.parents(F2).unwrap(), nids(&[F1]));
    assert_eq!(orch.parents(F1).unwrap(), nids(&[FINDING]));
    assert_eq!(orch.children(F1).unwrap(), nids(&[F2]));
}

/// First write creates inferred semantics; a rerun over the committed
/// coordinate changes nothing.
#[test]
fn write_back_is_idempotent() {
    let store = finding_store();
    let orch = run(Arc::clone(&store), ViewCoordinate::now(1, 2, 3));
    let first = InferredResultsWriter::new().write(&orch).unwrap();

    assert_eq!(first.classified_count, 6);
    assert_eq!(store.pattern_len(INFERRED_AX), 6);
    assert_eq!(store.pattern_len(INFERRED_NAV), 6);
    assert!(first.equivalent_sets.is_empty());

    let orch = run(Arc::clone(&store), first.commit_coordinate);
    let second = InferredResultsWriter::new().write(&orch).unwrap();
    assert!(second.changed_axioms.is_empty());
    assert!(second.changed_navigation.is_empty());
    assert_eq!(store.pattern_len(INFERRED_AX), 6);
}

/// An incremental definition edit produces the same hierarchy as a cold
/// full classification of the edited ontology.
#[test]
fn incremental_run_matches_full_reclassification() {
    // Start with Y unrelated to X; F1 and F2 are siblings.
    let store = Arc::new(MemoryStore::new());
    seed(&store, THING, parents_graph(&[0]));
    seed(&store, FINDING, parents_graph(&[THING]));
    seed(&store, X, parents_graph(&[THING]));
    seed(&store, Y, parents_graph(&[THING]));
    seed(&store, F1, finding_graph(FINDING, X));
    seed(&store, F2, finding_graph(FINDING, Y));

    let mut orch = run(Arc::clone(&store), ViewCoordinate::now(1, 2, 3));
    assert_eq!(orch.parents(F2).unwrap(), nids(&[FINDING]));

    // Edit: move Y under X.
    let delta = orch.process_incremental(Y, &parents_graph(&[X])).unwrap();
    assert!(!delta.is_empty());

    let cold = run(finding_store(), ViewCoordinate::now(1, 2, 3));
    for nid in orch.concept_set().unwrap() {
        assert_eq!(orch.parents(nid).unwrap(), cold.parents(nid).unwrap());
        assert_eq!(orch.children(nid).unwrap(), cold.children(nid).unwrap());
        assert_eq!(orch.equivalents(nid).unwrap(), cold.equivalents(nid).unwrap());
    }
}

/// Equivalent definitions land in one reported equivalence set.
#[test]
fn equivalent_concepts_are_reported_together() {
    let store = finding_store();
    // F3 is defined exactly like F1.
    const F3: Nid = 122;
    seed(&store, F3, finding_graph(FINDING, X));

    let orch = run(Arc::clone(&store), ViewCoordinate::now(1, 2, 3));
    assert_eq!(orch.equivalents(F1).unwrap(), nids(&[F1, F3]));

    let results = InferredResultsWriter::new().write(&orch).unwrap();
    assert_eq!(results.equivalent_sets, vec![vec![F1, F3]]);
}

/// The committed navigation semantics agree with the reasoner's answers.
#[test]
fn committed_navigation_matches_reasoner() {
    let store = finding_store();
    let orch = run(Arc::clone(&store), ViewCoordinate::now(1, 2, 3));
    let results = InferredResultsWriter::new().write(&orch).unwrap();

    let view = ViewCalculator::new(Arc::clone(&store) as Arc<dyn VersionedStore>, results.commit_coordinate);
    for nid in orch.concept_set().unwrap() {
        let ids = view.store().semantics_referencing(nid, INFERRED_NAV);
        assert_eq!(ids.len(), 1);
        match view.latest_field(ids[0]) {
            Some(SemanticField::Navigation { parents, children }) => {
                assert_eq!(Some(parents), orch.parents(nid).unwrap());
                assert_eq!(Some(children), orch.children(nid).unwrap());
            }
            other => panic!("unexpected field for {nid}: {other:?}"),
        }
    }
}

/// Role-grouped definitions classify the same way as ungrouped ones once
/// the catalog's role-group role wraps them.
#[test]
fn grouped_findings_classify_under_broader_filler() -> anyhow::Result<()> {
    use std::io::Write;

    let mut catalog_file = tempfile::NamedTempFile::new()?;
    writeln!(catalog_file, "role_group = 300")?;
    let catalog = MetadataCatalog::load(catalog_file.path())?;

    // `concept ≡ base ⊓ ∃rg.(∃site.filler)` once lifting runs.
    let grouped = |base: Nid, filler: Nid| {
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::SufficientSet);
        let and = b.add(set, VertexLabel::And);
        b.add(and, VertexLabel::ConceptRef(base));
        let group = b.add(and, VertexLabel::RoleGroup);
        let some = b.add(group, VertexLabel::SomeRole(SITE));
        b.add(some, VertexLabel::ConceptRef(filler));
        b.build()
    };

    let store = Arc::new(MemoryStore::new());
    seed(&store, THING, parents_graph(&[0]));
    seed(&store, FINDING, parents_graph(&[THING]));
    seed(&store, X, parents_graph(&[THING]));
    seed(&store, Y, parents_graph(&[X]));
    seed(&store, F1, grouped(FINDING, X));
    seed(&store, F2, grouped(FINDING, Y));

    let mut orch = ClassificationOrchestrator::new(Box::new(NativeElReasoner::new()), catalog);
    orch.init(RunContext {
        view: ViewCalculator::new(store, ViewCoordinate::now(1, 2, 3)),
        stated_pattern: STATED,
        inferred_axioms_pattern: INFERRED_AX,
        inferred_navigation_pattern: INFERRED_NAV,
    })?;
    orch.extract_data()?;
    orch.load_data()?;
    orch.compute_inferences()?;

    assert_eq!(orch.parents(F2)?, nids(&[F1]));
    assert_eq!(orch.parents(F1)?, nids(&[FINDING]));
    Ok(())
}

/// Traversal over the inferred hierarchy sees the finding chain at the
/// right depths.
#[test]
fn traversal_over_inferred_hierarchy() {
    let orch = run(finding_store(), ViewCoordinate::now(1, 2, 3));
    let graph = NavigationGraph::from_orchestrator(&orch).unwrap();

    let mut stats = taxotome_pipeline::LevelStatsVisitor::new(&graph);
    taxotome_pipeline::breadth_first_furthest(&graph, THING, &mut [&mut stats]);
    assert_eq!(stats.levels(FINDING), Some((1, 1)));
    assert_eq!(stats.levels(F1), Some((2, 2)));
    assert_eq!(stats.levels(F2), Some((3, 3)));
}
