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

//! Ontology data builder
//!
//! Walks every stated-definition semantic visible at the view coordinate and
//! translates its graph into EL++ axioms, producing the classification model
//! for one run. Translation happens on the store's worker pool; one concept
//! is translated by exactly one worker. A definition that cannot be
//! translated is recorded as a per-concept failure and skipped, it never
//! aborts the run.
//!
//! Role groups translate by lifting: members whose role the catalog marks
//! never-grouped become top-level conjuncts, the rest nest under a single
//! existential restriction over the role-group role.

use crate::progress::RunProgress;
use crate::{PipelineError, Result};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use taxotome_core::{
    Axiom, AxiomDelta, ClassificationModel, ConceptExpr, DefinitionGraph, MetadataCatalog, Nid,
    PatternId, RoleInfo, VertexLabel, ROOT,
};
use taxotome_store::{SemanticField, Status, ViewCalculator};
use tracing::{debug, info, warn};

/// The model plus everything that went wrong while building it.
pub struct BuildReport {
    pub model: ClassificationModel,
    /// Concepts whose stated definition could not be translated, with the
    /// reason. These concepts stay registered but carry no axioms.
    pub failures: Vec<(Nid, String)>,
}

/// Translates stated definitions into a classification model.
pub struct OntologyDataBuilder<'a> {
    catalog: &'a MetadataCatalog,
}

impl<'a> OntologyDataBuilder<'a> {
    pub fn new(catalog: &'a MetadataCatalog) -> Self {
        OntologyDataBuilder { catalog }
    }

    /// Build the model for every concept with a stated definition of
    /// `stated_pattern` visible under `view`.
    pub fn build(
        &self,
        view: &ViewCalculator,
        stated_pattern: PatternId,
        progress: &RunProgress,
    ) -> Result<BuildReport> {
        let model = ClassificationModel::new();
        let failures: Mutex<Vec<(Nid, String)>> = Mutex::new(Vec::new());

        view.for_each_semantic_parallel(stated_pattern, &|semantic| {
            let nid = semantic.referenced;
            let Some(version) = semantic.latest(view.coordinate()) else {
                // No version visible at this coordinate; not part of the run.
                return;
            };
            match view.concept_status(nid) {
                None => {
                    warn!(nid, "stated definition references an unresolvable concept");
                    failures
                        .lock()
                        .push((nid, "referenced concept has no visible version".to_owned()));
                }
                Some(Status::Inactive) => {
                    model.register_concept(nid, false);
                    progress.record_extracted();
                }
                Some(Status::Active) => {
                    model.register_concept(nid, true);
                    progress.record_extracted();
                    match &version.field {
                        SemanticField::Definition(graph) => {
                            match self.translate_definition(nid, graph, &model) {
                                Ok(axioms) => {
                                    model.set_axioms(nid, axioms);
                                    progress.record_translated();
                                }
                                Err(PipelineError::MalformedDefinition { reason, .. }) => {
                                    warn!(nid, %reason, "skipping untranslatable definition");
                                    failures.lock().push((nid, reason));
                                }
                                Err(other) => {
                                    failures.lock().push((nid, other.to_string()));
                                }
                            }
                        }
                        SemanticField::Navigation { .. } => {
                            failures.lock().push((
                                nid,
                                "stated semantic holds navigation, expected a definition"
                                    .to_owned(),
                            ));
                        }
                    }
                }
            }
        });

        let mut model = model;
        let mut compositions = BTreeSet::new();
        for ri in self.catalog.right_identities() {
            self.register_role(ri.lhs, &model);
            compositions.insert(Axiom::RoleComposition {
                lhs: ri.lhs,
                rhs: ri.rhs,
            });
        }
        model.set_role_compositions(compositions);

        if !model.counts_consistent() {
            return Err(PipelineError::ModelInvariant(format!(
                "{} classifiable concepts but {} active + {} inactive",
                model.classifiable().len(),
                model.active_count(),
                model.inactive_count()
            )));
        }

        let failures = failures.into_inner();
        info!(
            concepts = model.concept_count(),
            active = model.active_count(),
            roles = model.role_count(),
            failures = failures.len(),
            "classification model built"
        );
        Ok(BuildReport { model, failures })
    }

    /// Translate one edited definition and fold it into `model`, returning
    /// the exact axiom delta against the concept's previous axioms. The
    /// model is updated in place; no other concept is touched.
    pub fn build_incremental(
        &self,
        nid: Nid,
        graph: &DefinitionGraph,
        model: &ClassificationModel,
    ) -> Result<AxiomDelta> {
        let next = self.translate_definition(nid, graph, model)?;
        model.register_concept(nid, true);
        let previous = model.axioms_for(nid).unwrap_or_default();
        let delta = AxiomDelta::between(&previous, &next);
        model.apply_delta(nid, &delta);
        debug!(
            nid,
            additions = delta.additions.len(),
            removals = delta.removals.len(),
            "incremental definition delta"
        );
        Ok(delta)
    }

    /// Axioms stated by one definition graph. Necessary sets become concept
    /// inclusions, sufficient sets become equivalences.
    fn translate_definition(
        &self,
        nid: Nid,
        graph: &DefinitionGraph,
        model: &ClassificationModel,
    ) -> Result<BTreeSet<Axiom>> {
        if graph.is_empty() || graph.label(ROOT) != VertexLabel::DefinitionRoot {
            return Err(malformed(nid, "graph has no definition root".to_owned()));
        }
        let mut axioms = BTreeSet::new();
        for &set in graph.children(ROOT) {
            let label = graph.label(set);
            let members = self.set_members(nid, graph, set, model)?;
            let rhs = ConceptExpr::conjunction(members);
            let axiom = match label {
                VertexLabel::NecessarySet => {
                    Axiom::inclusion(ConceptExpr::Concept(nid), rhs)
                }
                VertexLabel::SufficientSet => {
                    Axiom::equivalence(ConceptExpr::Concept(nid), rhs)
                }
                other => {
                    return Err(malformed(
                        nid,
                        format!("unexpected {other:?} under definition root"),
                    ))
                }
            };
            axioms.insert(axiom);
        }
        Ok(axioms)
    }

    /// Top-level member expressions of one necessary or sufficient set,
    /// with role-group lifting applied.
    fn set_members(
        &self,
        nid: Nid,
        graph: &DefinitionGraph,
        set: u32,
        model: &ClassificationModel,
    ) -> Result<Vec<ConceptExpr>> {
        let [and] = graph.children(set) else {
            return Err(malformed(
                nid,
                format!("definition set has {} children, expected one conjunction", graph.children(set).len()),
            ));
        };
        if graph.label(*and) != VertexLabel::And {
            return Err(malformed(nid, "definition set member is not a conjunction".to_owned()));
        }
        if graph.children(*and).is_empty() {
            return Err(malformed(nid, "definition set conjunction is empty".to_owned()));
        }

        let mut members = Vec::new();
        for &m in graph.children(*and) {
            match graph.label(m) {
                VertexLabel::RoleGroup => {
                    let mut grouped = Vec::new();
                    for &g in graph.children(m) {
                        let VertexLabel::SomeRole(role) = graph.label(g) else {
                            return Err(malformed(
                                nid,
                                "role group member is not an existential restriction".to_owned(),
                            ));
                        };
                        let expr = self.existential(nid, graph, g, role, model)?;
                        if self.catalog.is_never_grouped(role) {
                            members.push(expr);
                        } else {
                            grouped.push(expr);
                        }
                    }
                    if !grouped.is_empty() {
                        self.register_role(self.catalog.role_group(), model);
                        members.push(ConceptExpr::some(
                            self.catalog.role_group(),
                            ConceptExpr::conjunction(grouped),
                        ));
                    }
                }
                _ => members.push(self.expression(nid, graph, m, model)?),
            }
        }
        Ok(members)
    }

    fn expression(
        &self,
        nid: Nid,
        graph: &DefinitionGraph,
        vertex: u32,
        model: &ClassificationModel,
    ) -> Result<ConceptExpr> {
        match graph.label(vertex) {
            VertexLabel::ConceptRef(c) => Ok(ConceptExpr::Concept(c)),
            VertexLabel::SomeRole(role) => self.existential(nid, graph, vertex, role, model),
            VertexLabel::And => {
                if graph.children(vertex).is_empty() {
                    return Err(malformed(nid, "empty conjunction vertex".to_owned()));
                }
                let members = graph
                    .children(vertex)
                    .iter()
                    .map(|&c| self.expression(nid, graph, c, model))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ConceptExpr::conjunction(members))
            }
            other => Err(malformed(
                nid,
                format!("unexpected {other:?} in expression position"),
            )),
        }
    }

    fn existential(
        &self,
        nid: Nid,
        graph: &DefinitionGraph,
        vertex: u32,
        role: Nid,
        model: &ClassificationModel,
    ) -> Result<ConceptExpr> {
        let [filler] = graph.children(vertex) else {
            return Err(malformed(
                nid,
                format!("existential restriction over role {role} must have exactly one filler"),
            ));
        };
        self.register_role(role, model);
        let filler = self.expression(nid, graph, *filler, model)?;
        Ok(ConceptExpr::some(role, filler))
    }

    fn register_role(&self, role: Nid, model: &ClassificationModel) {
        model.register_role(RoleInfo {
            nid: role,
            never_grouped: self.catalog.is_never_grouped(role),
            right_identity: self
                .catalog
                .right_identities()
                .iter()
                .find(|ri| ri.lhs == role)
                .map(|ri| ri.rhs),
        });
    }
}

fn malformed(nid: Nid, reason: String) -> PipelineError {
    PipelineError::MalformedDefinition { nid, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use taxotome_core::GraphBuilder;
    use taxotome_store::{derive_semantic_id, MemoryStore, Stamp, ViewCoordinate};

    const STATED: PatternId = 11;

    fn stamp() -> Stamp {
        Stamp {
            status: Status::Active,
            time: Utc::now(),
            author: 1,
            module: 2,
            path: 3,
        }
    }

    fn necessary_parents(parents: &[Nid]) -> DefinitionGraph {
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::NecessarySet);
        let and = b.add(set, VertexLabel::And);
        for &p in parents {
            b.add(and, VertexLabel::ConceptRef(p));
        }
        b.build()
    }

    fn translate(catalog: &MetadataCatalog, nid: Nid, graph: &DefinitionGraph) -> Result<BTreeSet<Axiom>> {
        let model = ClassificationModel::new();
        OntologyDataBuilder::new(catalog).translate_definition(nid, graph, &model)
    }

    #[test]
    fn necessary_set_becomes_inclusion() {
        let catalog = MetadataCatalog::empty();
        let axioms = translate(&catalog, 10, &necessary_parents(&[20, 30])).unwrap();
        let expected = Axiom::inclusion(
            ConceptExpr::Concept(10),
            ConceptExpr::conjunction(vec![ConceptExpr::Concept(20), ConceptExpr::Concept(30)]),
        );
        assert_eq!(axioms, [expected].into_iter().collect());
    }

    #[test]
    fn sufficient_set_becomes_equivalence() {
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::SufficientSet);
        let and = b.add(set, VertexLabel::And);
        b.add(and, VertexLabel::ConceptRef(20));
        let some = b.add(and, VertexLabel::SomeRole(40));
        b.add(some, VertexLabel::ConceptRef(50));
        let graph = b.build();

        let catalog = MetadataCatalog::empty();
        let axioms = translate(&catalog, 10, &graph).unwrap();
        let expected = Axiom::equivalence(
            ConceptExpr::Concept(10),
            ConceptExpr::conjunction(vec![
                ConceptExpr::Concept(20),
                ConceptExpr::some(40, ConceptExpr::Concept(50)),
            ]),
        );
        assert_eq!(axioms, [expected].into_iter().collect());
    }

    #[test]
    fn role_group_lifts_never_grouped_roles() {
        let catalog = MetadataCatalog::from_toml_str(
            "role_group = 99\nnever_grouped = [41]\n",
        )
        .unwrap();
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::NecessarySet);
        let and = b.add(set, VertexLabel::And);
        b.add(and, VertexLabel::ConceptRef(20));
        let group = b.add(and, VertexLabel::RoleGroup);
        let lifted = b.add(group, VertexLabel::SomeRole(41));
        b.add(lifted, VertexLabel::ConceptRef(51));
        let grouped = b.add(group, VertexLabel::SomeRole(42));
        b.add(grouped, VertexLabel::ConceptRef(52));
        let graph = b.build();

        let axioms = translate(&catalog, 10, &graph).unwrap();
        let expected = Axiom::inclusion(
            ConceptExpr::Concept(10),
            ConceptExpr::conjunction(vec![
                ConceptExpr::Concept(20),
                ConceptExpr::some(41, ConceptExpr::Concept(51)),
                ConceptExpr::some(
                    99,
                    ConceptExpr::some(42, ConceptExpr::Concept(52)),
                ),
            ]),
        );
        assert_eq!(axioms, [expected].into_iter().collect());
    }

    #[test]
    fn existential_without_filler_is_malformed() {
        let mut b = GraphBuilder::new();
        let set = b.add(ROOT, VertexLabel::NecessarySet);
        let and = b.add(set, VertexLabel::And);
        b.add(and, VertexLabel::SomeRole(40));
        let graph = b.build();

        let catalog = MetadataCatalog::empty();
        assert!(matches!(
            translate(&catalog, 10, &graph),
            Err(PipelineError::MalformedDefinition { nid: 10, .. })
        ));
    }

    #[test]
    fn build_registers_active_and_inactive_concepts() {
        let store = Arc::new(MemoryStore::new());
        for (nid, active) in [(10, true), (11, false)] {
            let status = if active { Status::Active } else { Status::Inactive };
            store.add_concept(nid, Stamp { status, ..stamp() });
            store.add_concept(20, stamp());
            store
                .add_semantic_version(
                    derive_semantic_id(STATED, nid),
                    STATED,
                    nid,
                    SemanticField::Definition(necessary_parents(&[20])),
                    stamp(),
                )
                .unwrap();
        }

        let view = ViewCalculator::new(store, ViewCoordinate::now(1, 2, 3));
        let catalog = MetadataCatalog::empty();
        let progress = RunProgress::new();
        let report = OntologyDataBuilder::new(&catalog)
            .build(&view, STATED, &progress)
            .unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.model.active_concepts(), vec![10]);
        assert_eq!(report.model.concept_count(), 2);
        assert!(report.model.axioms_for(10).is_some());
        assert!(report.model.axioms_for(11).is_none());
        assert_eq!(progress.snapshot().extracted, 2);
        assert_eq!(progress.snapshot().translated, 1);
    }

    #[test]
    fn incremental_delta_is_exact() {
        let catalog = MetadataCatalog::empty();
        let builder = OntologyDataBuilder::new(&catalog);
        let model = ClassificationModel::new();
        model.register_concept(10, true);
        model.set_axioms(
            10,
            builder
                .translate_definition(10, &necessary_parents(&[20, 30]), &model)
                .unwrap(),
        );

        let delta = builder
            .build_incremental(10, &necessary_parents(&[20, 40]), &model)
            .unwrap();
        assert_eq!(delta.additions.len(), 1);
        assert_eq!(delta.removals.len(), 1);
        let next = model.axioms_for(10).unwrap();
        let expected = builder
            .translate_definition(10, &necessary_parents(&[20, 40]), &model)
            .unwrap();
        assert_eq!(next, expected);
    }
}
