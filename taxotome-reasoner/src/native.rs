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

//! Native EL++ backend
//!
//! Completion-rule saturation over a normalized axiom set. Stated axioms are
//! normalized into five forms (atomic subsumption, conjunction subsumption,
//! told existential, existential premise, right-identity composition),
//! introducing fresh internal concepts for complex sub-expressions. A
//! worklist then closes the subsumer sets S(C) and role edges R(r) under the
//! EL completion rules. The taxonomy (direct parents, children, equivalence
//! classes, necessary normal forms) is read off the closure.
//!
//! `apply_delta` retracts the concept's previous axioms, asserts the new
//! ones, and re-saturates the session; its results are defined to be equal
//! to a cold classification of the modified model.

use crate::{ReasonerError, ReasonerService};
use ahash::{AHashMap, AHashSet};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use taxotome_core::graph::ROOT;
use taxotome_core::{
    Axiom, AxiomDelta, ClassificationModel, ConceptExpr, DefinitionGraph, GraphBuilder, Nid,
    VertexLabel,
};
use tracing::{debug, info};

pub const NATIVE_EL: &str = "native-el";

/// Internal dense concept id. Fresh ids name complex sub-expressions.
type CId = usize;
type Role = Nid;

/// The normalized axiom set for one saturation.
#[derive(Default)]
struct NormalizedModel {
    /// External name of each internal id; `None` for fresh ids.
    names: Vec<Option<Nid>>,
    ids: AHashMap<Nid, CId>,
    /// Told atomic subsumptions, indexed by the sub side.
    impls: Vec<Vec<CId>>,
    /// Conjunction subsumptions: members ⊑ head.
    conj: Vec<(Vec<CId>, CId)>,
    conj_by_member: AHashMap<CId, Vec<usize>>,
    /// Told existentials C ⊑ ∃r.D, indexed by C.
    exists_rhs: Vec<Vec<(Role, CId)>>,
    /// Existential premises ∃r.C ⊑ D, keyed by (r, C).
    exists_lhs: AHashMap<(Role, CId), Vec<CId>>,
    /// Right identities: (lhs, rhs) meaning lhs ∘ rhs ⊑ lhs.
    right_identities: AHashSet<(Role, Role)>,
}

struct Normalizer {
    m: NormalizedModel,
    neg_memo: AHashMap<ConceptExpr, CId>,
    pos_memo: AHashMap<ConceptExpr, CId>,
}

impl Normalizer {
    fn new() -> Self {
        Normalizer {
            m: NormalizedModel::default(),
            neg_memo: AHashMap::new(),
            pos_memo: AHashMap::new(),
        }
    }

    fn alloc(&mut self, name: Option<Nid>) -> CId {
        let id = self.m.names.len();
        self.m.names.push(name);
        self.m.impls.push(Vec::new());
        self.m.exists_rhs.push(Vec::new());
        id
    }

    fn concept_id(&mut self, nid: Nid) -> CId {
        if let Some(&id) = self.m.ids.get(&nid) {
            return id;
        }
        let id = self.alloc(Some(nid));
        self.m.ids.insert(nid, id);
        id
    }

    fn add_axiom(&mut self, axiom: &Axiom) {
        match axiom {
            Axiom::ConceptInclusion { sub, sup } => self.add_inclusion(sub, sup),
            Axiom::ConceptEquivalence { lhs, rhs } => {
                self.add_inclusion(lhs, rhs);
                self.add_inclusion(rhs, lhs);
            }
            Axiom::RoleComposition { lhs, rhs } => {
                self.m.right_identities.insert((*lhs, *rhs));
            }
        }
    }

    fn add_inclusion(&mut self, sub: &ConceptExpr, sup: &ConceptExpr) {
        let s = self.norm_neg(sub);
        self.add_pos(sup, s);
    }

    /// Name `expr` in premise position: the returned id lands in S(X) for
    /// every X subsumed by `expr`.
    fn norm_neg(&mut self, expr: &ConceptExpr) -> CId {
        if let ConceptExpr::Concept(nid) = expr {
            return self.concept_id(*nid);
        }
        if let Some(&id) = self.neg_memo.get(expr) {
            return id;
        }
        let id = match expr {
            ConceptExpr::Concept(_) => unreachable!("handled above"),
            ConceptExpr::Conjunction(members) => {
                let member_ids: Vec<CId> = members.iter().map(|m| self.norm_neg(m)).collect();
                let head = self.alloc(None);
                let index = self.m.conj.len();
                for &m in &member_ids {
                    self.m.conj_by_member.entry(m).or_default().push(index);
                }
                self.m.conj.push((member_ids, head));
                head
            }
            ConceptExpr::Existential { role, filler } => {
                let f = self.norm_neg(filler);
                let head = self.alloc(None);
                self.m.exists_lhs.entry((*role, f)).or_default().push(head);
                head
            }
        };
        self.neg_memo.insert(expr.clone(), id);
        id
    }

    /// Assert `sub ⊑ expr` with `expr` in conclusion position.
    fn add_pos(&mut self, expr: &ConceptExpr, sub: CId) {
        match expr {
            ConceptExpr::Concept(nid) => {
                let sup = self.concept_id(*nid);
                self.m.impls[sub].push(sup);
            }
            ConceptExpr::Conjunction(members) => {
                for member in members {
                    self.add_pos(member, sub);
                }
            }
            ConceptExpr::Existential { role, filler } => {
                let f = self.pos_name(filler);
                self.m.exists_rhs[sub].push((*role, f));
            }
        }
    }

    /// Name `expr` in filler position: the returned id carries `expr`'s
    /// decomposition in its own subsumer set.
    fn pos_name(&mut self, expr: &ConceptExpr) -> CId {
        if let ConceptExpr::Concept(nid) = expr {
            return self.concept_id(*nid);
        }
        if let Some(&id) = self.pos_memo.get(expr) {
            return id;
        }
        let id = self.alloc(None);
        self.add_pos(expr, id);
        // The fresh filler must also be recognizable as an instance of the
        // expression it names, so premise-side structure applies to it too.
        let neg = self.norm_neg(expr);
        self.m.impls[id].push(neg);
        self.pos_memo.insert(expr.clone(), id);
        id
    }

    fn finish(self) -> NormalizedModel {
        self.m
    }
}

/// Saturated closure: subsumer sets and role edges.
struct Closure {
    subs: Vec<AHashSet<CId>>,
    succs: Vec<Vec<(Role, CId)>>,
    preds: Vec<Vec<(Role, CId)>>,
    edges: AHashSet<(Role, CId, CId)>,
}

enum Item {
    Sub(CId, CId),
    Edge(Role, CId, CId),
}

fn saturate(m: &NormalizedModel) -> Closure {
    let n = m.names.len();
    let mut cl = Closure {
        subs: vec![AHashSet::new(); n],
        succs: vec![Vec::new(); n],
        preds: vec![Vec::new(); n],
        edges: AHashSet::new(),
    };
    let mut queue: VecDeque<Item> = (0..n).map(|c| Item::Sub(c, c)).collect();

    while let Some(item) = queue.pop_front() {
        match item {
            Item::Sub(c, d) => {
                if !cl.subs[c].insert(d) {
                    continue;
                }
                for &e in &m.impls[d] {
                    queue.push_back(Item::Sub(c, e));
                }
                if let Some(indices) = m.conj_by_member.get(&d) {
                    for &ci in indices {
                        let (members, head) = &m.conj[ci];
                        if members.iter().all(|member| cl.subs[c].contains(member)) {
                            queue.push_back(Item::Sub(c, *head));
                        }
                    }
                }
                for &(r, e) in &m.exists_rhs[d] {
                    queue.push_back(Item::Edge(r, c, e));
                }
                // A new subsumer of c can complete an existential premise for
                // any predecessor edge into c.
                for &(r, p) in &cl.preds[c].clone() {
                    if let Some(heads) = m.exists_lhs.get(&(r, d)) {
                        for &f in heads {
                            queue.push_back(Item::Sub(p, f));
                        }
                    }
                }
            }
            Item::Edge(r, c, d) => {
                if !cl.edges.insert((r, c, d)) {
                    continue;
                }
                cl.succs[c].push((r, d));
                cl.preds[d].push((r, c));
                for e in cl.subs[d].clone() {
                    if let Some(heads) = m.exists_lhs.get(&(r, e)) {
                        for &f in heads {
                            queue.push_back(Item::Sub(c, f));
                        }
                    }
                }
                // Right identities: r ∘ r2 ⊑ r.
                for (r2, e) in cl.succs[d].clone() {
                    if m.right_identities.contains(&(r, r2)) {
                        queue.push_back(Item::Edge(r, c, e));
                    }
                }
                for (r1, b) in cl.preds[c].clone() {
                    if m.right_identities.contains(&(r1, r)) {
                        queue.push_back(Item::Edge(r1, b, d));
                    }
                }
            }
        }
    }
    cl
}

/// Query-ready classification results.
struct Taxonomy {
    parents: BTreeMap<Nid, BTreeSet<Nid>>,
    children: BTreeMap<Nid, BTreeSet<Nid>>,
    equivalents: BTreeMap<Nid, BTreeSet<Nid>>,
    nnf: BTreeMap<Nid, DefinitionGraph>,
}

fn build_taxonomy(m: &NormalizedModel, cl: &Closure, concepts: &BTreeSet<Nid>) -> Taxonomy {
    let named = |c: CId| m.names[c].filter(|n| concepts.contains(n));

    let mut parents: BTreeMap<Nid, BTreeSet<Nid>> = BTreeMap::new();
    let mut children: BTreeMap<Nid, BTreeSet<Nid>> = BTreeMap::new();
    let mut equivalents: BTreeMap<Nid, BTreeSet<Nid>> = BTreeMap::new();
    let mut nnf = BTreeMap::new();

    for &nid in concepts {
        children.entry(nid).or_default();
    }

    for &nid in concepts {
        let c = m.ids[&nid];
        let mut equiv: BTreeSet<Nid> = [nid].into_iter().collect();
        // Strict named subsumers with their internal ids.
        let mut strict: Vec<(Nid, CId)> = Vec::new();
        for &d in &cl.subs[c] {
            let Some(dn) = named(d) else { continue };
            if dn == nid {
                continue;
            }
            if cl.subs[d].contains(&c) {
                equiv.insert(dn);
            } else {
                strict.push((dn, d));
            }
        }

        // Direct parents: strict subsumers not strictly above another
        // strict subsumer.
        let direct: BTreeSet<Nid> = strict
            .iter()
            .filter(|(_, d)| {
                !strict
                    .iter()
                    .any(|(_, e)| e != d && cl.subs[*e].contains(d) && !cl.subs[*d].contains(e))
            })
            .map(|(dn, _)| *dn)
            .collect();

        for &p in &direct {
            children.entry(p).or_default().insert(nid);
        }
        nnf.insert(nid, synthesize_nnf(m, cl, concepts, c, &direct));
        parents.insert(nid, direct);
        equivalents.insert(nid, equiv);
    }

    Taxonomy { parents, children, equivalents, nnf }
}

/// Keep only the most specific edge per role: an edge is dropped when a
/// sibling edge on the same role has a strictly more specific target.
fn minimal_edges(cl: &Closure, c: CId) -> Vec<(Role, CId)> {
    let all = &cl.succs[c];
    let mut kept: Vec<(Role, CId)> = Vec::new();
    for &(r, g) in all {
        let redundant = all.iter().any(|&(r2, g2)| {
            r2 == r && g2 != g && cl.subs[g2].contains(&g) && !cl.subs[g].contains(&g2)
        });
        if !redundant && !kept.contains(&(r, g)) {
            kept.push((r, g));
        }
    }
    kept
}

/// Most specific named subsumers of `c`.
fn minimal_named_subsumers(
    m: &NormalizedModel,
    cl: &Closure,
    concepts: &BTreeSet<Nid>,
    c: CId,
) -> BTreeSet<Nid> {
    let named: Vec<(Nid, CId)> = cl.subs[c]
        .iter()
        .filter_map(|&d| m.names[d].filter(|n| concepts.contains(n)).map(|n| (n, d)))
        .collect();
    named
        .iter()
        .filter(|(_, d)| {
            !named
                .iter()
                .any(|(_, e)| e != d && cl.subs[*e].contains(d) && !cl.subs[*d].contains(e))
        })
        .map(|(n, _)| *n)
        .collect()
}

/// Render an internal filler id back into a concept expression.
fn render_filler(
    m: &NormalizedModel,
    cl: &Closure,
    concepts: &BTreeSet<Nid>,
    c: CId,
    visiting: &mut Vec<CId>,
) -> Option<ConceptExpr> {
    if let Some(nid) = m.names[c].filter(|n| concepts.contains(n)) {
        return Some(ConceptExpr::Concept(nid));
    }
    if visiting.contains(&c) {
        return None;
    }
    visiting.push(c);
    let mut parts: Vec<ConceptExpr> = minimal_named_subsumers(m, cl, concepts, c)
        .into_iter()
        .map(ConceptExpr::Concept)
        .collect();
    for (r, g) in minimal_edges(cl, c) {
        if let Some(filler) = render_filler(m, cl, concepts, g, visiting) {
            parts.push(ConceptExpr::some(r, filler));
        }
    }
    visiting.pop();
    if parts.is_empty() {
        None
    } else {
        Some(ConceptExpr::conjunction(parts))
    }
}

/// Necessary normal form of one concept: its direct parents plus its most
/// specific entailed relationships, as a definition graph.
fn synthesize_nnf(
    m: &NormalizedModel,
    cl: &Closure,
    concepts: &BTreeSet<Nid>,
    c: CId,
    parents: &BTreeSet<Nid>,
) -> DefinitionGraph {
    let mut relationships: BTreeSet<(Role, ConceptExpr)> = BTreeSet::new();
    for (r, g) in minimal_edges(cl, c) {
        let mut visiting = vec![c];
        if let Some(filler) = render_filler(m, cl, concepts, g, &mut visiting) {
            relationships.insert((r, filler));
        }
    }

    let mut b = GraphBuilder::new();
    let set = b.add(ROOT, VertexLabel::NecessarySet);
    let and = b.add(set, VertexLabel::And);
    for &p in parents {
        b.add(and, VertexLabel::ConceptRef(p));
    }
    for (role, filler) in &relationships {
        let some = b.add(and, VertexLabel::SomeRole(*role));
        emit_expr(&mut b, some, filler);
    }
    b.build()
}

fn emit_expr(b: &mut GraphBuilder, parent: u32, expr: &ConceptExpr) {
    match expr {
        ConceptExpr::Concept(nid) => {
            b.add(parent, VertexLabel::ConceptRef(*nid));
        }
        ConceptExpr::Conjunction(members) => {
            let and = b.add(parent, VertexLabel::And);
            for member in members {
                emit_expr(b, and, member);
            }
        }
        ConceptExpr::Existential { role, filler } => {
            let some = b.add(parent, VertexLabel::SomeRole(*role));
            emit_expr(b, some, filler);
        }
    }
}

/// The built-in EL++ saturation backend.
pub struct NativeElReasoner {
    axioms: BTreeMap<Nid, BTreeSet<Axiom>>,
    compositions: BTreeSet<Axiom>,
    concepts: BTreeSet<Nid>,
    taxonomy: Option<Taxonomy>,
}

impl NativeElReasoner {
    pub fn new() -> Self {
        NativeElReasoner {
            axioms: BTreeMap::new(),
            compositions: BTreeSet::new(),
            concepts: BTreeSet::new(),
            taxonomy: None,
        }
    }

    fn resaturate(&mut self) {
        let mut nz = Normalizer::new();
        for &nid in &self.concepts {
            nz.concept_id(nid);
        }
        for axioms in self.axioms.values() {
            for axiom in axioms {
                nz.add_axiom(axiom);
            }
        }
        for axiom in &self.compositions {
            nz.add_axiom(axiom);
        }
        let m = nz.finish();
        let cl = saturate(&m);
        debug!(
            internal_concepts = m.names.len(),
            edges = cl.edges.len(),
            "saturation complete"
        );
        self.taxonomy = Some(build_taxonomy(&m, &cl, &self.concepts));
    }
}

impl Default for NativeElReasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasonerService for NativeElReasoner {
    fn name(&self) -> &'static str {
        NATIVE_EL
    }

    fn supports_incremental(&self) -> bool {
        true
    }

    fn load(&mut self, model: &ClassificationModel) -> Result<(), ReasonerError> {
        self.concepts = model.active_concepts().into_iter().collect();
        self.axioms.clear();
        for &nid in &self.concepts {
            if let Some(axioms) = model.axioms_for(nid) {
                self.axioms.insert(nid, axioms);
            }
        }
        self.compositions = model.role_compositions().clone();
        self.taxonomy = None;
        info!(
            concepts = self.concepts.len(),
            compositions = self.compositions.len(),
            "model loaded into native EL backend"
        );
        Ok(())
    }

    fn classify(&mut self) -> Result<(), ReasonerError> {
        if self.concepts.is_empty() && self.axioms.is_empty() {
            return Err(ReasonerError::ModelNotLoaded);
        }
        self.resaturate();
        Ok(())
    }

    fn apply_delta(&mut self, nid: Nid, delta: &AxiomDelta) -> Result<(), ReasonerError> {
        if self.taxonomy.is_none() {
            return Err(ReasonerError::ModelNotLoaded);
        }
        let entry = self.axioms.entry(nid).or_default();
        for removed in &delta.removals {
            entry.remove(removed);
        }
        entry.extend(delta.additions.iter().cloned());
        self.concepts.insert(nid);
        self.resaturate();
        Ok(())
    }

    fn parents(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
        self.taxonomy.as_ref()?.parents.get(&nid).cloned()
    }

    fn children(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
        self.taxonomy.as_ref()?.children.get(&nid).cloned()
    }

    fn equivalents(&self, nid: Nid) -> Option<BTreeSet<Nid>> {
        self.taxonomy.as_ref()?.equivalents.get(&nid).cloned()
    }

    fn necessary_normal_form(&self, nid: Nid) -> Option<DefinitionGraph> {
        self.taxonomy.as_ref()?.nnf.get(&nid).cloned()
    }

    fn concept_set(&self) -> Vec<Nid> {
        self.concepts.iter().copied().collect()
    }

    fn concept_count(&self) -> usize {
        self.concepts.len()
    }
}
