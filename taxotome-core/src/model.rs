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

//! Classification model
//!
//! The aggregate handed to the reasoner for one run: every classifiable
//! concept with its stated axioms, every role with its metadata flags, and
//! the injected role compositions. Built concurrently by the ontology data
//! builder; read-only during classification; mutated in place only by the
//! incremental path.
//!
//! Invariant: `concept_count() == active_count() + inactive_count()`. Every
//! classifiable concept is registered exactly once, as active or inactive.

use crate::axiom::{Axiom, AxiomDelta};
use crate::spine::NidSpine;
use crate::Nid;
use dashmap::DashSet;
use std::collections::BTreeSet;

/// A role with the catalog flags that apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleInfo {
    pub nid: Nid,
    pub never_grouped: bool,
    /// When set, `nid ∘ right_identity ⊑ nid` is part of the model.
    pub right_identity: Option<Nid>,
}

/// All concepts, roles, and axioms for one classification run.
#[derive(Default)]
pub struct ClassificationModel {
    concept_axioms: NidSpine<BTreeSet<Axiom>>,
    roles: NidSpine<RoleInfo>,
    role_nids: DashSet<Nid>,
    role_compositions: BTreeSet<Axiom>,
    active: DashSet<Nid>,
    inactive: DashSet<Nid>,
}

impl ClassificationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concept as part of the run; inactive concepts are counted
    /// and registered but carry no axioms. Re-registration is a no-op.
    pub fn register_concept(&self, nid: Nid, active: bool) {
        if self.active.contains(&nid) || self.inactive.contains(&nid) {
            return;
        }
        if active {
            self.active.insert(nid);
        } else {
            self.inactive.insert(nid);
        }
    }

    pub fn is_active(&self, nid: Nid) -> bool {
        self.active.contains(&nid)
    }

    /// Record the axioms translated from one concept's stated definition.
    /// Each concept is translated by exactly one worker per run.
    pub fn set_axioms(&self, nid: Nid, axioms: BTreeSet<Axiom>) {
        self.concept_axioms.insert(nid, axioms);
    }

    /// Insert-or-get role registration.
    pub fn register_role(&self, info: RoleInfo) -> RoleInfo {
        self.role_nids.insert(info.nid);
        self.roles.get_or_insert_with(info.nid, || info)
    }

    /// Replace the model's role compositions (right identities).
    pub fn set_role_compositions(&mut self, compositions: BTreeSet<Axiom>) {
        self.role_compositions = compositions;
    }

    pub fn role(&self, nid: Nid) -> Option<RoleInfo> {
        self.roles.get(nid)
    }

    pub fn role_count(&self) -> usize {
        self.role_nids.len()
    }

    pub fn axioms_for(&self, nid: Nid) -> Option<BTreeSet<Axiom>> {
        self.concept_axioms.get(nid)
    }

    pub fn role_compositions(&self) -> &BTreeSet<Axiom> {
        &self.role_compositions
    }

    /// Every registered concept, sorted.
    pub fn classifiable(&self) -> Vec<Nid> {
        let mut nids: Vec<Nid> = self.active.iter().map(|n| *n).collect();
        nids.extend(self.inactive.iter().map(|n| *n));
        nids.sort_unstable();
        nids
    }

    /// The active concepts, sorted. These are what the reasoner loads.
    pub fn active_concepts(&self) -> Vec<Nid> {
        let mut nids: Vec<Nid> = self.active.iter().map(|n| *n).collect();
        nids.sort_unstable();
        nids
    }

    pub fn is_classifiable(&self, nid: Nid) -> bool {
        self.active.contains(&nid) || self.inactive.contains(&nid)
    }

    pub fn concept_count(&self) -> usize {
        self.active.len() + self.inactive.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn inactive_count(&self) -> usize {
        self.inactive.len()
    }

    /// The model invariant: every classifiable concept is counted exactly
    /// once as active or inactive.
    pub fn counts_consistent(&self) -> bool {
        self.classifiable().len() == self.active_count() + self.inactive_count()
    }

    /// Apply an incremental delta to one concept's axiom set, returning the
    /// concept's previous axioms.
    pub fn apply_delta(&self, nid: Nid, delta: &AxiomDelta) -> BTreeSet<Axiom> {
        let previous = self.concept_axioms.get(nid).unwrap_or_default();
        let mut next = previous.clone();
        for removed in &delta.removals {
            next.remove(removed);
        }
        next.extend(delta.additions.iter().cloned());
        self.concept_axioms.replace(nid, next);
        previous
    }
}
