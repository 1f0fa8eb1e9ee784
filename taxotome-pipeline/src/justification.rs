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

//! Entailment support
//!
//! Justifications and repairs for one entailment, linked by hitting-set
//! duality: the minimal repairs are exactly the minimal hitting sets of the
//! justification family, and vice versa. The builder accepts either family
//! and derives the other, so callers with only an explanation service or
//! only a repair service get the full picture.

use crate::{PipelineError, Result};
use std::collections::BTreeSet;
use taxotome_core::Axiom;

pub type AxiomSet = BTreeSet<Axiom>;

/// All minimal hitting sets of `family`: the inclusion-minimal sets that
/// share at least one element with every member of the family.
///
/// The empty family is hit by the empty set; a family containing an empty
/// member has no hitting set at all.
pub fn minimal_hitting_sets(family: &[AxiomSet]) -> Vec<AxiomSet> {
    if family.is_empty() {
        return vec![AxiomSet::new()];
    }
    if family.iter().any(BTreeSet::is_empty) {
        return Vec::new();
    }
    let mut results: Vec<AxiomSet> = Vec::new();
    let mut current = AxiomSet::new();
    extend_hitting_set(family, &mut current, &mut results);
    // Branch order can emit a superset before the subset that kills it.
    let mut minimal: Vec<AxiomSet> = results
        .iter()
        .filter(|r| !results.iter().any(|o| o != *r && o.is_subset(r)))
        .cloned()
        .collect();
    minimal.sort();
    minimal
}

fn extend_hitting_set(family: &[AxiomSet], current: &mut AxiomSet, results: &mut Vec<AxiomSet>) {
    if results.iter().any(|r| r.is_subset(current)) {
        return;
    }
    match family.iter().find(|member| member.is_disjoint(current)) {
        None => results.push(current.clone()),
        Some(unhit) => {
            for axiom in unhit {
                current.insert(axiom.clone());
                extend_hitting_set(family, current, results);
                current.remove(axiom);
            }
        }
    }
}

/// Justifications, repairs, and the useful axioms of one entailment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntailmentSupport {
    justifications: Vec<AxiomSet>,
    repairs: Vec<AxiomSet>,
    useful: AxiomSet,
}

impl EntailmentSupport {
    /// Minimal axiom sets each sufficient for the entailment.
    pub fn justifications(&self) -> &[AxiomSet] {
        &self.justifications
    }

    /// Minimal axiom sets whose removal each breaks the entailment.
    pub fn repairs(&self) -> &[AxiomSet] {
        &self.repairs
    }

    /// Union of all justifications, unless set explicitly.
    pub fn useful_axioms(&self) -> &AxiomSet {
        &self.useful
    }
}

/// Assembles an [`EntailmentSupport`], deriving whichever family the caller
/// did not provide.
#[derive(Debug, Default)]
pub struct EntailmentSupportBuilder {
    justifications: Vec<AxiomSet>,
    repairs: Vec<AxiomSet>,
    explicit_useful: Option<AxiomSet>,
}

impl EntailmentSupportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_justification(mut self, justification: AxiomSet) -> Self {
        self.justifications.push(justification);
        self
    }

    pub fn with_repair(mut self, repair: AxiomSet) -> Self {
        self.repairs.push(repair);
        self
    }

    /// Set the useful axioms directly. Exclusive with providing any
    /// justification or repair; mixing the two is rejected at build time.
    pub fn with_useful_axioms(mut self, useful: AxiomSet) -> Self {
        self.explicit_useful = Some(useful);
        self
    }

    pub fn build(self) -> Result<EntailmentSupport> {
        if self.explicit_useful.is_some()
            && (!self.justifications.is_empty() || !self.repairs.is_empty())
        {
            return Err(PipelineError::AmbiguousUsefulAxioms);
        }
        let (justifications, repairs) = match (
            self.justifications.is_empty(),
            self.repairs.is_empty(),
        ) {
            (false, true) => {
                let repairs = minimal_hitting_sets(&self.justifications);
                (self.justifications, repairs)
            }
            (true, false) => {
                let justifications = minimal_hitting_sets(&self.repairs);
                (justifications, self.repairs)
            }
            _ => (self.justifications, self.repairs),
        };
        let useful = match self.explicit_useful {
            Some(useful) => useful,
            None => justifications.iter().flatten().cloned().collect(),
        };
        Ok(EntailmentSupport {
            justifications,
            repairs,
            useful,
        })
    }
}
