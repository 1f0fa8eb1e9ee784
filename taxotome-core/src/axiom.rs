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

//! EL++ axioms and concept expressions
//!
//! Axioms are immutable values built once per concept from its latest stated
//! definition. They are fully ordered and hashable so that axiom sets support
//! exact difference arithmetic: the incremental path of the pipeline is a set
//! diff between a concept's previous and next axiom sets.

use crate::Nid;
use std::collections::BTreeSet;

/// An EL++ concept expression.
///
/// Conjunctions are canonical: flattened, sorted, and deduplicated at
/// construction, so two expressions that denote the same conjunction are
/// equal as values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConceptExpr {
    /// A named concept.
    Concept(Nid),
    /// Conjunction of at least two distinct expressions.
    Conjunction(Vec<ConceptExpr>),
    /// Existential restriction: ∃ role . filler.
    Existential { role: Nid, filler: Box<ConceptExpr> },
}

impl ConceptExpr {
    /// Canonical conjunction of `members`: nested conjunctions are flattened,
    /// duplicates removed, members sorted. A single surviving member is
    /// returned as itself.
    ///
    /// Panics on an empty member list; translation rejects empty conjunction
    /// vertices before reaching this point.
    pub fn conjunction(members: Vec<ConceptExpr>) -> ConceptExpr {
        assert!(!members.is_empty(), "conjunction of zero members");
        let mut flat: Vec<ConceptExpr> = Vec::with_capacity(members.len());
        for m in members {
            match m {
                ConceptExpr::Conjunction(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        if flat.len() == 1 {
            flat.swap_remove(0)
        } else {
            ConceptExpr::Conjunction(flat)
        }
    }

    /// Existential restriction over a named filler or complex expression.
    pub fn some(role: Nid, filler: ConceptExpr) -> ConceptExpr {
        ConceptExpr::Existential {
            role,
            filler: Box::new(filler),
        }
    }
}

/// An immutable logical statement about concepts and roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axiom {
    /// sub ⊑ sup.
    ConceptInclusion { sub: ConceptExpr, sup: ConceptExpr },
    /// lhs ≡ rhs.
    ConceptEquivalence { lhs: ConceptExpr, rhs: ConceptExpr },
    /// lhs ∘ rhs ⊑ lhs (a right identity). Not expressible in the stated
    /// interchange format; injected from the metadata catalog.
    RoleComposition { lhs: Nid, rhs: Nid },
}

impl Axiom {
    pub fn inclusion(sub: ConceptExpr, sup: ConceptExpr) -> Axiom {
        Axiom::ConceptInclusion { sub, sup }
    }

    pub fn equivalence(lhs: ConceptExpr, rhs: ConceptExpr) -> Axiom {
        Axiom::ConceptEquivalence { lhs, rhs }
    }
}

/// Exact axiom-set difference for one concept between two versions of its
/// stated definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxiomDelta {
    pub additions: BTreeSet<Axiom>,
    pub removals: BTreeSet<Axiom>,
}

impl AxiomDelta {
    /// Difference taking `previous` to `next`.
    pub fn between(previous: &BTreeSet<Axiom>, next: &BTreeSet<Axiom>) -> AxiomDelta {
        AxiomDelta {
            additions: next.difference(previous).cloned().collect(),
            removals: previous.difference(next).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjunction_is_canonical() {
        let a = ConceptExpr::conjunction(vec![
            ConceptExpr::Concept(2),
            ConceptExpr::Concept(1),
            ConceptExpr::Concept(2),
        ]);
        let b = ConceptExpr::conjunction(vec![ConceptExpr::Concept(1), ConceptExpr::Concept(2)]);
        assert_eq!(a, b);
    }

    #[test]
    fn nested_conjunction_flattens() {
        let inner = ConceptExpr::conjunction(vec![ConceptExpr::Concept(3), ConceptExpr::Concept(4)]);
        let outer = ConceptExpr::conjunction(vec![ConceptExpr::Concept(1), inner]);
        assert_eq!(
            outer,
            ConceptExpr::Conjunction(vec![
                ConceptExpr::Concept(1),
                ConceptExpr::Concept(3),
                ConceptExpr::Concept(4),
            ])
        );
    }

    #[test]
    fn singleton_conjunction_collapses() {
        let c = ConceptExpr::conjunction(vec![ConceptExpr::Concept(7), ConceptExpr::Concept(7)]);
        assert_eq!(c, ConceptExpr::Concept(7));
    }

    #[test]
    fn delta_between_axiom_sets() {
        let old: BTreeSet<_> = [Axiom::inclusion(ConceptExpr::Concept(1), ConceptExpr::Concept(2))]
            .into_iter()
            .collect();
        let new: BTreeSet<_> = [
            Axiom::inclusion(ConceptExpr::Concept(1), ConceptExpr::Concept(2)),
            Axiom::inclusion(ConceptExpr::Concept(1), ConceptExpr::some(5, ConceptExpr::Concept(3))),
        ]
        .into_iter()
        .collect();

        let delta = AxiomDelta::between(&old, &new);
        assert_eq!(delta.additions.len(), 1);
        assert!(delta.removals.is_empty());

        let reverse = AxiomDelta::between(&new, &old);
        assert_eq!(reverse.removals.len(), 1);
        assert!(reverse.additions.is_empty());
    }
}
