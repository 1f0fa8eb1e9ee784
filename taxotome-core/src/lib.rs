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

//! Taxotome Core
//!
//! Fundamental data structures for the classification pipeline: dense
//! concept/role identifiers, logical definition graphs, EL++ axioms, and the
//! role metadata catalog.

pub mod axiom;
pub mod catalog;
pub mod graph;
pub mod model;
pub mod spine;

pub use axiom::{Axiom, AxiomDelta, ConceptExpr};
pub use catalog::{CatalogError, MetadataCatalog, RightIdentity};
pub use graph::{DefinitionGraph, GraphBuilder, VertexLabel, ROOT};
pub use model::{ClassificationModel, RoleInfo};
pub use spine::NidSpine;

/// Dense integer identifier for a concept, role, or other component within
/// one runtime session. Stands in for the component's stable external
/// identifier; assigned identifiers are small and contiguous so id-keyed
/// tables can be flat arrays rather than hash maps.
pub type Nid = i32;

/// Identifier for a semantic pattern (the shape shared by all semantics of
/// one kind, e.g. "stated axioms" or "inferred navigation").
pub type PatternId = u32;
