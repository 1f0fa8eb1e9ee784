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

//! Taxotome Store
//!
//! The versioned knowledge store the classification pipeline reads from and
//! writes back to: append-only concept and semantic entities, provenance
//! stamps, view coordinates, and single-commit transactions. `VersionedStore`
//! is the trait surface the pipeline depends on; `MemoryStore` is the
//! in-memory reference implementation.

pub mod memory;
pub mod semantic;
pub mod stamp;
pub mod store;
pub mod transaction;

pub use memory::MemoryStore;
pub use semantic::{
    derive_semantic_id, ConceptEntity, SemanticEntity, SemanticField, SemanticVersion,
};
pub use stamp::{Stamp, Status, ViewCoordinate};
pub use store::{StoreError, VersionedStore, ViewCalculator};
pub use transaction::{PendingWrite, Transaction};
