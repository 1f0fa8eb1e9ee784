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

//! Role metadata catalog
//!
//! Static role metadata the stated interchange format cannot carry: roles
//! that must never be placed in a role group, and right-identity role
//! compositions (lhs ∘ rhs ⊑ lhs) injected as axioms during model
//! construction. Loaded once from a TOML document and passed by reference
//! into the builder; there is no process-wide singleton.
//!
//! File format:
//!
//! ```toml
//! role_group = 609096000
//! never_grouped = [123005000, 127489000]
//!
//! [[right_identity]]
//! lhs = 363701004
//! rhs = 738774007
//! ```

use crate::Nid;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Default role-group role nid when the catalog file omits one.
pub const DEFAULT_ROLE_GROUP: Nid = 609_096_000;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("right identity lhs and rhs must differ (role {0})")]
    DegenerateRightIdentity(Nid),
}

/// A right-identity composition axiom: `lhs ∘ rhs ⊑ lhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RightIdentity {
    pub lhs: Nid,
    pub rhs: Nid,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    role_group: Option<Nid>,
    #[serde(default)]
    never_grouped: Vec<Nid>,
    #[serde(default)]
    right_identity: Vec<RightIdentity>,
}

/// Static role metadata for one classification run.
#[derive(Debug, Clone)]
pub struct MetadataCatalog {
    role_group: Nid,
    never_grouped: BTreeSet<Nid>,
    right_identities: Vec<RightIdentity>,
}

impl MetadataCatalog {
    /// Empty catalog with the default role-group role. Sufficient for models
    /// that use neither role groups nor right identities.
    pub fn empty() -> Self {
        MetadataCatalog {
            role_group: DEFAULT_ROLE_GROUP,
            never_grouped: BTreeSet::new(),
            right_identities: Vec::new(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        for ri in &file.right_identity {
            if ri.lhs == ri.rhs {
                return Err(CatalogError::DegenerateRightIdentity(ri.lhs));
            }
        }
        let catalog = MetadataCatalog {
            role_group: file.role_group.unwrap_or(DEFAULT_ROLE_GROUP),
            never_grouped: file.never_grouped.into_iter().collect(),
            right_identities: file.right_identity,
        };
        debug!(
            never_grouped = catalog.never_grouped.len(),
            right_identities = catalog.right_identities.len(),
            "loaded role metadata catalog"
        );
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The role under which grouped relationships are nested.
    pub fn role_group(&self) -> Nid {
        self.role_group
    }

    /// Whether `role` must never appear inside a role group.
    pub fn is_never_grouped(&self, role: Nid) -> bool {
        self.never_grouped.contains(&role)
    }

    /// Composition axioms to inject during model construction.
    pub fn right_identities(&self) -> &[RightIdentity] {
        &self.right_identities
    }
}

impl Default for MetadataCatalog {
    fn default() -> Self {
        Self::empty()
    }
}
