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

//! Provenance stamps and view coordinates
//!
//! Every persisted version carries a stamp (status, time, author, module,
//! path). A view coordinate fixes the point in history a run reads from:
//! "latest under coordinate" means the newest version whose stamp time is not
//! after the coordinate time. The author/module/path fields of a coordinate
//! name the provenance that stamps minted for the run will carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taxotome_core::Nid;

/// Status carried by a stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Active,
    Inactive,
}

/// Provenance record attached to every persisted version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub status: Status,
    pub time: DateTime<Utc>,
    pub author: Nid,
    pub module: Nid,
    pub path: Nid,
}

/// Point in versioned history a run reads from, plus the provenance identity
/// it writes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCoordinate {
    pub time: DateTime<Utc>,
    pub author: Nid,
    pub module: Nid,
    pub path: Nid,
}

impl ViewCoordinate {
    /// Coordinate at the present instant.
    pub fn now(author: Nid, module: Nid, path: Nid) -> Self {
        ViewCoordinate {
            time: Utc::now(),
            author,
            module,
            path,
        }
    }

    /// Whether a version stamped at `time` is visible under this coordinate.
    pub fn includes(&self, time: DateTime<Utc>) -> bool {
        time <= self.time
    }

    /// Mint a stamp for a write performed under this coordinate.
    pub fn mint_stamp(&self, status: Status, time: DateTime<Utc>) -> Stamp {
        Stamp {
            status,
            time,
            author: self.author,
            module: self.module,
            path: self.path,
        }
    }

    /// The same view, advanced to `time`. Used to report the coordinate of a
    /// completed commit.
    pub fn advanced_to(&self, time: DateTime<Utc>) -> Self {
        ViewCoordinate { time, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn coordinate_visibility_is_inclusive() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let coord = ViewCoordinate { time: t1, author: 1, module: 2, path: 3 };
        assert!(coord.includes(t0));
        assert!(coord.includes(t1));
        assert!(!coord.includes(t1 + chrono::Duration::seconds(1)));
    }

    #[test]
    fn minted_stamp_carries_coordinate_provenance() {
        let coord = ViewCoordinate::now(10, 20, 30);
        let stamp = coord.mint_stamp(Status::Active, coord.time);
        assert_eq!(stamp.author, 10);
        assert_eq!(stamp.module, 20);
        assert_eq!(stamp.path, 30);
        assert_eq!(stamp.status, Status::Active);
    }
}
