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

//! Nid-keyed spine arena
//!
//! Nids are dense small integers, so id-keyed shared maps are an arena: a
//! spine of fixed-size array segments indexed directly by id, not a general
//! hash map. Negative nids are folded in by zigzag encoding, keeping small
//! magnitudes of either sign dense. Insert-or-get is safe under concurrent
//! access; only the incremental path overwrites entries, through `replace`.

use crate::Nid;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SEGMENT_BITS: usize = 10;
const SEGMENT_SIZE: usize = 1 << SEGMENT_BITS;

fn fold(nid: Nid) -> usize {
    // Zigzag: 0, -1, 1, -2, 2, ... -> 0, 1, 2, 3, 4, ...
    ((nid as i64) << 1 ^ (nid as i64) >> 63) as usize
}

type Segment<T> = Arc<RwLock<Vec<Option<T>>>>;

/// Concurrent nid-indexed arena.
pub struct NidSpine<T> {
    segments: RwLock<Vec<Segment<T>>>,
    len: AtomicUsize,
}

impl<T> NidSpine<T> {
    pub fn new() -> Self {
        NidSpine {
            segments: RwLock::new(Vec::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of occupied entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn segment(&self, index: usize) -> Segment<T> {
        let seg = index >> SEGMENT_BITS;
        {
            let segments = self.segments.read();
            if let Some(s) = segments.get(seg) {
                return Arc::clone(s);
            }
        }
        let mut segments = self.segments.write();
        while segments.len() <= seg {
            segments.push(Arc::new(RwLock::new(
                std::iter::repeat_with(|| None).take(SEGMENT_SIZE).collect(),
            )));
        }
        Arc::clone(&segments[seg])
    }

    /// Insert `value` at `nid` if the slot is empty. Returns whether the
    /// insert happened; a losing racer leaves the existing entry in place.
    pub fn insert(&self, nid: Nid, value: T) -> bool {
        let index = fold(nid);
        let segment = self.segment(index);
        let mut slots = segment.write();
        let slot = &mut slots[index & (SEGMENT_SIZE - 1)];
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.len.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Overwrite the entry at `nid`, returning the previous value. Exists
    /// for the incremental path; `insert`/`get_or_insert_with` never replace.
    pub fn replace(&self, nid: Nid, value: T) -> Option<T> {
        let index = fold(nid);
        let segment = self.segment(index);
        let mut slots = segment.write();
        let slot = &mut slots[index & (SEGMENT_SIZE - 1)];
        let previous = slot.replace(value);
        if previous.is_none() {
            self.len.fetch_add(1, Ordering::AcqRel);
        }
        previous
    }

    pub fn contains(&self, nid: Nid) -> bool {
        let index = fold(nid);
        let seg = index >> SEGMENT_BITS;
        let segments = self.segments.read();
        match segments.get(seg) {
            Some(s) => s.read()[index & (SEGMENT_SIZE - 1)].is_some(),
            None => false,
        }
    }
}

impl<T: Clone> NidSpine<T> {
    pub fn get(&self, nid: Nid) -> Option<T> {
        let index = fold(nid);
        let seg = index >> SEGMENT_BITS;
        let segments = self.segments.read();
        segments
            .get(seg)
            .and_then(|s| s.read()[index & (SEGMENT_SIZE - 1)].clone())
    }

    /// Insert-or-get without lost updates: exactly one racer's `init` value
    /// is kept, and every caller observes that value.
    pub fn get_or_insert_with(&self, nid: Nid, init: impl FnOnce() -> T) -> T {
        let index = fold(nid);
        let segment = self.segment(index);
        {
            let slots = segment.read();
            if let Some(existing) = &slots[index & (SEGMENT_SIZE - 1)] {
                return existing.clone();
            }
        }
        let mut slots = segment.write();
        let slot = &mut slots[index & (SEGMENT_SIZE - 1)];
        if let Some(existing) = slot {
            return existing.clone();
        }
        let value = init();
        *slot = Some(value.clone());
        self.len.fetch_add(1, Ordering::AcqRel);
        value
    }
}

impl<T> Default for NidSpine<T> {
    fn default() -> Self {
        Self::new()
    }
}
