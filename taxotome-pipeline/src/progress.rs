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

//! Run progress counters, readable from any thread while a phase runs.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Monotonic counters for the three long phases of a run.
#[derive(Debug, Default)]
pub struct RunProgress {
    extracted: AtomicUsize,
    translated: AtomicUsize,
    written: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub extracted: usize,
    pub translated: usize,
    pub written: usize,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_extracted(&self) {
        self.extracted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated(&self) {
        self.translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            extracted: self.extracted.load(Ordering::Relaxed),
            translated: self.translated.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
        }
    }
}
