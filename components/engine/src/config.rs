// Copyright 2026 sunder
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

use sunder_common::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS, DEFAULT_OVERSCAN, DEFAULT_SUFFIX_LENGTH,
};
use sunder_types::{Alignment, SuffixScheme};

/// How a blob gets cut into chunk objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Nominal chunk payload size in bytes.
    pub chunk_size: u64,
    /// Exact byte boundaries, or boundaries shifted to line terminators.
    pub alignment: Alignment,
    /// Shape of the per-chunk name suffixes.
    pub suffix: SuffixScheme,
    /// How far past the nominal boundary line mode searches for a
    /// terminator.
    pub overscan: u64,
    /// Fail a chunk whose search window has no terminator instead of
    /// falling back to the exact byte boundary.
    pub strict_lines: bool,
    /// Upper bound on chunk workers in flight.
    pub max_workers: usize,
    /// Cancel the rest of the job when one chunk fails.
    pub fail_fast: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            alignment: Alignment::Exact,
            suffix: SuffixScheme::alphabetic(DEFAULT_SUFFIX_LENGTH),
            overscan: DEFAULT_OVERSCAN,
            strict_lines: false,
            max_workers: DEFAULT_MAX_WORKERS,
            fail_fast: false,
        }
    }
}
