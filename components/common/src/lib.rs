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

pub const SUNDER: &str = "sunder";

pub const DEFAULT_CHUNK_SIZE: u64 = 1 << 20; // 1 MiB

pub const DEFAULT_SUFFIX_LENGTH: usize = 2;

// Chunk boundaries in line mode search up to this many bytes past the
// nominal boundary for a terminator; lines longer than this break the
// alignment guarantee.
pub const DEFAULT_OVERSCAN: u64 = 5000;

pub const MAX_SUFFIX_LENGTH: usize = 16;

pub const DEFAULT_MAX_WORKERS: usize = 100;

// GCS compose accepts at most 32 sources per call; the recombiner's page
// size is derived from this.
pub const COMPOSE_FAN_IN: usize = 32;

pub const LINE_TERMINATOR: u8 = b'\n';

pub const SUFFIX_SEPARATOR: char = '_';

/// Key of the chunk object for `suffix`, e.g. `huge.log` + `ab` -> `huge.log_ab`.
pub fn chunk_object_key(prefix: &str, suffix: &str) -> String {
    format!("{prefix}{SUFFIX_SEPARATOR}{suffix}")
}

/// Listing prefix that matches every chunk of `prefix` and nothing else.
pub fn chunk_listing_prefix(prefix: &str) -> String { format!("{prefix}{SUFFIX_SEPARATOR}") }

pub type ChunkIndex = u64;
pub type ChunkCount = u64;
pub type BlobSize = u64;
