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
use snafu::ensure;

use crate::{
    err::{ChunkIndexOutOfRangeSnafu, Result, ZeroChunkSizeSnafu},
    suffix::SuffixScheme,
};
use sunder_common::{ChunkCount, ChunkIndex};

/// How chunk boundaries are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Cut at exact byte offsets.
    Exact,
    /// Shift each interior boundary to the first line terminator found
    /// within the overscan window.
    Line,
}

/// The full geometry of one split job, fixed before any chunk work starts.
///
/// `blob_size` is taken from the source's attributes once and treated as
/// immutable for the duration of the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub blob_size: u64,
    pub chunk_size: u64,
    pub alignment: Alignment,
    pub suffix: SuffixScheme,
    count: ChunkCount,
    last_chunk_size: u64,
}

impl SplitPlan {
    /// Validates the parameters and derives the chunk count and the size of
    /// the final chunk. Rejects a zero chunk size and a suffix namespace
    /// smaller than the chunk count; nothing is written on rejection.
    pub fn new(
        blob_size: u64,
        chunk_size: u64,
        alignment: Alignment,
        suffix: SuffixScheme,
    ) -> Result<Self> {
        ensure!(chunk_size > 0, ZeroChunkSizeSnafu);
        let count = blob_size.div_ceil(chunk_size);
        suffix.ensure_capacity(count)?;
        let last_chunk_size = if count == 0 {
            0
        } else {
            blob_size - (count - 1) * chunk_size
        };
        Ok(SplitPlan {
            blob_size,
            chunk_size,
            alignment,
            suffix,
            count,
            last_chunk_size,
        })
    }

    pub fn count(&self) -> ChunkCount { self.count }

    /// Size of the final chunk; equals `chunk_size` when the blob divides
    /// evenly, zero for an empty blob.
    pub fn last_chunk_size(&self) -> u64 { self.last_chunk_size }

    pub fn is_last(&self, index: ChunkIndex) -> bool { index == self.count }

    /// Geometry for a single 1-based chunk index. This is the entry point
    /// for single-chunk runs distributed across separate invocations, so
    /// the index is validated rather than assumed.
    pub fn chunk(&self, index: ChunkIndex) -> Result<ChunkSpec> {
        ensure!(
            (1..=self.count).contains(&index),
            ChunkIndexOutOfRangeSnafu { index, count: self.count }
        );
        Ok(self.spec_unchecked(index))
    }

    /// All chunk specs in index order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkSpec> + '_ {
        (1..=self.count).map(|index| self.spec_unchecked(index))
    }

    fn spec_unchecked(&self, index: ChunkIndex) -> ChunkSpec {
        let len = if index == self.count {
            self.last_chunk_size
        } else {
            self.chunk_size
        };
        ChunkSpec {
            index,
            offset: (index - 1) * self.chunk_size,
            len,
            suffix: self.suffix.render(index),
        }
    }
}

/// One chunk's nominal geometry: the source byte range `[offset,
/// offset+len)` and the name suffix of the destination object. Deterministic
/// from the plan, so re-running a chunk overwrites the same object with the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: ChunkIndex,
    pub offset: u64,
    pub len: u64,
    pub suffix: String,
}

impl ChunkSpec {
    pub fn end(&self) -> u64 { self.offset + self.len }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn exact(blob_size: u64, chunk_size: u64) -> SplitPlan {
        SplitPlan::new(
            blob_size,
            chunk_size,
            Alignment::Exact,
            SuffixScheme::alphabetic(4),
        )
        .unwrap()
    }

    #[test]
    fn counts_and_last_size() {
        // 2.5 MB in 1 MB chunks: 1_000_000 / 1_000_000 / 500_000.
        let plan = exact(2_500_000, 1_000_000);
        assert_eq!(plan.count(), 3);
        assert_eq!(plan.last_chunk_size(), 500_000);

        // exact multiple: the last chunk is full sized
        let plan = exact(4_096, 1_024);
        assert_eq!(plan.count(), 4);
        assert_eq!(plan.last_chunk_size(), 1_024);

        // smaller than one chunk
        let plan = exact(10, 1_024);
        assert_eq!(plan.count(), 1);
        assert_eq!(plan.last_chunk_size(), 10);
    }

    #[test]
    fn empty_blob_plans_zero_chunks() {
        let plan = exact(0, 1_024);
        assert_eq!(plan.count(), 0);
        assert_eq!(plan.last_chunk_size(), 0);
        assert_eq!(plan.chunks().count(), 0);
        assert!(plan.chunk(1).is_err());
    }

    #[test]
    fn chunk_sizes_sum_to_blob_size() {
        for (blob_size, chunk_size) in [(2_500_000, 1_000_000), (4_096, 1_024), (1, 5000), (99, 7)]
        {
            let plan = exact(blob_size, chunk_size);
            let total: u64 = plan.chunks().map(|c| c.len).sum();
            assert_eq!(total, blob_size, "size {blob_size} chunk {chunk_size}");
        }
    }

    #[test]
    fn chunk_geometry() {
        let plan = exact(2_500_000, 1_000_000);
        let spec = plan.chunk(2).unwrap();
        assert_eq!(spec.offset, 1_000_000);
        assert_eq!(spec.len, 1_000_000);
        assert_eq!(spec.end(), 2_000_000);
        assert_eq!(spec.suffix, "aaab");

        let last = plan.chunk(3).unwrap();
        assert_eq!(last.offset, 2_000_000);
        assert_eq!(last.len, 500_000);
        assert!(plan.is_last(last.index));
    }

    #[test]
    fn single_index_is_validated() {
        let plan = exact(2_500_000, 1_000_000);
        assert!(plan.chunk(0).is_err());
        assert!(matches!(
            plan.chunk(4),
            Err(Error::ChunkIndexOutOfRange { index: 4, count: 3, .. })
        ));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = SplitPlan::new(10, 0, Alignment::Exact, SuffixScheme::alphabetic(2));
        assert!(matches!(err, Err(Error::ZeroChunkSize { .. })));
    }

    #[test]
    fn namespace_must_hold_count() {
        // 700 chunks do not fit into 26^2 = 676 names.
        let err = SplitPlan::new(700, 1, Alignment::Exact, SuffixScheme::alphabetic(2));
        assert!(matches!(err, Err(Error::SuffixNamespaceTooSmall { .. })));
        let plan =
            SplitPlan::new(676, 1, Alignment::Exact, SuffixScheme::alphabetic(2)).unwrap();
        assert_eq!(plan.chunk(1).unwrap().suffix, "aa");
        assert_eq!(plan.chunk(676).unwrap().suffix, "zz");
    }
}
