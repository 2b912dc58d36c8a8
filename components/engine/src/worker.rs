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

use std::{cmp::min, sync::Arc};

use bytes::Bytes;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use sunder_common::{chunk_object_key, ChunkIndex, LINE_TERMINATOR};
use sunder_storage::BlobStoreRef;
use sunder_types::{Alignment, ChunkSpec, SplitPlan};

use crate::err::{
    BoundarySnafu, CancelledSnafu, ChunkReadSnafu, ChunkWriteSnafu, Result, WindowEnd,
};

/// Everything a chunk worker needs, shared across the whole job.
pub(crate) struct SplitJob {
    pub source: BlobStoreRef,
    pub source_key: String,
    pub dest: BlobStoreRef,
    pub dest_prefix: String,
    pub plan: SplitPlan,
    pub overscan: u64,
    pub strict_lines: bool,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub(crate) struct ChunkReport {
    pub index: ChunkIndex,
    pub key: String,
    pub written: u64,
}

/// A chunk's result tagged with its index, so the job can attribute
/// failures after completion order scrambles them.
pub(crate) struct ChunkOutcome {
    pub index: ChunkIndex,
    pub result: Result<ChunkReport>,
}

/// Cut one chunk out of the source and write it as its own object.
pub(crate) async fn write_chunk(job: Arc<SplitJob>, spec: ChunkSpec) -> ChunkOutcome {
    let index = spec.index;
    let result = write_chunk_inner(&job, spec).await;
    ChunkOutcome { index, result }
}

async fn write_chunk_inner(job: &SplitJob, spec: ChunkSpec) -> Result<ChunkReport> {
    if job.cancel.is_cancelled() {
        return CancelledSnafu.fail();
    }

    let window = read_window(job, &spec).await?;
    let payload = match job.plan.alignment {
        Alignment::Exact => window,
        Alignment::Line => align_to_lines(job, &spec, window)?,
    };

    // a cancelled job should not create more objects
    if job.cancel.is_cancelled() {
        return CancelledSnafu.fail();
    }

    let key = chunk_object_key(&job.dest_prefix, &spec.suffix);
    let written = payload.len() as u64;
    job.dest
        .write(&key, payload)
        .await
        .context(ChunkWriteSnafu { index: spec.index })?;
    debug!("chunk {} -> {} ({} bytes)", spec.index, key, written);
    Ok(ChunkReport {
        index: spec.index,
        key,
        written,
    })
}

/// Read the chunk's byte range, extended past the nominal end by the
/// overscan window in line mode. The final chunk never reads past the end
/// of the source.
async fn read_window(job: &SplitJob, spec: &ChunkSpec) -> Result<Bytes> {
    let end = match job.plan.alignment {
        Alignment::Line if !job.plan.is_last(spec.index) => {
            min(spec.end() + job.overscan, job.plan.blob_size)
        }
        _ => spec.end(),
    };
    job.source
        .read_range(&job.source_key, spec.offset..end)
        .await
        .context(ChunkReadSnafu { index: spec.index })
}

/// Trim the leading partial line, which the previous chunk extended into,
/// and extend through the terminator of the line straddling the nominal
/// end. Adjacent chunks make the same decision about each shared boundary
/// because both search the same bytes for the same first terminator.
fn align_to_lines(job: &SplitJob, spec: &ChunkSpec, window: Bytes) -> Result<Bytes> {
    let nominal = spec.len as usize;
    let overscan = job.overscan as usize;

    // The first chunk owns its leading bytes.
    let lead = if spec.index == 1 {
        0
    } else {
        let search = &window[..min(overscan, window.len())];
        match find_terminator(search) {
            Some(pos) => pos + 1,
            None => {
                boundary_miss(job, spec, WindowEnd::Leading)?;
                0
            }
        }
    };

    // The final chunk runs to the end of the source.
    let trail = if job.plan.is_last(spec.index) {
        window.len()
    } else {
        let search = &window[nominal..min(nominal + overscan, window.len())];
        match find_terminator(search) {
            Some(pos) => nominal + pos + 1,
            None => {
                boundary_miss(job, spec, WindowEnd::Trailing)?;
                nominal
            }
        }
    };

    debug_assert!(lead <= trail);
    Ok(window.slice(lead..trail))
}

fn find_terminator(window: &[u8]) -> Option<usize> {
    window.iter().position(|byte| *byte == LINE_TERMINATOR)
}

fn boundary_miss(job: &SplitJob, spec: &ChunkSpec, end: WindowEnd) -> Result<()> {
    if job.strict_lines {
        return BoundarySnafu {
            index: spec.index,
            overscan: job.overscan,
            end,
        }
        .fail();
    }
    warn!(
        "chunk {}: no line terminator within {} bytes of the {} boundary, cutting at the byte boundary",
        spec.index, job.overscan, end
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use sunder_storage::{BlobStore, OpendalStore};
    use sunder_types::SuffixScheme;

    use super::*;
    use crate::err::Error;

    async fn store_with(key: &str, payload: &[u8]) -> BlobStoreRef {
        let op = opendal::Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        let sto: BlobStoreRef = Arc::new(OpendalStore::new(op));
        sto.write(key, Bytes::copy_from_slice(payload)).await.unwrap();
        sto
    }

    fn job_on(
        store: &BlobStoreRef,
        blob_size: u64,
        chunk_size: u64,
        alignment: Alignment,
        overscan: u64,
        strict_lines: bool,
    ) -> Arc<SplitJob> {
        let plan = SplitPlan::new(blob_size, chunk_size, alignment, SuffixScheme::alphabetic(2))
            .unwrap();
        Arc::new(SplitJob {
            source: store.clone(),
            source_key: "blob".to_string(),
            dest: store.clone(),
            dest_prefix: "blob".to_string(),
            plan,
            overscan,
            strict_lines,
            cancel: CancellationToken::new(),
        })
    }

    async fn read_all(store: &BlobStoreRef, key: &str) -> Vec<u8> {
        let size = store.stat(key).await.unwrap().size;
        store.read_range(key, 0..size).await.unwrap().to_vec()
    }

    async fn run_all(job: &Arc<SplitJob>) {
        for spec in job.plan.chunks() {
            write_chunk(job.clone(), spec).await.result.unwrap();
        }
    }

    #[tokio::test]
    async fn exact_chunks_carry_the_nominal_ranges() {
        let store = store_with("blob", b"abcdefghij").await;
        let job = job_on(&store, 10, 4, Alignment::Exact, 0, false);
        run_all(&job).await;

        assert_eq!(read_all(&store, "blob_aa").await, b"abcd");
        assert_eq!(read_all(&store, "blob_ab").await, b"efgh");
        assert_eq!(read_all(&store, "blob_ac").await, b"ij");
    }

    #[tokio::test]
    async fn line_chunks_break_on_terminators() {
        // terminators at offsets 4, 9 and 14; nominal cuts at 6 and 12
        let store = store_with("blob", b"aaaa\nbbbb\ncccc\n").await;
        let job = job_on(&store, 15, 6, Alignment::Line, 10, false);
        run_all(&job).await;

        assert_eq!(read_all(&store, "blob_aa").await, b"aaaa\nbbbb\n");
        assert_eq!(read_all(&store, "blob_ab").await, b"cccc\n");
        // its whole range belonged to lines the earlier chunks extended over
        assert_eq!(read_all(&store, "blob_ac").await, b"");
    }

    #[tokio::test]
    async fn line_chunks_reassemble_exactly() {
        let payload = b"one\ntwo\nthree\nfour\nfive\nsix\n";
        let store = store_with("blob", payload).await;
        let job = job_on(&store, payload.len() as u64, 5, Alignment::Line, 10, false);
        run_all(&job).await;

        let mut rebuilt = Vec::new();
        for spec in job.plan.chunks() {
            let key = chunk_object_key("blob", &spec.suffix);
            let chunk = read_all(&store, &key).await;
            if !job.plan.is_last(spec.index) && !chunk.is_empty() {
                assert_eq!(*chunk.last().unwrap(), LINE_TERMINATOR);
            }
            rebuilt.extend_from_slice(&chunk);
        }
        assert_eq!(rebuilt, payload);
    }

    #[tokio::test]
    async fn terminator_miss_falls_back_to_byte_boundaries() {
        let store = store_with("blob", b"xxxxxxxxxx").await;
        let job = job_on(&store, 10, 4, Alignment::Line, 2, false);
        run_all(&job).await;

        assert_eq!(read_all(&store, "blob_aa").await, b"xxxx");
        assert_eq!(read_all(&store, "blob_ab").await, b"xxxx");
        assert_eq!(read_all(&store, "blob_ac").await, b"xx");
    }

    #[tokio::test]
    async fn terminator_miss_fails_chunks_in_strict_mode() {
        let store = store_with("blob", b"xxxxxxxxxx").await;
        let job = job_on(&store, 10, 4, Alignment::Line, 2, true);

        let spec = job.plan.chunk(1).unwrap();
        let err = write_chunk(job.clone(), spec).await.result.unwrap_err();
        assert!(matches!(
            err,
            Error::Boundary { index: 1, end: WindowEnd::Trailing, .. }
        ));

        let spec = job.plan.chunk(2).unwrap();
        let err = write_chunk(job.clone(), spec).await.result.unwrap_err();
        assert!(matches!(
            err,
            Error::Boundary { index: 2, end: WindowEnd::Leading, .. }
        ));
    }

    #[tokio::test]
    async fn cancelled_jobs_write_nothing() {
        let store = store_with("blob", b"abcdefghij").await;
        let job = job_on(&store, 10, 4, Alignment::Exact, 0, false);
        job.cancel.cancel();

        let spec = job.plan.chunk(1).unwrap();
        let outcome = write_chunk(job.clone(), spec).await;
        assert!(matches!(outcome.result, Err(Error::Cancelled { .. })));
        assert!(store.stat("blob_aa").await.is_err());
    }
}
