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

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
    time::Duration,
};

use snafu::ResultExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sunder_common::ChunkIndex;
use sunder_storage::BlobStoreRef;
use sunder_types::SplitPlan;
use sunder_utils::readable_size::ReadableSize;

use crate::{
    config::SplitConfig,
    err::{Error, InvalidPlanSnafu, JoinErrSnafu, Result, StatSnafu},
    throttle::Throttle,
    worker::{write_chunk, ChunkOutcome, SplitJob},
};

/// Splits one source blob into chunk objects under a destination prefix.
///
/// The source and destination may live in different stores; each chunk
/// object's key is the prefix plus the chunk's rendered suffix.
pub struct Splitter {
    source: BlobStoreRef,
    source_key: String,
    dest: BlobStoreRef,
    dest_prefix: String,
    config: SplitConfig,
    cancel: CancellationToken,
}

/// One failed chunk, kept for the final report while the rest of the job
/// carries on.
#[derive(Debug)]
pub struct ChunkFailure {
    pub index: ChunkIndex,
    pub error: Error,
}

/// What a split run produced.
#[derive(Debug, Default)]
pub struct SplitSummary {
    /// Chunks the plan called for.
    pub planned: u64,
    /// Chunk objects written.
    pub written: u64,
    /// Payload bytes written across all chunks.
    pub bytes_written: u64,
    /// Chunks that returned an error other than cancellation.
    pub failures: Vec<ChunkFailure>,
    /// Chunks torn down by cancellation before they wrote anything.
    pub cancelled: u64,
    pub elapsed: Duration,
}

impl SplitSummary {
    /// Every planned chunk was written.
    pub fn is_complete(&self) -> bool {
        self.written == self.planned && self.failures.is_empty() && self.cancelled == 0
    }
}

impl Display for SplitSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wrote {} of {} chunks ({}) in {:.1?}",
            self.written,
            self.planned,
            ReadableSize(self.bytes_written),
            self.elapsed
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        if self.cancelled > 0 {
            write!(f, ", {} cancelled", self.cancelled)?;
        }
        Ok(())
    }
}

impl Splitter {
    pub fn new(
        source: BlobStoreRef,
        source_key: String,
        dest: BlobStoreRef,
        dest_prefix: String,
        config: SplitConfig,
    ) -> Self {
        Splitter {
            source,
            source_key,
            dest,
            dest_prefix,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that tears the job down when cancelled: no further chunks are
    /// admitted and in-flight workers bail before their write.
    pub fn cancel_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Plan from the source size and fan the chunks out across workers.
    ///
    /// A failed chunk is recorded and the rest of the job carries on,
    /// unless `fail_fast` cancels the remainder.
    pub async fn run(&self) -> Result<SplitSummary> {
        let started = Instant::now();
        let plan = self.plan().await?;
        info!(
            "splitting {} ({}) into {} chunks of {}",
            self.source_key,
            ReadableSize(plan.blob_size),
            plan.count(),
            ReadableSize(plan.chunk_size),
        );

        let job = Arc::new(self.job(plan.clone()));
        let mut throttle = Throttle::new(self.config.max_workers);
        let mut summary = SplitSummary {
            planned: plan.count(),
            ..Default::default()
        };

        for spec in plan.chunks() {
            // Absorb a completion first when the pool is full, so failures
            // can cancel the job before more work is admitted.
            while throttle.in_flight() >= self.config.max_workers {
                match throttle.join_next().await {
                    Some(joined) => self.absorb(joined.context(JoinErrSnafu)?, &mut summary),
                    None => break,
                }
            }
            if self.cancel.is_cancelled() {
                break;
            }
            throttle.admit(write_chunk(job.clone(), spec)).await;
        }

        while let Some(joined) = throttle.join_next().await {
            self.absorb(joined.context(JoinErrSnafu)?, &mut summary);
        }
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    /// Write exactly one chunk of the plan, for runs distributed across
    /// separate invocations.
    pub async fn run_single(&self, index: ChunkIndex) -> Result<SplitSummary> {
        let started = Instant::now();
        let plan = self.plan().await?;
        let spec = plan.chunk(index).context(InvalidPlanSnafu)?;
        info!(
            "splitting chunk {} of {} from {}",
            index,
            plan.count(),
            self.source_key
        );

        let job = Arc::new(self.job(plan));
        let outcome = write_chunk(job, spec).await;
        let mut summary = SplitSummary {
            planned: 1,
            ..Default::default()
        };
        self.absorb(outcome, &mut summary);
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    async fn plan(&self) -> Result<SplitPlan> {
        let stat = self
            .source
            .stat(&self.source_key)
            .await
            .context(StatSnafu { key: &self.source_key })?;
        SplitPlan::new(
            stat.size,
            self.config.chunk_size,
            self.config.alignment,
            self.config.suffix,
        )
        .context(InvalidPlanSnafu)
    }

    fn job(&self, plan: SplitPlan) -> SplitJob {
        SplitJob {
            source: self.source.clone(),
            source_key: self.source_key.clone(),
            dest: self.dest.clone(),
            dest_prefix: self.dest_prefix.clone(),
            plan,
            overscan: self.config.overscan,
            strict_lines: self.config.strict_lines,
            cancel: self.cancel.clone(),
        }
    }

    fn absorb(&self, outcome: ChunkOutcome, summary: &mut SplitSummary) {
        match outcome.result {
            Ok(report) => {
                summary.written += 1;
                summary.bytes_written += report.written;
            }
            Err(Error::Cancelled { .. }) => summary.cancelled += 1,
            Err(error) => {
                if self.config.fail_fast && !self.cancel.is_cancelled() {
                    warn!(
                        "chunk {} failed, cancelling the job: {}",
                        outcome.index, error
                    );
                    self.cancel.cancel();
                } else {
                    warn!("chunk {} failed: {}", outcome.index, error);
                }
                summary.failures.push(ChunkFailure {
                    index: outcome.index,
                    error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ops::Range,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use bytes::Bytes;
    use sunder_storage::{err::Result as StoreResult, BlobStat, BlobStore, OpendalStore};
    use sunder_types::SuffixScheme;

    use super::*;

    fn memory_store() -> BlobStoreRef {
        let op = opendal::Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        Arc::new(OpendalStore::new(op))
    }

    fn config(chunk_size: u64, max_workers: usize) -> SplitConfig {
        SplitConfig {
            chunk_size,
            suffix: SuffixScheme::alphabetic(2),
            max_workers,
            ..Default::default()
        }
    }

    /// Forwards to an inner store while tracking how many reads are in
    /// flight at once.
    struct GaugeStore {
        inner: BlobStoreRef,
        running: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl GaugeStore {
        fn new(inner: BlobStoreRef) -> Self {
            GaugeStore {
                inner,
                running: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BlobStore for GaugeStore {
        async fn stat(&self, key: &str) -> StoreResult<BlobStat> { self.inner.stat(key).await }

        async fn read_range(&self, key: &str, range: Range<u64>) -> StoreResult<Bytes> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            let res = self.inner.read_range(key, range).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            res
        }

        async fn write(&self, key: &str, payload: Bytes) -> StoreResult<()> {
            self.inner.write(key, payload).await
        }

        async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
            self.inner.list(prefix).await
        }

        async fn concat(&self, dest: &str, sources: &[String]) -> StoreResult<()> {
            self.inner.concat(dest, sources).await
        }

        fn fan_in_limit(&self) -> usize { self.inner.fan_in_limit() }
    }

    #[tokio::test]
    async fn splits_whole_blob_and_reports() {
        let store = memory_store();
        store
            .write("blob", Bytes::from_static(b"abcdefghij"))
            .await
            .unwrap();

        let splitter = Splitter::new(
            store.clone(),
            "blob".to_string(),
            store.clone(),
            "out/blob".to_string(),
            config(4, 8),
        );
        let summary = splitter.run().await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.planned, 3);
        assert_eq!(summary.written, 3);
        assert_eq!(summary.bytes_written, 10);
        assert_eq!(
            store.list("out/blob_").await.unwrap(),
            vec!["out/blob_aa", "out/blob_ab", "out/blob_ac"]
        );
    }

    #[tokio::test]
    async fn empty_blob_is_a_successful_noop() {
        let store = memory_store();
        store.write("blob", Bytes::new()).await.unwrap();

        let splitter = Splitter::new(
            store.clone(),
            "blob".to_string(),
            store.clone(),
            "blob".to_string(),
            config(4, 8),
        );
        let summary = splitter.run().await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.planned, 0);
        assert_eq!(summary.written, 0);
        assert!(store.list("blob_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_source_fails_before_any_writes() {
        let store = memory_store();
        let splitter = Splitter::new(
            store.clone(),
            "missing".to_string(),
            store.clone(),
            "missing".to_string(),
            config(4, 8),
        );
        let err = splitter.run().await.unwrap_err();
        assert!(matches!(err, Error::Stat { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_cap_bounds_concurrent_reads() {
        const CAP: usize = 3;

        let inner = memory_store();
        let payload = vec![b'x'; 4096];
        inner.write("blob", Bytes::from(payload)).await.unwrap();
        let gauge = Arc::new(GaugeStore::new(inner.clone()));

        let splitter = Splitter::new(
            gauge.clone(),
            "blob".to_string(),
            inner,
            "blob".to_string(),
            config(64, CAP),
        );
        let summary = splitter.run().await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.written, 64);
        assert!(gauge.high_water.load(Ordering::SeqCst) <= CAP);
        assert!(gauge.high_water.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn run_single_writes_only_that_chunk() {
        let store = memory_store();
        store
            .write("blob", Bytes::from_static(b"abcdefghij"))
            .await
            .unwrap();

        let splitter = Splitter::new(
            store.clone(),
            "blob".to_string(),
            store.clone(),
            "blob".to_string(),
            config(4, 8),
        );
        let summary = splitter.run_single(2).await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.planned, 1);
        assert_eq!(store.list("blob_").await.unwrap(), vec!["blob_ab"]);

        let err = splitter.run_single(4).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPlan { .. }));
    }

    #[tokio::test]
    async fn pre_cancelled_run_admits_nothing() {
        let store = memory_store();
        store
            .write("blob", Bytes::from_static(b"abcdefghij"))
            .await
            .unwrap();

        let splitter = Splitter::new(
            store.clone(),
            "blob".to_string(),
            store.clone(),
            "blob".to_string(),
            config(4, 8),
        );
        splitter.cancel_token().cancel();
        let summary = splitter.run().await.unwrap();

        assert!(!summary.is_complete());
        assert_eq!(summary.written, 0);
        assert!(store.list("blob_").await.unwrap().is_empty());
    }
}
