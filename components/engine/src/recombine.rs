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
    time::Duration,
};

use snafu::{ensure, ResultExt};
use tokio::time::Instant;
use tracing::{debug, info};

use sunder_common::chunk_listing_prefix;
use sunder_storage::BlobStoreRef;
use sunder_utils::readable_size::ReadableSize;

use crate::err::{
    ConcatSnafu, FanInTooSmallSnafu, ListChunksSnafu, NoChunksSnafu, Result, StatSnafu,
};

/// Rebuilds a blob by concatenating its chunk objects in suffix order.
pub struct Recombiner {
    store: BlobStoreRef,
    dest_key: String,
    chunk_prefix: String,
}

/// What a join run produced.
#[derive(Debug)]
pub struct JoinSummary {
    /// Chunk objects folded into the destination.
    pub chunks: u64,
    /// Concatenation calls it took.
    pub pages: u64,
    /// Final size of the destination object.
    pub bytes_written: u64,
    pub elapsed: Duration,
}

impl Display for JoinSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "joined {} chunks ({}) in {} pages in {:.1?}",
            self.chunks,
            ReadableSize(self.bytes_written),
            self.pages,
            self.elapsed
        )
    }
}

impl Recombiner {
    pub fn new(store: BlobStoreRef, dest_key: String, chunk_prefix: String) -> Self {
        Recombiner {
            store,
            dest_key,
            chunk_prefix,
        }
    }

    /// List the chunks and fold them into the destination.
    ///
    /// Every concatenation call takes at most `fan_in - 1` chunks, leaving
    /// one slot for the accumulated destination to ride along as the first
    /// source of every call after the first.
    pub async fn run(&self) -> Result<JoinSummary> {
        let started = Instant::now();
        let fan_in = self.store.fan_in_limit();
        ensure!(fan_in >= 2, FanInTooSmallSnafu { limit: fan_in });
        let page_len = fan_in - 1;

        let prefix = chunk_listing_prefix(&self.chunk_prefix);
        let chunk_keys = self
            .store
            .list(&prefix)
            .await
            .context(ListChunksSnafu { prefix: &prefix })?;
        ensure!(!chunk_keys.is_empty(), NoChunksSnafu { prefix: &prefix });
        info!(
            "joining {} chunks under {} into {}",
            chunk_keys.len(),
            prefix,
            self.dest_key
        );

        let mut pages = 0u64;
        for (page, keys) in chunk_keys.chunks(page_len).enumerate() {
            let mut sources = Vec::with_capacity(keys.len() + 1);
            if page > 0 {
                sources.push(self.dest_key.clone());
            }
            sources.extend(keys.iter().cloned());
            debug!("page {}: {} sources", page, sources.len());
            self.store
                .concat(&self.dest_key, &sources)
                .await
                .context(ConcatSnafu { page })?;
            pages += 1;
        }

        let size = self
            .store
            .stat(&self.dest_key)
            .await
            .context(StatSnafu { key: &self.dest_key })?
            .size;
        Ok(JoinSummary {
            chunks: chunk_keys.len() as u64,
            pages,
            bytes_written: size,
            elapsed: started.elapsed(),
        })
    }
}
