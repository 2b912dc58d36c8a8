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

use std::{cmp::min, ops::Range};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use opendal::Operator;
use snafu::{ensure, ResultExt};
use tracing::debug;

use sunder_common::COMPOSE_FAN_IN;

use crate::{
    blob_store::{BlobStat, BlobStore},
    err::{EmptyConcatSnafu, FanInExceededSnafu, OpenDalSnafu, Result, ShortReadSnafu},
};

/// Read slab size for the concatenation copy loop.
const COPY_BUFFER: u64 = 4 << 20;

/// Flush threshold for concatenation writes. Stays above the smallest part
/// size multipart backends accept.
const WRITE_BUFFER: usize = 8 << 20;

/// Staging keys get this appended so a half-written concatenation never
/// clobbers the destination.
const STAGING_SUFFIX: &str = ".staging";

/// [BlobStore] over any opendal-backed object store.
///
/// Concatenation is emulated client side with ranged reads and a streaming
/// writer, so it only relies on operations every backend supports.
pub struct OpendalStore {
    op: Operator,
    fan_in: usize,
}

impl OpendalStore {
    pub fn new(op: Operator) -> Self {
        OpendalStore {
            op,
            fan_in: COMPOSE_FAN_IN,
        }
    }

    /// Override the advertised concatenation fan-in, e.g. to mirror a
    /// backend-native compose limit.
    pub fn with_fan_in(mut self, fan_in: usize) -> Self {
        self.fan_in = fan_in;
        self
    }

    async fn sink(&self, key: &str) -> Result<ObjectSink> {
        let writer = self.op.writer(key).await.context(OpenDalSnafu { key })?;
        Ok(ObjectSink {
            writer,
            pending: BytesMut::new(),
            key: key.to_string(),
        })
    }

    /// Stream one object into the sink in bounded slabs.
    async fn stream_object(&self, src: &str, sink: &mut ObjectSink) -> Result<()> {
        let size = self
            .op
            .stat(src)
            .await
            .context(OpenDalSnafu { key: src })?
            .content_length();
        let mut pos = 0u64;
        while pos < size {
            let end = min(pos + COPY_BUFFER, size);
            let buf = self
                .op
                .read_with(src)
                .range(pos..end)
                .await
                .context(OpenDalSnafu { key: src })?;
            ensure!(!buf.is_empty(), ShortReadSnafu { key: src });
            pos += buf.len() as u64;
            sink.push(&buf).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for OpendalStore {
    async fn stat(&self, key: &str) -> Result<BlobStat> {
        let meta = self.op.stat(key).await.context(OpenDalSnafu { key })?;
        Ok(BlobStat {
            size: meta.content_length(),
        })
    }

    async fn read_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let buf = self
            .op
            .read_with(key)
            .range(range)
            .await
            .context(OpenDalSnafu { key })?;
        Ok(Bytes::from(buf))
    }

    async fn write(&self, key: &str, payload: Bytes) -> Result<()> {
        self.op.write(key, payload).await.context(OpenDalSnafu { key })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let (dir, leaf) = split_listing_prefix(prefix);
        let mut lister = self
            .op
            .lister(dir)
            .await
            .context(OpenDalSnafu { key: prefix })?;
        let mut keys = Vec::new();
        while let Some(entry) = lister
            .try_next()
            .await
            .context(OpenDalSnafu { key: prefix })?
        {
            if !entry.metadata().is_file() {
                continue;
            }
            if entry.name().starts_with(leaf) {
                keys.push(entry.path().to_string());
            }
        }
        // Backends do not all list in order; the callers rely on it.
        keys.sort();
        Ok(keys)
    }

    async fn concat(&self, dest: &str, sources: &[String]) -> Result<()> {
        ensure!(!sources.is_empty(), EmptyConcatSnafu);
        ensure!(
            sources.len() <= self.fan_in,
            FanInExceededSnafu {
                requested: sources.len(),
                limit: self.fan_in,
            }
        );

        // When the destination is itself a source, build under a staging
        // key first so it stays readable until the whole payload exists.
        let needs_staging = sources.iter().any(|src| src == dest);
        let target = if needs_staging {
            format!("{dest}{STAGING_SUFFIX}")
        } else {
            dest.to_string()
        };

        let mut sink = self.sink(&target).await?;
        for src in sources {
            self.stream_object(src, &mut sink).await?;
        }
        sink.finish().await?;

        if needs_staging {
            let mut sink = self.sink(dest).await?;
            self.stream_object(&target, &mut sink).await?;
            sink.finish().await?;
            self.op
                .delete(&target)
                .await
                .context(OpenDalSnafu { key: &target })?;
        }
        debug!("concatenated {} sources into {}", sources.len(), dest);
        Ok(())
    }

    fn fan_in_limit(&self) -> usize { self.fan_in }
}

/// Write side of a concatenation. Slabs are buffered so every part handed
/// to the backend meets multipart minimum sizes.
struct ObjectSink {
    writer: opendal::Writer,
    pending: BytesMut,
    key: String,
}

impl ObjectSink {
    async fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() >= WRITE_BUFFER {
            let chunk = self.pending.split().freeze();
            self.writer
                .write(chunk)
                .await
                .context(OpenDalSnafu { key: &self.key })?;
        }
        Ok(())
    }

    async fn finish(mut self) -> Result<()> {
        if !self.pending.is_empty() {
            let chunk = self.pending.split().freeze();
            self.writer
                .write(chunk)
                .await
                .context(OpenDalSnafu { key: &self.key })?;
        }
        self.writer.close().await.context(OpenDalSnafu { key: &self.key })
    }
}

/// A listing prefix like `dir/blob_` becomes its parent directory plus the
/// leaf prefix to filter entry names on.
fn split_listing_prefix(prefix: &str) -> (&str, &str) {
    match prefix.rsplit_once('/') {
        Some((dir, leaf)) => (&prefix[..dir.len() + 1], leaf),
        None => ("/", prefix),
    }
}
