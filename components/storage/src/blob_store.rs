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

use std::{ops::Range, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;

use crate::err::Result;

pub type BlobStoreRef = Arc<dyn BlobStore>;

/// Size metadata for one stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobStat {
    pub size: u64,
}

/// The store operations splitting and recombining are built on.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn stat(&self, key: &str) -> Result<BlobStat>;

    /// Read `range` of the object. An empty range yields an empty buffer.
    async fn read_range(&self, key: &str, range: Range<u64>) -> Result<Bytes>;

    /// Create or replace the object under `key`.
    async fn write(&self, key: &str, payload: Bytes) -> Result<()>;

    /// All object keys starting with `prefix`, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Concatenate `sources` in order into `dest`. `dest` may itself appear
    /// among the sources; its previous contents are read, not the new ones.
    async fn concat(&self, dest: &str, sources: &[String]) -> Result<()>;

    /// Upper bound on `sources` per [BlobStore::concat] call.
    fn fan_in_limit(&self) -> usize;
}
