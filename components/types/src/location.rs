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
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::err::{Error, MalformedLocationSnafu, Result, UnsupportedSchemeSnafu};

/// Which store backend a location addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreScheme {
    S3,
    Gcs,
    Fs,
    Memory,
}

impl StoreScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScheme::S3 => "s3",
            StoreScheme::Gcs => "gs",
            StoreScheme::Fs => "fs",
            StoreScheme::Memory => "memory",
        }
    }

    /// Bucketed schemes require a `bucket/key` remainder; the others treat
    /// the whole remainder as the key.
    pub fn is_bucketed(&self) -> bool { matches!(self, StoreScheme::S3 | StoreScheme::Gcs) }
}

/// A blob address in `scheme://bucket/key` notation, e.g.
/// `gs://corpus/raw/huge.log` or `fs:///var/data/huge.log`.
///
/// The bucket (root directory for `fs`, empty for `memory`) scopes the store
/// handle; the key addresses the blob within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLocation {
    pub scheme: StoreScheme,
    pub bucket: String,
    pub key: String,
}

impl BlobLocation {
    /// Another key inside the same store, e.g. a chunk object next to the
    /// blob it was cut from.
    pub fn sibling<K: Into<String>>(&self, key: K) -> Self {
        BlobLocation {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
            key: key.into(),
        }
    }

    /// Whether two locations resolve to the same store handle.
    pub fn same_store(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.bucket == other.bucket
    }
}

impl FromStr for BlobLocation {
    type Err = Error;

    fn from_str(url: &str) -> Result<Self> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            MalformedLocationSnafu {
                url,
                reason: "expected scheme://bucket/key notation",
            }
            .build()
        })?;

        let scheme = match scheme {
            "s3" => StoreScheme::S3,
            "gs" => StoreScheme::Gcs,
            "fs" | "file" => StoreScheme::Fs,
            "memory" | "mem" => StoreScheme::Memory,
            other => return UnsupportedSchemeSnafu { scheme: other }.fail(),
        };

        if scheme.is_bucketed() {
            let (bucket, key) = rest.split_once('/').ok_or_else(|| {
                MalformedLocationSnafu {
                    url,
                    reason: "expected a key after the bucket",
                }
                .build()
            })?;
            ensure!(
                !bucket.is_empty(),
                MalformedLocationSnafu { url, reason: "bucket is empty" }
            );
            ensure!(
                !key.is_empty(),
                MalformedLocationSnafu { url, reason: "key is empty" }
            );
            Ok(BlobLocation {
                scheme,
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        } else {
            // fs:///var/data/huge.log keeps the leading slash in the key;
            // memory://scratch/blob has no bucket at all.
            ensure!(
                !rest.is_empty(),
                MalformedLocationSnafu { url, reason: "key is empty" }
            );
            Ok(BlobLocation {
                scheme,
                bucket: String::new(),
                key: rest.to_string(),
            })
        }
    }
}

impl Display for BlobLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.scheme.is_bucketed() {
            write!(f, "{}://{}/{}", self.scheme.as_str(), self.bucket, self.key)
        } else {
            write!(f, "{}://{}", self.scheme.as_str(), self.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bucketed() {
        let loc = BlobLocation::from_str("gs://corpus/raw/huge.log").unwrap();
        assert_eq!(loc.scheme, StoreScheme::Gcs);
        assert_eq!(loc.bucket, "corpus");
        assert_eq!(loc.key, "raw/huge.log");
        assert_eq!(loc.to_string(), "gs://corpus/raw/huge.log");

        let loc = BlobLocation::from_str("s3://b/k").unwrap();
        assert_eq!(loc.scheme, StoreScheme::S3);
    }

    #[test]
    fn parse_pathlike() {
        let loc = BlobLocation::from_str("fs:///var/data/huge.log").unwrap();
        assert_eq!(loc.scheme, StoreScheme::Fs);
        assert_eq!(loc.bucket, "");
        assert_eq!(loc.key, "/var/data/huge.log");

        let loc = BlobLocation::from_str("memory://scratch/blob").unwrap();
        assert_eq!(loc.scheme, StoreScheme::Memory);
        assert_eq!(loc.key, "scratch/blob");
    }

    #[test]
    fn reject_malformed() {
        assert!(matches!(
            BlobLocation::from_str("corpus/huge.log"),
            Err(Error::MalformedLocation { .. })
        ));
        assert!(matches!(
            BlobLocation::from_str("gs://bucket-only"),
            Err(Error::MalformedLocation { .. })
        ));
        assert!(matches!(
            BlobLocation::from_str("gs://bucket/"),
            Err(Error::MalformedLocation { .. })
        ));
        assert!(matches!(
            BlobLocation::from_str("ftp://host/key"),
            Err(Error::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn sibling_shares_store() {
        let loc = BlobLocation::from_str("s3://b/dir/huge.log").unwrap();
        let chunk = loc.sibling("dir/huge.log_aa");
        assert!(loc.same_store(&chunk));
        assert_eq!(chunk.key, "dir/huge.log_aa");
    }
}
