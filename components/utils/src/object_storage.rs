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

use once_cell::sync::Lazy;
use snafu::{whatever, ResultExt, Whatever};

use sunder_types::{BlobLocation, StoreScheme};

pub type ObjectStorage = opendal::Operator;

pub type ObjectStorageError = opendal::Error;

pub fn is_not_found_error(e: &ObjectStorageError) -> bool {
    e.kind() == opendal::ErrorKind::NotFound
}

/// One shared in-memory store per process, so that every `memory://`
/// location resolved in the same run addresses the same objects.
static SHARED_MEMORY: Lazy<ObjectStorage> =
    Lazy::new(|| new_memory_store().expect("memory backend is always available"));

pub fn new_memory_store() -> Result<ObjectStorage, ObjectStorageError> {
    let builder = opendal::services::Memory::default();
    Ok(opendal::Operator::new(builder)?.finish())
}

pub fn new_fs_store(root: &str) -> Result<ObjectStorage, ObjectStorageError> {
    let mut builder = opendal::services::Fs::default();
    builder.root(root);
    Ok(opendal::Operator::new(builder)?.finish())
}

pub fn new_s3_store(bucket: &str) -> Result<ObjectStorage, ObjectStorageError> {
    let mut builder = opendal::services::S3::default();
    builder.bucket(bucket);
    // Credentials come from the standard AWS environment. An explicit
    // endpoint covers S3-compatible stores such as minio.
    if let Ok(region) = std::env::var("AWS_REGION") {
        builder.region(&region);
    }
    if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
        builder.endpoint(&endpoint);
    }
    Ok(opendal::Operator::new(builder)?.finish())
}

pub fn new_gcs_store(bucket: &str) -> Result<ObjectStorage, ObjectStorageError> {
    let mut builder = opendal::services::Gcs::default();
    builder.bucket(bucket);
    Ok(opendal::Operator::new(builder)?.finish())
}

/// Resolve a location into an operator scoped to its bucket or directory,
/// plus the key addressing the blob inside that operator.
pub fn resolve(location: &BlobLocation) -> Result<(ObjectStorage, String), Whatever> {
    match location.scheme {
        StoreScheme::S3 => {
            let op = new_s3_store(&location.bucket)
                .with_whatever_context(|e| format!("failed to open s3 store, {:?}", e))?;
            Ok((op, location.key.clone()))
        }
        StoreScheme::Gcs => {
            let op = new_gcs_store(&location.bucket)
                .with_whatever_context(|e| format!("failed to open gcs store, {:?}", e))?;
            Ok((op, location.key.clone()))
        }
        StoreScheme::Memory => Ok((SHARED_MEMORY.clone(), location.key.clone())),
        StoreScheme::Fs => {
            // Root the operator at the parent directory; the key is the
            // file name within it, so chunk objects land next to the blob.
            let path = std::path::Path::new(&location.key);
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                whatever!("{:?} does not name a file", location.key);
            };
            let root = match path.parent().and_then(|p| p.to_str()) {
                Some("") | None => ".",
                Some(parent) => parent,
            };
            let op = new_fs_store(root)
                .with_whatever_context(|e| format!("failed to open fs store, {:?}", e))?;
            Ok((op, name.to_string()))
        }
    }
}
