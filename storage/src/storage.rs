// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Storage for anchordb

use std::{collections::BTreeMap, fmt};

use crate::Error;

/// Prefix of every key stored under one bucket.
pub type BucketPrefix = [u8; 32];

/// A key namespace: a name plus an optional sub-label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    name: &'static str,
    label: Option<&'static str>,
}

impl Bucket {
    /// Top-level bucket.
    pub const fn new(name: &'static str) -> Self {
        Bucket { name, label: None }
    }

    /// Bucket nested under `name`.
    pub const fn labeled(name: &'static str, label: &'static str) -> Self {
        Bucket {
            name,
            label: Some(label),
        }
    }

    /// Bucket name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Optional sub-label.
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    /// The bucket's key prefix.
    pub fn prefix(&self) -> BucketPrefix {
        build_prefix(
            std::iter::once(self.name.as_bytes()).chain(self.label.map(str::as_bytes)),
        )
    }

    /// Full storage key for `key` inside this bucket.
    pub fn key(&self, key: &[u8]) -> Vec<u8> {
        make_prefixed_key(&self.prefix(), key)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label {
            Some(label) => write!(f, "{}/{}", self.name, label),
            None => f.write_str(self.name),
        }
    }
}

/// Build a 32-byte prefix identifying a sequence of path segments.
///
/// Segment lengths and count are hashed too, so `["aa", "b"]` and
/// `["a", "ab"]` get different prefixes.
pub fn build_prefix<'a, P>(path: P) -> BucketPrefix
where
    P: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = blake3::Hasher::new();
    let mut segments_count: u64 = 0;
    let mut lengths = Vec::new();

    for segment in path {
        segments_count += 1;
        hasher.update(segment);
        lengths.extend((segment.len() as u64).to_be_bytes());
    }

    hasher.update(&segments_count.to_be_bytes());
    hasher.update(&lengths);
    *hasher.finalize().as_bytes()
}

/// Concatenate a bucket prefix and a key.
pub fn make_prefixed_key(prefix: &BucketPrefix, key: &[u8]) -> Vec<u8> {
    let mut prefixed = Vec::with_capacity(prefix.len() + key.len());
    prefixed.extend_from_slice(prefix);
    prefixed.extend_from_slice(key);
    prefixed
}

/// Top-level storage abstraction.
///
/// Implementations are shared between the single writer and any number of
/// readers, so they must be `Send + Sync`.
pub trait Storage: Send + Sync {
    /// Read `key` from `bucket`.
    fn get(&self, bucket: &Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Write a single value immediately.
    fn put(&self, bucket: &Bucket, key: &[u8], value: &[u8]) -> Result<(), Error>;

    /// Apply every operation in `batch` atomically, then clear it.
    ///
    /// On error nothing from the batch is visible and the batch keeps its
    /// operations.
    fn commit_batch(&self, batch: &mut StorageBatch) -> Result<(), Error>;

    /// Flush buffered data to durable storage.
    fn flush(&self) -> Result<(), Error>;

    /// Start an empty batch.
    fn new_batch(&self) -> StorageBatch {
        StorageBatch::new()
    }

    /// Read `key`, preferring a value still pending in `batch`.
    fn get_batched(
        &self,
        batch: &StorageBatch,
        bucket: &Bucket,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        match batch.get(bucket, key) {
            Some(value) => Ok(Some(value.to_vec())),
            None => self.get(bucket, key),
        }
    }
}

/// Structure to hold deferred database operations until they are committed
/// together.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct StorageBatch {
    operations: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl StorageBatch {
    /// Create empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys written.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Batch emptiness predicate
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Add deferred `put` operation. A later put to the same key replaces
    /// the earlier one.
    pub fn put(&mut self, bucket: &Bucket, key: &[u8], value: Vec<u8>) {
        self.operations.insert(bucket.key(key), value);
    }

    /// Value pending for `key`, if any.
    pub fn get(&self, bucket: &Bucket, key: &[u8]) -> Option<&[u8]> {
        self.operations.get(&bucket.key(key)).map(Vec::as_slice)
    }

    /// Drop all pending operations.
    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Pending operations as `(prefixed key, value)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.operations
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

impl fmt::Debug for StorageBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (key, value) in &self.operations {
            list.entry(&format_args!(
                "Put {{ key: {}, value: {} }}",
                hex::encode(key),
                hex::encode(value)
            ));
        }
        list.finish()
    }
}
