// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Durable key archive for temporal filters.
//!
//! The archive is an append-only keyed log: rows are logical strings
//! `"<name>_<bucket>"` where the bucket is a day or an hour, values are the
//! archived keys themselves with empty payloads, and a TTL applies per row
//! batch. Writes are idempotent on retry precisely because the key is the
//! value. Any backend with row scans and TTL can implement it; the in-memory
//! implementation here backs the test suite and small deployments.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Duration;
use std::time::SystemTime;

use crate::error::Error;

/// Append-only keyed log with range reads and TTL.
///
/// Implementations report transient backend failures as
/// [`ArchiveUnavailable`](crate::error::ErrorKind::ArchiveUnavailable);
/// callers treat them as retryable.
pub trait ArchiveStore {
    /// Appends a batch of keys to a row. The whole batch shares one TTL.
    fn insert(&mut self, row_key: &str, keys: &[Vec<u8>], ttl: Duration) -> Result<(), Error>;

    /// Streams every live key in a row. An absent row streams nothing.
    fn range_iter<'a>(
        &'a self,
        row_key: &str,
    ) -> Result<Box<dyn Iterator<Item = Vec<u8>> + 'a>, Error>;

    /// Removes a row and all of its keys.
    fn remove(&mut self, row_key: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
struct Row {
    keys: BTreeSet<Vec<u8>>,
    expires_at: SystemTime,
}

/// In-memory [`ArchiveStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    rows: BTreeMap<String, Row>,
}

impl MemoryArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live rows.
    pub fn nbr_rows(&self) -> usize {
        let now = SystemTime::now();
        self.rows.values().filter(|row| row.expires_at > now).count()
    }
}

impl ArchiveStore for MemoryArchive {
    fn insert(&mut self, row_key: &str, keys: &[Vec<u8>], ttl: Duration) -> Result<(), Error> {
        let expires_at = SystemTime::now() + ttl;
        let row = self.rows.entry(row_key.to_string()).or_insert_with(|| Row {
            keys: BTreeSet::new(),
            expires_at,
        });
        row.keys.extend(keys.iter().cloned());
        row.expires_at = row.expires_at.max(expires_at);
        Ok(())
    }

    fn range_iter<'a>(
        &'a self,
        row_key: &str,
    ) -> Result<Box<dyn Iterator<Item = Vec<u8>> + 'a>, Error> {
        match self.rows.get(row_key) {
            Some(row) if row.expires_at > SystemTime::now() => {
                Ok(Box::new(row.keys.iter().cloned()))
            }
            _ => Ok(Box::new(std::iter::empty())),
        }
    }

    fn remove(&mut self, row_key: &str) -> Result<(), Error> {
        self.rows.remove(row_key);
        Ok(())
    }
}
