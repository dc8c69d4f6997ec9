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

//! Daily temporal Bloom filter: a multi-day sliding window built from
//! per-day snapshots.
//!
//! # Usage
//!
//! ```rust
//! use timebloom::temporal::DailyTemporalBloomFilter;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut filter = DailyTemporalBloomFilter::new(10_000, 0.01, 7, "visitors", dir.path())?;
//! filter.add("session-1")?;
//! filter.save_snapshot(None)?;
//!
//! // After a restart, reload what the retained days persisted:
//! let mut restarted = DailyTemporalBloomFilter::new(10_000, 0.01, 7, "visitors", dir.path())?;
//! restarted.warm_all()?;
//! assert!(restarted.contains("session-1"));
//! # Ok::<(), timebloom::error::Error>(())
//! ```

mod archive;
mod serialization;
mod sketch;

pub use self::archive::ArchiveStore;
pub use self::archive::MemoryArchive;
pub use self::sketch::DailyTemporalBloomFilter;
