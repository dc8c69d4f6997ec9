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

//! Probabilistic set and cardinality sketches with time-bounded membership.
//!
//! The crate provides:
//!
//! - [`bloom::BloomFilter`]: classic fixed-capacity membership filter.
//! - [`bloom::ScalableBloomFilter`]: geometric growth with a bounded
//!   compounded false-positive rate.
//! - [`countmin::CountMinSketch`]: frequency estimation with integrated
//!   top-K heavy-hitter tracking.
//! - [`hll::HyperLogLog`]: cardinality estimation.
//! - [`countdown::CountdownBloomFilter`]: sliding-window membership that
//!   expires entries by batched counter decrement.
//! - [`temporal::DailyTemporalBloomFilter`]: a multi-day sliding window
//!   built from per-day snapshots persisted to disk, with progressive
//!   jittered warm-up after restart and an optional durable key archive for
//!   rebuilds.
//!
//! Keys are opaque byte strings everywhere: hand in `&[u8]`, `&str`, or
//! anything `AsRef<[u8]>`. Text must be UTF-8 encoded and numbers rendered
//! in decimal before hashing; the encoding is part of the wire contract
//! because it determines every derived bit position.
//!
//! Instances are single-threaded; wrap one in a mutex to share it. Only
//! snapshot and archive operations touch I/O, and all maintenance entry
//! points are designed to be driven from a caller-owned clock loop.

pub mod bloom;
pub mod common;
pub mod countdown;
pub mod countmin;
pub mod error;
pub mod hash;
pub mod hll;
pub mod temporal;
