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

//! Countdown Bloom filter: sliding-window membership via batched counter
//! decrement.
//!
//! # Usage
//!
//! ```rust
//! use timebloom::countdown::CountdownBloomFilter;
//!
//! let mut filter = CountdownBloomFilter::new(1000, 0.02, 5.0)?;
//! filter.add("session-1")?;
//! assert!(filter.contains("session-1"));
//!
//! // Drive expiration from a maintenance loop:
//! let consumed = filter.batched_expiration_maintenance(0.1);
//! assert!(consumed <= 0.1);
//! # Ok::<(), timebloom::error::Error>(())
//! ```

mod sketch;
pub use self::sketch::CountdownBloomFilter;
