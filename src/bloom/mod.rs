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

//! Bloom filters for probabilistic set membership.
//!
//! [`BloomFilter`] is the classic fixed-capacity filter;
//! [`ScalableBloomFilter`] chains filters of geometrically growing capacity
//! and tightening error so the compounded false-positive rate stays below the
//! configured target.
//!
//! # Usage
//!
//! ```rust
//! use timebloom::bloom::ScalableBloomFilter;
//!
//! let mut filter = ScalableBloomFilter::new(100, 1e-3)?;
//! for i in 0..1000u32 {
//!     filter.add(i.to_string())?;
//! }
//! assert!(filter.contains("42"));
//! assert!(filter.compounded_error() <= 1e-3);
//! # Ok::<(), timebloom::error::Error>(())
//! ```

mod params;
mod scalable;
mod sketch;

pub use self::params::FilterParams;
pub use self::scalable::ScalableBloomFilter;
pub use self::sketch::BloomFilter;
