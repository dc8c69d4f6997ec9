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

use crate::bloom::BloomFilter;
use crate::error::Error;

const DEFAULT_INITIAL_CAPACITY: u64 = 100;
const DEFAULT_ERROR_RATE: f64 = 1e-3;
const DEFAULT_SCALE: u64 = 2;
const DEFAULT_RATIO: f64 = 0.5;

/// A Bloom filter that grows geometrically while bounding the compounded
/// false-positive rate.
///
/// Sub-filters are appended as the tail fills: each new filter has `scale`
/// times the previous capacity and `ratio` times the previous error rate, so
/// the error series converges and the overall false-positive probability
/// stays below the configured rate.
#[derive(Debug, Clone)]
pub struct ScalableBloomFilter {
    initial_capacity: u64,
    error_rate: f64,
    scale: u64,
    ratio: f64,
    filters: Vec<BloomFilter>,
}

impl Default for ScalableBloomFilter {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            error_rate: DEFAULT_ERROR_RATE,
            scale: DEFAULT_SCALE,
            ratio: DEFAULT_RATIO,
            filters: Vec::new(),
        }
    }
}

impl ScalableBloomFilter {
    /// Creates an empty filter with the default growth factors
    /// (`scale = 2`, `ratio = 0.5`).
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `initial_capacity` is zero or `error_rate` is
    /// outside `(0, 1)`.
    pub fn new(initial_capacity: u64, error_rate: f64) -> Result<Self, Error> {
        Self::with_growth(initial_capacity, error_rate, DEFAULT_SCALE, DEFAULT_RATIO)
    }

    /// Creates an empty filter with explicit growth factors.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a zero capacity or scale, an error rate outside
    /// `(0, 1)`, or a ratio outside `(0, 1)`.
    pub fn with_growth(
        initial_capacity: u64,
        error_rate: f64,
        scale: u64,
        ratio: f64,
    ) -> Result<Self, Error> {
        if initial_capacity == 0 {
            return Err(Error::invalid_parameter("initial_capacity must be positive"));
        }
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(Error::invalid_parameter("error_rate must be in (0, 1)"));
        }
        if scale == 0 {
            return Err(Error::invalid_parameter("scale must be positive"));
        }
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(Error::invalid_parameter("ratio must be in (0, 1)"));
        }
        Ok(Self {
            initial_capacity,
            error_rate,
            scale,
            ratio,
            filters: Vec::new(),
        })
    }

    /// Tests membership, querying the newest sub-filter first.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        let key = key.as_ref();
        self.filters.iter().rev().any(|f| f.contains(key))
    }

    /// Inserts `key`, reporting whether it was already present.
    ///
    /// Appends a new sub-filter when the tail has reached its capacity.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if growing produced a degenerate geometry; this
    /// cannot happen for a configuration accepted at construction.
    pub fn add(&mut self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        let key = key.as_ref();
        if self.contains(key) {
            return Ok(true);
        }
        match self.filters.last() {
            None => {
                let filter =
                    BloomFilter::new(self.initial_capacity, self.error_rate * (1.0 - self.ratio))?;
                self.filters.push(filter);
            }
            Some(tail) if tail.len() >= tail.capacity() => {
                let filter = BloomFilter::new(
                    tail.capacity() * self.scale,
                    tail.error_rate() * self.ratio,
                )?;
                self.filters.push(filter);
            }
            Some(_) => {}
        }
        if let Some(tail) = self.filters.last_mut() {
            tail.add(key);
        }
        Ok(false)
    }

    /// Returns the total capacity across sub-filters.
    pub fn capacity(&self) -> u64 {
        self.filters.iter().map(BloomFilter::capacity).sum()
    }

    /// Returns the total number of stored keys.
    pub fn len(&self) -> u64 {
        self.filters.iter().map(BloomFilter::len).sum()
    }

    /// Returns whether no key has been inserted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of sub-filters.
    pub fn nbr_filters(&self) -> usize {
        self.filters.len()
    }

    /// Returns the overall false-positive probability,
    /// `1 - prod(1 - error_i)` over the sub-filters.
    pub fn compounded_error(&self) -> f64 {
        let mut cum = 1.0;
        for filter in &self.filters {
            cum *= 1.0 - filter.error_rate();
        }
        1.0 - cum
    }

    /// Returns the per-filter capacities, oldest first.
    pub fn capacities(&self) -> Vec<u64> {
        self.filters.iter().map(BloomFilter::capacity).collect()
    }

    /// Returns the per-filter error rates, oldest first.
    pub fn error_rates(&self) -> Vec<f64> {
        self.filters.iter().map(BloomFilter::error_rate).collect()
    }
}
