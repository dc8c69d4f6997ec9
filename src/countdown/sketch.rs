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

use crate::bloom::FilterParams;
use crate::error::Error;

const COUNTER_INIT: u8 = 255;
// Target unset ratio. The filter operates near its optimal 50% fill most of
// the time and the refresh rate is only weakly sensitive to this value.
const TARGET_UNSET_RATIO: f64 = 0.5;
const MAX_UNSET_RATIO: f64 = 0.999999;

/// A countdown Bloom filter: byte counters that expire entries over a
/// sliding window via batched decrement.
///
/// Every inserted position starts at 255 and one cell is decremented per
/// refresh tick; the tick period is sized so an entry's cells statistically
/// reach zero about `expiration` seconds after insertion. Because only one
/// cell decrements at a time, membership may flicker to false slightly
/// before the full window elapses; that is part of the model, not a defect.
///
/// Re-adding a present key touches it: all of its cells reset to 255, which
/// is what slides the window.
#[derive(Debug, Clone)]
pub struct CountdownBloomFilter {
    params: FilterParams,
    cells: Vec<u8>,
    expiration: f64,
    count: u64,
    refresh_head: u64,
    estimate_z: f64,
    disable_hard_capacity: bool,
}

impl CountdownBloomFilter {
    /// Creates an empty filter expiring entries after `expiration` seconds.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `capacity` is zero, `error_rate` is outside
    /// `(0, 1)`, or `expiration` is not strictly positive.
    pub fn new(capacity: u64, error_rate: f64, expiration: f64) -> Result<Self, Error> {
        Self::with_options(capacity, error_rate, expiration, false)
    }

    /// Creates a filter, optionally disabling the hard capacity check so
    /// insertions keep succeeding past the sized capacity.
    pub fn with_options(
        capacity: u64,
        error_rate: f64,
        expiration: f64,
        disable_hard_capacity: bool,
    ) -> Result<Self, Error> {
        let params = FilterParams::new(capacity, error_rate)?;
        if !expiration.is_finite() || expiration <= 0.0 {
            return Err(Error::invalid_parameter("expiration must be positive")
                .with_context("expiration", expiration));
        }
        Ok(Self {
            cells: vec![0u8; params.nbr_bits() as usize],
            params,
            expiration,
            count: 0,
            refresh_head: 0,
            estimate_z: 0.0,
            disable_hard_capacity,
        })
    }

    /// Tests whether `key` is possibly in the set: every cell of the key's
    /// positions must be nonzero.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.check_indexes(&self.params.indexes(key.as_ref()))
    }

    /// Inserts `key`, reporting whether it was already present.
    ///
    /// A present key is touched: its cells reset to 255, sliding its
    /// expiration window forward.
    ///
    /// # Errors
    ///
    /// `AtCapacity` when the estimated count exceeds the capacity or the
    /// estimated unset ratio exceeds 0.5, unless hard capacity is disabled.
    pub fn add(&mut self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        self.insert(key.as_ref(), false)
    }

    /// Inserts `key` without the membership probe; the caller asserts the
    /// key is not present. The capacity check still applies.
    pub fn add_unchecked(&mut self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        self.insert(key.as_ref(), true)
    }

    fn insert(&mut self, key: &[u8], skip_check: bool) -> Result<bool, Error> {
        let indexes = self.params.indexes(key);
        if !skip_check && self.check_indexes(&indexes) {
            self.reset_cells(&indexes);
            return Ok(true);
        }
        if (self.count > self.params.capacity() || self.estimate_z > TARGET_UNSET_RATIO)
            && !self.disable_hard_capacity
        {
            return Err(Error::at_capacity(self.count, self.params.capacity()));
        }
        self.reset_cells(&indexes);
        self.count += 1;
        Ok(false)
    }

    fn check_indexes(&self, indexes: &[u64]) -> bool {
        let mut offset = 0;
        for &index in indexes {
            if self.cells[(offset + index) as usize] == 0 {
                return false;
            }
            offset += self.params.bits_per_slice();
        }
        true
    }

    fn reset_cells(&mut self, indexes: &[u64]) {
        let mut offset = 0;
        for &index in indexes {
            self.cells[(offset + index) as usize] = COUNTER_INIT;
            offset += self.params.bits_per_slice();
        }
    }

    /// Returns the refresh-tick period in seconds for the configured
    /// expiration delay.
    pub fn refresh_time(&self) -> f64 {
        let mut z = TARGET_UNSET_RATIO;
        if z == 0.0 {
            z = 1e-10;
        }
        let nbr_bits = self.params.nbr_bits() as f64;
        let nbr_slices = self.params.nbr_slices() as f64;
        self.expiration * (1.0 / nbr_bits)
            * (1.0 / ((COUNTER_INIT as f64 - 1.0) + (1.0 / (z * (nbr_slices + 1.0)))))
    }

    /// Returns how many refresh ticks fit in `elapsed` seconds.
    pub fn num_batched_maintenance(&self, elapsed: f64) -> u64 {
        (elapsed / self.refresh_time()).floor() as u64
    }

    /// Performs one refresh tick: decrement the cell under the refresh head
    /// if nonzero, then advance the head.
    pub fn expiration_maintenance(&mut self) {
        if self.cells[self.refresh_head as usize] != 0 {
            self.cells[self.refresh_head as usize] -= 1;
        }
        self.refresh_head = (self.refresh_head + 1) % self.params.nbr_bits();
    }

    /// Runs every refresh tick that fits in `elapsed` seconds, refreshes the
    /// unset-ratio estimate from the touched cells, and re-estimates the
    /// count.
    ///
    /// Returns the wall time actually consumed (`ticks * refresh_time`).
    /// Callers driving this from a clock should carry
    /// `elapsed - returned` into the next call to avoid drift.
    pub fn batched_expiration_maintenance(&mut self, elapsed: f64) -> f64 {
        let iterations = self.num_batched_maintenance(elapsed);
        let nbr_bits = self.params.nbr_bits();
        let mut nonzero = 0u64;
        for _ in 0..iterations {
            let cell = &mut self.cells[self.refresh_head as usize];
            if *cell != 0 {
                nonzero += 1;
                *cell -= 1;
            }
            self.refresh_head = (self.refresh_head + 1) % nbr_bits;
        }
        if iterations != 0 {
            self.estimate_z = nonzero as f64 / iterations as f64;
            self.estimate_count();
        }
        iterations as f64 * self.refresh_time()
    }

    // Re-derive the inserted count from the estimated unset ratio.
    fn estimate_count(&mut self) {
        if self.estimate_z == 0.0 {
            self.estimate_z = 1.0 / self.params.nbr_bits() as f64;
        }
        self.estimate_z = self.estimate_z.min(MAX_UNSET_RATIO);
        let nbr_bits = self.params.nbr_bits() as f64;
        let nbr_slices = self.params.nbr_slices() as f64;
        self.count = (-(nbr_bits / nbr_slices) * (1.0 - self.estimate_z).ln()) as u64;
    }

    /// Returns the estimated number of live keys.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns whether the filter holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the estimated fraction of nonzero cells.
    pub fn unset_ratio(&self) -> f64 {
        self.estimate_z
    }

    /// Returns the exact fraction of nonzero cells (full scan).
    pub fn exact_unset_ratio(&self) -> f64 {
        let nonzero = self.cells.iter().filter(|&&c| c != 0).count();
        nonzero as f64 / self.cells.len() as f64
    }

    /// Returns the raw counter cells.
    pub fn counters(&self) -> &[u8] {
        &self.cells
    }

    /// Returns the expiration window in seconds.
    pub fn expiration(&self) -> f64 {
        self.expiration
    }

    /// Returns the slice geometry.
    pub fn params(&self) -> &FilterParams {
        &self.params
    }
}
