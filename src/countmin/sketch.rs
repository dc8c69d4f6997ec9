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

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::error::Error;
use crate::hash;

/// A Count-Min sketch with an integrated top-K heavy-hitter tracker.
///
/// The counter matrix has `d = ceil(ln(1/delta))` rows of
/// `w = ceil(e/epsilon)` buckets. Estimates never undercount: with
/// probability `1 - delta`, the overcount is at most `epsilon` times the
/// total stream weight.
///
/// The tracker keeps the `k` keys with the largest running estimates,
/// ordered lexicographically on `(estimate, key)` so ties are deterministic.
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    nbr_buckets: u64,
    nbr_slices: u16,
    heap_capacity: usize,
    counts: Vec<i64>,
    top_k: BTreeSet<(i64, Vec<u8>)>,
    index: HashMap<Vec<u8>, i64>,
}

impl CountMinSketch {
    /// Creates a sketch for confidence `1 - delta`, relative error `epsilon`,
    /// tracking the `heap_capacity` heaviest keys.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `delta` or `epsilon` is outside `(0, 1)`.
    pub fn new(delta: f64, epsilon: f64, heap_capacity: usize) -> Result<Self, Error> {
        if !(delta > 0.0 && delta < 1.0) {
            return Err(Error::invalid_parameter("delta must be in (0, 1)"));
        }
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(Error::invalid_parameter("epsilon must be in (0, 1)"));
        }
        let nbr_buckets = (std::f64::consts::E / epsilon).ceil() as u64;
        let nbr_slices = (1.0 / delta).ln().ceil() as u16;
        Ok(Self {
            nbr_buckets,
            nbr_slices,
            heap_capacity,
            counts: vec![0; (nbr_slices as u64 * nbr_buckets) as usize],
            top_k: BTreeSet::new(),
            index: HashMap::new(),
        })
    }

    /// Returns the number of buckets per row (`w`).
    pub fn nbr_buckets(&self) -> u64 {
        self.nbr_buckets
    }

    /// Returns the number of rows (`d`).
    pub fn nbr_slices(&self) -> u16 {
        self.nbr_slices
    }

    /// Adds `increment` to the count of `key` and refreshes the top-K
    /// tracker.
    ///
    /// Returns the key evicted from the tracker, if any. A key whose new
    /// estimate does not beat the current minimum is itself reported as
    /// evicted.
    pub fn update(&mut self, key: impl AsRef<[u8]>, increment: i64) -> Option<Vec<u8>> {
        let key = key.as_ref();
        for (row, column) in self.row_columns(key).into_iter().enumerate() {
            self.counts[row * self.nbr_buckets as usize + column] += increment;
        }
        self.update_top_k(key)
    }

    /// Returns the estimated count of `key`: the minimum over its cells.
    pub fn estimate(&self, key: impl AsRef<[u8]>) -> i64 {
        let key = key.as_ref();
        let mut value = i64::MAX;
        for (row, column) in self.row_columns(key).into_iter().enumerate() {
            value = value.min(self.counts[row * self.nbr_buckets as usize + column]);
        }
        value
    }

    /// Returns the tracked heavy hitters, largest estimate first.
    pub fn top_keys(&self) -> Vec<(Vec<u8>, i64)> {
        self.top_k
            .iter()
            .rev()
            .map(|(estimate, key)| (key.clone(), *estimate))
            .collect()
    }

    fn row_columns(&self, key: &[u8]) -> Vec<usize> {
        hash::slice_indexes(key, self.nbr_slices, self.nbr_buckets)
            .into_iter()
            .map(|column| column as usize)
            .collect()
    }

    // Mirror of a bounded min-heap plus key map: overwrite-and-reorder when
    // the key is tracked, push below capacity, push-pop otherwise.
    fn update_top_k(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        if self.heap_capacity == 0 {
            return None;
        }
        let estimate = self.estimate(key);
        if let Some(&old_estimate) = self.index.get(key) {
            self.top_k.remove(&(old_estimate, key.to_vec()));
            self.top_k.insert((estimate, key.to_vec()));
            self.index.insert(key.to_vec(), estimate);
            return None;
        }
        if self.index.len() < self.heap_capacity {
            self.top_k.insert((estimate, key.to_vec()));
            self.index.insert(key.to_vec(), estimate);
            return None;
        }
        let minimum = self.top_k.first().cloned()?;
        let candidate = (estimate, key.to_vec());
        if minimum < candidate {
            self.top_k.remove(&minimum);
            self.index.remove(&minimum.1);
            self.index.insert(candidate.1.clone(), estimate);
            self.top_k.insert(candidate);
            Some(minimum.1)
        } else {
            // The candidate itself is the smallest pair; it never enters.
            Some(candidate.1)
        }
    }
}
