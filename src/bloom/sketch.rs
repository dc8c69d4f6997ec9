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
use crate::common::bits::BitSlices;
use crate::error::Error;

/// A classic sliced Bloom filter.
///
/// Membership queries have no false negatives; the false-positive probability
/// stays near the configured rate while the number of inserted keys does not
/// exceed the capacity.
///
/// # Examples
///
/// ```
/// use timebloom::bloom::BloomFilter;
///
/// let mut filter = BloomFilter::new(1000, 0.01)?;
/// assert!(!filter.add("apple"));
/// assert!(filter.add("apple"));
/// assert!(filter.contains("apple"));
/// assert!(!filter.contains("grape"));
/// # Ok::<(), timebloom::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct BloomFilter {
    params: FilterParams,
    bits: BitSlices,
    count: u64,
}

impl BloomFilter {
    /// Creates an empty filter sized for `capacity` keys at `error_rate`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `capacity` is zero or `error_rate` is outside
    /// `(0, 1)`.
    pub fn new(capacity: u64, error_rate: f64) -> Result<Self, Error> {
        let params = FilterParams::new(capacity, error_rate)?;
        let bits = BitSlices::new(params.nbr_slices(), params.bits_per_slice());
        Ok(Self {
            params,
            bits,
            count: 0,
        })
    }

    /// Tests whether `key` is possibly in the set. Never mutates.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.check_indexes(&self.params.indexes(key.as_ref()))
    }

    /// Inserts `key`, reporting whether it was already present.
    ///
    /// Returns `true` without mutation when every slice bit is already set.
    pub fn add(&mut self, key: impl AsRef<[u8]>) -> bool {
        let indexes = self.params.indexes(key.as_ref());
        if self.check_indexes(&indexes) {
            return true;
        }
        let mut offset = 0;
        for &index in &indexes {
            self.bits.set(offset + index);
            offset += self.params.bits_per_slice();
        }
        self.count += 1;
        false
    }

    /// Returns the number of successful insertions.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns whether no key has been inserted.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the capacity the filter was sized for.
    pub fn capacity(&self) -> u64 {
        self.params.capacity()
    }

    /// Returns the target false-positive rate.
    pub fn error_rate(&self) -> f64 {
        self.params.error_rate()
    }

    /// Returns the slice geometry.
    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    fn check_indexes(&self, indexes: &[u64]) -> bool {
        let mut offset = 0;
        for &index in indexes {
            if !self.bits.get(offset + index) {
                return false;
            }
            offset += self.params.bits_per_slice();
        }
        true
    }
}
