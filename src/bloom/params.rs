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

use crate::error::Error;
use crate::hash;

/// Validated sizing of a sliced Bloom-style filter.
///
/// From a capacity `n` and a target false-positive rate `p`:
/// `k = ceil(log2(1/p))` slices and
/// `m_slice = ceil(n * |ln p| / (k * ln(2)^2))` bits per slice, for a total
/// of `m = k * m_slice` bits. Shared by the classic, countdown, and daily
/// temporal filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    capacity: u64,
    error_rate: f64,
    nbr_slices: u16,
    bits_per_slice: u64,
}

impl FilterParams {
    /// Derives the slice geometry, validating the inputs.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `capacity` is zero or `error_rate` is outside
    /// `(0, 1)`.
    pub fn new(capacity: u64, error_rate: f64) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::invalid_parameter("capacity must be positive"));
        }
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(
                Error::invalid_parameter("error_rate must be in (0, 1)")
                    .with_context("error_rate", error_rate),
            );
        }

        let nbr_slices = (1.0 / error_rate).log2().ceil() as u16;
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let bits_per_slice = ((capacity as f64 * error_rate.ln().abs())
            / (nbr_slices as f64 * ln2_squared))
            .ceil() as u64;

        Ok(Self {
            capacity,
            error_rate,
            nbr_slices,
            bits_per_slice,
        })
    }

    /// Returns the capacity the geometry was sized for.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the target false-positive rate.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Returns the number of slices (`k`).
    pub fn nbr_slices(&self) -> u16 {
        self.nbr_slices
    }

    /// Returns the bits per slice (`m_slice`).
    pub fn bits_per_slice(&self) -> u64 {
        self.bits_per_slice
    }

    /// Returns the total bit length (`m`).
    pub fn nbr_bits(&self) -> u64 {
        self.nbr_slices as u64 * self.bits_per_slice
    }

    /// Returns one in-slice index per slice for `key`.
    pub fn indexes(&self, key: &[u8]) -> Vec<u64> {
        hash::slice_indexes(key, self.nbr_slices, self.bits_per_slice)
    }
}
