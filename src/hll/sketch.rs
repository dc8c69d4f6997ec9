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

const PRECISION: u32 = 64;
const MIN_B: u32 = 4;
const MAX_B: u32 = 16;

/// A HyperLogLog cardinality estimator.
///
/// Uses `2^b` 8-bit registers, with `b` derived from the requested relative
/// error: `b = ceil(log2((1.04 / error_rate)^2))`. The expected relative
/// error is `1.04 / sqrt(2^b)`.
#[derive(Debug, Clone)]
pub struct HyperLogLog {
    b: u32,
    alpha: f64,
    registers: Vec<u8>,
}

impl HyperLogLog {
    /// Creates an estimator for the given relative error.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `error_rate` is outside `(0, 1)` or the derived
    /// register exponent falls outside `[4, 16]`.
    pub fn new(error_rate: f64) -> Result<Self, Error> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(Error::invalid_parameter("error_rate must be in (0, 1)"));
        }
        let b = ((1.04 / error_rate).powi(2)).log2().ceil() as u32;
        if !(MIN_B..=MAX_B).contains(&b) {
            return Err(
                Error::invalid_parameter("derived register exponent out of range [4, 16]")
                    .with_context("b", b)
                    .with_context("error_rate", error_rate),
            );
        }
        Ok(Self {
            b,
            alpha: Self::alpha(b),
            registers: vec![0u8; 1 << b],
        })
    }

    // Bias correction constant for 2^b registers.
    fn alpha(b: u32) -> f64 {
        match b {
            4 => 0.673,
            5 => 0.697,
            6 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / (1u64 << b) as f64),
        }
    }

    /// Returns the register exponent `b`.
    pub fn b(&self) -> u32 {
        self.b
    }

    /// Returns the number of registers `m = 2^b`.
    pub fn nbr_registers(&self) -> usize {
        self.registers.len()
    }

    /// Adds a key to the estimator. An empty key is a no-op.
    pub fn add(&mut self, key: impl AsRef<[u8]>) {
        let key = key.as_ref();
        if key.is_empty() {
            return;
        }
        let x = hash::hash64(key, 0);
        // The low b bits select the register; the rest carry the rank.
        let j = (x & ((1u64 << self.b) - 1)) as usize;
        let w = x >> self.b;
        let rho = Self::rho(w, PRECISION - self.b + 1);
        self.registers[j] = self.registers[j].max(rho);
    }

    // 1-indexed position of the lowest set bit, capped at max_width.
    fn rho(w: u64, max_width: u32) -> u8 {
        (w.trailing_zeros() + 1).min(max_width) as u8
    }

    /// Returns the estimated cardinality.
    ///
    /// Applies the small-range correction (linear counting over zero
    /// registers) and the large-range correction near the 64-bit hash space
    /// ceiling.
    pub fn estimate(&self) -> f64 {
        let m = self.registers.len() as f64;
        let denominator: f64 = self
            .registers
            .iter()
            .map(|&r| 2f64.powi(-(r as i32)))
            .sum();
        let raw = self.alpha * m * m / denominator;

        if raw <= 2.5 * m {
            let zeros = self.registers.iter().filter(|&&r| r == 0).count();
            if zeros > 0 {
                return m * (m / zeros as f64).ln();
            }
            return raw;
        }
        let space = 2f64.powi(PRECISION as i32);
        if raw <= space / 30.0 {
            raw
        } else {
            -space * (1.0 - raw / space).ln()
        }
    }

    /// Merges another estimator into this one by element-wise register max.
    ///
    /// # Panics
    ///
    /// Panics if the register exponents differ.
    pub fn union(&mut self, other: &HyperLogLog) {
        assert!(
            self.b == other.b,
            "cannot union estimators with different register exponents"
        );
        for (register, other_register) in self.registers.iter_mut().zip(&other.registers) {
            *register = (*register).max(*other_register);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_register_exponent_from_error_rate() {
        let hll = HyperLogLog::new(0.01).unwrap();
        assert_eq!(hll.b(), 14);
        assert_eq!(hll.nbr_registers(), 16_384);
    }

    #[test]
    fn test_alpha_table() {
        assert_eq!(HyperLogLog::alpha(4), 0.673);
        assert_eq!(HyperLogLog::alpha(5), 0.697);
        assert_eq!(HyperLogLog::alpha(6), 0.709);
        let a14 = HyperLogLog::alpha(14);
        assert!((a14 - 0.7213 / (1.0 + 1.079 / 16_384.0)).abs() < 1e-15);
    }

    #[test]
    fn test_exponent_out_of_range() {
        // Loose rates derive b < 4, tight rates b > 16.
        let err = HyperLogLog::new(0.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = HyperLogLog::new(1e-5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_empty_key_is_noop() {
        let mut hll = HyperLogLog::new(0.05).unwrap();
        hll.add("");
        assert_eq!(hll.estimate(), 0.0);
    }

    #[test]
    fn test_small_range_estimate() {
        let mut hll = HyperLogLog::new(0.01).unwrap();
        for i in 0..100u32 {
            hll.add(i.to_string());
        }
        let estimate = hll.estimate();
        assert!(
            (estimate - 100.0).abs() < 10.0,
            "estimate should be close to 100, got {estimate}"
        );
    }

    #[test]
    fn test_duplicates_do_not_inflate() {
        let mut hll = HyperLogLog::new(0.01).unwrap();
        for _ in 0..10 {
            for i in 0..100u32 {
                hll.add(i.to_string());
            }
        }
        let estimate = hll.estimate();
        assert!(
            (estimate - 100.0).abs() < 10.0,
            "duplicates should not inflate the estimate, got {estimate}"
        );
    }

    #[test]
    fn test_union_is_elementwise_max() {
        let mut a = HyperLogLog::new(0.02).unwrap();
        let mut b = HyperLogLog::new(0.02).unwrap();
        for i in 0..500u32 {
            a.add(format!("a-{i}"));
            b.add(format!("b-{i}"));
        }
        let alone = a.estimate();
        a.union(&b);
        let merged = a.estimate();
        assert!(merged > alone);
        assert!(
            (merged - 1000.0).abs() < 100.0,
            "union of disjoint sets should approach 1000, got {merged}"
        );
    }

    #[test]
    #[should_panic(expected = "different register exponents")]
    fn test_union_mismatch_panics() {
        let mut a = HyperLogLog::new(0.01).unwrap();
        let b = HyperLogLog::new(0.05).unwrap();
        a.union(&b);
    }
}
