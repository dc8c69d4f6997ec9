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

use googletest::assert_that;
use googletest::prelude::contains_substring;
use timebloom::bloom::BloomFilter;
use timebloom::common::random::RandomSource;
use timebloom::common::random::SplitMix64;

#[test]
fn test_sizing_matches_formulas() {
    let filter = BloomFilter::new(10_000, 0.01).unwrap();
    assert_eq!(filter.params().nbr_slices(), 7);
    assert_eq!(filter.params().nbr_bits(), 95_851);
}

#[test]
fn test_no_false_negatives_over_10k_keys() {
    let mut filter = BloomFilter::new(10_000, 0.01).unwrap();
    let mut rng = SplitMix64::seeded(0xb100_f11e);
    let keys: Vec<String> = (0..10_000).map(|_| format!("{:016x}", rng.next_u64())).collect();

    for key in &keys {
        filter.add(key);
    }
    for key in &keys {
        assert!(filter.contains(key), "lost key {key}");
    }
}

#[test]
fn test_false_positive_rate_within_twice_target() {
    let mut filter = BloomFilter::new(10_000, 0.01).unwrap();
    let mut rng = SplitMix64::seeded(0x5eed);
    for _ in 0..10_000 {
        filter.add(format!("member-{:016x}", rng.next_u64()));
    }

    let mut false_positives = 0u32;
    for _ in 0..10_000 {
        if filter.contains(format!("probe-{:016x}", rng.next_u64())) {
            false_positives += 1;
        }
    }
    let rate = false_positives as f64 / 10_000.0;
    assert!(rate < 0.02, "false positive rate {rate} exceeds 2 * target");
}

#[test]
fn test_count_tracks_distinct_insertions() {
    let mut filter = BloomFilter::new(1_000, 0.001).unwrap();
    for i in 0..500u32 {
        filter.add(format!("key-{i}"));
    }
    for i in 0..500u32 {
        filter.add(format!("key-{i}"));
    }
    assert_eq!(filter.len(), 500);
}

#[test]
fn test_construction_errors_carry_messages() {
    let err = BloomFilter::new(100, 2.0).unwrap_err();
    assert_that!(err.message(), contains_substring("error_rate"));

    let err = BloomFilter::new(0, 0.01).unwrap_err();
    assert_that!(err.message(), contains_substring("capacity"));
}
