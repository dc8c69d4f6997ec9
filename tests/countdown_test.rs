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

use timebloom::countdown::CountdownBloomFilter;
use timebloom::error::ErrorKind;

const BATCH_REFRESH_PERIOD: f64 = 0.1;
const EXPIRATION: f64 = 5.0;

fn make_filter() -> CountdownBloomFilter {
    CountdownBloomFilter::new(1_000, 0.02, EXPIRATION).unwrap()
}

#[test]
fn test_empty_filter() {
    let bf = make_filter();
    assert!(bf.is_empty());
    assert_eq!(bf.counters().len(), 8_148);
    assert!(bf.counters().iter().all(|&c| c == 0));
}

#[test]
fn test_add_initializes_one_cell_per_slice() {
    let mut bf = make_filter();
    assert!(!bf.add("random_uuid").unwrap());
    assert!(bf.add("random_uuid").unwrap());

    let nonzero: Vec<u8> = bf.counters().iter().copied().filter(|&c| c != 0).collect();
    assert_eq!(nonzero, vec![255u8; 6]);
    assert_eq!(bf.len(), 1);
}

#[test]
fn test_membership_survives_until_the_window_closes() {
    let mut bf = make_filter();
    bf.add("random_uuid").unwrap();

    let nbr_steps = (EXPIRATION / BATCH_REFRESH_PERIOD) as usize;
    for _ in 0..nbr_steps - 1 {
        bf.batched_expiration_maintenance(BATCH_REFRESH_PERIOD);
    }
    assert!(bf.contains("random_uuid"), "expired before the window closed");

    bf.batched_expiration_maintenance(2.0 * BATCH_REFRESH_PERIOD);
    assert!(!bf.contains("random_uuid"), "survived past the window");
}

#[test]
fn test_touch_slides_the_window() {
    let mut bf = make_filter();
    bf.add("random_uuid").unwrap();

    let nbr_steps = (EXPIRATION / BATCH_REFRESH_PERIOD) as usize;
    for _ in 0..nbr_steps - 1 {
        bf.batched_expiration_maintenance(BATCH_REFRESH_PERIOD);
    }
    assert!(bf.contains("random_uuid"));

    // Re-adding a present key refreshes every cell back to 255.
    assert!(bf.add("random_uuid").unwrap());
    let nonzero: Vec<u8> = bf.counters().iter().copied().filter(|&c| c != 0).collect();
    assert_eq!(nonzero, vec![255u8; 6]);

    // The refreshed entry survives another 3 seconds of maintenance...
    for _ in 0..30 {
        bf.batched_expiration_maintenance(BATCH_REFRESH_PERIOD);
    }
    assert!(bf.contains("random_uuid"));

    // ...and is gone once its own window has fully elapsed.
    for _ in 0..25 {
        bf.batched_expiration_maintenance(BATCH_REFRESH_PERIOD);
    }
    assert!(!bf.contains("random_uuid"));
}

#[test]
fn test_maintenance_returns_consumed_time() {
    let mut bf = make_filter();
    bf.add("random_uuid").unwrap();

    let consumed = bf.batched_expiration_maintenance(BATCH_REFRESH_PERIOD);
    assert!(consumed > 0.0 && consumed <= BATCH_REFRESH_PERIOD);
    // The remainder is less than one tick.
    assert!(BATCH_REFRESH_PERIOD - consumed < bf.refresh_time());
}

#[test]
fn test_count_estimate_follows_decay() {
    let mut bf = make_filter();
    for i in 0..500u32 {
        bf.add(i.to_string()).unwrap();
    }
    assert_eq!(bf.len(), 500);

    bf.batched_expiration_maintenance(2.5);
    for i in 500..1_000u32 {
        bf.add(i.to_string()).unwrap();
    }
    assert_eq!(bf.len(), 1_000);

    for _ in 0..26 {
        bf.batched_expiration_maintenance(BATCH_REFRESH_PERIOD);
    }
    assert_eq!(bf.len(), 492);
    assert!((bf.unset_ratio() - 0.304).abs() < 1e-3);
    assert!((bf.exact_unset_ratio() - 0.304).abs() < 1e-3);
}

#[test]
fn test_capacity_refusal_surfaces_at_capacity() {
    let mut bf = CountdownBloomFilter::new(100, 0.02, 60.0).unwrap();
    let mut refused = None;
    for i in 0..200u32 {
        if let Err(err) = bf.add(format!("key-{i}")) {
            refused = Some(err);
            break;
        }
    }
    let err = refused.expect("inserting far past capacity should refuse");
    assert_eq!(err.kind(), ErrorKind::AtCapacity);
}

#[test]
fn test_disable_hard_capacity_keeps_accepting() {
    let mut bf = CountdownBloomFilter::with_options(100, 0.02, 60.0, true).unwrap();
    for i in 0..200u32 {
        bf.add(format!("key-{i}")).unwrap();
    }
    assert!(bf.len() >= 150);
}
