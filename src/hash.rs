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

//! Key hashing for all sketches.
//!
//! Every structure in this crate derives its positions from the same
//! primitive: a seeded 64-bit MurmurHash3. Multiple positions for one key are
//! produced by chaining, where each hash seeds the next, so a single key needs
//! exactly one hash evaluation per slice.
//!
//! Keys are opaque octet strings. Callers hashing text must encode it (UTF-8)
//! before handing it in; the byte encoding is part of the wire contract
//! because it determines every index this module produces.

/// Returns the seeded 64-bit hash of `key`.
///
/// Takes the first value of MurmurHash3 x64-128 and reinterprets its
/// little-endian bytes as a big-endian unsigned integer. The byte swap is part
/// of the on-disk and archive contract: snapshot compatibility requires every
/// producer to map keys to the same indices.
pub fn hash64(key: &[u8], seed: u32) -> u64 {
    let (h1, _) = mur3::murmurhash3_x64_128(key, seed);
    u64::from_be_bytes(h1.to_le_bytes())
}

/// Returns one index in `[0, bits_per_slice)` per slice for `key`.
///
/// The first hash uses seed 0; each subsequent hash is seeded with the
/// previous hash value, truncated to the low 32 bits of the seed parameter.
/// Deterministic, and allocation-free apart from the returned vector.
pub fn slice_indexes(key: &[u8], nbr_slices: u16, bits_per_slice: u64) -> Vec<u64> {
    let mut indexes = Vec::with_capacity(nbr_slices as usize);
    let mut current = 0u64;
    for _ in 0..nbr_slices {
        current = hash64(key, current as u32);
        indexes.push(current % bits_per_slice);
    }
    indexes
}
