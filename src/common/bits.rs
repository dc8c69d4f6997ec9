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

//! Fixed-size bit array partitioned into equal slices.

/// A bit array of `nbr_slices * bits_per_slice` bits, packed into `u64` words.
///
/// Bloom-style structures address it with a global bit index
/// `slice * bits_per_slice + offset`; the slice partitioning itself is a
/// property of the callers' index arithmetic, the array only fixes the total
/// length. Bits are packed LSB-first, which makes [`to_bytes`](Self::to_bytes)
/// exactly the little-endian bit order the snapshot files use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSlices {
    nbr_slices: u16,
    bits_per_slice: u64,
    words: Vec<u64>,
}

impl BitSlices {
    /// Creates an all-zero array for the given slice geometry.
    pub fn new(nbr_slices: u16, bits_per_slice: u64) -> Self {
        let nbr_bits = nbr_slices as u64 * bits_per_slice;
        let words = vec![0u64; nbr_bits.div_ceil(64) as usize];
        Self {
            nbr_slices,
            bits_per_slice,
            words,
        }
    }

    /// Returns the number of slices.
    pub fn nbr_slices(&self) -> u16 {
        self.nbr_slices
    }

    /// Returns the bits in one slice.
    pub fn bits_per_slice(&self) -> u64 {
        self.bits_per_slice
    }

    /// Returns the total bit length.
    pub fn nbr_bits(&self) -> u64 {
        self.nbr_slices as u64 * self.bits_per_slice
    }

    /// Returns the value of a single bit.
    pub fn get(&self, index: u64) -> bool {
        let word = (index / 64) as usize;
        let mask = 1u64 << (index % 64);
        (self.words[word] & mask) != 0
    }

    /// Sets a single bit, returning whether it was previously unset.
    pub fn set(&mut self, index: u64) -> bool {
        let word = (index / 64) as usize;
        let mask = 1u64 << (index % 64);
        let newly = (self.words[word] & mask) == 0;
        self.words[word] |= mask;
        newly
    }

    /// Clears every bit.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }

    /// ORs another array of the same geometry into this one.
    ///
    /// # Panics
    ///
    /// Panics if the geometries differ.
    pub fn or_with(&mut self, other: &BitSlices) {
        assert!(
            self.nbr_slices == other.nbr_slices && self.bits_per_slice == other.bits_per_slice,
            "cannot union bit arrays of different geometry"
        );
        for (word, other_word) in self.words.iter_mut().zip(&other.words) {
            *word |= *other_word;
        }
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Serializes to `ceil(nbr_bits / 8)` packed bytes, little-endian bit
    /// order: bit `i` lands in byte `i / 8` at position `i % 8`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let nbr_bytes = self.nbr_bits().div_ceil(8) as usize;
        let mut bytes = Vec::with_capacity(self.words.len() * 8);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.truncate(nbr_bytes);
        bytes
    }

    /// Rebuilds an array of the given geometry from packed bytes.
    ///
    /// Returns `None` if `bytes` is not exactly `ceil(nbr_bits / 8)` long or
    /// if trailing padding bits beyond `nbr_bits` are set.
    pub fn from_bytes(nbr_slices: u16, bits_per_slice: u64, bytes: &[u8]) -> Option<Self> {
        let nbr_bits = nbr_slices as u64 * bits_per_slice;
        if bytes.len() as u64 != nbr_bits.div_ceil(8) {
            return None;
        }
        let mut out = Self::new(nbr_slices, bits_per_slice);
        for (i, chunk_word) in out.words.iter_mut().enumerate() {
            let start = i * 8;
            let end = (start + 8).min(bytes.len());
            let mut buf = [0u8; 8];
            buf[..end - start].copy_from_slice(&bytes[start..end]);
            *chunk_word = u64::from_le_bytes(buf);
        }
        let excess = nbr_bits % 64;
        if excess != 0 {
            let last = out.words.len() - 1;
            if out.words[last] >> excess != 0 {
                return None;
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let bits = BitSlices::new(6, 1358);
        assert_eq!(bits.nbr_bits(), 8148);
        assert_eq!(bits.count_ones(), 0);
        assert!(!bits.get(0));
        assert!(!bits.get(8147));
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut bits = BitSlices::new(6, 1358);
        assert!(bits.set(4095));
        assert!(!bits.set(4095));
        assert!(bits.get(4095));
        assert_eq!(bits.count_ones(), 1);
        bits.clear();
        assert!(!bits.get(4095));
    }

    #[test]
    fn test_or_with() {
        let mut a = BitSlices::new(2, 100);
        let mut b = BitSlices::new(2, 100);
        a.set(3);
        b.set(150);
        a.or_with(&b);
        assert!(a.get(3));
        assert!(a.get(150));
        assert_eq!(a.count_ones(), 2);
    }

    #[test]
    #[should_panic(expected = "different geometry")]
    fn test_or_with_mismatch_panics() {
        let mut a = BitSlices::new(2, 100);
        let b = BitSlices::new(2, 101);
        a.or_with(&b);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let mut bits = BitSlices::new(3, 33);
        bits.set(0);
        bits.set(7);
        bits.set(8);
        bits.set(98);
        let bytes = bits.to_bytes();
        assert_eq!(bytes.len(), 13); // ceil(99 / 8)
        assert_eq!(bytes[0], 0b1000_0001);
        assert_eq!(bytes[1], 0b0000_0001);
        let back = BitSlices::from_bytes(3, 33, &bytes).unwrap();
        assert_eq!(back, bits);
    }

    #[test]
    fn test_from_bytes_rejects_bad_length() {
        let bits = BitSlices::new(3, 33);
        let mut bytes = bits.to_bytes();
        bytes.pop();
        assert!(BitSlices::from_bytes(3, 33, &bytes).is_none());
    }

    #[test]
    fn test_from_bytes_rejects_padding_bits() {
        // 99 bits -> 13 bytes, 5 padding bits in the last byte.
        let mut bytes = vec![0u8; 13];
        bytes[12] = 0b1000_0000;
        assert!(BitSlices::from_bytes(3, 33, &bytes).is_none());
    }
}
