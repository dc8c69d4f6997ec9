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

//! Snapshot file format.
//!
//! A snapshot is one day's bit array, zlib-compressed at the default level.
//! The uncompressed payload is a 4-byte little-endian bit length followed by
//! `ceil(m / 8)` packed bytes in little-endian bit order. Writes go to a
//! sibling temp file and rename into place, so readers never observe a
//! partial snapshot. Anything that fails to decode to exactly this shape is
//! rejected; there is no legacy format fallback.

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::common::bits::BitSlices;
use crate::error::Error;

/// Writes `bits` to `path` atomically (write-then-rename).
pub(crate) fn write_snapshot(path: &Path, bits: &BitSlices) -> Result<(), Error> {
    if bits.nbr_bits() > u32::MAX as u64 {
        return Err(Error::invalid_parameter(
            "bit array too large for the snapshot length prefix",
        ));
    }

    let tmp_path = match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => path.with_file_name(format!("{name}.tmp")),
        None => {
            return Err(Error::invalid_parameter("snapshot path has no file name")
                .with_context("path", path.display()));
        }
    };

    let file = File::create(&tmp_path)
        .map_err(|e| Error::io("failed to create snapshot temp file", e))?;
    let mut encoder = ZlibEncoder::new(file, Compression::default());
    encoder
        .write_u32::<LittleEndian>(bits.nbr_bits() as u32)
        .and_then(|_| encoder.write_all(&bits.to_bytes()))
        .map_err(|e| Error::io("failed to write snapshot", e))?;
    encoder
        .finish()
        .map_err(|e| Error::io("failed to finish snapshot compression", e))?;

    fs::rename(&tmp_path, path).map_err(|e| Error::io("failed to publish snapshot", e))
}

/// Reads a snapshot, returning its bit length and packed payload.
///
/// # Errors
///
/// `SnapshotCorrupt` if the file cannot be opened, is not valid zlib, or its
/// payload length disagrees with the length prefix.
pub(crate) fn read_snapshot(path: &Path) -> Result<(u64, Vec<u8>), Error> {
    let file = File::open(path).map_err(|e| {
        Error::snapshot_corrupt(format!("cannot open {}", path.display())).with_source(e)
    })?;
    let mut decoder = ZlibDecoder::new(file);

    let nbr_bits = decoder
        .read_u32::<LittleEndian>()
        .map_err(|e| Error::snapshot_corrupt("missing length prefix").with_source(e))?
        as u64;
    let mut payload = Vec::new();
    decoder
        .read_to_end(&mut payload)
        .map_err(|e| Error::snapshot_corrupt("undecodable payload").with_source(e))?;

    if payload.len() as u64 != nbr_bits.div_ceil(8) {
        return Err(Error::snapshot_corrupt(format!(
            "payload is {} bytes, length prefix implies {}",
            payload.len(),
            nbr_bits.div_ceil(8)
        )));
    }
    Ok((nbr_bits, payload))
}
