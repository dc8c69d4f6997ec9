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

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

use chrono::Days;
use chrono::Local;
use chrono::NaiveDate;
use chrono::Timelike;

use crate::bloom::FilterParams;
use crate::common::bits::BitSlices;
use crate::common::random::RandomSource;
use crate::common::random::SplitMix64;
use crate::error::Error;
use crate::temporal::archive::ArchiveStore;
use crate::temporal::serialization;

const DAY_FORMAT: &str = "%Y-%m-%d";
const SECONDS_PER_DAY: f64 = 86_400.0;
const COMMIT_BATCH_SIZE: usize = 1000;
const COMMIT_PERIOD: Duration = Duration::from_secs(5);

/// A Bloom filter over an approximate multi-day sliding window.
///
/// Rather than expiring single entries, the filter buckets insertions by
/// calendar day. Two bit arrays back it: the union over the retained days
/// answers membership, while a second array holds only today's insertions
/// and is what gets persisted as the daily snapshot. At each day rollover
/// the union is rebuilt from the snapshots still inside the retention
/// window, so entries fall out a whole day at a time.
///
/// Unlike a plain Bloom filter this one has false negatives too: a key
/// inserted `expiration_days` ago is gone even if it is still interesting.
/// For uniformly spread keys the added error is about `1 / expiration_days`.
///
/// After a restart, snapshots are reloaded either all at once
/// ([`warm_all`](Self::warm_all)) or progressively with jitter
/// ([`warm`](Self::warm)) so that a fleet of workers does not hammer shared
/// storage simultaneously. With an [`ArchiveStore`] attached, every inserted
/// key is also journaled, which allows rebuilding the bit arrays from
/// scratch after a crash that lost snapshots or after a
/// [`resize`](Self::resize).
pub struct DailyTemporalBloomFilter {
    params: FilterParams,
    bits_all: BitSlices,
    bits_today: BitSlices,
    count: u64,
    name: String,
    snapshot_dir: PathBuf,
    expiration_days: u32,
    current_period: NaiveDate,
    ready: bool,
    snapshot_to_load: Option<Vec<PathBuf>>,
    next_snapshot_load: SystemTime,
    warm_period: f64,
    hold_warming: bool,
    rng: SplitMix64,
    archive: Option<Box<dyn ArchiveStore>>,
    uncommitted_keys: Vec<Vec<u8>>,
    next_archive_commit: SystemTime,
}

impl std::fmt::Debug for DailyTemporalBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyTemporalBloomFilter")
            .field("params", &self.params)
            .field("count", &self.count)
            .field("name", &self.name)
            .field("snapshot_dir", &self.snapshot_dir)
            .field("expiration_days", &self.expiration_days)
            .field("current_period", &self.current_period)
            .field("ready", &self.ready)
            .field("warm_period", &self.warm_period)
            .field("hold_warming", &self.hold_warming)
            .field("has_archive", &self.archive.is_some())
            .finish()
    }
}

impl DailyTemporalBloomFilter {
    /// Creates a filter retaining `expiration_days` days of keys, writing
    /// snapshots named `<name>_<expiration_days>_<YYYY-MM-DD>.dat` under
    /// `snapshot_dir`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a zero capacity or retention, or an error rate
    /// outside `(0, 1)`.
    pub fn new(
        capacity: u64,
        error_rate: f64,
        expiration_days: u32,
        name: impl Into<String>,
        snapshot_dir: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let params = FilterParams::new(capacity, error_rate)?;
        if expiration_days == 0 {
            return Err(Error::invalid_parameter("expiration_days must be positive"));
        }
        let now = SystemTime::now();
        Ok(Self {
            bits_all: BitSlices::new(params.nbr_slices(), params.bits_per_slice()),
            bits_today: BitSlices::new(params.nbr_slices(), params.bits_per_slice()),
            params,
            count: 0,
            name: name.into(),
            snapshot_dir: snapshot_dir.into(),
            expiration_days,
            current_period: Local::now().date_naive(),
            ready: false,
            snapshot_to_load: None,
            next_snapshot_load: now,
            warm_period: 0.0,
            hold_warming: false,
            rng: SplitMix64::default(),
            archive: None,
            uncommitted_keys: Vec::new(),
            next_archive_commit: now + COMMIT_PERIOD,
        })
    }

    /// Attaches an archive backend; every added key is journaled to it.
    pub fn with_archive(mut self, archive: Box<dyn ArchiveStore>) -> Self {
        self.archive = Some(archive);
        self
    }

    // ========================================================================
    // Membership and insertion
    // ========================================================================

    /// Tests whether `key` was inserted within the retained window.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        let mut offset = 0;
        for &index in &self.params.indexes(key.as_ref()) {
            if !self.bits_all.get(offset + index) {
                return false;
            }
            offset += self.params.bits_per_slice();
        }
        true
    }

    /// Inserts `key`, reporting whether it was already present.
    ///
    /// With an archive attached the key is journaled first; journal batches
    /// are committed every 1000 keys or 5 seconds, whichever comes first.
    ///
    /// # Errors
    ///
    /// `ArchiveUnavailable` if a journal commit fails. In-memory insertion
    /// itself cannot fail.
    pub fn add(&mut self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        let key = key.as_ref();
        if self.archive.is_some() {
            self.buffer_archive_key(key)?;
        }
        Ok(self.set_key_bits(key))
    }

    /// Returns the number of successful insertions.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns whether no key has been inserted.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns whether every retained snapshot has been loaded.
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Returns the filter's identity used in snapshot and row names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the day bucket insertions currently land in.
    pub fn current_period(&self) -> NaiveDate {
        self.current_period
    }

    /// Returns the retention in days.
    pub fn expiration_days(&self) -> u32 {
        self.expiration_days
    }

    /// Returns the slice geometry.
    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    // Sets the key's bits in both arrays; true means already present.
    fn set_key_bits(&mut self, key: &[u8]) -> bool {
        let indexes = self.params.indexes(key);
        let mut offset = 0;
        let mut present = true;
        for &index in &indexes {
            if !self.bits_all.get(offset + index) {
                present = false;
            }
            offset += self.params.bits_per_slice();
        }
        if present {
            return true;
        }
        let mut offset = 0;
        for &index in &indexes {
            self.bits_all.set(offset + index);
            self.bits_today.set(offset + index);
            offset += self.params.bits_per_slice();
        }
        self.count += 1;
        false
    }

    // ========================================================================
    // Day rollover and snapshots
    // ========================================================================

    /// Pins the day bucket, or re-reads it from the wall clock.
    pub fn initialize_period(&mut self, period: Option<NaiveDate>) {
        self.current_period = period.unwrap_or_else(|| Local::now().date_naive());
    }

    /// Expires old keys at start of day: advances the period, resets both
    /// bit arrays, and re-unions the snapshots still inside the retention
    /// window. With `clean_old_snapshots`, files older than the window are
    /// deleted.
    pub fn maintenance(&mut self, clean_old_snapshots: bool) -> Result<(), Error> {
        self.initialize_period(None);
        self.bits_all.clear();
        self.bits_today.clear();
        self.restore_from_disk(clean_old_snapshots)
    }

    /// Persists today's bit array (or an explicit day's snapshot file).
    pub fn save_snapshot(&self, override_day: Option<NaiveDate>) -> Result<(), Error> {
        let day = override_day.unwrap_or(self.current_period);
        fs::create_dir_all(&self.snapshot_dir)
            .map_err(|e| Error::io("failed to create snapshot directory", e))?;
        serialization::write_snapshot(&self.snapshot_path(day), &self.bits_today)
    }

    /// Unions every retained snapshot into the membership array; today's
    /// snapshot, if present, is also unioned into today's array.
    ///
    /// An empty or missing snapshot directory is not an error.
    pub fn restore_from_disk(&mut self, clean_old_snapshots: bool) -> Result<(), Error> {
        let last_period = self.last_period();
        for (day, path) in self.list_snapshots()? {
            if day < last_period {
                if clean_old_snapshots {
                    fs::remove_file(&path)
                        .map_err(|e| Error::io("failed to delete expired snapshot", e))?;
                }
                continue;
            }
            let into_today = day == self.current_period;
            self.union_from_file(&path, into_today)?;
        }
        self.ready = true;
        Ok(())
    }

    /// ORs another filter's today-array into this filter's membership array.
    ///
    /// # Panics
    ///
    /// Panics if the slice geometries differ.
    pub fn union_current_day(&mut self, other: &DailyTemporalBloomFilter) {
        self.bits_all.or_with(&other.bits_today);
    }

    // ========================================================================
    // Progressive warm-up
    // ========================================================================

    /// Loads at most one retained snapshot per call.
    ///
    /// The first call enumerates the retained snapshot files and spaces the
    /// loads so all of them land before end of day; each load schedules the
    /// next one `warm_period * (1 + U[-r, +r])` seconds out, where `r` is
    /// `jittering_ratio`. Calls before the scheduled time, or while warming
    /// is held, do nothing. Once the queue drains the filter is ready.
    pub fn warm(&mut self, jittering_ratio: f64) -> Result<(), Error> {
        if !self.should_warm() {
            return Ok(());
        }
        if self.snapshot_to_load.is_none() {
            self.enumerate_snapshots_to_load()?;
        }
        let popped = self.snapshot_to_load.as_mut().and_then(Vec::pop);
        if let Some(path) = popped {
            self.union_from_file(&path, false)?;
            let jitter = (2.0 * self.rng.next_f64() - 1.0) * jittering_ratio;
            let delay = (self.warm_period * (1.0 + jitter)).max(0.0);
            self.next_snapshot_load = SystemTime::now() + Duration::from_secs_f64(delay);
        }
        if self.snapshot_to_load.as_ref().is_some_and(Vec::is_empty) {
            self.ready = true;
        }
        Ok(())
    }

    /// Loads every remaining retained snapshot synchronously.
    ///
    /// Does nothing while warming is held; the hold gates the forced path
    /// the same way it gates [`warm`](Self::warm).
    pub fn warm_all(&mut self) -> Result<(), Error> {
        if self.hold_warming {
            return Ok(());
        }
        if self.snapshot_to_load.is_none() {
            self.enumerate_snapshots_to_load()?;
        }
        while let Some(path) = self.snapshot_to_load.as_mut().and_then(Vec::pop) {
            self.union_from_file(&path, false)?;
        }
        self.ready = true;
        Ok(())
    }

    /// Suspends progressive warming (e.g. while an external rebuild runs).
    pub fn hold_warming(&mut self) {
        self.hold_warming = true;
    }

    /// Resumes progressive warming.
    pub fn resume_warming(&mut self) {
        self.hold_warming = false;
    }

    fn should_warm(&self) -> bool {
        !self.hold_warming && SystemTime::now() >= self.next_snapshot_load
    }

    fn enumerate_snapshots_to_load(&mut self) -> Result<(), Error> {
        let last_period = self.last_period();
        let queue: Vec<PathBuf> = self
            .list_snapshots()?
            .into_iter()
            .filter(|(day, _)| *day >= last_period)
            .map(|(_, path)| path)
            .collect();
        self.warm_period = self.compute_warm_period(queue.len());
        self.ready = queue.is_empty();
        self.snapshot_to_load = Some(queue);
        Ok(())
    }

    // Spread the queued loads over what is left of the day.
    fn compute_warm_period(&self, queued: usize) -> f64 {
        let seconds_into_day = Local::now().num_seconds_from_midnight() as f64;
        let remaining = (SECONDS_PER_DAY - seconds_into_day).max(0.0);
        remaining / (queued as f64 + 2.0)
    }

    // ========================================================================
    // Archive journal
    // ========================================================================

    /// Commits any buffered archive keys immediately.
    ///
    /// # Errors
    ///
    /// `ArchiveUnavailable` from the backend; the buffer is kept so the
    /// commit can be retried.
    pub fn flush_archive(&mut self) -> Result<(), Error> {
        if self.uncommitted_keys.is_empty() {
            return Ok(());
        }
        let Some(archive) = self.archive.as_mut() else {
            return Ok(());
        };
        let row_key = format!("{}_{}", self.name, Local::now().format("%Y-%m-%d:%H"));
        let ttl = Duration::from_secs(u64::from(self.expiration_days) * 86_400);
        archive.insert(&row_key, &self.uncommitted_keys, ttl)?;
        self.uncommitted_keys.clear();
        self.next_archive_commit = SystemTime::now() + COMMIT_PERIOD;
        Ok(())
    }

    /// Rebuilds both bit arrays from the archived keys of the retained
    /// window, day by day. With `rebuild_snapshot`, each day's snapshot file
    /// is regenerated along the way.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if no archive is attached; `ArchiveUnavailable`
    /// from the backend.
    pub fn rebuild_from_archive(&mut self, rebuild_snapshot: bool) -> Result<(), Error> {
        if self.archive.is_none() {
            return Err(Error::invalid_parameter("no archive attached"));
        }
        self.flush_archive()?;
        self.bits_all.clear();
        self.bits_today.clear();
        self.count = 0;

        for day in self.retained_days() {
            let mut seen_any = false;
            for row_key in self.hour_rows(day) {
                for key in self.scan_archive_row(&row_key)? {
                    seen_any = true;
                    self.set_key_bits(&key);
                }
            }
            let is_current = day == self.current_period;
            // The current day's snapshot is always written so its file stays
            // in sync with the filter parameters.
            if rebuild_snapshot && (seen_any || is_current) {
                self.save_snapshot(Some(day))?;
            }
            if !is_current {
                self.bits_today.clear();
            }
        }
        self.ready = true;
        Ok(())
    }

    /// Re-inserts the keys of a single hourly bucket, without resetting the
    /// bit arrays. A top-up for the most recent hours after a partial loss.
    pub fn rebuild_hour_from_archive(&mut self, day: NaiveDate, hour: u32) -> Result<(), Error> {
        if hour >= 24 {
            return Err(Error::invalid_parameter("hour must be in [0, 24)")
                .with_context("hour", hour));
        }
        let row_key = format!("{}_{}:{:02}", self.name, day.format(DAY_FORMAT), hour);
        for key in self.scan_archive_row(&row_key)? {
            self.set_key_bits(&key);
        }
        Ok(())
    }

    /// Removes every archived row of the retained window.
    pub fn drop_archive(&mut self) -> Result<(), Error> {
        let rows: Vec<String> = self
            .retained_days()
            .into_iter()
            .flat_map(|day| self.hour_rows(day))
            .collect();
        let Some(archive) = self.archive.as_mut() else {
            return Ok(());
        };
        for row_key in rows {
            archive.remove(&row_key)?;
        }
        Ok(())
    }

    /// Changes capacity and/or error rate, reallocates both bit arrays for
    /// the new geometry, and rebuilds them from the archive.
    pub fn resize(
        &mut self,
        new_capacity: Option<u64>,
        new_error_rate: Option<f64>,
    ) -> Result<(), Error> {
        let capacity = new_capacity.unwrap_or_else(|| self.params.capacity());
        let error_rate = new_error_rate.unwrap_or_else(|| self.params.error_rate());
        self.params = FilterParams::new(capacity, error_rate)?;
        self.bits_all = BitSlices::new(self.params.nbr_slices(), self.params.bits_per_slice());
        self.bits_today = BitSlices::new(self.params.nbr_slices(), self.params.bits_per_slice());
        self.count = 0;
        self.rebuild_from_archive(true)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn buffer_archive_key(&mut self, key: &[u8]) -> Result<(), Error> {
        self.uncommitted_keys.push(key.to_vec());
        if self.uncommitted_keys.len() >= COMMIT_BATCH_SIZE
            || SystemTime::now() >= self.next_archive_commit
        {
            self.flush_archive()?;
        }
        Ok(())
    }

    fn scan_archive_row(&self, row_key: &str) -> Result<Vec<Vec<u8>>, Error> {
        match self.archive.as_ref() {
            Some(archive) => Ok(archive.range_iter(row_key)?.collect()),
            None => Ok(Vec::new()),
        }
    }

    fn union_from_file(&mut self, path: &Path, into_today: bool) -> Result<(), Error> {
        let (nbr_bits, payload) = serialization::read_snapshot(path)?;
        if nbr_bits != self.params.nbr_bits() {
            return Err(Error::heterogeneous_snapshot(self.params.nbr_bits(), nbr_bits)
                .with_context("path", path.display()));
        }
        let snapshot =
            BitSlices::from_bytes(self.params.nbr_slices(), self.params.bits_per_slice(), &payload)
                .ok_or_else(|| {
                    Error::snapshot_corrupt(format!("bad bit payload in {}", path.display()))
                })?;
        self.bits_all.or_with(&snapshot);
        if into_today {
            self.bits_today.or_with(&snapshot);
        }
        Ok(())
    }

    // All snapshot files carrying this filter's name and retention, sorted
    // by day. Foreign files in the directory are skipped.
    fn list_snapshots(&self) -> Result<Vec<(NaiveDate, PathBuf)>, Error> {
        let mut snapshots = Vec::new();
        let entries = match fs::read_dir(&self.snapshot_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(snapshots),
            Err(e) => return Err(Error::io("failed to scan snapshot directory", e)),
        };
        let prefix = format!("{}_{}_", self.name, self.expiration_days);
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("failed to scan snapshot directory", e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".dat"))
            else {
                continue;
            };
            let Ok(day) = NaiveDate::parse_from_str(stem, DAY_FORMAT) else {
                continue;
            };
            snapshots.push((day, entry.path()));
        }
        snapshots.sort();
        Ok(snapshots)
    }

    fn snapshot_path(&self, day: NaiveDate) -> PathBuf {
        self.snapshot_dir.join(format!(
            "{}_{}_{}.dat",
            self.name,
            self.expiration_days,
            day.format(DAY_FORMAT)
        ))
    }

    fn last_period(&self) -> NaiveDate {
        self.current_period
            .checked_sub_days(Days::new(u64::from(self.expiration_days) - 1))
            .unwrap_or(self.current_period)
    }

    fn retained_days(&self) -> Vec<NaiveDate> {
        self.last_period()
            .iter_days()
            .take_while(|day| *day <= self.current_period)
            .collect()
    }

    fn hour_rows(&self, day: NaiveDate) -> Vec<String> {
        (0..24)
            .map(|hour| format!("{}_{}:{:02}", self.name, day.format(DAY_FORMAT), hour))
            .collect()
    }
}
