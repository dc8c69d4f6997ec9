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

use chrono::Days;
use chrono::Local;
use googletest::assert_that;
use googletest::prelude::contains_substring;
use timebloom::error::ErrorKind;
use timebloom::temporal::DailyTemporalBloomFilter;
use timebloom::temporal::MemoryArchive;

fn make_filter(dir: &Path) -> DailyTemporalBloomFilter {
    DailyTemporalBloomFilter::new(10_000, 0.01, 7, "visitors", dir).unwrap()
}

#[test]
fn test_snapshot_roundtrip_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let keys: Vec<String> = (0..500).map(|i| format!("session-{i}")).collect();

    let mut bf = make_filter(dir.path());
    for key in &keys {
        bf.add(key).unwrap();
    }
    bf.save_snapshot(None).unwrap();
    drop(bf);

    let mut restarted = make_filter(dir.path());
    assert!(!restarted.ready());
    assert!(!restarted.contains("session-0"));
    restarted.warm_all().unwrap();
    assert!(restarted.ready());
    for key in &keys {
        assert!(restarted.contains(key), "lost {key} across restart");
    }
}

#[test]
fn test_progressive_warm_loads_one_snapshot_per_call() {
    let dir = tempfile::tempdir().unwrap();
    let today = Local::now().date_naive();

    // Persist three day snapshots: today and the two days before.
    let mut writer = make_filter(dir.path());
    writer.add("day-0-key").unwrap();
    writer.save_snapshot(Some(today)).unwrap();
    drop(writer);
    for age in 1..3u64 {
        let mut writer = make_filter(dir.path());
        writer.add(format!("day-{age}-key")).unwrap();
        writer
            .save_snapshot(today.checked_sub_days(Days::new(age)))
            .unwrap();
        drop(writer);
    }

    let mut bf = make_filter(dir.path());
    // First call enumerates the queue and loads the newest snapshot.
    bf.warm(0.2).unwrap();
    assert!(!bf.ready());
    assert!(bf.contains("day-0-key"));
    // The next load is scheduled out in the future, so this call is a no-op.
    bf.warm(0.2).unwrap();
    assert!(!bf.ready());
    // Force the rest in.
    bf.warm_all().unwrap();
    assert!(bf.ready());
    for age in 0..3 {
        assert!(bf.contains(format!("day-{age}-key")), "missing day {age}");
    }
}

#[test]
fn test_warm_on_empty_directory_is_ready() {
    let dir = tempfile::tempdir().unwrap();
    let mut bf = make_filter(dir.path());
    bf.warm(0.2).unwrap();
    assert!(bf.ready());
}

#[test]
fn test_hold_warming_suspends_loading() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = make_filter(dir.path());
    writer.add("persisted").unwrap();
    writer.save_snapshot(None).unwrap();
    drop(writer);

    let mut bf = make_filter(dir.path());
    bf.hold_warming();
    bf.warm(0.2).unwrap();
    assert!(!bf.ready());
    assert!(!bf.contains("persisted"));
    // The hold gates the forced path too.
    bf.warm_all().unwrap();
    assert!(!bf.ready());
    assert!(!bf.contains("persisted"));

    bf.resume_warming();
    bf.warm(0.2).unwrap();
    assert!(bf.ready());
    assert!(bf.contains("persisted"));
}

#[test]
fn test_maintenance_retains_window_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let today = Local::now().date_naive();

    let mut bf = make_filter(dir.path());
    bf.add("today-key").unwrap();
    bf.save_snapshot(None).unwrap();
    // A snapshot well outside the 7-day window.
    bf.save_snapshot(today.checked_sub_days(Days::new(30))).unwrap();

    bf.maintenance(true).unwrap();
    assert!(bf.ready());
    assert!(bf.contains("today-key"));

    // The expired file was cleaned up, today's stayed.
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with(&format!("{}.dat", today.format("%Y-%m-%d"))));
}

#[test]
fn test_union_current_day() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let mut a = make_filter(dir_a.path());
    let mut b = make_filter(dir_b.path());

    b.add("seen-by-b").unwrap();
    a.union_current_day(&b);
    assert!(a.contains("seen-by-b"));
    // The union lands in the membership array only, not in a's daily state.
    a.save_snapshot(None).unwrap();
    let mut c = make_filter(dir_a.path());
    c.warm_all().unwrap();
    assert!(!c.contains("seen-by-b"));
}

#[test]
fn test_rebuild_from_archive() {
    let dir = tempfile::tempdir().unwrap();
    let mut bf = make_filter(dir.path())
        .with_archive(Box::new(MemoryArchive::new()));

    for i in 0..200u32 {
        bf.add(format!("archived-{i}")).unwrap();
    }
    bf.flush_archive().unwrap();

    // Wipe in-memory state the hard way: resize reallocates both arrays and
    // replays the archive.
    bf.resize(Some(20_000), None).unwrap();
    assert_eq!(bf.params().capacity(), 20_000);
    for i in 0..200u32 {
        assert!(bf.contains(format!("archived-{i}")), "lost archived-{i}");
    }
    assert_eq!(bf.len(), 200);

    // The rebuild regenerated today's snapshot in the new geometry.
    let mut restarted =
        DailyTemporalBloomFilter::new(20_000, 0.01, 7, "visitors", dir.path()).unwrap();
    restarted.warm_all().unwrap();
    for i in 0..200u32 {
        assert!(restarted.contains(format!("archived-{i}")));
    }
}

#[test]
fn test_rebuild_without_archive_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut bf = make_filter(dir.path());
    let err = bf.rebuild_from_archive(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_that!(err.message(), contains_substring("archive"));
}

#[test]
fn test_drop_archive_empties_retained_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut bf = make_filter(dir.path())
        .with_archive(Box::new(MemoryArchive::new()));
    bf.add("short-lived").unwrap();
    bf.flush_archive().unwrap();

    bf.drop_archive().unwrap();
    bf.rebuild_from_archive(false).unwrap();
    assert!(!bf.contains("short-lived"));
    assert_eq!(bf.len(), 0);
}

#[test]
fn test_rebuild_single_hour_tops_up() {
    use std::time::Duration;

    use chrono::NaiveDate;
    use timebloom::temporal::ArchiveStore;

    let dir = tempfile::tempdir().unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();

    let mut archive = MemoryArchive::new();
    archive
        .insert(
            "visitors_2026-08-01:07",
            &[b"replayed".to_vec()],
            Duration::from_secs(86_400),
        )
        .unwrap();

    let mut bf = make_filter(dir.path()).with_archive(Box::new(archive));
    assert!(!bf.contains("replayed"));
    bf.rebuild_hour_from_archive(day, 7).unwrap();
    assert!(bf.contains("replayed"));

    let err = bf.rebuild_hour_from_archive(day, 24).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

// An archive that refuses every write, for failure propagation.
struct UnreachableArchive;

impl timebloom::temporal::ArchiveStore for UnreachableArchive {
    fn insert(
        &mut self,
        _row_key: &str,
        _keys: &[Vec<u8>],
        _ttl: std::time::Duration,
    ) -> Result<(), timebloom::error::Error> {
        Err(timebloom::error::Error::new(
            ErrorKind::ArchiveUnavailable,
            "backend down",
        ))
    }

    fn range_iter<'a>(
        &'a self,
        _row_key: &str,
    ) -> Result<Box<dyn Iterator<Item = Vec<u8>> + 'a>, timebloom::error::Error> {
        Err(timebloom::error::Error::new(
            ErrorKind::ArchiveUnavailable,
            "backend down",
        ))
    }

    fn remove(&mut self, _row_key: &str) -> Result<(), timebloom::error::Error> {
        Err(timebloom::error::Error::new(
            ErrorKind::ArchiveUnavailable,
            "backend down",
        ))
    }
}

#[test]
fn test_archive_failures_surface_as_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut bf = make_filter(dir.path()).with_archive(Box::new(UnreachableArchive));

    bf.add("buffered").unwrap();
    let err = bf.flush_archive().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveUnavailable);

    // The membership state itself is unaffected by the journal failure.
    assert!(bf.contains("buffered"));

    let err = bf.rebuild_from_archive(false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveUnavailable);
}

#[test]
fn test_heterogeneous_snapshot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = make_filter(dir.path());
    writer.add("key").unwrap();
    writer.save_snapshot(None).unwrap();
    drop(writer);

    // Same name and retention, different capacity: different bit length.
    let mut bf = DailyTemporalBloomFilter::new(500, 0.01, 7, "visitors", dir.path()).unwrap();
    let err = bf.warm_all().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HeterogeneousSnapshot);
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let today = Local::now().date_naive();
    fs::write(
        dir.path().join(format!("visitors_7_{}.dat", today.format("%Y-%m-%d"))),
        b"garbage",
    )
    .unwrap();

    let mut bf = make_filter(dir.path());
    let err = bf.warm_all().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SnapshotCorrupt);
}

#[test]
fn test_restore_on_empty_directory_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut bf = make_filter(dir.path());
    bf.restore_from_disk(false).unwrap();
    assert!(bf.ready());

    // A directory that does not exist yet behaves the same.
    let mut bf =
        DailyTemporalBloomFilter::new(1_000, 0.01, 7, "visitors", dir.path().join("missing"))
            .unwrap();
    bf.restore_from_disk(false).unwrap();
    assert!(bf.ready());
}
