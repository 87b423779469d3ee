// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;

use super::*;

#[test]
fn archive_zips_directory_and_removes_source() {
    let root = tempfile::tempdir().unwrap();
    let version_dir = root.path().join("foo-2");
    std::fs::create_dir_all(version_dir.join("nested")).unwrap();
    std::fs::write(version_dir.join("foo.jar"), b"binary").unwrap();
    std::fs::write(version_dir.join("nested/readme.txt"), b"notes").unwrap();

    let archive_dir = root.path().join("archive");
    let archiver = Archiver::new(archive_dir.clone());
    archiver.archive(&version_dir, "foo-2").unwrap();

    assert!(!version_dir.exists());
    let zip_path = archive_dir.join("foo-2.zip");
    assert!(zip_path.exists());

    let file = std::fs::File::open(&zip_path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut contents = String::new();
    archive.by_name("foo.jar").unwrap().read_to_string(&mut contents).ok();
    assert_eq!(contents, "binary");
}

#[test]
fn archive_preserves_source_dir_on_zip_failure() {
    let root = tempfile::tempdir().unwrap();
    let version_dir = root.path().join("missing-dir");

    // archive_dir deliberately left uncreated so create_dir_all would
    // succeed; failure instead comes from zipping a version dir that
    // does not exist (walkdir yields nothing, but remove_dir_all fails).
    let archive_dir = root.path().join("archive");
    let archiver = Archiver::new(archive_dir);
    assert!(archiver.archive(&version_dir, "missing").is_err());
}

#[test]
fn evict_until_under_cap_removes_oldest_first() {
    let root = tempfile::tempdir().unwrap();
    let archive_dir = root.path().join("archive");
    std::fs::create_dir_all(&archive_dir).unwrap();

    let old = archive_dir.join("old.zip");
    let new = archive_dir.join("new.zip");
    std::fs::write(&old, vec![0u8; 700]).unwrap();
    std::fs::write(&new, vec![0u8; 700]).unwrap();

    let old_time = filetime::FileTime::from_unix_time(1_000_000, 0);
    filetime::set_file_mtime(&old, old_time).unwrap();
    let new_time = filetime::FileTime::from_unix_time(2_000_000, 0);
    filetime::set_file_mtime(&new, new_time).unwrap();

    let archiver = Archiver::with_cap(archive_dir.clone(), 1000);
    archiver.evict_until_under_cap();

    assert!(!old.exists());
    assert!(new.exists());
}
