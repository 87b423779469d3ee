// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use vili_core::{InMemFs, SlotKind};

use super::*;

#[test]
fn cold_start_materialises_bare_jar_into_version_directory() {
    let fs = InMemFs::new();
    fs.write(Path::new("/wd/foo.jar"), b"stub").unwrap();

    let resolved = resolve_startup_source(&fs, Path::new("/wd"), "foo", SlotKind::Running, VersionSelect::Mtime).unwrap();

    assert_eq!(resolved, Some(PathBuf::from("/wd/foo")));
    assert!(fs.exists(Path::new("/wd/foo/foo.jar")));
}

#[test]
fn empty_working_directory_resolves_to_none() {
    let fs = InMemFs::new();
    fs.create_dir_all(Path::new("/wd")).unwrap();

    let resolved = resolve_startup_source(&fs, Path::new("/wd"), "foo", SlotKind::Running, VersionSelect::Mtime).unwrap();

    assert_eq!(resolved, None);
}

#[test]
fn existing_slot_symlink_is_preferred_over_a_rescan() {
    let fs = InMemFs::new();
    fs.create_dir_all(Path::new("/wd/foo-1")).unwrap();
    fs.write(Path::new("/wd/foo-1/foo.jar"), b"stub").unwrap();
    fs.create_dir_all(Path::new("/wd/foo-2")).unwrap();
    fs.write(Path::new("/wd/foo-2/foo.jar"), b"stub").unwrap();
    fs.symlink(Path::new("/wd/foo-1"), Path::new("/wd/foo-running")).unwrap();

    let resolved = resolve_startup_source(&fs, Path::new("/wd"), "foo", SlotKind::Running, VersionSelect::Mtime).unwrap();

    assert_eq!(resolved, Some(PathBuf::from("/wd/foo-1")));
}

#[test]
fn newest_version_directory_by_mtime_wins_when_no_slot_symlink_exists() {
    let fs = InMemFs::new();
    fs.create_dir_all(Path::new("/wd/foo-1")).unwrap();
    fs.write(Path::new("/wd/foo-1/foo.jar"), b"stub").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    fs.create_dir_all(Path::new("/wd/foo-2")).unwrap();
    fs.write(Path::new("/wd/foo-2/foo.jar"), b"stub").unwrap();

    let resolved = resolve_startup_source(&fs, Path::new("/wd"), "foo", SlotKind::Running, VersionSelect::Mtime).unwrap();

    assert_eq!(resolved, Some(PathBuf::from("/wd/foo-2")));
}

#[test]
fn testing_slot_prefers_a_freshly_dropped_jar_over_an_older_version_directory() {
    let fs = InMemFs::new();
    fs.create_dir_all(Path::new("/wd/foo-1")).unwrap();
    fs.write(Path::new("/wd/foo-1/foo.jar"), b"stub").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    fs.write(Path::new("/wd/foo-2.jar"), b"fresh drop").unwrap();

    let resolved = resolve_startup_source(&fs, Path::new("/wd"), "foo", SlotKind::Testing, VersionSelect::Mtime).unwrap();

    assert_eq!(resolved, Some(PathBuf::from("/wd/foo-2")));
    assert!(fs.exists(Path::new("/wd/foo-2/foo.jar")));
}

#[test]
fn semver_select_prefers_higher_numeric_suffix_over_mtime() {
    let fs = InMemFs::new();
    fs.create_dir_all(Path::new("/wd/foo-10")).unwrap();
    fs.write(Path::new("/wd/foo-10/foo.jar"), b"stub").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    fs.create_dir_all(Path::new("/wd/foo-2")).unwrap();
    fs.write(Path::new("/wd/foo-2/foo.jar"), b"stub").unwrap();

    let resolved = resolve_startup_source(&fs, Path::new("/wd"), "foo", SlotKind::Running, VersionSelect::SemVer).unwrap();

    assert_eq!(resolved, Some(PathBuf::from("/wd/foo-10")));
}
