// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archiver — compresses a retired version directory into a zip under
//! the archive directory and enforces a total size cap by evicting the
//! oldest archived zip first. Grounded on `original_source/zip/zip.go`'s
//! `ZipDir`/`addFiles` walk, swapped from Go's `archive/zip` + `flate`
//! best-compression registration onto the `zip` crate's
//! `CompressionMethod::Deflated` at the equivalent compression level.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Total archive directory size cap (1 GiB), matching spec §4.8.
pub const MAX_ARCHIVE_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("io error archiving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("zip error archiving {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

pub struct Archiver {
    archive_dir: PathBuf,
    max_total_bytes: u64,
}

impl Archiver {
    pub fn new(archive_dir: PathBuf) -> Self {
        Self { archive_dir, max_total_bytes: MAX_ARCHIVE_BYTES }
    }

    pub fn with_cap(archive_dir: PathBuf, max_total_bytes: u64) -> Self {
        Self { archive_dir, max_total_bytes }
    }

    /// Zip `version_dir` into `<archive_dir>/<version_name>.zip`, remove
    /// the source directory on success, then evict the oldest archive
    /// entries until the directory is back under the size cap. A zip or
    /// I/O failure leaves `version_dir` untouched and is surfaced to the
    /// caller to log, per spec §4.8 ("non-fatal; directory preserved").
    pub fn archive(&self, version_dir: &Path, version_name: &str) -> Result<(), ArchiverError> {
        std::fs::create_dir_all(&self.archive_dir)
            .map_err(|source| ArchiverError::Io { path: self.archive_dir.clone(), source })?;

        let zip_path = self.archive_dir.join(format!("{version_name}.zip"));
        self.write_zip(version_dir, &zip_path)?;

        std::fs::remove_dir_all(version_dir)
            .map_err(|source| ArchiverError::Io { path: version_dir.to_path_buf(), source })?;

        self.evict_until_under_cap();
        Ok(())
    }

    fn write_zip(&self, version_dir: &Path, zip_path: &Path) -> Result<(), ArchiverError> {
        let out = File::create(zip_path).map_err(|source| ArchiverError::Io { path: zip_path.to_path_buf(), source })?;
        let mut writer = ZipWriter::new(out);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated).compression_level(Some(9));

        for entry in walkdir::WalkDir::new(version_dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if path == version_dir {
                continue;
            }
            let relative = path
                .strip_prefix(version_dir)
                .map_err(|_| ArchiverError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path escaped version dir"),
                })?
                .to_string_lossy()
                .replace('\\', "/");

            if entry.file_type().is_dir() {
                writer
                    .add_directory(format!("{relative}/"), options)
                    .map_err(|source| ArchiverError::Zip { path: path.to_path_buf(), source })?;
                continue;
            }

            writer
                .start_file(relative, options)
                .map_err(|source| ArchiverError::Zip { path: path.to_path_buf(), source })?;
            let mut contents = Vec::new();
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut contents))
                .map_err(|source| ArchiverError::Io { path: path.to_path_buf(), source })?;
            writer
                .write_all(&contents)
                .map_err(|source| ArchiverError::Io { path: path.to_path_buf(), source })?;
        }

        writer
            .finish()
            .map_err(|source| ArchiverError::Zip { path: zip_path.to_path_buf(), source })?;
        Ok(())
    }

    fn evict_until_under_cap(&self) {
        loop {
            let mut entries: Vec<(PathBuf, u64, std::time::SystemTime)> = match std::fs::read_dir(&self.archive_dir) {
                Ok(dir) => dir
                    .filter_map(Result::ok)
                    .filter_map(|e| {
                        let meta = e.metadata().ok()?;
                        Some((e.path(), meta.len(), meta.modified().ok()?))
                    })
                    .collect(),
                Err(_) => return,
            };

            let total: u64 = entries.iter().map(|(_, len, _)| len).sum();
            if total <= self.max_total_bytes {
                return;
            }

            entries.sort_by_key(|(_, _, modified)| *modified);
            let Some((oldest, _, _)) = entries.into_iter().next() else { return };
            if std::fs::remove_file(&oldest).is_err() {
                return;
            }
            tracing::info!(path = %oldest.display(), "evicted oldest archive entry to stay under cap");
        }
    }
}

#[cfg(test)]
#[path = "archiver_tests.rs"]
mod tests;
