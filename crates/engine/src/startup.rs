// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup source resolution (spec §4.5 `StartExisting`, §8 scenario 1).
//!
//! The daemon keeps no state of its own across restarts: whichever
//! version directory a slot should revive from has to be rediscovered
//! from the working directory every time it boots. Grounded on
//! `getFirstServerDir`/`getNewestServerDir` in the original supervisor's
//! filesystem layer: prefer the existing `<identifier>-<slot>` symlink
//! if one survived, otherwise scan the working directory for the
//! newest candidate and materialise it into a version directory if it
//! is still a bare jar.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use vili_core::{FileSystem, SlotKind};

use crate::error::LayoutError;
use crate::layout;

/// How "newest" is judged when scanning the working directory for a
/// startup candidate. Spec §9 leaves this an open question (mtime vs.
/// semantic-version max); kept configurable rather than committing to
/// one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSelect {
    #[default]
    Mtime,
    SemVer,
}

/// Resolve the version directory a slot should start from at boot.
///
/// Returns `Ok(None)` when the working directory has nothing usable for
/// this slot yet. Returns `Ok(Some(dir))` otherwise — `dir` may be a
/// directory just materialised from a loose jar found during the scan.
pub fn resolve_startup_source<FS: FileSystem>(
    fs: &FS,
    working_dir: &Path,
    identifier: &str,
    slot: SlotKind,
    select: VersionSelect,
) -> Result<Option<PathBuf>, LayoutError> {
    let slot_link = working_dir.join(format!("{identifier}-{}", slot.as_str()));
    if fs.exists(&slot_link) {
        if let Ok(target) = fs.read_link(&slot_link) {
            if fs.exists(&target) {
                return Ok(Some(target));
            }
        }
    }

    newest_candidate(fs, working_dir, identifier, slot, select)
}

struct Candidate {
    path: PathBuf,
    name: String,
    modified: SystemTime,
}

fn newest_candidate<FS: FileSystem>(
    fs: &FS,
    working_dir: &Path,
    identifier: &str,
    slot: SlotKind,
    select: VersionSelect,
) -> Result<Option<PathBuf>, LayoutError> {
    let bare_jar = working_dir.join(format!("{identifier}.jar"));

    let mut newest_dir: Option<Candidate> = None;
    let mut newest_jar: Option<Candidate> = None;

    for entry in fs.read_dir(working_dir)? {
        let name = match entry.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if !name.starts_with(identifier) {
            continue;
        }

        let meta = fs.metadata(&entry)?;

        if meta.is_dir() {
            let candidate = Candidate { path: entry, name, modified: meta.modified };
            if is_newer(&newest_dir, &candidate, select) {
                newest_dir = Some(candidate);
            }
            continue;
        }

        if entry == bare_jar || !name.ends_with(".jar") {
            continue;
        }
        let candidate = Candidate { path: entry, name, modified: meta.modified };
        if newest_jar.as_ref().map_or(true, |current| candidate.modified > current.modified) {
            newest_jar = Some(candidate);
        }
    }

    // A bare `<identifier>.jar` with no directory peers yet: materialise
    // it into a version directory now rather than excluding it from
    // consideration, so a true cold start against one dropped jar still
    // has something to run (spec §8 scenario 1). This diverges
    // deliberately from the original, which skips this exact file name
    // unconditionally and would leave `running` unfillable here.
    if newest_dir.is_none() && newest_jar.is_none() && fs.exists(&bare_jar) {
        return materialise(fs, working_dir, identifier, &bare_jar).map(Some);
    }

    // `test` prefers a newer loose jar over an older version directory —
    // the original's rationale is that a jar dropped after the last
    // restart is a deploy candidate waiting to be picked up, and `test`
    // is where deploy candidates land.
    let prefer_jar = slot == SlotKind::Testing
        && newest_jar
            .as_ref()
            .zip(newest_dir.as_ref())
            .map_or(false, |(jar, dir)| jar.modified > dir.modified);

    if prefer_jar || newest_dir.is_none() {
        if let Some(jar) = newest_jar {
            return materialise(fs, working_dir, identifier, &jar.path).map(Some);
        }
    }

    Ok(newest_dir.map(|c| c.path))
}

fn materialise<FS: FileSystem>(fs: &FS, working_dir: &Path, identifier: &str, jar_path: &Path) -> Result<PathBuf, LayoutError> {
    let version_name = layout::version_name_from_artifact(jar_path)?;
    layout::materialise_version(fs, working_dir, identifier, jar_path, &version_name)
}

fn is_newer(current: &Option<Candidate>, candidate: &Candidate, select: VersionSelect) -> bool {
    let Some(current) = current else { return true };
    match select {
        VersionSelect::Mtime => candidate.modified > current.modified,
        VersionSelect::SemVer => match (numeric_suffix(&candidate.name), numeric_suffix(&current.name)) {
            (Some(a), Some(b)) => a > b,
            _ => candidate.modified > current.modified,
        },
    }
}

/// Parse the trailing `-<n>` ordinal off a version directory name
/// (e.g. `foo-12` -> `12`), the closest equivalent this system has to a
/// semantic version.
fn numeric_suffix(name: &str) -> Option<u64> {
    name.rsplit_once('-').and_then(|(_, suffix)| suffix.parse().ok())
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
