// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout materialisation (spec §6). Generic over [`FileSystem`]
//! so the directory/symlink/properties-rewrite logic can be exercised
//! against an in-memory backend in tests without touching disk or
//! depending on a particular working directory.

use std::path::{Path, PathBuf};

use vili_core::{FileSystem, InstanceId, SlotKind};

use crate::error::LayoutError;

/// Derive a version name from a freshly-dropped artifact's file name,
/// e.g. `foo-2.jar` -> `foo-2`.
pub fn version_name_from_artifact(artifact_path: &Path) -> Result<String, LayoutError> {
    let stem = artifact_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LayoutError::InvalidArtifactName(artifact_path.to_path_buf()))?;
    Ok(stem.to_string())
}

/// Materialise `WD/<version_name>/` containing `<identifier>.jar` copied
/// in from the dropped artifact. Returns the new version directory.
pub fn materialise_version<FS: FileSystem>(
    fs: &FS,
    working_dir: &Path,
    identifier: &str,
    artifact_path: &Path,
    version_name: &str,
) -> Result<PathBuf, LayoutError> {
    let version_dir = working_dir.join(version_name);
    fs.create_dir_all(&version_dir)?;
    let jar_dest = version_dir.join(format!("{identifier}.jar"));
    fs.copy_all(artifact_path, &jar_dest)?;
    Ok(version_dir)
}

/// Options controlling how the properties file (if any) is rewritten
/// into the new instance directory.
pub struct PropertiesOptions<'a> {
    pub properties_file_name: Option<&'a str>,
    pub port_identifier: Option<&'a str>,
}

/// Materialise `<version_dir>/<timestamp>_<slot>/`: the jar symlink, the
/// `logs/json` directory, an optional rewritten properties file and
/// copied `authorization.properties`, and the `current`/`logs` symlinks
/// pointing back at this instance (spec §6).
pub fn materialise_instance<FS: FileSystem>(
    fs: &FS,
    version_dir: &Path,
    identifier: &str,
    instance_id: &InstanceId,
    slot: SlotKind,
    port: u16,
    properties: &PropertiesOptions<'_>,
) -> Result<PathBuf, LayoutError> {
    let instance_dir = version_dir.join(instance_id.as_str());
    fs.create_dir_all(&instance_dir.join("logs").join("json"))?;

    let jar_src = version_dir.join(format!("{identifier}.jar"));
    let jar_link = instance_dir.join(format!("{identifier}.jar"));
    fs.symlink(&jar_src, &jar_link)?;

    if let Some(name) = properties.properties_file_name {
        let src = version_dir.join(name);
        if fs.exists(&src) {
            let contents = fs.read(&src)?;
            let rewritten = rewrite_properties(&contents, properties.port_identifier, port, slot);
            fs.write(&instance_dir.join(name), rewritten.as_bytes())?;
        }
        let auth_src = version_dir.join("authorization.properties");
        if fs.exists(&auth_src) {
            let contents = fs.read(&auth_src)?;
            fs.write(&instance_dir.join("authorization.properties"), &contents)?;
        }
    }

    replace_symlink(fs, &version_dir.join("current"), &instance_dir)?;
    replace_symlink(fs, &version_dir.join("logs"), &instance_dir.join("logs"))?;

    Ok(instance_dir)
}

/// Point `WD/<identifier>-<slot>` (and its paired `logs_` symlink) at
/// `version_dir`, replacing whatever the symlink previously targeted.
pub fn point_slot_symlink<FS: FileSystem>(
    fs: &FS,
    working_dir: &Path,
    identifier: &str,
    slot: SlotKind,
    version_dir: &Path,
) -> Result<(), LayoutError> {
    let link = working_dir.join(format!("{identifier}-{}", slot.as_str()));
    replace_symlink(fs, &link, version_dir)?;

    let logs_link = working_dir.join(format!("logs_{identifier}-{}", slot.as_str()));
    replace_symlink(fs, &logs_link, &version_dir.join("logs"))?;
    Ok(())
}

fn replace_symlink<FS: FileSystem>(fs: &FS, link: &Path, target: &Path) -> Result<(), LayoutError> {
    if fs.exists(link) {
        fs.remove(link)?;
    }
    fs.symlink(target, link)?;
    Ok(())
}

/// Rewrite a properties file's port line in place (overwriting an
/// existing `<port_identifier>=…` entry or appending one), prepend a
/// preamble comment, and append `vili.test=<true|false>` for the slot.
fn rewrite_properties(contents: &[u8], port_identifier: Option<&str>, port: u16, slot: SlotKind) -> String {
    let text = String::from_utf8_lossy(contents);
    let mut lines: Vec<String> = Vec::new();
    let mut found_port_line = false;

    for line in text.lines() {
        if let Some(ident) = port_identifier {
            let prefix = format!("{ident}=");
            if line.starts_with(&prefix) {
                lines.push(format!("{prefix}{port}"));
                found_port_line = true;
                continue;
            }
        }
        lines.push(line.to_string());
    }
    if let Some(ident) = port_identifier {
        if !found_port_line {
            lines.push(format!("{ident}={port}"));
        }
    }

    let mut out = String::from("# rewritten by vili at instance materialisation\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("vili.test={}\n", slot == SlotKind::Testing));
    out
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
