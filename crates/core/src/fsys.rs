// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem abstraction shared by the watcher, archiver, tailer and
//! instance launcher. A real-disk backend and an in-memory backend both
//! implement [`FileSystem`], so the adapters and the engine can run their
//! test suites without touching disk or depending on path layout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(PathBuf),
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: FileKind,
    pub len: u64,
    pub modified: SystemTime,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// The subset of filesystem operations the daemon needs: reading and
/// writing whole files, directory creation and listing, symlinks, and a
/// recursive copy for instance directory materialisation.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;
    fn symlink(&self, original: &Path, link: &Path) -> Result<(), FsError>;
    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError>;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FsError>;
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Recursively copy `src` (file or directory) into `dst`.
    fn copy_all(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        let meta = self.metadata(src)?;
        if meta.is_dir() {
            self.create_dir_all(dst)?;
            for child in self.read_dir(src)? {
                let name = child.file_name().ok_or_else(|| FsError::NotFound(child.clone()))?;
                self.copy_all(&child, &dst.join(name))?;
            }
            Ok(())
        } else {
            let contents = self.read(src)?;
            self.write(dst, &contents)
        }
    }
}

/// Real-disk implementation, a thin wrapper over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        std::fs::read(path).map_err(|source| FsError::Io { path: path.to_path_buf(), source })
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        std::fs::write(path, contents).map_err(|source| FsError::Io { path: path.to_path_buf(), source })
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        std::fs::create_dir_all(path).map_err(|source| FsError::Io { path: path.to_path_buf(), source })
    }

    fn symlink(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(original, link)
                .map_err(|source| FsError::Io { path: link.to_path_buf(), source })
        }
        #[cfg(not(unix))]
        {
            let _ = (original, link);
            unimplemented!("symlinks are only supported on unix hosts")
        }
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        std::fs::read_link(path).map_err(|source| FsError::Io { path: path.to_path_buf(), source })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        let entries = std::fs::read_dir(path).map_err(|source| FsError::Io { path: path.to_path_buf(), source })?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| FsError::Io { path: path.to_path_buf(), source })?;
            out.push(entry.path());
        }
        Ok(out)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let meta = std::fs::symlink_metadata(path).map_err(|_| FsError::NotFound(path.to_path_buf()))?;
        let kind = if meta.is_dir() {
            FileKind::Dir
        } else if meta.file_type().is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::File
        };
        Ok(Metadata {
            kind,
            len: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let meta = self.metadata(path)?;
        let result = if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        result.map_err(|source| FsError::Io { path: path.to_path_buf(), source })
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    kind: NodeKind,
    modified: SystemTime,
}

/// In-memory filesystem for fast, hermetic tests. Nodes live in a flat
/// arena (`Vec<Node>`) addressed by index; a node's parent is an index,
/// not an owning pointer, so the directory tree can contain cycles (`.`
/// style self-references) without fighting the borrow checker.
#[cfg(any(test, feature = "test-support"))]
pub struct InMemFs {
    inner: Mutex<InMemFsInner>,
}

#[cfg(any(test, feature = "test-support"))]
struct InMemFsInner {
    nodes: Vec<Option<Node>>,
    root: usize,
    children: HashMap<usize, HashMap<String, usize>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for InMemFs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl InMemFs {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            kind: NodeKind::Dir,
            modified: SystemTime::UNIX_EPOCH,
        };
        let mut inner = InMemFsInner {
            nodes: vec![Some(root)],
            root: 0,
            children: HashMap::new(),
        };
        inner.children.insert(0, HashMap::new());
        Self { inner: Mutex::new(inner) }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl InMemFsInner {
    fn components(path: &Path) -> Vec<String> {
        path.components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn resolve(&self, path: &Path) -> Option<usize> {
        let mut cursor = self.root;
        for part in Self::components(path) {
            cursor = *self.children.get(&cursor)?.get(&part)?;
        }
        Some(cursor)
    }

}

#[cfg(any(test, feature = "test-support"))]
impl FileSystem for InMemFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let inner = self.inner.lock();
        let idx = inner.resolve(path).ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        match &inner.nodes[idx].as_ref().unwrap().kind {
            NodeKind::File(contents) => Ok(contents.clone()),
            _ => Err(FsError::NotAFile(path.to_path_buf())),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        let parts = InMemFsInner::components(path);
        let (dir_parts, name) = match parts.split_last() {
            Some((name, rest)) => (rest.to_vec(), name.clone()),
            None => return Err(FsError::NotAFile(path.to_path_buf())),
        };
        let dir_idx = ensure_dir_path(&mut inner, &dir_parts)?;

        if let Some(existing) = inner.children.get(&dir_idx).and_then(|m| m.get(&name)).copied() {
            inner.nodes[existing] = Some(Node {
                parent: Some(dir_idx),
                kind: NodeKind::File(contents.to_vec()),
                modified: SystemTime::now(),
            });
            return Ok(());
        }

        let node = Node {
            parent: Some(dir_idx),
            kind: NodeKind::File(contents.to_vec()),
            modified: SystemTime::now(),
        };
        let idx = inner.nodes.len();
        inner.nodes.push(Some(node));
        inner.children.entry(dir_idx).or_default().insert(name, idx);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        let parts = InMemFsInner::components(path);
        ensure_dir_path(&mut inner, &parts)?;
        Ok(())
    }

    fn symlink(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        let parts = InMemFsInner::components(link);
        let (dir_parts, name) = match parts.split_last() {
            Some((name, rest)) => (rest.to_vec(), name.clone()),
            None => return Err(FsError::NotAFile(link.to_path_buf())),
        };
        let dir_idx = ensure_dir_path(&mut inner, &dir_parts)?;
        if inner.children.get(&dir_idx).and_then(|m| m.get(&name)).is_some() {
            return Err(FsError::AlreadyExists(link.to_path_buf()));
        }
        let node = Node {
            parent: Some(dir_idx),
            kind: NodeKind::Symlink(original.to_path_buf()),
            modified: SystemTime::now(),
        };
        let idx = inner.nodes.len();
        inner.nodes.push(Some(node));
        inner.children.entry(dir_idx).or_default().insert(name, idx);
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        let inner = self.inner.lock();
        let idx = inner.resolve(path).ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        match &inner.nodes[idx].as_ref().unwrap().kind {
            NodeKind::Symlink(target) => Ok(target.clone()),
            _ => Err(FsError::NotFound(path.to_path_buf())),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        let inner = self.inner.lock();
        let idx = inner.resolve(path).ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        match &inner.nodes[idx].as_ref().unwrap().kind {
            NodeKind::Dir => {}
            _ => return Err(FsError::NotADirectory(path.to_path_buf())),
        }
        let mut out: Vec<PathBuf> = inner
            .children
            .get(&idx)
            .map(|m| m.keys().map(|name| path.join(name)).collect())
            .unwrap_or_default();
        out.sort();
        Ok(out)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let inner = self.inner.lock();
        let idx = inner.resolve(path).ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        let node = inner.nodes[idx].as_ref().unwrap();
        let (kind, len) = match &node.kind {
            NodeKind::File(contents) => (FileKind::File, contents.len() as u64),
            NodeKind::Dir => (FileKind::Dir, 0),
            NodeKind::Symlink(_) => (FileKind::Symlink, 0),
        };
        Ok(Metadata { kind, len, modified: node.modified })
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        let parts = InMemFsInner::components(path);
        let (parent_parts, name) = match parts.split_last() {
            Some((name, rest)) => (rest.to_vec(), name.clone()),
            None => return Err(FsError::NotFound(path.to_path_buf())),
        };
        let parent_idx = inner
            .resolve(&parent_parts.iter().collect::<PathBuf>())
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        let removed = inner
            .children
            .get_mut(&parent_idx)
            .and_then(|m| m.remove(&name))
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        inner.children.remove(&removed);
        inner.nodes[removed] = None;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
fn ensure_dir_path(inner: &mut InMemFsInner, parts: &[String]) -> Result<usize, FsError> {
    let mut cursor = inner.root;
    for part in parts {
        let existing = inner.children.get(&cursor).and_then(|m| m.get(part)).copied();
        cursor = match existing {
            Some(idx) => {
                match &inner.nodes[idx].as_ref().unwrap().kind {
                    NodeKind::Dir => idx,
                    _ => return Err(FsError::NotADirectory(PathBuf::from(part))),
                }
            }
            None => {
                let node = Node {
                    parent: Some(cursor),
                    kind: NodeKind::Dir,
                    modified: SystemTime::now(),
                };
                let idx = inner.nodes.len();
                inner.nodes.push(Some(node));
                inner.children.entry(cursor).or_default().insert(part.clone(), idx);
                inner.children.insert(idx, HashMap::new());
                idx
            }
        };
    }
    Ok(cursor)
}

#[cfg(test)]
#[path = "fsys_tests.rs"]
mod tests;
