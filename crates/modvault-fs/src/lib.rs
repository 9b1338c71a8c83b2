//! Read-only filesystem abstraction and path-prefix overlays for modvault.
//!
//! This crate provides the `FileSystem` capability trait (`open`, `read_file`,
//! `read_dir`), two concrete trees (`DirFs` over a host directory and `MemFs`
//! held in memory, loadable from a tar archive), the `OverlayFs` router that
//! joins supplementary trees onto a base tree at fixed prefixes, a
//! deterministic recursive `walk_dir`, and `OverlayConfig` for describing
//! overlays on disk.

pub mod config;
pub mod dir;
pub mod mem;
pub mod overlay;
pub mod path;
pub mod walk;

pub use config::{OverlayConfig, OverlayMount};
pub use dir::DirFs;
pub use mem::MemFs;
pub use overlay::{compose_overlay, Overlay, OverlayFs};
pub use path::{clean_path, has_path_prefix};
pub use walk::{walk_dir, WalkEntry};

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("invalid path '{0}': must be relative and stay inside the filesystem root")]
    InvalidPath(String),
    #[error("too many levels of symbolic links: {0}")]
    SymlinkLoop(String),
    #[error("filesystem does not support {op} (requested for '{path}')")]
    Unsupported { op: &'static str, path: String },
    #[error("overlay prefix '{0}' is registered more than once")]
    DuplicateOverlay(String),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid tar archive: {0}")]
    Archive(#[source] io::Error),
    #[error("overlay config error: {0}")]
    Config(String),
}

impl FsError {
    /// Wrap an I/O error for `path`, folding `ErrorKind::NotFound` into
    /// [`FsError::NotFound`] so callers only have one case to match.
    pub fn io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return FsError::NotFound(path.to_owned());
        }
        FsError::Io {
            path: path.to_owned(),
            source,
        }
    }

    pub fn unsupported(op: &'static str, path: &str) -> Self {
        FsError::Unsupported {
            op,
            path: path.to_owned(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::NotFound(_) => true,
            FsError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, FsError::Unsupported { .. })
    }
}

/// Kind of a filesystem object. Symlinks are reported as such and never followed
/// by directory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Dir,
    File,
    Symlink,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub kind: FileKind,
    /// Permission bits only (`0o7777`); file type bits are carried by `kind`.
    pub mode: u32,
    /// Content length for regular files, zero for everything else.
    pub size: u64,
}

impl Metadata {
    pub fn dir(mode: u32) -> Self {
        Self {
            kind: FileKind::Dir,
            mode: mode & 0o7777,
            size: 0,
        }
    }

    pub fn file(mode: u32, size: u64) -> Self {
        Self {
            kind: FileKind::File,
            mode: mode & 0o7777,
            size,
        }
    }

    pub fn symlink() -> Self {
        Self {
            kind: FileKind::Symlink,
            mode: 0o777,
            size: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// One child of a directory, as returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub metadata: Metadata,
}

/// An open file or directory. Directories read as empty.
pub struct FileHandle<'a> {
    metadata: Metadata,
    reader: Box<dyn Read + 'a>,
}

impl<'a> FileHandle<'a> {
    pub fn new(metadata: Metadata, reader: impl Read + 'a) -> Self {
        Self {
            metadata,
            reader: Box::new(reader),
        }
    }

    pub fn empty(metadata: Metadata) -> Self {
        Self::new(metadata, io::empty())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl Read for FileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for FileHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A read-only tree addressed by slash-separated relative paths, with `.` as
/// the root.
///
/// `open` is the only mandatory capability. `read_file` and `read_dir` are
/// optional: a tree that cannot provide them keeps the default
/// implementation, which fails with [`FsError::Unsupported`].
///
/// `read_dir` implementations return entries sorted by name.
pub trait FileSystem {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        Err(FsError::unsupported("read_file", path))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        Err(FsError::unsupported("read_dir", path))
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError> {
        (**self).open(path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        (**self).read_file(path)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        (**self).read_dir(path)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for Box<T> {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError> {
        (**self).open(path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        (**self).read_file(path)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        (**self).read_dir(path)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError> {
        (**self).open(path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        (**self).read_file(path)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        (**self).read_dir(path)
    }
}
