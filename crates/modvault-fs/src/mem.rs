use crate::path::{clean_path, join_path, normalize_relative, split_parent};
use crate::{DirEntry, FileHandle, FileSystem, FsError, Metadata};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

const DEFAULT_DIR_MODE: u32 = 0o755;
const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir { mode: u32 },
    File { mode: u32, data: Vec<u8> },
    Symlink { target: String },
}

impl Node {
    fn metadata(&self) -> Metadata {
        match self {
            Node::Dir { mode } => Metadata::dir(*mode),
            Node::File { mode, data } => Metadata::file(*mode, data.len() as u64),
            Node::Symlink { .. } => Metadata::symlink(),
        }
    }
}

/// An in-memory tree keyed by cleaned relative path.
///
/// Parent directories are created implicitly on insert. Loading a tar archive
/// with [`MemFs::from_tar`] gives read access to the archive's entries through
/// the same [`FileSystem`] interface as a host directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemFs {
    nodes: BTreeMap<String, Node>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a tar archive. Directories, regular files and
    /// symlinks are kept; other entry types are skipped. A later entry for
    /// the same path replaces an earlier one.
    pub fn from_tar(data: &[u8]) -> Result<Self, FsError> {
        let mut tree = Self::new();
        let mut archive = tar::Archive::new(data);
        for entry in archive.entries().map_err(FsError::Archive)? {
            let mut entry = entry.map_err(FsError::Archive)?;
            let path = entry
                .path()
                .map_err(FsError::Archive)?
                .to_string_lossy()
                .into_owned();
            let mode = entry.header().mode().map_err(FsError::Archive)?;

            match entry.header().entry_type() {
                tar::EntryType::Directory => {
                    if clean_path(&path) != "." {
                        tree.insert_dir(&path, mode)?;
                    }
                }
                tar::EntryType::Regular | tar::EntryType::Continuous => {
                    let mut content = Vec::new();
                    entry
                        .read_to_end(&mut content)
                        .map_err(FsError::Archive)?;
                    tree.insert_file(&path, content, mode)?;
                }
                tar::EntryType::Symlink => {
                    let target = entry
                        .link_name()
                        .map_err(FsError::Archive)?
                        .map(|t| t.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    tree.insert_symlink(&path, &target)?;
                }
                other => debug!("skipping tar entry {path}: unsupported type {other:?}"),
            }
        }
        Ok(tree)
    }

    pub fn insert_file(
        &mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        mode: u32,
    ) -> Result<(), FsError> {
        let key = self.prepare_insert(path)?;
        self.nodes.insert(
            key,
            Node::File {
                mode: mode & 0o7777,
                data: data.into(),
            },
        );
        Ok(())
    }

    pub fn insert_dir(&mut self, path: &str, mode: u32) -> Result<(), FsError> {
        let key = self.prepare_insert(path)?;
        self.nodes.insert(key, Node::Dir { mode: mode & 0o7777 });
        Ok(())
    }

    pub fn insert_symlink(&mut self, path: &str, target: &str) -> Result<(), FsError> {
        let key = self.prepare_insert(path)?;
        self.nodes.insert(
            key,
            Node::Symlink {
                target: target.to_owned(),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Normalize `path`, refuse the root itself, and make sure every ancestor
    /// is a directory.
    fn prepare_insert(&mut self, path: &str) -> Result<String, FsError> {
        let key = normalize_relative(path)?;
        if key == "." {
            return Err(FsError::InvalidPath(path.to_owned()));
        }

        let mut ancestor = String::from(".");
        let (parent, _) = split_parent(&key);
        if parent != "." {
            for component in parent.split('/') {
                ancestor = join_path(&ancestor, component);
                match self.nodes.get(&ancestor) {
                    Some(Node::Dir { .. }) => {}
                    Some(_) => return Err(FsError::NotADirectory(ancestor)),
                    None => {
                        self.nodes.insert(
                            ancestor.clone(),
                            Node::Dir {
                                mode: DEFAULT_DIR_MODE,
                            },
                        );
                    }
                }
            }
        }
        Ok(key)
    }

    /// Look up `path`, following symlinks in the final component. Returns the
    /// resolved key alongside the node; the root resolves to `None`.
    fn resolve(&self, path: &str) -> Result<(String, Option<&Node>), FsError> {
        let mut key = normalize_relative(path)?;
        for _ in 0..MAX_SYMLINK_HOPS {
            if key == "." {
                return Ok((key, None));
            }
            match self.nodes.get(&key) {
                None => return Err(FsError::NotFound(path.to_owned())),
                Some(Node::Symlink { target }) => {
                    let (parent, _) = split_parent(&key);
                    key = normalize_relative(&join_path(parent, target))
                        .map_err(|_| FsError::NotFound(path.to_owned()))?;
                }
                Some(node) => return Ok((key, Some(node))),
            }
        }
        Err(FsError::SymlinkLoop(path.to_owned()))
    }
}

impl FileSystem for MemFs {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError> {
        let Some(node) = self.resolve(path)?.1 else {
            return Ok(FileHandle::empty(Metadata::dir(DEFAULT_DIR_MODE)));
        };
        match node {
            Node::File { data, .. } => Ok(FileHandle::new(node.metadata(), data.as_slice())),
            _ => Ok(FileHandle::empty(node.metadata())),
        }
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        match self.resolve(path)?.1 {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            _ => Err(FsError::IsADirectory(path.to_owned())),
        }
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let (key, node) = self.resolve(path)?;
        if !matches!(node, None | Some(Node::Dir { .. })) {
            return Err(FsError::NotADirectory(path.to_owned()));
        }

        let prefix = if key == "." {
            String::new()
        } else {
            format!("{key}/")
        };
        let entries = self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, node)| {
                let name = &k[prefix.len()..];
                (!name.contains('/')).then(|| DirEntry {
                    name: name.to_owned(),
                    metadata: node.metadata(),
                })
            })
            .collect();
        Ok(entries)
    }
}
