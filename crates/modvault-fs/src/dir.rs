use crate::path::normalize_relative;
use crate::{DirEntry, FileHandle, FileKind, FileSystem, FsError, Metadata};
use std::fs;
use std::path::{Path, PathBuf};

/// A tree rooted at a host directory.
///
/// Paths are resolved lexically under the root; anything that would climb
/// above it is rejected with [`FsError::InvalidPath`]. `open` follows
/// symlinks, `read_dir` reports them without following.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        let rel = normalize_relative(path)?;
        if rel == "." {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(rel))
    }
}

impl FileSystem for DirFs {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| FsError::io(path, e))?;
        let metadata = metadata_from(&meta);
        if !meta.is_file() {
            return Ok(FileHandle::empty(metadata));
        }
        let file = fs::File::open(&full).map_err(|e| FsError::io(path, e))?;
        Ok(FileHandle::new(metadata, file))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| FsError::io(path, e))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(path.to_owned()));
        }
        fs::read(&full).map_err(|e| FsError::io(path, e))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| FsError::io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(path.to_owned()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| FsError::io(path, e))? {
            let entry = entry.map_err(|e| FsError::io(path, e))?;
            let name = entry
                .file_name()
                .into_string()
                .map_err(|raw| FsError::InvalidPath(raw.to_string_lossy().into_owned()))?;
            let meta = entry
                .path()
                .symlink_metadata()
                .map_err(|e| FsError::io(path, e))?;
            entries.push(DirEntry {
                name,
                metadata: metadata_from(&meta),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

fn metadata_from(meta: &fs::Metadata) -> Metadata {
    let ft = meta.file_type();
    if ft.is_symlink() {
        Metadata::symlink()
    } else if ft.is_dir() {
        Metadata::dir(permission_bits(meta))
    } else if ft.is_file() {
        Metadata::file(permission_bits(meta), meta.len())
    } else {
        Metadata {
            kind: FileKind::Other,
            mode: permission_bits(meta),
            size: 0,
        }
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn fixture() -> (tempfile::TempDir, DirFs) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.tf"), "terraform {}").unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("nested/b.txt"), "b").unwrap();
        fs::write(dir.path().join("nested/a.txt"), "a").unwrap();
        let tree = DirFs::new(dir.path());
        (dir, tree)
    }

    #[test]
    fn read_file_and_open_agree() {
        let (_dir, tree) = fixture();
        assert_eq!(tree.read_file("main.tf").unwrap(), b"terraform {}");

        let mut handle = tree.open("./nested/../main.tf").unwrap();
        assert!(handle.metadata().is_file());
        assert_eq!(handle.metadata().size, 12);
        let mut content = String::new();
        handle.read_to_string(&mut content).unwrap();
        assert_eq!(content, "terraform {}");
    }

    #[test]
    fn read_dir_is_sorted() {
        let (_dir, tree) = fixture();
        let names: Vec<_> = tree
            .read_dir("nested")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["a.txt", "b.txt", "deeper"]);
    }

    #[test]
    fn root_is_a_directory() {
        let (_dir, tree) = fixture();
        assert!(tree.open(".").unwrap().metadata().is_dir());
        assert!(tree.open("").unwrap().metadata().is_dir());
    }

    #[test]
    fn missing_path_is_not_found() {
        let (_dir, tree) = fixture();
        assert!(tree.read_file("nope.tf").unwrap_err().is_not_found());
        assert!(tree.open("nope").unwrap_err().is_not_found());
        assert!(tree.read_dir("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn escaping_root_is_rejected() {
        let (_dir, tree) = fixture();
        assert!(matches!(
            tree.read_file("../etc/passwd"),
            Err(FsError::InvalidPath(_))
        ));
        assert!(matches!(tree.open("/etc/passwd"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn kind_mismatches_are_reported() {
        let (_dir, tree) = fixture();
        assert!(matches!(
            tree.read_file("nested"),
            Err(FsError::IsADirectory(_))
        ));
        assert!(matches!(
            tree.read_dir("main.tf"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_listed_not_followed() {
        let (dir, tree) = fixture();
        std::os::unix::fs::symlink("main.tf", dir.path().join("link.tf")).unwrap();
        let link = tree
            .read_dir(".")
            .unwrap()
            .into_iter()
            .find(|e| e.name == "link.tf")
            .unwrap();
        assert_eq!(link.metadata.kind, FileKind::Symlink);
        assert_eq!(tree.read_file("link.tf").unwrap(), b"terraform {}");
    }

    #[cfg(unix)]
    #[test]
    fn permission_bits_are_preserved() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, tree) = fixture();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();
        assert_eq!(tree.open("run.sh").unwrap().metadata().mode, 0o750);
    }
}
