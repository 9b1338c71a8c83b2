use crate::filter::archive_candidates;
use crate::manifest::{parse_manifest, ModuleDescriptor};
use crate::{ModulesError, MODULES_MANIFEST_PATH, VENDORED_MODULES_PREFIX};
use modvault_fs::{
    clean_path, has_path_prefix, walk_dir, FileKind, FileSystem, FsError, WalkEntry,
};
use std::io::Read;
use tracing::debug;

/// Ownership and permissions of the trailing `modules.json` entry.
const MANIFEST_UID: u64 = 1000;
const MANIFEST_GID: u64 = 1000;
const MANIFEST_MODE: u32 = 0o644;

/// Pack every vendored module under `root` into a tar archive.
///
/// Modules are taken in manifest order and each module directory is walked
/// with [`walk_dir`]. Directories and regular files get an entry; symlinks
/// and other object kinds are skipped. The manifest itself is appended last
/// as `.terraform/modules/modules.json` (uid/gid 1000, mode 0644).
///
/// Returns an empty vector when `root` has no manifest, or when no module
/// contributed a regular file.
///
/// Determinism guarantees:
/// - Entry order depends only on manifest order and file names
/// - All timestamps set to 0 (Unix epoch)
/// - Walked entries owned by 0:0, with no user or group names
/// - Permission bits preserved as-is from the source tree
pub fn build_modules_archive<F: FileSystem + ?Sized>(root: &F) -> Result<Vec<u8>, ModulesError> {
    let manifest_data = match root.read_file(MODULES_MANIFEST_PATH) {
        Ok(data) => data,
        Err(e) if e.is_not_found() => {
            debug!("no modules manifest, nothing to archive");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ModulesError::ReadManifest {
                path: MODULES_MANIFEST_PATH.to_owned(),
                source,
            })
        }
    };
    let manifest = parse_manifest(&manifest_data)?;

    let mut ar = tar::Builder::new(Vec::new());
    let mut has_files = false;

    for module in archive_candidates(&manifest) {
        debug!("archiving module {} from {}", module.key, module.dir);
        let dir = clean_path(&module.dir);
        if !has_path_prefix(&dir, VENDORED_MODULES_PREFIX.trim_end_matches('/')) {
            let source = FsError::InvalidPath(module.dir.clone());
            return Err(module_error("walk", module, &module.dir, source));
        }
        let entries =
            walk_dir(root, &dir).map_err(|source| module_error("walk", module, &dir, source))?;

        for entry in &entries {
            match entry.metadata.kind {
                FileKind::Dir => append_dir(&mut ar, module, entry)?,
                FileKind::File => {
                    append_file(&mut ar, root, module, entry)?;
                    has_files = true;
                }
                FileKind::Symlink | FileKind::Other => {
                    debug!("skipping unsupported file type: {}", entry.path);
                }
            }
        }
    }

    append_manifest(&mut ar, &manifest_data)?;
    let data = ar.into_inner().map_err(|source| ModulesError::Archive {
        path: MODULES_MANIFEST_PATH.to_owned(),
        source,
    })?;

    if !has_files {
        debug!("no module files archived, discarding archive");
        return Ok(Vec::new());
    }
    Ok(data)
}

/// blake3 digest of an archive, hex encoded. Identical inputs to
/// [`build_modules_archive`] give identical digests.
pub fn archive_digest(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

fn module_error(
    op: &'static str,
    module: &ModuleDescriptor,
    path: &str,
    source: FsError,
) -> ModulesError {
    ModulesError::Module {
        op,
        module: module.key.clone(),
        path: path.to_owned(),
        source,
    }
}

fn make_header(entry_type: tar::EntryType, mode: u32, size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode & 0o7777);
    header.set_size(size);
    header
}

fn append_dir(
    ar: &mut tar::Builder<Vec<u8>>,
    module: &ModuleDescriptor,
    entry: &WalkEntry,
) -> Result<(), ModulesError> {
    let mut header = make_header(tar::EntryType::Directory, entry.metadata.mode, 0);
    header.set_cksum();
    let path = format!("{}/", entry.path);
    ar.append_data(&mut header, &path, &[] as &[u8])
        .map_err(|e| module_error("archive", module, &entry.path, FsError::io(&entry.path, e)))
}

fn append_file<F: FileSystem + ?Sized>(
    ar: &mut tar::Builder<Vec<u8>>,
    root: &F,
    module: &ModuleDescriptor,
    entry: &WalkEntry,
) -> Result<(), ModulesError> {
    let mut file = root
        .open(&entry.path)
        .map_err(|source| module_error("open", module, &entry.path, source))?;
    let mut data = Vec::with_capacity(entry.metadata.size as usize);
    file.read_to_end(&mut data)
        .map_err(|e| module_error("read", module, &entry.path, FsError::io(&entry.path, e)))?;

    let mut header = make_header(tar::EntryType::Regular, entry.metadata.mode, data.len() as u64);
    header.set_cksum();
    ar.append_data(&mut header, &entry.path, data.as_slice())
        .map_err(|e| module_error("archive", module, &entry.path, FsError::io(&entry.path, e)))
}

fn append_manifest(ar: &mut tar::Builder<Vec<u8>>, data: &[u8]) -> Result<(), ModulesError> {
    let mut header = make_header(tar::EntryType::Regular, MANIFEST_MODE, data.len() as u64);
    header.set_uid(MANIFEST_UID);
    header.set_gid(MANIFEST_GID);
    header.set_cksum();
    ar.append_data(&mut header, MODULES_MANIFEST_PATH, data)
        .map_err(|source| ModulesError::Archive {
            path: MODULES_MANIFEST_PATH.to_owned(),
            source,
        })
}
