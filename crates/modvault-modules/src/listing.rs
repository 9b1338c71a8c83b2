use crate::filter::public_modules;
use crate::manifest::{modules_manifest_path, parse_manifest, ModuleDescriptor};
use crate::ModulesError;
use modvault_fs::FsError;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// List the non-root modules recorded in `workdir`'s manifest.
///
/// The manifest only exists once modules have been fetched, so a missing
/// file yields an empty list rather than an error. A file that exists but
/// cannot be read or decoded is an error.
pub fn list_modules(workdir: &Path) -> Result<Vec<ModuleDescriptor>, ModulesError> {
    let path = modules_manifest_path(workdir);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no modules manifest at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            let display = path.display().to_string();
            return Err(ModulesError::ReadManifest {
                source: FsError::io(&display, e),
                path: display,
            });
        }
    };

    let manifest = parse_manifest(&data)?;
    Ok(public_modules(&manifest))
}
