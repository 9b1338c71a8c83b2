//! Vendored module manifests and reproducible module archives for modvault.
//!
//! This crate reads the `.terraform/modules/modules.json` manifest written by
//! `terraform init` (`parse_manifest`), classifies its entries into root,
//! vendored and local modules (`public_modules`, `archive_candidates`), lists
//! the externally meaningful modules of a working directory (`list_modules`),
//! and packs the vendored module trees into a byte-reproducible tar archive
//! (`build_modules_archive`) whose blake3 digest serves as a deduplication key
//! (`archive_digest`).

pub mod archive;
pub mod filter;
pub mod listing;
pub mod manifest;

pub use archive::{archive_digest, build_modules_archive};
pub use filter::{archive_candidates, public_modules};
pub use listing::list_modules;
pub use manifest::{
    modules_manifest_path, parse_manifest, ModuleDescriptor, ModuleKind, ModulesManifest,
};

use modvault_fs::FsError;
use thiserror::Error;

/// Location of the module manifest relative to a working directory.
pub const MODULES_MANIFEST_PATH: &str = ".terraform/modules/modules.json";

/// Directory prefix of modules fetched from a remote source.
pub const VENDORED_MODULES_PREFIX: &str = ".terraform/modules/";

#[derive(Debug, Error)]
pub enum ModulesError {
    #[error("failed to read modules manifest '{path}': {source}")]
    ReadManifest {
        path: String,
        #[source]
        source: FsError,
    },
    #[error("malformed modules manifest: {0}")]
    MalformedManifest(#[from] serde_json::Error),
    #[error("failed to {op} '{path}' for module '{module}': {source}")]
    Module {
        op: &'static str,
        module: String,
        path: String,
        #[source]
        source: FsError,
    },
    #[error("failed to write '{path}' to modules archive: {source}")]
    Archive {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ModulesError {
    /// Whether the failure came from a filesystem lacking a required capability.
    pub fn is_unsupported(&self) -> bool {
        match self {
            ModulesError::ReadManifest { source, .. } | ModulesError::Module { source, .. } => {
                source.is_unsupported()
            }
            _ => false,
        }
    }
}
