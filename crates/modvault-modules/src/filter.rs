use crate::manifest::{ModuleDescriptor, ModulesManifest};

/// Modules worth reporting to callers: everything except the root module.
pub fn public_modules(manifest: &ModulesManifest) -> Vec<ModuleDescriptor> {
    manifest
        .modules
        .iter()
        .filter(|module| !module.is_root())
        .cloned()
        .collect()
}

/// Modules whose files belong in the archive: those materialized under
/// `.terraform/modules/`. Local modules and the root module already live in
/// the configuration's own tree.
pub fn archive_candidates(manifest: &ModulesManifest) -> Vec<&ModuleDescriptor> {
    manifest
        .modules
        .iter()
        .filter(|module| module.is_vendored())
        .collect()
}
