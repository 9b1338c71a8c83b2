use crate::{ModulesError, VENDORED_MODULES_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry of `modules.json`.
///
/// Fields missing from the document decode as empty strings; nothing here is
/// validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "PascalCase")]
pub struct ModuleDescriptor {
    pub source: String,
    pub version: String,
    pub key: String,
    pub dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// The top-level configuration itself (empty `Source`).
    Root,
    /// Fetched from a remote source into `.terraform/modules/`.
    Vendored,
    /// Already part of the configuration's own file tree.
    Local,
}

impl ModuleDescriptor {
    pub fn is_root(&self) -> bool {
        self.source.is_empty()
    }

    pub fn is_vendored(&self) -> bool {
        self.dir.starts_with(VENDORED_MODULES_PREFIX)
    }

    pub fn kind(&self) -> ModuleKind {
        if self.is_root() {
            ModuleKind::Root
        } else if self.is_vendored() {
            ModuleKind::Vendored
        } else {
            ModuleKind::Local
        }
    }
}

/// The decoded manifest. Entry order is significant and preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModulesManifest {
    #[serde(rename = "Modules")]
    pub modules: Vec<ModuleDescriptor>,
}

/// Decode a `modules.json` document. The document must be an object with a
/// `Modules` array; unknown fields are ignored.
pub fn parse_manifest(data: &[u8]) -> Result<ModulesManifest, ModulesError> {
    Ok(serde_json::from_slice(data)?)
}

/// Host path of the module manifest under `workdir`.
pub fn modules_manifest_path(workdir: &Path) -> PathBuf {
    workdir.join(".terraform").join("modules").join("modules.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terraform_manifest() {
        let input = br#"{"Modules":[
            {"Key":"","Source":"","Dir":"."},
            {"Key":"vpc","Source":"registry.terraform.io/acme/vpc/aws","Version":"1.2.0","Dir":".terraform/modules/vpc"},
            {"Key":"local","Source":"./modules/local","Dir":"modules/local"}
        ]}"#;
        let manifest = parse_manifest(input).unwrap();
        assert_eq!(manifest.modules.len(), 3);

        let vpc = &manifest.modules[1];
        assert_eq!(vpc.key, "vpc");
        assert_eq!(vpc.version, "1.2.0");
        assert_eq!(vpc.dir, ".terraform/modules/vpc");

        let kinds: Vec<_> = manifest.modules.iter().map(ModuleDescriptor::kind).collect();
        assert_eq!(
            kinds,
            [ModuleKind::Root, ModuleKind::Vendored, ModuleKind::Local]
        );
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let manifest = parse_manifest(br#"{"Modules":[{"Key":"only-key"}]}"#).unwrap();
        let module = &manifest.modules[0];
        assert_eq!(module.key, "only-key");
        assert!(module.source.is_empty());
        assert!(module.dir.is_empty());
        assert!(module.is_root());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let manifest =
            parse_manifest(br#"{"Modules":[{"Key":"a","Extra":1}],"Format":2}"#).unwrap();
        assert_eq!(manifest.modules[0].key, "a");
    }

    #[test]
    fn preserves_entry_order() {
        let manifest = parse_manifest(
            br#"{"Modules":[{"Key":"z","Source":"s"},{"Key":"a","Source":"s"},{"Key":"m","Source":"s"}]}"#,
        )
        .unwrap();
        let keys: Vec<_> = manifest.modules.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_manifest(b"{\"Modules\": [").unwrap_err();
        assert!(matches!(err, ModulesError::MalformedManifest(_)));
    }

    #[test]
    fn rejects_wrong_shape() {
        for input in [
            &b"[]"[..],
            &b"{}"[..],
            &br#"{"Modules": {}}"#[..],
            &br#"{"Modules": [42]}"#[..],
            &br#"{"Modules": [{"Dir": 7}]}"#[..],
        ] {
            assert!(
                matches!(parse_manifest(input), Err(ModulesError::MalformedManifest(_))),
                "accepted {}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn vendored_requires_full_prefix() {
        let module = ModuleDescriptor {
            source: "git::https://example".to_owned(),
            dir: ".terraform/modulesX/a".to_owned(),
            ..Default::default()
        };
        assert_eq!(module.kind(), ModuleKind::Local);
    }

    #[test]
    fn manifest_path_is_under_workdir() {
        let path = modules_manifest_path(Path::new("/work"));
        assert_eq!(path, Path::new("/work/.terraform/modules/modules.json"));
    }
}
