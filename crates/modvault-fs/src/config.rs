use crate::{DirFs, FsError, Overlay, OverlayFs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk description of an overlay of host directories.
///
/// ```json
/// {
///   "base": "/srv/templates/v3",
///   "overlays": [{ "prefix": ".terraform/modules", "dir": "/srv/modules/v3" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayConfig {
    pub base: PathBuf,
    #[serde(default)]
    pub overlays: Vec<OverlayMount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayMount {
    pub prefix: String,
    pub dir: PathBuf,
}

impl OverlayConfig {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            overlays: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_overlay(mut self, prefix: &str, dir: impl Into<PathBuf>) -> Self {
        self.overlays.push(OverlayMount {
            prefix: prefix.to_owned(),
            dir: dir.into(),
        });
        self
    }

    /// Load a config file. Relative directories are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self, FsError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| FsError::io(&display, e))?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| FsError::Config(format!("invalid overlay config {display}: {e}")))?;

        if let Some(parent) = path.parent() {
            config.base = parent.join(&config.base);
            for mount in &mut config.overlays {
                mount.dir = parent.join(&mount.dir);
            }
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), FsError> {
        let display = path.display().to_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FsError::io(&display, e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FsError::Config(format!("cannot serialize overlay config: {e}")))?;
        std::fs::write(path, content).map_err(|e| FsError::io(&display, e))?;
        Ok(())
    }

    /// Mount every configured directory onto the base, in file order.
    pub fn build(&self) -> Result<OverlayFs<'static>, FsError> {
        let overlays = self
            .overlays
            .iter()
            .map(|mount| {
                debug!("overlay {} -> {}", mount.prefix, mount.dir.display());
                Overlay::new(&mount.prefix, DirFs::new(&mount.dir))
            })
            .collect();
        OverlayFs::new(DirFs::new(&self.base), overlays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileSystem;
    use std::fs;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/overlay.json");

        let config = OverlayConfig::new(dir.path().join("base"))
            .with_overlay(".terraform/modules", dir.path().join("modules"));
        config.save(&path).unwrap();

        let loaded = OverlayConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn relative_dirs_resolve_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(
            &path,
            r#"{"base": "template", "overlays": [{"prefix": "vendor", "dir": "deps"}]}"#,
        )
        .unwrap();

        let loaded = OverlayConfig::load(&path).unwrap();
        assert_eq!(loaded.base, dir.path().join("template"));
        assert_eq!(loaded.overlays[0].dir, dir.path().join("deps"));
    }

    #[test]
    fn overlays_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(&path, r#"{"base": "."}"#).unwrap();
        assert!(OverlayConfig::load(&path).unwrap().overlays.is_empty());
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            OverlayConfig::load(&path),
            Err(FsError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverlayConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn build_mounts_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("base")).unwrap();
        fs::write(dir.path().join("base/main.tf"), "base").unwrap();
        fs::create_dir_all(dir.path().join("mods/.terraform/modules")).unwrap();
        fs::write(
            dir.path().join("mods/.terraform/modules/modules.json"),
            "{}",
        )
        .unwrap();

        let tree = OverlayConfig::new(dir.path().join("base"))
            .with_overlay(".terraform/modules", dir.path().join("mods"))
            .build()
            .unwrap();
        assert_eq!(tree.read_file("main.tf").unwrap(), b"base");
        assert_eq!(
            tree.read_file(".terraform/modules/modules.json").unwrap(),
            b"{}"
        );
    }

    #[test]
    fn build_rejects_duplicate_prefixes() {
        let config = OverlayConfig::new("/tmp/base")
            .with_overlay("vendor", "/tmp/a")
            .with_overlay("vendor/", "/tmp/b");
        assert!(matches!(
            config.build(),
            Err(FsError::DuplicateOverlay(_))
        ));
    }
}
