use crate::path::{clean_path, has_path_prefix};
use crate::{DirEntry, FileHandle, FileSystem, FsError};
use std::collections::BTreeSet;
use std::fmt;

/// A supplementary tree joined onto the base at `prefix`.
///
/// The overlay tree is addressed with the full path, prefix included: a
/// request for `.terraform/modules/x/main.tf` reaches the overlay as
/// `.terraform/modules/x/main.tf`, not `x/main.tf`.
pub struct Overlay<'a> {
    prefix: String,
    fs: Box<dyn FileSystem + 'a>,
}

impl<'a> Overlay<'a> {
    pub fn new(prefix: &str, fs: impl FileSystem + 'a) -> Self {
        Self {
            prefix: clean_path(prefix),
            fs: Box::new(fs),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Debug for Overlay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Routes every request to exactly one tree by path prefix.
///
/// The request path is cleaned lexically, then matched against the overlay
/// prefixes in registration order; the first overlay whose prefix covers the
/// path (see [`has_path_prefix`]) serves it, otherwise the base does. Keep
/// prefixes disjoint, or register the most specific first. With no overlays
/// every request goes to the base.
///
/// A directory above an overlay prefix (e.g. `.terraform` for an overlay at
/// `.terraform/modules`) is served by the base alone; listings are not merged.
pub struct OverlayFs<'a> {
    base: Box<dyn FileSystem + 'a>,
    overlays: Vec<Overlay<'a>>,
}

impl<'a> OverlayFs<'a> {
    /// Join `overlays` onto `base`. Two overlays with the same cleaned prefix
    /// are rejected with [`FsError::DuplicateOverlay`].
    pub fn new(base: impl FileSystem + 'a, overlays: Vec<Overlay<'a>>) -> Result<Self, FsError> {
        let mut seen = BTreeSet::new();
        for overlay in &overlays {
            if !seen.insert(overlay.prefix.as_str()) {
                return Err(FsError::DuplicateOverlay(overlay.prefix.clone()));
            }
        }
        Ok(Self {
            base: Box::new(base),
            overlays,
        })
    }

    /// Registered prefixes, in routing order.
    pub fn prefixes(&self) -> Vec<&str> {
        self.overlays.iter().map(|overlay| overlay.prefix.as_str()).collect()
    }

    fn route(&self, path: &str) -> (&(dyn FileSystem + 'a), String) {
        let cleaned = clean_path(path);
        let target = self
            .overlays
            .iter()
            .find(|overlay| has_path_prefix(&cleaned, &overlay.prefix))
            .map_or(self.base.as_ref(), |overlay| overlay.fs.as_ref());
        (target, cleaned)
    }
}

impl FileSystem for OverlayFs<'_> {
    fn open(&self, path: &str) -> Result<FileHandle<'_>, FsError> {
        let (target, path) = self.route(path);
        target.open(&path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let (target, path) = self.route(path);
        target.read_file(&path)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let (target, path) = self.route(path);
        target.read_dir(&path)
    }
}

impl fmt::Debug for OverlayFs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayFs")
            .field("overlays", &self.overlays)
            .finish_non_exhaustive()
    }
}

/// Join a single `overlay` tree onto `base` at `prefix`.
pub fn compose_overlay<'a>(
    base: impl FileSystem + 'a,
    overlay: impl FileSystem + 'a,
    prefix: &str,
) -> OverlayFs<'a> {
    OverlayFs {
        base: Box::new(base),
        overlays: vec![Overlay::new(prefix, overlay)],
    }
}
