use crate::path::{clean_path, join_path};
use crate::{FileSystem, FsError, Metadata};

/// One object visited by [`walk_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub metadata: Metadata,
}

/// Recursively collect `root` and everything below it.
///
/// The root comes first, then each directory's children in name order, depth
/// first. The root is opened (following symlinks); children carry the
/// metadata reported by `read_dir`, so symlinked directories are listed but
/// never descended into. The order depends only on names, never on the
/// order the underlying tree happens to return them in.
pub fn walk_dir<F: FileSystem + ?Sized>(fs: &F, root: &str) -> Result<Vec<WalkEntry>, FsError> {
    let root = clean_path(root);
    let metadata = *fs.open(&root)?.metadata();

    let mut entries = vec![WalkEntry {
        path: root.clone(),
        metadata,
    }];
    if metadata.is_dir() {
        collect_entries(fs, &root, &mut entries)?;
    }
    Ok(entries)
}

fn collect_entries<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &str,
    out: &mut Vec<WalkEntry>,
) -> Result<(), FsError> {
    let mut children = fs.read_dir(dir)?;
    children.sort_by(|a, b| a.name.cmp(&b.name));

    for child in children {
        let path = join_path(dir, &child.name);
        let descend = child.metadata.is_dir();
        out.push(WalkEntry {
            path: path.clone(),
            metadata: child.metadata,
        });
        if descend {
            collect_entries(fs, &path, out)?;
        }
    }
    Ok(())
}
