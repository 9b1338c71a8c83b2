use crate::FsError;

/// Lexically clean a slash-separated path.
///
/// Collapses repeated separators, drops `.` components, resolves `..` against
/// the preceding component and strips trailing separators. An empty result
/// becomes `.`. Leading `..` components of a relative path are kept; a rooted
/// path cannot climb above `/`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

/// Whether the cleaned `path` lies at or below the cleaned `prefix`.
///
/// Matching is per component: `.terraform/modules` covers
/// `.terraform/modules/x` but not `.terraform/modules-old`. The prefix `.`
/// covers every relative path.
pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "." {
        return !path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// Clean `path` and reject anything rooted or escaping the tree root.
pub(crate) fn normalize_relative(path: &str) -> Result<String, FsError> {
    let cleaned = clean_path(path);
    if cleaned.starts_with('/') || cleaned == ".." || cleaned.starts_with("../") {
        return Err(FsError::InvalidPath(path.to_owned()));
    }
    Ok(cleaned)
}

pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir == "." {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

/// Split a cleaned relative path into its parent and final component.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => (".", path),
    }
}
