use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// Strips the query suffix and percent-decodes the request target.
/// `None` on invalid UTF-8.
pub fn decode(raw_target: &str) -> Option<String> {
    let without_query = raw_target.split('?').next().unwrap_or(raw_target);
    match percent_decode_str(without_query).decode_utf8() {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            log::warn!("failed to decode path {}: {}", without_query, e);
            None
        }
    }
}

/// Resolves a request target to an absolute path under `root`, purely
/// lexically: no filesystem access. `.` segments are dropped and `..`
/// segments pop the previous one; popping past `root` rejects the request.
/// A rejection is indistinguishable from a missing file to the caller.
pub fn resolve(root: &Path, raw_target: &str) -> Option<PathBuf> {
    let decoded = decode(raw_target)?;

    let mut resolved = root.to_path_buf();
    let mut depth: usize = 0;
    for component in Path::new(&decoded).components() {
        match component {
            Component::Normal(segment) => {
                resolved.push(segment);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    log::warn!("path escapes serve root: {}", raw_target);
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::CurDir | Component::RootDir => {}
            Component::Prefix(_) => return None,
        }
    }

    log::debug!("resolved {} -> {}", raw_target, resolved.display());
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/files")
    }

    #[test]
    fn resolves_plain_paths() {
        assert_eq!(
            resolve(&root(), "/a/b.txt"),
            Some(PathBuf::from("/srv/files/a/b.txt"))
        );
        assert_eq!(resolve(&root(), "/"), Some(PathBuf::from("/srv/files")));
    }

    #[test]
    fn strips_query_suffix() {
        assert_eq!(
            resolve(&root(), "/a.txt?version=2"),
            Some(PathBuf::from("/srv/files/a.txt"))
        );
    }

    #[test]
    fn decodes_percent_encoding() {
        assert_eq!(
            resolve(&root(), "/with%20space.txt"),
            Some(PathBuf::from("/srv/files/with space.txt"))
        );
    }

    #[test]
    fn dot_segments_are_normalized() {
        assert_eq!(
            resolve(&root(), "/a/./b/../c.txt"),
            Some(PathBuf::from("/srv/files/a/c.txt"))
        );
    }

    #[test]
    fn rejects_traversal_above_root() {
        assert_eq!(resolve(&root(), "/../etc/passwd"), None);
        assert_eq!(resolve(&root(), "/a/../../etc/passwd"), None);
    }

    #[test]
    fn rejects_encoded_traversal() {
        assert_eq!(resolve(&root(), "/%2e%2e/secret"), None);
        assert_eq!(resolve(&root(), "/a/%2E%2E/%2e%2e/secret"), None);
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert_eq!(resolve(&root(), "/%ff%fe"), None);
        assert_eq!(decode("/%ff"), None);
    }

    #[test]
    fn traversal_that_stays_inside_is_allowed() {
        assert_eq!(
            resolve(&root(), "/a/b/../c.txt"),
            Some(PathBuf::from("/srv/files/a/c.txt"))
        );
    }
}
