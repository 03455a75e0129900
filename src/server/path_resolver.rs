use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use super::config::SymlinkPolicy;
use super::error::{ServeError, ServeResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Location on disk, `root` joined with the normalized segments.
    pub fs_path: PathBuf,
    /// Decoded, normalized URL path. Always starts with `/`.
    pub url_path: String,
    pub trailing_slash: bool,
    pub query: Option<String>,
}

/// Maps a request target onto `root`.
///
/// `root` must already be canonical. The result is guaranteed to name an
/// existing entry; under [`SymlinkPolicy::Contained`] it is also guaranteed
/// to stay inside `root` once every symbolic link is followed.
pub fn resolve(root: &Path, target: &str, policy: SymlinkPolicy) -> ServeResult<ResolvedPath> {
    let target = target.split('#').next().unwrap_or_default();
    let (raw_path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };

    if !raw_path.starts_with('/') {
        return Err(ServeError::BadRequest(format!(
            "Bad request target ('{}')",
            raw_path
        )));
    }

    let decoded = urlencoding::decode(raw_path)
        .map_err(|_| ServeError::BadRequest("Path is not valid UTF-8".to_string()))?;
    if decoded.contains('\0') {
        return Err(ServeError::BadRequest("Path contains NUL".to_string()));
    }

    let segments = normalize(&decoded).ok_or_else(|| {
        warn!("Path traversal attempt: {}", raw_path);
        ServeError::Forbidden("Path escapes the document root".to_string())
    })?;

    let trailing_slash = decoded.ends_with('/');
    let mut url_path = format!("/{}", segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        url_path.push('/');
    }

    let fs_path = segments
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment));

    check_target(root, &fs_path, policy)?;

    Ok(ResolvedPath {
        fs_path,
        url_path,
        trailing_slash,
        query,
    })
}

/// Drops empty and `.` segments and applies `..`. Returns `None` if a `..`
/// would climb above the root.
fn normalize(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments)
}

/// Fails unless `fs_path` exists and, under [`SymlinkPolicy::Contained`],
/// canonicalizes to somewhere inside `root`.
pub fn check_target(root: &Path, fs_path: &Path, policy: SymlinkPolicy) -> ServeResult<()> {
    match policy {
        SymlinkPolicy::Contained => {
            let canonical = fs::canonicalize(fs_path).map_err(ServeError::from_fs)?;
            if !canonical.starts_with(root) {
                warn!(
                    "Refusing {:?}: resolves outside the document root to {:?}",
                    fs_path, canonical
                );
                return Err(ServeError::Forbidden(
                    "Path escapes the document root".to_string(),
                ));
            }
            Ok(())
        }
        SymlinkPolicy::Follow => {
            fs::metadata(fs_path).map_err(ServeError::from_fs)?;
            Ok(())
        }
    }
}
