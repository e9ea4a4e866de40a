// src/document.rs

use std::fmt;
use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::Url;

/// A document as seen by one validation cycle: the URI the editor knows it
/// by, plus the filesystem path handed to the runner and the directory the
/// runner is launched from.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    uri: Url,
    path: PathBuf,
    working_dir: PathBuf,
}

impl DocumentIdentity {
    pub fn from_uri(uri: Url) -> Self {
        // Non-file URIs (e.g. `untitled:`) still carry a path component; the
        // runner will simply fail to find it and the cycle fails open.
        let path = uri
            .to_file_path()
            .unwrap_or_else(|()| PathBuf::from(uri.path()));
        Self::with_path(uri, path)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let uri = Url::from_file_path(path).ok()?;
        Some(Self::with_path(uri, path.to_path_buf()))
    }

    fn with_path(uri: Url, path: PathBuf) -> Self {
        let working_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            uri,
            path,
            working_dir,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl fmt::Debug for DocumentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentIdentity")
            .field("uri", &self.uri.as_str())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn derives_path_and_working_dir_from_file_uri() {
        let uri = Url::parse("file:///proj/src/button.spec.ts").unwrap();
        let doc = DocumentIdentity::from_uri(uri.clone());
        assert_eq!(doc.uri(), &uri);
        assert_eq!(doc.path(), Path::new("/proj/src/button.spec.ts"));
        assert_eq!(doc.working_dir(), Path::new("/proj/src"));
    }

    #[test]
    fn non_file_uri_falls_back_to_uri_path() {
        let uri = Url::parse("untitled:scratch.spec.ts").unwrap();
        let doc = DocumentIdentity::from_uri(uri);
        assert_eq!(doc.path(), Path::new("scratch.spec.ts"));
        assert_eq!(doc.working_dir(), Path::new("."));
    }

    #[test]
    fn from_path_round_trips_into_a_file_uri() {
        let doc = DocumentIdentity::from_path("/proj/a.test.js").unwrap();
        assert_eq!(doc.uri().as_str(), "file:///proj/a.test.js");
        assert!(DocumentIdentity::from_path("relative.test.js").is_none());
    }
}
