// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory filesystem for resolution tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.files().insert(path.as_ref().to_path_buf());
    }

    fn files(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // Only whole paths are inserted, so a poisoned set is still usable.
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MockFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files().contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_lock_still_answers_queries() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/node_modules/.bin/jest");

        let shared = fs.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.files.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(fs.files.is_poisoned());

        assert!(fs.is_file(Path::new("/proj/node_modules/.bin/jest")));
        fs.add_file("/proj/other");
        assert!(fs.is_file(Path::new("/proj/other")));
    }
}
