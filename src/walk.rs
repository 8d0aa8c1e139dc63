use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursive, file-name ordered walk that yields regular files only.
///
/// Pulling the next item is what lets the walk proceed; an `Err` means the
/// traversal itself broke and the caller should give up.
pub struct Walker {
    entries: walkdir::IntoIter,
    excluded: Vec<PathBuf>,
}

impl Walker {
    pub fn new(root: &Path) -> Self {
        Self {
            entries: WalkDir::new(root).sort_by_file_name().into_iter(),
            excluded: Vec::new(),
        }
    }

    /// Never descend into these directories. Paths must be canonical.
    pub fn excluding(mut self, dirs: Vec<PathBuf>) -> Self {
        self.excluded = dirs;
        self
    }

    fn is_excluded(&self, dir: &Path) -> bool {
        !self.excluded.is_empty()
            && dir
                .canonicalize()
                .map(|dir| self.excluded.contains(&dir))
                .unwrap_or(false)
    }
}

impl Iterator for Walker {
    type Item = Result<PathBuf, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.entries.next()? {
                Ok(entry) if entry.file_type().is_file() => {
                    return Some(Ok(entry.into_path()));
                }
                Ok(entry) if entry.file_type().is_dir() && self.is_excluded(entry.path()) => {
                    self.entries.skip_current_dir();
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn yields_nested_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("2015/nov")).unwrap();
        fs::write(root.join("b.pdf"), b"").unwrap();
        fs::write(root.join("a.txt"), b"").unwrap();
        fs::write(root.join("2015/nov/c.pdf"), b"").unwrap();

        let found: Vec<PathBuf> = Walker::new(root).map(Result::unwrap).collect();

        assert_eq!(
            found,
            vec![
                root.join("2015/nov/c.pdf"),
                root.join("a.txt"),
                root.join("b.pdf"),
            ]
        );
    }

    #[test]
    fn excluded_directories_are_not_entered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("covers")).unwrap();
        fs::create_dir_all(root.join("reports")).unwrap();
        fs::write(root.join("covers/a.pdf"), b"").unwrap();
        fs::write(root.join("reports/a.pdf"), b"").unwrap();

        let excluded = vec![root.join("covers").canonicalize().unwrap()];
        let found: Vec<PathBuf> = Walker::new(root)
            .excluding(excluded)
            .map(Result::unwrap)
            .collect();

        assert_eq!(found, vec![root.join("reports/a.pdf")]);
    }

    #[test]
    fn empty_directory_ends_immediately() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Walker::new(dir.path()).next().is_none());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut walker = Walker::new(&dir.path().join("nope"));
        assert!(matches!(walker.next(), Some(Err(_))));
    }
}
