use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A file discovered by the walk, split into the name used for its outputs
/// and its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub name: String,
    pub extension: String,
}

impl SourceDocument {
    /// `None` for files without an extension or with a non UTF-8 name.
    ///
    /// Only the last extension is stripped, so `annual.2015.pdf` becomes
    /// `annual.2015`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_stem()?.to_str()?;
        let extension = path.extension()?.to_str()?;
        Some(Self {
            path: path.to_path_buf(),
            name: name.to_string(),
            extension: extension.to_string(),
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.extension == "pdf"
    }
}

/// The `covers/` and `pngs/` folders under the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    covers: PathBuf,
    pngs: PathBuf,
}

impl OutputLayout {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            covers: output_dir.join("covers"),
            pngs: output_dir.join("pngs"),
        }
    }

    /// Create both folders if they are missing.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.covers, &self.pngs] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Canonical paths of the folders that exist, for keeping the walk out
    /// of its own output.
    pub fn resolved_dirs(&self) -> Vec<PathBuf> {
        [&self.covers, &self.pngs]
            .into_iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .collect()
    }

    pub fn cover_path(&self, name: &str) -> PathBuf {
        self.covers.join(format!("{name}.pdf"))
    }

    pub fn png_path(&self, name: &str) -> PathBuf {
        self.pngs.join(format!("{name}.png"))
    }
}
