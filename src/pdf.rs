use log::{debug, warn};
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::cli::ExtractorKind;
use crate::error::ExtractError;

/// Copies page 1 of a PDF into its own single-page PDF.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    kind: ExtractorKind,
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl PageExtractor {
    pub fn new(kind: ExtractorKind) -> Self {
        let program = match kind {
            ExtractorKind::Pdftk => "pdftk",
            ExtractorKind::Qpdf => "qpdf",
            ExtractorKind::Builtin => "lopdf",
        };
        Self {
            kind,
            program: PathBuf::from(program),
            leading_args: Vec::new(),
        }
    }

    /// Use a different binary for the pdftk / qpdf backends.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed before the tool's own; lets `sh -c '...'` stand in
    /// for pdftk or qpdf.
    #[cfg(test)]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Write page 1 of `source` to `dest`, replacing any existing file.
    pub async fn extract_cover(&self, source: &Path, dest: &Path) -> Result<(), ExtractError> {
        match self.kind {
            ExtractorKind::Builtin => {
                let source = source.to_path_buf();
                let dest = dest.to_path_buf();
                tokio::task::spawn_blocking(move || extract_first_page(&source, &dest))
                    .await
                    .map_err(|e| ExtractError::Panicked(e.to_string()))?
            }
            ExtractorKind::Pdftk => {
                self.run_tool(&[
                    source.as_os_str(),
                    OsStr::new("cat"),
                    OsStr::new("1"),
                    OsStr::new("output"),
                    dest.as_os_str(),
                ])
                .await
            }
            ExtractorKind::Qpdf => {
                self.run_tool(&[
                    OsStr::new("--empty"),
                    OsStr::new("--pages"),
                    source.as_os_str(),
                    OsStr::new("1"),
                    OsStr::new("--"),
                    dest.as_os_str(),
                ])
                .await
            }
        }
    }

    async fn run_tool(&self, args: &[&OsStr]) -> Result<(), ExtractError> {
        let program = self.program.display().to_string();
        debug!("Running {} {:?}", program, args);

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::Status {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    /// Check that the external tool can be started. Always true for the
    /// builtin backend.
    pub async fn check_availability(&self) -> bool {
        if self.kind == ExtractorKind::Builtin {
            return true;
        }

        let available = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false);

        if !available {
            warn!(
                "{} not found. Install it or pick another backend with --extractor",
                self.program.display()
            );
        }

        available
    }
}

/// Drop every page except the first and save the rest to `dest`.
///
/// The PDF is written to a temporary file next to `dest` and renamed into
/// place, so a failed save leaves no partial cover behind.
fn extract_first_page(source: &Path, dest: &Path) -> Result<(), ExtractError> {
    let mut document = lopdf::Document::load(source)?;

    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(ExtractError::NoPages {
            path: source.to_path_buf(),
        });
    }

    let rest: Vec<u32> = pages.keys().copied().filter(|&n| n != 1).collect();
    if !rest.is_empty() {
        document.delete_pages(&rest);
        document.prune_objects();
    }

    let save_error = |detail: String| ExtractError::Save {
        path: dest.to_path_buf(),
        detail,
    };

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| save_error(e.to_string()))?;
    document
        .save_to(&mut staged)
        .map_err(|e| save_error(e.to_string()))?;
    staged.flush().map_err(|e| save_error(e.to_string()))?;
    staged
        .persist(dest)
        .map_err(|e| save_error(e.error.to_string()))?;

    Ok(())
}

/// Write a minimal PDF with `pages` text pages.
#[cfg(test)]
pub fn write_sample_pdf(path: &Path, pages: usize) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
