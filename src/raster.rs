use log::{debug, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::RasterError;

/// Renders PDFs to PNG buffers through `pdftoppm` (or anything that takes
/// the same `-png -r <dpi> <pdf> <prefix>` arguments).
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: PathBuf,
    leading_args: Vec<OsString>,
    quality: u32,
}

/// Encoded PNGs, one per rendered page, in page order.
#[derive(Debug, Default)]
pub struct RasterResult {
    pub images: Vec<Vec<u8>>,
}

impl RasterResult {
    pub fn image(&self, index: usize) -> Option<&[u8]> {
        self.images.get(index).map(Vec::as_slice)
    }
}

impl Rasterizer {
    pub fn new(quality: u32) -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            leading_args: Vec::new(),
            quality,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed before the pdftoppm ones; lets a wrapper such as
    /// `sh -c '...'` stand in for the real binary.
    #[cfg(test)]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Render every page of `pdf_path` and return the PNGs in page order.
    pub async fn rasterize(&self, pdf_path: &Path) -> Result<RasterResult, RasterError> {
        let program = self.program.display().to_string();
        let temp_dir = tempfile::tempdir()?;
        let image_prefix = temp_dir.path().join("page");

        debug!("Rasterizing {} at {} dpi", pdf_path.display(), self.quality);

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .arg("-png")
            .arg("-r")
            .arg(self.quality.to_string())
            .arg(pdf_path)
            .arg(&image_prefix)
            .output()
            .await
            .map_err(|source| RasterError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RasterError::Status {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // pdftoppm zero-pads page numbers to a common width, so a name sort
        // is a page sort.
        let mut image_files = Vec::new();
        let mut entries = tokio::fs::read_dir(temp_dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("png") {
                image_files.push(path);
            }
        }
        image_files.sort();

        if image_files.is_empty() {
            return Err(RasterError::NoImages {
                program,
                path: pdf_path.to_path_buf(),
            });
        }

        let mut images = Vec::with_capacity(image_files.len());
        for path in &image_files {
            images.push(tokio::fs::read(path).await?);
        }

        Ok(RasterResult { images })
    }

    pub async fn check_availability(&self) -> bool {
        // pdftoppm -v exits 0 on poppler, 99 on some xpdf builds
        let available = Command::new(&self.program)
            .args(&self.leading_args)
            .arg("-v")
            .output()
            .await
            .is_ok();

        if !available {
            warn!(
                "{} not found. Install with: apt install poppler-utils",
                self.program.display()
            );
        }

        available
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Stand-in for pdftoppm: one fake PNG per page named in `$PAGES`.
    const FAKE_PDFTOPPM: &str = r#"
for last; do :; done
for n in $PAGES; do
  printf 'png-%s' "$n" > "$last-$n.png"
done
"#;

    fn fake(pages: &str) -> Rasterizer {
        Rasterizer::new(300)
            .with_program("sh")
            .with_leading_args([
                "-c".to_string(),
                format!("PAGES='{pages}'\n{FAKE_PDFTOPPM}"),
                "pdftoppm".to_string(),
            ])
    }

    #[tokio::test]
    async fn collects_images_in_page_order() {
        let dir = tempfile::tempdir().unwrap();
        let result = fake("2 1 3").rasterize(&dir.path().join("c.pdf")).await.unwrap();

        assert_eq!(result.images.len(), 3);
        assert_eq!(result.image(0), Some(&b"png-1"[..]));
        assert_eq!(result.image(2), Some(&b"png-3"[..]));
        assert_eq!(result.image(3), None);
    }

    #[tokio::test]
    async fn no_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = fake("").rasterize(&dir.path().join("c.pdf")).await.unwrap_err();
        assert!(matches!(err, RasterError::NoImages { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = Rasterizer::new(300)
            .with_program("sh")
            .with_leading_args(["-c", "echo 'Syntax Error: broken xref' >&2; exit 1", "pdftoppm"])
            .rasterize(&dir.path().join("c.pdf"))
            .await
            .unwrap_err();

        match err {
            RasterError::Status { stderr, .. } => assert_eq!(stderr, "Syntax Error: broken xref"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let rasterizer = Rasterizer::new(300).with_program("pdf-covers-no-such-rasterizer");
        let err = rasterizer.rasterize(Path::new("c.pdf")).await.unwrap_err();
        assert!(matches!(err, RasterError::Spawn { .. }));
        assert!(!rasterizer.check_availability().await);
    }

    #[tokio::test]
    async fn passes_quality_as_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"
for last; do :; done
printf '%s' "$2 $3" > "$last-1.png"
"#;
        let result = Rasterizer::new(150)
            .with_program("sh")
            .with_leading_args(["-c", script, "pdftoppm"])
            .rasterize(&dir.path().join("c.pdf"))
            .await
            .unwrap();

        assert_eq!(result.image(0), Some(&b"-r 150"[..]));
    }
}
