use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "pdf-covers")]
#[command(about = "Export the first page of every PDF in a directory tree as a PNG")]
#[command(version)]
pub struct Args {
    /// Directory to search (recursively) for PDFs
    pub input_dir: PathBuf,

    /// Directory that receives the `covers/` and `pngs/` folders
    #[arg(default_value = ".")]
    pub output_dir: PathBuf,

    /// Rasterization resolution in DPI
    #[arg(short, long, default_value = "300")]
    pub quality: u32,

    /// Tool used to copy page 1 into its own PDF
    #[arg(long, value_enum, default_value_t = ExtractorKind::Pdftk)]
    pub extractor: ExtractorKind,

    /// Override the page extraction binary
    #[arg(long)]
    pub extractor_bin: Option<PathBuf>,

    /// Override the rasterizer binary (pdftoppm compatible)
    #[arg(long)]
    pub rasterizer_bin: Option<PathBuf>,

    /// Which rendered image of the cover to keep
    #[arg(long, default_value = "0")]
    pub raster_index: usize,

    /// Treat every input PDF as an already extracted cover
    #[arg(long)]
    pub skip_extract: bool,

    /// Cap on files converted at the same time (unbounded when omitted)
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Log file, truncated at startup
    #[arg(long, default_value = "debug.log")]
    pub log_file: PathBuf,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// `pdftk <in> cat 1 output <out>`
    Pdftk,
    /// `qpdf --empty --pages <in> 1 -- <out>`
    Qpdf,
    /// In-process extraction with lopdf
    Builtin,
}
