//! Per-file failures.
//!
//! None of these abort a run: the pipeline logs them where they happen and
//! moves on to the next file. Fatal problems (walk errors, unusable output
//! directories) are plain `anyhow::Error`s returned from `main`.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Copying page 1 out of a source PDF failed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Status {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{0}")]
    Pdf(#[from] lopdf::Error),

    #[error("'{path}' has no pages")]
    NoPages { path: PathBuf },

    #[error("failed to save '{path}': {detail}")]
    Save { path: PathBuf, detail: String },

    #[error("extraction task panicked: {0}")]
    Panicked(String),
}

/// Rendering a cover PDF to PNG buffers failed.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Status {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} produced no images for '{path}'")]
    NoImages { program: String, path: PathBuf },

    #[error("scratch directory: {0}")]
    Io(#[from] io::Error),
}

/// A failed stage of one file's pipeline. The display strings are the log
/// lines users grep for.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("exec error: {0}")]
    Extract(#[source] ExtractError),

    #[error("Something went wrong: {0}")]
    Raster(#[source] RasterError),

    #[error("Report #{name}: rasterizer produced {available} image(s), nothing at index {index}")]
    MissingImage {
        name: String,
        index: usize,
        available: usize,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
