use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use log::{info, Log};

mod cli;
mod document;
mod error;
mod logging;
mod pdf;
mod pipeline;
mod progress;
mod raster;
mod walk;

use cli::Args;
use document::OutputLayout;
use logging::DebugLog;
use pipeline::CoverPipeline;

/// Parse the command line; usage problems go to stdout before anything
/// touches the filesystem.
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            print!("{}", e.render());
            std::process::exit(e.exit_code());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    let log = DebugLog::open(&args.log_file, args.verbose)?;
    log.install()?;

    info!(
        "Exporting covers from {} into {}",
        args.input_dir.display(),
        args.output_dir.display()
    );

    OutputLayout::new(&args.output_dir).prepare()?;

    let pipeline = CoverPipeline::from_args(&args, log.clone());
    if !args.skip_extract {
        pipeline.extractor().check_availability().await;
    }
    pipeline.rasterizer().check_availability().await;

    let summary = pipeline.run(&args.input_dir).await?;
    log.info(format_args!("{summary}"));
    log.flush();

    Ok(())
}
