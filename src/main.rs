mod bam_scanner;
mod call;
mod chrom_list;
mod cli;
mod depth_background;
mod genome_segment;
mod int_range;
mod nmask;
mod run_stats;
mod segment_caller;
mod segment_graph;
mod segment_output;
mod version;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::version::GARFISH_VERSION;

static PROG_NAME: &str = env!("CARGO_PKG_NAME");

/// The segment table owns stderr, so log messages are dispatched to stdout instead
///
fn setup_logger(debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROG_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROG_NAME} {GARFISH_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );

    let start = std::time::Instant::now();

    call::run_call(settings);

    info!(
        "{PROG_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::parse_settings();
    setup_logger(settings.debug).unwrap();
    let settings = cli::validate_and_fix_settings(settings);

    if let Err(err) = run(&settings) {
        eprintln!("{}", err);
        process::exit(2);
    }
}
