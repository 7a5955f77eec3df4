//! Track stats for the whole garfish run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

#[derive(Default, Deserialize, Serialize)]
pub struct RunStep {
    pub name: String,
    pub version: String,
}

#[derive(Default, Deserialize, Serialize)]
pub struct CallRunStats {
    pub run_step: RunStep,

    pub scanned_contig_count: usize,

    /// Contigs skipped as too short or without mapped reads
    pub skipped_contig_count: usize,

    pub breakpoint_count: usize,
    pub segment_count: usize,
    pub edge_count: usize,
    pub cluster_count: usize,
    pub confirmed_cluster_count: usize,
    pub confirmed_segment_count: usize,
}

/// Write run_stats structure out in json format
pub fn write_call_run_stats(filename: &Utf8Path, run_stats: &CallRunStats) {
    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
