use std::collections::BTreeSet;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::{debug, info};
use rust_htslib::bam::{self, Read};
use unwrap::unwrap;

use crate::bam_scanner::{scan_contig_tracks, ClipObservations, ScanSettings};
use crate::chrom_list::ChromList;
use crate::cli;
use crate::depth_background::estimate_depth_background;
use crate::genome_segment::{find_segment_id_at_pos, Segment};
use crate::nmask::{get_contig_nmask, open_indexed_fasta};
use crate::run_stats::{write_call_run_stats, CallRunStats, RunStep};
use crate::segment_caller::{call_contig_segments, CallParams};
use crate::segment_graph::{
    add_split_read_edges, cluster_segments, confirmed_cluster_ids, ClipSegmentRecords, EdgeMap,
};
use crate::segment_output::write_segment_table;
use crate::version::GARFISH_VERSION;

fn open_indexed_alignment_reader(filename: &Utf8Path, ref_filename: &Utf8Path) -> bam::IndexedReader {
    let mut bam_reader = unwrap!(
        bam::IndexedReader::from_path(filename),
        "Unable to open indexed alignment file: '{filename}'"
    );
    unwrap!(
        bam_reader.set_reference(ref_filename),
        "Unable to attach reference fasta '{ref_filename}' to alignment file: '{filename}'"
    );
    bam_reader
}

/// Per-contig mapped read counts from the alignment index, in tid order
///
fn get_contig_mapped_read_counts(bam_reader: &mut bam::IndexedReader) -> Vec<u64> {
    unwrap!(
        bam_reader.index_stats(),
        "Failed to read alignment index statistics"
    )
    .into_iter()
    .map(|(_tid, _len, mapped, _unmapped)| mapped)
    .collect()
}

/// Project one contig's clip observations through its accepted segments
///
fn project_clips_to_segments(
    clip_obs: &ClipObservations,
    contig_segments: &[Segment],
    clip_links: &mut ClipSegmentRecords,
) {
    for &(qname_hash, pos) in clip_obs.mate1.iter() {
        if let Some(segment_id) = find_segment_id_at_pos(contig_segments, pos) {
            clip_links.mate1.push((qname_hash, segment_id));
        }
    }
    for &(qname_hash, pos) in clip_obs.mate2.iter() {
        if let Some(segment_id) = find_segment_id_at_pos(contig_segments, pos) {
            clip_links.mate2.push((qname_hash, segment_id));
        }
    }
}

/// Run the full tumor/normal amplicon calling pipeline
///
/// Contigs are processed one at a time in alignment-header order; the per-contig signal tracks,
/// N-mask and clip observations are dropped before the next contig starts, so peak memory is
/// bounded by the longest contig. Segment, clip-link and edge accumulators are the only global
/// state and are threaded through explicitly.
///
pub fn run_call(settings: &cli::Settings) {
    let scan_settings = ScanSettings {
        min_map_qual: settings.min_map_qual,
        min_clip: settings.min_clip,
    };
    let call_params = CallParams {
        min_split: settings.min_split,
        contam: settings.contam,
        min_segment_size: settings.min_segment_size as usize,
        max_segment_size: settings.max_segment_size as usize,
        window: 2 * settings.min_segment_size as usize,
    };

    let mut tumor_reader = open_indexed_alignment_reader(&settings.tumor, &settings.genome);
    let mut control_reader = open_indexed_alignment_reader(&settings.control, &settings.genome);
    let mut fasta_reader = open_indexed_fasta(&settings.genome);

    let chrom_list = ChromList::from_bam_header(tumor_reader.header());
    let tumor_mapped = get_contig_mapped_read_counts(&mut tumor_reader);
    let control_mapped = get_contig_mapped_read_counts(&mut control_reader);
    let tumor_is_cram = settings.tumor.as_str().ends_with(".cram");
    let control_is_cram = settings.control.as_str().ends_with(".cram");

    let mut segments: Vec<Segment> = Vec::new();
    let mut clip_links = ClipSegmentRecords::default();
    let mut stats = CallRunStats {
        run_step: RunStep {
            name: "call".to_string(),
            version: GARFISH_VERSION.to_string(),
        },
        ..Default::default()
    };

    for (chrom_index, chrom_info) in chrom_list.data.iter().enumerate() {
        let chrom_len = chrom_info.length as usize;
        if chrom_info.length <= settings.min_chr_len || 2 * call_params.window >= chrom_len {
            stats.skipped_contig_count += 1;
            continue;
        }

        info!("Processing contig '{}'", chrom_info.label);

        let mut clip_obs = ClipObservations::default();
        let tumor_tracks = match scan_contig_tracks(
            &mut tumor_reader,
            &scan_settings,
            chrom_index,
            chrom_len,
            tumor_mapped.get(chrom_index).copied().unwrap_or(0),
            tumor_is_cram,
            Some(&mut clip_obs),
        ) {
            Some(x) => x,
            None => {
                stats.skipped_contig_count += 1;
                continue;
            }
        };
        let control_tracks = match scan_contig_tracks(
            &mut control_reader,
            &scan_settings,
            chrom_index,
            chrom_len,
            control_mapped.get(chrom_index).copied().unwrap_or(0),
            control_is_cram,
            None,
        ) {
            Some(x) => x,
            None => {
                stats.skipped_contig_count += 1;
                continue;
            }
        };

        let nmask = get_contig_nmask(&mut fasta_reader, &chrom_info.label, chrom_len);
        let tumor_bg = estimate_depth_background(&nmask, &tumor_tracks.cov, call_params.window);
        let control_bg = estimate_depth_background(&nmask, &control_tracks.cov, call_params.window);
        debug!(
            "Contig '{}' depth background: tumor {:.2}/{:.2} control {:.2}/{:.2}",
            chrom_info.label, tumor_bg.mean, tumor_bg.sd, control_bg.mean, control_bg.sd
        );

        let first_segment_id = segments.len() as u32;
        let contig_result = call_contig_segments(
            chrom_index,
            &tumor_tracks,
            &control_tracks,
            &nmask,
            &tumor_bg,
            &control_bg,
            &call_params,
            first_segment_id,
        );
        debug!(
            "Contig '{}': {} breakpoints, {} segments spanning {} bases",
            chrom_info.label,
            contig_result.breakpoint_count,
            contig_result.segments.len(),
            contig_result
                .segments
                .iter()
                .map(|s| s.range.size())
                .sum::<i64>()
        );

        project_clips_to_segments(&clip_obs, &contig_result.segments, &mut clip_links);

        stats.breakpoint_count += contig_result.breakpoint_count;
        stats.scanned_contig_count += 1;
        segments.extend(contig_result.segments);
    }

    stats.segment_count = segments.len();

    let mut edges = EdgeMap::new();
    add_split_read_edges(&mut clip_links.mate1, &mut edges);
    add_split_read_edges(&mut clip_links.mate2, &mut edges);
    stats.edge_count = edges.len();

    cluster_segments(&mut segments, &edges, settings.min_split);
    let confirmed_clusters = confirmed_cluster_ids(&segments, settings.max_segment_size);

    stats.cluster_count = segments
        .iter()
        .map(|s| s.cluster_id)
        .collect::<BTreeSet<_>>()
        .len();
    stats.confirmed_cluster_count = confirmed_clusters.len();
    stats.confirmed_segment_count = segments
        .iter()
        .filter(|s| confirmed_clusters.contains(&s.cluster_id))
        .count();
    info!(
        "Called {} segments in {} clusters, {} segments confirmed",
        stats.segment_count, stats.cluster_count, stats.confirmed_segment_count
    );

    {
        let stderr = std::io::stderr();
        let mut table_writer = BufWriter::new(stderr.lock());
        write_segment_table(
            &mut table_writer,
            &chrom_list,
            &segments,
            &edges,
            &confirmed_clusters,
        );
        table_writer.flush().unwrap();
    }

    if let Some(stats_filename) = &settings.stats {
        write_call_run_stats(stats_filename, &stats);
    }
}
