use log::warn;
use rust_htslib::bam::{self, record::Cigar, Read};
use unwrap::unwrap;

pub struct ScanSettings {
    pub min_map_qual: u8,
    pub min_clip: u32,
}

/// Dense per-base signal tracks for one contig
///
/// All three tracks saturate at `u16::MAX` rather than wrapping, so pathological pileups degrade
/// to a clipped value instead of corrupting downstream window sums.
///
pub struct SignalTracks {
    /// Count of reads soft/hard-clipped on their left side at each position
    pub left: Vec<u16>,

    /// Count of reads soft/hard-clipped on their right side at each position
    pub right: Vec<u16>,

    /// Depth of coverage from reference-matching CIGAR ops only
    pub cov: Vec<u16>,
}

impl SignalTracks {
    pub fn new(chrom_len: usize) -> Self {
        Self {
            left: vec![0; chrom_len],
            right: vec![0; chrom_len],
            cov: vec![0; chrom_len],
        }
    }
}

/// Per-read clip evidence from the tumor sample, split by mate
///
/// Each entry is (read-name hash, clip reference position). The hash is the read-pair identity
/// used to join clip observations into segment-to-segment edges.
///
#[derive(Default)]
pub struct ClipObservations {
    pub mate1: Vec<(u64, u32)>,
    pub mate2: Vec<(u64, u32)>,
}

/// Fixed 64-bit mixing of the read name bytes
///
/// Identical read names must hash identically across all inputs and program versions, so this
/// stays a pinned function rather than the std hasher. Collisions are tolerated downstream.
///
pub fn hash_qname(qname: &[u8]) -> u64 {
    let mut hash: u64 = 37;
    for &byte in qname {
        hash = hash.wrapping_mul(54059) ^ (byte as u64).wrapping_mul(76963);
    }
    hash
}

/// Accumulate one alignment record into the contig signal tracks
///
/// The CIGAR is walked with a reference cursor `rp` (seeded from the record start) and a sequence
/// cursor `sp`. A qualifying clip is attributed to the current `rp`, which for a trailing clip is
/// the position just past the last aligned base; `sp == 0` distinguishes a leading clip.
///
pub fn process_record(
    record: &bam::Record,
    scan_settings: &ScanSettings,
    tracks: &mut SignalTracks,
    mut clip_obs: Option<&mut ClipObservations>,
) {
    if record.is_quality_check_failed() || record.is_duplicate() || record.is_unmapped() {
        return;
    }
    if record.mapq() < scan_settings.min_map_qual || record.tid() < 0 {
        return;
    }

    let chrom_len = tracks.cov.len();
    let qname_hash = hash_qname(record.qname());

    let mut rp = record.pos().max(0) as usize;
    let mut sp = 0usize;
    for c in record.cigar().iter() {
        match *c {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                let len = len as usize;
                let start = rp.min(chrom_len);
                let end = (rp + len).min(chrom_len);
                for depth in tracks.cov[start..end].iter_mut() {
                    *depth = depth.saturating_add(1);
                }
                rp += len;
                sp += len;
            }
            Cigar::Del(len) | Cigar::RefSkip(len) => {
                rp += len as usize;
            }
            Cigar::Ins(len) => {
                sp += len as usize;
            }
            Cigar::SoftClip(len) | Cigar::HardClip(len) => {
                if len >= scan_settings.min_clip && rp < chrom_len {
                    let clip_track = if sp == 0 {
                        &mut tracks.left
                    } else {
                        &mut tracks.right
                    };
                    clip_track[rp] = clip_track[rp].saturating_add(1);

                    if let Some(obs) = clip_obs.as_deref_mut() {
                        let mate_obs = if record.is_first_in_template() {
                            &mut obs.mate1
                        } else {
                            &mut obs.mate2
                        };
                        mate_obs.push((qname_hash, rp as u32));
                    }
                }
                sp += len as usize;
            }
            Cigar::Pad(_) => {
                warn!(
                    "Unknown CIGAR operation in read '{}'",
                    String::from_utf8_lossy(record.qname())
                );
            }
        }
    }
}

/// Scan all alignments of one contig into signal tracks
///
/// Returns None when the index reports zero mapped reads for the contig and the file is not a
/// CRAM (CRAM indices may under-report, so CRAM input always counts as having data). The caller
/// skips the contig entirely in that case.
///
#[allow(clippy::too_many_arguments)]
pub fn scan_contig_tracks(
    bam_reader: &mut bam::IndexedReader,
    scan_settings: &ScanSettings,
    chrom_index: usize,
    chrom_len: usize,
    contig_mapped_count: u64,
    is_cram: bool,
    mut clip_obs: Option<&mut ClipObservations>,
) -> Option<SignalTracks> {
    if contig_mapped_count == 0 && !is_cram {
        return None;
    }

    let mut tracks = SignalTracks::new(chrom_len);

    unwrap!(
        bam_reader.fetch(bam::FetchDefinition::Region(
            chrom_index as i32,
            0,
            chrom_len as i64
        )),
        "Failed to fetch contig index {chrom_index} from the alignment file"
    );

    let mut record = bam::Record::new();
    while let Some(r) = bam_reader.read(&mut record) {
        unwrap!(r, "Failed to parse alignment record");
        process_record(&record, scan_settings, &mut tracks, clip_obs.as_deref_mut());
    }

    Some(tracks)
}
