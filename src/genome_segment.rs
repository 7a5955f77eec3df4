use std::fmt;

use crate::int_range::IntRange;

/// An accepted amplified segment
///
/// Segments are kept in (contig, start) order, which also matches the ascending id order in which
/// they were accepted. Node ids in the output table are segment ids.
///
#[derive(Clone)]
pub struct Segment {
    /// chrom_index is defined by the indexing scheme used in the input bam file
    pub chrom_index: usize,

    /// Half-open span between the paired left and right breakpoints
    pub range: IntRange,

    pub id: u32,

    /// Initialized to the segment's own id; union operations can only lower it
    pub cluster_id: u32,

    /// Estimated copy number, 2x the tumor/control depth ratio over expectation
    pub estcn: f64,
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Segment {}: {}:{:?} cluster {}",
            self.id, self.chrom_index, self.range, self.cluster_id
        )
    }
}

/// Map a clip position to the id of the segment whose closed span [start, end] contains it
///
/// `contig_segments` must be the sorted, non-overlapping segment slice of a single contig.
/// Segments can share a boundary position, in which case the later segment wins, matching the
/// overwrite order of a dense position map.
///
pub fn find_segment_id_at_pos(contig_segments: &[Segment], pos: u32) -> Option<u32> {
    let pos = pos as i64;
    let idx = contig_segments.partition_point(|s| s.range.start <= pos);
    if idx == 0 {
        return None;
    }
    let candidate = &contig_segments[idx - 1];
    if pos <= candidate.range.end {
        Some(candidate.id)
    } else {
        None
    }
}
