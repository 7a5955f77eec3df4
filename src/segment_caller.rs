use log::debug;

use crate::bam_scanner::SignalTracks;
use crate::depth_background::{window_cov, DepthBackground};
use crate::genome_segment::Segment;
use crate::int_range::IntRange;
use crate::nmask::NMask;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum BreakSide {
    Left,
    Right,
}

/// A candidate breakpoint nominated from the clip tracks
///
#[derive(Debug)]
pub struct Breakpoint {
    pub side: BreakSide,

    /// 0-based reference position of the clip pileup
    pub pos: usize,

    /// Split reads supporting the clip pileup
    pub splits: u32,

    /// Tumor/control depth ratio of the amplified flank, over the genome-wide expectation
    pub obsexp: f64,
}

pub struct CallParams {
    pub min_split: u32,
    pub contam: f64,
    pub min_segment_size: usize,
    pub max_segment_size: usize,

    /// Flank/seed window size, 2x the minimum segment size
    pub window: usize,
}

/// Contig-level calling results
///
#[derive(Default)]
pub struct ContigCallResult {
    pub segments: Vec<Segment>,
    pub breakpoint_count: usize,
}

fn contam_threshold(contam: f64, tumor_splits: u32) -> u32 {
    (contam * tumor_splits as f64) as u32
}

/// Depth-contrast test for one clip pileup position
///
/// The flank on the amplified side of the clip must exceed the other flank by 1.5x, clear the
/// background by three standard deviations, and exceed the control by 1.5x after normalizing for
/// the genome-wide tumor/control ratio. Windows touching the N-mask or an empty control window
/// disqualify the candidate.
///
#[allow(clippy::too_many_arguments)]
fn test_depth_contrast(
    side: BreakSide,
    pos: usize,
    tumor: &SignalTracks,
    control: &SignalTracks,
    nmask: &NMask,
    tumor_bg: &DepthBackground,
    exp_ratio: f64,
    window: usize,
) -> Option<f64> {
    let left_sum = window_cov(nmask, &tumor.cov, pos - window, pos)?;
    let right_sum = window_cov(nmask, &tumor.cov, pos, pos + window)?;

    // The amplified flank is to the right of a left-clip pileup and vice versa
    let (near, far) = match side {
        BreakSide::Left => (right_sum, left_sum),
        BreakSide::Right => (left_sum, right_sum),
    };

    if (far as f64) * 1.5 >= near as f64 {
        return None;
    }
    if near as f64 <= tumor_bg.mean + 3.0 * tumor_bg.sd {
        return None;
    }

    let control_near = match side {
        BreakSide::Left => window_cov(nmask, &control.cov, pos, pos + window)?,
        BreakSide::Right => window_cov(nmask, &control.cov, pos - window, pos)?,
    };
    if control_near == 0 {
        return None;
    }

    let obsexp = (near as f64 / control_near as f64) / exp_ratio;
    if obsexp > 1.5 {
        Some(obsexp)
    } else {
        None
    }
}

/// Nominate candidate breakpoints from the clip tracks of one contig
///
/// A position qualifies when the tumor clip pileup reaches `min_split`, the matched control shows
/// at most the contamination-scaled share of that pileup, and the depth contrast test passes.
///
pub fn nominate_breakpoints(
    tumor: &SignalTracks,
    control: &SignalTracks,
    nmask: &NMask,
    tumor_bg: &DepthBackground,
    exp_ratio: f64,
    params: &CallParams,
) -> Vec<Breakpoint> {
    let mut breakpoints = Vec::new();
    let chrom_len = tumor.cov.len();
    let window = params.window;
    if chrom_len < 2 * window {
        return breakpoints;
    }

    for pos in window..(chrom_len - window) {
        let tumor_splits = tumor.left[pos] as u32;
        if tumor_splits >= params.min_split
            && control.left[pos] as u32 <= contam_threshold(params.contam, tumor_splits)
        {
            if let Some(obsexp) = test_depth_contrast(
                BreakSide::Left,
                pos,
                tumor,
                control,
                nmask,
                tumor_bg,
                exp_ratio,
                window,
            ) {
                breakpoints.push(Breakpoint {
                    side: BreakSide::Left,
                    pos,
                    splits: tumor_splits,
                    obsexp,
                });
            }
        }

        let tumor_splits = tumor.right[pos] as u32;
        if tumor_splits >= params.min_split
            && control.right[pos] as u32 <= contam_threshold(params.contam, tumor_splits)
        {
            if let Some(obsexp) = test_depth_contrast(
                BreakSide::Right,
                pos,
                tumor,
                control,
                nmask,
                tumor_bg,
                exp_ratio,
                window,
            ) {
                breakpoints.push(Breakpoint {
                    side: BreakSide::Right,
                    pos,
                    splits: tumor_splits,
                    obsexp,
                });
            }
        }
    }

    breakpoints
}

/// Position-stable breakpoint order: ascending position, LEFT before RIGHT on ties
///
pub fn sort_breakpoints(breakpoints: &mut [Breakpoint]) {
    breakpoints.sort_by_key(|bp| (bp.pos, bp.side));
}

/// Pair sorted breakpoints into accepted segments
///
/// A pairing starts at an adjacent LEFT/RIGHT pair within `max_segment_size`, then extends
/// outward over runs of same-side breakpoints whose depth ratios stay within half of the seed
/// pair's. The widest extension wins; candidates overlapping an already consumed right breakpoint
/// are skipped. Every numeric disqualification silently rejects the candidate.
///
#[allow(clippy::too_many_arguments)]
pub fn pair_breakpoints(
    chrom_index: usize,
    breakpoints: &[Breakpoint],
    tumor: &SignalTracks,
    control: &SignalTracks,
    nmask: &NMask,
    exp_ratio: f64,
    params: &CallParams,
    first_segment_id: u32,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_right_used = 0usize;

    for i in 0..breakpoints.len().saturating_sub(1) {
        if i < last_right_used {
            continue;
        }
        let seed_left = &breakpoints[i];
        let seed_right = &breakpoints[i + 1];
        if seed_left.side != BreakSide::Left || seed_right.side != BreakSide::Right {
            continue;
        }
        if seed_right.pos - seed_left.pos >= params.max_segment_size {
            continue;
        }

        // Extend left over earlier LEFT breakpoints; an empty range leaves the seed as its own
        // best left, so the first list entry never scans below index 0
        let mut best_left = i;
        for k in (0..i).rev() {
            let bp = &breakpoints[k];
            if bp.side != BreakSide::Left
                || seed_left.pos - bp.pos > params.max_segment_size
                || bp.obsexp / seed_left.obsexp < 0.5
            {
                break;
            }
            best_left = k;
        }

        let mut best_right = i + 1;
        for (k, bp) in breakpoints.iter().enumerate().skip(i + 2) {
            if bp.side != BreakSide::Right
                || bp.pos - seed_right.pos > params.max_segment_size
                || bp.obsexp / seed_right.obsexp < 0.5
            {
                break;
            }
            best_right = k;
        }

        let start = breakpoints[best_left].pos;
        let end = breakpoints[best_right].pos;
        let segsize = end - start;
        if segsize <= params.min_segment_size || segsize >= params.max_segment_size {
            continue;
        }
        last_right_used = best_right;

        let tumor_sum = match window_cov(nmask, &tumor.cov, start, end) {
            Some(x) => x,
            None => continue,
        };
        let control_sum = match window_cov(nmask, &control.cov, start, end) {
            Some(x) => x,
            None => continue,
        };
        if control_sum == 0 {
            continue;
        }

        let obsexp = (tumor_sum as f64 / control_sum as f64) / exp_ratio;
        if obsexp <= 1.5 {
            continue;
        }

        let (left_splits, right_splits) = breakpoints[best_left..=best_right]
            .iter()
            .fold((0u32, 0u32), |(l, r), bp| match bp.side {
                BreakSide::Left => (l + bp.splits, r),
                BreakSide::Right => (l, r + bp.splits),
            });
        debug!(
            "Accepted segment {start}-{end} with {left_splits} left / {right_splits} right boundary split reads"
        );

        let id = first_segment_id + segments.len() as u32;
        segments.push(Segment {
            chrom_index,
            range: IntRange::from_pair(start as i64, end as i64),
            id,
            cluster_id: id,
            estcn: 2.0 * obsexp,
        });
    }

    segments
}

/// Run breakpoint nomination and pairing for one contig
///
/// A zero control background makes the tumor/control expectation undefined and disables the
/// whole contig.
///
#[allow(clippy::too_many_arguments)]
pub fn call_contig_segments(
    chrom_index: usize,
    tumor: &SignalTracks,
    control: &SignalTracks,
    nmask: &NMask,
    tumor_bg: &DepthBackground,
    control_bg: &DepthBackground,
    params: &CallParams,
    first_segment_id: u32,
) -> ContigCallResult {
    if control_bg.mean <= 0.0 {
        return ContigCallResult::default();
    }
    let exp_ratio = tumor_bg.mean / control_bg.mean;

    let mut breakpoints = nominate_breakpoints(tumor, control, nmask, tumor_bg, exp_ratio, params);
    sort_breakpoints(&mut breakpoints);

    let segments = pair_breakpoints(
        chrom_index,
        &breakpoints,
        tumor,
        control,
        nmask,
        exp_ratio,
        params,
        first_segment_id,
    );

    ContigCallResult {
        segments,
        breakpoint_count: breakpoints.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    const TEST_CHROM_LEN: usize = 10000;

    fn get_test_params() -> CallParams {
        CallParams {
            min_split: 3,
            contam: 0.0,
            min_segment_size: 100,
            max_segment_size: 10000,
            window: 200,
        }
    }

    /// Uniform diploid-like tracks at the given depth
    fn get_flat_tracks(depth: u16) -> SignalTracks {
        let mut tracks = SignalTracks::new(TEST_CHROM_LEN);
        tracks.cov = vec![depth; TEST_CHROM_LEN];
        tracks
    }

    /// Tumor tracks with a 10x amplicon over [start, end) flanked by clip pileups
    fn get_amplicon_tracks(start: usize, end: usize, splits: u16) -> SignalTracks {
        let mut tracks = get_flat_tracks(10);
        for pos in start..end {
            tracks.cov[pos] = 100;
        }
        tracks.left[start] = splits;
        tracks.right[end] = splits;
        tracks
    }

    fn get_clean_nmask() -> NMask {
        NMask::from_seq(&vec![b'A'; TEST_CHROM_LEN])
    }

    fn get_test_background(mean: f64, sd: f64) -> DepthBackground {
        DepthBackground { mean, sd }
    }

    #[test]
    fn test_single_amplicon_call() {
        let tumor = get_amplicon_tracks(1000, 3000, 5);
        let control = get_flat_tracks(10);
        let nmask = get_clean_nmask();
        let tumor_bg = get_test_background(2000.0, 50.0);
        let control_bg = get_test_background(2000.0, 10.0);

        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &tumor_bg,
            &control_bg,
            &get_test_params(),
            0,
        );

        assert_eq!(result.breakpoint_count, 2);
        assert_eq!(result.segments.len(), 1);
        let segment = &result.segments[0];
        assert_eq!(segment.range.start, 1000);
        assert_eq!(segment.range.end, 3000);
        assert_eq!(segment.id, 0);
        assert_eq!(segment.cluster_id, 0);
        assert_ulps_eq!(segment.estcn, 20.0, max_ulps = 4);
    }

    #[test]
    fn test_split_support_gate() {
        // Clip pileups below min_split nominate nothing
        let tumor = get_amplicon_tracks(1000, 3000, 2);
        let control = get_flat_tracks(10);
        let nmask = get_clean_nmask();

        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &get_test_background(2000.0, 50.0),
            &get_test_background(2000.0, 10.0),
            &get_test_params(),
            0,
        );
        assert_eq!(result.breakpoint_count, 0);
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_contamination_gate() {
        let tumor = get_amplicon_tracks(1000, 3000, 5);
        let mut control = get_flat_tracks(10);
        control.left[1000] = 1;
        let nmask = get_clean_nmask();
        let tumor_bg = get_test_background(2000.0, 50.0);
        let control_bg = get_test_background(2000.0, 10.0);

        // One control clip at the left breakpoint: rejected with contam 0
        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &tumor_bg,
            &control_bg,
            &get_test_params(),
            0,
        );
        assert_eq!(result.breakpoint_count, 1);
        assert!(result.segments.is_empty());

        // With contam 0.5 the threshold is floor(0.5 * 5) = 2, so one control clip passes
        let mut params = get_test_params();
        params.contam = 0.5;
        let result = call_contig_segments(
            0, &tumor, &control, &nmask, &tumor_bg, &control_bg, &params, 0,
        );
        assert_eq!(result.breakpoint_count, 2);
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn test_nmask_rejection() {
        let tumor = get_amplicon_tracks(1000, 3000, 5);
        let control = get_flat_tracks(10);
        // An N-run inside the amplicon interior poisons the interior sum
        let mut seq = vec![b'A'; TEST_CHROM_LEN];
        seq[2000] = b'N';
        let nmask = NMask::from_seq(&seq);

        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &get_test_background(2000.0, 50.0),
            &get_test_background(2000.0, 10.0),
            &get_test_params(),
            0,
        );
        assert_eq!(result.breakpoint_count, 2);
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_zero_control_background() {
        let tumor = get_amplicon_tracks(1000, 3000, 5);
        let control = get_flat_tracks(0);
        let nmask = get_clean_nmask();

        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &get_test_background(2000.0, 50.0),
            &get_test_background(0.0, 0.0),
            &get_test_params(),
            0,
        );
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_segment_size_bounds() {
        // A 50 base segment is below min_segment_size and rejected after pairing
        let tumor = get_amplicon_tracks(1000, 1050, 5);
        let control = get_flat_tracks(10);
        let nmask = get_clean_nmask();

        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &get_test_background(2000.0, 50.0),
            &get_test_background(2000.0, 10.0),
            &get_test_params(),
            0,
        );
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_breakpoint_extension() {
        // Two stacked left clips near the segment start: the earlier one with a comparable depth
        // ratio becomes the segment boundary
        let mut tumor = get_amplicon_tracks(1000, 3000, 5);
        for pos in 950..1000 {
            tumor.cov[pos] = 100;
        }
        tumor.left[950] = 5;
        let control = get_flat_tracks(10);
        let nmask = get_clean_nmask();

        let result = call_contig_segments(
            0,
            &tumor,
            &control,
            &nmask,
            &get_test_background(2000.0, 50.0),
            &get_test_background(2000.0, 10.0),
            &get_test_params(),
            0,
        );
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].range.start, 950);
        assert_eq!(result.segments[0].range.end, 3000);
    }

    #[test]
    fn test_pairing_is_idempotent_on_sorted_input() {
        let tumor = get_amplicon_tracks(1000, 3000, 5);
        let control = get_flat_tracks(10);
        let nmask = get_clean_nmask();
        let tumor_bg = get_test_background(2000.0, 50.0);
        let params = get_test_params();
        let exp_ratio = 1.0;

        let mut breakpoints =
            nominate_breakpoints(&tumor, &control, &nmask, &tumor_bg, exp_ratio, &params);
        sort_breakpoints(&mut breakpoints);
        let first = pair_breakpoints(
            0,
            &breakpoints,
            &tumor,
            &control,
            &nmask,
            exp_ratio,
            &params,
            0,
        );

        // Re-sorting an already sorted list and re-pairing yields the same segments
        sort_breakpoints(&mut breakpoints);
        let second = pair_breakpoints(
            0,
            &breakpoints,
            &tumor,
            &control,
            &nmask,
            exp_ratio,
            &params,
            0,
        );

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.range, b.range);
            assert_eq!(a.id, b.id);
        }
    }
}
