use statrs::statistics::Statistics;

use crate::nmask::NMask;

/// Collecting more windows than this triggers the rank trim of outlier windows
const TRIMMED_WINDOW_COUNT: usize = 1000;

pub struct DepthBackground {
    pub mean: f64,
    pub sd: f64,
}

/// Sum `cov[start..end)`, or None if the window touches any masked position
///
pub fn window_cov(nmask: &NMask, cov: &[u16], start: usize, end: usize) -> Option<u64> {
    let mut sum = 0u64;
    for pos in start..end {
        if nmask.is_masked(pos) {
            return None;
        }
        sum += cov[pos] as u64;
    }
    Some(sum)
}

/// Estimate the background coverage level of one contig
///
/// Coverage is summed over non-overlapping windows, skipping any window touching the N-mask.
/// When enough windows are available the lowest and highest quartiles are dropped by rank, which
/// keeps telomeric dropouts and focal amplifications from skewing the background. Short contigs
/// use every clean window instead of discarding half the signal.
///
/// Returns the population mean and standard deviation of the retained window sums; a contig with
/// no clean windows reports a zero background and is disqualified downstream.
///
pub fn estimate_depth_background(nmask: &NMask, cov: &[u16], window: usize) -> DepthBackground {
    assert!(window > 0);

    let mut window_sums = Vec::new();
    let mut window_end = window;
    while window_end < cov.len() {
        if let Some(sum) = window_cov(nmask, cov, window_end - window, window_end) {
            window_sums.push(sum);
        }
        window_end += window;
    }

    let retained = if window_sums.len() > TRIMMED_WINDOW_COUNT {
        window_sums.sort_unstable();
        let trim = window_sums.len() / 4;
        &window_sums[trim..window_sums.len() - trim]
    } else {
        &window_sums[..]
    };

    if retained.is_empty() {
        return DepthBackground { mean: 0.0, sd: 0.0 };
    }

    let values = retained.iter().map(|&x| x as f64).collect::<Vec<_>>();
    DepthBackground {
        mean: Statistics::mean(&values),
        sd: Statistics::population_std_dev(&values),
    }
}
