use std::ops::Range;

use super::model::RawSegment;

// ---------------------------------------------------------------------------
// Visible time window → plot points
// ---------------------------------------------------------------------------

/// How one channel trace is placed on the stacked plot.
#[derive(Debug, Clone, Copy)]
pub struct TraceParams {
    /// Amplitude that spans half a row.
    pub scale: f64,
    /// Subtract the mean of the visible samples.
    pub remove_dc: bool,
    /// Row centre on the y axis.
    pub offset: f64,
    /// Above this many samples the trace is reduced to a min/max envelope.
    pub max_points: usize,
}

/// Sample indices covering `[t0, t0 + duration]` plus one sample on each side
/// so the trace reaches the plot edges.
pub fn sample_range(segment: &RawSegment, t0: f64, duration: f64) -> Range<usize> {
    let n = segment.n_times();
    let first = segment.sample_at(t0);
    if first >= n {
        return n..n;
    }
    let start = first.saturating_sub(1);
    let stop = (segment.sample_at(t0 + duration) + 1).min(n);
    start.min(stop)..stop
}

/// Plot points `[time, y]` for one channel row over `range`.
pub fn trace_points(row: &[f64], sfreq: f64, range: Range<usize>, params: &TraceParams) -> Vec<[f64; 2]> {
    let Some(slice) = row.get(range.clone()) else {
        return Vec::new();
    };
    if slice.is_empty() {
        return Vec::new();
    }

    let dc = if params.remove_dc {
        slice.iter().sum::<f64>() / slice.len() as f64
    } else {
        0.0
    };
    let scale = if params.scale > 0.0 { params.scale } else { 1.0 };
    let to_y = |v: f64| params.offset + (v - dc) / (2.0 * scale);
    let to_t = |i: usize| (range.start + i) as f64 / sfreq;

    if params.max_points < 4 || slice.len() <= params.max_points {
        return slice
            .iter()
            .enumerate()
            .map(|(i, &v)| [to_t(i), to_y(v)])
            .collect();
    }

    minmax_envelope(slice, params.max_points / 2)
        .into_iter()
        .map(|(i, v)| [to_t(i), to_y(v)])
        .collect()
}

/// Reduce `values` to at most `2 * bins` points, keeping each bin's minimum
/// and maximum in their original order.
pub fn minmax_envelope(values: &[f64], bins: usize) -> Vec<(usize, f64)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let bin_len = values.len().div_ceil(bins);
    let mut out = Vec::with_capacity(bins * 2);

    for (b, chunk) in values.chunks(bin_len).enumerate() {
        let base = b * bin_len;
        let mut lo = (0, chunk[0]);
        let mut hi = (0, chunk[0]);
        for (i, &v) in chunk.iter().enumerate() {
            if v < lo.1 {
                lo = (i, v);
            }
            if v > hi.1 {
                hi = (i, v);
            }
        }
        let (first, second) = if lo.0 <= hi.0 { (lo, hi) } else { (hi, lo) };
        out.push((base + first.0, first.1));
        if second.0 != first.0 {
            out.push((base + second.0, second.1));
        }
    }
    out
}
