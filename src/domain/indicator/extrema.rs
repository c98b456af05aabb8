//! Local extrema over a symmetric window.
//!
//! Index `i` is a local minimum of order k when `values[i]` is strictly less
//! than every other value within k positions on either side. Windows are
//! clipped at the ends of the series, and the first and last points are never
//! reported since they have no neighbour on one side.

/// Indices of local minima, ascending.
pub fn local_minima(values: &[f64], order: usize) -> Vec<usize> {
    local_extrema(values, order, |candidate, other| candidate < other)
}

/// Indices of local maxima, ascending.
pub fn local_maxima(values: &[f64], order: usize) -> Vec<usize> {
    local_extrema(values, order, |candidate, other| candidate > other)
}

fn local_extrema(values: &[f64], order: usize, beats: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let n = values.len();
    if order == 0 || n < 3 {
        return Vec::new();
    }

    (1..n - 1)
        .filter(|&i| {
            let lo = i.saturating_sub(order);
            let hi = (i + order).min(n - 1);
            (lo..=hi)
                .filter(|&j| j != i)
                .all(|j| beats(values[i], values[j]))
        })
        .collect()
}
