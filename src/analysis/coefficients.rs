//! Correlation coefficients over pairwise-complete observations.
//!
//! Every function returns `None` when the statistic is undefined (fewer than
//! two observations, zero variance, non-finite result) instead of an error:
//! a failing coefficient is local to its column pair.
//!
//! The statistics come from `u_analytics::correlation`. Two cases are
//! handled here: exactly two observations (the crate needs three, but the
//! coefficient is still the sign of the slope) and Kendall on long columns,
//! where the crate's pairwise count is quadratic.

use u_analytics::correlation as stats;

/// Above this many complete rows Kendall switches to the merge-sort count.
pub const KENDALL_PAIRWISE_MAX_ROWS: usize = 2_000;

/// Keep only the rows where both values are present and finite.
pub fn complete_pairs(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .unzip()
}

fn bounded(r: f64) -> Option<f64> {
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Two points are perfectly (anti-)correlated unless one axis is flat.
fn two_points(x: &[f64], y: &[f64]) -> Option<f64> {
    let dx = x[1] - x[0];
    let dy = y[1] - y[0];
    (dx != 0.0 && dy != 0.0).then(|| dx.signum() * dy.signum())
}

/// Pearson product-moment correlation.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    match x.len() {
        n if n < 2 || n != y.len() => None,
        2 => two_points(x, y),
        _ => stats::pearson(x, y).and_then(|r| bounded(r.r)),
    }
}

/// Spearman rank correlation: Pearson over average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    match x.len() {
        n if n < 2 || n != y.len() => None,
        2 => two_points(x, y),
        _ => stats::spearman(x, y).and_then(|r| bounded(r.r)),
    }
}

/// Kendall's tau-b, which corrects for ties in either variable.
pub fn kendall(x: &[f64], y: &[f64]) -> Option<f64> {
    match x.len() {
        n if n < 2 || n != y.len() => None,
        2 => two_points(x, y),
        n if n <= KENDALL_PAIRWISE_MAX_ROWS => stats::kendall_tau_b(x, y).and_then(|r| bounded(r.r)),
        _ => kendall_merge(x, y),
    }
}

// ---------------------------------------------------------------------------
// Kendall tau-b in O(n log n) (Knight, 1966)
// ---------------------------------------------------------------------------

/// Number of tied pairs among runs of equal, adjacent values.
fn tied_pairs<T: PartialEq>(sorted: impl IntoIterator<Item = T>) -> i64 {
    let mut total = 0i64;
    let mut run = 0i64;
    let mut previous: Option<T> = None;
    for value in sorted {
        if previous.as_ref() == Some(&value) {
            run += 1;
        } else {
            total += run * (run + 1) / 2;
            run = 0;
        }
        previous = Some(value);
    }
    total + run * (run + 1) / 2
}

/// Bottom-up merge sort that counts strict inversions.
fn sort_counting_inversions(values: &mut [f64]) -> i64 {
    let n = values.len();
    let mut buffer = values.to_vec();
    let mut inversions = 0i64;
    let mut width = 1;
    while width < n {
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                if values[j] < values[i] {
                    buffer[k] = values[j];
                    inversions += (mid - i) as i64;
                    j += 1;
                } else {
                    buffer[k] = values[i];
                    i += 1;
                }
                k += 1;
            }
            let rest = mid - i;
            buffer[k..k + rest].copy_from_slice(&values[i..mid]);
            buffer[k + rest..end].copy_from_slice(&values[j..end]);
            start = end;
        }
        values.copy_from_slice(&buffer);
        width *= 2;
    }
    inversions
}

fn kendall_merge(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as i64;
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let tied_x = tied_pairs(pairs.iter().map(|p| p.0));
    let tied_xy = tied_pairs(pairs.iter().copied());

    // With x sorted (ties broken by y), every remaining inversion in y is a
    // discordant pair.
    let mut ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let discordant = sort_counting_inversions(&mut ys);
    let tied_y = tied_pairs(ys.iter().copied());

    let total = n * (n - 1) / 2;
    let denom = ((total - tied_x) as f64 * (total - tied_y) as f64).sqrt();
    if denom == 0.0 {
        return None;
    }
    let score = total - tied_x - tied_y + tied_xy - 2 * discordant;
    bounded(score as f64 / denom)
}
