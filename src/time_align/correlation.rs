//! Discrete cross-correlation and lag selection.
//!
//! For two series `a` and `b` of length `n` the scores are laid out over lags
//! `k ∈ [-(n-1), n-1]`, score index `k + n - 1`:
//!
//! ```text
//! c[k + n - 1] = Σ_i a[i] · b[i + k]      (over i with 0 ≤ i, i + k < n)
//! ```
//!
//! so the center index `n - 1` is zero lag, and a positive lag means `b`
//! repeats `a` later in the window.

/// Fill `scores` with the `2n - 1` cross-correlation scores of `a` against `b`.
///
/// `scores` is cleared first; it keeps its allocation between calls.
pub fn cross_correlation<A, B>(a: A, b: B, scores: &mut Vec<f64>)
where
    A: ExactSizeIterator<Item = f64> + Clone,
    B: ExactSizeIterator<Item = f64> + Clone,
{
    scores.clear();
    let n = a.len();
    assert_eq!(n, b.len(), "cross-correlated series must have equal length");
    if n == 0 {
        return;
    }

    for idx in 0..(2 * n - 1) {
        let score: f64 = if idx < n - 1 {
            // negative lag: b starts first
            let lag = n - 1 - idx;
            a.clone().skip(lag).zip(b.clone()).map(|(x, y)| x * y).sum()
        } else {
            let lag = idx - (n - 1);
            a.clone().zip(b.clone().skip(lag)).map(|(x, y)| x * y).sum()
        };
        scores.push(score);
    }
}

/// Index of the best score, searching outward from the center.
///
/// Candidates are visited as `center - i`, `center + i` for `i = 1, 2, …` and
/// only replace the current best when strictly greater, so ties resolve to the
/// lag of smallest magnitude and, between equal magnitudes, to the negative one.
pub fn select_best_lag(scores: &[f64]) -> usize {
    if scores.is_empty() {
        return 0;
    }
    let center = scores.len() / 2;
    let mut best_idx = center;
    let mut best_score = scores[center];

    for i in 1..=center {
        for idx in [center - i, center + i] {
            if idx < scores.len() && scores[idx] > best_score {
                best_idx = idx;
                best_score = scores[idx];
            }
        }
    }
    best_idx
}

/// Unbiased sample variance; zero for fewer than two values.
pub fn sample_variance<I>(values: I) -> f64
where
    I: ExactSizeIterator<Item = f64> + Clone,
{
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}
