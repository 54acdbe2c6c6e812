//! Utility functions for the sbl crate

use rand::{Rng, distr::StandardUniform};

/// Calculate Shannon entropy (nats) from a probability distribution.
///
/// # Examples
///
/// ```
/// use sbl::utils::shannon_entropy;
///
/// let entropy = shannon_entropy(vec![0.5, 0.5]);
/// assert!((entropy - std::f64::consts::LN_2).abs() < 1e-12);
/// ```
pub fn shannon_entropy<I>(probabilities: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    probabilities
        .into_iter()
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Normalize weights to probabilities that sum to 1.0.
///
/// Returns `None` when the total weight is zero, negative or not finite.
///
/// # Examples
///
/// ```
/// use sbl::utils::normalize_weights;
///
/// let normalized = normalize_weights(vec![1.0, 2.0, 1.0]).unwrap();
/// assert_eq!(normalized, vec![0.25, 0.5, 0.25]);
/// assert_eq!(normalize_weights(vec![0.0, 0.0]), None);
/// ```
pub fn normalize_weights<I>(weights: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = weights.into_iter().collect();
    let sum: f64 = weights.iter().sum();
    if weights.is_empty() || !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some(weights.iter().map(|&w| w / sum).collect())
}

/// Draw an index from a categorical distribution.
///
/// Zero-weight entries are never selected. Weights need not be normalized;
/// when every weight is zero the last index is returned.
pub fn sample_index<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    debug_assert!(!weights.is_empty());
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let ticket = rng.sample::<f64, _>(StandardUniform) * total;
    let mut cumulative = 0.0;
    for (idx, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        if ticket < cumulative {
            return idx;
        }
    }
    // Rounding at the upper edge: fall back to the last reachable index.
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(weights.len() - 1)
}

/// `n` evenly spaced points over `[start, end]`, endpoints included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Logistic sigmoid `1 / (1 + e^{-x})`.
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
