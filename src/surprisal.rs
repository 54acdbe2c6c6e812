//! Surprise measures shared by all sequential learners.
//!
//! - Predictive surprisal: `-ln p(o_t | o_{<t})`
//! - Bayesian surprisal: divergence between the beliefs before and after `o_t`
//! - Confidence-corrected surprisal: divergence between a naive baseline
//!   belief and the current one
//!
//! The functions are generic over [`Posterior`], so each learner only has to
//! say how to read a predictive probability off its belief state and how two
//! belief states are compared. Numeric-domain problems never panic: `-ln 0`
//! is `+inf` and undefined quantities are `NaN`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use statrs::function::gamma::{digamma, ln_gamma};

/// Belief state a surprise measure can be computed from.
pub trait Posterior {
    /// Index type naming a realized outcome.
    type Outcome: Copy;

    /// Predictive probability this belief assigns to `outcome`.
    fn predictive_probability(&self, outcome: Self::Outcome) -> f64;

    /// Divergence from `self` to `other`; zero for identical beliefs.
    fn divergence(&self, other: &Self) -> f64;
}

/// `-ln p`; `+inf` for `p = 0` and `NaN` outside `[0, 1]` or for non-finite input.
pub fn predictive_surprisal(probability: f64) -> f64 {
    if probability == 0.0 {
        f64::INFINITY
    } else if probability > 0.0 && probability <= 1.0 {
        -probability.ln()
    } else {
        f64::NAN
    }
}

/// Predictive surprisal of `outcome` under `posterior`.
pub fn surprisal_of<P: Posterior>(posterior: &P, outcome: P::Outcome) -> f64 {
    predictive_surprisal(posterior.predictive_probability(outcome))
}

/// Belief change caused by one observation.
pub fn bayesian_surprisal<P: Posterior>(before: &P, after: &P) -> f64 {
    before.divergence(after)
}

/// Divergence between a naive baseline belief and the current belief.
pub fn confidence_corrected_surprisal<P: Posterior>(baseline: &P, posterior: &P) -> f64 {
    baseline.divergence(posterior)
}

/// KL divergence `KL(Dir(alpha) || Dir(beta))`.
///
/// Returns `NaN` when the shapes differ or any concentration is not a
/// positive finite number.
pub fn kl_dirichlet(alpha: &[f64], beta: &[f64]) -> f64 {
    if alpha.len() != beta.len() || alpha.is_empty() {
        return f64::NAN;
    }
    let valid = |v: &f64| v.is_finite() && *v > 0.0;
    if !alpha.iter().all(valid) || !beta.iter().all(valid) {
        return f64::NAN;
    }

    let alpha0: f64 = alpha.iter().sum();
    let beta0: f64 = beta.iter().sum();
    let psi_alpha0 = digamma(alpha0);

    // Differences are grouped so identical arguments cancel exactly.
    let mut kl = ln_gamma(alpha0) - ln_gamma(beta0);
    for (&a, &b) in alpha.iter().zip(beta) {
        kl += ln_gamma(b) - ln_gamma(a);
        kl += (a - b) * (digamma(a) - psi_alpha0);
    }
    if kl < 0.0 { 0.0 } else { kl }
}

/// Mutual information (nats) between two labelings of the same items.
///
/// Each vector assigns a label to every position; equal values are the same
/// label. The score is computed from the contingency table of label pairs.
/// Returns `NaN` when the lengths differ.
pub fn mutual_information(labels_a: &[f64], labels_b: &[f64]) -> f64 {
    if labels_a.len() != labels_b.len() {
        return f64::NAN;
    }
    if labels_a.is_empty() {
        return 0.0;
    }

    // +0.0 and -0.0 are the same label.
    let key = |v: f64| if v == 0.0 { 0u64 } else { v.to_bits() };

    let mut joint: HashMap<(u64, u64), usize> = HashMap::new();
    let mut marginal_a: HashMap<u64, usize> = HashMap::new();
    let mut marginal_b: HashMap<u64, usize> = HashMap::new();
    for (&a, &b) in labels_a.iter().zip(labels_b) {
        let (ka, kb) = (key(a), key(b));
        *joint.entry((ka, kb)).or_insert(0) += 1;
        *marginal_a.entry(ka).or_insert(0) += 1;
        *marginal_b.entry(kb).or_insert(0) += 1;
    }

    let n = labels_a.len() as f64;
    let mi: f64 = joint
        .iter()
        .map(|(&(ka, kb), &count)| {
            let n_ij = count as f64;
            let a_i = marginal_a[&ka] as f64;
            let b_j = marginal_b[&kb] as f64;
            (n_ij / n) * (n_ij.ln() + n.ln() - a_i.ln() - b_j.ln())
        })
        .sum();
    if mi < 0.0 { 0.0 } else { mi }
}

/// Scores and posterior parameters recorded for one timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurprisalRecord {
    pub t: usize,
    pub observation: u8,
    pub hidden: u8,
    /// Predictive surprisal (PS).
    pub predictive: f64,
    /// Bayesian surprisal (BS).
    pub bayesian: f64,
    /// Confidence-corrected surprisal (CS).
    pub corrected: f64,
    /// Learner-specific posterior parameters after the update.
    pub parameters: Vec<f64>,
}

impl SurprisalRecord {
    /// Whether any score hit a numeric-domain problem (`NaN` or infinite).
    pub fn is_degenerate(&self) -> bool {
        !(self.predictive.is_finite() && self.bayesian.is_finite() && self.corrected.is_finite())
    }

    /// Flat numeric row: `[t, observation, hidden, PS, BS, CS, parameters...]`.
    pub fn row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(6 + self.parameters.len());
        row.extend([
            self.t as f64,
            self.observation as f64,
            self.hidden as f64,
            self.predictive,
            self.bayesian,
            self.corrected,
        ]);
        row.extend_from_slice(&self.parameters);
        row
    }
}

/// Aggregate view over a results table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurpriseSummary {
    pub steps: usize,
    pub degenerate_steps: usize,
    /// Means over finite values only.
    pub mean_predictive: f64,
    pub mean_bayesian: f64,
    pub mean_corrected: f64,
}

/// Ordered per-timestep results of one learner run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    label: String,
    parameter_names: Vec<String>,
    records: Vec<SurprisalRecord>,
}

impl ResultsTable {
    pub const BASE_COLUMNS: [&'static str; 6] = ["t", "observation", "hidden", "PS", "BS", "CS"];

    pub fn new(label: impl Into<String>, parameter_names: Vec<String>) -> Self {
        Self {
            label: label.into(),
            parameter_names,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: SurprisalRecord) {
        self.records.push(record);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn records(&self) -> &[SurprisalRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SurprisalRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        Self::BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.parameter_names.iter().cloned())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        self.records.iter().map(SurprisalRecord::row)
    }

    /// Values of the named column, if it exists.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.header().iter().position(|c| c == name)?;
        Some(self.rows().map(|row| row[index]).collect())
    }

    /// Timesteps whose scores are `NaN` or infinite.
    pub fn degenerate_steps(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.is_degenerate())
            .map(|r| r.t)
            .collect()
    }

    pub fn summary(&self) -> SurpriseSummary {
        fn finite_mean(values: impl Iterator<Item = f64>) -> f64 {
            let (sum, count) = values
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 { f64::NAN } else { sum / count as f64 }
        }

        SurpriseSummary {
            steps: self.records.len(),
            degenerate_steps: self.records.iter().filter(|r| r.is_degenerate()).count(),
            mean_predictive: finite_mean(self.records.iter().map(|r| r.predictive)),
            mean_bayesian: finite_mean(self.records.iter().map(|r| r.bayesian)),
            mean_corrected: finite_mean(self.records.iter().map(|r| r.corrected)),
        }
    }
}
