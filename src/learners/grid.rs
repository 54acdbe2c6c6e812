//! Discretized forward filter for a latent Gaussian random walk with
//! Bernoulli emissions.
//!
//! The latent variable `s` lives on `s_res` evenly spaced points over
//! `[s_min, s_max]`. Between steps it diffuses with `N(s_t; s_{t-1}, σ)`;
//! each step emits `1` with probability `logistic(s_t)`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    ports::{Observer, SequentialLearner},
    surprisal::{
        Posterior, ResultsTable, SurprisalRecord, bayesian_surprisal,
        confidence_corrected_surprisal, mutual_information, surprisal_of,
    },
    types::{ModelVariant, Sequence},
    utils::{linspace, logistic},
};

/// Emission categories of the binary latent model.
pub const CATEGORIES: usize = 2;

/// Filter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub variant: ModelVariant,
    /// Random-walk step size.
    pub sigma: f64,
    pub s_min: f64,
    pub s_max: f64,
    /// Number of grid points.
    pub s_res: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::StimulusProbability,
            sigma: 2.5,
            s_min: -5.0,
            s_max: 5.0,
            s_res: 70,
        }
    }
}

impl GridConfig {
    pub fn new(variant: ModelVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_bounds(mut self, s_min: f64, s_max: f64) -> Self {
        self.s_min = s_min;
        self.s_max = s_max;
        self
    }

    pub fn with_resolution(mut self, s_res: usize) -> Self {
        self.s_res = s_res;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVariant`] for the transition variant and
    /// [`Error::InvalidConfiguration`] for a bad step size or grid.
    pub fn validate(&self) -> Result<()> {
        if self.variant == ModelVariant::TransitionProbability {
            return Err(Error::UnsupportedVariant {
                variant: self.variant.to_string(),
                learner: "grid filter".to_string(),
            });
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(Error::config(format!(
                "sigma must be a finite value > 0, got {}",
                self.sigma
            )));
        }
        if !self.s_min.is_finite() || !self.s_max.is_finite() || self.s_min > self.s_max {
            return Err(Error::config(format!(
                "grid bounds must be finite with s_min <= s_max, got [{}, {}]",
                self.s_min, self.s_max
            )));
        }
        if self.s_res == 0 {
            return Err(Error::config("grid resolution must be at least 1"));
        }
        Ok(())
    }

    /// Grid point locations.
    pub fn points(&self) -> Vec<f64> {
        linspace(self.s_min, self.s_max, self.s_res)
    }
}

/// Joint mass `P[category][i][j]` of the next grid point `i`, the previous
/// point `j` and the emitted category.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTable {
    resolution: usize,
    cells: Vec<f64>,
}

impl JointTable {
    /// `emission(category, i) · transition(i, j) · prior(j)` for every cell.
    ///
    /// `transition` is row-major `n × n`, `emission[i]` is `P(1 | s_i)`.
    /// Rows are filled in parallel.
    pub fn build(transition: &[f64], emission: &[f64], prior: &[f64]) -> Self {
        let n = prior.len();
        debug_assert_eq!(transition.len(), n * n);
        debug_assert_eq!(emission.len(), n);
        let mut cells = vec![0.0; CATEGORIES * n * n];
        if n == 0 {
            return Self {
                resolution: n,
                cells,
            };
        }

        cells
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(row, out)| {
                let (category, i) = (row / n, row % n);
                let likelihood = if category == 1 {
                    emission[i]
                } else {
                    1.0 - emission[i]
                };
                let densities = &transition[i * n..(i + 1) * n];
                for ((cell, &density), &p) in out.iter_mut().zip(densities).zip(prior) {
                    *cell = likelihood * density * p;
                }
            });

        Self {
            resolution: n,
            cells,
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn get(&self, category: usize, i: usize, j: usize) -> Option<f64> {
        let n = self.resolution;
        if category >= CATEGORIES || i >= n || j >= n {
            return None;
        }
        Some(self.cells[(category * n + i) * n + j])
    }

    /// Mass over the next grid point for one category, previous point summed out.
    pub fn category_marginal(&self, category: usize) -> Vec<f64> {
        let n = self.resolution;
        if category >= CATEGORIES || n == 0 {
            return vec![0.0; n];
        }
        self.cells[category * n * n..(category + 1) * n * n]
            .chunks(n)
            .map(|row| row.iter().sum())
            .collect()
    }

    /// Mass over the next grid point with category and previous point summed out.
    pub fn latent_marginal(&self) -> Vec<f64> {
        let mut marginal = self.category_marginal(0);
        for (total, m) in marginal.iter_mut().zip(self.category_marginal(1)) {
            *total += m;
        }
        marginal
    }

    pub fn category_mass(&self, category: usize) -> f64 {
        self.category_marginal(category).iter().sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum()
    }
}

/// Probability mass over the grid points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPosterior {
    points: Vec<f64>,
    mass: Vec<f64>,
    /// One-step predictive over the categories that was in effect when this
    /// posterior was formed; `NaN` for the prior.
    predictive: [f64; CATEGORIES],
}

impl GridPosterior {
    pub fn uniform(points: Vec<f64>) -> Self {
        let n = points.len();
        Self {
            mass: vec![1.0 / n as f64; n],
            points,
            predictive: [f64::NAN; CATEGORIES],
        }
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    pub fn predictive(&self) -> [f64; CATEGORIES] {
        self.predictive
    }

    pub fn total(&self) -> f64 {
        self.mass.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.points.iter().zip(&self.mass).map(|(s, p)| s * p).sum()
    }

    pub fn std_dev(&self) -> f64 {
        let mean = self.mean();
        self.points
            .iter()
            .zip(&self.mass)
            .map(|(s, p)| p * (s - mean).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Grid point with the largest mass.
    pub fn map_point(&self) -> Option<f64> {
        self.points
            .iter()
            .zip(&self.mass)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&s, _)| s)
    }
}

impl Posterior for GridPosterior {
    /// Emission category.
    type Outcome = usize;

    fn predictive_probability(&self, category: usize) -> f64 {
        self.predictive.get(category).copied().unwrap_or(f64::NAN)
    }

    /// Label-contingency mutual information between the two mass vectors.
    fn divergence(&self, other: &Self) -> f64 {
        mutual_information(&self.mass, &other.mass)
    }
}

/// Grid filter over a borrowed binary sequence.
#[derive(Debug, Clone)]
pub struct GridFilterLearner<'a> {
    sequence: &'a Sequence,
    config: GridConfig,
    /// `N(s_i; s_j, σ)`, row-major.
    transition: Vec<f64>,
    /// `P(1 | s_i)`.
    emission: Vec<f64>,
    posterior: GridPosterior,
    naive: GridPosterior,
    realized: usize,
}

impl<'a> GridFilterLearner<'a> {
    /// # Errors
    ///
    /// Fails on an invalid configuration or when the sequence contains
    /// anything but 0/1 observations.
    pub fn new(sequence: &'a Sequence, config: GridConfig) -> Result<Self> {
        config.validate()?;
        if let Some(record) = sequence.iter().find(|r| r.observation > 1) {
            return Err(Error::NonBinaryObservation {
                t: record.t,
                observation: record.observation,
            });
        }

        let points = config.points();
        let step = Normal::new(0.0, config.sigma).map_err(|e| Error::config(e.to_string()))?;
        let transition = points
            .iter()
            .flat_map(|&si| points.iter().map(move |&sj| (si, sj)))
            .map(|(si, sj)| step.pdf(si - sj))
            .collect();
        let emission = points.iter().map(|&s| logistic(s)).collect();
        debug!(
            variant = %config.variant,
            sigma = config.sigma,
            s_res = config.s_res,
            "built grid lookups"
        );

        Ok(Self {
            sequence,
            config,
            transition,
            emission,
            posterior: GridPosterior::uniform(points.clone()),
            naive: GridPosterior::uniform(points),
            realized: 0,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn posterior(&self) -> &GridPosterior {
        &self.posterior
    }

    /// Latent marginal not conditioned on the realized category.
    pub fn naive_marginal(&self) -> &GridPosterior {
        &self.naive
    }

    pub fn transition_density(&self, i: usize, j: usize) -> Option<f64> {
        let n = self.config.s_res;
        (i < n && j < n).then(|| self.transition[i * n + j])
    }

    pub fn emission_probability(&self, i: usize) -> Option<f64> {
        self.emission.get(i).copied()
    }

    /// Category the update at `t` conditions on: the observation itself, or
    /// `1` for a repetition under the alternation variant.
    pub fn realized_category(&self, t: usize) -> usize {
        match self.config.variant {
            ModelVariant::AlternationProbability => {
                usize::from(self.sequence.repetition(t) == Some(true))
            }
            _ => self
                .sequence
                .get(t)
                .map_or(0, |record| record.observation as usize),
        }
    }

    /// Filter one step and return the posterior it replaced.
    ///
    /// A collapsed slice mass leaves a `NaN` posterior rather than failing.
    pub fn update(&mut self, t: usize) -> GridPosterior {
        let t = t.min(self.sequence.len().saturating_sub(1));
        let joint = JointTable::build(&self.transition, &self.emission, self.posterior.mass());
        let category = self.realized_category(t);

        let slice = joint.category_marginal(category);
        let slice_mass: f64 = slice.iter().sum();
        let total = joint.total_mass();
        if !(slice_mass > 0.0 && slice_mass.is_finite()) {
            warn!(t, slice_mass, total, "grid posterior mass collapsed");
        }
        let predictive = [joint.category_mass(0) / total, joint.category_mass(1) / total];

        let points = self.posterior.points.clone();
        let naive = GridPosterior {
            points: points.clone(),
            mass: joint.latent_marginal().iter().map(|m| m / total).collect(),
            predictive,
        };
        let posterior = GridPosterior {
            points,
            mass: slice.iter().map(|m| m / slice_mass).collect(),
            predictive,
        };

        self.realized = category;
        self.naive = naive;
        std::mem::replace(&mut self.posterior, posterior)
    }

    /// `-ln` of the predictive probability of the last realized category.
    pub fn predictive_surprisal(&self) -> f64 {
        surprisal_of(&self.posterior, self.realized)
    }

    pub fn bayesian_surprisal(&self, previous: &GridPosterior) -> f64 {
        bayesian_surprisal(previous, &self.posterior)
    }

    pub fn corrected_surprisal(&self, previous: &GridPosterior) -> f64 {
        confidence_corrected_surprisal(previous, &self.naive)
    }

    pub fn parameter_names(&self) -> Vec<String> {
        vec!["posterior_mean".to_string(), "posterior_std".to_string()]
    }

    fn reset(&mut self) {
        let points = self.config.points();
        self.posterior = GridPosterior::uniform(points.clone());
        self.naive = GridPosterior::uniform(points);
        self.realized = 0;
    }

    fn step(&mut self, t: usize) -> SurprisalRecord {
        let previous = self.update(t);
        let record = &self.sequence.records()[t];
        let record = SurprisalRecord {
            t,
            observation: record.observation,
            hidden: record.hidden,
            predictive: self.predictive_surprisal(),
            bayesian: self.bayesian_surprisal(&previous),
            corrected: self.corrected_surprisal(&previous),
            parameters: vec![self.posterior.mean(), self.posterior.std_dev()],
        };
        if record.is_degenerate() {
            warn!(variant = %self.config.variant, t, "non-finite surprisal");
        }
        record
    }

    /// Prime at `t = 1`, then record `t = 2..T`.
    pub fn compute(&mut self) -> ResultsTable {
        self.reset();
        let mut table = ResultsTable::new(self.label(), self.parameter_names());
        if self.sequence.len() < 2 {
            return table;
        }
        self.update(1);
        for t in 2..self.sequence.len() {
            table.push(self.step(t));
        }
        table
    }

    /// Like [`compute`](Self::compute), reporting each step to `observer`.
    ///
    /// # Errors
    ///
    /// Propagates observer failures.
    pub fn compute_observed(&mut self, observer: &mut dyn Observer) -> Result<ResultsTable> {
        self.reset();
        let label = self.label();
        let mut table = ResultsTable::new(label.clone(), self.parameter_names());
        observer.on_run_start(&label, self.steps())?;
        if self.sequence.len() >= 2 {
            self.update(1);
            for t in 2..self.sequence.len() {
                let record = self.step(t);
                observer.on_record(&record)?;
                table.push(record);
            }
        }
        observer.on_run_end()?;
        Ok(table)
    }
}

impl SequentialLearner for GridFilterLearner<'_> {
    fn label(&self) -> String {
        format!("GRW_{}", self.config.variant)
    }

    fn steps(&self) -> usize {
        self.sequence.len().saturating_sub(2)
    }

    fn run(&mut self, observer: &mut dyn Observer) -> Result<ResultsTable> {
        self.compute_observed(observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(seq: &Sequence, config: GridConfig) -> GridFilterLearner<'_> {
        GridFilterLearner::new(seq, config).expect("valid config")
    }

    #[test]
    fn rejects_invalid_configurations() {
        let seq = Sequence::from_observations(&[0, 1, 0]);
        let tp = GridFilterLearner::new(&seq, GridConfig::new(ModelVariant::TransitionProbability));
        assert!(matches!(tp, Err(Error::UnsupportedVariant { .. })));

        for config in [
            GridConfig::default().with_sigma(0.0),
            GridConfig::default().with_sigma(f64::NAN),
            GridConfig::default().with_bounds(1.0, -1.0),
            GridConfig::default().with_resolution(0),
        ] {
            let err = GridFilterLearner::new(&seq, config).unwrap_err();
            assert!(err.is_config_error(), "{config:?}");
        }
    }

    #[test]
    fn rejects_catch_trials() {
        let seq = Sequence::from_observations(&[0, 1, 2, 0]);
        match GridFilterLearner::new(&seq, GridConfig::default()) {
            Err(Error::NonBinaryObservation { t, observation }) => {
                assert_eq!((t, observation), (2, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn lookups_follow_the_latent_model() {
        let seq = Sequence::from_observations(&[0, 1]);
        let grw = filter(&seq, GridConfig::default().with_resolution(11).with_sigma(1.0));
        // Grid spacing is 1.0.
        let peak = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
        assert!((grw.transition_density(3, 3).unwrap() - peak).abs() < 1e-12);
        assert!((grw.transition_density(4, 3).unwrap() - peak * (-0.5f64).exp()).abs() < 1e-12);
        assert_eq!(grw.transition_density(11, 0), None);
        assert!((grw.emission_probability(5).unwrap() - 0.5).abs() < 1e-12);
        assert!(grw.emission_probability(10).unwrap() > 0.99);
    }

    #[test]
    fn joint_table_total_matches_propagated_prior() {
        let points = linspace(-1.0, 1.0, 3);
        let transition = vec![0.5, 0.2, 0.1, 0.2, 0.5, 0.2, 0.1, 0.2, 0.5];
        let emission: Vec<f64> = points.iter().map(|&s| logistic(s)).collect();
        let prior = [0.2, 0.3, 0.5];
        let joint = JointTable::build(&transition, &emission, &prior);

        assert_eq!(joint.resolution(), 3);
        let expected: f64 = (0..3)
            .map(|i| (0..3).map(|j| transition[i * 3 + j] * prior[j]).sum::<f64>())
            .sum();
        assert!((joint.total_mass() - expected).abs() < 1e-12);
        assert!((joint.category_mass(0) + joint.category_mass(1) - expected).abs() < 1e-12);
        assert!((joint.get(1, 2, 0).unwrap() - emission[2] * 0.1 * 0.2).abs() < 1e-15);
        assert_eq!(joint.get(2, 0, 0), None);
    }

    #[test]
    fn posterior_and_naive_marginal_stay_normalized() {
        let seq = Sequence::from_observations(&[0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1]);
        let mut grw = filter(&seq, GridConfig::default());
        for t in 0..seq.len() {
            grw.update(t);
            assert!((grw.posterior().total() - 1.0).abs() < 1e-6);
            assert!((grw.naive_marginal().total() - 1.0).abs() < 1e-6);
            let [p0, p1] = grw.posterior().predictive();
            assert!((p0 + p1 - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn single_point_grid_scores_exact_bernoulli_likelihood() {
        let s = 0.8;
        let seq = Sequence::from_observations(&[1, 0, 1, 1, 0, 0, 1]);
        let config = GridConfig::default().with_bounds(s, s).with_resolution(1);
        let table = filter(&seq, config).compute();

        assert_eq!(table.len(), seq.len() - 2);
        let p1 = logistic(s);
        for record in table.records() {
            let expected = if record.observation == 1 { -p1.ln() } else { -(1.0 - p1).ln() };
            assert!((record.predictive - expected).abs() < 1e-12);
            assert_eq!(record.bayesian, 0.0);
            assert_eq!(record.parameters, vec![s, 0.0]);
        }
    }

    #[test]
    fn vanishing_step_size_is_a_static_bernoulli_mixture() {
        let observations = [1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0];
        let seq = Sequence::from_observations(&observations);
        let config = GridConfig::default().with_sigma(1e-3).with_resolution(21);
        let table = filter(&seq, config).compute();

        let points = config.points();
        let emission: Vec<f64> = points.iter().map(|&s| logistic(s)).collect();
        let mut belief = vec![1.0 / points.len() as f64; points.len()];
        let mut expected = Vec::new();
        for (t, &o) in observations.iter().enumerate().skip(1) {
            let likelihood: Vec<f64> = emission
                .iter()
                .map(|&e| if o == 1 { e } else { 1.0 - e })
                .collect();
            let predictive: f64 = belief.iter().zip(&likelihood).map(|(b, l)| b * l).sum();
            if t >= 2 {
                expected.push(-predictive.ln());
            }
            for (b, l) in belief.iter_mut().zip(&likelihood) {
                *b *= l / predictive;
            }
        }

        let observed = table.column("PS").unwrap();
        assert_eq!(observed.len(), expected.len());
        for (got, want) in observed.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn alternation_variant_conditions_on_repetitions() {
        let seq = Sequence::from_observations(&[0; 12]);
        let mut sp = filter(&seq, GridConfig::new(ModelVariant::StimulusProbability));
        let mut ap = filter(&seq, GridConfig::new(ModelVariant::AlternationProbability));
        sp.compute();
        ap.compute();
        assert!(sp.posterior().mean() < -1.0);
        assert!(ap.posterior().mean() > 1.0);
        assert_eq!(ap.realized_category(0), 0);
        assert_eq!(ap.realized_category(3), 1);
    }

    #[test]
    fn posterior_diagnostics() {
        let posterior = GridPosterior {
            points: vec![-1.0, 0.0, 1.0],
            mass: vec![0.25, 0.25, 0.5],
            predictive: [f64::NAN; CATEGORIES],
        };
        assert!((posterior.mean() - 0.25).abs() < 1e-12);
        let variance = 0.25 * 1.5625 + 0.25 * 0.0625 + 0.5 * 0.5625;
        assert!((posterior.std_dev() - f64::sqrt(variance)).abs() < 1e-12);
        assert_eq!(posterior.map_point(), Some(1.0));
        assert!(posterior.predictive_probability(0).is_nan());
        assert!(posterior.predictive_probability(5).is_nan());
    }

    #[test]
    fn short_sequences_produce_no_records() {
        for len in 0..=2 {
            let seq = Sequence::from_observations(&vec![1; len]);
            let mut grw = filter(&seq, GridConfig::default().with_resolution(5));
            assert!(grw.compute().is_empty());
        }
    }
}
