//! Categorical–Dirichlet sequential learner with exponential forgetting.
//!
//! The belief over categorical probabilities is a Dirichlet whose
//! concentration parameters are `1 + Σ_{k≤t} w_k · indicator(k)`, with
//! `w_k = exp(-τ (t - k))`. The state is recomputed from the full history at
//! every step rather than updated in place, so the weights of all past
//! observations decay together.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    learners::DegenerateStateWarning,
    ports::{Observer, SequentialLearner},
    surprisal::{
        Posterior, ResultsTable, SurprisalRecord, bayesian_surprisal,
        confidence_corrected_surprisal, kl_dirichlet, surprisal_of,
    },
    types::{ModelVariant, Sequence},
    utils::normalize_weights,
};

/// Learner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirichletConfig {
    pub variant: ModelVariant,
    /// Exponential forgetting rate τ ≥ 0; zero counts all evidence equally.
    pub forgetting_rate: f64,
}

impl Default for DirichletConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::StimulusProbability,
            forgetting_rate: 0.0,
        }
    }
}

impl DirichletConfig {
    pub fn new(variant: ModelVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn with_forgetting_rate(mut self, forgetting_rate: f64) -> Self {
        self.forgetting_rate = forgetting_rate;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a negative or non-finite τ.
    pub fn validate(&self) -> Result<()> {
        if !self.forgetting_rate.is_finite() || self.forgetting_rate < 0.0 {
            return Err(Error::config(format!(
                "forgetting rate must be a finite value >= 0, got {}",
                self.forgetting_rate
            )));
        }
        Ok(())
    }
}

/// Exponentially decaying evidence weights `w[k] = exp(-τ (T - 1 - k))`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgettingWeights {
    tau: f64,
    weights: Vec<f64>,
}

impl ForgettingWeights {
    pub fn new(tau: f64, len: usize) -> Self {
        let weights = (0..len)
            .map(|k| (-tau * (len - 1 - k) as f64).exp())
            .collect();
        Self { tau, weights }
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weights for observations `0..=t` as seen from time `t`; the last entry is 1.
    ///
    /// Empty when there are no weights.
    pub fn window(&self, t: usize) -> &[f64] {
        let len = self.weights.len();
        if len == 0 {
            return &[];
        }
        &self.weights[len - 1 - t.min(len - 1)..]
    }
}

/// Layout of the concentration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateShape {
    /// One parameter per category.
    Vector(usize),
    /// `n × n` from→to parameters, stored row-major.
    Matrix(usize),
}

impl StateShape {
    pub fn len(self) -> usize {
        match self {
            StateShape::Vector(n) => n,
            StateShape::Matrix(n) => n * n,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Dirichlet concentration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletState {
    shape: StateShape,
    alpha: Vec<f64>,
}

impl DirichletState {
    /// Laplace prior: every pseudo-count is 1.
    pub fn uniform(shape: StateShape) -> Self {
        Self {
            shape,
            alpha: vec![1.0; shape.len()],
        }
    }

    pub fn for_variant(variant: ModelVariant, categories: usize) -> Self {
        Self::uniform(match variant {
            ModelVariant::StimulusProbability => StateShape::Vector(categories),
            ModelVariant::AlternationProbability => StateShape::Vector(2),
            ModelVariant::TransitionProbability => StateShape::Matrix(categories),
        })
    }

    fn with_parameters(shape: StateShape, alpha: Vec<f64>) -> Self {
        debug_assert_eq!(shape.len(), alpha.len());
        Self { shape, alpha }
    }

    pub fn shape(&self) -> StateShape {
        self.shape
    }

    /// Flattened (row-major) concentration parameters.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Parameter for the from→to pair `(i, j)`; vectors ignore `i`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        match self.shape {
            StateShape::Vector(_) => self.alpha.get(j).copied(),
            StateShape::Matrix(n) if i < n && j < n => Some(self.alpha[i * n + j]),
            StateShape::Matrix(_) => None,
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.alpha.iter().all(|&a| a == 1.0)
    }

    /// Posterior mean: parameters normalized along the first axis.
    ///
    /// Vectors sum to one; for matrices every column `j` sums to one.
    pub fn predictive_distribution(&self) -> Vec<f64> {
        normalize_first_axis(self.shape, &self.alpha)
    }

    /// The predictive distribution renormalized once more along the first
    /// axis and read back as concentration parameters.
    pub fn naive_posterior(&self) -> DirichletState {
        let predictive = self.predictive_distribution();
        Self::with_parameters(self.shape, normalize_first_axis(self.shape, &predictive))
    }
}

fn normalize_first_axis(shape: StateShape, values: &[f64]) -> Vec<f64> {
    match shape {
        StateShape::Vector(_) => normalize_weights(values.iter().copied())
            .unwrap_or_else(|| vec![f64::NAN; values.len()]),
        StateShape::Matrix(n) => {
            let column_totals: Vec<f64> = (0..n)
                .map(|j| (0..n).map(|i| values[i * n + j]).sum())
                .collect();
            values
                .iter()
                .enumerate()
                .map(|(idx, &v)| v / column_totals[idx % n])
                .collect()
        }
    }
}

impl Posterior for DirichletState {
    /// Flat (row-major) parameter index.
    type Outcome = usize;

    fn predictive_probability(&self, outcome: usize) -> f64 {
        match self.shape {
            StateShape::Vector(_) => {
                let total: f64 = self.alpha.iter().sum();
                self.alpha.get(outcome).map_or(f64::NAN, |&a| a / total)
            }
            StateShape::Matrix(n) => {
                if outcome >= self.alpha.len() {
                    return f64::NAN;
                }
                let column = outcome % n;
                let total: f64 = (0..n).map(|i| self.alpha[i * n + column]).sum();
                self.alpha[outcome] / total
            }
        }
    }

    fn divergence(&self, other: &Self) -> f64 {
        kl_dirichlet(&self.alpha, &other.alpha)
    }
}

/// Slot of a repetition in the alternation-probability state.
pub const REPEAT: usize = 0;
/// Slot of an alternation in the alternation-probability state.
pub const ALTERNATE: usize = 1;

/// Categorical–Dirichlet learner over a borrowed sequence.
#[derive(Debug, Clone)]
pub struct CategoricalDirichletLearner<'a> {
    sequence: &'a Sequence,
    config: DirichletConfig,
    categories: usize,
    weights: ForgettingWeights,
    state: DirichletState,
    max_steps: Option<usize>,
}

impl<'a> CategoricalDirichletLearner<'a> {
    /// # Errors
    ///
    /// Returns a configuration error if the forgetting rate is invalid.
    pub fn new(sequence: &'a Sequence, config: DirichletConfig) -> Result<Self> {
        config.validate()?;
        let categories = sequence.num_categories();
        Ok(Self {
            sequence,
            config,
            categories,
            weights: ForgettingWeights::new(config.forgetting_rate, sequence.len()),
            state: DirichletState::for_variant(config.variant, categories),
            max_steps: None,
        })
    }

    /// Limit [`SequentialLearner::run`] to the first `max_t` steps.
    pub fn with_max_steps(mut self, max_t: usize) -> Self {
        self.max_steps = Some(max_t);
        self
    }

    pub fn variant(&self) -> ModelVariant {
        self.config.variant
    }

    pub fn categories(&self) -> usize {
        self.categories
    }

    pub fn state(&self) -> &DirichletState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    fn observation(&self, t: usize) -> usize {
        self.sequence.records()[t].observation as usize
    }

    /// Flat index of the variant's indicator at step `k`, if defined.
    ///
    /// The first observation has no predecessor and counts as an alternation.
    fn indicator(&self, k: usize) -> Option<usize> {
        match self.config.variant {
            ModelVariant::StimulusProbability => Some(self.observation(k)),
            ModelVariant::AlternationProbability => match self.sequence.repetition(k) {
                Some(true) => Some(REPEAT),
                _ => Some(ALTERNATE),
            },
            ModelVariant::TransitionProbability if k == 0 => None,
            ModelVariant::TransitionProbability => {
                Some(self.observation(k - 1) * self.categories + self.observation(k))
            }
        }
    }

    /// Flat index of the outcome realized at `t`.
    pub fn outcome(&self, t: usize) -> usize {
        // No predecessor at t = 0: the transition is read as coming from 0.
        self.indicator(t).unwrap_or_else(|| self.observation(t))
    }

    /// Replace the state with `1 + Σ_{k≤t} w_k · indicator(k)`.
    ///
    /// The alternation and transition variants cannot learn from a single
    /// observation: at `t = 0` the state is reset to the uniform prior and a
    /// warning is returned.
    pub fn update(&mut self, t: usize) -> Option<DegenerateStateWarning> {
        let shape = self.state.shape();
        if self.sequence.is_empty() {
            self.state = DirichletState::uniform(shape);
            return None;
        }
        let t = t.min(self.sequence.len() - 1);

        if t == 0 && self.config.variant != ModelVariant::StimulusProbability {
            let warning = DegenerateStateWarning {
                variant: self.config.variant,
                t,
            };
            warn!(variant = %warning.variant, t, "{warning}");
            self.state = DirichletState::uniform(shape);
            return Some(warning);
        }

        let mut alpha = vec![1.0; shape.len()];
        for (k, &weight) in self.weights.window(t).iter().enumerate() {
            if let Some(index) = self.indicator(k) {
                alpha[index] += weight;
            }
        }
        self.state = DirichletState::with_parameters(shape, alpha);
        None
    }

    pub fn predictive_distribution(&self) -> Vec<f64> {
        self.state.predictive_distribution()
    }

    pub fn predictive_surprisal(&self, outcome: usize) -> f64 {
        surprisal_of(&self.state, outcome)
    }

    pub fn bayesian_surprisal(&self, before: &DirichletState, after: &DirichletState) -> f64 {
        bayesian_surprisal(before, after)
    }

    /// `KL(Dir(naive predictive) || Dir(state))`.
    pub fn confidence_corrected_surprisal(&self, state: &DirichletState) -> f64 {
        confidence_corrected_surprisal(&state.naive_posterior(), state)
    }

    /// Column names of the flattened state in result rows.
    pub fn parameter_names(&self) -> Vec<String> {
        match self.state.shape() {
            StateShape::Vector(_) if self.config.variant == ModelVariant::AlternationProbability => {
                vec!["alpha_repeat".to_string(), "alpha_alternate".to_string()]
            }
            StateShape::Vector(n) => (0..n).map(|i| format!("alpha_{i}")).collect(),
            StateShape::Matrix(n) => (0..n)
                .flat_map(|i| (0..n).map(move |j| format!("alpha_{i}_{j}")))
                .collect(),
        }
    }

    fn step(&mut self, t: usize) -> (SurprisalRecord, Option<DegenerateStateWarning>) {
        let before = self.state.clone();
        let warning = self.update(t);
        let outcome = self.outcome(t);
        let record = &self.sequence.records()[t];

        let record = SurprisalRecord {
            t,
            observation: record.observation,
            hidden: record.hidden,
            predictive: self.predictive_surprisal(outcome),
            bayesian: self.bayesian_surprisal(&before, &self.state),
            corrected: self.confidence_corrected_surprisal(&self.state),
            parameters: self.state.alpha().to_vec(),
        };
        if record.is_degenerate() {
            warn!(variant = %self.config.variant, t, "non-finite surprisal");
        }
        (record, warning)
    }

    fn clamp_steps(&self, max_t: usize) -> usize {
        if max_t > self.sequence.len() {
            warn!(
                max_t,
                len = self.sequence.len(),
                "requested more steps than the sequence holds; clamping"
            );
        }
        max_t.min(self.sequence.len())
    }

    /// Run the recursion for `t = 0..max_t` and collect one record per step.
    pub fn compute(&mut self, max_t: usize) -> ResultsTable {
        let steps = self.clamp_steps(max_t);
        debug!(variant = %self.config.variant, steps, "computing surprisal");
        let mut table = ResultsTable::new(self.label(), self.parameter_names());
        for t in 0..steps {
            table.push(self.step(t).0);
        }
        table
    }

    /// Like [`compute`](Self::compute), reporting each step to `observer`.
    ///
    /// # Errors
    ///
    /// Propagates observer failures.
    pub fn compute_observed(
        &mut self,
        max_t: usize,
        observer: &mut dyn Observer,
    ) -> Result<ResultsTable> {
        let steps = self.clamp_steps(max_t);
        let label = self.label();
        let mut table = ResultsTable::new(label.clone(), self.parameter_names());
        observer.on_run_start(&label, steps)?;
        for t in 0..steps {
            let (record, warning) = self.step(t);
            if let Some(warning) = warning {
                observer.on_warning(&warning)?;
            }
            observer.on_record(&record)?;
            table.push(record);
        }
        observer.on_run_end()?;
        Ok(table)
    }
}

impl SequentialLearner for CategoricalDirichletLearner<'_> {
    fn label(&self) -> String {
        format!("CD_{}", self.config.variant)
    }

    fn steps(&self) -> usize {
        self.max_steps
            .map_or(self.sequence.len(), |max_t| max_t.min(self.sequence.len()))
    }

    fn run(&mut self, observer: &mut dyn Observer) -> Result<ResultsTable> {
        let max_t = self.max_steps.unwrap_or(self.sequence.len());
        self.compute_observed(max_t, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner(seq: &Sequence, variant: ModelVariant, tau: f64) -> CategoricalDirichletLearner<'_> {
        CategoricalDirichletLearner::new(seq, DirichletConfig::new(variant).with_forgetting_rate(tau))
            .expect("valid config")
    }

    #[test]
    fn forgetting_weights_decay_with_age() {
        let weights = ForgettingWeights::new(0.5, 4);
        let window = weights.window(2);
        assert_eq!(window.len(), 3);
        assert_eq!(window[2], 1.0);
        assert!((window[1] - (-0.5f64).exp()).abs() < 1e-15);
        assert!((window[0] - (-1.0f64).exp()).abs() < 1e-15);
        assert_eq!(weights.window(10).len(), 4);

        let flat = ForgettingWeights::new(0.0, 5);
        assert!(flat.window(4).iter().all(|&w| w == 1.0));

        let empty = ForgettingWeights::new(0.3, 0);
        assert!(empty.is_empty());
        assert!(empty.window(0).is_empty());
        assert!(empty.window(7).is_empty());
    }

    #[test]
    fn rejects_negative_forgetting_rate() {
        let seq = Sequence::from_observations(&[0, 1]);
        let config = DirichletConfig::new(ModelVariant::StimulusProbability).with_forgetting_rate(-1.0);
        let err = CategoricalDirichletLearner::new(&seq, config).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn stimulus_counts_without_forgetting() {
        let seq = Sequence::from_observations(&[0, 1, 1, 0, 1, 1, 1]);
        let mut sbl = learner(&seq, ModelVariant::StimulusProbability, 0.0);
        for t in 0..seq.len() {
            assert!(sbl.update(t).is_none());
            let ones = seq.observations()[..=t].iter().filter(|&&o| o == 1).count();
            let zeros = t + 1 - ones;
            assert_eq!(sbl.state().alpha(), &[1.0 + zeros as f64, 1.0 + ones as f64]);
        }
    }

    #[test]
    fn update_is_independent_of_call_history() {
        let seq = Sequence::from_observations(&[1, 0, 0, 1, 1, 0, 1]);
        let mut sequential = learner(&seq, ModelVariant::TransitionProbability, 0.3);
        for t in 0..6 {
            sequential.update(t);
        }
        let mut direct = learner(&seq, ModelVariant::TransitionProbability, 0.3);
        direct.update(5);
        assert_eq!(sequential.state(), direct.state());
    }

    #[test]
    fn recomputation_matches_running_decayed_sum() {
        let tau = 0.2;
        let observations = [0, 1, 1, 0, 1, 0, 0, 0, 1, 1];
        let seq = Sequence::from_observations(&observations);
        let mut sbl = learner(&seq, ModelVariant::StimulusProbability, tau);

        let mut running = [0.0f64; 2];
        for (t, &o) in observations.iter().enumerate() {
            for value in running.iter_mut() {
                *value *= (-tau).exp();
            }
            running[o as usize] += 1.0;
            sbl.update(t);
            for (alpha, count) in sbl.state().alpha().iter().zip(running) {
                assert!((alpha - (1.0 + count)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn alternation_at_start_resets_and_warns() {
        let seq = Sequence::from_observations(&[1, 1, 0]);
        let mut sbl = learner(&seq, ModelVariant::AlternationProbability, 0.0);
        let warning = sbl.update(0).expect("t=0 is degenerate");
        assert_eq!(warning.t, 0);
        assert_eq!(warning.variant, ModelVariant::AlternationProbability);
        assert_eq!(sbl.state().alpha(), &[1.0, 1.0]);

        assert!(sbl.update(2).is_none());
        // The first observation and t=2 alternate, t=1 repeats.
        assert_eq!(sbl.state().alpha(), &[2.0, 3.0]);
        assert_eq!(sbl.outcome(0), ALTERNATE);
        assert_eq!(sbl.outcome(1), REPEAT);
    }

    #[test]
    fn transition_at_start_resets_to_uniform() {
        let seq = Sequence::from_observations(&[0, 1, 1]);
        let mut sbl = learner(&seq, ModelVariant::TransitionProbability, 0.0);
        sbl.update(2);
        assert!(!sbl.state().is_uniform());
        assert!(sbl.update(0).is_some());
        assert!(sbl.state().is_uniform());
        assert_eq!(sbl.state().shape(), StateShape::Matrix(2));
    }

    #[test]
    fn transition_counts_from_to_pairs() {
        let seq = Sequence::from_observations(&[0, 1, 1, 0, 0]);
        let mut sbl = learner(&seq, ModelVariant::TransitionProbability, 0.0);
        sbl.update(4);
        // 0→1, 1→1, 1→0, 0→0
        assert_eq!(sbl.state().get(0, 0), Some(2.0));
        assert_eq!(sbl.state().get(0, 1), Some(2.0));
        assert_eq!(sbl.state().get(1, 0), Some(2.0));
        assert_eq!(sbl.state().get(1, 1), Some(2.0));
        assert_eq!(sbl.state().get(2, 0), None);
    }

    #[test]
    fn predictive_normalizes_along_first_axis() {
        let state = DirichletState::with_parameters(StateShape::Matrix(2), vec![3.0, 1.0, 1.0, 2.0]);
        let predictive = state.predictive_distribution();
        assert!((predictive[0] + predictive[2] - 1.0).abs() < 1e-12);
        assert!((predictive[1] + predictive[3] - 1.0).abs() < 1e-12);
        assert!((state.predictive_probability(0) - 0.75).abs() < 1e-12);
        assert!((state.predictive_probability(3) - 2.0 / 3.0).abs() < 1e-12);
        assert!(state.predictive_probability(4).is_nan());

        let vector = DirichletState::with_parameters(StateShape::Vector(3), vec![1.0, 2.0, 5.0]);
        let predictive = vector.predictive_distribution();
        assert!((predictive.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for (naive, p) in vector.naive_posterior().alpha().iter().zip(&predictive) {
            assert!((naive - p).abs() < 1e-12);
        }
    }

    #[test]
    fn confidence_corrected_compares_naive_to_raw_parameters() {
        let seq = Sequence::from_observations(&[0, 0, 1]);
        let mut sbl = learner(&seq, ModelVariant::StimulusProbability, 0.0);
        sbl.update(2);
        let cs = sbl.confidence_corrected_surprisal(sbl.state());
        let expected = kl_dirichlet(&[3.0 / 5.0, 2.0 / 5.0], &[3.0, 2.0]);
        assert!((cs - expected).abs() < 1e-12);
        assert!(cs > 0.0);
    }

    #[test]
    fn compute_emits_one_record_per_step() {
        let seq = Sequence::from_columns(&[0, 0, 1, 1, 1], &[0, 1, 1, 1, 0]).unwrap();
        let mut sbl = learner(&seq, ModelVariant::StimulusProbability, 0.0);
        let table = sbl.compute(seq.len() + 3);
        assert_eq!(table.len(), seq.len());
        assert_eq!(table.label(), "CD_SP");
        assert_eq!(table.parameter_names(), &["alpha_0", "alpha_1"]);

        let first = &table.records()[0];
        // After seeing a single 0: alpha = [2, 1], p(0) = 2/3.
        assert!((first.predictive - -(2.0f64 / 3.0).ln()).abs() < 1e-12);
        assert!(first.bayesian > 0.0);
        assert_eq!(first.parameters, vec![2.0, 1.0]);
        assert!(table.degenerate_steps().is_empty());
        assert_eq!(table.records()[2].hidden, 1);
    }

    #[test]
    fn empty_sequence_yields_empty_table() {
        let seq = Sequence::default();
        let mut sbl = learner(&seq, ModelVariant::TransitionProbability, 0.0);
        assert!(sbl.compute(10).is_empty());
        assert!(sbl.update(3).is_none());
    }
}
