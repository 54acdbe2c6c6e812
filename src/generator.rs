//! Regime-switching, higher-order Markov sequence generator with catch trials.
//!
//! Each of the two regimes owns a transition matrix whose rows are indexed by
//! the context of the last `order` non-catch observations. A row holds the
//! probabilities of emitting 0, emitting 1, emitting a catch trial, or
//! switching regime. Drawing a switch flips the active regime and redraws
//! from the new regime's row at the same context until an observation comes
//! out.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Error, Result,
    analysis::SequenceStats,
    types::{CATCH, Sequence, SequenceRecord},
    utils::sample_index,
};

/// Number of hidden regimes.
pub const REGIMES: usize = 2;
/// Number of informative observation categories.
pub const CATEGORIES: usize = 2;
/// Highest supported Markov order.
pub const MAX_ORDER: usize = 2;

const ROW_TOLERANCE: f64 = 1e-9;

/// Outcome of one draw from a transition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    Observation(u8),
    Catch,
    Switch,
}

impl Draw {
    fn from_column(column: usize) -> Self {
        match column {
            0 => Draw::Observation(0),
            1 => Draw::Observation(1),
            2 => Draw::Catch,
            _ => Draw::Switch,
        }
    }
}

/// Row-stochastic matrix for one regime: rows are contexts, columns are
/// `[P(next=0), P(next=1), P(catch), P(regime switch)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    regime: usize,
    rows: Vec<[f64; 4]>,
}

impl TransitionMatrix {
    pub fn regime(&self) -> usize {
        self.regime
    }

    pub fn rows(&self) -> &[[f64; 4]] {
        &self.rows
    }

    pub fn row(&self, context: usize) -> &[f64; 4] {
        &self.rows[context]
    }

    pub fn num_contexts(&self) -> usize {
        self.rows.len()
    }

    /// Largest absolute deviation of a row sum from one.
    pub fn max_row_error(&self) -> f64 {
        self.rows
            .iter()
            .map(|row| (row.iter().sum::<f64>() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

/// Parameters of the generative process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Markov order of the observation process (1 or 2).
    pub order: usize,
    /// Probability of a catch trial at each step.
    pub catch_probability: f64,
    /// Initial regime distribution (length 2).
    pub regime_init: Vec<f64>,
    /// Probability of a regime switch at each draw.
    pub regime_change: f64,
    /// Initial observation distribution over `{0, 1, catch}` (length 3).
    pub obs_init: Vec<f64>,
    /// `P(next = 0 | context)` per regime and context, regime 0 first.
    ///
    /// Either `2 · 2^order` values, or `2^order` values shared by both regimes.
    pub obs_change: Vec<f64>,
    /// Promote construction and sampling diagnostics to `info` level.
    pub verbose: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            order: 1,
            catch_probability: 0.05,
            regime_init: vec![0.5, 0.5],
            regime_change: 0.01,
            obs_init: vec![0.5, 0.5, 0.0],
            obs_change: vec![0.75, 0.25, 0.25, 0.75],
            verbose: false,
        }
    }
}

impl GeneratorConfig {
    pub fn new(order: usize, obs_change: Vec<f64>) -> Self {
        Self {
            order,
            obs_change,
            ..Self::default()
        }
    }

    pub fn with_catch_probability(mut self, catch_probability: f64) -> Self {
        self.catch_probability = catch_probability;
        self
    }

    pub fn with_regime_init(mut self, regime_init: Vec<f64>) -> Self {
        self.regime_init = regime_init;
        self
    }

    pub fn with_regime_change(mut self, regime_change: f64) -> Self {
        self.regime_change = regime_change;
        self
    }

    pub fn with_obs_init(mut self, obs_init: Vec<f64>) -> Self {
        self.obs_init = obs_init;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of Markov contexts per regime.
    pub fn num_contexts(&self) -> usize {
        CATEGORIES.pow(self.order as u32)
    }

    /// Check dimensions and probability ranges.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.order == 0 || self.order > MAX_ORDER {
            return Err(Error::config(format!(
                "Markov order must be 1 or 2, got {}",
                self.order
            )));
        }
        if self.regime_init.len() != REGIMES {
            return Err(Error::DimensionMismatch {
                what: "initial regime probability vector".to_string(),
                expected: REGIMES.to_string(),
                got: self.regime_init.len(),
            });
        }
        if self.obs_init.len() != CATEGORIES + 1 {
            return Err(Error::DimensionMismatch {
                what: "initial observation probability vector".to_string(),
                expected: (CATEGORIES + 1).to_string(),
                got: self.obs_init.len(),
            });
        }
        check_probability("regime change probability", self.regime_change)?;
        check_probability("catch probability", self.catch_probability)?;
        if self.regime_change >= 1.0 {
            return Err(Error::config(
                "regime change probability of 1 never produces an observation",
            ));
        }
        let contexts = self.num_contexts();
        if self.obs_change.len() != REGIMES * contexts && self.obs_change.len() != contexts {
            return Err(Error::DimensionMismatch {
                what: "observation change probabilities".to_string(),
                expected: format!("{} (or {contexts} shared)", REGIMES * contexts),
                got: self.obs_change.len(),
            });
        }
        for &p in &self.obs_change {
            check_probability("observation change probability", p)?;
        }
        check_distribution("initial regime probability", &self.regime_init)?;
        check_distribution("initial observation probability", &self.obs_init)?;
        Ok(())
    }

    fn obs_change_for(&self, regime: usize, context: usize) -> f64 {
        if self.obs_change.len() == self.num_contexts() {
            self.obs_change[context]
        } else {
            self.obs_change[regime * self.num_contexts() + context]
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidProbability {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_distribution(name: &str, values: &[f64]) -> Result<()> {
    for &value in values {
        check_probability(name, value)?;
    }
    let sum: f64 = values.iter().sum();
    if (sum - 1.0).abs() > ROW_TOLERANCE {
        return Err(Error::config(format!("{name} vector sums to {sum}, not 1")));
    }
    Ok(())
}

/// Context index of the `order` most recent non-catch observations before `t`.
///
/// The most recent observation is the most significant digit. The backward
/// scan skips catch trials and visits each earlier position at most once, so
/// it stops after at most `t` steps; history missing at the start of the
/// sequence counts as category 0.
pub fn context_index(observations: &[u8], t: usize, order: usize) -> usize {
    let mut context = 0;
    let mut found = 0;
    let mut cursor = t.min(observations.len());
    while found < order && cursor > 0 {
        cursor -= 1;
        let observation = observations[cursor];
        if observation == CATCH {
            continue;
        }
        context += observation as usize * CATEGORIES.pow((order - 1 - found) as u32);
        found += 1;
    }
    context
}

/// Samples regime-labelled observation sequences.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    config: GeneratorConfig,
    matrices: [TransitionMatrix; REGIMES],
}

impl SequenceGenerator {
    /// Validate the configuration and build one transition matrix per regime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for wrong dimensions, out-of-range
    /// probabilities or rows that are not stochastic.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let matrices = [
            Self::construct_transitions(&config, 0)?,
            Self::construct_transitions(&config, 1)?,
        ];

        for matrix in &matrices {
            if config.verbose {
                info!(regime = matrix.regime(), rows = ?matrix.rows(), "transition matrix");
            } else {
                debug!(regime = matrix.regime(), rows = ?matrix.rows(), "transition matrix");
            }
        }

        Ok(Self { config, matrices })
    }

    fn construct_transitions(config: &GeneratorConfig, regime: usize) -> Result<TransitionMatrix> {
        let catch = config.catch_probability;
        let change = config.regime_change;
        let mut rows = Vec::with_capacity(config.num_contexts());

        for context in 0..config.num_contexts() {
            let p = config.obs_change_for(regime, context);
            let row = [
                p - catch / 2.0 - change / 2.0,
                1.0 - p - catch / 2.0 - change / 2.0,
                catch,
                change,
            ];
            let in_range = |v: &&f64| (-ROW_TOLERANCE..=1.0 + ROW_TOLERANCE).contains(*v);
            if let Some(&value) = row.iter().find(|v| !in_range(v)) {
                return Err(Error::InvalidProbability {
                    name: format!("transition entry (regime {regime}, context {context})"),
                    value,
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_TOLERANCE {
                return Err(Error::NonStochasticRow {
                    regime,
                    context,
                    sum,
                });
            }
            rows.push(row.map(|v| v.clamp(0.0, 1.0)));
        }

        Ok(TransitionMatrix { regime, rows })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    pub fn transition_matrices(&self) -> &[TransitionMatrix; REGIMES] {
        &self.matrices
    }

    fn draw<R: Rng>(&self, regime: usize, context: usize, rng: &mut R) -> Draw {
        Draw::from_column(sample_index(rng, self.matrices[regime].row(context)))
    }

    /// Sample a sequence of `seq_length` records.
    pub fn sample<R: Rng>(&self, seq_length: usize, rng: &mut R) -> Sequence {
        let order = self.config.order;
        let seed_len = order.min(seq_length);
        let mut regimes: Vec<u8> = Vec::with_capacity(seq_length);
        let mut observations: Vec<u8> = Vec::with_capacity(seq_length);

        for _ in 0..seed_len {
            regimes.push(sample_index(rng, &self.config.regime_init) as u8);
            observations.push(sample_index(rng, &self.config.obs_init) as u8);
        }

        let mut regime = regimes.last().map_or(0, |&r| r as usize);
        let mut switches = 0usize;
        for t in seed_len..seq_length {
            let context = context_index(&observations, t, order);
            let mut draw = self.draw(regime, context, rng);
            // Terminates almost surely: the switch probability is constant and below one.
            while draw == Draw::Switch {
                regime = 1 - regime;
                switches += 1;
                draw = self.draw(regime, context, rng);
            }
            let observation = match draw {
                Draw::Observation(o) => o,
                Draw::Catch | Draw::Switch => CATCH,
            };
            regimes.push(regime as u8);
            observations.push(observation);
        }

        let sequence: Sequence = regimes
            .into_iter()
            .zip(observations)
            .enumerate()
            .map(|(t, (regime, observation))| {
                let hidden = if observation == CATCH { CATCH } else { regime };
                SequenceRecord::new(t, hidden, observation)
            })
            .collect();

        let stats = SequenceStats::from_sequence(&sequence);
        if self.config.verbose {
            info!(length = seq_length, switches, ?stats, "sampled sequence");
        } else {
            debug!(length = seq_length, switches, "sampled sequence");
        }
        sequence
    }

    /// Sample with a deterministic generator seeded from `seed`.
    pub fn sample_seeded(&self, seq_length: usize, seed: u64) -> Sequence {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(seq_length, &mut rng)
    }
}
