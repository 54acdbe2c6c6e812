//! Common test utilities for the sbl test suite.

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::Bernoulli;
use sbl::{GeneratorConfig, Sequence};

/// Draw `len` i.i.d. Bernoulli(`p`) observations with a fixed seed.
pub fn bernoulli_sequence(p: f64, len: usize, seed: u64) -> Sequence {
    let mut rng = StdRng::seed_from_u64(seed);
    let coin = Bernoulli::new(p).expect("valid probability");
    let observations: Vec<u8> = (0..len).map(|_| u8::from(rng.sample(coin))).collect();
    Sequence::from_observations(&observations)
}

/// First-order generator that strictly alternates after the first draw.
pub fn alternating_config() -> GeneratorConfig {
    GeneratorConfig::new(1, vec![0.0, 1.0])
        .with_regime_change(0.0)
        .with_catch_probability(0.0)
}

/// Counts of 0s and 1s among the first `len` observations.
pub fn tally(sequence: &Sequence, len: usize) -> [usize; 2] {
    let mut counts = [0usize; 2];
    for record in sequence.records().iter().take(len) {
        counts[record.observation as usize] += 1;
    }
    counts
}
