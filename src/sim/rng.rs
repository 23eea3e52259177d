//! Injectable uniform random source used by the engine.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A sequential stream of uniform samples in `[0, 1)`.
///
/// The engine draws every stochastic decision (irradiance jitter, anomaly
/// injection, anomaly severity) from a single `RandomSource`, in a fixed
/// order, so a scripted source fully determines a run.
pub trait RandomSource {
    /// Returns the next sample in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

impl RandomSource for StdRng {
    fn next_f64(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Builds the production random source, seeded when `seed` is given.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Scripted random source: replays fixed values, then repeats a fallback.
///
/// # Examples
///
/// ```
/// use solar_farm_sim::sim::rng::{RandomSource, SequenceRng};
///
/// let mut rng = SequenceRng::new([0.05, 0.5], 0.99);
/// assert_eq!(rng.next_f64(), 0.05);
/// assert_eq!(rng.next_f64(), 0.5);
/// assert_eq!(rng.next_f64(), 0.99);
/// assert_eq!(rng.next_f64(), 0.99);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceRng {
    script: VecDeque<f64>,
    fallback: f64,
    drawn: usize,
}

impl SequenceRng {
    /// Creates a source that yields `script` in order and `fallback` afterwards.
    pub fn new(script: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
            drawn: 0,
        }
    }

    /// Creates a source that always yields `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(Vec::<f64>::new(), value)
    }

    /// Number of samples drawn so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    /// Number of scripted samples not yet consumed.
    pub fn remaining_script(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for SequenceRng {
    fn next_f64(&mut self) -> f64 {
        self.drawn += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}
