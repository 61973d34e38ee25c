//! Run drivers and result aggregation.
//!
//! A [`TrialSimulator`] owns everything for one (parameters, set size, seed)
//! triple and drives the fixed per-trial sequence. [`simulate_curves`] loops
//! it over every configured set size; [`simulate_curves_parallel`] does the
//! same across Rayon workers.
//!
//! ## Seed derivation
//!
//! Each set-size run draws from its own [`RandomStream`] seeded
//! `root_seed.wrapping_add(run_index)`. Runs share no mutable state, so the
//! sequential and parallel drivers produce identical aggregators for the same
//! root seed.

use crate::core::{
    mix_policy, ParameterSet, RandomStream, RlwmError, RlwmResult, ValueStore,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Correctness outcomes for one set-size run, in trial order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCurve {
    /// Set size this run was simulated under
    pub set_size: usize,
    /// One entry per trial: did the sampled action match the rewarded one
    pub correct: Vec<bool>,
}

impl LearningCurve {
    /// Trials in this run.
    pub fn len(&self) -> usize {
        self.correct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.correct.is_empty()
    }

    /// Per-trial correctness as 0/1 reals, the proportion-correct y-axis
    /// used downstream.
    pub fn proportion_correct(&self) -> Vec<f64> {
        self.correct
            .iter()
            .map(|&c| if c { 1.0 } else { 0.0 })
            .collect()
    }

    /// Trailing moving average of the 0/1 sequence.
    ///
    /// Each output point averages the most recent `window` trials (fewer at
    /// the start of the run). A window of 0 or 1 returns the raw sequence.
    #[allow(clippy::cast_precision_loss)]
    pub fn smoothed(&self, window: usize) -> Vec<f64> {
        let raw = self.proportion_correct();
        if window <= 1 {
            return raw;
        }
        raw.iter()
            .enumerate()
            .map(|(i, _)| {
                let start = (i + 1).saturating_sub(window);
                let span = &raw[start..=i];
                span.iter().sum::<f64>() / span.len() as f64
            })
            .collect()
    }
}

/// Mapping from set size to its learning curve, in simulation order.
///
/// Performs no computation beyond insertion; the completed mapping is the
/// hand-off to downstream plotting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveAggregator {
    curves: Vec<LearningCurve>,
}

impl CurveAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed run's curve.
    pub fn insert(&mut self, curve: LearningCurve) {
        self.curves.push(curve);
    }

    /// All curves, in the order the runs were simulated.
    pub fn curves(&self) -> &[LearningCurve] {
        &self.curves
    }

    /// Curve for a specific set size, if simulated.
    pub fn get(&self, set_size: usize) -> Option<&LearningCurve> {
        self.curves.iter().find(|c| c.set_size == set_size)
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Drives one set-size run trial by trial.
///
/// One instance handles exactly one (ParameterSet, set size, seed) triple;
/// [`TrialSimulator::run`] consumes it, so a finished run cannot be
/// re-entered. Per trial, in fixed order:
///
/// 1. Mix the current policy from `Q`, `WM`, and the previous choice
/// 2. Sample an action
/// 3. Score correctness against the configured rewarded action
/// 4. Apply the RL update, then the WM update
/// 5. Record the choice as the new previous choice
/// 6. Append the outcome to the performance sequence
#[derive(Debug)]
pub struct TrialSimulator {
    params: ParameterSet,
    set_size: usize,
    w: f64,
    values: ValueStore,
    stream: RandomStream,
    performance: Vec<bool>,
}

impl TrialSimulator {
    /// Set up a run. Validates the parameter bundle and the set size.
    ///
    /// # Errors
    /// `InvalidParameter` on a malformed bundle or a set size of 0.
    pub fn new(params: &ParameterSet, set_size: usize, seed: u64) -> RlwmResult<Self> {
        params.validate()?;
        if set_size == 0 {
            return Err(RlwmError::InvalidParameter(
                "set_size must be >= 1".to_string(),
            ));
        }

        Ok(Self {
            w: params.reliance_weight(set_size),
            values: ValueStore::new(params.n_actions),
            stream: RandomStream::new(seed),
            performance: Vec::with_capacity(params.n_trials),
            params: params.clone(),
            set_size,
        })
    }

    /// Reliance weight in effect for this run.
    pub fn reliance_weight(&self) -> f64 {
        self.w
    }

    /// Run all trials and return the finished curve.
    ///
    /// Either completes every trial or fails with no partial result.
    ///
    /// # Errors
    /// `InvalidPolicy` if the mixed policy ever breaks the distribution
    /// contract (a programming error, not a runtime condition).
    pub fn run(mut self) -> RlwmResult<LearningCurve> {
        for _ in 0..self.params.n_trials {
            self.step()?;
        }
        Ok(LearningCurve {
            set_size: self.set_size,
            correct: self.performance,
        })
    }

    fn step(&mut self) -> RlwmResult<()> {
        let policy = mix_policy(&self.values, &self.params, self.w);
        let action = self.stream.sample(&policy)?;

        let correct = action == self.params.correct_action;
        let reward = if correct { 1.0 } else { 0.0 };

        // Both value updates read only their own table, so their relative
        // order is free; both must land before the perseveration bookkeeping.
        self.values.update_rl(action, reward, self.params.alpha_rl);
        self.values.update_wm(action, reward, self.params.forget);
        self.values.set_prev_choice(action);

        self.performance.push(correct);
        Ok(())
    }
}

/// Simulate every configured set size sequentially.
///
/// # Errors
/// `InvalidParameter` on a malformed bundle; `InvalidPolicy` if any run hits
/// a numerical defect.
pub fn simulate_curves(params: &ParameterSet, seed: u64) -> RlwmResult<CurveAggregator> {
    params.validate()?;

    let mut aggregator = CurveAggregator::new();
    for (i, &set_size) in params.set_sizes.iter().enumerate() {
        let run_seed = seed.wrapping_add(i as u64);
        let curve = TrialSimulator::new(params, set_size, run_seed)?.run()?;
        aggregator.insert(curve);
    }
    Ok(aggregator)
}

/// Simulate every configured set size across Rayon workers.
///
/// Runs are mutually independent and each derives its seed from the root
/// seed plus its index, so the result is identical to [`simulate_curves`].
///
/// # Errors
/// Same conditions as [`simulate_curves`].
pub fn simulate_curves_parallel(params: &ParameterSet, seed: u64) -> RlwmResult<CurveAggregator> {
    params.validate()?;

    let curves: Vec<RlwmResult<LearningCurve>> = params
        .set_sizes
        .par_iter()
        .enumerate()
        .map(|(i, &set_size)| {
            let run_seed = seed.wrapping_add(i as u64);
            TrialSimulator::new(params, set_size, run_seed)?.run()
        })
        .collect();

    let mut aggregator = CurveAggregator::new();
    for curve in curves {
        aggregator.insert(curve?);
    }
    Ok(aggregator)
}
