//! Core RLWM model kernel.
//!
//! This module provides the fundamental RLWM structures and operations:
//! - Validated parameter bundle and task geometry
//! - Per-run value tables (`Q` and `WM`) with their update rules
//! - Policy computation (softmax experts, lapse correction, capacity mixing)
//! - Seedable categorical sampling
//!
//! ## Model
//!
//! Two experts propose an action distribution on every trial:
//! ```text
//! Q_policy  = softmax(beta_rl * (Q  + stick * prev_choice))
//! WM_policy = softmax(beta_wm * (WM + stick * prev_choice))
//!
//! policy = w * ((1 - eps) * WM_policy + eps / n)
//!        + (1 - w) * ((1 - eps) * Q_policy + eps / n)
//! ```
//!
//! The reliance weight `w = w0 * min(1, capacity / set_size)` shrinks as the
//! set size exceeds working-memory capacity, shifting weight from the fast
//! WM expert to the slow RL expert.

use ndarray::Array1;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Tolerance for the sum-to-one contract on action distributions.
pub const POLICY_TOLERANCE: f64 = 1e-6;

/// Error type for RLWM operations.
#[derive(Debug, Clone)]
pub enum RlwmError {
    /// Malformed parameter bundle, rejected at construction
    InvalidParameter(String),
    /// An action distribution violated the non-negativity or sum-to-one
    /// contract. Signals a numerical defect upstream, not a runtime
    /// condition to retry.
    InvalidPolicy(String),
}

impl fmt::Display for RlwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlwmError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            RlwmError::InvalidPolicy(msg) => write!(f, "Invalid policy: {}", msg),
        }
    }
}

impl Error for RlwmError {}

pub type RlwmResult<T> = Result<T, RlwmError>;

/// Model parameters and fixed task geometry for a simulation.
///
/// Created once, validated, and read-only for the lifetime of all runs.
/// The [`Default`] values are reference estimates from a hierarchical
/// Bayesian fit of the model to human learning data.
///
/// # Validation
///
/// [`ParameterSet::validated`] rejects (with [`RlwmError::InvalidParameter`]):
/// - `alpha_rl` outside (0, 1]
/// - `beta_rl` or `beta_wm` negative or non-finite
/// - `forget`, `w0`, or `epsilon` outside [0, 1]
/// - non-finite `stick`
/// - `capacity` of 0, fewer than 2 actions, fewer than 1 trial
/// - an empty `set_sizes` list or any set size of 0
/// - `correct_action` out of range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSet {
    /// RL learning rate, in (0, 1]
    pub alpha_rl: f64,
    /// RL inverse temperature, >= 0
    pub beta_rl: f64,
    /// WM inverse temperature, >= 0
    pub beta_wm: f64,
    /// WM decay rate toward uniform, in [0, 1]
    pub forget: f64,
    /// Baseline WM reliance weight, in [0, 1]
    pub w0: f64,
    /// Lapse probability, in [0, 1]
    pub epsilon: f64,
    /// Perseveration bonus toward the previous choice (any finite real)
    pub stick: f64,
    /// Working-memory slot count, >= 1
    pub capacity: usize,
    /// Number of available actions, >= 2
    pub n_actions: usize,
    /// Trials per set-size run, >= 1
    pub n_trials: usize,
    /// Index of the rewarded action, < `n_actions`
    #[serde(default)]
    pub correct_action: usize,
    /// Set sizes to simulate, each >= 1
    pub set_sizes: Vec<usize>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            alpha_rl: 0.868316,
            beta_rl: 6.090153,
            beta_wm: 4.578272,
            forget: 0.006104,
            w0: 0.224626,
            epsilon: 0.027270,
            stick: 1.579407,
            capacity: 3,
            n_actions: 3,
            n_trials: 10,
            correct_action: 0,
            set_sizes: vec![2, 3, 4, 5, 6],
        }
    }
}

impl ParameterSet {
    /// Consume and return the bundle after checking every constraint.
    ///
    /// # Errors
    /// `InvalidParameter` naming the first violated constraint.
    pub fn validated(self) -> RlwmResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check every constraint without consuming the bundle.
    ///
    /// # Errors
    /// `InvalidParameter` naming the first violated constraint.
    pub fn validate(&self) -> RlwmResult<()> {
        if !(self.alpha_rl > 0.0 && self.alpha_rl <= 1.0) {
            return Err(RlwmError::InvalidParameter(format!(
                "alpha_rl must be in (0, 1], got {}",
                self.alpha_rl
            )));
        }
        if !(self.beta_rl >= 0.0 && self.beta_rl.is_finite()) {
            return Err(RlwmError::InvalidParameter(format!(
                "beta_rl must be finite and >= 0, got {}",
                self.beta_rl
            )));
        }
        if !(self.beta_wm >= 0.0 && self.beta_wm.is_finite()) {
            return Err(RlwmError::InvalidParameter(format!(
                "beta_wm must be finite and >= 0, got {}",
                self.beta_wm
            )));
        }
        if !(self.forget >= 0.0 && self.forget <= 1.0) {
            return Err(RlwmError::InvalidParameter(format!(
                "forget must be in [0, 1], got {}",
                self.forget
            )));
        }
        if !(self.w0 >= 0.0 && self.w0 <= 1.0) {
            return Err(RlwmError::InvalidParameter(format!(
                "w0 must be in [0, 1], got {}",
                self.w0
            )));
        }
        if !(self.epsilon >= 0.0 && self.epsilon <= 1.0) {
            return Err(RlwmError::InvalidParameter(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        if !self.stick.is_finite() {
            return Err(RlwmError::InvalidParameter(format!(
                "stick must be finite, got {}",
                self.stick
            )));
        }
        if self.capacity == 0 {
            return Err(RlwmError::InvalidParameter(
                "capacity must be >= 1".to_string(),
            ));
        }
        if self.n_actions < 2 {
            return Err(RlwmError::InvalidParameter(format!(
                "n_actions must be >= 2, got {}",
                self.n_actions
            )));
        }
        if self.n_trials < 1 {
            return Err(RlwmError::InvalidParameter(
                "n_trials must be >= 1".to_string(),
            ));
        }
        if self.correct_action >= self.n_actions {
            return Err(RlwmError::InvalidParameter(format!(
                "correct_action {} out of range for {} actions",
                self.correct_action, self.n_actions
            )));
        }
        if self.set_sizes.is_empty() {
            return Err(RlwmError::InvalidParameter(
                "set_sizes must not be empty".to_string(),
            ));
        }
        if let Some(&bad) = self.set_sizes.iter().find(|&&s| s == 0) {
            return Err(RlwmError::InvalidParameter(format!(
                "set sizes must be >= 1, got {}",
                bad
            )));
        }
        Ok(())
    }

    /// WM reliance weight for a set size: `w0 * min(1, capacity / set_size)`.
    ///
    /// Constant for the duration of a run. Equals `w0` whenever the set size
    /// fits in capacity, and shrinks proportionally beyond that.
    #[allow(clippy::cast_precision_loss)]
    pub fn reliance_weight(&self, set_size: usize) -> f64 {
        let p_in_wm = 1.0f64.min(self.capacity as f64 / set_size as f64);
        self.w0 * p_in_wm
    }
}

/// Seedable source of categorical draws.
///
/// Two streams constructed with the same seed and driven with the same
/// sequence of policies yield identical action sequences. Reproducibility is
/// a contract of this crate only, not a bit-for-bit match against any
/// external PRNG algorithm.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: SmallRng,
}

impl RandomStream {
    /// Create a stream from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draw an action index from a categorical distribution.
    ///
    /// Inverse-CDF scan of a single uniform variate: the first index whose
    /// cumulative mass exceeds the draw wins. The final index absorbs any
    /// shortfall from cumulative rounding.
    ///
    /// # Errors
    /// `InvalidPolicy` if any entry is negative or non-finite, or the sum
    /// deviates from 1 by more than [`POLICY_TOLERANCE`].
    pub fn sample(&mut self, policy: &Array1<f64>) -> RlwmResult<usize> {
        validate_policy(policy)?;

        let u: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for (i, &p) in policy.iter().enumerate() {
            cumulative += p;
            if u < cumulative {
                return Ok(i);
            }
        }
        Ok(policy.len() - 1)
    }
}

/// Check the categorical-distribution contract: finite, non-negative entries
/// summing to 1 within [`POLICY_TOLERANCE`].
///
/// # Errors
/// `InvalidPolicy` describing the violated condition.
pub fn validate_policy(policy: &Array1<f64>) -> RlwmResult<()> {
    if policy.is_empty() {
        return Err(RlwmError::InvalidPolicy("empty distribution".to_string()));
    }
    for (i, &p) in policy.iter().enumerate() {
        if !p.is_finite() || p < 0.0 {
            return Err(RlwmError::InvalidPolicy(format!(
                "entry {} is {}, must be finite and non-negative",
                i, p
            )));
        }
    }
    let sum: f64 = policy.sum();
    // Written so a NaN sum also fails the check.
    if !((sum - 1.0).abs() <= POLICY_TOLERANCE) {
        return Err(RlwmError::InvalidPolicy(format!(
            "mass sums to {}, expected 1 within {}",
            sum, POLICY_TOLERANCE
        )));
    }
    Ok(())
}

/// Per-run value tables for one set-size run.
///
/// Owns the RL value table `Q`, the working-memory table `WM`, and the
/// previous-choice indicator. `prev_choice` has at most one entry equal to 1,
/// all others 0 (all-zero before the first trial).
#[derive(Debug, Clone)]
pub struct ValueStore {
    /// Q[a]: incrementally learned RL value per action
    pub q: Array1<f64>,
    /// WM[a]: fast, decaying working-memory value per action
    pub wm: Array1<f64>,
    /// One-hot indicator of the previous choice (all-zero before trial 1)
    pub prev_choice: Array1<f64>,
}

impl ValueStore {
    /// Create tables for `n_actions` actions, already initialized.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(n_actions: usize) -> Self {
        let uniform = 1.0 / n_actions as f64;
        Self {
            q: Array1::from_elem(n_actions, uniform),
            wm: Array1::from_elem(n_actions, uniform),
            prev_choice: Array1::zeros(n_actions),
        }
    }

    /// Reset both tables to uniform `1/n_actions` and clear `prev_choice`.
    #[allow(clippy::cast_precision_loss)]
    pub fn init(&mut self) {
        let uniform = 1.0 / self.q.len() as f64;
        self.q.fill(uniform);
        self.wm.fill(uniform);
        self.prev_choice.fill(0.0);
    }

    /// Number of actions the tables cover.
    pub fn n_actions(&self) -> usize {
        self.q.len()
    }

    /// Delta-rule RL update on the chosen action only:
    /// `Q[a] += alpha_rl * (reward - Q[a])`.
    pub fn update_rl(&mut self, action: usize, reward: f64, alpha_rl: f64) {
        self.q[action] += alpha_rl * (reward - self.q[action]);
    }

    /// Working-memory update, two sub-steps in fixed order:
    ///
    /// 1. Decay every entry toward uniform: `WM[i] += forget * (1/n - WM[i])`
    /// 2. Overwrite the chosen action's post-decay value with the reward:
    ///    `WM[a] += (reward - WM[a])`
    ///
    /// The overwrite carries full weight 1, not a learning rate. This
    /// asymmetry with the RL rule is part of the model: working memory holds
    /// the last outcome exactly and only loses it to decay on later trials.
    #[allow(clippy::cast_precision_loss)]
    pub fn update_wm(&mut self, action: usize, reward: f64, forget: f64) {
        let uniform = 1.0 / self.wm.len() as f64;
        self.wm.mapv_inplace(|v| v + forget * (uniform - v));
        self.wm[action] += reward - self.wm[action];
    }

    /// Zero the previous-choice vector, then mark `action`.
    pub fn set_prev_choice(&mut self, action: usize) {
        self.prev_choice.fill(0.0);
        self.prev_choice[action] = 1.0;
    }
}

/// Normalized-exponential transform over the action axis.
///
/// Subtracts the maximum logit before exponentiating, so any finite input
/// produces a well-formed distribution.
pub fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let mut out = logits.mapv(|v| (v - max).exp());
    let sum = out.sum();
    out.mapv_inplace(|v| v / sum);
    out
}

/// Compute the action-selection distribution for one trial.
///
/// Pure function of the current tables: the WM and RL experts each produce a
/// softmax policy over perseveration-adjusted values, each is independently
/// lapse-corrected, and the reliance weight `w` mixes the two.
///
/// Guarantee: for finite tables and `w` in [0, 1], the output is non-negative
/// and sums to 1 within floating tolerance.
#[allow(clippy::cast_precision_loss)]
pub fn mix_policy(values: &ValueStore, params: &ParameterSet, w: f64) -> Array1<f64> {
    let n = values.n_actions() as f64;
    let eps = params.epsilon;

    let perseveration = params.stick * &values.prev_choice;
    let q_logits = (&values.q + &perseveration).mapv(|v| params.beta_rl * v);
    let wm_logits = (&values.wm + &perseveration).mapv(|v| params.beta_wm * v);

    let q_policy = softmax(&q_logits);
    let wm_policy = softmax(&wm_logits);

    let wm_mixed = wm_policy.mapv(|p| (1.0 - eps) * p + eps / n);
    let q_mixed = q_policy.mapv(|p| (1.0 - eps) * p + eps / n);

    w * &wm_mixed + (1.0 - w) * &q_mixed
}
