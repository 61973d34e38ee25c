//! # RLWM (Reinforcement Learning + Working Memory) simulator
//!
//! A trial-by-trial generative implementation of the hybrid RLWM decision
//! model: a slow reinforcement-learning policy and a fast, capacity-limited
//! working-memory policy compete on every trial, mixed by a set-size-dependent
//! reliance weight, with perseveration and stochastic lapses.
//!
//! ## Overview
//!
//! Given a validated [`ParameterSet`] and a seed, the simulator produces one
//! learning curve per set size: the ordered sequence of trial correctness
//! outcomes, suitable for proportion-correct plotting downstream. Parameter
//! values are supplied, not fitted — estimation is a separate workflow.
//!
//! ## Structure
//!
//! - [`core`] — model kernel: parameters, value tables, update rules,
//!   policy mixing, seeded categorical sampling
//! - [`sim`] — run drivers: per-run trial loop, sequential and
//!   Rayon-parallel sweeps over set sizes, curve aggregation
//!
//! ## Reproducibility
//!
//! Every draw comes from a [`RandomStream`] seeded from the caller's root
//! seed; the same (parameters, set size, seed) triple always yields the same
//! action and performance sequences, on one thread or many.

pub mod core;
pub mod sim;

pub use crate::core::{
    mix_policy, softmax, validate_policy, ParameterSet, RandomStream, RlwmError, RlwmResult,
    ValueStore, POLICY_TOLERANCE,
};
pub use crate::sim::{
    simulate_curves, simulate_curves_parallel, CurveAggregator, LearningCurve, TrialSimulator,
};
