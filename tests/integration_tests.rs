//! Integration tests for RLWM curve simulation.
//!
//! These tests verify end-to-end behavior:
//! - Runs complete with the configured trial count and learn the rewarded action
//! - Simulation is reproducible across instances and drivers
//! - The capacity-derived reliance weight behaves at its boundaries
//! - The pure working-memory scenario produces an exactly uniform policy

use approx::assert_abs_diff_eq;
use rlwm::{
    mix_policy, simulate_curves, simulate_curves_parallel, validate_policy, ParameterSet,
    RandomStream, TrialSimulator, ValueStore,
};

/// Reference parameters with a run length long enough for stable statistics.
fn long_run_params() -> ParameterSet {
    ParameterSet {
        n_trials: 200,
        ..ParameterSet::default()
    }
}

#[test]
fn test_full_sweep_shape() {
    let params = ParameterSet::default();
    let curves = simulate_curves(&params, 42).expect("simulate");

    assert_eq!(curves.len(), params.set_sizes.len());
    for (curve, &set_size) in curves.curves().iter().zip(&params.set_sizes) {
        assert_eq!(curve.set_size, set_size);
        assert_eq!(curve.len(), params.n_trials);
    }
}

#[test]
fn test_simulation_learns_rewarded_action() {
    let params = long_run_params();
    let curve = TrialSimulator::new(&params, 2, 7)
        .expect("simulator")
        .run()
        .expect("run");

    // With rewards always on one action and a high learning rate, the back
    // half of a long run should be mostly correct.
    let late = &curve.correct[100..];
    let hits = late.iter().filter(|&&c| c).count();
    println!("late accuracy: {}/{}", hits, late.len());
    assert!(hits > 60, "expected learning, got {}/{}", hits, late.len());
}

#[test]
fn test_determinism_across_instances() {
    let params = ParameterSet::default();

    let a = simulate_curves(&params, 1234).expect("first sweep");
    let b = simulate_curves(&params, 1234).expect("second sweep");

    for (ca, cb) in a.curves().iter().zip(b.curves()) {
        assert_eq!(ca.set_size, cb.set_size);
        assert_eq!(ca.correct, cb.correct);
    }
}

#[test]
fn test_parallel_driver_equivalent_to_sequential() {
    let params = long_run_params();

    let seq = simulate_curves(&params, 42).expect("sequential");
    let par = simulate_curves_parallel(&params, 42).expect("parallel");

    assert_eq!(seq.len(), par.len());
    for (a, b) in seq.curves().iter().zip(par.curves()) {
        assert_eq!(a.set_size, b.set_size);
        assert_eq!(a.correct, b.correct);
    }
}

#[test]
fn test_oversized_capacity_pins_reliance_at_w0() {
    let params = ParameterSet {
        capacity: 100,
        ..ParameterSet::default()
    };

    for &set_size in &params.set_sizes {
        assert_abs_diff_eq!(params.reliance_weight(set_size), params.w0);
        let sim = TrialSimulator::new(&params, set_size, 0).expect("simulator");
        assert_abs_diff_eq!(sim.reliance_weight(), params.w0);
    }
}

#[test]
fn test_pure_wm_scenario_exact_uniform_policy() {
    // w0 = 1 with capacity 10 at set size 2 gives w = 1 (pure WM policy);
    // beta_wm = 0 flattens the logits; epsilon = 0 and stick = 0 leave the
    // softmax untouched. The mixed policy is exactly one third each.
    let params = ParameterSet {
        n_actions: 3,
        n_trials: 1,
        w0: 1.0,
        capacity: 10,
        epsilon: 0.0,
        beta_wm: 0.0,
        stick: 0.0,
        ..ParameterSet::default()
    }
    .validated()
    .expect("params");

    let values = ValueStore::new(params.n_actions);
    let w = params.reliance_weight(2);
    assert_eq!(w, 1.0);

    let policy = mix_policy(&values, &params, w);
    for &p in policy.iter() {
        assert_eq!(p, 1.0 / 3.0);
    }

    // The single-trial run is valid whatever action gets sampled
    let curve = TrialSimulator::new(&params, 2, 5)
        .expect("simulator")
        .run()
        .expect("run");
    assert_eq!(curve.len(), 1);
}

#[test]
fn test_policies_stay_valid_throughout_learning() {
    // Drive a run manually and re-check the distribution contract each trial.
    let params = ParameterSet {
        stick: -2.5, // negative perseveration is legal
        ..long_run_params()
    };
    let mut values = ValueStore::new(params.n_actions);
    let mut stream = RandomStream::new(9);
    let w = params.reliance_weight(5);

    for _ in 0..params.n_trials {
        let policy = mix_policy(&values, &params, w);
        assert!(validate_policy(&policy).is_ok());

        let action = stream.sample(&policy).expect("sample");
        let reward = if action == params.correct_action { 1.0 } else { 0.0 };
        values.update_rl(action, reward, params.alpha_rl);
        values.update_wm(action, reward, params.forget);
        values.set_prev_choice(action);
    }
}

#[test]
fn test_larger_set_sizes_learn_slower_on_average() {
    // The capacity effect: beyond capacity, less WM reliance means slower
    // learning. Averaged over many seeds this ordering is stable.
    let params = ParameterSet {
        n_trials: 10,
        set_sizes: vec![2, 6],
        ..ParameterSet::default()
    };

    let mut hits_small = 0usize;
    let mut hits_large = 0usize;
    for seed in 0..200u64 {
        let curves = simulate_curves(&params, seed.wrapping_mul(7919)).expect("simulate");
        hits_small += curves.get(2).expect("ss 2").correct.iter().filter(|&&c| c).count();
        hits_large += curves.get(6).expect("ss 6").correct.iter().filter(|&&c| c).count();
    }

    println!("hits: set size 2 = {}, set size 6 = {}", hits_small, hits_large);
    assert!(
        hits_small > hits_large,
        "set size 2 ({}) should outperform set size 6 ({})",
        hits_small,
        hits_large
    );
}

#[test]
fn test_invalid_parameters_fail_before_any_work() {
    let params = ParameterSet {
        w0: -0.1,
        ..ParameterSet::default()
    };
    let err = simulate_curves(&params, 42).expect_err("must reject");
    let msg = err.to_string();
    assert!(msg.contains("w0"), "unexpected message: {msg}");
}
