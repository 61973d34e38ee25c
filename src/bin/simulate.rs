//! RLWM learning-curve simulation binary.
//!
//! Simulates the model once per configured set size and writes one JSONL
//! curve event per run for the plotting pipeline. Flag defaults are the
//! reference parameter estimates from a hierarchical Bayesian fit.

use clap::Parser;
use rlwm::{simulate_curves, simulate_curves_parallel, ParameterSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "rlwm-simulate",
    about = "Simulate RLWM learning curves across set sizes"
)]
struct Args {
    /// RL learning rate, in (0, 1]
    #[arg(long, default_value_t = 0.868316)]
    alpha_rl: f64,

    /// RL inverse temperature
    #[arg(long, default_value_t = 6.090153)]
    beta_rl: f64,

    /// WM inverse temperature
    #[arg(long, default_value_t = 4.578272)]
    beta_wm: f64,

    /// WM decay rate toward uniform
    #[arg(long, default_value_t = 0.006104)]
    forget: f64,

    /// Baseline WM reliance weight
    #[arg(long, default_value_t = 0.224626)]
    w0: f64,

    /// Lapse probability
    #[arg(long, default_value_t = 0.027270)]
    epsilon: f64,

    /// Perseveration bonus toward the previous choice
    #[arg(long, default_value_t = 1.579407)]
    stick: f64,

    /// Working-memory slot count
    #[arg(long, default_value_t = 3)]
    capacity: usize,

    /// Number of available actions
    #[arg(long, default_value_t = 3)]
    n_actions: usize,

    /// Trials per set-size run
    #[arg(long, default_value_t = 10)]
    n_trials: usize,

    /// Index of the rewarded action
    #[arg(long, default_value_t = 0)]
    correct_action: usize,

    /// Set sizes to simulate
    #[arg(long, value_delimiter = ',', default_value = "2,3,4,5,6")]
    set_sizes: Vec<usize>,

    /// Root seed; run i uses seed + i
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output curves file (JSONL)
    #[arg(long, default_value = "data/output/curves.jsonl")]
    output: PathBuf,

    /// Moving-average window for the smoothed curve field (1 = raw)
    #[arg(long, default_value_t = 1)]
    smooth_window: usize,

    /// Run set sizes across Rayon workers
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

fn main() {
    let args = Args::parse();

    let params = ParameterSet {
        alpha_rl: args.alpha_rl,
        beta_rl: args.beta_rl,
        beta_wm: args.beta_wm,
        forget: args.forget,
        w0: args.w0,
        epsilon: args.epsilon,
        stick: args.stick,
        capacity: args.capacity,
        n_actions: args.n_actions,
        n_trials: args.n_trials,
        correct_action: args.correct_action,
        set_sizes: args.set_sizes,
    };

    if let Err(e) = params.validate() {
        eprintln!("Parameter error: {e}");
        std::process::exit(1);
    }

    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent).expect("Failed to create output directory");
    }
    let mut output = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.output)
        .expect("Failed to open output file");

    eprintln!("RLWM Simulation");
    eprintln!("  Actions: {}, trials: {}", params.n_actions, params.n_trials);
    eprintln!("  Set sizes: {:?}", params.set_sizes);
    eprintln!(
        "  Capacity: {}, w0: {}, epsilon: {}",
        params.capacity, params.w0, params.epsilon
    );
    eprintln!("  Seed: {}", args.seed);
    eprintln!("  Output: {}", args.output.display());
    eprintln!(
        "  Driver: {}",
        if args.parallel { "Rayon" } else { "sequential" }
    );
    eprintln!();

    let start = Instant::now();
    let result = if args.parallel {
        simulate_curves_parallel(&params, args.seed)
    } else {
        simulate_curves(&params, args.seed)
    };
    let curves = match result {
        Ok(curves) => curves,
        Err(e) => {
            eprintln!("Simulation failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f32();

    let run_event = serde_json::json!({
        "type": "run",
        "params": params,
        "seed": args.seed,
        "elapsed_secs": elapsed,
    });
    writeln!(output, "{}", run_event).expect("Failed to write run event");

    for curve in curves.curves() {
        let hits = curve.correct.iter().filter(|&&c| c).count();
        eprintln!(
            "Set size {} | correct: {:2}/{} | w: {:.4}",
            curve.set_size,
            hits,
            curve.len(),
            params.reliance_weight(curve.set_size)
        );

        let curve_event = serde_json::json!({
            "type": "curve",
            "set_size": curve.set_size,
            "correct": curve.correct,
            "proportion_correct": curve.smoothed(args.smooth_window),
        });
        writeln!(output, "{}", curve_event).expect("Failed to write curve event");
    }

    output.flush().expect("Failed to flush output");
    eprintln!(
        "\nSimulated {} curves in {:.3}s. Curves written to {}",
        curves.len(),
        elapsed,
        args.output.display()
    );
}
