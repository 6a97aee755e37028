//! dyntest: drives the experimentation engine with simulated sessions and
//! prints the resulting per-variant report.

use std::path::PathBuf;

use clap::Parser;
use dyntest_core::types::{ANOTHER_TEST, PURCHASE_BUTTON_BACKGROUND_COLOR};
use dyntest_core::{Color, EngineConfig};
use dyntest_sdk::ExperimentClient;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dyntest")]
#[command(about = "Epsilon-greedy A/B experimentation engine with a simulated host")]
#[command(version)]
struct Cli {
    /// Config file (TOML, JSON or YAML); environment uses the DYNTEST__ prefix
    #[arg(long, env = "DYNTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Exploration rate in [0, 1] (overrides config)
    #[arg(long, env = "DYNTEST__EPSILON")]
    epsilon: Option<f64>,

    /// RNG seed for reproducible runs (overrides config)
    #[arg(long, env = "DYNTEST__SEED")]
    seed: Option<u64>,

    /// Number of simulated sessions
    #[arg(long, default_value_t = 1000)]
    sessions: usize,

    /// Print per-variant counters as JSON instead of the text report
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

/// Simulated click-through probability of the purchase button per color.
fn click_probability(color: Color) -> f64 {
    match color {
        Color::GREEN => 0.05,
        Color::RED => 0.12,
        Color::BLUE => 0.08,
        _ => 0.0,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dyntest=info".into());
    if cli.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(Some(path.as_path()))?,
        None => EngineConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            EngineConfig::default()
        }),
    };

    if let Some(epsilon) = cli.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    config.validate()?;

    info!(
        epsilon = config.epsilon,
        seed = ?config.seed,
        experiments = config.experiments.len(),
        sessions = cli.sessions,
        "Configuration loaded"
    );

    let client = ExperimentClient::from_config(&config)?;
    client.initialize(&config.experiments)?;

    // Visitor behaviour gets its own stream so it does not perturb the bandit's.
    let mut visitors = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };

    let mut purchases = 0usize;
    for _ in 0..cli.sessions {
        client.new_session();

        let color = client.get_color(PURCHASE_BUTTON_BACKGROUND_COLOR, Color::GRAY);
        client.log_view(PURCHASE_BUTTON_BACKGROUND_COLOR, &color.into());
        if visitors.gen_bool(click_probability(color)) {
            client.log_conversion(PURCHASE_BUTTON_BACKGROUND_COLOR, &color.into());
            purchases += 1;
        }

        let flag = client.get_bool(ANOTHER_TEST, false);
        client.log_view(ANOTHER_TEST, &flag.into());
        if visitors.gen_bool(if flag { 0.10 } else { 0.05 }) {
            client.log_conversion(ANOTHER_TEST, &flag.into());
        }
    }

    info!(sessions = cli.sessions, purchases, "Simulation complete");

    if cli.json {
        println!("{}", client.report_json()?);
    } else {
        print!("{}", client.report());
    }
    Ok(())
}
