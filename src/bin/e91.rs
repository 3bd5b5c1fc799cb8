//! CLI for e91: run the Ekert-91 protocol against the local simulator.
//!
//! ```bash
//! e91 --trials 1000 --eve --eve-probability 0.5
//! RUST_LOG=debug e91 --config run.json --json
//! ```

use std::process::ExitCode;

use clap::Parser;
use e91::{E91Config, E91Error, ProtocolRunner, Simulator};
use log::error;

#[derive(Parser)]
#[command(name = "e91")]
#[command(about = "E91 quantum key distribution with CHSH eavesdropper detection")]
#[command(version)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<String>,

    /// Number of entangled pairs to measure
    #[arg(long)]
    trials: Option<usize>,

    /// Enable the intercept-resend eavesdropper
    #[arg(long)]
    eve: bool,

    /// Per-trial interception probability in [0, 1]
    #[arg(long)]
    eve_probability: Option<f64>,

    /// Backend id passed to the oracle
    #[arg(long)]
    backend: Option<String>,

    /// Seed for the basis schedule and the simulator
    #[arg(long)]
    seed: Option<u64>,

    /// Trials per oracle submission
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent oracle submissions
    #[arg(long)]
    workers: Option<usize>,

    /// Retries per batch after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,

    /// Credit budget forwarded to the backend
    #[arg(long)]
    max_credits: Option<u32>,

    /// Seconds between backend status polls
    #[arg(long)]
    wait_seconds: Option<f64>,

    /// Bounded wait per submission in seconds (0 waits indefinitely)
    #[arg(long)]
    timeout_seconds: Option<f64>,

    /// Backoff before the first retry, in milliseconds
    #[arg(long)]
    initial_backoff_ms: Option<u64>,

    /// Upper bound on the retry backoff, in milliseconds
    #[arg(long)]
    max_backoff_ms: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> Result<(E91Config, bool), E91Error> {
        let mut config = match &self.config {
            Some(path) => E91Config::from_path(path)?,
            None => E91Config::default(),
        };
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if self.eve {
            config.eve_enabled = true;
        }
        if let Some(p) = self.eve_probability {
            config.eve_probability = p;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(max_credits) = self.max_credits {
            config.max_credits = max_credits;
        }
        if let Some(wait) = self.wait_seconds {
            config.wait_seconds = wait;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }
        if let Some(ms) = self.initial_backoff_ms {
            config.initial_backoff_ms = ms;
        }
        if let Some(ms) = self.max_backoff_ms {
            config.max_backoff_ms = ms;
        }
        config.validate()?;
        Ok((config, self.json))
    }
}

fn run(cli: Cli) -> Result<(), E91Error> {
    let (config, json) = cli.into_config()?;
    let simulator = Simulator::with_seed(config.seed);
    let run = ProtocolRunner::new(simulator, config)?.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        print!("{}", run.report);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
