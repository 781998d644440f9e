//! Token ring simulator binary.
//!
//! # Usage
//!
//! ```bash
//! # Basic ring of five nodes, random decisions, runs until Ctrl-C
//! tokenring --nodes 5
//!
//! # Privilege-based ring, reproducible decisions, ten rounds
//! tokenring --nodes 4 --variant privilege --seed 7 --rounds 10
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokenring_core::{
    AckPolicy, DecisionSource, NodeId, RingConfig, Timing, TokenCoordinator, Variant,
    decision::{EnvDecision, SeededDecision},
};
use tokenring_runtime::{Driver, RuntimeError, SystemEnv, TracingSink};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Protocol variant selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VariantArg {
    Basic,
    Privilege,
}

/// Acknowledgment policy selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AckPolicyArg {
    Gate,
    FireAndForget,
}

impl From<AckPolicyArg> for AckPolicy {
    fn from(arg: AckPolicyArg) -> Self {
        match arg {
            AckPolicyArg::Gate => Self::Gate,
            AckPolicyArg::FireAndForget => Self::FireAndForget,
        }
    }
}

/// Token ring mutual exclusion simulator
#[derive(Parser, Debug)]
#[command(name = "tokenring")]
#[command(about = "Token ring mutual exclusion simulator")]
#[command(version)]
struct Args {
    /// Number of nodes in the ring
    #[arg(short, long, default_value = "4")]
    nodes: usize,

    /// Protocol variant
    #[arg(long, value_enum, default_value = "basic")]
    variant: VariantArg,

    /// Acknowledgment policy (privilege variant only; default gate)
    #[arg(long, value_enum)]
    ack_policy: Option<AckPolicyArg>,

    /// Time spent in the critical section, in milliseconds
    #[arg(long, default_value = "1000")]
    dwell_ms: u64,

    /// Pause between rounds, in milliseconds
    #[arg(long, default_value = "1000")]
    round_delay_ms: u64,

    /// Delay before each acknowledgment is delivered, in milliseconds
    #[arg(long, default_value = "1000")]
    ack_delay_ms: u64,

    /// Longest wait for acknowledgments, in milliseconds
    #[arg(long, default_value = "3000")]
    ack_timeout_ms: u64,

    /// Seed for reproducible enter/skip decisions (OS randomness otherwise)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many rounds (runs until Ctrl-C otherwise)
    #[arg(long)]
    rounds: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn ring_config(&self) -> Result<RingConfig, RuntimeError> {
        let variant = match (self.variant, self.ack_policy) {
            (VariantArg::Basic, None) => Variant::Basic,
            (VariantArg::Basic, Some(_)) => {
                return Err(RuntimeError::Config(
                    "--ack-policy requires --variant privilege".to_string(),
                ));
            },
            (VariantArg::Privilege, policy) => Variant::Privilege {
                policy: policy.map_or(AckPolicy::Gate, AckPolicy::from),
            },
        };
        let timing = Timing {
            dwell: Duration::from_millis(self.dwell_ms),
            inter_round_delay: Duration::from_millis(self.round_delay_ms),
            ack_delay: Duration::from_millis(self.ack_delay_ms),
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
        };

        Ok(RingConfig { size: self.nodes, variant, timing })
    }
}

/// Decision source picked by `--seed`.
enum Decisions {
    Seeded(SeededDecision),
    System(EnvDecision<SystemEnv>),
}

impl DecisionSource for Decisions {
    fn decide(&mut self, holder: NodeId) -> bool {
        match self {
            Self::Seeded(source) => source.decide(holder),
            Self::System(source) => source.decide(holder),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.ring_config()?;

    let env = SystemEnv::new();
    let decisions = match args.seed {
        Some(seed) => Decisions::Seeded(SeededDecision::new(seed)),
        None => Decisions::System(EnvDecision::new(env.clone())),
    };

    let coordinator = TokenCoordinator::new(config, TracingSink, decisions)
        .map_err(RuntimeError::from)?;

    let mut driver = Driver::new(env, coordinator);
    if let Some(rounds) = args.rounds {
        driver = driver.with_max_rounds(rounds);
    }

    let stop = driver.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping after the current wait");
                stop.stop();
            },
            Err(e) => tracing::error!("failed to listen for Ctrl-C: {}", e),
        }
    });

    let report = driver.run().await?;
    tracing::info!(
        rounds = report.rounds,
        holder = %report.snapshot.holder,
        reason = ?report.reason,
        "simulation finished"
    );

    Ok(())
}
