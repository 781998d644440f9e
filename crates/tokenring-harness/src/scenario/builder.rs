//! Scenario builder API.
//!
//! Provides a declarative API for constructing ring simulations that enforce
//! the Oracle Pattern.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokenring_core::{
    DecisionSource, EventLog, Message, NodeId, RingConfig, TokenCoordinator,
    decision::{EnvDecision, ScriptedDecision},
};
use tokenring_runtime::{AckDelivery, Driver};

use crate::{
    SimEnv,
    delivery::{LossyAcks, SilentNodes},
    scenario::{OracleFn, World},
};

/// Boxed decision source; closures are decision sources.
type Decisions = Box<dyn FnMut(NodeId) -> bool + Send>;

/// Scenario builder.
///
/// Configure the ring, the decisions, and acknowledgment faults, then add an
/// oracle to get a runnable scenario.
pub struct Scenario {
    config: RingConfig,
    seed: u64,
    rounds: u64,
    script: Option<Vec<bool>>,
    loss_rate: f64,
    jitter: Duration,
    silent: BTreeSet<NodeId>,
    stop_after: Option<Duration>,
    simulation_duration: Duration,
}

impl Scenario {
    /// Basic ring of four nodes, default timing, seed 0, eight rounds.
    pub fn new() -> Self {
        Self {
            config: RingConfig::default(),
            seed: 0,
            rounds: 8,
            script: None,
            loss_rate: 0.0,
            jitter: Duration::ZERO,
            silent: BTreeSet::new(),
            stop_after: None,
            simulation_duration: Duration::from_secs(600),
        }
    }

    /// Ring configuration.
    pub fn with_config(mut self, config: RingConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed for the simulation RNG (decisions and lossy delivery).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of rounds to run.
    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds;
        self
    }

    /// Replace the seeded coin with a fixed, cycling decision script.
    pub fn with_decisions(mut self, script: Vec<bool>) -> Self {
        self.script = Some(script);
        self
    }

    /// Drop each acknowledgment with probability `rate`.
    pub fn with_ack_loss(mut self, rate: f64) -> Self {
        self.loss_rate = rate;
        self
    }

    /// Delay each acknowledgment by up to `jitter` more than requested.
    pub fn with_ack_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Nodes whose acknowledgments never arrive.
    pub fn with_silent_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.silent.extend(nodes);
        self
    }

    /// Trigger the stop handle after this much virtual time.
    pub fn with_stop_after(mut self, after: Duration) -> Self {
        self.stop_after = Some(after);
        self
    }

    /// Upper bound on virtual time for the whole run.
    pub fn with_simulation_duration(mut self, duration: Duration) -> Self {
        self.simulation_duration = duration;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Runs the driver inside a Turmoil client until the round limit or the
    /// scheduled stop, then invokes the oracle on the recorded world.
    pub fn run(self) -> Result<(), String> {
        let world = self.simulate()?;
        (self.oracle)(&world)
    }

    /// Execute the scenario and return the world without verification.
    ///
    /// Used to compare whole runs, e.g. for determinism checks.
    pub fn world(self) -> Result<World, String> {
        self.simulate()
    }

    fn simulate(&self) -> Result<World, String> {
        let Scenario {
            config,
            seed,
            rounds,
            script,
            loss_rate,
            jitter,
            silent,
            stop_after,
            simulation_duration,
        } = &self.scenario;

        let mut sim = turmoil::Builder::new()
            .simulation_duration(*simulation_duration)
            .rng_seed(*seed)
            .build();

        let slot: Arc<Mutex<Option<World>>> = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&slot);

        let config = config.clone();
        let (seed, rounds, loss_rate, jitter) = (*seed, *rounds, *loss_rate, *jitter);
        let script = script.clone();
        let silent = silent.clone();
        let stop_after = *stop_after;

        sim.client("ring", async move {
            let env = SimEnv::with_seed(seed);
            let log = Arc::new(EventLog::new());

            let decisions: Decisions = match script {
                Some(script) => {
                    let mut source = ScriptedDecision::new(script);
                    Box::new(move |holder| source.decide(holder))
                },
                None => {
                    let mut source = EnvDecision::new(env.clone());
                    Box::new(move |holder| source.decide(holder))
                },
            };

            let delivery = Faults {
                silent: SilentNodes::new(silent),
                lossy: LossyAcks::new(env.clone(), loss_rate).with_jitter(jitter),
            };

            let coordinator = TokenCoordinator::new(config.clone(), Arc::clone(&log), decisions)?;
            let driver = Driver::new(env, coordinator)
                .with_delivery(delivery)
                .with_max_rounds(rounds);

            if let Some(after) = stop_after {
                let stop = driver.stop_handle();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    stop.stop();
                });
            }

            let report = driver.run().await?;
            *captured.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(World::new(config, report, log.events()));

            Ok(())
        });

        sim.run().map_err(|e| format!("simulation failed: {e}"))?;

        slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| "ring did not finish".to_string())
    }
}

/// Silent nodes first, then random loss and jitter for everyone else.
struct Faults {
    silent: SilentNodes,
    lossy: LossyAcks,
}

impl AckDelivery for Faults {
    fn delay(&self, ack: &Message, requested: Duration) -> Option<Duration> {
        self.silent.delay(ack, requested).and_then(|delay| self.lossy.delay(ack, delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        let _scenario = Scenario::new().oracle(Box::new(|_world| Ok(())));
    }

    #[test]
    fn scenario_runs_default_ring() {
        let world = Scenario::new().oracle(Box::new(|_| Ok(()))).world().unwrap();

        assert_eq!(world.report().rounds, 8);
        assert_eq!(world.holders().len(), 8);
    }

    #[test]
    fn oracle_failure_is_reported() {
        let result = Scenario::new()
            .with_rounds(1)
            .oracle(Box::new(|_| Err("always fails".to_string())))
            .run();

        assert_eq!(result, Err("always fails".to_string()));
    }
}
