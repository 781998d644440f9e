//! The driving loop.
//!
//! The driver owns the coordinator and is the only task that mutates it.
//! Deferred acknowledgments run as spawned timer tasks that post into an
//! unbounded channel the loop consumes, so every state change is serialized
//! on the loop without a shared lock.
//!
//! # Loop
//!
//! ```text
//! loop:
//!   stop requested or round limit reached?  -> stop coordinator, return
//!   advance()        -> Wait(dwell)
//!   complete_dwell() -> Wait(inter_round)                      (basic)
//!                    -> ScheduleAck.., AwaitAcks(round, timeout) (gated)
//!                    -> ScheduleAck.., Wait(inter_round)        (fire-and-forget)
//! ```
//!
//! While suspended the loop keeps receiving acknowledgments and watching the
//! stop signal. A stop cuts the current wait short and stops the coordinator
//! at once; the remaining calls of the round become no-ops.
//!
//! When a timer elapses the loop yields once and drains the channel before
//! acting on it, so an acknowledgment due at the same instant is recorded
//! before the timeout. A run that reaches its round limit waits up to one
//! acknowledgment delay for deliveries still in flight.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokenring_core::{
    AckPolicy, DecisionSource, EventSink, Message, RingAction, RingSnapshot, TokenCoordinator,
    Variant, env::Environment,
};
use tokio::sync::{mpsc, watch};

use crate::{
    delivery::{AckDelivery, OnTime},
    error::RuntimeError,
};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop handle was triggered
    Signal,
    /// The configured number of rounds completed
    RoundLimit,
}

/// Outcome of [`Driver::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Rounds completed
    pub rounds: u64,
    /// Coordinator state when the loop ended
    pub snapshot: RingSnapshot,
    /// Why the loop ended
    pub reason: StopReason,
}

/// Cloneable handle that stops a running [`Driver`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Request the run to stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Executes coordinator actions against an [`Environment`].
pub struct Driver<E, S, D, A = OnTime> {
    env: E,
    coordinator: TokenCoordinator<S, D>,
    delivery: Arc<A>,
    max_rounds: Option<u64>,
    ack_tx: mpsc::UnboundedSender<Message>,
    ack_rx: mpsc::UnboundedReceiver<Message>,
    /// Acknowledgments scheduled but not yet received
    in_flight: usize,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl<E, S, D> Driver<E, S, D, OnTime>
where
    E: Environment,
    S: EventSink,
    D: DecisionSource,
{
    /// Create a driver that delivers acknowledgments on time and runs until
    /// stopped.
    pub fn new(env: E, coordinator: TokenCoordinator<S, D>) -> Self {
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            env,
            coordinator,
            delivery: Arc::new(OnTime),
            max_rounds: None,
            ack_tx,
            ack_rx,
            in_flight: 0,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }
}

impl<E, S, D, A> Driver<E, S, D, A>
where
    E: Environment,
    S: EventSink,
    D: DecisionSource,
    A: AckDelivery,
{
    /// Replace the acknowledgment delivery policy.
    pub fn with_delivery<B: AckDelivery>(self, delivery: B) -> Driver<E, S, D, B> {
        Driver {
            env: self.env,
            coordinator: self.coordinator,
            delivery: Arc::new(delivery),
            max_rounds: self.max_rounds,
            ack_tx: self.ack_tx,
            ack_rx: self.ack_rx,
            in_flight: self.in_flight,
            stop_tx: self.stop_tx,
            stop_rx: self.stop_rx,
        }
    }

    /// End the run after `rounds` completed rounds.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Handle that stops this driver from any task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { tx: Arc::clone(&self.stop_tx) }
    }

    /// The coordinator being driven.
    pub fn coordinator(&self) -> &TokenCoordinator<S, D> {
        &self.coordinator
    }

    /// Run rounds until stopped or the round limit is reached.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Ring` if the coordinator reports a fatal
    /// protocol error.
    pub async fn run(mut self) -> Result<RunReport, RuntimeError> {
        let config = self.coordinator.config();
        tracing::info!(
            size = config.size,
            variant = ?config.variant,
            max_rounds = ?self.max_rounds,
            "ring starting"
        );

        let reason = loop {
            let pending = self.drain_acks()?;
            self.execute(pending).await?;

            if *self.stop_rx.borrow() {
                break StopReason::Signal;
            }
            if self.max_rounds.is_some_and(|max| self.coordinator.round() >= max) {
                self.settle().await?;
                break StopReason::RoundLimit;
            }

            let actions = self.coordinator.advance()?;
            self.execute(actions).await?;

            let actions = self.coordinator.complete_dwell()?;
            self.execute(actions).await?;
        };

        self.coordinator.stop();
        let report = RunReport {
            rounds: self.coordinator.round(),
            snapshot: self.coordinator.snapshot(),
            reason,
        };
        tracing::info!(rounds = report.rounds, reason = ?report.reason, "ring stopped");

        Ok(report)
    }

    async fn execute(&mut self, actions: Vec<RingAction>) -> Result<(), RuntimeError> {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                RingAction::Wait(duration) => {
                    queue.extend(self.suspend(duration, None).await?);
                },
                RingAction::ScheduleAck { ack, after } => self.schedule_ack(ack, after),
                RingAction::AwaitAcks { round, timeout } => {
                    queue.extend(self.suspend(timeout, Some(round)).await?);
                },
            }
        }

        Ok(())
    }

    /// Suspend for `duration` while delivering acknowledgments.
    ///
    /// With `awaiting` set the wait ends early once the round's last
    /// acknowledgment hands the token over, and an elapsed wait reports the
    /// round's timeout. Returns the coordinator's follow-up actions.
    async fn suspend(
        &mut self,
        duration: Duration,
        awaiting: Option<u64>,
    ) -> Result<Vec<RingAction>, RuntimeError> {
        {
            let sleep = self.env.sleep(duration);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    biased;

                    _ = self.stop_rx.wait_for(|stopped| *stopped) => {
                        self.coordinator.stop();
                        return Ok(Vec::new());
                    },
                    Some(ack) = self.ack_rx.recv() => {
                        self.in_flight = self.in_flight.saturating_sub(1);
                        let actions = self.coordinator.record_ack(ack)?;
                        if !actions.is_empty() {
                            return Ok(actions);
                        }
                    },
                    () = &mut sleep => break,
                }
            }
        }

        let actions = self.collect_due_acks().await?;
        match awaiting {
            Some(round) if actions.is_empty() => Ok(self.coordinator.ack_timeout(round)?),
            _ => Ok(actions),
        }
    }

    /// Let timer tasks woken at the same instant deliver, then record what
    /// they sent.
    async fn collect_due_acks(&mut self) -> Result<Vec<RingAction>, RuntimeError> {
        tokio::task::yield_now().await;
        self.drain_acks()
    }

    /// Wait up to one acknowledgment delay for acknowledgments still in
    /// flight. Only fire-and-forget rings report them after handover.
    async fn settle(&mut self) -> Result<(), RuntimeError> {
        let config = self.coordinator.config();
        let window = config.timing.ack_delay;
        if config.variant != (Variant::Privilege { policy: AckPolicy::FireAndForget }) {
            return Ok(());
        }

        let elapsed = {
            let sleep = self.env.sleep(window);
            tokio::pin!(sleep);

            loop {
                if self.in_flight == 0 {
                    break false;
                }
                tokio::select! {
                    biased;

                    _ = self.stop_rx.wait_for(|stopped| *stopped) => break false,
                    Some(ack) = self.ack_rx.recv() => {
                        self.in_flight = self.in_flight.saturating_sub(1);
                        self.coordinator.record_ack(ack)?;
                    },
                    () = &mut sleep => break true,
                }
            }
        };

        if elapsed {
            self.collect_due_acks().await?;
        }
        Ok(())
    }

    /// Record acknowledgments that are already queued.
    fn drain_acks(&mut self) -> Result<Vec<RingAction>, RuntimeError> {
        let mut actions = Vec::new();
        while let Ok(ack) = self.ack_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            actions.extend(self.coordinator.record_ack(ack)?);
        }
        Ok(actions)
    }

    fn schedule_ack(&mut self, ack: Message, requested: Duration) {
        let Some(delay) = self.delivery.delay(&ack, requested) else {
            tracing::debug!(label = %ack.label(), round = ack.round, "acknowledgment dropped");
            return;
        };

        self.in_flight += 1;
        let env = self.env.clone();
        let tx = self.ack_tx.clone();
        tokio::spawn(async move {
            env.sleep(delay).await;
            // The run may already be over.
            let _ = tx.send(ack);
        });
    }
}
