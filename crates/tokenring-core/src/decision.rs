//! Pluggable sources for the enter/skip decision of a token holder.
//!
//! Production runs flip a fair coin from the environment's entropy. Tests plug
//! in a seeded or scripted source so that a run is reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::{env::Environment, node::NodeId};

/// Decides whether the current token holder enters the critical section.
pub trait DecisionSource {
    /// Decision for `holder` in the current round.
    fn decide(&mut self, holder: NodeId) -> bool;
}

impl<F> DecisionSource for F
where
    F: FnMut(NodeId) -> bool,
{
    fn decide(&mut self, holder: NodeId) -> bool {
        self(holder)
    }
}

/// Fair coin driven by a seeded ChaCha20 generator.
///
/// Two sources built from the same seed produce the same decision sequence.
#[derive(Debug, Clone)]
pub struct SeededDecision {
    rng: ChaCha20Rng,
}

impl SeededDecision {
    /// Create a source from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha20Rng::seed_from_u64(seed) }
    }
}

impl DecisionSource for SeededDecision {
    fn decide(&mut self, _holder: NodeId) -> bool {
        self.rng.gen_bool(0.5)
    }
}

/// Fair coin drawn from an [`Environment`].
#[derive(Debug, Clone)]
pub struct EnvDecision<E> {
    env: E,
}

impl<E: Environment> EnvDecision<E> {
    /// Create a source backed by `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }
}

impl<E: Environment> DecisionSource for EnvDecision<E> {
    fn decide(&mut self, _holder: NodeId) -> bool {
        self.env.random_bool()
    }
}

/// Replays a fixed list of decisions, cycling when exhausted.
///
/// An empty script always skips.
#[derive(Debug, Clone)]
pub struct ScriptedDecision {
    script: Vec<bool>,
    next: usize,
}

impl ScriptedDecision {
    /// Create a source replaying `script`.
    pub fn new(script: Vec<bool>) -> Self {
        Self { script, next: 0 }
    }
}

impl DecisionSource for ScriptedDecision {
    fn decide(&mut self, _holder: NodeId) -> bool {
        if self.script.is_empty() {
            return false;
        }
        let decision = self.script[self.next % self.script.len()];
        self.next += 1;
        decision
    }
}

/// Every holder enters the critical section.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysEnter;

impl DecisionSource for AlwaysEnter {
    fn decide(&mut self, _holder: NodeId) -> bool {
        true
    }
}

/// No holder ever enters the critical section.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEnter;

impl DecisionSource for NeverEnter {
    fn decide(&mut self, _holder: NodeId) -> bool {
        false
    }
}
