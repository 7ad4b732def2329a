//! Utility helpers for integration tests.
//!
//! A scripted command source, a vector assertion and a serial rspec runner.

use std::sync::Arc;

use glam::Vec3;
use rspec::{block::Suite, ConfigurationBuilder, Logger, Runner};
use shardfall::command::{Command, CommandQueue, CommandSource, InputContext};

/// Command source that hands out one batch per collection and records the
/// frame of every call.
#[derive(Debug, Clone, Default)]
pub struct BatchSource {
    batches: Vec<Vec<Command>>,
    next: usize,
    frames: Vec<u64>,
}

impl BatchSource {
    /// Hands out `batches` in order, then nothing.
    pub fn new(batches: Vec<Vec<Command>>) -> Self {
        Self {
            batches,
            next: 0,
            frames: Vec::new(),
        }
    }

    /// Frame counter seen by each collection, in call order.
    pub fn frames(&self) -> &[u64] {
        &self.frames
    }
}

impl CommandSource for BatchSource {
    fn collect_commands(&mut self, context: &InputContext<'_>, queue: &mut CommandQueue) {
        self.frames.push(context.frame());
        if let Some(batch) = self.batches.get(self.next) {
            queue.extend(batch.iter().copied());
        }
        self.next += 1;
    }
}

/// Asserts that two vectors agree component-wise within `tolerance`.
///
/// # Panics
/// Panics with both vectors when any component differs by more than
/// `tolerance`.
pub fn assert_vec3_near(actual: Vec3, expected: Vec3, tolerance: f32) {
    assert!(
        actual.abs_diff_eq(expected, tolerance),
        "expected {expected:?}, got {actual:?} (tolerance {tolerance})"
    );
}

/// Runs an rspec suite serially so shared world state is touched by one
/// example at a time.
pub fn run_serial<T>(suite: &Suite<T>)
where
    T: Clone + Send + Sync + std::fmt::Debug,
{
    let logger = Arc::new(Logger::new(std::io::stdout()));
    let config = ConfigurationBuilder::default()
        .parallel(false)
        .exit_on_failure(true)
        .build()
        .unwrap_or_else(|e| panic!("rspec configuration failed: {e}"));
    Runner::new(config, vec![logger]).run(suite);
}
