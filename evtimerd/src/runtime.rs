//! # Host Runtime
//!
//! The loop that drives the scenario and writes the message stream.

use evtimer::EvtimerConfig;
use serde::{Deserialize, Serialize};
use sim_kernel::{ScenarioConfig, ScenarioError, UnderflowScenario};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Scenario error: {0}")]
    ScenarioError(#[from] ScenarioError),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Host runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostRuntimeConfig {
    pub scenario: ScenarioConfig,
    /// Message groups to print before exiting (0 = forever)
    pub iterations: u64,
    pub timer: EvtimerConfig,
}

impl HostRuntimeConfig {
    /// Parses a JSON configuration; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self, HostRuntimeError> {
        serde_json::from_str(text).map_err(|e| HostRuntimeError::ConfigError(e.to_string()))
    }

    /// Loads a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, HostRuntimeError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Host runtime
pub struct HostRuntime {
    config: HostRuntimeConfig,
    scenario: UnderflowScenario,
    /// Messages written so far
    messages: u64,
    /// Scenario steps run so far
    steps: u64,
}

impl HostRuntime {
    /// Creates a new host runtime
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        let scenario = UnderflowScenario::new(config.scenario.clone(), config.timer.clone())?;
        Ok(Self {
            config,
            scenario,
            messages: 0,
            steps: 0,
        })
    }

    /// Runs until the configured number of groups has been written
    ///
    /// With `iterations == 0` this only returns on error.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<(), HostRuntimeError> {
        let iterations = self.config.iterations;
        while iterations == 0 || self.groups() < iterations {
            self.step(out)?;
        }

        let stats = self.scenario.stats();
        info!(
            groups = self.groups(),
            steps = self.steps,
            wraps = self.scenario.source().wraps(),
            slipped_arms = stats.slipped_arms,
            dropped = self.scenario.dropped(),
            "run complete"
        );
        Ok(())
    }

    /// Advances to the next compare and writes what the consumers received
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<usize, HostRuntimeError> {
        let messages = self.scenario.step_messages()?;
        for message in &messages {
            writeln!(out, "{}", message)?;
        }
        out.flush()?;
        self.steps += 1;
        self.messages += messages.len() as u64;
        Ok(messages.len())
    }

    /// Complete groups written (one message from every consumer)
    pub fn groups(&self) -> u64 {
        self.messages / self.config.scenario.consumers as u64
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &HostRuntimeConfig {
        &self.config
    }

    pub fn scenario(&self) -> &UnderflowScenario {
        &self.scenario
    }
}
