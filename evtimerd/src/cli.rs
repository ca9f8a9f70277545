//! Command-line parsing for the host daemon
//!
//! Flags override whatever the `--config` file sets, regardless of the
//! order they appear in.

use crate::runtime::{HostRuntimeConfig, HostRuntimeError};
use sim_kernel::{FaultPlan, TimingFault};
use std::path::{Path, PathBuf};

/// What the command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Run(CliArgs),
    Help,
}

/// Parsed command-line arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub consumers: Option<usize>,
    pub period: Option<u64>,
    pub bits: Option<u32>,
    pub start: Option<u32>,
    pub iterations: Option<u64>,
    pub arm_latency: Option<u32>,
    pub dispatch_cost: Option<u32>,
}

impl CliArgs {
    /// Parses `args` (including the program name at index 0)
    pub fn parse(args: &[String]) -> Result<CliCommand, String> {
        let mut parsed = CliArgs::default();
        let mut i = 1;

        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--help" | "-h" => return Ok(CliCommand::Help),
                "--config" | "-c" => {
                    parsed.config = Some(PathBuf::from(value(args, &mut i, flag)?));
                }
                "--consumers" => parsed.consumers = Some(number(args, &mut i, flag)?),
                "--period" => parsed.period = Some(number(args, &mut i, flag)?),
                "--bits" => parsed.bits = Some(number(args, &mut i, flag)?),
                "--start" => parsed.start = Some(number(args, &mut i, flag)?),
                "--iterations" | "-n" => parsed.iterations = Some(number(args, &mut i, flag)?),
                "--arm-latency" => parsed.arm_latency = Some(number(args, &mut i, flag)?),
                "--dispatch-cost" => parsed.dispatch_cost = Some(number(args, &mut i, flag)?),
                other => return Err(format!("Unknown option: {}", other)),
            }
            i += 1;
        }

        Ok(CliCommand::Run(parsed))
    }

    /// Builds the runtime configuration: file first, then flags
    pub fn into_config(self) -> Result<HostRuntimeConfig, HostRuntimeError> {
        let mut config = match &self.config {
            Some(path) => HostRuntimeConfig::load(Path::new(path))?,
            None => HostRuntimeConfig::default(),
        };

        let scenario = &mut config.scenario;
        if let Some(consumers) = self.consumers {
            scenario.consumers = consumers;
        }
        if let Some(period) = self.period {
            scenario.period_ticks = period;
        }
        if let Some(bits) = self.bits {
            scenario.counter_bits = bits;
        }
        if let Some(start) = self.start {
            scenario.start_tick = start;
        }
        if self.arm_latency.is_some() || self.dispatch_cost.is_some() {
            scenario.faults = override_faults(&scenario.faults, self.arm_latency, self.dispatch_cost);
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        Ok(config)
    }
}

/// Replaces the arm latency and dispatch cost of a plan, keeping other faults
fn override_faults(plan: &FaultPlan, arm_latency: Option<u32>, dispatch_cost: Option<u32>) -> FaultPlan {
    let mut merged = FaultPlan::new();
    for fault in plan.timing_faults() {
        let replaced = match fault {
            TimingFault::ArmLatency { .. } => arm_latency.is_some(),
            TimingFault::DispatchCost { .. } => dispatch_cost.is_some(),
            TimingFault::ReadCost { .. } => false,
        };
        if !replaced {
            merged = merged.with_timing_fault(*fault);
        }
    }
    if let Some(ticks) = arm_latency {
        merged = merged.with_timing_fault(TimingFault::ArmLatency { ticks });
    }
    if let Some(ticks) = dispatch_cost {
        merged = merged.with_timing_fault(TimingFault::DispatchCost { ticks });
    }
    merged
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn number<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> Result<T, String> {
    let raw = value(args, i, flag)?;
    raw.parse()
        .map_err(|_| format!("Invalid {} value: {}", flag.trim_start_matches('-'), raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("evtimerd")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn parse(list: &[&str]) -> CliArgs {
        match CliArgs::parse(&args(list)).unwrap() {
            CliCommand::Run(parsed) => parsed,
            CliCommand::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_no_args_is_default() {
        let config = parse(&[]).into_config().unwrap();
        assert_eq!(config, HostRuntimeConfig::default());
    }

    #[test]
    fn test_flags_override() {
        let config = parse(&["--consumers", "4", "--period", "60", "--bits", "16", "-n", "10"])
            .into_config()
            .unwrap();
        assert_eq!(config.scenario.consumers, 4);
        assert_eq!(config.scenario.period_ticks, 60);
        assert_eq!(config.scenario.counter_bits, 16);
        assert_eq!(config.iterations, 10);
    }

    #[test]
    fn test_fault_flags_replace_same_kind() {
        let base = FaultPlan::new()
            .with_timing_fault(TimingFault::ArmLatency { ticks: 9 })
            .with_timing_fault(TimingFault::ReadCost { ticks: 1 });
        let merged = override_faults(&base, Some(2), Some(3));
        assert_eq!(merged.arm_latency(), 2);
        assert_eq!(merged.dispatch_cost(), 3);
        assert_eq!(merged.read_cost(), 1);
    }

    #[test]
    fn test_help() {
        assert_eq!(CliArgs::parse(&args(&["--period", "5", "-h"])), Ok(CliCommand::Help));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            CliArgs::parse(&args(&["--period"])),
            Err("Missing value for --period".to_string())
        );
        assert_eq!(
            CliArgs::parse(&args(&["--bits", "wide"])),
            Err("Invalid bits value: wide".to_string())
        );
        assert_eq!(
            CliArgs::parse(&args(&["--verbose"])),
            Err("Unknown option: --verbose".to_string())
        );
    }
}
