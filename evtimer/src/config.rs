//! Event timer configuration

use crate::error::EvtimerError;
use serde::{Deserialize, Serialize};

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvtimerConfig {
    /// Audit log capacity (0 disables the log)
    pub audit_capacity: usize,
    /// Optional cap on delays and periods, tighter than the counter allows
    pub max_delay_ticks: Option<u64>,
}

impl Default for EvtimerConfig {
    fn default() -> Self {
        Self {
            audit_capacity: 256,
            max_delay_ticks: None,
        }
    }
}

impl EvtimerConfig {
    /// Checks the configuration on its own
    ///
    /// Limits that depend on the counter width are checked when the
    /// scheduler is built.
    pub fn validate(&self) -> Result<(), EvtimerError> {
        if self.max_delay_ticks == Some(0) {
            return Err(EvtimerError::InvalidConfig(
                "max_delay_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
