/*!
 * Core Types
 * Common types used across the orchestrator
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// OS process ID type
pub type Pid = u32;

/// Identifier of one worker configuration within a batch
pub type ConfigId = String;

/// How a batch of workers is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// All workers spawned up front, awaited together
    Parallel,
    /// Worker i+1 is spawned only after worker i terminated
    Sequential,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Sequential => "sequential",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
