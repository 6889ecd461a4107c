/*!
 * Orchestrator Builder
 * Builder pattern for Orchestrator construction
 */

use super::executor::Orchestrator;
use crate::config::OrchestratorConfig;
use crate::core::errors::Result;
use crate::monitoring::{ProcessProbe, ProcfsProbe};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for Orchestrator
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    probe: Option<Arc<dyn ProcessProbe>>,
}

impl OrchestratorBuilder {
    /// Create a new Orchestrator builder with default settings
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            probe: None,
        }
    }

    /// Replace all settings at once
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_sample_interval(interval);
        self
    }

    /// Timeout for workers that do not set their own
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_default_timeout(timeout);
        self
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.config = self.config.with_termination_grace(grace);
        self
    }

    /// Use a custom metric source instead of `/proc`
    pub fn with_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Validate settings and build the Orchestrator
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(ProcfsProbe::new()) as Arc<dyn ProcessProbe>);

        debug!(
            sample_interval_ms = self.config.sample_interval_ms,
            default_timeout_ms = self.config.default_timeout_ms,
            "Orchestrator configured"
        );

        Ok(Orchestrator::from_parts(self.config, probe))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
