//! Operator configuration loaded from the process environment

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default deadline for a single reconcile pass
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(30);

const METRICS_PORT_VAR: &str = "METRICS_PORT";
const WATCH_NAMESPACE_VAR: &str = "WATCH_NAMESPACE";
const RECONCILE_TIMEOUT_VAR: &str = "RECONCILE_TIMEOUT_SECS";

/// Runtime settings for the operator process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Port serving `/metrics` and the health endpoints
    pub metrics_port: u16,

    /// Namespace to watch; `None` watches the whole cluster
    pub watch_namespace: Option<String>,

    /// Deadline applied to every reconcile pass
    pub reconcile_timeout: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            watch_namespace: None,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = vars.get(METRICS_PORT_VAR) {
            config.metrics_port = port.parse().map_err(|e| {
                Error::config(format!("Invalid {} '{}': {}", METRICS_PORT_VAR, port, e))
            })?;
        }

        config.watch_namespace = vars
            .get(WATCH_NAMESPACE_VAR)
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        if let Some(secs) = vars.get(RECONCILE_TIMEOUT_VAR) {
            let secs: u64 = secs.parse().map_err(|e| {
                Error::config(format!("Invalid {} '{}': {}", RECONCILE_TIMEOUT_VAR, secs, e))
            })?;
            if secs == 0 {
                return Err(Error::config(format!(
                    "{} must be greater than zero",
                    RECONCILE_TIMEOUT_VAR
                )));
            }
            config.reconcile_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
