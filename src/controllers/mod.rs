//! Kubernetes controller for the EtherealPod CRD
//!
//! This module wires the reconciler to kube-runtime's `Controller`, which
//! watches EtherealPods and the Pods they own and triggers reconciliation.

mod ethereal_pod_controller;

pub use ethereal_pod_controller::run as run_ethereal_pod_controller;

use std::sync::Arc;

use kube::Client;

use crate::adapters::{KubeStore, PodStore};
use crate::config::OperatorConfig;
use crate::metrics::Metrics;

/// Shared context for the controller
pub struct Context {
    /// Store the reconciler reads and mutates
    pub store: Arc<dyn PodStore>,

    /// Metrics registered on the operator's registry
    pub metrics: Metrics,

    /// Operator configuration
    pub config: OperatorConfig,
}

impl Context {
    /// Create a context backed by the Kubernetes API
    pub fn new(client: Client, metrics: Metrics, config: OperatorConfig) -> Self {
        Self::with_store(Arc::new(KubeStore::new(client)), metrics, config)
    }

    /// Create a context around any store
    pub fn with_store(store: Arc<dyn PodStore>, metrics: Metrics, config: OperatorConfig) -> Self {
        Self {
            store,
            metrics,
            config,
        }
    }
}
