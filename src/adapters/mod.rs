//! Adapters between the Kubernetes API and the reconciler's view of the world

mod managed_instance;
mod pod_store;

pub use managed_instance::*;
pub use pod_store::*;
