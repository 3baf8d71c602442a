//! Custom Resource Definitions for the EtherealPod Operator

mod ethereal_pod;

pub use ethereal_pod::*;

use kube::CustomResourceExt;

/// Generate all CRD YAML manifests
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![serde_yaml::to_string(&EtherealPod::crd())?])
}
