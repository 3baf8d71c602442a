//! EtherealPod Custom Resource Definition

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// EtherealPod resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "sunday.example.com",
    version = "v1",
    kind = "EtherealPod",
    plural = "etherealpods",
    singular = "etherealpod",
    shortname = "ep",
    namespaced,
    status = "EtherealPodStatus",
    printcolumn = r#"{"name": "Pod", "type": "string", "jsonPath": ".status.podName"}"#,
    printcolumn = r#"{"name": "Restarts", "type": "integer", "jsonPath": ".status.restartCount"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EtherealPodSpec {
    /// Template of the Pod kept alive for this resource
    pub template: PodTemplateSpec,
}

/// EtherealPod status
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtherealPodStatus {
    /// Name of the Pod currently managed for this resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,

    /// Sum of restart counts across all containers of that Pod
    #[serde(default)]
    pub restart_count: i32,
}
