//! Projection of an owned Pod into the fields the reconciler decides on

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::EtherealPod;
use crate::error::{Error, Result};

/// Pod lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl Phase {
    /// Parse `status.phase`; anything missing or unrecognised is `Unknown`
    pub fn from_pod_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => Phase::Pending,
            Some("Running") => Phase::Running,
            Some("Succeeded") => Phase::Succeeded,
            Some("Failed") => Phase::Failed,
            _ => Phase::Unknown,
        }
    }

    /// Terminal phases never progress further
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
            Phase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A Pod as seen by the reconciler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedInstance {
    pub name: String,
    pub namespace: String,

    /// UID of the controlling owner, if any
    pub controller_uid: Option<String>,

    pub phase: Phase,
    pub created_at: Option<DateTime<Utc>>,

    /// Restart counter of each container, in status order
    pub restart_counts: Vec<i32>,

    /// The platform is already removing this Pod
    pub terminating: bool,
}

impl ManagedInstance {
    /// Project a Pod; `None` when the Pod has no name yet
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.clone()?;
        let status = pod.status.as_ref();

        Some(Self {
            name,
            namespace: pod.namespace().unwrap_or_default(),
            controller_uid: pod
                .owner_references()
                .iter()
                .find(|owner| owner.controller == Some(true))
                .map(|owner| owner.uid.clone()),
            phase: Phase::from_pod_phase(status.and_then(|s| s.phase.as_deref())),
            created_at: pod.metadata.creation_timestamp.as_ref().map(|t| t.0),
            restart_counts: status
                .and_then(|s| s.container_statuses.as_ref())
                .map(|statuses| statuses.iter().map(|cs| cs.restart_count).collect())
                .unwrap_or_default(),
            terminating: pod.metadata.deletion_timestamp.is_some(),
        })
    }

    /// Whether `parent_uid` is this instance's controller
    pub fn is_controlled_by(&self, parent_uid: &str) -> bool {
        self.controller_uid.as_deref() == Some(parent_uid)
    }

    /// Canonical order: instances not being removed first, then earliest
    /// timestamp, instances without one last, ties broken by name
    pub fn creation_order(&self, other: &Self) -> Ordering {
        self.terminating
            .cmp(&other.terminating)
            .then_with(|| match (self.created_at, other.created_at) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Build the Pod for `parent` in `namespace` from its template, controlled by `parent`
pub fn build_pod(parent: &EtherealPod, namespace: &str) -> Result<Pod> {
    let owner = parent
        .controller_owner_ref(&())
        .ok_or(Error::MissingObjectKey("metadata.uid"))?;
    let template = &parent.spec.template;

    Ok(Pod {
        metadata: ObjectMeta {
            generate_name: Some(format!("{}-", parent.name_any())),
            namespace: Some(namespace.to_string()),
            labels: template.metadata.as_ref().and_then(|m| m.labels.clone()),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        spec: template.spec.clone(),
        ..Pod::default()
    })
}
