//! Enumeration of the Pods owned by an EtherealPod

use k8s_openapi::api::core::v1::Pod;

use crate::adapters::{ManagedInstance, PodStore};
use crate::error::Result;

/// Owned Pods, partitioned by phase
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnedChildren {
    /// Succeeded or Failed
    pub terminal: Vec<ManagedInstance>,

    /// Pending, Running or Unknown, including Pods already being removed
    pub live: Vec<ManagedInstance>,

    /// Succeeded or Failed and already being removed by the platform
    pub terminating: Vec<ManagedInstance>,
}

impl OwnedChildren {
    /// Keep the Pods controlled by `parent_uid` and sort them by phase
    pub fn partition<'a>(parent_uid: &str, pods: impl IntoIterator<Item = &'a Pod>) -> Self {
        let mut children = Self::default();

        for instance in pods.into_iter().filter_map(ManagedInstance::from_pod) {
            if !instance.is_controlled_by(parent_uid) {
                continue;
            }
            match (instance.phase.is_terminal(), instance.terminating) {
                (true, true) => children.terminating.push(instance),
                (true, false) => children.terminal.push(instance),
                (false, _) => children.live.push(instance),
            }
        }

        children
    }
}

/// List the Pods in `namespace` and keep those controlled by `parent_uid`
pub async fn enumerate<S>(store: &S, namespace: &str, parent_uid: &str) -> Result<OwnedChildren>
where
    S: PodStore + ?Sized,
{
    let pods = store.list_children(namespace).await?;
    Ok(OwnedChildren::partition(parent_uid, &pods))
}
