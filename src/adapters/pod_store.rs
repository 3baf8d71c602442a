//! Store operations against EtherealPods and the Pods they own

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{DeleteParams, ListParams, PostParams},
    Api, Client, ResourceExt,
};
use tracing::debug;

use crate::crd::{EtherealPod, EtherealPodStatus};
use crate::error::{Error, Result};

/// Field manager recorded on objects written by the operator
pub const FIELD_MANAGER: &str = "ethereal-pod-operator";

/// Namespaced name identifying one EtherealPod
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentKey {
    pub namespace: String,
    pub name: String,
}

impl ParentKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an observed EtherealPod, defaulting the namespace like the API server does
    pub fn from_parent(parent: &EtherealPod) -> Self {
        Self::new(
            parent.namespace().unwrap_or_else(|| "default".to_string()),
            parent.name_any(),
        )
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object store primitives the reconciler is built on
///
/// Implementations must not retry; failures are reported to the caller,
/// which decides whether they are fatal for the pass.
#[async_trait]
pub trait PodStore: Send + Sync {
    /// Fetch the parent, `None` when it no longer exists
    async fn get_parent(&self, key: &ParentKey) -> Result<Option<EtherealPod>>;

    /// List every Pod in `namespace`, owned or not
    async fn list_children(&self, namespace: &str) -> Result<Vec<Pod>>;

    /// Create a Pod and return it as stored (with its generated name)
    async fn create_child(&self, namespace: &str, pod: &Pod) -> Result<Pod>;

    /// Delete a Pod; deleting a Pod that is already gone succeeds
    async fn delete_child(&self, namespace: &str, name: &str) -> Result<()>;

    /// Replace the parent's status, guarded by the parent's resourceVersion
    async fn update_parent_status(
        &self,
        parent: &EtherealPod,
        status: &EtherealPodStatus,
    ) -> Result<()>;
}

/// [`PodStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn parents(&self, namespace: &str) -> Api<EtherealPod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl PodStore for KubeStore {
    async fn get_parent(&self, key: &ParentKey) -> Result<Option<EtherealPod>> {
        Ok(self.parents(&key.namespace).get_opt(&key.name).await?)
    }

    async fn list_children(&self, namespace: &str) -> Result<Vec<Pod>> {
        let pods = self.pods(namespace).list(&ListParams::default()).await?;
        Ok(pods.items)
    }

    async fn create_child(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        Ok(self.pods(namespace).create(&params, pod).await?)
    }

    async fn delete_child(&self, namespace: &str, name: &str) -> Result<()> {
        let result = self
            .pods(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ());
        ignore_not_found(name, result)
    }

    async fn update_parent_status(
        &self,
        parent: &EtherealPod,
        status: &EtherealPodStatus,
    ) -> Result<()> {
        let key = ParentKey::from_parent(parent);
        if parent.metadata.resource_version.is_none() {
            return Err(Error::MissingObjectKey("metadata.resourceVersion"));
        }

        let mut updated = parent.clone();
        updated.status = Some(status.clone());
        let data = serde_json::to_vec(&updated)?;

        self.parents(&key.namespace)
            .replace_status(&key.name, &PostParams::default(), data)
            .await?;
        Ok(())
    }
}

/// Treat a delete of an already removed object as success
fn ignore_not_found(name: &str, result: kube::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let err = Error::Kube(e);
            if err.is_not_found() {
                debug!(pod = %name, "Pod already deleted");
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}
