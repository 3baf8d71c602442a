//! In-memory store and fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use k8s_openapi::api::core::v1::{
    Container, ContainerStatus, Pod, PodSpec, PodStatus, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
use prometheus::Registry;

use ethereal_pod_operator::adapters::{ParentKey, PodStore};
use ethereal_pod_operator::crd::{EtherealPod, EtherealPodSpec, EtherealPodStatus};
use ethereal_pod_operator::metrics::Metrics;
use ethereal_pod_operator::{Error, Result};

pub const NAMESPACE: &str = "apps";
pub const PARENT_NAME: &str = "web";
pub const PARENT_UID: &str = "uid-web";

/// Mutations issued against the store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub creates: Vec<String>,
    pub deletes: Vec<String>,
    pub status_updates: Vec<EtherealPodStatus>,
}

impl Calls {
    pub fn mutations(&self) -> usize {
        self.creates.len() + self.deletes.len() + self.status_updates.len()
    }
}

/// Injected failures
#[derive(Clone, Copy, Debug, Default)]
pub struct Faults {
    pub get: bool,
    pub list: bool,
    pub create: bool,
    pub delete: bool,
    pub status: bool,
    /// Bump the parent's resourceVersion right after it is read
    pub race_on_get: bool,
    pub list_delay: Option<Duration>,
}

#[derive(Default)]
struct State {
    parents: HashMap<ParentKey, EtherealPod>,
    pods: Vec<Pod>,
    calls: Calls,
    faults: Faults,
    next_id: u32,
}

/// [`PodStore`] holding objects in memory and recording every mutation
///
/// Deletes take effect immediately and status writes are checked against
/// the stored resourceVersion.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: EtherealPod) -> Self {
        let store = Self::new();
        store.insert_parent(parent);
        store
    }

    pub fn insert_parent(&self, parent: EtherealPod) {
        let key = ParentKey::from_parent(&parent);
        self.state.lock().unwrap().parents.insert(key, parent);
    }

    /// Store `parent` under `key` regardless of its own metadata
    pub fn insert_parent_at(&self, key: ParentKey, parent: EtherealPod) {
        self.state.lock().unwrap().parents.insert(key, parent);
    }

    pub fn remove_parent(&self, key: &ParentKey) {
        self.state.lock().unwrap().parents.remove(key);
    }

    pub fn insert_pod(&self, pod: Pod) {
        self.state.lock().unwrap().pods.push(pod);
    }

    /// Reverse the listing order, as an unsorted API might
    pub fn reverse_pods(&self) {
        self.state.lock().unwrap().pods.reverse();
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state.lock().unwrap().faults = faults;
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls = Calls::default();
    }

    pub fn pod_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .pods
            .iter()
            .filter_map(|p| p.metadata.name.clone())
            .collect()
    }

    pub fn parent(&self, key: &ParentKey) -> Option<EtherealPod> {
        self.state.lock().unwrap().parents.get(key).cloned()
    }

    pub fn set_phase(&self, name: &str, phase: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(pod) = state
            .pods
            .iter_mut()
            .find(|p| p.metadata.name.as_deref() == Some(name))
        {
            pod.status.get_or_insert_with(PodStatus::default).phase = Some(phase.to_string());
        }
    }
}

fn next_version(meta: &ObjectMeta) -> String {
    let current: u64 = meta
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    (current + 1).to_string()
}

#[async_trait]
impl PodStore for MemoryStore {
    async fn get_parent(&self, key: &ParentKey) -> Result<Option<EtherealPod>> {
        let mut state = self.state.lock().unwrap();
        if state.faults.get {
            return Err(Error::store("injected get failure"));
        }
        let parent = state.parents.get(key).cloned();
        if state.faults.race_on_get {
            if let Some(stored) = state.parents.get_mut(key) {
                stored.metadata.resource_version = Some(next_version(&stored.metadata));
            }
        }
        Ok(parent)
    }

    async fn list_children(&self, namespace: &str) -> Result<Vec<Pod>> {
        let delay = self.state.lock().unwrap().faults.list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.faults.list {
            return Err(Error::store("injected list failure"));
        }
        Ok(state
            .pods
            .iter()
            .filter(|p| p.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn create_child(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let mut state = self.state.lock().unwrap();
        if state.faults.create {
            return Err(Error::store("injected create failure"));
        }

        state.next_id += 1;
        let id = state.next_id;
        let prefix = pod.metadata.generate_name.clone().unwrap_or_default();

        let mut created = pod.clone();
        created.metadata.name = Some(format!("{}{:05}", prefix, id));
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.uid = Some(format!("pod-uid-{}", id));
        created.metadata.creation_timestamp = Some(Time(
            Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(id as i64),
        ));
        created.status = Some(PodStatus {
            phase: Some("Pending".to_string()),
            ..PodStatus::default()
        });

        state
            .calls
            .creates
            .push(created.metadata.name.clone().unwrap_or_default());
        state.pods.push(created.clone());
        Ok(created)
    }

    async fn delete_child(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.deletes.push(name.to_string());
        if state.faults.delete {
            return Err(Error::store("injected delete failure"));
        }
        state.pods.retain(|p| {
            !(p.metadata.namespace.as_deref() == Some(namespace)
                && p.metadata.name.as_deref() == Some(name))
        });
        Ok(())
    }

    async fn update_parent_status(
        &self,
        parent: &EtherealPod,
        status: &EtherealPodStatus,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.status_updates.push(status.clone());
        if state.faults.status {
            return Err(Error::store("injected status failure"));
        }

        let key = ParentKey::from_parent(parent);
        let stored = state
            .parents
            .get_mut(&key)
            .ok_or_else(|| Error::store("parent not found"))?;
        if stored.metadata.resource_version != parent.metadata.resource_version {
            return Err(Error::store("conflict: resourceVersion changed"));
        }

        stored.status = Some(status.clone());
        stored.metadata.resource_version = Some(next_version(&stored.metadata));
        Ok(())
    }
}

pub fn metrics() -> Metrics {
    Metrics::new(Registry::new()).unwrap()
}

pub fn parent_key() -> ParentKey {
    ParentKey::new(NAMESPACE, PARENT_NAME)
}

pub fn parent() -> EtherealPod {
    let mut parent = EtherealPod::new(
        PARENT_NAME,
        EtherealPodSpec {
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(BTreeMap::from([(
                        "app".to_string(),
                        PARENT_NAME.to_string(),
                    )])),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "app".to_string(),
                        image: Some("ghcr.io/sunday/grocery:1.0".to_string()),
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
        },
    );
    parent.metadata.namespace = Some(NAMESPACE.to_string());
    parent.metadata.uid = Some(PARENT_UID.to_string());
    parent.metadata.resource_version = Some("1".to_string());
    parent
}

/// A Pod controlled by `owner_uid`, created `minute` minutes into the day
pub fn owned_pod(name: &str, owner_uid: &str, phase: &str, minute: u32, restarts: &[i32]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            creation_timestamp: Some(Time(
                Utc.with_ymd_and_hms(2026, 5, 1, 0, minute, 0).unwrap(),
            )),
            owner_references: Some(vec![OwnerReference {
                api_version: "sunday.example.com/v1".to_string(),
                kind: "EtherealPod".to_string(),
                name: PARENT_NAME.to_string(),
                uid: owner_uid.to_string(),
                controller: Some(true),
                block_owner_deletion: Some(true),
            }]),
            ..ObjectMeta::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(
                restarts
                    .iter()
                    .enumerate()
                    .map(|(i, count)| ContainerStatus {
                        name: format!("c{}", i),
                        restart_count: *count,
                        ..ContainerStatus::default()
                    })
                    .collect(),
            ),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

pub fn child(name: &str, phase: &str, minute: u32) -> Pod {
    owned_pod(name, PARENT_UID, phase, minute, &[])
}
