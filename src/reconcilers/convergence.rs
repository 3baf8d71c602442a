//! Convergence of an EtherealPod's owned Pods to exactly one live Pod
//!
//! Each pass, in order:
//! 1. Every terminal Pod is deleted, even when it is the only one.
//! 2. Live Pods are counted by phase; terminal Pods never count, whether or
//!    not their deletion has completed.
//! 3. No live Pod: one is created from the template and becomes canonical.
//! 4. One live Pod: it is canonical, nothing is mutated.
//! 5. Several live Pods: the earliest created (name breaks ties) is kept and
//!    the rest are deleted.
//!
//! A Pod the platform is already removing still counts by its phase, but is
//! never deleted again and loses the canonical pick to any healthy Pod.
//!
//! Deletes are best effort. A failed delete is logged and retried by the
//! next pass; only a failed create fails the pass.

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info, warn};

use crate::adapters::{build_pod, ManagedInstance, PodStore};
use crate::crd::EtherealPod;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::reconcilers::children::OwnedChildren;

/// Why a Pod is deleted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteReason {
    /// Succeeded or Failed
    Terminal,
    /// A live duplicate of the canonical Pod
    Surplus,
}

impl DeleteReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteReason::Terminal => "terminal",
            DeleteReason::Surplus => "surplus",
        }
    }
}

/// Which Pod represents the EtherealPod after this pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Canonical {
    Existing(ManagedInstance),
    Create,
}

/// Actions decided for one pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvergencePlan {
    pub canonical: Canonical,
    pub deletes: Vec<(ManagedInstance, DeleteReason)>,
}

impl ConvergencePlan {
    /// Decide the actions for `children` without touching the store
    pub fn decide(children: &OwnedChildren) -> Self {
        let mut deletes: Vec<_> = children
            .terminal
            .iter()
            .cloned()
            .map(|instance| (instance, DeleteReason::Terminal))
            .collect();

        let mut live = children.live.clone();
        live.sort_by(|a, b| a.creation_order(b));

        let mut live = live.into_iter();
        let canonical = match live.next() {
            Some(first) => Canonical::Existing(first),
            None => Canonical::Create,
        };
        deletes.extend(
            live.filter(|instance| !instance.terminating)
                .map(|instance| (instance, DeleteReason::Surplus)),
        );

        Self { canonical, deletes }
    }

    /// Whether executing this plan would call the store
    pub fn is_noop(&self) -> bool {
        self.deletes.is_empty() && matches!(self.canonical, Canonical::Existing(_))
    }
}

/// Result of executing a plan
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvergenceOutcome {
    /// `None` only when a created Pod came back without a name
    pub canonical: Option<ManagedInstance>,
    pub created: bool,
    pub deleted: usize,
    pub failed_deletes: usize,
}

/// Converge `parent`'s owned Pods in `namespace`, returning the canonical Pod
pub async fn converge<S>(
    store: &S,
    metrics: &Metrics,
    parent: &EtherealPod,
    namespace: &str,
    children: &OwnedChildren,
) -> Result<ConvergenceOutcome>
where
    S: PodStore + ?Sized,
{
    let plan = ConvergencePlan::decide(children);
    let mut outcome = ConvergenceOutcome::default();

    if plan.is_noop() {
        debug!(namespace = %namespace, "Owned Pods already converged");
    }

    // Terminal cleanup first, independent of what else exists
    for (instance, reason) in plan.deletes.iter().filter(|(_, r)| *r == DeleteReason::Terminal) {
        record_delete(&mut outcome, delete_instance(store, metrics, instance, *reason).await);
    }

    match plan.canonical {
        Canonical::Create => {
            let created = create_instance(store, metrics, parent, namespace).await?;
            outcome.created = true;
            outcome.canonical = ManagedInstance::from_pod(&created);
        }
        Canonical::Existing(instance) => {
            outcome.canonical = Some(instance);
        }
    }

    for (instance, reason) in plan.deletes.iter().filter(|(_, r)| *r == DeleteReason::Surplus) {
        record_delete(&mut outcome, delete_instance(store, metrics, instance, *reason).await);
    }

    Ok(outcome)
}

fn record_delete(outcome: &mut ConvergenceOutcome, deleted: bool) {
    if deleted {
        outcome.deleted += 1;
    } else {
        outcome.failed_deletes += 1;
    }
}

async fn create_instance<S>(
    store: &S,
    metrics: &Metrics,
    parent: &EtherealPod,
    namespace: &str,
) -> Result<Pod>
where
    S: PodStore + ?Sized,
{
    let pod = build_pod(parent, namespace)?;
    let created = store.create_child(namespace, &pod).await?;

    metrics
        .instances_created
        .with_label_values(&[namespace])
        .inc();
    info!(
        pod = created.metadata.name.as_deref().unwrap_or_default(),
        namespace = %namespace,
        "Created Pod"
    );

    Ok(created)
}

/// Delete one Pod, swallowing the failure; returns whether it succeeded
async fn delete_instance<S>(
    store: &S,
    metrics: &Metrics,
    instance: &ManagedInstance,
    reason: DeleteReason,
) -> bool
where
    S: PodStore + ?Sized,
{
    match store.delete_child(&instance.namespace, &instance.name).await {
        Ok(()) => {
            metrics
                .instances_deleted
                .with_label_values(&[&instance.namespace, reason.as_str()])
                .inc();
            info!(
                pod = %instance.name,
                phase = %instance.phase,
                reason = reason.as_str(),
                "Deleted Pod"
            );
            true
        }
        Err(e) => {
            metrics
                .best_effort_failures
                .with_label_values(&["delete"])
                .inc();
            warn!(
                pod = %instance.name,
                reason = reason.as_str(),
                error = %e,
                "Failed to delete Pod, will retry on next reconcile"
            );
            false
        }
    }
}
