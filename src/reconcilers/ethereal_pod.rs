//! EtherealPod reconciler
//!
//! One stateless pass per parent key: re-read the parent, enumerate its
//! Pods, converge them, publish status. Store failures on the critical path
//! (get, list, create) are returned unchanged so the controller can back off
//! and retry; nothing is retried here.

use std::time::Duration;

use kube::ResourceExt;
use tracing::{debug, info};

use crate::adapters::{ParentKey, PodStore};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::reconcilers::{children, convergence, status, status::StatusOutcome};

/// Summary of one reconcile pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The parent existed when the pass started
    pub parent_found: bool,

    /// Name of the canonical Pod, if one is known
    pub canonical: Option<String>,

    pub created: bool,
    pub deleted: usize,
    pub failed_deletes: usize,
    pub status: StatusOutcome,
}

impl ReconcileOutcome {
    fn parent_gone() -> Self {
        Self {
            parent_found: false,
            canonical: None,
            created: false,
            deleted: 0,
            failed_deletes: 0,
            status: StatusOutcome::Skipped,
        }
    }

    /// Whether the pass left something that no watch event will re-trigger
    ///
    /// A Pod created without an observable name could not be published;
    /// every other gap is followed by a Pod or parent event.
    pub fn requeue(&self) -> bool {
        self.parent_found && self.canonical.is_none()
    }
}

/// Reconcile the EtherealPod identified by `key`
pub async fn reconcile<S>(store: &S, metrics: &Metrics, key: &ParentKey) -> Result<ReconcileOutcome>
where
    S: PodStore + ?Sized,
{
    let Some(parent) = store.get_parent(key).await? else {
        debug!(key = %key, "EtherealPod no longer exists, nothing to do");
        return Ok(ReconcileOutcome::parent_gone());
    };

    let parent_uid = parent
        .uid()
        .ok_or(Error::MissingObjectKey("metadata.uid"))?;

    let owned = children::enumerate(store, &key.namespace, &parent_uid).await?;
    debug!(
        key = %key,
        live = owned.live.len(),
        terminal = owned.terminal.len(),
        terminating = owned.terminating.len(),
        "Enumerated owned Pods"
    );

    let converged = convergence::converge(store, metrics, &parent, &key.namespace, &owned).await?;
    let status = status::report(store, metrics, &parent, converged.canonical.as_ref()).await;

    let outcome = ReconcileOutcome {
        parent_found: true,
        canonical: converged.canonical.map(|instance| instance.name),
        created: converged.created,
        deleted: converged.deleted,
        failed_deletes: converged.failed_deletes,
        status,
    };

    if outcome.created || outcome.deleted > 0 || outcome.status == StatusOutcome::Updated {
        info!(
            key = %key,
            pod = outcome.canonical.as_deref().unwrap_or_default(),
            created = outcome.created,
            deleted = outcome.deleted,
            "Converged EtherealPod"
        );
    }

    Ok(outcome)
}

/// [`reconcile`] bounded by `deadline`; in-flight store calls are dropped on expiry
pub async fn reconcile_with_deadline<S>(
    store: &S,
    metrics: &Metrics,
    key: &ParentKey,
    deadline: Duration,
) -> Result<ReconcileOutcome>
where
    S: PodStore + ?Sized,
{
    tokio::time::timeout(deadline, reconcile(store, metrics, key))
        .await
        .map_err(|_| Error::Timeout(deadline))?
}
