//! Publishing the canonical Pod's health onto the EtherealPod status

use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::adapters::{ManagedInstance, PodStore};
use crate::crd::{EtherealPod, EtherealPodStatus};
use crate::metrics::Metrics;

/// What the status reporter did this pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusOutcome {
    /// No canonical Pod to report; status left as it was
    Skipped,
    /// Status already matched
    Unchanged,
    Updated,
    /// Write failed; the next pass will try again
    Failed,
}

/// Sum of the restart counters of every container of `instance`
pub fn aggregate_restarts(instance: &ManagedInstance) -> i32 {
    instance
        .restart_counts
        .iter()
        .fold(0i32, |total, count| total.saturating_add(*count))
}

/// Status describing `instance`
pub fn status_for(instance: &ManagedInstance) -> EtherealPodStatus {
    EtherealPodStatus {
        pod_name: Some(instance.name.clone()),
        restart_count: aggregate_restarts(instance),
    }
}

/// Write the status for `canonical` onto `parent` unless it is already there
pub async fn report<S>(
    store: &S,
    metrics: &Metrics,
    parent: &EtherealPod,
    canonical: Option<&ManagedInstance>,
) -> StatusOutcome
where
    S: PodStore + ?Sized,
{
    let Some(instance) = canonical else {
        debug!("No canonical Pod observable yet, leaving status unchanged");
        return StatusOutcome::Skipped;
    };

    let desired = status_for(instance);
    if parent.status.as_ref() == Some(&desired) {
        return StatusOutcome::Unchanged;
    }

    match store.update_parent_status(parent, &desired).await {
        Ok(()) => {
            info!(
                name = %parent.name_any(),
                pod = %instance.name,
                restart_count = desired.restart_count,
                "Updated EtherealPod status"
            );
            StatusOutcome::Updated
        }
        Err(e) => {
            metrics
                .best_effort_failures
                .with_label_values(&["status"])
                .inc();
            warn!(
                name = %parent.name_any(),
                error = %e,
                "Failed to update EtherealPod status, will retry on next reconcile"
            );
            StatusOutcome::Failed
        }
    }
}
