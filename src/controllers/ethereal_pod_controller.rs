//! EtherealPod controller
//!
//! Watches EtherealPod resources and their Pods and triggers reconciliation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument};

use crate::adapters::ParentKey;
use crate::controllers::Context;
use crate::crd::EtherealPod;
use crate::error::{Error, Result};
use crate::metrics::KIND;
use crate::reconcilers::ethereal_pod as ethereal_pod_reconciler;

/// Delay before revisiting a parent whose new Pod could not be published yet
const UNPUBLISHED_REQUEUE: Duration = Duration::from_secs(5);

/// Run the EtherealPod controller
pub async fn run(client: Client, context: Arc<Context>) {
    let (parents, pods): (Api<EtherealPod>, Api<Pod>) = match &context.config.watch_namespace {
        Some(namespace) => (
            Api::namespaced(client.clone(), namespace),
            Api::namespaced(client.clone(), namespace),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    // Verify CRD is installed
    if let Err(e) = parents.list(&ListParams::default().limit(1)).await {
        error!("EtherealPod CRD not installed: {}", e);
        return;
    }

    info!(
        namespace = context.config.watch_namespace.as_deref().unwrap_or("*"),
        "Starting EtherealPod controller"
    );

    let metrics = context.metrics.clone();
    Controller::new(parents, WatcherConfig::default())
        .owns(pods, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| {
            let metrics = metrics.clone();
            async move {
                match result {
                    Ok((obj, _action)) => {
                        info!(
                            name = %obj.name,
                            namespace = obj.namespace.as_deref().unwrap_or("default"),
                            "Reconciled EtherealPod"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Reconciliation error");
                        metrics
                            .reconciliation_errors
                            .with_label_values(&[KIND])
                            .inc();
                    }
                }
            }
        })
        .await;
}

/// Main reconciliation function
#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<EtherealPod>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = ctx
        .metrics
        .reconcile_duration
        .with_label_values(&[KIND])
        .start_timer();
    ctx.metrics.reconciliations.with_label_values(&[KIND]).inc();

    // Only the key is taken from the event; state is re-read from the store
    let key = ParentKey::from_parent(&obj);
    let outcome = ethereal_pod_reconciler::reconcile_with_deadline(
        ctx.store.as_ref(),
        &ctx.metrics,
        &key,
        ctx.config.reconcile_timeout,
    )
    .await?;

    if outcome.requeue() {
        return Ok(Action::requeue(UNPUBLISHED_REQUEUE));
    }
    Ok(Action::await_change())
}

/// Error policy for the controller
fn error_policy(obj: Arc<EtherealPod>, error: &Error, _ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    error!(
        name = %name,
        error = %error,
        "Reconciliation failed, scheduling retry"
    );

    Action::requeue(requeue_after(error))
}

/// Backoff by error type
fn requeue_after(error: &Error) -> Duration {
    match error {
        Error::Kube(_) | Error::Store(_) | Error::Timeout(_) => Duration::from_secs(30),
        Error::Config(_) | Error::MissingObjectKey(_) => Duration::from_secs(300),
        _ => Duration::from_secs(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_after_by_error_type() {
        assert_eq!(
            requeue_after(&Error::store("connection reset")),
            Duration::from_secs(30)
        );
        assert_eq!(
            requeue_after(&Error::Timeout(Duration::from_secs(1))),
            Duration::from_secs(30)
        );
        assert_eq!(
            requeue_after(&Error::MissingObjectKey("metadata.uid")),
            Duration::from_secs(300)
        );
    }
}
