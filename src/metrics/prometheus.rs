//! Prometheus metrics definitions and HTTP server

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    TEXT_FORMAT,
};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metric kind label for the only controller this operator runs
pub const KIND: &str = "EtherealPod";

/// Operator metrics, registered on an explicit registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    /// Total number of reconciliations
    pub reconciliations: CounterVec,

    /// Total number of reconciliation errors
    pub reconciliation_errors: CounterVec,

    /// Reconciliation duration histogram
    pub reconcile_duration: HistogramVec,

    /// Pods created for EtherealPods
    pub instances_created: CounterVec,

    /// Pods deleted, by reason (terminal, surplus)
    pub instances_deleted: CounterVec,

    /// Swallowed delete/status failures, by operation
    pub best_effort_failures: CounterVec,

    /// Operator health (1 = healthy, 0 = unhealthy)
    pub operator_health: Gauge,
}

impl Metrics {
    /// Create all metrics and register them on `registry`
    pub fn new(registry: Registry) -> prometheus::Result<Self> {
        let reconciliations = CounterVec::new(
            Opts::new(
                "ethereal_pod_operator_reconciliations_total",
                "Total number of reconciliations",
            ),
            &["kind"],
        )?;
        let reconciliation_errors = CounterVec::new(
            Opts::new(
                "ethereal_pod_operator_reconciliation_errors_total",
                "Total number of reconciliation errors",
            ),
            &["kind"],
        )?;
        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                "ethereal_pod_operator_reconcile_duration_seconds",
                "Duration of reconciliations in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["kind"],
        )?;
        let instances_created = CounterVec::new(
            Opts::new(
                "ethereal_pod_operator_instances_created_total",
                "Total number of Pods created",
            ),
            &["namespace"],
        )?;
        let instances_deleted = CounterVec::new(
            Opts::new(
                "ethereal_pod_operator_instances_deleted_total",
                "Total number of Pods deleted by reason",
            ),
            &["namespace", "reason"],
        )?;
        let best_effort_failures = CounterVec::new(
            Opts::new(
                "ethereal_pod_operator_best_effort_failures_total",
                "Failed delete or status operations left for the next pass",
            ),
            &["operation"],
        )?;
        let operator_health = Gauge::new(
            "ethereal_pod_operator_health",
            "Operator health status (1 = healthy, 0 = unhealthy)",
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(reconciliation_errors.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(instances_created.clone()))?;
        registry.register(Box::new(instances_deleted.clone()))?;
        registry.register(Box::new(best_effort_failures.clone()))?;
        registry.register(Box::new(operator_health.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            reconciliation_errors,
            reconcile_duration,
            instances_created,
            instances_deleted,
            best_effort_failures,
            operator_health,
        })
    }

    /// Registry holding every metric of this instance
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Start the metrics HTTP server
pub async fn serve(port: u16, metrics: Metrics) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    // Set initial health
    metrics.operator_health.set(1.0);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let registry = metrics.registry().clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let registry = registry.clone();
                async move { handle_request(req, &registry) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {}", e);
            }
        });
    }
}

/// Handle HTTP requests
fn handle_request(
    req: Request<hyper::body::Incoming>,
    registry: &Registry,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match req.uri().path() {
        "/metrics" => metrics_response(registry),
        "/healthz" | "/health" | "/readyz" | "/ready" => text_response(StatusCode::OK, "ok"),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}

/// Generate metrics response
fn metrics_response(registry: &Registry) -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics");
    }

    let mut response = Response::new(Full::new(Bytes::from(buffer)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_FORMAT));
    response
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}
