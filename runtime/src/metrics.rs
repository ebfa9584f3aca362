//! Prometheus metrics for dispatch observability.
//!
//! Every dispatch records:
//! - `courier_dispatch_total{kind, delivery}`: dispatches attempted
//! - `courier_dispatch_duration_seconds{kind, delivery}`: time to completion
//! - `courier_dispatch_orphaned_total{kind}`: dispatches no handler accepted
//! - `courier_dispatch_failed_total{kind}`: handler failures
//! - `courier_dispatch_cancelled_total{kind}`: cancelled async dispatches
//!
//! Recording goes through the `metrics` facade and costs nothing until a
//! recorder is installed, for example by [`MetricsServer::start`].
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new();
//! server.start()?;
//!
//! // Serve this from the application's scrape endpoint.
//! if let Some(rendered) = server.render() {
//!     println!("{rendered}");
//! }
//! # Ok(())
//! # }
//! ```

use courier_core::error::DispatchError;
use courier_core::handler::Delivery;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics exporter.
///
/// Installs the global recorder and renders the scrape payload. It does not
/// listen on a socket: the application serves [`render`](Self::render) from
/// its own scrape endpoint.
#[derive(Default)]
pub struct MetricsServer {
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server with no recorder installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe the dispatch metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// A recorder can only be installed once per process. When one is
    /// already installed this logs a warning, succeeds, and leaves
    /// [`render`](Self::render) returning `None`.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5,
                    1.0, 5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Describe every dispatch metric.
pub fn register_metrics() {
    describe_counter!(
        "courier_dispatch_total",
        "Total number of dispatched requests"
    );
    describe_histogram!(
        "courier_dispatch_duration_seconds",
        "Time taken to dispatch a request, handler execution included"
    );
    describe_counter!(
        "courier_dispatch_orphaned_total",
        "Total number of requests no handler accepted"
    );
    describe_counter!(
        "courier_dispatch_failed_total",
        "Total number of dispatches whose handler failed"
    );
    describe_counter!(
        "courier_dispatch_cancelled_total",
        "Total number of cancelled asynchronous dispatches"
    );
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a finished dispatch of a request of `kind`.
    pub fn record(
        kind: &'static str,
        delivery: Delivery,
        duration: Duration,
        error: Option<&DispatchError>,
    ) {
        let delivery = match delivery {
            Delivery::Sync => "sync",
            Delivery::Async => "async",
        };
        counter!("courier_dispatch_total", "kind" => kind, "delivery" => delivery).increment(1);
        histogram!("courier_dispatch_duration_seconds", "kind" => kind, "delivery" => delivery)
            .record(duration.as_secs_f64());

        match error {
            Some(DispatchError::OrphanedHandler { .. }) => {
                counter!("courier_dispatch_orphaned_total", "kind" => kind).increment(1);
            }
            Some(DispatchError::Cancelled) => {
                counter!("courier_dispatch_cancelled_total", "kind" => kind).increment(1);
            }
            Some(DispatchError::HandlerFailed(_) | DispatchError::ResultTypeMismatch { .. }) => {
                counter!("courier_dispatch_failed_total", "kind" => kind).increment(1);
            }
            None => {}
        }
    }
}
