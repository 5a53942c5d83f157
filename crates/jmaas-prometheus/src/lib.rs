//! Prometheus metrics for jmaas job orchestration.
//!
//! [`PrometheusMetrics`] is a [`jmaas_core::Subscribe`] implementation: register it with the orchestrator and it
//! turns job lifecycle events into metrics.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use jmaas_prometheus::{PrometheusMetrics, TextEncoder, Encoder};
//!
//! let metrics = Arc::new(PrometheusMetrics::new()?);
//! let orchestrator = Orchestrator::new(config, router, vec![metrics.clone()])?;
//!
//! // later, from your HTTP handler
//! let mut buf = Vec::new();
//! TextEncoder::new().encode(&metrics.gather(), &mut buf)?;
//! ```
//!
//! ## Metrics
//! - `jmaas_jobs_submitted_total` - Counter
//! - `jmaas_jobs_deduplicated_total` - Counter
//! - `jmaas_output_attached_total` - Counter
//! - `jmaas_jobs_completed_total{outcome}` - Counter
//! - `jmaas_cleanup_failures_total` - Counter
//! - `jmaas_job_duration_seconds` - Histogram
//! - `jmaas_jobs_registered` - Gauge
//! - `jmaas_jobs_started_total` - Counter
//!
//! ## HTTP Server
//! This crate does NOT provide an HTTP server for a `/metrics` endpoint; encode [`PrometheusMetrics::gather`] from
//! your application's own HTTP stack.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
