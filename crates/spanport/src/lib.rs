//! Spanport - trace span reporters for hosted trace backends.
//!
//! Takes finished in-process traces (a tree of spans produced by an
//! instrumentation layer), converts them into a backend wire schema and
//! delivers them:
//! - Cloud trace backend: label enrichment from the ambient environment,
//!   inline insert calls or an opt-in background batch queue
//! - Zipkin-compatible collector: direct JSON POST
//!
//! # Example
//!
//! ```rust,no_run
//! use spanport::{Reporter, SpanKind, SpanRecord, Trace, ZipkinReporter, ZipkinReporterConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let reporter = ZipkinReporter::new(
//!     ZipkinReporterConfig::new("checkout", "127.0.0.1", 9411),
//! );
//!
//! let root = SpanRecord::new("GET /checkout", 1).with_kind(SpanKind::Server);
//! let trace = Trace::new("0af7651916cd43dd8448eb211c80319c", vec![root]);
//!
//! // boolean outcome only: a lost trace never disturbs the host
//! let delivered = reporter.report(trace).await;
//! # let _ = delivered;
//! # }
//! ```

mod backtrace;
mod client;
mod context;
mod convert;
mod deliver;
mod error;
pub mod labels;
mod reporter;
mod span;

pub use backtrace::format_backtrace;
pub use client::{HttpTraceService, TraceService, TraceServiceConfig};
pub use context::AmbientContext;
pub use convert::{
    CLOUD_KIND_RPC_CLIENT, CLOUD_KIND_RPC_SERVER, CLOUD_KIND_UNSPECIFIED, CloudSpan, CloudTrace,
    LocalEndpoint, STACKTRACE_LABEL, TraceBatch, ZIPKIN_KIND_CLIENT, ZIPKIN_KIND_CONSUMER,
    ZIPKIN_KIND_PRODUCER, ZIPKIN_KIND_SERVER, ZipkinSpan, cloud_spans, zipkin_spans,
};
pub use deliver::{
    BatchConfig, BatchedDelivery, DeliveryChannel, SyncDelivery, ZipkinHttpDelivery,
};
pub use error::DeliveryError;
pub use labels::LabelEnricher;
pub use reporter::{
    CloudReporterConfig, CloudTraceReporter, Reporter, ZipkinReporter, ZipkinReporterConfig,
};
pub use span::{SpanKind, SpanRecord, StackFrame, Trace, TraceContext};
