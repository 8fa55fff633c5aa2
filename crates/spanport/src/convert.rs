//! Backend wire formats and the pure conversions that produce them.
//!
//! The two backends share nothing beyond the input type: each conversion
//! is an independent function over an immutable [`Trace`], so converting
//! the same trace twice yields identical output.

use crate::backtrace::format_backtrace;
use crate::context::AmbientContext;
use crate::span::{SpanKind, Trace};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Cloud schema span kinds.
pub const CLOUD_KIND_UNSPECIFIED: &str = "SPAN_KIND_UNSPECIFIED";
pub const CLOUD_KIND_RPC_CLIENT: &str = "RPC_CLIENT";
pub const CLOUD_KIND_RPC_SERVER: &str = "RPC_SERVER";

/// Label carrying the serialized call stack on cloud spans.
pub const STACKTRACE_LABEL: &str = "/stacktrace";

/// One span in the cloud backend's trace schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudSpan {
    pub name: String,
    #[serde(rename = "spanId")]
    pub span_id: u64,
    #[serde(rename = "parentSpanId", skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<u64>,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    pub labels: HashMap<String, String>,
    pub kind: &'static str,
}

/// Trace container addressed to the cloud backend, keyed by trace id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudTrace {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "traceId")]
    pub trace_id: String,
    pub spans: Vec<CloudSpan>,
}

/// Body of one insert call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceBatch {
    pub traces: Vec<CloudTrace>,
}

fn cloud_kind(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Client => CLOUD_KIND_RPC_CLIENT,
        SpanKind::Server => CLOUD_KIND_RPC_SERVER,
        _ => CLOUD_KIND_UNSPECIFIED,
    }
}

/// Map every span of the trace into the cloud schema.
///
/// Labels are copied verbatim; spans carrying a backtrace additionally get
/// the serialized stack under [`STACKTRACE_LABEL`].
pub fn cloud_spans(trace: &Trace) -> Vec<CloudSpan> {
    trace
        .spans()
        .iter()
        .map(|span| {
            let mut labels = span.labels.clone();
            if !span.backtrace.is_empty() {
                labels.insert(STACKTRACE_LABEL.to_string(), format_backtrace(&span.backtrace));
            }
            CloudSpan {
                name: span.name.clone(),
                span_id: span.span_id,
                parent_span_id: span.parent_span_id,
                start_time: span.start_time,
                end_time: span.end_time,
                labels,
                kind: cloud_kind(span.kind),
            }
        })
        .collect()
}

/// Collector schema span kinds.
pub const ZIPKIN_KIND_CLIENT: &str = "CLIENT";
pub const ZIPKIN_KIND_SERVER: &str = "SERVER";
pub const ZIPKIN_KIND_PRODUCER: &str = "PRODUCER";
pub const ZIPKIN_KIND_CONSUMER: &str = "CONSUMER";

/// The reporting service as the collector sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalEndpoint {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    pub ipv4: String,
    pub port: u16,
}

/// One span in the collector's JSON array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZipkinSpan {
    #[serde(rename = "traceId")]
    pub trace_id: String,
    pub name: String,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub id: String,
    /// Span start, epoch microseconds.
    pub timestamp: i64,
    /// Microseconds between start and end.
    pub duration: i64,
    pub debug: bool,
    pub shared: bool,
    #[serde(rename = "localEndpoint")]
    pub local_endpoint: LocalEndpoint,
    pub tags: HashMap<String, String>,
    /// Absent for kinds the collector schema has no value for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

fn zipkin_kind(kind: SpanKind) -> Option<&'static str> {
    match kind {
        SpanKind::Client => Some(ZIPKIN_KIND_CLIENT),
        SpanKind::Server => Some(ZIPKIN_KIND_SERVER),
        SpanKind::Producer => Some(ZIPKIN_KIND_PRODUCER),
        SpanKind::Consumer => Some(ZIPKIN_KIND_CONSUMER),
        SpanKind::Unspecified => None,
    }
}

/// Lowercase, zero-padded 16-character hex, as the collector expects.
fn hex_id(id: u64) -> String {
    hex::encode(id.to_be_bytes())
}

/// Map the trace into the collector's JSON schema.
///
/// `debug` reflects the ambient `X-B3-Flags` header; `shared` marks traces
/// whose leading span continues one started in another process. Both are
/// computed once and stamped on every span of the trace, as is the fixed
/// local endpoint.
pub fn zipkin_spans(
    trace: &Trace,
    ctx: &AmbientContext,
    endpoint: &LocalEndpoint,
) -> Vec<ZipkinSpan> {
    let debug = ctx.header("X-B3-Flags") == Some("1");
    let shared = trace
        .root_span()
        .map(|root| root.parent_span_id.is_some())
        .unwrap_or(false);

    trace
        .spans()
        .iter()
        .map(|span| {
            let timestamp = span.start_time.timestamp_micros();
            ZipkinSpan {
                trace_id: trace.trace_id().to_string(),
                name: span.name.clone(),
                parent_id: span.parent_span_id.map(hex_id),
                id: hex_id(span.span_id),
                timestamp,
                duration: span.end_time.timestamp_micros() - timestamp,
                debug,
                shared,
                local_endpoint: endpoint.clone(),
                tags: span.labels.clone(),
                kind: zipkin_kind(span.kind),
            }
        })
        .collect()
}
