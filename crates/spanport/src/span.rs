//! Span and trace data model consumed by the reporters.
//!
//! Records are fully populated by the upstream tracer before they reach
//! this crate; the pipeline reads and re-serializes them. The only
//! mutation a reporter performs is merging labels into the root span
//! during enrichment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Span kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpanKind {
    /// Not categorized
    #[default]
    Unspecified,
    /// Server side (handling a request)
    Server,
    /// Client side (issuing a request)
    Client,
    /// Message producer
    Producer,
    /// Message consumer
    Consumer,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanKind::Unspecified => write!(f, "UNSPECIFIED"),
            SpanKind::Server => write!(f, "SERVER"),
            SpanKind::Client => write!(f, "CLIENT"),
            SpanKind::Producer => write!(f, "PRODUCER"),
            SpanKind::Consumer => write!(f, "CONSUMER"),
        }
    }
}

/// One frame of a captured call stack. Any subset of fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Line number within the source file
    pub line: Option<u32>,
    /// Source file path
    pub file: Option<String>,
    /// Function or method name
    pub function: Option<String>,
    /// Enclosing class or type name
    pub class: Option<String>,
}

impl StackFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// A named, timed unit of work within a trace.
///
/// `span_id` is a 64-bit unsigned integer; each backend renders it in its
/// own width (decimal for the cloud schema, zero-padded hex for the
/// collector schema). Timestamps are wall-clock UTC with microsecond
/// precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Span name
    pub name: String,
    /// Span identifier, unique within the trace
    pub span_id: u64,
    /// Identifier of the parent span, absent for the root
    pub parent_span_id: Option<u64>,
    /// Start of the unit of work
    pub start_time: DateTime<Utc>,
    /// End of the unit of work, never before `start_time`
    pub end_time: DateTime<Utc>,
    /// Span kind
    pub kind: SpanKind,
    /// Key/value annotations, insertion order irrelevant
    pub labels: HashMap<String, String>,
    /// Captured call stack, outermost frame first
    pub backtrace: Vec<StackFrame>,
}

impl SpanRecord {
    pub fn new(name: impl Into<String>, span_id: u64) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            span_id,
            parent_span_id: None,
            start_time: now,
            end_time: now,
            kind: SpanKind::Unspecified,
            labels: HashMap::new(),
            backtrace: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_span_id: u64) -> Self {
        self.parent_span_id = Some(parent_span_id);
        self
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_times(mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_backtrace(mut self, frames: Vec<StackFrame>) -> Self {
        self.backtrace = frames;
        self
    }

    /// Whether this span has no parent within its trace.
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }
}

/// Read-only handle to whatever produced a trace.
///
/// Carries the opaque trace identifier, backend-assigned or propagated
/// from an upstream process. Reporters never own or mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    trace_id: String,
}

impl TraceContext {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

/// An identified collection of related spans forming a causal tree.
///
/// The root span is conventionally first in the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    context: TraceContext,
    spans: Vec<SpanRecord>,
}

impl Trace {
    pub fn new(trace_id: impl Into<String>, spans: Vec<SpanRecord>) -> Self {
        Self {
            context: TraceContext::new(trace_id),
            spans,
        }
    }

    /// The context that produced this trace.
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    pub fn trace_id(&self) -> &str {
        self.context.trace_id()
    }

    pub fn spans(&self) -> &[SpanRecord] {
        &self.spans
    }

    /// First span of the sequence.
    pub fn root_span(&self) -> Option<&SpanRecord> {
        self.spans.first()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Merge a label into the root span. No-op on an empty trace.
    pub fn add_root_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(root) = self.spans.first_mut() {
            root.labels.insert(key.into(), value.into());
        }
    }

    /// Check the structural invariants: every non-leading span's parent is
    /// either absent or refers to a span id seen earlier in the sequence
    /// (the leading span may continue a span started in another process),
    /// and no span ends before it starts.
    pub fn is_well_formed(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        for (index, span) in self.spans.iter().enumerate() {
            if span.end_time < span.start_time {
                return false;
            }
            if index > 0 {
                if let Some(parent) = span.parent_span_id {
                    if !seen.contains(&parent) {
                        return false;
                    }
                }
            }
            seen.insert(span.span_id);
        }
        true
    }
}
