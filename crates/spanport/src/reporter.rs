//! Reporter orchestration: enrich, convert, deliver.

use crate::client::{HttpTraceService, TraceService, TraceServiceConfig};
use crate::context::AmbientContext;
use crate::convert::{self, CloudTrace, LocalEndpoint, ZipkinSpan};
use crate::deliver::{
    BatchConfig, BatchedDelivery, DeliveryChannel, SyncDelivery, ZipkinHttpDelivery,
};
use crate::labels::LabelEnricher;
use crate::span::Trace;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The single public capability: hand a finished trace to a backend.
///
/// Fire-and-forget telemetry semantics: the boolean is the entire outcome.
/// No retries are performed; a delivery failure is terminal for that trace
/// and never affects the host application.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, trace: Trace) -> bool;
}

/// Construction settings for [`CloudTraceReporter`].
#[derive(Debug, Clone)]
pub struct CloudReporterConfig {
    /// Project the traces belong to.
    pub project_id: String,
    /// Base URL of the trace API.
    pub endpoint: String,
    /// Bearer token attached to every insert call, when set.
    pub credentials_token: Option<String>,
    /// Per-request timeout of the insert call.
    pub timeout: Duration,
    /// Opt into background batching. Off means every report performs its
    /// insert call inline on the caller's task.
    pub async_delivery: bool,
    /// Batch tuning, only consulted when `async_delivery` is set.
    pub batch: BatchConfig,
}

impl Default for CloudReporterConfig {
    fn default() -> Self {
        let service = TraceServiceConfig::default();
        Self {
            project_id: String::new(),
            endpoint: service.endpoint,
            credentials_token: None,
            timeout: service.timeout,
            async_delivery: false,
            batch: BatchConfig::default(),
        }
    }
}

impl CloudReporterConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_credentials_token(mut self, token: impl Into<String>) -> Self {
        self.credentials_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_async_delivery(mut self, batch: BatchConfig) -> Self {
        self.async_delivery = true;
        self.batch = batch;
        self
    }

    fn service_config(&self) -> TraceServiceConfig {
        let mut config = TraceServiceConfig::new(self.project_id.clone())
            .with_endpoint(self.endpoint.clone())
            .with_timeout(self.timeout);
        if let Some(token) = &self.credentials_token {
            config = config.with_credentials_token(token.clone());
        }
        config
    }
}

/// Reporter for the batching cloud trace backend.
///
/// Enriches the root span from the ambient context, converts to the cloud
/// schema and hands the container to its delivery channel.
pub struct CloudTraceReporter {
    project_id: String,
    enricher: LabelEnricher,
    channel: Arc<dyn DeliveryChannel<CloudTrace>>,
    ambient: AmbientContext,
}

impl CloudTraceReporter {
    /// Build over the HTTP-backed service. With `async_delivery` set this
    /// starts the batch workers, so it must run inside a tokio runtime.
    pub fn new(config: CloudReporterConfig) -> Self {
        let service: Arc<dyn TraceService> =
            Arc::new(HttpTraceService::new(config.service_config()));
        Self::with_trace_service(config, service)
    }

    /// Build over an explicit service implementation.
    pub fn with_trace_service(config: CloudReporterConfig, service: Arc<dyn TraceService>) -> Self {
        let channel: Arc<dyn DeliveryChannel<CloudTrace>> = if config.async_delivery {
            Arc::new(BatchedDelivery::start(service, config.batch.clone()))
        } else {
            Arc::new(SyncDelivery::new(service))
        };
        Self::with_channel(config, channel)
    }

    /// Build over an explicit delivery channel.
    pub fn with_channel(
        config: CloudReporterConfig,
        channel: Arc<dyn DeliveryChannel<CloudTrace>>,
    ) -> Self {
        Self {
            project_id: config.project_id,
            enricher: LabelEnricher::new(),
            channel,
            ambient: AmbientContext::from_env(),
        }
    }

    /// Replace the ambient source consulted by [`Reporter::report`].
    pub fn with_ambient(mut self, ambient: AmbientContext) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_enricher(mut self, enricher: LabelEnricher) -> Self {
        self.enricher = enricher;
        self
    }

    /// Report against an explicit ambient context.
    pub async fn report_with_ambient(&self, mut trace: Trace, ctx: &AmbientContext) -> bool {
        self.enricher.enrich(&mut trace, ctx);

        let spans = convert::cloud_spans(&trace);
        if spans.is_empty() {
            debug!(trace_id = %trace.trace_id(), "nothing to report");
            return false;
        }

        let container = CloudTrace {
            project_id: self.project_id.clone(),
            trace_id: trace.trace_id().to_string(),
            spans,
        };
        self.channel.deliver(container).await
    }
}

#[async_trait]
impl Reporter for CloudTraceReporter {
    async fn report(&self, trace: Trace) -> bool {
        self.report_with_ambient(trace, &self.ambient).await
    }
}

/// Construction settings for [`ZipkinReporter`].
#[derive(Debug, Clone)]
pub struct ZipkinReporterConfig {
    /// Service name the collector attributes the spans to.
    pub service_name: String,
    /// Collector host.
    pub host: String,
    /// Collector port.
    pub port: u16,
    /// Collector ingestion path.
    pub path: String,
    /// Address reported in the local endpoint.
    pub local_ipv4: String,
    /// Port reported in the local endpoint.
    pub local_port: u16,
}

impl Default for ZipkinReporterConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown-service".to_string(),
            host: "127.0.0.1".to_string(),
            port: 9411,
            path: ZipkinHttpDelivery::DEFAULT_PATH.to_string(),
            local_ipv4: "127.0.0.1".to_string(),
            local_port: 80,
        }
    }
}

impl ZipkinReporterConfig {
    pub fn new(service_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_local_endpoint(mut self, ipv4: impl Into<String>, port: u16) -> Self {
        self.local_ipv4 = ipv4.into();
        self.local_port = port;
        self
    }
}

/// Reporter for a Zipkin-compatible collector.
///
/// Does not enrich: the ambient context is only consulted during
/// conversion for the debug flag.
pub struct ZipkinReporter {
    endpoint: LocalEndpoint,
    channel: Arc<dyn DeliveryChannel<Vec<ZipkinSpan>>>,
    ambient: AmbientContext,
}

impl ZipkinReporter {
    pub fn new(config: ZipkinReporterConfig) -> Self {
        let channel = Arc::new(ZipkinHttpDelivery::new(
            &config.host,
            config.port,
            &config.path,
        ));
        Self::with_channel(config, channel)
    }

    /// Build over an explicit delivery channel.
    pub fn with_channel(
        config: ZipkinReporterConfig,
        channel: Arc<dyn DeliveryChannel<Vec<ZipkinSpan>>>,
    ) -> Self {
        Self {
            endpoint: LocalEndpoint {
                service_name: config.service_name,
                ipv4: config.local_ipv4,
                port: config.local_port,
            },
            channel,
            ambient: AmbientContext::from_env(),
        }
    }

    /// Replace the ambient source consulted by [`Reporter::report`].
    pub fn with_ambient(mut self, ambient: AmbientContext) -> Self {
        self.ambient = ambient;
        self
    }

    /// Report against an explicit ambient context.
    pub async fn report_with_ambient(&self, trace: Trace, ctx: &AmbientContext) -> bool {
        let spans = convert::zipkin_spans(&trace, ctx, &self.endpoint);
        if spans.is_empty() {
            debug!(trace_id = %trace.trace_id(), "nothing to report");
            return false;
        }
        self.channel.deliver(spans).await
    }
}

#[async_trait]
impl Reporter for ZipkinReporter {
    async fn report(&self, trace: Trace) -> bool {
        self.report_with_ambient(trace, &self.ambient).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::TraceBatch;
    use crate::error::DeliveryError;
    use crate::labels;
    use crate::span::{SpanKind, SpanRecord};
    use std::sync::Mutex;

    struct RecordingService {
        batches: Mutex<Vec<TraceBatch>>,
    }

    #[async_trait]
    impl crate::client::TraceService for RecordingService {
        async fn patch_traces(&self, batch: TraceBatch) -> Result<(), DeliveryError> {
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }
    }

    struct RecordingChannel {
        payloads: Mutex<Vec<Vec<ZipkinSpan>>>,
    }

    #[async_trait]
    impl DeliveryChannel<Vec<ZipkinSpan>> for RecordingChannel {
        async fn deliver(&self, payload: Vec<ZipkinSpan>) -> bool {
            self.payloads.lock().unwrap().push(payload);
            true
        }
    }

    fn cloud_reporter(service: Arc<RecordingService>) -> CloudTraceReporter {
        CloudTraceReporter::with_trace_service(CloudReporterConfig::new("proj-1"), service)
            .with_ambient(AmbientContext::new())
    }

    #[tokio::test]
    async fn empty_trace_reports_false_without_delivery() {
        let service = Arc::new(RecordingService {
            batches: Mutex::new(Vec::new()),
        });
        let reporter = cloud_reporter(service.clone());

        assert!(!reporter.report(Trace::new("t1", Vec::new())).await);
        assert!(service.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cloud_report_enriches_and_delivers_container() {
        let service = Arc::new(RecordingService {
            batches: Mutex::new(Vec::new()),
        });
        let reporter = cloud_reporter(service.clone());

        let trace = Trace::new(
            "t1",
            vec![
                SpanRecord::new("root", 1).with_kind(SpanKind::Server),
                SpanRecord::new("child", 2).with_parent(1).with_kind(SpanKind::Client),
            ],
        );
        let ctx = AmbientContext::new()
            .with_response_status(302)
            .with_response_header("Location", "/next");

        assert!(reporter.report_with_ambient(trace, &ctx).await);

        let batches = service.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let container = &batches[0].traces[0];
        assert_eq!(container.project_id, "proj-1");
        assert_eq!(container.trace_id, "t1");
        assert_eq!(container.spans.len(), 2);
        assert_eq!(container.spans[0].kind, crate::convert::CLOUD_KIND_RPC_SERVER);
        assert_eq!(
            container.spans[0].labels.get(labels::HTTP_REDIRECTED_URL).map(String::as_str),
            Some("/next")
        );
        // enrichment touches the root span only
        assert!(!container.spans[1].labels.contains_key(labels::AGENT));
    }

    #[tokio::test]
    async fn zipkin_report_skips_enrichment_and_links_spans() {
        let channel = Arc::new(RecordingChannel {
            payloads: Mutex::new(Vec::new()),
        });
        let reporter = ZipkinReporter::with_channel(
            ZipkinReporterConfig::new("svc", "127.0.0.1", 9411)
                .with_local_endpoint("10.0.0.1", 80),
            channel.clone(),
        )
        .with_ambient(AmbientContext::new());

        let trace = Trace::new(
            "t1",
            vec![
                SpanRecord::new("root", 1).with_kind(SpanKind::Server),
                SpanRecord::new("child", 2).with_parent(1).with_kind(SpanKind::Client),
            ],
        );
        assert!(reporter.report(trace).await);

        let payloads = channel.payloads.lock().unwrap();
        let spans = &payloads[0];
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].parent_id.as_deref(), Some(spans[0].id.as_str()));
        assert_eq!(spans[0].trace_id, spans[1].trace_id);
        assert_eq!(spans[0].local_endpoint.ipv4, "10.0.0.1");
        // no enrichment labels on the zipkin path
        assert!(spans[0].tags.is_empty());
    }

    #[tokio::test]
    async fn zipkin_empty_trace_reports_false() {
        let channel = Arc::new(RecordingChannel {
            payloads: Mutex::new(Vec::new()),
        });
        let reporter = ZipkinReporter::with_channel(
            ZipkinReporterConfig::default(),
            channel.clone(),
        );

        assert!(!reporter.report(Trace::new("t1", Vec::new())).await);
        assert!(channel.payloads.lock().unwrap().is_empty());
    }
}
