//! Delivery channels: how converted payloads reach a backend.
//!
//! A channel is a capability injected into a reporter. Implementations log
//! their own failures and fold them into the boolean result; nothing is
//! propagated to the reporting caller.

use crate::client::TraceService;
use crate::convert::{CloudTrace, TraceBatch, ZipkinSpan};
use crate::error::DeliveryError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Transport capability injected into a reporter.
#[async_trait]
pub trait DeliveryChannel<P>: Send + Sync
where
    P: Send + 'static,
{
    /// Hand one payload to the backend. `true` means delivered, or for
    /// queueing channels, accepted for delivery.
    async fn deliver(&self, payload: P) -> bool;
}

/// Inline delivery: one awaited insert call on the caller's task.
pub struct SyncDelivery {
    service: Arc<dyn TraceService>,
}

impl SyncDelivery {
    pub fn new(service: Arc<dyn TraceService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DeliveryChannel<CloudTrace> for SyncDelivery {
    async fn deliver(&self, trace: CloudTrace) -> bool {
        if trace.spans.is_empty() {
            debug!(trace_id = %trace.trace_id, "skipping delivery of empty trace");
            return false;
        }

        let trace_id = trace.trace_id.clone();
        let batch = TraceBatch { traces: vec![trace] };
        match self.service.patch_traces(batch).await {
            Ok(()) => true,
            Err(e) => {
                warn!(trace_id = %trace_id, error = %e, "trace delivery failed");
                false
            }
        }
    }
}

/// Tuning for [`BatchedDelivery`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Max containers per insert call.
    pub batch_size: usize,
    /// Flush at least this often.
    pub call_period: Duration,
    /// Worker tasks draining the queue.
    pub worker_num: usize,
    /// Bound on queued containers before enqueue starts failing.
    pub queue_capacity: usize,
    /// Job identifier shared by the queue and its workers.
    pub job_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            call_period: Duration::from_secs(2),
            worker_num: 2,
            queue_capacity: 4096,
            job_name: "cloud-trace-batch".to_string(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_call_period(mut self, call_period: Duration) -> Self {
        self.call_period = call_period;
        self
    }

    pub fn with_worker_num(mut self, worker_num: usize) -> Self {
        self.worker_num = worker_num;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }
}

/// Queueing delivery: enqueue is O(1) and never touches the network.
///
/// Worker tasks started at construction share the bounded queue, group
/// containers up to `batch_size` and flush at least every `call_period`.
/// Ownership of a container moves into the queue at enqueue time; a batch
/// whose insert call fails is logged and discarded.
pub struct BatchedDelivery {
    sender: flume::Sender<CloudTrace>,
    job_name: String,
}

impl BatchedDelivery {
    /// Start the worker pool and return the enqueue handle.
    ///
    /// Must be called inside a tokio runtime; the workers are detached and
    /// run for the process lifetime.
    pub fn start(service: Arc<dyn TraceService>, config: BatchConfig) -> Self {
        let (sender, receiver) = flume::bounded(config.queue_capacity);

        for worker_id in 0..config.worker_num.max(1) {
            let receiver = receiver.clone();
            let service = service.clone();
            let job_name = config.job_name.clone();
            let batch_size = config.batch_size;
            let call_period = config.call_period;
            tokio::spawn(async move {
                batch_worker(receiver, service, batch_size, call_period, job_name, worker_id)
                    .await;
            });
        }

        Self {
            sender,
            job_name: config.job_name,
        }
    }

    fn enqueue(&self, trace: CloudTrace) -> Result<(), DeliveryError> {
        self.sender
            .try_send(trace)
            .map_err(|_| DeliveryError::QueueUnavailable)
    }
}

#[async_trait]
impl DeliveryChannel<CloudTrace> for BatchedDelivery {
    async fn deliver(&self, trace: CloudTrace) -> bool {
        if trace.spans.is_empty() {
            debug!(trace_id = %trace.trace_id, "skipping enqueue of empty trace");
            return false;
        }

        let trace_id = trace.trace_id.clone();
        match self.enqueue(trace) {
            Ok(()) => true,
            Err(e) => {
                warn!(job = %self.job_name, trace_id = %trace_id, error = %e, "dropping trace");
                false
            }
        }
    }
}

async fn batch_worker(
    receiver: flume::Receiver<CloudTrace>,
    service: Arc<dyn TraceService>,
    batch_size: usize,
    call_period: Duration,
    job_name: String,
    worker_id: usize,
) {
    let mut buffer: Vec<CloudTrace> = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(call_period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = receiver.recv_async() => match received {
                Ok(trace) => {
                    buffer.push(trace);
                    if buffer.len() >= batch_size {
                        flush(&service, &mut buffer, &job_name, worker_id).await;
                    }
                }
                Err(_) => {
                    // all senders gone; push out what is left and stop
                    flush(&service, &mut buffer, &job_name, worker_id).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                flush(&service, &mut buffer, &job_name, worker_id).await;
            }
        }
    }
}

async fn flush(
    service: &Arc<dyn TraceService>,
    buffer: &mut Vec<CloudTrace>,
    job_name: &str,
    worker_id: usize,
) {
    if buffer.is_empty() {
        return;
    }
    let traces = std::mem::take(buffer);
    let count = traces.len();
    match service.patch_traces(TraceBatch { traces }).await {
        Ok(()) => {
            debug!(job = job_name, worker = worker_id, traces = count, "batch inserted");
        }
        Err(e) => {
            error!(
                job = job_name,
                worker = worker_id,
                traces = count,
                error = %e,
                "batch insert failed, dropping batch"
            );
        }
    }
}

/// Direct-HTTP delivery to a Zipkin-compatible collector.
///
/// The target URL is composed once at construction. The collector's answer
/// is observed for logging but never validated; only a transport failure
/// counts as an undelivered payload.
pub struct ZipkinHttpDelivery {
    client: reqwest::Client,
    url: String,
}

impl ZipkinHttpDelivery {
    /// Default collector ingestion path.
    pub const DEFAULT_PATH: &'static str = "/api/v2/spans";

    pub fn new(host: &str, port: u16, path: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("http://{host}:{port}{path}"),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, spans: &[ZipkinSpan]) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(spans)?;
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        debug!(url = %self.url, status = %response.status(), spans = spans.len(), "posted spans");
        Ok(())
    }
}

#[async_trait]
impl DeliveryChannel<Vec<ZipkinSpan>> for ZipkinHttpDelivery {
    async fn deliver(&self, spans: Vec<ZipkinSpan>) -> bool {
        if spans.is_empty() {
            debug!(url = %self.url, "skipping post of empty span list");
            return false;
        }
        match self.post(&spans).await {
            Ok(()) => true,
            Err(e) => {
                warn!(url = %self.url, error = %e, "span post failed");
                false
            }
        }
    }
}
