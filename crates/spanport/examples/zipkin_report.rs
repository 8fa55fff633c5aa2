//! Report a small hand-built trace to a local Zipkin collector.
//!
//! Start a collector first, e.g.
//! `docker run -p 9411:9411 openzipkin/zipkin`, then run
//! `cargo run --example zipkin_report`.

use chrono::Utc;
use spanport::{
    AmbientContext, Reporter, SpanKind, SpanRecord, Trace, ZipkinReporter, ZipkinReporterConfig,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("spanport=debug")
        .init();

    let reporter = ZipkinReporter::new(
        ZipkinReporterConfig::new("demo-service", "127.0.0.1", 9411)
            .with_local_endpoint("127.0.0.1", 8080),
    )
    .with_ambient(AmbientContext::new());

    let start = Utc::now() - chrono::Duration::milliseconds(120);
    let trace = Trace::new(
        "0af7651916cd43dd8448eb211c80319c",
        vec![
            SpanRecord::new("GET /demo", 1)
                .with_kind(SpanKind::Server)
                .with_times(start, Utc::now())
                .with_label("component", "router"),
            SpanRecord::new("fetch-rows", 2)
                .with_parent(1)
                .with_kind(SpanKind::Client)
                .with_times(start + chrono::Duration::milliseconds(10), Utc::now())
                .with_label("db.statement", "SELECT * FROM demo"),
        ],
    );

    if reporter.report(trace).await {
        println!("trace delivered, see http://127.0.0.1:9411");
    } else {
        println!("delivery failed, is a collector listening on 9411?");
    }
}
