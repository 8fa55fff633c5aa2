//! Standard labels merged into the root span during enrichment.

use crate::context::AmbientContext;
use crate::span::Trace;

/// HTTP response status code of the surrounding request.
pub const HTTP_STATUS_CODE: &str = "/http/status_code";
/// Request URI.
pub const HTTP_URL: &str = "/http/url";
/// Request method.
pub const HTTP_METHOD: &str = "/http/method";
/// Protocol the client spoke.
pub const HTTP_CLIENT_PROTOCOL: &str = "/http/client_protocol";
/// Client user agent.
pub const HTTP_USER_AGENT: &str = "/http/user_agent";
/// Requested host.
pub const HTTP_HOST: &str = "/http/host";
/// Target of a 301/302 redirect response.
pub const HTTP_REDIRECTED_URL: &str = "/http/redirected_url";
/// Process id of the reporting process.
pub const PID: &str = "/pid";
/// Name and version of the reporting library.
pub const AGENT: &str = "/agent";
/// Platform service the process runs as.
pub const GAE_SERVICE: &str = "g.co/gae/app/module";
/// Deployed version of that service.
pub const GAE_VERSION: &str = "g.co/gae/app/version";
/// Geo hint: client city.
pub const CLIENT_CITY: &str = "/client/city";
/// Geo hint: client region.
pub const CLIENT_REGION: &str = "/client/region";
/// Geo hint: client country.
pub const CLIENT_COUNTRY: &str = "/client/country";

/// Probe order for header-derived labels. First present candidate wins;
/// a label whose candidates are all absent is skipped.
const HEADER_LABELS: &[(&str, &[&str])] = &[
    (HTTP_URL, &["REQUEST_URI"]),
    (HTTP_METHOD, &["REQUEST_METHOD"]),
    (HTTP_CLIENT_PROTOCOL, &["SERVER_PROTOCOL"]),
    (HTTP_USER_AGENT, &["HTTP_USER_AGENT"]),
    (HTTP_HOST, &["HTTP_HOST", "SERVER_NAME"]),
    (GAE_SERVICE, &["GAE_SERVICE"]),
    (GAE_VERSION, &["GAE_VERSION"]),
    (CLIENT_CITY, &["HTTP_X_APPENGINE_CITY"]),
    (CLIENT_REGION, &["HTTP_X_APPENGINE_REGION"]),
    (CLIENT_COUNTRY, &["HTTP_X_APPENGINE_COUNTRY"]),
];

/// Derives standard metadata labels for a trace's root span.
///
/// Side effect only: merges labels into the root span and nothing else.
/// A header that is absent simply skips its label.
#[derive(Debug, Clone)]
pub struct LabelEnricher {
    pid: u32,
    agent: String,
}

impl LabelEnricher {
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    /// Override the agent identifier.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn enrich(&self, trace: &mut Trace, ctx: &AmbientContext) {
        if let Some(status) = ctx.response_status() {
            trace.add_root_label(HTTP_STATUS_CODE, status.to_string());
            if status == 301 || status == 302 {
                if let Some(location) = ctx.response_header("Location") {
                    let location = location.to_string();
                    trace.add_root_label(HTTP_REDIRECTED_URL, location);
                }
            }
        }

        trace.add_root_label(PID, self.pid.to_string());
        trace.add_root_label(AGENT, self.agent.clone());

        for (label, candidates) in HEADER_LABELS {
            if let Some(value) = ctx.first_header(candidates) {
                let value = value.to_string();
                trace.add_root_label(*label, value);
            }
        }
    }
}

impl Default for LabelEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanRecord;

    fn trace() -> Trace {
        Trace::new(
            "abc123",
            vec![SpanRecord::new("root", 1), SpanRecord::new("child", 2).with_parent(1)],
        )
    }

    fn root_label<'a>(trace: &'a Trace, key: &str) -> Option<&'a str> {
        trace.spans()[0].labels.get(key).map(String::as_str)
    }

    #[test]
    fn always_records_pid_and_agent() {
        let mut trace = trace();
        LabelEnricher::new()
            .with_agent("spanport/test")
            .enrich(&mut trace, &AmbientContext::new());

        assert_eq!(root_label(&trace, AGENT), Some("spanport/test"));
        assert_eq!(
            root_label(&trace, PID),
            Some(std::process::id().to_string().as_str())
        );
        assert!(trace.spans()[1].labels.is_empty());
    }

    #[test]
    fn redirect_records_location() {
        let mut trace = trace();
        let ctx = AmbientContext::new()
            .with_response_status(302)
            .with_response_header("Location", "/next");
        LabelEnricher::new().enrich(&mut trace, &ctx);

        assert_eq!(root_label(&trace, HTTP_STATUS_CODE), Some("302"));
        assert_eq!(root_label(&trace, HTTP_REDIRECTED_URL), Some("/next"));
    }

    #[test]
    fn non_redirect_status_skips_location() {
        let mut trace = trace();
        let ctx = AmbientContext::new()
            .with_response_status(200)
            .with_response_header("Location", "/next");
        LabelEnricher::new().enrich(&mut trace, &ctx);

        assert_eq!(root_label(&trace, HTTP_STATUS_CODE), Some("200"));
        assert_eq!(root_label(&trace, HTTP_REDIRECTED_URL), None);
    }

    #[test]
    fn redirect_without_location_header_skips_label() {
        let mut trace = trace();
        let ctx = AmbientContext::new().with_response_status(301);
        LabelEnricher::new().enrich(&mut trace, &ctx);

        assert_eq!(root_label(&trace, HTTP_STATUS_CODE), Some("301"));
        assert_eq!(root_label(&trace, HTTP_REDIRECTED_URL), None);
    }

    #[test]
    fn request_labels_follow_probe_table() {
        let mut trace = trace();
        let ctx = AmbientContext::new()
            .with_header("REQUEST_URI", "/cart?id=9")
            .with_header("REQUEST_METHOD", "POST")
            .with_header("SERVER_PROTOCOL", "HTTP/1.1")
            .with_header("HTTP_USER_AGENT", "curl/8.0")
            .with_header("HTTP_X_APPENGINE_CITY", "portland");
        LabelEnricher::new().enrich(&mut trace, &ctx);

        assert_eq!(root_label(&trace, HTTP_URL), Some("/cart?id=9"));
        assert_eq!(root_label(&trace, HTTP_METHOD), Some("POST"));
        assert_eq!(root_label(&trace, HTTP_CLIENT_PROTOCOL), Some("HTTP/1.1"));
        assert_eq!(root_label(&trace, HTTP_USER_AGENT), Some("curl/8.0"));
        assert_eq!(root_label(&trace, CLIENT_CITY), Some("portland"));
        assert_eq!(root_label(&trace, HTTP_HOST), None);
        assert_eq!(root_label(&trace, HTTP_STATUS_CODE), None);
    }

    #[test]
    fn host_falls_back_to_server_name() {
        let mut trace = trace();
        let ctx = AmbientContext::new().with_header("SERVER_NAME", "svc.internal");
        LabelEnricher::new().enrich(&mut trace, &ctx);
        assert_eq!(root_label(&trace, HTTP_HOST), Some("svc.internal"));

        let mut trace = self::trace();
        let ctx = AmbientContext::new()
            .with_header("SERVER_NAME", "svc.internal")
            .with_header("HTTP_HOST", "svc.example.com");
        LabelEnricher::new().enrich(&mut trace, &ctx);
        assert_eq!(root_label(&trace, HTTP_HOST), Some("svc.example.com"));
    }

    #[test]
    fn empty_trace_is_untouched() {
        let mut trace = Trace::new("abc123", Vec::new());
        LabelEnricher::new().enrich(&mut trace, &AmbientContext::new());
        assert!(trace.is_empty());
    }
}
