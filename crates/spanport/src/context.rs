//! Ambient request and process state consulted during reporting.
//!
//! Reporters read request headers, the response status code and response
//! headers from an [`AmbientContext`] instead of from process globals, so
//! tests and embedding hosts can supply their own snapshot.

use std::collections::HashMap;

/// Snapshot of the ambient environment a trace was produced in.
///
/// The default source is the process environment
/// ([`AmbientContext::from_env`]), which carries CGI-style entries such as
/// `REQUEST_URI` or `HTTP_USER_AGENT` under common server runtimes. Hosts
/// sitting on a request path typically build one per request instead.
#[derive(Debug, Clone, Default)]
pub struct AmbientContext {
    headers: HashMap<String, String>,
    response_status: Option<u16>,
    response_headers: Vec<(String, String)>,
}

impl AmbientContext {
    /// Empty context: no headers, no response state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the process environment as the header source.
    pub fn from_env() -> Self {
        Self {
            headers: std::env::vars().collect(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_response_status(mut self, status: u16) -> Self {
        self.response_status = Some(status);
        self
    }

    pub fn with_response_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.response_headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header by name.
    ///
    /// Probes the exact key first, then the CGI-normalized form
    /// (`X-B3-Flags` resolves through `HTTP_X_B3_FLAGS`), so environment
    /// snapshots answer the same names as raw header maps.
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }
        self.headers.get(&cgi_name(name)).map(String::as_str)
    }

    /// First present candidate wins; absence of all of them yields `None`.
    pub fn first_header(&self, candidates: &[&str]) -> Option<&str> {
        candidates.iter().find_map(|name| self.header(name))
    }

    /// HTTP response status code of the surrounding request, when known.
    pub fn response_status(&self) -> Option<u16> {
        self.response_status
    }

    /// Case-insensitive scan of the response headers, first match wins.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// `X-B3-Flags` -> `HTTP_X_B3_FLAGS`
fn cgi_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 5);
    out.push_str("HTTP_");
    for ch in name.chars() {
        out.push(if ch == '-' { '_' } else { ch.to_ascii_uppercase() });
    }
    out
}
