//! HTTP transport layer.
//!
//! A [`Transport`] issues exactly one HTTP(S) call and hands the raw
//! status/body/headers upward without interpreting them. Leader
//! redirects are cluster protocol and live one layer up, in
//! [`redirect::RedirectEngine`].

pub mod http;
pub mod redirect;

pub use http::HttpTransport;
pub use redirect::RedirectEngine;

use crate::error::{Result, RqdocError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Wire protocol of a cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

/// One cluster member. Transient: constructed per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }

    /// The `host:port` form used by discovery node lists.
    pub fn node_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    /// Parses a `protocol://host:port` URL, as found in a leader redirect
    /// `Location` header. A trailing path is accepted and ignored, the
    /// way the original store ignored everything after the port.
    pub fn parse_url(url: &str) -> Result<Self> {
        let (endpoint, _path) = Self::split_url(url)?;
        Ok(endpoint)
    }

    /// Splits a URL into an endpoint and its path. The port defaults to
    /// the scheme's well-known port when absent (discovery URLs commonly
    /// omit it).
    pub fn split_url(url: &str) -> Result<(Self, String)> {
        let (protocol, rest) = if let Some(rest) = url.strip_prefix("https://") {
            (Protocol::Https, rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (Protocol::Http, rest)
        } else {
            return Err(RqdocError::BadOptions(format!("unsupported URL: {url}")));
        };
        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], rest[pos..].to_string()),
            None => (rest, String::from("/")),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| RqdocError::BadOptions(format!("bad port in URL: {url}")))?;
                (host, port)
            }
            None => (authority, protocol.default_port()),
        };
        if host.is_empty() {
            return Err(RqdocError::BadOptions(format!("empty host in URL: {url}")));
        }
        Ok((Endpoint::new(protocol, host, port), path))
    }

    /// Builds the endpoint for a `host:port` node-list entry, keeping
    /// this endpoint's protocol.
    pub fn with_node(&self, node: &str) -> Result<Self> {
        let (host, port) = node
            .rsplit_once(':')
            .ok_or_else(|| RqdocError::BadOptions(format!("bad node address: {node}")))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| RqdocError::BadOptions(format!("bad node address: {node}")))?;
        Ok(Endpoint::new(self.protocol, host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything one HTTP attempt needs. Owned by a single in-flight
/// logical request; every redirect or failover hop derives a fresh
/// value instead of mutating a shared one.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub endpoint: Endpoint,
    pub path: String,
    pub method: Method,
    pub body: Option<serde_json::Value>,
    /// Query-string pairs, percent-encoded by the transport.
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
    pub redirect_count: u32,
    pub max_redirects: u32,
    pub keep_alive: bool,
}

impl RequestContext {
    pub fn get(
        endpoint: Endpoint,
        path: impl Into<String>,
        timeout: Duration,
        max_redirects: u32,
    ) -> Self {
        Self {
            endpoint,
            path: path.into(),
            method: Method::Get,
            body: None,
            query: Vec::new(),
            timeout,
            redirect_count: 0,
            max_redirects,
            keep_alive: false,
        }
    }

    pub fn post(
        endpoint: Endpoint,
        path: impl Into<String>,
        body: serde_json::Value,
        timeout: Duration,
        max_redirects: u32,
    ) -> Self {
        Self {
            endpoint,
            path: path.into(),
            method: Method::Post,
            body: Some(body),
            query: Vec::new(),
            timeout,
            redirect_count: 0,
            max_redirects,
            keep_alive: false,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The context for following a leader redirect: new endpoint, same
    /// method/path/body, redirect counter bumped.
    pub fn redirected_to(&self, endpoint: Endpoint) -> Self {
        let mut next = self.clone();
        next.endpoint = endpoint;
        next.redirect_count += 1;
        next
    }

    /// The context for a failover attempt on another node: new endpoint,
    /// redirect counter reset so the new node gets the full budget.
    pub fn with_endpoint(&self, endpoint: Endpoint) -> Self {
        let mut next = self.clone();
        next.endpoint = endpoint;
        next.redirect_count = 0;
        next
    }

    /// Fails fast on malformed call-site arguments, before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.host.is_empty() {
            return Err(RqdocError::BadOptions("empty host".into()));
        }
        if self.endpoint.port == 0 {
            return Err(RqdocError::BadOptions("port must be non-zero".into()));
        }
        if !self.path.starts_with('/') {
            return Err(RqdocError::BadOptions(format!(
                "path must be absolute: {}",
                self.path
            )));
        }
        Ok(())
    }
}

/// Raw result of one HTTP attempt. Status codes are interpreted by the
/// layer above.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
    /// `Location` header, when the node answered with a leader redirect.
    pub location: Option<String>,
}

/// A single-shot HTTP(S) requester. Implementations are injected into
/// [`RedirectEngine`] and the discovery client, so tests substitute
/// doubles without patching anything global.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, ctx: &RequestContext) -> Result<RawResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_renders_node_id_and_url() {
        let ep = Endpoint::new(Protocol::Http, "10.0.0.7", 4001);
        assert_eq!(ep.node_id(), "10.0.0.7:4001");
        assert_eq!(ep.base_url(), "http://10.0.0.7:4001");
    }

    #[test]
    fn test_parse_url_reads_protocol_host_port() {
        let ep = Endpoint::parse_url("https://db2.local:4003").unwrap();
        assert_eq!(ep.protocol, Protocol::Https);
        assert_eq!(ep.host, "db2.local");
        assert_eq!(ep.port, 4003);
    }

    #[test]
    fn test_parse_url_ignores_trailing_path() {
        let ep = Endpoint::parse_url("http://10.0.0.2:4001/db/execute").unwrap();
        assert_eq!(ep.node_id(), "10.0.0.2:4001");
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        assert!(Endpoint::parse_url("ftp://x:21").is_err());
        assert!(Endpoint::parse_url("10.0.0.2:4001").is_err());
    }

    #[test]
    fn test_split_url_defaults_the_port() {
        let (ep, path) = Endpoint::split_url("https://disco.example.com/v1/abc123").unwrap();
        assert_eq!(ep.port, 443);
        assert_eq!(path, "/v1/abc123");
    }

    #[test]
    fn test_with_node_keeps_protocol() {
        let local = Endpoint::new(Protocol::Https, "a", 4001);
        let next = local.with_node("b:4002").unwrap();
        assert_eq!(next.protocol, Protocol::Https);
        assert_eq!(next.node_id(), "b:4002");
        assert!(local.with_node("no-port").is_err());
    }

    #[test]
    fn test_redirect_derives_a_fresh_context() {
        let ctx = RequestContext::get(
            Endpoint::new(Protocol::Http, "a", 4001),
            "/db/query",
            Duration::from_secs(5),
            10,
        );
        let next = ctx.redirected_to(Endpoint::new(Protocol::Http, "b", 4001));
        assert_eq!(ctx.redirect_count, 0);
        assert_eq!(next.redirect_count, 1);
        assert_eq!(next.path, ctx.path);
        assert_eq!(next.endpoint.host, "b");
    }

    #[test]
    fn test_failover_resets_the_redirect_budget() {
        let ctx = RequestContext::get(
            Endpoint::new(Protocol::Http, "a", 4001),
            "/db/query",
            Duration::from_secs(5),
            10,
        );
        let hopped = ctx.redirected_to(Endpoint::new(Protocol::Http, "b", 4001));
        let next = hopped.with_endpoint(Endpoint::new(Protocol::Http, "c", 4001));
        assert_eq!(next.redirect_count, 0);
    }

    #[test]
    fn test_validate_rejects_bad_contexts() {
        let mut ctx = RequestContext::get(
            Endpoint::new(Protocol::Http, "", 4001),
            "/db/query",
            Duration::from_secs(5),
            10,
        );
        assert!(matches!(
            ctx.validate(),
            Err(crate::error::RqdocError::BadOptions(_))
        ));
        ctx.endpoint.host = "a".into();
        ctx.endpoint.port = 0;
        assert!(ctx.validate().is_err());
        ctx.endpoint.port = 4001;
        ctx.path = "db/query".into();
        assert!(ctx.validate().is_err());
    }
}
