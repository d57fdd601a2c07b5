//! Transport over reqwest.
//!
//! Redirect following is disabled: a 301 from a follower is cluster
//! protocol, not plumbing, and is handled by the redirect engine.
//! Cluster members commonly run with self-signed certificates, so
//! certificate validation is off for HTTPS.

use crate::error::{Result, RqdocError};
use crate::transport::{Method, RawResponse, RequestContext, Transport};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use std::sync::OnceLock;
use tracing::debug;

/// Real HTTP(S) transport. One call per [`Transport::send`], hard
/// per-request timeout, no status interpretation.
#[derive(Default)]
pub struct HttpTransport {
    /// Keep-alive client, built on first use when a caller opts in.
    /// reqwest pools connections per scheme and host internally, so one
    /// client serves both protocols.
    pooled: OnceLock<reqwest::Client>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_client() -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(client)
    }

    fn client(&self, keep_alive: bool) -> Result<reqwest::Client> {
        if !keep_alive {
            return Self::build_client();
        }
        if let Some(client) = self.pooled.get() {
            return Ok(client.clone());
        }
        let client = Self::build_client()?;
        Ok(self.pooled.get_or_init(|| client).clone())
    }
}

/// Maps a reqwest failure onto the transport taxonomy: timeouts are a
/// distinguished, retryable error; everything connection-level is
/// `Network`, tagged with the node that failed for diagnostics.
fn classify(err: reqwest::Error, ctx: &RequestContext) -> RqdocError {
    if err.is_timeout() {
        RqdocError::Timeout
    } else {
        RqdocError::Network(format!("{}: {}", ctx.endpoint.node_id(), err))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, ctx: &RequestContext) -> Result<RawResponse> {
        ctx.validate()?;
        let client = self.client(ctx.keep_alive)?;
        let url = format!("{}{}", ctx.endpoint.base_url(), ctx.path);

        let mut request = match ctx.method {
            Method::Get => client.get(&url),
            Method::Post => {
                let mut post = client
                    .post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .header(CACHE_CONTROL, "no-cache");
                if let Some(body) = &ctx.body {
                    post = post.json(body);
                }
                post
            }
        };
        if !ctx.query.is_empty() {
            request = request.query(&ctx.query);
        }
        request = request.timeout(ctx.timeout);

        debug!(%url, method = ?ctx.method, "sending request");
        let response = request.send().await.map_err(|e| classify(e, ctx))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await.map_err(|e| classify(e, ctx))?;

        Ok(RawResponse {
            status,
            body,
            location,
        })
    }
}
