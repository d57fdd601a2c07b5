//! Leader-redirect engine.
//!
//! Only the current cluster leader accepts writes; a follower answers
//! 301 with the leader's address in `Location`. The engine chases those
//! redirects up to the context's bound so a partitioned or flapping
//! cluster cannot send a request around in circles.

use crate::error::{Result, RqdocError};
use crate::transport::{Endpoint, RequestContext, Transport};
use serde_json::Value;
use tracing::{debug, warn};

/// Follows leader redirects on top of an injected [`Transport`]. Never
/// switches nodes itself; transport-level failures pass through so the
/// discovery failover loop can decide what to retry.
pub struct RedirectEngine<T: Transport> {
    transport: T,
}

impl<T: Transport> RedirectEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends the request, following 301s. Each hop derives a fresh
    /// context; the caller's value is consumed, never shared.
    ///
    /// A 200 body that fails to parse as JSON yields an empty object:
    /// malformed bodies are tolerated, not fatal.
    pub async fn request(&self, ctx: RequestContext) -> Result<Value> {
        let mut ctx = ctx;
        loop {
            let response = self.transport.send(&ctx).await?;
            match response.status {
                200 => {
                    let data = serde_json::from_slice(&response.body)
                        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
                    return Ok(data);
                }
                301 => {
                    if ctx.redirect_count >= ctx.max_redirects {
                        warn!(
                            endpoint = %ctx.endpoint,
                            max_redirects = ctx.max_redirects,
                            "redirect budget exhausted"
                        );
                        return Err(RqdocError::TooManyRedirects);
                    }
                    let location = response.location.ok_or(RqdocError::BadRedirect)?;
                    let leader = Endpoint::parse_url(&location)
                        .map_err(|_| RqdocError::BadRedirect)?;
                    debug!(follower = %ctx.endpoint, leader = %leader, "following leader redirect");
                    ctx = ctx.redirected_to(leader);
                }
                status => return Err(RqdocError::HttpStatus(status)),
            }
        }
    }
}
