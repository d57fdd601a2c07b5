//! Cluster discovery client.
//!
//! Two independent protocols live here: asking a discovery service for
//! the current membership list, and walking that list in order until a
//! node answers. Only transport-level failures (timeout, connection
//! error) advance the walk; a definitive HTTP or engine error on one
//! node is final for the whole attempt.

use crate::error::{Result, RqdocError};
use crate::transport::{Endpoint, RedirectEngine, RequestContext, Transport};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Discovery-service lookup plus ordered node failover, on top of an
/// injected [`Transport`].
pub struct DiscoveryClient<T: Transport> {
    engine: RedirectEngine<T>,
}

impl<T: Transport> DiscoveryClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            engine: RedirectEngine::new(transport),
        }
    }

    /// Fetches the cluster node list from a discovery service.
    ///
    /// The service must answer 200 with a JSON body holding a `nodes`
    /// array of `host:port` strings. Anything else is a contract
    /// violation: non-200 is [`RqdocError::CannotReachDiscovery`], an
    /// unparseable body is [`RqdocError::InvalidJson`], and a missing,
    /// non-array, or mixed-type `nodes` field is
    /// [`RqdocError::InvalidNodesArray`].
    pub async fn discover(&self, disco_url: &str, timeout: Duration) -> Result<Vec<String>> {
        let (endpoint, path) = Endpoint::split_url(disco_url)?;
        let ctx = RequestContext::get(endpoint, path, timeout, 0);
        let response = self.engine.transport().send(&ctx).await?;
        if response.status != 200 {
            return Err(RqdocError::CannotReachDiscovery(response.status));
        }
        let data: Value =
            serde_json::from_slice(&response.body).map_err(|_| RqdocError::InvalidJson)?;
        let nodes = parse_nodes(&data)?;
        info!(count = nodes.len(), "discovery service returned node list");
        Ok(nodes)
    }

    /// Walks `nodes` in discovery order, re-targeting `ctx` at each one
    /// until a node answers.
    ///
    /// The local endpoint is dropped from the list first; the failover
    /// loop must never call back into the node that just failed. The
    /// caller's list is consumed by value, so no caller ever observes it
    /// mutated. First success wins; a timeout or connection error
    /// discards the node and moves on; any other outcome is returned
    /// immediately.
    pub async fn try_nodes(
        &self,
        local: &Endpoint,
        nodes: Vec<String>,
        ctx: RequestContext,
    ) -> Result<Value> {
        let local_id = local.node_id();
        let mut remaining: VecDeque<String> =
            nodes.into_iter().filter(|n| *n != local_id).collect();
        if remaining.is_empty() {
            return Err(RqdocError::NoMoreNodes);
        }
        while let Some(node) = remaining.pop_front() {
            let endpoint = match ctx.endpoint.with_node(&node) {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    warn!(node = %node, error = %err, "skipping malformed node address");
                    continue;
                }
            };
            debug!(node = %node, "trying cluster node");
            match self.engine.request(ctx.with_endpoint(endpoint)).await {
                Ok(data) => return Ok(data),
                Err(err) if err.is_retryable() => {
                    debug!(node = %node, error = %err, "node unreachable, advancing");
                }
                Err(err) => return Err(err),
            }
        }
        Err(RqdocError::NoMoreNodes)
    }

    /// Discovery lookup followed by failover: the common recovery path
    /// when the configured node stops answering.
    pub async fn discover_and_try(
        &self,
        disco_url: &str,
        ctx: RequestContext,
    ) -> Result<Value> {
        let nodes = self.discover(disco_url, ctx.timeout).await?;
        let local = ctx.endpoint.clone();
        self.try_nodes(&local, nodes, ctx).await
    }
}

/// Extracts the `nodes` array, requiring every entry to be a string.
fn parse_nodes(data: &Value) -> Result<Vec<String>> {
    let nodes = data
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or(RqdocError::InvalidNodesArray)?;
    nodes
        .iter()
        .map(|n| {
            n.as_str()
                .map(String::from)
                .ok_or(RqdocError::InvalidNodesArray)
        })
        .collect()
}
