#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use rqdoc::{RawResponse, RequestContext, Result, RqdocError, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Outcome {
    Respond(RawResponse),
    Timeout,
    Network(String),
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<RequestContext>>,
}

/// Scripted transport double: pops one canned outcome per send and
/// records every context it saw. Clones share the script, so a handle
/// kept by the test still sees calls made through the engine.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, outcome: Outcome) -> Self {
        self.inner.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Outcome::Respond(RawResponse {
            status,
            body: Bytes::copy_from_slice(body.as_bytes()),
            location: None,
        }))
    }

    pub fn redirect(self, location: &str) -> Self {
        self.push(Outcome::Respond(RawResponse {
            status: 301,
            body: Bytes::new(),
            location: Some(location.to_string()),
        }))
    }

    pub fn redirect_without_location(self) -> Self {
        self.push(Outcome::Respond(RawResponse {
            status: 301,
            body: Bytes::new(),
            location: None,
        }))
    }

    pub fn timeout(self) -> Self {
        self.push(Outcome::Timeout)
    }

    pub fn network_error(self, message: &str) -> Self {
        self.push(Outcome::Network(message.to_string()))
    }

    pub fn calls(&self) -> Vec<RequestContext> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, ctx: &RequestContext) -> Result<RawResponse> {
        self.inner.calls.lock().unwrap().push(ctx.clone());
        match self.inner.script.lock().unwrap().pop_front() {
            Some(Outcome::Respond(response)) => Ok(response),
            Some(Outcome::Timeout) => Err(RqdocError::Timeout),
            Some(Outcome::Network(message)) => Err(RqdocError::Network(message)),
            None => panic!(
                "unscripted request: {:?} {}{}",
                ctx.method, ctx.endpoint, ctx.path
            ),
        }
    }
}
