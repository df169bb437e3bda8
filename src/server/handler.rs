// src/server/handler.rs
use futures::future::BoxFuture;
use hyper::header::HeaderValue;
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::load_balancer::Dispatcher;

const REQUEST_ID: &str = "x-request-id";

/// Per-connection service: every request on every path goes to the dispatcher.
#[derive(Clone)]
pub struct RequestHandler {
    dispatcher: Arc<Dispatcher>,
    peer: Option<SocketAddr>,
}

impl RequestHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            peer: None,
        }
    }

    pub fn for_peer(&self, peer: SocketAddr) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            peer: Some(peer),
        }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        let peer = self.peer;
        let request_id = ensure_request_id(&mut req);
        let span = tracing::info_span!(
            "request",
            %request_id,
            method = %req.method(),
            path = %req.uri().path()
        );

        Box::pin(async move { Ok(dispatcher.dispatch(req, peer).await) }.instrument(span))
    }
}

// Keeps a client-supplied id, otherwise mints one.
fn ensure_request_id(req: &mut Request<Body>) -> String {
    if let Some(existing) = req.headers().get(REQUEST_ID).and_then(|v| v.to_str().ok()) {
        return existing.to_string();
    }
    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(REQUEST_ID, value);
    }
    id
}
