// src/testing.rs
use crate::load_balancer::Dispatcher;
use crate::proxy::{Backend, BackendPool};
use async_trait::async_trait;
use hyper::{Body, Request, Response};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory backend: answers with its own name and counts probes and forwards.
pub(crate) struct MockBackend {
    name: String,
    alive: AtomicBool,
    probes: AtomicUsize,
    served: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn new(name: &str, alive: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            alive: AtomicBool::new(alive),
            probes: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn address(&self) -> &str {
        &self.name
    }

    async fn is_alive(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.alive.load(Ordering::SeqCst)
    }

    async fn forward(&self, _req: Request<Body>, _client_addr: Option<SocketAddr>) -> Response<Body> {
        self.served.fetch_add(1, Ordering::SeqCst);
        Response::new(Body::from(self.name.clone()))
    }
}

pub(crate) fn dispatcher(backends: &[(&str, bool)]) -> (Dispatcher, Vec<Arc<MockBackend>>) {
    let mocks: Vec<Arc<MockBackend>> = backends
        .iter()
        .map(|(name, alive)| MockBackend::new(name, *alive))
        .collect();
    let pool = BackendPool::new(
        mocks
            .iter()
            .map(|m| m.clone() as Arc<dyn Backend>)
            .collect(),
    )
    .expect("non-empty backend list");
    (Dispatcher::new(pool), mocks)
}

pub(crate) async fn body_text(response: Response<Body>) -> String {
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
