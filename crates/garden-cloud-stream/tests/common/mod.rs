//! Scripted in-memory ingestion client shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use garden_cloud_stream::{
    AckStream, Acknowledgement, IngestionClient, OutboundStream, StreamError, Tracked, Ulid,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct TestItem(pub Ulid);

impl Tracked for TestItem {
    fn ulid(&self) -> Ulid {
        self.0
    }
}

pub fn item(n: u64) -> TestItem {
    TestItem(Ulid::from_parts(n, 0))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// What the next `open` call does.
pub enum Step {
    Accept,
    Fail(StreamError),
}

/// One accepted connection, seen from the server side.
pub struct Connection<T> {
    pub outbound: OutboundStream<T>,
    pub acks: mpsc::UnboundedSender<Result<Acknowledgement, StreamError>>,
}

impl<T: Send + 'static> Connection<T> {
    /// Next item written by the stream, failing the test after a while.
    pub async fn next_item(&mut self) -> T {
        tokio::time::timeout(Duration::from_secs(30), self.outbound.next())
            .await
            .expect("timed out waiting for an outbound item")
            .expect("outbound stream ended")
    }

    pub async fn take(&mut self, n: usize) -> Vec<T> {
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(self.next_item().await);
        }
        items
    }

    pub fn ack(&self, ack: Acknowledgement) {
        self.acks.send(Ok(ack)).expect("ack loop is gone");
    }
}

pub struct ScriptedClient<T> {
    script: Mutex<VecDeque<Step>>,
    /// Step used once the script runs out.
    fallback: fn() -> Step,
    connections: mpsc::UnboundedSender<Connection<T>>,
    attempts: Arc<AtomicUsize>,
}

pub struct Harness<T> {
    pub connections: mpsc::UnboundedReceiver<Connection<T>>,
    pub attempts: Arc<AtomicUsize>,
}

impl<T> Harness<T> {
    pub async fn next_connection(&mut self) -> Connection<T> {
        tokio::time::timeout(Duration::from_secs(30), self.connections.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("client dropped")
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

pub fn unavailable() -> StreamError {
    StreamError::Rpc(tonic::Status::unavailable("ingestion offline"))
}

impl<T> ScriptedClient<T> {
    /// Accepts every connection attempt after running through `script`.
    pub fn new(script: Vec<Step>) -> (Self, Harness<T>) {
        Self::build(script, || Step::Accept)
    }

    /// Never accepts a connection.
    pub fn offline() -> (Self, Harness<T>) {
        Self::build(vec![], || Step::Fail(unavailable()))
    }

    fn build(script: Vec<Step>, fallback: fn() -> Step) -> (Self, Harness<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script: Mutex::new(script.into()),
                fallback,
                connections: tx,
                attempts: attempts.clone(),
            },
            Harness {
                connections: rx,
                attempts,
            },
        )
    }
}

#[async_trait]
impl<T: Tracked> IngestionClient<T> for ScriptedClient<T> {
    async fn open(&self, outbound: OutboundStream<T>) -> Result<AckStream, StreamError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback);

        match step {
            Step::Fail(e) => Err(e),
            Step::Accept => {
                let (acks, rx) = mpsc::unbounded_channel();
                let _ = self.connections.send(Connection { outbound, acks });
                Ok(UnboundedReceiverStream::new(rx).boxed())
            }
        }
    }
}

/// Poll `condition` until it holds, failing the test after a while.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..3000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
