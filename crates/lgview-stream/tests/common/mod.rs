#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use lgview_model::{CommandRequest, Location};
use lgview_stream::{ByteStream, Transport, TransportError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub enum Script {
    Refuse(TransportError),
    Body(Vec<Result<Bytes, TransportError>>),
    Live(mpsc::UnboundedReceiver<Result<Bytes, TransportError>>),
}

/// Test-side handle that feeds a live response body.
pub struct Feeder {
    tx: Option<mpsc::UnboundedSender<Result<Bytes, TransportError>>>,
}

impl Feeder {
    pub fn chunk(&self, text: &str) {
        self.bytes(text.as_bytes());
    }

    pub fn bytes(&self, data: &[u8]) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Ok(Bytes::copy_from_slice(data)));
        }
    }

    pub fn error(&self, message: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Err(TransportError::Read(message.to_string())));
        }
    }

    pub fn end(&mut self) {
        self.tx = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub request: CommandRequest,
}

struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory transport that replays one script per `open` call.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<Call>>,
    open_streams: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn push_chunks(&self, chunks: &[&str]) {
        self.push(Script::Body(
            chunks
                .iter()
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
                .collect(),
        ));
    }

    pub fn push_live(&self) -> Feeder {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Script::Live(rx));
        Feeder { tx: Some(tx) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &str, request: &CommandRequest) -> Result<ByteStream, TransportError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            request: request.clone(),
        });

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script queued for this request");

        let items: ByteStream = match script {
            Script::Refuse(err) => return Err(err),
            Script::Body(items) => stream::iter(items).boxed(),
            Script::Live(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
        };

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        let guard = OpenGuard(Arc::clone(&self.open_streams));
        Ok(stream::unfold((items, guard), |(mut items, guard)| async move {
            items.next().await.map(|item| (item, (items, guard)))
        })
        .boxed())
    }
}

pub fn location(id: &str, url: &str) -> Location {
    Location {
        id: id.to_string(),
        name: id.to_uppercase(),
        url: url.to_string(),
    }
}
