//! Scripted stream halves for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tonic::{Code, Status};

use crate::transport::{MessageReader, MessageWriter};

/// Reader that replays a fixed list of messages, then ends with a status.
pub(crate) struct ScriptedReader<T> {
    items: VecDeque<T>,
    code: Code,
    message: String,
    gate: Option<oneshot::Receiver<()>>,
    pending: bool,
    finishes: Arc<AtomicUsize>,
}

impl<T> ScriptedReader<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
            code: Code::Ok,
            message: String::new(),
            gate: None,
            pending: false,
            finishes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_status(mut self, status: Status) -> Self {
        self.code = status.code();
        self.message = status.message().to_string();
        self
    }

    /// Holds the first read until the gate fires or is dropped.
    pub(crate) fn gated(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Never ends after the scripted messages ran out.
    pub(crate) fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    pub(crate) fn finishes(&self) -> Arc<AtomicUsize> {
        self.finishes.clone()
    }
}

#[async_trait]
impl<T: Send + 'static> MessageReader<T> for ScriptedReader<T> {
    async fn read(&mut self) -> Option<T> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.await;
        }
        if let Some(item) = self.items.pop_front() {
            return Some(item);
        }
        if self.pending {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn finish(&mut self) -> Status {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        Status::new(self.code, self.message.clone())
    }
}

/// Shared view of everything a [`RecordingWriter`] saw.
pub(crate) struct WriteLog<T> {
    writes: Arc<Mutex<Vec<T>>>,
    done: Arc<AtomicUsize>,
}

impl<T: Clone> WriteLog<T> {
    pub(crate) fn writes(&self) -> Vec<T> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn writes_done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }
}

pub(crate) struct RecordingWriter<T> {
    writes: Arc<Mutex<Vec<T>>>,
    done: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl<T> RecordingWriter<T> {
    pub(crate) fn new() -> Self {
        Self {
            writes: Arc::new(Mutex::new(Vec::new())),
            done: Arc::new(AtomicUsize::new(0)),
            limit: None,
        }
    }

    /// Rejects every write after the first `limit`.
    pub(crate) fn accepting(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn log(&self) -> WriteLog<T> {
        WriteLog {
            writes: self.writes.clone(),
            done: self.done.clone(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> MessageWriter<T> for RecordingWriter<T> {
    async fn write(&mut self, message: T) -> bool {
        let mut writes = self.writes.lock().unwrap();
        if self.limit.is_some_and(|limit| writes.len() >= limit) {
            return false;
        }
        writes.push(message);
        true
    }

    async fn writes_done(&mut self) -> bool {
        self.done.fetch_add(1, Ordering::SeqCst);
        true
    }
}
