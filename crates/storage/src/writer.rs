// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background writer that runs persistence tasks in submission order
//!
//! Each writer owns one worker thread driving a single-threaded tokio
//! runtime. Tasks are pulled from an unbounded FIFO channel and awaited one
//! at a time, so effects of earlier submissions are always complete before
//! later ones start. Producers only pay for a channel send.

use crate::archive::ArchiveError;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

/// Errors produced by the writer or by the tasks it runs
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("writer is closed")]
    Closed,
    #[error("backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },
    #[error("archive write failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("task '{task}' panicked")]
    TaskPanicked { task: String },
    #[error("failed to start writer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("writer worker stopped unexpectedly")]
    WorkerPanicked,
    #[error("{} write tasks failed", .0.len())]
    Multiple(Vec<WriteError>),
}

impl WriteError {
    /// Fold collected failures into a single result
    pub fn from_many(mut errors: Vec<WriteError>) -> Result<(), WriteError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(WriteError::Multiple(errors)),
        }
    }

    /// Flatten nested `Multiple` errors
    pub fn into_vec(self) -> Vec<WriteError> {
        match self {
            WriteError::Multiple(errors) => errors.into_iter().flat_map(Self::into_vec).collect(),
            other => vec![other],
        }
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), WriteError>> + Send + 'static>>;

/// A labelled unit of work executed on the writer thread
pub struct WriteTask {
    label: String,
    future: TaskFuture,
}

impl WriteTask {
    pub fn new<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<(), WriteError>> + Send + 'static,
    {
        Self {
            label: label.into(),
            future: Box::pin(future),
        }
    }

    /// Wrap blocking work, e.g. synchronous file I/O
    pub fn blocking<F>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Result<(), WriteError> + Send + 'static,
    {
        Self::new(label, async move { work() })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for WriteTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTask").field("label", &self.label).finish()
    }
}

/// Collects non-fatal failures reported by tasks
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    errors: Arc<Mutex<Vec<WriteError>>>,
}

impl ErrorSink {
    pub fn record(&self, error: WriteError) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(error);
    }

    pub fn take(&self) -> Vec<WriteError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Message {
    Run(WriteTask),
    Barrier(oneshot::Sender<()>),
}

/// Single background worker consuming a FIFO queue of write tasks
pub struct AsyncWriter {
    sender: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    errors: ErrorSink,
    pending: Arc<AtomicUsize>,
}

impl AsyncWriter {
    pub fn new() -> Result<Self, WriteError> {
        Self::named("el-writer")
    }

    /// Start a writer whose worker thread carries `name`
    pub fn named(name: &str) -> Result<Self, WriteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WriteError::Spawn)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let errors = ErrorSink::default();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = {
            let errors = errors.clone();
            let pending = Arc::clone(&pending);
            std::thread::Builder::new()
                .name(name.to_string())
                .spawn(move || runtime.block_on(drain(rx, errors, pending)))
                .map_err(WriteError::Spawn)?
        };

        tracing::debug!(name, "writer started");
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            errors,
            pending,
        })
    }

    /// Queue a task behind everything submitted before it
    pub fn submit(&self, task: WriteTask) -> Result<(), WriteError> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = sender.as_ref() else {
            return Err(WriteError::Closed);
        };
        tracing::trace!(task = task.label(), "submitting");
        self.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send(Message::Run(task)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(WriteError::Closed);
        }
        Ok(())
    }

    /// Block until every task submitted before this call has finished
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(&self) -> Result<(), WriteError> {
        let (done_tx, done_rx) = oneshot::channel();
        {
            let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            let Some(tx) = sender.as_ref() else {
                return Err(WriteError::Closed);
            };
            tx.send(Message::Barrier(done_tx))
                .map_err(|_| WriteError::Closed)?;
        }
        done_rx.blocking_recv().map_err(|_| WriteError::WorkerPanicked)
    }

    /// Tasks submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Handle tasks use to report failures that should not abort them
    pub fn errors(&self) -> ErrorSink {
        self.errors.clone()
    }

    /// Drain failures recorded so far
    pub fn take_errors(&self) -> Vec<WriteError> {
        self.errors.take()
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Run every queued task, stop the worker and report failures
    ///
    /// Further submissions fail with [`WriteError::Closed`]. Calling close
    /// again only reports failures recorded since the last call.
    pub fn close(&self) -> Result<(), WriteError> {
        // Dropping the sender ends the worker loop once the queue is empty
        drop(
            self.sender
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take(),
        );

        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = worker {
            if handle.thread().id() == std::thread::current().id() {
                tracing::warn!("writer closed from its own worker; not joining");
            } else if handle.join().is_err() {
                self.errors.record(WriteError::WorkerPanicked);
            } else {
                tracing::debug!("writer stopped");
            }
        }

        WriteError::from_many(self.errors.take())
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "writer dropped with failed tasks");
        }
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<Message>,
    errors: ErrorSink,
    pending: Arc<AtomicUsize>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Run(WriteTask { label, future }) => {
                let span = tracing::debug_span!("writer.task", task = %label);
                let start = Instant::now();
                // Spawning isolates panics; awaiting keeps strict ordering
                let outcome = tokio::spawn(future.instrument(span)).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;

                match outcome {
                    Ok(Ok(())) => tracing::debug!(task = %label, elapsed_ms, "task done"),
                    Ok(Err(e)) => {
                        tracing::warn!(task = %label, elapsed_ms, error = %e, "task failed");
                        errors.record(e);
                    }
                    Err(join_error) => {
                        tracing::error!(task = %label, error = %join_error, "task panicked");
                        errors.record(WriteError::TaskPanicked { task: label });
                    }
                }
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            Message::Barrier(done) => {
                // Receiver may have given up waiting
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
