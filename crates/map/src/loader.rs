//! Background fetches tied to the lifetime of the view that asked for them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use catalog::{GeoRecord, MemoryStore, StoreError};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("load was cancelled")]
    Cancelled,
    #[error("load task failed: {0}")]
    Panicked(String),
}

/// A spawned task that is aborted when dropped, so a torn-down view never
/// receives results it no longer wants.
#[derive(Debug)]
pub struct Pending<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Pending<T> {
    /// Must be called from inside a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }
}

impl<T> Pending<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| {
            joined.map_err(|err| {
                if err.is_cancelled() {
                    LoadError::Cancelled
                } else {
                    LoadError::Panicked(err.to_string())
                }
            })
        })
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("aborting pending load");
            self.handle.abort();
        }
    }
}

/// In-flight fetch of the visible memories.
#[derive(Debug)]
pub struct RecordLoad {
    pending: Pending<Result<Vec<GeoRecord>, StoreError>>,
}

impl RecordLoad {
    pub fn is_finished(&self) -> bool {
        self.pending.is_finished()
    }

    pub async fn finish(self) -> Result<Vec<GeoRecord>, LoadError> {
        let records = self.pending.await??;
        tracing::info!(records = records.len(), "memories loaded");
        Ok(records)
    }
}

/// Starts fetching every visible memory from `store`.
pub fn load_records(store: Arc<dyn MemoryStore>) -> RecordLoad {
    RecordLoad {
        pending: Pending::spawn(async move { store.list_visible_memories().await }),
    }
}
