use std::sync::Arc;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

use super::TableEvent;
use crate::{
    api::{QueryDescriptor, RecordsBackend},
    dataset::Dataset,
};

/// Keeps at most one list request alive and tags each with a generation so a
/// superseded response can never be applied.
#[derive(Default)]
pub struct FetchOrchestrator {
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl FetchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Cancel whatever is outstanding and start a fetch for `query`.
    pub fn issue(
        &mut self,
        backend: Arc<dyn RecordsBackend>,
        dataset: Dataset,
        query: QueryDescriptor,
        tx: &UnboundedSender<TableEvent>,
    ) -> u64 {
        self.cancel();
        let generation = self.generation;
        tracing::debug!(
            dataset = %dataset,
            generation,
            page = query.page,
            page_size = query.page_size,
            sort = ?query.sort,
            search = %query.search,
            "fetch_issue"
        );
        let tx = tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = backend.list(dataset, &query).await;
            let _ = tx.send(TableEvent::PageLoaded { generation, result });
        }));
        generation
    }

    /// Abort the outstanding request. Anything it already queued turns stale.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.in_flight.take() {
            Some(task) => {
                task.abort();
                tracing::trace!(generation = self.generation, "fetch_cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a result tagged `generation` may be applied. Accepting it
    /// clears the in-flight slot.
    pub fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            tracing::trace!(generation, current = self.generation, "stale_page_dropped");
            return false;
        }
        self.in_flight = None;
        true
    }
}

impl Drop for FetchOrchestrator {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
