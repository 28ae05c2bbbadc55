use tokio::sync::mpsc::UnboundedSender;

use super::{actions::BusyKey, actions::DeleteConfirmation, export::ExportOutcome};
use crate::{Error, api::Page, dataset::Dataset};

/// Results of background work, delivered back to the owning controller.
#[derive(Debug)]
pub enum TableEvent {
    PageLoaded {
        generation: u64,
        result: Result<Page, Error>,
    },
    SearchCommitted {
        seq: u64,
    },
    DeleteConfirmed(DeleteConfirmation),
    DeleteFinished {
        key: BusyKey,
        dataset: Dataset,
        record_id: String,
        result: Result<(), Error>,
    },
    ExportFinished {
        export_id: u64,
        result: Result<ExportOutcome, Error>,
    },
    RefreshRequested(Dataset),
}

/// Reports a task outcome when dropped, so the owner always hears back even if
/// the task panics or is aborted before finishing.
pub(crate) struct CompletionGuard<T, F>
where
    F: FnOnce(Result<T, Error>) -> TableEvent,
{
    tx: UnboundedSender<TableEvent>,
    wrap: Option<F>,
    outcome: Option<Result<T, Error>>,
}

impl<T, F> CompletionGuard<T, F>
where
    F: FnOnce(Result<T, Error>) -> TableEvent,
{
    pub(crate) fn new(tx: UnboundedSender<TableEvent>, wrap: F) -> Self {
        Self {
            tx,
            wrap: Some(wrap),
            outcome: None,
        }
    }

    pub(crate) fn complete(mut self, outcome: Result<T, Error>) {
        self.outcome = Some(outcome);
    }
}

impl<T, F> Drop for CompletionGuard<T, F>
where
    F: FnOnce(Result<T, Error>) -> TableEvent,
{
    fn drop(&mut self) {
        if let Some(wrap) = self.wrap.take() {
            let outcome = self.outcome.take().unwrap_or(Err(Error::Interrupted));
            let _ = self.tx.send(wrap(outcome));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refresh_on_ok(result: Result<(), Error>) -> TableEvent {
        match result {
            Ok(()) => TableEvent::RefreshRequested(Dataset::Integration),
            Err(_) => TableEvent::RefreshRequested(Dataset::Occurrence),
        }
    }

    #[test]
    fn completed_guard_sends_outcome() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let guard = CompletionGuard::new(tx, refresh_on_ok);
        guard.complete(Ok(()));
        assert!(matches!(
            rx.try_recv(),
            Ok(TableEvent::RefreshRequested(Dataset::Integration))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_guard_reports_interruption() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        drop(CompletionGuard::new(tx, refresh_on_ok));
        assert!(matches!(
            rx.try_recv(),
            Ok(TableEvent::RefreshRequested(Dataset::Occurrence))
        ));
    }
}
