use std::{path::PathBuf, sync::Arc, time::Duration};

use humansize::{DECIMAL, format_size};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::{
    BannerAction, BannerKind, BannerSlot, DeleteConfirmation, DisplayState, EditRequest,
    ExportController, FetchOrchestrator, RefreshBus, RefreshSubscription, RowActionController,
    SearchDebouncer, SortState, TableEvent,
};
use crate::{
    api::{QueryDescriptor, Record, RecordsBackend},
    config::Config,
    dataset::{Dataset, DatasetDefinition},
    error::{DELETE_FAILED_MESSAGE, EXPORT_FAILED_MESSAGE, LIST_FAILED_MESSAGE},
};

const DELETE_SUCCESS_MESSAGE: &str = "Registro removido com sucesso.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub banner_duration: Duration,
    pub export_dir: PathBuf,
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            search_debounce: config.search_debounce,
            banner_duration: config.banner_duration,
            export_dir: config.export_dir.clone(),
        }
    }
}

/// Drives one server-paginated table. Every mutation goes through `&mut self`
/// on a single event loop; background work reports back as [`TableEvent`]s
/// that must be fed to [`TableController::handle_event`].
pub struct TableController {
    backend: Arc<dyn RecordsBackend>,
    options: ControllerOptions,
    dataset: Dataset,
    page: u32,
    sort: SortState,
    search: SearchDebouncer,
    fetch: FetchOrchestrator,
    display: DisplayState,
    actions: RowActionController,
    export: ExportController,
    banner: BannerSlot,
    refresh_bus: RefreshBus,
    refresh: RefreshSubscription,
    tx: UnboundedSender<TableEvent>,
    rx: UnboundedReceiver<TableEvent>,
    shut_down: bool,
}

impl TableController {
    pub fn new(
        backend: Arc<dyn RecordsBackend>,
        dataset: Dataset,
        options: ControllerOptions,
        refresh_bus: RefreshBus,
        edit_tx: UnboundedSender<EditRequest>,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        let page_size = options.page_size.max(1);
        Self {
            backend,
            dataset,
            page: 1,
            sort: SortState::default(),
            search: SearchDebouncer::new(options.search_debounce),
            fetch: FetchOrchestrator::new(),
            display: DisplayState::new(page_size),
            actions: RowActionController::new(edit_tx),
            export: ExportController::new(options.export_dir.clone()),
            banner: BannerSlot::new(options.banner_duration),
            refresh: refresh_bus.subscribe(dataset),
            refresh_bus,
            options: ControllerOptions {
                page_size,
                ..options
            },
            tx,
            rx,
            shut_down: false,
        }
    }

    /// Issue the first fetch.
    pub fn start(&mut self) {
        self.issue_fetch();
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn definition(&self) -> &'static DatasetDefinition {
        self.dataset.definition()
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn raw_search(&self) -> &str {
        self.search.raw()
    }

    pub fn committed_search(&self) -> &str {
        self.search.committed()
    }

    pub fn is_filtering(&self) -> bool {
        !self.search.committed().is_empty()
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_exporting()
    }

    pub fn is_busy(&self, record: &Record) -> bool {
        record
            .id()
            .is_some_and(|id| self.actions.is_busy(&super::BusyKey::new(self.dataset, &id)))
    }

    pub fn banner(&self) -> Option<&super::Banner> {
        self.banner.current()
    }

    pub fn refresh_bus(&self) -> &RefreshBus {
        &self.refresh_bus
    }

    /// Channel for collaborators (confirmation popups) that answer later.
    pub fn sender(&self) -> UnboundedSender<TableEvent> {
        self.tx.clone()
    }

    /// The descriptor the next fetch would use.
    pub fn query(&self) -> QueryDescriptor {
        QueryDescriptor {
            page: self.page,
            page_size: self.options.page_size,
            sort: Some(self.sort.effective(&self.definition().default_sort)),
            search: self.search.committed().to_string(),
        }
    }

    /// Switch to another dataset. Page, sort and search are reset before the
    /// new fetch goes out. Selecting the current dataset does nothing.
    pub fn switch_dataset(&mut self, dataset: Dataset) -> bool {
        if dataset == self.dataset {
            return false;
        }
        tracing::info!(from = %self.dataset, to = %dataset, "dataset_switch");
        self.fetch.cancel();
        self.search.reset();
        self.sort.reset();
        self.page = 1;
        self.dataset = dataset;
        self.display = DisplayState::new(self.options.page_size);
        self.refresh.rekey(dataset);
        self.issue_fetch();
        true
    }

    /// Advance the sort on `column_key`. Columns that are not sortable are
    /// ignored.
    pub fn toggle_sort(&mut self, column_key: &str) -> bool {
        let Some(field) = self
            .definition()
            .column(column_key)
            .and_then(|column| column.sort_field())
        else {
            return false;
        };
        self.sort.toggle(field);
        self.page = 1;
        self.issue_fetch();
        true
    }

    pub fn input_search(&mut self, text: impl Into<String>) {
        self.search.input(text, &self.tx);
    }

    pub fn next_page(&mut self) -> bool {
        if !self.display.can_next() {
            return false;
        }
        self.go_to_page(self.display.page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.display.can_previous() {
            return false;
        }
        self.go_to_page(self.display.page - 1)
    }

    /// Request `page`. The server may clamp it; the page it answers with is
    /// adopted without another request.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        if page == self.page && !self.display.loading && self.display.error.is_none() {
            return false;
        }
        self.page = page;
        self.issue_fetch();
        true
    }

    /// Reload with the current page, sort and search.
    pub fn refresh(&mut self) {
        self.issue_fetch();
    }

    pub fn edit(&self, record: &Record) -> bool {
        self.actions.edit(self.dataset, record)
    }

    /// First half of a delete. `None` when nothing should be confirmed.
    pub fn request_delete(&self, record: &Record) -> Option<DeleteConfirmation> {
        self.actions.request_delete(self.dataset, record)
    }

    pub fn confirm_delete(&mut self, confirmation: DeleteConfirmation) -> bool {
        self.actions
            .delete(Arc::clone(&self.backend), confirmation, &self.tx)
    }

    /// Export the whole filtered set with the current sort.
    pub fn export(&mut self) -> bool {
        let query = self.query().export_query();
        self.export
            .start(Arc::clone(&self.backend), self.dataset, query, &self.tx)
    }

    /// Show a banner for something that happened outside the controller.
    pub fn notify(&mut self, kind: BannerKind, message: impl Into<String>) {
        self.banner.show(kind, message);
    }

    pub fn dismiss_banner(&mut self) -> bool {
        self.banner.dismiss()
    }

    pub fn prune_banner(&mut self, now: tokio::time::Instant) -> bool {
        self.banner.prune(now)
    }

    /// Wait for the next piece of background work or refresh signal.
    pub async fn next_event(&mut self) -> TableEvent {
        tokio::select! {
            Some(event) = self.rx.recv() => event,
            dataset = self.refresh.recv() => TableEvent::RefreshRequested(dataset),
        }
    }

    /// Apply an event. Returns whether anything visible changed.
    pub fn handle_event(&mut self, event: TableEvent) -> bool {
        // Aborted tasks still report through their guards.
        if self.shut_down {
            tracing::trace!(?event, "event_after_shutdown");
            return false;
        }
        match event {
            TableEvent::PageLoaded { generation, result } => {
                if !self.fetch.accept(generation) {
                    return false;
                }
                match result {
                    Ok(page) => {
                        if page.page != self.page {
                            tracing::debug!(requested = self.page, served = page.page, "page_adopted");
                            self.page = page.page;
                        }
                        self.display.apply_page(page);
                    }
                    Err(err) => {
                        tracing::warn!(dataset = %self.dataset, error = %err, "fetch_failed");
                        self.display.apply_error(err.user_message(LIST_FAILED_MESSAGE));
                    }
                }
                true
            }
            TableEvent::SearchCommitted { seq } => match self.search.commit(seq) {
                Some(term) => {
                    tracing::debug!(search = %term, "search_committed");
                    self.page = 1;
                    self.issue_fetch();
                    true
                }
                None => false,
            },
            TableEvent::DeleteConfirmed(confirmation) => self.confirm_delete(confirmation),
            TableEvent::DeleteFinished {
                key,
                dataset,
                record_id,
                result,
            } => {
                self.actions.release(&key);
                match result {
                    Ok(()) => {
                        tracing::info!(dataset = %dataset, record_id = %record_id, "record_deleted");
                        self.banner.show(BannerKind::Success, DELETE_SUCCESS_MESSAGE);
                        self.refresh_bus.publish(dataset);
                    }
                    Err(err) => {
                        tracing::warn!(dataset = %dataset, record_id = %record_id, error = %err, "delete_failed");
                        self.banner
                            .show(BannerKind::Error, err.user_message(DELETE_FAILED_MESSAGE));
                    }
                }
                true
            }
            TableEvent::ExportFinished { export_id, result } => {
                if !self.export.finish(export_id) {
                    return false;
                }
                match result {
                    Ok(outcome) => {
                        let message = format!(
                            "Exportado para {} ({})",
                            outcome.path.display(),
                            format_size(outcome.bytes, DECIMAL)
                        );
                        self.banner.show_with_action(
                            BannerKind::Success,
                            message,
                            Some(BannerAction::copy_path('c', outcome.path)),
                        );
                    }
                    Err(err) => {
                        tracing::warn!(dataset = %self.dataset, error = %err, "export_failed");
                        self.banner
                            .show(BannerKind::Error, err.user_message(EXPORT_FAILED_MESSAGE));
                    }
                }
                true
            }
            TableEvent::RefreshRequested(dataset) => {
                if dataset != self.dataset {
                    return false;
                }
                self.issue_fetch();
                true
            }
        }
    }

    /// Cancel everything in flight. Events that arrive afterwards are dropped.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        self.fetch.cancel();
        self.search.cancel();
        self.actions.cancel_all();
        self.export.cancel();
        self.banner.dismiss();
        self.display.loading = false;
    }

    fn issue_fetch(&mut self) {
        let query = self.query();
        self.display.loading = true;
        self.fetch
            .issue(Arc::clone(&self.backend), self.dataset, query, &self.tx);
    }
}
