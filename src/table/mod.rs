//! The remote-backed table: query state, the fetch/cancel cycle, row actions,
//! export, the annotation popover and the refresh signal that ties them
//! together.

mod actions;
mod banner;
mod controller;
mod display;
mod event;
mod export;
mod fetch;
pub mod popover;
mod refresh;
mod search;
mod sort;

pub use actions::{BusyKey, DeleteConfirmation, EditRequest, RowActionController};
pub use banner::{Banner, BannerAction, BannerKind, BannerSlot, DEFAULT_BANNER_DURATION};
pub use controller::{ControllerOptions, TableController};
pub use display::{DisplayState, SKELETON_ROWS, TableBody};
pub use event::TableEvent;
pub use export::{ExportController, ExportOutcome, fallback_export_filename, save_export};
pub use fetch::FetchOrchestrator;
pub use popover::{
    Popover, PopoverGeometry, PopoverMetrics, Rect, Size, Viewport, ViewportHub, compute_geometry,
};
pub use refresh::{RefreshBus, RefreshSubscription};
pub use search::{DEFAULT_QUIET_PERIOD, SearchDebouncer};
pub use sort::SortState;
