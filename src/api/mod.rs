mod client;
mod disposition;
mod query;
mod request;
mod wire;

pub use client::{ApiClient, ExportPayload, RecordsBackend};
pub use disposition::filename_from_disposition;
pub use query::{ExportQuery, QueryDescriptor, SortDirection, SortSpec};
pub use request::send_request;
pub use wire::{HealthStatus, Page, Record, error_message, value_text};
