pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod table;

pub use error::Error;
