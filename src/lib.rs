pub mod adapt;
pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod key;
pub mod models;
pub mod period;
pub mod report;
pub mod transport;

pub use client::{MetrikaClient, ReportResponse};
pub use error::ReportError;
pub use report::ReportKind;
