pub mod query;
pub mod raw;

pub use query::{QueryParameters, QueryValue};
pub use raw::{DimensionValue, RawResult, ResultQuery, ResultRow};
