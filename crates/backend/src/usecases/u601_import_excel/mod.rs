pub mod errors;
pub mod executor;
pub mod reconciliation;
pub mod row_projector;

pub use errors::ImportError;
pub use executor::{ImportExecutor, ImportRequest, ImportSummary};
