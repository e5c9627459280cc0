pub mod response;

pub use response::{ImportAction, ImportErrorKind, ImportErrorResponse, ImportOutcome, ImportResponse};
