pub mod config;
pub mod data;
pub mod i18n;
pub mod record_store;
pub mod spreadsheet;
