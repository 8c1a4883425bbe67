//! Pure logic for the spreadsheet/text bulk importer.
//!
//! Nothing in this crate does I/O or needs an async runtime. Callers hand
//! in file bytes and get back normalized rows plus the preview model and
//! progress arithmetic the batch importer builds on.

pub mod error;
pub mod ingest;
pub mod messages;
pub mod normalizer;
pub mod preview;
pub mod progress;
pub mod row;
pub mod types;
