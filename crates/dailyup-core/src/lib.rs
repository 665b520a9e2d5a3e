//! DailyUp core library - report types, the store trait, and reconciliation logic.
//!
//! This crate contains no I/O and can be compiled for any target.

mod dateparse;
mod error;
mod report;
mod service;
pub mod stats;
mod store;
pub mod transfer;

pub use dateparse::{format_date, parse_iso_date, parse_report_date, today};
pub use error::{Error, ImportError};
pub use report::{deserialize_id, Mood, Report, ReportDraft, ReportFilter, ReportKind};
pub use service::ReportService;
pub use stats::{MoodPoint, Summary};
pub use store::ReportStore;
pub use transfer::{ExportArtifact, ExportFormat, ImportOutcome};
