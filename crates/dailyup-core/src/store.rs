use crate::{Error, Report, ReportDraft};

/// Persistence abstraction implemented by the local and the hosted backend.
///
/// Uses `async_trait` with `?Send` bound, so a single-threaded runtime can
/// drive either backend and implementations may hold non-`Send` handles.
#[async_trait::async_trait(?Send)]
pub trait ReportStore {
    /// All reports, in the backend's presentation order.
    async fn list(&self) -> Result<Vec<Report>, Error>;

    /// Persist a new report. The store assigns `id` and `created_at`.
    async fn create(&self, draft: ReportDraft) -> Result<Report, Error>;

    /// Replace every editable field of an existing report.
    /// Returns `None` if the store decided to ignore an unknown id.
    async fn update(&self, id: &str, draft: ReportDraft) -> Result<Option<Report>, Error>;

    /// Delete a report by ID. Returns true if deleted, false if not found.
    async fn delete(&self, id: &str) -> Result<bool, Error>;

    /// Add already reconciled reports ahead of the existing ones in one write.
    /// Returns how many records were written.
    async fn merge(&self, reports: Vec<Report>) -> Result<usize, Error>;
}
