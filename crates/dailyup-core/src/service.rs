use chrono::{NaiveDate, NaiveDateTime};

use crate::dateparse::{format_date, parse_iso_date};
use crate::stats::Summary;
use crate::transfer::{
    export_file_name, export_json, export_markdown, plan_import, select, ExportArtifact,
    ExportFormat, ImportOutcome,
};
use crate::{Error, Report, ReportDraft, ReportFilter, ReportStore};

/// The main service that contains all business logic.
/// Generic over the store implementation, chosen when the service is built.
pub struct ReportService<S: ReportStore> {
    store: S,
}

impl<S: ReportStore> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All reports in store order.
    pub async fn list(&self) -> Result<Vec<Report>, Error> {
        self.store.list().await
    }

    /// Like [`list`](Self::list), but a failing backend yields an empty list.
    /// The failure is logged so it stays visible.
    pub async fn list_or_empty(&self) -> Vec<Report> {
        match self.store.list().await {
            Ok(reports) => reports,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load reports, showing none");
                Vec::new()
            }
        }
    }

    /// Reports matching the filter, in store order.
    pub async fn list_filtered(&self, filter: &ReportFilter) -> Result<Vec<Report>, Error> {
        let reports = self.store.list().await?;
        Ok(reports.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Get a report by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Report>, Error> {
        let reports = self.store.list().await?;
        Ok(reports.into_iter().find(|r| r.id == id))
    }

    /// Create a report when `id` is `None`, otherwise replace the report with that id.
    ///
    /// Returns `None` when the store ignored an update to an unknown id.
    pub async fn save(
        &self,
        id: Option<&str>,
        draft: ReportDraft,
    ) -> Result<Option<Report>, Error> {
        match id {
            None => self.create(draft).await.map(Some),
            Some(id) => self.update(id, draft).await,
        }
    }

    /// Add a new report.
    pub async fn create(&self, draft: ReportDraft) -> Result<Report, Error> {
        let draft = normalize_draft(draft)?;
        self.store.create(draft).await
    }

    /// Replace every editable field of an existing report.
    pub async fn update(&self, id: &str, draft: ReportDraft) -> Result<Option<Report>, Error> {
        if id.trim().is_empty() {
            return Err(Error::Validation("id cannot be empty".into()));
        }
        let draft = normalize_draft(draft)?;
        let updated = self.store.update(id, draft).await?;
        if updated.is_none() {
            tracing::debug!(id, "update ignored, no report with that id");
        }
        Ok(updated)
    }

    /// Delete a report by ID.
    pub async fn delete(&self, id: &str) -> Result<bool, Error> {
        self.store.delete(id).await
    }

    /// Render the selected reports (all of them when `ids` is `None`).
    pub async fn export(
        &self,
        ids: Option<&[String]>,
        format: ExportFormat,
        now: NaiveDateTime,
    ) -> Result<ExportArtifact, Error> {
        let reports = self.store.list().await?;
        let selected = match ids {
            Some(ids) => select(&reports, ids),
            None => reports,
        };
        if selected.is_empty() {
            return Err(Error::Validation("no reports selected for export".into()));
        }

        let contents = match format {
            ExportFormat::Json => export_json(&selected)?,
            ExportFormat::Markdown => export_markdown(&selected, now),
        };

        Ok(ExportArtifact {
            file_name: export_file_name(format, now.date()),
            format,
            count: selected.len(),
            contents,
        })
    }

    /// Merge a JSON payload into the store without touching existing ids.
    pub async fn import_json(&self, payload: &str) -> Result<ImportOutcome, Error> {
        let existing = self.store.list().await?;
        let plan = plan_import(&existing, payload)?;
        let outcome = plan.outcome();

        if !plan.admitted.is_empty() {
            let written = self.store.merge(plan.admitted).await?;
            tracing::info!(
                written,
                duplicates = outcome.duplicates,
                invalid = outcome.invalid,
                "imported reports"
            );
        }

        Ok(outcome)
    }

    /// Aggregate statistics as seen on `today`.
    pub async fn summary(&self, today: NaiveDate) -> Result<Summary, Error> {
        let reports = self.store.list().await?;
        Ok(Summary::compute(&reports, today))
    }
}

/// Trim items and drop the blank ones.
pub(crate) fn clean_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize_draft(draft: ReportDraft) -> Result<ReportDraft, Error> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::Validation("title cannot be empty".into()));
    }

    if draft.content.trim().is_empty() {
        return Err(Error::Validation("content cannot be empty".into()));
    }

    let date = parse_iso_date(&draft.date)
        .map(format_date)
        .ok_or_else(|| Error::Validation(format!("invalid date: {:?}", draft.date)))?;

    Ok(ReportDraft {
        kind: draft.kind,
        date,
        title,
        content: draft.content.trim_end().to_string(),
        achievements: clean_items(draft.achievements),
        plans: clean_items(draft.plans),
        issues: draft
            .issues
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        mood: draft.mood,
    })
}
