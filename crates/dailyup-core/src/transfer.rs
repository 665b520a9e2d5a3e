//! Export and import of report sets.
//!
//! Exports serialize a selection of reports to JSON or to a Markdown document.
//! Imports reconcile a JSON payload against the reports already stored: a
//! record whose id is already present is never overwritten or duplicated.

use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::dateparse::{format_date, parse_iso_date};
use crate::service::clean_items;
use crate::{Error, ImportError, Report};

/// Interchange format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Markdown => f.write_str("markdown"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(Error::Validation(format!("unknown export format: {}", other))),
        }
    }
}

/// A rendered export, ready to be written wherever the caller wants it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    /// Number of reports rendered.
    pub count: usize,
    pub contents: String,
}

/// File name for an export made on `date`, e.g. `DailyUp_reports_2026-10-17.json`.
pub fn export_file_name(format: ExportFormat, date: chrono::NaiveDate) -> String {
    format!("DailyUp_reports_{}.{}", format_date(date), format.extension())
}

/// Pick the reports whose id is in `ids`, keeping store order.
/// Unknown ids are ignored.
pub fn select(reports: &[Report], ids: &[String]) -> Vec<Report> {
    let wanted: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
    reports
        .iter()
        .filter(|r| wanted.contains(r.id.as_str()))
        .cloned()
        .collect()
}

/// Serialize reports verbatim as a pretty-printed JSON array.
pub fn export_json(reports: &[Report]) -> Result<String, Error> {
    serde_json::to_string_pretty(reports)
        .map_err(|e| Error::Parse(format!("Failed to serialize reports: {}", e)))
}

/// Render reports as a Markdown document.
pub fn export_markdown(reports: &[Report], exported_at: NaiveDateTime) -> String {
    let mut out = String::from("# DailyUp work reports\n\n");
    out.push_str(&format!(
        "> Exported at: {}\n\n",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str("---\n\n");

    for (index, report) in reports.iter().enumerate() {
        out.push_str(&format!(
            "## {}. {} - {}\n\n",
            index + 1,
            report.kind.label(),
            report.title
        ));
        out.push_str(&format!("**Date:** {}\n\n", long_date(&report.date)));

        if let Some(mood) = report.mood {
            out.push_str(&format!("**Mood:** {}\n\n", mood.label()));
        }

        out.push_str("### 💼 Work content\n\n");
        out.push_str(&format!("{}\n\n", report.content));

        push_list(&mut out, "### ✨ Achievements", &report.achievements);
        push_list(&mut out, "### 📋 Next plans", &report.plans);

        if let Some(issues) = report.issues.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str("### ⚠️ Issues\n\n");
            out.push_str(&format!("{}\n\n", issues));
        }

        out.push_str("---\n\n");
    }

    out
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .collect();
    if items.is_empty() {
        return;
    }

    out.push_str(heading);
    out.push_str("\n\n");
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn long_date(date: &str) -> String {
    match parse_iso_date(date) {
        Some(d) => d.format("%A, %B %-d, %Y").to_string(),
        None => date.to_string(),
    }
}

/// What an import did, by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Records written to the store.
    pub admitted: usize,
    /// Records skipped because their id is already taken.
    pub duplicates: usize,
    /// Records skipped because they are malformed.
    pub invalid: usize,
}

impl ImportOutcome {
    pub fn total(&self) -> usize {
        self.admitted + self.duplicates + self.invalid
    }
}

/// The result of reconciling a payload, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    /// Records to prepend, in payload order.
    pub admitted: Vec<Report>,
    pub duplicates: usize,
    pub invalid: usize,
}

impl ImportPlan {
    pub fn outcome(&self) -> ImportOutcome {
        ImportOutcome {
            admitted: self.admitted.len(),
            duplicates: self.duplicates,
            invalid: self.invalid,
        }
    }
}

/// Reconcile a JSON payload against the reports already in the store.
///
/// Fails only when the payload as a whole is unusable; individual bad records
/// are counted in the plan.
pub fn plan_import(existing: &[Report], payload: &str) -> Result<ImportPlan, Error> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ImportError::InvalidFormat(format!("not valid JSON: {}", e)))?;

    let candidates = match value {
        Value::Array(items) => items,
        other => {
            return Err(ImportError::InvalidFormat(format!(
                "expected a JSON array of reports, got {}",
                json_kind(&other)
            ))
            .into())
        }
    };

    let mut seen: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
    let mut plan = ImportPlan::default();

    for candidate in candidates {
        let mut report = match eligible(candidate) {
            Some(report) => report,
            None => {
                plan.invalid += 1;
                continue;
            }
        };

        if !seen.insert(report.id.clone()) {
            plan.duplicates += 1;
            continue;
        }

        report.achievements = clean_items(report.achievements);
        report.plans = clean_items(report.plans);
        plan.admitted.push(report);
    }

    tracing::debug!(
        admitted = plan.admitted.len(),
        duplicates = plan.duplicates,
        invalid = plan.invalid,
        "planned import"
    );

    Ok(plan)
}

/// A candidate is eligible when it carries a non-empty `id`, `title` and
/// `content`. Every other field is read leniently and passed through.
fn eligible(candidate: Value) -> Option<Report> {
    let object = candidate.as_object()?;

    let has_id = match object.get("id") {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    let has_text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    };
    if !has_id || !has_text("title") || !has_text("content") {
        return None;
    }

    serde_json::from_value(candidate).ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mood, ReportKind};
    use chrono::NaiveDate;
    use serde_json::json;

    fn report(id: &str, title: &str, content: &str) -> Report {
        serde_json::from_value(json!({
            "id": id,
            "type": "daily",
            "date": "2026-10-16",
            "title": title,
            "content": content,
        }))
        .unwrap()
    }

    #[test]
    fn test_import_skips_existing_ids() {
        let existing = vec![report("1", "A", "x")];
        let payload = r#"[{"id":"1","title":"A2","content":"y"},{"id":"2","title":"B","content":"z"}]"#;

        let plan = plan_import(&existing, payload).unwrap();
        assert_eq!(plan.admitted.len(), 1);
        assert_eq!(plan.admitted[0].id, "2");
        assert_eq!(plan.admitted[0].title, "B");
        assert_eq!(plan.admitted[0].kind, ReportKind::Daily);
        assert_eq!(plan.admitted[0].date, "");
        assert_eq!(
            plan.outcome(),
            ImportOutcome {
                admitted: 1,
                duplicates: 1,
                invalid: 0
            }
        );
    }

    #[test]
    fn test_import_distinguishes_malformed_from_duplicates() {
        let existing = vec![report("1", "A", "x")];
        let payload = r#"[
            {"id": "", "title": "A", "content": "x"},
            {"id": "3", "title": "", "content": "x"},
            {"id": "4", "title": "T"},
            {"id": null, "title": "T", "content": "x"},
            "not an object",
            {"id": "1", "title": "A", "content": "x"}
        ]"#;

        let outcome = plan_import(&existing, payload).unwrap().outcome();
        assert_eq!(outcome.admitted, 0);
        assert_eq!(outcome.invalid, 5);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.total(), 6);
    }

    #[test]
    fn test_import_passes_other_fields_through() {
        let payload = r#"[
            {"id": 5, "type": "monthly", "title": " ", "content": " ", "mood": "meh", "tag": "x"},
            {"id": "6", "type": "weekly", "date": "2026-10-12", "title": "W", "content": "c"}
        ]"#;

        let plan = plan_import(&[], payload).unwrap();
        assert_eq!(plan.invalid, 0);
        assert_eq!(plan.admitted.len(), 2);

        let odd = &plan.admitted[0];
        assert_eq!(odd.id, "5");
        assert_eq!(odd.kind, ReportKind::Daily);
        assert_eq!(odd.mood, None);
        assert_eq!(odd.extra.get("tag"), Some(&serde_json::json!("x")));

        assert_eq!(plan.admitted[1].kind, ReportKind::Weekly);
        assert_eq!(plan.admitted[1].date, "2026-10-12");
    }

    #[test]
    fn test_import_dedups_within_payload() {
        let payload = r#"[
            {"id": "9", "type": "daily", "date": "2026-10-16", "title": "first", "content": "x"},
            {"id": "9", "type": "daily", "date": "2026-10-16", "title": "second", "content": "x"}
        ]"#;
        let plan = plan_import(&[], payload).unwrap();
        assert_eq!(plan.admitted.len(), 1);
        assert_eq!(plan.admitted[0].title, "first");
        assert_eq!(plan.duplicates, 1);
    }

    #[test]
    fn test_import_rejects_non_array() {
        let err = plan_import(&[], r#"{"id": "1"}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Import(ImportError::InvalidFormat(_))
        ));

        let err = plan_import(&[], "definitely not json").unwrap_err();
        assert!(matches!(
            err,
            Error::Import(ImportError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_import_strips_blank_items() {
        let payload = r#"[{"id": "1", "type": "weekly", "date": "2026-10-12",
            "title": "W", "content": "c", "achievements": ["  ", "done "], "plans": [""]}]"#;
        let plan = plan_import(&[], payload).unwrap();
        assert_eq!(plan.admitted[0].achievements, vec!["done"]);
        assert!(plan.admitted[0].plans.is_empty());
    }

    #[test]
    fn test_json_export_round_trips_through_import() {
        let reports = vec![report("b", "B", "y"), report("a", "A", "x")];
        let json = export_json(&reports).unwrap();
        assert!(json.contains("\n  {"));

        let plan = plan_import(&[], &json).unwrap();
        let ids: Vec<&str> = plan.admitted.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(plan.admitted, reports);
    }

    #[test]
    fn test_select_keeps_store_order() {
        let reports = vec![report("3", "C", "z"), report("2", "B", "y"), report("1", "A", "x")];
        let picked = select(&reports, &["1".to_string(), "3".to_string(), "nope".to_string()]);
        let ids: Vec<&str> = picked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_markdown_export() {
        let mut full = report("1", "Parser work", "Rewrote the lexer.");
        full.mood = Some(Mood::Good);
        full.achievements = vec!["faster builds".into(), " ".into()];
        full.issues = Some("flaky CI".into());

        let mut bare = report("2", "Planning", "Roadmap.");
        bare.kind = ReportKind::Weekly;
        bare.date = "someday".into();

        let exported_at = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let doc = export_markdown(&[full, bare], exported_at);

        assert!(doc.starts_with("# DailyUp work reports\n\n> Exported at: 2026-10-17 09:30:00\n"));
        assert!(doc.contains("## 1. 📅 Daily report - Parser work\n"));
        assert!(doc.contains("**Date:** Friday, October 16, 2026\n"));
        assert!(doc.contains("**Mood:** 😊 Good\n"));
        assert!(doc.contains("### ✨ Achievements\n\n- faster builds\n\n"));
        assert!(doc.contains("### ⚠️ Issues\n\nflaky CI\n"));
        assert!(doc.contains("## 2. 📊 Weekly report - Planning\n"));
        assert!(doc.contains("**Date:** someday\n"));
        assert!(!doc.contains("Next plans"));
        assert_eq!(doc.matches("---\n").count(), 3);
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            export_file_name(ExportFormat::Json, date),
            "DailyUp_reports_2026-10-17.json"
        );
        assert_eq!(
            export_file_name("md".parse().unwrap(), date),
            "DailyUp_reports_2026-10-17.md"
        );
    }
}
