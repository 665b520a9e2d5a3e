//! Hosted-table implementation of the DailyUp store trait.
//!
//! Reports live one per row in a PostgreSQL table exposed through a PostgREST
//! endpoint (as served by Supabase). The server assigns `id` and `created_at`.

use dailyup_core::{deserialize_id, Error, Mood, Report, ReportDraft, ReportKind, ReportStore};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SQL that creates the table this backend expects.
pub const SCHEMA_SQL: &str = include_str!("../schema.sql");

pub const DEFAULT_TABLE: &str = "reports";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("dailyup/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the hosted table.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// API key sent both as `apikey` and as bearer token.
    pub api_key: String,
    pub table: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(Error::Validation("remote url is not set".into()));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::Validation(format!(
                "remote url must start with http:// or https://, got {}",
                url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Validation("remote api key is not set".into()));
        }
        if self.table.trim().is_empty()
            || !self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Validation(format!(
                "invalid table name: {:?}",
                self.table
            )));
        }
        Ok(())
    }

    /// REST endpoint of the table.
    pub fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.url.trim().trim_end_matches('/'),
            self.table
        )
    }
}

/// Store backed by a hosted table.
pub struct RemoteStore {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteStore {
    pub fn new(config: RemoteConfig) -> Result<Self, Error> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Persistence(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.config.table_url())
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    /// Send a request and decode the returned rows.
    async fn fetch_rows(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<Vec<ReportRow>, Error> {
        tracing::debug!(table = %self.config.table, action, "remote request");

        let response = request
            .send()
            .await
            .map_err(|e| Error::Persistence(format!("Failed to {}: {}", action, e)))?;

        let response = check_status(response, action).await?;

        response
            .json::<Vec<ReportRow>>()
            .await
            .map_err(|e| Error::Parse(format!("Failed to decode rows after {}: {}", action, e)))
    }
}

async fn check_status(response: Response, action: &str) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(rejection(action, status, &body))
}

fn rejection(action: &str, status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());
    Error::Persistence(format!("Failed to {}: {} {}", action, status, detail))
}

/// PostgREST error payload.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// A row as returned by the table.
#[derive(Debug, Deserialize)]
struct ReportRow {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(rename = "type")]
    kind: ReportKind,
    #[serde(default)]
    date: Option<String>,
    title: String,
    content: String,
    #[serde(default)]
    achievements: Option<Vec<String>>,
    #[serde(default)]
    plans: Option<Vec<String>>,
    #[serde(default)]
    issues: Option<String>,
    #[serde(default)]
    mood: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl ReportRow {
    fn into_report(self) -> Report {
        let mood = self
            .mood
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .and_then(|m| match m.parse::<Mood>() {
                Ok(mood) => Some(mood),
                Err(e) => {
                    tracing::warn!(id = %self.id, error = %e, "ignoring stored mood");
                    None
                }
            });

        Report {
            id: self.id,
            kind: self.kind,
            date: self.date.unwrap_or_default(),
            title: self.title,
            content: self.content,
            achievements: self.achievements.unwrap_or_default(),
            plans: self.plans.unwrap_or_default(),
            issues: self.issues,
            mood,
            created_at: self.created_at,
            extra: Default::default(),
        }
    }
}

/// Column values written on insert and update. `id` and `created_at` are
/// left to the server.
#[derive(Debug, Serialize)]
struct ReportColumns<'a> {
    #[serde(rename = "type")]
    kind: ReportKind,
    date: Option<&'a str>,
    title: &'a str,
    content: &'a str,
    achievements: &'a [String],
    plans: &'a [String],
    issues: Option<&'a str>,
    mood: Option<Mood>,
}

impl<'a> From<&'a ReportDraft> for ReportColumns<'a> {
    fn from(d: &'a ReportDraft) -> Self {
        Self {
            kind: d.kind,
            date: non_empty(&d.date),
            title: &d.title,
            content: &d.content,
            achievements: &d.achievements,
            plans: &d.plans,
            issues: d.issues.as_deref(),
            mood: d.mood,
        }
    }
}

impl<'a> From<&'a Report> for ReportColumns<'a> {
    fn from(r: &'a Report) -> Self {
        Self {
            kind: r.kind,
            date: non_empty(&r.date),
            title: &r.title,
            content: &r.content,
            achievements: &r.achievements,
            plans: &r.plans,
            issues: r.issues.as_deref(),
            mood: r.mood,
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.is_empty())
}

#[async_trait::async_trait(?Send)]
impl ReportStore for RemoteStore {
    async fn list(&self) -> Result<Vec<Report>, Error> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "*"), ("order", "date.desc")]);

        let rows = self.fetch_rows(request, "list reports").await?;
        Ok(rows.into_iter().map(ReportRow::into_report).collect())
    }

    async fn create(&self, draft: ReportDraft) -> Result<Report, Error> {
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&[ReportColumns::from(&draft)]);

        self.fetch_rows(request, "create report")
            .await?
            .into_iter()
            .next()
            .map(ReportRow::into_report)
            .ok_or_else(|| Error::Persistence("Failed to create report: no row returned".into()))
    }

    async fn update(&self, id: &str, draft: ReportDraft) -> Result<Option<Report>, Error> {
        let request = self
            .request(Method::PATCH)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&ReportColumns::from(&draft));

        match self.fetch_rows(request, "update report").await?.into_iter().next() {
            Some(row) => Ok(Some(row.into_report())),
            None => Err(Error::Persistence(format!(
                "Failed to update report: no report with id {}",
                id
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, Error> {
        let request = self
            .request(Method::DELETE)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");

        let rows = self.fetch_rows(request, "delete report").await?;
        Ok(!rows.is_empty())
    }

    async fn merge(&self, reports: Vec<Report>) -> Result<usize, Error> {
        if reports.is_empty() {
            return Ok(0);
        }

        let columns: Vec<ReportColumns> = reports.iter().map(ReportColumns::from).collect();
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&columns);

        let rows = self.fetch_rows(request, "import reports").await?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> RemoteConfig {
        RemoteConfig::new("https://example.supabase.co/", "anon-key")
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());
        assert!(RemoteConfig::new("", "key").validate().is_err());
        assert!(RemoteConfig::new("example.supabase.co", "key").validate().is_err());
        assert!(RemoteConfig::new("https://example.supabase.co", " ").validate().is_err());

        let mut bad_table = config();
        bad_table.table = "reports;drop".into();
        assert!(bad_table.validate().is_err());
    }

    #[test]
    fn test_table_url() {
        assert_eq!(
            config().table_url(),
            "https://example.supabase.co/rest/v1/reports"
        );
        let mut custom = config();
        custom.table = "team_reports".into();
        assert_eq!(
            custom.table_url(),
            "https://example.supabase.co/rest/v1/team_reports"
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(RemoteStore::new(RemoteConfig::new("", "")).is_err());
        let store = RemoteStore::new(config()).unwrap();
        assert_eq!(store.config().table, DEFAULT_TABLE);
    }

    #[test]
    fn test_row_into_report() {
        let row: ReportRow = serde_json::from_value(json!({
            "id": 17,
            "type": "weekly",
            "date": "2026-10-12",
            "title": "Week 42",
            "content": "Release prep",
            "achievements": null,
            "plans": ["ship"],
            "issues": null,
            "mood": "",
            "created_at": "2026-10-12T09:00:00.123+00:00"
        }))
        .unwrap();

        let report = row.into_report();
        assert_eq!(report.id, "17");
        assert_eq!(report.kind, ReportKind::Weekly);
        assert!(report.achievements.is_empty());
        assert_eq!(report.plans, vec!["ship"]);
        assert_eq!(report.mood, None);
        assert_eq!(
            report.created_at.as_deref(),
            Some("2026-10-12T09:00:00.123+00:00")
        );
    }

    #[test]
    fn test_unknown_stored_mood_is_dropped() {
        let row: ReportRow = serde_json::from_value(json!({
            "id": "a1",
            "type": "daily",
            "date": "2026-10-12",
            "title": "T",
            "content": "C",
            "mood": "ecstatic"
        }))
        .unwrap();
        assert_eq!(row.into_report().mood, None);
    }

    #[test]
    fn test_columns_leave_identity_to_server() {
        let draft = ReportDraft {
            kind: ReportKind::Daily,
            date: "2026-10-16".into(),
            title: "T".into(),
            content: "C".into(),
            achievements: vec!["a".into()],
            plans: vec![],
            issues: None,
            mood: Some(Mood::Normal),
        };
        let value = serde_json::to_value(ReportColumns::from(&draft)).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("id"));
        assert!(!object.contains_key("created_at"));
        assert!(!object.contains_key("createdAt"));
        assert_eq!(value["type"], "daily");
        assert_eq!(value["mood"], "normal");
        assert_eq!(value["issues"], serde_json::Value::Null);
    }

    #[test]
    fn test_undated_reports_write_a_null_date() {
        let imported: Report =
            serde_json::from_value(json!({"id": "2", "title": "B", "content": "z"})).unwrap();
        let value = serde_json::to_value(ReportColumns::from(&imported)).unwrap();
        assert_eq!(value["date"], serde_json::Value::Null);
        assert_eq!(value["type"], "daily");

        let row: ReportRow = serde_json::from_value(json!({
            "id": 3,
            "type": "daily",
            "date": null,
            "title": "B",
            "content": "z"
        }))
        .unwrap();
        assert_eq!(row.into_report().date, "");
    }

    #[test]
    fn test_rejection_prefers_server_message() {
        let err = rejection(
            "create report",
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert_eq!(
            err.to_string(),
            "persistence error: Failed to create report: 409 Conflict duplicate key value violates unique constraint"
        );

        let err = rejection("list reports", StatusCode::BAD_GATEWAY, "upstream down\n");
        assert!(matches!(
            err,
            Error::Persistence(ref m) if m.ends_with("502 Bad Gateway upstream down")
        ));
    }

    #[test]
    fn test_schema_mentions_every_column() {
        for column in [
            "type", "date", "title", "content", "achievements", "plans", "issues", "mood",
            "created_at",
        ] {
            assert!(SCHEMA_SQL.contains(column), "missing column {}", column);
        }
    }
}
