use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Whether a report covers a day or a week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Daily,
    Weekly,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
        }
    }

    /// Heading label used in document exports.
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Daily => "📅 Daily report",
            ReportKind::Weekly => "📊 Weekly report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(ReportKind::Daily),
            "weekly" => Ok(ReportKind::Weekly),
            other => Err(Error::Validation(format!("unknown report type: {}", other))),
        }
    }
}

/// How the author felt about the reported period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excellent,
    Good,
    Normal,
    Bad,
    Terrible,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Excellent,
        Mood::Good,
        Mood::Normal,
        Mood::Bad,
        Mood::Terrible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excellent => "excellent",
            Mood::Good => "good",
            Mood::Normal => "normal",
            Mood::Bad => "bad",
            Mood::Terrible => "terrible",
        }
    }

    /// Score on a 1..=5 scale, used for the mood trend.
    pub fn score(&self) -> u8 {
        match self {
            Mood::Excellent => 5,
            Mood::Good => 4,
            Mood::Normal => 3,
            Mood::Bad => 2,
            Mood::Terrible => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Excellent => "😄 Excellent",
            Mood::Good => "😊 Good",
            Mood::Normal => "😐 Normal",
            Mood::Bad => "😔 Not great",
            Mood::Terrible => "😢 Terrible",
        }
    }

    /// Map an averaged score back onto the nearest mood band.
    pub fn from_score(score: f64) -> Mood {
        if score >= 4.5 {
            Mood::Excellent
        } else if score >= 3.5 {
            Mood::Good
        } else if score >= 2.5 {
            Mood::Normal
        } else if score >= 1.5 {
            Mood::Bad
        } else {
            Mood::Terrible
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| Error::Validation(format!("unknown mood: {}", s.trim())))
    }
}

/// A persisted report with all fields.
///
/// Only `id` is strictly required when reading. Records written by older
/// versions or hand-edited exports may lack or garble the other fields:
/// a missing or unknown `type` reads as daily, a missing `date`, `title` or
/// `content` reads as empty, and an unknown mood reads as none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "deserialize_kind")]
    pub kind: ReportKind,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub content: String,
    #[serde(default, deserialize_with = "deserialize_items")]
    pub achievements: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_items")]
    pub plans: Vec<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub issues: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_mood",
        skip_serializing_if = "Option::is_none"
    )]
    pub mood: Option<Mood>,
    #[serde(
        rename = "createdAt",
        default,
        deserialize_with = "deserialize_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    /// Fields this version does not know about, kept so that a round trip
    /// through the store never loses data.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The user-editable part of a report. Saving a draft replaces every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub date: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub plans: Vec<String>,
    #[serde(default)]
    pub issues: Option<String>,
    #[serde(default)]
    pub mood: Option<Mood>,
}

impl Report {
    /// Build a freshly created report from a draft.
    pub fn from_draft(id: String, created_at: String, draft: ReportDraft) -> Self {
        Report {
            id,
            kind: draft.kind,
            date: draft.date,
            title: draft.title,
            content: draft.content,
            achievements: draft.achievements,
            plans: draft.plans,
            issues: draft.issues,
            mood: draft.mood,
            created_at: Some(created_at),
            extra: Map::new(),
        }
    }

    /// Replace every editable field, keeping `id`, `created_at` and unknown fields.
    pub fn apply(&mut self, draft: ReportDraft) {
        self.kind = draft.kind;
        self.date = draft.date;
        self.title = draft.title;
        self.content = draft.content;
        self.achievements = draft.achievements;
        self.plans = draft.plans;
        self.issues = draft.issues;
        self.mood = draft.mood;
    }

    pub fn draft(&self) -> ReportDraft {
        ReportDraft {
            kind: self.kind,
            date: self.date.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            achievements: self.achievements.clone(),
            plans: self.plans.clone(),
            issues: self.issues.clone(),
            mood: self.mood,
        }
    }

    /// Single-line preview of the content, truncated to `max_len` characters.
    pub fn preview(&self, max_len: usize) -> String {
        let normalized: String = self
            .content
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let trimmed = normalized.trim();

        if trimmed.chars().count() > max_len {
            let cut: String = trimmed.chars().take(max_len).collect();
            format!("{}...", cut.trim_end())
        } else {
            trimmed.to_string()
        }
    }
}

/// Filter applied when listing reports.
#[derive(Debug, Default, Clone)]
pub struct ReportFilter {
    pub kind: Option<ReportKind>,
    /// Case-insensitive substring matched against title and content.
    pub search: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(kind) = self.kind {
            if report.kind != kind {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                report.title.to_lowercase().contains(&term)
                    || report.content.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Ids may arrive as strings (local store) or numbers (hosted table rows).
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<ReportKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => ReportKind::default(),
    })
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_text(deserializer)?.unwrap_or_default())
}

fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

// Non-string entries are dropped rather than failing the whole record.
fn deserialize_items<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

// Older exports write an empty string when no mood was picked.
fn deserialize_mood<'de, D>(deserializer: D) -> Result<Option<Mood>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}
