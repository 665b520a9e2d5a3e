//! Aggregate statistics over a report collection.

use chrono::{Datelike, Duration, NaiveDate};

use crate::dateparse::parse_iso_date;
use crate::{Mood, Report, ReportKind};

/// Days covered by the mood trend, ending today.
pub const MOOD_TREND_DAYS: i64 = 30;

/// Achievements listed under "recent".
pub const RECENT_ACHIEVEMENTS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub daily: usize,
    pub weekly: usize,
    /// Reports dated in the Monday-to-Sunday week containing today.
    pub this_week: usize,
    pub this_month: usize,
    pub total_achievements: usize,
    pub recent_achievements: Vec<String>,
    pub avg_achievements: f64,
    pub avg_plans: f64,
    pub with_issues: usize,
    pub mood_trend: Vec<MoodPoint>,
}

/// Average mood of one day's daily reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodPoint {
    pub date: NaiveDate,
    pub score: Option<f64>,
}

impl MoodPoint {
    pub fn mood(&self) -> Option<Mood> {
        self.score.map(Mood::from_score)
    }
}

impl Summary {
    pub fn compute(reports: &[Report], today: NaiveDate) -> Self {
        let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let week_end = week_start + Duration::days(6);

        let dates: Vec<Option<NaiveDate>> =
            reports.iter().map(|r| parse_iso_date(&r.date)).collect();

        let this_week = dates
            .iter()
            .flatten()
            .filter(|d| **d >= week_start && **d <= week_end)
            .count();
        let this_month = dates
            .iter()
            .flatten()
            .filter(|d| d.year() == today.year() && d.month() == today.month())
            .count();

        let achievements: Vec<&String> = reports
            .iter()
            .flat_map(|r| r.achievements.iter())
            .filter(|a| !a.trim().is_empty())
            .collect();

        let (avg_achievements, avg_plans) = if reports.is_empty() {
            (0.0, 0.0)
        } else {
            let n = reports.len() as f64;
            (
                reports.iter().map(|r| r.achievements.len()).sum::<usize>() as f64 / n,
                reports.iter().map(|r| r.plans.len()).sum::<usize>() as f64 / n,
            )
        };

        Summary {
            total: reports.len(),
            daily: reports.iter().filter(|r| r.kind == ReportKind::Daily).count(),
            weekly: reports.iter().filter(|r| r.kind == ReportKind::Weekly).count(),
            this_week,
            this_month,
            total_achievements: achievements.len(),
            recent_achievements: achievements
                .iter()
                .take(RECENT_ACHIEVEMENTS)
                .map(|s| s.to_string())
                .collect(),
            avg_achievements,
            avg_plans,
            with_issues: reports
                .iter()
                .filter(|r| r.issues.as_deref().is_some_and(|s| !s.trim().is_empty()))
                .count(),
            mood_trend: mood_trend(reports, today),
        }
    }
}

fn mood_trend(reports: &[Report], today: NaiveDate) -> Vec<MoodPoint> {
    (0..MOOD_TREND_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let scores: Vec<u8> = reports
                .iter()
                .filter(|r| r.kind == ReportKind::Daily)
                .filter(|r| parse_iso_date(&r.date) == Some(date))
                .filter_map(|r| r.mood.map(|m| m.score()))
                .collect();

            let score = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64)
            };
            MoodPoint { date, score }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(id: &str, kind: &str, date: &str, mood: Option<&str>) -> Report {
        serde_json::from_value(json!({
            "id": id,
            "type": kind,
            "date": date,
            "title": "t",
            "content": "c",
            "mood": mood,
        }))
        .unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_empty() {
        let summary = Summary::compute(&[], day("2026-10-17"));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.avg_achievements, 0.0);
        assert_eq!(summary.mood_trend.len(), 30);
        assert!(summary.mood_trend.iter().all(|p| p.score.is_none()));
    }

    #[test]
    fn test_counts_and_periods() {
        // 2026-10-17 is a Saturday; its week runs 10-12 through 10-18.
        let mut with_items = report("1", "daily", "2026-10-12", None);
        with_items.achievements = vec!["a".into(), "b".into()];
        with_items.plans = vec!["p".into()];
        with_items.issues = Some("blocked".into());

        let reports = vec![
            with_items,
            report("2", "daily", "2026-10-11", None),
            report("3", "weekly", "2026-10-01", None),
            report("4", "weekly", "2026-09-30", None),
            report("5", "daily", "not a date", None),
        ];
        let summary = Summary::compute(&reports, day("2026-10-17"));

        assert_eq!(summary.total, 5);
        assert_eq!(summary.daily, 3);
        assert_eq!(summary.weekly, 2);
        assert_eq!(summary.this_week, 1);
        assert_eq!(summary.this_month, 3);
        assert_eq!(summary.total_achievements, 2);
        assert_eq!(summary.recent_achievements, vec!["a", "b"]);
        assert!((summary.avg_achievements - 0.4).abs() < 1e-9);
        assert!((summary.avg_plans - 0.2).abs() < 1e-9);
        assert_eq!(summary.with_issues, 1);
    }

    #[test]
    fn test_mood_trend_averages_daily_reports() {
        let reports = vec![
            report("1", "daily", "2026-10-17", Some("excellent")),
            report("2", "daily", "2026-10-17", Some("normal")),
            report("3", "weekly", "2026-10-17", Some("terrible")),
            report("4", "daily", "2026-10-16", None),
            report("5", "daily", "2026-09-01", Some("bad")),
        ];
        let summary = Summary::compute(&reports, day("2026-10-17"));
        let trend = &summary.mood_trend;

        assert_eq!(trend.first().unwrap().date, day("2026-09-18"));
        let last = trend.last().unwrap();
        assert_eq!(last.date, day("2026-10-17"));
        assert_eq!(last.score, Some(4.0));
        assert_eq!(last.mood(), Some(Mood::Good));
        assert_eq!(trend[trend.len() - 2].score, None);
    }

    #[test]
    fn test_recent_achievements_capped() {
        let mut r = report("1", "daily", "2026-10-17", None);
        r.achievements = (0..15).map(|i| format!("win {}", i)).collect();
        let summary = Summary::compute(&[r], day("2026-10-17"));
        assert_eq!(summary.total_achievements, 15);
        assert_eq!(summary.recent_achievements.len(), 10);
        assert_eq!(summary.recent_achievements[0], "win 0");
    }
}
