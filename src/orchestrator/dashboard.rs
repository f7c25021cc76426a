use serde::Serialize;

use crate::api::dto::{
    CoverageData, DashboardStats, JenkinsBuild, JenkinsCoverage, JenkinsTestResult, TestTrend,
    TimeRange,
};
use crate::services::api_client::{ApiClient, ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Positive,
    Negative,
    Neutral,
}

/// Rounded percentage, 0 when there is nothing to divide by.
fn percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

pub fn success_rate(stats: &DashboardStats) -> u32 {
    percent(stats.successful_tests, stats.total_tests)
}

/// Rounded percent change, or `None` when there is no baseline.
pub fn calculate_change(current: f64, previous: f64) -> Option<i64> {
    if previous == 0.0 || previous.is_nan() || current.is_nan() {
        return None;
    }
    Some(((current - previous) / previous * 100.0).round() as i64)
}

/// Whether a move from `previous` to `current` is good news. With
/// `inverse`, a decrease is the good direction (failures, latency).
pub fn change_type(current: f64, previous: f64, inverse: bool) -> ChangeType {
    if previous == 0.0 || previous.is_nan() || current.is_nan() {
        return ChangeType::Neutral;
    }
    match (current > previous, inverse) {
        (true, false) | (false, true) => ChangeType::Positive,
        _ => ChangeType::Negative,
    }
}

/// Pass counts from the most recent Jenkins test report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JenkinsOverlay {
    pub pass_count: u64,
    pub fail_count: u64,
    pub total_count: u64,
    pub success_rate: u32,
}

impl From<&JenkinsTestResult> for JenkinsOverlay {
    fn from(result: &JenkinsTestResult) -> Self {
        Self {
            pass_count: result.passed_tests,
            fail_count: result.failed_tests,
            total_count: result.total_tests,
            success_rate: percent(result.passed_tests, result.total_tests),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub change: Option<i64>,
    pub change_type: ChangeType,
}

impl StatCard {
    fn compared(title: &'static str, value: String, current: f64, previous: f64, inverse: bool) -> Self {
        Self {
            title,
            value,
            change: calculate_change(current, previous),
            change_type: change_type(current, previous, inverse),
        }
    }

    fn plain(title: &'static str, value: String) -> Self {
        Self {
            title,
            value,
            change: None,
            change_type: ChangeType::Neutral,
        }
    }
}

/// Everything the dashboard shows for one time range.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub time_range: TimeRange,
    pub stats: DashboardStats,
    pub previous: DashboardStats,
    pub trends: Vec<TestTrend>,
    pub coverage: Vec<CoverageData>,
    pub jenkins: Option<JenkinsOverlay>,
}

impl DashboardSnapshot {
    /// Fetches stats, trends and coverage together, then the comparison
    /// window. Jenkins being unavailable only drops the overlay.
    pub async fn load(client: &ApiClient, time_range: TimeRange) -> Result<Self, ApiError> {
        let (stats, trends, coverage) = futures::try_join!(
            client.get_dashboard_stats(time_range.as_str()),
            client.get_test_trends(time_range.as_str()),
            client.get_coverage_data(),
        )?;

        let jenkins = match client.get_jenkins_test_results().await {
            Ok(results) => results.first().map(JenkinsOverlay::from),
            Err(e) => {
                tracing::warn!("Failed to load Jenkins test results: {}", e);
                None
            }
        };

        let previous = client
            .get_dashboard_stats(time_range.comparison_window())
            .await?;

        Ok(Self {
            time_range,
            stats,
            previous,
            trends,
            coverage,
            jenkins,
        })
    }

    /// Plain-text view of the cards and trends. Change percentages are left
    /// out when `show_changes` is false.
    pub fn render(&self, show_changes: bool) -> String {
        let mut out = String::new();
        for card in self.cards() {
            match card.change.filter(|_| show_changes) {
                Some(change) => out.push_str(&format!(
                    "{:<22} {:>10}  {:+}% ({:?})\n",
                    card.title, card.value, change, card.change_type
                )),
                None => out.push_str(&format!("{:<22} {:>10}\n", card.title, card.value)),
            }
        }
        for trend in &self.trends {
            out.push_str(&format!(
                "{}  {} ok / {} failed\n",
                trend.date, trend.successful, trend.failed
            ));
        }
        out
    }

    /// Jenkins' pass rate when it reported any tests, otherwise the
    /// backend's generation success rate.
    pub fn success_rate(&self) -> u32 {
        match self.jenkins {
            Some(overlay) if overlay.total_count > 0 => overlay.success_rate,
            _ => success_rate(&self.stats),
        }
    }

    pub fn previous_success_rate(&self) -> u32 {
        success_rate(&self.previous)
    }

    pub fn cards(&self) -> Vec<StatCard> {
        let s = &self.stats;
        let p = &self.previous;

        vec![
            StatCard::compared(
                "Total Tests Generated",
                s.total_tests.to_string(),
                s.total_tests as f64,
                p.total_tests as f64,
                false,
            ),
            StatCard::compared(
                "Success Rate",
                format!("{}%", self.success_rate()),
                self.success_rate() as f64,
                self.previous_success_rate() as f64,
                false,
            ),
            StatCard::compared(
                "Average Coverage",
                format!("{}%", s.test_coverage),
                s.test_coverage,
                p.test_coverage,
                false,
            ),
            StatCard::compared(
                "Avg Generation Time",
                format!("{}s", s.avg_generation_time),
                s.avg_generation_time,
                p.avg_generation_time,
                true,
            ),
            StatCard::plain("Tests Today", s.tests_today.to_string()),
            StatCard::compared(
                "Tests This Week",
                s.tests_this_week.to_string(),
                s.tests_this_week as f64,
                p.tests_this_week as f64,
                false,
            ),
            StatCard::plain("Active Projects", s.active_projects.to_string()),
            StatCard::compared(
                "Failed Tests",
                s.failed_tests.to_string(),
                s.failed_tests as f64,
                p.failed_tests as f64,
                true,
            ),
        ]
    }
}

// ==================== Jenkins ====================

/// Share of builds whose result is `SUCCESS`, rounded.
pub fn build_success_rate(builds: &[JenkinsBuild]) -> u32 {
    let successful = builds
        .iter()
        .filter(|b| b.result.as_deref() == Some("SUCCESS"))
        .count();
    percent(successful as u64, builds.len() as u64)
}

pub fn latest_coverage(coverage: &[JenkinsCoverage]) -> Option<&JenkinsCoverage> {
    coverage.iter().max_by(|a, b| a.timestamp.cmp(&b.timestamp))
}

pub fn latest_test_result(results: &[JenkinsTestResult]) -> Option<&JenkinsTestResult> {
    results.iter().max_by(|a, b| a.timestamp.cmp(&b.timestamp))
}
