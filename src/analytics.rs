//! Reductions over a window of reports for the analytics page.
//!
//! Everything here is recomputed from a full snapshot on every request.

use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    credibility::CredibilityTier,
    schema::db::{HackType, Report},
};

pub const DEFAULT_COLOR: &str = "#6b7280";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl TimeRange {
    pub fn days(&self) -> i64 {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
        }
    }

    /// Inclusive lower bound of the window ending at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "90d" => Ok(TimeRange::Quarter),
            other => Err(format!("Unknown time range: {other}")),
        }
    }
}

pub fn hack_type_color(hack_type: HackType) -> &'static str {
    match hack_type {
        HackType::Aimbot => "#ef4444",
        HackType::Wallhack => "#f97316",
        HackType::Speedhack => "#eab308",
        HackType::Autoshoot => "#22c55e",
        HackType::Teleport => "#06b6d4",
        HackType::GodMode => "#8b5cf6",
        HackType::UnlimitedAmmo => "#ec4899",
        HackType::Other => DEFAULT_COLOR,
    }
}

/// Chart name of a hack type, e.g. `GOD MODE`.
pub fn hack_type_display_name(hack_type: HackType) -> String {
    hack_type.as_str().replacen('_', " ", 1).to_uppercase()
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HackTypeBucket {
    pub hack_type: HackType,
    pub name: String,
    pub value: usize,
    pub color: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub label: String,
    pub reports: usize,
    pub votes: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TierCount {
    pub tier: CredibilityTier,
    pub category: &'static str,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct HourlyBucket {
    pub hour: u32,
    pub reports: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_reports: usize,
    pub high_credibility: usize,
    pub aimbot_reports: usize,
    pub peak_hour_reports: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Analytics {
    pub range: TimeRange,
    pub hack_type_distribution: Vec<HackTypeBucket>,
    pub daily_trends: Vec<DailyBucket>,
    pub credibility: Vec<TierCount>,
    pub hourly_activity: Vec<HourlyBucket>,
    pub summary: Summary,
}

/// Count per hack type, in order of first appearance.
pub fn hack_type_distribution(reports: &[Report]) -> Vec<HackTypeBucket> {
    let mut buckets: Vec<HackTypeBucket> = Vec::new();
    for report in reports {
        match buckets.iter_mut().find(|b| b.hack_type == report.hack_type) {
            Some(bucket) => bucket.value += 1,
            None => buckets.push(HackTypeBucket {
                hack_type: report.hack_type,
                name: hack_type_display_name(report.hack_type),
                value: 1,
                color: hack_type_color(report.hack_type),
            }),
        }
    }
    buckets
}

/// One bucket per UTC calendar day for `days` days starting on the day of
/// `start`. The current day falls outside the trend.
pub fn daily_trends(reports: &[Report], start: DateTime<Utc>, days: i64) -> Vec<DailyBucket> {
    let first = start.date_naive();
    let mut buckets: Vec<DailyBucket> = (0..days)
        .map(|offset| {
            let date = first + Duration::days(offset);
            DailyBucket {
                date,
                label: date.format("%b %-d").to_string(),
                reports: 0,
                votes: 0,
            }
        })
        .collect();

    for report in reports {
        let day = report.created_at.date_naive();
        let index = (day - first).num_days();
        if (0..days).contains(&index) {
            let bucket = &mut buckets[index as usize];
            bucket.reports += 1;
            bucket.votes += i64::from(report.upvotes) + i64::from(report.downvotes);
        }
    }
    buckets
}

pub fn credibility_tiers(reports: &[Report]) -> Vec<TierCount> {
    [
        CredibilityTier::High,
        CredibilityTier::Medium,
        CredibilityTier::Low,
    ]
    .into_iter()
    .map(|tier| TierCount {
        tier,
        category: tier.category(),
        count: reports
            .iter()
            .filter(|r| CredibilityTier::of(r.upvotes, r.downvotes) == Some(tier))
            .count(),
    })
    .collect()
}

/// 24 buckets keyed by the hour of `created_at` in the viewer's timezone.
pub fn hourly_activity(reports: &[Report], offset: &FixedOffset) -> Vec<HourlyBucket> {
    let mut buckets: Vec<HourlyBucket> = (0..24).map(|hour| HourlyBucket { hour, reports: 0 }).collect();
    for report in reports {
        let hour = report.created_at.with_timezone(offset).hour();
        buckets[hour as usize].reports += 1;
    }
    buckets
}

pub fn summarize(
    reports: &[Report],
    range: TimeRange,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> Analytics {
    let hack_type_distribution = hack_type_distribution(reports);
    let daily_trends = daily_trends(reports, range.start(now), range.days());
    let credibility = credibility_tiers(reports);
    let hourly_activity = hourly_activity(reports, offset);

    let summary = Summary {
        total_reports: hack_type_distribution.iter().map(|b| b.value).sum(),
        high_credibility: credibility
            .iter()
            .find(|t| t.tier == CredibilityTier::High)
            .map(|t| t.count)
            .unwrap_or(0),
        aimbot_reports: hack_type_distribution
            .iter()
            .find(|b| b.hack_type == HackType::Aimbot)
            .map(|b| b.value)
            .unwrap_or(0),
        peak_hour_reports: hourly_activity.iter().map(|h| h.reports).max().unwrap_or(0),
    };

    Analytics {
        range,
        hack_type_distribution,
        daily_trends,
        credibility,
        hourly_activity,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    fn report(hack_type: HackType, up: i32, down: i32, created_at: DateTime<Utc>) -> Report {
        Report {
            id: Uuid::new_v4(),
            ign: "PlayerX".to_string(),
            uid: "123456".to_string(),
            hack_type,
            description: "No description provided".to_string(),
            proof_urls: Vec::new(),
            upvotes: up,
            downvotes: down,
            created_at,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, day, hour, 15, 0).unwrap()
    }

    #[test]
    fn time_ranges() {
        assert_eq!("7d".parse::<TimeRange>(), Ok(TimeRange::Week));
        assert_eq!("90d".parse::<TimeRange>(), Ok(TimeRange::Quarter));
        assert!("1y".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::default().days(), 30);
        assert_eq!(TimeRange::Week.start(at(17, 10)), at(10, 10));
    }

    #[test]
    fn distribution_keeps_first_seen_order() {
        let reports = vec![
            report(HackType::GodMode, 0, 0, at(1, 1)),
            report(HackType::Aimbot, 0, 0, at(1, 1)),
            report(HackType::GodMode, 0, 0, at(1, 1)),
        ];
        let buckets = hack_type_distribution(&reports);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "GOD MODE");
        assert_eq!(buckets[0].value, 2);
        assert_eq!(buckets[0].color, "#8b5cf6");
        assert_eq!(buckets[1].name, "AIMBOT");
        assert_eq!(hack_type_color(HackType::Other), DEFAULT_COLOR);
    }

    #[test]
    fn seven_day_trend_starts_at_the_window_start() {
        let now = at(17, 12);
        let reports = vec![
            report(HackType::Aimbot, 3, 1, at(17, 9)),
            report(HackType::Other, 0, 2, at(11, 0)),
            report(HackType::Other, 5, 5, at(10, 13)),
            report(HackType::Other, 1, 0, at(16, 23)),
        ];
        let trend = daily_trends(&reports, TimeRange::Week.start(now), 7);
        let labels: Vec<&str> = trend.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Oct 10", "Oct 11", "Oct 12", "Oct 13", "Oct 14", "Oct 15", "Oct 16"]
        );
        assert_eq!(trend[0].reports, 1);
        assert_eq!(trend[0].votes, 10);
        assert_eq!(trend[1].reports, 1);
        assert_eq!(trend[1].votes, 2);
        assert_eq!(trend[6].reports, 1);
        assert_eq!(trend.iter().map(|b| b.reports).sum::<usize>(), 3);
    }

    #[test]
    fn tiers_can_miss_a_report() {
        let reports = vec![
            report(HackType::Other, 5, 2, at(1, 1)),
            report(HackType::Other, 3, 1, at(1, 1)),
            report(HackType::Other, 0, 0, at(1, 1)),
            report(HackType::Other, 6, 4, at(1, 1)),
        ];
        let tiers = credibility_tiers(&reports);
        let counts: Vec<usize> = tiers.iter().map(|t| t.count).collect();
        assert_eq!(counts, vec![1, 1, 1]);
        assert_eq!(tiers[0].category, "High Credibility");
    }

    #[test]
    fn hourly_histogram_uses_viewer_offset() {
        let reports = vec![
            report(HackType::Other, 0, 0, at(1, 23)),
            report(HackType::Other, 0, 0, at(5, 23)),
            report(HackType::Other, 0, 0, at(5, 4)),
        ];
        let utc = hourly_activity(&reports, &FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc.len(), 24);
        assert_eq!(utc[23].reports, 2);

        let plus_two = hourly_activity(&reports, &FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(plus_two[1].reports, 2);
        assert_eq!(plus_two[6].reports, 1);
        assert_eq!(plus_two[23].reports, 0);
    }

    #[test]
    fn summary_figures() {
        let now = at(17, 12);
        let reports = vec![
            report(HackType::Aimbot, 9, 0, at(17, 8)),
            report(HackType::Aimbot, 0, 1, at(16, 8)),
            report(HackType::Teleport, 1, 0, at(15, 9)),
        ];
        let analytics = summarize(
            &reports,
            TimeRange::Week,
            now,
            &FixedOffset::east_opt(0).unwrap(),
        );
        assert_eq!(analytics.summary.total_reports, 3);
        assert_eq!(analytics.summary.high_credibility, 1);
        assert_eq!(analytics.summary.aimbot_reports, 2);
        assert_eq!(analytics.summary.peak_hour_reports, 2);
        assert_eq!(analytics.daily_trends.len(), 7);
    }
}
