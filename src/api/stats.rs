use actix_web::{
    get,
    web::{Data, Query},
    HttpResponse, Responder,
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use log::{log, Level};
use sqlx::{query_as, Pool, Postgres};

use crate::{
    analytics,
    api::{db::log_query_as, endpoints::REPORT_COLUMNS},
    app::AppState,
    credibility,
    schema::{
        api::{AnalyticsParams, DetailedStats, OverviewStats},
        db::Report,
    },
};

/// Reports sharing one pair of vote counters.
#[derive(sqlx::FromRow, Debug, Clone, Copy)]
pub struct VoteTally {
    pub upvotes: i32,
    pub downvotes: i32,
    pub reports: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Copy, Default)]
pub struct Activity {
    pub total_reports: i64,
    pub total_votes: i64,
    pub recent_24h: i64,
    pub this_week: i64,
    pub previous_week: i64,
}

async fn vote_tallies(db: &Pool<Postgres>) -> Result<Vec<VoteTally>, HttpResponse> {
    log_query_as(
        query_as::<_, VoteTally>(
            "SELECT upvotes, downvotes, COUNT(*) AS reports FROM reports
            GROUP BY upvotes, downvotes",
        )
        .fetch_all(db)
        .await,
    )
}

async fn activity(db: &Pool<Postgres>, now: DateTime<Utc>) -> Result<Activity, HttpResponse> {
    log_query_as(
        query_as::<_, Activity>(
            "SELECT
                COUNT(*) AS total_reports,
                (SELECT COUNT(*) FROM votes) AS total_votes,
                COUNT(*) FILTER (WHERE created_at >= $1) AS recent_24h,
                COUNT(*) FILTER (WHERE created_at >= $2) AS this_week,
                COUNT(*) FILTER (WHERE created_at >= $3 AND created_at < $2) AS previous_week
            FROM reports",
        )
        .bind(now - Duration::days(1))
        .bind(now - Duration::days(7))
        .bind(now - Duration::days(14))
        .fetch_one(db)
        .await,
    )
}

async fn reports_between(
    db: &Pool<Postgres>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Report>, HttpResponse> {
    log_query_as(
        query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(db)
        .await,
    )
}

fn count_matching(tallies: &[VoteTally], rule: fn(i32, i32) -> bool) -> i64 {
    tallies
        .iter()
        .filter(|t| rule(t.upvotes, t.downvotes))
        .map(|t| t.reports)
        .sum()
}

pub fn overview_stats(activity: &Activity, tallies: &[VoteTally]) -> OverviewStats {
    OverviewStats {
        total_reports: activity.total_reports,
        total_votes: activity.total_votes,
        suspicious_reports: count_matching(tallies, credibility::is_suspicious),
        recent_reports_24h: activity.recent_24h,
    }
}

/// Percentage change week over week, rounded half up.
pub fn weekly_trend(this_week: i64, previous_week: i64) -> i64 {
    let change =
        (this_week as f64 - previous_week as f64) / previous_week.max(1) as f64 * 100.0;
    (change + 0.5).floor() as i64
}

pub fn detailed_stats(activity: &Activity, tallies: &[VoteTally]) -> DetailedStats {
    DetailedStats {
        total_reports: activity.total_reports,
        total_votes: activity.total_votes,
        suspicious_reports: count_matching(tallies, credibility::is_corroborated_suspicious),
        recent_reports_24h: activity.recent_24h,
        verified_reports: count_matching(tallies, credibility::is_verified),
        false_reports: count_matching(tallies, credibility::is_false_report),
        active_users: activity.total_votes / 3,
        weekly_trend: weekly_trend(activity.this_week, activity.previous_week),
    }
}

#[utoipa::path(context_path = "/api", responses((status = 200, description = "Dashboard counters")))]
#[get("/stats")]
pub async fn get_stats(state: Data<AppState>) -> impl Responder {
    let activity = match activity(&state.db, Utc::now()).await {
        Ok(a) => a,
        Err(res) => return res,
    };
    let tallies = match vote_tallies(&state.db).await {
        Ok(t) => t,
        Err(res) => return res,
    };
    HttpResponse::Ok().json(overview_stats(&activity, &tallies))
}

#[utoipa::path(context_path = "/api", responses((status = 200, description = "Detailed community statistics")))]
#[get("/stats/detailed")]
pub async fn get_detailed_stats(state: Data<AppState>) -> impl Responder {
    let activity = match activity(&state.db, Utc::now()).await {
        Ok(a) => a,
        Err(res) => return res,
    };
    let tallies = match vote_tallies(&state.db).await {
        Ok(t) => t,
        Err(res) => return res,
    };
    HttpResponse::Ok().json(detailed_stats(&activity, &tallies))
}

#[utoipa::path(
    context_path = "/api",
    params(
        ("range" = Option<String>, Query, description = "7d, 30d (default) or 90d"),
        ("tz_offset" = Option<i32>, Query, description = "Viewer's UTC offset in minutes"),
    ),
    responses(
        (status = 200, description = "Distribution, trend, credibility and hourly buckets"),
        (status = 400, description = "Invalid timezone offset"),
    )
)]
#[get("/analytics")]
pub async fn get_analytics(state: Data<AppState>, params: Query<AnalyticsParams>) -> impl Responder {
    let range = params.range.unwrap_or_default();
    let offset = match FixedOffset::east_opt(params.tz_offset.unwrap_or(0).saturating_mul(60)) {
        Some(offset) => offset,
        None => return HttpResponse::BadRequest().body("Invalid timezone offset"),
    };

    let now = Utc::now();
    let reports = match reports_between(&state.db, range.start(now), now).await {
        Ok(r) => r,
        Err(res) => return res,
    };
    log!(
        Level::Debug,
        "analytics over {} reports for {:?}",
        reports.len(),
        range
    );
    HttpResponse::Ok().json(analytics::summarize(&reports, range, now, &offset))
}
