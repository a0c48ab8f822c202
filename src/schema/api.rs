use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    analytics::TimeRange,
    credibility::{self, Credibility},
    schema::db::{HackType, Report, VoteType},
    utils::is_video_url,
    votes::VoteRecordAction,
};

pub const PAGE_SIZE: i64 = 10;

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Recent,
    Popular,
}

#[derive(Deserialize, Debug)]
pub struct FetchParams {
    pub hack_type: Option<HackType>,
    pub sort: Option<SortOrder>,
    pub page: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    pub q: Option<String>,
    pub hack_type: Option<HackType>,
}

#[derive(Deserialize, Debug)]
pub struct SearchHandoff {
    pub q: String,
}

#[derive(Deserialize, Debug)]
pub struct AnalyticsParams {
    pub range: Option<TimeRange>,
    /// Viewer's UTC offset in minutes, east positive.
    pub tz_offset: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct NewVote {
    pub vote_type: VoteType,
    pub fingerprint: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AdminLogin {
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct ProofLink {
    pub url: String,
    pub is_video: bool,
}

#[derive(Serialize, Debug)]
pub struct ReportResponse {
    pub id: Uuid,
    pub ign: String,
    pub uid: String,
    pub hack_type: HackType,
    pub hack_type_label: &'static str,
    pub description: String,
    pub proof_urls: Vec<String>,
    pub proofs: Vec<ProofLink>,
    pub upvotes: i32,
    pub downvotes: i32,
    pub credibility: Credibility,
    pub flagged: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            credibility: credibility::classify(report.upvotes, report.downvotes),
            flagged: credibility::is_flagged(report.upvotes, report.downvotes),
            hack_type_label: report.hack_type.label(),
            proofs: report
                .proof_urls
                .iter()
                .map(|url| ProofLink {
                    url: url.clone(),
                    is_video: is_video_url(url),
                })
                .collect(),
            id: report.id,
            ign: report.ign,
            uid: report.uid,
            hack_type: report.hack_type,
            description: report.description,
            proof_urls: report.proof_urls,
            upvotes: report.upvotes,
            downvotes: report.downvotes,
            created_at: report.created_at,
        }
    }
}

pub fn to_responses(reports: Vec<Report>) -> Vec<ReportResponse> {
    reports.into_iter().map(ReportResponse::from).collect()
}

#[derive(Serialize, Debug)]
pub struct ReportPage {
    pub reports: Vec<ReportResponse>,
    pub page: u32,
    pub has_more: bool,
    pub suspicious_on_page: usize,
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub total_found: usize,
    pub suspicious_count: usize,
    pub recent_count: usize,
}

#[derive(Serialize, Debug)]
pub struct SearchResponse {
    pub query: String,
    pub reports: Vec<ReportResponse>,
    pub stats: SearchStats,
    pub history: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct VoteResponse {
    pub report_id: Uuid,
    pub vote_type: VoteType,
    pub fingerprint: String,
    pub upvotes: i32,
    pub downvotes: i32,
    pub action: VoteRecordAction,
    pub credibility: Credibility,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct OverviewStats {
    pub total_reports: i64,
    pub total_votes: i64,
    pub suspicious_reports: i64,
    pub recent_reports_24h: i64,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct DetailedStats {
    pub total_reports: i64,
    pub total_votes: i64,
    pub suspicious_reports: i64,
    pub recent_reports_24h: i64,
    pub verified_reports: i64,
    pub false_reports: i64,
    pub active_users: i64,
    pub weekly_trend: i64,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct AdminStats {
    pub total: usize,
    pub recent: usize,
    pub flagged: usize,
}

#[derive(Serialize, Debug)]
pub struct AdminReports {
    pub reports: Vec<ReportResponse>,
    pub stats: AdminStats,
}

#[derive(Serialize, Debug)]
pub struct VersionResponse {
    pub build_timestamp: &'static str,
    pub git_sha: &'static str,
}
