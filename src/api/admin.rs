use actix_web::{
    delete, get, post,
    web::{Data, Json, Path},
    HttpResponse, Responder,
};
use chrono::{DateTime, Duration, Utc};
use log::{log, Level};
use sqlx::{query, query_as};

use crate::{
    api::{
        db::{log_query, log_query_as},
        endpoints::{parse_id, REPORT_COLUMNS},
    },
    app::AppState,
    auth::{password_matches, AdminAuth},
    credibility,
    schema::{
        api::{to_responses, AdminLogin, AdminReports, AdminStats},
        db::Report,
    },
    session,
};

pub fn admin_stats(reports: &[Report], now: DateTime<Utc>) -> AdminStats {
    let last_24h = now - Duration::hours(24);
    AdminStats {
        total: reports.len(),
        recent: reports.iter().filter(|r| r.created_at > last_24h).count(),
        flagged: reports
            .iter()
            .filter(|r| credibility::is_flagged(r.upvotes, r.downvotes))
            .count(),
    }
}

#[utoipa::path(
    context_path = "/api",
    responses(
        (status = 200, description = "Password accepted"),
        (status = 401, description = "Invalid admin password"),
    )
)]
#[post("/admin/login")]
pub async fn admin_login(state: Data<AppState>, body: Json<AdminLogin>) -> impl Responder {
    if password_matches(&state, &body.password) {
        log!(Level::Info, "Admin unlocked");
        HttpResponse::Ok().cookie(session::admin_cookie()).finish()
    } else {
        HttpResponse::Unauthorized().body("Invalid admin password.")
    }
}

#[utoipa::path(context_path = "/api", responses((status = 204, description = "Admin flag cleared")))]
#[post("/admin/logout")]
pub async fn admin_logout() -> impl Responder {
    HttpResponse::NoContent()
        .cookie(session::removal(session::ADMIN_COOKIE))
        .finish()
}

#[utoipa::path(
    context_path = "/api",
    responses(
        (status = 200, description = "Every report, newest first, with moderation counters"),
        (status = 401, description = "Missing or wrong admin password"),
    ),
    security(("admin" = []))
)]
#[get("/admin/reports", wrap = "AdminAuth::required()")]
pub async fn get_admin_reports(state: Data<AppState>) -> impl Responder {
    let reports = query_as::<_, Report>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC"
    ))
    .fetch_all(&state.db)
    .await;

    match log_query_as(reports) {
        Ok(reports) => HttpResponse::Ok().json(AdminReports {
            stats: admin_stats(&reports, Utc::now()),
            reports: to_responses(reports),
        }),
        Err(res) => res,
    }
}

#[utoipa::path(
    context_path = "/api",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 401, description = "Missing or wrong admin password"),
        (status = 404, description = "Report could not be found"),
    ),
    security(("admin" = []))
)]
#[delete("/admin/reports/{id}", wrap = "AdminAuth::required()")]
pub async fn delete_report(state: Data<AppState>, path: Path<(String,)>) -> impl Responder {
    let (id,) = path.into_inner();
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match log_query(
        query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await,
    ) {
        Ok(result) if result.rows_affected() == 0 => {
            HttpResponse::NotFound().body("Report could not be found")
        }
        Ok(_) => {
            log!(Level::Info, "Deleted report {id}");
            HttpResponse::NoContent().finish()
        }
        Err(res) => res,
    }
}
