use actix_multipart::Multipart;
use actix_web::{
    get, post,
    web::{Data, Json, Path, Query},
    HttpRequest, HttpResponse, Responder,
};
use chrono::{Duration, Utc};
use futures::StreamExt;
use log::{log, Level};
use sqlx::query_as;
use uuid::Uuid;

use crate::{
    api::db::{log_query_as, open_transaction},
    app::AppState,
    credibility,
    schema::{
        api::{
            to_responses, FetchParams, NewVote, ReportPage, ReportResponse, SearchHandoff,
            SearchParams, SearchResponse, SearchStats, SortOrder, VersionResponse, VoteResponse,
            PAGE_SIZE,
        },
        db::{HackType, Report},
    },
    session::{self, SearchHistory},
    storage::{content_type_for, is_plain_name, PROOF_BUCKET},
    utils::{
        check_proof_file, description_or_default, is_present, like_pattern, proof_file_name,
        ProofFile, ProofSelection, MAX_PROOF_FILE_BYTES,
    },
    votes::{cast_vote, generate_fingerprint, is_valid_fingerprint, PgVoteStore, VoteError},
};

pub(crate) const REPORT_COLUMNS: &str =
    "id, ign, uid, hack_type, description, proof_urls, upvotes, downvotes, created_at";

pub(crate) fn parse_id(id: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(id).map_err(|_| {
        log!(Level::Warn, "Invalid id {id}");
        HttpResponse::BadRequest().body("Invalid id")
    })
}

#[derive(Default, Debug)]
struct ReportForm {
    ign: String,
    uid: String,
    hack_type: Option<HackType>,
    description: Option<String>,
    proofs: ProofSelection,
}

/// Row values of a submission, before the store assigns id and timestamp.
#[derive(Debug, PartialEq)]
struct NewReport {
    ign: String,
    uid: String,
    hack_type: HackType,
    description: String,
    proof_urls: Vec<String>,
    upvotes: i32,
    downvotes: i32,
}

impl ReportForm {
    /// Applies the submission defaults. Proof URLs are filled in once the
    /// files are uploaded.
    fn into_new_report(self) -> Result<(NewReport, Vec<ProofFile>), &'static str> {
        if !is_present(&self.ign) || !is_present(&self.uid) {
            return Err("Please fill in the player IGN and UID.");
        }
        let report = NewReport {
            ign: self.ign.trim().to_string(),
            uid: self.uid.trim().to_string(),
            hack_type: self.hack_type.unwrap_or_default(),
            description: description_or_default(self.description.as_deref()),
            proof_urls: Vec::new(),
            upvotes: 0,
            downvotes: 0,
        };
        Ok((report, self.proofs.into_files()))
    }
}

async fn read_field(
    field: &mut actix_multipart::Field,
    limit: usize,
    too_large: &'static str,
) -> Result<Vec<u8>, HttpResponse> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            log!(Level::Warn, "Error reading multipart field: {e}");
            HttpResponse::BadRequest().body("Malformed multipart body")
        })?;
        if bytes.len() + chunk.len() > limit {
            return Err(HttpResponse::BadRequest().body(too_large));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_report_form(mut payload: Multipart) -> Result<ReportForm, HttpResponse> {
    let mut form = ReportForm::default();
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            log!(Level::Warn, "Malformed multipart body: {e}");
            HttpResponse::BadRequest().body("Malformed multipart body")
        })?;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => return Err(HttpResponse::BadRequest().body("Missing content disposition")),
        };

        match filename {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .cloned()
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM);
                // Reject before buffering anything we would throw away.
                if let Err(e) = check_proof_file(&content_type, 0) {
                    return Err(HttpResponse::BadRequest().body(e.to_string()));
                }
                let bytes = read_field(
                    &mut field,
                    MAX_PROOF_FILE_BYTES,
                    "File too large: please upload files smaller than 10MB.",
                )
                .await?;
                form.proofs
                    .add(ProofFile {
                        name: filename,
                        content_type,
                        bytes,
                    })
                    .map_err(|e| HttpResponse::BadRequest().body(e.to_string()))?;
            }
            None => {
                let value = read_field(&mut field, 64 * 1024, "Form field too large").await?;
                let value = String::from_utf8_lossy(&value).to_string();
                match name.as_str() {
                    "ign" => form.ign = value,
                    "uid" => form.uid = value,
                    "hack_type" if value.trim().is_empty() => {}
                    "hack_type" => match HackType::parse(value.trim()) {
                        Some(t) => form.hack_type = Some(t),
                        None => {
                            return Err(HttpResponse::BadRequest().body("Unknown hack type"))
                        }
                    },
                    "description" => form.description = Some(value),
                    other => log!(Level::Debug, "Ignoring form field {other}"),
                }
            }
        }
    }
    Ok(form)
}

#[utoipa::path(
    context_path = "/api",
    responses(
        (status = 201, description = "Report created"),
        (status = 400, description = "Missing fields or invalid proof files"),
        (status = 500, description = "Upload or database failure"),
    )
)]
#[post("/reports")]
pub async fn create_report(state: Data<AppState>, payload: Multipart) -> impl Responder {
    log!(Level::Info, "POST /api/reports");

    let form = match read_report_form(payload).await {
        Ok(form) => form,
        Err(res) => return res,
    };
    let (mut report, files) = match form.into_new_report() {
        Ok(parts) => parts,
        Err(msg) => return HttpResponse::BadRequest().body(msg),
    };

    for file in files {
        let name = proof_file_name(&file.name, Utc::now().timestamp_millis());
        match state.blobs.upload(PROOF_BUCKET, &name, &file.bytes).await {
            Ok(url) => report.proof_urls.push(url),
            Err(e) => {
                log!(Level::Error, "Proof upload failed for {name}: {e}");
                return HttpResponse::InternalServerError().body("Failed to upload proof files");
            }
        }
    }
    log!(Level::Trace, "uploaded {} proof files", report.proof_urls.len());

    let insert = query_as::<_, Report>(&format!(
        "INSERT INTO reports (ign, uid, hack_type, description, proof_urls, upvotes, downvotes)
        VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {REPORT_COLUMNS}"
    ))
    .bind(&report.ign)
    .bind(&report.uid)
    .bind(report.hack_type)
    .bind(&report.description)
    .bind(&report.proof_urls)
    .bind(report.upvotes)
    .bind(report.downvotes)
    .fetch_one(&state.db)
    .await;

    match log_query_as(insert) {
        Ok(report) => HttpResponse::Created().json(ReportResponse::from(report)),
        Err(res) => {
            if !report.proof_urls.is_empty() {
                log!(Level::Warn, "Orphaned proof files: {:?}", report.proof_urls);
            }
            res
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    params(
        ("hack_type" = Option<String>, Query, description = "Only reports of this hack type"),
        ("sort" = Option<String>, Query, description = "recent (default) or popular"),
        ("page" = Option<u32>, Query, description = "Zero-based page of 10 reports"),
    ),
    responses((status = 200, description = "One page of reports"))
)]
#[get("/reports")]
pub async fn get_reports(state: Data<AppState>, params: Query<FetchParams>) -> impl Responder {
    let page = params.page.unwrap_or(0);
    let order = match params.sort.unwrap_or_default() {
        SortOrder::Recent => "created_at DESC",
        SortOrder::Popular => "upvotes DESC, created_at DESC",
    };

    let reports = query_as::<_, Report>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports
        WHERE ($1::hack_type IS NULL OR hack_type = $1)
        ORDER BY {order}
        LIMIT $2 OFFSET $3"
    ))
    .bind(params.hack_type)
    .bind(PAGE_SIZE)
    .bind(i64::from(page) * PAGE_SIZE)
    .fetch_all(&state.db)
    .await;

    match log_query_as(reports) {
        Ok(reports) => {
            let suspicious_on_page = reports
                .iter()
                .filter(|r| credibility::is_suspicious(r.upvotes, r.downvotes))
                .count();
            HttpResponse::Ok().json(ReportPage {
                has_more: reports.len() as i64 == PAGE_SIZE,
                page,
                suspicious_on_page,
                reports: to_responses(reports),
            })
        }
        Err(res) => res,
    }
}

#[utoipa::path(
    context_path = "/api",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "The report"),
        (status = 404, description = "Report could not be found"),
    )
)]
#[get("/reports/{id}")]
pub async fn get_report(state: Data<AppState>, path: Path<(String,)>) -> impl Responder {
    let (id,) = path.into_inner();
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    let report = query_as::<_, Report>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await;

    match log_query_as(report) {
        Ok(Some(report)) => HttpResponse::Ok().json(ReportResponse::from(report)),
        Ok(None) => HttpResponse::NotFound().body("Report could not be found"),
        Err(res) => res,
    }
}

#[utoipa::path(
    context_path = "/api",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Vote recorded (or unchanged)"),
        (status = 404, description = "Report could not be found"),
    )
)]
#[post("/reports/{id}/vote")]
pub async fn vote_report(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<(String,)>,
    body: Json<NewVote>,
) -> impl Responder {
    let (id,) = path.into_inner();
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    let fingerprint = match body.fingerprint.clone().or_else(|| session::fingerprint(&req)) {
        Some(fp) if is_valid_fingerprint(&fp) => fp,
        Some(_) => return HttpResponse::BadRequest().body("Invalid fingerprint"),
        None => generate_fingerprint(),
    };

    let tx = match open_transaction(&state.db).await {
        Ok(t) => t,
        Err(res) => return res,
    };
    let mut store = PgVoteStore::new(tx);

    let outcome = match cast_vote(&mut store, id, &fingerprint, body.vote_type).await {
        Ok(outcome) => outcome,
        Err(VoteError::ReportNotFound(_)) => {
            return HttpResponse::NotFound().body("Report could not be found")
        }
        Err(VoteError::Store(e)) => {
            log!(Level::Warn, "Vote on {id} failed: {e}");
            return HttpResponse::InternalServerError()
                .body("Failed to record your vote. Please try again.");
        }
    };

    if let Err(e) = store.commit().await {
        log!(Level::Error, "Transaction failed to commit: {e}");
        return HttpResponse::InternalServerError()
            .body("Failed to record your vote. Please try again.");
    }

    HttpResponse::Ok()
        .cookie(session::fingerprint_cookie(&fingerprint))
        .json(VoteResponse {
            report_id: id,
            vote_type: body.vote_type,
            fingerprint,
            upvotes: outcome.upvotes,
            downvotes: outcome.downvotes,
            action: outcome.action,
            credibility: credibility::classify(outcome.upvotes, outcome.downvotes),
        })
}

pub fn search_stats(reports: &[Report], now: chrono::DateTime<Utc>) -> SearchStats {
    let yesterday = now - Duration::days(1);
    SearchStats {
        total_found: reports.len(),
        suspicious_count: reports
            .iter()
            .filter(|r| credibility::is_suspicious(r.upvotes, r.downvotes))
            .count(),
        recent_count: reports.iter().filter(|r| r.created_at >= yesterday).count(),
    }
}

#[utoipa::path(
    context_path = "/api",
    params(
        ("q" = Option<String>, Query, description = "Substring of the player's IGN or UID"),
        ("hack_type" = Option<String>, Query, description = "Only reports of this hack type"),
    ),
    responses((status = 200, description = "Matching reports, newest first"))
)]
#[get("/search")]
pub async fn search_reports(
    state: Data<AppState>,
    req: HttpRequest,
    params: Query<SearchParams>,
) -> impl Responder {
    let mut history = SearchHistory::from_request(&req);
    let handoff = session::take_handoff(&req);
    let query = params
        .q
        .clone()
        .filter(|q| !q.trim().is_empty())
        .or_else(|| handoff.clone())
        .unwrap_or_default();

    let mut response = HttpResponse::Ok();
    if handoff.is_some() {
        response.cookie(session::removal(session::SEARCH_HANDOFF_COOKIE));
    }

    if query.trim().is_empty() {
        return response.json(SearchResponse {
            query,
            reports: Vec::new(),
            stats: SearchStats::default(),
            history: history.entries().to_vec(),
        });
    }

    let reports = query_as::<_, Report>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports
        WHERE (ign ILIKE $1 OR uid ILIKE $1)
        AND ($2::hack_type IS NULL OR hack_type = $2)
        ORDER BY created_at DESC"
    ))
    .bind(like_pattern(&query))
    .bind(params.hack_type)
    .fetch_all(&state.db)
    .await;

    match log_query_as(reports) {
        Ok(reports) => {
            history.record(&query);
            response.cookie(history.to_cookie()).json(SearchResponse {
                stats: search_stats(&reports, Utc::now()),
                reports: to_responses(reports),
                history: history.entries().to_vec(),
                query,
            })
        }
        Err(res) => res,
    }
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 204, description = "Query stored for the next search"))
)]
#[post("/search/handoff")]
pub async fn search_handoff(body: Json<SearchHandoff>) -> impl Responder {
    if body.q.trim().is_empty() {
        return HttpResponse::BadRequest().body("Empty search query");
    }
    HttpResponse::NoContent()
        .cookie(session::handoff_cookie(body.q.trim()))
        .finish()
}

#[utoipa::path(
    context_path = "/api",
    params(("name" = String, Path, description = "Stored proof file name")),
    responses(
        (status = 200, description = "The file"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "No such file"),
        (status = 500, description = "Blob store failure"),
    )
)]
#[get("/proof-files/{name}")]
pub async fn get_proof_file(state: Data<AppState>, path: Path<(String,)>) -> impl Responder {
    let (name,) = path.into_inner();
    if !is_plain_name(&name) {
        return HttpResponse::BadRequest().body("Invalid file name");
    }
    match state.blobs.download(PROOF_BUCKET, &name).await {
        Ok(Some(bytes)) => HttpResponse::Ok()
            .content_type(content_type_for(&name))
            .body(bytes),
        Ok(None) => HttpResponse::NotFound().body("File could not be found"),
        Err(e) => {
            log!(Level::Error, "Could not read proof file {name}: {e}");
            HttpResponse::InternalServerError().body("Failed to read proof file")
        }
    }
}

#[utoipa::path(context_path = "/api", responses((status = 200, description = "Build information")))]
#[get("/version")]
pub async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(VersionResponse {
        build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        git_sha: option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
    })
}
