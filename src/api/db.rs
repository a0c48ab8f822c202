use actix_web::HttpResponse;
use log::{log, Level};
use sqlx::{postgres::PgQueryResult, Error, Pool, Postgres, Transaction};

pub async fn open_transaction(db: &Pool<Postgres>) -> Result<Transaction<Postgres>, HttpResponse> {
    match db.try_begin().await {
        Ok(Some(t)) => Ok(t),
        Ok(None) => {
            log!(Level::Error, "Failed to open transaction: pool closed");
            Err(HttpResponse::InternalServerError().body("Internal DB Error"))
        }
        Err(e) => {
            log!(Level::Error, "Failed to open transaction: {e}");
            Err(HttpResponse::InternalServerError().body("Internal DB Error"))
        }
    }
}

/// Maps a failed query to a logged 500 response.
pub fn log_query_as<T>(query: Result<T, Error>) -> Result<T, HttpResponse> {
    query.map_err(|e| {
        log!(Level::Warn, "DB Query failed: {}", e);
        HttpResponse::InternalServerError().body("Internal DB Error")
    })
}

pub fn log_query(query: Result<PgQueryResult, Error>) -> Result<PgQueryResult, HttpResponse> {
    log_query_as(query)
}
