//! Per-client state kept in cookies. Only the owning client reads or writes
//! these; nothing here is shared between clients.

use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    HttpRequest,
};
use log::{log, Level};

pub const FINGERPRINT_COOKIE: &str = "user_fingerprint";
pub const SEARCH_HISTORY_COOKIE: &str = "search_history";
pub const SEARCH_HANDOFF_COOKIE: &str = "search_handoff";
pub const ADMIN_COOKIE: &str = "admin_authenticated";

pub const SEARCH_HISTORY_LEN: usize = 5;

fn persistent(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365))
        .finish()
}

pub fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn fingerprint(req: &HttpRequest) -> Option<String> {
    req.cookie(FINGERPRINT_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.trim().is_empty())
}

pub fn fingerprint_cookie(fingerprint: &str) -> Cookie<'static> {
    persistent(FINGERPRINT_COOKIE, fingerprint.to_string())
}

pub fn admin_cookie() -> Cookie<'static> {
    persistent(ADMIN_COOKIE, "true".to_string())
}

/// Most recent searches first, no duplicates, at most five.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchHistory(Vec<String>);

impl SearchHistory {
    pub fn from_request(req: &HttpRequest) -> Self {
        match req.cookie(SEARCH_HISTORY_COOKIE) {
            Some(cookie) => Self::decode(cookie.value()),
            None => Self::default(),
        }
    }

    /// Parses the cookie value as actix hands it over, already
    /// percent-decoded once.
    pub fn decode(value: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(value) {
            Ok(mut entries) => {
                entries.truncate(SEARCH_HISTORY_LEN);
                Self(entries)
            }
            Err(e) => {
                log!(Level::Debug, "Discarding unreadable search history: {e}");
                Self::default()
            }
        }
    }

    pub fn record(&mut self, query: &str) {
        if query.trim().is_empty() {
            return;
        }
        self.0.retain(|q| q != query);
        self.0.insert(0, query.to_string());
        self.0.truncate(SEARCH_HISTORY_LEN);
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn to_cookie(&self) -> Cookie<'static> {
        let json = serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string());
        persistent(SEARCH_HISTORY_COOKIE, urlencoding::encode(&json).into_owned())
    }
}

/// Takes the one-shot query left by another view, if any.
pub fn take_handoff(req: &HttpRequest) -> Option<String> {
    req.cookie(SEARCH_HANDOFF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|q| !q.trim().is_empty())
}

pub fn handoff_cookie(query: &str) -> Cookie<'static> {
    Cookie::build(SEARCH_HANDOFF_COOKIE, urlencoding::encode(query).into_owned())
        .path("/")
        .same_site(SameSite::Lax)
        .finish()
}
