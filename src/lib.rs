pub mod analytics;
pub mod app;
pub mod auth;
pub mod config;
pub mod credibility;
pub mod session;
pub mod storage;
pub mod utils;
pub mod votes;

pub mod schema {
    pub mod api;
    pub mod db;
}

pub mod api {
    pub mod admin;
    pub mod db;
    pub mod endpoints;
    pub mod stats;
}
