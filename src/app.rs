use actix_web::web::{self, scope, Data};
use anyhow::Result;
use log::{log, Level};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{admin::*, endpoints::*, stats::*},
    auth::SECURITY_ENABLED,
    config::Config,
    storage::{BlobStore, LocalBlobStore},
};

pub struct AppState {
    pub db: Pool<Postgres>,
    pub blobs: Box<dyn BlobStore>,
    pub admin_password: String,
}

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    let cors = if *SECURITY_ENABLED {
        actix_cors::Cors::default()
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .allow_any_method()
            .max_age(3600)
    } else {
        actix_cors::Cors::permissive()
    };

    #[derive(OpenApi)]
    #[openapi(
        paths(
            admin_login,
            admin_logout,
            create_report,
            delete_report,
            get_admin_reports,
            get_analytics,
            get_detailed_stats,
            get_proof_file,
            get_report,
            get_reports,
            get_stats,
            get_version,
            search_handoff,
            search_reports,
            vote_report
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "HackWatch", description = "HackWatch community reporting API")
        ),
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme(
                    "admin",
                    SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
                );
            }
        }
    }

    let openapi = ApiDoc::openapi();

    cfg.service(SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", openapi))
        .service(
            scope("/api")
                .wrap(cors)
                .service(create_report)
                .service(get_reports)
                .service(get_report)
                .service(vote_report)
                .service(search_reports)
                .service(search_handoff)
                .service(get_proof_file)
                .service(get_stats)
                .service(get_detailed_stats)
                .service(get_analytics)
                .service(admin_login)
                .service(admin_logout)
                .service(get_admin_reports)
                .service(delete_report)
                .service(get_version),
        );
}

pub async fn get_app_data(config: &Config) -> Result<Data<AppState>> {
    let db = PgPoolOptions::new().connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    log!(Level::Info, "Successfully connected to database");
    Ok(Data::new(AppState {
        db,
        blobs: Box::new(LocalBlobStore::new(&config.proof_dir, &config.public_url)),
        admin_password: config.admin_password.clone(),
    }))
}
