use actix_web::{
    http::{header, StatusCode},
    test,
    web::Data,
    App,
};
use hackwatch_backend::{
    app::{configure_app, AppState},
    storage::{BlobStore, LocalBlobStore, PROOF_BUCKET},
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;

const BOUNDARY: &str = "hackwatch-test-boundary";

fn state(proof_dir: &std::path::Path) -> Data<AppState> {
    let db = PgPoolOptions::new()
        .connect_lazy("postgres://hackwatch@localhost/hackwatch")
        .unwrap();
    Data::new(AppState {
        db,
        blobs: Box::new(LocalBlobStore::new(proof_dir, "http://localhost:3000")),
        admin_password: "hunter2".to_string(),
    })
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(filename, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"proof\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn report_request(parts: &[Part]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/reports")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart(parts))
}

#[actix_web::test]
async fn version_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/version").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.get("build_timestamp").is_some());
    assert!(body.get("git_sha").is_some());
}

#[actix_web::test]
async fn admin_login_checks_the_password() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/admin/login")
        .set_json(serde_json::json!({ "password": "nope" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri("/api/admin/login")
        .set_json(serde_json::json!({ "password": "hunter2" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res
        .response()
        .cookies()
        .any(|c| c.name() == "admin_authenticated" && c.value() == "true"));
}

#[actix_web::test]
async fn admin_routes_need_the_password() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = test::TestRequest::delete()
        .uri("/api/admin/reports/00000000-0000-0000-0000-000000000000")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/api/admin/reports")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn reports_need_ign_and_uid() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = report_request(&[Part::Text("ign", "   "), Part::Text("uid", "123456")]).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = test::read_body(res).await;
    assert_eq!(body, "Please fill in the player IGN and UID.");
}

#[actix_web::test]
async fn proof_files_are_checked_before_anything_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = report_request(&[
        Part::Text("ign", "PlayerX"),
        Part::Text("uid", "123456"),
        Part::File("notes.txt", "text/plain", b"hello"),
    ])
    .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test::read_body(res).await,
        "Invalid file type: please upload only images or videos."
    );

    let png: &[u8] = b"\x89PNG";
    let mut parts = vec![Part::Text("ign", "PlayerX"), Part::Text("uid", "123456")];
    for _ in 0..6 {
        parts.push(Part::File("shot.png", "image/png", png));
    }
    let res = test::call_service(&app, report_request(&parts).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test::read_body(res).await,
        "Too many files: you can only upload up to 5 files."
    );

    assert!(!dir.path().join(PROOF_BUCKET).exists());
}

#[actix_web::test]
async fn empty_search_returns_history_without_querying() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let history = urlencoding::encode(r#"["PlayerX","123456"]"#).into_owned();
    let req = test::TestRequest::get()
        .uri("/api/search?q=")
        .insert_header((header::COOKIE, format!("search_history={history}")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["reports"], serde_json::json!([]));
    assert_eq!(body["stats"]["total_found"], 0);
    assert_eq!(body["history"], serde_json::json!(["PlayerX", "123456"]));
}

#[actix_web::test]
async fn search_handoff_sets_a_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/search/handoff")
        .set_json(serde_json::json!({ "q": "PlayerX" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res
        .response()
        .cookies()
        .any(|c| c.name() == "search_handoff" && c.value() == "PlayerX"));

    let req = test::TestRequest::post()
        .uri("/api/search/handoff")
        .set_json(serde_json::json!({ "q": "  " }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn stored_proofs_are_served_back() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    state
        .blobs
        .upload(PROOF_BUCKET, "1700000000000-abc123.png", b"\x89PNG")
        .await
        .unwrap();
    let app = test::init_service(App::new().app_data(state).configure(configure_app)).await;

    let req = test::TestRequest::get()
        .uri("/api/proof-files/1700000000000-abc123.png")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    let req = test::TestRequest::get()
        .uri("/api/proof-files/missing.png")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn proof_reads_tell_bad_names_from_store_failures() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where a file is expected makes the read itself fail.
    std::fs::create_dir_all(dir.path().join(PROOF_BUCKET).join("folder.png")).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state(dir.path()))
            .configure(configure_app),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/proof-files/.hidden.png")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri("/api/proof-files/folder.png")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
