use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use lf_api::{configure_routes, AppState};
use lf_auth_simple::SimpleAuthProvider;
use lf_core::models::{ResolvePolicy, SearchFields};
use lf_core::traits::MockBlobStore;
use lf_db_sqlite::SqliteReportCollection;
use serde_json::{json, Value};

const BOUNDARY: &str = "lostfoundboundary";

async fn state(resolve_policy: ResolvePolicy) -> web::Data<AppState> {
    // Without a photo part the blob store is never called.
    state_with_blobs(resolve_policy, MockBlobStore::new()).await
}

async fn state_with_blobs(resolve_policy: ResolvePolicy, blobs: MockBlobStore) -> web::Data<AppState> {
    let collection = SqliteReportCollection::new("sqlite::memory:").await.unwrap();
    web::Data::new(AppState {
        auth: Arc::new(SimpleAuthProvider::new()),
        collection: Arc::new(collection),
        blobs: Arc::new(blobs),
        resolve_policy,
        search_fields: SearchFields::TitleOnly,
    })
}

fn multipart(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn umbrella_form(email: &str, title: &str) -> String {
    multipart(&[
        ("title", title),
        ("kind", "found"),
        ("description", "Black umbrella with a wooden handle"),
        ("tags", "umbrella, rain"),
        ("color", "#000000"),
        ("occurredDate", "2024-01-15"),
        ("occurredTime", "09:30"),
        ("location", "Platform 2"),
        ("reporterName", "Robin Hill"),
        ("reporterEmail", email),
    ])
}

fn form_request(method: test::TestRequest, token: Option<&str>, body: String) -> test::TestRequest {
    let req = method
        .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(body);
    match token {
        Some(t) => req.insert_header((header::AUTHORIZATION, format!("Bearer {t}"))),
        None => req,
    }
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state.clone()).configure(configure_routes)).await
    };
}

macro_rules! sign_up {
    ($app:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/sign-up")
            .set_json(json!({ "email": $email, "password": "hunter22" }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["token"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn report_lifecycle() {
    let state = state(ResolvePolicy::AnyViewer).await;
    let app = app!(state);
    let owner = sign_up!(app, "robin@example.com");
    let stranger = sign_up!(app, "sky@example.com");

    // Create
    let req = form_request(
        test::TestRequest::post().uri("/reports"),
        Some(&owner),
        umbrella_form("robin@example.com", "Black Umbrella"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["tags"], json!(["umbrella", "rain"]));
    assert_eq!(created["resolved"], json!(false));
    assert_eq!(created["canManage"], json!(true));

    // List with filters; the stranger cannot manage it
    let req = test::TestRequest::get()
        .uri("/reports?kind=found&q=UMBRELLA&sort=latest")
        .insert_header((header::AUTHORIZATION, format!("Bearer {stranger}")))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["canManage"], json!(false));

    let req = test::TestRequest::get().uri("/reports?kind=lost").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert!(list.as_array().unwrap().is_empty());

    // The stranger may neither edit nor delete
    let req = form_request(
        test::TestRequest::put().uri(&format!("/reports/{id}")),
        Some(&stranger),
        umbrella_form("robin@example.com", "Hijacked"),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/reports/{id}"))
        .insert_header((header::AUTHORIZATION, format!("Bearer {stranger}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // The owner edits
    let req = form_request(
        test::TestRequest::put().uri(&format!("/reports/{id}")),
        Some(&owner),
        umbrella_form("robin@example.com", "Black Umbrella, large"),
    )
    .to_request();
    let edited: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(edited["title"], json!("Black Umbrella, large"));
    assert_eq!(edited["createdAt"], created["createdAt"]);

    // Anyone may resolve under the default policy
    let req = test::TestRequest::post()
        .uri(&format!("/reports/{id}/resolve"))
        .to_request();
    let resolved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resolved["resolved"], json!(true));

    // The owner deletes
    let req = test::TestRequest::delete()
        .uri(&format!("/reports/{id}"))
        .insert_header((header::AUTHORIZATION, format!("Bearer {owner}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri(&format!("/reports/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn photo_reports_carry_image_and_thumbnail_urls() {
    let mut blobs = MockBlobStore::new();
    blobs
        .expect_upload()
        .withf(|data: &Vec<u8>, content_type: &str| data.as_slice() == b"png-bytes" && content_type == "image/png")
        .times(1)
        .returning(|_, _| Ok("photo-1.png".into()));
    blobs.expect_url().returning(|r| format!("/media/{r}"));
    blobs.expect_thumbnail_url().returning(|r| format!("/media/thumb_{r}.webp"));

    let state = state_with_blobs(ResolvePolicy::AnyViewer, blobs).await;
    let app = app!(state);
    let token = sign_up!(app, "robin@example.com");

    let form = umbrella_form("robin@example.com", "Black Umbrella");
    let mut body = form.trim_end_matches(&format!("--{BOUNDARY}--\r\n")).to_string();
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"u.png\"\r\nContent-Type: image/png\r\n\r\npng-bytes\r\n--{BOUNDARY}--\r\n"
    ));

    let req = form_request(test::TestRequest::post().uri("/reports"), Some(&token), body).to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["imageRef"], json!("photo-1.png"));
    assert_eq!(created["imageUrl"], json!("/media/photo-1.png"));
    assert_eq!(created["thumbnailUrl"], json!("/media/thumb_photo-1.png.webp"));
}

#[actix_web::test]
async fn invalid_form_reports_field_errors() {
    let state = state(ResolvePolicy::AnyViewer).await;
    let app = app!(state);
    let token = sign_up!(app, "robin@example.com");

    let req = form_request(
        test::TestRequest::post().uri("/reports"),
        Some(&token),
        umbrella_form("robin@example.com", "Hi"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fields"]["title"], json!("must be at least 3 characters"));
    assert_eq!(body["fields"].as_object().unwrap().len(), 1);
}

#[actix_web::test]
async fn future_date_is_reported_apart_from_fields() {
    let state = state(ResolvePolicy::AnyViewer).await;
    let app = app!(state);
    let token = sign_up!(app, "robin@example.com");

    let tomorrow = (chrono::Utc::now() + chrono::Duration::days(2)).format("%Y-%m-%d").to_string();
    let body = multipart(&[
        ("title", "Blue Kite"),
        ("kind", "lost"),
        ("description", "Diamond kite with a long tail"),
        ("tags", "kite"),
        ("color", "blue"),
        ("occurredDate", &tomorrow),
        ("occurredTime", "10:00"),
        ("location", "Hill park"),
        ("reporterName", "Robin Hill"),
        ("reporterEmail", "robin@example.com"),
    ]);
    let req = form_request(test::TestRequest::post().uri("/reports"), Some(&token), body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("fields").is_none());
    assert!(body["futureDate"].as_str().unwrap().contains("future"));
}

#[actix_web::test]
async fn anonymous_submission_is_unauthorized() {
    let state = state(ResolvePolicy::AnyViewer).await;
    let app = app!(state);
    let req = form_request(
        test::TestRequest::post().uri("/reports"),
        None,
        umbrella_form("robin@example.com", "Black Umbrella"),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn owner_only_policy_blocks_anonymous_resolve() {
    let state = state(ResolvePolicy::OwnerOnly).await;
    let app = app!(state);
    let token = sign_up!(app, "robin@example.com");

    let req = form_request(
        test::TestRequest::post().uri("/reports"),
        Some(&token),
        umbrella_form("robin@example.com", "Black Umbrella"),
    )
    .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap();

    let req = test::TestRequest::post().uri(&format!("/reports/{id}/resolve")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn auth_errors_map_to_statuses() {
    let state = state(ResolvePolicy::AnyViewer).await;
    let app = app!(state);
    sign_up!(app, "robin@example.com");

    let req = test::TestRequest::post()
        .uri("/auth/sign-up")
        .set_json(json!({ "email": "robin@example.com", "password": "another1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/auth/sign-in")
        .set_json(json!({ "email": "robin@example.com", "password": "wrong-pass" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/sign-up")
        .set_json(json!({ "email": "robin", "password": "another1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
