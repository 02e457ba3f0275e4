//! # lf-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the
//! `ReportService`. Each request gets a service bound to the identity behind
//! its bearer token, so ownership checks stay inside the service.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use lf_core::error::AppError;
use lf_core::models::{Identity, Report, ReportKind, ResolvePolicy, SearchFields, SortKey};
use lf_core::service::ReportService;
use lf_core::traits::{Authenticator, BlobStore, IdentityProvider, ReportCollection, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ApiError;
use crate::forms::read_report_form;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub auth: Arc<dyn Authenticator>,
    pub collection: Arc<dyn ReportCollection>,
    pub blobs: Arc<dyn BlobStore>,
    pub resolve_policy: ResolvePolicy,
    pub search_fields: SearchFields,
}

impl AppState {
    /// A service acting for whoever holds the request's bearer token.
    pub fn service_for(&self, req: &HttpRequest) -> ReportService {
        let identity = bearer_token(req).and_then(|token| self.auth.identity_for_token(token));
        ReportService::new(
            Arc::new(RequestIdentity(identity)),
            Arc::clone(&self.collection),
            Arc::clone(&self.blobs),
        )
        .with_resolve_policy(self.resolve_policy)
        .with_search_fields(self.search_fields)
    }

    fn view(&self, service: &ReportService, report: Report) -> ReportView {
        ReportView {
            image_url: report.image_ref.as_deref().map(|r| self.blobs.url(r)),
            thumbnail_url: report.image_ref.as_deref().map(|r| self.blobs.thumbnail_url(r)),
            can_manage: service.can_manage(&report),
            report,
        }
    }
}

/// The identity of a single request. It never changes, so its stream
/// yields nothing after the initial value.
struct RequestIdentity(Option<Identity>);

impl IdentityProvider for RequestIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        watch::channel(self.0.clone()).1
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A report as sent to clients.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Whether edit and delete should be offered to this caller.
    pub can_manage: bool,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionView {
    pub token: String,
    pub email: String,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self { token: session.token, email: session.identity.email }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub kind: Option<ReportKind>,
    pub q: Option<String>,
    pub sort: Option<SortKey>,
}

pub async fn sign_up(
    data: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let Credentials { email, password } = body.into_inner();
    let auth = Arc::clone(&data.auth);
    // Argon2 hashing is CPU bound; keep it off the async workers.
    let session = web::block(move || auth.sign_up(&email, &password))
        .await
        .map_err(|e| AppError::Collaborator(anyhow::anyhow!("sign-up worker failed: {e}")))??;
    Ok(HttpResponse::Created().json(SessionView::from(session)))
}

pub async fn sign_in(
    data: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let Credentials { email, password } = body.into_inner();
    let auth = Arc::clone(&data.auth);
    let session = web::block(move || auth.sign_in(&email, &password))
        .await
        .map_err(|e| AppError::Collaborator(anyhow::anyhow!("sign-in worker failed: {e}")))??;
    Ok(HttpResponse::Ok().json(SessionView::from(session)))
}

pub async fn sign_out(data: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(token) = bearer_token(&req) {
        data.auth.sign_out(token);
    }
    HttpResponse::NoContent().finish()
}

/// Lists one kind of report, filtered by `q` and sorted by `sort`.
pub async fn list_reports(
    data: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<ListParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let service = data.service_for(&req);
    let query = service
        .query(params.kind.unwrap_or(ReportKind::Lost))
        .with_text(params.q.unwrap_or_default())
        .with_sort(params.sort.unwrap_or_default());

    let views: Vec<ReportView> = service
        .browse(&query)
        .into_iter()
        .map(|report| data.view(&service, report))
        .collect();
    HttpResponse::Ok().json(views)
}

pub async fn get_report(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let service = data.service_for(&req);
    let report = service.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(data.view(&service, report)))
}

/// Orchestrates the creation of a new report from a multipart form.
pub async fn create_report(
    data: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let service = data.service_for(&req);
    let form = read_report_form(payload).await?;
    let report = service.submit(form.draft, form.image).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/reports/{}", report.id)))
        .json(data.view(&service, report)))
}

pub async fn update_report(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let service = data.service_for(&req);
    let (draft, image) = read_report_form(payload).await?.image_change();
    let report = service.edit(&path.into_inner(), draft, image).await?;
    Ok(HttpResponse::Ok().json(data.view(&service, report)))
}

pub async fn delete_report(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.service_for(&req).delete(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn resolve_report(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let service = data.service_for(&req);
    let report = service.resolve(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(data.view(&service, report)))
}
