//! Maps core errors onto HTTP responses.

use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use lf_core::error::AppError;
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    /// The request itself could not be read (broken multipart, oversized file)
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    future_date: Option<String>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(e) => match e {
                AppError::NotFound(..) => StatusCode::NOT_FOUND,
                AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AppError::Conflict(_) => StatusCode::CONFLICT,
                AppError::Forbidden(_) => StatusCode::FORBIDDEN,
                AppError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{:#}", self);
        }

        let body = match self {
            ApiError::App(AppError::Validation(errors)) => ErrorBody {
                error: "validation failed".into(),
                fields: errors
                    .fields
                    .iter()
                    .map(|(field, e)| (field.to_string(), e.to_string()))
                    .collect(),
                future_date: errors.future_date.as_ref().map(|f| f.to_string()),
            },
            other => ErrorBody {
                error: other.to_string(),
                fields: BTreeMap::new(),
                future_date: None,
            },
        };
        HttpResponse::build(status).json(body)
    }
}
