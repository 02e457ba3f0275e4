//! # Document Codec
//!
//! Converts between `Report` and the JSON document body kept by a document
//! collection. The id lives beside the body, not inside it.
//!
//! Decoding fails closed: a missing or mistyped field is a `DecodeError`,
//! never a half-filled report. Only `imageRef` (nullable) and `resolved`
//! (defaults to false) may be absent. Unknown fields are ignored so that
//! documents written by newer clients still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Report, ReportKind};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("document has an empty id")]
    MissingId,

    #[error("document {id} is not a JSON object")]
    NotAnObject { id: String },

    #[error("document {id}: {source}")]
    Schema {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
    title: String,
    kind: ReportKind,
    description: String,
    tags: Vec<String>,
    color: String,
    occurred_at: DateTime<Utc>,
    location: String,
    reporter_name: String,
    reporter_email: String,
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default)]
    resolved: bool,
    created_at: DateTime<Utc>,
}

impl Report {
    /// The document body for this report, without its id.
    pub fn to_document(&self) -> Value {
        let doc = ReportDocument {
            title: self.title.clone(),
            kind: self.kind,
            description: self.description.clone(),
            tags: self.tags.clone(),
            color: self.color.clone(),
            occurred_at: self.occurred_at,
            location: self.location.clone(),
            reporter_name: self.reporter_name.clone(),
            reporter_email: self.reporter_email.clone(),
            image_ref: self.image_ref.clone(),
            resolved: self.resolved,
            created_at: self.created_at,
        };
        // A struct of strings, timestamps and a unit enum always serializes.
        serde_json::to_value(doc).unwrap_or(Value::Null)
    }

    /// Rebuilds a report from its id and stored body.
    pub fn from_document(id: &str, body: &Value) -> Result<Self, DecodeError> {
        if id.trim().is_empty() {
            return Err(DecodeError::MissingId);
        }
        if !body.is_object() {
            return Err(DecodeError::NotAnObject { id: id.to_string() });
        }
        let doc = ReportDocument::deserialize(body).map_err(|source| DecodeError::Schema {
            id: id.to_string(),
            source,
        })?;

        Ok(Self {
            id: id.to_string(),
            title: doc.title,
            kind: doc.kind,
            description: doc.description,
            tags: doc.tags,
            color: doc.color,
            occurred_at: doc.occurred_at,
            location: doc.location,
            reporter_name: doc.reporter_name,
            reporter_email: doc.reporter_email,
            image_ref: doc.image_ref,
            resolved: doc.resolved,
            created_at: doc.created_at,
        })
    }
}
