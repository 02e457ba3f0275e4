//! Multipart report form parsing.
//!
//! Text parts fill a `ReportDraft`; a part named `image` carries the photo.
//! Unparseable date, time, offset or kind values are left empty so the
//! validator reports them next to the right field.

use actix_multipart::Multipart;
use chrono::{NaiveDate, NaiveTime};
use futures_util::StreamExt;
use lf_core::models::{ReportDraft, ReportKind};
use lf_core::service::{ImageChange, ImageUpload};

use crate::error::ApiError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const MAX_TEXT_BYTES: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct ReportForm {
    pub draft: ReportDraft,
    pub image: Option<ImageUpload>,
    /// Set by a `removeImage=true` part on edits.
    pub remove_image: bool,
}

impl ReportForm {
    /// How an edit should treat the stored photo.
    pub fn image_change(self) -> (ReportDraft, ImageChange) {
        let change = match (self.image, self.remove_image) {
            (Some(upload), _) => ImageChange::Replace(upload),
            (None, true) => ImageChange::Remove,
            (None, false) => ImageChange::Keep,
        };
        (self.draft, change)
    }
}

pub async fn read_report_form(mut payload: Multipart) -> Result<ReportForm, ApiError> {
    let mut form = ReportForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
        let limit = if name == "image" { MAX_IMAGE_BYTES } else { MAX_TEXT_BYTES };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::BadRequest(format!("part '{name}' exceeds {limit} bytes")));
            }
            bytes.extend_from_slice(&chunk);
        }

        if name == "image" {
            if !bytes.is_empty() {
                form.image = Some(ImageUpload {
                    bytes,
                    content_type: content_type.unwrap_or_else(|| "application/octet-stream".into()),
                });
            }
            continue;
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| ApiError::BadRequest(format!("part '{name}' is not UTF-8")))?;
        apply_text_field(&mut form, &name, text);
    }

    Ok(form)
}

fn apply_text_field(form: &mut ReportForm, name: &str, value: String) {
    let draft = &mut form.draft;
    match name {
        "title" => draft.title = value,
        "kind" => draft.kind = value.trim().to_lowercase().parse::<ReportKind>().ok(),
        "description" => draft.description = value,
        "tags" => draft.tags = value,
        "color" => draft.color = value,
        "occurredDate" => draft.occurred_date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok(),
        "occurredTime" => draft.occurred_time = parse_time(value.trim()),
        "utcOffsetMinutes" => draft.utc_offset_minutes = value.trim().parse().ok(),
        "location" => draft.location = value,
        "reporterName" => draft.reporter_name = value,
        "reporterEmail" => draft.reporter_email = value,
        "removeImage" => form.remove_image = value.trim() == "true",
        other => log::debug!("ignoring unknown form part '{}'", other),
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}
