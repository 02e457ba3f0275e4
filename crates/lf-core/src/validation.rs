//! # Report Validator
//!
//! Pure field checks applied to a `ReportDraft` before anything reaches a
//! collaborator. Every check returns the normalized value or the specific
//! reason it failed, so a form can show feedback next to the offending field.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::models::{ReportDraft, ValidatedReport};

pub const TITLE_LEN: (usize, usize) = (3, 100);
pub const DESCRIPTION_LEN: (usize, usize) = (10, 500);
pub const LOCATION_LEN: (usize, usize) = (3, 100);
pub const REPORTER_NAME_LEN: (usize, usize) = (2, 50);
pub const TAG_LEN: (usize, usize) = (2, 20);
pub const MAX_TAGS: usize = 10;
pub const MAX_EMAIL_LEN: usize = 100;

/// Color names accepted in place of a hex code, compared case-insensitively.
pub const COLOR_NAMES: [&str; 10] = [
    "red", "blue", "green", "yellow", "purple", "orange", "pink", "brown", "grey", "gray",
];

static RE_HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9 ]+$").unwrap());
static RE_PERSON_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z ]+$").unwrap());
static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// Form fields that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Kind,
    Description,
    Tags,
    Color,
    OccurredAt,
    Location,
    ReporterName,
    ReporterEmail,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Kind => "kind",
            Field::Description => "description",
            Field::Tags => "tags",
            Field::Color => "color",
            Field::OccurredAt => "occurredAt",
            Field::Location => "location",
            Field::ReporterName => "reporterName",
            Field::ReporterEmail => "reporterEmail",
        };
        f.write_str(name)
    }
}

/// Why a single field was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("is required")]
    Required,

    #[error("must be at least {min} characters")]
    TooShort { min: usize },

    #[error("must be at most {max} characters")]
    TooLong { max: usize },

    #[error("must be a #RRGGBB hex code or one of: {}", COLOR_NAMES.join(", "))]
    InvalidColor,

    #[error("must contain at most {max} tags")]
    TooManyTags { max: usize },

    #[error("tag '{tag}' must be 2-20 letters, digits or spaces")]
    InvalidTag { tag: String },

    #[error("may only contain letters and spaces")]
    InvalidCharacters,

    #[error("is not a valid email address")]
    InvalidEmail,

    #[error("is not a valid date and time")]
    InvalidDateTime,
}

/// The composed occurrence instant lies after the moment of validation.
///
/// Reported separately from field errors: it concerns the date and time
/// selections together rather than either one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("date and time cannot be in the future ({occurred_at} is after {now})")]
pub struct FutureDate {
    pub occurred_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// Every problem found in one draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<Field, FieldError>,
    pub future_date: Option<FutureDate>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.future_date.is_none()
    }

    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.fields.get(&field)
    }

    fn record<T>(&mut self, field: Field, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fields.insert(field, e);
                None
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, e)| format!("{field} {e}"))
            .collect();
        if let Some(future) = &self.future_date {
            parts.push(future.to_string());
        }
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Trims `raw` and checks its length in characters against `(min, max)`.
fn bounded_text(raw: &str, (min, max): (usize, usize)) -> Result<String, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::Required);
    }
    let len = value.chars().count();
    if len < min {
        return Err(FieldError::TooShort { min });
    }
    if len > max {
        return Err(FieldError::TooLong { max });
    }
    Ok(value.to_string())
}

pub fn validate_title(raw: &str) -> Result<String, FieldError> {
    bounded_text(raw, TITLE_LEN)
}

pub fn validate_description(raw: &str) -> Result<String, FieldError> {
    bounded_text(raw, DESCRIPTION_LEN)
}

pub fn validate_location(raw: &str) -> Result<String, FieldError> {
    bounded_text(raw, LOCATION_LEN)
}

pub fn validate_reporter_name(raw: &str) -> Result<String, FieldError> {
    let name = bounded_text(raw, REPORTER_NAME_LEN)?;
    if !RE_PERSON_NAME.is_match(&name) {
        return Err(FieldError::InvalidCharacters);
    }
    Ok(name)
}

/// Accepts `#RRGGBB` as typed, or a known color name folded to lowercase.
pub fn validate_color(raw: &str) -> Result<String, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::Required);
    }
    if RE_HEX_COLOR.is_match(value) {
        return Ok(value.to_string());
    }
    let folded = value.to_lowercase();
    if COLOR_NAMES.contains(&folded.as_str()) {
        Ok(folded)
    } else {
        Err(FieldError::InvalidColor)
    }
}

/// Splits comma separated input into tags.
///
/// Segments are trimmed, empty ones dropped and repeats collapsed onto their
/// first occurrence.
pub fn parse_tags(raw: &str) -> Result<Vec<String>, FieldError> {
    let mut tags: Vec<String> = Vec::new();
    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !tags.iter().any(|t| t == segment) {
            tags.push(segment.to_string());
        }
    }

    if tags.is_empty() {
        return Err(FieldError::Required);
    }
    if tags.len() > MAX_TAGS {
        return Err(FieldError::TooManyTags { max: MAX_TAGS });
    }

    let (min, max) = TAG_LEN;
    if let Some(bad) = tags.iter().find(|tag| {
        let len = tag.chars().count();
        len < min || len > max || !RE_TAG.is_match(tag)
    }) {
        return Err(FieldError::InvalidTag { tag: bad.clone() });
    }
    Ok(tags)
}

pub fn validate_reporter_email(raw: &str) -> Result<String, FieldError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(FieldError::Required);
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(FieldError::TooLong { max: MAX_EMAIL_LEN });
    }
    if !RE_EMAIL.is_match(email) {
        return Err(FieldError::InvalidEmail);
    }
    Ok(email.to_string())
}

/// Combines the date and time selections, interpreted at the given UTC
/// offset, into one instant.
pub fn compose_occurred_at(
    date: NaiveDate,
    time: NaiveTime,
    utc_offset_minutes: i32,
) -> Result<DateTime<Utc>, FieldError> {
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(FieldError::InvalidDateTime)?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(FieldError::InvalidDateTime)
}

/// Equal to `now` is allowed; strictly later is not.
pub fn ensure_not_future(occurred_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), FutureDate> {
    if occurred_at > now {
        Err(FutureDate { occurred_at, now })
    } else {
        Ok(())
    }
}

/// Runs every rule against `draft` and gathers all failures at once.
pub fn validate_draft(draft: &ReportDraft, now: DateTime<Utc>) -> Result<ValidatedReport, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = errors.record(Field::Title, validate_title(&draft.title));
    let kind = errors.record(Field::Kind, draft.kind.ok_or(FieldError::Required));
    let description = errors.record(Field::Description, validate_description(&draft.description));
    let tags = errors.record(Field::Tags, parse_tags(&draft.tags));
    let color = errors.record(Field::Color, validate_color(&draft.color));
    let location = errors.record(Field::Location, validate_location(&draft.location));
    let reporter_name = errors.record(Field::ReporterName, validate_reporter_name(&draft.reporter_name));
    let reporter_email = errors.record(Field::ReporterEmail, validate_reporter_email(&draft.reporter_email));

    let occurred_at = match (draft.occurred_date, draft.occurred_time, draft.utc_offset_minutes) {
        (Some(date), Some(time), Some(offset)) => {
            errors.record(Field::OccurredAt, compose_occurred_at(date, time, offset))
        }
        (Some(_), Some(_), None) => {
            errors.record::<DateTime<Utc>>(Field::OccurredAt, Err(FieldError::InvalidDateTime))
        }
        _ => errors.record::<DateTime<Utc>>(Field::OccurredAt, Err(FieldError::Required)),
    };
    if let Some(at) = occurred_at {
        if let Err(future) = ensure_not_future(at, now) {
            errors.future_date = Some(future);
        }
    }

    match (
        title,
        kind,
        description,
        tags,
        color,
        occurred_at,
        location,
        reporter_name,
        reporter_email,
    ) {
        (
            Some(title),
            Some(kind),
            Some(description),
            Some(tags),
            Some(color),
            Some(occurred_at),
            Some(location),
            Some(reporter_name),
            Some(reporter_email),
        ) if errors.is_empty() => Ok(ValidatedReport {
            title,
            kind,
            description,
            tags,
            color,
            occurred_at,
            location,
            reporter_name,
            reporter_email,
        }),
        _ => Err(errors),
    }
}
