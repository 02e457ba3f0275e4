//! # Domain Models
//!
//! These structs represent the core entities of the lost & found board.
//! Report ids are UUID v7 strings, so they are time-ordered and globally unique,
//! but every other layer treats them as opaque.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the item was lost or found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Lost,
    Found,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Lost => "lost",
            ReportKind::Found => "found",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ReportKind::Lost),
            "found" => Ok(ReportKind::Found),
            other => Err(format!("unknown report kind '{other}'")),
        }
    }
}

/// A single lost or found report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub title: String,
    pub kind: ReportKind,
    pub description: String,
    /// Insertion order is kept but carries no meaning.
    pub tags: Vec<String>,
    /// Either `#RRGGBB` or a lowercase color name.
    pub color: String,
    /// When the item was lost or found.
    pub occurred_at: DateTime<Utc>,
    pub location: String,
    pub reporter_name: String,
    /// Contact address and ownership key.
    pub reporter_email: String,
    /// Reference handed out by the `BlobStore`.
    pub image_ref: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Builds a brand new, unresolved report from validated form input.
    pub fn create(input: ValidatedReport, image_ref: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: input.title,
            kind: input.kind,
            description: input.description,
            tags: input.tags,
            color: input.color,
            occurred_at: input.occurred_at,
            location: input.location,
            reporter_name: input.reporter_name,
            reporter_email: input.reporter_email,
            image_ref,
            resolved: false,
            created_at: now,
        }
    }

    /// Applies an edit. `id`, `created_at` and `resolved` survive untouched.
    pub fn apply_edit(&self, input: ValidatedReport, image_ref: Option<String>) -> Self {
        Self {
            id: self.id.clone(),
            title: input.title,
            kind: input.kind,
            description: input.description,
            tags: input.tags,
            color: input.color,
            occurred_at: input.occurred_at,
            location: input.location,
            reporter_name: input.reporter_name,
            reporter_email: input.reporter_email,
            image_ref,
            resolved: self.resolved,
            created_at: self.created_at,
        }
    }
}

/// Raw, unvalidated form input for a report.
///
/// The occurrence instant arrives as separate date and time selections plus
/// the submitter's UTC offset in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportDraft {
    pub title: String,
    pub kind: Option<ReportKind>,
    pub description: String,
    /// Comma separated, e.g. `"wallet, leather"`.
    pub tags: String,
    pub color: String,
    pub occurred_date: Option<NaiveDate>,
    pub occurred_time: Option<NaiveTime>,
    /// `None` when the submitted offset could not be read; an absent offset
    /// means UTC.
    pub utc_offset_minutes: Option<i32>,
    pub location: String,
    pub reporter_name: String,
    pub reporter_email: String,
}

impl Default for ReportDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            kind: None,
            description: String::new(),
            tags: String::new(),
            color: String::new(),
            occurred_date: None,
            occurred_time: None,
            utc_offset_minutes: Some(0),
            location: String::new(),
            reporter_name: String::new(),
            reporter_email: String::new(),
        }
    }
}

/// Normalized output of the validator, ready to become a `Report`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReport {
    pub title: String,
    pub kind: ReportKind,
    pub description: String,
    pub tags: Vec<String>,
    pub color: String,
    pub occurred_at: DateTime<Utc>,
    pub location: String,
    pub reporter_name: String,
    pub reporter_email: String,
}

/// The signed-in account as seen by the core. Only the email matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recent `occurred_at` first.
    #[default]
    Latest,
    Oldest,
}

/// Which report fields the free-text query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFields {
    #[default]
    TitleOnly,
    TitleDescriptionTags,
}

/// Who may mark a report as resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Any viewer, signed in or not.
    #[default]
    AnyViewer,
    OwnerOnly,
}

/// Current list selections: kind toggle, search box and sort menu.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub kind: ReportKind,
    pub text: String,
    pub sort: SortKey,
    pub search_fields: SearchFields,
}

impl ReportQuery {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            text: String::new(),
            sort: SortKey::default(),
            search_fields: SearchFields::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_search_fields(mut self, fields: SearchFields) -> Self {
        self.search_fields = fields;
        self
    }
}
