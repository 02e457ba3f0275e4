//! lost-found/crates/lf-core/src/lib.rs
//!
//! The central domain logic and interface definitions for the lost & found
//! board: report model, validator, filter-sort engine, ownership gate and the
//! collaborator ports that plugins implement.

pub mod codec;
pub mod error;
pub mod filter;
pub mod models;
pub mod ownership;
pub mod service;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use codec::DecodeError;
pub use error::*;
pub use filter::filter_and_sort;
pub use models::*;
pub use ownership::{authorize, is_owner, Action};
pub use service::{ImageChange, ImageUpload, ReportFeed, ReportService};
pub use traits::*;
pub use validation::{validate_draft, Field, FieldError, FutureDate, ValidationErrors};

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_report_creation_v7() {
        let now = chrono::Utc::now();
        let input = ValidatedReport {
            title: "Red Scarf".to_string(),
            kind: ReportKind::Lost,
            description: "Wool scarf, knitted by hand".to_string(),
            tags: vec!["scarf".to_string()],
            color: "red".to_string(),
            occurred_at: now,
            location: "Bus stop 4".to_string(),
            reporter_name: "Jo March".to_string(),
            reporter_email: "jo@example.com".to_string(),
        };
        let first = Report::create(input.clone(), None, now);
        let second = Report::create(input, None, now);
        assert_ne!(first.id, second.id);
        assert!(!first.resolved);
        assert_eq!(first.created_at, now);
    }
}
