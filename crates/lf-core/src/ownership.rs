//! # Ownership
//!
//! Decides which mutating actions the current identity may perform on a
//! report. Emails are compared exactly as stored: `Ada@x.org` does not own a
//! report filed by `ada@x.org`.

use crate::error::{AppError, Result};
use crate::models::{Identity, Report, ResolvePolicy};

/// Mutations that pass through the ownership gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
    Resolve,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Resolve => "resolve",
        }
    }
}

pub fn is_owner(report: &Report, current_email: &str) -> bool {
    current_email == report.reporter_email
}

/// Fails unless `identity` may perform `action` on `report`.
pub fn authorize(
    action: Action,
    report: &Report,
    identity: Option<&Identity>,
    resolve_policy: ResolvePolicy,
) -> Result<()> {
    if action == Action::Resolve && resolve_policy == ResolvePolicy::AnyViewer {
        return Ok(());
    }

    let identity = identity.ok_or_else(|| {
        AppError::Unauthenticated(format!("sign in to {} reports", action.verb()))
    })?;

    if is_owner(report, &identity.email) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "only the reporter may {} report {}",
            action.verb(),
            report.id
        )))
    }
}
