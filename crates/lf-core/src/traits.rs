//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Failures cross these seams as opaque `anyhow::Error`s; the core relays them
//! without interpretation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::models::{Identity, Report, ReportKind};

/// Who is signed in right now, and a way to hear about changes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    /// Yields the new identity (or `None` on sign-out) on every change.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// A signed-in session handed back by an `Authenticator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token identifying the session.
    pub token: String,
    pub identity: Identity,
}

/// Account and session management behind an `IdentityProvider`.
///
/// Signing in also makes the new identity the provider's current one, which
/// is announced to `IdentityProvider::subscribe` listeners.
pub trait Authenticator: IdentityProvider {
    fn sign_up(&self, email: &str, password: &str) -> crate::error::Result<Session>;
    fn sign_in(&self, email: &str, password: &str) -> crate::error::Result<Session>;
    fn sign_out(&self, token: &str);
    /// Resolves a bearer token to the identity that owns it.
    fn identity_for_token(&self, token: &str) -> Option<Identity>;
}

/// Document persistence for reports, plus a live view of the whole collection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportCollection: Send + Sync {
    /// Live snapshots of the collection, optionally narrowed to one kind.
    fn subscribe(&self, kind: Option<ReportKind>) -> SnapshotStream;

    async fn get(&self, id: &str) -> anyhow::Result<Option<Report>>;
    async fn create(&self, report: Report) -> anyhow::Result<()>;
    async fn update(&self, report: Report) -> anyhow::Result<()>;
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
    async fn set_resolved(&self, id: &str) -> anyhow::Result<()>;
}

/// Binary storage for report photos.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns the reference kept in `Report::image_ref`.
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
    async fn delete(&self, reference: &str) -> anyhow::Result<()>;
    /// Where a client can fetch the original.
    fn url(&self, reference: &str) -> String;
    /// Where a client can fetch the reduced preview of the photo.
    fn thumbnail_url(&self, reference: &str) -> String;
}

/// Receiving end of a collection's live query.
///
/// Each snapshot is the complete collection; a subscriber never has to merge
/// deltas. A kind filter set at subscription time is applied to every
/// snapshot handed out.
pub struct SnapshotStream {
    rx: watch::Receiver<Arc<Vec<Report>>>,
    kind: Option<ReportKind>,
}

impl SnapshotStream {
    pub fn new(rx: watch::Receiver<Arc<Vec<Report>>>, kind: Option<ReportKind>) -> Self {
        Self { rx, kind }
    }

    /// The most recent snapshot, marking it as seen.
    pub fn latest(&mut self) -> Vec<Report> {
        let snapshot = Arc::clone(&self.rx.borrow_and_update());
        self.narrow(&snapshot)
    }

    /// Waits for the next snapshot. `None` once the collection has shut down.
    pub async fn next(&mut self) -> Option<Vec<Report>> {
        self.rx.changed().await.ok()?;
        Some(self.latest())
    }

    fn narrow(&self, snapshot: &[Report]) -> Vec<Report> {
        match self.kind {
            Some(kind) => snapshot.iter().filter(|r| r.kind == kind).cloned().collect(),
            None => snapshot.to_vec(),
        }
    }
}
