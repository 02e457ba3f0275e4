//! # Report Service
//!
//! The single boundary that dispatches mutating actions. Collaborators are
//! injected at construction; every edit, delete and resolve goes through the
//! same ownership gate here rather than in individual handlers.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use crate::error::{AppError, Result};
use crate::filter::filter_and_sort;
use crate::models::{
    Identity, Report, ReportDraft, ReportKind, ReportQuery, ResolvePolicy, SearchFields, SortKey,
};
use crate::ownership::{authorize, is_owner, Action};
use crate::traits::{BlobStore, IdentityProvider, ReportCollection, SnapshotStream};
use crate::validation::validate_draft;

/// A photo attached to a submission.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// What an edit does to the existing photo.
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(ImageUpload),
    Remove,
}

#[derive(Clone)]
pub struct ReportService {
    identity: Arc<dyn IdentityProvider>,
    collection: Arc<dyn ReportCollection>,
    blobs: Arc<dyn BlobStore>,
    resolve_policy: ResolvePolicy,
    search_fields: SearchFields,
}

impl ReportService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        collection: Arc<dyn ReportCollection>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            identity,
            collection,
            blobs,
            resolve_policy: ResolvePolicy::default(),
            search_fields: SearchFields::default(),
        }
    }

    pub fn with_resolve_policy(mut self, policy: ResolvePolicy) -> Self {
        self.resolve_policy = policy;
        self
    }

    pub fn with_search_fields(mut self, fields: SearchFields) -> Self {
        self.search_fields = fields;
        self
    }

    /// A query for `kind` carrying the configured search scope.
    pub fn query(&self, kind: ReportKind) -> ReportQuery {
        ReportQuery::new(kind).with_search_fields(self.search_fields)
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.current_identity()
    }

    /// Whether the edit and delete actions should be offered for `report`.
    pub fn can_manage(&self, report: &Report) -> bool {
        self.identity
            .current_identity()
            .is_some_and(|me| is_owner(report, &me.email))
    }

    pub async fn get(&self, id: &str) -> Result<Report> {
        self.collection
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report".into(), id.to_string()))
    }

    /// The display list for the latest known snapshot.
    pub fn browse(&self, query: &ReportQuery) -> Vec<Report> {
        let mut stream = self.collection.subscribe(Some(query.kind));
        filter_and_sort(&stream.latest(), query)
    }

    /// A feed that recomputes the display list on every snapshot.
    pub fn watch(&self, query: ReportQuery) -> ReportFeed {
        ReportFeed {
            stream: self.collection.subscribe(Some(query.kind)),
            query,
        }
    }

    /// Validates and files a new report for the signed-in reporter.
    pub async fn submit(&self, draft: ReportDraft, image: Option<ImageUpload>) -> Result<Report> {
        let identity = self.require_identity("submit reports")?;
        let now = Utc::now();
        let input = validate_draft(&draft, now)?;
        if input.reporter_email != identity.email {
            return Err(AppError::Forbidden(
                "reporter email must match the signed-in account".into(),
            ));
        }

        let image_ref = match image {
            Some(upload) => Some(self.blobs.upload(upload.bytes, &upload.content_type).await?),
            None => None,
        };

        let report = Report::create(input, image_ref, now);
        if let Err(e) = self.collection.create(report.clone()).await {
            if let Some(orphan) = &report.image_ref {
                self.discard_blob(orphan).await;
            }
            return Err(e.into());
        }

        info!("report {} ({}) filed by {}", report.id, report.kind, report.reporter_email);
        Ok(report)
    }

    /// Replaces the editable fields of an owned report.
    pub async fn edit(&self, id: &str, draft: ReportDraft, image: ImageChange) -> Result<Report> {
        let existing = self.get(id).await?;
        let identity = self.identity.current_identity();
        authorize(Action::Edit, &existing, identity.as_ref(), self.resolve_policy)?;

        let input = validate_draft(&draft, Utc::now())?;
        if existing.reporter_email != input.reporter_email {
            return Err(AppError::Forbidden("reporter email cannot be reassigned".into()));
        }

        let (image_ref, uploaded, superseded) = match image {
            ImageChange::Keep => (existing.image_ref.clone(), None, None),
            ImageChange::Replace(upload) => {
                let reference = self.blobs.upload(upload.bytes, &upload.content_type).await?;
                (Some(reference.clone()), Some(reference), existing.image_ref.clone())
            }
            ImageChange::Remove => (None, None, existing.image_ref.clone()),
        };

        let updated = existing.apply_edit(input, image_ref);
        if let Err(e) = self.collection.update(updated.clone()).await {
            if let Some(fresh) = &uploaded {
                self.discard_blob(fresh).await;
            }
            return Err(e.into());
        }
        if let Some(old) = superseded {
            self.discard_blob(&old).await;
        }

        info!("report {} edited", updated.id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let existing = self.get(id).await?;
        let identity = self.identity.current_identity();
        authorize(Action::Delete, &existing, identity.as_ref(), self.resolve_policy)?;

        self.collection.delete(id).await?;
        if let Some(reference) = &existing.image_ref {
            self.discard_blob(reference).await;
        }
        info!("report {} deleted", id);
        Ok(())
    }

    /// Marks a report resolved. Resolving twice is a no-op.
    pub async fn resolve(&self, id: &str) -> Result<Report> {
        let mut report = self.get(id).await?;
        let identity = self.identity.current_identity();
        authorize(Action::Resolve, &report, identity.as_ref(), self.resolve_policy)?;

        if report.resolved {
            return Ok(report);
        }
        self.collection.set_resolved(id).await?;
        report.resolved = true;
        info!("report {} resolved", id);
        Ok(report)
    }

    fn require_identity(&self, what: &str) -> Result<Identity> {
        self.identity
            .current_identity()
            .ok_or_else(|| AppError::Unauthenticated(format!("sign in to {what}")))
    }

    /// Blob cleanup never fails the surrounding action; leftovers are logged.
    async fn discard_blob(&self, reference: &str) {
        if let Err(e) = self.blobs.delete(reference).await {
            warn!("could not delete blob {}: {:#}", reference, e);
        }
    }
}

/// Display list bound to a live snapshot stream.
pub struct ReportFeed {
    stream: SnapshotStream,
    query: ReportQuery,
}

impl ReportFeed {
    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    /// Changes the selections. A new kind needs a fresh stream, so callers
    /// switching kinds should use `ReportService::watch` instead.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.query.text = text.into();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.query.sort = sort;
    }

    /// The list for the latest snapshot.
    pub fn current(&mut self) -> Vec<Report> {
        filter_and_sort(&self.stream.latest(), &self.query)
    }

    /// Waits for the next snapshot and returns its list.
    pub async fn next(&mut self) -> Option<Vec<Report>> {
        let snapshot = self.stream.next().await?;
        Some(filter_and_sort(&snapshot, &self.query))
    }
}
