//! Read and review operations over past deliberations.
//!
//! Every access is audited; non-admin callers can only see their own
//! deliberations.

use std::sync::Arc;

use council_domain::deliberation::{
    AuditAction, AuditEntry, DeliberationResult, FlagDeliberationRequest,
};
use tracing::warn;

use crate::ports::{CouncilRepository, DeliberationPage, ListOptions, RepositoryError};

pub struct ReviewUseCase<R> {
    repo: Arc<R>,
}

impl<R: CouncilRepository> ReviewUseCase<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Fetch a deliberation with all attached records, enforcing
    /// ownership and writing an access audit entry.
    pub async fn get_result(
        &self,
        deliberation_id: &str,
        user_id: &str,
        is_admin: bool,
    ) -> Result<DeliberationResult, RepositoryError> {
        let result = self.repo.get_deliberation_result(deliberation_id).await?;
        if !is_admin && result.deliberation.user_id != user_id {
            return Err(RepositoryError::AccessDenied(deliberation_id.to_string()));
        }

        let audit = AuditEntry::new(deliberation_id, user_id, AuditAction::Access);
        if let Err(error) = self.repo.create_audit_entry(&audit).await {
            warn!(%error, deliberation_id, "failed to audit deliberation access");
        }
        Ok(result)
    }

    pub async fn list(
        &self,
        user_id: &str,
        is_admin: bool,
        opts: &ListOptions,
    ) -> Result<DeliberationPage, RepositoryError> {
        self.repo.list_deliberations(user_id, is_admin, opts).await
    }

    /// Flag a completed deliberation for human review, e.g. a suspected
    /// hallucination.
    pub async fn flag(
        &self,
        deliberation_id: &str,
        user_id: &str,
        request: &FlagDeliberationRequest,
    ) -> Result<(), RepositoryError> {
        self.repo
            .flag_deliberation(deliberation_id, user_id, request)
            .await?;

        let audit = AuditEntry::new(deliberation_id, user_id, AuditAction::Flag)
            .with_detail("reason", serde_json::json!(request.reason.clone()))
            .with_detail("severity", serde_json::json!(request.severity.clone()));
        if let Err(error) = self.repo.create_audit_entry(&audit).await {
            warn!(%error, deliberation_id, "failed to audit deliberation flag");
        }
        Ok(())
    }
}
