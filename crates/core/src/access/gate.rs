use super::error::{AccessError, AccessResult, ForbiddenReason};
use super::identity::{IdentityContext, SubjectIdentity};
use super::resolver::EntitlementResolver;
use crate::{Company, StateBackend};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Per-request feature check. Fails closed.
pub struct AccessGate {
    backend: Arc<dyn StateBackend>,
    resolver: Arc<EntitlementResolver>,
}

impl AccessGate {
    pub fn new(backend: Arc<dyn StateBackend>, resolver: Arc<EntitlementResolver>) -> Self {
        Self { backend, resolver }
    }

    /// Allow the request only when the subject's company holds `permission`.
    ///
    /// Returns the acting company on success. Every other outcome, including
    /// storage errors, becomes `AccessError::Forbidden`.
    #[instrument(name = "gate.check", skip(self, identity), fields(subject = %identity.id))]
    pub async fn check<C: IdentityContext>(
        &self,
        identity: &SubjectIdentity<C>,
        permission: &str,
    ) -> AccessResult<Company> {
        let Some(company_id) = identity.company_id() else {
            debug!("Subject carries no company context");
            return Err(AccessError::Forbidden(ForbiddenReason::NoCompanyContext));
        };

        let company = match self.backend.get_company(company_id).await {
            Ok(Some(company)) => company,
            Ok(None) => {
                debug!(company_id, "Company in subject context does not exist");
                return Err(AccessError::Forbidden(ForbiddenReason::NoCompanyContext));
            }
            Err(e) => {
                warn!(company_id, error = %e, "Company lookup failed, denying");
                return Err(AccessError::Forbidden(ForbiddenReason::NoCompanyContext));
            }
        };

        let allowed = match self.resolver.can_use(company_id, permission).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(company_id, permission, error = %e, "Entitlement check failed, denying");
                false
            }
        };

        if allowed {
            Ok(company)
        } else {
            Err(AccessError::Forbidden(ForbiddenReason::PermissionDenied {
                permission: permission.to_string(),
                company_name: company.name,
            }))
        }
    }
}
