use super::*;

impl AuthorizationService {
    /// Resolves grants that could authorize the user's method on the model.
    pub async fn resolve_grants(
        &self,
        user_id: &UserId,
        model: &ModelDescriptor,
        method: &str,
    ) -> AppResult<Vec<Permission>> {
        self.resolver.resolve_grants(user_id, model, method).await
    }

    /// Decides a request against already resolved grants.
    ///
    /// On ownership-policy models records owned by the acting user are
    /// admitted without consulting grants. Foreign records need an applicable
    /// grant that admits them; the empty-grant default-allow does not extend
    /// to them. Other models follow plain grant evaluation.
    pub fn evaluate(
        &self,
        request: &AuthorizationRequest,
        grants: &[Permission],
    ) -> AppResult<bool> {
        if supports_ownership(&request.model) {
            if !any_foreign(&request.records, &request.user) {
                debug!(
                    user_id = %request.user.id(),
                    model = %request.model.id(),
                    record_count = request.records.len(),
                    "admitted owned records"
                );
                return Ok(true);
            }

            if grants.is_empty() {
                return Ok(false);
            }
        }

        self.evaluator
            .authorize(&request.records, grants, &request.requested_attributes)
    }

    /// Returns whether the request is admitted.
    pub async fn check_access(&self, request: &AuthorizationRequest) -> AppResult<bool> {
        let action = CrudAction::from_http_method(request.method.as_str())?;
        self.check_access_for_action(request, action).await
    }

    /// Ensures the request is admitted, failing with [`AppError::Forbidden`]
    /// carrying the denial message otherwise.
    pub async fn require_access(&self, request: &AuthorizationRequest) -> AppResult<()> {
        let action = CrudAction::from_http_method(request.method.as_str())?;
        self.require_access_for_action(request, action).await
    }

    /// Loads the records an action targets and returns them once the user is
    /// admitted to act on all of them.
    pub async fn authorize_action(
        &self,
        user: &User,
        model: &ModelDescriptor,
        method: &str,
        criteria: Option<&WhereClause>,
        requested_attributes: RequestedAttributes,
    ) -> AppResult<Vec<Record>> {
        let action = CrudAction::from_http_method(method)?;

        let records = self
            .record_repository
            .find_target_records(model, criteria)
            .await?;

        let request = AuthorizationRequest {
            method: method.to_owned(),
            model: model.clone(),
            user: user.clone(),
            records,
            requested_attributes,
        };
        self.require_access_for_action(&request, action).await?;

        Ok(request.records)
    }

    async fn check_access_for_action(
        &self,
        request: &AuthorizationRequest,
        action: CrudAction,
    ) -> AppResult<bool> {
        let grants = self
            .resolver
            .resolve_grants_for_action(request.user.id(), &request.model, action)
            .await?;

        self.evaluate(request, &grants)
    }

    async fn require_access_for_action(
        &self,
        request: &AuthorizationRequest,
        action: CrudAction,
    ) -> AppResult<()> {
        if self.check_access_for_action(request, action).await? {
            return Ok(());
        }

        let message = build_denial_message(&request.user, action, &request.model);
        warn!(
            user_id = %request.user.id(),
            model = %request.model.id(),
            action = %action,
            record_count = request.records.len(),
            "{message}"
        );

        Err(AppError::Forbidden(message))
    }
}
