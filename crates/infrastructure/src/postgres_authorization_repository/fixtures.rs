use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn find_model_impl(
        &self,
        model_id: &ModelId,
    ) -> AppResult<Option<ModelDescriptor>> {
        let row = sqlx::query_as::<_, ModelRow>(
            r#"
            SELECT id, global_id, supports_ownership
            FROM authz_models
            WHERE id = $1
            "#,
        )
        .bind(model_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load model '{model_id}': {error}"))
        })?;

        row.map(|row| {
            ModelId::new(row.id)
                .and_then(|id| ModelDescriptor::new(id, row.global_id, row.supports_ownership))
                .map_err(|error| {
                    AppError::Internal(format!("failed to decode model '{model_id}': {error}"))
                })
        })
        .transpose()
    }

    pub(super) async fn count_models_impl(&self) -> AppResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authz_models")
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to count models: {error}")))?;

        usize::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid model count {count}: {error}")))
    }

    pub(super) async fn save_model_impl(&self, model: ModelDescriptor) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO authz_models (id, global_id, supports_ownership)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(model.id().as_str())
        .bind(model.global_id().as_str())
        .bind(model.supports_ownership())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save model '{}': {error}", model.id()))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "model '{}' already exists",
                model.id()
            )));
        }

        Ok(())
    }

    pub(super) async fn save_role_impl(&self, role: Role) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO authz_roles (id, name)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role.id().as_str())
        .bind(role.name().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save role '{}': {error}", role.id()))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.id()
            )));
        }

        Ok(())
    }
}
