use tracing::debug;

use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn find_target_records_impl(
        &self,
        model: &ModelDescriptor,
        criteria: Option<&WhereClause>,
    ) -> AppResult<Vec<Record>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT data
            FROM authz_records
            WHERE model_id = $1
            ORDER BY id
            "#,
        )
        .bind(model.id().as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load records for model '{}': {error}",
                model.id()
            ))
        })?;

        let records = rows
            .into_iter()
            .map(|row| Record::new(row.data))
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode records for model '{}': {error}",
                    model.id()
                ))
            })?;

        let Some(criteria) = criteria else {
            return Ok(records);
        };

        let matched: Vec<Record> = self
            .matcher
            .filter(criteria, &records)?
            .into_iter()
            .cloned()
            .collect();
        debug!(
            model = %model.id(),
            loaded = records.len(),
            matched = matched.len(),
            "filtered target records"
        );

        Ok(matched)
    }

    pub(super) async fn save_record_impl(&self, model_id: &ModelId, record: Record) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_records (model_id, data)
            VALUES ($1, $2)
            "#,
        )
        .bind(model_id.as_str())
        .bind(Value::Object(record.fields().clone()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save record for model '{model_id}': {error}"
            ))
        })?;

        Ok(())
    }
}
