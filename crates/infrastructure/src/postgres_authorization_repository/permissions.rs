use std::collections::BTreeSet;

use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn list_permissions_impl(
        &self,
        query: &PermissionQuery,
    ) -> AppResult<Vec<Permission>> {
        let role_ids: Vec<String> = query
            .roles
            .iter()
            .map(|role_id| role_id.as_str().to_owned())
            .collect();

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                permissions.id,
                permissions.model_id,
                permissions.action,
                permissions.where_clause,
                permissions.attributes,
                ARRAY_AGG(holders.role_id ORDER BY holders.role_id) AS roles
            FROM authz_permissions AS permissions
            INNER JOIN authz_permission_roles AS holders
                ON holders.permission_id = permissions.id
            WHERE permissions.model_id = $1
                AND permissions.action = $2
                AND EXISTS (
                    SELECT 1
                    FROM authz_permission_roles AS held
                    WHERE held.permission_id = permissions.id
                        AND held.role_id = ANY($3)
                )
            GROUP BY
                permissions.id,
                permissions.model_id,
                permissions.action,
                permissions.where_clause,
                permissions.attributes
            ORDER BY permissions.id
            "#,
        )
        .bind(query.model.as_str())
        .bind(query.action.as_str())
        .bind(&role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load permissions for model '{}' and action '{}': {error}",
                query.model, query.action
            ))
        })?;

        rows.into_iter().map(permission_from_row).collect()
    }

    pub(super) async fn save_permission_impl(&self, permission: Permission) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start permission transaction: {error}"))
        })?;

        let attributes: Vec<String> = permission.attributes().iter().cloned().collect();
        let inserted = sqlx::query(
            r#"
            INSERT INTO authz_permissions (id, model_id, action, where_clause, attributes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(permission.id().as_str())
        .bind(permission.model().as_str())
        .bind(permission.action().as_str())
        .bind(permission.where_clause().map(WhereClause::as_value))
        .bind(&attributes)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save permission '{}': {error}",
                permission.id()
            ))
        })?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.id()
            )));
        }

        let role_ids: Vec<String> = permission
            .roles()
            .iter()
            .map(|role_id| role_id.as_str().to_owned())
            .collect();
        sqlx::query(
            r#"
            INSERT INTO authz_permission_roles (permission_id, role_id)
            SELECT $1, role_id FROM UNNEST($2::TEXT[]) AS role_id
            "#,
        )
        .bind(permission.id().as_str())
        .bind(&role_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to assign roles to permission '{}': {error}",
                permission.id()
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit permission transaction: {error}"))
        })
    }
}

fn permission_from_row(row: PermissionRow) -> AppResult<Permission> {
    let permission_id = row.id.clone();
    let decode = move |error: AppError| {
        AppError::Internal(format!(
            "failed to decode permission '{permission_id}': {error}"
        ))
    };

    let roles: BTreeSet<RoleId> = row
        .roles
        .into_iter()
        .map(RoleId::new)
        .collect::<AppResult<_>>()
        .map_err(decode.clone())?;
    let where_clause = row
        .where_clause
        .map(WhereClause::from_value)
        .transpose()
        .map_err(decode.clone())?;

    Permission::new(PermissionInput {
        id: PermissionId::new(row.id).map_err(decode.clone())?,
        model: ModelId::new(row.model_id).map_err(decode.clone())?,
        action: CrudAction::from_str(row.action.as_str()).map_err(decode.clone())?,
        roles,
        where_clause,
        attributes: row.attributes.into_iter().collect(),
    })
    .map_err(decode)
}
