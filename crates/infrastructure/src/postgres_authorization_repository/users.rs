use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn find_user_with_roles_impl(
        &self,
        user_id: &UserId,
    ) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                users.id,
                users.email,
                COALESCE(
                    ARRAY_AGG(user_roles.role_id ORDER BY user_roles.role_id)
                        FILTER (WHERE user_roles.role_id IS NOT NULL),
                    '{}'
                ) AS roles
            FROM authz_users AS users
            LEFT JOIN authz_user_roles AS user_roles
                ON user_roles.user_id = users.id
            WHERE users.id = $1
            GROUP BY users.id, users.email
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load user '{user_id}' with roles: {error}"))
        })?;

        row.map(user_from_row).transpose()
    }

    pub(super) async fn save_user_impl(&self, user: User) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start user transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO authz_users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
            "#,
        )
        .bind(user.id().as_str())
        .bind(user.email().as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save user '{}': {error}", user.id()))
        })?;

        sqlx::query("DELETE FROM authz_user_roles WHERE user_id = $1")
            .bind(user.id().as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to clear roles of user '{}': {error}",
                    user.id()
                ))
            })?;

        let role_ids: Vec<String> = user
            .roles()
            .iter()
            .map(|role_id| role_id.as_str().to_owned())
            .collect();
        sqlx::query(
            r#"
            INSERT INTO authz_user_roles (user_id, role_id)
            SELECT $1, role_id FROM UNNEST($2::TEXT[]) AS role_id
            "#,
        )
        .bind(user.id().as_str())
        .bind(&role_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to assign roles to user '{}': {error}",
                user.id()
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit user transaction: {error}"))
        })
    }
}

fn user_from_row(row: UserRow) -> AppResult<User> {
    let decode = |error: AppError| {
        AppError::Internal(format!("failed to decode user '{}': {error}", row.id))
    };

    let id = UserId::new(row.id.as_str()).map_err(decode)?;
    let email = EmailAddress::new(row.email.as_str()).map_err(decode)?;
    let roles = row
        .roles
        .iter()
        .map(|role_id| RoleId::new(role_id.as_str()))
        .collect::<AppResult<Vec<_>>>()
        .map_err(decode)?;

    Ok(User::new(id, email, roles))
}
