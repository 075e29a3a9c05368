//! Rowguard access check host.

#![forbid(unsafe_code)]

mod check_config;
mod fixtures;

use std::sync::Arc;

use rowguard_application::{
    AuthorizationService, FixtureRepository, ModelRepository, PermissionRepository,
    TargetRecordRepository, UserRepository,
};
use rowguard_core::{AppError, AppResult};
use rowguard_infrastructure::{
    InMemoryAuthorizationRepository, PostgresAuthorizationRepository, StructuredCriteriaMatcher,
};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::check_config::{CheckConfig, CheckRequest, init_tracing};
use crate::fixtures::{FixtureDocument, ensure_installed};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CheckConfig::load()?;
    let document = match config.fixtures_path.as_deref() {
        Some(path) => FixtureDocument::load(path)?,
        None => FixtureDocument::defaults(),
    };

    match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = connect_and_migrate(database_url, config.db_max_connections).await?;
            if config.migrate_only {
                info!("migrations applied");
                return Ok(());
            }

            info!("using postgres authorization store");
            run(
                Arc::new(PostgresAuthorizationRepository::new(pool)),
                &document,
                config.request.as_ref(),
            )
            .await
        }
        None => {
            info!("using in-memory authorization store");
            run(
                Arc::new(InMemoryAuthorizationRepository::new()),
                &document,
                config.request.as_ref(),
            )
            .await
        }
    }
}

async fn connect_and_migrate(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

async fn run<S>(
    store: Arc<S>,
    document: &FixtureDocument,
    request: Option<&CheckRequest>,
) -> AppResult<()>
where
    S: UserRepository
        + PermissionRepository
        + TargetRecordRepository
        + ModelRepository
        + FixtureRepository
        + 'static,
{
    ensure_installed(store.as_ref(), document).await?;

    let Some(request) = request else {
        info!("no access check requested");
        return Ok(());
    };

    let model = store
        .find_model(&request.model_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("model '{}' does not exist", request.model_id)))?;
    let service = AuthorizationService::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(StructuredCriteriaMatcher::new()),
    );
    let user = service.resolver().load_user(&request.user_id).await?;

    let records = service
        .authorize_action(
            &user,
            &model,
            request.method.as_str(),
            request.criteria.as_ref(),
            request.requested_attributes.clone(),
        )
        .await?;

    info!(
        user = %user.email(),
        model = %model.global_id(),
        method = %request.method,
        records = records.len(),
        "access granted"
    );

    Ok(())
}
