use std::env;
use std::path::PathBuf;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{ModelId, RequestedAttributes, UserId, WhereClause};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Access check described by the positional arguments.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub method: String,
    pub model_id: ModelId,
    pub user_id: UserId,
    pub requested_attributes: RequestedAttributes,
    pub criteria: Option<WhereClause>,
}

#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub fixtures_path: Option<PathBuf>,
    pub db_max_connections: u32,
    pub request: Option<CheckRequest>,
}

impl CheckConfig {
    pub fn load() -> AppResult<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        let migrate_only = args.first().map(String::as_str) == Some("migrate");

        let database_url = optional_env("DATABASE_URL");
        let fixtures_path = optional_env("ROWGUARD_FIXTURES_PATH").map(PathBuf::from);
        let db_max_connections = parse_env_u32("ROWGUARD_DB_MAX_CONNECTIONS", 5)?;

        if db_max_connections == 0 {
            return Err(AppError::Validation(
                "ROWGUARD_DB_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let request = if migrate_only {
            None
        } else {
            parse_check_request(&args)?
        };

        Ok(Self {
            migrate_only,
            database_url,
            fixtures_path,
            db_max_connections,
            request,
        })
    }
}

/// Parses `<METHOD> <model-id> <user-id> [attributes-json] [where-json]`.
pub fn parse_check_request(args: &[String]) -> AppResult<Option<CheckRequest>> {
    let (method, model_id, user_id, optional) = match args {
        [] => return Ok(None),
        [method, model_id, user_id, optional @ ..] if optional.len() <= 2 => {
            (method, model_id, user_id, optional)
        }
        _ => {
            return Err(AppError::Validation(
                "usage: rowguard-check <METHOD> <model-id> <user-id> [attributes-json] [where-json]"
                    .to_owned(),
            ));
        }
    };

    let requested_attributes = match optional.first() {
        Some(raw) => {
            let body = parse_json_argument("attributes", raw)?;
            if !body.is_object() {
                return Err(AppError::Validation(
                    "attributes must be a JSON object".to_owned(),
                ));
            }
            RequestedAttributes::from_value(&body)
        }
        None => RequestedAttributes::none(),
    };
    let criteria = optional
        .get(1)
        .map(|raw| parse_json_argument("where", raw).and_then(WhereClause::from_value))
        .transpose()?;

    Ok(Some(CheckRequest {
        method: method.trim().to_owned(),
        model_id: ModelId::new(model_id.trim())?,
        user_id: UserId::new(user_id.trim())?,
        requested_attributes,
        criteria,
    }))
}

fn parse_json_argument(name: &str, raw: &str) -> AppResult<Value> {
    serde_json::from_str(raw)
        .map_err(|error| AppError::Validation(format!("invalid {name} JSON '{raw}': {error}")))
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
