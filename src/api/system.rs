//! Liveness and diagnostics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{now_rfc3339, Interaction, MediaType, Review};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Which deployment settings are present, never their values
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheck {
    pub tmdb_api_key: bool,
    /// False when the signing secret was generated at startup
    pub jwt_secret: bool,
    pub database_url: bool,
    pub base_path: String,
    pub production: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct DatabaseCheck {
    pub connected: bool,
    pub users: Option<i64>,
    pub interactions: Option<i64>,
    pub reviews: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CatalogCheck {
    pub configured: bool,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemCheck {
    pub config: ConfigCheck,
    pub database: DatabaseCheck,
    pub catalog: CatalogCheck,
    pub timestamp: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now_rfc3339(),
    })
}

async fn check_database(state: &AppState) -> DatabaseCheck {
    let users: Result<i64, sqlx::Error> = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await;

    match users {
        Ok(users) => DatabaseCheck {
            connected: true,
            users: Some(users),
            interactions: Interaction::count_all(&state.db).await.ok(),
            reviews: Review::count_all(&state.db).await.ok(),
            error: None,
        },
        Err(e) => {
            tracing::error!("Database check failed: {}", e);
            DatabaseCheck {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

async fn check_catalog(state: &AppState) -> CatalogCheck {
    if !state.catalog.is_configured() {
        return CatalogCheck {
            error: Some("TMDB_API_KEY is not set".to_string()),
            ..Default::default()
        };
    }

    match state.catalog.popular(MediaType::Movie, 1).await {
        Ok(_) => CatalogCheck {
            configured: true,
            reachable: true,
            error: None,
        },
        Err(e) => CatalogCheck {
            configured: true,
            reachable: false,
            error: Some(e.to_string()),
        },
    }
}

/// Report configuration presence, database reachability and catalog reachability
///
/// GET /api/system/check
pub async fn system_check(State(state): State<Arc<AppState>>) -> Json<SystemCheck> {
    let config = ConfigCheck {
        tmdb_api_key: !state.config.catalog.api_key.is_empty(),
        jwt_secret: !state.config.auth.jwt_secret.is_empty()
            && !state.config.auth.secret_generated,
        database_url: state.config.database.url.is_some(),
        base_path: state.config.server.base_path.clone(),
        production: state.config.server.production,
    };

    let (database, catalog) = tokio::join!(check_database(&state), check_catalog(&state));

    Json(SystemCheck {
        config,
        database,
        catalog,
        timestamp: now_rfc3339(),
    })
}
