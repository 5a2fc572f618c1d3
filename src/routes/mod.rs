// Route exports
pub mod classify;
pub mod feedback;
pub mod preferences;

use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{Classifier, EmbeddingBackend};
use crate::models::ErrorResponse;
use crate::services::{gather_preference_data, PostgresClient, PostgresError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub backend: Arc<dyn EmbeddingBackend>,
    pub classifier: Arc<Classifier>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(classify::configure)
            .configure(preferences::configure)
            .configure(feedback::configure),
    );
}

pub(crate) fn error_json(status: u16, error: &str, message: impl ToString) -> HttpResponse {
    let body = ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
        status_code: status,
    };
    match status {
        400 => HttpResponse::BadRequest().json(body),
        404 => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

pub(crate) fn db_error(context: &str, e: PostgresError) -> HttpResponse {
    match e {
        PostgresError::NotFound(what) => {
            error_json(404, "Not found", what)
        }
        PostgresError::InvalidInput(why) => error_json(400, "Invalid input", why),
        other => {
            tracing::error!("{}: {}", context, other);
            error_json(500, context, other)
        }
    }
}

/// Rebuild the preference snapshot from persisted state after a mutation.
/// Classification keeps serving the previous snapshot until the swap.
pub(crate) async fn reload_snapshot(state: &AppState) -> Result<u64, HttpResponse> {
    let data = gather_preference_data(&state.postgres)
        .await
        .map_err(|e| db_error("Failed to load preference data", e))?;

    state
        .classifier
        .store()
        .reload(state.backend.as_ref(), data)
        .await
        .map_err(|e| error_json(400, "Invalid preference profile", e))
}
