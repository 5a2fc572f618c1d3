use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use tracing::{error, info};

use matchlens::config::Settings;
use matchlens::core::Classifier;
use matchlens::routes::{self, AppState};
use matchlens::services::{gather_preference_data, EmbeddingCache, PostgresClient, RemoteEmbeddingBackend};
use matchlens::{EmbeddingBackend, PreferenceStore};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .json(serde_json::json!({
                "error": self.error,
                "message": self.message,
                "status_code": self.status_code,
            }))
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting matchlens scoring service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize PostgreSQL client (runs migrations)
    let postgres = Arc::new(
        PostgresClient::new(
            &settings.database.url,
            settings.database.max_connections.unwrap_or(10),
            settings.database.min_connections.unwrap_or(1),
        )
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            panic!("PostgreSQL connection error: {}", e);
        }),
    );

    info!("PostgreSQL client initialized");

    // Initialize the embedding backend
    let backend: Arc<dyn EmbeddingBackend> = Arc::new(
        RemoteEmbeddingBackend::new(
            settings.backend.url.clone(),
            settings.backend.model.clone(),
            settings.backend.supports_text,
            settings.backend.timeout_secs,
        )
        .unwrap_or_else(|e| {
            error!("Failed to initialize embedding backend: {}", e);
            panic!("Embedding backend error: {}", e);
        }),
    );

    info!(
        "Embedding backend initialized: {} (text: {})",
        settings.backend.model, settings.backend.supports_text
    );

    // Exactly one version must be active to attribute classifications to
    let profile = postgres.get_profile().await.unwrap_or_else(|e| {
        error!("Failed to load preference profile: {}", e);
        panic!("Preference profile error: {}", e);
    });
    let version = postgres
        .ensure_active_version(backend.name(), &profile.weights())
        .await
        .unwrap_or_else(|e| {
            error!("Failed to ensure an active model version: {}", e);
            panic!("Model version error: {}", e);
        });

    info!("Active model version: v{} (id {})", version.version_number, version.id);

    // Build the initial preference snapshot; an invalid stored profile is fatal
    let data = gather_preference_data(&postgres).await.unwrap_or_else(|e| {
        error!("Failed to load preference data: {}", e);
        panic!("Preference data error: {}", e);
    });
    let store = Arc::new(
        PreferenceStore::build(backend.as_ref(), data)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to build preference snapshot: {}", e);
                panic!("Preference snapshot error: {}", e);
            }),
    );

    let classifier = Arc::new(Classifier::new(
        Arc::clone(&backend),
        store,
        EmbeddingCache::new(settings.cache.capacity, settings.cache.ttl_secs),
        settings.scoring.policy(),
        Duration::from_millis(settings.batch.item_delay_ms),
    ));

    info!("Classifier initialized");

    // Build application state
    let app_state = AppState {
        postgres,
        backend,
        classifier,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
