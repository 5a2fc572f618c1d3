use std::sync::atomic::AtomicBool;

use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{Classified, ClassifyInput};
use crate::models::{
    BackfillRequest, BackfillResponse, BatchClassifyRequest, BatchClassifyResponse,
    ClassifyRequest, ClassifyResponse, HealthResponse, StatsResponse,
};
use crate::routes::{db_error, error_json, reload_snapshot, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/classify", web::post().to(classify))
        .route("/classify/batch", web::post().to(classify_batch))
        .route("/history", web::get().to(history))
        .route("/stats", web::get().to(stats))
        .route("/samples/backfill", web::post().to(backfill_embeddings));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn resolve_image(path: &str) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("cannot read image {}: {}", path, e);
            None
        }
    }
}

/// Persist one classification, stamping it with the active model version
async fn persist(state: &AppState, classified: Classified) -> Result<ClassifyResponse, HttpResponse> {
    let mut result = classified.result;
    result.model_version_id = state
        .postgres
        .get_active_version()
        .await
        .map_err(|e| db_error("Failed to resolve active model version", e))?
        .map(|v| v.id);

    let sample_id = state
        .postgres
        .insert_sample(&classified.image_ref, &result, classified.embedding.as_deref())
        .await
        .map_err(|e| db_error("Failed to persist classification", e))?;

    Ok(ClassifyResponse { sample_id, result })
}

/// Classify a single profile
///
/// POST /api/v1/classify
async fn classify(state: web::Data<AppState>, req: web::Json<ClassifyRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    let input = ClassifyInput {
        image_ref: req.image_path.clone(),
        image: resolve_image(&req.image_path).await,
        bio: req.bio.clone(),
    };

    let classified = state.classifier.classify(&input, req.threshold).await;

    match persist(&state, classified).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(response) => response,
    }
}

/// Classify a batch of profiles sequentially.
///
/// An accepted batch always runs to completion; there is no cancellation
/// over HTTP. Callers resume an interrupted or partial run by re-posting
/// with `startIndex` set to the `nextIndex` of the previous response.
///
/// POST /api/v1/classify/batch
async fn classify_batch(
    state: web::Data<AppState>,
    req: web::Json<BatchClassifyRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }
    if req.start_index > req.items.len() {
        return error_json(
            400,
            "Validation failed",
            format!("startIndex {} exceeds item count {}", req.start_index, req.items.len()),
        );
    }

    let mut inputs = Vec::with_capacity(req.items.len());
    for item in &req.items {
        inputs.push(ClassifyInput {
            image_ref: item.image_path.clone(),
            image: resolve_image(&item.image_path).await,
            bio: item.bio.clone(),
        });
    }

    let cancel = AtomicBool::new(false);
    let outcome = state
        .classifier
        .classify_batch(&inputs, req.start_index, &cancel)
        .await;

    let mut results = Vec::with_capacity(outcome.results.len());
    for classified in outcome.results {
        match persist(&state, classified).await {
            Ok(response) => results.push(response),
            Err(response) => return response,
        }
    }

    let completed = outcome.next_index == inputs.len();
    HttpResponse::Ok().json(BatchClassifyResponse {
        results,
        next_index: outcome.next_index,
        completed,
    })
}

/// Classification history, newest first
///
/// GET /api/v1/history?limit=50&offset=0
async fn history(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(50)
        .clamp(1, 500);
    let offset = query
        .get("offset")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
        .max(0);

    match state.postgres.history(limit, offset).await {
        Ok(samples) => HttpResponse::Ok().json(samples),
        Err(e) => db_error("Failed to fetch history", e),
    }
}

/// Ledger and training-data statistics
///
/// GET /api/v1/stats
async fn stats(state: web::Data<AppState>) -> impl Responder {
    let ledger = match state.postgres.ledger_stats().await {
        Ok(stats) => stats,
        Err(e) => return db_error("Failed to compute statistics", e),
    };
    let snapshot = state.classifier.store().snapshot();

    let match_rate = if ledger.total_samples > 0 {
        ledger.matches as f64 / ledger.total_samples as f64
    } else {
        0.0
    };

    HttpResponse::Ok().json(StatsResponse {
        total_classified: ledger.total_samples,
        total_matches: ledger.matches,
        match_rate,
        avg_confidence: ledger.avg_confidence.unwrap_or(0.0),
        reference_images: snapshot.references.len(),
        positive_examples: snapshot.positive_examples.len(),
        negative_examples: snapshot.negative_examples.len(),
    })
}

/// Backfill subject embeddings for samples recorded without one, then
/// rebuild the snapshot so newly usable examples feed relative scoring
///
/// POST /api/v1/samples/backfill
async fn backfill_embeddings(
    state: web::Data<AppState>,
    req: web::Json<BackfillRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    let pending = match state.postgres.samples_missing_embeddings(req.limit).await {
        Ok(pending) => pending,
        Err(e) => return db_error("Failed to list samples", e),
    };

    let mut backfilled = 0;
    let mut failed = 0;
    for (id, image_ref) in pending {
        let Some(bytes) = resolve_image(&image_ref).await else {
            failed += 1;
            continue;
        };
        match state.backend.embed_image(&bytes).await {
            Ok(embedding) => {
                if let Err(e) = state
                    .postgres
                    .store_sample_embedding(id, embedding.as_slice())
                    .await
                {
                    tracing::error!("failed to store embedding for sample {}: {}", id, e);
                    failed += 1;
                } else {
                    backfilled += 1;
                }
            }
            Err(e) => {
                tracing::warn!("backfill embedding failed for {}: {}", image_ref, e);
                failed += 1;
            }
        }
    }

    if backfilled > 0 {
        if let Err(response) = reload_snapshot(&state).await {
            return response;
        }
    }

    tracing::info!("backfill complete: {} embedded, {} failed", backfilled, failed);

    HttpResponse::Ok().json(BackfillResponse { backfilled, failed })
}
