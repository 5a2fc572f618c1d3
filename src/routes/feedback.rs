use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;

use crate::models::FeedbackRequest;
use crate::routes::{db_error, reload_snapshot, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/samples/{id}/feedback", web::post().to(submit_feedback))
        .route("/samples/{id}/feedback", web::delete().to(remove_feedback))
        .route("/samples/{id}", web::get().to(get_sample))
        .route("/models", web::get().to(list_versions))
        .route("/models", web::post().to(create_version))
        .route("/models/{id}/activate", web::post().to(activate_version));
}

/// GET /api/v1/samples/{id}
async fn get_sample(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state.postgres.get_sample(path.into_inner()).await {
        Ok(sample) => HttpResponse::Ok().json(sample),
        Err(e) => db_error("Failed to fetch sample", e),
    }
}

/// Attach (or re-label) feedback on a sample. The version counters move
/// in the same transaction, and the snapshot is rebuilt so the labeled
/// embedding joins the relative-scoring examples.
///
/// POST /api/v1/samples/{id}/feedback
async fn submit_feedback(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<FeedbackRequest>,
) -> impl Responder {
    let sample_id = path.into_inner();

    let sample = match state.postgres.submit_feedback(sample_id, req.feedback).await {
        Ok(sample) => sample,
        Err(e) => return db_error("Failed to record feedback", e),
    };

    match reload_snapshot(&state).await {
        Ok(_) => HttpResponse::Ok().json(sample),
        Err(response) => response,
    }
}

/// Withdraw feedback, restoring counters to their pre-submission values
///
/// DELETE /api/v1/samples/{id}/feedback
async fn remove_feedback(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let sample_id = path.into_inner();

    let sample = match state.postgres.remove_feedback(sample_id).await {
        Ok(sample) => sample,
        Err(e) => return db_error("Failed to remove feedback", e),
    };

    match reload_snapshot(&state).await {
        Ok(_) => HttpResponse::Ok().json(sample),
        Err(response) => response,
    }
}

/// GET /api/v1/models
async fn list_versions(state: web::Data<AppState>) -> impl Responder {
    match state.postgres.list_versions().await {
        Ok(versions) => HttpResponse::Ok().json(versions),
        Err(e) => db_error("Failed to list model versions", e),
    }
}

/// Register a new version capturing the current weights. It starts with
/// zeroed counters and stays inactive until promoted.
///
/// POST /api/v1/models
async fn create_version(state: web::Data<AppState>) -> impl Responder {
    let weights = state.classifier.store().snapshot().profile.weights();

    match state
        .postgres
        .create_version(state.classifier.backend_name(), &weights)
        .await
    {
        Ok(version) => HttpResponse::Ok().json(version),
        Err(e) => db_error("Failed to create model version", e),
    }
}

/// Promote a version; new classifications are attributed to it from here
/// on. Exactly one version is active at a time.
///
/// POST /api/v1/models/{id}/activate
async fn activate_version(state: web::Data<AppState>, path: web::Path<i32>) -> impl Responder {
    match state.postgres.activate_version(path.into_inner()).await {
        Ok(version) => HttpResponse::Ok().json(version),
        Err(e) => db_error("Failed to activate model version", e),
    }
}
