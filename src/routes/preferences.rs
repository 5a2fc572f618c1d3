use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AddInterestRequest, AddKeywordRequest, AddReferenceRequest, AddTraitRequest,
    PreferencesResponse, UpdateProfileRequest,
};
use crate::core::validate_profile;
use crate::routes::{db_error, error_json, reload_snapshot, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/preferences", web::get().to(get_preferences))
        .route("/preferences/profile", web::put().to(update_profile))
        .route("/preferences/references", web::post().to(add_reference))
        .route("/preferences/references/{id}", web::delete().to(remove_reference))
        .route("/preferences/traits", web::post().to(add_trait))
        .route("/preferences/traits/{label}", web::delete().to(remove_trait))
        .route("/preferences/keywords", web::post().to(add_keyword))
        .route("/preferences/keywords/{keyword}", web::delete().to(remove_keyword))
        .route("/preferences/interests", web::post().to(add_interest))
        .route("/preferences/interests/{interest}", web::delete().to(remove_interest));
}

/// Current preference state
///
/// GET /api/v1/preferences
async fn get_preferences(state: web::Data<AppState>) -> impl Responder {
    let profile = match state.postgres.get_profile().await {
        Ok(profile) => profile,
        Err(e) => return db_error("Failed to fetch profile", e),
    };
    let references = match state.postgres.list_references().await {
        Ok(refs) => refs,
        Err(e) => return db_error("Failed to fetch references", e),
    };
    let traits = match state.postgres.list_traits().await {
        Ok(traits) => traits,
        Err(e) => return db_error("Failed to fetch traits", e),
    };
    let negative_keywords = match state.postgres.list_negative_keywords().await {
        Ok(keywords) => keywords,
        Err(e) => return db_error("Failed to fetch keywords", e),
    };
    let interests = match state.postgres.list_interests().await {
        Ok(interests) => interests,
        Err(e) => return db_error("Failed to fetch interests", e),
    };

    HttpResponse::Ok().json(PreferencesResponse {
        profile,
        references,
        traits,
        negative_keywords,
        interests,
        generation: state.classifier.store().snapshot().generation,
    })
}

/// Partial profile update. Weight and threshold changes swap the profile
/// into the live snapshot without re-embedding anything.
///
/// PUT /api/v1/preferences/profile
async fn update_profile(
    state: web::Data<AppState>,
    req: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    let mut profile = match state.postgres.get_profile().await {
        Ok(profile) => profile,
        Err(e) => return db_error("Failed to fetch profile", e),
    };

    if let Some(v) = req.physical_weight {
        profile.physical_weight = v;
    }
    if let Some(v) = req.personality_weight {
        profile.personality_weight = v;
    }
    if let Some(v) = req.interest_weight {
        profile.interest_weight = v;
    }
    if let Some(v) = req.min_score {
        profile.min_score = v;
    }
    if let Some(v) = req.super_like_score {
        profile.super_like_score = v;
    }
    if let Some(v) = req.age_min {
        profile.age_min = v;
    }
    if let Some(v) = req.age_max {
        profile.age_max = v;
    }

    // Validate first, persist, then swap: an invalid merge never reaches
    // the database, and live scoring only ever runs on durably stored
    // weights
    if let Err(e) = validate_profile(&profile) {
        return error_json(400, "Invalid preference profile", e);
    }

    if let Err(e) = state.postgres.update_profile(&profile).await {
        return db_error("Failed to persist profile", e);
    }

    let generation = match state.classifier.store().update_profile(profile.clone()) {
        Ok(generation) => generation,
        Err(e) => return error_json(400, "Invalid preference profile", e),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "profile": profile,
        "generation": generation,
    }))
}

/// Register a reference image and rebuild the snapshot
///
/// POST /api/v1/preferences/references
async fn add_reference(
    state: web::Data<AppState>,
    req: web::Json<AddReferenceRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    // Reject paths that cannot be read now rather than at the next reload
    if tokio::fs::metadata(&req.image_path).await.is_err() {
        return error_json(
            400,
            "Invalid reference image",
            format!("cannot read {}", req.image_path),
        );
    }

    let image = match state
        .postgres
        .add_reference(&req.image_path, &req.category, req.description.as_deref())
        .await
    {
        Ok(image) => image,
        Err(e) => return db_error("Failed to add reference", e),
    };

    match reload_snapshot(&state).await {
        Ok(generation) => HttpResponse::Ok().json(serde_json::json!({
            "reference": image,
            "generation": generation,
        })),
        Err(response) => response,
    }
}

/// DELETE /api/v1/preferences/references/{id}
async fn remove_reference(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let id = path.into_inner();

    match state.postgres.remove_reference(id).await {
        Ok(true) => {}
        Ok(false) => return error_json(404, "Not found", format!("reference {}", id)),
        Err(e) => return db_error("Failed to remove reference", e),
    }

    respond_with_reload(&state).await
}

/// POST /api/v1/preferences/traits
async fn add_trait(state: web::Data<AppState>, req: web::Json<AddTraitRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    if let Err(e) = state.postgres.add_trait(&req.label).await {
        return db_error("Failed to add trait", e);
    }

    respond_with_reload(&state).await
}

/// DELETE /api/v1/preferences/traits/{label}
async fn remove_trait(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let label = path.into_inner();

    match state.postgres.remove_trait(&label).await {
        Ok(true) => {}
        Ok(false) => return error_json(404, "Not found", format!("trait {}", label)),
        Err(e) => return db_error("Failed to remove trait", e),
    }

    respond_with_reload(&state).await
}

/// POST /api/v1/preferences/keywords
async fn add_keyword(state: web::Data<AppState>, req: web::Json<AddKeywordRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    if let Err(e) = state.postgres.add_negative_keyword(&req.keyword).await {
        return db_error("Failed to add keyword", e);
    }

    respond_with_reload(&state).await
}

/// DELETE /api/v1/preferences/keywords/{keyword}
async fn remove_keyword(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let keyword = path.into_inner();

    match state.postgres.remove_negative_keyword(&keyword).await {
        Ok(true) => {}
        Ok(false) => return error_json(404, "Not found", format!("keyword {}", keyword)),
        Err(e) => return db_error("Failed to remove keyword", e),
    }

    respond_with_reload(&state).await
}

/// POST /api/v1/preferences/interests
async fn add_interest(
    state: web::Data<AppState>,
    req: web::Json<AddInterestRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(400, "Validation failed", errors);
    }

    if let Err(e) = state
        .postgres
        .add_interest(&req.interest, req.is_dealbreaker)
        .await
    {
        return db_error("Failed to add interest", e);
    }

    respond_with_reload(&state).await
}

/// DELETE /api/v1/preferences/interests/{interest}
async fn remove_interest(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let interest = path.into_inner();

    match state.postgres.remove_interest(&interest).await {
        Ok(true) => {}
        Ok(false) => return error_json(404, "Not found", format!("interest {}", interest)),
        Err(e) => return db_error("Failed to remove interest", e),
    }

    respond_with_reload(&state).await
}

async fn respond_with_reload(state: &web::Data<AppState>) -> HttpResponse {
    match reload_snapshot(state).await {
        Ok(generation) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "generation": generation,
        })),
        Err(response) => response,
    }
}
