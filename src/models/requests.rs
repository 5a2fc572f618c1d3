use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::FeedbackKind;

/// Request to classify a single profile image
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClassifyRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "image_path", rename = "imagePath")]
    pub image_path: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// Overrides the stored minimum score for this call only
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// One item of a batch classification request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchItemRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "image_path", rename = "imagePath")]
    pub image_path: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Request to classify a batch of profiles
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchClassifyRequest {
    #[validate(length(min = 1), nested)]
    pub items: Vec<BatchItemRequest>,
    /// Resume point from a previously cancelled batch
    #[serde(alias = "start_index", rename = "startIndex", default)]
    pub start_index: usize,
}

/// Partial update of the preference profile.
///
/// Weight and threshold changes do not force re-embedding; only the
/// snapshot's profile portion is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "physical_weight", rename = "physicalWeight", default)]
    pub physical_weight: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "personality_weight", rename = "personalityWeight", default)]
    pub personality_weight: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "interest_weight", rename = "interestWeight", default)]
    pub interest_weight: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "min_score", rename = "minScore", default)]
    pub min_score: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "super_like_score", rename = "superLikeScore", default)]
    pub super_like_score: Option<f64>,
    #[validate(range(min = 18, max = 120))]
    #[serde(alias = "age_min", rename = "ageMin", default)]
    pub age_min: Option<i32>,
    #[validate(range(min = 18, max = 120))]
    #[serde(alias = "age_max", rename = "ageMax", default)]
    pub age_max: Option<i32>,
}

/// Request to register a reference image
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddReferenceRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "image_path", rename = "imagePath")]
    pub image_path: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

/// Request to add a desired personality trait
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddTraitRequest {
    #[validate(length(min = 1))]
    #[serde(rename = "trait")]
    pub label: String,
}

/// Request to add a negative bio keyword
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddKeywordRequest {
    #[validate(length(min = 1))]
    pub keyword: String,
}

/// Request to add a shared interest
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddInterestRequest {
    #[validate(length(min = 1))]
    pub interest: String,
    #[serde(alias = "is_dealbreaker", rename = "isDealbreaker", default)]
    pub is_dealbreaker: bool,
}

/// Request to attach feedback to a classification sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: FeedbackKind,
}

/// Request to backfill missing sample embeddings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BackfillRequest {
    #[validate(range(min = 1, max = 500))]
    #[serde(default = "default_backfill_limit")]
    pub limit: i64,
}

fn default_backfill_limit() -> i64 {
    50
}
