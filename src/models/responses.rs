use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{ClassificationResult, PreferenceProfile, ReferenceImage, SharedInterest};

/// Response for a single classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    #[serde(rename = "sampleId")]
    pub sample_id: Uuid,
    pub result: ClassificationResult,
}

/// Response for a batch classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchClassifyResponse {
    pub results: Vec<ClassifyResponse>,
    /// First unprocessed index; equals the item count when the batch ran to completion
    #[serde(rename = "nextIndex")]
    pub next_index: usize,
    pub completed: bool,
}

/// Current preference state, including the snapshot generation serving scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub profile: PreferenceProfile,
    pub references: Vec<ReferenceImage>,
    pub traits: Vec<String>,
    #[serde(rename = "negativeKeywords")]
    pub negative_keywords: Vec<String>,
    pub interests: Vec<SharedInterest>,
    pub generation: u64,
}

/// Classification and training-data statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(rename = "totalClassified")]
    pub total_classified: i64,
    #[serde(rename = "totalMatches")]
    pub total_matches: i64,
    #[serde(rename = "matchRate")]
    pub match_rate: f64,
    #[serde(rename = "avgConfidence")]
    pub avg_confidence: f64,
    #[serde(rename = "referenceImages")]
    pub reference_images: usize,
    #[serde(rename = "positiveExamples")]
    pub positive_examples: usize,
    #[serde(rename = "negativeExamples")]
    pub negative_examples: usize,
}

/// Response for an embedding backfill run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillResponse {
    pub backfilled: usize,
    pub failed: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
