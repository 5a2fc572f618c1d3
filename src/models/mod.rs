// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ClassificationResult, ComponentScores, Decision, ExtractedData, FeedbackKind, ModelVersion,
    PreferenceProfile, ReferenceImage, ScoringWeights, SharedInterest, VersionCounters,
};
pub use requests::{
    AddInterestRequest, AddKeywordRequest, AddReferenceRequest, AddTraitRequest, BackfillRequest,
    BatchClassifyRequest, BatchItemRequest, ClassifyRequest, FeedbackRequest, UpdateProfileRequest,
};
pub use responses::{
    BackfillResponse, BatchClassifyResponse, ClassifyResponse, ErrorResponse, HealthResponse,
    PreferencesResponse, StatsResponse,
};
