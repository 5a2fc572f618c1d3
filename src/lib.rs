//! Matchlens - profile compatibility scoring engine
//!
//! Scores candidate dating profiles against a single user's stored
//! preferences (reference images, desired traits, shared interests) and
//! learns from explicit feedback over time. Exposes an HTTP API for
//! classification, preference management, and the model version registry.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Classifier, ClassifyInput, Embedding, EmbeddingBackend, PreferenceStore, ScoringPolicy};
pub use crate::models::{ClassificationResult, Decision, FeedbackKind, PreferenceProfile, ScoringWeights};
