// Core scoring exports
pub mod classifier;
pub mod decision;
pub mod embedding;
pub mod scorer;
pub mod store;

pub use classifier::{BatchOutcome, Classified, Classifier, ClassifyInput};
pub use decision::{compile_reasons, decide, weighted_confidence};
pub use embedding::{Embedding, EmbeddingBackend, ExtractionError};
pub use scorer::{interest_score, personality_score, physical_score, ComponentScore, ScoringPolicy};
pub use store::{
    validate_profile, PreferenceData, PreferenceLoadError, PreferenceSnapshot, PreferenceStore,
    ReferenceInput,
};
