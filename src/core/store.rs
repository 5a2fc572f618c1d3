use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use uuid::Uuid;

use crate::core::embedding::{Embedding, EmbeddingBackend};
use crate::models::{PreferenceProfile, ReferenceImage, SharedInterest};

/// Fatal errors at preference store construction or reload
#[derive(Debug, Error)]
pub enum PreferenceLoadError {
    #[error("invalid preference profile: {0}")]
    InvalidProfile(String),
}

/// Raw inputs for building a preference snapshot.
///
/// The caller resolves image references to bytes (the store never touches
/// storage layout) and supplies feedback-labeled example embeddings from
/// persistence.
#[derive(Default)]
pub struct PreferenceData {
    pub profile: PreferenceProfile,
    pub references: Vec<ReferenceInput>,
    pub positive_examples: Vec<Embedding>,
    pub negative_examples: Vec<Embedding>,
    pub traits: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub interests: Vec<SharedInterest>,
}

/// A reference image with its resolved bytes, ready for embedding
pub struct ReferenceInput {
    pub image: ReferenceImage,
    pub bytes: Vec<u8>,
}

/// A materialized reference anchor
#[derive(Debug, Clone)]
pub struct ReferenceEmbedding {
    pub id: Uuid,
    pub category: String,
    pub description: Option<String>,
    pub embedding: Embedding,
}

/// Immutable view of the user's preferences with all embeddings
/// pre-computed. Scoring only ever reads snapshots; mutations build a
/// new one and swap it in.
#[derive(Debug, Clone)]
pub struct PreferenceSnapshot {
    pub profile: PreferenceProfile,
    pub references: Vec<ReferenceEmbedding>,
    pub positive_examples: Vec<Embedding>,
    pub negative_examples: Vec<Embedding>,
    pub traits: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub interests: Vec<SharedInterest>,
    /// Embedding of the synthesized desired-traits sentence, present only
    /// when the backend has a joint text space and traits are set
    pub trait_embedding: Option<Embedding>,
    pub generation: u64,
}

impl PreferenceSnapshot {
    /// Sentence fed to text-capable backends for personality comparison
    pub fn desired_traits_sentence(traits: &[String]) -> String {
        format!("A person who is {}", traits.join(", "))
    }
}

/// Read-mostly shared preference state.
///
/// Reloads construct a complete new snapshot and publish it with a single
/// atomic swap, so in-flight classifications never observe a half-updated
/// reference set.
pub struct PreferenceStore {
    snapshot: ArcSwap<PreferenceSnapshot>,
    generation: AtomicU64,
}

impl PreferenceStore {
    /// Build the initial snapshot. Fails fast on an invalid profile; no
    /// classification proceeds without a valid store.
    pub async fn build(
        backend: &dyn EmbeddingBackend,
        data: PreferenceData,
    ) -> Result<Self, PreferenceLoadError> {
        let snapshot = build_snapshot(backend, data, 1).await?;
        Ok(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            generation: AtomicU64::new(1),
        })
    }

    /// Rebuild everything (reference embeddings included) and swap the new
    /// snapshot in atomically. Returns the new generation.
    pub async fn reload(
        &self,
        backend: &dyn EmbeddingBackend,
        data: PreferenceData,
    ) -> Result<u64, PreferenceLoadError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = build_snapshot(backend, data, generation).await?;
        self.snapshot.store(Arc::new(snapshot));
        tracing::info!("preference snapshot reloaded (generation {})", generation);
        Ok(generation)
    }

    /// Swap in a profile-only change (weights, thresholds, age range).
    /// No re-embedding happens; reference vectors are carried over.
    pub fn update_profile(&self, profile: PreferenceProfile) -> Result<u64, PreferenceLoadError> {
        validate_profile(&profile)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut snapshot = PreferenceSnapshot::clone(&self.snapshot.load());
        snapshot.profile = profile;
        snapshot.generation = generation;
        self.snapshot.store(Arc::new(snapshot));
        tracing::debug!("preference profile updated in place (generation {})", generation);
        Ok(generation)
    }

    /// Current immutable snapshot; callers hold it for the duration of one
    /// classification
    pub fn snapshot(&self) -> Arc<PreferenceSnapshot> {
        self.snapshot.load_full()
    }
}

async fn build_snapshot(
    backend: &dyn EmbeddingBackend,
    data: PreferenceData,
    generation: u64,
) -> Result<PreferenceSnapshot, PreferenceLoadError> {
    validate_profile(&data.profile)?;

    let mut references = Vec::with_capacity(data.references.len());
    for input in data.references {
        match backend.embed_image(&input.bytes).await {
            Ok(embedding) => references.push(ReferenceEmbedding {
                id: input.image.id,
                category: input.image.category,
                description: input.image.description,
                embedding,
            }),
            Err(e) => {
                // Skip the anchor rather than failing the whole reload
                tracing::warn!("failed to embed reference image {}: {}", input.image.id, e);
            }
        }
    }

    let trait_embedding = if backend.supports_text() && !data.traits.is_empty() {
        let sentence = PreferenceSnapshot::desired_traits_sentence(&data.traits);
        match backend.embed_text(&sentence).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::warn!("failed to embed desired-traits sentence: {}", e);
                None
            }
        }
    } else {
        None
    };

    tracing::info!(
        "built preference snapshot: {} references, {} positive / {} negative examples, {} traits, {} interests",
        references.len(),
        data.positive_examples.len(),
        data.negative_examples.len(),
        data.traits.len(),
        data.interests.len()
    );

    Ok(PreferenceSnapshot {
        profile: data.profile,
        references,
        positive_examples: data.positive_examples,
        negative_examples: data.negative_examples,
        traits: data.traits,
        negative_keywords: data.negative_keywords,
        interests: data.interests,
        trait_embedding,
        generation,
    })
}

/// Check the profile's unit bounds and age range. Callers that persist a
/// profile before swapping it into the live snapshot validate up front so
/// an invalid merge never reaches storage.
pub fn validate_profile(profile: &PreferenceProfile) -> Result<(), PreferenceLoadError> {
    let unit_bounds = [
        ("physical_weight", profile.physical_weight),
        ("personality_weight", profile.personality_weight),
        ("interest_weight", profile.interest_weight),
        ("min_score", profile.min_score),
        ("super_like_score", profile.super_like_score),
    ];
    for (field, value) in unit_bounds {
        if !(0.0..=1.0).contains(&value) || !value.is_finite() {
            return Err(PreferenceLoadError::InvalidProfile(format!(
                "{} must be within [0, 1], got {}",
                field, value
            )));
        }
    }

    if profile.age_min < 18 {
        return Err(PreferenceLoadError::InvalidProfile(format!(
            "age_min must be at least 18, got {}",
            profile.age_min
        )));
    }
    if profile.age_min > profile.age_max {
        return Err(PreferenceLoadError::InvalidProfile(format!(
            "age range is inverted ({}-{})",
            profile.age_min, profile.age_max
        )));
    }

    Ok(())
}
