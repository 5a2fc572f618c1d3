use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::decision::{compile_reasons, decide, weighted_confidence};
use crate::core::embedding::{Embedding, EmbeddingBackend, ExtractionError};
use crate::core::scorer::{interest_score, personality_score, physical_score, ComponentScore, ScoringPolicy};
use crate::core::store::PreferenceStore;
use crate::models::{ClassificationResult, ComponentScores, ExtractedData};
use crate::services::cache::EmbeddingCache;

/// One subject to classify. `image: None` means the caller could not
/// resolve the image source; classification still proceeds with a
/// neutral physical score.
#[derive(Debug, Clone)]
pub struct ClassifyInput {
    pub image_ref: String,
    pub image: Option<Vec<u8>>,
    pub bio: Option<String>,
}

/// Classification output plus the subject embedding for persistence
#[derive(Debug, Clone)]
pub struct Classified {
    pub image_ref: String,
    pub result: ClassificationResult,
    pub embedding: Option<Vec<f32>>,
}

/// Result of a (possibly cancelled) batch run
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<Classified>,
    /// First unprocessed index, usable to resume the batch
    pub next_index: usize,
}

/// Classification orchestrator: embeds the subject, scores it against
/// the current preference snapshot, and combines the components into a
/// decision. Never fails on bad input; extraction errors degrade to a
/// neutral physical score with a disclosing reason.
pub struct Classifier {
    backend: Arc<dyn EmbeddingBackend>,
    store: Arc<PreferenceStore>,
    cache: EmbeddingCache,
    policy: ScoringPolicy,
    batch_delay: Duration,
}

impl Classifier {
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        store: Arc<PreferenceStore>,
        cache: EmbeddingCache,
        policy: ScoringPolicy,
        batch_delay: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            cache,
            policy,
            batch_delay,
        }
    }

    pub fn store(&self) -> &Arc<PreferenceStore> {
        &self.store
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Classify a single subject. `threshold` overrides the stored
    /// minimum score for this call only.
    pub async fn classify(&self, input: &ClassifyInput, threshold: Option<f64>) -> Classified {
        let snapshot = self.store.snapshot();

        let subject = match &input.image {
            Some(bytes) => self.cache.get_or_embed(self.backend.as_ref(), bytes).await,
            None => Err(ExtractionError::UnreadableInput(input.image_ref.clone())),
        };

        let physical = match &subject {
            Ok(embedding) => physical_score(embedding, &snapshot, &self.policy),
            Err(e) => {
                tracing::warn!("extraction failed for {}: {}, using neutral physical score", input.image_ref, e);
                ComponentScore {
                    value: 0.5,
                    reasons: vec!["Could not analyze the photo, visual score is neutral".to_string()],
                }
            }
        };

        let bio = input.bio.as_deref().map(str::trim).filter(|b| !b.is_empty());
        let extracted = extract_profile_fields(bio);

        let bio_embedding = match bio {
            Some(text) if self.backend.supports_text() && !snapshot.traits.is_empty() => {
                match self.backend.embed_text(text).await {
                    Ok(embedding) => Some(embedding),
                    Err(e) => {
                        tracing::warn!("failed to embed bio text: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let personality = personality_score(bio, bio_embedding.as_ref(), self.backend.supports_text(), &snapshot);
        let interests = interest_score(bio, &snapshot);

        let component_scores = ComponentScores {
            physical: physical.value,
            personality: personality.value,
            interests: interests.value,
        };
        let weights = snapshot.profile.weights();
        let confidence = weighted_confidence(&component_scores, &weights);

        let threshold_used = threshold.unwrap_or(snapshot.profile.min_score);
        let decision = decide(confidence, threshold_used, snapshot.profile.super_like_score);

        let mut component_reasons = physical.reasons;
        component_reasons.extend(personality.reasons);
        component_reasons.extend(interests.reasons);

        let reasons = compile_reasons(
            confidence,
            decision,
            threshold_used,
            component_reasons,
            &extracted,
            (snapshot.profile.age_min, snapshot.profile.age_max),
        );

        tracing::info!(
            "classified {}: {} (confidence {:.1}%)",
            input.image_ref,
            decision.as_str(),
            confidence * 100.0
        );

        Classified {
            image_ref: input.image_ref.clone(),
            result: ClassificationResult {
                is_match: decision.is_match(),
                decision,
                confidence_score: confidence,
                component_scores,
                weights,
                reasons,
                extracted_data: extracted,
                model_version_id: None,
                user_feedback: None,
            },
            embedding: subject.ok().map(Embedding::into_vec),
        }
    }

    /// Classify a batch sequentially, rate-limited by the configured
    /// inter-item delay so background pipelines do not starve interactive
    /// calls. Cancellation is honored between items, never mid-item, and
    /// `next_index` allows resuming from the first unprocessed item.
    pub async fn classify_batch(
        &self,
        inputs: &[ClassifyInput],
        start_index: usize,
        cancel: &AtomicBool,
    ) -> BatchOutcome {
        let mut results = Vec::new();
        let mut next_index = start_index.min(inputs.len());

        for (index, input) in inputs.iter().enumerate().skip(start_index) {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!("batch cancelled at item {} of {}", index, inputs.len());
                break;
            }
            if index > start_index {
                tokio::time::sleep(self.batch_delay).await;
            }

            results.push(self.classify(input, None).await);
            next_index = index + 1;
        }

        BatchOutcome { results, next_index }
    }
}

/// Pull name and age out of the bio's first line ("Emma, 27" style).
fn extract_profile_fields(bio: Option<&str>) -> ExtractedData {
    let Some(text) = bio else {
        return ExtractedData::default();
    };

    let mut data = ExtractedData {
        bio: Some(text.to_string()),
        ..Default::default()
    };

    let first_line = text.lines().next().unwrap_or("");
    if let Some(idx) = first_line.find(|c: char| c.is_ascii_digit()) {
        let (head, tail) = first_line.split_at(idx);
        let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        let name = head.trim().trim_end_matches(',').trim();

        if digits.len() == 2
            && !name.is_empty()
            && name.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
        {
            if let Ok(age) = digits.parse::<i32>() {
                if (18..=99).contains(&age) {
                    data.name = Some(name.to_string());
                    data.age = Some(age);
                }
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::core::store::{PreferenceData, PreferenceStore, ReferenceInput};
    use crate::models::{Decision, PreferenceProfile, ReferenceImage};

    /// Embeds byte/text payloads of the form "x,y" into 2-d vectors so
    /// tests control similarities exactly.
    struct VectorBackend;

    fn parse_vector(raw: &str) -> Result<Embedding, ExtractionError> {
        let values: Result<Vec<f32>, _> = raw.split(',').map(|p| p.trim().parse::<f32>()).collect();
        match values {
            Ok(v) => Embedding::new(v),
            Err(_) => Err(ExtractionError::UnreadableInput(raw.to_string())),
        }
    }

    #[async_trait]
    impl EmbeddingBackend for VectorBackend {
        fn name(&self) -> &str {
            "vector-stub"
        }

        fn supports_text(&self) -> bool {
            false
        }

        async fn embed_image(&self, image: &[u8]) -> Result<Embedding, ExtractionError> {
            let raw = std::str::from_utf8(image)
                .map_err(|_| ExtractionError::UnreadableInput("not utf8".to_string()))?;
            parse_vector(raw)
        }
    }

    fn reference_input(vector: &str) -> ReferenceInput {
        ReferenceInput {
            image: ReferenceImage {
                id: uuid::Uuid::new_v4(),
                file_path: "ref.jpg".to_string(),
                category: "general".to_string(),
                description: None,
                uploaded_at: None,
            },
            bytes: vector.as_bytes().to_vec(),
        }
    }

    async fn classifier_with(data: PreferenceData) -> Classifier {
        let backend = Arc::new(VectorBackend);
        let store = Arc::new(PreferenceStore::build(backend.as_ref(), data).await.unwrap());
        Classifier::new(
            backend,
            store,
            EmbeddingCache::new(100, 60),
            ScoringPolicy::default(),
            Duration::from_millis(0),
        )
    }

    fn input(vector: &str, bio: Option<&str>) -> ClassifyInput {
        ClassifyInput {
            image_ref: "subject.jpg".to_string(),
            image: Some(vector.as_bytes().to_vec()),
            bio: bio.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_single_reference_scenario() {
        let data = PreferenceData {
            profile: PreferenceProfile::default(),
            references: vec![reference_input("1.0,0.0")],
            ..Default::default()
        };
        let classifier = classifier_with(data).await;

        // cosine 0.9 against the reference
        let classified = classifier
            .classify(&input("0.9,0.43588989", Some("hello world")), None)
            .await;
        let result = &classified.result;

        assert!((result.component_scores.physical - 0.9).abs() < 1e-3);
        assert_eq!(result.component_scores.personality, 0.5);
        assert_eq!(result.component_scores.interests, 0.5);
        assert!((result.confidence_score - 0.74).abs() < 1e-3);
        assert_eq!(result.decision, Decision::Match);
        assert!(result.is_match);
        assert!(classified.embedding.is_some());
    }

    #[tokio::test]
    async fn test_extraction_failure_degrades_to_neutral() {
        let data = PreferenceData {
            references: vec![reference_input("1.0,0.0")],
            ..Default::default()
        };
        let classifier = classifier_with(data).await;

        let classified = classifier.classify(&input("not-a-vector", None), None).await;
        let result = &classified.result;

        assert_eq!(result.component_scores.physical, 0.5);
        assert!(result
            .reasons
            .iter()
            .any(|r| r.contains("Could not analyze the photo")));
        assert!(classified.embedding.is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_image_degrades_to_neutral() {
        let classifier = classifier_with(PreferenceData::default()).await;

        let missing = ClassifyInput {
            image_ref: "gone.jpg".to_string(),
            image: None,
            bio: None,
        };
        let classified = classifier.classify(&missing, None).await;

        assert_eq!(classified.result.component_scores.physical, 0.5);
    }

    #[tokio::test]
    async fn test_per_call_threshold_override() {
        let data = PreferenceData {
            references: vec![reference_input("1.0,0.0")],
            ..Default::default()
        };
        let classifier = classifier_with(data).await;

        // Confidence ~0.74: match at the stored 0.6 threshold
        let subject = input("0.9,0.43588989", None);
        assert!(classifier.classify(&subject, None).await.result.is_match);
        // Not at an explicit 0.8
        assert!(!classifier.classify(&subject, Some(0.8)).await.result.is_match);
    }

    #[tokio::test]
    async fn test_batch_runs_to_completion() {
        let classifier = classifier_with(PreferenceData::default()).await;
        let items = vec![input("1.0,0.0", None), input("0.0,1.0", None)];

        let cancel = AtomicBool::new(false);
        let outcome = classifier.classify_batch(&items, 0, &cancel).await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.next_index, 2);
    }

    #[tokio::test]
    async fn test_batch_cancellation_is_resumable() {
        let classifier = classifier_with(PreferenceData::default()).await;
        let items = vec![input("1.0,0.0", None), input("0.0,1.0", None)];

        let cancel = AtomicBool::new(true);
        let outcome = classifier.classify_batch(&items, 0, &cancel).await;
        assert_eq!(outcome.results.len(), 0);
        assert_eq!(outcome.next_index, 0);

        // Resume from where the cancelled run stopped
        let cancel = AtomicBool::new(false);
        let resumed = classifier
            .classify_batch(&items, outcome.next_index, &cancel)
            .await;
        assert_eq!(resumed.results.len(), 2);
        assert_eq!(resumed.next_index, 2);
    }

    #[test]
    fn test_extract_profile_fields() {
        let data = extract_profile_fields(Some("Emma, 27\nLove hiking and dogs"));
        assert_eq!(data.name.as_deref(), Some("Emma"));
        assert_eq!(data.age, Some(27));
        assert!(data.bio.unwrap().contains("hiking"));

        let no_age = extract_profile_fields(Some("Just vibes here"));
        assert_eq!(no_age.name, None);
        assert_eq!(no_age.age, None);

        assert_eq!(extract_profile_fields(None), ExtractedData::default());
    }
}
