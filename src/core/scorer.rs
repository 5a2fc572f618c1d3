use crate::core::embedding::Embedding;
use crate::core::store::PreferenceSnapshot;

/// Tunable blend constants for the physical scorer.
///
/// The defaults follow the primary scoring policy; deployments can tune
/// them through configuration instead of editing code.
#[derive(Debug, Clone, Copy)]
pub struct ScoringPolicy {
    /// Weight of the best reference similarity in the base score
    pub ref_max_weight: f64,
    /// Weight of the mean reference similarity in the base score
    pub ref_mean_weight: f64,
    /// Mean example similarity above which the secondary adjustment kicks in
    pub example_similarity_bar: f64,
    /// Share of the blended score given to the positive-example signal
    pub positive_blend: f64,
    /// Multiplier applied when the subject resembles rejected profiles
    pub negative_damp: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            ref_max_weight: 0.7,
            ref_mean_weight: 0.3,
            example_similarity_bar: 0.65,
            positive_blend: 0.4,
            negative_damp: 0.7,
        }
    }
}

/// A component score with its human-readable justification
#[derive(Debug, Clone)]
pub struct ComponentScore {
    pub value: f64,
    pub reasons: Vec<String>,
}

impl ComponentScore {
    fn new(value: f64, reason: impl Into<String>) -> Self {
        Self {
            value,
            reasons: vec![reason.into()],
        }
    }
}

fn mean_similarity(subject: &Embedding, examples: &[Embedding]) -> Option<f64> {
    if examples.is_empty() {
        return None;
    }
    let sum: f64 = examples.iter().map(|e| subject.cosine(e)).sum();
    Some(sum / examples.len() as f64)
}

/// Physical compatibility from image similarity.
///
/// Reference images are the primary anchor: `max_weight*max + mean_weight*mean`
/// over all reference similarities. Without references, feedback-labeled
/// examples drive a relative score; without either, the score is neutral.
pub fn physical_score(
    subject: &Embedding,
    snapshot: &PreferenceSnapshot,
    policy: &ScoringPolicy,
) -> ComponentScore {
    let mut reasons = Vec::new();

    let pos_mean = mean_similarity(subject, &snapshot.positive_examples);
    let neg_mean = mean_similarity(subject, &snapshot.negative_examples);

    let mut score;
    if !snapshot.references.is_empty() {
        let sims: Vec<f64> = snapshot
            .references
            .iter()
            .map(|r| subject.cosine(&r.embedding))
            .collect();
        let max_sim = sims.iter().cloned().fold(f64::MIN, f64::max);
        let mean_sim = sims.iter().sum::<f64>() / sims.len() as f64;

        score = policy.ref_max_weight * max_sim + policy.ref_mean_weight * mean_sim;

        if max_sim > 0.75 {
            reasons.push("Strong visual similarity to your reference images".to_string());
        } else if max_sim > 0.6 {
            reasons.push("Good visual similarity to your preferences".to_string());
        } else if max_sim > 0.45 {
            reasons.push("Moderate visual similarity to your preferences".to_string());
        } else {
            reasons.push("Low visual similarity to your reference images".to_string());
        }

        // Secondary adjustment from learned examples; the positive and
        // negative branches are mutually exclusive
        if let Some(p) = pos_mean.filter(|p| *p > policy.example_similarity_bar) {
            score = score * (1.0 - policy.positive_blend) + p * policy.positive_blend;
            reasons.push("Similar to profiles you've liked before".to_string());
        } else if neg_mean.is_some_and(|n| n > policy.example_similarity_bar) {
            score *= policy.negative_damp;
            reasons.push("Similar to profiles you've rejected".to_string());
        }
    } else if let Some(p) = pos_mean {
        score = match neg_mean {
            Some(n) => (p - n + 1.0) / 2.0,
            None => p,
        };
        reasons.push("Scored against profiles you've previously rated".to_string());
    } else {
        tracing::warn!("insufficient data for physical scoring, defaulting to neutral");
        return ComponentScore::new(0.5, "No reference images for comparison");
    }

    ComponentScore {
        value: score.clamp(0.0, 1.0),
        reasons,
    }
}

/// Personality compatibility from bio text.
///
/// Text-capable backends compare the bio embedding against the
/// pre-computed desired-traits embedding. Unimodal backends fall back to
/// case-insensitive keyword matching, where any negative keyword
/// short-circuits the score to 0.0. Absent bio text is never penalized.
pub fn personality_score(
    bio_text: Option<&str>,
    bio_embedding: Option<&Embedding>,
    supports_text: bool,
    snapshot: &PreferenceSnapshot,
) -> ComponentScore {
    let bio = bio_text.map(str::trim).filter(|b| !b.is_empty());

    if supports_text {
        if snapshot.traits.is_empty() {
            return ComponentScore::new(0.5, "No personality preferences set");
        }
        let Some(_) = bio else {
            tracing::warn!("no bio text available, personality score defaults to neutral");
            return ComponentScore::new(0.5, "No bio text to analyze personality match");
        };
        match (&snapshot.trait_embedding, bio_embedding) {
            (Some(desired), Some(subject)) => {
                let similarity = subject.cosine(desired);
                if similarity > 0.6 {
                    ComponentScore::new(
                        similarity.clamp(0.0, 1.0),
                        format!(
                            "Bio aligns well with your personality preferences: {}",
                            snapshot.traits.join(", ")
                        ),
                    )
                } else if similarity > 0.4 {
                    ComponentScore::new(
                        similarity.clamp(0.0, 1.0),
                        "Bio somewhat matches your personality preferences",
                    )
                } else {
                    ComponentScore::new(
                        0.5,
                        "Bio shows little alignment with your personality preferences",
                    )
                }
            }
            _ => {
                tracing::warn!("missing text embeddings, personality score defaults to neutral");
                ComponentScore::new(0.5, "Could not compare bio against personality preferences")
            }
        }
    } else {
        let Some(bio) = bio else {
            return ComponentScore::new(0.5, "No bio text to analyze personality match");
        };
        let bio_lower = bio.to_lowercase();

        // Dealbreaker keywords win over any positive trait matches
        for keyword in &snapshot.negative_keywords {
            if bio_lower.contains(&keyword.to_lowercase()) {
                return ComponentScore::new(0.0, format!("Dealbreaker keyword found: {}", keyword));
            }
        }

        if snapshot.traits.is_empty() {
            return ComponentScore::new(0.5, "No personality preferences set");
        }

        let mut score: f64 = 0.5;
        let mut matched = Vec::new();
        for label in &snapshot.traits {
            if bio_lower.contains(&label.to_lowercase()) {
                score += 0.15;
                matched.push(label.as_str());
            }
        }

        if matched.is_empty() {
            ComponentScore::new(0.5, "No desired personality traits mentioned in bio")
        } else {
            ComponentScore::new(
                score.min(1.0),
                format!("Bio mentions desired traits: {}", matched.join(", ")),
            )
        }
    }
}

/// Shared-interest score from bio text.
///
/// A dealbreaker interest zeroes the score regardless of how many other
/// interests match.
pub fn interest_score(bio_text: Option<&str>, snapshot: &PreferenceSnapshot) -> ComponentScore {
    if snapshot.interests.is_empty() {
        return ComponentScore::new(0.5, "No interest preferences set");
    }

    let Some(bio) = bio_text.map(str::trim).filter(|b| !b.is_empty()) else {
        tracing::warn!("no bio text available, interest score defaults to neutral");
        return ComponentScore::new(0.5, "No bio text to analyze");
    };
    let bio_lower = bio.to_lowercase();

    for entry in snapshot.interests.iter().filter(|i| i.is_dealbreaker) {
        if bio_lower.contains(&entry.interest.to_lowercase()) {
            return ComponentScore::new(0.0, format!("Dealbreaker interest found: {}", entry.interest));
        }
    }

    let matched: Vec<&str> = snapshot
        .interests
        .iter()
        .filter(|i| bio_lower.contains(&i.interest.to_lowercase()))
        .map(|i| i.interest.as_str())
        .collect();

    if matched.is_empty() {
        ComponentScore::new(0.3, "No obvious shared interests mentioned")
    } else {
        let value = (matched.len() as f64 / snapshot.interests.len() as f64).min(1.0);
        ComponentScore::new(value, format!("Shares interests: {}", matched.join(", ")))
    }
}
