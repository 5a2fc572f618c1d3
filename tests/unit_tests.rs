// Unit tests for matchlens scoring

use matchlens::core::{
    decide, interest_score, personality_score, physical_score, weighted_confidence, Embedding,
    PreferenceSnapshot, ScoringPolicy,
};
use matchlens::core::store::ReferenceEmbedding;
use matchlens::models::{
    ComponentScores, Decision, FeedbackKind, PreferenceProfile, ScoringWeights, SharedInterest,
    VersionCounters,
};

fn unit(x: f32, y: f32) -> Embedding {
    Embedding::new(vec![x, y]).unwrap()
}

fn snapshot() -> PreferenceSnapshot {
    PreferenceSnapshot {
        profile: PreferenceProfile::default(),
        references: Vec::new(),
        positive_examples: Vec::new(),
        negative_examples: Vec::new(),
        traits: Vec::new(),
        negative_keywords: Vec::new(),
        interests: Vec::new(),
        trait_embedding: None,
        generation: 1,
    }
}

fn reference(embedding: Embedding) -> ReferenceEmbedding {
    ReferenceEmbedding {
        id: uuid::Uuid::new_v4(),
        category: "general".to_string(),
        description: None,
        embedding,
    }
}

#[test]
fn test_reference_blend_dominates_physical_score() {
    let mut snap = snapshot();
    snap.references.push(reference(unit(1.0, 0.0)));
    snap.references.push(reference(unit(0.0, 1.0)));

    let subject = unit(1.0, 0.0);
    let score = physical_score(&subject, &snap, &ScoringPolicy::default());

    // max 1.0, mean 0.5: 0.7 + 0.15
    assert!((score.value - 0.85).abs() < 1e-6);
}

#[test]
fn test_dealbreaker_interest_overrides_everything_else() {
    let mut snap = snapshot();
    snap.interests = vec![
        SharedInterest { interest: "hiking".to_string(), is_dealbreaker: false },
        SharedInterest { interest: "smoking".to_string(), is_dealbreaker: true },
    ];

    let score = interest_score(Some("hiking and smoking"), &snap);
    assert_eq!(score.value, 0.0);
}

#[test]
fn test_negative_keyword_zeroes_personality() {
    let mut snap = snapshot();
    snap.traits = vec!["kind".to_string()];
    snap.negative_keywords = vec!["crypto".to_string()];

    let score = personality_score(Some("kind, into crypto"), None, false, &snap);
    assert_eq!(score.value, 0.0);
}

#[test]
fn test_weighted_decision_pipeline() {
    let weights = ScoringWeights {
        physical: 0.6,
        personality: 0.3,
        interests: 0.1,
    };
    let components = ComponentScores {
        physical: 0.9,
        personality: 0.5,
        interests: 0.5,
    };

    let confidence = weighted_confidence(&components, &weights);
    assert!((confidence - 0.74).abs() < 1e-9);
    assert_eq!(decide(confidence, 0.6, 0.85), Decision::Match);
    assert_eq!(decide(confidence, 0.75, 0.85), Decision::NoMatch);
}

#[test]
fn test_super_like_requires_both_thresholds() {
    assert_eq!(decide(0.9, 0.6, 0.85), Decision::SuperLike);
    // Degenerate configuration: super-like bar below the minimum score
    assert_eq!(decide(0.5, 0.7, 0.4), Decision::NoMatch);
}

#[test]
fn test_result_survives_persistence_round_trip() {
    let result = matchlens::ClassificationResult {
        is_match: true,
        decision: Decision::Match,
        confidence_score: 0.74,
        component_scores: ComponentScores {
            physical: 0.9,
            personality: 0.5,
            interests: 0.5,
        },
        weights: ScoringWeights::default(),
        reasons: vec!["Strong overall compatibility".to_string()],
        extracted_data: matchlens::models::ExtractedData {
            name: Some("Emma".to_string()),
            age: Some(27),
            bio: Some("Emma, 27".to_string()),
        },
        model_version_id: Some(3),
        user_feedback: None,
    };

    let json = serde_json::to_string(&result).unwrap();
    let restored: matchlens::ClassificationResult = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.decision, result.decision);
    assert_eq!(restored.confidence_score, result.confidence_score);
    assert_eq!(restored.component_scores, result.component_scores);
    assert_eq!(restored.model_version_id, result.model_version_id);
}

#[test]
fn test_feedback_ledger_reversibility() {
    let mut counters = VersionCounters {
        likes: 10,
        dislikes: 4,
        super_likes: 2,
        total_predictions: 16,
    };
    let before = counters;

    counters.apply_transition(None, Some(FeedbackKind::Like));
    counters.apply_transition(Some(FeedbackKind::Like), Some(FeedbackKind::SuperLike));
    counters.apply_transition(Some(FeedbackKind::SuperLike), None);

    assert_eq!(counters, before);
}

#[test]
fn test_relabel_keeps_total_predictions() {
    let mut counters = VersionCounters::default();
    counters.apply_transition(None, Some(FeedbackKind::Dislike));
    counters.apply_transition(Some(FeedbackKind::Dislike), Some(FeedbackKind::Like));
    counters.apply_transition(Some(FeedbackKind::Like), Some(FeedbackKind::SuperLike));

    assert_eq!(counters.total_predictions, 1);
    assert_eq!(counters.super_likes, 1);
    assert_eq!(counters.likes, 0);
    assert_eq!(counters.dislikes, 0);
}
