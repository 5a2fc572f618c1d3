use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single live preference profile driving all scoring decisions.
///
/// Weights are independent factors in [0,1] and are not required to sum
/// to 1. Thresholds are compared against the weighted confidence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub physical_weight: f64,
    pub personality_weight: f64,
    pub interest_weight: f64,
    pub min_score: f64,
    pub super_like_score: f64,
    pub age_min: i32,
    pub age_max: i32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PreferenceProfile {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            physical: self.physical_weight,
            personality: self.personality_weight,
            interests: self.interest_weight,
        }
    }
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            physical_weight: 0.6,
            personality_weight: 0.3,
            interest_weight: 0.1,
            min_score: 0.6,
            super_like_score: 0.85,
            age_min: 25,
            age_max: 35,
            updated_at: None,
        }
    }
}

/// Component weights snapshotted into every classification result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub physical: f64,
    pub personality: f64,
    pub interests: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            physical: 0.6,
            personality: 0.3,
            interests: 0.1,
        }
    }
}

/// A user-supplied exemplar image used as a similarity anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub id: Uuid,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub category: String,
    pub description: Option<String>,
    #[serde(rename = "uploadedAt", default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// An interest to look for in bio text. A dealbreaker interest zeroes the
/// interest score unconditionally when found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedInterest {
    pub interest: String,
    #[serde(rename = "isDealbreaker", default)]
    pub is_dealbreaker: bool,
}

/// User feedback attached to a classification sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Like,
    Dislike,
    SuperLike,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Like => "like",
            FeedbackKind::Dislike => "dislike",
            FeedbackKind::SuperLike => "super_like",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(FeedbackKind::Like),
            "dislike" => Some(FeedbackKind::Dislike),
            "super_like" => Some(FeedbackKind::SuperLike),
            _ => None,
        }
    }
}

/// Categorical outcome of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    SuperLike,
    Match,
    NoMatch,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::SuperLike => "super_like",
            Decision::Match => "match",
            Decision::NoMatch => "no_match",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "super_like" => Some(Decision::SuperLike),
            "match" => Some(Decision::Match),
            "no_match" => Some(Decision::NoMatch),
            _ => None,
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, Decision::NoMatch)
    }
}

/// Per-component scores, each in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub physical: f64,
    pub personality: f64,
    pub interests: f64,
}

/// Structured data pulled out of the subject's bio text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub bio: Option<String>,
}

/// Stable result contract returned to callers and persisted per sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_match: bool,
    pub decision: Decision,
    pub confidence_score: f64,
    pub component_scores: ComponentScores,
    pub weights: ScoringWeights,
    pub reasons: Vec<String>,
    pub extracted_data: ExtractedData,
    pub model_version_id: Option<i32>,
    pub user_feedback: Option<FeedbackKind>,
}

/// A named, independently measured configuration of the scoring engine.
///
/// Counters change only through the feedback ledger, never directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: i32,
    #[serde(rename = "versionNumber")]
    pub version_number: i32,
    pub backend: String,
    pub weights: ScoringWeights,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub likes: i64,
    pub dislikes: i64,
    #[serde(rename = "superLikes")]
    pub super_likes: i64,
    #[serde(rename = "totalPredictions")]
    pub total_predictions: i64,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Aggregate feedback counters of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionCounters {
    pub likes: i64,
    pub dislikes: i64,
    pub super_likes: i64,
    pub total_predictions: i64,
}

impl VersionCounters {
    /// Apply a feedback transition to the counters.
    ///
    /// Re-labeling existing feedback must not double-count
    /// `total_predictions`: it only moves on none-to-some and
    /// some-to-none transitions. Underflow is clamped at zero and
    /// logged as anomalous.
    pub fn apply_transition(&mut self, old: Option<FeedbackKind>, new: Option<FeedbackKind>) {
        if let Some(kind) = old {
            let slot = self.slot_mut(kind);
            if *slot == 0 {
                tracing::warn!(
                    "counter underflow reversing {} feedback, clamping at zero",
                    kind.as_str()
                );
            } else {
                *slot -= 1;
            }
        }
        if let Some(kind) = new {
            *self.slot_mut(kind) += 1;
        }
        match (old, new) {
            (None, Some(_)) => self.total_predictions += 1,
            (Some(_), None) => {
                if self.total_predictions == 0 {
                    tracing::warn!("total_predictions underflow removing feedback, clamping at zero");
                } else {
                    self.total_predictions -= 1;
                }
            }
            _ => {}
        }
    }

    fn slot_mut(&mut self, kind: FeedbackKind) -> &mut i64 {
        match kind {
            FeedbackKind::Like => &mut self.likes,
            FeedbackKind::Dislike => &mut self.dislikes,
            FeedbackKind::SuperLike => &mut self.super_likes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_kind_round_trip() {
        for kind in [FeedbackKind::Like, FeedbackKind::Dislike, FeedbackKind::SuperLike] {
            assert_eq!(FeedbackKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FeedbackKind::parse("meh"), None);
    }

    #[test]
    fn test_decision_serde_names() {
        let json = serde_json::to_string(&Decision::SuperLike).unwrap();
        assert_eq!(json, "\"super_like\"");
        assert_eq!(serde_json::to_string(&Decision::NoMatch).unwrap(), "\"no_match\"");
    }

    #[test]
    fn test_counters_first_feedback_increments_total() {
        let mut counters = VersionCounters::default();
        counters.apply_transition(None, Some(FeedbackKind::Like));

        assert_eq!(counters.likes, 1);
        assert_eq!(counters.total_predictions, 1);
    }

    #[test]
    fn test_counters_relabel_does_not_double_count_total() {
        let mut counters = VersionCounters::default();
        counters.apply_transition(None, Some(FeedbackKind::Like));
        counters.apply_transition(Some(FeedbackKind::Like), Some(FeedbackKind::Dislike));

        assert_eq!(counters.likes, 0);
        assert_eq!(counters.dislikes, 1);
        assert_eq!(counters.total_predictions, 1);
    }

    #[test]
    fn test_counters_submit_then_remove_restores_exact_values() {
        let mut counters = VersionCounters {
            likes: 3,
            dislikes: 1,
            super_likes: 2,
            total_predictions: 6,
        };
        let before = counters;

        counters.apply_transition(None, Some(FeedbackKind::SuperLike));
        counters.apply_transition(Some(FeedbackKind::SuperLike), None);

        assert_eq!(counters, before);
    }

    #[test]
    fn test_counters_clamp_at_zero() {
        let mut counters = VersionCounters::default();
        counters.apply_transition(Some(FeedbackKind::Dislike), None);

        assert_eq!(counters.dislikes, 0);
        assert_eq!(counters.total_predictions, 0);
    }
}
