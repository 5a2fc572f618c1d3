use crate::models::{ComponentScores, Decision, ExtractedData, ScoringWeights};

/// Combine component scores into the weighted confidence value, clipped
/// to [0,1].
#[inline]
pub fn weighted_confidence(scores: &ComponentScores, weights: &ScoringWeights) -> f64 {
    let confidence = scores.physical * weights.physical
        + scores.personality * weights.personality
        + scores.interests * weights.interests;
    confidence.clamp(0.0, 1.0)
}

/// Map a confidence value onto the categorical decision.
///
/// A super-like additionally requires clearing the minimum score, so a
/// degenerate configuration with `super_like_score < min_score` resolves
/// scores in `[super_like_score, min_score)` to no-match.
#[inline]
pub fn decide(confidence: f64, min_score: f64, super_like_score: f64) -> Decision {
    if confidence >= super_like_score && confidence >= min_score {
        Decision::SuperLike
    } else if confidence >= min_score {
        Decision::Match
    } else {
        Decision::NoMatch
    }
}

/// Assemble the ordered reason list for a result.
///
/// Component reasons keep physical, personality, interest order. Matches
/// get a leading holistic reason at high confidence; below-threshold
/// results instead lead with the numeric gap.
pub fn compile_reasons(
    confidence: f64,
    decision: Decision,
    threshold: f64,
    component_reasons: Vec<String>,
    extracted: &ExtractedData,
    age_range: (i32, i32),
) -> Vec<String> {
    let mut reasons = component_reasons;

    if let Some(age) = extracted.age {
        let (age_min, age_max) = age_range;
        if age >= age_min && age <= age_max {
            reasons.push(format!(
                "Age {} is within your preferred range ({}-{})",
                age, age_min, age_max
            ));
        } else {
            reasons.push(format!(
                "Age {} is outside your preferred range ({}-{})",
                age, age_min, age_max
            ));
        }
    }

    if decision.is_match() {
        if confidence >= 0.85 {
            reasons.insert(0, "Exceptional match across all criteria".to_string());
        } else if confidence >= 0.70 {
            reasons.insert(0, "Strong overall compatibility".to_string());
        }
    } else {
        reasons.insert(
            0,
            format!(
                "Score {:.1}% below threshold {:.1}%",
                confidence * 100.0,
                threshold * 100.0
            ),
        );
    }

    if reasons.is_empty() {
        reasons.push("Neutral compatibility - no strong signals either way".to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(physical: f64, personality: f64, interests: f64) -> ComponentScores {
        ComponentScores {
            physical,
            personality,
            interests,
        }
    }

    #[test]
    fn test_weighted_confidence() {
        let weights = ScoringWeights {
            physical: 0.6,
            personality: 0.3,
            interests: 0.1,
        };
        let confidence = weighted_confidence(&scores(0.9, 0.5, 0.5), &weights);
        assert!((confidence - 0.74).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_clipped_to_unit_interval() {
        let heavy = ScoringWeights {
            physical: 1.0,
            personality: 1.0,
            interests: 1.0,
        };
        assert_eq!(weighted_confidence(&scores(1.0, 1.0, 1.0), &heavy), 1.0);
        assert_eq!(weighted_confidence(&scores(0.0, 0.0, 0.0), &heavy), 0.0);
    }

    #[test]
    fn test_decision_partition() {
        assert_eq!(decide(0.9, 0.6, 0.85), Decision::SuperLike);
        assert_eq!(decide(0.85, 0.6, 0.85), Decision::SuperLike);
        assert_eq!(decide(0.74, 0.6, 0.85), Decision::Match);
        assert_eq!(decide(0.6, 0.6, 0.85), Decision::Match);
        assert_eq!(decide(0.59, 0.6, 0.85), Decision::NoMatch);
    }

    #[test]
    fn test_degenerate_thresholds_resolve_to_no_match() {
        // super_like_score below min_score: the in-between band is no-match
        assert_eq!(decide(0.5, 0.7, 0.4), Decision::NoMatch);
        assert_eq!(decide(0.4, 0.7, 0.4), Decision::NoMatch);
        // Clearing both thresholds is still a super-like
        assert_eq!(decide(0.8, 0.7, 0.4), Decision::SuperLike);
    }

    #[test]
    fn test_match_leads_with_holistic_reason() {
        let reasons = compile_reasons(
            0.9,
            Decision::SuperLike,
            0.6,
            vec!["component detail".to_string()],
            &ExtractedData::default(),
            (25, 35),
        );
        assert_eq!(reasons[0], "Exceptional match across all criteria");

        let reasons = compile_reasons(
            0.74,
            Decision::Match,
            0.6,
            vec![],
            &ExtractedData::default(),
            (25, 35),
        );
        assert_eq!(reasons[0], "Strong overall compatibility");
    }

    #[test]
    fn test_no_match_leads_with_numeric_gap() {
        let reasons = compile_reasons(
            0.523,
            Decision::NoMatch,
            0.6,
            vec!["component detail".to_string()],
            &ExtractedData::default(),
            (25, 35),
        );
        assert_eq!(reasons[0], "Score 52.3% below threshold 60.0%");
    }

    #[test]
    fn test_age_range_reason() {
        let extracted = ExtractedData {
            name: Some("Emma".to_string()),
            age: Some(27),
            bio: None,
        };
        let reasons = compile_reasons(0.74, Decision::Match, 0.6, vec![], &extracted, (25, 35));
        assert!(reasons.iter().any(|r| r == "Age 27 is within your preferred range (25-35)"));

        let too_old = ExtractedData {
            age: Some(44),
            ..Default::default()
        };
        let reasons = compile_reasons(0.74, Decision::Match, 0.6, vec![], &too_old, (25, 35));
        assert!(reasons.iter().any(|r| r.contains("outside your preferred range")));
    }
}
