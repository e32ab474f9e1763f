// =====================================================================================
// File: core-triage/src/rule.rs
// Description: Deterministic rule-based classification backend
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use core_model::{clamp_score, Classification, EmergencyType, SeverityLevel, SeverityThresholds};
use tracing::debug;

use crate::lexicon::Lexicon;

/// Confidence floor for keyword classification
const MIN_CONFIDENCE: f32 = 0.3;

/// Severity multiplier per emergency type
fn kind_modifier(kind: EmergencyType) -> f32 {
    match kind {
        EmergencyType::Fire => 1.3,
        EmergencyType::Medical => 1.2,
        EmergencyType::Police => 1.1,
        EmergencyType::Accident => 1.1,
        EmergencyType::MentalHealth => 1.0,
        EmergencyType::Other => 0.8,
    }
}

/// Instant deterministic classifier over the keyword lexicon.
///
/// Pure: identical transcripts yield identical outcomes. Never fails; an
/// utterance with no lexicon evidence classifies as OTHER at the
/// confidence floor.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    thresholds: SeverityThresholds,
}

impl RuleClassifier {
    pub fn new(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, transcript: &str) -> Classification {
        let transcript_lower = transcript.to_lowercase();
        let matches = Lexicon::global().find_matches(&transcript_lower);

        // Category evidence per emergency type
        let mut scores: [(EmergencyType, u32); 6] = [
            (EmergencyType::Fire, 0),
            (EmergencyType::Medical, 0),
            (EmergencyType::Police, 0),
            (EmergencyType::Accident, 0),
            (EmergencyType::MentalHealth, 0),
            (EmergencyType::Other, 0),
        ];
        let mut severity_sum: u32 = 0;
        let mut force_critical = false;
        let mut risk_indicators: Vec<String> = Vec::new();

        for phrase_match in &matches {
            let entry = phrase_match.entry;
            for (kind, score) in scores.iter_mut() {
                if *kind == entry.applies_to {
                    *score += entry.category_weight * phrase_match.occurrences;
                }
            }
            severity_sum += entry.severity_weight * phrase_match.occurrences;
            force_critical |= entry.high_severity;

            let tag = entry.risk_tag.unwrap_or(entry.phrase);
            if !risk_indicators.iter().any(|existing| existing == tag) {
                risk_indicators.push(tag.to_string());
            }
        }

        let total: u32 = scores.iter().map(|(_, score)| score).sum();
        if total == 0 {
            debug!("No lexicon evidence, classifying as OTHER");
            return Classification {
                emergency_type: EmergencyType::Other,
                severity_level: SeverityLevel::from_score(0.0, &self.thresholds),
                severity_score: 0.0,
                confidence: MIN_CONFIDENCE,
                risk_indicators: Vec::new(),
                suggested_service: None,
                suggested_priority: None,
                summary: None,
                location: None,
            };
        }

        // Highest score wins; ties break by the fixed kind order
        let mut best = EmergencyType::Other;
        let mut best_score = 0u32;
        for candidate in EmergencyType::tie_break_order() {
            let score = scores
                .iter()
                .find(|(kind, _)| kind == candidate)
                .map(|(_, score)| *score)
                .unwrap_or(0);
            if score > best_score {
                best = *candidate;
                best_score = score;
            }
        }

        let confidence = ((best_score as f32 / total as f32).min(1.0)).max(MIN_CONFIDENCE);

        let mut severity_score = clamp_score(severity_sum as f32 * kind_modifier(best));
        if force_critical {
            severity_score = severity_score.max(80.0);
        }
        let severity_level = SeverityLevel::from_score(severity_score, &self.thresholds);

        debug!(
            kind = best.as_str(),
            score = severity_score,
            confidence,
            matched = matches.len(),
            "Rule classification complete"
        );

        Classification {
            emergency_type: best,
            severity_level,
            severity_score,
            confidence,
            risk_indicators,
            suggested_service: None,
            suggested_priority: None,
            summary: None,
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RuleClassifier {
        RuleClassifier::new(SeverityThresholds::default())
    }

    #[test]
    fn test_fire_critical_scenario() {
        let result = classifier()
            .classify("There's a massive fire in the apartment building! People are trapped.");
        assert_eq!(result.emergency_type, EmergencyType::Fire);
        assert_eq!(result.severity_level, SeverityLevel::Level1);
        assert!(result.severity_score >= 80.0);
        assert!(result.risk_indicators.iter().any(|t| t == "massive fire"));
        assert!(result.risk_indicators.iter().any(|t| t == "trapped"));
    }

    #[test]
    fn test_medical_chest_pain_scenario() {
        let result = classifier().classify("My husband is having severe chest pain and collapsed.");
        assert_eq!(result.emergency_type, EmergencyType::Medical);
        assert!(matches!(
            result.severity_level,
            SeverityLevel::Level1 | SeverityLevel::Level2
        ));
        assert!(result.risk_indicators.iter().any(|t| t == "chest pain"));
    }

    #[test]
    fn test_accident_scenario() {
        let result = classifier().classify("Multi-car crash on the highway, people trapped.");
        assert_eq!(result.emergency_type, EmergencyType::Accident);
        assert!(result.severity_score >= 80.0);
    }

    #[test]
    fn test_no_evidence_yields_other_at_floor() {
        let result = classifier().classify("um hello is anyone there");
        assert_eq!(result.emergency_type, EmergencyType::Other);
        assert_eq!(result.confidence, 0.3);
        assert!(result.risk_indicators.is_empty());
        assert_eq!(result.severity_level, SeverityLevel::Level4);
    }

    #[test]
    fn test_classification_is_pure() {
        let transcript = "Someone broke in and they have a gun, please hurry!";
        let first = classifier().classify(transcript);
        let second = classifier().classify(transcript);
        assert_eq!(first.emergency_type, second.emergency_type);
        assert_eq!(first.severity_score, second.severity_score);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.risk_indicators, second.risk_indicators);
    }

    #[test]
    fn test_high_severity_modifier_forces_critical() {
        let result = classifier().classify("he is not breathing");
        assert!(result.severity_score >= 80.0);
        assert_eq!(result.severity_level, SeverityLevel::Level1);
    }

    #[test]
    fn test_confidence_never_below_floor() {
        let result = classifier().classify("fire and a robbery and a crash all at once");
        assert!(result.confidence >= 0.3);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn test_tie_breaks_prefer_fire_over_police() {
        // "arson" (fire, weight 5) vs "knife" (police, weight 5): equal
        // category evidence resolves by the fixed kind order.
        let result = classifier().classify("arson and a knife were involved");
        assert_eq!(result.emergency_type, EmergencyType::Fire);
    }
}
