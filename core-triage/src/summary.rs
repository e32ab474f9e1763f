// =====================================================================================
// File: core-triage/src/summary.rs
// Description: Dispatcher-facing call summaries, capped at 200 characters
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use core_model::{EmergencyType, SeverityLevel};

/// Maximum summary length for dispatcher consoles
pub const MAX_SUMMARY_CHARS: usize = 200;

/// Dispatch directive per severity
fn action_directive(severity: SeverityLevel) -> &'static str {
    match severity {
        SeverityLevel::Level1 => "Immediate dispatch required",
        SeverityLevel::Level2 => "Urgent dispatch required",
        SeverityLevel::Level3 | SeverityLevel::Level4 => "Prompt dispatch required",
    }
}

/// Build the operational summary:
/// `{severity descriptor} {kind} emergency - {top risk tags}; {location}; {directive}`
pub fn generate(
    kind: EmergencyType,
    severity: SeverityLevel,
    risk_indicators: &[String],
    location: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);
    parts.push(format!("{} {} emergency", severity.descriptor(), kind.display_name()));

    if !risk_indicators.is_empty() {
        let tags: Vec<&str> = risk_indicators.iter().take(3).map(String::as_str).collect();
        parts.push(tags.join(", "));
    }
    if let Some(location) = location {
        parts.push(format!("Location: {}", location));
    }
    parts.push(action_directive(severity).to_string());

    truncate(parts.join("; "))
}

/// Truncate at a part boundary where possible, hard-cut otherwise
pub fn truncate(summary: String) -> String {
    if summary.chars().count() <= MAX_SUMMARY_CHARS {
        return summary;
    }

    let mut kept = String::new();
    for part in summary.split("; ") {
        let extra = if kept.is_empty() { part.chars().count() } else { part.chars().count() + 2 };
        if kept.chars().count() + extra > MAX_SUMMARY_CHARS {
            break;
        }
        if !kept.is_empty() {
            kept.push_str("; ");
        }
        kept.push_str(part);
    }

    if kept.is_empty() {
        let cut: String = summary.chars().take(MAX_SUMMARY_CHARS - 3).collect();
        return format!("{}...", cut);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_shape() {
        let summary = generate(
            EmergencyType::Fire,
            SeverityLevel::Level1,
            &["massive fire".to_string(), "trapped".to_string()],
            Some("42 Oak Street"),
        );
        assert!(summary.starts_with("Critical Fire emergency"));
        assert!(summary.contains("massive fire, trapped"));
        assert!(summary.contains("Location: 42 Oak Street"));
        assert!(summary.ends_with("Immediate dispatch required"));
        assert!(summary.chars().count() <= MAX_SUMMARY_CHARS);
    }

    #[test]
    fn test_summary_without_tags_or_location() {
        let summary = generate(EmergencyType::Other, SeverityLevel::Level4, &[], None);
        assert_eq!(summary, "Low-severity Other emergency; Prompt dispatch required");
    }

    #[test]
    fn test_summary_keeps_top_three_tags() {
        let tags: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|t| t.to_string()).collect();
        let summary = generate(EmergencyType::Police, SeverityLevel::Level2, &tags, None);
        assert!(summary.contains("a, b, c"));
        assert!(!summary.contains("c, d"));
    }

    #[test]
    fn test_truncation_never_exceeds_cap() {
        let long_location = "x".repeat(400);
        let summary = generate(
            EmergencyType::Accident,
            SeverityLevel::Level1,
            &["trapped".to_string()],
            Some(&long_location),
        );
        assert!(summary.chars().count() <= MAX_SUMMARY_CHARS);
        // Still leads with the severity and kind
        assert!(summary.starts_with("Critical Accident emergency"));
    }
}
