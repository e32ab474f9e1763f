// =====================================================================================
// File: core-triage/src/location.rs
// Description: Opportunistic location extraction from call transcripts
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use once_cell::sync::Lazy;
use regex::Regex;

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "at 42 Oak Street", "on Brigade Road"
        r"(?:at|on|near)\s+(\d+\s+[A-Z][a-z]+\s+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd))",
        r"(?:at|on|near)\s+([A-Z][a-z]+\s+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd))",
        r"(\d+\s+[A-Z][a-z]+\s+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd))",
        r"([A-Z][a-z]+\s+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd))",
        // Named districts common in the deployment region
        r"(MG\s+Road|Brigade\s+Road|Commercial\s+Street|Residency\s+Road)",
        r"([A-Z][a-z]+\s+(?:Area|Nagar|Colony))",
        // "on the highway", "at the mall"
        r"(?:at|on)\s+the\s+(highway|freeway|mall|station|bridge|intersection)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("invalid location pattern"))
    .collect()
});

/// Best-effort extraction of a street, road, or area mention.
/// Runs against the original casing; failure silently yields `None`.
pub fn extract_location(transcript: &str) -> Option<String> {
    for pattern in LOCATION_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(transcript) {
            if let Some(matched) = captures.get(1) {
                return Some(matched.as_str().trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_street_addresses() {
        assert_eq!(
            extract_location("There's a fire at 42 Oak Street right now"),
            Some("42 Oak Street".to_string())
        );
        assert_eq!(
            extract_location("Crash on Maple Avenue near the school"),
            Some("Maple Avenue".to_string())
        );
    }

    #[test]
    fn test_named_roads_and_areas() {
        assert_eq!(
            extract_location("Robbery on MG Road just happened"),
            Some("MG Road".to_string())
        );
        assert_eq!(
            extract_location("She collapsed in Indira Nagar yesterday"),
            Some("Indira Nagar".to_string())
        );
    }

    #[test]
    fn test_generic_landmarks() {
        assert_eq!(
            extract_location("Multi-car crash on the highway"),
            Some("highway".to_string())
        );
    }

    #[test]
    fn test_no_location_yields_none() {
        assert_eq!(extract_location("my husband is having chest pain"), None);
        assert_eq!(extract_location(""), None);
    }
}
