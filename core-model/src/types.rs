// =====================================================================================
// File: core-model/src/types.rs
// Description: Closed enumerations for emergency calls (type, severity, service, status)
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::CanonicalEnum;

/// Classified category of a reported emergency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyType {
    #[serde(rename = "MEDICAL")]
    Medical,
    #[serde(rename = "FIRE")]
    Fire,
    #[serde(rename = "POLICE")]
    Police,
    #[serde(rename = "ACCIDENT")]
    Accident,
    #[serde(rename = "MENTAL_HEALTH")]
    MentalHealth,
    #[serde(rename = "OTHER")]
    Other,
}

impl EmergencyType {
    /// Canonical storage form (uppercase, underscore-separated)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medical => "MEDICAL",
            Self::Fire => "FIRE",
            Self::Police => "POLICE",
            Self::Accident => "ACCIDENT",
            Self::MentalHealth => "MENTAL_HEALTH",
            Self::Other => "OTHER",
        }
    }

    /// Human display form shown to operators
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Medical => "Medical",
            Self::Fire => "Fire",
            Self::Police => "Police",
            Self::Accident => "Accident",
            Self::MentalHealth => "Mental Health",
            Self::Other => "Other",
        }
    }

    /// All variants, in classification tie-break order (highest first)
    pub fn tie_break_order() -> &'static [EmergencyType] {
        &[
            Self::Fire,
            Self::Medical,
            Self::Police,
            Self::Accident,
            Self::MentalHealth,
            Self::Other,
        ]
    }
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl CanonicalEnum for EmergencyType {
    const ENUM_NAME: &'static str = "EmergencyType";

    fn variants() -> &'static [Self] {
        &[
            Self::Medical,
            Self::Fire,
            Self::Police,
            Self::Accident,
            Self::MentalHealth,
            Self::Other,
        ]
    }

    fn canonical(&self) -> &'static str {
        self.as_str()
    }

    fn read_default() -> Self {
        Self::Other
    }

    fn aliases() -> &'static [(&'static str, Self)] {
        &[
            // Legacy rows written by an early operator UI
            ("CRIME", Self::Police),
            // Retired variant still present in historical data
            ("NATURAL_DISASTER", Self::Other),
        ]
    }
}

/// Severity level in ascending urgency: LEVEL_4 (low) to LEVEL_1 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    #[serde(rename = "LEVEL_1")]
    Level1,
    #[serde(rename = "LEVEL_2")]
    Level2,
    #[serde(rename = "LEVEL_3")]
    Level3,
    #[serde(rename = "LEVEL_4")]
    Level4,
}

/// Score thresholds mapping a severity score in [0,100] to a level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub critical: f32,
    pub high: f32,
    pub moderate: f32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 80.0,
            high: 60.0,
            moderate: 40.0,
        }
    }
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level1 => "LEVEL_1",
            Self::Level2 => "LEVEL_2",
            Self::Level3 => "LEVEL_3",
            Self::Level4 => "LEVEL_4",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Level1 => "Level 1",
            Self::Level2 => "Level 2",
            Self::Level3 => "Level 3",
            Self::Level4 => "Level 4",
        }
    }

    /// Dispatcher-facing descriptor used in call summaries
    pub fn descriptor(&self) -> &'static str {
        match self {
            Self::Level1 => "Critical",
            Self::Level2 => "High-severity",
            Self::Level3 => "Moderate",
            Self::Level4 => "Low-severity",
        }
    }

    /// Numeric rank, 1 = most urgent
    pub fn rank(&self) -> u8 {
        match self {
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
            Self::Level4 => 4,
        }
    }

    /// Map a severity score in [0,100] to a level using the given thresholds
    pub fn from_score(score: f32, thresholds: &SeverityThresholds) -> Self {
        if score >= thresholds.critical {
            Self::Level1
        } else if score >= thresholds.high {
            Self::Level2
        } else if score >= thresholds.moderate {
            Self::Level3
        } else {
            Self::Level4
        }
    }

    /// Whether this level is the bucket of the given score
    pub fn is_consistent(&self, score: f32, thresholds: &SeverityThresholds) -> bool {
        *self == Self::from_score(score, thresholds)
    }

    /// True when the level warrants urgent spoken phrasing
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::Level1 | Self::Level2)
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl CanonicalEnum for SeverityLevel {
    const ENUM_NAME: &'static str = "SeverityLevel";

    fn variants() -> &'static [Self] {
        &[Self::Level1, Self::Level2, Self::Level3, Self::Level4]
    }

    fn canonical(&self) -> &'static str {
        self.as_str()
    }

    fn read_default() -> Self {
        Self::Level3
    }

    fn aliases() -> &'static [(&'static str, Self)] {
        &[
            // Descriptive spellings written by the first dashboard build
            ("CRITICAL", Self::Level1),
            ("HIGH", Self::Level2),
            ("MODERATE", Self::Level3),
            ("LOW", Self::Level4),
        ]
    }
}

/// Responder service a triaged call is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyService {
    #[serde(rename = "AMBULANCE")]
    Ambulance,
    #[serde(rename = "FIRE_DEPARTMENT")]
    FireDepartment,
    #[serde(rename = "POLICE")]
    Police,
    #[serde(rename = "CRISIS_RESPONSE")]
    CrisisResponse,
    #[serde(rename = "MULTIPLE_SERVICES")]
    MultipleServices,
}

impl EmergencyService {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ambulance => "AMBULANCE",
            Self::FireDepartment => "FIRE_DEPARTMENT",
            Self::Police => "POLICE",
            Self::CrisisResponse => "CRISIS_RESPONSE",
            Self::MultipleServices => "MULTIPLE_SERVICES",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ambulance => "Ambulance",
            Self::FireDepartment => "Fire Department",
            Self::Police => "Police",
            Self::CrisisResponse => "Crisis Response Team",
            Self::MultipleServices => "Multiple Services",
        }
    }
}

impl fmt::Display for EmergencyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl CanonicalEnum for EmergencyService {
    const ENUM_NAME: &'static str = "EmergencyService";

    fn variants() -> &'static [Self] {
        &[
            Self::Ambulance,
            Self::FireDepartment,
            Self::Police,
            Self::CrisisResponse,
            Self::MultipleServices,
        ]
    }

    fn canonical(&self) -> &'static str {
        self.as_str()
    }

    fn read_default() -> Self {
        Self::MultipleServices
    }

    fn aliases() -> &'static [(&'static str, Self)] {
        &[
            // Short form used before the enum was renamed
            ("MULTIPLE", Self::MultipleServices),
            ("EMERGENCY_SERVICES", Self::MultipleServices),
            ("CRISIS_RESPONSE_TEAM", Self::CrisisResponse),
        ]
    }
}

/// Lifecycle status of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "AWAITING_FOLLOWUP")]
    AwaitingFollowup,
    #[serde(rename = "ESCALATED")]
    Escalated,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "DISPATCHED")]
    Dispatched,
    #[serde(rename = "RESOLVED")]
    Resolved,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "ERROR")]
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::AwaitingFollowup => "AWAITING_FOLLOWUP",
            Self::Escalated => "ESCALATED",
            Self::Completed => "COMPLETED",
            Self::Dispatched => "DISPATCHED",
            Self::Resolved => "RESOLVED",
            Self::Cancelled => "CANCELLED",
            Self::Error => "ERROR",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::AwaitingFollowup => "Awaiting Followup",
            Self::Escalated => "Escalated",
            Self::Completed => "Completed",
            Self::Dispatched => "Dispatched",
            Self::Resolved => "Resolved",
            Self::Cancelled => "Cancelled",
            Self::Error => "Error",
        }
    }

    /// Terminal statuses never transition further
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl CanonicalEnum for CallStatus {
    const ENUM_NAME: &'static str = "CallStatus";

    fn variants() -> &'static [Self] {
        &[
            Self::Pending,
            Self::InProgress,
            Self::AwaitingFollowup,
            Self::Escalated,
            Self::Completed,
            Self::Dispatched,
            Self::Resolved,
            Self::Cancelled,
            Self::Error,
        ]
    }

    fn canonical(&self) -> &'static str {
        self.as_str()
    }

    fn read_default() -> Self {
        Self::Pending
    }

    fn aliases() -> &'static [(&'static str, Self)] {
        &[("AWAITING_RESPONSE", Self::AwaitingFollowup)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bucket_thresholds() {
        let t = SeverityThresholds::default();
        assert_eq!(SeverityLevel::from_score(100.0, &t), SeverityLevel::Level1);
        assert_eq!(SeverityLevel::from_score(80.0, &t), SeverityLevel::Level1);
        assert_eq!(SeverityLevel::from_score(79.9999, &t), SeverityLevel::Level2);
        assert_eq!(SeverityLevel::from_score(60.0, &t), SeverityLevel::Level2);
        assert_eq!(SeverityLevel::from_score(59.9, &t), SeverityLevel::Level3);
        assert_eq!(SeverityLevel::from_score(40.0, &t), SeverityLevel::Level3);
        assert_eq!(SeverityLevel::from_score(39.9, &t), SeverityLevel::Level4);
        assert_eq!(SeverityLevel::from_score(0.0, &t), SeverityLevel::Level4);
    }

    #[test]
    fn test_severity_consistency() {
        let t = SeverityThresholds::default();
        assert!(SeverityLevel::Level1.is_consistent(92.0, &t));
        assert!(!SeverityLevel::Level1.is_consistent(79.0, &t));
        assert!(SeverityLevel::Level4.is_consistent(0.0, &t));
    }

    #[test]
    fn test_canonical_serde_round_trip() {
        let json = serde_json::to_string(&EmergencyType::MentalHealth).unwrap();
        assert_eq!(json, "\"MENTAL_HEALTH\"");
        let back: EmergencyType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EmergencyType::MentalHealth);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(EmergencyService::FireDepartment.to_string(), "Fire Department");
        assert_eq!(SeverityLevel::Level1.to_string(), "Level 1");
        assert_eq!(CallStatus::AwaitingFollowup.as_str(), "AWAITING_FOLLOWUP");
    }
}
