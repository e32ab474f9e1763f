// =====================================================================================
// File: core-triage/src/routing.rs
// Description: Severity-aware routing rules mapping emergencies to responder services
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use core_model::{clamp_priority, EmergencyService, EmergencyType, SeverityLevel};

/// Base routing table: responder service and base priority per emergency type
fn base_route(kind: EmergencyType) -> (EmergencyService, i32) {
    match kind {
        EmergencyType::Medical => (EmergencyService::Ambulance, 2),
        EmergencyType::Fire => (EmergencyService::FireDepartment, 2),
        EmergencyType::Police => (EmergencyService::Police, 3),
        // MULTIPLE_SERVICES means ambulance plus the kind-primary service
        EmergencyType::Accident => (EmergencyService::MultipleServices, 3),
        EmergencyType::MentalHealth => (EmergencyService::CrisisResponse, 4),
        EmergencyType::Other => (EmergencyService::Police, 5),
    }
}

/// Priority boost per severity level; Level 4 demotes
fn severity_boost(severity: SeverityLevel) -> i32 {
    match severity {
        SeverityLevel::Level1 => 2,
        SeverityLevel::Level2 => 1,
        SeverityLevel::Level3 => 0,
        SeverityLevel::Level4 => -1,
    }
}

/// Route an emergency to a responder service with a priority in [1,10],
/// 1 being most urgent.
pub fn route(kind: EmergencyType, severity: SeverityLevel) -> (EmergencyService, i32) {
    let (service, base_priority) = base_route(kind);
    let mut priority = base_priority - severity_boost(severity);

    // Serious accidents tie up two services; bump them ahead of the queue
    if kind == EmergencyType::Accident && severity.is_urgent() {
        priority -= 1;
    }

    (service, clamp_priority(priority))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_table() {
        assert_eq!(
            route(EmergencyType::Medical, SeverityLevel::Level3),
            (EmergencyService::Ambulance, 2)
        );
        assert_eq!(
            route(EmergencyType::Fire, SeverityLevel::Level3),
            (EmergencyService::FireDepartment, 2)
        );
        assert_eq!(
            route(EmergencyType::Police, SeverityLevel::Level3),
            (EmergencyService::Police, 3)
        );
        assert_eq!(
            route(EmergencyType::MentalHealth, SeverityLevel::Level3),
            (EmergencyService::CrisisResponse, 4)
        );
        assert_eq!(
            route(EmergencyType::Other, SeverityLevel::Level3),
            (EmergencyService::Police, 5)
        );
    }

    #[test]
    fn test_severity_boosts() {
        assert_eq!(route(EmergencyType::Fire, SeverityLevel::Level1).1, 1);
        assert_eq!(route(EmergencyType::Medical, SeverityLevel::Level2).1, 1);
        assert_eq!(route(EmergencyType::Other, SeverityLevel::Level4).1, 6);
    }

    #[test]
    fn test_accident_urgent_extra_boost() {
        assert_eq!(
            route(EmergencyType::Accident, SeverityLevel::Level1),
            (EmergencyService::MultipleServices, 1)
        );
        assert_eq!(
            route(EmergencyType::Accident, SeverityLevel::Level2),
            (EmergencyService::MultipleServices, 1)
        );
        assert_eq!(
            route(EmergencyType::Accident, SeverityLevel::Level3),
            (EmergencyService::MultipleServices, 3)
        );
    }

    #[test]
    fn test_priority_never_leaves_range() {
        for kind in [
            EmergencyType::Medical,
            EmergencyType::Fire,
            EmergencyType::Police,
            EmergencyType::Accident,
            EmergencyType::MentalHealth,
            EmergencyType::Other,
        ] {
            for severity in [
                SeverityLevel::Level1,
                SeverityLevel::Level2,
                SeverityLevel::Level3,
                SeverityLevel::Level4,
            ] {
                let (_, priority) = route(kind, severity);
                assert!((1..=10).contains(&priority), "{kind:?} {severity:?}");
            }
        }
    }
}
