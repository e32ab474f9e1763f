// =====================================================================================
// File: core-triage/src/response.rs
// Description: Safety response synthesis - spoken guidance, actions, precautions
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use core_model::{EmergencyType, SeverityLevel};

/// Synthesized caller guidance for one (kind, severity) pair.
///
/// `immediate_actions` and `precautions` are ordered; operators rely on the
/// order (evacuate first, then avoid elevators). Treat it as contract.
#[derive(Debug, Clone)]
pub struct SafetyResponse {
    pub spoken: String,
    pub immediate_actions: Vec<String>,
    pub precautions: Vec<String>,
    pub danger_question: String,
    pub escalated_spoken: String,
}

struct ResponseTemplate {
    /// Spoken line for Level 1/2: leads with "Help is coming" and names the service
    urgent_spoken: &'static str,
    /// Spoken line for Level 3/4
    standard_spoken: &'static str,
    immediate_actions: &'static [&'static str],
    precautions: &'static [&'static str],
    danger_question: &'static str,
    escalated_spoken: &'static str,
}

const FIRE: ResponseTemplate = ResponseTemplate {
    urgent_spoken: "Help is coming! The fire department is being dispatched now, so evacuate \
        immediately, do not use elevators, stay low to avoid smoke inhalation, and feel doors \
        before opening them.",
    standard_spoken: "The fire department is being notified, so please leave the area calmly, \
        keep clear of any smoke, and wait at a safe distance for responders.",
    immediate_actions: &[
        "Evacuate the area immediately",
        "Do not use elevators",
        "Close doors behind you",
        "Move to the designated assembly point",
    ],
    precautions: &[
        "Stay low to avoid smoke inhalation",
        "Feel doors before opening them",
        "Use stairs only for evacuation",
        "Help others evacuate if safe to do so",
    ],
    danger_question: "Is the fire spreading or are people trapped?",
    escalated_spoken: "Help is on the way! Priority increased to critical. Stay on the line and \
        we will end the call when help arrives.",
};

const MEDICAL: ResponseTemplate = ResponseTemplate {
    urgent_spoken: "Help is coming! An ambulance is being dispatched now, so check if the person \
        is breathing, keep them comfortable, apply direct pressure to any bleeding, and stay on \
        the line.",
    standard_spoken: "An ambulance is being arranged, so keep the person comfortable, watch their \
        breathing, and have their medical history ready for the crew.",
    immediate_actions: &[
        "Check breathing and pulse",
        "Keep the person comfortable",
        "Clear the airway if needed",
        "Apply direct pressure to bleeding",
    ],
    precautions: &[
        "Do not move the person unless they are in danger",
        "Keep the person warm",
        "Monitor consciousness",
        "Have medical history ready",
    ],
    danger_question: "Is the person unconscious or not breathing?",
    escalated_spoken: "Help is on the way! Priority increased to critical. Stay on the line and \
        we will end the call when help arrives.",
};

const POLICE: ResponseTemplate = ResponseTemplate {
    urgent_spoken: "Help is coming! Police are being dispatched now, so move to a safe location, \
        lock doors immediately, stay away from windows, and silence your phone.",
    standard_spoken: "Police are being notified, so stay somewhere safe, avoid confronting \
        anyone involved, and keep your phone with you until officers arrive.",
    immediate_actions: &[
        "Move to a safe location immediately",
        "Lock doors and windows",
        "Stay away from windows",
        "Silence your phone",
    ],
    precautions: &[
        "Do not confront the suspect",
        "Have an escape route planned",
        "Stay quiet and hidden",
        "Follow dispatcher instructions",
    ],
    danger_question: "Is the suspect still present or armed?",
    escalated_spoken: "Help is on the way! Priority increased to critical. Stay on the line and \
        we will end the call when help arrives.",
};

const ACCIDENT: ResponseTemplate = ResponseTemplate {
    urgent_spoken: "Help is coming! Multiple services are being dispatched now, so move to a safe \
        spot away from traffic, turn on hazard lights, check for injuries, and do not move anyone \
        who is badly hurt.",
    standard_spoken: "Emergency services are being notified, so move away from traffic, switch \
        on your hazard lights, and check whether anyone needs first aid while you wait.",
    immediate_actions: &[
        "Move to a safe location away from traffic",
        "Turn on hazard lights immediately",
        "Check for injuries and provide first aid",
        "Take photos of the scene if safe to do so",
    ],
    precautions: &[
        "Stay away from moving traffic and warn other drivers",
        "Set up warning triangles or flares behind your vehicle",
        "Do not move injured persons unless there is immediate danger",
        "Apply direct pressure to bleeding wounds",
        "Keep injured persons warm with blankets or clothing",
    ],
    danger_question: "Are there serious injuries or people trapped?",
    escalated_spoken: "Help is on the way! Priority increased to critical. Multiple services \
        responding. Stay on the line and follow instructions.",
};

const MENTAL_HEALTH: ResponseTemplate = ResponseTemplate {
    urgent_spoken: "Help is coming! A crisis response team is being dispatched now, so stay on \
        the line with us, move to a safe calm place, and breathe slowly and steadily.",
    standard_spoken: "A crisis counselor is being arranged, so stay on the line with us, find a \
        calm place to sit, and take slow steady breaths while we talk.",
    immediate_actions: &[
        "Stay on the line",
        "Move to a safe, calm location",
        "Remove any potentially harmful items if safe to do so",
        "Breathe slowly and steadily",
    ],
    precautions: &[
        "Keep company with a trusted person if possible",
        "Remove access to harmful items",
        "Stay in a safe environment",
        "Follow crisis counselor guidance",
    ],
    danger_question: "Is there immediate risk of harm?",
    escalated_spoken: "Help is on the way! Priority increased to critical. Stay on the line and \
        we will end the call when help arrives.",
};

const OTHER: ResponseTemplate = ResponseTemplate {
    urgent_spoken: "Help is coming! Emergency services are being dispatched now, so stay calm, \
        keep your phone nearby, and follow the dispatcher's instructions.",
    standard_spoken: "Your report has been logged and responders are being notified, so stay \
        calm, know your location, and keep your phone available.",
    immediate_actions: &[
        "Stay calm",
        "Follow dispatcher instructions",
        "Keep your phone available",
        "Provide clear information",
    ],
    precautions: &[
        "Stay aware of your surroundings",
        "Have emergency numbers ready",
        "Keep a first aid kit accessible",
        "Know your location",
    ],
    danger_question: "Is the situation life-threatening?",
    escalated_spoken: "Help is on the way! Priority increased to critical. Stay on the line and \
        we will end the call when help arrives.",
};

fn template(kind: EmergencyType) -> &'static ResponseTemplate {
    match kind {
        EmergencyType::Fire => &FIRE,
        EmergencyType::Medical => &MEDICAL,
        EmergencyType::Police => &POLICE,
        EmergencyType::Accident => &ACCIDENT,
        EmergencyType::MentalHealth => &MENTAL_HEALTH,
        EmergencyType::Other => &OTHER,
    }
}

/// Synthesize caller guidance. Pure function of (kind, severity); no I/O,
/// no personalization.
pub fn synthesize(kind: EmergencyType, severity: SeverityLevel) -> SafetyResponse {
    let template = template(kind);
    let spoken = if severity.is_urgent() {
        template.urgent_spoken
    } else {
        template.standard_spoken
    };

    SafetyResponse {
        spoken: spoken.to_string(),
        immediate_actions: template
            .immediate_actions
            .iter()
            .map(|action| action.to_string())
            .collect(),
        precautions: template
            .precautions
            .iter()
            .map(|precaution| precaution.to_string())
            .collect(),
        danger_question: template.danger_question.to_string(),
        escalated_spoken: template.escalated_spoken.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [EmergencyType; 6] = [
        EmergencyType::Medical,
        EmergencyType::Fire,
        EmergencyType::Police,
        EmergencyType::Accident,
        EmergencyType::MentalHealth,
        EmergencyType::Other,
    ];

    const ALL_LEVELS: [SeverityLevel; 4] = [
        SeverityLevel::Level1,
        SeverityLevel::Level2,
        SeverityLevel::Level3,
        SeverityLevel::Level4,
    ];

    #[test]
    fn test_every_pair_is_complete() {
        for kind in ALL_KINDS {
            for severity in ALL_LEVELS {
                let response = synthesize(kind, severity);
                assert!(!response.spoken.is_empty(), "{kind:?} {severity:?}");
                assert!(!response.immediate_actions.is_empty(), "{kind:?} {severity:?}");
                assert!(!response.precautions.is_empty(), "{kind:?} {severity:?}");
                assert!(!response.danger_question.is_empty(), "{kind:?} {severity:?}");
                assert!(!response.escalated_spoken.is_empty(), "{kind:?} {severity:?}");
            }
        }
    }

    #[test]
    fn test_urgent_levels_lead_with_help_is_coming() {
        for kind in ALL_KINDS {
            for severity in [SeverityLevel::Level1, SeverityLevel::Level2] {
                let response = synthesize(kind, severity);
                assert!(
                    response.spoken.starts_with("Help is coming"),
                    "{kind:?} {severity:?}: {}",
                    response.spoken
                );
            }
        }
    }

    #[test]
    fn test_urgent_spoken_names_the_service() {
        assert!(synthesize(EmergencyType::Fire, SeverityLevel::Level1)
            .spoken
            .contains("fire department"));
        assert!(synthesize(EmergencyType::Medical, SeverityLevel::Level1)
            .spoken
            .contains("ambulance"));
        assert!(synthesize(EmergencyType::Police, SeverityLevel::Level2)
            .spoken
            .contains("Police"));
        assert!(synthesize(EmergencyType::MentalHealth, SeverityLevel::Level1)
            .spoken
            .contains("crisis response team"));
    }

    #[test]
    fn test_action_order_is_stable() {
        let response = synthesize(EmergencyType::Fire, SeverityLevel::Level1);
        assert_eq!(response.immediate_actions[0], "Evacuate the area immediately");
        assert_eq!(response.immediate_actions[1], "Do not use elevators");

        let medical = synthesize(EmergencyType::Medical, SeverityLevel::Level2);
        assert_eq!(medical.immediate_actions[0], "Check breathing and pulse");
    }

    #[test]
    fn test_danger_questions_are_kind_specific() {
        assert_eq!(
            synthesize(EmergencyType::Fire, SeverityLevel::Level1).danger_question,
            "Is the fire spreading or are people trapped?"
        );
        assert_eq!(
            synthesize(EmergencyType::Medical, SeverityLevel::Level3).danger_question,
            "Is the person unconscious or not breathing?"
        );
    }
}
