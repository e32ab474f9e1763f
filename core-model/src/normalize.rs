// =====================================================================================
// File: core-model/src/normalize.rs
// Description: Tolerant enum normalization - strict on write, healing on read
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use tracing::warn;

use crate::error::{ModelError, ModelResult};

/// Implemented by every closed enumeration in the model.
///
/// Historical rows encode the same closed sets in many spellings (uppercase,
/// lowercase, spaced, underscored). All of them resolve here; new data is
/// always written back in the canonical form.
pub trait CanonicalEnum: Copy + Sized + 'static {
    const ENUM_NAME: &'static str;

    fn variants() -> &'static [Self];

    /// Canonical uppercase storage form
    fn canonical(&self) -> &'static str;

    /// Safe default used when healing unreadable legacy values
    fn read_default() -> Self;

    /// Legacy spellings that do not reduce to a canonical form by folding
    fn aliases() -> &'static [(&'static str, Self)];
}

/// Fold an arbitrary spelling into the comparison key: uppercase with
/// single underscores for any run of spaces, dashes, or underscores.
fn fold(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut last_sep = true;
    for ch in raw.trim().chars() {
        if ch == ' ' || ch == '-' || ch == '_' {
            if !last_sep {
                key.push('_');
                last_sep = true;
            }
        } else {
            for up in ch.to_uppercase() {
                key.push(up);
            }
            last_sep = false;
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

/// Strict normalization used at write boundaries.
///
/// Accepts the canonical form, any casing, spaced/underscore variants,
/// squashed spellings, and the enum's legacy alias table. Unknown values
/// are a typed error; callers on the write path must not guess.
pub fn normalize<T: CanonicalEnum>(raw: &str) -> ModelResult<T> {
    let key = fold(raw);
    if key.is_empty() {
        return Err(ModelError::unknown_enum(T::ENUM_NAME, raw));
    }
    let squashed = key.replace('_', "");

    for variant in T::variants() {
        let canonical = variant.canonical();
        if key == canonical || squashed == canonical.replace('_', "") {
            return Ok(*variant);
        }
    }

    for (alias, variant) in T::aliases() {
        if key == *alias || squashed == alias.replace('_', "") {
            return Ok(*variant);
        }
    }

    Err(ModelError::unknown_enum(T::ENUM_NAME, raw))
}

/// Lossy normalization used at read boundaries.
///
/// Legacy rows must never fail a read: unknown values coerce to the enum's
/// safe default with a warning so the row can be healed on next write.
pub fn normalize_lossy<T: CanonicalEnum>(raw: &str) -> T {
    match normalize::<T>(raw) {
        Ok(value) => value,
        Err(_) => {
            let fallback = T::read_default();
            warn!(
                enum_name = T::ENUM_NAME,
                value = raw,
                fallback = fallback.canonical(),
                "Unknown enum value in stored data, coercing to default"
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallStatus, EmergencyService, EmergencyType, SeverityLevel};

    #[test]
    fn test_canonical_forms_resolve() {
        assert_eq!(normalize::<EmergencyType>("MEDICAL").unwrap(), EmergencyType::Medical);
        assert_eq!(normalize::<SeverityLevel>("LEVEL_1").unwrap(), SeverityLevel::Level1);
        assert_eq!(
            normalize::<EmergencyService>("FIRE_DEPARTMENT").unwrap(),
            EmergencyService::FireDepartment
        );
        assert_eq!(normalize::<CallStatus>("PENDING").unwrap(), CallStatus::Pending);
    }

    #[test]
    fn test_case_and_separator_variants() {
        assert_eq!(normalize::<EmergencyType>("medical").unwrap(), EmergencyType::Medical);
        assert_eq!(
            normalize::<EmergencyType>("Mental Health").unwrap(),
            EmergencyType::MentalHealth
        );
        assert_eq!(
            normalize::<EmergencyType>("mental_health").unwrap(),
            EmergencyType::MentalHealth
        );
        assert_eq!(
            normalize::<EmergencyType>("MENTALHEALTH").unwrap(),
            EmergencyType::MentalHealth
        );
        assert_eq!(normalize::<SeverityLevel>("Level 1").unwrap(), SeverityLevel::Level1);
        assert_eq!(normalize::<SeverityLevel>("level_2").unwrap(), SeverityLevel::Level2);
        assert_eq!(
            normalize::<EmergencyService>("Fire Department").unwrap(),
            EmergencyService::FireDepartment
        );
        assert_eq!(
            normalize::<CallStatus>("in progress").unwrap(),
            CallStatus::InProgress
        );
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(
            normalize::<EmergencyService>("Multiple Services").unwrap(),
            EmergencyService::MultipleServices
        );
        assert_eq!(
            normalize::<EmergencyService>("MULTIPLE").unwrap(),
            EmergencyService::MultipleServices
        );
        assert_eq!(
            normalize::<EmergencyService>("Crisis Response Team").unwrap(),
            EmergencyService::CrisisResponse
        );
        assert_eq!(normalize::<SeverityLevel>("CRITICAL").unwrap(), SeverityLevel::Level1);
        assert_eq!(normalize::<EmergencyType>("Crime").unwrap(), EmergencyType::Police);
        assert_eq!(
            normalize::<EmergencyType>("NATURAL_DISASTER").unwrap(),
            EmergencyType::Other
        );
    }

    #[test]
    fn test_unknown_value_is_typed_error() {
        let err = normalize::<EmergencyType>("tsunami").unwrap_err();
        assert_eq!(
            err,
            ModelError::unknown_enum("EmergencyType", "tsunami")
        );
        assert!(normalize::<SeverityLevel>("").is_err());
    }

    #[test]
    fn test_lossy_coerces_to_safe_default() {
        assert_eq!(normalize_lossy::<EmergencyType>("tsunami"), EmergencyType::Other);
        assert_eq!(normalize_lossy::<SeverityLevel>("??"), SeverityLevel::Level3);
        assert_eq!(
            normalize_lossy::<EmergencyService>("garbled"),
            EmergencyService::MultipleServices
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for variant in [
            EmergencyType::Medical,
            EmergencyType::Fire,
            EmergencyType::MentalHealth,
        ] {
            let once = normalize::<EmergencyType>(variant.as_str()).unwrap();
            let twice = normalize::<EmergencyType>(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
        // Healing a legacy spelling then re-normalizing is stable too
        let healed = normalize_lossy::<SeverityLevel>("Level 1");
        assert_eq!(normalize_lossy::<SeverityLevel>(healed.as_str()), healed);
    }
}
