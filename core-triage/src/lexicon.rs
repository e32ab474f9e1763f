// =====================================================================================
// File: core-triage/src/lexicon.rs
// Description: Versioned keyword lexicon backing the rule-based classifier
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use core_model::EmergencyType;
use once_cell::sync::Lazy;
use regex::Regex;

/// Lexicon revision; bump when the table changes
pub const LEXICON_VERSION: &str = "2024.2";

/// One phrase rule: category evidence, severity contribution, risk tag.
///
/// Phrases are pre-normalized (lowercase, single spaces). `high_severity`
/// marks indicators that force the severity score to at least 80.
#[derive(Debug, Clone, Copy)]
pub struct LexiconEntry {
    pub phrase: &'static str,
    pub applies_to: EmergencyType,
    pub category_weight: u32,
    pub severity_weight: u32,
    pub risk_tag: Option<&'static str>,
    pub high_severity: bool,
}

const fn entry(
    phrase: &'static str,
    applies_to: EmergencyType,
    category_weight: u32,
    severity_weight: u32,
    risk_tag: Option<&'static str>,
    high_severity: bool,
) -> LexiconEntry {
    LexiconEntry {
        phrase,
        applies_to,
        category_weight,
        severity_weight,
        risk_tag,
        high_severity,
    }
}

#[rustfmt::skip]
const ENTRIES: &[LexiconEntry] = &[
    // Medical
    entry("cardiac arrest",       EmergencyType::Medical, 14, 80, Some("cardiac arrest"),       true),
    entry("not breathing",        EmergencyType::Medical, 14, 80, Some("not breathing"),        true),
    entry("stopped breathing",    EmergencyType::Medical, 16, 80, Some("not breathing"),        true),
    entry("can't breathe",        EmergencyType::Medical, 14, 75, Some("breathing difficulty"), true),
    entry("difficulty breathing", EmergencyType::Medical, 18, 60, Some("breathing difficulty"), false),
    entry("shortness of breath",  EmergencyType::Medical, 18, 55, Some("breathing difficulty"), false),
    entry("heart attack",         EmergencyType::Medical, 14, 65, Some("heart attack"),         false),
    entry("chest pain",           EmergencyType::Medical, 12, 55, Some("chest pain"),           false),
    entry("stroke",               EmergencyType::Medical,  8, 60, Some("stroke"),               false),
    entry("unconscious",          EmergencyType::Medical, 10, 60, Some("unconscious"),          false),
    entry("passed out",           EmergencyType::Medical, 10, 55, Some("unconscious"),          false),
    entry("collapsed",            EmergencyType::Medical,  9, 50, Some("collapsed"),            false),
    entry("bleeding heavily",     EmergencyType::Medical, 16, 50, Some("severe bleeding"),      false),
    entry("severe bleeding",      EmergencyType::Medical, 15, 50, Some("severe bleeding"),      false),
    entry("bleeding",             EmergencyType::Medical,  8, 25, Some("bleeding"),             false),
    entry("overdose",             EmergencyType::Medical,  8, 55, Some("overdose"),             false),
    entry("poison",               EmergencyType::Medical,  6, 45, Some("poisoning"),            false),
    entry("allergic reaction",    EmergencyType::Medical, 16, 45, Some("allergic reaction"),    false),
    entry("seizure",              EmergencyType::Medical,  8, 45, Some("seizure"),              false),
    entry("broken bone",          EmergencyType::Medical, 12, 35, Some("fracture"),             false),
    entry("fracture",             EmergencyType::Medical,  8, 35, Some("fracture"),             false),
    entry("head injury",          EmergencyType::Medical, 11, 45, Some("head injury"),          false),
    entry("burn",                 EmergencyType::Medical,  5, 30, Some("burn"),                 false),
    entry("wound",                EmergencyType::Medical,  5, 25, None,                         false),
    entry("injury",               EmergencyType::Medical,  6, 25, None,                         false),
    entry("injured",              EmergencyType::Medical,  7, 25, None,                         false),
    entry("hurt",                 EmergencyType::Medical,  4, 20, None,                         false),
    entry("pain",                 EmergencyType::Medical,  4, 20, None,                         false),
    entry("ambulance",            EmergencyType::Medical,  9, 20, None,                         false),
    entry("hospital",             EmergencyType::Medical,  8, 15, None,                         false),

    // Fire
    entry("massive fire",         EmergencyType::Fire,    12, 80, Some("massive fire"),         true),
    entry("fire spreading",       EmergencyType::Fire,    14, 80, Some("fire spreading"),       true),
    entry("building on fire",     EmergencyType::Fire,    16, 75, Some("structure fire"),       true),
    entry("house fire",           EmergencyType::Fire,    10, 65, Some("structure fire"),       false),
    entry("explosion",            EmergencyType::Fire,     9, 70, Some("explosion"),            true),
    entry("exploded",             EmergencyType::Fire,     8, 65, Some("explosion"),            false),
    entry("forest fire",          EmergencyType::Fire,    11, 60, Some("wildfire"),             false),
    entry("gas leak",             EmergencyType::Fire,     8, 55, Some("gas leak"),             false),
    entry("electrical fire",      EmergencyType::Fire,    15, 50, Some("electrical fire"),      false),
    entry("caught fire",          EmergencyType::Fire,    11, 45, Some("fire"),                 false),
    entry("on fire",              EmergencyType::Fire,     7, 45, Some("fire"),                 false),
    entry("arson",                EmergencyType::Fire,     5, 45, Some("arson"),                false),
    entry("fire",                 EmergencyType::Fire,     6, 35, Some("fire"),                 false),
    entry("flames",               EmergencyType::Fire,     6, 35, Some("flames"),               false),
    entry("smoke",                EmergencyType::Fire,     5, 30, Some("smoke"),                false),
    entry("burning",              EmergencyType::Fire,     7, 30, None,                         false),

    // Police
    entry("active shooter",       EmergencyType::Police,  14, 80, Some("active shooter"),       true),
    entry("shooting",             EmergencyType::Police,   8, 70, Some("shooting"),             true),
    entry("gunshot",              EmergencyType::Police,   8, 70, Some("gunshot"),              true),
    entry("shot",                 EmergencyType::Police,   4, 65, Some("gunshot"),              false),
    entry("gun",                  EmergencyType::Police,   4, 65, Some("weapon"),               true),
    entry("kidnapping",           EmergencyType::Police,  10, 70, Some("kidnapping"),           true),
    entry("weapon",               EmergencyType::Police,   6, 55, Some("weapon"),               false),
    entry("knife",                EmergencyType::Police,   5, 50, Some("weapon"),               false),
    entry("intruder",             EmergencyType::Police,   8, 55, Some("intruder"),             false),
    entry("domestic violence",    EmergencyType::Police,  17, 55, Some("domestic violence"),    false),
    entry("assault",              EmergencyType::Police,   7, 50, Some("assault"),              false),
    entry("robbery",              EmergencyType::Police,   8, 45, Some("robbery"),              false),
    entry("burglar",              EmergencyType::Police,   7, 45, Some("break-in"),             false),
    entry("break in",             EmergencyType::Police,   8, 45, Some("break-in"),             false),
    entry("attack",               EmergencyType::Police,   6, 45, None,                         false),
    entry("violence",             EmergencyType::Police,   8, 45, None,                         false),
    entry("missing person",       EmergencyType::Police,  14, 45, Some("missing person"),       false),
    entry("stalker",              EmergencyType::Police,   7, 40, Some("stalking"),             false),
    entry("fight",                EmergencyType::Police,   5, 35, None,                         false),
    entry("threat",               EmergencyType::Police,   6, 35, None,                         false),
    entry("theft",                EmergencyType::Police,   5, 30, Some("theft"),                false),
    entry("stolen",               EmergencyType::Police,   6, 30, Some("theft"),                false),
    entry("harassment",           EmergencyType::Police,  10, 30, None,                         false),
    entry("suspicious",           EmergencyType::Police,  10, 25, None,                         false),
    entry("police",               EmergencyType::Police,   6, 15, None,                         false),

    // Accident
    entry("building collapse",    EmergencyType::Accident, 17, 70, Some("building collapse"),   true),
    entry("pileup",               EmergencyType::Accident,  6, 60, Some("pileup"),              false),
    entry("trapped",              EmergencyType::Accident,  7, 55, Some("trapped"),             true),
    entry("car accident",         EmergencyType::Accident, 12, 50, Some("vehicle crash"),       false),
    entry("car crash",            EmergencyType::Accident,  9, 50, Some("vehicle crash"),       false),
    entry("hit and run",          EmergencyType::Accident, 11, 50, Some("hit and run"),         false),
    entry("overturned",           EmergencyType::Accident, 10, 50, Some("overturned vehicle"),  false),
    entry("fall from height",     EmergencyType::Accident, 15, 50, Some("fall"),                false),
    entry("crash",                EmergencyType::Accident,  5, 45, Some("vehicle crash"),       false),
    entry("collision",            EmergencyType::Accident,  9, 45, Some("collision"),           false),
    entry("traffic accident",     EmergencyType::Accident, 16, 45, Some("traffic accident"),    false),
    entry("accident",             EmergencyType::Accident,  8, 40, Some("accident"),            false),
    entry("stuck",                EmergencyType::Accident,  5, 40, None,                        false),
    entry("workplace accident",   EmergencyType::Accident, 18, 40, None,                        false),
    entry("fallen",               EmergencyType::Accident,  6, 25, None,                        false),
    entry("slipped",              EmergencyType::Accident,  7, 20, None,                        false),
    entry("highway",              EmergencyType::Accident,  7, 15, None,                        false),

    // Mental health
    entry("kill myself",          EmergencyType::MentalHealth, 11, 65, Some("suicide risk"),    true),
    entry("suicide",              EmergencyType::MentalHealth,  7, 60, Some("suicide risk"),    true),
    entry("harm myself",          EmergencyType::MentalHealth, 11, 60, Some("self harm"),       true),
    entry("self harm",            EmergencyType::MentalHealth,  9, 50, Some("self harm"),       false),
    entry("panic attack",         EmergencyType::MentalHealth, 12, 35, Some("panic attack"),    false),
    entry("can't cope",           EmergencyType::MentalHealth, 10, 35, None,                    false),
    entry("crisis",               EmergencyType::MentalHealth,  6, 35, None,                    false),
    entry("depressed",            EmergencyType::MentalHealth,  9, 30, Some("depression"),      false),
    entry("depression",           EmergencyType::MentalHealth, 10, 30, Some("depression"),      false),
    entry("breakdown",            EmergencyType::MentalHealth,  9, 30, None,                    false),
    entry("anxiety",              EmergencyType::MentalHealth,  7, 25, None,                    false),
    entry("mental health",        EmergencyType::MentalHealth, 13, 25, None,                    false),
    entry("overwhelmed",          EmergencyType::MentalHealth, 11, 25, None,                    false),

    // Panic indicators carry urgency without naming a category
    entry("emergency",            EmergencyType::Other, 3, 25, None, false),
    entry("help",                 EmergencyType::Other, 2, 20, None, false),
    entry("urgent",               EmergencyType::Other, 2, 20, None, false),
    entry("immediately",          EmergencyType::Other, 2, 20, None, false),
    entry("right away",           EmergencyType::Other, 3, 15, None, false),
    entry("quickly",              EmergencyType::Other, 2, 15, None, false),
];

/// A lexicon phrase found in an utterance
#[derive(Debug, Clone, Copy)]
pub struct PhraseMatch {
    pub entry: &'static LexiconEntry,
    pub occurrences: u32,
}

/// Compiled lexicon. Built once at first use; matching never touches I/O.
pub struct Lexicon {
    matchers: Vec<(&'static LexiconEntry, Regex)>,
}

static GLOBAL: Lazy<Lexicon> = Lazy::new(Lexicon::compile);

impl Lexicon {
    fn compile() -> Self {
        let matchers = ENTRIES
            .iter()
            .map(|entry| {
                let pattern = format!(r"\b{}\b", regex::escape(entry.phrase));
                // Phrases are static and pre-validated; a bad pattern is a
                // programming error caught by the lexicon tests.
                let regex = Regex::new(&pattern).expect("invalid lexicon phrase pattern");
                (entry, regex)
            })
            .collect();
        Self { matchers }
    }

    /// Process-wide shared lexicon
    pub fn global() -> &'static Lexicon {
        &GLOBAL
    }

    pub fn entries(&self) -> impl Iterator<Item = &'static LexiconEntry> + '_ {
        self.matchers.iter().map(|(entry, _)| *entry)
    }

    /// Whole-word, case-insensitive, multi-match with occurrence counting.
    /// The caller passes an already-lowercased transcript.
    pub fn find_matches(&self, transcript_lower: &str) -> Vec<PhraseMatch> {
        self.matchers
            .iter()
            .filter_map(|(entry, regex)| {
                let occurrences = regex.find_iter(transcript_lower).count() as u32;
                (occurrences > 0).then_some(PhraseMatch {
                    entry: *entry,
                    occurrences,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_phrases_compile_and_are_normalized() {
        let lexicon = Lexicon::global();
        assert_eq!(lexicon.entries().count(), ENTRIES.len());
        for entry in lexicon.entries() {
            assert_eq!(entry.phrase, entry.phrase.to_lowercase(), "{}", entry.phrase);
            assert!(!entry.phrase.contains("  "), "{}", entry.phrase);
            assert!(entry.severity_weight <= 80, "{}", entry.phrase);
        }
    }

    #[test]
    fn test_whole_word_matching() {
        let lexicon = Lexicon::global();
        let matches = lexicon.find_matches("the firefly lit up");
        assert!(matches.iter().all(|m| m.entry.phrase != "fire"));

        let matches = lexicon.find_matches("there is a fire downstairs");
        assert!(matches.iter().any(|m| m.entry.phrase == "fire"));
    }

    #[test]
    fn test_occurrence_counting() {
        let lexicon = Lexicon::global();
        let matches = lexicon.find_matches("fire everywhere, fire in the hall");
        let fire = matches.iter().find(|m| m.entry.phrase == "fire").unwrap();
        assert_eq!(fire.occurrences, 2);
    }

    #[test]
    fn test_high_severity_indicators_present() {
        let lexicon = Lexicon::global();
        for phrase in ["not breathing", "fire spreading", "active shooter", "trapped"] {
            let entry = lexicon.entries().find(|e| e.phrase == phrase).unwrap();
            assert!(entry.high_severity, "{}", phrase);
        }
    }
}
