//! Feedback rule engine: descriptor set → list of feedback items.
//!
//! Rules are evaluated in a fixed order and are independent except for the
//! fast/slow pace pair, which is a single if/else-if chain. Every rule whose
//! condition holds appends its item; a success item is always appended, and
//! a generic backstop fills the list up to three items so callers always get
//! a minimally useful result. Output order is insertion order — display
//! sorting by `(severity, type)` is a consumer concern built on
//! [`Severity::display_rank`] and [`FeedbackKind::display_rank`].

use serde::{Deserialize, Serialize};

use super::AudioDescriptors;

/// Volume below this fires the "voice too quiet" warning.
const LOW_VOLUME: f32 = 0.05;
/// Clarity below this fires the articulation error.
const LOW_CLARITY: f32 = 0.6;
/// Pace above this is "too fast"; below [`SLOW_PACE`] is "too slow".
const FAST_PACE: f32 = 0.8;
const SLOW_PACE: f32 = 0.3;
/// Complexity below this together with a large enough clip suggests
/// overly simple sentence structure.
const LOW_COMPLEXITY: f32 = 0.3;
/// Clip byte size gate for the sentence-structure rule.
const STRUCTURE_MIN_BYTES: usize = 10_000;
/// Fewer pauses than this over a long clip reads as unstructured speech.
const FEW_PAUSES: u32 = 2;
const LONG_CLIP_SECS: f32 = 10.0;
/// Minimum number of items callers can rely on.
const MIN_ITEMS: usize = 3;

/// Which skill a feedback item addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Pronunciation,
    Grammar,
    General,
}

impl FeedbackKind {
    /// Display ordinal: pronunciation < grammar < general.
    pub fn display_rank(self) -> u8 {
        match self {
            FeedbackKind::Pronunciation => 0,
            FeedbackKind::Grammar => 1,
            FeedbackKind::General => 2,
        }
    }
}

/// Ordinal urgency of a feedback item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl Severity {
    /// Display ordinal: error < warning < info < success.
    pub fn display_rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
            Severity::Success => 3,
        }
    }
}

/// One piece of feedback produced for an analyzed clip.
///
/// Created fresh per analysis call and never mutated afterwards. `id` is
/// unique per item but not stable across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
    /// Optional drill text for targeted practice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercises: Option<String>,
    /// Position in the clip this item refers to, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

fn new_item_id() -> String {
    format!("fb-{:08x}", rand::random::<u32>())
}

fn at_fraction_ms(duration: f32, divisor: f32) -> Option<u64> {
    Some((duration * 1000.0 / divisor).floor() as u64)
}

/// Map a descriptor set (plus the clip's byte size as a secondary signal)
/// to feedback items. Never returns an empty list.
pub fn generate(d: &AudioDescriptors, clip_byte_len: usize) -> Vec<FeedbackItem> {
    let mut items = Vec::new();

    if d.volume < LOW_VOLUME {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Pronunciation,
            severity: Severity::Warning,
            message: "Voice volume is low".into(),
            suggestion: "Try speaking with more volume and projection. \
                         Practicing diaphragmatic breathing is a good way to give \
                         your voice more power."
                .into(),
            exercises: Some(
                "Breathing drill: inhale for a count of 4, hold for 4, then exhale \
                 slowly for 6 while sustaining a vowel. Repeat 5 times before \
                 practicing."
                    .into(),
            ),
            timestamp: at_fraction_ms(d.duration, 3.0),
        });
    }

    if d.clarity < LOW_CLARITY {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Pronunciation,
            severity: Severity::Error,
            message: "Articulation is unclear".into(),
            suggestion: "Focus on articulating each syllable precisely. Start by \
                         speaking more slowly and exaggerating your mouth movements."
                .into(),
            exercises: Some(
                "Tongue-twister drill: repeat \"She sells seashells by the \
                 seashore\" while gradually increasing speed without losing \
                 clarity."
                    .into(),
            ),
            timestamp: at_fraction_ms(d.duration, 2.0),
        });
    }

    if d.pace > FAST_PACE {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Pronunciation,
            severity: Severity::Warning,
            message: "Speaking pace is too fast".into(),
            suggestion: "Slow down and leave clearer pauses between phrases. That \
                         improves comprehension and gives you time to articulate."
                .into(),
            exercises: Some(
                "Pacing drill: mark every place in a short paragraph where you \
                 should pause, then read it aloud honoring those marks while \
                 recording yourself."
                    .into(),
            ),
            timestamp: at_fraction_ms(d.duration, 4.0),
        });
    } else if d.pace < SLOW_PACE {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Pronunciation,
            severity: Severity::Info,
            message: "Speaking pace is too slow".into(),
            suggestion: "Try to speak a little more fluidly. Pauses matter, but too \
                         many make your speech sound choppy."
                .into(),
            exercises: Some(
                "Fluency drill: read aloud for 5 minutes a day, record yourself, \
                 and listen back for places where the rhythm can improve."
                    .into(),
            ),
            timestamp: at_fraction_ms(d.duration, 5.0),
        });
    }

    if d.complexity < LOW_COMPLEXITY && clip_byte_len > STRUCTURE_MIN_BYTES {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Grammar,
            severity: Severity::Info,
            message: "Sentence structure is simple".into(),
            suggestion: "Work more complex structures into your speech, such as \
                         subordinate clauses or conditionals."
                .into(),
            exercises: Some(
                "Drill: practice completing these openers: \"If I had studied \
                 more...\", \"Although I was tired...\", \"After finishing the \
                 work...\""
                    .into(),
            ),
            timestamp: None,
        });
    }

    if d.pauses < FEW_PAUSES && d.duration > LONG_CLIP_SECS {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Grammar,
            severity: Severity::Warning,
            message: "Few natural pauses".into(),
            suggestion: "Build more natural pauses into your speech. Pauses \
                         structure your ideas and give the listener time to process."
                .into(),
            exercises: Some(
                "Drill: mark with \"/\" where you would pause in this text: \
                 \"Learning a language takes steady practice and daily dedication \
                 to reach fluent, natural communication\"."
                    .into(),
            ),
            timestamp: None,
        });
    }

    // Always-present encouragement, last among the rule-driven items.
    items.push(FeedbackItem {
        id: new_item_id(),
        kind: FeedbackKind::General,
        severity: Severity::Success,
        message: "Keep up the regular practice".into(),
        suggestion: "Keep practicing regularly. Consistency is the key to \
                     improving your communication skills."
            .into(),
        exercises: Some(
            "Set a daily routine of 10-15 minutes of reading aloud or conversation \
             in your target language."
                .into(),
        ),
        timestamp: None,
    });

    if items.len() < MIN_ITEMS {
        items.push(FeedbackItem {
            id: new_item_id(),
            kind: FeedbackKind::Pronunciation,
            severity: Severity::Info,
            message: "Practice specific sounds".into(),
            suggestion: "Focus on the sounds that do not exist in your native \
                         language, such as unfamiliar vowels or consonants."
                .into(),
            exercises: Some(
                "Minimal-pair drill: practice the differences between \
                 \"ship/sheep\", \"live/leave\", \"full/fool\" to sharpen both \
                 listening and production."
                    .into(),
            ),
            timestamp: at_fraction_ms(d.duration, 2.0),
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> AudioDescriptors {
        AudioDescriptors {
            volume: 1.0,
            clarity: 1.0,
            pace: 0.5,
            pauses: 5,
            duration: 20.0,
            complexity: 1.0,
        }
    }

    fn messages(items: &[FeedbackItem]) -> Vec<&str> {
        items.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn clean_profile_still_yields_success_and_backstop() {
        let items = generate(&descriptors(), 50_000);
        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .any(|i| i.severity == Severity::Success && i.kind == FeedbackKind::General));
        assert!(items
            .iter()
            .any(|i| i.message == "Practice specific sounds"));
    }

    #[test]
    fn generate_is_idempotent_up_to_ids() {
        let d = AudioDescriptors {
            volume: 0.01,
            clarity: 0.2,
            pace: 0.9,
            pauses: 0,
            duration: 12.0,
            complexity: 0.1,
        };
        let a = generate(&d, 20_000);
        let b = generate(&d, 20_000);
        assert_eq!(messages(&a), messages(&b));
        let contents = |items: &[FeedbackItem]| {
            items
                .iter()
                .map(|i| (i.kind, i.severity, i.suggestion.clone(), i.timestamp))
                .collect::<Vec<_>>()
        };
        assert_eq!(contents(&a), contents(&b));
    }

    #[test]
    fn pace_rules_are_mutually_exclusive() {
        let mut d = descriptors();
        d.pace = 0.9;
        let items = generate(&d, 50_000);
        let fast = items.iter().any(|i| i.message.contains("too fast"));
        let slow = items.iter().any(|i| i.message.contains("too slow"));
        assert!(fast);
        assert!(!slow);
    }

    #[test]
    fn structure_rule_requires_both_signals() {
        let mut d = descriptors();
        d.complexity = 0.1;
        let small = generate(&d, 5_000);
        assert!(!messages(&small).contains(&"Sentence structure is simple"));
        let large = generate(&d, 20_000);
        assert!(messages(&large).contains(&"Sentence structure is simple"));
    }

    #[test]
    fn few_pauses_rule_requires_a_long_clip() {
        let mut d = descriptors();
        d.pauses = 1;
        d.duration = 8.0;
        assert!(!messages(&generate(&d, 50_000)).contains(&"Few natural pauses"));
        d.duration = 12.0;
        assert!(messages(&generate(&d, 50_000)).contains(&"Few natural pauses"));
    }

    #[test]
    fn timestamps_are_fractions_of_the_duration() {
        let mut d = descriptors();
        d.volume = 0.01; // duration/3
        d.clarity = 0.2; // duration/2
        d.duration = 6.0;
        let items = generate(&d, 50_000);
        let by_msg = |m: &str| items.iter().find(|i| i.message.contains(m)).unwrap();
        assert_eq!(by_msg("volume is low").timestamp, Some(2_000));
        assert_eq!(by_msg("Articulation").timestamp, Some(3_000));
    }

    #[test]
    fn item_ids_are_fresh_per_call() {
        let a = generate(&descriptors(), 50_000);
        let b = generate(&descriptors(), 50_000);
        let ids: std::collections::HashSet<_> =
            a.iter().chain(b.iter()).map(|i| i.id.clone()).collect();
        assert_eq!(ids.len(), a.len() + b.len());
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let items = generate(&descriptors(), 50_000);
        let json = serde_json::to_value(&items[0]).expect("serialize feedback item");
        assert_eq!(json["type"], "general");
        assert_eq!(json["severity"], "success");
        assert!(json.get("timestamp").is_none());
    }
}
