//! Event and report types emitted to host frontends.
//!
//! Everything here derives `serde::Serialize` + `serde::Deserialize`
//! (camelCase fields, lowercase enums) so hosts can forward the values to a
//! UI layer unchanged.

use serde::{Deserialize, Serialize};

use crate::analysis::{feedback::FeedbackItem, AudioDescriptors};

/// Combined result of analyzing one recorded clip.
///
/// `feedback` is in rule-insertion order; hosts re-sort for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// The descriptor set both consumers were fed.
    pub descriptors: AudioDescriptors,
    /// Rule-engine output; never empty.
    pub feedback: Vec<FeedbackItem>,
    /// Synthesized placeholder transcript.
    pub transcript: String,
}

/// Emitted for each collected audio chunk while recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Root-mean-square level of the chunk in [0.0, 1.0].
    pub rms: f32,
}

/// Emitted when the recorder state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatusEvent {
    pub status: RecorderStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the practice engine's recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    /// Engine created; no capture in progress.
    Idle,
    /// Actively capturing audio into the clip buffer.
    Recording,
    /// A finished clip is being analyzed.
    Analyzing,
    /// Capture stopped; the clip was handed to the caller.
    Stopped,
    /// Capture failed — the device must be reopened.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::feedback::{FeedbackKind, Severity};

    #[test]
    fn report_serializes_with_camel_case_and_lowercase_enums() {
        let report = AnalysisReport {
            descriptors: AudioDescriptors {
                volume: 0.4,
                clarity: 0.9,
                pace: 0.5,
                pauses: 2,
                duration: 6.5,
                complexity: 0.3,
            },
            feedback: vec![FeedbackItem {
                id: "fb-1".into(),
                kind: FeedbackKind::Pronunciation,
                severity: Severity::Warning,
                message: "Voice volume is low".into(),
                suggestion: "Speak up.".into(),
                exercises: None,
                timestamp: Some(2_166),
            }],
            transcript: "hello".into(),
        };

        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["descriptors"]["pauses"], 2);
        assert_eq!(json["feedback"][0]["type"], "pronunciation");
        assert_eq!(json["feedback"][0]["severity"], "warning");
        assert_eq!(json["feedback"][0]["timestamp"], 2_166);
        assert_eq!(json["transcript"], "hello");

        let round_trip: AnalysisReport =
            serde_json::from_value(json).expect("deserialize report");
        assert_eq!(round_trip.feedback.len(), 1);
        assert_eq!(round_trip.feedback[0].severity, Severity::Warning);
    }

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = RecorderStatusEvent {
            status: RecorderStatus::Recording,
            detail: None,
        };
        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "recording");

        let round_trip: RecorderStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, RecorderStatus::Recording);
    }

    #[test]
    fn status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<RecorderStatus>(r#""Recording""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }

    #[test]
    fn level_event_round_trips() {
        let event = LevelEvent { seq: 9, rms: 0.12 };
        let json = serde_json::to_value(&event).expect("serialize level event");
        assert_eq!(json["seq"], 9);
        let rms = json["rms"].as_f64().expect("rms should be a number");
        assert!((rms - 0.12).abs() < 1e-5);
    }
}
