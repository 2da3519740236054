//! Waveform analysis: raw samples → six scalar descriptors.
//!
//! ## Algorithm
//!
//! 1. `duration` = sample count / clip rate.
//! 2. `volume` = mean absolute amplitude.
//! 3. `pauses` = count of quiet runs (|s| < 0.01) longer than 300 ms.
//! 4. `pace` = 1 − pauses / (duration / 5 s), clamped to [0, 1].
//! 5. `clarity` = 1 − min(1, Σ|sᵢ − sᵢ₋₁| / n × 10).
//! 6. `complexity` = min(1, Σ|sᵢ − sᵢ₋₁| × duration / 100).
//!
//! The thresholds and scale factors are empirically tuned against recorded
//! practice clips; the feedback rule table in [`feedback`] assumes these
//! exact constants.

pub mod feedback;
pub mod transcript;

use serde::{Deserialize, Serialize};

use crate::clip::AudioClip;

/// Amplitude below which a sample counts as quiet.
const QUIET_AMPLITUDE: f32 = 0.01;
/// Minimum quiet-run length that registers as a pause (seconds).
const MIN_PAUSE_SECS: f32 = 0.3;
/// Reference window for pause density when deriving pace (seconds).
const PACE_WINDOW_SECS: f32 = 5.0;
/// Scale applied to per-sample variation in the clarity formula.
const CLARITY_VARIATION_SCALE: f32 = 10.0;
/// Divisor applied to variation × duration in the complexity formula.
const COMPLEXITY_SCALE: f32 = 100.0;

/// The six scalar summaries derived once per analyzed clip.
///
/// Read-only after construction; the rule engine and the transcriber both
/// consume the same record independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDescriptors {
    /// Mean absolute amplitude in [0, 1]. Zero iff the clip is silent.
    pub volume: f32,
    /// Inverse of scaled sample-to-sample variation. Higher = steadier signal.
    pub clarity: f32,
    /// 1 = no detected pauses relative to duration, 0 = pause-saturated.
    pub pace: f32,
    /// Number of quiet runs at least 300 ms long.
    pub pauses: u32,
    /// Clip length in seconds.
    pub duration: f32,
    /// Variation × duration heuristic in [0, 1]. Not semantically grounded.
    pub complexity: f32,
}

/// Derive the descriptor set for a clip.
///
/// Total over any input. An empty clip yields `duration = 0`, `volume = 0`,
/// `clarity = 1.0` (the zero-variation limit of the formula), `pace = 0`,
/// `pauses = 0`, `complexity = 0`; zero duration likewise pins pace to 0.
pub fn analyze(clip: &AudioClip) -> AudioDescriptors {
    let samples = &clip.samples;
    let n = samples.len();

    if n == 0 {
        return AudioDescriptors {
            volume: 0.0,
            clarity: 1.0,
            pace: 0.0,
            pauses: 0,
            duration: 0.0,
            complexity: 0.0,
        };
    }

    let duration = n as f32 / clip.sample_rate as f32;

    // f64 accumulators: clips run into the millions of samples.
    let mut total_amplitude = 0.0f64;
    for s in samples {
        total_amplitude += s.abs() as f64;
    }
    let volume = (total_amplitude / n as f64) as f32;

    let pauses = count_pauses(samples, clip.sample_rate);

    let pace = if duration > 0.0 {
        (1.0 - pauses as f32 / (duration / PACE_WINDOW_SECS)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut variation = 0.0f64;
    for w in samples.windows(2) {
        variation += (w[1] - w[0]).abs() as f64;
    }
    let variation = variation as f32;

    let clarity = 1.0 - (variation / n as f32 * CLARITY_VARIATION_SCALE).min(1.0);
    let complexity = (variation * duration / COMPLEXITY_SCALE).min(1.0);

    AudioDescriptors {
        volume,
        clarity,
        pace,
        pauses,
        duration,
        complexity,
    }
}

/// Count quiet runs exceeding the 300 ms threshold at the clip's own rate.
///
/// A run still open when the clip ends is counted once it passed the
/// threshold, so a long silent tail registers as a pause.
fn count_pauses(samples: &[f32], sample_rate: u32) -> u32 {
    let min_pause_samples = MIN_PAUSE_SECS * sample_rate as f32;
    let mut pauses = 0u32;
    let mut run_len = 0usize;

    for s in samples {
        if s.abs() < QUIET_AMPLITUDE {
            run_len += 1;
        } else {
            if run_len as f32 > min_pause_samples {
                pauses += 1;
            }
            run_len = 0;
        }
    }
    if run_len as f32 > min_pause_samples {
        pauses += 1;
    }
    pauses
}
