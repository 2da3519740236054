//! # brainwave-core
//!
//! Audio-heuristic feedback engine for language practice: records (or
//! accepts) a spoken clip, summarizes its waveform into six scalar
//! descriptors, runs an ordered rule table over them to produce structured
//! feedback, and synthesizes a placeholder transcript.
//!
//! ```text
//!  microphone ──► AudioCapture ──► ring ──► collector ──► AudioClip
//!                                                             │
//!                                  analysis::analyze ◄────────┘
//!                                        │
//!                          AudioDescriptors (computed once)
//!                            │                      │
//!                   feedback::generate      TranscriberHandle
//!                            │                      │
//!                            └────► AnalysisReport ◄┘
//! ```
//!
//! [`PracticeEngine`] wires the pieces together for hosts; every stage is
//! also usable standalone (decode a WAV with [`AudioClip::decode`], run
//! [`analysis::analyze`] on it directly).
//!
//! Microphone capture is behind the `audio-cpal` feature (on by default);
//! without it the analysis path still works on clips supplied as bytes.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod analysis;
pub mod audio;
pub mod buffering;
pub mod clip;
pub mod engine;
pub mod error;
pub mod events;

pub use analysis::{
    feedback::{FeedbackItem, FeedbackKind, Severity},
    transcript::{HeuristicTranscriber, TranscriberHandle, TranscriptSource},
    AudioDescriptors,
};
pub use audio::device::{list_input_devices, DeviceInfo};
pub use clip::{AudioClip, DEFAULT_SAMPLE_RATE};
pub use engine::{EngineConfig, PracticeEngine};
pub use error::{BrainwaveError, Result};
pub use events::{AnalysisReport, LevelEvent, RecorderStatus, RecorderStatusEvent};
