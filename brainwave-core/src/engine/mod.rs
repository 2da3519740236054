//! `PracticeEngine` — top-level recording + analysis controller.
//!
//! ## Lifecycle
//!
//! ```text
//! PracticeEngine::new()
//!     └─► start_recording()   → device open, collector spawned, status = Recording
//!         └─► stop_recording() → running=false, stream dropped, clip returned
//!             └─► analyze(clip) → descriptors computed once,
//!                                 rule engine ∥ transcriber, AnalysisReport
//! ```
//!
//! `start_recording()`/`stop_recording()` are guarded: calling them in the
//! wrong state returns an error rather than panicking.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS, so `AudioCapture` is created
//! *inside* the `spawn_blocking` collector closure and dropped there when
//! the loop exits — the microphone is released deterministically whether or
//! not downstream analysis runs. A sync mpsc channel propagates open-device
//! errors back to the `start_recording()` caller, and a second one hands the
//! finished clip to `stop_recording()`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    analysis::{self, feedback, transcript::TranscriberHandle},
    audio::{resample::RateConverter, AudioCapture},
    buffering::{create_audio_ring, Consumer},
    clip::{AudioClip, DEFAULT_SAMPLE_RATE},
    error::{BrainwaveError, Result},
    events::{AnalysisReport, LevelEvent, RecorderStatus, RecorderStatusEvent},
};

/// Broadcast channel capacity for status and level events.
const BROADCAST_CAP: usize = 256;

/// Samples drained from the ring per collector iteration (20 ms at 48 kHz).
const DRAIN_CHUNK: usize = 960;

/// Collector sleep when the ring is empty (avoids busy-waiting a core).
const SLEEP_EMPTY_MS: u64 = 5;

/// How long `stop_recording` waits for the collector to hand over the clip.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for `PracticeEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sample rate clips are analyzed at (Hz). Captured audio at other
    /// rates is resampled. Default: 44 100.
    pub analysis_sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// The top-level engine handle.
///
/// `PracticeEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<PracticeEngine>` to share between a host and its
/// event-forwarding tasks.
pub struct PracticeEngine {
    config: EngineConfig,
    transcriber: TranscriberHandle,
    /// `true` while capture + collector are active.
    running: Arc<AtomicBool>,
    /// Canonical status (read from host commands).
    status: Arc<Mutex<RecorderStatus>>,
    status_tx: broadcast::Sender<RecorderStatusEvent>,
    level_tx: broadcast::Sender<LevelEvent>,
    /// Receiver for the finished clip, armed while recording.
    clip_rx: Mutex<Option<mpsc::Receiver<AudioClip>>>,
}

impl PracticeEngine {
    /// Create a new engine. Does not touch the microphone until
    /// `start_recording()`.
    pub fn new(config: EngineConfig, transcriber: TranscriberHandle) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (level_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            config,
            transcriber,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(RecorderStatus::Idle)),
            status_tx,
            level_tx,
            clip_rx: Mutex::new(None),
        }
    }

    /// Start capturing a clip from the default input device.
    ///
    /// Blocks until the device is confirmed open (or failed), then returns;
    /// the collector keeps accumulating in a background blocking thread.
    ///
    /// # Errors
    /// - `BrainwaveError::AlreadyRecording` if capture is active.
    /// - `BrainwaveError::NoDefaultInputDevice` / `AudioStream` on device error.
    pub fn start_recording(&self) -> Result<()> {
        self.start_recording_with_device(None)
    }

    /// Start capturing using a preferred input device name.
    pub fn start_recording_with_device(
        &self,
        preferred_input_device: Option<String>,
    ) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(BrainwaveError::AlreadyRecording);
        }

        self.running.store(true, Ordering::SeqCst);
        self.set_status(RecorderStatus::Recording, None);

        let (producer, mut consumer) = create_audio_ring();
        let analysis_rate = self.config.analysis_sample_rate;
        let running = Arc::clone(&self.running);
        let level_tx = self.level_tx.clone();

        // Sync handshakes: device-open result back to this call, finished
        // clip over to stop_recording().
        let (open_tx, open_rx) = mpsc::channel::<Result<u32>>();
        let (clip_tx, clip_rx) = mpsc::channel::<AudioClip>();
        *self.clip_rx.lock() = Some(clip_rx);

        tokio::task::spawn_blocking(move || {
            // Device must open on THIS thread — cpal::Stream is !Send.
            let capture = match AudioCapture::open_with_preference(
                producer,
                Arc::clone(&running),
                preferred_input_device.as_deref(),
            ) {
                Ok(c) => {
                    let _ = open_tx.send(Ok(c.sample_rate));
                    c
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let mut converter =
                match RateConverter::new(capture.sample_rate, analysis_rate, DRAIN_CHUNK) {
                    Ok(rc) => rc,
                    Err(e) => {
                        warn!("failed to create rate converter: {e}");
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

            let mut raw = vec![0f32; DRAIN_CHUNK];
            let mut clip_buf: Vec<f32> = Vec::new();
            let mut level_seq = 0u64;

            while running.load(Ordering::Relaxed) {
                let n = consumer.pop_slice(&mut raw);
                if n == 0 {
                    std::thread::sleep(Duration::from_millis(SLEEP_EMPTY_MS));
                    continue;
                }

                let rms = compute_rms(&raw[..n]);
                let _ = level_tx.send(LevelEvent {
                    seq: level_seq,
                    rms,
                });
                level_seq = level_seq.saturating_add(1);

                let converted = converter.process(&raw[..n]);
                clip_buf.extend_from_slice(&converted);
            }

            // Drain whatever the callback pushed between the last pop and
            // the stop flag, then flush the converter's partial block.
            loop {
                let n = consumer.pop_slice(&mut raw);
                if n == 0 {
                    break;
                }
                clip_buf.extend_from_slice(&converter.process(&raw[..n]));
            }
            clip_buf.extend_from_slice(&converter.flush());

            debug!(samples = clip_buf.len(), "recording collected");
            let _ = clip_tx.send(AudioClip::new(clip_buf, analysis_rate));

            // Stream drops here, releasing the device on this thread.
            drop(capture);
        });

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                info!(capture_rate = rate, "recording started");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                *self.clip_rx.lock() = None;
                self.set_status(RecorderStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                *self.clip_rx.lock() = None;
                self.set_status(RecorderStatus::Error, Some("collector failed to start".into()));
                Err(BrainwaveError::Other(anyhow::anyhow!(
                    "collector task died unexpectedly"
                )))
            }
        }
    }

    /// Stop capturing and hand back the finished clip.
    ///
    /// # Errors
    /// - `BrainwaveError::NotRecording` if capture is not active.
    pub fn stop_recording(&self) -> Result<AudioClip> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(BrainwaveError::NotRecording);
        }

        self.running.store(false, Ordering::SeqCst);
        let rx = self
            .clip_rx
            .lock()
            .take()
            .ok_or(BrainwaveError::NotRecording)?;

        let clip = rx.recv_timeout(STOP_TIMEOUT).map_err(|_| {
            self.set_status(RecorderStatus::Error, Some("collector did not finish".into()));
            BrainwaveError::AudioStream("recording collector did not deliver a clip".into())
        })?;

        self.set_status(RecorderStatus::Stopped, None);
        info!(
            samples = clip.samples.len(),
            secs = clip.duration_secs(),
            "recording stopped"
        );
        Ok(clip)
    }

    /// Analyze an already-decoded clip.
    ///
    /// Descriptors are computed once; the rule engine and the transcriber
    /// then consume the same record on two independent blocking tasks. The
    /// clip's raw f32 size stands in for the original byte length.
    pub async fn analyze(&self, clip: AudioClip) -> Result<AnalysisReport> {
        let byte_len = clip.byte_len();
        self.analyze_with_byte_len(clip, byte_len).await
    }

    /// Decode a raw recorded byte buffer and analyze it.
    ///
    /// # Errors
    /// Returns `BrainwaveError::ClipDecode` when the buffer is empty or
    /// malformed; callers should surface that as a retryable condition.
    pub async fn analyze_bytes(&self, bytes: &[u8]) -> Result<AnalysisReport> {
        let clip = AudioClip::decode(bytes, self.config.analysis_sample_rate)?;
        self.analyze_with_byte_len(clip, bytes.len()).await
    }

    async fn analyze_with_byte_len(
        &self,
        clip: AudioClip,
        byte_len: usize,
    ) -> Result<AnalysisReport> {
        self.set_status(RecorderStatus::Analyzing, None);

        let descriptors = analysis::analyze(&clip);
        debug!(?descriptors, byte_len, "descriptors computed");

        // Both consumers are pure over the descriptor record; run them as
        // independently awaited blocking tasks.
        let feedback_task = tokio::task::spawn_blocking(move || {
            feedback::generate(&descriptors, byte_len)
        });
        let transcriber = self.transcriber.clone();
        let transcript_task = tokio::task::spawn_blocking(move || {
            transcriber.0.lock().transcribe(&descriptors)
        });

        let (feedback, transcript) = tokio::try_join!(feedback_task, transcript_task)
            .map_err(|e| BrainwaveError::Other(anyhow::anyhow!("analysis task panicked: {e}")))?;

        self.set_status(RecorderStatus::Idle, None);
        Ok(AnalysisReport {
            descriptors,
            feedback,
            transcript,
        })
    }

    /// Current recorder status (snapshot).
    pub fn status(&self) -> RecorderStatus {
        *self.status.lock()
    }

    /// Subscribe to recorder status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<RecorderStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to live input level events while recording.
    pub fn subscribe_levels(&self) -> broadcast::Receiver<LevelEvent> {
        self.level_tx.subscribe()
    }

    fn set_status(&self, new_status: RecorderStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(RecorderStatusEvent {
            status: new_status,
            detail,
        });
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
