//! End-to-end analysis pipeline tests: bytes in, report out.

use brainwave_core::{
    AnalysisReport, EngineConfig, FeedbackKind, HeuristicTranscriber, PracticeEngine, Severity,
    TranscriberHandle,
};

fn engine() -> PracticeEngine {
    PracticeEngine::new(
        EngineConfig::default(),
        TranscriberHandle::new(HeuristicTranscriber::with_seed(99)),
    )
}

fn raw_f32_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn sine(freq: f32, secs: f32, amplitude: f32) -> Vec<f32> {
    let rate = 44_100u32;
    (0..(secs * rate as f32) as usize)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
        .collect()
}

fn messages(report: &AnalysisReport) -> Vec<&str> {
    report.feedback.iter().map(|i| i.message.as_str()).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_clip_yields_quiet_warning_and_short_transcript() {
    let bytes = raw_f32_bytes(&vec![0.0f32; 44_100]);
    let report = engine().analyze_bytes(&bytes).await.unwrap();

    assert_eq!(report.descriptors.volume, 0.0);
    assert_eq!(report.descriptors.pauses, 1);
    assert!((report.descriptors.duration - 1.0).abs() < 1e-3);

    let msgs = messages(&report);
    assert!(msgs.iter().any(|m| m.contains("volume is low")));
    // Silence is perfectly steady, so the articulation error must not fire.
    assert!(!msgs.iter().any(|m| m.contains("Articulation")));
    assert!(report
        .feedback
        .iter()
        .any(|i| i.severity == Severity::Success && i.kind == FeedbackKind::General));
    assert!(report.feedback.len() >= 3);

    // One second is below the transcription minimum.
    assert!(report.transcript.contains("too short"));
}

#[tokio::test(flavor = "multi_thread")]
async fn voiced_clip_gets_a_synthesized_transcript() {
    // Two tone bursts with a 0.4 s gap: clearly voiced, one pause.
    let mut samples = sine(220.0, 1.2, 0.5);
    samples.extend(std::iter::repeat(0.0).take(17_640));
    samples.extend(sine(220.0, 1.2, 0.5));

    let report = engine()
        .analyze_bytes(&raw_f32_bytes(&samples))
        .await
        .unwrap();

    assert!(report.descriptors.volume > 0.1);
    assert!(report.descriptors.clarity > 0.6);
    assert_eq!(report.descriptors.pauses, 1);

    // Above every diagnostic threshold: the transcript is phrase-pool text.
    assert!(!report.transcript.contains("too short"));
    assert!(!report.transcript.contains("too low"));
    assert!(report.transcript.split_whitespace().count() >= 5);
    assert!(report
        .feedback
        .iter()
        .any(|i| i.severity == Severity::Success));
}

#[tokio::test(flavor = "multi_thread")]
async fn wav_bytes_take_the_riff_decode_path() {
    let samples = sine(220.0, 2.5, 0.5);
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for s in &samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    let report = engine().analyze_bytes(cursor.get_ref()).await.unwrap();
    assert!((report.descriptors.duration - 2.5).abs() < 1e-2);
    assert!(report.descriptors.clarity > 0.6);
    assert!(!report.feedback.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_bytes_surface_a_decode_error() {
    // 5 bytes cannot be split into f32 samples and is not RIFF.
    let err = engine().analyze_bytes(&[1, 2, 3, 4, 5]).await.unwrap_err();
    assert!(matches!(err, brainwave_core::BrainwaveError::ClipDecode(_)));
}
