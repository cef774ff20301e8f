//! Upload / analyze pipeline tests
//!
//! Tests cover:
//! - Local validation before any request
//! - Result rendering and the follow-up interpretation request
//! - Interpretation fallback and analysis failure
//! - Clearing the selection and switching content type or model
//! - Recovering after a request is dropped before it answers

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::ScriptedBackend;
use iris_client::analyze::{ANALYSIS_CONNECTION_FAILED, INTERPRETATION_FALLBACK, NO_FILE_SELECTED};
use iris_client::{AnalyzePipeline, ClientError, Progress, SessionStore, UploadFile, User};
use iris_common::analysis::{FramePrediction, Verdict, WireAnalysis};
use iris_common::events::{EventBus, IrisEvent};
use iris_common::ContentType;
use serde_json::json;

fn pipeline() -> (Arc<ScriptedBackend>, AnalyzePipeline<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new());
    let pipeline = AnalyzePipeline::new(backend.clone(), EventBus::new(64));
    (backend, pipeline)
}

fn jpeg() -> UploadFile {
    UploadFile::new("test.jpg", Some("image/jpeg"), vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

fn fake_92() -> WireAnalysis {
    WireAnalysis {
        result: Some("fake".to_string()),
        real_confidence: Some(0.08),
        fake_confidence: Some(0.92),
        ..WireAnalysis::default()
    }
}

#[tokio::test]
async fn test_analyze_without_file_sends_nothing() {
    let (backend, mut pipeline) = pipeline();

    assert!(!pipeline.can_submit());
    let err = pipeline.analyze().await.unwrap_err();
    assert_eq!(err, ClientError::Validation(NO_FILE_SELECTED.to_string()));
    assert_eq!(pipeline.error(), Some(NO_FILE_SELECTED));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_jpeg_scenario_renders_and_interprets() {
    let (backend, mut pipeline) = pipeline();
    backend.on_analyze(Ok(fake_92()));
    backend.on_interpret(Ok("The image shows blending artifacts around the jaw.".to_string()));

    pipeline.select_file(jpeg());
    assert!(pipeline.can_submit());
    let view = pipeline.analyze().await.unwrap();

    assert_eq!(view.verdict, Verdict::Fake);
    assert_eq!(view.verdict_label, "FAKE");
    assert_eq!(view.dominant_display(), "92%");
    assert_eq!(view.minor_percent, 8);
    assert_eq!(pipeline.progress(), Progress::Complete);
    assert_eq!(
        pipeline.interpretation(),
        Some("The image shows blending artifacts around the jaw.")
    );
    assert!(!pipeline.interpretation_is_fallback());

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].endpoint, "analyze");
    assert_eq!(calls[0].body["type"], "image");
    assert_eq!(calls[0].body["model"], "dima");
    assert_eq!(calls[0].body["payload"], json!({"file": "test.jpg", "size": 6}));
    assert_eq!(calls[0].body["token"], json!(null));

    // Interpretation strictly after the primary result
    assert_eq!(calls[1].endpoint, "analyze-ai");
    assert_eq!(
        calls[1].body,
        json!({"type": "image", "result": "fake", "confidence": 92.0, "filename": "test.jpg"})
    );
}

#[tokio::test]
async fn test_interpretation_failure_falls_back() {
    let (backend, mut pipeline) = pipeline();
    backend.on_analyze(Ok(fake_92()));
    // Nothing queued for analyze-ai: it fails

    pipeline.select_file(jpeg());
    let view = pipeline.analyze().await.unwrap();

    assert_eq!(view.dominant_percent, 92);
    assert_eq!(pipeline.interpretation(), Some(INTERPRETATION_FALLBACK));
    assert!(pipeline.interpretation_is_fallback());
    assert_eq!(pipeline.progress(), Progress::Complete);
    assert_eq!(pipeline.error(), None);
}

#[tokio::test]
async fn test_analysis_failure_skips_interpretation() {
    let (backend, mut pipeline) = pipeline();
    backend.on_analyze(Err(ClientError::Analysis("Unsupported file format".to_string())));

    pipeline.select_file(jpeg());
    assert!(pipeline.analyze().await.is_err());

    assert_eq!(pipeline.error(), Some("Unsupported file format"));
    assert_eq!(pipeline.progress(), Progress::Failed);
    assert!(pipeline.result().is_none());
    assert!(!pipeline.is_analyzing());
    assert!(backend.calls_to("analyze-ai").is_empty());
}

#[tokio::test]
async fn test_connection_failure_message() {
    let (_backend, mut pipeline) = pipeline();
    pipeline.select_file(jpeg());

    let err = pipeline.analyze().await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(pipeline.error(), Some(ANALYSIS_CONNECTION_FAILED));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_request_does_not_wedge_pipeline() {
    let (backend, mut pipeline) = pipeline();
    backend.stall("analyze");
    pipeline.select_file(jpeg());

    let dropped = tokio::time::timeout(Duration::from_secs(1), pipeline.analyze()).await;
    assert!(dropped.is_err());
    assert!(pipeline.is_analyzing());

    // Choosing a file again enables the analyze button
    pipeline.select_file(jpeg());
    assert!(!pipeline.is_analyzing());
    assert!(pipeline.can_submit());
    assert_eq!(pipeline.progress(), Progress::Idle);

    backend.on_analyze(Ok(fake_92()));
    backend.on_interpret(Ok("Explanation".to_string()));
    let view = pipeline.analyze().await.unwrap();
    assert_eq!(view.verdict, Verdict::Fake);
    assert_eq!(backend.calls_to("analyze").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_analyze_again_after_dropped_request() {
    let (backend, mut pipeline) = pipeline();
    backend.stall("analyze");
    pipeline.select_file(jpeg());
    assert!(tokio::time::timeout(Duration::from_secs(1), pipeline.analyze()).await.is_err());

    backend.on_analyze(Ok(fake_92()));
    backend.on_interpret(Ok("Explanation".to_string()));
    assert!(pipeline.analyze().await.is_ok());
    assert!(!pipeline.is_analyzing());
    assert_eq!(pipeline.progress(), Progress::Complete);

    // Clearing also recovers
    backend.stall("analyze");
    assert!(tokio::time::timeout(Duration::from_secs(1), pipeline.analyze()).await.is_err());
    assert!(pipeline.clear_file_selection());
    assert!(!pipeline.is_analyzing());
}

#[tokio::test]
async fn test_text_requires_every_field() {
    let (backend, mut pipeline) = pipeline();
    pipeline.set_content_type(ContentType::Text);
    assert_eq!(pipeline.model().id, "mosko");

    pipeline.set_text_field("title", "Moon made of cheese");
    pipeline.set_text_field("text", "Scientists confirm.");
    let err = pipeline.analyze().await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Validation("Please fill in all fields: subject, date".to_string())
    );
    assert!(backend.calls().is_empty());

    pipeline.set_text_field("subject", "science");
    pipeline.set_text_field("date", "2024-04-01");
    backend.on_analyze(Ok(WireAnalysis {
        result: Some("fake".to_string()),
        real_confidence: Some(0.1),
        fake_confidence: Some(0.7),
        undecided_confidence: Some(0.2),
        label: Some("Fake News".to_string()),
        ..WireAnalysis::default()
    }));
    backend.on_interpret(Ok("Satire.".to_string()));

    let view = pipeline.analyze().await.unwrap();
    assert_eq!(view.undecided_percent, Some(20));
    assert_eq!(view.category.as_deref(), Some("Fake News"));

    let analyze = &backend.calls_to("analyze")[0];
    assert_eq!(analyze.body["payload"]["subject"], "science");
    // Text has no filename to report
    assert_eq!(backend.calls_to("analyze-ai")[0].body["filename"], json!(null));
}

#[tokio::test]
async fn test_clear_selection_is_idempotent() {
    let (backend, mut pipeline) = pipeline();
    backend.on_analyze(Ok(fake_92()));
    backend.on_interpret(Ok("Explanation".to_string()));

    pipeline.select_file(jpeg());
    pipeline.analyze().await.unwrap();

    assert!(pipeline.clear_file_selection());
    assert!(pipeline.file().is_none());
    assert!(pipeline.result().is_none());
    assert!(pipeline.interpretation().is_none());
    assert_eq!(pipeline.progress(), Progress::Idle);

    assert!(!pipeline.clear_file_selection());
}

#[tokio::test]
async fn test_switching_content_type_resets_selection_and_model() {
    let (_backend, mut pipeline) = pipeline();
    pipeline.select_file(jpeg());

    pipeline.set_content_type(ContentType::Audio);
    assert!(pipeline.file().is_none());
    assert_eq!(pipeline.model().id, "melody");
    assert_eq!(pipeline.models().len(), 1);

    assert!(pipeline.set_model("Melody Audio Model").is_ok());
    assert!(matches!(pipeline.set_model("dima"), Err(ClientError::Validation(_))));
    assert_eq!(pipeline.model().id, "melody");
}

#[tokio::test]
async fn test_session_token_is_attached() {
    let events = EventBus::new(64);
    let session = SessionStore::new(events.clone());
    session.login(
        User {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
        },
        Some("tok-42".to_string()),
    );

    let backend = Arc::new(ScriptedBackend::new());
    backend.on_analyze(Ok(fake_92()));
    backend.on_interpret(Ok("Explanation".to_string()));
    let mut pipeline = AnalyzePipeline::new(backend.clone(), events).with_session(session);

    pipeline.select_file(jpeg());
    pipeline.analyze().await.unwrap();
    assert_eq!(backend.calls_to("analyze")[0].body["token"], "tok-42");
}

#[tokio::test]
async fn test_video_headline_from_frame_votes() {
    let (backend, mut pipeline) = pipeline();
    let predictions = (0..10)
        .map(|frame| FramePrediction {
            frame,
            label: if frame < 7 { "real" } else { "fake" }.to_string(),
        })
        .collect();
    backend.on_analyze(Ok(WireAnalysis {
        result: Some("real".to_string()),
        real_confidence: Some(0.7),
        fake_confidence: Some(0.3),
        filename: Some("clip.mp4".to_string()),
        predictions: Some(predictions),
        ..WireAnalysis::default()
    }));
    backend.on_interpret(Ok("Mostly consistent frames.".to_string()));

    pipeline.set_content_type(ContentType::Video);
    pipeline.select_file(UploadFile::new("upload.mp4", Some("video/mp4"), vec![0; 32]));
    let view = pipeline.analyze().await.unwrap();

    assert_eq!(view.video_headline().as_deref(), Some("Likely Real (70.0% real frames)"));
    // Server-reported filename wins
    assert_eq!(backend.calls_to("analyze-ai")[0].body["filename"], "clip.mp4");
}

#[tokio::test]
async fn test_pipeline_publishes_events() {
    let events = EventBus::new(64);
    let mut rx = events.subscribe();
    let backend = Arc::new(ScriptedBackend::new());
    backend.on_analyze(Ok(fake_92()));
    let mut pipeline = AnalyzePipeline::new(backend, events);

    pipeline.select_file(jpeg());
    pipeline.analyze().await.unwrap();

    let mut completed = None;
    let mut fallback = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            IrisEvent::AnalysisCompleted {
                verdict,
                confidence_percent,
                ..
            } => completed = Some((verdict, confidence_percent)),
            IrisEvent::InterpretationReady { fallback: f, .. } => fallback = Some(f),
            _ => {}
        }
    }
    assert_eq!(completed, Some((Verdict::Fake, 92)));
    assert_eq!(fallback, Some(true));
}
