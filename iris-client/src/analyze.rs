//! Upload / analyze pipeline
//!
//! One analysis at a time: validate locally, upload, then ask for the
//! narrative interpretation strictly after the primary result has been
//! parsed. A failed interpretation falls back to a fixed text and never
//! fails the analysis itself.
//!
//! `analyze` takes `&mut self`, so a second run cannot overlap the first.
//! A run whose future is dropped leaves `is_analyzing` set until the next
//! `analyze`, `select_file` or `clear_file_selection`.

use std::sync::Arc;

use iris_common::analysis::{AnalysisResult, ModelInfo, TextFields};
use iris_common::api::InterpretRequest;
use iris_common::events::{EventBus, IrisEvent};
use iris_common::{time, ContentType};
use tracing::{debug, info, warn};

use crate::backend::{AnalysisBackend, AnalysisSubmission, SubmissionPayload, UploadFile};
use crate::error::{ClientError, ClientResult};
use crate::render::{percent, ResultView};
use crate::session::SessionStore;

pub const ANALYSIS_CONNECTION_FAILED: &str = "Failed to connect to server";

pub const NO_FILE_SELECTED: &str = "Please select a file to analyze";

/// Shown when the interpretation endpoint is unavailable
pub const INTERPRETATION_FALLBACK: &str =
    "A detailed explanation is not available right now. The detection result above is still valid.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Idle,
    Uploading,
    Interpreting,
    Complete,
    Failed,
}

impl Progress {
    pub fn stage(&self) -> &'static str {
        match self {
            Progress::Idle => "idle",
            Progress::Uploading => "uploading",
            Progress::Interpreting => "interpreting",
            Progress::Complete => "complete",
            Progress::Failed => "failed",
        }
    }

    /// Coarse progress bar position
    pub fn percent(&self) -> u8 {
        match self {
            Progress::Idle | Progress::Failed => 0,
            Progress::Uploading => 40,
            Progress::Interpreting => 80,
            Progress::Complete => 100,
        }
    }
}

pub struct AnalyzePipeline<B> {
    backend: Arc<B>,
    session: Option<SessionStore>,
    events: EventBus,
    content_type: ContentType,
    model: &'static ModelInfo,
    file: Option<UploadFile>,
    text: TextFields,
    analyzing: bool,
    progress: Progress,
    result: Option<AnalysisResult>,
    interpretation: Option<String>,
    interpretation_fallback: bool,
    error: Option<String>,
}

impl<B: AnalysisBackend> AnalyzePipeline<B> {
    pub fn new(backend: Arc<B>, events: EventBus) -> Self {
        let content_type = ContentType::Image;
        Self {
            backend,
            session: None,
            events,
            content_type,
            model: content_type.default_model(),
            file: None,
            text: TextFields::default(),
            analyzing: false,
            progress: Progress::Idle,
            result: None,
            interpretation: None,
            interpretation_fallback: false,
            error: None,
        }
    }

    /// Attach uploads to the logged-in user's history
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Switch content type; the selection is cleared and the model reset
    pub fn set_content_type(&mut self, content_type: ContentType) {
        if content_type == self.content_type {
            return;
        }
        debug!(from = %self.content_type, to = %content_type, "Content type changed");
        self.clear_file_selection();
        self.content_type = content_type;
        self.model = content_type.default_model();
    }

    pub fn model(&self) -> &'static ModelInfo {
        self.model
    }

    pub fn models(&self) -> &'static [ModelInfo] {
        self.content_type.models()
    }

    /// Pick a model offered for the current content type, by id or name
    pub fn set_model(&mut self, key: &str) -> ClientResult<()> {
        self.model = self.content_type.find_model(key).ok_or_else(|| {
            ClientError::Validation(format!(
                "Model {} is not available for {} analysis",
                key, self.content_type
            ))
        })?;
        Ok(())
    }

    /// Pick a file; any previous result is discarded
    pub fn select_file(&mut self, file: UploadFile) {
        debug!(name = %file.name, size = file.size(), "File selected");
        self.file = Some(file);
        self.reset_outcome();
    }

    pub fn file(&self) -> Option<&UploadFile> {
        self.file.as_ref()
    }

    pub fn set_text_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.text.set(name, value.into())
    }

    pub fn text_fields(&self) -> &TextFields {
        &self.text
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    /// Whether the analyze button is enabled
    pub fn can_submit(&self) -> bool {
        !self.analyzing && self.validate().is_ok()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn view(&self) -> Option<ResultView> {
        self.result.as_ref().map(ResultView::from_result)
    }

    pub fn interpretation(&self) -> Option<&str> {
        self.interpretation.as_deref()
    }

    /// The interpretation shown is the fixed fallback text
    pub fn interpretation_is_fallback(&self) -> bool {
        self.interpretation_fallback
    }

    /// Inline error under the upload form
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn validate(&self) -> ClientResult<SubmissionPayload> {
        if self.content_type.requires_file() {
            return self
                .file
                .clone()
                .map(SubmissionPayload::File)
                .ok_or_else(|| ClientError::Validation(NO_FILE_SELECTED.to_string()));
        }
        if !self.text.is_complete() {
            return Err(ClientError::Validation(format!(
                "Please fill in all fields: {}",
                self.text.missing().join(", ")
            )));
        }
        Ok(SubmissionPayload::Text(self.text.clone()))
    }

    fn set_progress(&mut self, progress: Progress) {
        self.progress = progress;
        self.events.emit(IrisEvent::AnalysisProgress {
            content_type: self.content_type,
            stage: progress.stage().to_string(),
        });
    }

    fn reset_outcome(&mut self) {
        self.analyzing = false;
        self.result = None;
        self.interpretation = None;
        self.interpretation_fallback = false;
        self.error = None;
        self.progress = Progress::Idle;
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        let message = match &err {
            ClientError::Network(_) => ANALYSIS_CONNECTION_FAILED.to_string(),
            ClientError::Analysis(m) | ClientError::Validation(m) => m.clone(),
            other => other.to_string(),
        };
        self.events.emit(IrisEvent::AnalysisFailed {
            content_type: self.content_type,
            message: message.clone(),
            timestamp: time::now(),
        });
        self.error = Some(message);
        err
    }

    /// Run one analysis and its interpretation
    pub async fn analyze(&mut self) -> ClientResult<ResultView> {
        if self.analyzing {
            // Only seen when a previous call was dropped mid-request
            debug!(content_type = %self.content_type, "Abandoned analysis superseded");
        }
        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(err) => return Err(self.fail(err)),
        };

        self.reset_outcome();
        self.analyzing = true;
        self.set_progress(Progress::Uploading);

        let submission = AnalysisSubmission {
            content_type: self.content_type,
            model: self.model.id.to_string(),
            payload,
            token: self.session.as_ref().and_then(SessionStore::token),
        };
        info!(content_type = %self.content_type, model = self.model.id, "Submitting analysis");

        let wire = match self.backend.analyze(&submission).await {
            Ok(wire) => wire,
            Err(err) => {
                warn!(content_type = %self.content_type, "Analysis failed: {}", err);
                self.analyzing = false;
                self.set_progress(Progress::Failed);
                return Err(self.fail(err));
            }
        };

        let result = AnalysisResult::from_wire(self.content_type, wire);
        let confidence_percent = percent(result.verdict_confidence());
        self.events.emit(IrisEvent::AnalysisCompleted {
            content_type: self.content_type,
            verdict: result.verdict(),
            confidence_percent,
            timestamp: time::now(),
        });

        let filename = result.filename().map(str::to_string).or_else(|| match &submission.payload {
            SubmissionPayload::File(file) => Some(file.name.clone()),
            SubmissionPayload::Text(_) => None,
        });
        let request = InterpretRequest {
            content_type: self.content_type,
            result: result.verdict().as_str().to_string(),
            confidence: f64::from(confidence_percent),
            filename,
        };
        let view = ResultView::from_result(&result);
        self.result = Some(result);
        self.set_progress(Progress::Interpreting);

        let (text, fallback) = match self.backend.interpret(&request).await {
            Ok(text) => (text, false),
            Err(err) => {
                warn!(content_type = %self.content_type, "Interpretation unavailable: {}", err);
                (INTERPRETATION_FALLBACK.to_string(), true)
            }
        };
        self.interpretation = Some(text);
        self.interpretation_fallback = fallback;
        self.events.emit(IrisEvent::InterpretationReady {
            content_type: self.content_type,
            fallback,
        });

        self.analyzing = false;
        self.set_progress(Progress::Complete);
        Ok(view)
    }

    /// Forget the file, text fields, result and interpretation together.
    /// Returns whether anything was cleared.
    pub fn clear_file_selection(&mut self) -> bool {
        let had_state = self.file.is_some()
            || !self.text.is_empty()
            || self.result.is_some()
            || self.interpretation.is_some()
            || self.error.is_some();
        self.file = None;
        self.text = TextFields::default();
        self.reset_outcome();
        had_state
    }
}
