//! Display fields for an analysis result
//!
//! Pure mapping from [`AnalysisResult`] to what the result card shows. Each
//! confidence is converted on its own with `round(value * 100)`; nothing
//! assumes the buckets add up to 100.

use iris_common::analysis::{AnalysisResult, FramePrediction, Verdict};
use iris_common::ContentType;

/// Fraction in [0, 1] as a whole percentage
pub fn percent(value: f64) -> u32 {
    if value.is_finite() {
        (value.clamp(0.0, 1.0) * 100.0).round() as u32
    } else {
        0
    }
}

/// Per-frame vote over a video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSummary {
    pub total: usize,
    pub real: usize,
}

impl FrameSummary {
    pub fn of(predictions: &[FramePrediction]) -> Option<Self> {
        if predictions.is_empty() {
            return None;
        }
        Some(Self {
            total: predictions.len(),
            real: predictions.iter().filter(|p| p.is_real()).count(),
        })
    }

    pub fn real_fraction(&self) -> f64 {
        self.real as f64 / self.total as f64
    }

    pub fn likely_real(&self) -> bool {
        self.real_fraction() > 0.5
    }

    /// "Likely Real (70.0% real frames)"
    pub fn headline(&self) -> String {
        format!(
            "{} ({:.1}% real frames)",
            if self.likely_real() { "Likely Real" } else { "Likely Fake" },
            self.real_fraction() * 100.0
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub content_type: ContentType,
    pub verdict: Verdict,
    /// `REAL`, `FAKE` or `UNKNOWN`
    pub verdict_label: &'static str,
    /// Larger of the real and fake buckets
    pub dominant_percent: u32,
    /// The other of the two
    pub minor_percent: u32,
    pub real_percent: u32,
    pub fake_percent: u32,
    /// Text only; shown as its own bar
    pub undecided_percent: Option<u32>,
    pub frames: Option<FrameSummary>,
    pub filename: Option<String>,
    /// Text classifier category, e.g. "Fake News"
    pub category: Option<String>,
    pub reason: Option<String>,
}

impl ResultView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let real = result.real_confidence();
        let fake = result.fake_confidence();
        let (dominant, minor) = if real >= fake { (real, fake) } else { (fake, real) };
        let verdict = result.verdict();

        let (undecided, frames, category, reason) = match result {
            AnalysisResult::Image(m) | AnalysisResult::Audio(m) => (None, None, None, m.reason.clone()),
            AnalysisResult::Video(v) => (
                None,
                FrameSummary::of(&v.predictions),
                None,
                v.media.reason.clone(),
            ),
            AnalysisResult::Text(t) => (
                t.undecided_confidence.map(percent),
                None,
                t.label.clone(),
                t.reason.clone(),
            ),
        };

        Self {
            content_type: result.content_type(),
            verdict,
            verdict_label: verdict.label(),
            dominant_percent: percent(dominant),
            minor_percent: percent(minor),
            real_percent: percent(real),
            fake_percent: percent(fake),
            undecided_percent: undecided,
            frames,
            filename: result.filename().map(str::to_string),
            category,
            reason,
        }
    }

    /// "92%"
    pub fn dominant_display(&self) -> String {
        format!("{}%", self.dominant_percent)
    }

    /// Frame vote headline for videos with predictions
    pub fn video_headline(&self) -> Option<String> {
        self.frames.map(|f| f.headline())
    }

    pub fn is_unknown(&self) -> bool {
        self.verdict == Verdict::Unknown
    }
}
