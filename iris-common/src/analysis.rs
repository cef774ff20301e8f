//! Content types, verdicts and analysis results
//!
//! The ML services answer with one flat JSON object whose fields vary by
//! content type (image/audio carry two confidences, text adds an undecided
//! bucket, video adds per-frame predictions). [`WireAnalysis`] is that flat
//! shape; [`AnalysisResult`] is the tagged union the rest of the code works
//! with, so no caller has to guess which fields are present.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Media category selected for analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Audio,
    Video,
    Text,
}

/// A detection model offered for a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Identifier sent as the `model` form field
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
}

const IMAGE_MODELS: &[ModelInfo] = &[ModelInfo {
    id: "dima",
    name: "Dima Image Model",
}];

const AUDIO_MODELS: &[ModelInfo] = &[ModelInfo {
    id: "melody",
    name: "Melody Audio Model",
}];

const VIDEO_MODELS: &[ModelInfo] = &[ModelInfo {
    id: "asl",
    name: "ASL Video Model",
}];

const TEXT_MODELS: &[ModelInfo] = &[ModelInfo {
    id: "mosko",
    name: "Mosko News Model",
}];

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Image,
        ContentType::Audio,
        ContentType::Video,
        ContentType::Text,
    ];

    /// Wire value (`type` form field)
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Audio => "audio",
            ContentType::Video => "video",
            ContentType::Text => "text",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Image => "Image",
            ContentType::Audio => "Audio",
            ContentType::Video => "Video",
            ContentType::Text => "Text",
        }
    }

    /// Whether the upload needs a file (text is submitted as form fields)
    pub fn requires_file(&self) -> bool {
        !matches!(self, ContentType::Text)
    }

    /// MIME filter offered to the file picker
    pub fn accept(&self) -> &'static str {
        match self {
            ContentType::Image => "image/*",
            ContentType::Audio => "audio/*",
            ContentType::Video => "video/*",
            ContentType::Text => "text/plain",
        }
    }

    /// Models available for this content type, default first
    pub fn models(&self) -> &'static [ModelInfo] {
        match self {
            ContentType::Image => IMAGE_MODELS,
            ContentType::Audio => AUDIO_MODELS,
            ContentType::Video => VIDEO_MODELS,
            ContentType::Text => TEXT_MODELS,
        }
    }

    pub fn default_model(&self) -> &'static ModelInfo {
        &self.models()[0]
    }

    /// Look up a model by id or display name
    pub fn find_model(&self, key: &str) -> Option<&'static ModelInfo> {
        let key = key.trim();
        self.models()
            .iter()
            .find(|m| m.id.eq_ignore_ascii_case(key) || m.name.eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ContentType::Image),
            "audio" => Ok(ContentType::Audio),
            "video" => Ok(ContentType::Video),
            "text" => Ok(ContentType::Text),
            other => Err(Error::InvalidInput(format!("Unsupported content type: {}", other))),
        }
    }
}

/// Classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Real,
    Fake,
    Unknown,
}

impl Verdict {
    /// Parse a classifier label; anything unrecognised is `Unknown`
    pub fn parse(label: &str) -> Verdict {
        match label.trim().to_ascii_lowercase().as_str() {
            "real" => Verdict::Real,
            "fake" => Verdict::Fake,
            _ => Verdict::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Real => "real",
            Verdict::Fake => "fake",
            Verdict::Unknown => "unknown",
        }
    }

    /// Upper-case label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Real => "REAL",
            Verdict::Fake => "FAKE",
            Verdict::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame label reported by the video classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePrediction {
    pub frame: u32,
    pub label: String,
}

impl FramePrediction {
    pub fn is_real(&self) -> bool {
        Verdict::parse(&self.label) == Verdict::Real
    }
}

/// News article submitted for text analysis instead of a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFields {
    pub title: String,
    pub text: String,
    pub subject: String,
    pub date: String,
}

impl TextFields {
    /// Form field names, in submission order
    pub const FIELD_NAMES: [&'static str; 4] = ["title", "text", "subject", "date"];

    /// All four fields carry non-blank text
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Names of the blank fields
    pub fn missing(&self) -> Vec<&'static str> {
        Self::FIELD_NAMES
            .iter()
            .zip(self.values())
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Field values in the same order as [`TextFields::FIELD_NAMES`]
    pub fn values(&self) -> [&str; 4] {
        [&self.title, &self.text, &self.subject, &self.date]
    }

    /// Set a field by form name; unknown names are ignored
    pub fn set(&mut self, name: &str, value: String) -> bool {
        match name {
            "title" => self.title = value,
            "text" => self.text = value,
            "subject" => self.subject = value,
            "date" => self.date = value,
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(|v| v.is_empty())
    }
}

/// Flat JSON body returned by `POST /api/analyze`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undecided_confidence: Option<f64>,
    /// Some services also echo the winning confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<FramePrediction>>,
    /// Text classifier category, e.g. "Fake News"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Image and audio result (also the common part of video)
#[derive(Debug, Clone, PartialEq)]
pub struct MediaVerdict {
    pub verdict: Verdict,
    pub real_confidence: f64,
    pub fake_confidence: f64,
    pub filename: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoVerdict {
    pub media: MediaVerdict,
    pub predictions: Vec<FramePrediction>,
}

/// Text result; the undecided bucket is independent of the other two
#[derive(Debug, Clone, PartialEq)]
pub struct TextVerdict {
    pub verdict: Verdict,
    pub real_confidence: f64,
    pub fake_confidence: f64,
    pub undecided_confidence: Option<f64>,
    pub label: Option<String>,
    pub title: Option<String>,
    pub reason: Option<String>,
}

/// Analysis result keyed by content type
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Image(MediaVerdict),
    Audio(MediaVerdict),
    Video(VideoVerdict),
    Text(TextVerdict),
}

/// Confidences are fractions; non-finite values count as 0
fn fraction(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

impl AnalysisResult {
    /// Interpret a flat service response for the content type that was requested
    pub fn from_wire(content_type: ContentType, wire: WireAnalysis) -> Self {
        let verdict = wire
            .result
            .as_deref()
            .map(Verdict::parse)
            .unwrap_or(Verdict::Unknown);
        let media = MediaVerdict {
            verdict,
            real_confidence: fraction(wire.real_confidence),
            fake_confidence: fraction(wire.fake_confidence),
            filename: wire.filename,
            reason: wire.reason,
        };

        match content_type {
            ContentType::Image => AnalysisResult::Image(media),
            ContentType::Audio => AnalysisResult::Audio(media),
            ContentType::Video => AnalysisResult::Video(VideoVerdict {
                media,
                predictions: wire.predictions.unwrap_or_default(),
            }),
            ContentType::Text => AnalysisResult::Text(TextVerdict {
                verdict: media.verdict,
                real_confidence: media.real_confidence,
                fake_confidence: media.fake_confidence,
                undecided_confidence: wire.undecided_confidence.map(|v| fraction(Some(v))),
                label: wire.label,
                title: wire.title,
                reason: media.reason,
            }),
        }
    }

    /// Flatten back into the wire shape
    pub fn to_wire(&self) -> WireAnalysis {
        let verdict = self.verdict();
        let mut wire = WireAnalysis {
            result: (verdict != Verdict::Unknown).then(|| verdict.as_str().to_string()),
            real_confidence: Some(self.real_confidence()),
            fake_confidence: Some(self.fake_confidence()),
            ..WireAnalysis::default()
        };

        match self {
            AnalysisResult::Image(m) | AnalysisResult::Audio(m) => {
                wire.filename = m.filename.clone();
                wire.reason = m.reason.clone();
            }
            AnalysisResult::Video(v) => {
                wire.filename = v.media.filename.clone();
                wire.reason = v.media.reason.clone();
                wire.predictions = Some(v.predictions.clone());
            }
            AnalysisResult::Text(t) => {
                wire.undecided_confidence = t.undecided_confidence;
                wire.label = t.label.clone();
                wire.title = t.title.clone();
                wire.reason = t.reason.clone();
            }
        }
        wire
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            AnalysisResult::Image(_) => ContentType::Image,
            AnalysisResult::Audio(_) => ContentType::Audio,
            AnalysisResult::Video(_) => ContentType::Video,
            AnalysisResult::Text(_) => ContentType::Text,
        }
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            AnalysisResult::Image(m) | AnalysisResult::Audio(m) => m.verdict,
            AnalysisResult::Video(v) => v.media.verdict,
            AnalysisResult::Text(t) => t.verdict,
        }
    }

    pub fn real_confidence(&self) -> f64 {
        match self {
            AnalysisResult::Image(m) | AnalysisResult::Audio(m) => m.real_confidence,
            AnalysisResult::Video(v) => v.media.real_confidence,
            AnalysisResult::Text(t) => t.real_confidence,
        }
    }

    pub fn fake_confidence(&self) -> f64 {
        match self {
            AnalysisResult::Image(m) | AnalysisResult::Audio(m) => m.fake_confidence,
            AnalysisResult::Video(v) => v.media.fake_confidence,
            AnalysisResult::Text(t) => t.fake_confidence,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            AnalysisResult::Image(m) | AnalysisResult::Audio(m) => m.filename.as_deref(),
            AnalysisResult::Video(v) => v.media.filename.as_deref(),
            AnalysisResult::Text(_) => None,
        }
    }

    /// Confidence attached to the verdict: the real bucket for a real
    /// verdict, the fake bucket otherwise
    pub fn verdict_confidence(&self) -> f64 {
        if self.verdict() == Verdict::Real {
            self.real_confidence()
        } else {
            self.fake_confidence()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(result: &str, real: f64, fake: f64) -> WireAnalysis {
        WireAnalysis {
            result: Some(result.to_string()),
            real_confidence: Some(real),
            fake_confidence: Some(fake),
            ..WireAnalysis::default()
        }
    }

    #[test]
    fn test_content_type_parse_is_case_insensitive() {
        assert_eq!("Image".parse::<ContentType>().unwrap(), ContentType::Image);
        assert_eq!(" VIDEO ".parse::<ContentType>().unwrap(), ContentType::Video);
        assert!("pdf".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_model_catalog_defaults() {
        assert_eq!(ContentType::Image.default_model().name, "Dima Image Model");
        assert_eq!(ContentType::Audio.default_model().id, "melody");
        assert!(ContentType::Audio.find_model("Melody Audio Model").is_some());
        assert!(ContentType::Image.find_model("melody").is_none());
    }

    #[test]
    fn test_text_fields_report_blank_fields() {
        let mut fields = TextFields::default();
        assert!(fields.is_empty());
        assert_eq!(fields.missing(), vec!["title", "text", "subject", "date"]);

        assert!(fields.set("title", "Headline".to_string()));
        assert!(fields.set("text", "Body".to_string()));
        assert!(fields.set("subject", "  ".to_string()));
        assert!(!fields.set("author", "nobody".to_string()));
        assert_eq!(fields.missing(), vec!["subject", "date"]);
        assert!(!fields.is_complete());

        fields.subject = "politics".to_string();
        fields.date = "2024-05-01".to_string();
        assert!(fields.is_complete());
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!(Verdict::parse("Real"), Verdict::Real);
        assert_eq!(Verdict::parse("FAKE"), Verdict::Fake);
        assert_eq!(Verdict::parse("maybe"), Verdict::Unknown);
    }

    #[test]
    fn test_image_wire_maps_to_media_verdict() {
        let result = AnalysisResult::from_wire(ContentType::Image, wire("fake", 0.08, 0.92));
        assert_eq!(result.content_type(), ContentType::Image);
        assert_eq!(result.verdict(), Verdict::Fake);
        assert_eq!(result.verdict_confidence(), 0.92);
    }

    #[test]
    fn test_missing_result_is_unknown() {
        let w = WireAnalysis {
            real_confidence: Some(0.4),
            fake_confidence: Some(0.6),
            ..WireAnalysis::default()
        };
        let result = AnalysisResult::from_wire(ContentType::Audio, w);
        assert_eq!(result.verdict(), Verdict::Unknown);
        // Unknown verdicts report the fake bucket
        assert_eq!(result.verdict_confidence(), 0.6);
    }

    #[test]
    fn test_text_keeps_undecided_bucket_independent() {
        let mut w = wire("real", 0.5, 0.2);
        w.undecided_confidence = Some(0.3);
        w.label = Some("Real News".to_string());
        let result = AnalysisResult::from_wire(ContentType::Text, w);
        match result {
            AnalysisResult::Text(ref t) => {
                assert_eq!(t.undecided_confidence, Some(0.3));
                assert_eq!(t.label.as_deref(), Some("Real News"));
            }
            other => panic!("expected text result, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        let result = AnalysisResult::from_wire(ContentType::Image, wire("real", 1.7, f64::NAN));
        assert_eq!(result.real_confidence(), 1.0);
        assert_eq!(result.fake_confidence(), 0.0);
    }

    #[test]
    fn test_video_wire_round_trip_keeps_predictions() {
        let mut w = wire("Real", 0.75, 0.25);
        w.filename = Some("clip.mp4".to_string());
        w.predictions = Some(vec![
            FramePrediction { frame: 0, label: "Real".to_string() },
            FramePrediction { frame: 1, label: "Fake".to_string() },
        ]);
        let result = AnalysisResult::from_wire(ContentType::Video, w);
        let back = result.to_wire();
        assert_eq!(back.result.as_deref(), Some("real"));
        assert_eq!(back.predictions.map(|p| p.len()), Some(2));
        assert_eq!(result.filename(), Some("clip.mp4"));
    }
}
