//! Narrative interpretation of an analysis verdict
//!
//! Used for `POST /api/analyze-ai` whenever no interpretation service is
//! configured. One paragraph per content type and verdict.

use iris_common::api::InterpretRequest;
use iris_common::{ContentType, Verdict};

fn subject(req: &InterpretRequest) -> String {
    match req.filename.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(name) => format!("\"{}\"", name),
        None => format!("this {}", req.content_type.label().to_lowercase()),
    }
}

fn fake_details(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Image => {
            "Typical signs include inconsistent lighting on facial features, blurred or \
             warped edges around the hairline and jaw, and skin texture that is smoother \
             than the surrounding detail."
        }
        ContentType::Audio => {
            "Synthetic speech often shows unnaturally even pitch, missing breath sounds \
             between phrases, and spectral artifacts in the higher frequencies."
        }
        ContentType::Video => {
            "Manipulated frames commonly show flicker around the face boundary, lip \
             movement that drifts from the audio, and blinking patterns that do not \
             look natural."
        }
        ContentType::Text => {
            "The article's wording and framing resemble known misinformation: emotionally \
             charged claims, missing or vague sources, and a headline that overstates the \
             body."
        }
    }
}

fn real_details(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Image => {
            "Lighting, shadows and fine facial detail are consistent across the picture, \
             with no blending seams around the face."
        }
        ContentType::Audio => {
            "Pitch variation, breathing and room acoustics behave like a natural \
             recording."
        }
        ContentType::Video => {
            "Most frames show stable facial geometry and natural motion from one frame to \
             the next."
        }
        ContentType::Text => {
            "The article's style, sourcing and structure are consistent with reliable \
             reporting."
        }
    }
}

/// Compose the interpretation paragraph
pub fn compose(req: &InterpretRequest) -> String {
    let confidence = if req.confidence.is_finite() {
        req.confidence.clamp(0.0, 100.0).round()
    } else {
        0.0
    };
    let subject = subject(req);

    match Verdict::parse(&req.result) {
        Verdict::Fake => format!(
            "Our model is {:.0}% confident that {} has been manipulated or generated by AI. {} \
             Treat this content with caution and verify it against trusted sources before \
             sharing it.",
            confidence,
            subject,
            fake_details(req.content_type)
        ),
        Verdict::Real => format!(
            "Our model is {:.0}% confident that {} is authentic. {} \
             No detector is perfect, so stay alert for context that does not add up.",
            confidence,
            subject,
            real_details(req.content_type)
        ),
        Verdict::Unknown => format!(
            "The model could not reach a clear verdict for {}. Try a higher quality file \
             or another model, and verify the content against trusted sources.",
            subject
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content_type: ContentType, result: &str, confidence: f64) -> InterpretRequest {
        InterpretRequest {
            content_type,
            result: result.to_string(),
            confidence,
            filename: Some("test.jpg".to_string()),
        }
    }

    #[test]
    fn test_fake_image_mentions_confidence_and_file() {
        let text = compose(&request(ContentType::Image, "fake", 92.0));
        assert!(text.contains("92%"));
        assert!(text.contains("\"test.jpg\""));
        assert!(text.contains("manipulated"));
    }

    #[test]
    fn test_real_verdict_is_case_insensitive() {
        let text = compose(&request(ContentType::Audio, "Real", 81.6));
        assert!(text.contains("82%"));
        assert!(text.contains("authentic"));
    }

    #[test]
    fn test_unknown_verdict_has_no_percentage() {
        let text = compose(&request(ContentType::Video, "maybe", 50.0));
        assert!(text.contains("could not reach a clear verdict"));
        assert!(!text.contains('%'));
    }

    #[test]
    fn test_missing_filename_uses_content_type() {
        let mut req = request(ContentType::Text, "fake", 85.0);
        req.filename = None;
        assert!(compose(&req).contains("this text"));
    }
}
