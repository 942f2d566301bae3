use crate::service::protocol::ErrorEnvelope;
use base64::Engine;
use serde::Deserialize;

/// Canonical classification label. Anything the server sends that is not a
/// known label ends up as `Error`, never as a trusted enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmotionLabel {
    Happy,
    Sad,
    Analyzing,
    Error(String),
}

impl EmotionLabel {
    pub fn is_error(&self) -> bool {
        matches!(self, EmotionLabel::Error(_))
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmotionLabel::Happy => write!(f, "Happy"),
            EmotionLabel::Sad => write!(f, "Sad"),
            EmotionLabel::Analyzing => write!(f, "Analyzing..."),
            EmotionLabel::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskState {
    Mask,
    NoMask,
    Unknown,
}

impl std::fmt::Display for MaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskState::Mask => write!(f, "Wearing Mask"),
            MaskState::NoMask => write!(f, "No Mask"),
            MaskState::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Normalized reply from the classification service.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub label: EmotionLabel,
    pub mask_state: MaskState,
    pub faces_detected: u32,
    /// Server-annotated image; when present it supersedes the raw snapshot
    /// for display.
    pub annotated_image: Option<Vec<u8>>,
}

impl Interpretation {
    fn error(message: impl Into<String>) -> Self {
        Self {
            label: EmotionLabel::Error(message.into()),
            mask_state: MaskState::Unknown,
            faces_detected: 1,
            annotated_image: None,
        }
    }
}

/// Wire shape of a successful predict reply. The current contract carries
/// `emotion` plus mask metadata; the legacy one only `prediction`.
#[derive(Deserialize, Debug)]
struct PredictBody {
    emotion: Option<String>,
    mask_status: Option<String>,
    faces_detected: Option<u32>,
    annotated_image: Option<String>,
    prediction: Option<String>,
}

/// Turn a raw `/predict` reply into a canonical result. Never panics and
/// never lets an unparsed server string through as a label.
pub fn interpret_response(status: u16, body: &str) -> Interpretation {
    if !(200..300).contains(&status) {
        return Interpretation::error(ErrorEnvelope::message_or_status(body, status));
    }

    let parsed: PredictBody = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Unparseable predict body: {}", e);
            return Interpretation::error("Invalid response from server");
        }
    };

    if let Some(emotion) = parsed.emotion {
        let label = match validate_label(&emotion) {
            Some(label) => label,
            None => return Interpretation::error(format!("Unknown label: {}", emotion)),
        };

        let mask_state = match parsed.mask_status.as_deref() {
            Some("MASK") => MaskState::Mask,
            Some("NO MASK") | Some("NO_MASK") => MaskState::NoMask,
            _ => MaskState::Unknown,
        };

        return Interpretation {
            label,
            mask_state,
            faces_detected: parsed.faces_detected.unwrap_or(1).max(1),
            annotated_image: parsed.annotated_image.as_deref().and_then(decode_image_payload),
        };
    }

    // Legacy format: label only, no mask metadata
    if let Some(prediction) = parsed.prediction {
        return match validate_label(&prediction) {
            Some(label) => Interpretation {
                label,
                mask_state: MaskState::Unknown,
                faces_detected: 1,
                annotated_image: None,
            },
            None => Interpretation::error(format!("Unknown label: {}", prediction)),
        };
    }

    Interpretation::error("Invalid response from server")
}

fn validate_label(raw: &str) -> Option<EmotionLabel> {
    match raw {
        "Happy" => Some(EmotionLabel::Happy),
        "Sad" => Some(EmotionLabel::Sad),
        _ => None,
    }
}

/// Annotated images arrive base64-encoded, sometimes wrapped in a data URL.
/// A corrupt payload is dropped rather than failing the whole result.
fn decode_image_payload(raw: &str) -> Option<Vec<u8>> {
    let encoded = match raw.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => raw,
    };
    match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Discarding undecodable annotated image: {}", e);
            None
        }
    }
}
