use crate::camera::Camera;
use crate::common::{CameraConfig, MaskLensError, Result};
use crate::core::history::HistoryAggregator;
use crate::core::interpreter::{interpret_response, EmotionLabel, Interpretation, MaskState};
use crate::service::ApiClient;
use chrono::{DateTime, Utc};

/// Result of one capture attempt. Transient: only the current attempt is
/// held; the durable record lives server-side and comes back through the
/// history refresh.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub label: EmotionLabel,
    pub mask_state: MaskState,
    pub faces_detected: u32,
    pub annotated_image: Option<Vec<u8>>,
    pub raw_image: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl CaptureResult {
    fn analyzing(raw_image: Vec<u8>, timestamp: DateTime<Utc>) -> Self {
        Self {
            label: EmotionLabel::Analyzing,
            mask_state: MaskState::Unknown,
            faces_detected: 1,
            annotated_image: None,
            raw_image,
            timestamp,
        }
    }

    fn from_interpretation(
        interpretation: Interpretation,
        raw_image: Vec<u8>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            label: interpretation.label,
            mask_state: interpretation.mask_state,
            faces_detected: interpretation.faces_detected,
            annotated_image: interpretation.annotated_image,
            raw_image,
            timestamp,
        }
    }

    fn error(message: impl Into<String>, raw_image: Vec<u8>, timestamp: DateTime<Utc>) -> Self {
        Self {
            label: EmotionLabel::Error(message.into()),
            mask_state: MaskState::Unknown,
            faces_detected: 1,
            annotated_image: None,
            raw_image,
            timestamp,
        }
    }

    /// Image to show for this result: the server-annotated one when
    /// present, else the raw snapshot.
    pub fn display_image(&self) -> &[u8] {
        self.annotated_image.as_deref().unwrap_or(&self.raw_image)
    }
}

/// Owns the camera device and the single-slot pending result for the
/// capture-and-interpretation workflow. A second capture supersedes the
/// first's pending state; results are never queued.
#[derive(Default)]
pub struct CapturePipeline {
    camera: Option<Camera>,
    pending: Option<CaptureResult>,
}

impl CapturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    /// Most recent capture state (placeholder, result or error), if any.
    pub fn pending(&self) -> Option<&CaptureResult> {
        self.pending.as_ref()
    }

    /// Acquire the camera. On failure no partial device handle is held and
    /// the pipeline stays in the "camera off" state.
    pub fn open_device(&mut self, config: &CameraConfig) -> Result<()> {
        if self.camera.is_some() {
            return Ok(());
        }
        self.camera = Some(Camera::new(config)?);
        Ok(())
    }

    /// Release the device and its buffers. Closing an already-closed
    /// device is a no-op.
    pub fn close_device(&mut self) {
        self.camera = None;
    }

    /// Snapshot the current frame, submit it for classification and leave
    /// the outcome in the pending slot. With no stored token this returns
    /// Unauthenticated before touching the device; otherwise the Analyzing
    /// placeholder is installed before the network call so callers always
    /// observe the in-flight state, and on success the user's history is
    /// refreshed.
    pub fn capture_and_submit(
        &mut self,
        client: &ApiClient,
        history: &mut HistoryAggregator,
    ) -> Result<()> {
        if client.store().token().is_none() {
            return Err(MaskLensError::Unauthenticated);
        }

        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| MaskLensError::DeviceUnavailable("Camera is off".into()))?;

        let frame = camera.capture_frame()?;
        let png = Camera::encode_png(&frame)?;
        let timestamp = Utc::now();

        // Supersedes any previous pending state
        self.pending = Some(CaptureResult::analyzing(png.clone(), timestamp));

        match client.predict(png.clone()) {
            Ok((status, body)) => {
                let interpretation = interpret_response(status, &body);
                let succeeded = !interpretation.label.is_error();
                self.pending = Some(CaptureResult::from_interpretation(
                    interpretation,
                    png,
                    timestamp,
                ));

                if succeeded {
                    // The server has stored a new record; refresh our copy.
                    // A failed refresh does not fail the capture.
                    if let Err(e) = history.refresh(client) {
                        tracing::warn!("History refresh after capture failed: {}", e);
                    }
                }
                Ok(())
            }
            Err(MaskLensError::Unauthenticated) => {
                self.pending = Some(CaptureResult::error("Not logged in", png, timestamp));
                Err(MaskLensError::Unauthenticated)
            }
            Err(e) => {
                // No automatic retry; the user re-captures
                self.pending = Some(CaptureResult::error(
                    "Failed to connect to API",
                    png,
                    timestamp,
                ));
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn install_pending(&mut self, result: CaptureResult) {
        self.pending = Some(result);
    }
}
