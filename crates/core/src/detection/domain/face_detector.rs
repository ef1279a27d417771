use crate::detection::domain::face_analysis::DetectedFace;
use crate::shared::frame::Frame;

/// Domain interface for face localization.
///
/// Results are ordered the way the backend ranks them; callers that need
/// "the first face" rely on that order.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>>;
}
