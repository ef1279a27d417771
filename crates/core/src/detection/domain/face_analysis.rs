use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::expression::domain::expression::ExpressionScores;
use crate::shared::face_box::FaceBox;

/// A located face, before expression classification.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub bbox: FaceBox,
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
}

/// Everything the analyzer reports for one face in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnalysis {
    pub bbox: FaceBox,
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
    pub expressions: ExpressionScores,
}

impl FaceAnalysis {
    pub fn from_detection(face: DetectedFace, expressions: ExpressionScores) -> Self {
        Self {
            bbox: face.bbox,
            confidence: face.confidence,
            landmarks: face.landmarks,
            expressions,
        }
    }
}
