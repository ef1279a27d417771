use crate::detection::domain::face_analysis::FaceAnalysis;
use crate::detection::domain::face_detector::FaceDetector;
use crate::expression::domain::expression_classifier::ExpressionClassifier;
use crate::shared::frame::Frame;

/// Inference interface consumed by the polling loop: faces with landmarks
/// and expression scores, in detector order.
pub trait FaceAnalyzer: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>>;
}

/// Runs a detector, then classifies the expression of every face it found.
pub struct DetectThenClassify {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn ExpressionClassifier>,
}

impl DetectThenClassify {
    pub fn new(detector: Box<dyn FaceDetector>, classifier: Box<dyn ExpressionClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }
}

impl FaceAnalyzer for DetectThenClassify {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>> {
        let faces = self.detector.detect(frame)?;
        let mut analyses = Vec::with_capacity(faces.len());
        for face in faces {
            if face.bbox.is_empty() {
                log::debug!("Skipping empty face box at ({}, {})", face.bbox.x, face.bbox.y);
                continue;
            }
            let scores = self.classifier.classify(frame, &face.bbox)?;
            analyses.push(FaceAnalysis::from_detection(face, scores));
        }
        Ok(analyses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_analysis::DetectedFace;
    use crate::expression::domain::expression::{Expression, ExpressionScores};
    use crate::shared::face_box::FaceBox;

    struct FakeDetector {
        faces: Vec<DetectedFace>,
    }

    impl FaceDetector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            Ok(self.faces.clone())
        }
    }

    /// Scores faces wider than 50px as happy, the rest as sad.
    struct WidthClassifier;

    impl ExpressionClassifier for WidthClassifier {
        fn classify(
            &mut self,
            _frame: &Frame,
            face: &FaceBox,
        ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
            let e = if face.width > 50 {
                Expression::Happy
            } else {
                Expression::Sad
            };
            Ok(ExpressionScores::from_pairs([(e, 1.0)]))
        }
    }

    struct FailingClassifier;

    impl ExpressionClassifier for FailingClassifier {
        fn classify(
            &mut self,
            _frame: &Frame,
            _face: &FaceBox,
        ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
            Err("classifier exploded".into())
        }
    }

    fn detected(width: i32) -> DetectedFace {
        DetectedFace {
            bbox: FaceBox::new(0, 0, width, width),
            confidence: 0.9,
            landmarks: None,
        }
    }

    fn frame() -> Frame {
        Frame::filled(100, 100, [0, 0, 0], 0)
    }

    #[test]
    fn test_preserves_detector_order() {
        let mut analyzer = DetectThenClassify::new(
            Box::new(FakeDetector {
                faces: vec![detected(20), detected(80)],
            }),
            Box::new(WidthClassifier),
        );

        let result = analyzer.analyze(&frame()).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].expressions.dominant().0, Expression::Sad);
        assert_eq!(result[1].expressions.dominant().0, Expression::Happy);
    }

    #[test]
    fn test_empty_boxes_are_skipped() {
        let mut analyzer = DetectThenClassify::new(
            Box::new(FakeDetector {
                faces: vec![detected(0), detected(80)],
            }),
            Box::new(WidthClassifier),
        );

        let result = analyzer.analyze(&frame()).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].bbox.width, 80);
    }

    #[test]
    fn test_no_faces_returns_empty() {
        let mut analyzer = DetectThenClassify::new(
            Box::new(FakeDetector { faces: vec![] }),
            Box::new(FailingClassifier),
        );
        assert!(analyzer.analyze(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_classifier_error_propagates() {
        let mut analyzer = DetectThenClassify::new(
            Box::new(FakeDetector {
                faces: vec![detected(60)],
            }),
            Box::new(FailingClassifier),
        );
        assert!(analyzer.analyze(&frame()).is_err());
    }
}
