use crate::expression::domain::expression::ExpressionScores;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for scoring the expression of one face in a frame.
pub trait ExpressionClassifier: Send {
    fn classify(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<ExpressionScores, Box<dyn std::error::Error>>;
}
