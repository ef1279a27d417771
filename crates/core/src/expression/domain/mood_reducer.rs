use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detection::domain::face_analysis::FaceAnalysis;
use crate::expression::domain::mood::MoodLabel;

/// Which face decides the label when several are in view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSelection {
    /// First face in analyzer order.
    #[default]
    First,
    /// Face with the largest bounding box; earlier faces win ties.
    Largest,
}

impl FaceSelection {
    pub const ALL: &[FaceSelection] = &[FaceSelection::First, FaceSelection::Largest];
}

impl fmt::Display for FaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceSelection::First => write!(f, "first"),
            FaceSelection::Largest => write!(f, "largest"),
        }
    }
}

impl FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(FaceSelection::First),
            "largest" => Ok(FaceSelection::Largest),
            other => Err(format!(
                "face selection must be 'first' or 'largest', got '{other}'"
            )),
        }
    }
}

/// Reduces one tick's face analyses to a single label.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoodReducer {
    selection: FaceSelection,
}

impl MoodReducer {
    pub fn new(selection: FaceSelection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> FaceSelection {
        self.selection
    }

    /// Index of the face that decides the label, `None` when no face was found.
    pub fn select(&self, faces: &[FaceAnalysis]) -> Option<usize> {
        match self.selection {
            _ if faces.is_empty() => None,
            FaceSelection::First => Some(0),
            FaceSelection::Largest => {
                let mut best = 0;
                for (i, face) in faces.iter().enumerate().skip(1) {
                    if face.bbox.area() > faces[best].bbox.area() {
                        best = i;
                    }
                }
                Some(best)
            }
        }
    }

    pub fn reduce(&self, faces: &[FaceAnalysis]) -> MoodLabel {
        match self.select(faces) {
            Some(i) => MoodLabel::Detected(faces[i].expressions.dominant().0),
            None => MoodLabel::NoFace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::domain::expression::{Expression, ExpressionScores};
    use crate::shared::face_box::FaceBox;

    fn face(size: i32, expression: Expression) -> FaceAnalysis {
        FaceAnalysis {
            bbox: FaceBox::new(0, 0, size, size),
            confidence: 0.9,
            landmarks: None,
            expressions: ExpressionScores::from_pairs([(expression, 0.8)]),
        }
    }

    #[test]
    fn test_no_faces_is_no_face_sentinel() {
        assert_eq!(MoodReducer::default().reduce(&[]), MoodLabel::NoFace);
        assert_eq!(
            MoodReducer::new(FaceSelection::Largest).reduce(&[]),
            MoodLabel::NoFace
        );
    }

    #[test]
    fn test_first_selection_ignores_later_faces() {
        let faces = [face(10, Expression::Sad), face(100, Expression::Happy)];
        assert_eq!(
            MoodReducer::new(FaceSelection::First).reduce(&faces),
            MoodLabel::Detected(Expression::Sad)
        );
    }

    #[test]
    fn test_largest_selection_picks_biggest_box() {
        let faces = [face(10, Expression::Sad), face(100, Expression::Happy)];
        assert_eq!(
            MoodReducer::new(FaceSelection::Largest).reduce(&faces),
            MoodLabel::Detected(Expression::Happy)
        );
    }

    #[test]
    fn test_largest_selection_tie_keeps_earlier_face() {
        let faces = [face(50, Expression::Angry), face(50, Expression::Happy)];
        assert_eq!(MoodReducer::new(FaceSelection::Largest).select(&faces), Some(0));
    }

    #[test]
    fn test_reduce_uses_dominant_expression() {
        let mut f = face(10, Expression::Neutral);
        f.expressions = ExpressionScores::from_pairs([
            (Expression::Neutral, 0.1),
            (Expression::Happy, 0.9),
            (Expression::Sad, 0.0),
        ]);
        assert_eq!(
            MoodReducer::default().reduce(&[f]),
            MoodLabel::Detected(Expression::Happy)
        );
    }

    #[test]
    fn test_face_selection_parse_and_display() {
        for sel in FaceSelection::ALL {
            assert_eq!(sel.to_string().parse::<FaceSelection>(), Ok(*sel));
        }
        assert!("biggest".parse::<FaceSelection>().is_err());
    }
}
