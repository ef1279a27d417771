//! Lookup tables from the current label to its display text and background color.

use crate::expression::domain::expression::Expression;
use crate::shared::color::Color;

/// Background used for neutral faces, "no face" and "not yet detected".
pub const DEFAULT_BACKGROUND: Color = Color::rgb(0x28, 0x2c, 0x34);

pub const NO_FACE_TEXT: &str = "No face detected";
pub const PENDING_TEXT: &str = "Detecting...";

/// The label shown to the user. Always a real category or a sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoodLabel {
    /// Nothing has been detected yet.
    Pending,
    /// The last tick found no face.
    NoFace,
    Detected(Expression),
}

impl MoodLabel {
    pub fn text(self) -> &'static str {
        match self {
            MoodLabel::Pending => PENDING_TEXT,
            MoodLabel::NoFace => NO_FACE_TEXT,
            MoodLabel::Detected(e) => expression_text(e),
        }
    }

    pub fn color(self) -> Color {
        match self {
            MoodLabel::Pending | MoodLabel::NoFace => DEFAULT_BACKGROUND,
            MoodLabel::Detected(e) => expression_color(e),
        }
    }

    pub fn expression(self) -> Option<Expression> {
        match self {
            MoodLabel::Detected(e) => Some(e),
            _ => None,
        }
    }
}

pub fn expression_text(expression: Expression) -> &'static str {
    match expression {
        Expression::Neutral => "Neutral",
        Expression::Happy => "Happy \u{1F60A}",
        Expression::Sad => "Sad \u{1F622}",
        Expression::Angry => "Angry \u{1F620}",
        Expression::Fearful => "Fearful \u{1F628}",
        Expression::Disgusted => "Disgusted \u{1F922}",
        Expression::Surprised => "Surprised \u{1F62E}",
    }
}

pub fn expression_color(expression: Expression) -> Color {
    match expression {
        Expression::Neutral => DEFAULT_BACKGROUND,
        Expression::Happy => Color::rgb(0x2E, 0x7D, 0x32),
        Expression::Sad => Color::rgb(0x15, 0x65, 0xC0),
        Expression::Angry => Color::rgb(0xC6, 0x28, 0x28),
        Expression::Fearful => Color::rgb(0x6A, 0x1B, 0x9A),
        Expression::Disgusted => Color::rgb(0x79, 0x55, 0x48),
        Expression::Surprised => Color::rgb(0xF9, 0xA8, 0x25),
    }
}
