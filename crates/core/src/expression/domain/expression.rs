//! The closed set of facial expression categories and per-face score maps.

use std::fmt;

/// Expression category. Declaration order is the enumeration order used to
/// break ties when picking the dominant expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    pub const COUNT: usize = 7;

    pub const ALL: [Expression; Expression::COUNT] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    /// Stable lowercase key, e.g. `"happy"`.
    pub fn key(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.key() == key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Score for every category of one face. Categories the model did not
/// report score 0.0.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ExpressionScores {
    scores: [f64; Expression::COUNT],
}

impl ExpressionScores {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Expression, f64)>) -> Self {
        let mut scores = Self::default();
        for (expression, score) in pairs {
            scores.set(expression, score);
        }
        scores
    }

    pub fn get(&self, expression: Expression) -> f64 {
        self.scores[expression.index()]
    }

    pub fn set(&mut self, expression: Expression, score: f64) {
        self.scores[expression.index()] = score;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Expression, f64)> + '_ {
        Expression::ALL.into_iter().zip(self.scores.iter().copied())
    }

    /// Category with the highest score.
    ///
    /// Linear scan in enumeration order with a strict `>` comparison: on ties
    /// the first category encountered wins, and NaN scores never win.
    pub fn dominant(&self) -> (Expression, f64) {
        let mut best = (Expression::ALL[0], self.scores[0]);
        for (expression, score) in self.iter().skip(1) {
            if score > best.1 || best.1.is_nan() {
                best = (expression, score);
            }
        }
        best
    }
}
