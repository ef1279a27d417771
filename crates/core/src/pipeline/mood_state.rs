use crate::expression::domain::mood::MoodLabel;
use crate::shared::color::Color;

/// Read-only view of the mood state published after every effective tick.
#[derive(Clone, Debug, PartialEq)]
pub struct MoodSnapshot {
    pub label: MoodLabel,
    pub text: &'static str,
    pub color: Color,
    pub face_count: usize,
    /// Tick that produced this snapshot; 0 before the first analyzed tick.
    pub tick: u64,
}

impl MoodSnapshot {
    fn new(label: MoodLabel, face_count: usize, tick: u64) -> Self {
        Self {
            label,
            text: label.text(),
            color: label.color(),
            face_count,
            tick,
        }
    }
}

/// Current label and color. Text and color are always derived from the label.
#[derive(Debug)]
pub struct MoodState {
    current: MoodSnapshot,
}

impl MoodState {
    pub fn new() -> Self {
        Self {
            current: MoodSnapshot::new(MoodLabel::Pending, 0, 0),
        }
    }

    pub fn current(&self) -> &MoodSnapshot {
        &self.current
    }

    pub fn label(&self) -> MoodLabel {
        self.current.label
    }

    pub fn color(&self) -> Color {
        self.current.color
    }

    /// Overwrites the state with the result of one tick.
    pub fn apply(&mut self, label: MoodLabel, face_count: usize, tick: u64) -> &MoodSnapshot {
        self.current = MoodSnapshot::new(label, face_count, tick);
        &self.current
    }
}

impl Default for MoodState {
    fn default() -> Self {
        Self::new()
    }
}
