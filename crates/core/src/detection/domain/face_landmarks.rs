//! 5-point face landmarks: eyes, nose tip, mouth corners.

/// Landmark order: [left_eye, right_eye, nose, left_mouth, right_mouth].
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// Points with x <= 0 are treated as invisible.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(|(x, _)| *x > 0.0)
    }

    pub fn visible(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied().filter(|(x, _)| *x > 0.0)
    }

    /// Rescales every visible point from one surface size to another.
    pub fn scaled(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        if from.0 == 0 || from.1 == 0 {
            return self.clone();
        }
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Self::new(self.points.map(|(x, y)| {
            if x > 0.0 {
                (x * sx, y * sy)
            } else {
                (x, y)
            }
        }))
    }
}
