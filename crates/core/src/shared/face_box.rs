/// Axis-aligned face bounding box in frame pixel coordinates.
///
/// Always clamped to the frame it was built for, so drawing and cropping
/// never need to re-check bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from float corners, clamped to `frame_width` × `frame_height`.
    pub fn from_corners(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let fw = frame_width as i32;
        let fh = frame_height as i32;
        let left = (x1.round() as i32).clamp(0, fw);
        let top = (y1.round() as i32).clamp(0, fh);
        let right = (x2.round() as i32).clamp(0, fw);
        let bottom = (y2.round() as i32).clamp(0, fh);
        Self {
            x: left,
            y: top,
            width: (right - left).max(0),
            height: (bottom - top).max(0),
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Rescales a box from one surface size to another.
    pub fn scaled(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        if from.0 == 0 || from.1 == 0 {
            return *self;
        }
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Self {
            x: (self.x as f64 * sx).round() as i32,
            y: (self.y as f64 * sy).round() as i32,
            width: (self.width as f64 * sx).round() as i32,
            height: (self.height as f64 * sy).round() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_inside_frame() {
        let b = FaceBox::from_corners(10.2, 20.6, 110.0, 140.4, 640, 480);
        assert_eq!(b, FaceBox::new(10, 21, 100, 119));
    }

    #[test]
    fn test_from_corners_clamps_to_frame() {
        let b = FaceBox::from_corners(-15.0, -5.0, 700.0, 500.0, 640, 480);
        assert_eq!(b, FaceBox::new(0, 0, 640, 480));
    }

    #[test]
    fn test_from_corners_outside_frame_is_empty() {
        let b = FaceBox::from_corners(700.0, 10.0, 800.0, 50.0, 640, 480);
        assert!(b.is_empty());
        assert_eq!(b.area(), 0);
    }

    #[test]
    fn test_area_and_edges() {
        let b = FaceBox::new(5, 10, 20, 30);
        assert_eq!(b.area(), 600);
        assert_eq!(b.right(), 25);
        assert_eq!(b.bottom(), 40);
    }

    #[test]
    fn test_scaled_doubles() {
        let b = FaceBox::new(10, 20, 30, 40).scaled((320, 240), (640, 480));
        assert_eq!(b, FaceBox::new(20, 40, 60, 80));
    }

    #[test]
    fn test_scaled_from_zero_size_is_identity() {
        let b = FaceBox::new(1, 2, 3, 4);
        assert_eq!(b.scaled((0, 0), (640, 480)), b);
    }
}
