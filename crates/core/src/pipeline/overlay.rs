//! Drawing commands for the presentation layer, plus a simple rasterizer used
//! for annotated snapshots.

use crate::detection::domain::face_analysis::FaceAnalysis;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::expression::domain::mood::expression_text;
use crate::shared::color::Color;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const OUTLINE_THICKNESS: i32 = 2;
const LABEL_BAR_HEIGHT: i32 = 6;

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayCommand {
    Box {
        bbox: FaceBox,
        color: Color,
    },
    /// Only visible points are drawn.
    Landmarks {
        landmarks: FaceLandmarks,
        color: Color,
    },
    /// Dominant expression of one face. `score` is in [0, 1].
    Label {
        bbox: FaceBox,
        text: &'static str,
        score: f64,
        color: Color,
    },
}

/// Drawing commands for a surface of `width` × `height`.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    width: u32,
    height: u32,
    commands: Vec<OverlayCommand>,
}

impl Overlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Box, landmarks and label for every face. The selected face is drawn in
    /// `mood_color`, the others in white.
    pub fn for_faces(
        width: u32,
        height: u32,
        faces: &[FaceAnalysis],
        selected: Option<usize>,
        mood_color: Color,
    ) -> Self {
        let mut overlay = Self::new(width, height);
        for (i, face) in faces.iter().enumerate() {
            let color = if selected == Some(i) {
                mood_color
            } else {
                Color::WHITE
            };
            overlay.push(OverlayCommand::Box {
                bbox: face.bbox,
                color,
            });
            if let Some(landmarks) = face.landmarks.as_ref().filter(|l| l.has_visible()) {
                overlay.push(OverlayCommand::Landmarks {
                    landmarks: landmarks.clone(),
                    color,
                });
            }
            let (expression, score) = face.expressions.dominant();
            overlay.push(OverlayCommand::Label {
                bbox: face.bbox,
                text: expression_text(expression),
                score,
                color,
            });
        }
        overlay
    }

    pub fn push(&mut self, command: OverlayCommand) {
        self.commands.push(command);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn commands(&self) -> &[OverlayCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Draws the commands onto a copy of `frame`, rescaling coordinates when
    /// the frame size differs from the overlay size. Text is not rendered.
    pub fn rasterize(&self, frame: &Frame) -> Frame {
        let mut out = frame.clone();
        let from = (self.width, self.height);
        let to = (frame.width(), frame.height());

        for command in &self.commands {
            match command {
                OverlayCommand::Box { bbox, color } => {
                    draw_outline(&mut out, bbox.scaled(from, to), color.to_array());
                }
                OverlayCommand::Landmarks { landmarks, color } => {
                    for (x, y) in landmarks.scaled(from, to).visible() {
                        let (cx, cy) = (x.round() as i32, y.round() as i32);
                        fill_rect(&mut out, cx - 1, cy - 1, 3, 3, color.to_array());
                    }
                }
                OverlayCommand::Label {
                    bbox, score, color, ..
                } => {
                    let bbox = bbox.scaled(from, to);
                    let length = (bbox.width as f64 * score.clamp(0.0, 1.0)).round() as i32;
                    let above = bbox.y - LABEL_BAR_HEIGHT - 1;
                    let y = if above >= 0 { above } else { bbox.bottom() + 1 };
                    fill_rect(&mut out, bbox.x, y, length, LABEL_BAR_HEIGHT, color.to_array());
                }
            }
        }
        out
    }
}

fn fill_rect(frame: &mut Frame, x: i32, y: i32, width: i32, height: i32, rgb: [u8; 3]) {
    for py in y..y + height {
        for px in x..x + width {
            frame.put_pixel(px, py, rgb);
        }
    }
}

fn draw_outline(frame: &mut Frame, bbox: FaceBox, rgb: [u8; 3]) {
    let t = OUTLINE_THICKNESS.min(bbox.width).min(bbox.height);
    fill_rect(frame, bbox.x, bbox.y, bbox.width, t, rgb);
    fill_rect(frame, bbox.x, bbox.bottom() - t, bbox.width, t, rgb);
    fill_rect(frame, bbox.x, bbox.y, t, bbox.height, rgb);
    fill_rect(frame, bbox.right() - t, bbox.y, t, bbox.height, rgb);
}
