//! Live webcam expression detection.
//!
//! A face analyzer (ONNX face detector + expression classifier) is polled on a
//! fixed cadence against the most recent camera frame. Each tick reduces the
//! analysis to one [`MoodLabel`](expression::domain::mood::MoodLabel), which
//! maps to a display string and a background color.

pub mod detection;
pub mod expression;
pub mod pipeline;
pub mod shared;
pub mod video;
