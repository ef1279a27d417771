pub mod face_analysis;
pub mod face_analyzer;
pub mod face_detector;
pub mod face_landmarks;
