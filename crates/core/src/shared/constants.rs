pub const FACE_DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EXPRESSION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EXPRESSION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/5faef4c33eba0395177850e1e31c4a6a9e634c82/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// Directory name used under the platform cache/config dirs.
pub const APP_DIR_NAME: &str = "MoodCam";

pub const VIDEO_WIDTH: u32 = 640;
pub const VIDEO_HEIGHT: u32 = 480;

/// Polling cadence (two ticks per second).
pub const POLL_INTERVAL_MS: u64 = 500;

/// Minimum detector confidence for a face to be reported.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
