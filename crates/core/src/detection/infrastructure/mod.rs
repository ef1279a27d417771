pub mod execution_provider;
pub mod model_loader;
pub mod onnx_face_detector;
