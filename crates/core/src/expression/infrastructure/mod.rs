pub mod onnx_expression_classifier;
