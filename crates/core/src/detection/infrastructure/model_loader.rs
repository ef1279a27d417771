use std::path::Path;
use std::thread;

use thiserror::Error;

use crate::detection::domain::face_analyzer::{DetectThenClassify, FaceAnalyzer};
use crate::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use crate::expression::infrastructure::onnx_expression_classifier::OnnxExpressionClassifier;
use crate::shared::model_resolver::{ModelAsset, ModelResolveError, ModelResolver, ProgressFn};
use crate::shared::settings::Settings;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
    #[error("failed to load model {name}: {message}")]
    Session { name: String, message: String },
    #[error("model loader thread panicked")]
    Panicked,
}

/// Resolves every model asset and builds the ONNX face analyzer.
pub struct ModelLoader {
    resolver: ModelResolver,
    base_url: Option<String>,
    confidence: f64,
}

impl ModelLoader {
    pub fn new(resolver: ModelResolver, base_url: Option<String>, confidence: f64) -> Self {
        Self {
            resolver,
            base_url,
            confidence,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ModelResolveError> {
        let resolver = ModelResolver::new(settings.bundled_model_dir.clone())?;
        Ok(Self::new(
            resolver,
            settings.model_base_url.clone(),
            settings.confidence,
        ))
    }

    /// Assets in load order: face detector, expression classifier.
    pub fn assets(&self) -> Vec<ModelAsset> {
        let base = self.base_url.as_deref();
        vec![
            ModelAsset::face_detector(base),
            ModelAsset::expression_classifier(base),
        ]
    }

    /// Fetches all assets in parallel, then opens both sessions in parallel.
    pub fn load(
        &self,
        progress: Option<&ProgressFn>,
    ) -> Result<Box<dyn FaceAnalyzer>, ModelLoadError> {
        let assets = self.assets();
        let paths = self.resolver.resolve_all(&assets, progress)?;
        let (detector_path, classifier_path) = (&paths[0], &paths[1]);

        let confidence = self.confidence;
        let (detector, classifier) = thread::scope(|s| {
            let detector = s.spawn(|| {
                session_result(&assets[0], detector_path, |p| {
                    OnnxFaceDetector::new(p, confidence)
                })
            });
            let classifier = s.spawn(|| {
                session_result(&assets[1], classifier_path, OnnxExpressionClassifier::new)
            });
            (
                detector.join().unwrap_or(Err(ModelLoadError::Panicked)),
                classifier.join().unwrap_or(Err(ModelLoadError::Panicked)),
            )
        });

        log::info!("Loaded {} model assets", assets.len());
        Ok(Box::new(DetectThenClassify::new(
            Box::new(detector?),
            Box::new(classifier?),
        )))
    }
}

fn session_result<T>(
    asset: &ModelAsset,
    path: &Path,
    open: impl FnOnce(&Path) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, ModelLoadError> {
    open(path).map_err(|e| ModelLoadError::Session {
        name: asset.name.clone(),
        message: e.to_string(),
    })
}
