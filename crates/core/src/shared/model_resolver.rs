use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use thiserror::Error;

use crate::shared::constants::{
    APP_DIR_NAME, EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, FACE_DETECTOR_MODEL_NAME,
    FACE_DETECTOR_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("resolver thread for {0} panicked")]
    Panicked(String),
}

/// Progress callback: `(asset_name, bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = dyn Fn(&str, u64, u64) + Send + Sync;

/// A named model file and the URL it is fetched from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAsset {
    pub name: String,
    pub url: String,
}

impl ModelAsset {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The face detector asset; `base_url` replaces the default location.
    pub fn face_detector(base_url: Option<&str>) -> Self {
        Self::located(FACE_DETECTOR_MODEL_NAME, FACE_DETECTOR_MODEL_URL, base_url)
    }

    /// The expression classifier asset; `base_url` replaces the default location.
    pub fn expression_classifier(base_url: Option<&str>) -> Self {
        Self::located(EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, base_url)
    }

    fn located(name: &str, default_url: &str, base_url: Option<&str>) -> Self {
        match base_url {
            Some(base) => Self::new(name, format!("{}/{name}", base.trim_end_matches('/'))),
            None => Self::new(name, default_url),
        }
    }
}

/// Finds model files locally or downloads them into the cache.
///
/// Resolution order per asset:
/// 1. Cache directory
/// 2. Bundled directory (for development / pre-packaged installs)
/// 3. Download from the asset URL into the cache
pub struct ModelResolver {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelResolver {
    /// Resolver rooted at the platform cache directory.
    pub fn new(bundled_dir: Option<PathBuf>) -> Result<Self, ModelResolveError> {
        Ok(Self::with_cache_dir(model_cache_dir()?, bundled_dir))
    }

    pub fn with_cache_dir(cache_dir: PathBuf, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            bundled_dir,
        }
    }

    pub fn resolve(
        &self,
        asset: &ModelAsset,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        let cached_path = self.cache_dir.join(&asset.name);
        if cached_path.exists() {
            log::debug!("Model {} found in cache", asset.name);
            return Ok(cached_path);
        }

        if let Some(dir) = &self.bundled_dir {
            let bundled_path = dir.join(&asset.name);
            if bundled_path.exists() {
                log::debug!("Model {} found in {}", asset.name, dir.display());
                return Ok(bundled_path);
            }
        }

        fs::create_dir_all(&self.cache_dir).map_err(ModelResolveError::CacheDir)?;
        log::info!("Downloading {} from {}", asset.name, asset.url);
        download(&asset.name, &asset.url, &cached_path, progress)?;
        Ok(cached_path)
    }

    /// Resolves all assets concurrently, one thread per asset.
    ///
    /// Paths are returned in the order of `assets`. The first failure (in
    /// asset order) is returned; there is no retry.
    pub fn resolve_all(
        &self,
        assets: &[ModelAsset],
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<PathBuf>, ModelResolveError> {
        let results: Vec<Result<PathBuf, ModelResolveError>> = thread::scope(|s| {
            let handles: Vec<_> = assets
                .iter()
                .map(|asset| (asset, s.spawn(move || self.resolve(asset, progress))))
                .collect();
            handles
                .into_iter()
                .map(|(asset, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(ModelResolveError::Panicked(asset.name.clone())))
                })
                .collect()
        });
        results.into_iter().collect()
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/MoodCam/models/`
/// - Linux: `$XDG_CACHE_HOME/MoodCam/models/` or `~/.cache/MoodCam/models/`
/// - Windows: `%LOCALAPPDATA%/MoodCam/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `dest` through a `.part` file renamed on success.
fn download(
    name: &str,
    url: &str,
    dest: &Path,
    progress: Option<&ProgressFn>,
) -> Result<(), ModelResolveError> {
    let part_path = dest.with_extension("part");
    let result = stream_to(name, url, dest, &part_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }
    result
}

fn stream_to(
    name: &str,
    url: &str,
    dest: &Path,
    part_path: &Path,
    progress: Option<&ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(part_path).map_err(write_err(part_path))?;
    let mut buf = vec![0u8; 256 * 1024];
    let mut downloaded = 0u64;
    loop {
        let n = response.read(&mut buf).map_err(write_err(part_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(part_path))?;
        downloaded += n as u64;
        if let Some(cb) = progress {
            cb(name, downloaded, total);
        }
    }
    file.flush().map_err(write_err(part_path))?;
    drop(file);

    fs::rename(part_path, dest).map_err(write_err(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("m.onnx"), b"cached").unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path().to_path_buf(), None);

        let path = resolver
            .resolve(&ModelAsset::new("m.onnx", UNREACHABLE), None)
            .unwrap();

        assert_eq!(path, tmp.path().join("m.onnx"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("m.onnx"), b"bundled").unwrap();
        let resolver =
            ModelResolver::with_cache_dir(tmp.path().join("cache"), Some(bundled.clone()));

        let path = resolver
            .resolve(&ModelAsset::new("m.onnx", UNREACHABLE), None)
            .unwrap();

        assert_eq!(path, bundled.join("m.onnx"));
    }

    #[test]
    fn test_resolve_unreachable_url_errors_without_partial_file() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path().to_path_buf(), None);

        let result = resolver.resolve(&ModelAsset::new("m.onnx", UNREACHABLE), None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!tmp.path().join("m.onnx").exists());
        assert!(!tmp.path().join("m.part").exists());
    }

    #[test]
    fn test_resolve_all_keeps_asset_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.onnx"), b"a").unwrap();
        fs::write(tmp.path().join("b.onnx"), b"b").unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path().to_path_buf(), None);

        let paths = resolver
            .resolve_all(
                &[
                    ModelAsset::new("b.onnx", UNREACHABLE),
                    ModelAsset::new("a.onnx", UNREACHABLE),
                ],
                None,
            )
            .unwrap();

        assert_eq!(paths, vec![tmp.path().join("b.onnx"), tmp.path().join("a.onnx")]);
    }

    #[test]
    fn test_resolve_all_fails_if_any_asset_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.onnx"), b"a").unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path().to_path_buf(), None);

        let result = resolver.resolve_all(
            &[
                ModelAsset::new("a.onnx", UNREACHABLE),
                ModelAsset::new("missing.onnx", UNREACHABLE),
            ],
            None,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_asset_base_url_override() {
        let asset = ModelAsset::face_detector(Some("https://mirror.example.com/models/"));
        assert_eq!(
            asset.url,
            format!("https://mirror.example.com/models/{FACE_DETECTOR_MODEL_NAME}")
        );
        assert_eq!(
            ModelAsset::expression_classifier(None).url,
            EXPRESSION_MODEL_URL
        );
    }

    #[test]
    fn test_model_cache_dir_contains_app_name() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }
}
