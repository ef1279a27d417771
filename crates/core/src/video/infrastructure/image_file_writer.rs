use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::{ImageWriter, SnapshotError};

/// Saves snapshots with the `image` crate; the extension picks the format.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), SnapshotError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| SnapshotError::Directory {
                dir: dir.to_path_buf(),
                source,
            })?;
        }

        let img = frame.to_rgb_image().ok_or(SnapshotError::NotRgb {
            index: frame.index(),
            channels: frame.channels(),
        })?;
        img.save(path).map_err(|e| SnapshotError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
