use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot create {}: {source}", .dir.display())]
    Directory {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("frame {index} has {channels} channels, snapshots need RGB")]
    NotRgb { index: usize, channels: u8 },
    #[error("cannot encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },
}

/// Persists an annotated frame at its native size.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), SnapshotError>;
}
