use std::sync::Mutex;

use crate::shared::frame::Frame;

/// A live video source the poller samples on each tick.
pub trait FrameSource: Send + Sync {
    /// The most recent frame, or `None` before the first frame arrives.
    fn latest_frame(&self) -> Option<Frame>;
}

/// Single-slot frame cell: the capture thread overwrites, readers clone.
#[derive(Default)]
pub struct LatestFrame {
    slot: Mutex<Option<Frame>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = Some(frame),
            Err(poisoned) => *poisoned.into_inner() = Some(frame),
        }
    }
}

impl FrameSource for LatestFrame {
    fn latest_frame(&self) -> Option<Frame> {
        match self.slot.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
