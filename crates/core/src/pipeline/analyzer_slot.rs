use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::detection::domain::face_analysis::FaceAnalysis;
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::shared::frame::Frame;

/// Holds the analyzer once the models have loaded.
///
/// Readiness flips false → true on the first successful [`install`](Self::install)
/// and never reverts.
#[derive(Default)]
pub struct AnalyzerSlot {
    analyzer: Mutex<Option<Box<dyn FaceAnalyzer>>>,
    ready: AtomicBool,
}

impl AnalyzerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the analyzer and marks the slot ready. A second install is
    /// rejected and returns `false`.
    pub fn install(&self, analyzer: Box<dyn FaceAnalyzer>) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            log::warn!("Analyzer already installed, ignoring replacement");
            return false;
        }
        *slot = Some(analyzer);
        self.ready.store(true, Ordering::Release);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Runs the installed analyzer, `None` when nothing is installed yet.
    pub fn analyze(
        &self,
        frame: &Frame,
    ) -> Option<Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>>> {
        self.lock().as_mut().map(|analyzer| analyzer.analyze(frame))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn FaceAnalyzer>>> {
        self.analyzer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
