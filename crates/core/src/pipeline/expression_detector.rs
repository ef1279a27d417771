use std::fmt::Display;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::expression::domain::mood_reducer::{FaceSelection, MoodReducer};
use crate::pipeline::analyzer_slot::AnalyzerSlot;
use crate::pipeline::expression_poller::{ExpressionPoller, PollerHandle, PollerMessage};
use crate::pipeline::mood_state::MoodSnapshot;
use crate::pipeline::tick_logger::{NullTickLogger, TickLogger};
use crate::shared::settings::Settings;
use crate::video::domain::frame_source::FrameSource;

/// Ties the lifecycle together: models load in the background, the poller
/// is armed when the stream goes live, and everything stops on shutdown.
///
/// ```text
/// load_models ──► slot ready ─┐
///                             ├─► poller ticks ──► PollerMessage
/// on_stream_live ─────────────┘
/// ```
pub struct ExpressionDetector {
    slot: Arc<AnalyzerSlot>,
    reducer: MoodReducer,
    interval: Duration,
    logger: Option<Box<dyn TickLogger>>,
    loader: Option<JoinHandle<()>>,
    load_attempted: bool,
    poller: Option<PollerHandle>,
    shut_down: bool,
}

impl ExpressionDetector {
    pub fn new(interval: Duration, selection: FaceSelection) -> Self {
        Self {
            slot: Arc::new(AnalyzerSlot::new()),
            reducer: MoodReducer::new(selection),
            interval,
            logger: Some(Box::new(NullTickLogger)),
            loader: None,
            load_attempted: false,
            poller: None,
            shut_down: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.poll_interval(), settings.face_selection)
    }

    /// Logger handed to the poller when it is armed.
    pub fn with_tick_logger(mut self, logger: Box<dyn TickLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs `load` on a background thread. On success the analyzer is
    /// installed and the detector becomes ready; a failure is logged and the
    /// detector stays not-ready for good. Only the first call has an effect.
    pub fn load_models<F, E>(&mut self, load: F)
    where
        F: FnOnce() -> Result<Box<dyn FaceAnalyzer>, E> + Send + 'static,
        E: Display,
    {
        if self.load_attempted {
            log::warn!("Models were already requested, ignoring repeated load");
            return;
        }
        self.load_attempted = true;
        let slot = self.slot.clone();
        let spawned = thread::Builder::new()
            .name("model-loader".into())
            .spawn(move || match load() {
                Ok(analyzer) => {
                    if slot.install(analyzer) {
                        log::info!("Models ready");
                    }
                }
                Err(e) => log::error!("Failed to load models: {e}"),
            });
        match spawned {
            Ok(join) => self.loader = Some(join),
            Err(e) => log::error!("Failed to spawn model loader: {e}"),
        }
    }

    /// Blocks until a pending [`load_models`](Self::load_models) finishes.
    /// Returns whether the detector is ready.
    pub fn wait_for_models(&mut self) -> bool {
        if let Some(join) = self.loader.take() {
            if join.join().is_err() {
                log::error!("Model loader thread panicked");
            }
        }
        self.slot.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// True while a model load is still running.
    pub fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Arms the polling loop on `source`. Only the first call after
    /// construction has an effect; it returns the message receiver.
    pub fn on_stream_live(
        &mut self,
        source: Arc<dyn FrameSource>,
    ) -> Option<Receiver<PollerMessage>> {
        if self.shut_down {
            log::warn!("Stream went live after shutdown, ignoring");
            return None;
        }
        if self.poller.is_some() {
            log::warn!("Poller already armed, ignoring repeated live signal");
            return None;
        }

        let logger = self
            .logger
            .take()
            .unwrap_or_else(|| Box::new(NullTickLogger));
        let poller = ExpressionPoller::new(self.slot.clone(), source, self.reducer).with_logger(logger);
        match PollerHandle::spawn(poller, self.interval) {
            Ok(handle) => {
                log::info!(
                    "Polling for expressions every {}ms",
                    self.interval.as_millis()
                );
                let messages = handle.messages();
                self.poller = Some(handle);
                Some(messages)
            }
            Err(e) => {
                log::error!("Failed to start expression poller: {e}");
                None
            }
        }
    }

    /// Another receiver for poller messages, `None` until armed.
    pub fn subscribe(&self) -> Option<Receiver<PollerMessage>> {
        self.poller.as_ref().map(|p| p.messages())
    }

    /// Stops the poller and waits for an in-flight tick. Idempotent. A model
    /// load still in progress is left to finish on its own.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Final mood after shutdown.
    pub fn final_state(&self) -> Option<&MoodSnapshot> {
        self.poller.as_ref()?.final_state()
    }

    /// Tick summary after shutdown.
    pub fn summary(&self) -> Option<String> {
        self.poller.as_ref()?.summary()
    }
}

impl Drop for ExpressionDetector {
    fn drop(&mut self) {
        self.shutdown();
    }
}
