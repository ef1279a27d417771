use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender, TrySendError};

use crate::detection::domain::face_analysis::FaceAnalysis;
use crate::expression::domain::mood_reducer::MoodReducer;
use crate::pipeline::analyzer_slot::AnalyzerSlot;
use crate::pipeline::mood_state::{MoodSnapshot, MoodState};
use crate::pipeline::overlay::Overlay;
use crate::pipeline::tick_logger::{NullTickLogger, TickKind, TickLogger};
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Everything one analyzed tick produced.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub snapshot: MoodSnapshot,
    pub faces: Vec<FaceAnalysis>,
    pub overlay: Overlay,
    pub frame: Frame,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Models not loaded yet. Nothing was pulled or analyzed.
    NotReady,
    NoFrame,
    Updated(TickReport),
    /// Analysis failed; the mood state was left as it was.
    Failed(String),
}

/// Published by a running poller.
#[derive(Clone, Debug)]
pub enum PollerMessage {
    Tick(Box<TickReport>),
    Failed { tick: u64, message: String },
}

/// One polling step: frame → analyzer → reducer → mood state + overlay.
///
/// The poller is the only writer of its [`MoodState`].
pub struct ExpressionPoller {
    slot: Arc<AnalyzerSlot>,
    source: Arc<dyn FrameSource>,
    reducer: MoodReducer,
    state: MoodState,
    logger: Box<dyn TickLogger>,
    ticks: u64,
}

impl ExpressionPoller {
    pub fn new(slot: Arc<AnalyzerSlot>, source: Arc<dyn FrameSource>, reducer: MoodReducer) -> Self {
        Self {
            slot,
            source,
            reducer,
            state: MoodState::new(),
            logger: Box::new(NullTickLogger),
            ticks: 0,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn TickLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn state(&self) -> &MoodState {
        &self.state
    }

    pub fn logger(&self) -> &dyn TickLogger {
        self.logger.as_ref()
    }

    /// Number of ticks run so far, including idle ones.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.ticks += 1;
        let tick = self.ticks;

        if !self.slot.is_ready() {
            self.logger.tick(TickKind::Idle);
            return TickOutcome::NotReady;
        }
        let Some(frame) = self.source.latest_frame() else {
            self.logger.tick(TickKind::Idle);
            return TickOutcome::NoFrame;
        };

        let start = Instant::now();
        let Some(result) = self.slot.analyze(&frame) else {
            self.logger.tick(TickKind::Idle);
            return TickOutcome::NotReady;
        };
        self.logger
            .timing("analyze", start.elapsed().as_secs_f64() * 1000.0);

        let faces = match result {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("Tick {tick}: face analysis failed: {e}");
                self.logger.tick(TickKind::Failed);
                return TickOutcome::Failed(e.to_string());
            }
        };

        let label = self.reducer.reduce(&faces);
        let snapshot = self.state.apply(label, faces.len(), tick).clone();
        let overlay = Overlay::for_faces(
            frame.width(),
            frame.height(),
            &faces,
            self.reducer.select(&faces),
            snapshot.color,
        );
        self.logger.tick(TickKind::Analyzed);
        self.logger.label(label, faces.len());
        log::debug!("Tick {tick}: {} face(s), {}", faces.len(), snapshot.text);

        TickOutcome::Updated(TickReport {
            snapshot,
            faces,
            overlay,
            frame,
        })
    }
}

/// Runs an [`ExpressionPoller`] on its own thread at a fixed interval.
///
/// Ticks never overlap: a slow tick delays the next one and missed ticks
/// are coalesced. Only the latest unread message is kept; a new tick
/// replaces one nobody has received yet. Stopping (explicitly or on drop) joins the thread, so no
/// state changes and no messages are published once [`stop`](Self::stop)
/// returns.
pub struct PollerHandle {
    stopped: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<ExpressionPoller>>,
    messages: Receiver<PollerMessage>,
    finished: Option<ExpressionPoller>,
}

impl PollerHandle {
    pub fn spawn(poller: ExpressionPoller, interval: Duration) -> std::io::Result<Self> {
        let (message_tx, messages) = crossbeam_channel::bounded(1);
        let outbox = Outbox {
            tx: message_tx,
            stale: messages.clone(),
        };
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let stopped = Arc::new(AtomicBool::new(false));

        let thread_stopped = stopped.clone();
        let join = thread::Builder::new()
            .name("expression-poller".into())
            .spawn(move || run(poller, interval, stop_rx, outbox, thread_stopped))?;

        Ok(Self {
            stopped,
            stop_tx: Some(stop_tx),
            join: Some(join),
            messages,
            finished: None,
        })
    }

    /// A receiver for tick messages. Receivers are clones of one
    /// single-slot channel: each message goes to whichever receiver takes it
    /// first, and unread messages are replaced by newer ones.
    pub fn messages(&self) -> Receiver<PollerMessage> {
        self.messages.clone()
    }

    pub fn is_running(&self) -> bool {
        self.join.is_some()
    }

    /// Cancels future ticks and waits for an in-flight one. Idempotent.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        self.stop_tx.take();
        if let Some(join) = self.join.take() {
            match join.join() {
                Ok(poller) => self.finished = Some(poller),
                Err(_) => log::error!("Expression poller thread panicked"),
            }
        }
    }

    /// The poller's final state, available after [`stop`](Self::stop).
    pub fn final_state(&self) -> Option<&MoodSnapshot> {
        self.finished.as_ref().map(|p| p.state().current())
    }

    /// Tick summary, available after [`stop`](Self::stop).
    pub fn summary(&self) -> Option<String> {
        self.finished.as_ref()?.logger().summary_string()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sending side of the single-slot message channel.
struct Outbox {
    tx: Sender<PollerMessage>,
    stale: Receiver<PollerMessage>,
}

impl Outbox {
    /// Publishes `message`, evicting an unread older one.
    fn publish(&self, message: PollerMessage) {
        match self.tx.try_send(message) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(message)) => {
                let _ = self.stale.try_recv();
                let _ = self.tx.try_send(message);
            }
        }
    }
}

fn run(
    mut poller: ExpressionPoller,
    interval: Duration,
    stop_rx: Receiver<()>,
    outbox: Outbox,
    stopped: Arc<AtomicBool>,
) -> ExpressionPoller {
    let ticker = crossbeam_channel::tick(interval);
    log::debug!("Expression poller started ({}ms interval)", interval.as_millis());

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                if stopped.load(Ordering::Acquire) {
                    break;
                }
                let message = match poller.tick() {
                    TickOutcome::Updated(report) => Some(PollerMessage::Tick(Box::new(report))),
                    TickOutcome::Failed(message) => Some(PollerMessage::Failed {
                        tick: poller.ticks(),
                        message,
                    }),
                    TickOutcome::NotReady | TickOutcome::NoFrame => None,
                };
                if stopped.load(Ordering::Acquire) {
                    break;
                }
                if let Some(message) = message {
                    outbox.publish(message);
                }
            }
        }
    }

    log::debug!("Expression poller stopped after {} ticks", poller.ticks());
    poller
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::domain::expression::{Expression, ExpressionScores};
    use crate::expression::domain::mood::{MoodLabel, DEFAULT_BACKGROUND};
    use crate::expression::domain::mood_reducer::FaceSelection;
    use crate::pipeline::test_support::analyzer;
    use crate::pipeline::tick_logger::SummaryTickLogger;
    use crate::shared::face_box::FaceBox;
    use crate::video::domain::frame_source::LatestFrame;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct CountingSource {
        frame: Option<Frame>,
        pulls: AtomicUsize,
    }

    impl FrameSource for CountingSource {
        fn latest_frame(&self) -> Option<Frame> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            self.frame.clone()
        }
    }

    fn face(size: i32, scores: &[(Expression, f64)]) -> FaceAnalysis {
        FaceAnalysis {
            bbox: FaceBox::new(0, 0, size, size),
            confidence: 0.9,
            landmarks: None,
            expressions: ExpressionScores::from_pairs(scores.iter().copied()),
        }
    }

    fn ready_slot(faces: Vec<FaceAnalysis>) -> Arc<AnalyzerSlot> {
        let slot = Arc::new(AnalyzerSlot::new());
        slot.install(analyzer(move |_| Ok(faces.clone())));
        slot
    }

    fn frame_source() -> Arc<LatestFrame> {
        let source = Arc::new(LatestFrame::new());
        source.publish(Frame::filled(64, 48, [0, 0, 0], 0));
        source
    }

    #[test]
    fn test_tick_before_readiness_does_nothing() {
        let source = Arc::new(CountingSource {
            frame: Some(Frame::filled(4, 4, [0, 0, 0], 0)),
            pulls: AtomicUsize::new(0),
        });
        let mut poller = ExpressionPoller::new(
            Arc::new(AnalyzerSlot::new()),
            source.clone(),
            MoodReducer::default(),
        );

        assert!(matches!(poller.tick(), TickOutcome::NotReady));
        assert!(matches!(poller.tick(), TickOutcome::NotReady));
        assert_eq!(source.pulls.load(Ordering::SeqCst), 0);
        assert_eq!(poller.state().label(), MoodLabel::Pending);
    }

    #[test]
    fn test_tick_without_frame_is_noop() {
        let mut poller =
            ExpressionPoller::new(ready_slot(vec![]), Arc::new(LatestFrame::new()), MoodReducer::default());
        assert!(matches!(poller.tick(), TickOutcome::NoFrame));
        assert_eq!(poller.state().label(), MoodLabel::Pending);
    }

    #[test]
    fn test_zero_faces_sets_no_face_sentinel() {
        let mut poller = ExpressionPoller::new(ready_slot(vec![]), frame_source(), MoodReducer::default());

        let TickOutcome::Updated(report) = poller.tick() else {
            panic!("expected an update");
        };
        assert_eq!(report.snapshot.label, MoodLabel::NoFace);
        assert_eq!(report.snapshot.text, "No face detected");
        assert_eq!(report.snapshot.color, DEFAULT_BACKGROUND);
        assert_eq!(report.snapshot.face_count, 0);
        assert!(report.overlay.is_empty());
    }

    #[test]
    fn test_single_happy_face() {
        let faces = vec![face(20, &[(Expression::Happy, 0.92), (Expression::Neutral, 0.05)])];
        let mut poller = ExpressionPoller::new(ready_slot(faces), frame_source(), MoodReducer::default());

        let TickOutcome::Updated(report) = poller.tick() else {
            panic!("expected an update");
        };
        assert_eq!(report.snapshot.text, "Happy \u{1F60A}");
        assert_eq!(report.snapshot.color.hex(), "#2e7d32");
        assert_eq!((report.overlay.width(), report.overlay.height()), (64, 48));
        assert_eq!(poller.state().current(), &report.snapshot);
    }

    #[test]
    fn test_first_face_decides_label() {
        let faces = vec![
            face(10, &[(Expression::Sad, 0.8)]),
            face(40, &[(Expression::Happy, 0.99)]),
        ];
        let mut poller = ExpressionPoller::new(ready_slot(faces), frame_source(), MoodReducer::default());
        poller.tick();
        assert_eq!(poller.state().label(), MoodLabel::Detected(Expression::Sad));
    }

    #[test]
    fn test_largest_selection_decides_label() {
        let faces = vec![
            face(10, &[(Expression::Sad, 0.8)]),
            face(40, &[(Expression::Happy, 0.99)]),
        ];
        let mut poller = ExpressionPoller::new(
            ready_slot(faces),
            frame_source(),
            MoodReducer::new(FaceSelection::Largest),
        );
        poller.tick();
        assert_eq!(poller.state().label(), MoodLabel::Detected(Expression::Happy));
    }

    #[test]
    fn test_tie_goes_to_first_category() {
        let faces = vec![face(10, &[(Expression::Surprised, 0.5), (Expression::Happy, 0.5)])];
        let mut poller = ExpressionPoller::new(ready_slot(faces), frame_source(), MoodReducer::default());
        poller.tick();
        assert_eq!(poller.state().label(), MoodLabel::Detected(Expression::Happy));
    }

    #[test]
    fn test_failure_leaves_state_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slot = Arc::new(AnalyzerSlot::new());
        slot.install(analyzer(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![face(10, &[(Expression::Angry, 0.7)])])
            } else {
                Err("inference backend lost".into())
            }
        }));
        let mut poller = ExpressionPoller::new(slot, frame_source(), MoodReducer::default());

        poller.tick();
        let before = poller.state().current().clone();
        match poller.tick() {
            TickOutcome::Failed(message) => assert!(message.contains("backend lost")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(poller.state().current(), &before);
        assert_eq!(poller.ticks(), 2);
    }

    #[test]
    fn test_logger_sees_every_tick() {
        let slot = Arc::new(AnalyzerSlot::new());
        let source = frame_source();
        let mut poller = ExpressionPoller::new(slot.clone(), source, MoodReducer::default())
            .with_logger(Box::new(SummaryTickLogger::new()));

        poller.tick();
        slot.install(analyzer(|_| Ok(vec![])));
        poller.tick();

        let summary = poller.logger().summary_string().unwrap();
        assert!(summary.contains("2 ticks"));
        assert!(summary.contains("1 analyzed, 1 idle"));
        assert!(summary.contains("No face detected: 1"));
    }

    #[test]
    fn test_handle_publishes_ticks() {
        let faces = vec![face(10, &[(Expression::Surprised, 0.9)])];
        let poller = ExpressionPoller::new(ready_slot(faces), frame_source(), MoodReducer::default());
        let mut handle = PollerHandle::spawn(poller, Duration::from_millis(10)).unwrap();

        let message = handle
            .messages()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        match message {
            PollerMessage::Tick(report) => {
                assert_eq!(report.snapshot.label, MoodLabel::Detected(Expression::Surprised));
            }
            other => panic!("unexpected {other:?}"),
        }
        handle.stop();
        assert!(!handle.is_running());
        assert_eq!(
            handle.final_state().map(|s| s.label),
            Some(MoodLabel::Detected(Expression::Surprised))
        );
    }

    #[test]
    fn test_handle_reports_failures() {
        let slot = Arc::new(AnalyzerSlot::new());
        slot.install(analyzer(|_| Err("boom".into())));
        let poller = ExpressionPoller::new(slot, frame_source(), MoodReducer::default());
        let handle = PollerHandle::spawn(poller, Duration::from_millis(10)).unwrap();

        match handle.messages().recv_timeout(Duration::from_secs(5)).unwrap() {
            PollerMessage::Failed { tick, message } => {
                assert!(tick >= 1);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_analysis_after_stop() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let slot = Arc::new(AnalyzerSlot::new());
        slot.install(analyzer(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(vec![])
        }));
        let poller = ExpressionPoller::new(slot, frame_source(), MoodReducer::default());
        let mut handle = PollerHandle::spawn(poller, Duration::from_millis(5)).unwrap();
        let messages = handle.messages();

        messages.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.stop();
        let after_stop = *calls.lock().unwrap();
        let published: usize = messages.try_iter().count();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(*calls.lock().unwrap(), after_stop);
        assert_eq!(messages.try_iter().count(), 0);
        assert!(published <= after_stop);
        assert!(messages.recv_timeout(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_unread_messages_do_not_pile_up() {
        let faces = vec![face(10, &[(Expression::Happy, 0.9)])];
        let poller = ExpressionPoller::new(ready_slot(faces), frame_source(), MoodReducer::default());
        let mut handle = PollerHandle::spawn(poller, Duration::from_millis(5)).unwrap();
        let messages = handle.messages();

        thread::sleep(Duration::from_millis(150));
        handle.stop();

        assert!(messages.len() <= 1);
        let ticks = match messages.try_recv() {
            Ok(PollerMessage::Tick(report)) => report.snapshot.tick,
            other => panic!("expected the latest report, got {other:?}"),
        };
        assert!(ticks > 1, "older reports were replaced by newer ones");
    }

    #[test]
    fn test_slow_ticks_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(AnalyzerSlot::new());
        {
            let (active, max_active, calls) = (active.clone(), max_active.clone(), calls.clone());
            slot.install(analyzer(move |_| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![])
            }));
        }
        let poller = ExpressionPoller::new(slot, frame_source(), MoodReducer::default());
        let mut handle = PollerHandle::spawn(poller, Duration::from_millis(10)).unwrap();

        thread::sleep(Duration::from_millis(300));
        handle.stop();

        let calls = calls.load(Ordering::SeqCst);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        // One call per 30ms analysis, not one per 10ms interval.
        assert!(calls >= 3, "too few ticks: {calls}");
        assert!(calls <= 14, "missed ticks were not coalesced: {calls}");
    }

    #[test]
    fn test_stop_is_idempotent() {
        let poller = ExpressionPoller::new(
            Arc::new(AnalyzerSlot::new()),
            frame_source(),
            MoodReducer::default(),
        );
        let mut handle = PollerHandle::spawn(poller, Duration::from_millis(5)).unwrap();
        handle.stop();
        handle.stop();
        assert!(handle.final_state().is_some());
    }

    #[test]
    fn test_idle_poller_publishes_nothing() {
        let poller = ExpressionPoller::new(
            Arc::new(AnalyzerSlot::new()),
            frame_source(),
            MoodReducer::default(),
        );
        let mut handle = PollerHandle::spawn(poller, Duration::from_millis(5)).unwrap();
        assert!(handle
            .messages()
            .recv_timeout(Duration::from_millis(60))
            .is_err());
        handle.stop();
        assert_eq!(handle.final_state().map(|s| s.label), Some(MoodLabel::Pending));
    }
}
