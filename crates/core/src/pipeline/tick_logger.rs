use std::collections::HashMap;
use std::time::Instant;

use crate::expression::domain::mood::MoodLabel;

/// What a tick ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// Models not ready or no frame yet; nothing was analyzed.
    Idle,
    Analyzed,
    Failed,
}

/// Observer for poller activity.
///
/// Keeps timing and label bookkeeping out of the poller so the CLI can print
/// a summary and tests can stay silent.
pub trait TickLogger: Send {
    fn tick(&mut self, kind: TickKind);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record the label produced by an analyzed tick.
    fn label(&mut self, label: MoodLabel, face_count: usize);

    fn summary_string(&self) -> Option<String> {
        None
    }

    /// Emit an end-of-run summary. Default: log `summary_string`, if any.
    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

pub struct NullTickLogger;

impl TickLogger for NullTickLogger {
    fn tick(&mut self, _kind: TickKind) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn label(&mut self, _label: MoodLabel, _face_count: usize) {}
}

/// Collects per-stage timings, tick outcomes and label counts for a
/// summary report at shutdown.
pub struct SummaryTickLogger {
    timings: HashMap<String, Vec<f64>>,
    kinds: HashMap<TickKind, usize>,
    labels: HashMap<MoodLabel, usize>,
    faces_seen: usize,
    start_time: Instant,
}

impl SummaryTickLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            kinds: HashMap::new(),
            labels: HashMap::new(),
            faces_seen: 0,
            start_time: Instant::now(),
        }
    }

    pub fn count(&self, kind: TickKind) -> usize {
        self.kinds.get(&kind).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    fn total_ticks(&self) -> usize {
        self.kinds.values().sum()
    }
}

impl Default for SummaryTickLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TickLogger for SummaryTickLogger {
    fn tick(&mut self, kind: TickKind) {
        *self.kinds.entry(kind).or_default() += 1;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn label(&mut self, label: MoodLabel, face_count: usize) {
        *self.labels.entry(label).or_default() += 1;
        self.faces_seen += face_count;
    }

    fn summary_string(&self) -> Option<String> {
        let total = self.total_ticks();
        if total == 0 {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let analyzed = self.count(TickKind::Analyzed);
        let mut lines = vec![format!(
            "Detector summary ({total} ticks in {elapsed:.1}s: {analyzed} analyzed, {} idle, {} failed):",
            self.count(TickKind::Idle),
            self.count(TickKind::Failed),
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        if analyzed > 0 {
            let avg_faces = self.faces_seen as f64 / analyzed as f64;
            lines.push(format!("  faces per tick: avg {avg_faces:.1}"));
        }

        let mut labels: Vec<_> = self.labels.iter().collect();
        labels.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.text().cmp(b.0.text())));
        for (label, count) in labels {
            lines.push(format!("  {}: {count}", label.text()));
        }

        Some(lines.join("\n"))
    }
}
