use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for batch orchestration events.
///
/// Keeps the use cases independent of where progress goes (stdout through
/// `log`, or nowhere). Only the batch coordinator calls it, so
/// implementations need not be `Sync`.
pub trait PipelineLogger: Send {
    /// `current` images of `total` are finished.
    fn progress(&mut self, current: usize, total: usize);

    /// How long one stage took on one image.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Image `index` fell back to its original.
    fn fallback(&mut self, index: usize, reason: &str);

    fn info(&mut self, message: &str);

    /// End-of-batch report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. For library callers with their own progress UI and
/// for tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn fallback(&mut self, _index: usize, _reason: &str) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StageStats {
    runs: usize,
    total_ms: f64,
    max_ms: f64,
}

impl StageStats {
    fn record(&mut self, ms: f64) {
        self.runs += 1;
        self.total_ms += ms;
        self.max_ms = self.max_ms.max(ms);
    }

    fn average_ms(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.total_ms / self.runs as f64
        }
    }
}

/// CLI logger: progress lines through `log`, per-stage timing aggregates and
/// a summary at the end of the batch.
///
/// Progress is printed every `throttle` images and on the last one.
pub struct StdoutPipelineLogger {
    throttle: usize,
    stages: BTreeMap<String, StageStats>,
    fallbacks: Vec<(usize, String)>,
    start_time: Instant,
    total_images: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: throttle.max(1),
            stages: BTreeMap::new(),
            fallbacks: Vec::new(),
            start_time: Instant::now(),
            total_images: 0,
        }
    }

    /// Formatted summary, or `None` before any stage has been timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.fallbacks.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Batch summary ({} images, {elapsed_s:.1}s total):",
            self.total_images
        )];
        for (stage, stats) in &self.stages {
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  max {:6.1}ms  ({} runs)",
                stats.average_ms(),
                stats.max_ms,
                stats.runs
            ));
        }
        if !self.fallbacks.is_empty() {
            lines.push(format!("  Fallbacks: {}", self.fallbacks.len()));
        }
        if self.total_images > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.2} images/s",
                self.total_images as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn average_ms(&self, stage: &str) -> Option<f64> {
        self.stages.get(stage).map(StageStats::average_ms)
    }

    pub fn runs(&self, stage: &str) -> usize {
        self.stages.get(stage).map_or(0, |s| s.runs)
    }

    pub fn fallbacks(&self) -> &[(usize, String)] {
        &self.fallbacks
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_images = total;
        if total > 0 && (current % self.throttle == 0 || current == total) {
            log::info!("Enhanced {current}/{total} images");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn fallback(&mut self, index: usize, reason: &str) {
        log::warn!("Image {index} kept unenhanced: {reason}");
        self.fallbacks.push((index, reason.to_string()));
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
