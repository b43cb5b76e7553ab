use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::batch_executor::{BatchExecutor, BatchJob};
use crate::pipeline::enhance_image_use_case::ImageRun;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::MAX_BATCH_WORKERS;
use crate::shared::enhancement_result::EnhancementResult;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

struct Finished {
    index: usize,
    outcome: Result<ImageRun, PipelineError>,
}

/// Runs a batch on a fixed pool of scoped worker threads.
///
/// Layout: `feeder → [worker × N] → collector (calling thread)`
///
/// The feeder hands out indices over a bounded channel and stops once
/// cancellation is requested; workers finish the image they hold. All threads
/// are joined before `execute` returns. A panic inside a stage is caught on
/// the worker and turns that image into a fallback.
pub struct ThreadedBatchExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedBatchExecutor {
    /// `workers` is clamped to `1..=MAX_BATCH_WORKERS`.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.clamp(1, MAX_BATCH_WORKERS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(available)
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        job: BatchJob<'_>,
        logger: &mut dyn PipelineLogger,
    ) -> Vec<Option<EnhancementResult>> {
        let total = job.images.len();
        let mut slots: Vec<Option<EnhancementResult>> = (0..total).map(|_| None).collect();
        if total == 0 {
            return slots;
        }

        let (index_tx, index_rx) = crossbeam_channel::bounded::<usize>(self.channel_capacity);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<Finished>(self.channel_capacity);
        let job = &job;

        std::thread::scope(|s| {
            for _ in 0..self.workers.min(total) {
                let index_rx = index_rx.clone();
                let done_tx = done_tx.clone();
                s.spawn(move || run_worker(job, index_rx, done_tx));
            }
            drop(index_rx);
            drop(done_tx);

            s.spawn(move || {
                for index in 0..total {
                    if job.cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    if index_tx.send(index).is_err() {
                        break;
                    }
                }
            });

            let mut finished = 0usize;
            for Finished { index, outcome } in done_rx {
                finished += 1;
                slots[index] = settle(job, index, outcome, logger);
                logger.progress(finished, total);
            }
        });

        slots
    }
}

fn run_worker(job: &BatchJob<'_>, index_rx: Receiver<usize>, done_tx: Sender<Finished>) {
    for index in index_rx {
        if job.cancelled.load(Ordering::Relaxed) {
            break;
        }
        let image = &job.images[index];
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            job.use_case.execute(image, job.config, job.cache)
        }))
        .unwrap_or_else(|payload| Err(PipelineError::StagePanicked(panic_message(&*payload))));
        if done_tx.send(Finished { index, outcome }).is_err() {
            break;
        }
    }
}

fn settle(
    job: &BatchJob<'_>,
    index: usize,
    outcome: Result<ImageRun, PipelineError>,
    logger: &mut dyn PipelineLogger,
) -> Option<EnhancementResult> {
    match outcome {
        Ok(run) => {
            for (stage, ms) in &run.timings {
                logger.timing(stage, *ms);
            }
            Some(run.result)
        }
        Err(PipelineError::Cancelled) => None,
        Err(e) => {
            logger.fallback(index, &e.to_string());
            Some(EnhancementResult::fallback(job.images[index].clone()))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
