use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::detection_cache::DetectionCache;
use crate::detection::domain::region_detector::RegionDetector;
use crate::detection::domain::region_locator::RegionLocator;
use crate::pipeline::batch_executor::{BatchExecutor, BatchJob};
use crate::pipeline::enhance_image_use_case::EnhanceImageUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::enhancement_config::{ConfigError, EnhancementConfig};
use crate::shared::enhancement_result::EnhancementResult;
use crate::shared::raw_image::RawImage;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Carries every image that finished before cancellation, by input index.
    #[error("batch cancelled after {} of {total} images", .completed.len())]
    Cancelled {
        completed: Vec<(usize, EnhancementResult)>,
        total: usize,
    },
}

/// Enhances a set of images under one configuration.
///
/// Validates the config before touching any image, creates the
/// request-scoped detection cache and hands the work to the executor.
/// Results come back in input order; a failing image becomes a fallback
/// result rather than failing the batch.
pub struct EnhanceBatchUseCase {
    remote: Option<Arc<dyn RegionDetector>>,
    executor: Box<dyn BatchExecutor>,
}

impl EnhanceBatchUseCase {
    pub fn new(remote: Option<Arc<dyn RegionDetector>>, executor: Box<dyn BatchExecutor>) -> Self {
        Self { remote, executor }
    }

    pub fn execute(
        &self,
        images: Vec<RawImage>,
        config: &EnhancementConfig,
        cancelled: Arc<AtomicBool>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<EnhancementResult>, BatchError> {
        config.validate()?;
        let total = images.len();
        logger.info(&format!("Enhancing {total} images"));

        let cache = DetectionCache::new();
        let use_case = EnhanceImageUseCase::new(RegionLocator::new(self.remote.clone()))
            .with_cancellation(cancelled.clone());

        let slots = self.executor.execute(
            BatchJob {
                images: &images,
                use_case: &use_case,
                config,
                cache: &cache,
                cancelled: &cancelled,
            },
            logger,
        );
        log::debug!("Detection cache held {} entries", cache.len());
        logger.summary();

        if cancelled.load(Ordering::Relaxed) && slots.iter().any(Option::is_none) {
            let completed: Vec<_> = slots
                .into_iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.map(|r| (i, r)))
                .collect();
            log::info!("Batch cancelled with {} of {total} images done", completed.len());
            return Err(BatchError::Cancelled { completed, total });
        }

        Ok(slots
            .into_iter()
            .zip(images)
            .enumerate()
            .map(|(i, (slot, image))| {
                slot.unwrap_or_else(|| {
                    log::warn!("Image {i} produced no result, keeping original");
                    EnhancementResult::fallback(image)
                })
            })
            .collect())
    }
}
