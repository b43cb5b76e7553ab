use std::sync::atomic::AtomicBool;

use crate::detection::domain::detection_cache::DetectionCache;
use crate::pipeline::enhance_image_use_case::EnhanceImageUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::enhancement_config::EnhancementConfig;
use crate::shared::enhancement_result::EnhancementResult;
use crate::shared::raw_image::RawImage;

/// Everything one batch run shares across its images.
pub struct BatchJob<'a> {
    pub images: &'a [RawImage],
    pub use_case: &'a EnhanceImageUseCase,
    pub config: &'a EnhancementConfig,
    pub cache: &'a DetectionCache,
    pub cancelled: &'a AtomicBool,
}

/// Abstracts how the images of a batch are scheduled.
///
/// Returns one slot per input, in input order. A slot is `None` only when the
/// image was never finished because the batch was cancelled. Failed images
/// come back as fallback results, never as missing slots.
pub trait BatchExecutor: Send + Sync {
    fn execute(
        &self,
        job: BatchJob<'_>,
        logger: &mut dyn PipelineLogger,
    ) -> Vec<Option<EnhancementResult>>;
}
