use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::correction::domain::background_analyzer::BackgroundAnalyzer;
use crate::correction::domain::bounding_cropper::BoundingCropper;
use crate::correction::domain::glare_suppressor::GlareSuppressor;
use crate::correction::domain::orientation_normalizer::OrientationNormalizer;
use crate::correction::domain::tone_corrector::ToneCorrector;
use crate::detection::domain::detection_cache::DetectionCache;
use crate::detection::domain::region_locator::RegionLocator;
use crate::framing::domain::aspect_ratio_framer::{AspectRatioFramer, DEFAULT_ZOOM};
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::enhancement_config::{ConfigError, EnhancementConfig};
use crate::shared::enhancement_result::{EnhancementMetadata, EnhancementResult};
use crate::shared::raw_image::RawImage;

/// One image's result plus per-stage wall-clock timings in milliseconds.
#[derive(Clone, Debug)]
pub struct ImageRun {
    pub result: EnhancementResult,
    pub timings: Vec<(&'static str, f64)>,
}

/// Single-image pipeline:
/// check → orient → [locate document → crop] → [locate face] →
/// [background + tone] → [glare] → [frame].
///
/// Stages a config turns off are skipped entirely, so an all-off config
/// returns a copy of the input.
pub struct EnhanceImageUseCase {
    locator: RegionLocator,
    cancelled: Arc<AtomicBool>,
}

impl EnhanceImageUseCase {
    pub fn new(locator: RegionLocator) -> Self {
        Self {
            locator,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Checked between stages; also handed to the locator.
    pub fn with_cancellation(self, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            locator: self.locator.with_cancellation(cancelled.clone()),
            cancelled,
        }
    }

    /// Validates `config`, runs the pipeline with a private cache, and falls
    /// back to the original on any per-image failure.
    pub fn enhance(
        &self,
        image: &RawImage,
        config: &EnhancementConfig,
    ) -> Result<EnhancementResult, ConfigError> {
        config.validate()?;
        let cache = DetectionCache::new();
        Ok(match self.execute(image, config, &cache) {
            Ok(run) => run.result,
            Err(e) => {
                log::warn!("Enhancement failed, keeping original: {e}");
                EnhancementResult::fallback(image.clone())
            }
        })
    }

    /// Runs the pipeline on one image. `config` must already be validated.
    pub fn execute(
        &self,
        image: &RawImage,
        config: &EnhancementConfig,
        cache: &DetectionCache,
    ) -> Result<ImageRun, PipelineError> {
        image.check()?;
        let mut timings = Vec::new();

        let oriented = timed(&mut timings, "orient", || {
            OrientationNormalizer::new(config.auto_rotate).normalize(image)
        });
        let mut current = oriented.image;

        if config.edge_crop {
            self.check_cancelled()?;
            let document = timed(&mut timings, "locate_doc", || {
                self.locator.locate_document(&current, cache)
            });
            match timed(&mut timings, "crop", || BoundingCropper.crop(&current, &document)) {
                Ok(cropped) => current = cropped,
                Err(PipelineError::DegenerateGeometry(reason)) => {
                    log::warn!("Skipping document crop: {reason}");
                }
                Err(e) => return Err(e),
            }
        }

        let face = if config.needs_face() {
            self.check_cancelled()?;
            timed(&mut timings, "locate_face", || self.locator.locate_face(&current, cache))
        } else {
            None
        };

        let mut background = None;
        if config.detect_background {
            self.check_cancelled()?;
            background = timed(&mut timings, "background", || BackgroundAnalyzer.analyze(&current));
            let corrector = ToneCorrector::new(config.contrast_factor, config.saturation_boost);
            current = timed(&mut timings, "tone", || corrector.correct(&current));
        }

        if config.remove_glare {
            self.check_cancelled()?;
            let suppressor = GlareSuppressor::new(config.glare_threshold);
            current = timed(&mut timings, "glare", || suppressor.suppress(&current));
        }

        let mut zoom = DEFAULT_ZOOM;
        let mut region_center = face.as_ref().map(|f| f.region.center());
        if config.auto_zoom {
            self.check_cancelled()?;
            let framer = AspectRatioFramer::new(config.target_aspect_ratio, config.center_face);
            match timed(&mut timings, "frame", || framer.frame(&current, face.as_ref())) {
                Ok(outcome) => {
                    current = outcome.image;
                    zoom = outcome.zoom;
                    region_center = outcome.region_center;
                }
                Err(PipelineError::DegenerateGeometry(reason)) => {
                    log::warn!("Skipping framing: {reason}");
                }
                Err(e) => return Err(e),
            }
        }

        // A region the framed window cut away is not reported.
        let region_origin = region_center.and(face.as_ref().map(|f| f.origin));
        let metadata = EnhancementMetadata {
            width: current.width(),
            height: current.height(),
            aspect_ratio: current.aspect_ratio(),
            rotation: oriented.rotation,
            region_detected: region_origin.is_some(),
            region_center,
            region_origin,
            background,
            zoom,
            fallback: false,
        };
        Ok(ImageRun {
            result: EnhancementResult {
                original: image.clone(),
                enhanced: current,
                metadata,
            },
            timings,
        })
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancelled.load(Ordering::Relaxed) {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn timed<T>(timings: &mut Vec<(&'static str, f64)>, stage: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    timings.push((stage, start.elapsed().as_secs_f64() * 1000.0));
    out
}
