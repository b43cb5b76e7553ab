use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detection::domain::detection::{Detection, DetectionMode};
use crate::detection::domain::detection_cache::DetectionCache;
use crate::detection::domain::detection_payload::DetectionPayload;
use crate::detection::domain::heuristic_face_scanner::HeuristicFaceScanner;
use crate::detection::domain::region_detector::RegionDetector;
use crate::shared::enhancement_result::RegionOrigin;
use crate::shared::raw_image::RawImage;
use crate::shared::region_box::{Point, RegionBox};

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLocation {
    pub region: RegionBox,
    /// Region centre as percentages of image width and height.
    pub center_pct: (f64, f64),
    /// Region height over image height.
    pub height_ratio: f64,
    pub origin: RegionOrigin,
}

impl FaceLocation {
    /// Derives the normalized centre and height ratio from `image`'s size.
    pub fn new(region: RegionBox, image: &RawImage, origin: RegionOrigin) -> Self {
        let (w, h) = (image.width() as f64, image.height() as f64);
        let (cx, cy) = region.center();
        Self {
            region,
            center_pct: (cx / w * 100.0, cy / h * 100.0),
            height_ratio: region.height / h,
            origin,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentLocation {
    pub bounds: RegionBox,
    pub vertices: Vec<Point>,
    /// `None` when no polygon was found and the whole image stands in.
    pub origin: Option<RegionOrigin>,
}

impl DocumentLocation {
    pub fn full_image(image: &RawImage) -> Self {
        let (w, h) = (image.width() as f64, image.height() as f64);
        Self {
            bounds: RegionBox::full(image.width(), image.height()),
            vertices: vec![
                Point::new(0.0, 0.0),
                Point::new(w, 0.0),
                Point::new(w, h),
                Point::new(0.0, h),
            ],
            origin: None,
        }
    }
}

/// Finds the subject of an image.
///
/// A valid remote answer always wins. The heuristic scanner is consulted
/// only when the remote is absent, fails, finds nothing, or answers with a
/// region outside the image. Remote failures are logged and never raised.
pub struct RegionLocator {
    remote: Option<Arc<dyn RegionDetector>>,
    scanner: HeuristicFaceScanner,
    cancelled: Arc<AtomicBool>,
}

impl RegionLocator {
    pub fn new(remote: Option<Arc<dyn RegionDetector>>) -> Self {
        Self {
            remote,
            scanner: HeuristicFaceScanner,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn heuristic_only() -> Self {
        Self::new(None)
    }

    /// Remote answers that arrive after `cancelled` is set are dropped uncached.
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn locate_face(&self, image: &RawImage, cache: &DetectionCache) -> Option<FaceLocation> {
        let (w, h) = (image.width(), image.height());
        match self.query_remote(image, DetectionMode::Face, cache) {
            Some(Detection::Face(region)) => match region.validated(w, h) {
                Some(region) => return Some(FaceLocation::new(region, image, RegionOrigin::Remote)),
                None => log::warn!("Discarding remote face {region:?} outside {w}x{h} image"),
            },
            Some(other) => log::warn!("Remote face query answered {:?}", other.mode()),
            None => {}
        }
        self.scanner
            .scan(image)
            .map(|region| FaceLocation::new(region, image, RegionOrigin::Heuristic))
    }

    /// Never fails: without a usable polygon the whole image is the document.
    pub fn locate_document(&self, image: &RawImage, cache: &DetectionCache) -> DocumentLocation {
        let (w, h) = (image.width(), image.height());
        if let Some(Detection::Document(vertices)) =
            self.query_remote(image, DetectionMode::Document, cache)
        {
            match RegionBox::bounding(&vertices).and_then(|b| b.validated(w, h)) {
                Some(bounds) => {
                    return DocumentLocation {
                        bounds,
                        vertices,
                        origin: Some(RegionOrigin::Remote),
                    }
                }
                None => log::warn!("Discarding remote document polygon outside {w}x{h} image"),
            }
        }
        DocumentLocation::full_image(image)
    }

    /// Remote answer in source coordinates, through the cache.
    fn query_remote(
        &self,
        image: &RawImage,
        mode: DetectionMode,
        cache: &DetectionCache,
    ) -> Option<Detection> {
        let remote = self.remote.as_ref()?;
        let payload = match DetectionPayload::encode(image) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Skipping remote {mode:?} detection: {e}");
                return None;
            }
        };
        let to_source = |d: Detection| d.scaled(payload.scale_x(), payload.scale_y());

        let answer = cache.get_or_fetch(payload.hash(), mode, || {
            if self.cancelled.load(Ordering::Relaxed) {
                return None;
            }
            let answer = match remote.detect(&payload, mode) {
                Ok(answer) => answer.filter(|d| d.mode() == mode),
                Err(e) => {
                    log::warn!("Remote {mode:?} detection failed: {e}");
                    None
                }
            };
            if self.cancelled.load(Ordering::Relaxed) {
                log::debug!("Dropping remote {mode:?} answer after cancellation");
                return None;
            }
            Some(answer)
        });
        answer.flatten().map(to_source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::region_detector::DetectionError;
    use std::sync::Mutex;

    // ── Stubs ────────────────────────────────────────────────────────

    struct StubDetector {
        answer: Option<Detection>,
        fail: bool,
        calls: Arc<Mutex<Vec<DetectionMode>>>,
        cancel_on_call: Option<Arc<AtomicBool>>,
    }

    impl StubDetector {
        fn answering(answer: Option<Detection>) -> Self {
            Self {
                answer,
                fail: false,
                calls: Arc::new(Mutex::new(Vec::new())),
                cancel_on_call: None,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::answering(None)
            }
        }
    }

    impl RegionDetector for StubDetector {
        fn detect(
            &self,
            _payload: &DetectionPayload,
            mode: DetectionMode,
        ) -> Result<Option<Detection>, DetectionError> {
            self.calls.lock().unwrap().push(mode);
            if let Some(flag) = &self.cancel_on_call {
                flag.store(true, Ordering::Relaxed);
            }
            if self.fail {
                return Err(DetectionError::Status(503));
            }
            Ok(self.answer.clone())
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Dark image with one bright square, which the heuristic picks up.
    fn lit_image() -> RawImage {
        let (w, h) = (540u32, 360u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let v = if (280..320).contains(&x) && (140..180).contains(&y) {
                    240
                } else {
                    20
                };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RawImage::new(data, w, h)
    }

    fn locator(stub: StubDetector) -> RegionLocator {
        RegionLocator::new(Some(Arc::new(stub)))
    }

    // ── Face ─────────────────────────────────────────────────────────

    #[test]
    fn test_valid_remote_face_wins() {
        let remote_box = RegionBox::new(50.0, 60.0, 80.0, 90.0);
        let loc = locator(StubDetector::answering(Some(Detection::Face(remote_box))));
        let face = loc.locate_face(&lit_image(), &DetectionCache::new()).unwrap();
        assert_eq!(face.origin, RegionOrigin::Remote);
        assert_eq!(face.region, remote_box);
        assert!((face.height_ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds_remote_face_falls_back_to_heuristic() {
        let bad = RegionBox::new(500.0, 60.0, 80.0, 90.0);
        let loc = locator(StubDetector::answering(Some(Detection::Face(bad))));
        let face = loc.locate_face(&lit_image(), &DetectionCache::new()).unwrap();
        assert_eq!(face.origin, RegionOrigin::Heuristic);
    }

    #[test]
    fn test_remote_failure_falls_back_to_heuristic() {
        let loc = locator(StubDetector::failing());
        let face = loc.locate_face(&lit_image(), &DetectionCache::new()).unwrap();
        assert_eq!(face.origin, RegionOrigin::Heuristic);
    }

    #[test]
    fn test_heuristic_only_on_flat_image_finds_nothing() {
        let loc = RegionLocator::heuristic_only();
        let image = RawImage::filled(300, 200, [90, 90, 90, 255]);
        assert!(loc.locate_face(&image, &DetectionCache::new()).is_none());
    }

    #[test]
    fn test_center_pct() {
        let remote_box = RegionBox::new(0.0, 0.0, 270.0, 180.0);
        let loc = locator(StubDetector::answering(Some(Detection::Face(remote_box))));
        let face = loc.locate_face(&lit_image(), &DetectionCache::new()).unwrap();
        assert!((face.center_pct.0 - 25.0).abs() < 1e-9);
        assert!((face.center_pct.1 - 25.0).abs() < 1e-9);
    }

    // ── Caching ──────────────────────────────────────────────────────

    #[test]
    fn test_same_image_queried_once_per_cache() {
        let stub = StubDetector::answering(None);
        let calls = stub.calls.clone();
        let loc = locator(stub);
        let cache = DetectionCache::new();
        let image = lit_image();

        loc.locate_face(&image, &cache);
        loc.locate_face(&image, &cache);

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_cached() {
        let stub = StubDetector::failing();
        let calls = stub.calls.clone();
        let loc = locator(stub);
        let cache = DetectionCache::new();

        loc.locate_face(&lit_image(), &cache);
        loc.locate_face(&lit_image(), &cache);

        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_modes_cached_separately() {
        let stub = StubDetector::answering(None);
        let calls = stub.calls.clone();
        let loc = locator(stub);
        let cache = DetectionCache::new();

        loc.locate_face(&lit_image(), &cache);
        loc.locate_document(&lit_image(), &cache);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![DetectionMode::Face, DetectionMode::Document]
        );
    }

    #[test]
    fn test_answer_after_cancellation_is_discarded() {
        let flag = Arc::new(AtomicBool::new(false));
        let remote_box = RegionBox::new(50.0, 60.0, 80.0, 90.0);
        let mut stub = StubDetector::answering(Some(Detection::Face(remote_box)));
        stub.cancel_on_call = Some(flag.clone());
        let loc = locator(stub).with_cancellation(flag);
        let cache = DetectionCache::new();

        let face = loc.locate_face(&lit_image(), &cache);

        assert_ne!(face.map(|f| f.origin), Some(RegionOrigin::Remote));
        assert!(cache.is_empty());
    }

    // ── Document ─────────────────────────────────────────────────────

    #[test]
    fn test_remote_document_polygon() {
        let quad = vec![
            Point::new(100.0, 50.0),
            Point::new(400.0, 50.0),
            Point::new(400.0, 300.0),
            Point::new(100.0, 300.0),
        ];
        let loc = locator(StubDetector::answering(Some(Detection::Document(quad.clone()))));
        let doc = loc.locate_document(&lit_image(), &DetectionCache::new());
        assert_eq!(doc.bounds, RegionBox::new(100.0, 50.0, 300.0, 250.0));
        assert_eq!(doc.vertices, quad);
        assert_eq!(doc.origin, Some(RegionOrigin::Remote));
    }

    #[test]
    fn test_document_outside_image_uses_full_bounds() {
        let quad = vec![
            Point::new(-10.0, 0.0),
            Point::new(400.0, 0.0),
            Point::new(400.0, 300.0),
            Point::new(-10.0, 300.0),
        ];
        let loc = locator(StubDetector::answering(Some(Detection::Document(quad))));
        let image = lit_image();
        let doc = loc.locate_document(&image, &DetectionCache::new());
        assert_eq!(doc, DocumentLocation::full_image(&image));
    }

    #[test]
    fn test_no_remote_document_is_full_image() {
        let image = lit_image();
        let doc = RegionLocator::heuristic_only().locate_document(&image, &DetectionCache::new());
        assert!(doc.bounds.covers(image.width(), image.height()));
        assert!(doc.origin.is_none());
    }

    #[test]
    fn test_wrong_mode_answer_is_ignored() {
        let loc = locator(StubDetector::answering(Some(Detection::Face(RegionBox::new(
            1.0, 1.0, 10.0, 10.0,
        )))));
        let image = lit_image();
        let doc = loc.locate_document(&image, &DetectionCache::new());
        assert!(doc.origin.is_none());
    }
}
