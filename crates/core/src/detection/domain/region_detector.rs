use thiserror::Error;

use crate::detection::domain::detection::{Detection, DetectionMode};
use crate::detection::domain::detection_payload::DetectionPayload;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("detector request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("detector returned HTTP {0}")]
    Status(u16),
    #[error("malformed detector response: {0}")]
    Malformed(String),
    #[error("failed to encode detection payload: {0}")]
    Encode(String),
}

/// Domain interface for a region detection service.
///
/// Coordinates in the answer are in the payload's (downsampled) pixel space.
/// `Ok(None)` means the service answered but found nothing.
///
/// Shared by every batch worker, hence `&self` and `Sync`.
pub trait RegionDetector: Send + Sync {
    fn detect(
        &self,
        payload: &DetectionPayload,
        mode: DetectionMode,
    ) -> Result<Option<Detection>, DetectionError>;
}
