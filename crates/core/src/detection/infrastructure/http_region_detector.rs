use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::domain::detection::{Detection, DetectionMode};
use crate::detection::domain::detection_payload::DetectionPayload;
use crate::detection::domain::region_detector::{DetectionError, RegionDetector};
use crate::shared::region_box::{Point, RegionBox};

/// Fewer vertices than this is not a document polygon.
const MIN_DOCUMENT_VERTICES: usize = 4;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest {
    image_base64: String,
    mode: DetectionMode,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    face: Option<RegionBox>,
    #[serde(default)]
    document: Option<DocumentBody>,
}

#[derive(Deserialize)]
struct DocumentBody {
    vertices: Vec<Point>,
}

/// Remote region detection over HTTP.
///
/// `POST <endpoint>` with `{"imageBase64": ..., "mode": "face" | "document"}`.
/// The service answers `{"face": {left, top, width, height}}` or
/// `{"document": {"vertices": [{x, y}, ...]}}`, in the payload's pixel space.
pub struct HttpRegionDetector {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpRegionDetector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DetectionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectionError::Transport(Box::new(e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RegionDetector for HttpRegionDetector {
    fn detect(
        &self,
        payload: &DetectionPayload,
        mode: DetectionMode,
    ) -> Result<Option<Detection>, DetectionError> {
        let request = DetectRequest {
            image_base64: payload.to_base64(),
            mode,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| DetectionError::Transport(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectionError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .map_err(|e| DetectionError::Transport(Box::new(e)))?;
        parse_response(&body, mode)
    }
}

/// Extracts the answer for `mode`; a well-formed body without one is `Ok(None)`.
pub fn parse_response(body: &str, mode: DetectionMode) -> Result<Option<Detection>, DetectionError> {
    let response: DetectResponse =
        serde_json::from_str(body).map_err(|e| DetectionError::Malformed(e.to_string()))?;
    Ok(match mode {
        DetectionMode::Face => response.face.map(Detection::Face),
        DetectionMode::Document => response
            .document
            .filter(|doc| doc.vertices.len() >= MIN_DOCUMENT_VERTICES)
            .map(|doc| Detection::Document(doc.vertices)),
    })
}
