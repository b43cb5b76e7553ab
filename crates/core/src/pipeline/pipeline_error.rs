use thiserror::Error;

/// Per-image failures. None of these escape a batch: each one turns the
/// affected image into a fallback result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("pixel buffer for {width}x{height} image has {actual} bytes, expected {expected}")]
    DecodeFailure {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("cancelled")]
    Cancelled,
    #[error("stage panicked: {0}")]
    StagePanicked(String),
}
