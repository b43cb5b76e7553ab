use ndarray::ArrayView3;

use crate::pipeline::pipeline_error::PipelineError;

/// Interleaved channels per pixel (RGBA, non-premultiplied alpha).
pub const CHANNELS: usize = 4;

/// An RGBA8 pixel buffer in row-major order.
///
/// Stages never mutate their input: each takes `&RawImage` and returns a new
/// buffer. Construction does not validate the buffer length, so a caller can
/// hand the pipeline bytes that do not describe a `width x height` image;
/// [`RawImage::check`] reports that as a decode failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl RawImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// A well-formed image where every pixel has the same value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(data, width, height)
    }

    pub fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    /// Copies the buffer into an `image` crate buffer, or `None` if malformed.
    pub fn to_rgba(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True for zero-area images.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `width / height`, or 0.0 for zero-height images.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * CHANNELS
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.expected_len()
    }

    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_well_formed() {
            Ok(())
        } else {
            Err(PipelineError::DecodeFailure {
                width: self.width,
                height: self.height,
                expected: self.expected_len(),
                actual: self.data.len(),
            })
        }
    }

    /// Iterates pixels as `[r, g, b, a]` slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(CHANNELS)
    }

    /// Pixel at `(x, y)`. The image must be well-formed and the coordinate in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// `(height, width, channels)` view, or `None` if the buffer is malformed.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    /// Copies the `width x height` rectangle at `(left, top)` into a new image.
    ///
    /// Returns `None` if the rectangle leaves the image or the buffer is malformed.
    pub fn crop(&self, left: u32, top: u32, width: u32, height: u32) -> Option<RawImage> {
        if !self.is_well_formed()
            || left.checked_add(width)? > self.width
            || top.checked_add(height)? > self.height
        {
            return None;
        }
        let row_len = width as usize * CHANNELS;
        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in top..top + height {
            let start = ((row as usize) * (self.width as usize) + left as usize) * CHANNELS;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Some(RawImage::new(data, width, height))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
