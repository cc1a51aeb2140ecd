/// Pixel format of a decoded [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit, 4 bytes/pixel, alpha present (order doesn't matter for
    /// inversion: only the three colour channels are touched, in whichever
    /// order they appear).
    Rgba8,
    /// 24-bit, 3 bytes/pixel, no alpha channel.
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A decoded chart image: owned pixel bytes plus the geometry needed to
/// interpret them. This is the type a "strong reference" (`Arc<Surface>`)
/// points at — cloning the `Arc` is the core's refcounted-handle contract;
/// the pixel bytes are freed once the last clone drops.
#[derive(Debug, Clone)]
pub struct Surface {
    pub width: usize,
    pub height: usize,
    /// Row width in pixels (may exceed `width` if the underlying decoder
    /// pads rows). Byte-cost accounting always treats this as 4
    /// bytes/pixel regardless of `format`.
    pub stride: usize,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl Surface {
    pub fn new(width: usize, height: usize, format: PixelFormat, bytes: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width,
            format,
            bytes,
        }
    }

    /// Byte cost this surface contributes to the LRU memory budget
    /// `stride * height * 4`, a constant 4 bytes/pixel regardless of `format`.
    pub fn byte_cost(&self) -> u64 {
        (self.stride * self.height * 4) as u64
    }
}
