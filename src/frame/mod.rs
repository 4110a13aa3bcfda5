//! Biplanar YCbCr 4:2:0 frame buffers delivered by the camera.
//!
//! A [`FrameBuffer`] is owned by the frame source for the duration of one
//! capture callback. The pipeline only ever sees it through a shared borrow,
//! so nothing inside the crate can keep a plane alive past the callback.

pub mod synth;

use std::time::Duration;

/// Pixel layout of a single plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneFormat {
    /// 8-bit single-channel luma (Y).
    Luma8,
    /// 8-bit two-channel interleaved chroma (Cb, Cr).
    ChromaPair8,
}

impl PlaneFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PlaneFormat::Luma8 => 1,
            PlaneFormat::ChromaPair8 => 2,
        }
    }

    /// Normalized GPU texture format used to view this plane.
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            PlaneFormat::Luma8 => wgpu::TextureFormat::R8Unorm,
            PlaneFormat::ChromaPair8 => wgpu::TextureFormat::Rg8Unorm,
        }
    }
}

/// Borrowed view of one plane's backing memory.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes; may exceed `width * bytes_per_pixel`.
    pub bytes_per_row: u32,
    pub format: PlaneFormat,
    pub data: &'a [u8],
}

impl Plane<'_> {
    /// Bytes of pixel payload in one row (without padding).
    pub fn row_bytes(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    /// Minimum backing length for this plane's geometry.
    ///
    /// The last row does not need trailing padding.
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        self.bytes_per_row as usize * (self.height as usize - 1) + self.row_bytes() as usize
    }
}

/// A captured frame with at least two planes: luma (index 0) and chroma (index 1).
pub trait FrameBuffer {
    fn plane_count(&self) -> usize;

    fn plane(&self, index: usize) -> Option<Plane<'_>>;

    /// Presentation timestamp reported by the capture device, if any.
    fn timestamp(&self) -> Option<Duration> {
        None
    }
}

/// Chroma plane dimensions for a 4:2:0 frame with the given luma size.
pub fn chroma_dimensions(luma_width: u32, luma_height: u32) -> (u32, u32) {
    (luma_width.div_ceil(2), luma_height.div_ceil(2))
}

/// Frame backed by host memory.
///
/// Used by synthetic sources, tests and any camera backend that maps its
/// buffers into process memory.
#[derive(Debug, Clone)]
pub struct HostFrame {
    width: u32,
    height: u32,
    luma: Vec<u8>,
    luma_stride: u32,
    chroma: Vec<u8>,
    chroma_stride: u32,
    timestamp: Option<Duration>,
}

impl HostFrame {
    /// Create a black frame (Y = 0, Cb = Cr = 128) with tightly packed rows.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_row_padding(width, height, 0)
    }

    /// Create a black frame whose rows carry `padding` extra bytes.
    pub fn with_row_padding(width: u32, height: u32, padding: u32) -> Self {
        let (chroma_width, chroma_height) = chroma_dimensions(width, height);
        let luma_stride = width + padding;
        let chroma_stride = chroma_width * 2 + padding;
        Self {
            width,
            height,
            luma: vec![0; (luma_stride * height) as usize],
            luma_stride,
            chroma: vec![128; (chroma_stride * chroma_height) as usize],
            chroma_stride,
            timestamp: None,
        }
    }

    /// Wrap existing plane data.
    ///
    /// No validation happens here; the texture bridge rejects inconsistent
    /// planes when the frame is submitted.
    pub fn from_planes(
        width: u32,
        height: u32,
        luma: Vec<u8>,
        luma_stride: u32,
        chroma: Vec<u8>,
        chroma_stride: u32,
    ) -> Self {
        Self {
            width,
            height,
            luma,
            luma_stride,
            chroma,
            chroma_stride,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn chroma_width(&self) -> u32 {
        chroma_dimensions(self.width, self.height).0
    }

    pub fn chroma_height(&self) -> u32 {
        chroma_dimensions(self.width, self.height).1
    }

    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.luma[(y * self.luma_stride + x) as usize]
    }

    pub fn set_luma(&mut self, x: u32, y: u32, value: u8) {
        self.luma[(y * self.luma_stride + x) as usize] = value;
    }

    /// Chroma sample at chroma-plane coordinates.
    pub fn chroma(&self, cx: u32, cy: u32) -> (u8, u8) {
        let i = (cy * self.chroma_stride + cx * 2) as usize;
        (self.chroma[i], self.chroma[i + 1])
    }

    pub fn set_chroma(&mut self, cx: u32, cy: u32, cb: u8, cr: u8) {
        let i = (cy * self.chroma_stride + cx * 2) as usize;
        self.chroma[i] = cb;
        self.chroma[i + 1] = cr;
    }

    /// Fill every luma and chroma sample with one color.
    pub fn fill(&mut self, y: u8, cb: u8, cr: u8) {
        for row in 0..self.height {
            for col in 0..self.width {
                self.set_luma(col, row, y);
            }
        }
        for row in 0..self.chroma_height() {
            for col in 0..self.chroma_width() {
                self.set_chroma(col, row, cb, cr);
            }
        }
    }
}

impl FrameBuffer for HostFrame {
    fn plane_count(&self) -> usize {
        2
    }

    fn plane(&self, index: usize) -> Option<Plane<'_>> {
        match index {
            0 => Some(Plane {
                width: self.width,
                height: self.height,
                bytes_per_row: self.luma_stride,
                format: PlaneFormat::Luma8,
                data: &self.luma,
            }),
            1 => Some(Plane {
                width: self.chroma_width(),
                height: self.chroma_height(),
                bytes_per_row: self.chroma_stride,
                format: PlaneFormat::ChromaPair8,
                data: &self.chroma,
            }),
            _ => None,
        }
    }

    fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }
}
