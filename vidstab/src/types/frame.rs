// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};

/// Pixel layout tag recognized by the detector and warper.
///
/// `plane_count` distinguishes planar layouts (1/3/4 independent byte
/// buffers) from packed ones (a single interleaved buffer, `plane_count() ==
/// 0` per the format this is grounded on).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PixelFormat {
    Gray8,
    Yuv420P,
    Yuv422P,
    Yuv444P,
    Yuv410P,
    Yuv411P,
    Yuv440P,
    Yuva420P,
    Rgb24,
    Bgr24,
    Rgba,
}

impl PixelFormat {
    /// Number of independent planes, or 0 for a packed (interleaved) layout.
    pub const fn plane_count(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Yuv420P
            | PixelFormat::Yuv422P
            | PixelFormat::Yuv444P
            | PixelFormat::Yuv410P
            | PixelFormat::Yuv411P
            | PixelFormat::Yuv440P => 3,
            PixelFormat::Yuva420P => 4,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 | PixelFormat::Rgba => 0,
        }
    }

    /// Bytes occupied by one pixel of the (possibly packed) layout.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8
            | PixelFormat::Yuv420P
            | PixelFormat::Yuv422P
            | PixelFormat::Yuv444P
            | PixelFormat::Yuv410P
            | PixelFormat::Yuv411P
            | PixelFormat::Yuv440P
            | PixelFormat::Yuva420P => 1,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// log2 of the horizontal chroma subsampling factor (0 = no subsampling).
    pub const fn log2_chroma_w(self) -> u32 {
        match self {
            PixelFormat::Yuv420P | PixelFormat::Yuv410P | PixelFormat::Yuv411P => 1,
            _ => 0,
        }
    }

    /// log2 of the vertical chroma subsampling factor (0 = no subsampling).
    pub const fn log2_chroma_h(self) -> u32 {
        match self {
            PixelFormat::Yuv420P | PixelFormat::Yuv410P | PixelFormat::Yuv440P => 1,
            _ => 0,
        }
    }

    /// Fill value used for the luma/first plane when cropping introduces
    /// border pixels.
    pub const fn black_luma(self) -> u8 {
        0
    }

    /// Fill value used for chroma planes when cropping introduces border
    /// pixels.
    pub const fn black_chroma(self) -> u8 {
        0x80
    }
}

/// Immutable descriptor of a frame's dimensions and pixel layout.
///
/// Invariant: `width` and `height` are even, and chroma subsampling shifts
/// of them are exact (no rounding).
#[derive(Copy, Clone, Debug)]
pub struct FrameInfo {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

impl FrameInfo {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(Error::FatalConfig(format!(
                "frame dimensions must be non-zero and even, got {width}x{height}"
            )));
        }
        let info = FrameInfo {
            width,
            height,
            format,
        };
        // Every plane's dimensions must divide evenly given the chroma shifts.
        for plane in 0..info.plane_count().max(1) {
            let (pw, ph) = info.plane_size(plane);
            if pw == 0 || ph == 0 {
                return Err(Error::FatalConfig(format!(
                    "plane {plane} of a {width}x{height} {format:?} frame would be empty"
                )));
            }
        }
        Ok(info)
    }

    pub fn plane_count(&self) -> usize {
        self.format.plane_count()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// Byte width and pixel height of `plane` (0 = luma/packed, 1/2 = chroma,
    /// 3 = alpha).
    pub fn plane_size(&self, plane: usize) -> (usize, usize) {
        if self.plane_count() == 0 || plane == 0 {
            return (self.width * self.bytes_per_pixel(), self.height);
        }
        let w = self.width >> self.format.log2_chroma_w();
        let h = self.height >> self.format.log2_chroma_h();
        (w, h)
    }

    /// Number of planes actually stored for this format (packed formats
    /// store exactly one interleaved buffer).
    pub fn stored_planes(&self) -> usize {
        self.plane_count().max(1)
    }
}

/// An axis-aligned rectangle, in pixel (not byte) coordinates for plane 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Rect { x, y, width, height }
    }

    pub fn is_within(&self, bounds: (usize, usize)) -> Result<()> {
        let right = self
            .x
            .checked_add(self.width)
            .ok_or(Error::ArithmeticOverflow)?;
        let bottom = self
            .y
            .checked_add(self.height)
            .ok_or(Error::ArithmeticOverflow)?;
        if right > bounds.0 || bottom > bounds.1 {
            Err(Error::RectOutOfBounds {
                w: self.width,
                h: self.height,
                x: self.x,
                y: self.y,
                frame_w: bounds.0,
                frame_h: bounds.1,
            })
        } else {
            Ok(())
        }
    }
}

/// One plane's worth of pixel data, stored as a flat byte buffer with a
/// (possibly padded) row stride.
#[derive(Clone, Debug)]
pub struct Plane {
    data: Vec<u8>,
    width: usize,
    height: usize,
    stride: usize,
}

impl Plane {
    pub fn new_zeroed(width: usize, height: usize) -> Self {
        Plane {
            data: vec![0u8; width * height],
            width,
            height,
            stride: width,
        }
    }

    pub fn from_bytes(data: Vec<u8>, width: usize, height: usize) -> Self {
        assert!(data.len() >= width * height);
        Plane {
            data,
            width,
            height,
            stride: width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.row(y)[x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.row_mut(y)[x] = value;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }
}

/// A full, owned video frame: one `Plane` per stored plane of `info.format`.
#[derive(Clone, Debug)]
pub struct Frame {
    pub info: FrameInfo,
    planes: Vec<Plane>,
}

impl Frame {
    pub fn new_zeroed(info: FrameInfo) -> Self {
        let planes = (0..info.stored_planes())
            .map(|p| {
                let (w, h) = info.plane_size(p);
                Plane::new_zeroed(w, h)
            })
            .collect();
        Frame { info, planes }
    }

    /// Builds a frame from already-decoded plane buffers (plane 0 first).
    pub fn from_planes(info: FrameInfo, planes: Vec<Plane>) -> Result<Self> {
        if planes.len() != info.stored_planes() {
            return Err(Error::FatalConfig(format!(
                "expected {} planes for {:?}, got {}",
                info.stored_planes(),
                info.format,
                planes.len()
            )));
        }
        Ok(Frame { info, planes })
    }

    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut Plane {
        &mut self.planes[index]
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// The plane the detector matches on -- plane 0, which is luma for every
    /// planar format and the single packed buffer for RGB-family formats.
    pub fn luma(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn luma_mut(&mut self) -> &mut Plane {
        &mut self.planes[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_info_rejects_odd_dimensions() {
        assert!(FrameInfo::new(11, 10, PixelFormat::Gray8).is_err());
        assert!(FrameInfo::new(10, 11, PixelFormat::Gray8).is_err());
    }

    #[test]
    fn yuv420p_chroma_planes_are_half_size() {
        let info = FrameInfo::new(16, 8, PixelFormat::Yuv420P).unwrap();
        assert_eq!(info.plane_size(0), (16, 8));
        assert_eq!(info.plane_size(1), (8, 4));
        assert_eq!(info.plane_size(2), (8, 4));
    }

    #[test]
    fn packed_rgb_has_one_stored_plane() {
        let info = FrameInfo::new(4, 4, PixelFormat::Rgb24).unwrap();
        assert_eq!(info.plane_count(), 0);
        assert_eq!(info.stored_planes(), 1);
        assert_eq!(info.plane_size(0), (12, 4));
    }

    #[test]
    fn rect_bounds_check() {
        let r = Rect::new(2, 2, 4, 4);
        assert!(r.is_within((6, 6)).is_ok());
        assert!(r.is_within((5, 6)).is_err());
    }
}
