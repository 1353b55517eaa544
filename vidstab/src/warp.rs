// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Frame warping: given a compensating [`Transform`], resample the source
//! frame along the transform's *inverse* so that the output looks as if the
//! camera had taken the smoothed path instead of the shaky one.
//!
//! Both a floating-point and a 16.16 fixed-point interpolation path are
//! provided, matching the dual arithmetic of the format this module is
//! grounded on: the fixed-point path is for bit-reproducible output across
//! platforms, the floating-point path is for everything else. They are
//! expected to agree to within a couple of least-significant bits (see the
//! tests at the bottom of this file), not bit-for-bit -- the floating-point
//! path intentionally does not reproduce the fixed-point rounding of each
//! interpolation kernel (see DESIGN.md).

use crate::smooth::{CropMode, TransformConfig};
use crate::types::frame::{Frame, FrameInfo, Plane};
use crate::types::transform::Transform;

/// Resampling kernel used by the warper.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterpolType {
    /// Nearest-neighbor.
    Zero,
    /// Linear along x only (at the nearest integer y).
    Linear,
    /// Separable 2x2 bilinear.
    BiLinear,
    /// Separable 4x4 bicubic, falling back to bilinear near plane edges.
    BiCubic,
}

/// 16.16 fixed-point helpers, named to match the macros this module's
/// fixed-point kernels are transcribed from.
mod fp {
    pub const SHIFT: i64 = 16;
    pub const ONE: i64 = 1 << SHIFT;
    pub const HALF: i64 = 1 << (SHIFT - 1);

    pub fn from_f64(v: f64) -> i64 {
        (v * ONE as f64).round() as i64
    }

    pub fn to_i_round(v: i64) -> i64 {
        (v + HALF) >> SHIFT
    }

    pub fn to_i_floor(v: i64) -> i64 {
        v >> SHIFT
    }

    pub fn frac(v: i64) -> i64 {
        v & (ONE - 1)
    }
}

fn clamp_u8(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

/// `sample(ix, iy)` returns the grid value at the given integer coordinate;
/// callers are responsible for bounds-checking before calling it, as every
/// kernel below checks bounds itself and falls back to `default`.
trait Sampler {
    fn get(&self, ix: i64, iy: i64) -> i64;
}

impl<F: Fn(i64, i64) -> i64> Sampler for F {
    fn get(&self, ix: i64, iy: i64) -> i64 {
        self(ix, iy)
    }
}

fn in_bounds(ix: i64, iy: i64, w: i64, h: i64) -> bool {
    ix >= 0 && ix < w && iy >= 0 && iy < h
}

// --- Fixed-point (16.16) kernels -------------------------------------------

fn interpolate_zero_fixed(s: &impl Sampler, w: i64, h: i64, x: i64, y: i64, default: i64) -> i64 {
    let ix = fp::to_i_round(x);
    let iy = fp::to_i_round(y);
    if in_bounds(ix, iy, w, h) {
        s.get(ix, iy)
    } else {
        default
    }
}

fn interpolate_linear_fixed(s: &impl Sampler, w: i64, h: i64, x: i64, y: i64, default: i64) -> i64 {
    let iy = fp::to_i_round(y);
    if iy < 0 || iy >= h {
        return default;
    }
    let ix_f = fp::to_i_floor(x);
    if ix_f < 0 || ix_f > w - 2 {
        let ix = fp::to_i_round(x).clamp(0, w - 1);
        return s.get(ix, iy);
    }
    let t = fp::frac(x);
    let a = s.get(ix_f, iy);
    let b = s.get(ix_f + 1, iy);
    fp::to_i_round(a * (fp::ONE - t) + b * t)
}

fn interpolate_bilinear_core_fixed(s: &impl Sampler, x: i64, y: i64) -> i64 {
    let ix_f = fp::to_i_floor(x);
    let iy_f = fp::to_i_floor(y);
    let tx = fp::frac(x);
    let ty = fp::frac(y);
    let p00 = s.get(ix_f, iy_f);
    let p10 = s.get(ix_f + 1, iy_f);
    let p01 = s.get(ix_f, iy_f + 1);
    let p11 = s.get(ix_f + 1, iy_f + 1);
    let top = p00 * (fp::ONE - tx) + p10 * tx;
    let bot = p01 * (fp::ONE - tx) + p11 * tx;
    fp::to_i_round((top * (fp::ONE - ty) + bot * ty) >> fp::SHIFT) + 1
}

/// 10-pixel fade-out border blend between the in-bounds bilinear sample and
/// `default`, used whenever the bilinear/bicubic footprint would otherwise
/// read outside the plane.
fn interpolate_bilinear_border_fixed(
    s: &impl Sampler,
    w: i64,
    h: i64,
    x: i64,
    y: i64,
    default: i64,
) -> i64 {
    const BORDER: i64 = 10;
    let ix_f = fp::to_i_floor(x);
    let iy_f = fp::to_i_floor(y);
    let dx = if ix_f < 0 {
        -ix_f
    } else if ix_f > w - 2 {
        ix_f - (w - 2)
    } else {
        0
    };
    let dy = if iy_f < 0 {
        -iy_f
    } else if iy_f > h - 2 {
        iy_f - (h - 2)
    } else {
        0
    };
    let dist = dx.max(dy);
    if dist == 0 {
        return interpolate_bilinear_core_fixed(s, x, y);
    }
    let c = dist.min(BORDER);
    let cx = ix_f.clamp(0, w - 1);
    let cy = iy_f.clamp(0, h - 1);
    let border_val = s.get(cx, cy);
    (default * c + border_val * (BORDER - c)) / BORDER
}

fn interpolate_bilinear_fixed(s: &impl Sampler, w: i64, h: i64, x: i64, y: i64, default: i64) -> i64 {
    let ix_f = fp::to_i_floor(x);
    let iy_f = fp::to_i_floor(y);
    if ix_f < 0 || ix_f > w - 2 || iy_f < 0 || iy_f > h - 2 {
        interpolate_bilinear_border_fixed(s, w, h, x, y, default)
    } else {
        interpolate_bilinear_core_fixed(s, x, y)
    }
}

/// The exact half-shift rounding rule this kernel is grounded on (see
/// DESIGN.md Open Question disposition #3): every intermediate sum is
/// rounded back to fp16 before the next multiply, not just the final
/// result.
fn bicub_kernel_fixed(t: i64, a0: i64, a1: i64, a2: i64, a3: i64) -> i64 {
    let inner_t3 = fp::to_i_round(t * (-a0 + 3 * a1 - 3 * a2 + a3));
    let inner_t2 = fp::to_i_round(t * ((2 * a0 - 5 * a1 + 4 * a2 - a3) + inner_t3));
    let sum = (2 * a1 << fp::SHIFT) + t * (-a0 + a2 + inner_t2);
    fp::to_i_round(sum >> 1)
}

fn interpolate_bicubic_fixed(s: &impl Sampler, w: i64, h: i64, x: i64, y: i64, default: i64) -> i64 {
    let ix_f = fp::to_i_floor(x);
    let iy_f = fp::to_i_floor(y);
    if ix_f < 1 || ix_f > w - 3 || iy_f < 1 || iy_f > h - 3 {
        return interpolate_bilinear_border_fixed(s, w, h, x, y, default);
    }
    let tx = fp::frac(x);
    let ty = fp::frac(y);
    let mut rows = [0i64; 4];
    for (j, row) in rows.iter_mut().enumerate() {
        let ry = iy_f - 1 + j as i64;
        let a0 = s.get(ix_f - 1, ry);
        let a1 = s.get(ix_f, ry);
        let a2 = s.get(ix_f + 1, ry);
        let a3 = s.get(ix_f + 2, ry);
        *row = bicub_kernel_fixed(tx, a0, a1, a2, a3);
    }
    bicub_kernel_fixed(ty, rows[0], rows[1], rows[2], rows[3]).clamp(0, 255)
}

fn interpolate_fixed(
    kind: InterpolType,
    s: &impl Sampler,
    w: i64,
    h: i64,
    x: i64,
    y: i64,
    default: i64,
) -> u8 {
    let v = match kind {
        InterpolType::Zero => interpolate_zero_fixed(s, w, h, x, y, default),
        InterpolType::Linear => interpolate_linear_fixed(s, w, h, x, y, default),
        InterpolType::BiLinear => interpolate_bilinear_fixed(s, w, h, x, y, default),
        InterpolType::BiCubic => interpolate_bicubic_fixed(s, w, h, x, y, default),
    };
    clamp_u8(v)
}

// --- Floating-point kernels -------------------------------------------------
//
// Structurally parallel to the fixed-point kernels above but computed
// directly in f64 and using `f64::floor` throughout (the fixed-point
// kernels' pre-subtraction "myfloor" quirk on negative coordinates is
// deliberately not reproduced here; see DESIGN.md).

fn interpolate_zero_f64(s: &impl Sampler, w: i64, h: i64, x: f64, y: f64, default: f64) -> f64 {
    let ix = x.round() as i64;
    let iy = y.round() as i64;
    if in_bounds(ix, iy, w, h) {
        s.get(ix, iy) as f64
    } else {
        default
    }
}

fn interpolate_linear_f64(s: &impl Sampler, w: i64, h: i64, x: f64, y: f64, default: f64) -> f64 {
    let iy = y.round() as i64;
    if iy < 0 || iy >= h {
        return default;
    }
    let ix_f = x.floor() as i64;
    if ix_f < 0 || ix_f > w - 2 {
        let ix = (x.round() as i64).clamp(0, w - 1);
        return s.get(ix, iy) as f64;
    }
    let t = x - ix_f as f64;
    let a = s.get(ix_f, iy) as f64;
    let b = s.get(ix_f + 1, iy) as f64;
    a * (1.0 - t) + b * t
}

fn interpolate_bilinear_core_f64(s: &impl Sampler, x: f64, y: f64) -> f64 {
    let ix_f = x.floor() as i64;
    let iy_f = y.floor() as i64;
    let tx = x - ix_f as f64;
    let ty = y - iy_f as f64;
    let p00 = s.get(ix_f, iy_f) as f64;
    let p10 = s.get(ix_f + 1, iy_f) as f64;
    let p01 = s.get(ix_f, iy_f + 1) as f64;
    let p11 = s.get(ix_f + 1, iy_f + 1) as f64;
    let top = p00 * (1.0 - tx) + p10 * tx;
    let bot = p01 * (1.0 - tx) + p11 * tx;
    top * (1.0 - ty) + bot * ty
}

fn interpolate_bilinear_border_f64(
    s: &impl Sampler,
    w: i64,
    h: i64,
    x: f64,
    y: f64,
    default: f64,
) -> f64 {
    const BORDER: f64 = 10.0;
    let ix_f = x.floor() as i64;
    let iy_f = y.floor() as i64;
    let dx = if ix_f < 0 {
        -ix_f as f64
    } else if ix_f > w - 2 {
        (ix_f - (w - 2)) as f64
    } else {
        0.0
    };
    let dy = if iy_f < 0 {
        -iy_f as f64
    } else if iy_f > h - 2 {
        (iy_f - (h - 2)) as f64
    } else {
        0.0
    };
    let dist = dx.max(dy);
    if dist == 0.0 {
        return interpolate_bilinear_core_f64(s, x, y);
    }
    let c = dist.min(BORDER);
    let cx = ix_f.clamp(0, w - 1);
    let cy = iy_f.clamp(0, h - 1);
    let border_val = s.get(cx, cy) as f64;
    (default * c + border_val * (BORDER - c)) / BORDER
}

fn interpolate_bilinear_f64(s: &impl Sampler, w: i64, h: i64, x: f64, y: f64, default: f64) -> f64 {
    let ix_f = x.floor() as i64;
    let iy_f = y.floor() as i64;
    if ix_f < 0 || ix_f > w - 2 || iy_f < 0 || iy_f > h - 2 {
        interpolate_bilinear_border_f64(s, w, h, x, y, default)
    } else {
        interpolate_bilinear_core_f64(s, x, y)
    }
}

fn cubic_kernel_f64(t: f64, a0: f64, a1: f64, a2: f64, a3: f64) -> f64 {
    0.5 * (2.0 * a1
        + t * (-a0 + a2
            + t * ((2.0 * a0 - 5.0 * a1 + 4.0 * a2 - a3)
                + t * (-a0 + 3.0 * a1 - 3.0 * a2 + a3))))
}

fn interpolate_bicubic_f64(s: &impl Sampler, w: i64, h: i64, x: f64, y: f64, default: f64) -> f64 {
    let ix_f = x.floor() as i64;
    let iy_f = y.floor() as i64;
    if ix_f < 1 || ix_f > w - 3 || iy_f < 1 || iy_f > h - 3 {
        return interpolate_bilinear_border_f64(s, w, h, x, y, default);
    }
    let tx = x - ix_f as f64;
    let ty = y - iy_f as f64;
    let mut rows = [0.0f64; 4];
    for (j, row) in rows.iter_mut().enumerate() {
        let ry = iy_f - 1 + j as i64;
        let a0 = s.get(ix_f - 1, ry) as f64;
        let a1 = s.get(ix_f, ry) as f64;
        let a2 = s.get(ix_f + 1, ry) as f64;
        let a3 = s.get(ix_f + 2, ry) as f64;
        *row = cubic_kernel_f64(tx, a0, a1, a2, a3);
    }
    cubic_kernel_f64(ty, rows[0], rows[1], rows[2], rows[3]).clamp(0.0, 255.0)
}

fn interpolate_f64(
    kind: InterpolType,
    s: &impl Sampler,
    w: i64,
    h: i64,
    x: f64,
    y: f64,
    default: f64,
) -> u8 {
    let v = match kind {
        InterpolType::Zero => interpolate_zero_f64(s, w, h, x, y, default),
        InterpolType::Linear => interpolate_linear_f64(s, w, h, x, y, default),
        InterpolType::BiLinear => interpolate_bilinear_f64(s, w, h, x, y, default),
        InterpolType::BiCubic => interpolate_bicubic_f64(s, w, h, x, y, default),
    };
    v.round().clamp(0.0, 255.0) as u8
}

/// Scales a transform's translation for a chroma-subsampled plane: rotation
/// and zoom apply identically to every plane, but a translation of `t.x`
/// pixels in luma space is `t.x / 2^wsub` pixels in a plane shifted by
/// `wsub`.
fn scale_for_plane(t: &Transform, wsub: u32, hsub: u32) -> Transform {
    Transform {
        x: t.x / (1u32 << wsub) as f64,
        y: t.y / (1u32 << hsub) as f64,
        alpha: t.alpha,
        zoom: t.zoom,
        barrel: t.barrel,
        rshutter: t.rshutter,
        extra: t.extra,
    }
}

fn warp_channel_f64(
    dest_w: usize,
    dest_h: usize,
    kind: InterpolType,
    inv: &Transform,
    center: (f64, f64),
    get_src: impl Fn(i64, i64) -> i64,
    get_default: impl Fn(usize, usize) -> u8,
    mut set_dest: impl FnMut(usize, usize, u8),
) {
    let w = dest_w as i64;
    let h = dest_h as i64;
    for y in 0..dest_h {
        for x in 0..dest_w {
            let (sx, sy) = inv.apply((x as f64, y as f64), center);
            let default = get_default(x, y) as f64;
            let v = interpolate_f64(kind, &get_src, w, h, sx, sy, default);
            set_dest(x, y, v);
        }
    }
}

fn warp_channel_fixed(
    dest_w: usize,
    dest_h: usize,
    kind: InterpolType,
    inv: &Transform,
    center: (f64, f64),
    get_src: impl Fn(i64, i64) -> i64,
    get_default: impl Fn(usize, usize) -> u8,
    mut set_dest: impl FnMut(usize, usize, u8),
) {
    let w = dest_w as i64;
    let h = dest_h as i64;
    for y in 0..dest_h {
        for x in 0..dest_w {
            let (sx, sy) = inv.apply((x as f64, y as f64), center);
            let default = get_default(x, y) as i64;
            let v = interpolate_fixed(kind, &get_src, w, h, fp::from_f64(sx), fp::from_f64(sy), default);
            set_dest(x, y, v);
        }
    }
}

/// Drives the warp for one frame, holding the double-buffer `destbuf` that
/// `CropMode::KeepBorder` relies on to fill out-of-bounds pixels with the
/// previous frame's content instead of a flat color.
pub struct Warper {
    frame_info: FrameInfo,
    destbuf: Option<Frame>,
}

impl Warper {
    pub fn new(frame_info: FrameInfo) -> Self {
        Warper {
            frame_info,
            destbuf: None,
        }
    }

    /// Warps `src` by the inverse of `transform`, returning the new frame.
    /// Uses fixed-point arithmetic when `fixed_point` is set, floating-point
    /// otherwise; both should agree to within a couple of LSBs.
    pub fn warp(&mut self, src: &Frame, transform: &Transform, config: &TransformConfig, fixed_point: bool) -> Frame {
        let info = self.frame_info;
        let is_packed = info.plane_count() == 0;

        if transform.is_identity() {
            let out = src.clone();
            if config.crop == CropMode::KeepBorder {
                self.destbuf = Some(out.clone());
            }
            return out;
        }

        let mut dest = Frame::new_zeroed(info);
        let stored_planes = info.stored_planes();

        for plane_idx in 0..stored_planes {
            let (pw, ph) = info.plane_size(plane_idx);
            let bpp = if is_packed { info.bytes_per_pixel() } else { 1 };
            let pixel_w = pw / bpp;

            let (wsub, hsub) = if is_packed || plane_idx == 0 {
                (0, 0)
            } else {
                (info.format.log2_chroma_w(), info.format.log2_chroma_h())
            };
            let scaled = scale_for_plane(transform, wsub, hsub);
            let inv = scaled.invert();
            let center = (pixel_w as f64 / 2.0, ph as f64 / 2.0);

            let black = if is_packed || plane_idx == 0 {
                info.format.black_luma()
            } else {
                info.format.black_chroma()
            };

            let src_plane = src.plane(plane_idx);
            let prior_plane = self
                .destbuf
                .as_ref()
                .map(|f| f.plane(plane_idx))
                .filter(|_| config.crop == CropMode::KeepBorder);

            for channel in 0..bpp.max(1) {
                let get_src = |ix: i64, iy: i64| -> i64 {
                    if ix < 0 || iy < 0 || ix as usize >= pixel_w || iy as usize >= ph {
                        0
                    } else {
                        src_plane.get(ix as usize * bpp.max(1) + channel, iy as usize) as i64
                    }
                };
                let get_default = |x: usize, y: usize| -> u8 {
                    if let Some(prior) = prior_plane {
                        prior.get(x * bpp.max(1) + channel, y)
                    } else if is_packed {
                        16
                    } else {
                        black
                    }
                };
                let dest_plane = dest.plane_mut(plane_idx);
                let mut set_dest = |x: usize, y: usize, v: u8| {
                    dest_plane.set(x * bpp.max(1) + channel, y, v);
                };

                if fixed_point {
                    warp_channel_fixed(
                        pixel_w,
                        ph,
                        config.interpol_type,
                        &inv,
                        center,
                        get_src,
                        get_default,
                        &mut set_dest,
                    );
                } else {
                    warp_channel_f64(
                        pixel_w,
                        ph,
                        config.interpol_type,
                        &inv,
                        center,
                        get_src,
                        get_default,
                        &mut set_dest,
                    );
                }
            }
        }

        if config.crop == CropMode::KeepBorder {
            self.destbuf = Some(dest.clone());
        }
        dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::frame::PixelFormat;

    fn gray_info(w: usize, h: usize) -> FrameInfo {
        FrameInfo::new(w, h, PixelFormat::Gray8).unwrap()
    }

    fn stripes(w: usize, h: usize) -> Frame {
        let mut f = Frame::new_zeroed(gray_info(w, h));
        for y in 0..h {
            for x in 0..w {
                let v = if (x / 4) % 2 == 0 { 40 } else { 220 };
                f.luma_mut().set(x, y, v);
            }
        }
        f
    }

    #[test]
    fn identity_warp_is_pixel_identity() {
        let src = stripes(32, 16);
        let mut warper = Warper::new(gray_info(32, 16));
        let config = TransformConfig::default();
        let out = warper.warp(&src, &Transform::identity(), &config, false);
        assert_eq!(out.luma().as_bytes(), src.luma().as_bytes());
    }

    #[test]
    fn fixed_and_floating_point_warps_agree_closely() {
        let src = stripes(40, 24);
        let info = gray_info(40, 24);
        let transform = Transform::new(1.7, -0.8, 0.03, 2.0);
        let config = TransformConfig {
            crop: CropMode::CropBorder,
            interpol_type: InterpolType::BiLinear,
            ..TransformConfig::default()
        };

        let mut warper_f = Warper::new(info);
        let out_f = warper_f.warp(&src, &transform, &config, false);
        let mut warper_fp = Warper::new(info);
        let out_fp = warper_fp.warp(&src, &transform, &config, true);

        let max_diff = out_f
            .luma()
            .as_bytes()
            .iter()
            .zip(out_fp.luma().as_bytes())
            .map(|(a, b)| (*a as i32 - *b as i32).abs())
            .max()
            .unwrap_or(0);
        assert!(max_diff <= 2, "max pixel diff {max_diff} exceeds tolerance");
    }

    #[test]
    fn fixed_and_floating_point_warps_agree_for_arbitrary_transforms() {
        let src = stripes(40, 24);
        let info = gray_info(40, 24);

        arbtest::arbtest(|u| {
            let x = u.int_in_range(-10..=10)? as f64;
            let y = u.int_in_range(-10..=10)? as f64;
            let alpha = u.int_in_range(-20..=20)? as f64 / 100.0;
            let zoom = u.int_in_range(-20..=20)? as f64;
            let transform = Transform::new(x, y, alpha, zoom);

            let interpol_type = match u.int_in_range(0..=3)? {
                0 => InterpolType::Zero,
                1 => InterpolType::Linear,
                2 => InterpolType::BiLinear,
                _ => InterpolType::BiCubic,
            };
            let config = TransformConfig {
                crop: CropMode::CropBorder,
                interpol_type,
                ..TransformConfig::default()
            };

            let mut warper_f = Warper::new(info);
            let out_f = warper_f.warp(&src, &transform, &config, false);
            let mut warper_fp = Warper::new(info);
            let out_fp = warper_fp.warp(&src, &transform, &config, true);

            let max_diff = out_f
                .luma()
                .as_bytes()
                .iter()
                .zip(out_fp.luma().as_bytes())
                .map(|(a, b)| (*a as i32 - *b as i32).abs())
                .max()
                .unwrap_or(0);
            assert!(max_diff <= 2, "max pixel diff {max_diff} for {transform:?} / {interpol_type:?}");
            Ok(())
        })
        .size_min(64);
    }

    macro_rules! identity_warp_test_for {
        ($interpol:ident) => {
            paste::paste! {
                #[test]
                fn [<identity_warp_is_pixel_identity_ $interpol:lower>]() {
                    let src = stripes(32, 16);
                    let mut warper = Warper::new(gray_info(32, 16));
                    let config = TransformConfig {
                        interpol_type: InterpolType::$interpol,
                        ..TransformConfig::default()
                    };
                    let out = warper.warp(&src, &Transform::identity(), &config, false);
                    assert_eq!(out.luma().as_bytes(), src.luma().as_bytes());
                }
            }
        };
    }

    identity_warp_test_for!(Zero);
    identity_warp_test_for!(Linear);
    identity_warp_test_for!(BiLinear);
    identity_warp_test_for!(BiCubic);

    #[test]
    fn crop_border_fills_with_black() {
        let src = Frame::new_zeroed(gray_info(16, 16));
        let mut plain = src.clone();
        plain.luma_mut().fill(200);
        let transform = Transform::new(100.0, 0.0, 0.0, 0.0);
        let config = TransformConfig {
            crop: CropMode::CropBorder,
            interpol_type: InterpolType::Zero,
            ..TransformConfig::default()
        };
        let mut warper = Warper::new(gray_info(16, 16));
        let out = warper.warp(&plain, &transform, &config, false);
        assert_eq!(out.luma().get(0, 0), 0);
    }

    #[test]
    fn keep_border_reuses_previous_frame_content() {
        let mut frame_a = Frame::new_zeroed(gray_info(16, 16));
        frame_a.luma_mut().fill(150);
        let transform = Transform::new(100.0, 0.0, 0.0, 0.0);
        let config = TransformConfig {
            crop: CropMode::KeepBorder,
            interpol_type: InterpolType::Zero,
            ..TransformConfig::default()
        };
        let mut warper = Warper::new(gray_info(16, 16));
        let first = warper.warp(&frame_a, &Transform::identity(), &config, false);
        assert_eq!(first.luma().get(0, 0), 150);
        let second = warper.warp(&frame_a, &transform, &config, false);
        // Out-of-bounds destination pixels should retain the prior frame's
        // content rather than turn black.
        assert_eq!(second.luma().get(0, 0), 150);
    }

    #[test]
    fn bicubic_kernel_is_exact_on_a_linear_ramp() {
        // A linear ramp's cubic interpolant reduces to the linear one.
        let got = bicub_kernel_fixed(fp::ONE / 4, 0, 40, 80, 120);
        assert!((got - 50).abs() <= 1);
    }
}
