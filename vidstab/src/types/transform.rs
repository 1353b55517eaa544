// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Similarity transforms in the two parametrizations named by the data
//! model: the angle/zoom ("A/Z") form used by the detector, fit and warper,
//! and the linear-similarity ("LS") form used by the L1 path optimizer
//! because it is linear in its parameters.

use crate::util::stats::trimmed_mean;

/// A 4-DOF similarity transform: translation `(x, y)`, rotation `alpha`
/// (radians) and percentage `zoom`. `barrel` and `rshutter` are reserved
/// fields carried for wire-format fidelity with the legacy text format but
/// never read by any transform operation in this crate (see DESIGN.md).
/// `extra` is a scene-cut / invalid marker: non-zero means the transform
/// should be treated as unreliable by downstream consumers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub alpha: f64,
    pub zoom: f64,
    pub barrel: f64,
    pub rshutter: f64,
    pub extra: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Transform {
            x: 0.0,
            y: 0.0,
            alpha: 0.0,
            zoom: 0.0,
            barrel: 0.0,
            rshutter: 0.0,
            extra: 0,
        }
    }

    pub const fn new(x: f64, y: f64, alpha: f64, zoom: f64) -> Self {
        Transform {
            x,
            y,
            alpha,
            zoom,
            barrel: 0.0,
            rshutter: 0.0,
            extra: 0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.alpha == 0.0 && self.zoom == 0.0
    }

    pub fn add(&self, other: &Transform) -> Transform {
        Transform {
            x: self.x + other.x,
            y: self.y + other.y,
            alpha: self.alpha + other.alpha,
            zoom: self.zoom + other.zoom,
            barrel: self.barrel + other.barrel,
            rshutter: self.rshutter + other.rshutter,
            extra: self.extra.max(other.extra),
        }
    }

    pub fn sub(&self, other: &Transform) -> Transform {
        Transform {
            x: self.x - other.x,
            y: self.y - other.y,
            alpha: self.alpha - other.alpha,
            zoom: self.zoom - other.zoom,
            barrel: self.barrel - other.barrel,
            rshutter: self.rshutter - other.rshutter,
            extra: self.extra.max(other.extra),
        }
    }

    pub fn scale(&self, s: f64) -> Transform {
        Transform {
            x: self.x * s,
            y: self.y * s,
            alpha: self.alpha * s,
            zoom: self.zoom * s,
            barrel: self.barrel * s,
            rshutter: self.rshutter * s,
            extra: self.extra,
        }
    }

    pub fn negate(&self) -> Transform {
        self.scale(-1.0)
    }

    /// Applies the similarity transform's rotation+zoom (not the
    /// translation) to a vector, as used by the fit's quality functional and
    /// by the Simple path's rotation-compensation step.
    pub fn rotate_zoom_vec(&self, v: (f64, f64)) -> (f64, f64) {
        let z = 1.0 + self.zoom / 100.0;
        let (s, c) = self.alpha.sin_cos();
        (z * (c * v.0 - s * v.1), z * (s * v.0 + c * v.1))
    }

    /// Forward similarity transform of a point relative to center `c`:
    /// `T(p) = rotate_zoom(p - c) + c + (x, y)`. This is the direction used
    /// by the fit's quality functional; the warper instead walks the
    /// inverse (see `vidstab::warp`).
    pub fn apply(&self, p: (f64, f64), c: (f64, f64)) -> (f64, f64) {
        let (dx, dy) = self.rotate_zoom_vec((p.0 - c.0, p.1 - c.1));
        (dx + c.0 + self.x, dy + c.1 + self.y)
    }

    /// Composes two transforms so that `a.compose(b).apply(p) ==
    /// a.apply(b.apply(p))`: apply `b` first, then `a`.
    pub fn compose(&self, other: &Transform) -> Transform {
        self.to_ls().concat(&other.to_ls()).to_az()
    }

    pub fn invert(&self) -> Transform {
        self.to_ls().invert().to_az()
    }

    /// Required zoom (percent) so that, after applying this transform, the
    /// frame still fully covers its original extent: `100 * (2 *
    /// max(|x|/w, |y|/h) + |sin alpha|)`.
    pub fn required_zoom(&self, width: f64, height: f64) -> f64 {
        100.0
            * (2.0 * (self.x.abs() / width).max(self.y.abs() / height) + self.alpha.sin().abs())
    }

    pub fn to_ls(&self) -> TransformLs {
        let z = 1.0 + self.zoom / 100.0;
        let (s, c) = self.alpha.sin_cos();
        TransformLs {
            x: self.x,
            y: self.y,
            a: z * c,
            b: -z * s,
            c: 1.0,
            extra: self.extra,
        }
    }
}

/// Componentwise median of `x` and `y` across a slice of transforms.
pub fn median_xy(transforms: &[Transform]) -> (f64, f64) {
    let mut xs: Vec<f64> = transforms.iter().map(|t| t.x).collect();
    let mut ys: Vec<f64> = transforms.iter().map(|t| t.y).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let pick = |v: &[f64]| -> f64 {
        if v.is_empty() {
            0.0
        } else if v.len() % 2 == 0 {
            (v[v.len() / 2 - 1] + v[v.len() / 2]) / 2.0
        } else {
            v[v.len() / 2]
        }
    };
    (pick(&xs), pick(&ys))
}

/// Trimmed mean (inner 60%, i.e. drop `len/5` off each end) of `x` and `y`.
pub fn cleanmean_xy(transforms: &[Transform]) -> (f64, f64) {
    let xs: Vec<f64> = transforms.iter().map(|t| t.x).collect();
    let ys: Vec<f64> = transforms.iter().map(|t| t.y).collect();
    (trimmed_mean(&xs, 0.2), trimmed_mean(&ys, 0.2))
}

/// Linear-similarity parametrization: effective 2x3 matrix `[[a, b, x],
/// [-b, a, y]]` with homogeneous scale `c` (normally 1). Used by the L1
/// optimizer because the path objective (sums and differences of `B[t]`) is
/// linear in `(x, y, a, b)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformLs {
    pub x: f64,
    pub y: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub extra: i32,
}

impl Default for TransformLs {
    fn default() -> Self {
        TransformLs::identity()
    }
}

impl TransformLs {
    pub const fn identity() -> Self {
        TransformLs {
            x: 0.0,
            y: 0.0,
            a: 1.0,
            b: 0.0,
            c: 1.0,
            extra: 0,
        }
    }

    pub fn apply(&self, p: (f64, f64)) -> (f64, f64) {
        (
            self.a * p.0 + self.b * p.1 + self.x,
            -self.b * p.0 + self.a * p.1 + self.y,
        )
    }

    /// Composes two LS transforms: `self.concat(other).apply(p) ==
    /// self.apply(other.apply(p))`.
    pub fn concat(&self, other: &TransformLs) -> TransformLs {
        let (x, y) = self.apply((other.x, other.y));
        TransformLs {
            x,
            y,
            a: self.a * other.a - self.b * other.b,
            b: self.a * other.b + self.b * other.a,
            c: self.c * other.c,
            extra: self.extra.max(other.extra),
        }
    }

    pub fn invert(&self) -> TransformLs {
        let det = self.a * self.a + self.b * self.b;
        let ia = self.a / det;
        let ib = -self.b / det;
        TransformLs {
            x: -(ia * self.x + ib * self.y),
            y: -(-ib * self.x + ia * self.y),
            a: ia,
            b: ib,
            c: 1.0 / self.c,
            extra: self.extra,
        }
    }

    /// Converts back to the A/Z parametrization. Exact when `c == 1`
    /// (`AZ(LS(t)) == t`, the round-trip property of spec §8).
    pub fn to_az(&self) -> Transform {
        let z = (self.a * self.a + self.b * self.b).sqrt();
        let alpha = (-self.b).atan2(self.a);
        Transform {
            x: self.x,
            y: self.y,
            alpha,
            zoom: (z - 1.0) * 100.0,
            barrel: 0.0,
            rshutter: 0.0,
            extra: self.extra,
        }
    }
}

/// Ordered sequence of per-frame transforms, plus the reader cursor and
/// one-shot underrun-warning flag the transformer state machine needs.
#[derive(Debug, Default)]
pub struct Transformations {
    pub transforms: Vec<Transform>,
    pub current: usize,
    pub warned_end: bool,
}

impl Transformations {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Transformations {
            transforms,
            current: 0,
            warned_end: false,
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Incremental smoothing state for the single-step (online) path smoother
/// (`SPEC_FULL.md` §4.3a): a running average used as a high-pass filter, the
/// accumulator that integrates the relative correction into an absolute
/// compensating transform, and a running zoom estimate.
#[derive(Copy, Clone, Debug)]
pub struct SlidingAvgTrans {
    pub avg: Transform,
    pub accum: Transform,
    pub zoom_avg: f64,
    pub initialized: bool,
}

impl Default for SlidingAvgTrans {
    fn default() -> Self {
        SlidingAvgTrans {
            avg: Transform::identity(),
            accum: Transform::identity(),
            zoom_avg: 0.0,
            initialized: false,
        }
    }
}

impl SlidingAvgTrans {
    /// Single-step (online) path smoother: no lookahead, so the first call
    /// always returns identity and later calls trade smoothing quality for
    /// the ability to run frame by frame (`vsLowPassTransforms`'s
    /// equivalent). `t` is the relative transform from the previous frame
    /// to the current one.
    pub fn push(&mut self, t: Transform, config: &crate::smooth::TransformConfig) -> Transform {
        if !self.initialized {
            self.avg = t;
            self.initialized = true;
            self.zoom_avg = 0.0;
            self.accum = Transform::identity();
            return self.accum;
        }

        let s = 1.0 / (config.smoothing as f64 + 1.0);
        let tau = 1.0 / (3.0 * (config.smoothing as f64 + 1.0));
        if config.smoothing > 0 {
            self.avg = self.avg.scale(1.0 - s).add(&t.scale(s));
        } else {
            self.avg = t;
        }

        let mut newtrans = t.sub(&self.avg);

        if config.relative {
            newtrans = newtrans.add(&self.accum);
            self.accum = newtrans;
            if config.smoothing > 0 {
                self.accum = self.accum.scale(1.0 - tau);
            }
        }

        if config.max_shift != -1 {
            let m = config.max_shift as f64;
            newtrans.x = newtrans.x.clamp(-m, m);
            newtrans.y = newtrans.y.clamp(-m, m);
        }
        if config.max_angle != -1.0 {
            newtrans.alpha = newtrans.alpha.clamp(-config.max_angle, config.max_angle);
        }

        if config.opt_zoom != 0 && config.smoothing > 0 {
            let zx = 2.0 * newtrans.x / config.incremental_frame_width.max(1.0);
            let zy = 2.0 * newtrans.y / config.incremental_frame_height.max(1.0);
            let reqzoom = 100.0 * zx.abs().max(zy.abs());
            self.zoom_avg = self.zoom_avg * (1.0 - s) + reqzoom * s;
            newtrans.zoom = self.zoom_avg;
        }
        if config.zoom != 0.0 {
            newtrans.zoom += config.zoom;
        }
        newtrans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_fixed_point_of_composition() {
        let t = Transform::new(1.0, 2.0, 0.3, 5.0);
        let id = Transform::identity();
        let a = t.compose(&id);
        let b = id.compose(&t);
        assert!((a.x - t.x).abs() < 1e-10 && (a.y - t.y).abs() < 1e-10);
        assert!((a.alpha - t.alpha).abs() < 1e-10 && (a.zoom - t.zoom).abs() < 1e-10);
        assert!((b.x - t.x).abs() < 1e-10 && (b.alpha - t.alpha).abs() < 1e-10);
    }

    #[test]
    fn inversion_composes_to_identity() {
        let t = Transform::new(3.0, -4.0, 0.7, -12.0);
        let composed = t.compose(&t.invert());
        assert!(composed.x.abs() < 1e-10);
        assert!(composed.y.abs() < 1e-10);
        assert!(composed.alpha.abs() < 1e-10);
        assert!(composed.zoom.abs() < 1e-10);
    }

    #[test]
    fn double_inversion_recovers_the_original() {
        // Algebraically (T^-1)^-1 == T exactly; in floating point the two
        // divisions in `TransformLs::invert` round independently, so this
        // checks near-bit-identical agreement rather than `==`.
        let t = Transform::new(3.0, -4.0, 0.7, -12.0);
        let tt = t.invert().invert();
        assert!((tt.x - t.x).abs() < 1e-12);
        assert!((tt.y - t.y).abs() < 1e-12);
        assert!((tt.alpha - t.alpha).abs() < 1e-12);
        assert!((tt.zoom - t.zoom).abs() < 1e-12);
    }

    #[test]
    fn az_ls_round_trip_when_c_is_one() {
        let t = Transform::new(1.0, 2.0, 0.1, 5.0);
        let back = t.to_ls().to_az();
        assert!((back.x - t.x).abs() < 1e-12);
        assert!((back.y - t.y).abs() < 1e-12);
        assert!((back.alpha - t.alpha).abs() < 1e-12);
        assert!((back.zoom - t.zoom).abs() < 1e-12);
    }
}
