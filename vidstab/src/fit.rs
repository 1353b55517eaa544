// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Aggregates one frame's [`LocalMotions`] into a single global [`Transform`].
//!
//! Two paths are available. The optimization path (default) fits
//! `(x, y, alpha, zoom)` by coordinate-wise gradient descent against a
//! quality functional, disabling outlier fields in two stages. The simple
//! path instead computes a trimmed-mean translation and a trimmed-mean
//! rotation about the field centroid; it is cheaper but less robust to
//! moving objects in the scene, and is only used when explicitly selected.

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::types::motion::{Field, LocalMotion, LocalMotions, Vector2i};
use crate::types::transform::Transform;
use crate::types::frame::FrameInfo;
use crate::util::stats::{mean, stddev, trimmed_mean, trimmed_min_max};

/// Fraction trimmed off each end when averaging translation and rotation in
/// both fit paths.
const TRIM_FRAC: f64 = 0.2;

#[derive(Copy, Clone, Debug)]
pub struct FitConfig {
    /// Use the cheap trimmed-mean fit instead of the gradient-descent
    /// optimization. Off by default; the optimization path handles moving
    /// objects in the scene far better.
    pub simple_motion_calculation: bool,
    /// Keep the zoom component the optimization path fit, rather than
    /// resetting it to zero and leaving zoom entirely to the path
    /// smoother's optimal-zoom pass.
    pub smooth_zoom: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            simple_motion_calculation: false,
            smooth_zoom: false,
        }
    }
}

/// Fits global transforms to per-frame local motions.
///
/// Owns the seeded RNG that drives the optimization path's gradient
/// estimates, so that two `Fitter`s constructed with the same seed produce
/// bit-identical fits from the same input.
pub struct Fitter {
    config: FitConfig,
    frame_info: FrameInfo,
    rng: XorShiftRng,
}

impl Fitter {
    pub fn new(config: FitConfig, frame_info: FrameInfo, seed: u64) -> Self {
        Fitter {
            config,
            frame_info,
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    /// Fits a single global transform to one frame's local motions.
    pub fn fit(&mut self, motions: &LocalMotions) -> Transform {
        if self.config.simple_motion_calculation {
            simple_motions_to_transform(&self.frame_info, motions)
        } else {
            self.motions_to_transform(motions)
        }
    }

    fn motions_to_transform(&mut self, motions: &LocalMotions) -> Transform {
        let mut t = mean_motions(motions);
        if motions.is_empty() {
            return t;
        }

        let match_qualities: Vec<f64> = motions.iter().map(|m| m.quality).collect();
        let mut mismatches = vec![0.0f64; motions.len()];
        disable_fields(&mut mismatches, &match_qualities, 1.5);

        let mut params = transform_to_array(&t);
        let mut step_sizes = [0.2, 0.2, 5e-5, 0.1];
        let mut residual = 0.0;
        let center = (
            self.frame_info.width as f64 / 2.0,
            self.frame_info.height as f64 / 2.0,
        );

        for pass in 0..3 {
            let (result, res) = gradient_descent(
                |p| calc_transform_quality(p, motions, &mut mismatches, center),
                params,
                16,
                step_sizes,
                0.01,
                &mut self.rng,
            );
            residual = res;
            step_sizes = [0.2, 0.2, 5e-5, 0.1];
            let should_continue = (pass == 0 && residual > 0.1) || (pass == 1 && residual > 20.0);
            if should_continue {
                disable_fields(&mut mismatches, &mismatches.clone(), 1.0);
                params = result;
            } else {
                params = result;
                break;
            }
        }

        t = array_to_transform(params);
        if residual > 100.0 {
            t.extra = 1;
        }
        if !self.config.smooth_zoom {
            t.zoom = 0.0;
        }
        t
    }
}

fn transform_to_array(t: &Transform) -> [f64; 4] {
    [t.x, t.y, t.alpha, t.zoom]
}

fn array_to_transform(a: [f64; 4]) -> Transform {
    Transform::new(a[0], a[1], a[2], a[3])
}

/// Quality functional minimized by the optimization path: mean squared
/// residual between the transform's predicted displacement and each
/// enabled field's measured displacement, plus small penalties discouraging
/// large rotation and zoom from a noisy fit.
fn calc_transform_quality(
    params: [f64; 4],
    motions: &LocalMotions,
    mismatches: &mut [f64],
    center: (f64, f64),
) -> f64 {
    let t = array_to_transform(params);
    let mut error = 0.0;
    let mut num = 1; // start at 1 to avoid division by zero
    for (i, m) in motions.iter().enumerate() {
        if mismatches[i] >= 0.0 {
            let f = (m.field.x as f64, m.field.y as f64);
            let predicted = t.apply(f, center);
            let vx = predicted.0 - f.0 - m.v.x as f64;
            let vy = predicted.1 - f.1 - m.v.y as f64;
            let e = vx * vx + vy * vy;
            mismatches[i] = e;
            error += e;
            num += 1;
        }
    }
    error / num as f64 + t.alpha.abs() / 5.0 + t.zoom.abs() / 500.0
}

/// Computes only the mean translation, as the gradient descent's starting
/// point. A frame with no surviving local motions yields the identity
/// transform marked `extra=1` (presumably a blank or too-low-contrast
/// frame, to be ignored downstream).
fn mean_motions(motions: &LocalMotions) -> Transform {
    if motions.is_empty() {
        let mut t = Transform::identity();
        t.extra = 1;
        return t;
    }
    let xs: Vec<f64> = motions.iter().map(|m| m.v.x as f64).collect();
    let ys: Vec<f64> = motions.iter().map(|m| m.v.y as f64).collect();
    Transform::new(int_mean(&xs), int_mean(&ys), 0.0, 0.0)
}

fn int_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Disables (sets negative in `mask`) every field whose `missqualities`
/// entry exceeds `mean + stddevs * stddev`. Disabling is represented as a
/// parallel array rather than removal so field indices stay stable across
/// repeated outlier-rejection passes.
fn disable_fields(mask: &mut [f64], missqualities: &[f64], stddevs: f64) -> usize {
    let mu = mean(missqualities);
    let sigma = stddev(missqualities, mu);
    let thresh = mu + stddevs * sigma;
    let mut count = 0;
    for i in 0..mask.len() {
        if missqualities[i] > thresh {
            mask[i] = -1.0;
            count += 1;
        }
    }
    count
}

/// General-purpose coordinate-wise stochastic gradient descent. Estimates
/// the partial derivative along one coordinate per step via a tiny random
/// `+/-1e-6` perturbation, takes a step scaled by that coordinate's current
/// step size, and adapts the step size: 20% larger on a successful step,
/// halved on an overshoot. Runs for `n * params.len()` steps or until `eval`
/// drops to `threshold`, whichever comes first.
fn gradient_descent<F>(
    mut eval: F,
    params: [f64; 4],
    n: usize,
    mut step_sizes: [f64; 4],
    threshold: f64,
    rng: &mut XorShiftRng,
) -> ([f64; 4], f64)
where
    F: FnMut([f64; 4]) -> f64,
{
    let dim = params.len();
    let mut x = params;
    let mut v = eval(x);
    for i in 0..n * dim {
        if v <= threshold {
            break;
        }
        let k = i % dim;
        let mut probe = x;
        let h = if rng.random_bool(0.5) { 1e-6 } else { -1e-6 };
        probe[k] += h;
        let v_probe = eval(probe);
        let grad_k = (v - v_probe) / h;

        let mut candidate = x;
        candidate[k] += grad_k * step_sizes[k];
        let v_candidate = eval(candidate);
        if v_candidate < v {
            x = candidate;
            v = v_candidate;
            step_sizes[k] *= 1.2;
        } else {
            step_sizes[k] /= 2.0;
        }
    }
    (x, v)
}

/// Rotation angle of a field's displacement about `(center_x, center_y)`,
/// ignoring fields too close to the center for the angle to be meaningful.
fn calc_angle(field: Field, v: Vector2i, center_x: f64, center_y: f64) -> f64 {
    let dx = field.x as f64 - center_x;
    let dy = field.y as f64 - center_y;
    if dx.abs() + dy.abs() < field.size as f64 * 2.0 {
        return 0.0;
    }
    let a1 = dy.atan2(dx);
    let a2 = (dy + v.y as f64).atan2(dx + v.x as f64);
    let diff = a2 - a1;
    if diff > std::f64::consts::PI {
        diff - 2.0 * std::f64::consts::PI
    } else if diff < -std::f64::consts::PI {
        diff + 2.0 * std::f64::consts::PI
    } else {
        diff
    }
}

/// Trimmed-mean translation across all fields, field position zeroed out
/// since only `v` is used by [`calc_angle`]'s rotation-compensation step.
fn cleanmean_localmotions(motions: &LocalMotions) -> LocalMotion {
    let vx: Vec<f64> = motions.iter().map(|m| m.v.x as f64).collect();
    let vy: Vec<f64> = motions.iter().map(|m| m.v.y as f64).collect();
    LocalMotion {
        field: Field { x: 0, y: 0, size: 0 },
        v: Vector2i {
            x: trimmed_mean(&vx, TRIM_FRAC).round() as i32,
            y: trimmed_mean(&vy, TRIM_FRAC).round() as i32,
        },
        contrast: 0.0,
        quality: 0.0,
    }
}

/// The simple fit path: a trimmed-mean translation plus a trimmed-mean
/// rotation about the field centroid, rejected (forced to zero) when the
/// angle estimates disagree by more than 1 radian, or when fewer than 6
/// fields survived (too few for an accurate angle estimate).
fn simple_motions_to_transform(frame_info: &FrameInfo, motions: &LocalMotions) -> Transform {
    let mut t = Transform::identity();
    let num_motions = motions.len();
    if num_motions < 1 {
        return t;
    }

    let mut center_x: i32 = 0;
    let mut center_y: i32 = 0;
    for m in motions {
        center_x += m.field.x;
        center_y += m.field.y;
    }
    center_x /= num_motions as i32;
    center_y /= num_motions as i32;

    let meanmotion = cleanmean_localmotions(motions);

    if num_motions < 6 {
        t.alpha = 0.0;
    } else {
        let angles: Vec<f64> = motions
            .iter()
            .map(|m| {
                let v = Vector2i {
                    x: m.v.x - meanmotion.v.x,
                    y: m.v.y - meanmotion.v.y,
                };
                calc_angle(m.field, v, center_x as f64, center_y as f64)
            })
            .collect();
        let mean_angle = trimmed_mean(&angles, TRIM_FRAC);
        let (min, max) = trimmed_min_max(&angles, TRIM_FRAC);
        t.alpha = -mean_angle;
        if max - min > 1.0 {
            t.alpha = 0.0;
        }
    }

    let p_x = center_x as f64 - frame_info.width as f64 / 2.0;
    let p_y = center_y as f64 - frame_info.height as f64 / 2.0;
    let (sin_a, cos_a) = t.alpha.sin_cos();
    t.x = meanmotion.v.x as f64 + (cos_a - 1.0) * p_x - sin_a * p_y;
    t.y = meanmotion.v.y as f64 + sin_a * p_x + (cos_a - 1.0) * p_y;
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidstab_test_utils::assert_almost_eq;
    use crate::types::frame::PixelFormat;

    fn frame_info(width: usize, height: usize) -> FrameInfo {
        FrameInfo::new(width, height, PixelFormat::Gray8).unwrap()
    }

    fn motion(fx: i32, fy: i32, vx: i32, vy: i32) -> LocalMotion {
        LocalMotion {
            field: Field {
                x: fx,
                y: fy,
                size: 16,
            },
            v: Vector2i { x: vx, y: vy },
            contrast: 0.5,
            quality: 1.0,
        }
    }

    #[test]
    fn empty_motions_yield_extra_marked_identity() {
        let mut fitter = Fitter::new(FitConfig::default(), frame_info(320, 240), 42);
        let t = fitter.fit(&vec![]);
        assert_eq!(t.extra, 1);
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, 0.0);
    }

    #[test]
    fn pure_translation_is_recovered() {
        let motions: LocalMotions = vec![
            motion(50, 50, 10, -4),
            motion(150, 50, 10, -4),
            motion(50, 150, 10, -4),
            motion(150, 150, 10, -4),
            motion(100, 100, 10, -4),
        ];
        let mut fitter = Fitter::new(FitConfig::default(), frame_info(320, 240), 7);
        let t = fitter.fit(&motions);
        assert_almost_eq!(t.x, 10.0, 1.0);
        assert_almost_eq!(t.y, -4.0, 1.0);
        assert_almost_eq!(t.alpha, 0.0, 0.05);
    }

    #[test]
    fn two_fitters_with_same_seed_agree_bit_for_bit() {
        let motions: LocalMotions = vec![
            motion(50, 50, 3, 7),
            motion(150, 60, -2, 5),
            motion(60, 150, 4, -3),
            motion(150, 150, 1, 1),
        ];
        let mut a = Fitter::new(FitConfig::default(), frame_info(320, 240), 99);
        let mut b = Fitter::new(FitConfig::default(), frame_info(320, 240), 99);
        assert_eq!(a.fit(&motions), b.fit(&motions));
    }

    #[test]
    fn simple_path_with_few_fields_forces_zero_rotation() {
        let motions: LocalMotions = vec![motion(50, 50, 5, 5), motion(150, 150, 5, 5)];
        let t = simple_motions_to_transform(&frame_info(320, 240), &motions);
        assert_eq!(t.alpha, 0.0);
    }

    #[test]
    fn disable_fields_marks_outliers_negative() {
        let mut mask = vec![0.0; 5];
        let qualities = vec![1.0, 1.0, 1.0, 1.0, 100.0];
        let disabled = disable_fields(&mut mask, &qualities, 1.0);
        assert_eq!(disabled, 1);
        assert!(mask[4] < 0.0);
    }
}
