// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Pass one: per-frame local motion estimation against the previous frame.
//!
//! A [`Detector`] holds a fixed grid of measurement [`Field`]s laid out once
//! at configure time, plus a copy of the previous frame (or a fixed "tripod"
//! reference). Each call to [`Detector::detect_frame`] selects the
//! highest-contrast subset of fields, block-matches each one against the
//! reference, and returns the surviving [`LocalMotions`].

use crate::error::{Error, Result};
use crate::types::frame::{Frame, FrameInfo, Plane};
use crate::types::motion::{Field, LocalMotion, LocalMotions, Vector2i};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which contrast estimator [`Detector::detect_frame`] uses to rank fields.
/// The original carries both; `Average` is its default for 8-bit planar
/// luma.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContrastMeasure {
    /// Mean absolute deviation from the field's mean luminance, normalized
    /// to `[0, 1]`.
    Average,
    /// `(max - min) / (max + min + 0.1) * 0.1`, guarding the degenerate
    /// all-black case.
    Michelson,
}

impl Default for ContrastMeasure {
    fn default() -> Self {
        ContrastMeasure::Average
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DetectConfig {
    /// Scales `maxShift` and `fieldSize`; 1..10.
    pub shakiness: u8,
    /// Fraction of fields actually used; must be >= shakiness; 1..15.
    pub accuracy: u8,
    /// Coarse stride of the shift search; >=1.
    pub step_size: i32,
    /// Fields below this normalized contrast are discarded.
    pub contrast_threshold: f64,
    /// 0: no annotation, 1: draw fields+vectors, 2: also draw scan areas.
    pub show: u8,
    /// If `Some(n)`, all frames are matched against frame `n` instead of the
    /// immediate predecessor.
    pub virtual_tripod: Option<usize>,
    pub contrast_measure: ContrastMeasure,
    /// If `false` (the default), a motion that equals the search boundary on
    /// either axis is clamped to zero -- boundary hits are presumed to mean
    /// the true match lies further out than the search radius reaches, so
    /// reporting it is less reliable than reporting no motion.
    pub allow_max: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        DetectConfig {
            shakiness: 5,
            accuracy: 9,
            step_size: 6,
            contrast_threshold: 0.25,
            show: 0,
            virtual_tripod: None,
            contrast_measure: ContrastMeasure::default(),
            allow_max: false,
        }
    }
}

/// Per-frame local-motion estimator. Holds the field grid (fixed for the
/// lifetime of the instance) and a copy of the reference frame.
pub struct Detector {
    config: DetectConfig,
    info: FrameInfo,
    fields: Vec<Field>,
    field_rows: usize,
    max_fields: usize,
    max_shift: i32,
    frame_num: usize,
    prev: Option<Frame>,
    tripod: Option<Frame>,
}

impl Detector {
    pub fn new(config: DetectConfig, info: FrameInfo) -> Result<Self> {
        if config.accuracy < config.shakiness / 2 {
            return Err(Error::AccuracyBelowShakiness {
                accuracy: config.accuracy,
                shakiness: config.shakiness,
            });
        }
        let shakiness = config.shakiness.clamp(1, 10) as i32;
        let min_dim = info.width.min(info.height) as i32;
        let max_shift = (min_dim * shakiness / 40).max(4);
        let field_size = (min_dim * shakiness / 40).max(4);

        let rows = (((info.height as i32 - max_shift * 2) / field_size - 1).max(3)) as usize;
        let cols = (((info.width as i32 - max_shift * 2) / field_size - 1).max(3)) as usize;
        let field_num = rows * cols;

        let border = field_size / 2 + max_shift + config.step_size;
        if info.width as i32 <= 2 * border || info.height as i32 <= 2 * border {
            return Err(Error::FrameTooSmall(info.width, info.height));
        }
        let step_x = (info.width as i32 - 2 * border) / (cols.max(2) as i32 - 1);
        let step_y = (info.height as i32 - 2 * border) / (rows.max(2) as i32 - 1);

        let mut fields = Vec::new();
        fields
            .try_reserve_exact(field_num)
            .map_err(Error::FatalInit)?;
        for j in 0..rows {
            for i in 0..cols {
                fields.push(Field {
                    x: border + i as i32 * step_x,
                    y: border + j as i32 * step_y,
                    size: field_size,
                });
            }
        }

        let max_fields = (config.accuracy as usize * field_num / 15).max(1);

        Ok(Detector {
            config,
            info,
            fields,
            field_rows: rows,
            max_fields,
            max_shift,
            frame_num: 0,
            prev: None,
            tripod: None,
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Estimates local motion of `frame` against the previous frame (or the
    /// tripod reference). The first call always returns an empty
    /// `LocalMotions` and records `frame` as the reference.
    pub fn detect_frame(&mut self, frame: &Frame) -> Result<LocalMotions> {
        if frame.info.bytes_per_pixel() != self.info.bytes_per_pixel() {
            return Err(Error::BytesPerPixelMismatch {
                expected: self.info.bytes_per_pixel(),
                got: frame.info.bytes_per_pixel(),
            });
        }

        let motions = if let Some(reference) = self.reference() {
            self.measure_fields(reference.luma(), frame.luma())
        } else {
            Vec::new()
        };

        // In tripod mode the reference is fixed the first time it is set
        // and never replaced; otherwise every frame becomes the reference
        // for the next call.
        if self.config.virtual_tripod == Some(self.frame_num) {
            self.tripod = Some(frame.clone());
        }
        if self.config.virtual_tripod.is_none() {
            self.prev = Some(frame.clone());
        } else if self.prev.is_none() {
            self.prev = Some(frame.clone());
        }

        self.frame_num += 1;
        Ok(motions)
    }

    fn reference(&self) -> Option<&Frame> {
        self.tripod.as_ref().or(self.prev.as_ref())
    }

    /// Draws `motions` onto a copy of `frame`'s luma plane when
    /// `config.show > 0`: each field's box (grey) and its motion vector
    /// (center dot plus an offset box at the matched position, both
    /// brighter). `show == 2` additionally draws the full search area each
    /// field was scanned within. A no-op (returns a plain clone) when
    /// `show == 0` or the frame isn't planar with a one-byte luma sample.
    pub fn annotate(&self, frame: &Frame, motions: &LocalMotions) -> Frame {
        let mut out = frame.clone();
        if self.config.show == 0 || frame.info.bytes_per_pixel() != 1 {
            return out;
        }
        let luma = out.luma_mut();
        // Each pass runs to completion before the next so overlapping boxes
        // stack in a fixed order instead of depending on iteration order.
        if self.config.show > 1 {
            for lm in motions {
                let s = lm.field.size + 2 * self.max_shift;
                draw_box(luma, lm.field.x, lm.field.y, s, s, 80);
            }
        }
        for lm in motions {
            draw_box(luma, lm.field.x, lm.field.y, lm.field.size, lm.field.size, 40);
        }
        for lm in motions {
            draw_box(luma, lm.field.x, lm.field.y, 5, 5, 128);
            draw_box(luma, lm.field.x + lm.v.x, lm.field.y + lm.v.y, 8, 8, 250);
        }
        out
    }

    fn measure_fields(&self, reference: &Plane, current: &Plane) -> LocalMotions {
        let selected = self.select_fields(current);
        if selected.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::info!("no field survived contrast filtering; emitting empty local motions");
            return Vec::new();
        }

        let boundary = self.max_shift + self.config.step_size;
        let allow_max = self.config.allow_max;
        let search = move |(field, contrast): (Field, f64)| {
            block_match(reference, current, field, self.max_shift, self.config.step_size)
                .map(|(mut v, quality)| {
                    if !allow_max {
                        if v.x.abs() >= boundary {
                            v.x = 0;
                        }
                        if v.y.abs() >= boundary {
                            v.y = 0;
                        }
                    }
                    LocalMotion {
                        field,
                        v,
                        contrast,
                        quality,
                    }
                })
        };

        #[cfg(feature = "parallel")]
        let results: Vec<LocalMotion> = selected.into_par_iter().filter_map(search).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<LocalMotion> = selected.into_iter().filter_map(search).collect();

        results
    }

    /// Stratified field selection: split the grid into `rows+1` row
    /// segments, keep the best-contrast fields per segment up to a
    /// per-segment quota, then top up any remaining budget from the global
    /// ranking.
    fn select_fields(&self, current: &Plane) -> Vec<(Field, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let c = contrast(current, field, self.config.contrast_measure);
                let c = if c < self.config.contrast_threshold { 0.0 } else { c };
                (i, c)
            })
            .collect();

        let num_segments = self.field_rows + 1;
        let segment_len = self.fields.len() / num_segments + 1;
        let quota_per_segment = self.max_fields / num_segments;

        let mut chosen = vec![false; self.fields.len()];
        let mut selected = Vec::with_capacity(self.max_fields);

        for seg in 0..num_segments {
            let start = (segment_len * seg).min(scored.len());
            let end = (segment_len * (seg + 1)).min(scored.len());
            let mut segment: Vec<(usize, f64)> = scored[start..end].to_vec();
            segment.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            for &(idx, c) in segment.iter().take(quota_per_segment) {
                if c > 0.0 && !chosen[idx] {
                    chosen[idx] = true;
                    selected.push((idx, c));
                }
            }
        }

        let remaining = self.max_fields.saturating_sub(selected.len());
        if remaining > 0 {
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            for &(idx, c) in scored.iter() {
                if selected.len() >= self.max_fields {
                    break;
                }
                if c > 0.0 && !chosen[idx] {
                    chosen[idx] = true;
                    selected.push((idx, c));
                }
            }
        }

        selected
            .into_iter()
            .map(|(idx, c)| (self.fields[idx], c))
            .collect()
    }
}

/// Fills an axis-aligned `size_x`*`size_y` box centered at `(cx, cy)` with
/// `color`, clipping to the plane's bounds.
fn draw_box(plane: &mut Plane, cx: i32, cy: i32, size_x: i32, size_y: i32, color: u8) {
    let w = plane.width() as i32;
    let h = plane.height() as i32;
    let x0 = cx - size_x / 2;
    let y0 = cy - size_y / 2;
    for j in 0..size_y {
        let y = y0 + j;
        if y < 0 || y >= h {
            continue;
        }
        for k in 0..size_x {
            let x = x0 + k;
            if x < 0 || x >= w {
                continue;
            }
            plane.set(x as usize, y as usize, color);
        }
    }
}

/// Mean-absolute-deviation contrast (`Average`) or Michelson contrast,
/// normalized to roughly `[0, 1]` in both cases.
fn contrast(plane: &Plane, field: &Field, measure: ContrastMeasure) -> f64 {
    let s2 = field.size / 2;
    let x0 = (field.x - s2) as usize;
    let y0 = (field.y - s2) as usize;
    let size = field.size as usize;

    match measure {
        ContrastMeasure::Average => {
            let mut sum: u64 = 0;
            for y in 0..size {
                let row = plane.row(y0 + y);
                for x in 0..size {
                    sum += row[x0 + x] as u64;
                }
            }
            let numpixel = (size * size) as u64;
            let mean = (sum / numpixel) as i64;
            let mut var: i64 = 0;
            for y in 0..size {
                let row = plane.row(y0 + y);
                for x in 0..size {
                    var += (row[x0 + x] as i64 - mean).abs();
                }
            }
            var as f64 / numpixel as f64 / 255.0
        }
        ContrastMeasure::Michelson => {
            let mut mini = 255u8;
            let mut maxi = 0u8;
            for y in 0..size {
                let row = plane.row(y0 + y);
                for x in 0..size {
                    let p = row[x0 + x];
                    mini = mini.min(p);
                    maxi = maxi.max(p);
                }
            }
            0.1 * (maxi as f64 - mini as f64) / (maxi as f64 + mini as f64 + 0.1)
        }
    }
}

/// Sum of absolute pixel differences of `field` in `current` versus the same
/// field shifted by `(dx, dy)` in `reference`.
fn compare_sub_img(reference: &Plane, current: &Plane, field: &Field, dx: i32, dy: i32) -> i64 {
    let s2 = field.size / 2;
    let size = field.size;
    let mut sum: i64 = 0;
    for j in 0..size {
        let cy = (field.y - s2 + j) as usize;
        let ry = (field.y - s2 + dy + j) as usize;
        let crow = current.row(cy);
        let rrow = reference.row(ry);
        for i in 0..size {
            let cx = (field.x - s2 + i) as usize;
            let rx = (field.x - s2 + dx + i) as usize;
            sum += (crow[cx] as i64 - rrow[rx] as i64).abs();
        }
    }
    sum
}

/// Returns `true` if `field` shifted by `(dx, dy)` still lies entirely
/// inside `plane`.
fn shift_in_bounds(plane: &Plane, field: &Field, dx: i32, dy: i32) -> bool {
    let s2 = field.size / 2;
    let x0 = field.x - s2 + dx;
    let y0 = field.y - s2 + dy;
    x0 >= 0
        && y0 >= 0
        && (x0 + field.size) as usize <= plane.width()
        && (y0 + field.size) as usize <= plane.height()
}

/// Coarse (stride `step_size`) plus fine (stride 1) block-match search for
/// one field. Returns `None` if no candidate shift keeps the field inside
/// both planes.
fn block_match(
    reference: &Plane,
    current: &Plane,
    field: Field,
    max_shift: i32,
    step_size: i32,
) -> Option<(Vector2i, f64)> {
    let mut best = i64::MAX;
    let mut best_dx = 0;
    let mut best_dy = 0;
    let mut found = false;

    let step = step_size.max(1);
    let mut dy = -max_shift;
    while dy <= max_shift {
        let mut dx = -max_shift;
        while dx <= max_shift {
            if shift_in_bounds(current, &field, dx, dy) && shift_in_bounds(reference, &field, dx, dy)
            {
                let err = compare_sub_img(reference, current, &field, dx, dy);
                if err < best {
                    best = err;
                    best_dx = dx;
                    best_dy = dy;
                    found = true;
                }
            }
            dx += step;
        }
        dy += step;
    }

    if !found {
        return None;
    }

    if step > 1 {
        let (cx, cy) = (best_dx, best_dy);
        let r = step - 1;
        for dy in cy - r..=cy + r {
            for dx in cx - r..=cx + r {
                if dx == cx && dy == cy {
                    continue;
                }
                if shift_in_bounds(current, &field, dx, dy)
                    && shift_in_bounds(reference, &field, dx, dy)
                {
                    let err = compare_sub_img(reference, current, &field, dx, dy);
                    if err < best {
                        best = err;
                        best_dx = dx;
                        best_dy = dy;
                    }
                }
            }
        }
    }

    let area = (field.size * field.size) as f64;
    let quality = best as f64 / area;
    Some((Vector2i { x: best_dx, y: best_dy }, quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::frame::{Plane, PixelFormat};
    use test_log::test;

    fn solid_frame(width: usize, height: usize, value: u8) -> Frame {
        let info = FrameInfo::new(width, height, PixelFormat::Gray8).unwrap();
        let mut frame = Frame::new_zeroed(info);
        frame.luma_mut().fill(value);
        frame
    }

    fn checker_frame(width: usize, height: usize) -> Frame {
        let info = FrameInfo::new(width, height, PixelFormat::Gray8).unwrap();
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let on = ((x / 8) + (y / 8)) % 2 == 0;
                data[y * width + x] = if on { 220 } else { 20 };
            }
        }
        Frame::from_planes(info, vec![Plane::from_bytes(data, width, height)]).unwrap()
    }

    #[test]
    fn first_call_emits_empty_local_motions() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let mut det = Detector::new(DetectConfig::default(), info).unwrap();
        let frame = checker_frame(160, 120);
        let lms = det.detect_frame(&frame).unwrap();
        assert!(lms.is_empty());
    }

    #[test]
    fn low_contrast_frame_yields_no_surviving_fields() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let mut det = Detector::new(DetectConfig::default(), info).unwrap();
        let frame = solid_frame(160, 120, 128);
        det.detect_frame(&frame).unwrap();
        let lms = det.detect_frame(&frame).unwrap();
        assert!(lms.is_empty());
    }

    #[test]
    fn static_scene_detects_near_zero_motion() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let mut det = Detector::new(DetectConfig::default(), info).unwrap();
        let frame = checker_frame(160, 120);
        det.detect_frame(&frame).unwrap();
        let lms = det.detect_frame(&frame).unwrap();
        assert!(!lms.is_empty());
        for lm in &lms {
            assert_eq!(lm.v.x, 0);
            assert_eq!(lm.v.y, 0);
        }
    }

    #[test]
    fn detected_motion_never_exceeds_search_radius() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let config = DetectConfig::default();
        let step_size = config.step_size;
        let mut det = Detector::new(config, info).unwrap();
        let max_shift = det.max_shift;
        let frame = checker_frame(160, 120);
        det.detect_frame(&frame).unwrap();
        let lms = det.detect_frame(&frame).unwrap();
        for lm in &lms {
            assert!(lm.v.x.abs() <= max_shift + step_size);
            assert!(lm.v.y.abs() <= max_shift + step_size);
        }
    }

    #[test]
    fn field_grid_respects_border_invariant() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let config = DetectConfig::default();
        let step_size = config.step_size;
        let det = Detector::new(config, info).unwrap();
        let max_shift = det.max_shift;
        for field in det.fields() {
            let s2 = field.size / 2;
            assert!(field.x - s2 - max_shift - step_size >= 0);
            assert!(field.y + s2 + max_shift + step_size <= 120);
        }
    }

    #[test]
    fn annotate_is_a_no_op_clone_when_show_is_zero() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let det = Detector::new(DetectConfig::default(), info).unwrap();
        let frame = checker_frame(160, 120);
        let motions = vec![LocalMotion {
            field: Field { x: 80, y: 60, size: 16 },
            v: Vector2i { x: 4, y: -2 },
            contrast: 0.5,
            quality: 1.0,
        }];
        let out = det.annotate(&frame, &motions);
        assert_eq!(out.luma().as_bytes(), frame.luma().as_bytes());
    }

    #[test]
    fn annotate_marks_field_center_and_vector_when_shown() {
        let info = FrameInfo::new(160, 120, PixelFormat::Gray8).unwrap();
        let mut config = DetectConfig::default();
        config.show = 2;
        let det = Detector::new(config, info).unwrap();
        let frame = solid_frame(160, 120, 0);
        let motions = vec![LocalMotion {
            field: Field { x: 80, y: 60, size: 16 },
            v: Vector2i { x: 10, y: 0 },
            contrast: 0.5,
            quality: 1.0,
        }];
        let out = det.annotate(&frame, &motions);
        assert_eq!(out.luma().get(80, 60), 128);
        assert_eq!(out.luma().get(90, 60), 250);
        assert_ne!(out.luma().as_bytes(), frame.luma().as_bytes());
    }
}
