// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Orchestration: the state machines that drive the Detector, the fit, the
//! path smoother and the Warper in the order the two passes need.
//!
//! [`Transformer`] is the batch, two-pass entry point: it fits every frame's
//! local motions to a global transform, smooths the resulting camera path
//! once over the whole sequence (this needs the full path, hence batch, not
//! streaming), and then hands out one compensating transform per
//! [`Transformer::next_transform`] call -- repeating the last available
//! transform and logging a single warning if asked for more frames than it
//! has transforms for, exactly like `vsGetNextTransform`.
//!
//! [`Stabilizer`] is the single-pass "deshake" variant named in
//! `SPEC_FULL.md` §6's host-filter surface: detect, fit, smooth (via the
//! incremental [`SlidingAvgTrans`] smoother, since no lookahead across the
//! whole clip is available) and warp all run per incoming frame.

use crate::detect::{DetectConfig, Detector};
use crate::error::Result;
use crate::fit::{FitConfig, Fitter};
use crate::smooth::{TransformConfig, low_pass_transform, preprocess_transforms};
use crate::types::frame::{Frame, FrameInfo};
use crate::types::motion::LocalMotions;
use crate::types::transform::{SlidingAvgTrans, Transform, Transformations};
use crate::warp::Warper;

/// Pass two: fits, smooths and warps a whole sequence of frames once their
/// local motions are known (from a live [`Detector`], or read back from the
/// serializer).
pub struct Transformer {
    transform_config: TransformConfig,
    frame_info: FrameInfo,
    warper: Warper,
    transforms: Transformations,
}

impl Transformer {
    /// Fits `motions` (one `LocalMotions` per frame, in order) to global
    /// transforms, then runs the configured path smoother once over the
    /// whole sequence. `fixed_point` controls the warp arithmetic used by
    /// every subsequent [`Transformer::transform_frame`] call.
    pub fn new(
        transform_config: TransformConfig,
        fit_config: FitConfig,
        frame_info: FrameInfo,
        motions: &[LocalMotions],
        seed: u64,
    ) -> Result<Self> {
        let mut fitter = Fitter::new(fit_config, frame_info, seed);
        let fitted: Vec<Transform> = motions.iter().map(|m| fitter.fit(m)).collect();
        let mut transforms = Transformations::new(fitted);
        if !transforms.is_empty() {
            preprocess_transforms(&transform_config, &frame_info, &mut transforms)?;
        }
        Ok(Transformer {
            transform_config,
            frame_info,
            warper: Warper::new(frame_info),
            transforms,
        })
    }

    /// Number of transforms available, i.e. the number of frames pass one
    /// produced local motions for.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// `vsGetNextTransform`'s equivalent: advances the cursor and returns the
    /// transform for the next frame. Once the sequence is exhausted, the
    /// last transform is repeated and a single warning is logged --
    /// `warned_end` latches so it fires at most once per `Transformer`. A
    /// `Transformer` built from zero frames always returns identity.
    pub fn next_transform(&mut self) -> Transform {
        if self.transforms.is_empty() {
            return Transform::identity();
        }
        let len = self.transforms.len();
        if self.transforms.current >= len {
            self.transforms.current = len;
            if !self.transforms.warned_end {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "not enough transforms found, using the last transformation for every \
                     remaining frame"
                );
                self.transforms.warned_end = true;
            }
        } else {
            self.transforms.current += 1;
        }
        self.transforms.transforms[self.transforms.current - 1]
    }

    /// Warps `frame` by the next compensating transform.
    pub fn transform_frame(&mut self, frame: &Frame, fixed_point: bool) -> Frame {
        let t = self.next_transform();
        self.warper
            .warp(frame, &t, &self.transform_config, fixed_point)
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.frame_info
    }
}

/// Single-pass "deshake" variant: detect, fit, smooth and warp all run on
/// each incoming frame with no lookahead, trading path-smoothing quality for
/// the ability to stabilize a stream frame by frame.
pub struct Stabilizer {
    detector: Detector,
    fitter: Fitter,
    transform_config: TransformConfig,
    mem: SlidingAvgTrans,
    warper: Warper,
}

impl Stabilizer {
    pub fn new(
        detect_config: DetectConfig,
        fit_config: FitConfig,
        mut transform_config: TransformConfig,
        frame_info: FrameInfo,
        seed: u64,
    ) -> Result<Self> {
        transform_config.incremental_frame_width = frame_info.width as f64;
        transform_config.incremental_frame_height = frame_info.height as f64;
        Ok(Stabilizer {
            detector: Detector::new(detect_config, frame_info)?,
            fitter: Fitter::new(fit_config, frame_info, seed),
            transform_config,
            mem: SlidingAvgTrans::default(),
            warper: Warper::new(frame_info),
        })
    }

    /// Detects, fits, smooths and warps one frame, returning the stabilized
    /// output. The first call always returns `frame` unchanged: there is no
    /// previous frame to measure motion against yet, so the relative
    /// transform the detector/fit produce is identity.
    pub fn stabilize_frame(&mut self, frame: &Frame, fixed_point: bool) -> Result<Frame> {
        let motions = self.detector.detect_frame(frame)?;
        let relative = self.fitter.fit(&motions);
        let compensating =
            low_pass_transform(&self.transform_config, &mut self.mem, &relative);
        Ok(self
            .warper
            .warp(frame, &compensating, &self.transform_config, fixed_point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::frame::PixelFormat;
    use crate::types::motion::{Field, LocalMotion, Vector2i};

    fn frame_info() -> FrameInfo {
        FrameInfo::new(64, 48, PixelFormat::Gray8).unwrap()
    }

    fn blank_frame() -> Frame {
        Frame::new_zeroed(frame_info())
    }

    #[test]
    fn transformer_with_no_frames_returns_identity_forever() {
        let mut transformer = Transformer::new(
            TransformConfig::default(),
            FitConfig::default(),
            frame_info(),
            &[],
            1,
        )
        .unwrap();
        assert!(transformer.is_empty());
        assert_eq!(transformer.next_transform(), Transform::identity());
        assert_eq!(transformer.next_transform(), Transform::identity());
    }

    #[test]
    fn transformer_repeats_last_transform_on_underrun() {
        let motions: Vec<LocalMotions> = vec![
            vec![LocalMotion {
                field: Field {
                    x: 20,
                    y: 20,
                    size: 8,
                },
                v: Vector2i { x: 2, y: 0 },
                contrast: 0.5,
                quality: 1.0,
            }],
            vec![LocalMotion {
                field: Field {
                    x: 20,
                    y: 20,
                    size: 8,
                },
                v: Vector2i { x: 4, y: 0 },
                contrast: 0.5,
                quality: 1.0,
            }],
        ];
        let config = TransformConfig {
            cam_path_algo: crate::smooth::PathSmootherAlgo::Avg,
            opt_zoom: 0,
            relative: false,
            ..Default::default()
        };
        let mut transformer =
            Transformer::new(config, FitConfig::default(), frame_info(), &motions, 1).unwrap();
        assert_eq!(transformer.len(), 2);

        let first = transformer.next_transform();
        let second = transformer.next_transform();
        // Past the end of the sequence the last transform repeats.
        let third = transformer.next_transform();
        let fourth = transformer.next_transform();
        assert_ne!(first, Transform::identity());
        assert_eq!(second, third);
        assert_eq!(third, fourth);
    }

    #[test]
    fn stabilizer_first_frame_passes_through_unchanged() {
        let mut stabilizer = Stabilizer::new(
            DetectConfig::default(),
            FitConfig::default(),
            TransformConfig::default(),
            frame_info(),
            1,
        )
        .unwrap();
        let frame = blank_frame();
        let out = stabilizer.stabilize_frame(&frame, false).unwrap();
        assert_eq!(out.luma().as_bytes(), frame.luma().as_bytes());
    }
}
