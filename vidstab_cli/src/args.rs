// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! `clap::Args` option groups that build the library's configuration
//! records. Each subcommand in `main.rs` flattens the groups it needs; no
//! independent option-string parser lives outside this module.

use clap::{Args, ValueEnum};
use vidstab::detect::{ContrastMeasure, DetectConfig};
use vidstab::fit::FitConfig;
use vidstab::smooth::{CropMode, PathSmootherAlgo, TransformConfig};
use vidstab::warp::InterpolType;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ContrastMeasureArg {
    Average,
    Michelson,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// How shaky the input is, 1 (little) .. 10 (very); scales field size
    /// and search radius.
    #[arg(long, default_value_t = 5)]
    pub shakiness: u8,

    /// Fraction of candidate fields actually measured, 1..15; must be >=
    /// shakiness/2.
    #[arg(long, default_value_t = 9)]
    pub accuracy: u8,

    /// Coarse search stride, in pixels.
    #[arg(long, default_value_t = 6)]
    pub stepsize: i32,

    /// Discard fields with normalized contrast below this.
    #[arg(long, default_value_t = 0.25)]
    pub mincontrast: f64,

    /// 0: no annotation, 1: draw fields+vectors onto a side channel, 2: also
    /// draw scan areas. (Only observable through the library's `annotate`;
    /// the CLI does not currently emit an annotated stream.)
    #[arg(long, default_value_t = 0)]
    pub show: u8,

    /// Match every frame against this (0-based) frame instead of its
    /// immediate predecessor.
    #[arg(long)]
    pub tripod: Option<usize>,

    #[arg(long, value_enum, default_value_t = ContrastMeasureArg::Average)]
    pub contrast_measure: ContrastMeasureArg,

    /// Report motions that hit the search boundary instead of clamping them
    /// to zero.
    #[arg(long, default_value_t = false)]
    pub allow_max: bool,
}

impl DetectArgs {
    pub fn to_config(&self) -> DetectConfig {
        DetectConfig {
            shakiness: self.shakiness,
            accuracy: self.accuracy,
            step_size: self.stepsize,
            contrast_threshold: self.mincontrast,
            show: self.show,
            virtual_tripod: self.tripod,
            contrast_measure: match self.contrast_measure {
                ContrastMeasureArg::Average => ContrastMeasure::Average,
                ContrastMeasureArg::Michelson => ContrastMeasure::Michelson,
            },
            allow_max: self.allow_max,
        }
    }
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Use the cheap trimmed-mean fit instead of gradient-descent
    /// optimization.
    #[arg(long, default_value_t = false)]
    pub simple_motion_calculation: bool,

    /// Keep the zoom the fit estimated instead of leaving zoom entirely to
    /// the path smoother's optimal-zoom pass.
    #[arg(long, default_value_t = false)]
    pub smooth_zoom: bool,
}

impl FitArgs {
    pub fn to_config(&self) -> FitConfig {
        FitConfig {
            simple_motion_calculation: self.simple_motion_calculation,
            smooth_zoom: self.smooth_zoom,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CropArg {
    Keep,
    Black,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InterpolArg {
    Zero,
    Linear,
    Bilinear,
    Bicubic,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum AlgoArg {
    Avg,
    Gaussian,
    Optimall1,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Clamp `|x|,|y|` to this many pixels after smoothing; -1 disables.
    #[arg(long, default_value_t = -1)]
    pub maxshift: i32,

    /// Clamp `|alpha|` to this many radians after smoothing; -1 disables.
    #[arg(long, default_value_t = -1.0)]
    pub maxangle: f64,

    #[arg(long, value_enum, default_value_t = CropArg::Keep)]
    pub crop: CropArg,

    /// Input transforms are per-frame relative rather than already absolute.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    pub relative: bool,

    /// Negate every compensating transform once smoothing is done.
    #[arg(long, default_value_t = false)]
    pub invert: bool,

    /// Window radius (Avg/Gaussian) or general smoothing strength.
    #[arg(long, default_value_t = 15)]
    pub smoothing: usize,

    /// Static additional zoom, in percent.
    #[arg(long, default_value_t = 0.0)]
    pub zoom: f64,

    /// 0 = no optimal zoom, 1 = coarse, 2 = adaptive.
    #[arg(long, default_value_t = 1)]
    pub optzoom: u8,

    /// Per-frame zoom decay used by optimal zoom mode 2.
    #[arg(long, default_value_t = 0.25)]
    pub zoomspeed: f64,

    #[arg(long, value_enum, default_value_t = InterpolArg::Bilinear)]
    pub interpol: InterpolArg,

    #[arg(long, value_enum, default_value_t = AlgoArg::Optimall1)]
    pub smoothing_algo: AlgoArg,

    /// Run the native L1 path solver when `--smoothing-algo optimal-l1`;
    /// when off, falls back to the Gaussian smoother with a logged notice.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    pub l1_enabled: bool,

    /// Enable the Gaussian smoother's scene-cut reset/abort behavior.
    #[arg(long, default_value_t = false)]
    pub scene_cut_aware: bool,

    /// Warp using 16.16 fixed-point arithmetic instead of floating point.
    #[arg(long, default_value_t = false)]
    pub fixed_point: bool,
}

impl TransformArgs {
    pub fn to_config(&self) -> TransformConfig {
        TransformConfig {
            max_shift: self.maxshift,
            max_angle: self.maxangle,
            crop: match self.crop {
                CropArg::Keep => CropMode::KeepBorder,
                CropArg::Black => CropMode::CropBorder,
            },
            relative: self.relative,
            invert: self.invert,
            smoothing: self.smoothing,
            zoom: self.zoom,
            opt_zoom: self.optzoom,
            zoom_speed: self.zoomspeed,
            interpol_type: match self.interpol {
                InterpolArg::Zero => InterpolType::Zero,
                InterpolArg::Linear => InterpolType::Linear,
                InterpolArg::Bilinear => InterpolType::BiLinear,
                InterpolArg::Bicubic => InterpolType::BiCubic,
            },
            cam_path_algo: match self.smoothing_algo {
                AlgoArg::Avg => PathSmootherAlgo::Avg,
                AlgoArg::Gaussian => PathSmootherAlgo::Gaussian,
                AlgoArg::Optimall1 => PathSmootherAlgo::OptimalL1,
            },
            path_weights: (10.0, 1.0, 100.0),
            max_zoom: 10.0,
            l1_enabled: self.l1_enabled,
            scene_cut_aware: self.scene_cut_aware,
            incremental_frame_width: 0.0,
            incremental_frame_height: 0.0,
        }
    }
}
