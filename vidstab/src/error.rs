// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    FatalConfig(String),

    #[error("frame byte layout mismatch: expected {expected} bytes per pixel, frame has {got}")]
    BytesPerPixelMismatch { expected: usize, got: usize },

    #[error("accuracy ({accuracy}) must be >= shakiness/2 ({shakiness})")]
    AccuracyBelowShakiness { accuracy: u8, shakiness: u8 },

    #[error("frame dimensions {0}x{1} too small for the configured field size/search radius")]
    FrameTooSmall(usize, usize),

    #[error("out of memory while allocating field grid or frame buffers")]
    FatalInit(#[from] TryReserveError),

    #[error("rect {w}x{h}+{x}+{y} is out of bounds of a {frame_w}x{frame_h} frame")]
    RectOutOfBounds {
        w: usize,
        h: usize,
        x: usize,
        y: usize,
        frame_w: usize,
        frame_h: usize,
    },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("failed to parse serialized local motions/transforms: {0}")]
    ParseError(String),

    #[error("unsupported local-motion file version: got {0}, expected <= 1")]
    UnsupportedFileVersion(i32),

    #[error("L1 path optimizer received an empty transform sequence")]
    EmptyPath,

    #[error("failed to write output file: {0}")]
    OutputWriteFailure(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
