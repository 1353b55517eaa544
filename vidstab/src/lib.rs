// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Two-pass video stabilization.
//!
//! Pass one ([`detect`]) walks a video frame by frame and measures local
//! motion between consecutive frames at a grid of fields. Pass two fits a
//! global similarity transform to each frame's local motions ([`fit`]),
//! smooths the resulting camera path ([`smooth`]), and warps each frame by
//! the inverse of the smoothed, de-shaken transform ([`warp`]). [`serialize`]
//! reads and writes the intermediate local-motions/transforms file that lets
//! the two passes run independently. [`pipeline`] ties the three together
//! into the state machines a host application drives frame by frame.

#![deny(unsafe_code)]

pub mod boxblur;
pub mod detect;
pub mod error;
pub mod fit;
pub mod pipeline;
pub mod serialize;
pub mod smooth;
pub mod types;
pub mod util;
pub mod warp;

pub use error::{Error, Result};
pub use pipeline::{Stabilizer, Transformer};
pub use types::frame::{Frame, FrameInfo, PixelFormat, Plane, Rect};
pub use types::motion::{Field, LocalMotion, LocalMotions, Vector2i};
pub use types::transform::{SlidingAvgTrans, Transform, TransformLs, Transformations};
