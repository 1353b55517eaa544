// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod frame;
pub mod motion;
pub mod transform;
