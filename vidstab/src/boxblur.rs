// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Separable horizontal+vertical box blur, used by the detector to
//! pre-smooth a plane before block matching with a large step size.

use crate::types::frame::Plane;

/// Blurs `plane` with a box kernel of `size` pixels (will be clamped to an
/// odd value in `[3, min(width, height) / 2]`), writing into `dest`.
/// `size < 2` is a no-op copy, matching the original's early return.
pub fn box_blur_plane(dest: &mut Plane, src: &Plane, size: u32) {
    let width = src.width();
    let height = src.height();
    if size < 2 {
        for y in 0..height {
            dest.row_mut(y).copy_from_slice(src.row(y));
        }
        return;
    }
    let max_size = (height / 2).min(width / 2);
    let size = (((size as usize / 2) * 2 + 1).clamp(3, max_size.max(3))) as usize;

    let mut buffer = Plane::new_zeroed(width, height);
    box_blur_horizontal(&mut buffer, src, size);
    box_blur_vertical(dest, &buffer, size);
}

fn box_blur_horizontal(dest: &mut Plane, src: &Plane, size: usize) {
    let width = src.width();
    let height = src.height();
    let size2 = size / 2;
    for y in 0..height {
        let row = src.row(y);
        let mut start = 0usize;
        let mut end = 0usize;
        let mut acc = row[0] as u32 * (size2 as u32 + 1);
        for _ in 0..size2 {
            acc += row[end] as u32;
            end += 1;
        }
        let out = dest.row_mut(y);
        for i in 0..width {
            acc = acc + row[end] as u32 - row[start] as u32;
            if i > size2 {
                start += 1;
            }
            if i < width - size2 - 1 {
                end += 1;
            }
            out[i] = (acc / size as u32) as u8;
        }
    }
}

fn box_blur_vertical(dest: &mut Plane, src: &Plane, size: usize) {
    let width = src.width();
    let height = src.height();
    let size2 = size / 2;
    for x in 0..width {
        let mut start = 0usize;
        let mut end = 0usize;
        let mut acc = src.get(x, 0) as u32 * (size2 as u32 + 1);
        for _ in 0..size2 {
            acc += src.get(x, end) as u32;
            end += 1;
        }
        for y in 0..height {
            acc = acc + src.get(x, end) as u32 - src.get(x, start) as u32;
            if y > size2 {
                start += 1;
            }
            if y < height - size2 - 1 {
                end += 1;
            }
            dest.set(x, y, (acc / size as u32) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_size_is_a_copy() {
        let src = Plane::from_bytes(vec![1, 2, 3, 4, 5, 6, 7, 8, 9], 3, 3);
        let mut dest = Plane::new_zeroed(3, 3);
        box_blur_plane(&mut dest, &src, 1);
        assert_eq!(dest.as_bytes(), src.as_bytes());
    }

    #[test]
    fn constant_plane_is_unchanged_by_blur() {
        let src = Plane::from_bytes(vec![42u8; 16 * 16], 16, 16);
        let mut dest = Plane::new_zeroed(16, 16);
        box_blur_plane(&mut dest, &src, 5);
        assert!(dest.as_bytes().iter().all(|&b| b == 42));
    }

    #[test]
    fn blur_smooths_a_step_edge() {
        let width = 16;
        let height = 16;
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in width / 2..width {
                data[y * width + x] = 255;
            }
        }
        let src = Plane::from_bytes(data, width, height);
        let mut dest = Plane::new_zeroed(width, height);
        box_blur_plane(&mut dest, &src, 5);
        // Pixels right at the transition should be smoothed toward a
        // midpoint rather than remaining a hard 0/255 step.
        let mid_row = height / 2;
        let v = dest.get(width / 2, mid_row);
        assert!(v > 0 && v < 255);
    }
}
