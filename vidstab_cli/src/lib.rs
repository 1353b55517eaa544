// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Support code for the `vidstab_cli` binary: option parsing and the
//! minimal Y4M frame reader/writer used as a demonstration harness. Neither
//! is part of the library's contract -- a host application with its own
//! container/frame-format glue drives `vidstab` directly.

pub mod args;
pub mod y4m;

#[cfg(test)]
mod tests {
    use crate::y4m::{Y4mReader, Y4mWriter};
    use vidstab::detect::{DetectConfig, Detector};
    use vidstab::pipeline::Transformer;
    use vidstab::serialize::{read_local_motions, write_local_motions};
    use vidstab::smooth::{PathSmootherAlgo, TransformConfig};
    use vidstab::{FrameInfo, PixelFormat};
    use vidstab_test_utils::assert_almost_eq;

    fn moving_checker_y4m(width: usize, height: usize, frames: usize) -> Vec<u8> {
        let info = FrameInfo::new(width, height, PixelFormat::Gray8).unwrap();
        let mut out = Vec::new();
        let mut writer = Y4mWriter::new(&mut out);
        for f in 0..frames {
            let mut frame = vidstab::Frame::new_zeroed(info);
            let shift = f * 2;
            for y in 0..height {
                for x in 0..width {
                    let on = (((x + shift) / 8) + (y / 8)) % 2 == 0;
                    frame.luma_mut().set(x, y, if on { 220 } else { 20 });
                }
            }
            writer.write_frame(&frame).unwrap();
        }
        writer.flush().unwrap();
        out
    }

    #[test]
    fn detect_then_transform_round_trips_through_the_local_motions_file() {
        let stream = moving_checker_y4m(160, 120, 6);

        let mut reader = Y4mReader::new(stream.as_slice()).unwrap();
        let frame_info = reader.frame_info();
        let detect_config = DetectConfig::default();
        let mut detector = Detector::new(detect_config, frame_info).unwrap();

        let mut motions = Vec::new();
        while let Some(frame) = reader.next_frame().unwrap() {
            motions.push(detector.detect_frame(&frame).unwrap());
        }
        assert_eq!(motions.len(), 6);

        let text = write_local_motions(&motions, &detect_config);
        let parsed = read_local_motions(&text).unwrap();
        assert_eq!(parsed.len(), motions.len());
        for (before, after) in motions.iter().zip(parsed.iter()) {
            assert_eq!(before.len(), after.len());
            for (lm_before, lm_after) in before.iter().zip(after.iter()) {
                // contrast/quality are written with six decimal digits; confirm
                // the text round trip only loses that much precision.
                assert_almost_eq!(lm_before.contrast, lm_after.contrast, 1e-5);
                assert_almost_eq!(lm_before.quality, lm_after.quality, 1e-5);
            }
        }

        let config = TransformConfig {
            cam_path_algo: PathSmootherAlgo::Avg,
            opt_zoom: 0,
            ..Default::default()
        };
        let mut transformer =
            Transformer::new(config, Default::default(), frame_info, &parsed, 1).unwrap();

        let mut reader = Y4mReader::new(stream.as_slice()).unwrap();
        let mut out = Vec::new();
        {
            let mut writer = Y4mWriter::new(&mut out);
            while let Some(frame) = reader.next_frame().unwrap() {
                let warped = transformer.transform_frame(&frame, false);
                writer.write_frame(&warped).unwrap();
            }
            writer.flush().unwrap();
        }
        assert!(!out.is_empty());
    }
}
