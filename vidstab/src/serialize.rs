// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The intermediate file format that lets pass one and pass two run
//! independently: a header, an optional comment block echoing the detector
//! configuration, and one `Frame` line per frame holding that frame's local
//! motions. [`write_local_motions`]/[`read_local_motions`] round-trip this
//! format; [`read_legacy_transforms`] reads the older whitespace-separated
//! transform-only format some tools still emit.

use std::fmt::Write as _;

use crate::detect::DetectConfig;
use crate::error::{Error, Result};
use crate::types::motion::{Field, LocalMotion, LocalMotions, Vector2i};
use crate::types::transform::Transform;

const FILE_VERSION: i32 = 1;

/// Serializes `motions` (one-based frame numbering) to the `VID.STAB` text
/// format, with a comment header echoing `config` for human inspection.
pub fn write_local_motions(motions: &[LocalMotions], config: &DetectConfig) -> String {
    let mut out = String::new();
    writeln!(out, "VID.STAB {FILE_VERSION}").unwrap();
    writeln!(out, "#      accuracy  = {}", config.accuracy).unwrap();
    writeln!(out, "#      shakiness = {}", config.shakiness).unwrap();
    writeln!(out, "#      stepsize  = {}", config.step_size).unwrap();
    writeln!(out, "#      mincontrast = {}", config.contrast_threshold).unwrap();

    for (i, lms) in motions.iter().enumerate() {
        write!(out, "Frame {} (List {}", i + 1, lms.len()).unwrap();
        for lm in lms {
            write!(
                out,
                " (LM {} {} {} {} {} {:.6} {:.6})",
                lm.v.x, lm.v.y, lm.field.x, lm.field.y, lm.field.size, lm.contrast, lm.quality
            )
            .unwrap();
        }
        writeln!(out, ")").unwrap();
    }
    out
}

/// Parses the `VID.STAB` text format produced by [`write_local_motions`].
/// Frame numbers are expected to be contiguous and one-based; a gap is
/// filled with an empty `LocalMotions` and logged as a warning, matching a
/// dropped or skipped frame upstream.
pub fn read_local_motions(input: &str) -> Result<Vec<LocalMotions>> {
    let mut lines = input.lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::ParseError("empty input".to_string()))?;
    let mut header_parts = header.split_whitespace();
    if header_parts.next() != Some("VID.STAB") {
        return Err(Error::ParseError(format!(
            "expected a 'VID.STAB <version>' header, got {header:?}"
        )));
    }
    let version: i32 = header_parts
        .next()
        .ok_or_else(|| Error::ParseError("missing file version".to_string()))?
        .parse()
        .map_err(|_| Error::ParseError("file version is not an integer".to_string()))?;
    if version != FILE_VERSION {
        return Err(Error::UnsupportedFileVersion(version));
    }

    let mut result: Vec<LocalMotions> = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (frame_no, lms) = parse_frame_line(line)?;
        if frame_no < 1 {
            return Err(Error::ParseError(format!(
                "frame numbers are one-based, got {frame_no}"
            )));
        }
        let idx = frame_no as usize - 1;
        while result.len() < idx {
            #[cfg(feature = "tracing")]
            tracing::warn!(frame = result.len() + 1, "gap in local motions file; filling with an empty frame");
            result.push(LocalMotions::new());
        }
        if result.len() == idx {
            result.push(lms);
        } else {
            return Err(Error::ParseError(format!(
                "frame {frame_no} is out of order"
            )));
        }
    }
    Ok(result)
}

fn parse_frame_line(line: &str) -> Result<(i64, LocalMotions)> {
    let rest = line
        .strip_prefix("Frame")
        .ok_or_else(|| Error::ParseError(format!("expected a Frame line, got {line:?}")))?
        .trim_start();
    let (frame_no_str, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| Error::ParseError(format!("malformed Frame line: {line:?}")))?;
    let frame_no: i64 = frame_no_str
        .parse()
        .map_err(|_| Error::ParseError(format!("bad frame number in: {line:?}")))?;

    let rest = rest.trim();
    let rest = rest
        .strip_prefix("(List")
        .ok_or_else(|| Error::ParseError(format!("expected '(List ...', got: {rest:?}")))?;
    let rest = rest.trim_start();
    let (_count_str, mut rest) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest.trim_end_matches(')'), ""));

    let mut lms = LocalMotions::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() || rest == ")" {
            break;
        }
        if let Some(stripped) = rest.strip_prefix("(LM") {
            let close = stripped
                .find(')')
                .ok_or_else(|| Error::ParseError(format!("unterminated (LM in {line:?}")))?;
            let fields_str = &stripped[..close];
            let mut nums = fields_str.split_whitespace();
            let mut next_f64 = |what: &str| -> Result<f64> {
                nums.next()
                    .ok_or_else(|| Error::ParseError(format!("missing {what} in {line:?}")))?
                    .parse::<f64>()
                    .map_err(|_| Error::ParseError(format!("bad {what} in {line:?}")))
            };
            let vx = next_f64("vx")? as i32;
            let vy = next_f64("vy")? as i32;
            let fx = next_f64("fx")? as i32;
            let fy = next_f64("fy")? as i32;
            let size = next_f64("size")? as i32;
            let contrast = next_f64("contrast")?;
            let quality = next_f64("quality")?;
            lms.push(LocalMotion {
                field: Field { x: fx, y: fy, size },
                v: Vector2i { x: vx, y: vy },
                contrast,
                quality,
            });
            rest = &stripped[close + 1..];
        } else if rest.starts_with(')') {
            break;
        } else {
            return Err(Error::ParseError(format!(
                "unexpected token while parsing: {rest:?}"
            )));
        }
    }
    Ok((frame_no, lms))
}

/// Reads the legacy whitespace-separated transform format: one line per
/// frame of `<time> <x> <y> <alpha> [<zoom>] <extra>`, `#`-comments allowed.
/// `time` and `extra` are integers; `time` is unused (frame order is implied
/// by line order) and a 5-field line (no `zoom`) defaults `zoom` to zero.
pub fn read_legacy_transforms(input: &str) -> Result<Vec<Transform>> {
    let mut out = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut next_f64 = |tok: &str| -> Result<f64> {
            tok.parse::<f64>()
                .map_err(|_| Error::ParseError(format!("bad number {tok:?} in {line:?}")))
        };
        let t = match tokens.len() {
            6 => {
                let x = next_f64(tokens[1])?;
                let y = next_f64(tokens[2])?;
                let alpha = next_f64(tokens[3])?;
                let zoom = next_f64(tokens[4])?;
                let mut t = Transform::new(x, y, alpha, zoom);
                t.extra = tokens[5]
                    .parse::<i32>()
                    .map_err(|_| Error::ParseError(format!("bad extra in {line:?}")))?;
                t
            }
            5 => {
                let x = next_f64(tokens[1])?;
                let y = next_f64(tokens[2])?;
                let alpha = next_f64(tokens[3])?;
                let mut t = Transform::new(x, y, alpha, 0.0);
                t.extra = tokens[4]
                    .parse::<i32>()
                    .map_err(|_| Error::ParseError(format!("bad extra in {line:?}")))?;
                t
            }
            n => {
                return Err(Error::ParseError(format!(
                    "expected 5 or 6 fields per line, got {n} in {line:?}"
                )))
            }
        };
        out.push(t);
    }
    Ok(out)
}

/// Serializes `transforms` to the legacy whitespace-separated format.
/// Frame indices are written as the leading (unused) `time` column, one-based
/// to match the `VID.STAB` text format's frame numbering.
pub fn write_legacy_transforms(transforms: &[Transform]) -> String {
    let mut out = String::new();
    writeln!(out, "# time x y alpha zoom extra").unwrap();
    for (i, t) in transforms.iter().enumerate() {
        writeln!(
            out,
            "{} {:.8} {:.8} {:.8} {:.8} {}",
            i + 1,
            t.x,
            t.y,
            t.alpha,
            t.zoom,
            t.extra
        )
        .unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_motions() -> Vec<LocalMotions> {
        vec![
            vec![LocalMotion {
                field: Field { x: 10, y: 20, size: 16 },
                v: Vector2i { x: 1, y: -2 },
                contrast: 0.5,
                quality: 3.25,
            }],
            LocalMotions::new(),
            vec![
                LocalMotion {
                    field: Field { x: 1, y: 2, size: 8 },
                    v: Vector2i { x: 0, y: 0 },
                    contrast: 0.1,
                    quality: 0.0,
                },
                LocalMotion {
                    field: Field { x: 3, y: 4, size: 8 },
                    v: Vector2i { x: -5, y: 5 },
                    contrast: 0.9,
                    quality: 12.0,
                },
            ],
        ]
    }

    #[test]
    fn local_motions_round_trip() {
        let motions = sample_motions();
        let text = write_local_motions(&motions, &DetectConfig::default());
        let parsed = read_local_motions(&text).unwrap();
        assert_eq!(parsed.len(), motions.len());
        for (a, b) in parsed.iter().zip(motions.iter()) {
            assert_eq!(a.len(), b.len());
            for (la, lb) in a.iter().zip(b.iter()) {
                assert_eq!(la.v, lb.v);
                assert_eq!(la.field, lb.field);
                assert!((la.contrast - lb.contrast).abs() < 1e-6);
                assert!((la.quality - lb.quality).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn empty_motions_round_trip() {
        let motions: Vec<LocalMotions> = Vec::new();
        let text = write_local_motions(&motions, &DetectConfig::default());
        let parsed = read_local_motions(&text).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn rejects_wrong_header() {
        assert!(read_local_motions("NOT A HEADER\n").is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = read_local_motions("VID.STAB 99\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileVersion(99)));
    }

    #[test]
    fn gap_in_frame_numbers_is_filled() {
        let text = "VID.STAB 1\nFrame 1 (List 0)\nFrame 3 (List 0)\n";
        let parsed = read_local_motions(text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[1].is_empty());
    }

    #[test]
    fn legacy_transform_round_trip() {
        let transforms = vec![
            Transform::new(1.0, 2.0, 0.1, 3.0),
            Transform::new(-1.5, 0.0, -0.2, 0.0),
        ];
        let text = write_legacy_transforms(&transforms);
        let parsed = read_legacy_transforms(&text).unwrap();
        assert_eq!(parsed.len(), transforms.len());
        for (a, b) in parsed.iter().zip(transforms.iter()) {
            assert!((a.x - b.x).abs() < 1e-6);
            assert!((a.y - b.y).abs() < 1e-6);
            assert!((a.alpha - b.alpha).abs() < 1e-6);
            assert!((a.zoom - b.zoom).abs() < 1e-6);
        }
    }

    #[test]
    fn legacy_transform_without_zoom_defaults_to_zero() {
        let text = "# time x y alpha extra\n1 1.5 -2.5 0.05 0\n";
        let parsed = read_legacy_transforms(text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!((parsed[0].x - 1.5).abs() < 1e-6);
        assert!((parsed[0].y + 2.5).abs() < 1e-6);
        assert!((parsed[0].alpha - 0.05).abs() < 1e-6);
        assert_eq!(parsed[0].zoom, 0.0);
    }
}
