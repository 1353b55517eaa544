// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! A minimal YUV4MPEG2 ("Y4M") reader/writer: just enough of the format to
//! hand the library raw planar frames and get them back, without pulling in
//! a full container/demuxing dependency. Unknown header and per-frame
//! parameters (`F`rame rate, `A`spect, `I`nterlacing, `X`comments, ...) are
//! accepted and ignored; only `W`idth, `H`eight and `C`olorspace are used.

use std::io::{BufRead, Read, Write};

use color_eyre::eyre::{Result, bail, ensure};
use vidstab::{Frame, FrameInfo, PixelFormat, Plane};

const MAGIC: &str = "YUV4MPEG2";

fn colorspace_to_format(tag: &str) -> Result<PixelFormat> {
    Ok(match tag {
        "mono" => PixelFormat::Gray8,
        "420" | "420jpeg" | "420mpeg2" | "420paldv" => PixelFormat::Yuv420P,
        "410" => PixelFormat::Yuv410P,
        "411" => PixelFormat::Yuv411P,
        "422" => PixelFormat::Yuv422P,
        "440" => PixelFormat::Yuv440P,
        "444" => PixelFormat::Yuv444P,
        other => bail!("unsupported Y4M colorspace tag C{other}"),
    })
}

fn format_to_colorspace(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Gray8 => "mono",
        PixelFormat::Yuv420P => "420jpeg",
        PixelFormat::Yuv410P => "410",
        PixelFormat::Yuv411P => "411",
        PixelFormat::Yuv422P => "422",
        PixelFormat::Yuv440P => "440",
        PixelFormat::Yuv444P => "444",
        PixelFormat::Yuva420P => "420jpeg", // alpha plane not representable in Y4M; dropped on write
        PixelFormat::Rgb24 | PixelFormat::Bgr24 | PixelFormat::Rgba => {
            unreachable!("Y4M only carries planar YUV/grayscale")
        }
    }
}

/// Reads a sequence of raw frames out of a Y4M stream.
pub struct Y4mReader<R> {
    reader: R,
    info: FrameInfo,
}

impl<R: BufRead> Y4mReader<R> {
    /// Parses the stream header and returns a reader positioned at the first
    /// `FRAME` marker.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let header = header.trim_end();

        let mut tokens = header.split_ascii_whitespace();
        ensure!(
            tokens.next() == Some(MAGIC),
            "not a Y4M stream: expected {MAGIC:?} header, got {header:?}"
        );

        let mut width = None;
        let mut height = None;
        let mut format = PixelFormat::Yuv420P;
        for tok in tokens {
            let (tag, rest) = tok.split_at(1);
            match tag {
                "W" => width = Some(rest.parse::<usize>()?),
                "H" => height = Some(rest.parse::<usize>()?),
                "C" => format = colorspace_to_format(rest)?,
                _ => {} // F, I, A, X...: not needed to decode raw planes
            }
        }
        let width = width.ok_or_else(|| color_eyre::eyre::eyre!("Y4M header is missing W<n>"))?;
        let height = height.ok_or_else(|| color_eyre::eyre::eyre!("Y4M header is missing H<n>"))?;
        let info = FrameInfo::new(width, height, format)?;

        Ok(Y4mReader { reader, info })
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.info
    }

    /// Reads the next frame, or `None` at a clean end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut marker = String::new();
        let n = self.reader.read_line(&mut marker)?;
        if n == 0 {
            return Ok(None);
        }
        ensure!(
            marker.starts_with("FRAME"),
            "expected a FRAME marker, got {marker:?}"
        );

        let mut planes = Vec::with_capacity(self.info.stored_planes());
        for p in 0..self.info.stored_planes() {
            let (w, h) = self.info.plane_size(p);
            let mut data = vec![0u8; w * h];
            self.reader.read_exact(&mut data)?;
            planes.push(Plane::from_bytes(data, w, h));
        }
        Ok(Some(Frame::from_planes(self.info, planes)?))
    }
}

/// Writes a sequence of raw frames as a Y4M stream.
pub struct Y4mWriter<W> {
    writer: W,
    header_written: bool,
}

impl<W: Write> Y4mWriter<W> {
    pub fn new(writer: W) -> Self {
        Y4mWriter {
            writer,
            header_written: false,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.header_written {
            writeln!(
                self.writer,
                "{MAGIC} W{} H{} F25:1 Ip A1:1 C{}",
                frame.info.width,
                frame.info.height,
                format_to_colorspace(frame.info.format)
            )?;
            self.header_written = true;
        }
        writeln!(self.writer, "FRAME")?;
        let planes_to_write = match frame.info.format {
            PixelFormat::Yuva420P => {
                eprintln!("Warning: Y4M has no alpha channel, dropping it.");
                3
            }
            _ => frame.info.stored_planes(),
        };
        for p in 0..planes_to_write {
            let plane = frame.plane(p);
            for y in 0..plane.height() {
                self.writer.write_all(plane.row(y))?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidstab::Frame as VFrame;

    fn gray_frame(width: usize, height: usize, value: u8) -> VFrame {
        let info = FrameInfo::new(width, height, PixelFormat::Gray8).unwrap();
        let mut frame = VFrame::new_zeroed(info);
        frame.luma_mut().fill(value);
        frame
    }

    #[test]
    fn round_trips_a_handful_of_mono_frames() {
        let frames = vec![gray_frame(16, 8, 10), gray_frame(16, 8, 200)];
        let mut buf = Vec::new();
        {
            let mut writer = Y4mWriter::new(&mut buf);
            for f in &frames {
                writer.write_frame(f).unwrap();
            }
            writer.flush().unwrap();
        }

        let mut reader = Y4mReader::new(buf.as_slice()).unwrap();
        assert_eq!(reader.frame_info().width, 16);
        assert_eq!(reader.frame_info().height, 8);
        assert_eq!(reader.frame_info().format, PixelFormat::Gray8);

        let mut read_back = Vec::new();
        while let Some(f) = reader.next_frame().unwrap() {
            read_back.push(f);
        }
        assert_eq!(read_back.len(), frames.len());
        for (a, b) in read_back.iter().zip(frames.iter()) {
            assert_eq!(a.luma().as_bytes(), b.luma().as_bytes());
        }
    }

    #[test]
    fn rejects_a_non_y4m_header() {
        let data = b"NOT Y4M\n";
        assert!(Y4mReader::new(&data[..]).is_err());
    }
}
