// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};

use vidstab::pipeline::{Stabilizer, Transformer};
use vidstab::serialize::{read_local_motions, write_local_motions};
use vidstab_cli::args::{DetectArgs, FitArgs, TransformArgs};
use vidstab_cli::y4m::{Y4mReader, Y4mWriter};

#[derive(Parser)]
#[command(version, about = "Two-pass video stabilization")]
struct Opt {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pass one: measure local motion for every frame of a Y4M stream and
    /// write a local-motions file pass two can consume.
    Detect {
        /// Y4M input.
        input: PathBuf,
        /// Local-motions file (`VID.STAB` text format) to write.
        output: PathBuf,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// Pass two: fit, smooth and warp a Y4M stream using a local-motions
    /// file pass one produced.
    Transform {
        /// Y4M input -- the same stream `detect` measured.
        input: PathBuf,
        /// Local-motions file produced by `detect`.
        motions: PathBuf,
        /// Stabilized Y4M output.
        output: PathBuf,
        #[command(flatten)]
        fit: FitArgs,
        #[command(flatten)]
        transform: TransformArgs,
        /// Seed for the fit's gradient-descent RNG; fixed by default so runs
        /// are reproducible.
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Detect, fit, smooth and warp a Y4M stream in a single pass with no
    /// lookahead (the host-filter "deshake" surface).
    Stabilize {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        detect: DetectArgs,
        #[command(flatten)]
        fit: FitArgs,
        #[command(flatten)]
        transform: TransformArgs,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    #[cfg(feature = "tracing-subscriber")]
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .init();
    }

    match Opt::parse().command {
        Command::Detect {
            input,
            output,
            detect,
        } => run_detect(&input, &output, &detect),
        Command::Transform {
            input,
            motions,
            output,
            fit,
            transform,
            seed,
        } => run_transform(&input, &motions, &output, &fit, &transform, seed),
        Command::Stabilize {
            input,
            output,
            detect,
            fit,
            transform,
            seed,
        } => run_stabilize(&input, &output, &detect, &fit, &transform, seed),
    }
}

fn run_detect(input: &Path, output: &Path, detect: &DetectArgs) -> Result<()> {
    let detect_config = detect.to_config();
    let file = fs::File::open(input)
        .wrap_err_with(|| format!("failed to open {input:?}"))?;
    let mut reader = Y4mReader::new(BufReader::new(file))?;
    let frame_info = reader.frame_info();

    let mut detector = vidstab::detect::Detector::new(detect_config, frame_info)?;
    let mut motions = Vec::new();
    let mut count = 0usize;
    while let Some(frame) = reader.next_frame()? {
        motions.push(detector.detect_frame(&frame)?);
        count += 1;
    }
    println!("measured local motion for {count} frames");

    let text = write_local_motions(&motions, &detect_config);
    fs::write(output, text).wrap_err_with(|| format!("failed to write {output:?}"))?;
    Ok(())
}

fn run_transform(
    input: &Path,
    motions_path: &Path,
    output: &Path,
    fit: &FitArgs,
    transform: &TransformArgs,
    seed: u64,
) -> Result<()> {
    let motions_text = fs::read_to_string(motions_path)
        .wrap_err_with(|| format!("failed to read {motions_path:?}"))?;
    let motions = read_local_motions(&motions_text)?;

    let file = fs::File::open(input).wrap_err_with(|| format!("failed to open {input:?}"))?;
    let mut reader = Y4mReader::new(BufReader::new(file))?;
    let frame_info = reader.frame_info();

    let mut transformer = Transformer::new(
        transform.to_config(),
        fit.to_config(),
        frame_info,
        &motions,
        seed,
    )?;

    let out_file = fs::File::create(output).wrap_err_with(|| format!("failed to create {output:?}"))?;
    let mut writer = Y4mWriter::new(BufWriter::new(out_file));
    let mut count = 0usize;
    while let Some(frame) = reader.next_frame()? {
        let warped = transformer.transform_frame(&frame, transform.fixed_point);
        writer.write_frame(&warped)?;
        count += 1;
    }
    writer.flush()?;
    println!("warped {count} frames ({} transforms available)", transformer.len());
    Ok(())
}

fn run_stabilize(
    input: &Path,
    output: &Path,
    detect: &DetectArgs,
    fit: &FitArgs,
    transform: &TransformArgs,
    seed: u64,
) -> Result<()> {
    let file = fs::File::open(input).wrap_err_with(|| format!("failed to open {input:?}"))?;
    let mut reader = Y4mReader::new(BufReader::new(file))?;
    let frame_info = reader.frame_info();

    let mut stabilizer = Stabilizer::new(
        detect.to_config(),
        fit.to_config(),
        transform.to_config(),
        frame_info,
        seed,
    )?;

    let out_file = fs::File::create(output).wrap_err_with(|| format!("failed to create {output:?}"))?;
    let mut writer = Y4mWriter::new(BufWriter::new(out_file));
    let mut count = 0usize;
    while let Some(frame) = reader.next_frame()? {
        let stabilized = stabilizer.stabilize_frame(&frame, transform.fixed_point)?;
        writer.write_frame(&stabilized)?;
        count += 1;
    }
    writer.flush()?;
    println!("stabilized {count} frames");
    Ok(())
}
