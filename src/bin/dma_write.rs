// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Send PRBS frames to a DMA destination and report the achieved rate.
//!
//! Run with: `dma-write -c 10000 -s 4096 0`

use axis_dma_bench::config::{DEFAULT_DEVICE_PATH, DEFAULT_FRAME_COUNT, DEFAULT_FRAME_SIZE};
use axis_dma_bench::{BufferMode, DmaDevice, DmaError, FrameFlags, TransmitConfig, Transmitter};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Send data on a DMA destination. Data is PRBS.
#[derive(Parser, Debug)]
#[command(name = "dma-write", version, about)]
struct Args {
    /// Destination channel.
    dest: u32,

    /// Path of the DMA device to use.
    #[arg(short, long, default_value = DEFAULT_DEVICE_PATH)]
    path: PathBuf,

    /// Disable PRBS generation.
    #[arg(short = 'd', long = "prbsdis")]
    prbs_dis: bool,

    /// Size of data to generate in bytes.
    #[arg(short, long, default_value_t = DEFAULT_FRAME_SIZE)]
    size: usize,

    /// Number of frames to send.
    #[arg(short, long, default_value_t = DEFAULT_FRAME_COUNT)]
    count: u64,

    /// Use index based transmit buffers.
    #[arg(short = 'i', long = "indexen")]
    index_en: bool,

    /// Value for the first user field, in hex.
    #[arg(short, long, default_value = "0x0", value_parser = parse_hex_u8)]
    fuser: u8,

    /// Value for the last user field, in hex.
    #[arg(short, long, default_value = "0x0", value_parser = parse_hex_u8)]
    luser: u8,

    /// Show raw data of each frame up to this many bytes.
    #[arg(short, long, default_value_t = 0)]
    raw: usize,

    /// Log every frame.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex byte {:?}: {}", s, e))
}

impl Args {
    fn into_config(self) -> TransmitConfig {
        TransmitConfig {
            path: self.path,
            size: self.size,
            count: self.count,
            regenerate: !self.prbs_dis,
            mode: if self.index_en {
                BufferMode::Indexed
            } else {
                BufferMode::Raw
            },
            flags: FrameFlags::from_user(self.fuser, self.luser, false),
            dump_bytes: self.raw,
            ..TransmitConfig::new(self.dest)
        }
    }
}

fn run(config: TransmitConfig) -> Result<(), DmaError> {
    let device = DmaDevice::open(&config.path)?;
    log::debug!("using {}", device.path().display());
    let report = Transmitter::new(config, device).run()?;
    println!("{}", report);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args.into_config()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
