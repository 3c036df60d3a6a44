// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Set the DMA driver debug level.

use axis_dma_bench::config::DEFAULT_DEVICE_PATH;
use axis_dma_bench::DmaDevice;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Set the driver debug level. Debug level is either 0 or 1.
#[derive(Parser, Debug)]
#[command(name = "dma-set-debug", version, about)]
struct Args {
    /// Debug level.
    level: u32,

    /// Path of the DMA device to use.
    #[arg(short, long, default_value = DEFAULT_DEVICE_PATH)]
    path: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = match DmaDevice::open(&args.path) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Setting debug level to {}", args.level);
    if let Err(e) = device.set_debug(args.level) {
        log::warn!("set debug on {} failed: {}", args.path.display(), e);
    }
    ExitCode::SUCCESS
}
