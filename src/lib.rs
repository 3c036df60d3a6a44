// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! # AXI Stream DMA Write Benchmark
//!
//! Drives sustained write traffic into an AXI stream DMA driver, fills each
//! frame with a reproducible pseudo-random test pattern and reports the
//! achieved frame rate.
//!
//! ## Buffer Modes
//!
//! | Mode    | Memory                          | Per-frame cost           |
//! |---------|---------------------------------|--------------------------|
//! | Raw     | One heap buffer owned by the run | Driver copies the frame  |
//! | Indexed | Driver pool mapped with `mmap`   | Zero-copy, index handoff |
//!
//! ## Example
//!
//! ```rust,no_run
//! use axis_dma_bench::{DmaDevice, DmaError, TransmitConfig, Transmitter};
//!
//! fn main() -> Result<(), DmaError> {
//!     let config = TransmitConfig {
//!         count: 1000,
//!         ..TransmitConfig::new(0)
//!     };
//!     let device = DmaDevice::open(&config.path)?;
//!
//!     let report = Transmitter::new(config, device).run()?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! ## Requirements
//!
//! - Linux with the AXI stream DMA kernel driver loaded
//! - Read/write access to the device file (e.g. `/dev/datadev_0`)

// Module declarations
pub mod config;
pub mod device;
pub mod error;
pub mod flags;
pub mod ioctl;
pub mod payload;
pub mod stats;
pub mod strategy;
pub mod transmit;
pub mod transport;

// Re-exports for convenient access
pub use config::{BufferMode, TransmitConfig};
pub use device::DmaDevice;
pub use error::{DmaError, DmaResult};
pub use flags::FrameFlags;
pub use payload::{PayloadGenerator, PrbsGenerator};
pub use stats::{Measure, RunReport};
pub use strategy::BufferStrategy;
pub use transmit::{LoopState, Transmitter};
pub use transport::{PoolInfo, Readiness, Transport};
