// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Run configuration for the transmit loop.

use crate::error::{DmaError, DmaResult};
use crate::flags::FrameFlags;
use std::path::PathBuf;
use std::time::Duration;

/// Default device file.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/datadev_0";

/// Default payload size in bytes.
pub const DEFAULT_FRAME_SIZE: usize = 1000;

/// Default number of frames to send.
pub const DEFAULT_FRAME_COUNT: u64 = 1;

/// Upper bound on a single readiness wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// How transmit buffers are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferMode {
    /// One heap buffer owned by the loop, copied by the driver on write.
    #[default]
    Raw,
    /// Driver-owned buffers mapped into the process, addressed by index.
    Indexed,
}

/// Immutable parameters of one transmit run.
#[derive(Debug, Clone)]
pub struct TransmitConfig {
    /// Device file to open.
    pub path: PathBuf,
    /// Destination channel.
    pub dest: u32,
    /// Payload size of every frame in bytes.
    pub size: usize,
    /// Number of successful frames to send.
    pub count: u64,
    /// Generate a fresh payload for every frame.
    pub regenerate: bool,
    /// Buffer acquisition mode.
    pub mode: BufferMode,
    /// Sideband flags sent with each frame.
    pub flags: FrameFlags,
    /// Bound on each readiness wait.
    pub poll_timeout: Duration,
    /// Number of leading payload bytes to print per frame (0 = off).
    pub dump_bytes: usize,
}

impl TransmitConfig {
    /// Configuration with default settings for destination `dest`.
    pub fn new(dest: u32) -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
            dest,
            size: DEFAULT_FRAME_SIZE,
            count: DEFAULT_FRAME_COUNT,
            regenerate: true,
            mode: BufferMode::Raw,
            flags: FrameFlags::default(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            dump_bytes: 0,
        }
    }

    /// Check the configuration before any device resource is acquired.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero payload size, a payload that does
    /// not fit the driver's 32-bit size field, or a zero poll timeout.
    pub fn validate(&self) -> DmaResult<()> {
        if self.size == 0 {
            return Err(DmaError::InvalidConfig(
                "payload size must be greater than 0".into(),
            ));
        }
        if u32::try_from(self.size).is_err() {
            return Err(DmaError::InvalidConfig(format!(
                "payload size {} exceeds the driver limit of {} bytes",
                self.size,
                u32::MAX
            )));
        }
        if self.poll_timeout.is_zero() {
            return Err(DmaError::InvalidConfig(
                "poll timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
