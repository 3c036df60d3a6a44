// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! The narrow driver interface the transmit loop is written against.
//!
//! [`DmaDevice`](crate::device::DmaDevice) implements it on top of the
//! kernel driver. Tests use a scripted in-memory transport instead.

use crate::error::DmaResult;
use crate::flags::FrameFlags;
use std::time::Duration;

/// Outcome of a bounded readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The transport accepts a write.
    Writable,
    /// The timeout expired without the transport becoming writable.
    TimedOut,
}

/// Geometry of the driver-owned buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    /// Number of buffers.
    pub count: u32,
    /// Size of each buffer in bytes.
    pub buffer_size: usize,
}

/// Operations a streaming DMA transport provides to the transmit loop.
pub trait Transport {
    /// Block until the transport is writable or `timeout` expires.
    fn wait_writable(&mut self, timeout: Duration) -> DmaResult<Readiness>;

    /// Map the driver buffer pool into this process.
    fn map_pool(&mut self) -> DmaResult<PoolInfo>;

    /// Unmap the driver buffer pool. A no-op when nothing is mapped.
    fn unmap_pool(&mut self);

    /// Borrow a mapped pool buffer.
    fn pool_buffer(&mut self, index: u32) -> Option<&mut [u8]>;

    /// Take ownership of the next free pool buffer, if any.
    fn acquire_index(&mut self) -> Option<u32>;

    /// Hand an acquired, unsubmitted buffer back to the driver.
    fn return_index(&mut self, index: u32) -> DmaResult<()>;

    /// Copy `data` into the stream. Returns bytes accepted; 0 means the
    /// frame was not taken.
    fn write_raw(&mut self, data: &[u8], flags: FrameFlags, dest: u32) -> DmaResult<usize>;

    /// Send `size` bytes out of pool buffer `index`. On a positive return
    /// the buffer belongs to the driver again.
    fn write_indexed(
        &mut self,
        index: u32,
        size: usize,
        flags: FrameFlags,
        dest: u32,
    ) -> DmaResult<usize>;
}
