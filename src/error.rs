// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Error types for DMA transport and transmit operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving a DMA transport.
#[derive(Debug, Error)]
pub enum DmaError {
    /// The device file could not be opened.
    #[error("error opening {}: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Permission denied accessing the device file.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Mapping the driver buffer pool failed.
    #[error("failed to map dma buffers: {0}")]
    MmapFailed(String),

    /// The driver reported an empty buffer pool.
    #[error("driver buffer pool is empty")]
    EmptyPool,

    /// An operation required the buffer pool but it is not mapped.
    #[error("driver buffer pool is not mapped")]
    PoolNotMapped,

    /// The staging buffer could not be allocated.
    #[error("failed to allocate {size} byte transmit buffer")]
    AllocFailed { size: usize },

    /// Payload does not fit in a driver buffer.
    #[error("payload size {size} exceeds driver buffer size {buffer_size}")]
    SizeExceedsBuffer { size: usize, buffer_size: usize },

    /// Invalid run configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error from system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform not supported.
    #[error("platform not supported: the DMA driver interface requires Linux")]
    PlatformNotSupported,
}

/// Result type alias for DMA operations.
pub type DmaResult<T> = Result<T, DmaError>;
