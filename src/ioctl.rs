// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Driver command codes and the write record layout.
//!
//! These match the user-space header shipped with the AXI stream DMA kernel
//! driver (`/dev/datadev_*`, `/dev/axi_stream_dma_*`).

/// Driver ioctl command codes.
///
/// The argument and return value of each command are plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DriverCommand {
    /// Number of buffers in the driver pool.
    GetBuffCount = 0x1001,

    /// Size in bytes of each driver buffer.
    GetBuffSize = 0x1002,

    /// Set the driver debug level (argument: level).
    SetDebug = 0x1003,

    /// Return a buffer index to the driver (argument: index).
    RetIndex = 0x1005,

    /// Acquire a free transmit buffer index. Negative when none is free.
    GetIndex = 0x1006,

    /// Driver API version.
    GetVersion = 0x1009,
}

impl DriverCommand {
    /// Get the raw ioctl request value.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Get the command name.
    pub fn name(self) -> &'static str {
        match self {
            Self::GetBuffCount => "DMA_Get_Buff_Count",
            Self::GetBuffSize => "DMA_Get_Buff_Size",
            Self::SetDebug => "DMA_Set_Debug",
            Self::RetIndex => "DMA_Ret_Index",
            Self::GetIndex => "DMA_Get_Index",
            Self::GetVersion => "DMA_Get_Version",
        }
    }
}

impl std::fmt::Display for DriverCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#06x})", self.name(), self.code())
    }
}

/// Write record handed to the driver through `write(2)`.
///
/// For a copy write `data` holds the user buffer address and `index` is
/// ignored. For an indexed write `data` is zero and `index` selects the
/// driver buffer that already holds the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct DmaWriteData {
    /// User buffer address (copy writes only).
    pub data: u64,
    /// Destination channel.
    pub dest: u32,
    /// Frame flags word.
    pub flags: u32,
    /// Driver buffer index (indexed writes only).
    pub index: u32,
    /// Payload size in bytes.
    pub size: u32,
    /// Non-zero when the caller is a 32-bit process.
    pub is32: u32,
    /// Reserved.
    pub pad: u32,
}

impl DmaWriteData {
    /// Build a record for a copy write from a user buffer.
    pub fn copy(data: &[u8], flags: u32, dest: u32) -> Self {
        Self {
            data: data.as_ptr() as usize as u64,
            dest,
            flags,
            index: 0,
            size: data.len() as u32,
            is32: u32::from(std::mem::size_of::<usize>() == 4),
            pad: 0,
        }
    }

    /// Build a record for a write out of a driver buffer.
    pub fn indexed(index: u32, size: usize, flags: u32, dest: u32) -> Self {
        Self {
            data: 0,
            dest,
            flags,
            index,
            size: size as u32,
            is32: u32::from(std::mem::size_of::<usize>() == 4),
            pad: 0,
        }
    }
}

// The driver copies exactly this many bytes from user space
const _: () = assert!(std::mem::size_of::<DmaWriteData>() == 32);
