// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! DMA device file access.
//!
//! # Platform Support
//!
//! ## Linux
//! The AXI stream DMA driver exposes one character device per card, e.g.
//! `/dev/datadev_0` (PCIe) or `/dev/axi_stream_dma_0` (SoC). Frames are
//! submitted with `write(2)` of a [`DmaWriteData`] record, writability is
//! polled with `poll(2)`, and the driver buffer pool is mapped with `mmap(2)`,
//! one mapping per buffer at offset `index * buffer_size`.
//!
//! ## Other platforms
//! Opening a device returns `DmaError::PlatformNotSupported`.

use crate::error::{DmaError, DmaResult};
use crate::flags::FrameFlags;
use crate::transport::{PoolInfo, Readiness, Transport};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Linux Implementation
// ============================================================================

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use crate::ioctl::{DmaWriteData, DriverCommand};
    use std::fs::File;
    use std::os::unix::io::AsRawFd;
    use std::path::PathBuf;

    /// Driver buffers mapped into this process.
    struct MappedPool {
        buffers: Vec<*mut u8>,
        buffer_size: usize,
    }

    impl MappedPool {
        fn info(&self) -> PoolInfo {
            PoolInfo {
                count: self.buffers.len() as u32,
                buffer_size: self.buffer_size,
            }
        }
    }

    /// Handle to an open DMA device file.
    ///
    /// The file is closed and any mapped buffer pool unmapped on drop.
    pub struct DmaDevice {
        file: File,
        path: PathBuf,
        pool: Option<MappedPool>,
    }

    impl DmaDevice {
        /// Open a DMA device for reading and writing.
        ///
        /// # Errors
        ///
        /// Returns `PermissionDenied` if access is refused and `OpenFailed`
        /// for any other open error.
        pub fn open(path: &Path) -> DmaResult<Self> {
            let file = File::options()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DmaError::PermissionDenied(path.display().to_string())
                    } else {
                        DmaError::OpenFailed {
                            path: path.to_path_buf(),
                            source: e,
                        }
                    }
                })?;

            let device = Self {
                file,
                path: path.to_path_buf(),
                pool: None,
            };

            match device.api_version() {
                Ok(version) => log::debug!("opened {} (driver API {})", path.display(), version),
                Err(e) => log::debug!("opened {} (driver API unknown: {})", path.display(), e),
            }
            Ok(device)
        }

        /// Path the device was opened from.
        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Issue a driver command with an integer argument.
        fn command(&self, cmd: DriverCommand, arg: u32) -> DmaResult<u32> {
            let ret = unsafe {
                libc::ioctl(
                    self.file.as_raw_fd(),
                    cmd.code() as _,
                    libc::c_ulong::from(arg),
                )
            };
            if ret < 0 {
                return Err(DmaError::Io(std::io::Error::last_os_error()));
            }
            Ok(ret as u32)
        }

        /// Set the driver debug level.
        pub fn set_debug(&self, level: u32) -> DmaResult<()> {
            self.command(DriverCommand::SetDebug, level).map(|_| ())
        }

        /// Driver API version.
        pub fn api_version(&self) -> DmaResult<u32> {
            self.command(DriverCommand::GetVersion, 0)
        }

        /// Write a record to the driver.
        fn submit(&self, rec: &DmaWriteData) -> DmaResult<usize> {
            let ret = unsafe {
                libc::write(
                    self.file.as_raw_fd(),
                    rec as *const DmaWriteData as *const libc::c_void,
                    std::mem::size_of::<DmaWriteData>(),
                )
            };
            if ret < 0 {
                return Err(DmaError::Io(std::io::Error::last_os_error()));
            }
            Ok(ret as usize)
        }

        fn map_buffers(&self) -> DmaResult<MappedPool> {
            let query = |cmd| {
                self.command(cmd, 0)
                    .map_err(|e| DmaError::MmapFailed(format!("{} failed: {}", cmd, e)))
            };
            let count = query(DriverCommand::GetBuffCount)? as usize;
            let buffer_size = query(DriverCommand::GetBuffSize)? as usize;
            let fd = self.file.as_raw_fd();

            // Unmap whatever was mapped if a later buffer fails
            let mut mapped = scopeguard::guard(Vec::with_capacity(count), |bufs: Vec<*mut u8>| {
                for p in bufs {
                    unsafe { libc::munmap(p as *mut libc::c_void, buffer_size) };
                }
            });

            for i in 0..count {
                let offset = (buffer_size as libc::off_t) * (i as libc::off_t);
                let p = unsafe {
                    libc::mmap(
                        std::ptr::null_mut(),
                        buffer_size,
                        libc::PROT_READ | libc::PROT_WRITE,
                        libc::MAP_SHARED,
                        fd,
                        offset,
                    )
                };
                if p == libc::MAP_FAILED {
                    return Err(DmaError::MmapFailed(format!(
                        "buffer {} of {} at offset {:#x} in {}: {}",
                        i,
                        count,
                        offset,
                        self.path.display(),
                        std::io::Error::last_os_error()
                    )));
                }
                mapped.push(p as *mut u8);
            }

            Ok(MappedPool {
                buffers: scopeguard::ScopeGuard::into_inner(mapped),
                buffer_size,
            })
        }
    }

    /// Interpret the events of a poll that returned before its timeout.
    /// `None` means the descriptor reported an error condition.
    pub(super) fn poll_readiness(revents: libc::c_short) -> Option<Readiness> {
        // A hung-up descriptor polls ready at once and would never turn writable
        if revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return None;
        }
        if revents & libc::POLLOUT != 0 {
            Some(Readiness::Writable)
        } else {
            Some(Readiness::TimedOut)
        }
    }

    impl Transport for DmaDevice {
        fn wait_writable(&mut self, timeout: Duration) -> DmaResult<Readiness> {
            let mut pollfd = libc::pollfd {
                fd: self.file.as_raw_fd(),
                events: libc::POLLOUT,
                revents: 0,
            };
            let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

            let result = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
            if result < 0 {
                return Err(DmaError::Io(std::io::Error::last_os_error()));
            }
            if result == 0 {
                return Ok(Readiness::TimedOut);
            }
            poll_readiness(pollfd.revents).ok_or_else(|| {
                DmaError::Io(std::io::Error::other(format!(
                    "poll revents {:#x} on {}",
                    pollfd.revents,
                    self.path.display()
                )))
            })
        }

        fn map_pool(&mut self) -> DmaResult<PoolInfo> {
            if let Some(pool) = &self.pool {
                return Ok(pool.info());
            }
            let pool = self.map_buffers()?;
            let info = pool.info();
            self.pool = Some(pool);
            Ok(info)
        }

        fn unmap_pool(&mut self) {
            if let Some(pool) = self.pool.take() {
                for p in pool.buffers {
                    unsafe { libc::munmap(p as *mut libc::c_void, pool.buffer_size) };
                }
            }
        }

        fn pool_buffer(&mut self, index: u32) -> Option<&mut [u8]> {
            let pool = self.pool.as_ref()?;
            let p = *pool.buffers.get(index as usize)?;
            // SAFETY: the mapping stays valid until unmap_pool, which needs
            // &mut self and so cannot run while this borrow is alive.
            Some(unsafe { std::slice::from_raw_parts_mut(p, pool.buffer_size) })
        }

        fn acquire_index(&mut self) -> Option<u32> {
            self.command(DriverCommand::GetIndex, 0).ok()
        }

        fn return_index(&mut self, index: u32) -> DmaResult<()> {
            self.command(DriverCommand::RetIndex, index).map(|_| ())
        }

        fn write_raw(&mut self, data: &[u8], flags: FrameFlags, dest: u32) -> DmaResult<usize> {
            self.submit(&DmaWriteData::copy(data, flags.bits(), dest))
        }

        fn write_indexed(
            &mut self,
            index: u32,
            size: usize,
            flags: FrameFlags,
            dest: u32,
        ) -> DmaResult<usize> {
            self.submit(&DmaWriteData::indexed(index, size, flags.bits(), dest))
        }
    }

    impl Drop for DmaDevice {
        fn drop(&mut self) {
            self.unmap_pool();
        }
    }
}

// ============================================================================
// Non-Linux Stub Implementation
// ============================================================================

#[cfg(not(target_os = "linux"))]
mod stub_impl {
    use super::*;

    /// Stub device for non-Linux platforms.
    ///
    /// All operations return `DmaError::PlatformNotSupported`.
    pub struct DmaDevice {
        _private: (),
    }

    impl DmaDevice {
        /// Attempting to open a device on non-Linux returns an error.
        pub fn open(_path: &Path) -> DmaResult<Self> {
            Err(DmaError::PlatformNotSupported)
        }

        pub fn path(&self) -> &Path {
            Path::new("")
        }

        pub fn set_debug(&self, _level: u32) -> DmaResult<()> {
            Err(DmaError::PlatformNotSupported)
        }

        pub fn api_version(&self) -> DmaResult<u32> {
            Err(DmaError::PlatformNotSupported)
        }
    }

    impl Transport for DmaDevice {
        fn wait_writable(&mut self, _timeout: Duration) -> DmaResult<Readiness> {
            Err(DmaError::PlatformNotSupported)
        }
        fn map_pool(&mut self) -> DmaResult<PoolInfo> {
            Err(DmaError::PlatformNotSupported)
        }
        fn unmap_pool(&mut self) {}
        fn pool_buffer(&mut self, _index: u32) -> Option<&mut [u8]> {
            None
        }
        fn acquire_index(&mut self) -> Option<u32> {
            None
        }
        fn return_index(&mut self, _index: u32) -> DmaResult<()> {
            Err(DmaError::PlatformNotSupported)
        }
        fn write_raw(&mut self, _data: &[u8], _flags: FrameFlags, _dest: u32) -> DmaResult<usize> {
            Err(DmaError::PlatformNotSupported)
        }
        fn write_indexed(
            &mut self,
            _index: u32,
            _size: usize,
            _flags: FrameFlags,
            _dest: u32,
        ) -> DmaResult<usize> {
            Err(DmaError::PlatformNotSupported)
        }
    }
}

// Re-export the appropriate implementation
#[cfg(target_os = "linux")]
pub use linux_impl::DmaDevice;

#[cfg(not(target_os = "linux"))]
pub use stub_impl::DmaDevice;
