// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Transmit buffer acquisition.
//!
//! A run uses exactly one of two strategies, chosen once from the
//! configuration:
//!
//! - **Raw**: the loop owns one heap buffer for the whole run and the driver
//!   copies it on every write.
//! - **Indexed**: the driver's buffer pool is mapped into the process. Each
//!   frame borrows a free index, fills that buffer in place and hands it back
//!   with the write.
//!
//! An indexed buffer whose write was not accepted stays held by the strategy
//! and is offered again by the next [`acquire`](BufferStrategy::acquire), so a
//! retried frame goes out of the same memory with the same content.

use crate::config::BufferMode;
use crate::error::{DmaError, DmaResult};
use crate::flags::FrameFlags;
use crate::transport::{PoolInfo, Transport};

/// A buffer acquired for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The raw-mode staging buffer.
    Staging,
    /// A driver pool buffer.
    Pool(u32),
}

/// Heap buffer owned for the whole run.
#[derive(Debug)]
pub struct StagingBuffer {
    data: Vec<u8>,
}

impl StagingBuffer {
    fn allocate(size: usize) -> DmaResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| DmaError::AllocFailed { size })?;
        data.resize(size, 0);
        Ok(Self { data })
    }

    /// Current buffer content.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Borrowed view of the mapped driver pool.
#[derive(Debug)]
pub struct PoolBuffers {
    info: PoolInfo,
    held: Option<u32>,
}

impl PoolBuffers {
    /// Geometry reported by the driver.
    pub fn info(&self) -> PoolInfo {
        self.info
    }

    /// Index acquired but not yet accepted by the driver.
    pub fn held(&self) -> Option<u32> {
        self.held
    }
}

/// Active buffer acquisition strategy.
#[derive(Debug)]
pub enum BufferStrategy {
    /// Single loop-owned buffer.
    Raw(StagingBuffer),
    /// Driver-owned indexed pool.
    Indexed(PoolBuffers),
}

impl BufferStrategy {
    /// Acquire the resources of `mode` for payloads of `size` bytes.
    ///
    /// # Errors
    ///
    /// - `AllocFailed` if the staging buffer cannot be allocated
    /// - `MmapFailed` (or another transport error) if the pool cannot be mapped
    /// - `EmptyPool` / `SizeExceedsBuffer` if the mapped pool cannot carry
    ///   the payload; the pool is unmapped again before returning
    pub fn setup<T: Transport>(
        mode: BufferMode,
        size: usize,
        transport: &mut T,
    ) -> DmaResult<Self> {
        match mode {
            BufferMode::Raw => {
                let buf = StagingBuffer::allocate(size)?;
                log::debug!("allocated {} byte staging buffer", size);
                Ok(Self::Raw(buf))
            }
            BufferMode::Indexed => {
                let info = transport.map_pool()?;
                let transport = scopeguard::guard(transport, |t| t.unmap_pool());

                if info.count == 0 {
                    return Err(DmaError::EmptyPool);
                }
                if size > info.buffer_size {
                    return Err(DmaError::SizeExceedsBuffer {
                        size,
                        buffer_size: info.buffer_size,
                    });
                }

                scopeguard::ScopeGuard::into_inner(transport);
                log::debug!(
                    "mapped {} driver buffers of {} bytes",
                    info.count,
                    info.buffer_size
                );
                Ok(Self::Indexed(PoolBuffers { info, held: None }))
            }
        }
    }

    /// Mode this strategy implements.
    pub fn mode(&self) -> BufferMode {
        match self {
            Self::Raw(_) => BufferMode::Raw,
            Self::Indexed(_) => BufferMode::Indexed,
        }
    }

    /// Get a buffer for the next frame. `None` means no pool buffer is free
    /// right now; the caller should poll again.
    pub fn acquire<T: Transport>(&mut self, transport: &mut T) -> Option<Slot> {
        match self {
            Self::Raw(_) => Some(Slot::Staging),
            Self::Indexed(pool) => {
                if let Some(index) = pool.held {
                    return Some(Slot::Pool(index));
                }
                let index = transport.acquire_index()?;
                pool.held = Some(index);
                Some(Slot::Pool(index))
            }
        }
    }

    /// Borrow the first `size` bytes of an acquired buffer.
    pub fn payload_mut<'a, T: Transport>(
        &'a mut self,
        transport: &'a mut T,
        slot: Slot,
        size: usize,
    ) -> DmaResult<&'a mut [u8]> {
        match (self, slot) {
            (Self::Raw(buf), Slot::Staging) => Ok(&mut buf.data[..size]),
            (Self::Indexed(_), Slot::Pool(index)) => transport
                .pool_buffer(index)
                .and_then(|b| b.get_mut(..size))
                .ok_or(DmaError::PoolNotMapped),
            _ => Err(DmaError::PoolNotMapped),
        }
    }

    /// Write an acquired buffer to `dest`.
    ///
    /// A positive return means the frame was accepted; in indexed mode the
    /// buffer then belongs to the driver again. Otherwise the buffer stays
    /// acquired for the retry.
    pub fn submit<T: Transport>(
        &mut self,
        transport: &mut T,
        slot: Slot,
        size: usize,
        flags: FrameFlags,
        dest: u32,
    ) -> DmaResult<usize> {
        match (self, slot) {
            (Self::Raw(buf), Slot::Staging) => {
                transport.write_raw(&buf.data[..size], flags, dest)
            }
            (Self::Indexed(pool), Slot::Pool(index)) => {
                let ret = transport.write_indexed(index, size, flags, dest);
                if matches!(ret, Ok(n) if n > 0) {
                    pool.held = None;
                }
                ret
            }
            _ => Err(DmaError::PoolNotMapped),
        }
    }

    /// Release the strategy's resources.
    pub fn teardown<T: Transport>(self, transport: &mut T) {
        match self {
            Self::Raw(buf) => {
                log::debug!("freeing {} byte staging buffer", buf.data.len());
                drop(buf);
            }
            Self::Indexed(pool) => {
                if let Some(index) = pool.held {
                    if let Err(e) = transport.return_index(index) {
                        log::warn!("failed to return buffer index {}: {}", index, e);
                    }
                }
                transport.unmap_pool();
                log::debug!("unmapped {} driver buffers", pool.info().count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, WriteOutcome};

    #[test]
    fn test_raw_setup_allocates_zeroed_buffer() {
        let mut t = MockTransport::new();
        let strategy = BufferStrategy::setup(BufferMode::Raw, 64, &mut t).unwrap();
        match &strategy {
            BufferStrategy::Raw(buf) => assert_eq!(buf.as_slice(), &[0u8; 64][..]),
            _ => panic!("expected raw strategy"),
        }
        assert_eq!(t.map_calls, 0);
        strategy.teardown(&mut t);
        assert_eq!(t.unmap_calls, 0);
    }

    #[test]
    fn test_raw_acquire_is_always_staging() {
        let mut t = MockTransport::new();
        let mut strategy = BufferStrategy::setup(BufferMode::Raw, 16, &mut t).unwrap();
        assert_eq!(strategy.acquire(&mut t), Some(Slot::Staging));
        assert_eq!(strategy.acquire(&mut t), Some(Slot::Staging));
    }

    #[test]
    fn test_indexed_setup_maps_once() {
        let mut t = MockTransport::with_pool(4, 4096);
        let strategy = BufferStrategy::setup(BufferMode::Indexed, 1000, &mut t).unwrap();
        assert_eq!(strategy.mode(), BufferMode::Indexed);
        assert_eq!(t.map_calls, 1);
        strategy.teardown(&mut t);
        assert_eq!(t.unmap_calls, 1);
    }

    #[test]
    fn test_indexed_setup_map_failure() {
        let mut t = MockTransport::with_pool(4, 4096);
        t.fail_map = true;
        let result = BufferStrategy::setup(BufferMode::Indexed, 1000, &mut t);
        assert!(matches!(result, Err(DmaError::MmapFailed(_))));
    }

    #[test]
    fn test_indexed_setup_rejects_oversized_payload() {
        let mut t = MockTransport::with_pool(2, 512);
        let result = BufferStrategy::setup(BufferMode::Indexed, 1000, &mut t);
        assert!(matches!(
            result,
            Err(DmaError::SizeExceedsBuffer {
                size: 1000,
                buffer_size: 512
            })
        ));
        assert_eq!(t.unmap_calls, 1);
    }

    #[test]
    fn test_indexed_setup_rejects_empty_pool() {
        let mut t = MockTransport::with_pool(0, 4096);
        let result = BufferStrategy::setup(BufferMode::Indexed, 100, &mut t);
        assert!(matches!(result, Err(DmaError::EmptyPool)));
        assert_eq!(t.unmap_calls, 1);
    }

    #[test]
    fn test_indexed_holds_index_after_rejected_write() {
        let mut t = MockTransport::with_pool(2, 256);
        t.writes.push_back(WriteOutcome::Zero);
        let mut strategy = BufferStrategy::setup(BufferMode::Indexed, 128, &mut t).unwrap();

        let slot = strategy.acquire(&mut t).unwrap();
        assert_eq!(slot, Slot::Pool(0));
        let ret = strategy.submit(&mut t, slot, 128, FrameFlags::default(), 0);
        assert_eq!(ret.unwrap(), 0);

        // Same buffer offered again
        assert_eq!(strategy.acquire(&mut t), Some(Slot::Pool(0)));
        let ret = strategy.submit(&mut t, Slot::Pool(0), 128, FrameFlags::default(), 0);
        assert_eq!(ret.unwrap(), 128);
        match &strategy {
            BufferStrategy::Indexed(pool) => assert_eq!(pool.held(), None),
            _ => panic!("expected indexed strategy"),
        }
    }

    #[test]
    fn test_teardown_returns_held_index() {
        let mut t = MockTransport::with_pool(2, 256);
        let mut strategy = BufferStrategy::setup(BufferMode::Indexed, 128, &mut t).unwrap();
        let slot = strategy.acquire(&mut t).unwrap();
        assert_eq!(slot, Slot::Pool(0));

        strategy.teardown(&mut t);
        assert_eq!(t.returned, vec![0]);
        assert!(t.in_flight.is_empty());
        assert_eq!(t.unmap_calls, 1);
    }

    #[test]
    fn test_indexed_payload_is_pool_memory() {
        let mut t = MockTransport::with_pool(2, 256);
        let mut strategy = BufferStrategy::setup(BufferMode::Indexed, 8, &mut t).unwrap();
        let slot = strategy.acquire(&mut t).unwrap();
        strategy
            .payload_mut(&mut t, slot, 8)
            .unwrap()
            .copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&t.pool[0][..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_mismatched_slot_rejected() {
        let mut t = MockTransport::new();
        let mut strategy = BufferStrategy::setup(BufferMode::Raw, 8, &mut t).unwrap();
        assert!(strategy.payload_mut(&mut t, Slot::Pool(0), 8).is_err());
    }
}
