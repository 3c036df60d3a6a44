// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! The transmit loop.
//!
//! Each cycle waits (bounded) for the transport to become writable, acquires
//! a buffer, makes sure it holds a valid payload and writes it. The loop ends
//! once the configured number of frames has been accepted.
//!
//! Timeouts, wait errors and "no buffer free" are transient: they are logged
//! and the cycle starts over. A write that is not accepted is retried with the
//! payload already in the buffer; only an accepted write invalidates it.

use crate::config::{BufferMode, TransmitConfig};
use crate::error::DmaResult;
use crate::payload::{PayloadGenerator, PrbsGenerator};
use crate::stats::{RunReport, RunStats};
use crate::strategy::BufferStrategy;
use crate::transport::{Readiness, Transport};

/// Where the loop is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not started.
    Idle,
    /// Waiting for the transport to become writable.
    Polling,
    /// Buffer acquired, payload being prepared and written.
    Dispatching,
    /// Target frame count reached.
    Terminal,
}

/// Whether the acquired buffer already holds the frame to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadState {
    /// Needs a freshly generated payload.
    Stale,
    /// Holds a generated payload not yet accepted by the transport.
    Pending,
}

impl PayloadState {
    /// Payload was generated into the buffer.
    fn generated(self) -> Self {
        debug_assert_eq!(self, Self::Stale, "regenerating a pending payload");
        Self::Pending
    }

    /// Transport answered a write of this payload.
    fn after_write(self, accepted: bool) -> Self {
        if accepted {
            Self::Stale
        } else {
            self
        }
    }
}

/// Drives write traffic into a transport until a frame target is met.
pub struct Transmitter<T: Transport, G: PayloadGenerator = PrbsGenerator> {
    config: TransmitConfig,
    transport: T,
    generator: G,
    state: LoopState,
    payload: PayloadState,
}

impl<T: Transport> Transmitter<T, PrbsGenerator> {
    /// Create a transmitter using the default PRBS payload.
    pub fn new(config: TransmitConfig, transport: T) -> Self {
        Self::with_generator(config, transport, PrbsGenerator::default())
    }
}

impl<T: Transport, G: PayloadGenerator> Transmitter<T, G> {
    /// Create a transmitter with a custom payload generator.
    pub fn with_generator(config: TransmitConfig, transport: T, generator: G) -> Self {
        Self {
            config,
            transport,
            generator,
            state: LoopState::Idle,
            payload: PayloadState::Stale,
        }
    }

    /// Run configuration.
    pub fn config(&self) -> &TransmitConfig {
        &self.config
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give back the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send frames until `config.count` have been accepted.
    ///
    /// Buffer resources are set up first and released exactly once before
    /// returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns startup errors (invalid configuration, allocation or pool
    /// mapping failure) without entering the loop. Per-frame failures are
    /// retried and never surface here.
    pub fn run(&mut self) -> DmaResult<RunReport> {
        self.config.validate()?;

        let mut strategy =
            BufferStrategy::setup(self.config.mode, self.config.size, &mut self.transport)?;
        log::info!(
            "sending {} frames of {} bytes to dest {} ({:?} buffers)",
            self.config.count,
            self.config.size,
            self.config.dest,
            strategy.mode()
        );
        if let BufferStrategy::Indexed(pool) = &strategy {
            let info = pool.info();
            log::info!(
                "driver pool: {} buffers of {} bytes",
                info.count,
                info.buffer_size
            );
        }

        let mut stats = RunStats::start();
        self.state = LoopState::Polling;

        let result = self.drive(&mut strategy, &mut stats);

        self.state = LoopState::Terminal;
        let report = stats.finish();
        strategy.teardown(&mut self.transport);
        result?;

        log::info!(
            "{} frames, {} write calls, {} wait timeouts, {} bytes/s",
            report.frames,
            report.attempts,
            report.timeouts,
            report.bandwidth()
        );
        Ok(report)
    }

    fn drive(&mut self, strategy: &mut BufferStrategy, stats: &mut RunStats) -> DmaResult<()> {
        while stats.frames() < self.config.count {
            self.cycle(strategy, stats)?;
        }
        Ok(())
    }

    /// One poll/acquire/write cycle.
    fn cycle(&mut self, strategy: &mut BufferStrategy, stats: &mut RunStats) -> DmaResult<()> {
        let size = self.config.size;

        match self.transport.wait_writable(self.config.poll_timeout) {
            Ok(Readiness::Writable) => {}
            Ok(Readiness::TimedOut) => {
                stats.record_timeout();
                log::warn!("write timeout");
                return Ok(());
            }
            Err(e) => {
                stats.record_timeout();
                log::warn!("write wait failed: {}", e);
                return Ok(());
            }
        }

        self.state = LoopState::Dispatching;
        log::trace!("transport writable");

        let Some(slot) = strategy.acquire(&mut self.transport) else {
            log::trace!("no transmit buffer free");
            self.state = LoopState::Polling;
            return Ok(());
        };

        if self.payload == PayloadState::Stale {
            let indexed = strategy.mode() == BufferMode::Indexed;
            let buf = strategy.payload_mut(&mut self.transport, slot, size)?;
            if self.config.regenerate {
                self.generator.generate(buf);
            } else if indexed {
                // Pool buffers keep whatever they last carried
                buf.fill(0);
            }
            self.payload = self.payload.generated();
        }

        let dump = if self.config.dump_bytes > 0 {
            let buf = strategy.payload_mut(&mut self.transport, slot, size)?;
            Some(format_dump(&buf[..self.config.dump_bytes.min(size)]))
        } else {
            None
        };

        stats.record_attempt();
        let ret = strategy.submit(
            &mut self.transport,
            slot,
            size,
            self.config.flags,
            self.config.dest,
        );
        self.state = LoopState::Polling;

        let accepted = matches!(ret, Ok(n) if n > 0);
        self.payload = self.payload.after_write(accepted);

        match ret {
            Ok(n) if n > 0 => {
                stats.record_frame(n);
                log::debug!(
                    "Write ret={}, Dest={}, Fuser=0x{:02x}, Luser=0x{:02x}, count={}",
                    n,
                    self.config.dest,
                    self.config.flags.first_user(),
                    self.config.flags.last_user(),
                    stats.frames()
                );
                if let Some(dump) = dump {
                    println!("{}", dump);
                }
            }
            Ok(_) => log::debug!("write not accepted, retrying"),
            Err(e) => log::warn!("write error: {}", e),
        }
        Ok(())
    }
}

/// Format payload bytes as hex, ten per line.
pub fn format_dump(bytes: &[u8]) -> String {
    let mut out = String::from("Raw Data: ");
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && i % 10 == 0 {
            out.push_str("\n          ");
        }
        out.push_str(&format!("0x{:02x} ", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DmaError;
    use crate::transport::mock::{MockTransport, WriteOutcome};

    fn config(count: u64, size: usize, mode: BufferMode) -> TransmitConfig {
        TransmitConfig {
            count,
            size,
            mode,
            ..TransmitConfig::new(1)
        }
    }

    #[test]
    fn test_single_raw_frame() {
        let mut tx = Transmitter::new(config(1, 64, BufferMode::Raw), MockTransport::new());
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 1);
        assert_eq!(tx.state(), LoopState::Terminal);

        let t = tx.into_transport();
        assert_eq!(t.submitted.len(), 1);
        assert_eq!(t.submitted[0].payload.len(), 64);
        assert_eq!(t.submitted[0].dest, 1);
        assert_eq!(t.submitted[0].index, None);

        let mut expected = vec![0u8; 64];
        PrbsGenerator::default().generate(&mut expected);
        assert_eq!(t.submitted[0].payload, expected);
    }

    #[test]
    fn test_timeouts_are_retried() {
        let mut t = MockTransport::new();
        t.readiness.extend([
            Some(Readiness::TimedOut),
            Some(Readiness::TimedOut),
            Some(Readiness::Writable),
            Some(Readiness::TimedOut),
            Some(Readiness::TimedOut),
            Some(Readiness::Writable),
        ]);
        let mut tx = Transmitter::new(config(3, 32, BufferMode::Raw), t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 3);
        assert_eq!(report.timeouts, 4);
        assert_eq!(report.attempts, 3);
        assert_eq!(tx.transport().waits, 7);
    }

    #[test]
    fn test_wait_error_is_transient() {
        let mut t = MockTransport::new();
        t.readiness.extend([None, None]);
        let mut tx = Transmitter::new(config(2, 16, BufferMode::Raw), t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.timeouts, 2);
    }

    #[test]
    fn test_indexed_interleaves_pool_buffers() {
        let t = MockTransport::with_pool(2, 4096);
        let mut tx = Transmitter::new(config(5, 1000, BufferMode::Indexed), t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 5);

        let t = tx.into_transport();
        let indices: Vec<_> = t.accepted().map(|s| s.index.unwrap()).collect();
        assert_eq!(indices, vec![0, 1, 0, 1, 0]);
        assert_eq!(t.map_calls, 1);
        assert_eq!(t.unmap_calls, 1);
        assert!(t.in_flight.is_empty());
        assert!(t.returned.is_empty());
    }

    #[test]
    fn test_no_free_buffer_is_not_an_attempt() {
        let mut t = MockTransport::with_pool(2, 256);
        t.acquire_script.extend([None, None, Some(()), None]);
        let mut tx = Transmitter::new(config(2, 128, BufferMode::Indexed), t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.timeouts, 0);
        assert_eq!(tx.transport().waits, 5);
    }

    #[test]
    fn test_retry_reuses_payload() {
        let mut t = MockTransport::new();
        t.writes
            .extend([WriteOutcome::Zero, WriteOutcome::Fail, WriteOutcome::Accept]);
        let mut tx = Transmitter::new(config(2, 100, BufferMode::Raw), t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.attempts, 4);

        let s = &tx.transport().submitted;
        assert_eq!(s.len(), 4);
        assert_eq!(s[0].payload, s[1].payload);
        assert_eq!(s[1].payload, s[2].payload);
        assert!(s[2].accepted);
        assert_ne!(s[2].payload, s[3].payload);
    }

    #[test]
    fn test_indexed_retry_keeps_buffer_and_content() {
        let mut t = MockTransport::with_pool(3, 256);
        t.writes.extend([WriteOutcome::Fail, WriteOutcome::Zero]);
        let mut tx = Transmitter::new(config(2, 200, BufferMode::Indexed), t);
        tx.run().unwrap();

        let t = tx.into_transport();
        let s = &t.submitted;
        assert_eq!(s.len(), 4);
        assert_eq!(s[0].index, Some(0));
        assert_eq!(s[1].index, Some(0));
        assert_eq!(s[2].index, Some(0));
        assert_eq!(s[0].payload, s[2].payload);
        assert_eq!(s[3].index, Some(1));
        assert_ne!(s[2].payload, s[3].payload);
        assert!(t.in_flight.is_empty());
    }

    #[test]
    fn test_successful_frames_always_differ() {
        let mut tx = Transmitter::new(config(8, 48, BufferMode::Raw), MockTransport::new());
        tx.run().unwrap();
        let payloads: Vec<_> = tx.transport().accepted().map(|s| s.payload.clone()).collect();
        for pair in payloads.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_regeneration_disabled_sends_identical_frames() {
        let cfg = TransmitConfig {
            regenerate: false,
            ..config(4, 64, BufferMode::Raw)
        };
        let mut tx = Transmitter::new(cfg, MockTransport::new());
        tx.run().unwrap();
        let s = &tx.transport().submitted;
        assert_eq!(s.len(), 4);
        assert!(s.iter().all(|f| f.payload == s[0].payload));
    }

    #[test]
    fn test_regeneration_disabled_indexed_ignores_old_pool_content() {
        let mut t = MockTransport::with_pool(2, 64);
        t.pool_fill = vec![0xaa, 0x55];
        let cfg = TransmitConfig {
            regenerate: false,
            ..config(4, 64, BufferMode::Indexed)
        };
        let mut tx = Transmitter::new(cfg, t);
        tx.run().unwrap();

        let s = &tx.transport().submitted;
        assert_eq!(s.len(), 4);
        assert_eq!(s[0].index, Some(0));
        assert_eq!(s[1].index, Some(1));
        assert!(s.iter().all(|f| f.payload == vec![0u8; 64]));
    }

    #[test]
    fn test_regeneration_disabled_indexed_retry_keeps_content() {
        let mut t = MockTransport::with_pool(2, 32);
        t.pool_fill = vec![0x11, 0x22];
        t.writes.extend([WriteOutcome::Zero]);
        let cfg = TransmitConfig {
            regenerate: false,
            ..config(2, 32, BufferMode::Indexed)
        };
        let mut tx = Transmitter::new(cfg, t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.attempts, 3);

        let s = &tx.transport().submitted;
        assert_eq!(s[0].index, s[1].index);
        assert!(s.iter().all(|f| f.payload == s[0].payload));
    }

    #[test]
    fn test_default_flags_word_is_zero() {
        let mut tx = Transmitter::new(config(1, 8, BufferMode::Raw), MockTransport::new());
        tx.run().unwrap();
        assert_eq!(tx.transport().submitted[0].flags.bits(), 0);
    }

    #[test]
    fn test_zero_frames_still_tears_down() {
        let t = MockTransport::with_pool(2, 256);
        let mut tx = Transmitter::new(config(0, 64, BufferMode::Indexed), t);
        let report = tx.run().unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(report.attempts, 0);

        let t = tx.into_transport();
        assert_eq!(t.waits, 0);
        assert_eq!(t.map_calls, 1);
        assert_eq!(t.unmap_calls, 1);
    }

    #[test]
    fn test_map_failure_is_fatal() {
        let mut t = MockTransport::with_pool(2, 256);
        t.fail_map = true;
        let mut tx = Transmitter::new(config(3, 64, BufferMode::Indexed), t);
        assert!(matches!(tx.run(), Err(DmaError::MmapFailed(_))));
        assert_eq!(tx.state(), LoopState::Idle);
        assert_eq!(tx.transport().waits, 0);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let t = MockTransport::with_pool(2, 256);
        let mut tx = Transmitter::new(config(3, 0, BufferMode::Indexed), t);
        assert!(matches!(tx.run(), Err(DmaError::InvalidConfig(_))));
        assert_eq!(tx.transport().map_calls, 0);
    }

    #[test]
    fn test_flags_reach_transport() {
        let cfg = TransmitConfig {
            flags: crate::flags::FrameFlags::from_user(0x2, 0x1, false),
            ..config(1, 8, BufferMode::Raw)
        };
        let mut tx = Transmitter::new(cfg, MockTransport::new());
        tx.run().unwrap();
        assert_eq!(tx.transport().submitted[0].flags.bits(), 0x0102);
    }

    #[test]
    fn test_format_dump() {
        let bytes: Vec<u8> = (0..12).collect();
        assert_eq!(
            format_dump(&bytes),
            "Raw Data: 0x00 0x01 0x02 0x03 0x04 0x05 0x06 0x07 0x08 0x09 \n          0x0a 0x0b "
        );
    }
}
