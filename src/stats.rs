// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Run statistics and the end-of-run report.

use std::fmt;
use std::time::{Duration, Instant};

/// A rate or period that stays well defined for degenerate runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// A finite value.
    Finite(f64),
    /// Division by a zero interval with a non-zero numerator.
    Infinite,
    /// Zero frames over zero time.
    Undefined,
}

impl Measure {
    fn reciprocal(self) -> Self {
        match self {
            Self::Finite(v) if v == 0.0 => Self::Infinite,
            Self::Finite(v) => Self::Finite(1.0 / v),
            Self::Infinite => Self::Finite(0.0),
            Self::Undefined => Self::Undefined,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(v) => write!(f, "{:.6}", v),
            Self::Infinite => f.write_str("inf"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

/// Counters accumulated while the loop runs.
#[derive(Debug, Clone)]
pub struct RunStats {
    frames: u64,
    attempts: u64,
    timeouts: u64,
    bytes: u64,
    started: Instant,
    finished: Option<Instant>,
}

impl RunStats {
    /// Start the run clock.
    pub fn start() -> Self {
        Self {
            frames: 0,
            attempts: 0,
            timeouts: 0,
            bytes: 0,
            started: Instant::now(),
            finished: None,
        }
    }

    /// Record an accepted frame of `bytes` bytes.
    pub fn record_frame(&mut self, bytes: usize) {
        self.frames += 1;
        self.bytes += bytes as u64;
    }

    /// Record a write call, accepted or not.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Record a readiness wait that ended without the transport writable.
    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    /// Accepted frames so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stop the run clock and produce the report.
    pub fn finish(&mut self) -> RunReport {
        let end = *self.finished.get_or_insert_with(Instant::now);
        RunReport {
            frames: self.frames,
            attempts: self.attempts,
            timeouts: self.timeouts,
            bytes: self.bytes,
            elapsed: end.duration_since(self.started),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// Frames accepted by the transport.
    pub frames: u64,
    /// Write calls issued, including rejected ones.
    pub attempts: u64,
    /// Readiness waits that timed out or failed.
    pub timeouts: u64,
    /// Payload bytes accepted.
    pub bytes: u64,
    /// Wall time from loop start to termination.
    pub elapsed: Duration,
}

impl RunReport {
    /// Frames per second.
    pub fn rate(&self) -> Measure {
        per_second(self.frames, self.elapsed)
    }

    /// Seconds per frame.
    pub fn period(&self) -> Measure {
        self.rate().reciprocal()
    }

    /// Payload bytes per second.
    pub fn bandwidth(&self) -> Measure {
        per_second(self.bytes, self.elapsed)
    }
}

fn per_second(amount: u64, elapsed: Duration) -> Measure {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        Measure::Finite(amount as f64 / secs)
    } else if amount > 0 {
        Measure::Infinite
    } else {
        Measure::Undefined
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Write {} events in {:.6} seconds, rate = {} Hz, period = {} seconds",
            self.frames,
            self.elapsed.as_secs_f64(),
            self.rate(),
            self.period()
        )
    }
}
