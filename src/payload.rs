// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Pseudo-random test payload generation.
//!
//! Frames are laid out as little-endian 32-bit words:
//!
//! | Word | Content                               |
//! |------|---------------------------------------|
//! | 0    | Frame sequence number                 |
//! | 1    | Payload length in whole words         |
//! | 2..  | LFSR stream seeded by the sequence    |
//!
//! A trailing partial word is truncated. The sequence number advances on
//! every call, so two consecutive frames never carry the same content and a
//! receiver can spot dropped or duplicated frames.

use crate::error::{DmaError, DmaResult};

/// Default LFSR width in bits.
pub const DEFAULT_WIDTH: u32 = 32;

/// Default LFSR tap positions.
pub const DEFAULT_TAPS: [u32; 4] = [1, 2, 6, 31];

/// Source of deterministic test payloads.
pub trait PayloadGenerator {
    /// Fill all of `buf` with the next frame's payload.
    ///
    /// Callers must not pass an empty buffer.
    fn generate(&mut self, buf: &mut [u8]);
}

/// Fibonacci LFSR pseudo-random binary sequence generator.
#[derive(Debug, Clone)]
pub struct PrbsGenerator {
    mask: u32,
    taps: Vec<u32>,
    sequence: u32,
}

impl PrbsGenerator {
    /// Create a generator with the given register width and tap positions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the width is not in `1..=32`, no taps are
    /// given, or a tap lies outside the register.
    pub fn new(width: u32, taps: &[u32]) -> DmaResult<Self> {
        if width == 0 || width > 32 {
            return Err(DmaError::InvalidConfig(format!(
                "prbs width must be 1..=32, got {}",
                width
            )));
        }
        if taps.is_empty() {
            return Err(DmaError::InvalidConfig("prbs needs at least one tap".into()));
        }
        if let Some(tap) = taps.iter().find(|&&t| t >= width) {
            return Err(DmaError::InvalidConfig(format!(
                "prbs tap {} outside {}-bit register",
                tap, width
            )));
        }

        let mask = if width == 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        };

        Ok(Self {
            mask,
            taps: taps.to_vec(),
            sequence: 0,
        })
    }

    /// Sequence number the next frame will carry.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Restart the frame sequence at zero.
    pub fn reset(&mut self) {
        self.sequence = 0;
    }

    /// Advance the register by one step.
    #[inline]
    fn step(&self, value: u32) -> u32 {
        let feedback = self
            .taps
            .iter()
            .fold(0u32, |bit, &tap| bit ^ ((value >> tap) & 1));
        ((value << 1) | feedback) & self.mask
    }
}

impl Default for PrbsGenerator {
    fn default() -> Self {
        Self {
            mask: u32::MAX >> (32 - DEFAULT_WIDTH),
            taps: DEFAULT_TAPS.to_vec(),
            sequence: 0,
        }
    }
}

impl PayloadGenerator for PrbsGenerator {
    fn generate(&mut self, buf: &mut [u8]) {
        debug_assert!(!buf.is_empty(), "payload buffer must not be empty");

        let words = (buf.len() / 4) as u32;
        let mut value = self.sequence & self.mask;

        for (i, chunk) in buf.chunks_mut(4).enumerate() {
            let word = match i {
                0 => self.sequence,
                1 => words,
                _ => {
                    value = self.step(value);
                    value
                }
            };
            chunk.copy_from_slice(&word.to_le_bytes()[..chunk.len()]);
        }

        self.sequence = self.sequence.wrapping_add(1);
    }
}
