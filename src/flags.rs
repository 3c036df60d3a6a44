// AXI Stream DMA Write Benchmark
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! AXI stream sideband flags carried with every frame.
//!
//! The driver takes one 32-bit word per write. Bits [7:0] hold the first-user
//! field (TUSER on the first beat), bits [15:8] the last-user field (TUSER on
//! the last beat) and bit 16 marks a frame continued by the next write.

use bitflags::bitflags;

bitflags! {
    /// Frame flags word passed to the driver on every write.
    ///
    /// The default word is empty: no user fields, no continuation.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u32 {
        /// First-user field mask.
        const FIRST_USER = 0x0000_00ff;
        /// Last-user field mask.
        const LAST_USER = 0x0000_ff00;
        /// Frame continues in the next write.
        const CONTINUE = 1 << 16;
    }
}

impl FrameFlags {
    /// Build a flags word from the user fields and continuation bit.
    pub fn from_user(first_user: u8, last_user: u8, cont: bool) -> Self {
        let mut bits = u32::from(first_user) | (u32::from(last_user) << 8);
        if cont {
            bits |= Self::CONTINUE.bits();
        }
        Self::from_bits_retain(bits)
    }

    /// First-user field.
    #[inline]
    pub fn first_user(&self) -> u8 {
        (self.bits() & Self::FIRST_USER.bits()) as u8
    }

    /// Last-user field.
    #[inline]
    pub fn last_user(&self) -> u8 {
        ((self.bits() & Self::LAST_USER.bits()) >> 8) as u8
    }

    /// Returns true if the continuation bit is set.
    #[inline]
    pub fn is_continued(&self) -> bool {
        self.contains(Self::CONTINUE)
    }
}
