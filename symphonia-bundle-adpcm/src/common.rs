// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::{limit_error, Result};

/// `Nibble` represents the lower or upper 4 bits of a byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Nibble {
    Upper,
    Lower,
}

impl Nibble {
    pub fn get_nibble(&self, byte: u8) -> u8 {
        match self {
            Nibble::Upper => byte >> 4,
            Nibble::Lower => byte & 0x0F,
        }
    }

    /// The other half of the same byte.
    pub fn other(&self) -> Nibble {
        match self {
            Nibble::Upper => Nibble::Lower,
            Nibble::Lower => Nibble::Upper,
        }
    }

    /// Places `nibble` into this half of a byte.
    pub fn put_nibble(&self, nibble: u8) -> u8 {
        match self {
            Nibble::Upper => (nibble & 0x0F) << 4,
            Nibble::Lower => nibble & 0x0F,
        }
    }
}

macro_rules! u16_to_i32 {
    ($input:expr) => {
        $input as i16 as i32
    };
}

macro_rules! from_i16_shift {
    ($input:expr) => {
        ($input as i32) << 16
    };
}

pub(crate) use from_i16_shift;
pub(crate) use u16_to_i32;

/// Sign extends the lower `bits` bits of `value`.
#[inline(always)]
pub(crate) fn sign_extend(value: u32, bits: u32) -> i32 {
    ((value << (32 - bits)) as i32) >> (32 - bits)
}

/// Borrows exactly `len` samples from the front of `out`, or fails if `out` is too short. Framers
/// call this before writing anything so that a block either decodes fully or not at all.
pub(crate) fn reserve(out: &mut [i16], len: usize) -> Result<&mut [i16]> {
    if len > out.len() {
        return limit_error("adpcm: decoded block exceeds the output buffer");
    }
    Ok(&mut out[..len])
}

/// `NibbleWriter` packs 4-bit codes into bytes, starting each byte with the `first` half.
pub(crate) struct NibbleWriter<'a> {
    buf: &'a mut Vec<u8>,
    first: Nibble,
    val: u8,
    half: bool,
}

impl<'a> NibbleWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>, first: Nibble) -> Self {
        NibbleWriter { buf, first, val: 0, half: false }
    }

    pub fn write(&mut self, nibble: u8) {
        if self.half {
            self.buf.push(self.val | self.first.other().put_nibble(nibble));
            self.half = false;
        }
        else {
            self.val = self.first.put_nibble(nibble);
            self.half = true;
        }
    }

    /// Writes out a pending half-filled byte.
    pub fn finish(self) {
        if self.half {
            self.buf.push(self.val);
        }
    }
}

/// `BitWriterLtr` writes bit fields from most-significant to least-significant bit.
pub(crate) struct BitWriterLtr<'a> {
    buf: &'a mut Vec<u8>,
    bits: u64,
    n_bits: u32,
}

impl<'a> BitWriterLtr<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        BitWriterLtr { buf, bits: 0, n_bits: 0 }
    }

    pub fn write_bits_leq32(&mut self, value: u32, bit_width: u32) {
        debug_assert!(bit_width <= 32);

        let mask = if bit_width == 32 { u32::MAX } else { (1 << bit_width) - 1 };

        self.bits = (self.bits << bit_width) | u64::from(value & mask);
        self.n_bits += bit_width;

        while self.n_bits >= 8 {
            self.n_bits -= 8;
            self.buf.push((self.bits >> self.n_bits) as u8);
        }

        self.bits &= (1 << self.n_bits) - 1;
    }

    pub fn write_bits_leq32_signed(&mut self, value: i32, bit_width: u32) {
        self.write_bits_leq32(value as u32, bit_width);
    }

    /// Pads the final partial byte with zeros.
    pub fn flush(self) {
        if self.n_bits > 0 {
            self.buf.push((self.bits << (8 - self.n_bits)) as u8);
        }
    }
}
