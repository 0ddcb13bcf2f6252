// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::{unsupported_error, Result};
use symphonia_core::io::{BufReader, ReadBytes};

use crate::common::{reserve, u16_to_i32};
use crate::decoder::DecodedBlock;
use crate::rule::{Ima, NibbleRule};
use crate::state::ChannelState;

const DK3_HEADER_LEN: usize = 16;

/// Yields the nibbles of a byte slice, low nibble first.
struct NibbleStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> NibbleStream<'a> {
    fn new(data: &'a [u8]) -> Self {
        NibbleStream { data, pos: 0 }
    }
}

impl Iterator for NibbleStream<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos / 2)?;
        let nibble = if self.pos & 1 == 0 { byte & 0x0f } else { byte >> 4 };
        self.pos += 1;
        Some(nibble)
    }
}

/// Reconstructs a stereo frame from the sum and difference channels. The result wraps.
#[inline(always)]
fn mix(sum: &ChannelState, diff: &ChannelState) -> [i16; 2] {
    [(sum.predictor + diff.predictor) as i16, (sum.predictor - diff.predictor) as i16]
}

/// Decodes a Duck DK3 block.
///
/// DK3 always codes a stereo pair as a sum channel (state 0) and a difference channel (state 1).
/// The sum channel runs at twice the rate of the difference channel: every three nibbles update
/// the sum, the difference, and the sum again, yielding two stereo frames.
pub(crate) fn decode_dk3(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let mut stream = BufReader::new(block);
    stream.ignore_bytes(10)?;

    let sum_predictor = u16_to_i32!(stream.read_u16()?);
    let diff_predictor = u16_to_i32!(stream.read_u16()?);
    let sum_step_index = i32::from(stream.read_u8()?);
    let diff_step_index = i32::from(stream.read_u8()?);

    let (sum, diff) = match states {
        [sum, diff] => (sum, diff),
        _ => return unsupported_error("adpcm: dk3 requires exactly two channels"),
    };

    sum.predictor = sum_predictor;
    sum.load_step_index(sum_step_index);
    diff.predictor = diff_predictor;
    diff.load_step_index(diff_step_index);

    let data = &block[DK3_HEADER_LEN..];
    let n_nibbles = 2 * data.len();
    let frames = 2 * (n_nibbles / 3) + usize::from(n_nibbles % 3 == 2);
    let out = reserve(out, 2 * frames)?;

    let rule = Ima::new(3);
    let mut nibbles = NibbleStream::new(data);
    let mut frame_iter = out.chunks_exact_mut(2);

    while let (Some(sum_code), Some(diff_code)) = (nibbles.next(), nibbles.next()) {
        rule.expand(sum, sum_code);
        rule.expand(diff, diff_code);

        if let Some(frame) = frame_iter.next() {
            frame.copy_from_slice(&mix(sum, diff));
        }

        match nibbles.next() {
            Some(sum_code) => rule.expand(sum, sum_code),
            None => break,
        };

        if let Some(frame) = frame_iter.next() {
            frame.copy_from_slice(&mix(sum, diff));
        }
    }

    Ok(DecodedBlock { samples: 2 * frames, consumed: block.len() })
}
