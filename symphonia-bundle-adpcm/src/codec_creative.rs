// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Block framers of the Creative Technology and Sound Blaster Pro dialects.

use symphonia_core::errors::Result;

use crate::common::{reserve, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{expand_byte_pairs, Ct, NibbleRule, SbPro};
use crate::state::ChannelState;

/// Decodes a Creative Technology block. Creative blocks carry no header.
pub(crate) fn decode_ct(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let out = reserve(out, 2 * block.len())?;

    expand_byte_pairs(&Ct, block, Nibble::Upper, states, out);

    Ok(DecodedBlock { samples: 2 * block.len(), consumed: block.len() })
}

/// Decodes a Sound Blaster Pro block of `bits`-bit codes.
///
/// The very first block of a stream starts with one raw unsigned 8-bit sample per channel. A
/// non-zero `step_index` on the first channel records that the raw samples were consumed.
pub(crate) fn decode_sbpro(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
    bits: u32,
) -> Result<DecodedBlock> {
    let channels = states.len();
    let last = channels - 1;

    let primed = states[0].step_index != 0;
    let raw_len = if primed { 0 } else { channels.min(block.len()) };

    let data = &block[raw_len..];
    let codes_per_byte = match bits {
        4 => 2,
        3 => 3,
        _ => 4,
    };
    let samples = raw_len + codes_per_byte * data.len();
    let out = reserve(out, samples)?;

    for (sample, &byte) in out.iter_mut().zip(&block[..raw_len]) {
        *sample = 128 * (i16::from(byte) - 0x80);
    }

    if raw_len > 0 {
        states[0].step_index = 1;
    }

    let out = &mut out[raw_len..];

    match bits {
        4 => expand_byte_pairs(&SbPro::new(4, 0), data, Nibble::Upper, states, out),
        3 => {
            let wide = SbPro::new(3, 0);
            let narrow = SbPro::new(2, 0);
            let state = &mut states[0];

            for (&byte, codes) in data.iter().zip(out.chunks_exact_mut(3)) {
                codes[0] = wide.expand(state, byte >> 5);
                codes[1] = wide.expand(state, (byte >> 2) & 0x07);
                codes[2] = narrow.expand(state, byte & 0x03);
            }
        }
        _ => {
            let rule = SbPro::new(2, 2);

            for (&byte, codes) in data.iter().zip(out.chunks_exact_mut(4)) {
                codes[0] = rule.expand(&mut states[0], byte >> 6);
                codes[1] = rule.expand(&mut states[last], (byte >> 4) & 0x03);
                codes[2] = rule.expand(&mut states[0], (byte >> 2) & 0x03);
                codes[3] = rule.expand(&mut states[last], byte & 0x03);
            }
        }
    }

    Ok(DecodedBlock { samples, consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_ct_persists_state() {
        let mut states = [ChannelState { step: 511, ..Default::default() }];
        let mut out = vec![0; 8];

        decode_ct(&mut states, &[0x77, 0x77], &mut out).unwrap();
        let first = states[0];
        assert!(first.predictor > 0);
        assert!(first.step > 511);

        // Decoding continues from where the previous block left off.
        decode_ct(&mut states, &[0x00], &mut out).unwrap();
        assert_eq!(out[0], (((first.predictor * 254) >> 8) + (first.step >> 3)) as i16);
    }

    #[test]
    fn verify_sbpro_raw_first_sample() {
        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 16];

        let decoded = decode_sbpro(&mut states, &[0x81, 0x7f, 0x10], &mut out, 4).unwrap();
        assert_eq!(decoded.samples, 4);
        assert_eq!(&out[..2], &[128, -128]);
        assert_eq!(states[0].step_index, 1);

        // Later blocks carry no raw samples.
        let decoded = decode_sbpro(&mut states, &[0x10], &mut out, 4).unwrap();
        assert_eq!(decoded.samples, 2);
    }

    #[test]
    fn verify_sbpro_code_sizes() {
        let mut states = [ChannelState { step_index: 1, ..Default::default() }];
        let mut out = vec![0; 16];

        assert_eq!(decode_sbpro(&mut states, &[0; 2], &mut out, 3).unwrap().samples, 6);
        assert_eq!(decode_sbpro(&mut states, &[0; 2], &mut out, 2).unwrap().samples, 8);

        // 2-bit codes with an extra shift of 2: code 1 adds 1 << 9.
        let mut states = [ChannelState { step_index: 1, ..Default::default() }];
        decode_sbpro(&mut states, &[0x40], &mut out, 2).unwrap();
        assert_eq!(out[0], 512);
    }
}
