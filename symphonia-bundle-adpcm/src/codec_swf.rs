// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::Result;
use symphonia_core::io::{BitReaderLtr, FiniteBitStream, ReadBitsLtr};

use crate::common::reserve;
use crate::decoder::DecodedBlock;
use crate::rule::{NibbleRule, Swf};
use crate::state::ChannelState;

/// The maximum number of codes per channel following a SWF chunk header.
pub(crate) const SWF_CHUNK_CODES: usize = 4095;

/// The size of a SWF chunk header per channel in bits: a 16-bit sample and a 6-bit step index.
const SWF_CHUNK_HEADER_BITS: u64 = 22;

/// Counts the frames coded in a SWF packet of `len` bytes.
fn count_frames(len: usize, code_bits: u64, channels: u64) -> usize {
    let header_bits = SWF_CHUNK_HEADER_BITS * channels;
    let chunk_bits = header_bits + code_bits * channels * SWF_CHUNK_CODES as u64;

    let packet_bits = (8 * len as u64).saturating_sub(2);
    let n_chunks = packet_bits / chunk_bits;
    let bits_left = packet_bits % chunk_bits;

    let mut frames = n_chunks * (SWF_CHUNK_CODES as u64 + 1);
    if bits_left >= header_bits {
        frames += 1 + (bits_left - header_bits) / (code_bits * channels);
    }
    frames as usize
}

/// Decodes a Shockwave Flash packet.
///
/// The packet is a most-significant-bit first bitstream. A 2-bit field sets the code size to 2 to
/// 5 bits. Then, while a chunk header still fits, every channel's initial sample and step index
/// are read and the sample is output, followed by up to 4095 interleaved codes per channel.
pub(crate) fn decode_swf(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut bs = BitReaderLtr::new(block);

    if block.is_empty() {
        return Ok(DecodedBlock { samples: 0, consumed: 0 });
    }

    let rule = Swf::new(bs.read_bits_leq32(2)? + 2);
    let code_bits = u64::from(rule.bits());

    let frames = count_frames(block.len(), code_bits, channels as u64);
    let out = reserve(out, channels * frames)?;
    let mut samples = out.iter_mut();

    while bs.bits_left() >= SWF_CHUNK_HEADER_BITS * channels as u64 {
        for state in states.iter_mut() {
            state.predictor = bs.read_bits_leq32_signed(16)?;
            state.step_index = bs.read_bits_leq32(6)? as i32;

            if let Some(sample) = samples.next() {
                *sample = state.predictor as i16;
            }
        }

        let mut count = 0;

        while count < SWF_CHUNK_CODES && bs.bits_left() >= code_bits * channels as u64 {
            for state in states.iter_mut() {
                let code = bs.read_bits_leq32(rule.bits())? as u8;

                if let Some(sample) = samples.next() {
                    *sample = rule.expand(state, code);
                }
            }
            count += 1;
        }
    }

    Ok(DecodedBlock { samples: channels * frames, consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BitWriterLtr;

    #[test]
    fn verify_swf_count_frames() {
        // 2 bits of size field, 22 bits of header, then 4-bit codes.
        assert_eq!(count_frames(3, 4, 1), 1);
        assert_eq!(count_frames(4, 4, 1), 3);
        assert_eq!(count_frames(2, 4, 1), 0);
    }

    #[test]
    fn verify_swf_mono() {
        let mut block = Vec::new();
        let mut bw = BitWriterLtr::new(&mut block);
        bw.write_bits_leq32(2, 2);
        bw.write_bits_leq32_signed(-1000, 16);
        bw.write_bits_leq32(0, 6);
        bw.write_bits_leq32(0x7, 4);
        bw.write_bits_leq32(0xf, 4);
        bw.flush();
        assert_eq!(block.len(), 4);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 3];
        let decoded = decode_swf(&mut states, &block, &mut out).unwrap();

        // Step 7: code 7 adds 7 + 3 + 1 + 0, code 15 subtracts the same at step index 8.
        assert_eq!(decoded.samples, 3);
        assert_eq!(out[0], -1000);
        assert_eq!(out[1], -989);
        assert_eq!(out[2], -989 - (16 + 8 + 4 + 2));
        assert_eq!(states[0].step_index, 16);
    }

    #[test]
    fn verify_swf_code_sizes() {
        for bits in 2..=5 {
            let mut block = Vec::new();
            let mut bw = BitWriterLtr::new(&mut block);
            bw.write_bits_leq32(bits - 2, 2);
            bw.write_bits_leq32_signed(0, 16);
            bw.write_bits_leq32(10, 6);
            for _ in 0..8 {
                bw.write_bits_leq32(0, bits);
            }
            bw.flush();

            let mut states = [ChannelState::new()];
            let mut out = vec![0; 16];
            let decoded = decode_swf(&mut states, &block, &mut out).unwrap();

            let expected = count_frames(block.len(), u64::from(bits), 1);
            assert_eq!(decoded.samples, expected);
            assert!(expected >= 9);
        }
    }
}
