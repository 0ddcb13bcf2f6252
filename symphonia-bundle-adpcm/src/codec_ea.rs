// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Block framers of the Electronic Arts linear-predictor dialects.

use log::debug;

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::{BufReader, ReadBytes};

use crate::common::{reserve, u16_to_i32, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{Ea, NibbleRule};
use crate::state::ChannelState;
use crate::tables::EA_COEFFS;

/// The number of samples coded by one EA sub-block.
const EA_SUBBLOCK_LEN: usize = 28;

/// The escape byte of the R2 and R3 dialects that introduces a sub-block of raw samples.
const EA_ESCAPE: u8 = 0xee;

/// Loads the coefficient pair selected by a 4-bit index into `state`.
#[inline(always)]
fn load_coeffs(state: &mut ChannelState, index: u8) {
    let index = usize::from(index & 0x0f);
    state.coeff1 = EA_COEFFS[index];
    state.coeff2 = EA_COEFFS[index + 4];
}

/// Decodes an Electronic Arts block.
///
/// After the sample count and the initial history of both channels, every 28 stereo frames are
/// coded by a coefficient byte, a shift byte, and 28 data bytes. In all three the high nibble
/// belongs to the left channel.
pub(crate) fn decode_ea(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let mut stream = BufReader::new(block);

    let count = stream.read_u32()? as usize;
    let n_subblocks = count / EA_SUBBLOCK_LEN;

    if block.len() < 12 || n_subblocks > (block.len() - 12) / (2 + EA_SUBBLOCK_LEN) {
        return decode_error("adpcm: ea sample count exceeds block");
    }

    let (left, right) = match states {
        [left, right] => (left, right),
        _ => return decode_error("adpcm: ea requires exactly two channels"),
    };

    left.sample1 = u16_to_i32!(stream.read_u16()?);
    left.sample2 = u16_to_i32!(stream.read_u16()?);
    right.sample1 = u16_to_i32!(stream.read_u16()?);
    right.sample2 = u16_to_i32!(stream.read_u16()?);

    let frames = n_subblocks * EA_SUBBLOCK_LEN;
    let out = reserve(out, 2 * frames)?;

    for subblock in out.chunks_exact_mut(2 * EA_SUBBLOCK_LEN) {
        let coeffs = stream.read_u8()?;
        load_coeffs(left, Nibble::Upper.get_nibble(coeffs));
        load_coeffs(right, Nibble::Lower.get_nibble(coeffs));

        let shifts = stream.read_u8()?;
        let left_rule = Ea::new(Nibble::Upper.get_nibble(shifts), 0x80);
        let right_rule = Ea::new(Nibble::Lower.get_nibble(shifts), 0x80);

        for frame in subblock.chunks_exact_mut(2) {
            let byte = stream.read_u8()?;
            frame[0] = left_rule.expand(left, Nibble::Upper.get_nibble(byte));
            frame[1] = right_rule.expand(right, Nibble::Lower.get_nibble(byte));
        }
    }

    Ok(DecodedBlock { samples: 2 * frames, consumed: block.len() })
}

/// The revision of an Electronic Arts R-series block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EaRevision {
    R1,
    R2,
    R3,
}

fn read_u32<B: ReadBytes>(stream: &mut B, big_endian: bool) -> Result<u32> {
    Ok(if big_endian { stream.read_be_u32()? } else { stream.read_u32()? })
}

/// Decodes an Electronic Arts R1, R2, or R3 block.
///
/// The block starts with the sample count and one offset per channel to that channel's data. The
/// data of a channel is a sequence of sub-blocks, each either a coefficient and shift byte followed
/// by 14 data bytes, or an escape byte followed by the new history and 28 raw samples. R1 reads
/// the initial history of every channel from the block, R2 and R3 carry it over from the previous
/// block. All fields of R3 blocks are big-endian.
pub(crate) fn decode_ea_r(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
    revision: EaRevision,
) -> Result<DecodedBlock> {
    let channels = states.len();
    let big_endian = revision == EaRevision::R3;

    let mut stream = BufReader::new(block);

    let count = read_u32(&mut stream, big_endian)? as usize;
    let n_subblocks = count / EA_SUBBLOCK_LEN;
    let frames = n_subblocks * EA_SUBBLOCK_LEN;

    let base = 4 * (channels + 1);

    let mut offsets = [0usize; 6];
    for offset in offsets.iter_mut().take(channels) {
        *offset = match base.checked_add(read_u32(&mut stream, big_endian)? as usize) {
            Some(offset) => offset,
            None => return decode_error("adpcm: ea channel offset exceeds block"),
        };
    }

    let out = reserve(out, frames * channels)?;

    for (ch, state) in states.iter_mut().enumerate() {
        let offset = offsets[ch];

        if offset > block.len() {
            return decode_error("adpcm: ea channel offset exceeds block");
        }

        let mut stream = BufReader::new(&block[offset..]);

        if revision == EaRevision::R1 {
            state.predictor = u16_to_i32!(stream.read_u16()?);
            state.prev_sample = u16_to_i32!(stream.read_u16()?);
        }

        // The linear predictor works on sample1 and sample2.
        state.sample1 = state.predictor;
        state.sample2 = state.prev_sample;

        for subblock in 0..n_subblocks {
            let frame = subblock * EA_SUBBLOCK_LEN;
            let header = stream.read_u8()?;

            if header == EA_ESCAPE {
                debug!("adpcm: ea raw sub-block on channel {}", ch);

                state.sample1 = i32::from(stream.read_be_i16()?);
                state.sample2 = i32::from(stream.read_be_i16()?);

                for i in 0..EA_SUBBLOCK_LEN {
                    out[(frame + i) * channels + ch] = stream.read_be_i16()?;
                }
            }
            else {
                load_coeffs(state, Nibble::Upper.get_nibble(header));
                let rule = Ea::new(Nibble::Lower.get_nibble(header), 0);

                for i in 0..EA_SUBBLOCK_LEN / 2 {
                    let byte = stream.read_u8()?;
                    let pos = (frame + 2 * i) * channels + ch;
                    out[pos] = rule.expand(state, Nibble::Upper.get_nibble(byte));
                    out[pos + channels] = rule.expand(state, Nibble::Lower.get_nibble(byte));
                }
            }
        }

        if revision != EaRevision::R1 {
            state.predictor = state.sample1;
            state.prev_sample = state.sample2;
        }
    }

    Ok(DecodedBlock { samples: frames * channels, consumed: block.len() })
}

/// The size of one channel's data in an Electronic Arts XAS block.
pub(crate) const EA_XAS_CHANNEL_LEN: usize = 76;

/// Decodes an Electronic Arts XAS block.
///
/// Every channel codes 128 samples as four sub-blocks of 32. The four sub-block headers come first,
/// each holding a coefficient index, a shift, and two raw seed samples. The data of the four
/// sub-blocks is interleaved byte by byte.
pub(crate) fn decode_ea_xas(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    let out = reserve(out, 128 * channels)?;

    for (ch, state) in states.iter_mut().enumerate() {
        let mut subblocks = [ChannelState::new(); 4];
        let mut rules = [Ea::new(0, 0x80); 4];

        for (n, (subblock, rule)) in subblocks.iter_mut().zip(rules.iter_mut()).enumerate() {
            let first = stream.read_u16()?;
            load_coeffs(subblock, (first & 0x0f) as u8);
            subblock.sample2 = u16_to_i32!(first & !0x0f);

            let second = stream.read_u16()?;
            *rule = Ea::new((second & 0x0f) as u8, 0x80);
            subblock.sample1 = u16_to_i32!(second & !0x0f);

            out[32 * n * channels + ch] = subblock.sample2 as i16;
            out[(32 * n + 1) * channels + ch] = subblock.sample1 as i16;
        }

        for m in (2..32).step_by(2) {
            for (n, (subblock, rule)) in subblocks.iter_mut().zip(rules.iter()).enumerate() {
                let byte = stream.read_u8()?;
                let pos = (32 * n + m) * channels + ch;
                out[pos] = rule.expand(subblock, Nibble::Upper.get_nibble(byte));
                out[pos + channels] = rule.expand(subblock, Nibble::Lower.get_nibble(byte));
            }
        }

        *state = subblocks[3];
    }

    Ok(DecodedBlock { samples: 128 * channels, consumed: EA_XAS_CHANNEL_LEN * channels })
}

/// Decodes an Electronic Arts Maxis CD-ROM XA block.
///
/// Each channel has a coefficient and shift byte, followed by one byte per channel per pair of
/// frames, high nibble first. History persists across blocks.
pub(crate) fn decode_ea_maxis_xa(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    let mut rules = [Ea::new(0, 0x80); 2];

    for (state, rule) in states.iter_mut().zip(rules.iter_mut()) {
        let byte = stream.read_u8()?;
        load_coeffs(state, Nibble::Upper.get_nibble(byte));
        *rule = Ea::new(Nibble::Lower.get_nibble(byte), 0x80);
    }

    let data = &block[channels..];
    let pairs = data.len() / channels;
    let out = reserve(out, 2 * pairs * channels)?;

    for (bytes, frames) in data.chunks_exact(channels).zip(out.chunks_exact_mut(2 * channels)) {
        for (ch, (&byte, state)) in bytes.iter().zip(states.iter_mut()).enumerate() {
            frames[ch] = rules[ch].expand(state, Nibble::Upper.get_nibble(byte));
            frames[channels + ch] = rules[ch].expand(state, Nibble::Lower.get_nibble(byte));
        }
    }

    Ok(DecodedBlock { samples: 2 * pairs * channels, consumed: channels + pairs * channels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_ea_zero_residual() {
        let mut block = vec![28, 0, 0, 0];
        // Left history 1000, 1000; right history -500, -500.
        block.extend_from_slice(&[0xe8, 0x03, 0xe8, 0x03, 0x0c, 0xfe, 0x0c, 0xfe]);
        // Coefficient pair 1 for both channels: 240, 0.
        block.extend_from_slice(&[0x11, 0x00]);
        block.extend_from_slice(&[0x00; 28]);

        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 56];
        let decoded = decode_ea(&mut states, &block, &mut out).unwrap();

        assert_eq!(decoded.samples, 56);
        assert_eq!(out[0], ((1000 * 240 + 0x80) >> 8) as i16);
        assert_eq!(out[1], ((-500 * 240 + 0x80) >> 8) as i16);
    }

    #[test]
    fn verify_ea_count_exceeds_block() {
        let mut block = vec![56, 0, 0, 0];
        block.extend_from_slice(&[0; 8 + 30]);

        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 256];
        assert!(decode_ea(&mut states, &block, &mut out).is_err());
    }

    fn ea_r_block(big_endian: bool, escape: bool) -> Vec<u8> {
        let mut block = Vec::new();
        if big_endian {
            block.extend_from_slice(&28u32.to_be_bytes());
            block.extend_from_slice(&0u32.to_be_bytes());
        }
        else {
            block.extend_from_slice(&28u32.to_le_bytes());
            block.extend_from_slice(&0u32.to_le_bytes());
        }

        if !big_endian {
            // R1 history.
            block.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
        }

        if escape {
            block.push(EA_ESCAPE);
            block.extend_from_slice(&[0x00, 0x64, 0x00, 0x32]);
            for i in 0..28i16 {
                block.extend_from_slice(&(i * 10).to_be_bytes());
            }
        }
        else {
            block.push(0x0c);
            block.extend_from_slice(&[0x11; 14]);
        }
        block
    }

    #[test]
    fn verify_ea_r1_subblock() {
        let block = ea_r_block(false, false);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 28];
        let decoded = decode_ea_r(&mut states, &block, &mut out, EaRevision::R1).unwrap();

        assert_eq!(decoded.samples, 28);
        // Coefficients 0, 0 and shift 12: every code 1 yields (1 << 16) >> 8 = 256 >> 8.
        assert!(out.iter().all(|&s| s == 1));
        // R1 does not persist history.
        assert_eq!(states[0].predictor, 16);
    }

    #[test]
    fn verify_ea_r3_escape() {
        let block = ea_r_block(true, true);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 28];
        decode_ea_r(&mut states, &block, &mut out, EaRevision::R3).unwrap();

        assert_eq!(out[27], 270);
        // The escape history, not the raw samples, carries over.
        assert_eq!(states[0].predictor, 100);
        assert_eq!(states[0].prev_sample, 50);
    }

    #[test]
    fn verify_ea_r_offset_out_of_range() {
        let mut block = ea_r_block(true, false);
        block[4..8].copy_from_slice(&u32::MAX.to_be_bytes());

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 28];
        assert!(decode_ea_r(&mut states, &block, &mut out, EaRevision::R3).is_err());
        assert_eq!(states[0], ChannelState::new());
    }

    #[test]
    fn verify_ea_xas_seeds() {
        let mut block = Vec::new();
        for n in 0..4u16 {
            // Coefficient index 0 and seeds 16 * n, 16 * n + 16 with shift 12.
            block.extend_from_slice(&(16 * n).to_le_bytes());
            block.extend_from_slice(&((16 * n + 16) | 12).to_le_bytes());
        }
        block.extend_from_slice(&[0; 60]);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 128];
        let decoded = decode_ea_xas(&mut states, &block, &mut out).unwrap();

        assert_eq!(decoded.samples, 128);
        assert_eq!(out[32], 16);
        assert_eq!(out[33], 32);
        // Coefficient pair 0 predicts silence.
        assert_eq!(out[34], 0);
    }

    #[test]
    fn verify_ea_maxis_xa_persists() {
        let mut states = [ChannelState::new()];
        let mut out = vec![0; 8];

        // Coefficient pair 1, shift 12, codes 1 and 1.
        let decoded = decode_ea_maxis_xa(&mut states, &[0x1c, 0x11], &mut out).unwrap();
        assert_eq!(decoded.samples, 2);
        // (256 + 0x80) >> 8 = 1, then (256 + 240 + 0x80) >> 8 = 2.
        assert_eq!(&out[..2], &[1, 2]);
        assert_eq!(states[0].sample1, 2);
    }
}
