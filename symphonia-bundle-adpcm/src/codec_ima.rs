// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Block framers of the IMA dialects that use the product form of the IMA rule.

use log::warn;

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::{BufReader, ReadBytes};

use crate::common::{reserve, u16_to_i32, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{expand_byte_pairs, Ima, NibbleRule};
use crate::state::ChannelState;

const IMA: Ima = Ima::new(3);

/// Reads the 4-byte channel preamble shared by the WAV, DK4, and ISS dialects and returns the
/// final, reserved, byte.
fn read_preamble<B: ReadBytes>(stream: &mut B, state: &mut ChannelState) -> Result<u8> {
    state.predictor = u16_to_i32!(stream.read_u16()?);
    state.load_step_index(i32::from(stream.read_u8()?));
    Ok(stream.read_u8()?)
}

/// Decodes a Microsoft IMA ADPCM block.
///
/// Mono data is a sequence of bytes, low nibble first. Multichannel data is divided into groups
/// of 4 bytes (8 samples) per channel, the channels taking turns.
pub(crate) fn decode_wav(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    for state in states.iter_mut() {
        let reserved = read_preamble(&mut stream, state)?;
        if reserved != 0 {
            warn!("adpcm: reserved byte is {}, expected 0", reserved);
        }
    }

    let data = &block[4 * channels..];

    let frames =
        if channels == 1 { 1 + 2 * data.len() } else { 1 + 8 * (data.len() / (4 * channels)) };

    let out = reserve(out, frames * channels)?;

    for (sample, state) in out.iter_mut().zip(states.iter()) {
        *sample = state.predictor as i16;
    }

    if channels == 1 {
        let state = &mut states[0];
        for (&byte, pair) in data.iter().zip(out[1..].chunks_exact_mut(2)) {
            pair[0] = IMA.expand(state, Nibble::Lower.get_nibble(byte));
            pair[1] = IMA.expand(state, Nibble::Upper.get_nibble(byte));
        }
    }
    else {
        for (g, group) in data.chunks_exact(4 * channels).enumerate() {
            for (ch, (chunk, state)) in group.chunks_exact(4).zip(states.iter_mut()).enumerate() {
                for (k, &byte) in chunk.iter().enumerate() {
                    let frame = 1 + 8 * g + 2 * k;
                    out[frame * channels + ch] = IMA.expand(state, Nibble::Lower.get_nibble(byte));
                    out[(frame + 1) * channels + ch] =
                        IMA.expand(state, Nibble::Upper.get_nibble(byte));
                }
            }
        }
    }

    Ok(DecodedBlock { samples: frames * channels, consumed: block.len() })
}

/// Decodes a Duck DK4 block. The layout is that of IMA WAV, but nibbles are high first and stereo
/// data is interleaved per byte.
pub(crate) fn decode_dk4(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    for state in states.iter_mut() {
        read_preamble(&mut stream, state)?;
    }

    let data = &block[4 * channels..];
    let samples = channels + 2 * data.len();
    let out = reserve(out, samples)?;

    for (sample, state) in out.iter_mut().zip(states.iter()) {
        *sample = state.predictor as i16;
    }

    expand_byte_pairs(&IMA, data, Nibble::Upper, states, &mut out[channels..]);

    Ok(DecodedBlock { samples, consumed: block.len() })
}

/// The first half of every byte for the Funcom ISS and Westwood layouts. Mono streams are low
/// nibble first, stereo streams carry the left channel in the high nibble.
fn swapped_first(channels: usize) -> Nibble {
    if channels == 1 {
        Nibble::Lower
    }
    else {
        Nibble::Upper
    }
}

/// Decodes a Funcom ISS block.
pub(crate) fn decode_iss(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    for state in states.iter_mut() {
        read_preamble(&mut stream, state)?;
    }

    let data = &block[4 * channels..];
    let out = reserve(out, 2 * data.len())?;

    expand_byte_pairs(&IMA, data, swapped_first(channels), states, out);

    Ok(DecodedBlock { samples: 2 * data.len(), consumed: block.len() })
}

/// Decodes a Westwood block. Westwood blocks carry no header.
pub(crate) fn decode_ws(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let out = reserve(out, 2 * block.len())?;

    expand_byte_pairs(&IMA, block, swapped_first(states.len()), states, out);

    Ok(DecodedBlock { samples: 2 * block.len(), consumed: block.len() })
}

/// Decodes an Electronic Arts SEAD block. SEAD blocks carry no header.
pub(crate) fn decode_ea_sead(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let out = reserve(out, 2 * block.len())?;

    expand_byte_pairs(&Ima::new(6), block, Nibble::Upper, states, out);

    Ok(DecodedBlock { samples: 2 * block.len(), consumed: block.len() })
}

/// Decodes an Electronic Arts EACS block.
pub(crate) fn decode_ea_eacs(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    // The frame count, in bytes of data: mono streams pack two frames per byte.
    let count = stream.read_u32()? as usize;
    let len = if channels == 1 { count >> 1 } else { count };

    for state in states.iter_mut() {
        state.load_step_index(stream.read_u32()? as i32);
    }

    for state in states.iter_mut() {
        state.load_predictor(stream.read_u32()? as i32);
    }

    let data = &block[4 + 8 * channels..];

    if len > data.len() {
        return decode_error("adpcm: ea eacs sample count exceeds block");
    }

    let out = reserve(out, 2 * len)?;

    expand_byte_pairs(&IMA, &data[..len], Nibble::Upper, states, out);

    Ok(DecodedBlock { samples: 2 * len, consumed: 4 + 8 * channels + len })
}

/// Decodes an AMV block.
pub(crate) fn decode_amv(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let mut stream = BufReader::new(block);

    let state = &mut states[0];
    state.predictor = u16_to_i32!(stream.read_u16()?);
    state.load_step_index(i32::from(stream.read_u16()?));
    stream.ignore_bytes(4)?;

    let data = &block[8..];
    let out = reserve(out, 2 * data.len())?;

    expand_byte_pairs(&IMA, data, Nibble::Upper, states, out);

    Ok(DecodedBlock { samples: 2 * data.len(), consumed: block.len() })
}

/// Decodes a 4X Movie block. Channel data is planar, each channel using an equal share of the
/// data.
pub(crate) fn decode_4xm(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    for state in states.iter_mut() {
        state.predictor = u16_to_i32!(stream.read_u16()?);
    }

    for state in states.iter_mut() {
        state.load_step_index(u16_to_i32!(stream.read_u16()?));
    }

    let data = &block[4 * channels..];
    let len = data.len() / channels;
    let frames = 2 * len;
    let out = reserve(out, frames * channels)?;

    if len == 0 {
        return Ok(DecodedBlock { samples: 0, consumed: block.len() });
    }

    let rule = Ima::new(4);

    for (ch, (chunk, state)) in data.chunks_exact(len).zip(states.iter_mut()).enumerate() {
        for (i, &byte) in chunk.iter().enumerate() {
            out[2 * i * channels + ch] = rule.expand(state, Nibble::Lower.get_nibble(byte));
            out[(2 * i + 1) * channels + ch] = rule.expand(state, Nibble::Upper.get_nibble(byte));
        }
    }

    Ok(DecodedBlock { samples: frames * channels, consumed: 4 * channels + len * channels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(
        decode_fn: fn(&mut [ChannelState], &[u8], &mut [i16]) -> Result<DecodedBlock>,
        channels: usize,
        block: &[u8],
    ) -> (Vec<i16>, Vec<ChannelState>) {
        let mut states = vec![ChannelState::new(); channels];
        let mut out = vec![0; 4 * block.len() + 2 * channels];
        let decoded = decode_fn(&mut states, block, &mut out).unwrap();
        out.truncate(decoded.samples);
        (out, states)
    }

    #[test]
    fn verify_wav_mono() {
        // Predictor 100, step index 1.
        let block = [100, 0, 1, 0, 0x91];
        let (out, states) = decode(decode_wav, 1, &block);

        // Low nibble 0x1 first: +3, then 0x9 with step 7: -2.
        assert_eq!(out, [100, 103, 101]);
        assert_eq!(states[0].predictor, 101);
        assert_eq!(states[0].step_index, 0);
    }

    #[test]
    fn verify_wav_stereo_grouping() {
        let mut block = vec![0x10, 0x00, 0, 0, 0x20, 0x00, 0, 0];
        // Four bytes for the left channel, then four for the right.
        block.extend_from_slice(&[0x00; 4]);
        block.extend_from_slice(&[0x77; 4]);

        let (out, states) = decode(decode_wav, 2, &block);

        assert_eq!(out.len(), 18);
        assert_eq!(out[0], 0x10);
        assert_eq!(out[1], 0x20);

        // Zero codes at the smallest step leave the left channel unchanged, while the right
        // channel climbs.
        for frame in 1..9 {
            assert_eq!(out[2 * frame], 0x10);
            assert!(out[2 * frame + 1] > out[2 * (frame - 1) + 1]);
        }
        assert_eq!(states[0].step_index, 0);
        assert_eq!(states[1].step_index, 64);
    }

    #[test]
    fn verify_wav_truncated_header() {
        let mut states = vec![ChannelState::new(); 2];
        let mut out = vec![0; 64];
        assert!(decode_wav(&mut states, &[0, 0, 0, 0, 0, 0], &mut out).is_err());
    }

    #[test]
    fn verify_wav_output_limit() {
        let mut states = vec![ChannelState::new()];
        let mut out = vec![0; 4];
        assert!(decode_wav(&mut states, &[0, 0, 0, 0, 0x11, 0x11], &mut out).is_err());
    }

    #[test]
    fn verify_dk4_order() {
        // The high nibble is decoded first.
        let block = [100, 0, 1, 0, 0x19];
        let (out, _) = decode(decode_dk4, 1, &block);
        assert_eq!(out, [100, 103, 101]);
    }

    #[test]
    fn verify_iss_nibble_order() {
        let block = [100, 0, 1, 0, 0x19];
        let (mono, _) = decode(decode_iss, 1, &block);
        assert_eq!(mono, [97, 99]);

        let block = [100, 0, 1, 0, 100, 0, 1, 0, 0x19];
        let (stereo, _) = decode(decode_iss, 2, &block);
        assert_eq!(stereo, [103, 97]);
    }

    #[test]
    fn verify_ea_eacs_count() {
        let mut block = vec![4, 0, 0, 0];
        block.extend_from_slice(&[0; 4]);
        block.extend_from_slice(&[10, 0, 0, 0]);
        block.extend_from_slice(&[0x00; 3]);

        // 4 frames of mono need 2 bytes of the 3 available.
        let (out, _) = decode(decode_ea_eacs, 1, &block);
        assert_eq!(out.len(), 4);

        // 8 frames need 4 bytes.
        block[0] = 8;
        let mut states = vec![ChannelState::new()];
        let mut out = vec![0; 64];
        assert!(decode_ea_eacs(&mut states, &block, &mut out).is_err());
    }

    #[test]
    fn verify_4xm_planar() {
        let block = [0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x09];
        let (out, _) = decode(decode_4xm, 2, &block);

        // Left takes byte 0, right takes byte 1, each yielding two frames.
        assert_eq!(out, [1, -1, 1, -1]);
    }

    #[test]
    fn verify_4xm_short_data() {
        // A single data byte cannot be split between two channels.
        let block = [0, 0, 0, 0, 0, 0, 0, 0, 0x11];
        let mut states = vec![ChannelState::new(); 2];
        let mut out = vec![0; 64];

        let decoded = decode_4xm(&mut states, &block, &mut out).unwrap();
        assert_eq!(decoded.samples, 0);
        assert_eq!(decoded.consumed, block.len());
        assert_eq!(states[0].predictor, 0);
    }
}
