// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::{BufReader, ReadBytes};

use crate::common::{reserve, u16_to_i32};
use crate::decoder::DecodedBlock;
use crate::rule::{NibbleRule, Thp};
use crate::state::ChannelState;

/// The number of samples coded by one 8-byte THP frame.
const THP_FRAME_SAMPLES: usize = 14;

/// The size of one THP frame.
const THP_FRAME_LEN: usize = 8;

/// The number of coefficients each channel carries in the header.
const THP_NUM_COEFFS: usize = 16;

/// Decodes a Nintendo THP block.
///
/// The header holds the channel size, the number of samples per channel (big-endian), sixteen
/// predictor coefficients per channel and the two history samples of every channel. The channels
/// are then stored one after another in frames of 14 samples. Each frame opens with a byte that
/// selects a coefficient pair and a scale, followed by seven bytes of codes, high nibble first.
pub(crate) fn decode_thp(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    let _channel_size = stream.read_be_u32()?;
    let count = stream.read_be_u32()? as usize;
    let frames = count - count % THP_FRAME_SAMPLES;

    let mut coeffs = [[0i32; THP_NUM_COEFFS]; 2];

    for table in coeffs.iter_mut().take(channels) {
        for coeff in table.iter_mut() {
            *coeff = u16_to_i32!(stream.read_be_u16()?);
        }
    }

    for state in states.iter_mut() {
        state.sample1 = u16_to_i32!(stream.read_be_u16()?);
        state.sample2 = u16_to_i32!(stream.read_be_u16()?);
    }

    let header_len = 8 + (2 * THP_NUM_COEFFS + 4) * channels;
    let channel_len = frames / THP_FRAME_SAMPLES * THP_FRAME_LEN;

    if header_len + channels * channel_len > block.len() {
        return decode_error("adpcm: thp sample count exceeds block");
    }

    let out = reserve(out, channels * frames)?;

    let data = &block[header_len..];

    for (ch, (state, table)) in states.iter_mut().zip(&coeffs).enumerate() {
        let channel_data = &data[ch * channel_len..(ch + 1) * channel_len];
        let mut samples = out.iter_mut().skip(ch).step_by(channels);

        for frame in channel_data.chunks_exact(THP_FRAME_LEN) {
            let index = usize::from((frame[0] >> 4) & 0x07);
            let rule = Thp::new(frame[0]);

            state.coeff1 = table[2 * index];
            state.coeff2 = table[2 * index + 1];

            for &byte in &frame[1..] {
                for code in [byte >> 4, byte & 0x0f] {
                    if let Some(sample) = samples.next() {
                        *sample = rule.expand(state, code);
                    }
                }
            }
        }
    }

    Ok(DecodedBlock { samples: channels * frames, consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(count: u32, channels: usize, coeff1: i16, history: [i16; 2]) -> Vec<u8> {
        let mut block = vec![0, 0, 0, 0];
        block.extend_from_slice(&count.to_be_bytes());
        for _ in 0..channels {
            block.extend_from_slice(&coeff1.to_be_bytes());
            block.extend_from_slice(&[0; 2 * THP_NUM_COEFFS - 2]);
        }
        for _ in 0..channels {
            block.extend_from_slice(&history[0].to_be_bytes());
            block.extend_from_slice(&history[1].to_be_bytes());
        }
        block
    }

    #[test]
    fn verify_thp_stereo_header_len() {
        let block = header(0, 2, 0, [0, 0]);
        assert_eq!(block.len(), 80);

        let mut states = [ChannelState::new(); 2];
        let mut out = vec![];
        let decoded = decode_thp(&mut states, &block, &mut out).unwrap();
        assert_eq!(decoded.samples, 0);
    }

    #[test]
    fn verify_thp_mono_frame() {
        // A coefficient of 2048 repeats the previous sample, and scale 0 adds each code.
        let mut block = header(15, 1, 2048, [100, 0]);
        block.extend_from_slice(&[0x00, 0x1f, 0, 0, 0, 0, 0, 0]);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 14];
        let decoded = decode_thp(&mut states, &block, &mut out).unwrap();

        assert_eq!(decoded.samples, 14);
        assert_eq!(&out[..3], &[101, 100, 100]);
        assert_eq!(out[13], 100);
    }

    #[test]
    fn verify_thp_scale() {
        let mut block = header(14, 1, 0, [0, 0]);
        block.extend_from_slice(&[0x04, 0x10, 0, 0, 0, 0, 0, 0]);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 14];
        decode_thp(&mut states, &block, &mut out).unwrap();

        assert_eq!(out[0], 16);
    }

    #[test]
    fn verify_thp_count_exceeds_block() {
        let mut block = header(28, 1, 0, [0, 0]);
        block.extend_from_slice(&[0; 8]);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 28];
        assert!(decode_thp(&mut states, &block, &mut out).is_err());
    }
}
