// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::warn;

use symphonia_core::errors::Result;
use symphonia_core::io::{BufReader, ReadBytes};

use crate::common::{reserve, u16_to_i32, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{expand_byte_pairs, Ms};
use crate::state::ChannelState;
use crate::tables::{MS_ADAPT_COEFFS1, MS_ADAPT_COEFFS2};

/// The number of coefficient pairs in the standard Microsoft ADPCM table.
pub(crate) const MS_NUM_COEFFS: usize = MS_ADAPT_COEFFS1.len();

/// `MsCoefficients` is a custom set of predictor coefficient pairs carried in the extra data of a
/// Microsoft ADPCM stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsCoefficients {
    coeffs1: Vec<i32>,
    coeffs2: Vec<i32>,
}

impl Default for MsCoefficients {
    fn default() -> Self {
        MsCoefficients {
            coeffs1: Vec::from(MS_ADAPT_COEFFS1),
            coeffs2: Vec::from(MS_ADAPT_COEFFS2),
        }
    }
}

impl MsCoefficients {
    /// Reads the coefficients from the `ADPCMWAVEFORMAT` extension of a `WAVEFORMATEX`: the
    /// number of samples per block, the number of coefficient pairs, and then the pairs.
    pub fn from_extra_data(extra_data: &[u8]) -> Result<Self> {
        let mut reader = BufReader::new(extra_data);

        let _frames_per_block = reader.read_u16()?;
        let num_coeffs = usize::from(reader.read_u16()?);

        if num_coeffs == 0 {
            warn!("adpcm: no coefficients in extra data, using the standard set");
            return Ok(Default::default());
        }

        let mut coeffs = MsCoefficients {
            coeffs1: Vec::with_capacity(num_coeffs),
            coeffs2: Vec::with_capacity(num_coeffs),
        };

        for _ in 0..num_coeffs {
            coeffs.coeffs1.push(u16_to_i32!(reader.read_u16()?));
            coeffs.coeffs2.push(u16_to_i32!(reader.read_u16()?));
        }

        Ok(coeffs)
    }

    /// The number of coefficient pairs.
    pub fn len(&self) -> usize {
        self.coeffs1.len()
    }

    /// Returns `true` if there are no coefficient pairs.
    pub fn is_empty(&self) -> bool {
        self.coeffs1.is_empty()
    }

    fn pair(&self, index: usize) -> (i32, i32) {
        (self.coeffs1[index], self.coeffs2[index])
    }
}

/// Selects the coefficient pair for a block predictor index. Out-of-range indices are clamped.
fn select_coeffs(custom: Option<&MsCoefficients>, block_predictor: usize) -> (i32, i32) {
    let len = custom.map_or(MS_NUM_COEFFS, |coeffs| coeffs.len());

    let index = if block_predictor >= len {
        warn!("adpcm: block predictor {} exceeds range, clamping", block_predictor);
        len - 1
    }
    else {
        block_predictor
    };

    match custom {
        Some(coeffs) => coeffs.pair(index),
        None => (MS_ADAPT_COEFFS1[index], MS_ADAPT_COEFFS2[index]),
    }
}

/// Decodes a Microsoft ADPCM block.
///
/// The header is grouped by field: every channel's block predictor index, then every channel's
/// initial delta, then the two seed samples. The seeds are output oldest first, followed by the
/// data, high nibble first.
pub(crate) fn decode_ms(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
    custom: Option<&MsCoefficients>,
) -> Result<DecodedBlock> {
    let channels = states.len();
    let mut stream = BufReader::new(block);

    for state in states.iter_mut() {
        let block_predictor = usize::from(stream.read_u8()?);
        (state.coeff1, state.coeff2) = select_coeffs(custom, block_predictor);
    }

    for state in states.iter_mut() {
        state.idelta = u16_to_i32!(stream.read_u16()?);
    }

    for state in states.iter_mut() {
        state.sample1 = u16_to_i32!(stream.read_u16()?);
    }

    for state in states.iter_mut() {
        state.sample2 = u16_to_i32!(stream.read_u16()?);
    }

    let data = &block[7 * channels..];
    let samples = 2 * channels + 2 * data.len();
    let out = reserve(out, samples)?;

    for (ch, state) in states.iter().enumerate() {
        out[ch] = state.sample2 as i16;
        out[channels + ch] = state.sample1 as i16;
    }

    expand_byte_pairs(&Ms, data, Nibble::Upper, states, &mut out[2 * channels..]);

    Ok(DecodedBlock { samples, consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_ms_reference_vector() {
        // Block predictor 0, delta 16, sample1 100, sample2 50, then nibbles 0x2 and 0x1.
        let block = [0, 16, 0, 100, 0, 50, 0, 0x21];

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 4];
        let decoded = decode_ms(&mut states, &block, &mut out, None).unwrap();

        assert_eq!(decoded.samples, 4);
        assert_eq!(out, [50, 100, 132, 148]);
        assert_eq!(states[0].sample1, 148);
        assert_eq!(states[0].sample2, 132);
        assert_eq!(states[0].idelta, 16);
    }

    #[test]
    fn verify_ms_stereo_header() {
        let block = [
            0, 1, // block predictors
            16, 0, 32, 0, // deltas
            10, 0, 20, 0, // sample1
            5, 0, 6, 0, // sample2
            0x00,
        ];

        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 6];
        decode_ms(&mut states, &block, &mut out, None).unwrap();

        assert_eq!(&out[..4], &[5, 6, 10, 20]);
        // Predictor 1 doubles sample1 and subtracts sample2.
        assert_eq!(out[5], ((20 * 512 - 6 * 256) / 256) as i16);
        assert_eq!((states[1].coeff1, states[1].coeff2), (512, -256));
    }

    #[test]
    fn verify_ms_predictor_clamp() {
        let block = [9, 16, 0, 0, 0, 0, 0];

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 2];
        decode_ms(&mut states, &block, &mut out, None).unwrap();

        assert_eq!((states[0].coeff1, states[0].coeff2), (392, -232));
    }

    #[test]
    fn verify_ms_extra_data() {
        let mut extra_data = vec![0xf4, 0x07, 2, 0];
        extra_data.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]);
        extra_data.extend_from_slice(&[0x00, 0x02, 0x00, 0xff]);

        let coeffs = MsCoefficients::from_extra_data(&extra_data).unwrap();
        assert_eq!(coeffs.len(), 2);
        assert_eq!(coeffs.pair(1), (512, -256));

        // Truncated pairs are an error.
        assert!(MsCoefficients::from_extra_data(&extra_data[..10]).is_err());
    }
}
