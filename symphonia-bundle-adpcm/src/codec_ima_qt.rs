// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::{BufReader, ReadBytes};

use crate::common::{reserve, u16_to_i32, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{expand_byte_pairs, ImaQt, NibbleRule};
use crate::state::ChannelState;

/// The size in bytes of one QuickTime IMA channel chunk.
pub(crate) const QT_CHUNK_LEN: usize = 34;

/// The number of frames in one QuickTime IMA block.
pub(crate) const QT_FRAMES: usize = 64;

/// Applies a QuickTime IMA chunk header to `state`.
///
/// The header holds the top 9 bits of the predictor and a 7-bit step index. When the step index is
/// unchanged and the predictor only differs by its truncated bits, the exact predictor carried
/// over from the previous chunk is kept.
pub(crate) fn load_header(state: &mut ChannelState, header: u16) {
    let predictor = u16_to_i32!(header & 0xff80);
    let step_index = i32::from(header & 0x7f);

    if state.step_index != step_index || (predictor - state.predictor).abs() > 0x7f {
        state.predictor = predictor;
        state.load_step_index(step_index);
    }
}

/// Decodes one or more QuickTime IMA blocks. Each block consists of one 34-byte chunk per channel,
/// each chunk carrying 64 samples, low nibble first.
pub(crate) fn decode_qt(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let channels = states.len();
    let block_len = QT_CHUNK_LEN * channels;

    if block.len() < block_len {
        return decode_error("adpcm: ima qt block is truncated");
    }

    let n_blocks = block.len() / block_len;
    let out = reserve(out, n_blocks * QT_FRAMES * channels)?;

    let out_blocks = out.chunks_exact_mut(QT_FRAMES * channels);

    for (qt_block, out) in block.chunks_exact(block_len).zip(out_blocks) {
        for (ch, (chunk, state)) in
            qt_block.chunks_exact(QT_CHUNK_LEN).zip(states.iter_mut()).enumerate()
        {
            let mut stream = BufReader::new(chunk);
            load_header(state, stream.read_be_u16()?);

            for (i, &byte) in chunk[2..].iter().enumerate() {
                out[2 * i * channels + ch] = ImaQt.expand(state, Nibble::Lower.get_nibble(byte));
                out[(2 * i + 1) * channels + ch] =
                    ImaQt.expand(state, Nibble::Upper.get_nibble(byte));
            }
        }
    }

    Ok(DecodedBlock { samples: n_blocks * QT_FRAMES * channels, consumed: n_blocks * block_len })
}

/// Decodes a Loki SDL MJPEG block. Each channel has a big-endian predictor and a step index,
/// followed by data using the QuickTime rule. The high nibble of each byte belongs to the first
/// channel, the low nibble to the last.
pub(crate) fn decode_smjpeg(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let mut stream = BufReader::new(block);

    for state in states.iter_mut() {
        state.predictor = i32::from(stream.read_be_i16()?);
        state.load_step_index(i32::from(stream.read_u8()?));
        stream.ignore_bytes(1)?;
    }

    let data = &block[4 * states.len()..];
    let out = reserve(out, 2 * data.len())?;

    expand_byte_pairs(&ImaQt, data, Nibble::Upper, states, out);

    Ok(DecodedBlock { samples: 2 * data.len(), consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_header_continuity() {
        let mut state = ChannelState { predictor: 1000, step_index: 10, ..Default::default() };

        // 1000 truncates to 896 with the same step index. The exact predictor is kept.
        load_header(&mut state, 896 | 10);
        assert_eq!(state.predictor, 1000);

        // A different step index reloads both fields.
        load_header(&mut state, 896 | 11);
        assert_eq!(state.predictor, 896);
        assert_eq!(state.step_index, 11);

        // Negative predictors are sign extended.
        load_header(&mut state, 0xff80 | 11);
        assert_eq!(state.predictor, -128);
    }

    #[test]
    fn verify_qt_stereo_layout() {
        let mut block = vec![0u8; 2 * QT_CHUNK_LEN];
        // Left chunk: predictor 0, step 0, all codes +1.
        block[2..QT_CHUNK_LEN].fill(0x11);
        // Right chunk: predictor 0, step 0, all codes -1.
        block[QT_CHUNK_LEN + 2..].fill(0x99);

        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 128];
        let decoded = decode_qt(&mut states, &block, &mut out).unwrap();

        assert_eq!(decoded.samples, 128);
        assert_eq!(decoded.consumed, 68);
        assert!(out.chunks_exact(2).all(|frame| frame[0] > 0 && frame[1] < 0));
        assert_eq!(out[0], 1);
        assert_eq!(out[1], -1);
    }

    #[test]
    fn verify_qt_truncated() {
        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 128];
        assert!(decode_qt(&mut states, &[0; 40], &mut out).is_err());
    }

    #[test]
    fn verify_smjpeg() {
        // Predictor 0x0100, step 0, then codes 0x1 (high) and 0x9 (low).
        let block = [0x01, 0x00, 0x00, 0x00, 0x19];
        let mut states = [ChannelState::new()];
        let mut out = vec![0; 2];
        decode_smjpeg(&mut states, &block, &mut out).unwrap();

        // Step 7: diff = (7 >> 3) + (7 >> 2) = 1.
        assert_eq!(out, [257, 256]);
    }

    #[test]
    fn verify_smjpeg_stereo() {
        // Left predictor 0x0100, right predictor 0x0200, then codes 0x1 (high) and 0x9 (low).
        let block = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x19];
        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 2];
        let decoded = decode_smjpeg(&mut states, &block, &mut out).unwrap();

        assert_eq!(decoded.samples, 2);
        assert_eq!(out, [257, 511]);
        assert_eq!(states[0].predictor, 257);
        assert_eq!(states[1].predictor, 511);

        // Both headers are required.
        let mut out = vec![0; 8];
        assert!(decode_smjpeg(&mut states, &block[..6], &mut out).is_err());
    }
}
