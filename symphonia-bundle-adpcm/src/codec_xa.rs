// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{info, warn};

use symphonia_core::errors::Result;

use crate::common::{reserve, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{NibbleRule, Xa};
use crate::state::ChannelState;
use crate::tables::XA_FILTERS;

/// The size of a CD-ROM XA sound group.
const XA_GROUP_LEN: usize = 128;

/// The number of samples in one sound group, regardless of the channel count.
const XA_GROUP_SAMPLES: usize = 224;

/// Instantiates the rule and loads the filter selected by a sound unit parameter byte.
fn load_sound_unit(state: &mut ChannelState, param: u8) -> Xa {
    let mut shift = 12 - i32::from(param & 0x0f);
    if shift < 0 {
        warn!("adpcm: unknown xa shift {}", shift);
        shift = 0;
    }

    let mut filter = usize::from(param >> 4);
    if filter >= XA_FILTERS.len() {
        warn!("adpcm: unknown xa filter {}", filter);
        filter = 0;
    }

    [state.coeff1, state.coeff2] = XA_FILTERS[filter];

    Xa::new(shift as u32)
}

/// Decodes the 28 samples of one sound unit from the `nibble` half of every fourth data byte.
fn decode_sound_unit(
    state: &mut ChannelState,
    param: u8,
    data: &[u8],
    nibble: Nibble,
    mut put: impl FnMut(usize, i16),
) {
    let rule = load_sound_unit(state, param);

    for (j, &byte) in data.iter().step_by(4).take(28).enumerate() {
        put(j, rule.expand(state, nibble.get_nibble(byte)));
    }
}

/// Decodes a block of CD-ROM XA sound groups.
///
/// Each 128-byte sound group holds sound unit parameters at bytes 4 to 11 and interleaved sample
/// data from byte 16. Four pairs of sound units are coded per group. In stereo, the low nibble of
/// a pair is the left channel and the high nibble the right. In mono, both are consecutive runs of
/// 28 samples. Trailing bytes that do not form a whole group are padding.
pub(crate) fn decode_xa(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let n_groups = block.len() / XA_GROUP_LEN;

    if block.len() % XA_GROUP_LEN != 0 {
        info!("adpcm: ignoring {} bytes of xa padding", block.len() % XA_GROUP_LEN);
    }

    let out = reserve(out, n_groups * XA_GROUP_SAMPLES)?;

    for (group, out) in
        block.chunks_exact(XA_GROUP_LEN).zip(out.chunks_exact_mut(XA_GROUP_SAMPLES))
    {
        for i in 0..4 {
            let data = &group[16 + i..];
            let (lo_param, hi_param) = (group[4 + 2 * i], group[5 + 2 * i]);

            if let [left, right] = &mut *states {
                let base = 28 * i;
                decode_sound_unit(left, lo_param, data, Nibble::Lower, |j, s| {
                    out[2 * (base + j)] = s
                });
                decode_sound_unit(right, hi_param, data, Nibble::Upper, |j, s| {
                    out[2 * (base + j) + 1] = s
                });
            }
            else {
                let base = 56 * i;
                let state = &mut states[0];
                decode_sound_unit(state, lo_param, data, Nibble::Lower, |j, s| out[base + j] = s);
                decode_sound_unit(state, hi_param, data, Nibble::Upper, |j, s| {
                    out[base + 28 + j] = s
                });
            }
        }
    }

    Ok(DecodedBlock { samples: n_groups * XA_GROUP_SAMPLES, consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(params: [u8; 8], data: u8) -> Vec<u8> {
        let mut group = vec![0u8; XA_GROUP_LEN];
        group[4..12].copy_from_slice(&params);
        group[16..].fill(data);
        group
    }

    #[test]
    fn verify_xa_stereo_nibbles() {
        // Filter 0, shift 12 - 12 = 0 everywhere; left codes 1, right codes -1.
        let block = group([0x0c; 8], 0xf1);

        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; XA_GROUP_SAMPLES];
        let decoded = decode_xa(&mut states, &block, &mut out).unwrap();

        assert_eq!(decoded.samples, XA_GROUP_SAMPLES);
        assert!(out.chunks_exact(2).all(|frame| frame == [1, -1]));
    }

    #[test]
    fn verify_xa_mono_layout() {
        // Filter 1 integrates: s = code + (60 * s1 + 32) >> 6.
        let block = group([0x1c; 8], 0x01);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; XA_GROUP_SAMPLES];
        decode_xa(&mut states, &block, &mut out).unwrap();

        // The low nibble run rises to 9, then the high nibble run decays to 8.
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert_eq!(out[27], 9);
        assert!(out[28..56].iter().all(|&s| s == 8));
        assert_eq!(states[0].sample1, i32::from(out[223]));
    }

    #[test]
    fn verify_xa_unknown_filter() {
        // Filter 7 is replaced by filter 0.
        let block = group([0x7c; 8], 0x11);

        let mut states = [ChannelState { sample1: 1000, ..Default::default() }];
        let mut out = vec![0; XA_GROUP_SAMPLES];
        decode_xa(&mut states, &block, &mut out).unwrap();

        assert!(out.iter().all(|&s| s == 1));
    }

    #[test]
    fn verify_xa_padding() {
        let mut block = group([0x0c; 8], 0x00);
        block.extend_from_slice(&[0; 20]);

        let mut states = [ChannelState::new()];
        let mut out = vec![0; 2 * XA_GROUP_SAMPLES];
        let decoded = decode_xa(&mut states, &block, &mut out).unwrap();
        assert_eq!(decoded.samples, XA_GROUP_SAMPLES);
    }
}
