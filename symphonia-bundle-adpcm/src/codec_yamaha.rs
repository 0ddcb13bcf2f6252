// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::Result;

use crate::common::{reserve, Nibble};
use crate::decoder::DecodedBlock;
use crate::rule::{expand_byte_pairs, Yamaha};
use crate::state::ChannelState;

/// Decodes a Yamaha block. Yamaha blocks carry no header and store the low nibble first.
pub(crate) fn decode_yamaha(
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    let out = reserve(out, 2 * block.len())?;

    expand_byte_pairs(&Yamaha, block, Nibble::Lower, states, out);

    Ok(DecodedBlock { samples: 2 * block.len(), consumed: block.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_yamaha_stereo() {
        let mut states = [ChannelState::new(); 2];
        let mut out = vec![0; 2];

        // Low nibble 0x1 is left, high nibble 0x9 is right.
        decode_yamaha(&mut states, &[0x91], &mut out).unwrap();
        assert_eq!(out, [3 * 127 / 8, -3 * 127 / 8]);
        assert_eq!(states[0].step, 127);
    }
}
