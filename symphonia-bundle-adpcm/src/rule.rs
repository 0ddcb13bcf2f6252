// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-sample update rules of the ADPCM predictor families.
//!
//! Every rule is a pure transition `(state, code) -> (sample, state')`. Decoders drive them across
//! a block, and the trellis encoder uses them as the transition function of its search.

use symphonia_core::util::clamp::clamp_i16;

use crate::common::{sign_extend, Nibble};
use crate::state::ChannelState;
use crate::tables::*;

/// Lower bound of the Sound Blaster Pro predictor.
pub const SBPRO_PREDICTOR_MIN: i32 = -16384;
/// Upper bound of the Sound Blaster Pro predictor.
pub const SBPRO_PREDICTOR_MAX: i32 = 16256;

/// A `NibbleRule` reconstructs one sample from one code.
pub trait NibbleRule {
    /// Expands `code`, updates `state`, and returns the reconstructed sample.
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16;
}

/// A `TrellisRule` is a `NibbleRule` that can also pick codes for a target sample.
pub trait TrellisRule: NibbleRule {
    /// The code the rule's direct, non-searching, quantizer picks for `sample`.
    fn quantize(&self, state: &ChannelState, sample: i16) -> u8;

    /// A narrow window of codes around the direct choice for `sample`. A `range` of 0 yields the
    /// closest code or two, a `range` of 1 widens the window by one step on either side.
    fn candidates(&self, state: &ChannelState, sample: i16, range: i32) -> Candidates;
}

/// A short list of candidate codes.
#[derive(Copy, Clone, Debug, Default)]
pub struct Candidates {
    codes: [u8; 4],
    len: usize,
}

impl Candidates {
    fn push(&mut self, code: u8) {
        self.codes[self.len] = code;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.codes[..self.len]
    }
}

/// Candidates for sign-magnitude codes with `max` as the largest magnitude. Both signs of zero are
/// offered when the window touches zero.
fn sign_magnitude_candidates(div: i32, range: i32, max: i32) -> Candidates {
    let mut nmin = (div - range).clamp(-max, max - 1);
    let mut nmax = (div + range).clamp(-(max - 1), max);

    // Distinguish -0 from +0.
    if nmin <= 0 {
        nmin -= 1;
    }
    if nmax < 0 {
        nmax -= 1;
    }

    let mut candidates = Candidates::default();
    for nidx in nmin..=nmax {
        candidates.push(if nidx < 0 { (max - nidx) as u8 } else { nidx as u8 });
    }
    candidates
}

#[inline(always)]
fn ima_step(step_index: i32) -> i32 {
    IMA_STEP_TABLE[step_index.clamp(0, IMA_MAX_STEP_INDEX) as usize]
}

#[inline(always)]
fn ima_next_step_index(step_index: i32, adjust: i32) -> i32 {
    (step_index.clamp(0, IMA_MAX_STEP_INDEX) + adjust).clamp(0, IMA_MAX_STEP_INDEX)
}

#[inline(always)]
fn apply_sign(predictor: i32, diff: i32, negative: bool) -> i32 {
    if negative {
        predictor - diff
    }
    else {
        predictor + diff
    }
}

/// Expands every byte of `data` into two codes, the `first` half of the byte first. The first code
/// belongs to the first channel and the second code to the last channel, therefore a single
/// channel receives both.
pub(crate) fn expand_byte_pairs<R: NibbleRule>(
    rule: &R,
    data: &[u8],
    first: Nibble,
    states: &mut [ChannelState],
    out: &mut [i16],
) {
    let last = states.len() - 1;
    let second = first.other();

    for (&byte, pair) in data.iter().zip(out.chunks_exact_mut(2)) {
        pair[0] = rule.expand(&mut states[0], first.get_nibble(byte));
        pair[1] = rule.expand(&mut states[last], second.get_nibble(byte));
    }
}

/// The general IMA rule. `diff = ((2 * magnitude + 1) * step) >> shift`.
///
/// A shift of 3 is used by most dialects, 4 by 4X Movie, and 6 by EA SEAD.
#[derive(Copy, Clone, Debug)]
pub struct Ima {
    shift: u32,
}

impl Ima {
    pub const fn new(shift: u32) -> Self {
        Ima { shift }
    }
}

impl NibbleRule for Ima {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let code = code & 0x0f;
        let step = ima_step(state.step_index);
        let delta = i32::from(code & 0x07);
        let diff = ((2 * delta + 1) * step) >> self.shift;
        let predictor = apply_sign(state.predictor, diff, code & 0x08 != 0);
        state.predictor = i32::from(clamp_i16(predictor));
        state.step_index = ima_next_step_index(state.step_index, IMA_INDEX_TABLE[code as usize]);
        state.predictor as i16
    }
}

impl TrellisRule for Ima {
    fn quantize(&self, state: &ChannelState, sample: i16) -> u8 {
        let delta = i32::from(sample) - state.predictor;
        let step = ima_step(state.step_index);
        let magnitude = ((delta.abs() << (self.shift - 1)) / step).min(7) as u8;
        if delta < 0 {
            magnitude | 0x08
        }
        else {
            magnitude
        }
    }

    fn candidates(&self, state: &ChannelState, sample: i16, range: i32) -> Candidates {
        let step = ima_step(state.step_index);
        let div = ((i32::from(sample) - state.predictor) << (self.shift - 1)) / step;
        sign_magnitude_candidates(div, range, 7)
    }
}

/// The QuickTime IMA rule, which builds the difference from shifted steps rather than a product.
#[derive(Copy, Clone, Debug, Default)]
pub struct ImaQt;

impl NibbleRule for ImaQt {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let code = code & 0x0f;
        let step = ima_step(state.step_index);

        let mut diff = step >> 3;
        if code & 4 != 0 {
            diff += step;
        }
        if code & 2 != 0 {
            diff += step >> 1;
        }
        if code & 1 != 0 {
            diff += step >> 2;
        }

        let predictor = apply_sign(state.predictor, diff, code & 0x08 != 0);
        state.predictor = i32::from(clamp_i16(predictor));
        state.step_index = ima_next_step_index(state.step_index, IMA_INDEX_TABLE[code as usize]);
        state.predictor as i16
    }
}

impl TrellisRule for ImaQt {
    fn quantize(&self, state: &ChannelState, sample: i16) -> u8 {
        Swf::new(4).quantize(state, sample)
    }

    fn candidates(&self, state: &ChannelState, sample: i16, range: i32) -> Candidates {
        let step = ima_step(state.step_index);
        let div = (i32::from(sample) - state.predictor) * 4 / step;
        sign_magnitude_candidates(div, range, 7)
    }
}

/// The Shockwave Flash rule for 2 to 5-bit codes. With 4-bit codes it is identical to `ImaQt`.
#[derive(Copy, Clone, Debug)]
pub struct Swf {
    bits: u32,
}

impl Swf {
    pub const fn new(bits: u32) -> Self {
        Swf { bits }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    #[inline(always)]
    fn sign_mask(&self) -> u8 {
        1 << (self.bits - 1)
    }
}

impl NibbleRule for Swf {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let sign_mask = self.sign_mask();
        let mut step = ima_step(state.step_index);
        let mut k = 1 << (self.bits - 2);
        let mut diff = 0;

        while k != 0 {
            if code & k != 0 {
                diff += step;
            }
            step >>= 1;
            k >>= 1;
        }
        diff += step;

        let predictor = apply_sign(state.predictor, diff, code & sign_mask != 0);
        state.predictor = i32::from(clamp_i16(predictor));

        let table = SWF_INDEX_TABLES[(self.bits - 2) as usize];
        state.step_index =
            ima_next_step_index(state.step_index, table[usize::from(code & (sign_mask - 1))]);
        state.predictor as i16
    }
}

impl TrellisRule for Swf {
    fn quantize(&self, state: &ChannelState, sample: i16) -> u8 {
        let mut delta = i32::from(sample) - state.predictor;
        let mut code = if delta < 0 { self.sign_mask() } else { 0 };
        delta = delta.abs();

        let mut step = ima_step(state.step_index);
        let mut k = 1 << (self.bits - 2);

        while k != 0 {
            if delta >= step {
                code |= k;
                delta -= step;
            }
            step >>= 1;
            k >>= 1;
        }
        code
    }

    fn candidates(&self, state: &ChannelState, sample: i16, range: i32) -> Candidates {
        let step = ima_step(state.step_index);
        let div = ((i32::from(sample) - state.predictor) << (self.bits - 2)) / step;
        sign_magnitude_candidates(div, range, i32::from(self.sign_mask()) - 1)
    }
}

/// Interprets a 4-bit code as a two's complement number.
pub fn signed_nibble(nibble: u8) -> i8 {
    if (nibble & 0x08) != 0 {
        (nibble & 0x0f) as i8 - 0x10
    }
    else {
        (nibble & 0x0f) as i8
    }
}

/// The Microsoft linear-predictor rule.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ms;

impl Ms {
    #[inline(always)]
    fn predict(state: &ChannelState) -> i32 {
        state
            .sample1
            .wrapping_mul(state.coeff1)
            .wrapping_add(state.sample2.wrapping_mul(state.coeff2))
            / 256
    }
}

impl NibbleRule for Ms {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let code = code & 0x0f;
        let predictor = Ms::predict(state) + i32::from(signed_nibble(code)) * state.idelta;
        state.sample2 = state.sample1;
        state.sample1 = i32::from(clamp_i16(predictor));
        state.idelta = ((MS_ADAPTATION_TABLE[code as usize] * state.idelta) >> 8)
            .clamp(MS_DELTA_MIN, i32::MAX / 768);
        state.sample1 as i16
    }
}

impl TrellisRule for Ms {
    fn quantize(&self, state: &ChannelState, sample: i16) -> u8 {
        let idelta = state.idelta.max(MS_DELTA_MIN);
        let diff = i32::from(sample) - Ms::predict(state);
        let bias = if diff >= 0 { idelta / 2 } else { -idelta / 2 };
        (((diff + bias) / idelta).clamp(-8, 7) & 0x0f) as u8
    }

    fn candidates(&self, state: &ChannelState, sample: i16, range: i32) -> Candidates {
        let idelta = state.idelta.max(MS_DELTA_MIN);
        let div = (i32::from(sample) - Ms::predict(state)) / idelta;
        let nmin = (div - range).clamp(-8, 6);
        let nmax = (div + range).clamp(-7, 7);

        let mut candidates = Candidates::default();
        for nidx in nmin..=nmax {
            candidates.push((nidx & 0x0f) as u8);
        }
        candidates
    }
}

/// The Creative Technology rule. The predictor decays by 254/256 every sample.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ct;

impl NibbleRule for Ct {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let code = code & 0x0f;
        let delta = code & 0x07;
        let diff = ((2 * i32::from(delta) + 1) * state.step) >> 3;
        let predictor = apply_sign((state.predictor * 254) >> 8, diff, code & 0x08 != 0);
        state.predictor = i32::from(clamp_i16(predictor));
        state.step = ((CT_ADAPTATION_TABLE[delta as usize] * state.step) >> 8).clamp(511, 32767);
        state.predictor as i16
    }
}

/// The Sound Blaster Pro rule for `size`-bit codes. The predictor is confined to
/// `[SBPRO_PREDICTOR_MIN, SBPRO_PREDICTOR_MAX]`.
#[derive(Copy, Clone, Debug)]
pub struct SbPro {
    size: u32,
    shift: u32,
}

impl SbPro {
    pub const fn new(size: u32, shift: u32) -> Self {
        SbPro { size, shift }
    }
}

impl NibbleRule for SbPro {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let sign = code & (1 << (self.size - 1));
        let delta = i32::from(code & ((1 << (self.size - 1)) - 1));
        let step = state.step.clamp(0, 3);
        let diff = delta << (7 + step as u32 + self.shift);

        state.predictor = apply_sign(state.predictor, diff, sign != 0)
            .clamp(SBPRO_PREDICTOR_MIN, SBPRO_PREDICTOR_MAX);

        state.step = if delta >= (2 * self.size as i32 - 3) && step < 3 {
            step + 1
        }
        else if delta == 0 && step > 0 {
            step - 1
        }
        else {
            step
        };

        state.predictor as i16
    }
}

/// The Yamaha rule. A zero step marks a channel that has not decoded anything yet.
#[derive(Copy, Clone, Debug, Default)]
pub struct Yamaha;

impl Yamaha {
    /// The predictor and step in effect for the next code.
    #[inline(always)]
    fn effective(state: &ChannelState) -> (i32, i32) {
        if state.step == 0 {
            (0, 127)
        }
        else {
            (state.predictor, state.step)
        }
    }
}

impl NibbleRule for Yamaha {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let code = usize::from(code & 0x0f);
        let (predictor, step) = Yamaha::effective(state);
        state.predictor = i32::from(clamp_i16(predictor + step * YAMAHA_DIFF_LOOKUP[code] / 8));
        state.step = ((step * YAMAHA_INDEX_SCALE[code]) >> 8).clamp(127, 24567);
        state.predictor as i16
    }
}

impl TrellisRule for Yamaha {
    fn quantize(&self, state: &ChannelState, sample: i16) -> u8 {
        let (predictor, step) = Yamaha::effective(state);
        let delta = i32::from(sample) - predictor;
        let magnitude = (delta.abs() * 4 / step).min(7) as u8;
        if delta < 0 {
            magnitude | 0x08
        }
        else {
            magnitude
        }
    }

    fn candidates(&self, state: &ChannelState, sample: i16, range: i32) -> Candidates {
        let (predictor, step) = Yamaha::effective(state);
        let div = (i32::from(sample) - predictor) * 4 / step;
        sign_magnitude_candidates(div, range, 7)
    }
}

/// The Electronic Arts linear-predictor rule. The coefficients are taken from the state and the
/// shift is fixed for the duration of a sub-block.
#[derive(Copy, Clone, Debug)]
pub struct Ea {
    shift: u32,
    round: i32,
}

impl Ea {
    /// Instantiate the rule from a 4-bit shift field. `round` is added before the final shift.
    pub fn new(shift: u8, round: i32) -> Self {
        Ea { shift: u32::from(shift & 0x0f) + 8, round }
    }
}

impl NibbleRule for Ea {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let level = ((u32::from(code & 0x0f) << 28) as i32) >> self.shift;
        let sample =
            (level + state.sample1 * state.coeff1 + state.sample2 * state.coeff2 + self.round) >> 8;
        state.sample2 = state.sample1;
        state.sample1 = i32::from(clamp_i16(sample));
        state.sample1 as i16
    }
}

/// The CD-ROM XA rule. The filter coefficients are taken from the state.
#[derive(Copy, Clone, Debug)]
pub struct Xa {
    shift: u32,
}

impl Xa {
    pub const fn new(shift: u32) -> Self {
        Xa { shift }
    }
}

impl NibbleRule for Xa {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let level = sign_extend(u32::from(code & 0x0f), 4) << self.shift;
        let sample =
            level + ((state.sample1 * state.coeff1 + state.sample2 * state.coeff2 + 32) >> 6);
        state.sample2 = state.sample1;
        state.sample1 = i32::from(clamp_i16(sample));
        state.sample1 as i16
    }
}

/// The Nintendo THP rule. The coefficients are taken from the state.
#[derive(Copy, Clone, Debug)]
pub struct Thp {
    exp: u32,
}

impl Thp {
    /// Instantiate the rule from a 4-bit scale field.
    pub fn new(scale: u8) -> Self {
        Thp { exp: 28 - u32::from(scale & 0x0f) }
    }
}

impl NibbleRule for Thp {
    #[inline]
    fn expand(&self, state: &mut ChannelState, code: u8) -> i16 {
        let level = ((u32::from(code & 0x0f) << 28) as i32) >> self.exp;
        let prediction = (i64::from(state.sample1) * i64::from(state.coeff1)
            + i64::from(state.sample2) * i64::from(state.coeff2))
            >> 11;
        let sample = prediction as i32 + level;
        state.sample2 = state.sample1;
        state.sample1 = i32::from(clamp_i16(sample));
        state.sample1 as i16
    }
}
