// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::warn;

use crate::dialect::Dialect;
use crate::tables::IMA_MAX_STEP_INDEX;

/// `ChannelState` is the adaptive predictor state of a single audio channel.
///
/// One instance exists per channel and lives for the duration of a stream. Block framers reload
/// some or all of it from every block header, while headerless dialects carry it silently from
/// one block to the next. In the latter case, the state must be persisted by the caller between
/// blocks.
///
/// Not every dialect uses every field:
///
/// * `predictor`, `step_index` are used by the IMA family and SWF.
/// * `predictor`, `step` are used by Creative Technology, Sound Blaster Pro, and Yamaha.
/// * `sample1`, `sample2`, `coeff1`, `coeff2`, `idelta` are used by Microsoft ADPCM.
/// * `sample1`, `sample2`, `coeff1`, `coeff2` are used by the Electronic Arts, XA, and THP
///   linear predictors.
/// * `prev_sample` holds the second history sample of the EA R2/R3 dialects between blocks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelState {
    /// The last reconstructed sample of the exponential predictors.
    pub predictor: i32,
    /// Index into the IMA step table, always within `[0, 88]` after an update.
    pub step_index: i32,
    /// Explicit multiplicative step of the Creative, Sound Blaster Pro, and Yamaha dialects.
    pub step: i32,
    /// The sample preceding `predictor`.
    pub prev_sample: i32,
    /// The last reconstructed sample of the linear predictors.
    pub sample1: i32,
    /// The sample preceding `sample1`.
    pub sample2: i32,
    /// Weight of `sample1`.
    pub coeff1: i32,
    /// Weight of `sample2`.
    pub coeff2: i32,
    /// Adaptive residual scale of the Microsoft predictor.
    pub idelta: i32,
}

impl ChannelState {
    /// Instantiate a zeroed `ChannelState`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Instantiate the state a freshly opened stream of `dialect` starts with.
    pub fn for_dialect(dialect: Dialect) -> Self {
        let mut state = ChannelState::new();

        if dialect == Dialect::Ct {
            state.step = 511;
        }

        state
    }

    /// Loads a step index read from a stream. Out-of-range values are clamped, and reported, but
    /// are not an error.
    pub(crate) fn load_step_index(&mut self, step_index: i32) {
        if step_index < 0 || step_index > IMA_MAX_STEP_INDEX {
            warn!("adpcm: step index {} out of range, clamping", step_index);
        }
        self.step_index = step_index.clamp(0, IMA_MAX_STEP_INDEX);
    }

    /// Loads an initial predictor read from a stream as a wider integer.
    pub(crate) fn load_predictor(&mut self, predictor: i32) {
        if predictor < i32::from(i16::MIN) || predictor > i32::from(i16::MAX) {
            warn!("adpcm: predictor {} out of range, clamping", predictor);
        }
        self.predictor = predictor.clamp(i32::from(i16::MIN), i32::from(i16::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::ChannelState;
    use crate::dialect::Dialect;

    #[test]
    fn verify_load_step_index_clamps() {
        let mut state = ChannelState::new();

        state.load_step_index(120);
        assert_eq!(state.step_index, 88);

        state.load_step_index(-3);
        assert_eq!(state.step_index, 0);

        state.load_step_index(42);
        assert_eq!(state.step_index, 42);
    }

    #[test]
    fn verify_creative_initial_step() {
        assert_eq!(ChannelState::for_dialect(Dialect::Ct).step, 511);
        assert_eq!(ChannelState::for_dialect(Dialect::Yamaha), ChannelState::new());
    }
}
