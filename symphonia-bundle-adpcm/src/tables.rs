// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lookup tables parameterizing the ADPCM predictors.

/// The largest valid index into `IMA_STEP_TABLE`.
pub(crate) const IMA_MAX_STEP_INDEX: i32 = 88;

#[rustfmt::skip]
pub(crate) const IMA_INDEX_TABLE: [i32; 16] = [
    -1, -1, -1, -1, 2, 4, 6, 8,
    -1, -1, -1, -1, 2, 4, 6, 8,
];

#[rustfmt::skip]
pub(crate) const IMA_STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17,
    19, 21, 23, 25, 28, 31, 34, 37, 41, 45,
    50, 55, 60, 66, 73, 80, 88, 97, 107, 118,
    130, 143, 157, 173, 190, 209, 230, 253, 279, 307,
    337, 371, 408, 449, 494, 544, 598, 658, 724, 796,
    876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358,
    5894, 6484, 7132, 7845, 8630, 9493, 10442, 11487, 12635, 13899,
    15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

#[rustfmt::skip]
pub(crate) const MS_ADAPTATION_TABLE: [i32; 16] = [
    230, 230, 230, 230, 307, 409, 512, 614,
    768, 614, 512, 409, 307, 230, 230, 230,
];

/// Standard Microsoft ADPCM coefficient pairs, scaled by 256.
pub(crate) const MS_ADAPT_COEFFS1: [i32; 7] = [256, 512, 0, 192, 240, 460, 392];
pub(crate) const MS_ADAPT_COEFFS2: [i32; 7] = [0, -256, 0, 64, 0, -208, -232];

/// The smallest adaptive delta of the Microsoft predictor.
pub(crate) const MS_DELTA_MIN: i32 = 16;

#[rustfmt::skip]
pub(crate) const CT_ADAPTATION_TABLE: [i32; 8] = [
    0x00e6, 0x00e6, 0x00e6, 0x00e6, 0x0133, 0x0199, 0x0200, 0x0266,
];

#[rustfmt::skip]
pub(crate) const YAMAHA_INDEX_SCALE: [i32; 16] = [
    230, 230, 230, 230, 307, 409, 512, 614,
    230, 230, 230, 230, 307, 409, 512, 614,
];

#[rustfmt::skip]
pub(crate) const YAMAHA_DIFF_LOOKUP: [i32; 16] = [
    1, 3, 5, 7, 9, 11, 13, 15,
    -1, -3, -5, -7, -9, -11, -13, -15,
];

/// CD-ROM XA filter coefficient pairs, scaled by 64.
#[rustfmt::skip]
pub(crate) const XA_FILTERS: [[i32; 2]; 5] = [
    [0, 0],
    [60, 0],
    [115, -52],
    [98, -55],
    [122, -60],
];

/// Electronic Arts coefficients, scaled by 256. The first coefficient of pair `n` is at `n`, the
/// second at `n + 4`.
#[rustfmt::skip]
pub(crate) const EA_COEFFS: [i32; 20] = [
    0, 240, 460, 392,
    0, 0, -208, -220,
    0, 1, 3, 4,
    7, 8, 10, 11,
    0, -1, -3, -4,
];

/// Step index adjustments for the 2, 3, 4, and 5-bit SWF code sizes, indexed by code magnitude.
#[rustfmt::skip]
pub(crate) const SWF_INDEX_TABLES: [&[i32]; 4] = [
    &[-1, 2],
    &[-1, -1, 2, 4],
    &[-1, -1, -1, -1, 2, 4, 6, 8],
    &[-1, -1, -1, -1, -1, -1, -1, -1, 1, 2, 4, 6, 8, 10, 13, 16],
];
