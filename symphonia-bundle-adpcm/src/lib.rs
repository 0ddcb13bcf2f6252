// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// The following lints are allowed in all Symphonia crates. Please see clippy.toml for their
// justification.
#![allow(clippy::comparison_chain)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]

//! Adaptive Differential Pulse Code Modulation (ADPCM) decoders for a family of dialects, and
//! trellis encoders for IMA WAV, IMA QuickTime, Microsoft, Shockwave Flash, and Yamaha ADPCM.
//!
//! `AdpcmDecoder` plugs into Symphonia's codec registry. `BlockDecoder`, `decode_block`,
//! `AdpcmEncoder`, and `encode_block` work on raw blocks and interleaved 16-bit samples.

mod codec_creative;
mod codec_dk3;
mod codec_ea;
mod codec_ima;
mod codec_ima_qt;
mod codec_ms;
mod codec_swf;
mod codec_thp;
mod codec_xa;
mod codec_yamaha;
mod common;
mod decoder;
mod dialect;
mod encoder;
mod rule;
mod state;
mod tables;
mod trellis;

pub use codec_ms::MsCoefficients;
pub use decoder::{decode_block, AdpcmDecoder, BlockDecoder, DecodedBlock, MAX_CHANNELS};
pub use dialect::*;
pub use encoder::{encode_block, AdpcmEncoder, EncoderOptions};
pub use rule::{
    signed_nibble, Candidates, Ct, Ea, Ima, ImaQt, Ms, NibbleRule, SbPro, Swf, Thp, TrellisRule,
    Xa, Yamaha, SBPRO_PREDICTOR_MAX, SBPRO_PREDICTOR_MIN,
};
pub use state::ChannelState;
pub use trellis::{TrellisEncoder, FREEZE_INTERVAL, MAX_TRELLIS};
