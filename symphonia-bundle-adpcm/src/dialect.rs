// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::codecs::{decl_codec_type, CodecType};
use symphonia_core::codecs::{CODEC_TYPE_ADPCM_IMA_QT, CODEC_TYPE_ADPCM_IMA_WAV};
use symphonia_core::codecs::CODEC_TYPE_ADPCM_MS;

/// Duck DK3 IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_DK3: CodecType = decl_codec_type(b"adk3");
/// Duck DK4 IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_DK4: CodecType = decl_codec_type(b"adk4");
/// Funcom ISS IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_ISS: CodecType = decl_codec_type(b"aiss");
/// Westwood IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_WS: CodecType = decl_codec_type(b"aiws");
/// Electronic Arts SEAD IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_EA_SEAD: CodecType = decl_codec_type(b"aisea");
/// Electronic Arts EACS IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_EA_EACS: CodecType = decl_codec_type(b"aieac");
/// AMV IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_AMV: CodecType = decl_codec_type(b"aiamv");
/// Loki SDL MJPEG IMA ADPCM.
pub const CODEC_TYPE_ADPCM_IMA_SMJPEG: CodecType = decl_codec_type(b"aismj");
/// 4X Movie ADPCM.
pub const CODEC_TYPE_ADPCM_4XM: CodecType = decl_codec_type(b"a4xm");
/// Creative Technology ADPCM.
pub const CODEC_TYPE_ADPCM_CT: CodecType = decl_codec_type(b"act");
/// Sound Blaster Pro 2-bit ADPCM.
pub const CODEC_TYPE_ADPCM_SBPRO_2: CodecType = decl_codec_type(b"asb2");
/// Sound Blaster Pro 2.6-bit ADPCM.
pub const CODEC_TYPE_ADPCM_SBPRO_3: CodecType = decl_codec_type(b"asb3");
/// Sound Blaster Pro 4-bit ADPCM.
pub const CODEC_TYPE_ADPCM_SBPRO_4: CodecType = decl_codec_type(b"asb4");
/// Yamaha ADPCM.
pub const CODEC_TYPE_ADPCM_YAMAHA: CodecType = decl_codec_type(b"ayam");
/// Electronic Arts ADPCM.
pub const CODEC_TYPE_ADPCM_EA: CodecType = decl_codec_type(b"aea");
/// Electronic Arts R1 ADPCM.
pub const CODEC_TYPE_ADPCM_EA_R1: CodecType = decl_codec_type(b"aear1");
/// Electronic Arts R2 ADPCM.
pub const CODEC_TYPE_ADPCM_EA_R2: CodecType = decl_codec_type(b"aear2");
/// Electronic Arts R3 ADPCM.
pub const CODEC_TYPE_ADPCM_EA_R3: CodecType = decl_codec_type(b"aear3");
/// Electronic Arts XAS ADPCM.
pub const CODEC_TYPE_ADPCM_EA_XAS: CodecType = decl_codec_type(b"aexas");
/// Electronic Arts Maxis CDROM XA ADPCM.
pub const CODEC_TYPE_ADPCM_EA_MAXIS_XA: CodecType = decl_codec_type(b"aemxa");
/// CD-ROM XA ADPCM.
pub const CODEC_TYPE_ADPCM_XA: CodecType = decl_codec_type(b"axa");
/// Nintendo THP ADPCM.
pub const CODEC_TYPE_ADPCM_THP: CodecType = decl_codec_type(b"athp");
/// Shockwave Flash ADPCM.
pub const CODEC_TYPE_ADPCM_SWF: CodecType = decl_codec_type(b"aswf");

/// `Dialect` selects one container-specific flavour of ADPCM.
///
/// The dialect is chosen once when a stream is opened and fixes the block layout, the nibble
/// update rule, and the channel limits for the lifetime of the stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    ImaQt,
    ImaWav,
    ImaDk3,
    ImaDk4,
    ImaIss,
    ImaWs,
    ImaEaSead,
    ImaEaEacs,
    ImaAmv,
    ImaSmjpeg,
    Ima4xm,
    Ms,
    Ct,
    SbPro2,
    SbPro3,
    SbPro4,
    Yamaha,
    Ea,
    EaR1,
    EaR2,
    EaR3,
    EaXas,
    EaMaxisXa,
    Xa,
    Thp,
    Swf,
}

impl Dialect {
    /// Every dialect, in registration order.
    pub const ALL: [Dialect; 26] = [
        Dialect::ImaQt,
        Dialect::ImaWav,
        Dialect::ImaDk3,
        Dialect::ImaDk4,
        Dialect::ImaIss,
        Dialect::ImaWs,
        Dialect::ImaEaSead,
        Dialect::ImaEaEacs,
        Dialect::ImaAmv,
        Dialect::ImaSmjpeg,
        Dialect::Ima4xm,
        Dialect::Ms,
        Dialect::Ct,
        Dialect::SbPro2,
        Dialect::SbPro3,
        Dialect::SbPro4,
        Dialect::Yamaha,
        Dialect::Ea,
        Dialect::EaR1,
        Dialect::EaR2,
        Dialect::EaR3,
        Dialect::EaXas,
        Dialect::EaMaxisXa,
        Dialect::Xa,
        Dialect::Thp,
        Dialect::Swf,
    ];

    /// Gets the Symphonia codec type of the dialect.
    pub fn codec_type(&self) -> CodecType {
        match self {
            Dialect::ImaQt => CODEC_TYPE_ADPCM_IMA_QT,
            Dialect::ImaWav => CODEC_TYPE_ADPCM_IMA_WAV,
            Dialect::ImaDk3 => CODEC_TYPE_ADPCM_IMA_DK3,
            Dialect::ImaDk4 => CODEC_TYPE_ADPCM_IMA_DK4,
            Dialect::ImaIss => CODEC_TYPE_ADPCM_IMA_ISS,
            Dialect::ImaWs => CODEC_TYPE_ADPCM_IMA_WS,
            Dialect::ImaEaSead => CODEC_TYPE_ADPCM_IMA_EA_SEAD,
            Dialect::ImaEaEacs => CODEC_TYPE_ADPCM_IMA_EA_EACS,
            Dialect::ImaAmv => CODEC_TYPE_ADPCM_IMA_AMV,
            Dialect::ImaSmjpeg => CODEC_TYPE_ADPCM_IMA_SMJPEG,
            Dialect::Ima4xm => CODEC_TYPE_ADPCM_4XM,
            Dialect::Ms => CODEC_TYPE_ADPCM_MS,
            Dialect::Ct => CODEC_TYPE_ADPCM_CT,
            Dialect::SbPro2 => CODEC_TYPE_ADPCM_SBPRO_2,
            Dialect::SbPro3 => CODEC_TYPE_ADPCM_SBPRO_3,
            Dialect::SbPro4 => CODEC_TYPE_ADPCM_SBPRO_4,
            Dialect::Yamaha => CODEC_TYPE_ADPCM_YAMAHA,
            Dialect::Ea => CODEC_TYPE_ADPCM_EA,
            Dialect::EaR1 => CODEC_TYPE_ADPCM_EA_R1,
            Dialect::EaR2 => CODEC_TYPE_ADPCM_EA_R2,
            Dialect::EaR3 => CODEC_TYPE_ADPCM_EA_R3,
            Dialect::EaXas => CODEC_TYPE_ADPCM_EA_XAS,
            Dialect::EaMaxisXa => CODEC_TYPE_ADPCM_EA_MAXIS_XA,
            Dialect::Xa => CODEC_TYPE_ADPCM_XA,
            Dialect::Thp => CODEC_TYPE_ADPCM_THP,
            Dialect::Swf => CODEC_TYPE_ADPCM_SWF,
        }
    }

    /// Finds the dialect identified by a Symphonia codec type.
    pub fn from_codec_type(codec: CodecType) -> Option<Dialect> {
        Dialect::ALL.iter().copied().find(|dialect| dialect.codec_type() == codec)
    }

    /// A short, lowercase, name for the dialect.
    pub fn short_name(&self) -> &'static str {
        match self {
            Dialect::ImaQt => "adpcm_ima_qt",
            Dialect::ImaWav => "adpcm_ima_wav",
            Dialect::ImaDk3 => "adpcm_ima_dk3",
            Dialect::ImaDk4 => "adpcm_ima_dk4",
            Dialect::ImaIss => "adpcm_ima_iss",
            Dialect::ImaWs => "adpcm_ima_ws",
            Dialect::ImaEaSead => "adpcm_ima_ea_sead",
            Dialect::ImaEaEacs => "adpcm_ima_ea_eacs",
            Dialect::ImaAmv => "adpcm_ima_amv",
            Dialect::ImaSmjpeg => "adpcm_ima_smjpeg",
            Dialect::Ima4xm => "adpcm_4xm",
            Dialect::Ms => "adpcm_ms",
            Dialect::Ct => "adpcm_ct",
            Dialect::SbPro2 => "adpcm_sbpro_2",
            Dialect::SbPro3 => "adpcm_sbpro_3",
            Dialect::SbPro4 => "adpcm_sbpro_4",
            Dialect::Yamaha => "adpcm_yamaha",
            Dialect::Ea => "adpcm_ea",
            Dialect::EaR1 => "adpcm_ea_r1",
            Dialect::EaR2 => "adpcm_ea_r2",
            Dialect::EaR3 => "adpcm_ea_r3",
            Dialect::EaXas => "adpcm_ea_xas",
            Dialect::EaMaxisXa => "adpcm_ea_maxis_xa",
            Dialect::Xa => "adpcm_xa",
            Dialect::Thp => "adpcm_thp",
            Dialect::Swf => "adpcm_swf",
        }
    }

    /// A longer, descriptive, name for the dialect.
    pub fn long_name(&self) -> &'static str {
        match self {
            Dialect::ImaQt => "ADPCM IMA QuickTime",
            Dialect::ImaWav => "ADPCM IMA WAV",
            Dialect::ImaDk3 => "ADPCM IMA Duck DK3",
            Dialect::ImaDk4 => "ADPCM IMA Duck DK4",
            Dialect::ImaIss => "ADPCM IMA Funcom ISS",
            Dialect::ImaWs => "ADPCM IMA Westwood",
            Dialect::ImaEaSead => "ADPCM IMA Electronic Arts SEAD",
            Dialect::ImaEaEacs => "ADPCM IMA Electronic Arts EACS",
            Dialect::ImaAmv => "ADPCM IMA AMV",
            Dialect::ImaSmjpeg => "ADPCM IMA Loki SDL MJPEG",
            Dialect::Ima4xm => "ADPCM 4X Movie",
            Dialect::Ms => "Microsoft ADPCM",
            Dialect::Ct => "ADPCM Creative Technology",
            Dialect::SbPro2 => "ADPCM Sound Blaster Pro 2-bit",
            Dialect::SbPro3 => "ADPCM Sound Blaster Pro 2.6-bit",
            Dialect::SbPro4 => "ADPCM Sound Blaster Pro 4-bit",
            Dialect::Yamaha => "ADPCM Yamaha",
            Dialect::Ea => "ADPCM Electronic Arts",
            Dialect::EaR1 => "ADPCM Electronic Arts R1",
            Dialect::EaR2 => "ADPCM Electronic Arts R2",
            Dialect::EaR3 => "ADPCM Electronic Arts R3",
            Dialect::EaXas => "ADPCM Electronic Arts XAS",
            Dialect::EaMaxisXa => "ADPCM Electronic Arts Maxis CDROM XA",
            Dialect::Xa => "ADPCM CDROM XA",
            Dialect::Thp => "ADPCM Nintendo THP",
            Dialect::Swf => "ADPCM Shockwave Flash",
        }
    }

    /// The largest number of channels a stream of this dialect may carry.
    pub fn max_channels(&self) -> usize {
        match self {
            Dialect::EaR1 | Dialect::EaR2 | Dialect::EaR3 | Dialect::EaXas => 6,
            Dialect::ImaAmv | Dialect::SbPro3 => 1,
            _ => 2,
        }
    }

    /// The smallest number of channels a stream of this dialect may carry.
    pub fn min_channels(&self) -> usize {
        match self {
            // Both dialects define a fixed stereo layout.
            Dialect::ImaDk3 | Dialect::Ea => 2,
            _ => 1,
        }
    }

    /// Returns `true` if `channels` is a valid channel count for the dialect.
    pub fn supports_channels(&self, channels: usize) -> bool {
        channels >= self.min_channels() && channels <= self.max_channels()
    }

    /// Returns `true` if the dialect can be encoded.
    pub fn is_encodable(&self) -> bool {
        matches!(
            self,
            Dialect::ImaWav | Dialect::ImaQt | Dialect::Ms | Dialect::Swf | Dialect::Yamaha
        )
    }

    /// Returns `true` if channel state is carried from one block to the next rather than being
    /// reloaded from every block header.
    pub fn persists_state(&self) -> bool {
        matches!(
            self,
            Dialect::ImaWs
                | Dialect::ImaEaSead
                | Dialect::Ct
                | Dialect::SbPro2
                | Dialect::SbPro3
                | Dialect::SbPro4
                | Dialect::Yamaha
                | Dialect::EaR2
                | Dialect::EaR3
                | Dialect::EaMaxisXa
        )
    }

    /// Returns `true` if packets of the dialect are a sequence of fixed-size blocks.
    pub fn is_block_framed(&self) -> bool {
        matches!(
            self,
            Dialect::ImaQt
                | Dialect::ImaWav
                | Dialect::ImaDk3
                | Dialect::ImaDk4
                | Dialect::Ms
                | Dialect::EaXas
        )
    }

    /// The number of frames per block of dialects whose block size is fixed by the format.
    pub fn fixed_frames_per_block(&self) -> Option<usize> {
        match self {
            Dialect::ImaQt => Some(64),
            Dialect::EaXas => Some(128),
            _ => None,
        }
    }

    /// The size in bytes of one block holding `frames` frames of `channels` channels, or `None`
    /// if the dialect is not block-framed and a whole packet should be decoded at once.
    pub fn block_align(&self, frames: usize, channels: usize) -> Option<usize> {
        match self {
            Dialect::ImaWav | Dialect::ImaDk4 if frames > 0 => {
                Some(4 * channels + (frames - 1) * channels / 2)
            }
            Dialect::Ms if frames > 1 => Some(7 * channels + (frames - 2) * channels / 2),
            Dialect::ImaDk3 => {
                // Every pair of frames consumes three nibbles, an odd trailing frame two more.
                let nibbles = 3 * (frames / 2) + 2 * (frames % 2);
                Some(16 + (nibbles + 1) / 2)
            }
            Dialect::ImaQt => Some(34 * channels),
            Dialect::EaXas => Some(76 * channels),
            _ => None,
        }
    }

    /// An upper bound on the number of interleaved samples decoded from a block of `len` bytes.
    pub fn max_samples(&self, len: usize, channels: usize) -> usize {
        match self {
            // Channels may share frame data through their offsets.
            Dialect::EaR1 | Dialect::EaR2 | Dialect::EaR3 => channels * (2 * len + 28),
            _ => 4 * len + 2 * channels,
        }
    }
}
