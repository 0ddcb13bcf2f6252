// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{info, warn};

use symphonia_core::audio::{AsAudioBufferRef, AudioBuffer, AudioBufferRef, Signal, SignalSpec};
use symphonia_core::codecs::{CodecDescriptor, CodecParameters};
use symphonia_core::codecs::{Decoder, DecoderOptions, FinalizeResult};
use symphonia_core::codecs::{CODEC_TYPE_ADPCM_IMA_QT, CODEC_TYPE_ADPCM_IMA_WAV};
use symphonia_core::codecs::CODEC_TYPE_ADPCM_MS;
use symphonia_core::errors::{unsupported_error, Result};
use symphonia_core::formats::Packet;
use symphonia_core::io::{BufReader, ReadBytes};
use symphonia_core::support_codec;

use crate::codec_ea::EaRevision;
use crate::codec_ms::MsCoefficients;
use crate::common::from_i16_shift;
use crate::dialect::*;
use crate::state::ChannelState;
use crate::{codec_creative, codec_dk3, codec_ea, codec_ima, codec_ima_qt, codec_ms};
use crate::{codec_swf, codec_thp, codec_xa, codec_yamaha};

/// The largest number of channels of any dialect.
pub const MAX_CHANNELS: usize = 6;

/// The outcome of decoding one block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedBlock {
    /// The number of interleaved samples written to the output.
    pub samples: usize,
    /// The number of bytes of the block that were consumed.
    pub consumed: usize,
}

fn dispatch(
    dialect: Dialect,
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
    ms_coeffs: Option<&MsCoefficients>,
) -> Result<DecodedBlock> {
    match dialect {
        Dialect::ImaQt => codec_ima_qt::decode_qt(states, block, out),
        Dialect::ImaWav => codec_ima::decode_wav(states, block, out),
        Dialect::ImaDk3 => codec_dk3::decode_dk3(states, block, out),
        Dialect::ImaDk4 => codec_ima::decode_dk4(states, block, out),
        Dialect::ImaIss => codec_ima::decode_iss(states, block, out),
        Dialect::ImaWs => codec_ima::decode_ws(states, block, out),
        Dialect::ImaEaSead => codec_ima::decode_ea_sead(states, block, out),
        Dialect::ImaEaEacs => codec_ima::decode_ea_eacs(states, block, out),
        Dialect::ImaAmv => codec_ima::decode_amv(states, block, out),
        Dialect::ImaSmjpeg => codec_ima_qt::decode_smjpeg(states, block, out),
        Dialect::Ima4xm => codec_ima::decode_4xm(states, block, out),
        Dialect::Ms => codec_ms::decode_ms(states, block, out, ms_coeffs),
        Dialect::Ct => codec_creative::decode_ct(states, block, out),
        Dialect::SbPro2 => codec_creative::decode_sbpro(states, block, out, 2),
        Dialect::SbPro3 => codec_creative::decode_sbpro(states, block, out, 3),
        Dialect::SbPro4 => codec_creative::decode_sbpro(states, block, out, 4),
        Dialect::Yamaha => codec_yamaha::decode_yamaha(states, block, out),
        Dialect::Ea => codec_ea::decode_ea(states, block, out),
        Dialect::EaR1 => codec_ea::decode_ea_r(states, block, out, EaRevision::R1),
        Dialect::EaR2 => codec_ea::decode_ea_r(states, block, out, EaRevision::R2),
        Dialect::EaR3 => codec_ea::decode_ea_r(states, block, out, EaRevision::R3),
        Dialect::EaXas => codec_ea::decode_ea_xas(states, block, out),
        Dialect::EaMaxisXa => codec_ea::decode_ea_maxis_xa(states, block, out),
        Dialect::Xa => codec_xa::decode_xa(states, block, out),
        Dialect::Thp => codec_thp::decode_thp(states, block, out),
        Dialect::Swf => codec_swf::decode_swf(states, block, out),
    }
}

/// Decodes on a copy of `states` and only commits the copy if the whole block decoded.
fn decode_committed(
    dialect: Dialect,
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
    ms_coeffs: Option<&MsCoefficients>,
) -> Result<DecodedBlock> {
    if !dialect.supports_channels(states.len()) {
        return unsupported_error("adpcm: unsupported number of channels for dialect");
    }

    let mut work = [ChannelState::default(); MAX_CHANNELS];
    let work = &mut work[..states.len()];
    work.copy_from_slice(states);

    let decoded = dispatch(dialect, work, block, out, ms_coeffs)?;

    states.copy_from_slice(work);

    Ok(decoded)
}

/// Decodes one compressed block of `dialect` into interleaved samples.
///
/// There is one entry in `states` per channel. It is updated only if the block decodes without
/// error, and should be carried from one block to the next. If `out` is too small for the decoded
/// block, nothing is written and a limit error is returned. `Dialect::max_samples` gives a safe
/// size.
pub fn decode_block(
    dialect: Dialect,
    states: &mut [ChannelState],
    block: &[u8],
    out: &mut [i16],
) -> Result<DecodedBlock> {
    decode_committed(dialect, states, block, out, None)
}

/// `BlockDecoder` decodes a stream of compressed blocks of a single dialect, owning the channel
/// state carried between them.
#[derive(Clone, Debug)]
pub struct BlockDecoder {
    dialect: Dialect,
    initial: Vec<ChannelState>,
    states: Vec<ChannelState>,
    ms_coeffs: Option<MsCoefficients>,
}

impl BlockDecoder {
    /// Instantiate a `BlockDecoder` for `channels` channels of `dialect`.
    pub fn try_new(dialect: Dialect, channels: usize) -> Result<Self> {
        if !dialect.supports_channels(channels) {
            return unsupported_error("adpcm: unsupported number of channels for dialect");
        }

        let initial = vec![ChannelState::for_dialect(dialect); channels];

        Ok(BlockDecoder { dialect, states: initial.clone(), initial, ms_coeffs: None })
    }

    /// Applies the codec extra data of the stream.
    ///
    /// Microsoft ADPCM extra data may carry a custom coefficient set, and Westwood IMA extra
    /// data the initial predictors of the channels. The extra data of other dialects is ignored.
    pub fn with_extra_data(mut self, extra_data: &[u8]) -> Result<Self> {
        match self.dialect {
            Dialect::Ms if !extra_data.is_empty() => {
                self.ms_coeffs = Some(MsCoefficients::from_extra_data(extra_data)?);
            }
            Dialect::ImaWs if extra_data.len() >= 8 => {
                let mut reader = BufReader::new(extra_data);
                let predictors = [reader.read_u32()?, reader.read_u32()?];

                for (state, predictor) in self.initial.iter_mut().zip(predictors) {
                    state.load_predictor(predictor as i32);
                }
                self.states.copy_from_slice(&self.initial);
            }
            _ => (),
        }
        Ok(self)
    }

    /// Gets the dialect being decoded.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Gets the number of channels.
    pub fn channels(&self) -> usize {
        self.states.len()
    }

    /// Decodes one block into `out`. See `decode_block`.
    pub fn decode(&mut self, block: &[u8], out: &mut [i16]) -> Result<DecodedBlock> {
        decode_committed(self.dialect, &mut self.states, block, out, self.ms_coeffs.as_ref())
    }

    /// Gets the current state of every channel.
    pub fn states(&self) -> &[ChannelState] {
        &self.states
    }

    /// Gets a mutable reference to the state of every channel, e.g., to restore persisted state.
    pub fn states_mut(&mut self) -> &mut [ChannelState] {
        &mut self.states
    }

    /// Returns every channel to the state the stream started with.
    pub fn reset(&mut self) {
        self.states.copy_from_slice(&self.initial);
    }
}

/// Adaptive Differential Pulse Code Modulation (ADPCM) decoder.
pub struct AdpcmDecoder {
    params: CodecParameters,
    decoder: BlockDecoder,
    block_align: Option<usize>,
    samples: Vec<i16>,
    buf: AudioBuffer<i32>,
}

impl AdpcmDecoder {
    fn decode_inner(&mut self, packet: &Packet) -> Result<()> {
        let data = packet.buf();
        let channels = self.decoder.channels();
        let dialect = self.decoder.dialect();

        let block_len = match self.block_align {
            Some(block_align) => block_align,
            None => data.len(),
        };

        self.buf.clear();

        if block_len == 0 {
            return Ok(());
        }

        let block_count = data.len() / block_len;

        if data.len() % block_len != 0 {
            info!("adpcm: ignoring {} trailing bytes of packet", data.len() % block_len);
        }

        self.samples.clear();
        self.samples.resize(block_count * dialect.max_samples(block_len, channels), 0);

        let mut written = 0;

        for block in data.chunks_exact(block_len) {
            let decoded = self.decoder.decode(block, &mut self.samples[written..])?;
            written += decoded.samples;
        }

        let frames = written / channels;

        if frames > self.buf.capacity() {
            let spec = *self.buf.spec();
            self.buf = AudioBuffer::new(frames as u64, spec);
        }

        self.buf.render_reserved(Some(frames));

        for ch in 0..channels {
            let samples = self.samples[..written].iter().skip(ch).step_by(channels);

            for (dst, &src) in self.buf.chan_mut(ch).iter_mut().zip(samples) {
                *dst = from_i16_shift!(src);
            }
        }

        Ok(())
    }
}

impl Decoder for AdpcmDecoder {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> Result<Self> {
        let dialect = match Dialect::from_codec_type(params.codec) {
            Some(dialect) => dialect,
            _ => return unsupported_error("adpcm: invalid codec type"),
        };

        let rate = match params.sample_rate {
            Some(rate) => rate,
            _ => return unsupported_error("adpcm: sample rate is required"),
        };

        let spec = if let Some(channels) = params.channels {
            SignalSpec::new(rate, channels)
        }
        else if let Some(layout) = params.channel_layout {
            SignalSpec::new_with_layout(rate, layout)
        }
        else {
            return unsupported_error("adpcm: channels or channel_layout is required");
        };

        let channels = spec.channels.count();

        let frames_per_block = match params.frames_per_block {
            Some(frames) if frames > 0 => Some(frames as usize),
            _ => dialect.fixed_frames_per_block(),
        };

        let block_align = if dialect.is_block_framed() {
            let block_align = frames_per_block.and_then(|f| dialect.block_align(f, channels));

            if block_align.is_none() {
                return unsupported_error("adpcm: valid frames per block is required");
            }
            block_align
        }
        else {
            None
        };

        let mut decoder = BlockDecoder::try_new(dialect, channels)?;

        if let Some(extra_data) = &params.extra_data {
            decoder = decoder.with_extra_data(extra_data)?;
        }
        else if dialect == Dialect::Ms {
            warn!("adpcm: no extra data, using the standard coefficients");
        }

        let max_frames = params
            .max_frames_per_packet
            .or(frames_per_block.map(|frames| frames as u64))
            .unwrap_or(0);

        Ok(AdpcmDecoder {
            params: params.clone(),
            decoder,
            block_align,
            samples: Vec::new(),
            buf: AudioBuffer::new(max_frames, spec),
        })
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[
            support_codec!(CODEC_TYPE_ADPCM_IMA_QT, "adpcm_ima_qt", "ADPCM IMA QuickTime"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_WAV, "adpcm_ima_wav", "ADPCM IMA WAV"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_DK3, "adpcm_ima_dk3", "ADPCM IMA Duck DK3"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_DK4, "adpcm_ima_dk4", "ADPCM IMA Duck DK4"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_ISS, "adpcm_ima_iss", "ADPCM IMA Funcom ISS"),
            support_codec!(CODEC_TYPE_ADPCM_IMA_WS, "adpcm_ima_ws", "ADPCM IMA Westwood"),
            support_codec!(
                CODEC_TYPE_ADPCM_IMA_EA_SEAD,
                "adpcm_ima_ea_sead",
                "ADPCM IMA Electronic Arts SEAD"
            ),
            support_codec!(
                CODEC_TYPE_ADPCM_IMA_EA_EACS,
                "adpcm_ima_ea_eacs",
                "ADPCM IMA Electronic Arts EACS"
            ),
            support_codec!(CODEC_TYPE_ADPCM_IMA_AMV, "adpcm_ima_amv", "ADPCM IMA AMV"),
            support_codec!(
                CODEC_TYPE_ADPCM_IMA_SMJPEG,
                "adpcm_ima_smjpeg",
                "ADPCM IMA Loki SDL MJPEG"
            ),
            support_codec!(CODEC_TYPE_ADPCM_4XM, "adpcm_4xm", "ADPCM 4X Movie"),
            support_codec!(CODEC_TYPE_ADPCM_MS, "adpcm_ms", "Microsoft ADPCM"),
            support_codec!(CODEC_TYPE_ADPCM_CT, "adpcm_ct", "ADPCM Creative Technology"),
            support_codec!(
                CODEC_TYPE_ADPCM_SBPRO_2,
                "adpcm_sbpro_2",
                "ADPCM Sound Blaster Pro 2-bit"
            ),
            support_codec!(
                CODEC_TYPE_ADPCM_SBPRO_3,
                "adpcm_sbpro_3",
                "ADPCM Sound Blaster Pro 2.6-bit"
            ),
            support_codec!(
                CODEC_TYPE_ADPCM_SBPRO_4,
                "adpcm_sbpro_4",
                "ADPCM Sound Blaster Pro 4-bit"
            ),
            support_codec!(CODEC_TYPE_ADPCM_YAMAHA, "adpcm_yamaha", "ADPCM Yamaha"),
            support_codec!(CODEC_TYPE_ADPCM_EA, "adpcm_ea", "ADPCM Electronic Arts"),
            support_codec!(CODEC_TYPE_ADPCM_EA_R1, "adpcm_ea_r1", "ADPCM Electronic Arts R1"),
            support_codec!(CODEC_TYPE_ADPCM_EA_R2, "adpcm_ea_r2", "ADPCM Electronic Arts R2"),
            support_codec!(CODEC_TYPE_ADPCM_EA_R3, "adpcm_ea_r3", "ADPCM Electronic Arts R3"),
            support_codec!(CODEC_TYPE_ADPCM_EA_XAS, "adpcm_ea_xas", "ADPCM Electronic Arts XAS"),
            support_codec!(
                CODEC_TYPE_ADPCM_EA_MAXIS_XA,
                "adpcm_ea_maxis_xa",
                "ADPCM Electronic Arts Maxis CDROM XA"
            ),
            support_codec!(CODEC_TYPE_ADPCM_XA, "adpcm_xa", "ADPCM CDROM XA"),
            support_codec!(CODEC_TYPE_ADPCM_THP, "adpcm_thp", "ADPCM Nintendo THP"),
            support_codec!(CODEC_TYPE_ADPCM_SWF, "adpcm_swf", "ADPCM Shockwave Flash"),
        ]
    }

    fn reset(&mut self) {
        self.decoder.reset();
    }

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<AudioBufferRef<'_>> {
        if let Err(e) = self.decode_inner(packet) {
            self.buf.clear();
            Err(e)
        }
        else {
            Ok(self.buf.as_audio_buffer_ref())
        }
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_decode_block_commits_on_success_only() {
        let mut states = [ChannelState { predictor: 7, step_index: 3, ..Default::default() }];
        let mut out = vec![0; 16];

        // A truncated IMA WAV header fails and leaves the state untouched.
        assert!(decode_block(Dialect::ImaWav, &mut states, &[0x10, 0x00], &mut out).is_err());
        assert_eq!(states[0].predictor, 7);
        assert_eq!(states[0].step_index, 3);

        let decoded =
            decode_block(Dialect::ImaWav, &mut states, &[0x10, 0x00, 0, 0, 0], &mut out).unwrap();
        assert_eq!(decoded.samples, 3);
        assert_eq!(states[0].predictor, 16);
        assert_eq!(states[0].step_index, 0);
    }

    #[test]
    fn verify_decode_block_channel_limits() {
        let mut states = [ChannelState::new(); 3];
        let mut out = vec![0; 64];
        assert!(decode_block(Dialect::Yamaha, &mut states, &[0; 4], &mut out).is_err());
        // Sample count 0, three channel offsets, and one shared channel history.
        assert!(decode_block(Dialect::EaR1, &mut states, &[0; 20], &mut out).is_ok());

        let mut states = [ChannelState::new(); 1];
        assert!(decode_block(Dialect::ImaDk3, &mut states, &[0; 20], &mut out).is_err());
    }

    #[test]
    fn verify_block_decoder_ws_extra_data() {
        let extra_data = [0x10, 0x00, 0x00, 0x00, 0xf0, 0xff, 0xff, 0xff];

        let mut decoder =
            BlockDecoder::try_new(Dialect::ImaWs, 2).unwrap().with_extra_data(&extra_data).unwrap();
        assert_eq!(decoder.states()[0].predictor, 16);
        assert_eq!(decoder.states()[1].predictor, -16);

        let mut out = vec![0; 4];
        decoder.decode(&[0x77, 0x77], &mut out).unwrap();
        assert_ne!(decoder.states()[0].step_index, 0);

        decoder.states_mut()[0].step_index = 40;
        decoder.reset();
        assert_eq!(decoder.states()[0].predictor, 16);
        assert_eq!(decoder.states()[0].step_index, 0);
    }

    #[test]
    fn verify_block_decoder_creative_initial_step() {
        let decoder = BlockDecoder::try_new(Dialect::Ct, 1).unwrap();
        assert_eq!(decoder.states()[0].step, 511);
    }
}
