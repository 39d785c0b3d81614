use crate::{packet, ErrorCode, SampleRate, Bandwidth};
use super::{copy_channel_out, validate_packet, ChannelLayout, Sample, Slot, StreamDecoder};

use core::cmp;
use alloc::vec;
use alloc::vec::Vec;

const GAIN_RANGE: core::ops::RangeInclusive<i32> = -32768..=32767;

///OPUS multistream decoder
///
///Owns one [StreamDecoder] per stream: coupled streams are decoded as stereo, the rest as mono.
///
///Instance is not synchronized, concurrent use must be serialized by caller.
pub struct Decoder<S: StreamDecoder = crate::Decoder> {
    rate: SampleRate,
    layout: ChannelLayout,
    streams: Vec<S>,
}

impl Decoder {
    ///Creates new decoder instance
    ///
    ///`mapping` must contain at least `channels` values, refer to [ChannelLayout::new] for its meaning.
    ///
    ///## Errors
    ///
    ///- `BadArg` if layout is invalid;
    ///- Any error reported by creation of stream decoder, in which case already created stream decoders are dropped.
    pub fn new(rate: SampleRate, channels: usize, streams: usize, coupled_streams: usize, mapping: &[u8]) -> Result<Self, ErrorCode> {
        let layout = match ChannelLayout::new(channels, streams, coupled_streams, mapping) {
            Ok(layout) => layout,
            Err(error) => {
                debug_log!("invalid layout: channels={} streams={} coupled_streams={}", channels, streams, coupled_streams);
                return Err(error);
            }
        };

        Self::with_layout(layout, rate)
    }
}

impl<S: StreamDecoder> Decoder<S> {
    ///Creates new decoder instance with already validated layout
    pub fn with_layout(layout: ChannelLayout, rate: SampleRate) -> Result<Self, ErrorCode> {
        let mut streams = Vec::with_capacity(layout.streams());
        for idx in 0..layout.streams() {
            match S::new(rate, layout.stream_channels(idx)) {
                Ok(stream) => streams.push(stream),
                Err(error) => {
                    debug_log!("failed to create decoder for stream {}: {}", idx, error);
                    return Err(error);
                }
            }
        }

        Ok(Self {
            rate,
            layout,
            streams,
        })
    }

    #[inline(always)]
    ///Accesses channel layout
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    #[inline(always)]
    ///Returns number of output channels
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    #[inline(always)]
    ///Returns total number of streams
    pub fn streams(&self) -> usize {
        self.streams.len()
    }

    #[inline(always)]
    ///Returns number of coupled (stereo) streams
    pub fn coupled_streams(&self) -> usize {
        self.layout.coupled_streams()
    }

    #[inline(always)]
    ///Accesses decoder of stream `idx`
    pub fn stream_decoder(&self, idx: usize) -> Option<&S> {
        self.streams.get(idx)
    }

    #[inline(always)]
    ///Accesses decoder of stream `idx`
    ///
    ///Changing its configuration makes streams inconsistent, use with care.
    pub fn stream_decoder_mut(&mut self, idx: usize) -> Option<&mut S> {
        self.streams.get_mut(idx)
    }

    #[inline]
    ///Gets the number of samples per channel of multistream packet.
    ///
    ///Duration is taken from the first stream's packet, as every stream's packet has the same duration.
    pub fn get_nb_samples(&self, input: &[u8]) -> Result<usize, ErrorCode> {
        let parsed = packet::parse(input, self.streams.len() > 1)?;
        packet::get_nb_samples(&input[..parsed.len()], self.rate)
    }

    ///Decodes multistream packet into interleaved `output`, returning number of decoded samples per channel.
    ///
    ///`output` must have room for `frame_size * channels` samples.
    ///`frame_size` is limited to 120ms worth of samples.
    ///
    ///When `input` is empty, each stream conceals packet loss.
    ///
    ///When `decode_fec` is `true`, requests that any in-band forward error correction data be decoded.
    ///If no such data is available, the frame is decoded as if it were lost.
    ///
    ///## Errors
    ///
    ///- `BadArg` if `output` is too small for `frame_size`;
    ///- `InvalidPacket` if packet is malformed or streams' durations differ;
    ///- `BufferTooSmall` if packet is longer than `frame_size`;
    ///- Error of the failed stream decoder.
    ///
    ///On error the content of `output` is unspecified: channels of streams decoded before failure are already written.
    pub fn decode<T: Sample>(&mut self, input: &[u8], output: &mut [T], frame_size: usize, decode_fec: bool) -> Result<usize, ErrorCode> {
        let channels = self.layout.channels();
        let mut frame_size = cmp::min(frame_size, self.rate.max_frame_size());

        if output.len() / channels < frame_size {
            return Err(ErrorCode::bad_arg());
        }

        let do_plc = input.is_empty();
        if !do_plc {
            let streams = self.streams.len();
            if input.len() < 2 * streams - 1 {
                debug_log!("{} bytes cannot hold packets of {} streams", input.len(), streams);
                return Err(ErrorCode::invalid_packet());
            }

            let samples = validate_packet(input, streams, self.rate)?;
            if samples > frame_size {
                return Err(ErrorCode::BufferTooSmall);
            }
        }

        let mut buffer = vec![0i16; 2 * frame_size];
        let mut input = input;
        let last = self.streams.len() - 1;

        for (idx, stream) in self.streams.iter_mut().enumerate() {
            if !do_plc && input.is_empty() {
                return Err(ErrorCode::internal());
            }

            let decoded = match stream.decode(input, idx != last, &mut buffer, frame_size, decode_fec) {
                Ok(decoded) => decoded,
                Err(error) => {
                    debug_log!("stream {} failed to decode: {}", idx, error);
                    return Err(error);
                }
            };
            input = match input.get(decoded.packet_len..) {
                Some(input) => input,
                None => return Err(ErrorCode::internal()),
            };

            if decoded.samples == 0 {
                return Ok(0);
            } else if decoded.samples > frame_size {
                return Err(ErrorCode::internal());
            }
            frame_size = decoded.samples;

            if idx < self.layout.coupled_streams() {
                for channel in self.layout.slot_channels(Slot::Left(idx)) {
                    copy_channel_out(output, channels, channel, Some((&buffer[..], 2)), frame_size);
                }
                for channel in self.layout.slot_channels(Slot::Right(idx)) {
                    copy_channel_out(output, channels, channel, Some((&buffer[1..], 2)), frame_size);
                }
            } else {
                for channel in self.layout.slot_channels(Slot::Mono(idx)) {
                    copy_channel_out(output, channels, channel, Some((&buffer[..], 1)), frame_size);
                }
            }
        }

        for channel in self.layout.muted_channels() {
            copy_channel_out(output, channels, channel, None, frame_size);
        }

        Ok(frame_size)
    }

    #[inline(always)]
    ///Decodes multistream packet into 16 bit samples, returning number of decoded samples per channel.
    ///
    ///Frame size is determined by `output` length. Refer to `decode` for details
    pub fn decode_to_slice(&mut self, input: &[u8], output: &mut [i16], decode_fec: bool) -> Result<usize, ErrorCode> {
        let frame_size = output.len() / self.layout.channels();
        self.decode(input, output, frame_size, decode_fec)
    }

    #[inline(always)]
    ///Decodes multistream packet into float samples within `[-1, 1]`, returning number of decoded samples per channel.
    ///
    ///Frame size is determined by `output` length. Refer to `decode` for details
    pub fn decode_float_to_slice(&mut self, input: &[u8], output: &mut [f32], decode_fec: bool) -> Result<usize, ErrorCode> {
        let frame_size = output.len() / self.layout.channels();
        self.decode(input, output, frame_size, decode_fec)
    }

    #[inline]
    fn first_stream(&mut self) -> Result<&mut S, ErrorCode> {
        match self.streams.first_mut() {
            Some(stream) => Ok(stream),
            None => Err(ErrorCode::InvalidState),
        }
    }

    #[inline]
    ///Resets state of every stream to initial
    pub fn reset(&mut self) {
        for stream in self.streams.iter_mut() {
            stream.reset();
        }
    }

    #[inline]
    ///Gets the duration (in samples) of the last packet successfully decoded or concealed.
    pub fn get_last_packet_duration(&mut self) -> Result<u32, ErrorCode> {
        self.first_stream()?.get_last_packet_duration()
    }

    #[inline]
    ///Gets the decoder's gain configuration
    pub fn get_gain(&mut self) -> Result<i32, ErrorCode> {
        self.first_stream()?.get_gain()
    }

    ///Configures gain adjustment of every stream.
    ///
    ///Scales the decoded output by a factor specified in Q8 dB units.
    ///This has a maximum range of -32768 to 32767 inclusive, and returns `BadArg` otherwise,
    ///leaving all streams unchanged.
    ///
    ///_This setting survives decoder reset_.
    pub fn set_gain(&mut self, value: i32) -> Result<(), ErrorCode> {
        if !GAIN_RANGE.contains(&value) {
            return Err(ErrorCode::bad_arg());
        }

        for stream in self.streams.iter_mut() {
            stream.set_gain(value)?;
        }
        Ok(())
    }

    #[inline]
    ///Gets the decoder's last bandpass
    pub fn get_bandwidth(&mut self) -> Result<Bandwidth, ErrorCode> {
        self.first_stream()?.get_bandwidth()
    }

    #[inline]
    ///Gets configured sample rate of this instance
    pub fn get_sample_rate(&mut self) -> Result<SampleRate, ErrorCode> {
        self.first_stream()?.get_sample_rate()
    }

    ///Gets combined final state of all streams' entropy decoders.
    ///
    ///Value is XOR of each stream's final range, which allows to verify bit exact decoding.
    pub fn get_final_range(&mut self) -> Result<u32, ErrorCode> {
        let mut value = 0;
        for stream in self.streams.iter_mut() {
            value ^= stream.get_final_range()?;
        }
        Ok(value)
    }

    #[inline]
    ///Gets the decoder's configured phase inversion status.
    pub fn get_phase_inversion_disabled(&mut self) -> Result<bool, ErrorCode> {
        self.first_stream()?.get_phase_inversion_disabled()
    }

    ///Configures phase inversion of every stream.
    ///
    ///If set to `true`, disables the use of phase inversion for intensity stereo, improving the quality
    ///of mono downmixes, but slightly reducing normal stereo quality.
    pub fn set_phase_inversion_disabled(&mut self, value: bool) -> Result<(), ErrorCode> {
        for stream in self.streams.iter_mut() {
            stream.set_phase_inversion_disabled(value)?;
        }
        Ok(())
    }
}
