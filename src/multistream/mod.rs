//!The multistream API allows individual Opus streams to be combined into a single packet, enabling support for up to 255 channels
//!
//!Multistream Opus streams can contain up to 255 elementary Opus streams.
//!These may be either "uncoupled" or "coupled", indicating that the decoder is configured to decode them to either 1 or 2 channels, respectively.
//!The streams are ordered so that all coupled streams appear at the beginning.
//!
//!Each multistream packet contains an Opus packet for each stream, and all of the Opus packets in
//!a single multistream packet must have the same duration. Every packet except the last one uses
//!self-delimiting framing, so that the next stream's packet can be located.
//!
//!Decoding of each stream is performed by [StreamDecoder], which is implemented by libopus
//!backed [Decoder](crate::Decoder) and used by default.

use crate::{packet, ErrorCode, Channels, SampleRate, Bandwidth};

use alloc::vec::Vec;

mod sample;
pub use sample::{Sample, copy_channel_out};
mod decoder;
pub use decoder::Decoder;

///Mapping value indicating that output channel is silent
pub const MUTED: u8 = 255;

///Result of decoding single stream's packet
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Decoded {
    ///Number of samples per channel written into output
    pub samples: usize,
    ///Number of input bytes consumed by the stream's packet.
    ///
    ///Zero when packet loss is concealed.
    pub packet_len: usize,
}

///Decoder of a single elementary stream within multistream packet
pub trait StreamDecoder: Sized {
    ///Creates new decoder for stream with specified number of channels
    fn new(rate: SampleRate, channels: Channels) -> Result<Self, ErrorCode>;

    ///Returns number of channels this decoder produces
    fn channels(&self) -> Channels;

    ///Decodes packet at the start of `input` into interleaved `output`.
    ///
    ///- `self_delimited` - Specifies that packet uses self-delimiting framing and may be followed by other data.
    ///Otherwise whole `input` belongs to the packet.
    ///- `frame_size` - Maximum number of samples per channel to decode. `output` holds at least `frame_size * channels` samples.
    ///
    ///Empty `input` requests packet loss concealment of `frame_size` samples.
    fn decode(&mut self, input: &[u8], self_delimited: bool, output: &mut [i16], frame_size: usize, decode_fec: bool) -> Result<Decoded, ErrorCode>;

    ///Resets internal state, losing any history used for concealment.
    fn reset(&mut self);

    ///Gets gain adjustment in Q8 dB units
    fn get_gain(&mut self) -> Result<i32, ErrorCode>;

    ///Sets gain adjustment in Q8 dB units
    fn set_gain(&mut self, value: i32) -> Result<(), ErrorCode>;

    ///Gets bandpass of the last decoded packet
    fn get_bandwidth(&mut self) -> Result<Bandwidth, ErrorCode>;

    ///Gets configured sample rate
    fn get_sample_rate(&mut self) -> Result<SampleRate, ErrorCode>;

    ///Gets duration (in samples) of the last packet decoded or concealed
    fn get_last_packet_duration(&mut self) -> Result<u32, ErrorCode>;

    ///Gets final state of entropy decoder
    fn get_final_range(&mut self) -> Result<u32, ErrorCode>;

    ///Gets phase inversion status
    fn get_phase_inversion_disabled(&mut self) -> Result<bool, ErrorCode>;

    ///Configures phase inversion
    fn set_phase_inversion_disabled(&mut self, value: bool) -> Result<(), ErrorCode>;
}

///Decoded channel of a stream
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Slot {
    ///Left channel of coupled stream
    Left(usize),
    ///Right channel of coupled stream
    Right(usize),
    ///Channel of uncoupled stream
    Mono(usize),
}

///Describes how decoded streams are mapped onto output channels
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelLayout {
    streams: usize,
    coupled_streams: usize,
    mapping: Vec<u8>,
}

impl ChannelLayout {
    ///Creates new layout, using first `channels` values of `mapping`.
    ///
    ///## Mapping
    ///
    ///`mapping` table defines which decoded channel `i` should be used for each output channel `j`.
    ///
    ///Let `i` = `mapping[j]` be the index for output channel `j`.
    ///
    ///If `i` < `2*coupled_streams`, then output channel `j` is the left channel of stream `(i/2)` if `i` is even,
    ///or the right channel of stream `(i/2)` if `i` is odd.
    ///
    ///Otherwise, output channel `j` is mono stream `(i - coupled_streams)`,
    ///unless it has the special value **255**, in which case it is silent.
    ///
    ///## Errors
    ///
    ///Returns `BadArg` when:
    ///
    ///- `channels` is not within `1..=255`
    ///- `streams` is 0, exceeds `channels` or `255 - coupled_streams`
    ///- `coupled_streams` exceeds `streams`
    ///- `mapping` is shorter than `channels` or refers to non-existing stream
    pub fn new(channels: usize, streams: usize, coupled_streams: usize, mapping: &[u8]) -> Result<Self, ErrorCode> {
        if channels == 0 || channels > 255 || coupled_streams > streams || streams == 0 || streams > 255 - coupled_streams || streams > channels {
            return Err(ErrorCode::bad_arg());
        }

        let mapping = match mapping.get(..channels) {
            Some(mapping) => mapping,
            None => return Err(ErrorCode::bad_arg()),
        };

        let layout = Self {
            streams,
            coupled_streams,
            mapping: mapping.to_vec(),
        };

        match layout.is_valid() {
            true => Ok(layout),
            false => Err(ErrorCode::bad_arg()),
        }
    }

    //Every non-muted value must refer to a channel of existing stream
    fn is_valid(&self) -> bool {
        let max_channel = self.streams + self.coupled_streams;
        self.mapping.iter().all(|idx| *idx == MUTED || (*idx as usize) < max_channel)
    }

    #[inline(always)]
    ///Returns number of output channels
    pub fn channels(&self) -> usize {
        self.mapping.len()
    }

    #[inline(always)]
    ///Returns total number of streams
    pub fn streams(&self) -> usize {
        self.streams
    }

    #[inline(always)]
    ///Returns number of coupled (stereo) streams
    pub fn coupled_streams(&self) -> usize {
        self.coupled_streams
    }

    #[inline(always)]
    ///Accesses mapping
    pub fn mapping(&self) -> &[u8] {
        &self.mapping
    }

    #[inline(always)]
    ///Returns number of channels decoded by stream `idx`
    pub fn stream_channels(&self, idx: usize) -> Channels {
        match idx < self.coupled_streams {
            true => Channels::Stereo,
            false => Channels::Mono,
        }
    }

    #[inline]
    fn slot_index(&self, slot: Slot) -> Option<usize> {
        match slot {
            Slot::Left(stream) if stream < self.coupled_streams => Some(stream * 2),
            Slot::Right(stream) if stream < self.coupled_streams => Some(stream * 2 + 1),
            Slot::Mono(stream) if stream >= self.coupled_streams && stream < self.streams => Some(stream + self.coupled_streams),
            _ => None,
        }
    }

    ///Finds next output channel, after `prev`, fed by `slot`
    ///
    ///Pass `None` to start searching from the first channel.
    pub fn next_channel(&self, slot: Slot, prev: Option<usize>) -> Option<usize> {
        let target = self.slot_index(slot)?;
        let start = match prev {
            Some(prev) => prev + 1,
            None => 0,
        };

        self.mapping.get(start..)?.iter().position(|idx| *idx as usize == target).map(|pos| start + pos)
    }

    #[inline]
    ///Returns iterator over every output channel fed by `slot`
    pub fn slot_channels(&self, slot: Slot) -> SlotChannels<'_> {
        SlotChannels {
            layout: self,
            slot,
            prev: None,
            done: false,
        }
    }

    #[inline]
    ///Returns iterator over silent output channels
    pub fn muted_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.mapping.iter().enumerate().filter(|(_, idx)| **idx == MUTED).map(|(channel, _)| channel)
    }
}

///Iterator over output channels fed by the same [Slot]
pub struct SlotChannels<'a> {
    layout: &'a ChannelLayout,
    slot: Slot,
    prev: Option<usize>,
    done: bool,
}

impl Iterator for SlotChannels<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.layout.next_channel(self.slot, self.prev) {
            Some(channel) => {
                self.prev = Some(channel);
                Some(channel)
            },
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl core::iter::FusedIterator for SlotChannels<'_> {}

///Verifies that multistream packet consists of `streams` packets of equal duration.
///
///Returns number of samples per channel within packet.
///
///All packets except the last one must be self-delimited. The last one occupies remainder of `input`.
pub fn validate_packet(input: &[u8], streams: usize, rate: SampleRate) -> Result<usize, ErrorCode> {
    let mut input = input;
    let mut samples = 0;

    for idx in 0..streams {
        if input.is_empty() {
            debug_log!("multistream packet is truncated at stream {}", idx);
            return Err(ErrorCode::invalid_packet());
        }

        let parsed = packet::parse(input, idx + 1 != streams)?;
        let stream_samples = packet::get_nb_samples(&input[..parsed.len()], rate)?;
        if idx != 0 && samples != stream_samples {
            debug_log!("stream {} has {} samples while previous streams have {}", idx, stream_samples, samples);
            return Err(ErrorCode::invalid_packet());
        }

        samples = stream_samples;
        input = &input[parsed.len()..];
    }

    Ok(samples)
}
