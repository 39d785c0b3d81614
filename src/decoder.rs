use crate::{sys, mem, packet, ErrorCode, Channels, SampleRate, Bandwidth};
use crate::multistream::{StreamDecoder, Decoded};

use core::ptr;
use core::convert::TryInto;
use alloc::vec::Vec;

///OPUS Decoder of single elementary stream
///
///Number of channels is selected at runtime, allowing to keep mono and stereo decoders within
///single collection, as multistream decoding requires.
pub struct Decoder {
    inner: mem::Unique<sys::OpusDecoder>,
    channels: Channels,
    //Storage to restore standard framing of self-delimited packets
    packet: Vec<u8>,
}

impl Decoder {
    ///Creates new decoder instance
    pub fn new(rate: SampleRate, channels: Channels) -> Result<Self, ErrorCode> {
        let size = unsafe {
            sys::opus_decoder_get_size(channels as _)
        };

        if size == 0 {
            return Err(ErrorCode::Internal);
        }

        let mut decoder = match mem::Unique::new(size as _) {
            Some(inner) => Decoder {
                inner,
                channels,
                packet: Vec::new(),
            },
            None => return Err(ErrorCode::AllocFail)
        };

        let result = unsafe {
            sys::opus_decoder_init(decoder.inner.as_mut(), rate as _, channels as _)
        };

        map_sys_error!(result => decoder)
    }

    #[inline(always)]
    ///Returns number of channels this decoder produces
    pub fn channels(&self) -> Channels {
        self.channels
    }

    ///Decodes input packet, returning number of decoded samples per channel.
    ///
    ///If more than 1 channel is configured, then output is interleaved.
    ///
    ///Output size must correspond to sampling rate.
    ///For example, at 48 kHz allowed frame sizes are 120, 240, 480, 960, 1920, and 2880.
    ///
    ///When `input` size is 0, libopus shall treat it as packet loss, in which case `output` size must
    ///match expected output of next packet to know how much frames is skipped
    ///
    ///When `decode_fec` is `true`, requests that any in-band forward error correction data be decoded.
    ///If no such data is available, the frame is decoded as if it were lost.
    pub fn decode_to(&mut self, input: &[u8], output: &mut [mem::MaybeUninit<i16>], decode_fec: bool) -> Result<usize, ErrorCode> {
        let (input_ptr, input_len) = match input.len() {
            0 => (ptr::null(), 0),
            len => match len.try_into() {
                Ok(len) => (input.as_ptr(), len),
                Err(_) => return Err(ErrorCode::invalid_packet()),
            }
        };

        let fec = match decode_fec {
            true => 1,
            false => 0,
        };
        let result = unsafe {
            sys::opus_decode(self.inner.as_mut(),
                             input_ptr, input_len,
                             output.as_mut_ptr() as _, (output.len() / self.channels as usize) as _,
                             fec)
        };

        map_sys_error!(result => result as _)
    }

    #[inline(always)]
    ///Decodes input packet, returning number of decoded samples per channel.
    ///
    ///Refer to `decode_to` for details
    pub fn decode_to_slice(&mut self, input: &[u8], output: &mut [i16], decode_fec: bool) -> Result<usize, ErrorCode> {
        self.decode_to(input, unsafe { mem::transmute(output) }, decode_fec)
    }

    ///Decodes packet, which may be followed by packets of other streams.
    ///
    ///`output` must have room for `frame_size` samples of each channel.
    ///
    ///When `self_delimited` is `true`, `input` starts with self-delimited packet,
    ///otherwise whole `input` is single packet.
    ///Empty `input` is treated as packet loss.
    pub fn decode_packet(&mut self, input: &[u8], self_delimited: bool, output: &mut [i16], frame_size: usize, decode_fec: bool) -> Result<Decoded, ErrorCode> {
        let output_len = match frame_size.checked_mul(self.channels as usize) {
            Some(output_len) => output_len,
            None => return Err(ErrorCode::bad_arg()),
        };
        let output = match output.get_mut(..output_len) {
            Some(output) => output,
            None => return Err(ErrorCode::BufferTooSmall),
        };

        if input.is_empty() {
            let samples = self.decode_to_slice(input, output, decode_fec)?;
            return Ok(Decoded {
                samples,
                packet_len: 0,
            });
        }

        let parsed = packet::parse(input, self_delimited)?;
        let samples = match parsed.is_self_delimited() {
            true => {
                let mut packet = core::mem::take(&mut self.packet);
                let result = match parsed.write_undelimited(input, &mut packet) {
                    Ok(()) => self.decode_to_slice(&packet, output, decode_fec),
                    Err(error) => Err(error),
                };
                self.packet = packet;
                result?
            },
            false => self.decode_to_slice(&input[..parsed.len()], output, decode_fec)?,
        };

        Ok(Decoded {
            samples,
            packet_len: parsed.len(),
        })
    }

    #[inline]
    ///Resets state to initial
    pub fn reset(&mut self) -> Result<(), ErrorCode> {
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_RESET_STATE)
        };

        map_sys_error!(result => ())
    }

    #[inline]
    ///Gets the duration (in samples) of the last packet successfully decoded or concealed.
    pub fn get_last_packet_duration(&mut self) -> Result<u32, ErrorCode> {
        let mut value: i32 = 0;
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_GET_LAST_PACKET_DURATION_REQUEST, &mut value)
        };

        map_sys_error!(result => value as _)
    }

    #[inline]
    ///Gets final state of the codec's entropy coder.
    ///
    ///This is used for testing purposes.
    ///The encoder and decoder state should be identical after coding a payload
    ///(assuming no data corruption or software bugs)
    pub fn get_final_range(&mut self) -> Result<u32, ErrorCode> {
        let mut value: u32 = 0;
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_GET_FINAL_RANGE_REQUEST, &mut value)
        };

        map_sys_error!(result => value)
    }

    #[inline]
    ///Gets the decoder's gain configuration
    pub fn get_gain(&mut self) -> Result<i32, ErrorCode> {
        let mut value: i32 = 0;
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_GET_GAIN_REQUEST, &mut value)
        };

        map_sys_error!(result => value)
    }

    #[inline]
    ///Configures decoder gain adjustment.
    ///
    ///Scales the decoded output by a factor specified in Q8 dB units.
    ///This has a maximum range of -32768 to 32767 inclusive, and returns `BadArg` otherwise.
    ///
    ///The default is zero indicating no adjustment.
    ///
    ///_This setting survives decoder reset_.
    ///
    ///Formula:
    ///
    ///`gain = pow(10, x/(20.0*256))`
    pub fn set_gain(&mut self, value: i32) -> Result<(), ErrorCode> {
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_SET_GAIN_REQUEST, value)
        };

        map_sys_error!(result => ())
    }

    #[inline]
    ///Gets the decoder's last bandpass
    pub fn get_bandwidth(&mut self) -> Result<Bandwidth, ErrorCode> {
        let mut value: i32 = 0;
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_GET_BANDWIDTH_REQUEST, &mut value)
        };

        map_sys_error!(result => value.into())
    }

    #[inline]
    ///Gets configured sample rate of this instance
    pub fn get_sample_rate(&mut self) -> Result<SampleRate, ErrorCode> {
        let mut value: i32 = 0;
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_GET_SAMPLE_RATE_REQUEST, &mut value)
        };

        map_sys_error!(result => match SampleRate::from_sys(value) {
            Some(rate) => rate,
            None => return Err(ErrorCode::unknown())
        })
    }

    #[inline]
    ///Gets the decoder's configured phase inversion status.
    pub fn get_phase_inversion_disabled(&mut self) -> Result<bool, ErrorCode> {
        let mut value: i32 = 0;
        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_GET_PHASE_INVERSION_DISABLED_REQUEST, &mut value)
        };

        map_sys_error!(result => value == 1)
    }

    #[inline]
    ///Configures phase inversion.
    ///
    ///If set to `true`, disables the use of phase inversion for intensity stereo, improving the quality
    ///of mono downmixes, but slightly reducing normal stereo quality.
    pub fn set_phase_inversion_disabled(&mut self, value: bool) -> Result<(), ErrorCode> {
        let value: i32 = match value {
            true => 1,
            false => 0,
        };

        let result = unsafe {
            sys::opus_decoder_ctl(self.inner.as_mut(), sys::OPUS_SET_PHASE_INVERSION_DISABLED_REQUEST, value)
        };

        map_sys_error!(result => ())
    }
}

impl StreamDecoder for Decoder {
    #[inline(always)]
    fn new(rate: SampleRate, channels: Channels) -> Result<Self, ErrorCode> {
        Decoder::new(rate, channels)
    }

    #[inline(always)]
    fn channels(&self) -> Channels {
        self.channels
    }

    #[inline(always)]
    fn decode(&mut self, input: &[u8], self_delimited: bool, output: &mut [i16], frame_size: usize, decode_fec: bool) -> Result<Decoded, ErrorCode> {
        self.decode_packet(input, self_delimited, output, frame_size, decode_fec)
    }

    #[inline]
    fn reset(&mut self) {
        //Reset request is always supported by initialized decoder
        let result = Decoder::reset(self);
        debug_assert!(result.is_ok());
    }

    #[inline(always)]
    fn get_gain(&mut self) -> Result<i32, ErrorCode> {
        Decoder::get_gain(self)
    }

    #[inline(always)]
    fn set_gain(&mut self, value: i32) -> Result<(), ErrorCode> {
        Decoder::set_gain(self, value)
    }

    #[inline(always)]
    fn get_bandwidth(&mut self) -> Result<Bandwidth, ErrorCode> {
        Decoder::get_bandwidth(self)
    }

    #[inline(always)]
    fn get_sample_rate(&mut self) -> Result<SampleRate, ErrorCode> {
        Decoder::get_sample_rate(self)
    }

    #[inline(always)]
    fn get_last_packet_duration(&mut self) -> Result<u32, ErrorCode> {
        Decoder::get_last_packet_duration(self)
    }

    #[inline(always)]
    fn get_final_range(&mut self) -> Result<u32, ErrorCode> {
        Decoder::get_final_range(self)
    }

    #[inline(always)]
    fn get_phase_inversion_disabled(&mut self) -> Result<bool, ErrorCode> {
        Decoder::get_phase_inversion_disabled(self)
    }

    #[inline(always)]
    fn set_phase_inversion_disabled(&mut self, value: bool) -> Result<(), ErrorCode> {
        Decoder::set_phase_inversion_disabled(self, value)
    }
}

unsafe impl Send for Decoder {}
