///Output sample format of multistream decoder
///
///Streams are always decoded into 16 bit samples, which are then converted
///into output format when copied to the output channel.
pub trait Sample: Copy {
    ///Value written into muted channels
    const SILENCE: Self;

    ///Converts decoded sample
    fn from_i16(sample: i16) -> Self;
}

impl Sample for i16 {
    const SILENCE: Self = 0;

    #[inline(always)]
    fn from_i16(sample: i16) -> Self {
        sample
    }
}

impl Sample for f32 {
    const SILENCE: Self = 0.0;

    #[inline(always)]
    fn from_i16(sample: i16) -> Self {
        (1.0 / 32768.0) * sample as f32
    }
}

///Copies `frame_size` samples into channel `dst_channel` of interleaved `dst` buffer with `dst_stride` channels.
///
///Source is taken every `src_stride` samples of `src`, starting from its first sample.
///When `src` is `None`, channel is filled with silence.
///
///Panics if `src_stride` is zero.
pub fn copy_channel_out<T: Sample>(dst: &mut [T], dst_stride: usize, dst_channel: usize, src: Option<(&[i16], usize)>, frame_size: usize) {
    let frames = dst.chunks_exact_mut(dst_stride).take(frame_size);

    match src {
        Some((src, src_stride)) => for (frame, sample) in frames.zip(src.iter().step_by(src_stride)) {
            frame[dst_channel] = T::from_i16(*sample);
        },
        None => for frame in frames {
            frame[dst_channel] = T::SILENCE;
        },
    }
}
