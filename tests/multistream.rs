use opusic_ms::{multistream, version, Bandwidth, Channels, Decoder, ErrorCode, SampleRate};

mod common;
use common::*;

const FRAME_SIZE: usize = 960;

fn reference_decode(channels: Channels, packet: &[u8]) -> (Vec<i16>, u32) {
    let mut decoder = Decoder::new(SampleRate::Hz48000, channels).expect("create reference decoder");
    let mut output = vec![0i16; FRAME_SIZE * channels as usize];
    let len = decoder.decode_to_slice(packet, &mut output, false).expect("reference decode");
    assert_eq!(len, FRAME_SIZE);
    let range = decoder.get_final_range().expect("get final range");
    (output, range)
}

#[test]
fn should_assert_libopus_version() {
    assert_eq!(version(), "libopus 1.5.2");
}

#[test]
fn should_create_stream_decoders_according_to_layout() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 6, 4, 2, &[0, 4, 1, 2, 3, 5]).expect("create");
    assert_eq!(decoder.channels(), 6);
    assert_eq!(decoder.streams(), 4);
    assert_eq!(decoder.coupled_streams(), 2);

    for idx in 0..4 {
        let stream = decoder.stream_decoder(idx).expect("stream decoder");
        let expected = if idx < 2 { Channels::Stereo } else { Channels::Mono };
        assert_eq!(stream.channels(), expected, "stream {}", idx);
    }
    assert!(decoder.stream_decoder(4).is_none());

    assert_eq!(decoder.get_sample_rate().expect("get sample rate"), SampleRate::Hz48000);
    assert_eq!(decoder.get_gain().expect("get gain"), 0);
}

#[test]
fn should_reject_invalid_layout() {
    let cases: &[(usize, usize, usize, &[u8])] = &[
        (0, 1, 0, &[]),
        (256, 1, 0, &[0; 256]),
        (2, 0, 0, &[255, 255]),
        (2, 1, 2, &[0, 1]),
        (2, 3, 0, &[0, 1]),
        (255, 200, 100, &[255; 255]),
        //mapping is shorter than number of channels
        (3, 1, 1, &[0, 1]),
        //mapping refers to non-existing stream
        (2, 1, 1, &[0, 2]),
        (2, 1, 0, &[0, 1]),
    ];

    for (channels, streams, coupled_streams, mapping) in cases {
        let error = multistream::Decoder::new(SampleRate::Hz48000, *channels, *streams, *coupled_streams, mapping).err().expect("should fail");
        assert_eq!(error, ErrorCode::BadArg, "channels={} streams={} coupled_streams={}", channels, streams, coupled_streams);
    }
}

#[test]
fn should_decode_mono_stream_with_muted_channel() {
    let packet = celt_packet(MONO_20MS, 60, 7);
    let (expected, _) = reference_decode(Channels::Mono, &packet);

    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 2, 1, 0, &[0, 255]).expect("create");
    let mut output = [i16::MAX; FRAME_SIZE * 2];
    let len = decoder.decode_to_slice(&packet, &mut output, false).expect("decode");
    assert_eq!(len, FRAME_SIZE);

    assert_eq!(channel(&output, 2, 0), expected);
    assert!(channel(&output, 2, 1).iter().all(|sample| *sample == 0), "Muted channel must be silent");
}

#[test]
fn should_decode_stereo_stream_in_order() {
    let packet = celt_packet(STEREO_20MS, 80, 3);
    let (expected, _) = reference_decode(Channels::Stereo, &packet);

    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 2, 1, 1, &[0, 1]).expect("create");
    let mut output = [0i16; FRAME_SIZE * 2];
    let len = decoder.decode_to_slice(&packet, &mut output, false).expect("decode");
    assert_eq!(len, FRAME_SIZE);
    assert_eq!(&output[..], &expected[..]);

    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 2, 1, 1, &[1, 0]).expect("create");
    let len = decoder.decode_to_slice(&packet, &mut output, false).expect("decode");
    assert_eq!(len, FRAME_SIZE);
    assert_eq!(channel(&output, 2, 0), channel(&expected, 2, 1));
    assert_eq!(channel(&output, 2, 1), channel(&expected, 2, 0));
}

#[test]
fn should_decode_float_output() {
    let packet = celt_packet(STEREO_20MS, 80, 11);
    let (expected, _) = reference_decode(Channels::Stereo, &packet);

    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 3, 1, 1, &[1, 255, 0]).expect("create");
    let mut output = [1.0f32; FRAME_SIZE * 3];
    let len = decoder.decode_float_to_slice(&packet, &mut output, false).expect("decode");
    assert_eq!(len, FRAME_SIZE);

    for (frame, expected) in output.chunks_exact(3).zip(expected.chunks_exact(2)) {
        assert_eq!(frame[0], expected[1] as f32 / 32768.0);
        assert_eq!(frame[1], 0.0);
        assert_eq!(frame[2], expected[0] as f32 / 32768.0);
    }
}

#[test]
fn should_decode_multiple_streams() {
    let stereo = celt_packet(STEREO_20MS, 70, 1);
    let mono = celt_packet(MONO_20MS, 40, 2);
    let (expected_stereo, stereo_range) = reference_decode(Channels::Stereo, &stereo);
    let (expected_mono, mono_range) = reference_decode(Channels::Mono, &mono);
    let packet = multistream_packet(&[stereo, mono]);

    //Mono stream is duplicated into last channel
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 5, 2, 1, &[0, 2, 1, 255, 2]).expect("create");
    let mut output = vec![i16::MIN; FRAME_SIZE * 5];
    let len = decoder.decode(&packet, &mut output, FRAME_SIZE, false).expect("decode");
    assert_eq!(len, FRAME_SIZE);

    assert_eq!(channel(&output, 5, 0), channel(&expected_stereo, 2, 0));
    assert_eq!(channel(&output, 5, 1), expected_mono);
    assert_eq!(channel(&output, 5, 2), channel(&expected_stereo, 2, 1));
    assert!(channel(&output, 5, 3).iter().all(|sample| *sample == 0));
    assert_eq!(channel(&output, 5, 4), expected_mono);

    assert_eq!(decoder.get_final_range().expect("get final range"), stereo_range ^ mono_range);
    assert_eq!(decoder.get_last_packet_duration().expect("get duration"), FRAME_SIZE as u32);
    assert_eq!(decoder.get_bandwidth().expect("get bandwidth"), Bandwidth::Full);
    assert_eq!(decoder.get_nb_samples(&packet).expect("get duration"), FRAME_SIZE);
}

#[test]
fn should_produce_same_final_range_for_same_input() {
    let packet = multistream_packet(&[
        celt_packet(STEREO_20MS, 90, 5),
        celt_packet(MONO_20MS, 50, 6),
        celt_packet(MONO_20MS, 30, 7),
    ]);

    let mut ranges = Vec::new();
    for _ in 0..2 {
        let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 4, 3, 1, &[0, 1, 2, 3]).expect("create");
        let mut output = [0f32; FRAME_SIZE * 4];
        decoder.decode_float_to_slice(&packet, &mut output, false).expect("decode");
        ranges.push(decoder.get_final_range().expect("get final range"));
    }
    assert_eq!(ranges[0], ranges[1]);
}

#[test]
fn should_conceal_packet_loss() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 3, 2, 1, &[0, 255, 2]).expect("create");
    let mut output = [i16::MAX; FRAME_SIZE * 3];

    //Nothing was decoded yet, so concealment can only produce silence
    let len = decoder.decode_to_slice(&[], &mut output, false).expect("conceal");
    assert_eq!(len, FRAME_SIZE);
    assert!(output.iter().all(|sample| *sample == 0));

    let packet = multistream_packet(&[celt_packet(STEREO_20MS, 70, 9), celt_packet(MONO_20MS, 40, 10)]);
    decoder.decode_to_slice(&packet, &mut output, false).expect("decode");

    output.fill(i16::MAX);
    let len = decoder.decode(&[], &mut output, 480, false).expect("conceal");
    assert_eq!(len, 480);
    assert!(channel(&output, 3, 1)[..480].iter().all(|sample| *sample == 0), "Muted channel must be silent");
    assert!(channel(&output, 3, 1)[480..].iter().all(|sample| *sample == i16::MAX), "Only requested frame is written");
}

#[test]
fn should_reset_every_stream() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 2, 2, 0, &[0, 1]).expect("create");
    let mut output = [0i16; FRAME_SIZE * 2];
    let packet = multistream_packet(&[celt_packet(MONO_20MS, 40, 1), celt_packet(MONO_20MS, 40, 2)]);
    decoder.decode_to_slice(&packet, &mut output, false).expect("decode");

    decoder.reset();

    output.fill(i16::MAX);
    let len = decoder.decode_to_slice(&[], &mut output, false).expect("conceal");
    assert_eq!(len, FRAME_SIZE);
    assert!(output.iter().all(|sample| *sample == 0), "After reset there is nothing to conceal");
}

#[test]
fn should_reject_malformed_packets() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 3, 3, 0, &[0, 1, 2]).expect("create");
    let mut output = [0i16; FRAME_SIZE * 3];

    let error = decoder.decode_to_slice(&[MONO_20MS, 0, MONO_20MS, 0], &mut output, false).expect_err("too short");
    assert_eq!(error, ErrorCode::InvalidPacket);

    let packet = multistream_packet(&[
        celt_packet(MONO_20MS, 40, 1),
        celt_packet(MONO_10MS, 40, 2),
        celt_packet(MONO_20MS, 40, 3),
    ]);
    let error = decoder.decode_to_slice(&packet, &mut output, false).expect_err("durations differ");
    assert_eq!(error, ErrorCode::InvalidPacket);

    let mut packet = self_delimited(&celt_packet(MONO_20MS, 40, 1));
    packet.extend_from_slice(&self_delimited(&celt_packet(MONO_20MS, 40, 2)));
    let error = decoder.decode_to_slice(&packet, &mut output, false).expect_err("missing stream");
    assert_eq!(error, ErrorCode::InvalidPacket);

    //Validation happens before any stream is touched
    assert_eq!(decoder.get_last_packet_duration().expect("get duration"), 0);
}

#[test]
fn should_reject_insufficient_frame_size() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 1, 1, 0, &[0]).expect("create");
    let packet = celt_packet(MONO_20MS, 40, 1);

    let mut output = [0i16; 480];
    let error = decoder.decode_to_slice(&packet, &mut output, false).expect_err("20ms does not fit into 10ms");
    assert_eq!(error, ErrorCode::BufferTooSmall);

    let mut output = [0i16; FRAME_SIZE];
    let error = decoder.decode(&packet, &mut output, FRAME_SIZE * 2, false).expect_err("output is smaller than frame size");
    assert_eq!(error, ErrorCode::BadArg);

    //Frame size is limited to 120ms
    let mut output = vec![0i16; SampleRate::Hz48000.max_frame_size()];
    let len = decoder.decode(&packet, &mut output, usize::MAX, false).expect("decode");
    assert_eq!(len, FRAME_SIZE);
}

#[test]
fn should_configure_gain_of_every_stream() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 3, 2, 1, &[0, 1, 2]).expect("create");

    decoder.set_gain(1000).expect("set gain");
    assert_eq!(decoder.get_gain().expect("get gain"), 1000);
    for idx in 0..decoder.streams() {
        let stream = decoder.stream_decoder_mut(idx).expect("stream decoder");
        assert_eq!(stream.get_gain().expect("get gain"), 1000, "stream {}", idx);
    }

    let error = decoder.set_gain(40000).expect_err("gain is out of range");
    assert_eq!(error, ErrorCode::BadArg);
    assert_eq!(decoder.get_gain().expect("get gain"), 1000);

    decoder.reset();
    assert_eq!(decoder.get_gain().expect("get gain"), 1000, "Gain survives reset");
}

#[test]
fn should_configure_phase_inversion_of_every_stream() {
    let mut decoder = multistream::Decoder::new(SampleRate::Hz48000, 3, 2, 1, &[0, 1, 2]).expect("create");
    assert!(!decoder.get_phase_inversion_disabled().expect("get phase inversion status"));

    decoder.set_phase_inversion_disabled(true).expect("update phase inversion");
    for idx in 0..decoder.streams() {
        let stream = decoder.stream_decoder_mut(idx).expect("stream decoder");
        assert!(stream.get_phase_inversion_disabled().expect("get phase inversion status"), "stream {}", idx);
    }
}
