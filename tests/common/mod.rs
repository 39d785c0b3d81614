#![allow(dead_code)]

//CELT only fullband 20ms, code 0
pub const MONO_20MS: u8 = 0xF8;
pub const STEREO_20MS: u8 = 0xFC;
//CELT only fullband 10ms, code 0
pub const MONO_10MS: u8 = 0xF0;

///Builds single frame packet with deterministic pseudo-random payload
pub fn celt_packet(toc: u8, size: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let mut packet = Vec::with_capacity(size + 1);
    packet.push(toc);
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        packet.push((state >> 16) as u8);
    }
    packet
}

///Converts single frame (code 0) packet into self-delimited form
pub fn self_delimited(packet: &[u8]) -> Vec<u8> {
    let frame = &packet[1..];
    let mut result = Vec::with_capacity(packet.len() + 2);
    result.push(packet[0]);
    match frame.len() {
        len if len < 252 => result.push(len as u8),
        len => {
            let first = 252 + (len & 0x3);
            result.push(first as u8);
            result.push(((len - first) / 4) as u8);
        }
    }
    result.extend_from_slice(frame);
    result
}

///Concatenates packets of each stream into multistream packet
pub fn multistream_packet(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut result = Vec::new();
    for (idx, packet) in packets.iter().enumerate() {
        match idx + 1 == packets.len() {
            true => result.extend_from_slice(packet),
            false => result.extend_from_slice(&self_delimited(packet)),
        }
    }
    result
}

///Extracts channel `channel` out of interleaved buffer
pub fn channel<T: Copy>(output: &[T], channels: usize, channel: usize) -> Vec<T> {
    output.chunks_exact(channels).map(|frame| frame[channel]).collect()
}
