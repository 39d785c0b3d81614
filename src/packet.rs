//!Opus packet framing
//!
//!Parses packet structure as described in [RFC 6716 section 3.2](https://www.rfc-editor.org/rfc/rfc6716#section-3.2),
//!including self-delimiting framing from Appendix B which is used by every stream
//!of multistream packet except the last one.
//!
//!Self-delimited packets cannot be passed to libopus directly, therefore [Packet] remembers
//!location of the extra length field so that standard packet can be reconstructed.

use crate::{ErrorCode, SampleRate};

use alloc::vec::Vec;

///Maximum number of frames within single packet
pub const MAX_FRAMES: usize = 48;
///Maximum size of single frame in bytes
pub const MAX_FRAME_BYTES: usize = 1275;
//120ms at 48kHz
const MAX_PACKET_SAMPLES_48K: usize = 5760;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
///Structure of single (possibly self-delimited) Opus packet
pub struct Packet {
    toc: u8,
    count: usize,
    sizes: [u16; MAX_FRAMES],
    payload_offset: usize,
    len: usize,
    //Start and size of self-delimiting length field
    delimiter: Option<(usize, usize)>,
}

impl Packet {
    #[inline(always)]
    ///Returns TOC byte
    pub const fn toc(&self) -> u8 {
        self.toc
    }

    #[inline(always)]
    ///Returns number of frames within packet
    pub const fn frames(&self) -> usize {
        self.count
    }

    #[inline(always)]
    ///Returns size of each frame in bytes
    pub fn frame_sizes(&self) -> &[u16] {
        &self.sizes[..self.count]
    }

    #[inline(always)]
    ///Returns offset of the first frame's data
    pub const fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    #[inline(always)]
    ///Returns number of bytes occupied by this packet, including padding
    ///
    ///For self-delimited packet this is where next packet begins.
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    ///Returns whether packet was parsed with self-delimiting framing
    pub const fn is_self_delimited(&self) -> bool {
        self.delimiter.is_some()
    }

    ///Writes standard (non self-delimited) form of the packet into `out`.
    ///
    ///`data` must be the same buffer this packet was parsed from.
    ///
    ///`out` is cleared before writing.
    pub fn write_undelimited(&self, data: &[u8], out: &mut Vec<u8>) -> Result<(), ErrorCode> {
        let packet = match data.get(..self.len) {
            Some(packet) => packet,
            None => return Err(ErrorCode::bad_arg()),
        };

        out.clear();
        match self.delimiter {
            Some((start, size)) => {
                out.extend_from_slice(&packet[..start]);
                out.extend_from_slice(&packet[start + size..]);
            },
            None => out.extend_from_slice(packet),
        }
        Ok(())
    }
}

#[inline]
//Returns (number of bytes used, size)
fn parse_size(data: &[u8]) -> Option<(usize, usize)> {
    match data {
        [first, ..] if *first < 252 => Some((1, *first as usize)),
        [first, second, ..] => Some((2, 4 * (*second as usize) + *first as usize)),
        _ => None,
    }
}

///Parses packet structure.
///
///When `self_delimited` is `true`, packet is expected to carry extra length of its last frame
///and may be followed by unrelated data, which is left untouched.
///Otherwise whole `data` is considered to be the packet.
pub fn parse(data: &[u8], self_delimited: bool) -> Result<Packet, ErrorCode> {
    let toc = match data.first() {
        Some(toc) => *toc,
        None => return Err(ErrorCode::invalid_packet()),
    };
    let frame_samples = samples_per_frame(toc, SampleRate::Hz48000);

    let mut sizes = [0u16; MAX_FRAMES];
    //Invariant: pos + len + pad == data.len()
    let mut pos = 1usize;
    let mut len = data.len() - 1;
    let mut pad = 0usize;
    let mut last_size = len;
    let mut cbr = false;

    let count = match toc & 0x3 {
        0 => 1,
        1 => {
            cbr = true;
            if !self_delimited {
                if len & 0x1 != 0 {
                    return Err(ErrorCode::invalid_packet());
                }
                last_size = len / 2;
                //Oversized frame is rejected below
                sizes[0] = last_size as u16;
            }
            2
        },
        2 => {
            let (bytes, size) = match parse_size(&data[pos..pos + len]) {
                Some(result) => result,
                None => return Err(ErrorCode::invalid_packet()),
            };
            len -= bytes;
            if size > len {
                return Err(ErrorCode::invalid_packet());
            }
            pos += bytes;
            sizes[0] = size as u16;
            last_size = len - size;
            2
        },
        _ => {
            if len < 1 {
                return Err(ErrorCode::invalid_packet());
            }
            let ch = data[pos];
            pos += 1;
            len -= 1;

            let count = (ch & 0x3F) as usize;
            if count == 0 || frame_samples * count > MAX_PACKET_SAMPLES_48K {
                return Err(ErrorCode::invalid_packet());
            }

            if ch & 0x40 != 0 {
                loop {
                    if len == 0 {
                        return Err(ErrorCode::invalid_packet());
                    }
                    let padding = data[pos];
                    pos += 1;
                    len -= 1;

                    let padding_size = match padding {
                        255 => 254,
                        padding => padding as usize,
                    };
                    len = match len.checked_sub(padding_size) {
                        Some(len) => len,
                        None => return Err(ErrorCode::invalid_packet()),
                    };
                    pad += padding_size;

                    if padding != 255 {
                        break;
                    }
                }
            }

            cbr = ch & 0x80 == 0;
            if !cbr {
                last_size = len;
                for size_slot in sizes.iter_mut().take(count - 1) {
                    let (bytes, size) = match parse_size(&data[pos..pos + len]) {
                        Some(result) => result,
                        None => return Err(ErrorCode::invalid_packet()),
                    };
                    len -= bytes;
                    if size > len {
                        return Err(ErrorCode::invalid_packet());
                    }
                    pos += bytes;
                    *size_slot = size as u16;
                    last_size = match last_size.checked_sub(bytes + size) {
                        Some(last_size) => last_size,
                        None => return Err(ErrorCode::invalid_packet()),
                    };
                }
            } else if !self_delimited {
                last_size = len / count;
                if last_size * count != len {
                    return Err(ErrorCode::invalid_packet());
                }
                sizes[..count - 1].fill(last_size as u16);
            }

            count
        }
    };

    let delimiter = if self_delimited {
        let (bytes, size) = match parse_size(&data[pos..pos + len]) {
            Some(result) => result,
            None => return Err(ErrorCode::invalid_packet()),
        };
        len -= bytes;
        if size > len {
            return Err(ErrorCode::invalid_packet());
        }

        if cbr {
            if size * count > len {
                return Err(ErrorCode::invalid_packet());
            }
            sizes[..count - 1].fill(size as u16);
        } else if bytes + size > last_size {
            return Err(ErrorCode::invalid_packet());
        }
        sizes[count - 1] = size as u16;

        let delimiter = (pos, bytes);
        pos += bytes;
        Some(delimiter)
    } else {
        //Size of the last frame is implicit so it can exceed frame limit
        if last_size > MAX_FRAME_BYTES {
            return Err(ErrorCode::invalid_packet());
        }
        sizes[count - 1] = last_size as u16;
        None
    };

    let frames_size: usize = sizes[..count].iter().map(|size| *size as usize).sum();

    Ok(Packet {
        toc,
        count,
        sizes,
        payload_offset: pos,
        len: pos + frames_size + pad,
        delimiter,
    })
}

///Returns number of samples per frame for packet with specified TOC byte
pub const fn samples_per_frame(toc: u8, rate: SampleRate) -> usize {
    let rate = rate as usize;
    if toc & 0x80 != 0 {
        //CELT only: 2.5, 5, 10 or 20ms
        (rate << ((toc >> 3) & 0x3)) / 400
    } else if toc & 0x60 == 0x60 {
        //Hybrid: 10 or 20ms
        match toc & 0x08 {
            0 => rate / 100,
            _ => rate / 50,
        }
    } else {
        //SILK only: 10, 20, 40 or 60ms
        match (toc >> 3) & 0x3 {
            3 => rate * 60 / 1000,
            size => (rate << size) / 100,
        }
    }
}

///Gets the number of frames in an Opus packet.
pub fn get_nb_frames(input: &[u8]) -> Result<usize, ErrorCode> {
    match input {
        [] => Err(ErrorCode::bad_arg()),
        [toc, ..] if toc & 0x3 == 0 => Ok(1),
        [toc, count, ..] if toc & 0x3 == 3 => Ok((count & 0x3F) as usize),
        [toc] if toc & 0x3 == 3 => Err(ErrorCode::invalid_packet()),
        _ => Ok(2),
    }
}

///Gets the number of samples of an Opus packet.
///
///Fails with `InvalidPacket` if packet claims more than 120ms of audio
pub fn get_nb_samples(input: &[u8], rate: SampleRate) -> Result<usize, ErrorCode> {
    let frames = get_nb_frames(input)?;
    let samples = frames * samples_per_frame(input[0], rate);
    if samples * 25 > (rate as usize) * 3 {
        Err(ErrorCode::invalid_packet())
    } else {
        Ok(samples)
    }
}
