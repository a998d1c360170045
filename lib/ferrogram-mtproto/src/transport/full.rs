// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use super::{Error, Transport, UnpackedOffset};
use crc32fast::Hasher;

/// The basic MTProto transport protocol. This is an implementation of
/// the [full transport].
///
/// * Overhead: medium.
/// * Minimum envelope length: 12 bytes.
/// * Maximum envelope length: 12 bytes.
///
/// It serializes the input payload as follows:
///
/// ```text
/// +----+----+----...----+----+
/// | len| seq|  payload  | crc|
/// +----+----+----...----+----+
///  ^^^^ 4 bytes
/// ```
///
/// [full transport]: https://core.telegram.org/mtproto/mtproto-transports#full
pub struct Full {
    send_seq: i32,
    recv_seq: i32,
}

#[allow(clippy::new_without_default)]
impl Full {
    pub fn new() -> Self {
        Self {
            send_seq: 0,
            recv_seq: 0,
        }
    }
}

impl Transport for Full {
    fn pack(&mut self, input: &[u8], output: &mut Vec<u8>) {
        assert_eq!(input.len() % 4, 0);

        // payload len + length itself (4 bytes) + send counter (4 bytes) + crc32 (4 bytes)
        let len = (input.len() as i32) + 4 + 4 + 4;

        let header_start = output.len();
        output.extend_from_slice(&len.to_le_bytes());
        output.extend_from_slice(&self.send_seq.to_le_bytes());
        output.extend_from_slice(input);

        let crc = {
            let mut hasher = Hasher::new();
            hasher.update(&output[header_start..]);
            hasher.finalize()
        };
        output.extend_from_slice(&crc.to_le_bytes());

        self.send_seq += 1;
    }

    fn unpack(&mut self, input: &[u8]) -> Result<UnpackedOffset, Error> {
        // Need 4 bytes for the initial length.
        if input.len() < 4 {
            return Err(Error::MissingBytes);
        }

        let len = i32::from_le_bytes(input[0..4].try_into().unwrap());
        if len < 12 {
            return Err(Error::BadLen { got: len });
        }

        if (input.len() as i32) < len {
            return Err(Error::MissingBytes);
        }

        let seq = i32::from_le_bytes(input[4..8].try_into().unwrap());
        if seq != self.recv_seq {
            return Err(Error::BadSeq {
                expected: self.recv_seq,
                got: seq,
            });
        }

        let len = len as usize;
        let crc = u32::from_le_bytes(input[len - 4..len].try_into().unwrap());
        let valid_crc = {
            let mut hasher = Hasher::new();
            hasher.update(&input[0..len - 4]);
            hasher.finalize()
        };
        if crc != valid_crc {
            return Err(Error::BadCrc {
                expected: valid_crc,
                got: crc,
            });
        }

        self.recv_seq += 1;
        Ok(UnpackedOffset {
            data_start: 8,
            data_end: len - 4,
            next_offset: len,
        })
    }

    fn reset(&mut self) {
        self.send_seq = 0;
        self.recv_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_pack(n: usize) -> (Full, Vec<u8>) {
        let input = (0..n).map(|x| (x & 0xff) as u8).collect();
        (Full::new(), input)
    }

    #[test]
    fn pack_empty() {
        let (mut transport, input) = setup_pack(0);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
        assert_eq!(&packed, &[12, 0, 0, 0, 0, 0, 0, 0, 38, 202, 141, 50]);
    }

    #[test]
    #[should_panic]
    fn pack_non_padded_panics() {
        let (mut transport, input) = setup_pack(7);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
    }

    #[test]
    fn pack_twice_increments_sequence() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
        packed.clear();
        transport.pack(&input, &mut packed);

        assert_eq!(&packed[..4], &[140, 0, 0, 0]);
        assert_eq!(&packed[4..8], &[1, 0, 0, 0]);
        assert_eq!(&packed[8..8 + input.len()], &input[..]);
        assert_eq!(&packed[8 + input.len()..], &[150, 9, 240, 74]);
    }

    #[test]
    fn unpack_round_trip() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);

        let offset = transport.unpack(&packed).unwrap();
        assert_eq!(&packed[offset.data_start..offset.data_end], &input[..]);
        assert_eq!(offset.next_offset, packed.len());
    }

    #[test]
    fn unpack_two_at_once() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
        let single_size = packed.len();
        transport.pack(&input, &mut packed);

        let offset = transport.unpack(&packed).unwrap();
        assert_eq!(&packed[offset.data_start..offset.data_end], &input[..]);
        assert_eq!(offset.next_offset, single_size);

        let offset = transport.unpack(&packed[single_size..]).unwrap();
        assert_eq!(
            &packed[single_size..][offset.data_start..offset.data_end],
            &input[..]
        );
    }

    #[test]
    fn unpack_bad_seq() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
        packed[4] = 1;

        assert_eq!(
            transport.unpack(&packed),
            Err(Error::BadSeq {
                expected: 0,
                got: 1,
            })
        );
    }

    #[test]
    fn unpack_bad_crc() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
        let len = packed.len();
        packed[len - 1] ^= 0xff;

        assert_eq!(
            transport.unpack(&packed),
            Err(Error::BadCrc {
                expected: 932541318,
                got: 3365237638,
            })
        );
    }
}
