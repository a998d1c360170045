// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use super::{Error, Transport, UnpackedOffset};

/// A light MTProto transport protocol that guarantees data padded to
/// 4 bytes. This is an implementation of the [intermediate transport].
///
/// * Overhead: small.
/// * Minimum envelope length: 4 bytes.
/// * Maximum envelope length: 4 bytes.
///
/// It serializes the input payload as follows:
///
/// ```text
/// +----+----...----+
/// | len|  payload  |
/// +----+----...----+
///  ^^^^ 4 bytes
/// ```
///
/// [intermediate transport]: https://core.telegram.org/mtproto/mtproto-transports#intermediate
pub struct Intermediate {
    init: bool,
}

#[allow(clippy::new_without_default)]
impl Intermediate {
    const TAG: [u8; 4] = 0xee_ee_ee_ee_u32.to_le_bytes();

    /// The largest length this transport is willing to unpack,
    /// matching the limit the protocol layer would refuse anyway.
    const MAXIMUM_LEN: i32 = 2 * 1024 * 1024;

    pub fn new() -> Self {
        Self { init: false }
    }
}

impl Transport for Intermediate {
    fn pack(&mut self, input: &[u8], output: &mut Vec<u8>) {
        assert_eq!(input.len() % 4, 0);

        if !self.init {
            output.extend_from_slice(&Self::TAG);
            self.init = true;
        }

        output.extend_from_slice(&(input.len() as i32).to_le_bytes());
        output.extend_from_slice(input);
    }

    fn unpack(&mut self, input: &[u8]) -> Result<UnpackedOffset, Error> {
        if input.len() < 4 {
            return Err(Error::MissingBytes);
        }

        let len = i32::from_le_bytes(input[0..4].try_into().unwrap());
        if !(0..=Self::MAXIMUM_LEN).contains(&len) {
            return Err(Error::BadLen { got: len });
        }

        let len = len as usize;
        if input.len() < 4 + len {
            return Err(Error::MissingBytes);
        }

        Ok(UnpackedOffset {
            data_start: 4,
            data_end: 4 + len,
            next_offset: 4 + len,
        })
    }

    fn reset(&mut self) {
        log::info!("resetting sending of header in intermediate transport");
        self.init = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_pack(n: usize) -> (Intermediate, Vec<u8>) {
        let input = (0..n).map(|x| (x & 0xff) as u8).collect();
        (Intermediate::new(), input)
    }

    #[test]
    fn pack_sends_tag_only_once() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
        assert_eq!(&packed[..8], &[0xee, 0xee, 0xee, 0xee, 128, 0, 0, 0]);
        assert_eq!(&packed[8..], &input[..]);

        packed.clear();
        transport.pack(&input, &mut packed);
        assert_eq!(&packed[..4], &[128, 0, 0, 0]);
    }

    #[test]
    #[should_panic]
    fn pack_non_padded_panics() {
        let (mut transport, input) = setup_pack(7);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);
    }

    #[test]
    fn unpack_waits_for_full_payload() {
        let mut transport = Intermediate::new();
        assert_eq!(transport.unpack(&[1]), Err(Error::MissingBytes));
        assert_eq!(
            transport.unpack(&[8, 0, 0, 0, 1, 2, 3]),
            Err(Error::MissingBytes)
        );
    }

    #[test]
    fn unpack_normal() {
        let (mut transport, input) = setup_pack(128);
        let mut packed = Vec::new();
        transport.pack(&input, &mut packed);

        let n = 4; // init tag
        let offset = transport.unpack(&packed[n..]).unwrap();
        assert_eq!(&packed[n..][offset.data_start..offset.data_end], &input[..]);
        assert_eq!(offset.next_offset, 4 + input.len());
    }

    #[test]
    fn unpack_status_frame_is_data() {
        let mut transport = Intermediate::new();
        let mut frame = vec![4, 0, 0, 0];
        frame.extend((-404_i32).to_le_bytes());

        let offset = transport.unpack(&frame).unwrap();
        assert_eq!(&frame[offset.data_start..offset.data_end], &frame[4..8]);
    }

    #[test]
    fn unpack_rejects_bad_len() {
        let mut transport = Intermediate::new();
        let frame = (-1_i32).to_le_bytes();
        assert_eq!(transport.unpack(&frame), Err(Error::BadLen { got: -1 }));
    }
}
