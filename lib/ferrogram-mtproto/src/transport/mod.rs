// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Implementation of the several [MTProto transports], the codecs that
//! delimit message payloads on a byte stream.
//!
//! Transport-level status frames (a bare 4-byte payload) are passed
//! through as data so the layer above can interpret the code.
//!
//! [MTProto transports]: https://core.telegram.org/mtproto/mtproto-transports

mod full;
mod intermediate;

use std::fmt;

pub use full::Full;
pub use intermediate::Intermediate;

/// The location of a single unpacked payload within the input buffer,
/// and where the next packet begins.
#[derive(Clone, Debug, PartialEq)]
pub struct UnpackedOffset {
    pub data_start: usize,
    pub data_end: usize,
    pub next_offset: usize,
}

/// The error type reported by the different transports when something
/// is wrong.
///
/// Unless the variant is [`Error::MissingBytes`], the connection
/// should not continue.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Not enough bytes are provided yet to unpack a full payload.
    MissingBytes,

    /// The length is either too short or too long to represent a
    /// valid packet.
    BadLen { got: i32 },

    /// The sequence number received does not match the expected value.
    BadSeq { expected: i32, got: i32 },

    /// The checksum of the packet does not match its expected value.
    BadCrc { expected: u32, got: u32 },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: ")?;
        match self {
            Error::MissingBytes => write!(f, "need more bytes"),
            Error::BadLen { got } => write!(f, "bad len (got {})", got),
            Error::BadSeq { expected, got } => {
                write!(f, "bad seq (expected {}, got {})", expected, got)
            }
            Error::BadCrc { expected, got } => {
                write!(f, "bad crc (expected {}, got {})", expected, got)
            }
        }
    }
}

/// The trait used by the transports to pack outgoing payloads into
/// delimited packets, and to find payload boundaries in incoming
/// bytes.
pub trait Transport: Send {
    /// Packs the input payload and appends the result to `output`.
    ///
    /// # Panics
    ///
    /// The method panics if the input length is not padded to 4 bytes.
    fn pack(&mut self, input: &[u8], output: &mut Vec<u8>);

    /// Finds the next payload in `input`, returning where it is and
    /// where the following packet starts.
    fn unpack(&mut self, input: &[u8]) -> Result<UnpackedOffset, Error>;

    /// Resets the state of the transport, as done when the
    /// underlying socket is replaced.
    fn reset(&mut self);
}
