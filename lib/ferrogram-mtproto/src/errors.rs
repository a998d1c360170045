// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors that can occur while deserializing server messages.

use ferrogram_crypto as crypto;
use ferrogram_tl as tl;
use std::fmt;

/// The error type for the deserialization of server messages.
#[derive(Clone, Debug, PartialEq)]
pub enum DeserializeError {
    /// The server sent a bare transport-level status instead of a
    /// message. The code is the absolute value of an HTTP-like status.
    /// Some known, possible codes are:
    ///
    /// * 404, if the authorization key used was not found, meaning
    ///   that the server is not aware of the key used by the client,
    ///   so it cannot be used to securely communicate with it.
    ///
    /// * 429, if too many transport connections are established to
    ///   the same IP address in a too-short lapse of time.
    TransportFrame { code: i32 },

    /// The received buffer is too small to contain a valid response
    /// message, or the response seemed valid at first but trying to
    /// deserialize it proved the buffer to be too small.
    MessageBufferTooSmall,

    /// The server's authorization key did not match our expectations.
    BadAuthKey { got: i64, expected: i64 },

    /// The server's message ID did not match our expectations.
    BadMessageId { got: i64 },

    /// The session identifier in the decrypted payload was not ours,
    /// which would mean the payload was not meant for this session.
    SessionIdMismatch { got: i64 },

    /// The server's message length was not strictly positive.
    NegativeMessageLength { got: i32 },

    /// The server's message length was past the buffer.
    TooLongMessageLength { got: usize, max_length: usize },

    /// The server responded with compressed data which we failed to
    /// decompress.
    DecompressionFailed,

    /// While deserializing the response types one of them had a
    /// constructor that did not match our expectations. The invalid
    /// ID is contained within this variant.
    UnexpectedConstructor { id: u32 },

    /// Attempting to decrypt the message failed in some way.
    Decryption(crypto::Error),
}

impl DeserializeError {
    /// Whether the error signals a payload that failed validation and
    /// should be dropped without trusting any of its contents.
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Self::Decryption(crypto::Error::AuthKeyMismatch)
                | Self::Decryption(crypto::Error::MessageKeyMismatch)
                | Self::SessionIdMismatch { .. }
                | Self::BadMessageId { .. }
        )
    }
}

impl std::error::Error for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TransportFrame { code } => {
                write!(f, "transport-level error, http status code: {}", code)
            }
            Self::MessageBufferTooSmall => write!(
                f,
                "server responded with a payload that's too small to fit a valid message"
            ),
            Self::BadAuthKey { got, expected } => write!(
                f,
                "bad server auth key (got {}, expected {})",
                got, expected
            ),
            Self::BadMessageId { got } => write!(f, "bad server message id (got {})", got),
            Self::SessionIdMismatch { got } => {
                write!(f, "bad server session id (got {})", got)
            }
            Self::NegativeMessageLength { got } => {
                write!(f, "bad server message length (got {})", got)
            }
            Self::TooLongMessageLength { got, max_length } => write!(
                f,
                "bad server message length (got {}, when at most it should be {})",
                got, max_length
            ),
            Self::DecompressionFailed => write!(f, "failed to decompress server's data"),
            Self::UnexpectedConstructor { id } => write!(f, "unexpected constructor: {:08x}", id),
            Self::Decryption(ref error) => write!(f, "failed to decrypt message: {}", error),
        }
    }
}

impl From<tl::deserialize::Error> for DeserializeError {
    fn from(error: tl::deserialize::Error) -> Self {
        use tl::deserialize::Error as Err;

        match error {
            Err::UnexpectedEof => DeserializeError::MessageBufferTooSmall,
            Err::UnexpectedConstructor { id } => DeserializeError::UnexpectedConstructor { id },
        }
    }
}

impl From<crypto::Error> for DeserializeError {
    fn from(error: crypto::Error) -> Self {
        Self::Decryption(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_classification() {
        assert!(DeserializeError::SessionIdMismatch { got: 1 }.is_security());
        assert!(DeserializeError::Decryption(crypto::Error::MessageKeyMismatch).is_security());
        assert!(!DeserializeError::TransportFrame { code: 404 }.is_security());
        assert!(!DeserializeError::UnexpectedConstructor { id: 1 }.is_security());
    }
}
