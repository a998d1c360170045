// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The plaintext half of the protocol, only used while negotiating an
//! authorization key, and the seam through which the negotiation
//! itself is injected.
use crate::errors::InvocationError;
use crate::net::Connection;
use ferrogram_mtproto::{check_message_buffer, DeserializeError};
use ferrogram_tl::{Cursor, Deserializable, Serializable};
use std::future::Future;

/// The outcome of a successful authorization-key negotiation.
pub struct AuthInfo {
    /// The 2048-bit key shared with the datacenter.
    pub auth_key: [u8; 256],
    /// Seconds to add to our clock to line up with the server's.
    pub time_offset: i32,
    /// The first salt to use for encrypted messages.
    pub first_salt: i64,
}

/// Negotiates an authorization key over a [`PlainSender`].
///
/// The sender invokes this exactly once, while connecting without a
/// previous key; the Diffie-Hellman exchange itself lives behind this
/// trait.
pub trait Authenticator<C: Connection>: Send {
    fn authenticate(
        self,
        sender: &mut PlainSender<'_, C>,
    ) -> impl Future<Output = Result<AuthInfo, InvocationError>> + Send;
}

impl<C, F, Fut> Authenticator<C> for F
where
    C: Connection,
    F: FnOnce(&mut PlainSender<'_, C>) -> Fut + Send,
    Fut: Future<Output = Result<AuthInfo, InvocationError>> + Send,
{
    fn authenticate(
        self,
        sender: &mut PlainSender<'_, C>,
    ) -> impl Future<Output = Result<AuthInfo, InvocationError>> + Send {
        self(sender)
    }
}

/// A reduced sender for [unencrypted messages], which borrows the
/// connection for the duration of the handshake.
///
/// Strictly sequential: one request, one reply.
///
/// [unencrypted messages]: https://core.telegram.org/mtproto/description#unencrypted-message
pub struct PlainSender<'a, C: Connection> {
    conn: &'a C,
}

impl<'a, C: Connection> PlainSender<'a, C> {
    pub(crate) fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Wraps a serialized request into a plain message, sends it, and
    /// returns the body of the server's reply.
    pub async fn invoke(&mut self, request: &[u8]) -> Result<Vec<u8>, InvocationError> {
        let mut buffer = Vec::with_capacity(20 + request.len());
        0i64.serialize(&mut buffer); // auth_key_id = 0
        // There is no need to generate a valid `msg_id` here, it
        // seems. The server echoes a good one back.
        0i64.serialize(&mut buffer); // message_id
        (request.len() as i32).serialize(&mut buffer); // message_data_length
        buffer.extend_from_slice(request); // message_data

        self.conn.send(&buffer).await?;
        let payload = self.conn.recv().await?;

        check_message_buffer(&payload)?;
        let mut buf = Cursor::from_slice(&payload);

        let auth_key_id = i64::deserialize(&mut buf).map_err(DeserializeError::from)?;
        if auth_key_id != 0 {
            return Err(DeserializeError::BadAuthKey {
                got: auth_key_id,
                expected: 0,
            }
            .into());
        }

        // We can't validate the identifier is close to our system
        // time because our system time may be wrong at this point (it
        // only matters once encrypted communication begins). However:
        //
        // > server message identifiers modulo 4 yield 1 if the
        // > message is a response to a client message
        let msg_id = i64::deserialize(&mut buf).map_err(DeserializeError::from)?;
        if msg_id <= 0 || (msg_id % 4) != 1 {
            return Err(DeserializeError::BadMessageId { got: msg_id }.into());
        }

        let len = i32::deserialize(&mut buf).map_err(DeserializeError::from)?;
        if len <= 0 {
            return Err(DeserializeError::NegativeMessageLength { got: len }.into());
        }
        if (20 + len) as usize > payload.len() {
            return Err(DeserializeError::TooLongMessageLength {
                got: len as usize,
                max_length: payload.len() - 20,
            }
            .into());
        }

        Ok(payload[20..20 + len as usize].to_vec())
    }
}
