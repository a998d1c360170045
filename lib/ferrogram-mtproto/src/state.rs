// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::errors::DeserializeError;
use crate::manual_tl::Message;
use crate::MsgId;
use ferrogram_crypto::{decrypt_data_v2, encrypt_data_v2, AuthKey};
use ferrogram_tl::{Cursor, Deserializable, Serializable};
use getrandom::getrandom;
use std::time::{SystemTime, UNIX_EPOCH};

/// A builder to configure [`MtpState`] instances.
///
/// Use the [`MtpState::build`] method to create builder instances.
pub struct MtpStateBuilder {
    time_offset: i32,
    first_salt: i64,
    security_checks: bool,
}

/// The per-connection protocol state: everything needed to turn
/// request bodies into encrypted messages and back.
///
/// This type holds no queues and performs no I/O; it is driven
/// entirely by its owner.
pub struct MtpState {
    /// The authorization key used to encrypt and decrypt payload.
    auth_key: AuthKey,

    /// The time offset from the server's time, in seconds.
    time_offset: i32,

    /// The current salt to be used when encrypting payload.
    salt: i64,

    /// The secure, random identifier for this session.
    session_id: i64,

    /// The current message sequence number.
    sequence: i32,

    /// The ID of the last message issued.
    last_msg_id: i64,

    /// Whether decrypted payloads get strict validation beyond what
    /// decryption itself guarantees.
    security_checks: bool,
}

fn generate_session_id() -> i64 {
    let mut buffer = [0u8; 8];
    getrandom(&mut buffer).expect("failed to generate a secure session_id");
    i64::from_le_bytes(buffer)
}

impl MtpStateBuilder {
    /// Configures the time offset to Telegram servers.
    pub fn time_offset(mut self, offset: i32) -> Self {
        self.time_offset = offset;
        self
    }

    /// Configures the first salt to use for encrypted payloads.
    pub fn first_salt(mut self, first_salt: i64) -> Self {
        self.first_salt = first_salt;
        self
    }

    /// Configures whether strict payload validation is performed.
    pub fn security_checks(mut self, security_checks: bool) -> Self {
        self.security_checks = security_checks;
        self
    }

    /// Finishes the builder and returns the [`MtpState`] with all the
    /// configuration changes applied.
    pub fn finish(self, auth_key: [u8; 256]) -> MtpState {
        MtpState {
            auth_key: AuthKey::from_bytes(auth_key),
            time_offset: self.time_offset,
            salt: self.first_salt,
            session_id: generate_session_id(),
            sequence: 0,
            last_msg_id: 0,
            security_checks: self.security_checks,
        }
    }
}

impl MtpState {
    /// Start building a new state.
    pub fn build() -> MtpStateBuilder {
        MtpStateBuilder {
            time_offset: 0,
            first_salt: 0,
            security_checks: true,
        }
    }

    /// The authorization key used for encryption and decryption.
    pub fn auth_key(&self) -> [u8; 256] {
        self.auth_key.to_bytes()
    }

    /// The current server salt.
    pub fn salt(&self) -> i64 {
        self.salt
    }

    /// Installs a new server salt, as instructed by the server.
    pub fn set_salt(&mut self, salt: i64) {
        self.salt = salt;
    }

    /// The identifier of the current session.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// The current time offset to the server's clock, in seconds.
    pub fn time_offset(&self) -> i32 {
        self.time_offset
    }

    /// Generates a new unique message ID based on the current time
    /// (in ms) since epoch, applying a known time offset.
    ///
    /// Identifiers are strictly increasing for as long as the state
    /// lives, even across [`MtpState::reset`].
    pub fn new_msg_id(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time is before epoch");

        let seconds = (now.as_secs() as i32 + self.time_offset) as u64;
        let nanoseconds = now.subsec_nanos() as u64;
        let mut new_msg_id = ((seconds << 32) | (nanoseconds << 2)) as i64;

        if self.last_msg_id >= new_msg_id {
            new_msg_id = self.last_msg_id + 4;
        }

        self.last_msg_id = new_msg_id;
        new_msg_id
    }

    /// Corrects the time offset based on a message ID known to be
    /// valid (i.e. one just produced by the server), so that future
    /// identifiers line up with the server's clock.
    ///
    /// Returns the new offset in seconds.
    pub fn update_time_offset(&mut self, correct_msg_id: i64) -> i32 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time is before epoch")
            .as_secs() as i32;

        let correct = (correct_msg_id >> 32) as i32;
        self.time_offset = correct - now;
        self.time_offset
    }

    /// Generates the next sequence number depending on whether it
    /// should be for a content-related message or not.
    pub fn next_seq_no(&mut self, content_related: bool) -> i32 {
        if content_related {
            self.sequence += 2;
            self.sequence - 1
        } else {
            self.sequence
        }
    }

    /// Nudges the sequence counter by the given amount, as the
    /// recovery path for bad-msg-notifications 32 and 33.
    pub fn shift_sequence(&mut self, delta: i32) {
        self.sequence += delta;
    }

    /// Rolls the session: a fresh random session ID and a sequence
    /// counter starting over. Message identifiers keep increasing so
    /// their process-wide monotonicity holds.
    pub fn reset(&mut self) {
        self.session_id = generate_session_id();
        self.sequence = 0;
    }

    /// Appends `body` to `buf` framed as a message (identifier,
    /// sequence number and length), and returns the assigned ID.
    pub fn write_message(
        &mut self,
        buf: &mut Vec<u8>,
        body: &[u8],
        content_related: bool,
    ) -> MsgId {
        let msg_id = self.new_msg_id();
        msg_id.serialize(buf);
        self.next_seq_no(content_related).serialize(buf);
        (body.len() as i32).serialize(buf);
        buf.extend_from_slice(body);
        MsgId(msg_id)
    }

    /// Encrypts a full message payload (one message, or a container
    /// of them), prefixing the current salt and session ID.
    pub fn encrypt_message_data(&self, payload: &[u8]) -> Vec<u8> {
        let mut plaintext = Vec::with_capacity(16 + payload.len());
        self.salt.serialize(&mut plaintext);
        self.session_id.serialize(&mut plaintext);
        plaintext.extend_from_slice(payload);

        encrypt_data_v2(&plaintext, &self.auth_key)
    }

    /// Decrypts a payload received from the server and returns the
    /// message it contains.
    ///
    /// The payload must pass decryption-level validation (correct key
    /// identifier and message key), belong to this session, and, with
    /// security checks enabled, carry a plausible server identifier.
    pub fn decrypt_message_data(&self, ciphertext: &[u8]) -> Result<Message, DeserializeError> {
        crate::utils::check_message_buffer(ciphertext)?;

        let plaintext = decrypt_data_v2(ciphertext, &self.auth_key)?;
        let mut buffer = Cursor::from_slice(&plaintext);

        let _salt = i64::deserialize(&mut buffer)?;
        let session_id = i64::deserialize(&mut buffer)?;
        if session_id != self.session_id {
            return Err(DeserializeError::SessionIdMismatch { got: session_id });
        }

        let message = Message::deserialize(&mut buffer)?;
        if self.security_checks && message.msg_id % 2 != 1 {
            // Server message identifiers are odd; an even one cannot
            // be a response and is likely a replay.
            return Err(DeserializeError::BadMessageId {
                got: message.msg_id,
            });
        }

        Ok(message)
    }
}
