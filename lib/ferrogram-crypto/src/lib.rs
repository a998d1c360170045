// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cryptographic building blocks used by the protocol layer: the
//! [`AuthKey`] shared with a datacenter, AES in IGE mode, and the
//! MTProto 2.0 payload transforms [`encrypt_data_v2`] and
//! [`decrypt_data_v2`].

pub mod aes;
mod auth_key;
pub mod sha;

use std::fmt;

pub use auth_key::AuthKey;
use getrandom::getrandom;

/// The error type for the decryption of server payloads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// The ciphertext is either too small or not padded correctly.
    InvalidBuffer,

    /// The payload carries the identifier of a different
    /// authorization key.
    AuthKeyMismatch,

    /// The message key embedded in the payload did not match the one
    /// recomputed from the plaintext.
    MessageKeyMismatch,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::InvalidBuffer => write!(f, "invalid ciphertext buffer length"),
            Error::AuthKeyMismatch => write!(f, "server authkey mismatches with ours"),
            Error::MessageKeyMismatch => write!(f, "server msgkey mismatches with ours"),
        }
    }
}

enum Side {
    Client,
    Server,
}

impl Side {
    // "where x = 0 for messages from client to server and x = 8 for
    // those from server to client."
    fn x(&self) -> usize {
        match *self {
            Side::Client => 0,
            Side::Server => 8,
        }
    }
}

/// Calculate the AES key and initialization vector following the
/// [MTProto 2.0 guidelines].
///
/// [MTProto 2.0 guidelines]: https://core.telegram.org/mtproto/description#defining-aes-key-and-initialization-vector
fn calc_key(auth_key: &AuthKey, msg_key: &[u8; 16], side: Side) -> ([u8; 32], [u8; 32]) {
    let x = side.x();

    // sha256_a = SHA256 (msg_key + substr (auth_key, x, 36));
    let sha256_a = sha256!(msg_key, &auth_key.data[x..x + 36]);

    // sha256_b = SHA256 (substr (auth_key, 40+x, 36) + msg_key);
    let sha256_b = sha256!(&auth_key.data[40 + x..40 + x + 36], msg_key);

    // aes_key = substr (sha256_a, 0, 8) + substr (sha256_b, 8, 16)
    //         + substr (sha256_a, 24, 8);
    let aes_key = {
        let mut buffer = [0; 32];
        buffer[0..8].copy_from_slice(&sha256_a[0..8]);
        buffer[8..24].copy_from_slice(&sha256_b[8..24]);
        buffer[24..32].copy_from_slice(&sha256_a[24..32]);
        buffer
    };

    // aes_iv = substr (sha256_b, 0, 8) + substr (sha256_a, 8, 16)
    //        + substr (sha256_b, 24, 8);
    let aes_iv = {
        let mut buffer = [0; 32];
        buffer[0..8].copy_from_slice(&sha256_b[0..8]);
        buffer[8..24].copy_from_slice(&sha256_a[8..24]);
        buffer[24..32].copy_from_slice(&sha256_b[24..32]);
        buffer
    };

    (aes_key, aes_iv)
}

/// Padding needed for a plaintext of a certain length:
///
/// > Note that MTProto 2.0 requires from 12 to 1024 bytes of padding
/// > [...] the resulting message length be divisible by 16 bytes
fn padding_v2_length(len: usize) -> usize {
    16 + (16 - (len % 16))
}

// Inner body of `encrypt_data_v2`, separated so tests can fix the padding.
fn do_encrypt_data_v2(plaintext: &[u8], auth_key: &AuthKey, random_padding: &[u8; 32]) -> Vec<u8> {
    let mut padded = Vec::with_capacity(plaintext.len() + padding_v2_length(plaintext.len()));
    padded.extend_from_slice(plaintext);
    padded.extend(
        random_padding
            .iter()
            .take(padding_v2_length(plaintext.len())),
    );

    // Encryption is done by the client.
    let side = Side::Client;
    let x = side.x();

    // msg_key_large = SHA256 (substr (auth_key, 88+x, 32)
    //               + plaintext + random_padding);
    let msg_key_large = sha256!(&auth_key.data[88 + x..88 + x + 32], &padded);

    // msg_key = substr (msg_key_large, 8, 16);
    let msg_key: [u8; 16] = msg_key_large[8..24].try_into().unwrap();

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    aes::ige_encrypt(&mut padded, &key, &iv);

    let mut result = Vec::with_capacity(8 + 16 + padded.len());
    result.extend_from_slice(&auth_key.key_id);
    result.extend_from_slice(&msg_key);
    result.extend_from_slice(&padded);
    result
}

/// Encrypts a plaintext payload following the [MTProto 2.0 algorithm],
/// producing `key_id + msg_key + ciphertext`.
///
/// [MTProto 2.0 algorithm]: https://core.telegram.org/mtproto/description
pub fn encrypt_data_v2(plaintext: &[u8], auth_key: &AuthKey) -> Vec<u8> {
    let random_padding = {
        let mut rnd = [0; 32];
        getrandom(&mut rnd).expect("failed to generate a secure padding");
        rnd
    };

    do_encrypt_data_v2(plaintext, auth_key, &random_padding)
}

/// The inverse of [`encrypt_data_v2`]; validates the key identifier
/// and the message key before returning the padded plaintext.
pub fn decrypt_data_v2(ciphertext: &[u8], auth_key: &AuthKey) -> Result<Vec<u8>, Error> {
    // Decryption is done from the server.
    let side = Side::Server;
    let x = side.x();

    if ciphertext.len() < 24 || (ciphertext.len() - 24) % 16 != 0 {
        return Err(Error::InvalidBuffer);
    }

    if auth_key.key_id != ciphertext[..8] {
        return Err(Error::AuthKeyMismatch);
    }

    let msg_key: [u8; 16] = ciphertext[8..24].try_into().unwrap();

    let (key, iv) = calc_key(auth_key, &msg_key, Side::Server);
    let plaintext = aes::ige_decrypt(&ciphertext[24..], &key, &iv);

    // https://core.telegram.org/mtproto/security_guidelines#mtproto-encrypted-messages
    let our_key = sha256!(&auth_key.data[88 + x..88 + x + 32], &plaintext);
    if msg_key != our_key[8..24] {
        return Err(Error::MessageKeyMismatch);
    }

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_auth_key() -> AuthKey {
        let mut buffer = [0u8; 256];
        buffer
            .iter_mut()
            .enumerate()
            .for_each(|(i, x)| *x = i as u8);

        AuthKey::from_bytes(buffer)
    }

    #[test]
    fn padding_fits_block_size() {
        for len in 0..256 {
            let padded = len + padding_v2_length(len);
            assert_eq!(padded % 16, 0);
            assert!(padded - len >= 12);
            assert!(padded - len <= 32);
        }
    }

    #[test]
    fn calc_client_key() {
        let auth_key = get_test_auth_key();
        let msg_key = {
            let mut buffer = [0u8; 16];
            buffer
                .iter_mut()
                .enumerate()
                .for_each(|(i, x)| *x = i as u8);
            buffer
        };
        let expected = (
            [
                112, 78, 208, 156, 139, 65, 102, 138, 232, 249, 157, 36, 71, 56, 247, 29, 189,
                220, 68, 70, 155, 107, 189, 74, 168, 87, 61, 208, 66, 189, 5, 158,
            ],
            [
                77, 38, 96, 0, 165, 80, 237, 171, 191, 76, 124, 228, 15, 208, 4, 60, 201, 34, 48,
                24, 76, 211, 23, 165, 204, 156, 36, 130, 253, 59, 147, 24,
            ],
        );
        assert_eq!(calc_key(&auth_key, &msg_key, Side::Client), expected);
    }

    #[test]
    fn encrypt_client_data_v2() {
        let plaintext = b"Hello, world! This data should remain secure!";
        let auth_key = get_test_auth_key();
        let random_padding = [0; 32];
        let expected = vec![
            50, 209, 88, 110, 164, 87, 223, 200, 168, 23, 41, 212, 109, 181, 64, 25, 162, 191,
            215, 247, 68, 249, 185, 108, 79, 113, 108, 253, 196, 71, 125, 178, 162, 193, 95, 109,
            219, 133, 35, 95, 185, 85, 47, 29, 132, 7, 198, 170, 234, 0, 204, 132, 76, 90, 27,
            246, 172, 68, 183, 155, 94, 220, 42, 35, 134, 139, 61, 96, 115, 165, 144, 153, 44, 15,
            41, 117, 36, 61, 86, 62, 161, 128, 210, 24, 238, 117, 124, 154,
        ];

        assert_eq!(
            do_encrypt_data_v2(plaintext, &auth_key, &random_padding),
            expected
        );
    }

    /// What the server does to a payload before sending it to us:
    /// the same transform as [`do_encrypt_data_v2`], keyed for the
    /// opposite direction.
    fn encrypt_as_server(plaintext: &[u8], auth_key: &AuthKey) -> Vec<u8> {
        let side = Side::Server;
        let x = side.x();

        let mut padded = plaintext.to_vec();
        padded.extend(std::iter::repeat(7).take(padding_v2_length(plaintext.len())));

        let msg_key_large = sha256!(&auth_key.data[88 + x..88 + x + 32], &padded);
        let msg_key: [u8; 16] = msg_key_large[8..24].try_into().unwrap();

        let (key, iv) = calc_key(auth_key, &msg_key, side);
        aes::ige_encrypt(&mut padded, &key, &iv);

        let mut result = Vec::with_capacity(24 + padded.len());
        result.extend_from_slice(&auth_key.key_id);
        result.extend_from_slice(&msg_key);
        result.extend_from_slice(&padded);
        result
    }

    #[test]
    fn decrypt_rejects_tampered_data() {
        let auth_key = get_test_auth_key();
        let mut payload = encrypt_as_server(b"round trip, please.-", &auth_key);

        // Strip the prefix and the length is no longer block-padded.
        assert_eq!(
            decrypt_data_v2(&payload[8..], &auth_key),
            Err(Error::InvalidBuffer)
        );

        // A different key has a different identifier.
        let mut other_key = [0u8; 256];
        other_key[0] = 0xff;
        assert_eq!(
            decrypt_data_v2(&payload, &AuthKey::from_bytes(other_key)),
            Err(Error::AuthKeyMismatch)
        );

        // Flip a ciphertext bit and the message key no longer matches.
        let last = payload.len() - 1;
        payload[last] ^= 0xff;
        assert_eq!(
            decrypt_data_v2(&payload, &auth_key),
            Err(Error::MessageKeyMismatch)
        );
    }

    #[test]
    fn decrypt_server_data_round_trip() {
        let auth_key = get_test_auth_key();
        let plaintext = b"round trip, please.."; // padded to 4 like real payloads
        let payload = encrypt_as_server(plaintext, &auth_key);
        let decrypted = decrypt_data_v2(&payload, &auth_key).unwrap();
        assert_eq!(&decrypted[..plaintext.len()], plaintext);
    }
}
