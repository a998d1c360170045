// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! AES-256 in [Infinite Garble Extension] mode, the block mode used
//! by MTProto. The mode is not provided by RustCrypto, so it is built
//! here on top of the raw block cipher.
//!
//! [Infinite Garble Extension]: https://www.links.org/files/openssl-ige.pdf

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use std::mem;

/// Encrypt the input plaintext in-place using the AES-IGE mode.
///
/// # Panics
///
/// Panics if the buffer is not padded to the block size (16 bytes).
pub fn ige_encrypt(buffer: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    assert!(buffer.len() % 16 == 0);

    let cipher = aes::Aes256::new(GenericArray::from_slice(key));

    let mut plaintext_block = [0; 16];
    let mut iv1: [u8; 16] = iv[..16].try_into().unwrap();
    let mut iv2: [u8; 16] = iv[16..].try_into().unwrap();

    for block in buffer.chunks_mut(16) {
        plaintext_block.copy_from_slice(block);

        // block = encrypt(block XOR iv1) XOR iv2
        block
            .iter_mut()
            .zip(iv1)
            .for_each(|(x, b)| *x ^= b);

        let block = GenericArray::from_mut_slice(block);
        cipher.encrypt_block(block);

        block
            .iter_mut()
            .zip(iv2)
            .for_each(|(x, b)| *x ^= b);

        // next iv1 is the ciphertext, next iv2 the old plaintext
        iv1.copy_from_slice(block);
        mem::swap(&mut iv2, &mut plaintext_block);
    }
}

/// Decrypt the input ciphertext using the AES-IGE mode.
///
/// # Panics
///
/// Panics if the input is not padded to the block size (16 bytes).
pub fn ige_decrypt(ciphertext: &[u8], key: &[u8; 32], iv: &[u8; 32]) -> Vec<u8> {
    assert!(ciphertext.len() % 16 == 0);
    let mut plaintext = vec![0; ciphertext.len()];

    let cipher = aes::Aes256::new(GenericArray::from_slice(key));
    let mut iv = *iv;
    let (iv1, iv2) = iv.split_at_mut(16);

    for (cipher_block, plain_block) in ciphertext.chunks(16).zip(plaintext.chunks_mut(16)) {
        // block = decrypt(block XOR iv2) XOR iv1
        plain_block
            .iter_mut()
            .zip(cipher_block)
            .zip(iv2.iter())
            .for_each(|((a, x), b)| *a = x ^ b);

        let plain_block = GenericArray::from_mut_slice(plain_block);
        cipher.decrypt_block(plain_block);

        plain_block
            .iter_mut()
            .zip(iv1.iter())
            .for_each(|(a, b)| *a ^= b);

        iv1.copy_from_slice(cipher_block);
        iv2.copy_from_slice(plain_block);
    }

    plaintext
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_key_or_iv() -> [u8; 32] {
        let mut buffer = [0u8; 32];
        buffer
            .iter_mut()
            .enumerate()
            .for_each(|(i, x)| *x = i as u8);

        buffer
    }

    #[test]
    fn verify_ige_encryption() {
        let mut buffer = get_test_key_or_iv(); // encrypting the key with itself
        let key = get_test_key_or_iv();
        let iv = get_test_key_or_iv();
        let expected = [
            226, 129, 18, 165, 62, 92, 137, 199, 177, 234, 128, 113, 193, 51, 105, 159, 212, 232,
            107, 38, 196, 186, 201, 252, 90, 241, 171, 140, 226, 122, 68, 164,
        ];

        ige_encrypt(&mut buffer, &key, &iv);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn verify_ige_decryption() {
        let ciphertext = get_test_key_or_iv(); // decrypting the key with itself
        let key = get_test_key_or_iv();
        let iv = get_test_key_or_iv();
        let expected = vec![
            229, 119, 122, 250, 205, 123, 44, 22, 247, 172, 64, 202, 230, 30, 246, 3, 254, 230, 9,
            143, 184, 168, 134, 10, 185, 238, 103, 44, 215, 229, 186, 204,
        ];

        assert_eq!(ige_decrypt(&ciphertext, &key, &iv), expected);
    }

    #[test]
    fn ige_round_trip() {
        let original: Vec<u8> = (0u8..64).collect();
        let key = get_test_key_or_iv();
        let iv = get_test_key_or_iv();

        let mut buffer = original.clone();
        ige_encrypt(&mut buffer, &key, &iv);
        assert_ne!(buffer, original);
        assert_eq!(ige_decrypt(&buffer, &key, &iv), original);
    }
}
