// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// This trait allows for concrete instances to be serialized into
/// binary data as specified by the [Binary Data Serialization].
///
/// Serialization always happens in-memory, so the output buffer is
/// anything that can be extended with bytes and the operation cannot
/// fail.
///
/// [Binary Data Serialization]: https://core.telegram.org/mtproto/serialize
pub trait Serializable {
    /// Serializes the body into the provided buffer.
    fn serialize(&self, buf: &mut impl Extend<u8>);

    /// Convenience function to serialize the object into a new buffer
    /// and return its bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrogram_tl::Serializable;
    ///
    /// assert_eq!(true.to_bytes(), [0xb5, 0x75, 0x72, 0x99]);
    /// ```
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.serialize(&mut buffer);
        buffer
    }
}

/// Serializes the boolean according to the following definitions:
///
/// * `false` is serialized as `boolFalse#bc799737 = Bool;`.
/// * `true` is serialized as `boolTrue#997275b5 = Bool;`.
impl Serializable for bool {
    #[allow(clippy::unreadable_literal)]
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        if *self { 0x997275b5u32 } else { 0xbc799737u32 }.serialize(buf)
    }
}

/// Serializes the 32-bit signed integer according to the following
/// definition:
///
/// * `int ? = Int;`.
impl Serializable for i32 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// Serializes the 32-bit unsigned integer according to the following
/// definition:
///
/// * `int ? = Int;`.
impl Serializable for u32 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// Serializes the 64-bit signed integer according to the following
/// definition:
///
/// * `long ? = Long;`.
impl Serializable for i64 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// Serializes the 128-bit integer according to the following
/// definition:
///
/// * `int128 4*[ int ] = Int128;`.
impl Serializable for [u8; 16] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.iter().copied())
    }
}

/// Serializes the 256-bit integer according to the following
/// definition:
///
/// * `int256 8*[ int ] = Int256;`.
impl Serializable for [u8; 32] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.iter().copied())
    }
}

/// Serializes the 64-bit floating point according to the following
/// definition:
///
/// * `double ? = Double;`.
impl Serializable for f64 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// Serializes a vector of serializable items according to the
/// following definition:
///
/// * `vector#1cb5c415 {t:Type} # [ t ] = Vector t;`.
impl<T: Serializable> Serializable for Vec<T> {
    #[allow(clippy::unreadable_literal)]
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0x1cb5c415u32.serialize(buf);
        (self.len() as i32).serialize(buf);
        self.iter().for_each(|x| x.serialize(buf));
    }
}

/// Serializes a bare vector of serializable items (the `vector` type,
/// lacking the constructor identifier of `Vector`).
impl<T: Serializable> Serializable for crate::RawVec<T> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        (self.0.len() as i32).serialize(buf);
        self.0.iter().for_each(|x| x.serialize(buf));
    }
}

/// Serializes a UTF-8 string as a byte-string according to the
/// following definition:
///
/// * `string ? = String;`.
impl Serializable for String {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.as_bytes().serialize(buf)
    }
}

impl Serializable for &str {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.as_bytes().serialize(buf)
    }
}

impl Serializable for Vec<u8> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.as_slice().serialize(buf)
    }
}

/// Serializes a raw byte-string according to the following definition:
///
/// * `string ? = String;`.
///
/// Strings of up to 253 bytes carry a single length byte; longer ones
/// use the `0xfe` marker followed by a 24-bit length. Both forms are
/// padded with zero bytes to a multiple of four.
impl Serializable for &[u8] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let len = if self.len() <= 253 {
            buf.extend([self.len() as u8]);
            self.len() + 1
        } else {
            buf.extend([
                254,
                (self.len() & 0xff) as u8,
                ((self.len() >> 8) & 0xff) as u8,
                ((self.len() >> 16) & 0xff) as u8,
            ]);
            self.len()
        };

        buf.extend(self.iter().copied());
        (0..(4 - (len % 4)) % 4).for_each(|_| buf.extend([0]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_ints() {
        assert_eq!(1i32.to_bytes(), [0x01, 0x00, 0x00, 0x00]);
        assert_eq!((-1i32).to_bytes(), [0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            i64::MIN.to_bytes(),
            [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80]
        );
    }

    #[test]
    fn serialize_vec() {
        assert_eq!(
            Vec::<i32>::new().to_bytes(),
            [0x15, 0xc4, 0xb5, 0x1c, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            vec![0x7f_i32].to_bytes(),
            [0x15, 0xc4, 0xb5, 0x1c, 0x01, 0x00, 0x00, 0x00, 0x7f, 0x00, 0x00, 0x00]
        );
        assert_eq!(crate::RawVec(vec![0x7f_i32]).to_bytes()[..4], [1, 0, 0, 0]);
    }

    #[test]
    fn serialize_string() {
        fn test_string(string: &str, prefix: &[u8], suffix: &[u8]) {
            let bytes = {
                let mut tmp = prefix.to_vec();
                tmp.extend(string.as_bytes());
                tmp.extend(suffix);
                tmp
            };

            assert_eq!(string.to_bytes(), bytes);
            assert_eq!(bytes.len() % 4, 0);
        }

        test_string("", &[0x00], &[0x00, 0x00, 0x00]);
        test_string("Hi", &[0x02], &[0x00]);
        test_string("Hi!", &[0x03], &[]);
        test_string("Hello", &[0x05], &[0x00, 0x00]);
        test_string(
            &"x".repeat(254),
            &[0xfe, 0xfe, 0x00, 0x00],
            &[0x00, 0x00],
        );
    }
}
