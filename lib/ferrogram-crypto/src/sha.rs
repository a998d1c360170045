// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Variadic helpers to hash a concatenation of byte slices without
//! building the concatenation first.

#[macro_export]
macro_rules! sha1 (
    ( $( $x:expr ),* ) => {{
        use sha1::{Digest, Sha1};
        let mut hasher = Sha1::new();
        $(
            hasher.update($x);
        )+
        let sha: [u8; 20] = hasher.finalize().into();
        sha
    }}
);

#[macro_export]
macro_rules! sha256 (
    ( $( $x:expr ),* ) => {{
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        $(
            hasher.update($x);
        )+
        let sha: [u8; 32] = hasher.finalize().into();
        sha
    }}
);

#[cfg(test)]
mod tests {
    #[test]
    fn concatenation_matches_single_update() {
        assert_eq!(sha256!(b"hello", b" ", b"world"), sha256!(b"hello world"));
        assert_eq!(sha1!(b"hello", b" ", b"world"), sha1!(b"hello world"));
    }
}
