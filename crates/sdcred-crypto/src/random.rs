//! Salts and nonces from the OS CSPRNG.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand_core::{OsRng, RngCore};

/// Random bytes per disclosure salt (128 bits).
pub const SALT_BYTES: usize = 16;

/// Random bytes per verifier challenge nonce (256 bits).
pub const NONCE_BYTES: usize = 32;

/// A fresh base64url disclosure salt.
pub fn generate_salt() -> String {
    random_b64url::<SALT_BYTES>()
}

/// A fresh base64url challenge nonce.
pub fn generate_nonce() -> String {
    random_b64url::<NONCE_BYTES>()
}

fn random_b64url<const N: usize>() -> String {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn salt_has_expected_length() {
        let salt = generate_salt();
        assert_eq!(Base64UrlUnpadded::decode_vec(&salt).unwrap().len(), SALT_BYTES);
        assert_eq!(salt.len(), 22);
    }

    #[test]
    fn nonce_has_expected_length() {
        let nonce = generate_nonce();
        assert_eq!(Base64UrlUnpadded::decode_vec(&nonce).unwrap().len(), NONCE_BYTES);
        assert_eq!(nonce.len(), 43);
    }

    #[test]
    fn values_do_not_repeat() {
        let salts: HashSet<String> = (0..256).map(|_| generate_salt()).collect();
        assert_eq!(salts.len(), 256);
        let nonces: HashSet<String> = (0..256).map(|_| generate_nonce()).collect();
        assert_eq!(nonces.len(), 256);
    }
}
