//! # sdcred-crypto
//!
//! Signing primitives for selectively disclosable credentials:
//!
//! - [`ed25519`]: key pairs, public keys and signatures.
//! - [`jwk`]: RFC 8037 OKP public keys and RFC 7638 thumbprints.
//! - [`jws`]: compact JWS encoding and verification behind the
//!   [`TokenSigner`] capability.
//! - [`random`]: salts and nonces from the OS CSPRNG.
//!
//! Everything signed here goes through `sdcred_core::CanonicalBytes`.

pub mod ed25519;
pub mod error;
pub mod jwk;
pub mod jws;
pub mod random;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey};
pub use error::CryptoError;
pub use jwk::PublicJwk;
pub use jws::{decode, decode_unverified, encode, DecodedToken, JwsAlgorithm, JwsHeader, TokenSigner};
pub use random::{generate_nonce, generate_salt};
