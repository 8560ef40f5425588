//! # sdcred-core — Foundational Types
//!
//! The leaf of the sdcred crate DAG. Defines the primitives every other
//! crate builds on:
//!
//! 1. **`CanonicalBytes`.** All bytes that get hashed or signed as JSON flow
//!    through `CanonicalBytes::new()`, which produces RFC 8785 (JCS) output.
//!    Issuer, holder and verifier can never disagree on an encoding.
//!
//! 2. **`ContentDigest`.** SHA-256 digests with an algorithm tag and the
//!    base64url rendering used on the wire.
//!
//! 3. **`Timestamp`.** UTC-only, seconds precision. Credential `iat`/`exp`
//!    and nonce expiry are all compared as `Timestamp`s.
//!
//! 4. **Identifier newtypes.** `IssuerId` and `SubjectId` are validated at
//!    construction. No bare strings cross crate boundaries as identities.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sdcred-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_token_digest, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{IssuerId, SubjectId};
pub use temporal::Timestamp;
