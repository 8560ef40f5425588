//! # sdcred-vc — Selectively Disclosable Credentials
//!
//! The credential protocol, in SD-JWT form:
//!
//! - **Digest engine** (`disclosure.rs`): salted per-claim commitments and
//!   digest recomputation.
//! - **Claims** (`claims.rs`): the explicit visible/disclosable partition.
//! - **Credential codec** (`credential.rs`, `presentation.rs`, `codec.rs`):
//!   issuance, holder-side selection and binding, wire parsing.
//! - **Format registry** (`registry.rs`): format name to codec, plus the
//!   stateless issue/present/verify surface.
//! - **Verification** (`verify.rs`): signature, disclosure, holder-binding,
//!   audience and validity-window checks.
//!
//! ## Security Invariant
//!
//! Signed payloads and disclosures go through `sdcred_core::CanonicalBytes`.
//! Digests are always recomputed over the received token bytes.
//!
//! ## Crate Policy
//!
//! - Depends on `sdcred-core` and `sdcred-crypto` internally.
//! - No shared mutable state. Trust and nonce state live in
//!   `sdcred-verifier`.

pub mod claims;
pub mod codec;
pub mod credential;
pub mod disclosure;
pub mod error;
pub mod presentation;
pub mod registry;
pub mod verify;

pub use claims::{Claim, ClaimSet, RESERVED_CLAIMS};
pub use codec::{CredentialCodec, KeyBundle, SdJwtCodec};
pub use credential::{Confirmation, CorePayload, Credential, IssuanceRequest};
pub use disclosure::{commit, recompute, Commitment, Disclosure};
pub use error::{CredentialError, VerificationError};
pub use presentation::{HolderBinding, KbClaims, Presentation};
pub use registry::FormatRegistry;
pub use verify::{
    CheckedPresentation, IssuerKeyResolver, VerificationPolicy, VerificationResult, VerifiedClaims,
};
