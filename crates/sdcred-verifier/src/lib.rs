//! # sdcred-verifier — Relying-Party Verification
//!
//! The stateful side of credential verification:
//!
//! - **Trust registry** (`trust.rs`): issuer id to trusted Ed25519 key.
//! - **Nonce ledger** (`nonce.rs`): single-use, expiring challenges.
//! - **Verification engine** (`engine.rs`): the full pipeline, with nonce
//!   consumption between the cryptographic checks and the validity window.
//! - **Session binding** (`policy.rs`): ties a verified credential to the
//!   authenticated session.
//! - **Submit service** (`service.rs`): credential requests and submission
//!   outcomes for a relying party.
//! - **Configuration** (`config.rs`): YAML/JSON verifier settings.
//!
//! ## Security Invariant
//!
//! A nonce is consumed at most once, and only by a presentation that has
//! already passed signature, disclosure, holder-binding and audience checks.
//!
//! ## Crate Policy
//!
//! Shared state is `Arc<parking_lot::…>` behind cheap-to-clone handles. No
//! lock is held across a call into the codec.

pub mod config;
pub mod engine;
pub mod nonce;
pub mod policy;
pub mod service;
pub mod trust;

pub use config::{ConfigError, TrustedIssuerConfig, VerifierConfig, CONFIG_ENV_VAR};
pub use engine::{EngineSettings, VerificationEngine};
pub use nonce::{Nonce, NonceError, NonceLedger, DEFAULT_NONCE_TTL_SECS};
pub use policy::{check_session_binding, SessionBindingError, SessionIdentity};
pub use service::{CredentialCheckService, CredentialRequest, SubmissionError, SubmissionOutcome};
pub use trust::{IssuerRecord, TrustRegistry};
