//! # Issued Credentials
//!
//! The signed core payload and the issuer-side inputs that shape it.
//!
//! ## Payload Layout
//!
//! ```json
//! {
//!   "iss": "did:example:issuer",
//!   "sub": "holder-1",
//!   "iat": 1700000000,
//!   "exp": 1731536000,
//!   "cnf": {"jwk": {"kty": "OKP", "crv": "Ed25519", "x": "..."}},
//!   "_sd": ["<digest>", "..."],
//!   "_sd_alg": "sha-256",
//!   "nationality": "AT"
//! }
//! ```
//!
//! Always-visible claims sit next to the protocol members. Selectively
//! disclosable claims appear only as digests in `_sd`.

use sdcred_core::{DigestAlgorithm, IssuerId, SubjectId, Timestamp};
use sdcred_crypto::{Ed25519PublicKey, PublicJwk};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::disclosure::Disclosure;
use crate::presentation::SEPARATOR;

/// `typ` header of the issuer-signed token.
pub const SD_JWT_TYP: &str = "sd+jwt";

/// Holder key confirmation (RFC 7800 `cnf`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// The holder's public key.
    pub jwk: PublicJwk,
}

/// The claims signed by the issuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorePayload {
    /// Issuer identity.
    pub iss: IssuerId,
    /// Subject identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<SubjectId>,
    /// Intended audience when no holder binding is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Holder binding key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnf: Option<Confirmation>,
    /// Digests of the selectively disclosable claims (and decoys).
    #[serde(rename = "_sd", default)]
    pub sd: Vec<String>,
    /// Hash algorithm for `_sd`.
    #[serde(rename = "_sd_alg", default = "default_sd_alg")]
    pub sd_alg: DigestAlgorithm,
    /// Always-visible claims.
    #[serde(flatten)]
    pub visible: Map<String, Value>,
}

fn default_sd_alg() -> DigestAlgorithm {
    DigestAlgorithm::Sha256
}

impl CorePayload {
    /// The holder key this payload is bound to, if any.
    pub fn holder_jwk(&self) -> Option<&PublicJwk> {
        self.cnf.as_ref().map(|c| &c.jwk)
    }
}

/// Issuer-side parameters for one issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuanceRequest {
    /// Issuer identity placed in `iss`.
    pub issuer: IssuerId,
    /// Subject identity placed in `sub`.
    pub subject: Option<SubjectId>,
    /// Audience placed in `aud`.
    pub audience: Option<String>,
    /// Holder key placed in `cnf`.
    pub holder_key: Option<PublicJwk>,
    /// Issuance time.
    pub issued_at: Timestamp,
    /// Lifetime in seconds. `None` issues a credential without `exp`.
    pub valid_for_secs: Option<i64>,
    /// Number of decoy digests appended to `_sd`.
    pub decoys: usize,
}

impl IssuanceRequest {
    /// A request issued now, with no subject, holder binding or expiry.
    pub fn new(issuer: IssuerId) -> Self {
        Self {
            issuer,
            subject: None,
            audience: None,
            holder_key: None,
            issued_at: Timestamp::now(),
            valid_for_secs: None,
            decoys: 0,
        }
    }

    /// Set `sub`.
    pub fn with_subject(mut self, subject: SubjectId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Set `aud`, checked when the presentation carries no binding proof.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Bind the credential to a holder key.
    pub fn with_holder_key(mut self, key: &Ed25519PublicKey) -> Self {
        self.holder_key = Some(PublicJwk::from_public_key(key));
        self
    }

    /// Override the issuance time.
    pub fn issued_at(mut self, at: Timestamp) -> Self {
        self.issued_at = at;
        self
    }

    /// Set `exp` to `secs` after issuance, saturating at the latest
    /// representable time.
    pub fn valid_for(mut self, secs: i64) -> Self {
        self.valid_for_secs = Some(secs);
        self
    }

    /// Append `count` decoy digests to `_sd`.
    pub fn with_decoys(mut self, count: usize) -> Self {
        self.decoys = count;
        self
    }
}

/// An issued credential: the signed core token, its decoded payload and
/// every disclosure created at issuance.
///
/// Immutable once issued. The holder stores it with [`to_wire`](Self::to_wire)
/// and selects disclosures from it when presenting.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    issuer_token: String,
    payload: CorePayload,
    disclosures: Vec<Disclosure>,
}

impl Credential {
    pub(crate) fn new(issuer_token: String, payload: CorePayload, disclosures: Vec<Disclosure>) -> Self {
        Self {
            issuer_token,
            payload,
            disclosures,
        }
    }

    /// The issuer-signed compact JWS.
    pub fn issuer_token(&self) -> &str {
        &self.issuer_token
    }

    /// The signed payload.
    pub fn payload(&self) -> &CorePayload {
        &self.payload
    }

    /// All disclosures, in issuance order.
    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }

    pub fn issuer(&self) -> &IssuerId {
        &self.payload.iss
    }

    pub fn subject(&self) -> Option<&SubjectId> {
        self.payload.sub.as_ref()
    }

    /// Keys of the claims that can be requested for disclosure.
    pub fn claim_keys(&self) -> Vec<&str> {
        self.disclosures.iter().map(Disclosure::key).collect()
    }

    /// `core~d1~...~dn~`, the form a holder stores.
    pub fn to_wire(&self) -> String {
        let mut wire = self.issuer_token.clone();
        wire.push(SEPARATOR);
        for d in &self.disclosures {
            wire.push_str(d.encoded());
            wire.push(SEPARATOR);
        }
        wire
    }
}
