//! # Credential Codecs
//!
//! [`CredentialCodec`] is the per-format capability the registry dispatches
//! to. [`SdJwtCodec`] implements it for SD-JWT with Ed25519 keys.

use std::collections::BTreeSet;

use sdcred_core::Timestamp;
use sdcred_crypto::{jws, Ed25519KeyPair, Ed25519PublicKey, TokenSigner};

use crate::claims::ClaimSet;
use crate::credential::{Confirmation, CorePayload, Credential, IssuanceRequest, SD_JWT_TYP};
use crate::disclosure::{commit, decoy_digest, recompute, Disclosure};
use crate::error::{CredentialError, VerificationError};
use crate::presentation::{
    split_wire, HolderBinding, KbClaims, Presentation, KB_JWT_TYP, MAX_DISCLOSURES,
};
use crate::verify::{check_presentation, CheckedPresentation, IssuerKeyResolver, VerificationPolicy};

/// Freshly generated keys for one issuer and one holder.
#[derive(Debug)]
pub struct KeyBundle {
    pub issuer_key: Ed25519KeyPair,
    pub holder_key: Ed25519KeyPair,
    pub issuer_public_key: Ed25519PublicKey,
}

/// One credential format: issuance, presentation and the stateless part of
/// verification.
///
/// Implementations hold no per-call mutable state.
pub trait CredentialCodec: Send + Sync {
    /// The name this codec is normally registered under.
    fn format_name(&self) -> &str;

    /// Generate an issuer key pair and a holder key pair.
    fn generate_keys(&self) -> KeyBundle;

    /// Sign a credential over `claims`.
    fn issue(
        &self,
        claims: &ClaimSet,
        request: &IssuanceRequest,
        issuer_key: &dyn TokenSigner,
    ) -> Result<Credential, CredentialError>;

    /// Re-read a credential the holder stored with [`Credential::to_wire`].
    fn parse_credential(&self, wire: &str) -> Result<Credential, CredentialError>;

    /// Select the disclosures for `disclosed_keys` and, if the credential is
    /// holder-bound, sign a binding proof.
    fn present(
        &self,
        credential: &Credential,
        disclosed_keys: &[&str],
        binding: Option<HolderBinding<'_>>,
    ) -> Result<Presentation, CredentialError>;

    /// Parse a wire string into a presentation.
    fn parse(&self, wire: &str) -> Result<Presentation, VerificationError>;

    /// Verification stages 2 to 5.
    fn check(
        &self,
        presentation: &Presentation,
        issuers: &dyn IssuerKeyResolver,
        policy: &VerificationPolicy,
        now: Timestamp,
    ) -> Result<CheckedPresentation, VerificationError>;
}

/// SD-JWT with EdDSA signatures and SHA-256 disclosure digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdJwtCodec;

impl SdJwtCodec {
    /// Registry name.
    pub const FORMAT: &'static str = "sd-jwt";

    pub fn new() -> Self {
        Self
    }
}

impl CredentialCodec for SdJwtCodec {
    fn format_name(&self) -> &str {
        Self::FORMAT
    }

    fn generate_keys(&self) -> KeyBundle {
        let issuer_key = Ed25519KeyPair::generate();
        let issuer_public_key = issuer_key.public_key();
        KeyBundle {
            issuer_key,
            holder_key: Ed25519KeyPair::generate(),
            issuer_public_key,
        }
    }

    fn issue(
        &self,
        claims: &ClaimSet,
        request: &IssuanceRequest,
        issuer_key: &dyn TokenSigner,
    ) -> Result<Credential, CredentialError> {
        let disclosable = claims.iter().filter(|c| c.disclosable).count();
        if disclosable.saturating_add(request.decoys) > MAX_DISCLOSURES {
            return Err(CredentialError::Encoding(format!(
                "at most {MAX_DISCLOSURES} digests per credential"
            )));
        }
        if let Some(jwk) = &request.holder_key {
            jwk.to_public_key()?;
        }

        let mut sd = Vec::with_capacity(disclosable + request.decoys);
        let mut disclosures = Vec::with_capacity(disclosable);
        let mut visible = serde_json::Map::new();
        for claim in claims.iter() {
            if claim.disclosable {
                let commitment = commit(&claim.key, &claim.value)?;
                sd.push(commitment.digest);
                disclosures.push(commitment.disclosure);
            } else {
                visible.insert(claim.key.clone(), claim.value.clone());
            }
        }
        sd.extend((0..request.decoys).map(|_| decoy_digest()));

        let payload = CorePayload {
            iss: request.issuer.clone(),
            sub: request.subject.clone(),
            aud: request.audience.clone(),
            iat: request.issued_at.epoch_secs(),
            exp: request
                .valid_for_secs
                .map(|secs| request.issued_at.offset_secs(secs).epoch_secs()),
            cnf: request
                .holder_key
                .clone()
                .map(|jwk| Confirmation { jwk }),
            sd,
            sd_alg: sdcred_core::DigestAlgorithm::Sha256,
            visible,
        };
        let issuer_token = jws::encode(SD_JWT_TYP, &payload, issuer_key)?;

        tracing::debug!(
            issuer = %payload.iss,
            disclosable = disclosures.len(),
            decoys = request.decoys,
            holder_bound = payload.cnf.is_some(),
            "issued credential"
        );
        Ok(Credential::new(issuer_token, payload, disclosures))
    }

    fn parse_credential(&self, wire: &str) -> Result<Credential, CredentialError> {
        let parts = split_wire(wire).map_err(CredentialError::Encoding)?;
        if parts.binding_token.is_some() {
            return Err(CredentialError::Encoding(
                "stored credential must not carry a binding proof".into(),
            ));
        }
        let token = jws::decode_unverified(&parts.issuer_token)?;
        let payload: CorePayload = token.claims_as()?;

        let mut unused: Vec<&str> = payload.sd.iter().map(String::as_str).collect();
        let mut disclosures = Vec::with_capacity(parts.disclosures.len());
        for (index, encoded) in parts.disclosures.iter().enumerate() {
            let digest = recompute(encoded);
            let Some(pos) = unused.iter().position(|d| *d == digest) else {
                return Err(CredentialError::Encoding(format!(
                    "disclosure {index} does not match the signed digests"
                )));
            };
            unused.swap_remove(pos);
            disclosures.push(Disclosure::decode(encoded)?);
        }
        Ok(Credential::new(parts.issuer_token, payload, disclosures))
    }

    fn present(
        &self,
        credential: &Credential,
        disclosed_keys: &[&str],
        binding: Option<HolderBinding<'_>>,
    ) -> Result<Presentation, CredentialError> {
        let committed: BTreeSet<&str> = credential.claim_keys().into_iter().collect();
        let payload = credential.payload();
        for key in disclosed_keys {
            if !committed.contains(key) && !payload.visible.contains_key(*key) {
                return Err(CredentialError::UnknownClaim((*key).to_string()));
            }
        }

        let mut presentation = Presentation {
            issuer_token: credential.issuer_token().to_string(),
            disclosures: credential
                .disclosures()
                .iter()
                .filter(|d| disclosed_keys.contains(&d.key()))
                .map(|d| d.encoded().to_string())
                .collect(),
            binding_token: None,
        };

        match (payload.holder_jwk(), binding) {
            (None, None) => {}
            (Some(_), None) => return Err(CredentialError::BindingKeyMissing),
            (None, Some(_)) => {
                return Err(CredentialError::Encoding(
                    "credential declares no holder key to bind to".into(),
                ));
            }
            (Some(cnf), Some(binding)) => {
                if &binding.signer.public_jwk() != cnf {
                    return Err(CredentialError::Encoding(
                        "holder signing key does not match the credential's cnf key".into(),
                    ));
                }
                let kb = KbClaims {
                    aud: binding.audience.to_string(),
                    iat: binding.issued_at.epoch_secs(),
                    nonce: binding.nonce.to_string(),
                    sd_hash: presentation.sd_hash(),
                };
                presentation.binding_token = Some(jws::encode(KB_JWT_TYP, &kb, binding.signer)?);
            }
        }

        tracing::debug!(
            issuer = %payload.iss,
            disclosed = presentation.disclosures.len(),
            bound = presentation.binding_token.is_some(),
            "built presentation"
        );
        Ok(presentation)
    }

    fn parse(&self, wire: &str) -> Result<Presentation, VerificationError> {
        Presentation::parse(wire)
    }

    fn check(
        &self,
        presentation: &Presentation,
        issuers: &dyn IssuerKeyResolver,
        policy: &VerificationPolicy,
        now: Timestamp,
    ) -> Result<CheckedPresentation, VerificationError> {
        check_presentation(presentation, issuers, policy, now)
    }
}
