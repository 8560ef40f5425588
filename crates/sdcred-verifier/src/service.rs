//! # Submit-Credential Service
//!
//! The relying-party surface: hand out a [`CredentialRequest`], accept the
//! holder's presentation, answer with a serializable [`SubmissionOutcome`].
//! Rejections carry the stable error code and the client-safe message;
//! internal detail stays in the log.

use std::sync::Arc;

use sdcred_core::{IssuerId, SubjectId, Timestamp};
use sdcred_vc::{FormatRegistry, VerificationError, VerifiedClaims};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ConfigError, VerifierConfig};
use crate::engine::{EngineSettings, VerificationEngine};
use crate::nonce::NonceLedger;
use crate::policy::{check_session_binding, SessionIdentity};
use crate::trust::{IssuerRecord, TrustRegistry};

/// What the verifier asks the holder to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub required_claims: Vec<String>,
    pub supported_formats: Vec<String>,
    pub audience: String,
    pub nonce: String,
    pub expires_at: Timestamp,
}

/// Client-facing error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionError {
    pub code: String,
    pub message: String,
}

impl From<&VerificationError> for SubmissionError {
    fn from(err: &VerificationError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.client_message(),
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<IssuerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SubmissionError>,
}

impl SubmissionOutcome {
    fn accepted(verified: VerifiedClaims) -> Self {
        Self {
            verified: true,
            claims: Some(verified.claims),
            issuer: Some(verified.issuer),
            subject: verified.subject,
            error: None,
        }
    }

    fn rejected(code: &str, message: String) -> Self {
        Self {
            verified: false,
            claims: None,
            issuer: None,
            subject: None,
            error: Some(SubmissionError {
                code: code.to_string(),
                message,
            }),
        }
    }

    /// The error code, if rejected.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// Verifies submitted presentations for one audience.
#[derive(Debug, Clone)]
pub struct CredentialCheckService {
    engine: VerificationEngine,
    audience: String,
    required_claims: Vec<String>,
    nonce_ttl_secs: i64,
}

impl CredentialCheckService {
    pub fn new(
        engine: VerificationEngine,
        audience: impl Into<String>,
        required_claims: Vec<String>,
        nonce_ttl_secs: i64,
    ) -> Self {
        Self {
            engine,
            audience: audience.into(),
            required_claims,
            nonce_ttl_secs,
        }
    }

    /// Build the service from configuration, with the default formats and
    /// an empty nonce ledger.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the configuration fails validation.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = VerificationEngine::new(
            Arc::new(FormatRegistry::with_defaults()),
            TrustRegistry::from_config(&config.trusted_issuers),
            NonceLedger::new(),
        )
        .with_settings(EngineSettings::from(config));
        Ok(Self::new(
            engine,
            config.audience.clone(),
            config.required_claims.clone(),
            config.nonce_ttl_secs,
        ))
    }

    pub fn engine(&self) -> &VerificationEngine {
        &self.engine
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Issue a fresh nonce and describe what to present.
    pub fn credential_request(&self) -> CredentialRequest {
        self.credential_request_at(Timestamp::now())
    }

    /// [`credential_request`](Self::credential_request) against an explicit
    /// clock. Expired ledger entries are dropped before the new nonce is
    /// registered, so the ledger stays bounded by the requests of one TTL.
    pub fn credential_request_at(&self, now: Timestamp) -> CredentialRequest {
        self.engine.nonces().purge_expired(now);
        let nonce = self.engine.nonces().issue_at(self.nonce_ttl_secs, now);
        CredentialRequest {
            required_claims: self.required_claims.clone(),
            supported_formats: self.engine.formats().supported_formats(),
            audience: self.audience.clone(),
            nonce: nonce.value,
            expires_at: nonce.expires_at,
        }
    }

    /// Verify a presentation against `nonce` and the required claims.
    pub fn submit(&self, format: &str, presentation: &str, nonce: &str) -> SubmissionOutcome {
        self.submit_at(format, presentation, nonce, Timestamp::now())
    }

    /// [`submit`](Self::submit) against an explicit clock.
    pub fn submit_at(
        &self,
        format: &str,
        presentation: &str,
        nonce: &str,
        now: Timestamp,
    ) -> SubmissionOutcome {
        match self.verify(format, presentation, nonce, now) {
            Ok(verified) => SubmissionOutcome::accepted(verified),
            Err(outcome) => outcome,
        }
    }

    /// [`submit`](Self::submit), then require the credential to belong to
    /// the authenticated `session`.
    pub fn submit_for_session(
        &self,
        format: &str,
        presentation: &str,
        nonce: &str,
        session: &SessionIdentity,
    ) -> SubmissionOutcome {
        let verified = match self.verify(format, presentation, nonce, Timestamp::now()) {
            Ok(verified) => verified,
            Err(outcome) => return outcome,
        };
        if let Err(err) = check_session_binding(&verified, session) {
            tracing::warn!(code = err.code(), reason = %err, "session binding rejected");
            return SubmissionOutcome::rejected(err.code(), err.to_string());
        }
        SubmissionOutcome::accepted(verified)
    }

    /// Trusted issuers, sorted by id.
    pub fn trusted_issuers(&self) -> Vec<IssuerRecord> {
        self.engine.trust().list()
    }

    fn verify(
        &self,
        format: &str,
        presentation: &str,
        nonce: &str,
        now: Timestamp,
    ) -> Result<VerifiedClaims, SubmissionOutcome> {
        let verified = self
            .engine
            .verify_at(format, presentation, &self.audience, nonce, now)
            .map_err(|err| {
                let body = SubmissionError::from(&err);
                SubmissionOutcome::rejected(&body.code, body.message)
            })?;

        let missing: Vec<&str> = self
            .required_claims
            .iter()
            .map(String::as_str)
            .filter(|claim| !verified.claims.contains_key(*claim))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                code = "MISSING_REQUIRED_CLAIMS",
                missing = ?missing,
                "presentation lacks required claims"
            );
            return Err(SubmissionOutcome::rejected(
                "MISSING_REQUIRED_CLAIMS",
                format!("missing required claims: {}", missing.join(", ")),
            ));
        }
        Ok(verified)
    }
}
