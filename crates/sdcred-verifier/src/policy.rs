//! # Session Binding
//!
//! The engine proves that the presenter holds the key in `cnf`. Whether
//! that holder is the party on the other end of the current session is a
//! separate question, answered here against an identity the session layer
//! established on its own. The credential's `sub` is compared to that
//! identity, never taken as it.

use sdcred_core::SubjectId;
use sdcred_vc::VerifiedClaims;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of the calling session, as authenticated by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub subject: SubjectId,
    /// RFC 7638 thumbprint of the key the session authenticated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_key_thumbprint: Option<String>,
}

/// Session binding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionBindingError {
    #[error("credential has no subject")]
    MissingSubject,

    #[error("credential subject {actual} does not match session subject {expected}")]
    SubjectMismatch { expected: String, actual: String },

    #[error("credential is not bound to a holder key")]
    MissingHolderKey,

    #[error("credential holder key does not match the session key")]
    HolderKeyMismatch,

    #[error("cannot compute holder key thumbprint: {0}")]
    Thumbprint(String),
}

impl SessionBindingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSubject | Self::SubjectMismatch { .. } => "SESSION_SUBJECT_MISMATCH",
            Self::MissingHolderKey | Self::HolderKeyMismatch => "SESSION_KEY_MISMATCH",
            Self::Thumbprint(_) => "INTERNAL_ERROR",
        }
    }
}

/// Require the verified credential to belong to `session`.
pub fn check_session_binding(
    verified: &VerifiedClaims,
    session: &SessionIdentity,
) -> Result<(), SessionBindingError> {
    let subject = verified
        .subject
        .as_ref()
        .ok_or(SessionBindingError::MissingSubject)?;
    if subject != &session.subject {
        return Err(SessionBindingError::SubjectMismatch {
            expected: session.subject.to_string(),
            actual: subject.to_string(),
        });
    }

    if let Some(expected) = &session.holder_key_thumbprint {
        let jwk = verified
            .holder_key
            .as_ref()
            .ok_or(SessionBindingError::MissingHolderKey)?;
        let actual = jwk
            .thumbprint()
            .map_err(|e| SessionBindingError::Thumbprint(e.to_string()))?;
        if &actual != expected {
            return Err(SessionBindingError::HolderKeyMismatch);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdcred_core::{IssuerId, Timestamp};
    use sdcred_crypto::{Ed25519KeyPair, PublicJwk};
    use serde_json::Map;

    fn verified(subject: Option<&str>, holder: Option<&Ed25519KeyPair>) -> VerifiedClaims {
        VerifiedClaims {
            issuer: IssuerId::new("did:example:issuer").unwrap(),
            subject: subject.map(|s| SubjectId::new(s).unwrap()),
            claims: Map::new(),
            holder_key: holder.map(|k| PublicJwk::from_public_key(&k.public_key())),
            issued_at: Timestamp::now(),
            expires_at: None,
        }
    }

    fn session(subject: &str, holder: Option<&Ed25519KeyPair>) -> SessionIdentity {
        SessionIdentity {
            subject: SubjectId::new(subject).unwrap(),
            holder_key_thumbprint: holder
                .map(|k| PublicJwk::from_public_key(&k.public_key()).thumbprint().unwrap()),
        }
    }

    #[test]
    fn matching_subject_and_key() {
        let holder = Ed25519KeyPair::generate();
        let v = verified(Some("holder-1"), Some(&holder));
        assert_eq!(check_session_binding(&v, &session("holder-1", Some(&holder))), Ok(()));
        assert_eq!(check_session_binding(&v, &session("holder-1", None)), Ok(()));
    }

    #[test]
    fn subject_mismatch() {
        let v = verified(Some("holder-1"), None);
        let err = check_session_binding(&v, &session("holder-2", None)).unwrap_err();
        assert_eq!(err.code(), "SESSION_SUBJECT_MISMATCH");
    }

    #[test]
    fn credential_without_subject() {
        let v = verified(None, None);
        assert_eq!(
            check_session_binding(&v, &session("holder-1", None)),
            Err(SessionBindingError::MissingSubject)
        );
    }

    #[test]
    fn key_mismatch() {
        let holder = Ed25519KeyPair::generate();
        let other = Ed25519KeyPair::generate();
        let v = verified(Some("holder-1"), Some(&holder));
        assert_eq!(
            check_session_binding(&v, &session("holder-1", Some(&other))),
            Err(SessionBindingError::HolderKeyMismatch)
        );
        let unbound = verified(Some("holder-1"), None);
        assert_eq!(
            check_session_binding(&unbound, &session("holder-1", Some(&holder))),
            Err(SessionBindingError::MissingHolderKey)
        );
    }
}
