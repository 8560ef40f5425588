//! # Presentations and the Wire Format
//!
//! ```text
//! unbound:  <issuer-jws>~<disclosure>~...~<disclosure>~
//! bound:    <issuer-jws>~<disclosure>~...~<disclosure>~<kb-jws>
//! ```
//!
//! `~` never occurs in base64url or in a compact JWS, so splitting is
//! unambiguous. The holder-binding proof (KB-JWT) signs
//! `{aud, iat, nonce, sd_hash}` where `sd_hash` covers the issuer token and
//! the chosen disclosures exactly as transmitted.
//!
//! Parsing only checks structure. Disclosure tokens are kept as received;
//! their digests are matched during verification.

use sdcred_core::Timestamp;
use sdcred_crypto::TokenSigner;
use serde::{Deserialize, Serialize};

use crate::disclosure::recompute;
use crate::error::VerificationError;

/// Segment separator.
pub const SEPARATOR: char = '~';

/// `typ` header of the holder-binding proof.
pub const KB_JWT_TYP: &str = "kb+jwt";

/// Largest accepted wire string, in bytes.
pub const MAX_WIRE_LEN: usize = 64 * 1024;

/// Largest accepted number of disclosures in one presentation.
pub const MAX_DISCLOSURES: usize = 256;

/// Claims of the holder-binding proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbClaims {
    /// The verifier this presentation is addressed to.
    pub aud: String,
    /// When the proof was created, seconds since the epoch.
    pub iat: i64,
    /// The verifier's challenge.
    pub nonce: String,
    /// base64url SHA-256 over `issuer-jws~d1~...~dn~`.
    pub sd_hash: String,
}

/// What the holder needs to bind a presentation to one verifier and one
/// challenge.
#[derive(Clone, Copy)]
pub struct HolderBinding<'a> {
    /// The holder's signing capability. Its key must match `cnf`.
    pub signer: &'a dyn TokenSigner,
    /// The verifier's challenge.
    pub nonce: &'a str,
    /// The verifier's identity.
    pub audience: &'a str,
    /// Proof creation time.
    pub issued_at: Timestamp,
}

impl<'a> HolderBinding<'a> {
    /// Binding created now.
    pub fn new(signer: &'a dyn TokenSigner, nonce: &'a str, audience: &'a str) -> Self {
        Self {
            signer,
            nonce,
            audience,
            issued_at: Timestamp::now(),
        }
    }

    /// Override the proof creation time.
    pub fn at(mut self, issued_at: Timestamp) -> Self {
        self.issued_at = issued_at;
        self
    }
}

impl std::fmt::Debug for HolderBinding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderBinding")
            .field("audience", &self.audience)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// A presentation as it travels: issuer token, the chosen disclosure tokens
/// and an optional holder-binding proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    /// The issuer-signed compact JWS.
    pub issuer_token: String,
    /// Disclosure tokens, verbatim.
    pub disclosures: Vec<String>,
    /// KB-JWT, if the holder bound the presentation.
    pub binding_token: Option<String>,
}

impl Presentation {
    /// `issuer-jws~d1~...~dn~`, the part covered by `sd_hash`.
    pub fn unbound_wire(&self) -> String {
        let mut wire = self.issuer_token.clone();
        wire.push(SEPARATOR);
        for d in &self.disclosures {
            wire.push_str(d);
            wire.push(SEPARATOR);
        }
        wire
    }

    /// The full wire string.
    pub fn to_wire(&self) -> String {
        let mut wire = self.unbound_wire();
        if let Some(kb) = &self.binding_token {
            wire.push_str(kb);
        }
        wire
    }

    /// The `sd_hash` a holder-binding proof for this presentation must carry.
    pub fn sd_hash(&self) -> String {
        recompute(&self.unbound_wire())
    }

    /// Parse a wire string.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::MalformedPresentation` on a missing
    /// separator, an empty or truncated segment, or an input over the size
    /// limits.
    pub fn parse(wire: &str) -> Result<Self, VerificationError> {
        split_wire(wire).map_err(VerificationError::MalformedPresentation)
    }
}

/// Split a wire string into its segments, reporting problems as plain text
/// so holder-side and verifier-side callers can wrap them in their own
/// error type.
pub(crate) fn split_wire(wire: &str) -> Result<Presentation, String> {
    if wire.len() > MAX_WIRE_LEN {
        return Err(format!("exceeds {MAX_WIRE_LEN} bytes"));
    }
    if !wire.contains(SEPARATOR) {
        return Err(format!("missing '{SEPARATOR}' separator"));
    }

    let segments: Vec<&str> = wire.split(SEPARATOR).collect();
    let Some((last, rest)) = segments.split_last() else {
        return Err("empty input".into());
    };
    let Some((core, disclosures)) = rest.split_first() else {
        return Err("missing issuer token".into());
    };

    if core.is_empty() {
        return Err("missing issuer token".into());
    }
    if core.split('.').count() != 3 {
        return Err("issuer token is not a compact JWS".into());
    }
    if disclosures.iter().any(|d| d.is_empty()) {
        return Err("empty disclosure segment".into());
    }
    if disclosures.len() > MAX_DISCLOSURES {
        return Err(format!("more than {MAX_DISCLOSURES} disclosures"));
    }

    let binding_token = if last.is_empty() {
        None
    } else if last.split('.').count() == 3 {
        Some((*last).to_string())
    } else {
        return Err(format!("truncated input: missing trailing '{SEPARATOR}'"));
    };

    Ok(Presentation {
        issuer_token: (*core).to_string(),
        disclosures: disclosures.iter().map(|d| (*d).to_string()).collect(),
        binding_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE: &str = "aGVhZGVy.cGF5bG9hZA.c2ln";
    const KB: &str = "a2I.a2I.a2I";

    fn malformed(wire: &str) -> bool {
        matches!(Presentation::parse(wire), Err(VerificationError::MalformedPresentation(_)))
    }

    #[test]
    fn parses_unbound() {
        let p = Presentation::parse(&format!("{CORE}~d1~d2~")).unwrap();
        assert_eq!(p.issuer_token, CORE);
        assert_eq!(p.disclosures, ["d1", "d2"]);
        assert!(p.binding_token.is_none());
    }

    #[test]
    fn parses_bound() {
        let p = Presentation::parse(&format!("{CORE}~d1~{KB}")).unwrap();
        assert_eq!(p.disclosures, ["d1"]);
        assert_eq!(p.binding_token.as_deref(), Some(KB));
    }

    #[test]
    fn empty_disclosure_list_is_valid() {
        let p = Presentation::parse(&format!("{CORE}~")).unwrap();
        assert!(p.disclosures.is_empty());
        let p = Presentation::parse(&format!("{CORE}~{KB}")).unwrap();
        assert!(p.disclosures.is_empty());
        assert!(p.binding_token.is_some());
    }

    #[test]
    fn wire_is_stable() {
        let wire = format!("{CORE}~d1~d2~{KB}");
        assert_eq!(Presentation::parse(&wire).unwrap().to_wire(), wire);
        let wire = format!("{CORE}~d1~");
        assert_eq!(Presentation::parse(&wire).unwrap().to_wire(), wire);
    }

    #[test]
    fn structural_errors() {
        assert!(malformed(""));
        assert!(malformed(CORE));
        assert!(malformed("~d1~"));
        assert!(malformed(&format!("{CORE}~~d2~")));
        assert!(malformed(&format!("{CORE}~d1")));
        assert!(malformed("notajws~d1~"));
    }

    #[test]
    fn size_limits() {
        let too_many = format!("{CORE}~{}", "d~".repeat(MAX_DISCLOSURES + 1));
        assert!(malformed(&too_many));
        let too_long = format!("{CORE}~{}~", "a".repeat(MAX_WIRE_LEN));
        assert!(malformed(&too_long));
    }

    #[test]
    fn sd_hash_covers_disclosures_in_order() {
        let a = Presentation::parse(&format!("{CORE}~d1~d2~")).unwrap();
        let b = Presentation::parse(&format!("{CORE}~d2~d1~")).unwrap();
        assert_ne!(a.sd_hash(), b.sd_hash());
        assert_eq!(a.sd_hash(), recompute(&format!("{CORE}~d1~d2~")));
    }
}
