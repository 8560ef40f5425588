//! # Verifier Configuration
//!
//! Loaded once at startup from YAML or JSON. The path can come from the
//! `SDCRED_VERIFIER_CONFIG` environment variable.
//!
//! ```yaml
//! audience: verifier-1
//! nonce_ttl_secs: 300
//! required_claims: [given_name, family_name]
//! trusted_issuers:
//!   - issuer: did:example:issuer
//!     public_key: 3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29
//!     label: Example Issuer
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use sdcred_core::IssuerId;
use sdcred_crypto::Ed25519PublicKey;
use sdcred_vc::VerificationPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nonce::DEFAULT_NONCE_TTL_SECS;

/// Environment variable holding the configuration file path.
pub const CONFIG_ENV_VAR: &str = "SDCRED_VERIFIER_CONFIG";

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config file extension: {0} (expected .yaml, .yml or .json)")]
    UnsupportedExtension(String),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {errors:?}")]
    Invalid { errors: Vec<String> },
}

/// One trusted issuer entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustedIssuerConfig {
    pub issuer: IssuerId,
    /// Hex-encoded Ed25519 public key.
    pub public_key: Ed25519PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Verifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// This verifier's identity, bound into every presentation.
    pub audience: String,
    #[serde(default = "default_nonce_ttl")]
    pub nonce_ttl_secs: i64,
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: i64,
    #[serde(default = "default_max_proof_age")]
    pub max_proof_age_secs: i64,
    /// Claims every accepted presentation must reveal.
    #[serde(default)]
    pub required_claims: Vec<String>,
    #[serde(default)]
    pub trusted_issuers: Vec<TrustedIssuerConfig>,
}

fn default_nonce_ttl() -> i64 {
    DEFAULT_NONCE_TTL_SECS
}

fn default_clock_skew() -> i64 {
    sdcred_vc::verify::DEFAULT_CLOCK_SKEW_SECS
}

fn default_max_proof_age() -> i64 {
    sdcred_vc::verify::DEFAULT_MAX_PROOF_AGE_SECS
}

impl VerifierConfig {
    /// Defaults for `audience`, with no trusted issuers.
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            nonce_ttl_secs: default_nonce_ttl(),
            clock_skew_secs: default_clock_skew(),
            max_proof_age_secs: default_max_proof_age(),
            required_claims: Vec::new(),
            trusted_issuers: Vec::new(),
        }
    }

    /// Load and validate a config file. `.yaml`/`.yml` are parsed as YAML,
    /// `.json` as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            other => return Err(ConfigError::UnsupportedExtension(other.to_string())),
        };
        tracing::info!(
            path = %path.display(),
            audience = %config.audience,
            trusted_issuers = config.trusted_issuers.len(),
            "loaded verifier config"
        );
        Ok(config)
    }

    /// Load from the file named by `SDCRED_VERIFIER_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV_VAR).map_err(|_| ConfigError::MissingEnv(CONFIG_ENV_VAR))?;
        Self::load(Path::new(&path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and uniqueness, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.audience.trim().is_empty() {
            errors.push("audience must not be empty".to_string());
        }
        if self.nonce_ttl_secs <= 0 {
            errors.push("nonce_ttl_secs must be positive".to_string());
        }
        if self.clock_skew_secs < 0 {
            errors.push("clock_skew_secs must not be negative".to_string());
        }
        if self.max_proof_age_secs <= 0 {
            errors.push("max_proof_age_secs must be positive".to_string());
        }
        let mut seen = BTreeSet::new();
        for entry in &self.trusted_issuers {
            if !seen.insert(entry.issuer.as_str()) {
                errors.push(format!("trusted issuer {} listed more than once", entry.issuer));
            }
        }
        let mut claims = BTreeSet::new();
        for claim in &self.required_claims {
            if claim.is_empty() {
                errors.push("required claim names must not be empty".to_string());
            } else if !claims.insert(claim.as_str()) {
                errors.push(format!("required claim {claim} listed more than once"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { errors })
        }
    }

    /// The verification policy for one presentation against `nonce`.
    pub fn policy(&self, nonce: &str) -> VerificationPolicy {
        VerificationPolicy::new()
            .with_audience(self.audience.clone())
            .with_nonce(nonce)
            .with_clock_skew(self.clock_skew_secs)
            .with_max_proof_age(Some(self.max_proof_age_secs))
    }
}
