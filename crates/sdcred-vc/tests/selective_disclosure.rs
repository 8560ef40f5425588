//! # Selective Disclosure Properties
//!
//! End-to-end through the format registry with real Ed25519 keys:
//! what is disclosed is exactly what verifies, and any altered disclosure
//! byte is caught.

use proptest::prelude::*;
use sdcred_core::{IssuerId, SubjectId, Timestamp};
use sdcred_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use sdcred_vc::{
    FormatRegistry, HolderBinding, IssuanceRequest, VerificationError, VerificationPolicy,
};
use serde_json::{json, Map, Value};

const BASE64URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

struct Setup {
    registry: FormatRegistry,
    issuer: Ed25519KeyPair,
    holder: Ed25519KeyPair,
}

impl Setup {
    fn new() -> Self {
        let registry = FormatRegistry::with_defaults();
        let keys = registry.generate_keys("sd-jwt").unwrap();
        Self {
            registry,
            issuer: keys.issuer_key,
            holder: keys.holder_key,
        }
    }

    fn request(&self) -> IssuanceRequest {
        IssuanceRequest::new(IssuerId::new("did:example:issuer").unwrap())
            .with_subject(SubjectId::new("holder-1").unwrap())
            .with_holder_key(&self.holder.public_key())
            .valid_for(3600)
    }

    fn resolver(&self) -> impl Fn(&IssuerId) -> Option<Ed25519PublicKey> + Send + Sync {
        let key = self.issuer.public_key();
        move |id: &IssuerId| (id.as_str() == "did:example:issuer").then(|| key.clone())
    }

    fn present(&self, claims: &Map<String, Value>, visible: &[&str], disclosed: &[&str]) -> String {
        let cred = self
            .registry
            .issue("sd-jwt", claims, visible, &self.request(), &self.issuer)
            .unwrap();
        let binding = HolderBinding::new(&self.holder, "n1", "verifier-1");
        self.registry
            .create_presentation("sd-jwt", &cred, disclosed, Some(binding))
            .unwrap()
    }

    fn verify(&self, wire: &str) -> Result<Map<String, Value>, VerificationError> {
        self.registry
            .verify("sd-jwt", wire, &self.resolver(), Some("n1"), Some("verifier-1"))
            .map(|v| v.claims)
    }
}

fn claim_map() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        "c_[a-z]{1,6}",
        prop_oneof![
            "[ -~]{0,12}".prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ],
        0..6,
    )
    .prop_map(|m| m.into_iter().collect())
}

#[test]
fn concrete_scenario_reveals_only_requested_claims() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon", "family_name": "Doe", "email": "jon@example.com"});
    let wire = setup.present(
        claims.as_object().unwrap(),
        &[],
        &["given_name", "family_name"],
    );
    let revealed = setup.verify(&wire).unwrap();
    assert_eq!(
        Value::Object(revealed),
        json!({"given_name": "Jon", "family_name": "Doe"})
    );
    assert!(!wire.contains("jon@example.com"));
}

#[test]
fn empty_disclosure_set_verifies() {
    let setup = Setup::new();
    let claims = json!({"email": "jon@example.com", "nationality": "AT"});
    let wire = setup.present(claims.as_object().unwrap(), &["nationality"], &[]);
    let revealed = setup.verify(&wire).unwrap();
    assert_eq!(Value::Object(revealed), json!({"nationality": "AT"}));
}

#[test]
fn dropping_the_binding_proof_is_detected() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon"});
    let wire = setup.present(claims.as_object().unwrap(), &[], &["given_name"]);
    let unbound = format!("{}~", wire.rsplit_once('~').unwrap().0);
    assert_eq!(
        setup.verify(&unbound).unwrap_err(),
        VerificationError::HolderBindingMissing
    );
}

#[test]
fn removing_a_disclosure_breaks_the_binding() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon", "family_name": "Doe"});
    let wire = setup.present(claims.as_object().unwrap(), &[], &["given_name", "family_name"]);
    let segments: Vec<&str> = wire.split('~').collect();
    let stripped = format!("{}~{}~{}", segments[0], segments[1], segments[3]);
    assert_eq!(setup.verify(&stripped).unwrap_err().code(), "HOLDER_BINDING_INVALID");
}

#[test]
fn wrong_audience_is_rejected() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon"});
    let wire = setup.present(claims.as_object().unwrap(), &[], &["given_name"]);
    let err = setup
        .registry
        .verify("sd-jwt", &wire, &setup.resolver(), Some("n1"), Some("verifier-2"))
        .unwrap_err();
    assert_eq!(
        err,
        VerificationError::AudienceMismatch {
            expected: "verifier-2".into(),
            actual: Some("verifier-1".into()),
        }
    );
}

#[test]
fn stale_binding_proof_is_rejected() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon"});
    let cred = setup
        .registry
        .issue("sd-jwt", claims.as_object().unwrap(), &[], &setup.request(), &setup.issuer)
        .unwrap();
    let old = Timestamp::now().offset_secs(-3600);
    let binding = HolderBinding::new(&setup.holder, "n1", "verifier-1").at(old);
    let wire = setup
        .registry
        .create_presentation("sd-jwt", &cred, &["given_name"], Some(binding))
        .unwrap();
    assert_eq!(setup.verify(&wire).unwrap_err().code(), "HOLDER_BINDING_INVALID");

    let lenient = VerificationPolicy::new()
        .with_nonce("n1")
        .with_audience("verifier-1")
        .with_max_proof_age(None);
    assert!(setup
        .registry
        .verify_with_policy("sd-jwt", &wire, &setup.resolver(), &lenient, Timestamp::now())
        .is_ok());
}

#[test]
fn expired_credential_is_rejected() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon"});
    let request = setup
        .request()
        .issued_at(Timestamp::now().offset_secs(-7200))
        .valid_for(60);
    let cred = setup
        .registry
        .issue("sd-jwt", claims.as_object().unwrap(), &[], &request, &setup.issuer)
        .unwrap();
    let binding = HolderBinding::new(&setup.holder, "n1", "verifier-1");
    let wire = setup
        .registry
        .create_presentation("sd-jwt", &cred, &["given_name"], Some(binding))
        .unwrap();
    assert_eq!(setup.verify(&wire).unwrap_err().code(), "CREDENTIAL_EXPIRED");
}

#[test]
fn unknown_issuer_is_untrusted_even_with_valid_signature() {
    let setup = Setup::new();
    let claims = json!({"given_name": "Jon"});
    let wire = setup.present(claims.as_object().unwrap(), &[], &["given_name"]);
    let nobody = |_: &IssuerId| None::<Ed25519PublicKey>;
    let err = setup
        .registry
        .verify("sd-jwt", &wire, &nobody, Some("n1"), Some("verifier-1"))
        .unwrap_err();
    assert_eq!(err.code(), "UNTRUSTED_ISSUER");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn verified_claims_are_visible_plus_disclosed(
        claims in claim_map(),
        visible_mask in prop::collection::vec(any::<bool>(), 6),
        disclosed_mask in prop::collection::vec(any::<bool>(), 6),
    ) {
        let setup = Setup::new();
        let keys: Vec<&str> = claims.keys().map(String::as_str).collect();
        let visible: Vec<&str> = keys.iter().zip(&visible_mask).filter(|(_, v)| **v).map(|(k, _)| *k).collect();
        let disclosed: Vec<&str> = keys
            .iter()
            .zip(&disclosed_mask)
            .filter(|(k, d)| **d && !visible.contains(*k))
            .map(|(k, _)| *k)
            .collect();

        let wire = setup.present(&claims, &visible, &disclosed);
        let revealed = setup.verify(&wire).unwrap();

        let expected: Map<String, Value> = claims
            .iter()
            .filter(|(k, _)| visible.contains(&k.as_str()) || disclosed.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        prop_assert_eq!(revealed, expected);
    }

    #[test]
    fn altered_disclosure_byte_is_detected(index in any::<prop::sample::Index>(), replacement in 0usize..64) {
        let setup = Setup::new();
        let claims = json!({"given_name": "Jon", "family_name": "Doe", "email": "jon@example.com"});
        let wire = setup.present(claims.as_object().unwrap(), &[], &["given_name", "email"]);

        let mut segments: Vec<String> = wire.split('~').map(str::to_string).collect();
        let target = 1 + index.index(2);
        let mut bytes = segments[target].clone().into_bytes();
        let pos = index.index(bytes.len());
        let mut new_byte = BASE64URL[replacement];
        if new_byte == bytes[pos] {
            new_byte = BASE64URL[(replacement + 1) % BASE64URL.len()];
        }
        bytes[pos] = new_byte;
        segments[target] = String::from_utf8(bytes).unwrap();

        let err = setup.verify(&segments.join("~")).unwrap_err();
        prop_assert!(
            matches!(err, VerificationError::DisclosureMismatch(_) | VerificationError::SignatureInvalid(_)),
            "unexpected error {:?}", err
        );
    }
}
