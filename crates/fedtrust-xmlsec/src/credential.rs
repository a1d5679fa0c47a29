//! Credentials and the key material they carry.
//!
//! A [`Credential`] is owned by whoever resolved it. Providers build them
//! transiently from KeyInfo; the local store hands out clones of its own
//! entries. Nothing here is ever persisted.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::encoding::{base64_bytes, sha256_fingerprint};
use crate::error::{SecurityError, SecurityResult};

const OID_ED25519: &str = "1.3.101.112";
const OID_RSA: &str = "1.2.840.113549.1.1.1";
const OID_DSA: &str = "1.2.840.10040.4.1";
const OID_EC: &str = "1.2.840.10045.2.1";

/// Intended use of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    Signing,
    Encryption,
    #[default]
    Unspecified,
}

impl UsageType {
    /// Whether a key declared with `self` may serve `wanted`.
    ///
    /// Unspecified on either side is compatible with everything.
    pub fn is_compatible_with(self, wanted: UsageType) -> bool {
        self == UsageType::Unspecified || wanted == UsageType::Unspecified || self == wanted
    }
}

/// Public key algorithm family, taken from the SPKI algorithm identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ed25519,
    Rsa,
    Dsa,
    Ec,
    Other(String),
}

impl KeyAlgorithm {
    fn from_oid(oid: &str) -> Self {
        match oid {
            OID_ED25519 => Self::Ed25519,
            OID_RSA => Self::Rsa,
            OID_DSA => Self::Dsa,
            OID_EC => Self::Ec,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::Rsa => write!(f, "RSA"),
            Self::Dsa => write!(f, "DSA"),
            Self::Ec => write!(f, "EC"),
            Self::Other(oid) => write!(f, "{}", oid),
        }
    }
}

/// A public key held as DER-encoded SubjectPublicKeyInfo.
///
/// Equality is bitwise equality of the SPKI encoding.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    spki_der: Vec<u8>,
}

impl PublicKey {
    /// Parse a DER-encoded SubjectPublicKeyInfo.
    pub fn from_spki_der(der: &[u8]) -> SecurityResult<Self> {
        let (rest, spki) = SubjectPublicKeyInfo::from_der(der)
            .map_err(|e| SecurityError::invalid_key("SubjectPublicKeyInfo", e))?;
        if !rest.is_empty() {
            return Err(SecurityError::invalid_key(
                "SubjectPublicKeyInfo",
                format!("{} trailing bytes", rest.len()),
            ));
        }

        Ok(Self {
            algorithm: KeyAlgorithm::from_oid(&spki.algorithm.algorithm.to_id_string()),
            spki_der: der.to_vec(),
        })
    }

    /// Wrap an Ed25519 verifying key.
    pub fn from_ed25519(key: &ed25519_dalek::VerifyingKey) -> SecurityResult<Self> {
        use pkcs8::EncodePublicKey;

        let doc = key.to_public_key_der().map_err(|e| SecurityError::Config {
            message: format!("failed to encode public key: {}", e),
        })?;
        Ok(Self {
            algorithm: KeyAlgorithm::Ed25519,
            spki_der: doc.as_bytes().to_vec(),
        })
    }

    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// `sha256:<hex>` of the SPKI encoding.
    pub fn fingerprint(&self) -> String {
        sha256_fingerprint(&self.spki_der)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// A PKCS#8 private key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pkcs8_der: Vec<u8>,
}

impl PrivateKey {
    pub fn from_pkcs8_der(der: impl Into<Vec<u8>>) -> Self {
        Self {
            pkcs8_der: der.into(),
        }
    }

    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A DER-encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X509Certificate {
    #[serde(with = "base64_bytes")]
    pub der: Vec<u8>,
}

impl X509Certificate {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self { der: der.into() }
    }

    /// The certificate's subject public key.
    pub fn public_key(&self) -> SecurityResult<PublicKey> {
        let (_, cert) = x509_parser::parse_x509_certificate(&self.der)
            .map_err(|e| SecurityError::invalid_key("X509Certificate", e))?;
        PublicKey::from_spki_der(cert.tbs_certificate.subject_pki.raw)
    }

    /// Subject common names followed by DNS subject alternative names.
    pub fn subject_names(&self) -> SecurityResult<Vec<String>> {
        use x509_parser::extensions::GeneralName;

        let (_, cert) = x509_parser::parse_x509_certificate(&self.der)
            .map_err(|e| SecurityError::invalid_key("X509Certificate", e))?;

        let mut names: Vec<String> = cert
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .map(str::to_string)
            .collect();

        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    names.push((*dns).to_string());
                }
            }
        }

        Ok(names)
    }
}

impl fmt::Debug for X509Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509Certificate")
            .field("fingerprint", &sha256_fingerprint(&self.der))
            .finish()
    }
}

/// Resolved key material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    /// Entity the credential belongs to, when known.
    pub entity_id: Option<String>,

    /// Declared usage.
    pub usage: UsageType,

    pub public_key: Option<PublicKey>,

    /// Present only for locally held credentials.
    pub private_key: Option<PrivateKey>,

    /// Names the key is known by.
    pub key_names: BTreeSet<String>,

    /// Certificate binding the public key, if any.
    pub entity_certificate: Option<X509Certificate>,

    /// Certificates presented alongside the entity certificate.
    pub certificate_chain: Vec<X509Certificate>,
}

impl Credential {
    /// A credential for a public key.
    pub fn from_public_key(key: PublicKey) -> Self {
        Self {
            public_key: Some(key),
            ..Default::default()
        }
    }

    /// Set the owning entity.
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the usage.
    pub fn with_usage(mut self, usage: UsageType) -> Self {
        self.usage = usage;
        self
    }

    /// Attach the private half of the key.
    pub fn with_private_key(mut self, key: PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Add a key name.
    pub fn with_key_name(mut self, name: impl Into<String>) -> Self {
        self.key_names.insert(name.into());
        self
    }

    /// Set the entity certificate.
    pub fn with_entity_certificate(mut self, cert: X509Certificate) -> Self {
        self.entity_certificate = Some(cert);
        self
    }

    /// Set the certificate chain.
    pub fn with_certificate_chain(mut self, chain: Vec<X509Certificate>) -> Self {
        self.certificate_chain = chain;
        self
    }

    /// Whether any of this credential's key names is in `names`.
    pub fn has_any_key_name<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> bool {
        names.into_iter().any(|n| self.key_names.contains(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn ed25519_key() -> PublicKey {
        let signing = SigningKey::generate(&mut rand::thread_rng());
        PublicKey::from_ed25519(&signing.verifying_key()).unwrap()
    }

    #[test]
    fn test_usage_compatibility() {
        assert!(UsageType::Unspecified.is_compatible_with(UsageType::Signing));
        assert!(UsageType::Signing.is_compatible_with(UsageType::Unspecified));
        assert!(UsageType::Signing.is_compatible_with(UsageType::Signing));
        assert!(!UsageType::Encryption.is_compatible_with(UsageType::Signing));
    }

    #[test]
    fn test_spki_round_trip_detects_algorithm() {
        let key = ed25519_key();
        let parsed = PublicKey::from_spki_der(key.spki_der()).unwrap();

        assert_eq!(parsed, key);
        assert_eq!(parsed.algorithm(), &KeyAlgorithm::Ed25519);
        assert!(parsed.fingerprint().starts_with("sha256:"));
    }

    #[test]
    fn test_spki_rejects_garbage() {
        let result = PublicKey::from_spki_der(b"not a key");
        assert!(matches!(result, Err(SecurityError::InvalidKeyMaterial { .. })));
    }

    #[test]
    fn test_spki_rejects_trailing_bytes() {
        let mut der = ed25519_key().spki_der().to_vec();
        der.push(0);
        assert!(PublicKey::from_spki_der(&der).is_err());
    }

    #[test]
    fn test_distinct_keys_not_equal() {
        assert_ne!(ed25519_key(), ed25519_key());
    }

    #[test]
    fn test_private_key_redacted() {
        let key = PrivateKey::from_pkcs8_der(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", key), "PrivateKey(<redacted>)");
    }

    #[test]
    fn test_key_name_intersection() {
        let cred = Credential::from_public_key(ed25519_key())
            .with_key_name("a")
            .with_key_name("b");
        let names = vec!["x".to_string(), "b".to_string()];
        assert!(cred.has_any_key_name(&names));
        assert!(!cred.has_any_key_name(&vec!["y".to_string()]));
    }
}
