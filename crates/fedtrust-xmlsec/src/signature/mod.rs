//! XML-Signature object model.
//!
//! The XML layer parses `<ds:Signature>` and canonicalizes `<ds:SignedInfo>`;
//! this module carries the result: the algorithms, the canonical SignedInfo
//! octets, the signature value, the embedded KeyInfo, and the content
//! references with their transforms and digests.

mod validator;

pub use validator::{DefaultSignatureValidator, SignatureValidator};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::encoding::base64_bytes;
use crate::error::{SecurityError, SecurityResult};
use crate::keyinfo::KeyInfo;

/// Exclusive XML canonicalization, without comments.
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// Exclusive XML canonicalization, with comments.
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

/// Enveloped-signature transform.
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// EdDSA over Curve25519.
pub const ALGO_ED25519: &str = "http://www.w3.org/2021/04/xmldsig-more#eddsa-ed25519";

/// RSASSA-PKCS1-v1_5 with SHA-1.
pub const ALGO_RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

/// RSASSA-PKCS1-v1_5 with SHA-256.
pub const ALGO_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// RSASSA-PKCS1-v1_5 with SHA-512.
pub const ALGO_RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

/// SHA-1 digest.
pub const DIGEST_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

/// SHA-256 digest.
pub const DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// SHA-384 digest.
pub const DIGEST_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";

/// SHA-512 digest.
pub const DIGEST_SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

/// Whether `uri` names an exclusive canonicalization transform.
pub fn is_exclusive_c14n(uri: &str) -> bool {
    uri == EXC_C14N || uri == EXC_C14N_WITH_COMMENTS
}

fn default_digest() -> String {
    DIGEST_SHA256.to_string()
}

/// Digest `content` with the algorithm named by `algorithm`.
pub fn digest(algorithm: &str, content: &[u8]) -> SecurityResult<Vec<u8>> {
    Ok(match algorithm {
        DIGEST_SHA256 => Sha256::digest(content).to_vec(),
        DIGEST_SHA384 => Sha384::digest(content).to_vec(),
        DIGEST_SHA512 => Sha512::digest(content).to_vec(),
        DIGEST_SHA1 => <sha1::Sha1 as sha1::Digest>::digest(content).to_vec(),
        other => {
            return Err(SecurityError::UnsupportedAlgorithm {
                algorithm: other.to_string(),
            })
        }
    })
}

/// One `<ds:Reference>`: what was signed and how it was transformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReference {
    /// Empty for the whole document, or `#<ID>`.
    #[serde(default)]
    pub uri: String,

    /// Transform algorithm URIs, in application order.
    #[serde(default)]
    pub transforms: Vec<String>,

    #[serde(default = "default_digest")]
    pub digest_algorithm: String,

    /// `<ds:DigestValue>` over the transformed content.
    #[serde(default, with = "base64_bytes")]
    pub digest_value: Vec<u8>,
}

impl ContentReference {
    /// Reference to the element carrying `id`, with the usual SAML transforms.
    ///
    /// The digest is left empty; see [`ContentReference::with_digest_of`].
    pub fn enveloped(id: &str) -> Self {
        Self {
            uri: format!("#{}", id),
            transforms: vec![ENVELOPED_SIGNATURE.to_string(), EXC_C14N.to_string()],
            digest_algorithm: default_digest(),
            digest_value: Vec::new(),
        }
    }

    /// Set the digest value to the digest of `content`.
    pub fn with_digest_of(mut self, content: &[u8]) -> SecurityResult<Self> {
        self.digest_value = digest(&self.digest_algorithm, content)?;
        Ok(self)
    }

    /// The digest value as it appears inside `<ds:DigestValue>`.
    pub fn digest_value_base64(&self) -> String {
        BASE64.encode(&self.digest_value)
    }

    pub fn has_exclusive_transform(&self) -> bool {
        self.transforms.iter().any(|t| is_exclusive_c14n(t))
    }

    /// Check that `content` hashes to the digest value.
    pub fn verify_digest(&self, content: &[u8]) -> SecurityResult<()> {
        if self.digest_value.is_empty() {
            return Err(SecurityError::signature_invalid(format!(
                "reference {} carries no digest value",
                self.uri
            )));
        }
        if digest(&self.digest_algorithm, content)? != self.digest_value {
            return Err(SecurityError::signature_invalid(format!(
                "digest mismatch for reference {}",
                self.uri
            )));
        }
        Ok(())
    }
}

/// A parsed enveloped signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signature_algorithm: String,

    #[serde(default = "default_c14n")]
    pub canonicalization_algorithm: String,

    /// Canonical `<ds:SignedInfo>` octets.
    #[serde(with = "base64_bytes")]
    pub signed_info: Vec<u8>,

    #[serde(with = "base64_bytes")]
    pub signature_value: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<KeyInfo>,

    #[serde(default)]
    pub references: Vec<ContentReference>,
}

fn default_c14n() -> String {
    EXC_C14N.to_string()
}

impl Signature {
    /// Whether any content reference applies exclusive canonicalization.
    pub fn uses_exclusive_c14n(&self) -> bool {
        self.references.iter().any(ContentReference::has_exclusive_transform)
    }

    /// Check every reference against the canonical `content` of the signed
    /// element.
    ///
    /// Each digest must match `content` and must appear in a `DigestValue`
    /// element of the SignedInfo octets, which the signature value covers.
    pub fn verify_references(&self, content: &[u8]) -> SecurityResult<()> {
        if self.references.is_empty() {
            return Err(SecurityError::signature_invalid("signature has no references"));
        }
        for reference in &self.references {
            reference.verify_digest(content)?;
            let needle = format!("DigestValue>{}<", reference.digest_value_base64());
            let covered = self
                .signed_info
                .windows(needle.len())
                .any(|window| window == needle.as_bytes());
            if !covered {
                return Err(SecurityError::signature_invalid(format!(
                    "digest for reference {} is not covered by SignedInfo",
                    reference.uri
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_detection() {
        assert!(is_exclusive_c14n(EXC_C14N));
        assert!(is_exclusive_c14n(EXC_C14N_WITH_COMMENTS));
        assert!(!is_exclusive_c14n("http://www.w3.org/TR/2001/REC-xml-c14n-20010315"));

        let plain = ContentReference {
            transforms: vec![ENVELOPED_SIGNATURE.to_string()],
            ..ContentReference::enveloped("_abc")
        };
        assert!(!plain.has_exclusive_transform());
        assert!(ContentReference::enveloped("_abc").has_exclusive_transform());
    }

    #[test]
    fn test_deserialize_wrapped_base64() {
        let json = serde_json::json!({
            "signature_algorithm": ALGO_ED25519,
            "signed_info": "AAEC\n  AwQ=",
            "signature_value": "",
            "references": [{ "uri": "#_e1", "transforms": [EXC_C14N] }]
        });

        let signature: Signature = serde_json::from_value(json).unwrap();
        assert_eq!(signature.signed_info, vec![0, 1, 2, 3, 4]);
        assert_eq!(signature.canonicalization_algorithm, EXC_C14N);
        assert_eq!(signature.references[0].digest_algorithm, DIGEST_SHA256);
        assert!(signature.uses_exclusive_c14n());
    }

    fn signed_info_for(reference: &ContentReference) -> Vec<u8> {
        format!(
            "<ds:SignedInfo><ds:Reference URI=\"{}\">\
             <ds:DigestValue>{}</ds:DigestValue></ds:Reference></ds:SignedInfo>",
            reference.uri,
            reference.digest_value_base64()
        )
        .into_bytes()
    }

    fn signature_over(content: &[u8]) -> Signature {
        let reference = ContentReference::enveloped("_e1").with_digest_of(content).unwrap();
        Signature {
            signature_algorithm: ALGO_ED25519.to_string(),
            canonicalization_algorithm: EXC_C14N.to_string(),
            signed_info: signed_info_for(&reference),
            signature_value: Vec::new(),
            key_info: None,
            references: vec![reference],
        }
    }

    #[test]
    fn test_references_match_content() {
        let signature = signature_over(b"{\"entity_id\":\"https://idp.example.org\"}");
        assert!(signature
            .verify_references(b"{\"entity_id\":\"https://idp.example.org\"}")
            .is_ok());
    }

    #[test]
    fn test_moved_signature_fails_digest() {
        let signature = signature_over(b"{\"entity_id\":\"https://idp.example.org\"}");
        let moved = b"{\"entity_id\":\"https://attacker.example.org\"}";
        let result = signature.verify_references(moved);
        assert!(matches!(result, Err(SecurityError::SignatureInvalid { .. })));
    }

    #[test]
    fn test_digest_must_be_covered_by_signed_info() {
        let original = b"original";
        let forged = b"forged";
        let mut signature = signature_over(original);
        // Reference rewritten to match new content while SignedInfo is untouched.
        signature.references[0] = signature.references[0].clone().with_digest_of(forged).unwrap();

        assert!(signature.verify_references(forged).is_err());
        assert!(signature.verify_references(original).is_err());
    }

    #[test]
    fn test_reference_without_digest_rejected() {
        let mut signature = signature_over(b"x");
        signature.references[0].digest_value.clear();
        assert!(signature.verify_references(b"x").is_err());

        signature.references.clear();
        assert!(signature.verify_references(b"x").is_err());
    }

    #[test]
    fn test_digest_algorithms() {
        assert_eq!(digest(DIGEST_SHA1, b"abc").unwrap().len(), 20);
        assert_eq!(digest(DIGEST_SHA256, b"abc").unwrap().len(), 32);
        assert_eq!(digest(DIGEST_SHA384, b"abc").unwrap().len(), 48);
        assert_eq!(digest(DIGEST_SHA512, b"abc").unwrap().len(), 64);
        assert!(matches!(
            digest("urn:example:md5", b"abc"),
            Err(SecurityError::UnsupportedAlgorithm { .. })
        ));
    }
}
