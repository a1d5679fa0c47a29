//! Cryptographic signature validation against a single credential.

use ed25519_dalek::{Verifier as _, VerifyingKey};
use pkcs8::DecodePublicKey;
use rsa::pkcs1v15;
use rsa::sha2::digest::const_oid::AssociatedOid;
use rsa::sha2::{Digest, Sha256, Sha512};
use rsa::signature::Verifier as _;
use rsa::RsaPublicKey;

use super::{Signature, ALGO_ED25519, ALGO_RSA_SHA1, ALGO_RSA_SHA256, ALGO_RSA_SHA512};
use crate::credential::{Credential, KeyAlgorithm, PublicKey};
use crate::error::{SecurityError, SecurityResult};

/// Verifies a signature with one credential's public key.
///
/// [`SignatureValidator::validate`] checks the signature value over the
/// SignedInfo octets. [`SignatureValidator::validate_content`] additionally
/// ties the signature to the canonical content of the signed element. Trust in
/// the credential is the caller's concern.
pub trait SignatureValidator: Send + Sync {
    fn validate(&self, signature: &Signature, credential: &Credential) -> SecurityResult<()>;

    /// Check the reference digests against `content`, then the signature value.
    fn validate_content(
        &self,
        signature: &Signature,
        content: &[u8],
        credential: &Credential,
    ) -> SecurityResult<()> {
        signature.verify_references(content)?;
        self.validate(signature, credential)
    }
}

/// Validator for Ed25519 and RSASSA-PKCS1-v1_5 signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSignatureValidator;

impl SignatureValidator for DefaultSignatureValidator {
    fn validate(&self, signature: &Signature, credential: &Credential) -> SecurityResult<()> {
        let expected = match signature.signature_algorithm.as_str() {
            ALGO_ED25519 => KeyAlgorithm::Ed25519,
            ALGO_RSA_SHA1 | ALGO_RSA_SHA256 | ALGO_RSA_SHA512 => KeyAlgorithm::Rsa,
            other => {
                return Err(SecurityError::UnsupportedAlgorithm {
                    algorithm: other.to_string(),
                })
            }
        };

        let public_key = credential
            .public_key
            .as_ref()
            .ok_or_else(|| SecurityError::signature_invalid("credential carries no public key"))?;

        if public_key.algorithm() != &expected {
            return Err(SecurityError::UnsupportedAlgorithm {
                algorithm: format!(
                    "{} key for {}",
                    public_key.algorithm(),
                    signature.signature_algorithm
                ),
            });
        }

        let result = match signature.signature_algorithm.as_str() {
            ALGO_ED25519 => verify_ed25519(public_key, signature),
            ALGO_RSA_SHA1 => verify_rsa::<sha1::Sha1>(public_key, signature),
            ALGO_RSA_SHA256 => verify_rsa::<Sha256>(public_key, signature),
            _ => verify_rsa::<Sha512>(public_key, signature),
        };
        result.inspect_err(|_| {
            tracing::debug!(
                key = %public_key.fingerprint(),
                algorithm = %signature.signature_algorithm,
                "signature verification failed"
            );
        })
    }
}

fn verify_ed25519(public_key: &PublicKey, signature: &Signature) -> SecurityResult<()> {
    let key = VerifyingKey::from_public_key_der(public_key.spki_der())
        .map_err(|e| SecurityError::invalid_key("PublicKey", e))?;

    let value = ed25519_dalek::Signature::from_slice(&signature.signature_value).map_err(|e| {
        SecurityError::signature_invalid(format!("invalid signature bytes: {}", e))
    })?;

    key.verify(&signature.signed_info, &value)
        .map_err(|_| SecurityError::signature_invalid("ed25519 verification failed"))
}

fn verify_rsa<D>(public_key: &PublicKey, signature: &Signature) -> SecurityResult<()>
where
    D: Digest + AssociatedOid,
{
    let key = RsaPublicKey::from_public_key_der(public_key.spki_der())
        .map_err(|e| SecurityError::invalid_key("PublicKey", e))?;
    let verifier = pkcs1v15::VerifyingKey::<D>::new(key);

    let value = pkcs1v15::Signature::try_from(signature.signature_value.as_slice()).map_err(|e| {
        SecurityError::signature_invalid(format!("invalid signature bytes: {}", e))
    })?;

    verifier
        .verify(&signature.signed_info, &value)
        .map_err(|_| SecurityError::signature_invalid("rsa verification failed"))
}
