//! SAML signature profile checks, run before any cryptography.
//!
//! A SAML signature must cover exactly the element that carries it: a single
//! reference to the element's own ID (or the whole document) with only the
//! enveloped-signature and exclusive canonicalization transforms.

use fedtrust_xmlsec::signature::{is_exclusive_c14n, ENVELOPED_SIGNATURE};
use fedtrust_xmlsec::{SecurityError, SecurityResult, SignableXmlObject};

/// Validates a signature's structure against the SAML signature profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureProfileValidator;

impl SignatureProfileValidator {
    /// Check the signature carried by `object`. An unsigned object is an error.
    pub fn validate<O: SignableXmlObject + ?Sized>(&self, object: &O) -> SecurityResult<()> {
        let signature = object
            .signature()
            .ok_or_else(|| invalid("object carries no signature"))?;

        let [reference] = signature.references.as_slice() else {
            return Err(invalid(format!(
                "expected exactly one reference, found {}",
                signature.references.len()
            )));
        };

        if !reference.uri.is_empty() {
            let Some(id) = object.signature_reference_id() else {
                return Err(invalid(format!(
                    "reference {} but signed object has no ID",
                    reference.uri
                )));
            };
            if reference.uri.strip_prefix('#') != Some(id) {
                return Err(invalid(format!(
                    "reference {} does not match object ID {}",
                    reference.uri, id
                )));
            }
        }

        if let Some(bad) = reference
            .transforms
            .iter()
            .find(|t| t.as_str() != ENVELOPED_SIGNATURE && !is_exclusive_c14n(t))
        {
            return Err(invalid(format!("transform not permitted: {}", bad)));
        }

        if !reference.transforms.iter().any(|t| t == ENVELOPED_SIGNATURE) {
            tracing::debug!(
                uri = %reference.uri,
                "signature reference lacks enveloped-signature transform"
            );
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> SecurityError {
    SecurityError::SignatureInvalid {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityDescriptor;
    use fedtrust_xmlsec::signature::{ContentReference, ALGO_ED25519, EXC_C14N};
    use fedtrust_xmlsec::Signature;

    fn signature(references: Vec<ContentReference>) -> Signature {
        Signature {
            signature_algorithm: ALGO_ED25519.to_string(),
            canonicalization_algorithm: EXC_C14N.to_string(),
            signed_info: Vec::new(),
            signature_value: Vec::new(),
            key_info: None,
            references,
        }
    }

    fn reference(uri: &str, transforms: &[&str]) -> ContentReference {
        ContentReference {
            uri: uri.to_string(),
            transforms: transforms.iter().map(|t| t.to_string()).collect(),
            digest_algorithm: fedtrust_xmlsec::signature::DIGEST_SHA256.to_string(),
            digest_value: Vec::new(),
        }
    }

    fn signed(id: Option<&str>, references: Vec<ContentReference>) -> EntityDescriptor {
        let mut entity = EntityDescriptor::new("e").with_signature(signature(references));
        entity.id = id.map(str::to_string);
        entity
    }

    #[test]
    fn test_accepts_profile_conformant() {
        let validator = SignatureProfileValidator;
        assert!(validator
            .validate(&signed(Some("_e1"), vec![ContentReference::enveloped("_e1")]))
            .is_ok());
        assert!(validator
            .validate(&signed(None, vec![reference("", &[ENVELOPED_SIGNATURE])]))
            .is_ok());
    }

    #[test]
    fn test_rejects_reference_count() {
        let validator = SignatureProfileValidator;
        assert!(validator.validate(&signed(Some("_e1"), vec![])).is_err());
        assert!(validator
            .validate(&signed(
                Some("_e1"),
                vec![ContentReference::enveloped("_e1"), ContentReference::enveloped("_e1")]
            ))
            .is_err());
    }

    #[test]
    fn test_rejects_foreign_reference() {
        let validator = SignatureProfileValidator;
        assert!(validator
            .validate(&signed(Some("_e1"), vec![ContentReference::enveloped("_other")]))
            .is_err());
        assert!(validator
            .validate(&signed(None, vec![ContentReference::enveloped("_e1")]))
            .is_err());
    }

    #[test]
    fn test_rejects_other_transforms() {
        let xpath = "http://www.w3.org/TR/1999/REC-xpath-19991116";
        let result = SignatureProfileValidator.validate(&signed(
            Some("_e1"),
            vec![reference("#_e1", &[ENVELOPED_SIGNATURE, xpath])],
        ));
        assert!(matches!(result, Err(SecurityError::SignatureInvalid { .. })));
    }

    #[test]
    fn test_rejects_unsigned() {
        assert!(SignatureProfileValidator
            .validate(&EntityDescriptor::new("e"))
            .is_err());
    }
}
