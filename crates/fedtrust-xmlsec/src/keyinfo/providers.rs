//! Built-in KeyInfo providers.

use pkcs8::EncodePublicKey;
use rsa::{BigUint, RsaPublicKey};

use super::provider::{KeyInfoProvider, KeyInfoResolutionContext};
use super::{KeyInfoChild, KeyValue};
use crate::credential::{Credential, PublicKey};
use crate::error::{SecurityError, SecurityResult};

/// `<ds:RSAKeyValue>`: modulus and public exponent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaKeyValueProvider;

impl KeyInfoProvider for RsaKeyValueProvider {
    fn name(&self) -> &'static str {
        "rsa_key_value"
    }

    fn handles(&self, child: &KeyInfoChild) -> bool {
        matches!(child, KeyInfoChild::KeyValue(KeyValue::Rsa { .. }))
    }

    fn process(
        &self,
        child: &KeyInfoChild,
        context: &KeyInfoResolutionContext,
    ) -> SecurityResult<Option<Vec<Credential>>> {
        let KeyInfoChild::KeyValue(KeyValue::Rsa { modulus, exponent }) = child else {
            return Ok(None);
        };

        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )
        .map_err(|e| SecurityError::invalid_key("RSAKeyValue", e))?;
        let spki = key
            .to_public_key_der()
            .map_err(|e| SecurityError::invalid_key("RSAKeyValue", e))?;
        let public_key = PublicKey::from_spki_der(spki.as_bytes())?;

        Ok(Some(vec![context.decorate(Credential::from_public_key(public_key))]))
    }
}

/// `<dsig11:DEREncodedKeyValue>`: any SubjectPublicKeyInfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerEncodedKeyValueProvider;

impl KeyInfoProvider for DerEncodedKeyValueProvider {
    fn name(&self) -> &'static str {
        "der_encoded_key_value"
    }

    fn handles(&self, child: &KeyInfoChild) -> bool {
        matches!(child, KeyInfoChild::DerEncodedKeyValue(_))
    }

    fn process(
        &self,
        child: &KeyInfoChild,
        context: &KeyInfoResolutionContext,
    ) -> SecurityResult<Option<Vec<Credential>>> {
        let KeyInfoChild::DerEncodedKeyValue(der) = child else {
            return Ok(None);
        };

        let public_key = PublicKey::from_spki_der(der)?;
        Ok(Some(vec![context.decorate(Credential::from_public_key(public_key))]))
    }
}

/// `<ds:X509Data>` carrying certificates inline.
///
/// The first certificate is the entity certificate and supplies the public
/// key. Every certificate lands in the chain. The entity certificate's subject
/// common names and DNS alternative names become key names.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineX509DataProvider;

impl KeyInfoProvider for InlineX509DataProvider {
    fn name(&self) -> &'static str {
        "inline_x509_data"
    }

    fn handles(&self, child: &KeyInfoChild) -> bool {
        matches!(child, KeyInfoChild::X509Data(_))
    }

    fn process(
        &self,
        child: &KeyInfoChild,
        context: &KeyInfoResolutionContext,
    ) -> SecurityResult<Option<Vec<Credential>>> {
        let KeyInfoChild::X509Data(data) = child else {
            return Ok(None);
        };
        let Some(entity) = data.certificates.first() else {
            return Ok(None);
        };

        let public_key = entity.public_key()?;
        let mut credential = context
            .decorate(Credential::from_public_key(public_key))
            .with_entity_certificate(entity.clone())
            .with_certificate_chain(data.certificates.clone());
        credential.key_names.extend(entity.subject_names()?);

        Ok(Some(vec![credential]))
    }
}
