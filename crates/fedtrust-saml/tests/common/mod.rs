//! Shared fixtures for fedtrust-saml integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use fedtrust_saml::EntityDescriptor;
use fedtrust_xmlsec::signature::{ContentReference, ALGO_ED25519, EXC_C14N};
use fedtrust_xmlsec::{
    CollectionCredentialResolver, Credential, KeyInfo, PublicKey, Signature, SignableXmlObject,
};

pub const P1: &str = "urn:example:protocol:one";
pub const P2: &str = "urn:example:protocol:two";

pub fn signing_key() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

pub fn public_key(key: &SigningKey) -> PublicKey {
    PublicKey::from_ed25519(&key.verifying_key()).expect("encode key")
}

/// Enveloped signature over `object`, advertising `key_name` in its KeyInfo.
pub fn sign<O: SignableXmlObject>(key: &SigningKey, object: &O, key_name: &str) -> Signature {
    let id = object.signature_reference_id().expect("signed objects carry an ID");
    let content = object.canonical_content().expect("canonical content");
    let reference = ContentReference::enveloped(id)
        .with_digest_of(&content)
        .expect("digest");
    let signed_info = format!(
        "<ds:SignedInfo><ds:Reference URI=\"{}\">\
         <ds:DigestValue>{}</ds:DigestValue></ds:Reference></ds:SignedInfo>",
        reference.uri,
        reference.digest_value_base64()
    )
    .into_bytes();
    Signature {
        signature_algorithm: ALGO_ED25519.to_string(),
        canonicalization_algorithm: EXC_C14N.to_string(),
        signature_value: key.sign(&signed_info).to_bytes().to_vec(),
        signed_info,
        key_info: Some(KeyInfo::new().with_key_name(key_name)),
        references: vec![reference],
    }
}

/// Entity `entity_id` signed by `key` under `key_name`.
pub fn signed_entity(entity_id: &str, key: &SigningKey, key_name: &str) -> EntityDescriptor {
    let entity = EntityDescriptor::new(entity_id).with_id(format!("_{}", entity_id.len()));
    let signature = sign(key, &entity, key_name);
    entity.with_signature(signature)
}

/// Local trusted-credential store holding each key under its name.
pub fn trusted_store(keys: &[(&str, &SigningKey)]) -> Arc<CollectionCredentialResolver> {
    Arc::new(CollectionCredentialResolver::new(
        keys.iter()
            .map(|(name, key)| Credential::from_public_key(public_key(key)).with_key_name(*name))
            .collect(),
    ))
}
