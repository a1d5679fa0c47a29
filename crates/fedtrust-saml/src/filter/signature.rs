//! Signature verification over entity and role descriptors.

use std::collections::BTreeSet;
use std::sync::Arc;

use fedtrust_xmlsec::{
    CriteriaSet, Credential, DefaultSignatureValidator, KeyInfoCriterion, Resolver,
    SignableXmlObject, SignatureValidator, UsageCriterion, UsageType,
};

use super::MetadataFilter;
use crate::error::{MetadataError, MetadataResult};
use crate::metadata::EntityDescriptor;
use crate::profile::SignatureProfileValidator;
use crate::trusted_names::{SignedObject, TrustedNamesFunction};

const NAME: &str = "signature_validation";

/// Verifies metadata signatures and fails closed.
///
/// Verification credentials come from the configured resolver, queried with the
/// signature's own KeyInfo and signing usage. A local-trust resolver therefore
/// only ever yields locally trusted keys; a plain credential store acts as an
/// out-of-band key set.
///
/// Acceptable signer names are computed per object by the trusted-names
/// function when one is configured, falling back to the static set when it
/// fails. An empty name set places no restriction on the signer's names.
///
/// A signed entity that fails verification is rejected. A signed role inside
/// an accepted entity that fails verification is removed from the entity.
pub struct SignatureValidationFilter {
    credential_resolver: Arc<dyn Resolver<Credential>>,
    validator: Arc<dyn SignatureValidator>,
    profile: SignatureProfileValidator,
    require_signature: bool,
    trusted_names: BTreeSet<String>,
    dynamic_names: Option<Arc<dyn TrustedNamesFunction>>,
}

impl SignatureValidationFilter {
    pub fn new(credential_resolver: Arc<dyn Resolver<Credential>>) -> Self {
        Self {
            credential_resolver,
            validator: Arc::new(DefaultSignatureValidator),
            profile: SignatureProfileValidator,
            require_signature: false,
            trusted_names: BTreeSet::new(),
            dynamic_names: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SignatureValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Reject entities that carry no signature.
    pub fn with_require_signature(mut self, require: bool) -> Self {
        self.require_signature = require;
        self
    }

    /// Static trusted signer names.
    pub fn with_trusted_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trusted_names_function(mut self, function: Arc<dyn TrustedNamesFunction>) -> Self {
        self.dynamic_names = Some(function);
        self
    }

    fn reject(reason: impl Into<String>) -> MetadataError {
        MetadataError::filtered(NAME, reason)
    }

    fn names_for(&self, signed: &SignedObject<'_>) -> MetadataResult<BTreeSet<String>> {
        let Some(function) = &self.dynamic_names else {
            return Ok(self.trusted_names.clone());
        };

        match function.trusted_names(signed) {
            Some(names) => Ok(names),
            None if !self.trusted_names.is_empty() => {
                tracing::warn!(
                    entity_id = %signed.entity().entity_id,
                    "trusted names function failed, using static names"
                );
                Ok(self.trusted_names.clone())
            }
            None => Err(Self::reject(
                "trusted names could not be computed and no static names are configured",
            )),
        }
    }

    /// Verify the signature on `object`, which must be signed.
    fn verify<O: SignableXmlObject + ?Sized>(
        &self,
        object: &O,
        signed: SignedObject<'_>,
    ) -> MetadataResult<()> {
        let signature = object
            .signature()
            .ok_or_else(|| Self::reject("object carries no signature"))?;

        self.profile
            .validate(object)
            .map_err(|e| Self::reject(e.to_string()))?;

        let content = object
            .canonical_content()
            .map_err(|e| Self::reject(e.to_string()))?;

        let names = self.names_for(&signed)?;

        let criteria = CriteriaSet::new()
            .with(KeyInfoCriterion::new(signature.key_info.clone().unwrap_or_default()))
            .with(UsageCriterion::new(UsageType::Signing));

        let mut tried = 0usize;
        let mut last_failure = None;
        for credential in self.credential_resolver.resolve(&criteria)? {
            tried += 1;
            match self.validator.validate_content(signature, &content, &credential) {
                Ok(()) if names.is_empty() || credential.has_any_key_name(&names) => {
                    tracing::debug!(
                        entity_id = %signed.entity().entity_id,
                        key_names = ?credential.key_names,
                        "signature verified"
                    );
                    return Ok(());
                }
                Ok(()) => {
                    last_failure = Some(format!(
                        "signer {:?} is not among the trusted names",
                        credential.key_names
                    ));
                }
                Err(e) => last_failure = Some(e.to_string()),
            }
        }

        Err(Self::reject(match last_failure {
            Some(reason) => {
                format!("no credential verified the signature ({} tried): {}", tried, reason)
            }
            None => "no verification credential resolved".to_string(),
        }))
    }
}

impl std::fmt::Debug for SignatureValidationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidationFilter")
            .field("require_signature", &self.require_signature)
            .field("trusted_names", &self.trusted_names)
            .field("dynamic_names", &self.dynamic_names.is_some())
            .finish()
    }
}

impl MetadataFilter for SignatureValidationFilter {
    fn name(&self) -> &str {
        NAME
    }

    fn filter(&self, mut entity: EntityDescriptor) -> MetadataResult<Option<EntityDescriptor>> {
        if entity.signature.is_some() {
            self.verify(&entity, SignedObject::Entity(&entity))?;
        } else if self.require_signature {
            return Err(Self::reject("entity is not signed"));
        }

        let roles = std::mem::take(&mut entity.roles);
        let retained: Vec<_> = roles
            .into_iter()
            .filter(|role| {
                if role.signature.is_none() {
                    return true;
                }
                let signed = SignedObject::Role {
                    entity: &entity,
                    role,
                };
                match self.verify(&**role, signed) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(
                            entity_id = %entity.entity_id,
                            role = %role.element_type,
                            error = %e,
                            "signed role removed"
                        );
                        false
                    }
                }
            })
            .collect();
        entity.roles = retained;

        Ok(Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{idp_sso_descriptor, sp_sso_descriptor, SAML20P_NS};
    use crate::metadata::RoleDescriptor;
    use ed25519_dalek::{Signer, SigningKey};
    use fedtrust_xmlsec::signature::{ContentReference, ALGO_ED25519, EXC_C14N};
    use fedtrust_xmlsec::{
        CollectionCredentialResolver, KeyInfo, LocalKeyInfoCredentialResolver, PublicKey,
        Signature,
    };

    struct Fixture {
        key: SigningKey,
        resolver: Arc<dyn Resolver<Credential>>,
    }

    fn fixture(name: &str) -> Fixture {
        let key = SigningKey::generate(&mut rand::thread_rng());
        let public = PublicKey::from_ed25519(&key.verifying_key()).unwrap();
        let store = Arc::new(CollectionCredentialResolver::new(vec![
            Credential::from_public_key(public).with_key_name(name),
        ]));
        Fixture {
            key,
            resolver: Arc::new(LocalKeyInfoCredentialResolver::with_default_providers(store)),
        }
    }

    fn sign<O: SignableXmlObject>(key: &SigningKey, object: &O, key_name: &str) -> Signature {
        let id = object.signature_reference_id().unwrap();
        let reference = ContentReference::enveloped(id)
            .with_digest_of(&object.canonical_content().unwrap())
            .unwrap();
        let signed_info = format!(
            "<SignedInfo><Reference URI=\"{}\"><DigestValue>{}</DigestValue></Reference>\
             </SignedInfo>",
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

    fn signed_entity(key: &SigningKey, key_name: &str) -> EntityDescriptor {
        let entity = EntityDescriptor::new("https://idp.example.org")
            .with_id("_e1")
            .with_role(RoleDescriptor::new(idp_sso_descriptor(), [SAML20P_NS]));
        let signature = sign(key, &entity, key_name);
        entity.with_signature(signature)
    }

    fn signed_role(key: &SigningKey, id: &str, key_name: &str) -> RoleDescriptor {
        let role = RoleDescriptor::new(idp_sso_descriptor(), [SAML20P_NS]).with_id(id);
        let signature = sign(key, &role, key_name);
        role.with_signature(signature)
    }

    fn federation(_: &SignedObject<'_>) -> Option<BTreeSet<String>> {
        Some(BTreeSet::from(["fed-signer".to_string()]))
    }

    fn broken(_: &SignedObject<'_>) -> Option<BTreeSet<String>> {
        None
    }

    #[test]
    fn test_accepts_trusted_signer() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver).with_trusted_names(["fed-signer"]);

        let out = filter.filter(signed_entity(&fx.key, "fed-signer")).unwrap();
        assert!(out.is_some());
    }

    #[test]
    fn test_rejects_untrusted_signer_name() {
        let fx = fixture("other-signer");
        let filter = SignatureValidationFilter::new(fx.resolver).with_trusted_names(["fed-signer"]);

        let result = filter.filter(signed_entity(&fx.key, "other-signer"));
        assert!(matches!(result, Err(MetadataError::Filtered { .. })));
    }

    #[test]
    fn test_rejects_tampered_signature() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver);

        let mut entity = signed_entity(&fx.key, "fed-signer");
        if let Some(signature) = entity.signature.as_mut() {
            signature.signed_info.push(b' ');
        }
        assert!(filter.filter(entity).is_err());
    }

    #[test]
    fn test_rejects_signature_moved_to_other_entity() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver)
            .with_require_signature(true)
            .with_trusted_names(["fed-signer"]);

        let genuine = signed_entity(&fx.key, "fed-signer");
        let forged = EntityDescriptor::new("https://attacker.example.org")
            .with_id("_e1")
            .with_role(RoleDescriptor::new(sp_sso_descriptor(), ["urn:evil"]))
            .with_signature(genuine.signature.clone().unwrap());

        let result = filter.filter(forged);
        assert!(matches!(result, Err(MetadataError::Filtered { .. })));
        assert!(filter.filter(genuine).unwrap().is_some());
    }

    #[test]
    fn test_rejects_content_changed_after_signing() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver);

        let mut entity = signed_entity(&fx.key, "fed-signer");
        entity.roles.push(Arc::new(RoleDescriptor::new(sp_sso_descriptor(), [SAML20P_NS])));
        assert!(filter.filter(entity).is_err());
    }

    #[test]
    fn test_rejects_when_no_credential_resolves() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver);

        // Key name unknown to the local store.
        assert!(filter.filter(signed_entity(&fx.key, "stranger")).is_err());
    }

    #[test]
    fn test_unsigned_entity_depends_on_policy() {
        let fx = fixture("fed-signer");
        let lenient = SignatureValidationFilter::new(fx.resolver.clone());
        let strict = SignatureValidationFilter::new(fx.resolver).with_require_signature(true);

        let entity = EntityDescriptor::new("https://sp.example.org");
        assert!(lenient.filter(entity.clone()).unwrap().is_some());
        assert!(strict.filter(entity).is_err());
    }

    #[test]
    fn test_profile_violation_rejected_before_crypto() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver);

        let elsewhere = EntityDescriptor::new("https://idp.example.org").with_id("_elsewhere");
        let entity = EntityDescriptor::new("https://idp.example.org")
            .with_id("_e1")
            .with_signature(sign(&fx.key, &elsewhere, "fed-signer"));
        assert!(filter.filter(entity).is_err());
    }

    #[test]
    fn test_dynamic_names_take_precedence() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver)
            .with_trusted_names(["someone-else"])
            .with_trusted_names_function(Arc::new(federation));

        assert!(filter.filter(signed_entity(&fx.key, "fed-signer")).unwrap().is_some());
    }

    #[test]
    fn test_failed_dynamic_names_fall_back_or_fail_closed() {
        let fx = fixture("fed-signer");
        let with_fallback = SignatureValidationFilter::new(fx.resolver.clone())
            .with_trusted_names(["fed-signer"])
            .with_trusted_names_function(Arc::new(broken));
        let without_fallback = SignatureValidationFilter::new(fx.resolver)
            .with_trusted_names_function(Arc::new(broken));

        assert!(with_fallback
            .filter(signed_entity(&fx.key, "fed-signer"))
            .unwrap()
            .is_some());
        assert!(without_fallback
            .filter(signed_entity(&fx.key, "fed-signer"))
            .is_err());
    }

    #[test]
    fn test_invalid_signed_role_is_removed() {
        let fx = fixture("fed-signer");
        let filter = SignatureValidationFilter::new(fx.resolver);

        let mut bad = signed_role(&fx.key, "_idp", "fed-signer");
        if let Some(signature) = bad.signature.as_mut() {
            signature.signature_value[0] ^= 0xff;
        }

        let entity = EntityDescriptor::new("https://idp.example.org")
            .with_role(RoleDescriptor::new(sp_sso_descriptor(), [SAML20P_NS]))
            .with_role(bad)
            .with_role(signed_role(&fx.key, "_idp2", "fed-signer"));

        let out = filter.filter(entity).unwrap().unwrap();
        let ids: Vec<_> = out.roles.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![None, Some("_idp2".to_string())]);
    }
}
