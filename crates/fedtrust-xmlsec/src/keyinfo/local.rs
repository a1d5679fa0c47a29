//! KeyInfo resolution anchored in a local trusted-credential store.

use std::sync::Arc;

use super::provider::KeyInfoProvider;
use super::resolver::{key_info_and_usage, KeyInfoCredentialResolver};
use crate::credential::Credential;
use crate::criteria::{CriteriaSet, KeyNameCriterion, PublicKeyCriterion, UsageCriterion};
use crate::error::ResolverResult;
use crate::resolver::{Resolved, Resolver};

/// Resolves KeyInfo to locally trusted credentials only.
///
/// Candidates extracted from the KeyInfo are never returned themselves. Each
/// candidate carrying a public key is replaced by the store entries holding a
/// bitwise-identical key. When no extracted key is in the store, each
/// `<ds:KeyName>` is looked up in the store instead. Candidates the store does not know are
/// dropped silently, so an empty result means "nothing trusted", not "nothing
/// found".
///
/// Store order is preserved and matches are not de-duplicated.
pub struct LocalKeyInfoCredentialResolver {
    extractor: KeyInfoCredentialResolver,
    store: Arc<dyn Resolver<Credential>>,
}

impl LocalKeyInfoCredentialResolver {
    pub fn new(
        providers: Vec<Arc<dyn KeyInfoProvider>>,
        store: Arc<dyn Resolver<Credential>>,
    ) -> Self {
        Self {
            extractor: KeyInfoCredentialResolver::new(providers),
            store,
        }
    }

    /// Create a resolver using the built-in provider chain.
    pub fn with_default_providers(store: Arc<dyn Resolver<Credential>>) -> Self {
        Self {
            extractor: KeyInfoCredentialResolver::default(),
            store,
        }
    }

    fn lookup(&self, criteria: CriteriaSet, out: &mut Vec<Credential>) -> ResolverResult<()> {
        out.extend(self.store.resolve(&criteria)?);
        Ok(())
    }
}

impl std::fmt::Debug for LocalKeyInfoCredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyInfoCredentialResolver")
            .field("providers", &self.extractor.providers())
            .finish_non_exhaustive()
    }
}

impl Resolver<Credential> for LocalKeyInfoCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Resolved<'_, Credential>> {
        let (key_info, usage) = key_info_and_usage(criteria)?;
        let candidates = self.extractor.extract(key_info, usage);
        let usage_criterion = UsageCriterion::new(usage);

        let mut trusted = Vec::new();
        for key in candidates.into_iter().filter_map(|c| c.public_key) {
            let fingerprint = key.fingerprint();
            let before = trusted.len();
            let lookup = CriteriaSet::new()
                .with(PublicKeyCriterion::new(key))
                .with(usage_criterion);
            self.lookup(lookup, &mut trusted)?;
            if trusted.len() == before {
                tracing::debug!(key = %fingerprint, "extracted key not in local store, dropped");
            }
        }

        if trusted.is_empty() {
            for name in key_info.key_names() {
                let lookup = CriteriaSet::new()
                    .with(KeyNameCriterion::new(name))
                    .with(usage_criterion);
                self.lookup(lookup, &mut trusted)?;
            }
        }

        tracing::debug!(trusted = trusted.len(), "local KeyInfo resolution complete");
        Ok(Box::new(trusted.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{PrivateKey, PublicKey};
    use crate::criteria::KeyInfoCriterion;
    use crate::error::ResolverError;
    use crate::keyinfo::{KeyInfo, KeyInfoChild};
    use crate::store::CollectionCredentialResolver;

    fn key() -> PublicKey {
        let signing = ed25519_dalek::SigningKey::generate(&mut rand::thread_rng());
        PublicKey::from_ed25519(&signing.verifying_key()).unwrap()
    }

    struct Broken;

    impl Resolver<Credential> for Broken {
        fn resolve(&self, _: &CriteriaSet) -> ResolverResult<Resolved<'_, Credential>> {
            Err(ResolverError::unavailable("store offline"))
        }
    }

    #[test]
    fn test_key_wins_over_name() {
        let known = key();
        let store = Arc::new(CollectionCredentialResolver::new(vec![
            Credential::from_public_key(key()).with_key_name("MyKey"),
            Credential::from_public_key(known.clone())
                .with_key_name("by-key")
                .with_private_key(PrivateKey::from_pkcs8_der(vec![1])),
        ]));
        let resolver = LocalKeyInfoCredentialResolver::with_default_providers(store);

        let key_info = KeyInfo::new()
            .with_key_name("MyKey")
            .with_child(KeyInfoChild::DerEncodedKeyValue(known.spki_der().to_vec()));
        let criteria = CriteriaSet::new().with(KeyInfoCriterion::new(key_info));

        let resolved: Vec<_> = resolver.resolve(&criteria).unwrap().collect();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].key_names.contains("by-key"));
        assert!(resolved[0].private_key.is_some());
    }

    #[test]
    fn test_store_failure_propagates() {
        let resolver = LocalKeyInfoCredentialResolver::with_default_providers(Arc::new(Broken));
        let criteria =
            CriteriaSet::new().with(KeyInfoCriterion::new(KeyInfo::new().with_key_name("MyKey")));

        let result = resolver.resolve(&criteria);
        assert!(matches!(result, Err(ResolverError::Unavailable { .. })));
    }

    #[test]
    fn test_empty_key_info_is_empty() {
        let store = Arc::new(CollectionCredentialResolver::new(vec![
            Credential::from_public_key(key()).with_key_name("MyKey"),
        ]));
        let resolver = LocalKeyInfoCredentialResolver::with_default_providers(store);
        let criteria = CriteriaSet::new().with(KeyInfoCriterion::new(KeyInfo::new()));

        assert!(resolver.resolve_single(&criteria).unwrap().is_none());
    }
}
