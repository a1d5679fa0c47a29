//! Local trusted-credential store.
//!
//! Holds the credentials this deployment trusts outright: locally configured
//! keys (optionally with private halves) addressed by key name, entity id, or
//! public key.

use std::sync::{Arc, RwLock};

use crate::credential::Credential;
use crate::criteria::{
    CriteriaSet, EntityIdCriterion, KeyNameCriterion, PublicKeyCriterion, UsageCriterion,
};
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{Resolved, Resolver};

/// Credential store backed by an in-memory collection.
///
/// Readers take a snapshot of the collection at the start of `resolve`; an
/// update swaps in a new collection and never disturbs an in-flight iteration.
#[derive(Debug, Default)]
pub struct CollectionCredentialResolver {
    credentials: RwLock<Arc<Vec<Credential>>>,
}

impl CollectionCredentialResolver {
    /// Create a store holding `credentials`, in the given order.
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials: RwLock::new(Arc::new(credentials)),
        }
    }

    /// Append a credential.
    pub fn add(&self, credential: Credential) -> ResolverResult<()> {
        let mut guard = self.write_guard()?;
        let mut next = Vec::clone(&guard);
        next.push(credential);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace the whole collection.
    pub fn replace_all(&self, credentials: Vec<Credential>) -> ResolverResult<()> {
        *self.write_guard()? = Arc::new(credentials);
        Ok(())
    }

    /// Number of credentials currently held.
    pub fn len(&self) -> ResolverResult<usize> {
        Ok(self.snapshot()?.len())
    }

    pub fn is_empty(&self) -> ResolverResult<bool> {
        Ok(self.snapshot()?.is_empty())
    }

    fn snapshot(&self) -> ResolverResult<Arc<Vec<Credential>>> {
        self.credentials
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| ResolverError::unavailable("credential store lock poisoned"))
    }

    fn write_guard(&self) -> ResolverResult<std::sync::RwLockWriteGuard<'_, Arc<Vec<Credential>>>> {
        self.credentials
            .write()
            .map_err(|_| ResolverError::unavailable("credential store lock poisoned"))
    }
}

/// The subset of criteria this store understands.
#[derive(Debug, Clone, Default)]
struct StoreQuery {
    entity_id: Option<EntityIdCriterion>,
    key_name: Option<KeyNameCriterion>,
    public_key: Option<PublicKeyCriterion>,
    usage: Option<UsageCriterion>,
}

impl StoreQuery {
    fn from_criteria(criteria: &CriteriaSet) -> Self {
        Self {
            entity_id: criteria.get::<EntityIdCriterion>().cloned(),
            key_name: criteria.get::<KeyNameCriterion>().cloned(),
            public_key: criteria.get::<PublicKeyCriterion>().cloned(),
            usage: criteria.get::<UsageCriterion>().copied(),
        }
    }

    fn matches(&self, credential: &Credential) -> bool {
        if let Some(entity) = &self.entity_id {
            if credential.entity_id.as_deref() != Some(entity.entity_id()) {
                return false;
            }
        }
        if let Some(name) = &self.key_name {
            if !credential.key_names.contains(name.key_name()) {
                return false;
            }
        }
        if let Some(key) = &self.public_key {
            if credential.public_key.as_ref() != Some(key.public_key()) {
                return false;
            }
        }
        if let Some(usage) = &self.usage {
            if !credential.usage.is_compatible_with(usage.usage()) {
                return false;
            }
        }
        true
    }
}

impl Resolver<Credential> for CollectionCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Resolved<'_, Credential>> {
        let snapshot = self.snapshot()?;
        let query = StoreQuery::from_criteria(criteria);

        tracing::debug!(
            held = snapshot.len(),
            key_name = query.key_name.as_ref().map(|n| n.key_name()),
            "resolving from local credential store"
        );

        let len = snapshot.len();
        Ok(Box::new((0..len).filter_map(move |i| {
            let credential = &snapshot[i];
            query.matches(credential).then(|| credential.clone())
        })))
    }
}
