//! Entity descriptor resolvers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use fedtrust_xmlsec::{
    CriteriaSet, EntityIdCriterion, Resolved, Resolver, ResolverError, ResolverResult,
};

use super::EntityDescriptor;
use crate::error::MetadataResult;
use crate::filter::MetadataFilter;

/// Resolves entity descriptors by [`EntityIdCriterion`].
///
/// Without an entity id criterion, every entity is returned in document order.
pub trait MetadataResolver: Resolver<Arc<EntityDescriptor>> {
    /// Identifier used in logs.
    fn id(&self) -> &str;
}

#[derive(Debug)]
struct Snapshot {
    entities: Vec<Arc<EntityDescriptor>>,
    by_id: HashMap<String, usize>,
    refreshed_at: DateTime<Utc>,
}

/// Metadata store holding a filtered batch of entity descriptors.
///
/// [`refresh`](Self::refresh) runs the filter over a new batch without holding
/// any lock, then swaps the result in. Resolution works on the snapshot current
/// when it started.
pub struct InMemoryMetadataResolver {
    id: String,
    filter: Option<Arc<dyn MetadataFilter>>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl InMemoryMetadataResolver {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filter: None,
            snapshot: RwLock::new(None),
        }
    }

    /// Filter applied to every entity on refresh.
    ///
    /// A filter error aborts the refresh and keeps the previous snapshot. Use a
    /// [`MetadataFilterChain`](crate::filter::MetadataFilterChain) to confine
    /// failures to the entity that caused them.
    pub fn with_filter(mut self, filter: Arc<dyn MetadataFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Replace the store contents with a filtered `batch`.
    ///
    /// Returns the number of entities retained. When an entityID occurs more
    /// than once, the first occurrence wins.
    pub fn refresh(&self, batch: Vec<EntityDescriptor>) -> MetadataResult<usize> {
        let offered = batch.len();
        let mut entities = Vec::with_capacity(offered);
        let mut by_id = HashMap::with_capacity(offered);

        for entity in batch {
            let entity = match &self.filter {
                Some(filter) => match filter.filter(entity)? {
                    Some(entity) => entity,
                    None => continue,
                },
                None => entity,
            };

            if by_id.contains_key(&entity.entity_id) {
                tracing::warn!(
                    resolver = %self.id,
                    entity_id = %entity.entity_id,
                    "duplicate entityID, keeping first occurrence"
                );
                continue;
            }
            by_id.insert(entity.entity_id.clone(), entities.len());
            entities.push(Arc::new(entity));
        }

        let retained = entities.len();
        let next = Arc::new(Snapshot {
            entities,
            by_id,
            refreshed_at: Utc::now(),
        });

        let mut snapshot = self
            .snapshot
            .write()
            .map_err(|_| ResolverError::unavailable("metadata snapshot lock poisoned"))?;
        *snapshot = Some(next);
        drop(snapshot);

        tracing::info!(resolver = %self.id, offered, retained, "metadata refreshed");
        Ok(retained)
    }

    /// When the current snapshot was installed.
    pub fn last_refresh(&self) -> ResolverResult<Option<DateTime<Utc>>> {
        Ok(self.current()?.map(|s| s.refreshed_at))
    }

    fn current(&self) -> ResolverResult<Option<Arc<Snapshot>>> {
        self.snapshot
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| ResolverError::unavailable("metadata snapshot lock poisoned"))
    }
}

impl std::fmt::Debug for InMemoryMetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetadataResolver")
            .field("id", &self.id)
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

impl Resolver<Arc<EntityDescriptor>> for InMemoryMetadataResolver {
    fn resolve(
        &self,
        criteria: &CriteriaSet,
    ) -> ResolverResult<Resolved<'_, Arc<EntityDescriptor>>> {
        let snapshot = self.current()?.ok_or_else(|| {
            ResolverError::unavailable(format!(
                "metadata resolver '{}' has not been refreshed",
                self.id
            ))
        })?;

        match criteria.get::<EntityIdCriterion>() {
            Some(wanted) => {
                let found = snapshot
                    .by_id
                    .get(wanted.entity_id())
                    .map(|&index| Arc::clone(&snapshot.entities[index]));
                tracing::debug!(
                    resolver = %self.id,
                    entity_id = %wanted.entity_id(),
                    found = found.is_some(),
                    "resolved entity"
                );
                Ok(Box::new(found.into_iter()))
            }
            None => {
                let len = snapshot.entities.len();
                Ok(Box::new((0..len).map(move |i| Arc::clone(&snapshot.entities[i]))))
            }
        }
    }
}

impl MetadataResolver for InMemoryMetadataResolver {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Consults member resolvers in order; the first non-empty result wins.
///
/// A member error ends resolution and is returned as-is.
pub struct ChainingMetadataResolver {
    id: String,
    members: Vec<Arc<dyn MetadataResolver>>,
}

impl ChainingMetadataResolver {
    pub fn new(id: impl Into<String>, members: Vec<Arc<dyn MetadataResolver>>) -> Self {
        Self {
            id: id.into(),
            members,
        }
    }
}

impl Resolver<Arc<EntityDescriptor>> for ChainingMetadataResolver {
    fn resolve(
        &self,
        criteria: &CriteriaSet,
    ) -> ResolverResult<Resolved<'_, Arc<EntityDescriptor>>> {
        for member in &self.members {
            let mut results = member.resolve(criteria)?.peekable();
            if results.peek().is_some() {
                tracing::debug!(chain = %self.id, member = member.id(), "chain member matched");
                return Ok(Box::new(results));
            }
        }
        Ok(Box::new(std::iter::empty()))
    }
}

impl MetadataResolver for ChainingMetadataResolver {
    fn id(&self) -> &str {
        &self.id
    }
}
