//! Metadata filters applied before metadata is trusted.
//!
//! A filter receives an entity by value and returns it (possibly trimmed),
//! drops it (`Ok(None)`), or rejects it with an error. Filters run on every
//! refresh, so applying one to metadata it has already seen must be harmless.

mod entity_id;
mod role;
mod signature;
mod valid_until;

pub use entity_id::EntityIdPredicateFilter;
pub use role::EntityRoleFilter;
pub use signature::SignatureValidationFilter;
pub use valid_until::RequiredValidUntilFilter;

use std::sync::Arc;

use crate::error::MetadataResult;
use crate::metadata::EntityDescriptor;

/// A transformation or validation step over one entity descriptor.
pub trait MetadataFilter: Send + Sync {
    /// Short name for logs and errors.
    fn name(&self) -> &str;

    fn filter(&self, entity: EntityDescriptor) -> MetadataResult<Option<EntityDescriptor>>;
}

/// Runs filters in order.
///
/// A filter error excludes the entity and processing continues with the next
/// one, unless `abort_on_error` is set, in which case the error is returned.
pub struct MetadataFilterChain {
    filters: Vec<Arc<dyn MetadataFilter>>,
    abort_on_error: bool,
}

impl MetadataFilterChain {
    pub fn new(filters: Vec<Arc<dyn MetadataFilter>>) -> Self {
        Self {
            filters,
            abort_on_error: false,
        }
    }

    pub fn with_abort_on_error(mut self, abort: bool) -> Self {
        self.abort_on_error = abort;
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl std::fmt::Debug for MetadataFilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataFilterChain")
            .field("filters", &self.names())
            .field("abort_on_error", &self.abort_on_error)
            .finish()
    }
}

impl MetadataFilter for MetadataFilterChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn filter(&self, entity: EntityDescriptor) -> MetadataResult<Option<EntityDescriptor>> {
        let entity_id = entity.entity_id.clone();
        let mut current = entity;

        for filter in &self.filters {
            match filter.filter(current) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    tracing::debug!(
                        entity_id = %entity_id,
                        filter = filter.name(),
                        "entity removed"
                    );
                    return Ok(None);
                }
                Err(e) if self.abort_on_error => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        entity_id = %entity_id,
                        filter = filter.name(),
                        error = %e,
                        "entity rejected"
                    );
                    return Ok(None);
                }
            }
        }

        Ok(Some(current))
    }
}
