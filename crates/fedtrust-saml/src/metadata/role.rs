//! Role descriptor resolution on top of a metadata resolver.

use std::sync::Arc;

use chrono::Utc;
use fedtrust_xmlsec::{CriteriaSet, Resolved, Resolver, ResolverError, ResolverResult};

use super::{EntityDescriptor, MetadataResolver, RoleDescriptor};
use crate::criterion::{EntityRoleCriterion, ProtocolCriterion};

/// Narrows resolved entities to their role descriptors.
///
/// Requires an [`EntityRoleCriterion`]. A [`ProtocolCriterion`] further
/// restricts results to roles supporting that protocol. All matches are
/// returned in entity order, then document order within each entity, so an
/// entity publishing several roles of one type yields all of them.
pub struct PredicateRoleDescriptorResolver {
    metadata: Arc<dyn MetadataResolver>,
    require_valid_metadata: bool,
}

impl PredicateRoleDescriptorResolver {
    pub fn new(metadata: Arc<dyn MetadataResolver>) -> Self {
        Self {
            metadata,
            require_valid_metadata: true,
        }
    }

    /// Whether expired entities and roles are skipped. Defaults to true.
    pub fn with_require_valid_metadata(mut self, require: bool) -> Self {
        self.require_valid_metadata = require;
        self
    }
}

impl std::fmt::Debug for PredicateRoleDescriptorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRoleDescriptorResolver")
            .field("metadata", &self.metadata.id())
            .field("require_valid_metadata", &self.require_valid_metadata)
            .finish()
    }
}

impl Resolver<Arc<RoleDescriptor>> for PredicateRoleDescriptorResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Resolved<'_, Arc<RoleDescriptor>>> {
        let role = criteria
            .get::<EntityRoleCriterion>()
            .map(|c| c.role().clone())
            .ok_or_else(|| ResolverError::invalid_criteria("EntityRoleCriterion is required"))?;
        let protocol = criteria
            .get::<ProtocolCriterion>()
            .map(|c| c.protocol().to_string());
        let require_valid = self.require_valid_metadata;
        let now = Utc::now();

        let entities = self.metadata.resolve(criteria)?;

        Ok(Box::new(
            entities
                .filter(move |entity| {
                    let valid = !require_valid || entity.is_valid_at(now);
                    if !valid {
                        tracing::debug!(entity_id = %entity.entity_id, "skipping expired entity");
                    }
                    valid
                })
                .flat_map(move |entity| {
                    matching_roles(&entity, &role, protocol.as_deref(), require_valid, now)
                }),
        ))
    }
}

fn matching_roles(
    entity: &EntityDescriptor,
    role: &fedtrust_xmlsec::QName,
    protocol: Option<&str>,
    require_valid: bool,
    now: chrono::DateTime<Utc>,
) -> Vec<Arc<RoleDescriptor>> {
    entity
        .roles
        .iter()
        .filter(|r| &r.element_type == role)
        .filter(|r| protocol.map_or(true, |p| r.supports_protocol(p)))
        .filter(|r| !require_valid || r.is_valid_at(now))
        .cloned()
        .collect()
}
