//! Role type whitelisting.

use fedtrust_xmlsec::QName;

use super::MetadataFilter;
use crate::error::MetadataResult;
use crate::metadata::EntityDescriptor;

/// Keeps only role descriptors of the listed element types.
#[derive(Debug, Clone)]
pub struct EntityRoleFilter {
    retained_roles: Vec<QName>,
    remove_roleless_entities: bool,
}

impl EntityRoleFilter {
    pub fn new(retained_roles: Vec<QName>) -> Self {
        Self {
            retained_roles,
            remove_roleless_entities: true,
        }
    }

    /// Whether an entity left without roles is dropped. Defaults to true.
    pub fn with_remove_roleless_entities(mut self, remove: bool) -> Self {
        self.remove_roleless_entities = remove;
        self
    }
}

impl MetadataFilter for EntityRoleFilter {
    fn name(&self) -> &str {
        "entity_role"
    }

    fn filter(&self, mut entity: EntityDescriptor) -> MetadataResult<Option<EntityDescriptor>> {
        let before = entity.roles.len();
        entity
            .roles
            .retain(|role| self.retained_roles.contains(&role.element_type));

        if entity.roles.len() != before {
            tracing::debug!(
                entity_id = %entity.entity_id,
                removed = before - entity.roles.len(),
                "removed unretained roles"
            );
        }

        if entity.roles.is_empty() && self.remove_roleless_entities {
            return Ok(None);
        }
        Ok(Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{idp_sso_descriptor, pdp_descriptor, sp_sso_descriptor, SAML20P_NS};
    use crate::metadata::RoleDescriptor;

    fn entity() -> EntityDescriptor {
        EntityDescriptor::new("e")
            .with_role(RoleDescriptor::new(idp_sso_descriptor(), [SAML20P_NS]))
            .with_role(RoleDescriptor::new(pdp_descriptor(), [SAML20P_NS]))
            .with_role(RoleDescriptor::new(sp_sso_descriptor(), [SAML20P_NS]))
    }

    #[test]
    fn test_retains_listed_roles_in_order() {
        let filter = EntityRoleFilter::new(vec![sp_sso_descriptor(), idp_sso_descriptor()]);
        let out = filter.filter(entity()).unwrap().unwrap();
        let types: Vec<_> = out.roles.iter().map(|r| r.element_type.local_part.clone()).collect();
        assert_eq!(types, vec!["IDPSSODescriptor", "SPSSODescriptor"]);
    }

    #[test]
    fn test_roleless_entity() {
        let filter = EntityRoleFilter::new(Vec::new());
        assert!(filter.filter(entity()).unwrap().is_none());

        let keep = EntityRoleFilter::new(Vec::new()).with_remove_roleless_entities(false);
        assert!(keep.filter(entity()).unwrap().unwrap().roles.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let filter = EntityRoleFilter::new(vec![sp_sso_descriptor()]);
        let once = filter.filter(entity()).unwrap().unwrap();
        let twice = filter.filter(once.clone()).unwrap().unwrap();
        assert_eq!(once.roles.len(), twice.roles.len());
    }
}
