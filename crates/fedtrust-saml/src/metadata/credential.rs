//! Credentials published in metadata.

use std::sync::Arc;

use fedtrust_xmlsec::{
    CriteriaSet, Credential, EntityIdCriterion, KeyInfoCredentialResolver, KeyInfoCriterion,
    Resolved, Resolver, ResolverError, ResolverResult, UsageCriterion, UsageType,
};

use super::RoleDescriptor;

/// Resolves the credentials an entity publishes for a role.
///
/// Requires an [`EntityIdCriterion`] and an
/// [`EntityRoleCriterion`](crate::EntityRoleCriterion); a
/// [`ProtocolCriterion`](crate::ProtocolCriterion) and a [`UsageCriterion`]
/// narrow the result. Key descriptors whose usage is incompatible with the
/// requested usage are skipped. Each credential is stamped with the entity id
/// and, when the KeyInfo said nothing more specific, the descriptor's usage.
pub struct MetadataCredentialResolver {
    roles: Arc<dyn Resolver<Arc<RoleDescriptor>>>,
    key_info: Arc<dyn Resolver<Credential>>,
}

impl MetadataCredentialResolver {
    /// Create a resolver that extracts keys with the built-in provider chain.
    pub fn new(roles: Arc<dyn Resolver<Arc<RoleDescriptor>>>) -> Self {
        Self::with_key_info_resolver(roles, Arc::new(KeyInfoCredentialResolver::default()))
    }

    pub fn with_key_info_resolver(
        roles: Arc<dyn Resolver<Arc<RoleDescriptor>>>,
        key_info: Arc<dyn Resolver<Credential>>,
    ) -> Self {
        Self { roles, key_info }
    }
}

impl std::fmt::Debug for MetadataCredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCredentialResolver").finish_non_exhaustive()
    }
}

impl Resolver<Credential> for MetadataCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Resolved<'_, Credential>> {
        let entity_id = criteria
            .get::<EntityIdCriterion>()
            .map(|c| c.entity_id().to_string())
            .ok_or_else(|| ResolverError::invalid_criteria("EntityIdCriterion is required"))?;
        let wanted = criteria
            .get::<UsageCriterion>()
            .map(UsageCriterion::usage)
            .unwrap_or_default();

        let mut credentials = Vec::new();
        for role in self.roles.resolve(criteria)? {
            for descriptor in &role.key_descriptors {
                if !descriptor.usage.is_compatible_with(wanted) {
                    continue;
                }
                let usage = if descriptor.usage == UsageType::Unspecified {
                    wanted
                } else {
                    descriptor.usage
                };

                let lookup = CriteriaSet::new()
                    .with(KeyInfoCriterion::new(descriptor.key_info.clone()))
                    .with(UsageCriterion::new(usage));
                for mut credential in self.key_info.resolve(&lookup)? {
                    credential.entity_id = Some(entity_id.clone());
                    if credential.usage == UsageType::Unspecified {
                        credential.usage = descriptor.usage;
                    }
                    credentials.push(credential);
                }
            }
        }

        tracing::debug!(
            entity_id = %entity_id,
            count = credentials.len(),
            "resolved metadata credentials"
        );
        Ok(Box::new(credentials.into_iter()))
    }
}
