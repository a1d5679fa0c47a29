//! Credential extraction through the provider chain.

use std::sync::Arc;

use super::provider::{default_providers, KeyInfoProvider, KeyInfoResolutionContext};
use super::KeyInfo;
use crate::credential::{Credential, UsageType};
use crate::criteria::{CriteriaSet, KeyInfoCriterion, UsageCriterion};
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{Resolved, Resolver};

/// Resolves the credentials a KeyInfo describes.
///
/// Output is untrusted: it is whatever the KeyInfo's author put there.
/// Requires a [`KeyInfoCriterion`]; honours an optional [`UsageCriterion`].
#[derive(Debug, Clone)]
pub struct KeyInfoCredentialResolver {
    providers: Vec<Arc<dyn KeyInfoProvider>>,
}

impl Default for KeyInfoCredentialResolver {
    fn default() -> Self {
        Self::new(default_providers())
    }
}

impl KeyInfoCredentialResolver {
    /// Create a resolver with an explicit provider chain.
    pub fn new(providers: Vec<Arc<dyn KeyInfoProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn KeyInfoProvider>] {
        &self.providers
    }

    /// Run every child of `key_info` through the provider chain.
    ///
    /// For each child the first provider that yields credentials wins. A
    /// provider error skips that child only.
    pub fn extract(&self, key_info: &KeyInfo, usage: UsageType) -> Vec<Credential> {
        let context = KeyInfoResolutionContext::new(key_info, usage);
        let mut credentials = Vec::new();

        for (index, child) in key_info.children.iter().enumerate() {
            for provider in self.providers.iter().filter(|p| p.handles(child)) {
                match provider.process(child, &context) {
                    Ok(Some(extracted)) => {
                        tracing::debug!(
                            provider = provider.name(),
                            element = child.element_name(),
                            count = extracted.len(),
                            "extracted credentials from KeyInfo child"
                        );
                        credentials.extend(extracted);
                        break;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(
                            provider = provider.name(),
                            element = child.element_name(),
                            index,
                            error = %e,
                            "skipping malformed KeyInfo child"
                        );
                        break;
                    }
                }
            }
        }

        credentials
    }
}

pub(super) fn key_info_and_usage(criteria: &CriteriaSet) -> ResolverResult<(&KeyInfo, UsageType)> {
    let key_info = criteria
        .get::<KeyInfoCriterion>()
        .map(KeyInfoCriterion::key_info)
        .ok_or_else(|| ResolverError::invalid_criteria("KeyInfoCriterion is required"))?;
    let usage = criteria
        .get::<UsageCriterion>()
        .map(UsageCriterion::usage)
        .unwrap_or_default();
    Ok((key_info, usage))
}

impl Resolver<Credential> for KeyInfoCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Resolved<'_, Credential>> {
        let (key_info, usage) = key_info_and_usage(criteria)?;
        Ok(Box::new(self.extract(key_info, usage).into_iter()))
    }
}
