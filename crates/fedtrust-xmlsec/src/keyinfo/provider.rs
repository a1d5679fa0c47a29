//! The provider contract and provider chain configuration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::providers::{DerEncodedKeyValueProvider, InlineX509DataProvider, RsaKeyValueProvider};
use super::{KeyInfo, KeyInfoChild};
use crate::credential::{Credential, UsageType};
use crate::error::SecurityResult;

/// Read-only facts about the KeyInfo under resolution, shared by all providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfoResolutionContext {
    key_names: Vec<String>,
    usage: UsageType,
}

impl KeyInfoResolutionContext {
    pub fn new(key_info: &KeyInfo, usage: UsageType) -> Self {
        Self {
            key_names: key_info.key_names().map(str::to_string).collect(),
            usage,
        }
    }

    /// `<ds:KeyName>` values of the KeyInfo, in document order.
    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    pub fn usage(&self) -> UsageType {
        self.usage
    }

    /// Stamp a freshly extracted credential with the context's names and usage.
    pub fn decorate(&self, mut credential: Credential) -> Credential {
        credential.key_names.extend(self.key_names.iter().cloned());
        credential.usage = self.usage;
        credential
    }
}

/// Extracts credentials from KeyInfo children of the forms it understands.
pub trait KeyInfoProvider: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this provider understands `child`.
    fn handles(&self, child: &KeyInfoChild) -> bool;

    /// Extract credentials from `child`.
    ///
    /// `Ok(None)` passes the child to the next provider. An error means the
    /// child carried malformed key material.
    fn process(
        &self,
        child: &KeyInfoChild,
        context: &KeyInfoResolutionContext,
    ) -> SecurityResult<Option<Vec<Credential>>>;
}

/// Built-in provider kinds, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    RsaKeyValue,
    DerEncodedKeyValue,
    InlineX509Data,
}

impl ProviderKind {
    /// The default chain order.
    pub const DEFAULT_CHAIN: [ProviderKind; 3] = [
        ProviderKind::RsaKeyValue,
        ProviderKind::DerEncodedKeyValue,
        ProviderKind::InlineX509Data,
    ];

    pub fn build(self) -> Arc<dyn KeyInfoProvider> {
        match self {
            Self::RsaKeyValue => Arc::new(RsaKeyValueProvider),
            Self::DerEncodedKeyValue => Arc::new(DerEncodedKeyValueProvider),
            Self::InlineX509Data => Arc::new(InlineX509DataProvider),
        }
    }

    /// Build a chain from kinds, in order.
    pub fn build_chain(kinds: &[ProviderKind]) -> Vec<Arc<dyn KeyInfoProvider>> {
        kinds.iter().map(|kind| kind.build()).collect()
    }
}

/// Every built-in provider in the default order.
pub fn default_providers() -> Vec<Arc<dyn KeyInfoProvider>> {
    ProviderKind::build_chain(&ProviderKind::DEFAULT_CHAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_order() {
        let names: Vec<_> = default_providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["rsa_key_value", "der_encoded_key_value", "inline_x509_data"]);
    }

    #[test]
    fn test_provider_kind_serde() {
        let kinds: Vec<ProviderKind> =
            serde_json::from_str(r#"["inline_x509_data", "rsa_key_value"]"#).unwrap();
        assert_eq!(kinds, vec![ProviderKind::InlineX509Data, ProviderKind::RsaKeyValue]);
    }

    #[test]
    fn test_context_decorates() {
        let key_info = KeyInfo::new().with_key_name("n1").with_key_name("n2");
        let context = KeyInfoResolutionContext::new(&key_info, UsageType::Signing);

        let credential = context.decorate(Credential::default());
        assert_eq!(credential.usage, UsageType::Signing);
        assert_eq!(credential.key_names.len(), 2);
    }
}
