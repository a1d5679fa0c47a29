//! Trust engine configuration.
//!
//! Loaded from YAML. Runtime collaborators that cannot be described in a file
//! (credential stores, signature validators, script engines) are supplied as
//! [`FilterDependencies`] when the filter pipeline is built.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fedtrust_xmlsec::{
    Credential, DefaultSignatureValidator, KeyInfoCredentialResolver, KeyInfoProvider,
    LocalKeyInfoCredentialResolver, ProviderKind, QName, Resolver, SignatureValidator,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MetadataError, MetadataResult};
use crate::filter::{
    EntityIdPredicateFilter, EntityRoleFilter, MetadataFilter, MetadataFilterChain,
    RequiredValidUntilFilter, SignatureValidationFilter,
};
use crate::trusted_names::{
    ScriptEngineRegistry, ScriptSource, ScriptedTrustedNamesFunction, DEFAULT_SCRIPT_ENGINE,
};

/// Path of the configuration file read by [`TrustConfig::from_env`].
pub const CONFIG_ENV: &str = "FEDTRUST_CONFIG";

/// Overrides `default_script_engine` in [`TrustConfig::from_env`].
pub const SCRIPT_ENGINE_ENV: &str = "FEDTRUST_SCRIPT_ENGINE";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustConfig {
    /// Abort a refresh on the first filter error instead of dropping the entity.
    #[serde(default)]
    pub abort_on_filter_error: bool,

    /// Engine for trusted-names scripts that name none.
    #[serde(default = "default_script_engine")]
    pub default_script_engine: String,

    /// KeyInfo providers, in the order they are consulted.
    #[serde(default = "default_provider_chain")]
    pub provider_chain: Vec<ProviderKind>,

    /// Metadata filters, in application order.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

fn default_script_engine() -> String {
    DEFAULT_SCRIPT_ENGINE.to_string()
}

fn default_provider_chain() -> Vec<ProviderKind> {
    ProviderKind::DEFAULT_CHAIN.to_vec()
}

fn default_true() -> bool {
    true
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            abort_on_filter_error: false,
            default_script_engine: default_script_engine(),
            provider_chain: default_provider_chain(),
            filters: Vec::new(),
        }
    }
}

/// One metadata filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    SignatureValidation {
        #[serde(default)]
        require_signature: bool,
        /// Static trusted signer names; the fallback when a script is also set.
        #[serde(default)]
        trusted_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trusted_names_script: Option<ScriptConfig>,
    },
    EntityRole {
        retained_roles: Vec<QName>,
        #[serde(default = "default_true")]
        remove_roleless_entities: bool,
    },
    RequiredValidUntil {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_validity_secs: Option<i64>,
    },
    EntityIdPredicate {
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
    },
}

/// A trusted-names script. Exactly one of `inline` and `file` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Deployment data exposed to the script as `custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

impl ScriptConfig {
    fn source(&self) -> MetadataResult<ScriptSource> {
        match (&self.inline, &self.file) {
            (Some(source), None) => Ok(ScriptSource::Inline(source.clone())),
            (None, Some(path)) => Ok(ScriptSource::File(path.clone())),
            _ => Err(MetadataError::config(
                "trusted_names_script needs exactly one of inline or file",
            )),
        }
    }
}

/// Runtime collaborators for building filters.
#[derive(Clone)]
pub struct FilterDependencies {
    /// Source of signature verification credentials.
    pub credential_resolver: Arc<dyn Resolver<Credential>>,
    pub validator: Arc<dyn SignatureValidator>,
    pub script_engines: ScriptEngineRegistry,
}

impl FilterDependencies {
    pub fn new(credential_resolver: Arc<dyn Resolver<Credential>>) -> Self {
        Self {
            credential_resolver,
            validator: Arc::new(DefaultSignatureValidator),
            script_engines: ScriptEngineRegistry::default(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SignatureValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_script_engines(mut self, engines: ScriptEngineRegistry) -> Self {
        self.script_engines = engines;
        self
    }
}

impl TrustConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> MetadataResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MetadataError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> MetadataResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| MetadataError::config(format!("failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `FEDTRUST_CONFIG`, or defaults when unset,
    /// then apply `FEDTRUST_SCRIPT_ENGINE`.
    pub fn from_env() -> MetadataResult<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Ok(engine) = std::env::var(SCRIPT_ENGINE_ENV) {
            if !engine.trim().is_empty() {
                tracing::debug!(
                    engine = %engine,
                    "default script engine overridden from environment"
                );
                config.default_script_engine = engine;
            }
        }
        Ok(config)
    }

    fn validate(&self) -> MetadataResult<()> {
        if self.provider_chain.is_empty() {
            return Err(MetadataError::config("provider_chain must not be empty"));
        }
        if self.default_script_engine.trim().is_empty() {
            return Err(MetadataError::config("default_script_engine must not be empty"));
        }
        for filter in &self.filters {
            match filter {
                FilterConfig::SignatureValidation {
                    trusted_names_script: Some(script),
                    ..
                } => {
                    script.source()?;
                }
                FilterConfig::RequiredValidUntil {
                    max_validity_secs: Some(secs),
                } if *secs <= 0 => {
                    return Err(MetadataError::config("max_validity_secs must be positive"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// KeyInfo providers in configured order.
    pub fn providers(&self) -> Vec<Arc<dyn KeyInfoProvider>> {
        ProviderKind::build_chain(&self.provider_chain)
    }

    pub fn key_info_resolver(&self) -> KeyInfoCredentialResolver {
        KeyInfoCredentialResolver::new(self.providers())
    }

    /// A KeyInfo resolver that only yields credentials held in `store`.
    pub fn local_key_info_resolver(
        &self,
        store: Arc<dyn Resolver<Credential>>,
    ) -> LocalKeyInfoCredentialResolver {
        LocalKeyInfoCredentialResolver::new(self.providers(), store)
    }

    /// Build the configured filter pipeline.
    pub fn build_filter_chain(
        &self,
        deps: &FilterDependencies,
    ) -> MetadataResult<MetadataFilterChain> {
        let filters = self
            .filters
            .iter()
            .map(|filter| self.build_filter(filter, deps))
            .collect::<MetadataResult<Vec<_>>>()?;

        Ok(MetadataFilterChain::new(filters).with_abort_on_error(self.abort_on_filter_error))
    }

    fn build_filter(
        &self,
        filter: &FilterConfig,
        deps: &FilterDependencies,
    ) -> MetadataResult<Arc<dyn MetadataFilter>> {
        Ok(match filter {
            FilterConfig::SignatureValidation {
                require_signature,
                trusted_names,
                trusted_names_script,
            } => {
                let mut built = SignatureValidationFilter::new(deps.credential_resolver.clone())
                    .with_validator(deps.validator.clone())
                    .with_require_signature(*require_signature)
                    .with_trusted_names(trusted_names.iter().cloned());
                if let Some(script) = trusted_names_script {
                    let engine = script.engine.as_deref().unwrap_or(&self.default_script_engine);
                    let function = ScriptedTrustedNamesFunction::new(
                        &script.source()?,
                        Some(engine),
                        &deps.script_engines,
                    )?
                    .with_custom(script.custom.clone().unwrap_or(Value::Null));
                    built = built.with_trusted_names_function(Arc::new(function));
                }
                Arc::new(built)
            }
            FilterConfig::EntityRole {
                retained_roles,
                remove_roleless_entities,
            } => Arc::new(
                EntityRoleFilter::new(retained_roles.clone())
                    .with_remove_roleless_entities(*remove_roleless_entities),
            ),
            FilterConfig::RequiredValidUntil { max_validity_secs } => {
                let mut built = RequiredValidUntilFilter::new();
                if let Some(secs) = max_validity_secs {
                    built = built.with_max_validity(chrono::Duration::seconds(*secs));
                }
                Arc::new(built)
            }
            FilterConfig::EntityIdPredicate { include, exclude } => Arc::new(
                EntityIdPredicateFilter::new(include.iter().cloned(), exclude.iter().cloned()),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedtrust_xmlsec::CollectionCredentialResolver;
    use serial_test::serial;
    use std::io::Write;

    const FULL: &str = r#"
abort_on_filter_error: true
default_script_engine: JSONPointer
provider_chain: [inline_x509_data, rsa_key_value]
filters:
  - type: entity_id_predicate
    exclude: [https://banned.example.org]
  - type: required_valid_until
    max_validity_secs: 1209600
  - type: signature_validation
    require_signature: true
    trusted_names: [fed-signer]
    trusted_names_script:
      inline: /custom/signer
      custom: { signer: fed-signer-2026 }
  - type: entity_role
    retained_roles:
      - namespace_uri: urn:oasis:names:tc:SAML:2.0:metadata
        local_part: IDPSSODescriptor
"#;

    fn deps() -> FilterDependencies {
        FilterDependencies::new(Arc::new(CollectionCredentialResolver::new(Vec::new())))
    }

    #[test]
    fn test_defaults() {
        let config = TrustConfig::from_yaml("{}").unwrap();
        assert_eq!(config, TrustConfig::default());
        assert_eq!(config.default_script_engine, "JSONPath");
        assert_eq!(config.provider_chain, ProviderKind::DEFAULT_CHAIN.to_vec());
        assert!(config.build_filter_chain(&deps()).unwrap().is_empty());
    }

    #[test]
    fn test_full_config_builds_chain_in_order() {
        let config = TrustConfig::from_yaml(FULL).unwrap();
        assert!(config.abort_on_filter_error);

        let names: Vec<_> = config.providers().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["inline_x509_data", "rsa_key_value"]);

        let chain = config.build_filter_chain(&deps()).unwrap();
        assert_eq!(
            chain.names(),
            vec![
                "entity_id_predicate",
                "required_valid_until",
                "signature_validation",
                "entity_role"
            ]
        );
    }

    #[test]
    fn test_invalid_configs_rejected() {
        for yaml in [
            "provider_chain: []",
            "provider_chain: [dsa_key_value]",
            "filters: [{ type: unknown }]",
            "filters: [{ type: required_valid_until, max_validity_secs: 0 }]",
            "filters: [{ type: signature_validation, trusted_names_script: {} }]",
            "filters: [{ type: signature_validation, \
             trusted_names_script: { inline: a, file: b } }]",
            "unexpected: true",
        ] {
            assert!(
                matches!(TrustConfig::from_yaml(yaml), Err(MetadataError::Config { .. })),
                "accepted: {}",
                yaml
            );
        }
    }

    #[test]
    fn test_script_compile_errors_surface_at_build() {
        let config = TrustConfig::from_yaml(
            "filters: [{ type: signature_validation, \
             trusted_names_script: { inline: '$[', engine: JSONPath } }]",
        )
        .unwrap();
        assert!(matches!(
            config.build_filter_chain(&deps()),
            Err(MetadataError::PolicyEvaluation { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "abort_on_filter_error: true").unwrap();

        std::env::set_var(CONFIG_ENV, file.path());
        std::env::set_var(SCRIPT_ENGINE_ENV, "JSONPointer");
        let config = TrustConfig::from_env().unwrap();
        assert!(config.abort_on_filter_error);
        assert_eq!(config.default_script_engine, "JSONPointer");

        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var(SCRIPT_ENGINE_ENV);
        assert_eq!(TrustConfig::from_env().unwrap(), TrustConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_missing_file() {
        std::env::set_var(CONFIG_ENV, "/nonexistent/fedtrust.yaml");
        let result = TrustConfig::from_env();
        std::env::remove_var(CONFIG_ENV);
        assert!(matches!(result, Err(MetadataError::Config { .. })));
    }
}
