//! SAML metadata resolution and signature trust evaluation.
//!
//! This crate layers federation metadata on top of `fedtrust-xmlsec`:
//!
//! - The metadata model ([`EntityDescriptor`], [`RoleDescriptor`]) and
//!   snapshot-based metadata resolvers
//! - Role descriptor resolution by role type and protocol, and credential
//!   resolution from role key descriptors
//! - A metadata filter pipeline, including a fail-closed signature filter
//!   whose trusted signer names may be computed per object by a script
//! - Exclusive-c14n namespace declaration for objects about to be signed
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use fedtrust_saml::constants::{sp_sso_descriptor, SAML20P_NS};
//! use fedtrust_saml::{
//!     EntityDescriptor, EntityRoleCriterion, InMemoryMetadataResolver,
//!     PredicateRoleDescriptorResolver, ProtocolCriterion, RoleDescriptor,
//! };
//! use fedtrust_xmlsec::{CriteriaSet, EntityIdCriterion, Resolver};
//!
//! # fn example() -> Result<(), fedtrust_saml::MetadataError> {
//! let metadata = Arc::new(InMemoryMetadataResolver::new("local"));
//! metadata.refresh(vec![EntityDescriptor::new("https://sp.example.org")
//!     .with_role(RoleDescriptor::new(sp_sso_descriptor(), [SAML20P_NS]))])?;
//!
//! let roles = PredicateRoleDescriptorResolver::new(metadata);
//! let criteria = CriteriaSet::new()
//!     .with(EntityIdCriterion::new("https://sp.example.org"))
//!     .with(EntityRoleCriterion::new(sp_sso_descriptor()))
//!     .with(ProtocolCriterion::new(SAML20P_NS));
//! assert!(roles.resolve_single(&criteria)?.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `FEDTRUST_CONFIG` | Path of the YAML configuration read by [`TrustConfig::from_env`] |
//! | `FEDTRUST_SCRIPT_ENGINE` | Overrides the default trusted-names script engine |

pub mod config;
pub mod constants;
pub mod criterion;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod namespaces;
pub mod profile;
pub mod trusted_names;

pub use config::{FilterConfig, FilterDependencies, ScriptConfig, TrustConfig};
pub use criterion::{EntityRoleCriterion, ProtocolCriterion};
pub use error::{MetadataError, MetadataResult};
pub use filter::{
    EntityIdPredicateFilter, EntityRoleFilter, MetadataFilter, MetadataFilterChain,
    RequiredValidUntilFilter, SignatureValidationFilter,
};
pub use metadata::{
    ChainingMetadataResolver, EntityDescriptor, InMemoryMetadataResolver, KeyDescriptor,
    MetadataCredentialResolver, MetadataResolver, PredicateRoleDescriptorResolver, RoleDescriptor,
};
pub use namespaces::declare_non_visible_namespaces;
pub use profile::SignatureProfileValidator;
pub use trusted_names::{
    ScriptEngine, ScriptEngineRegistry, ScriptSource, ScriptedTrustedNamesFunction, SignedObject,
    TrustedNamesFunction,
};
