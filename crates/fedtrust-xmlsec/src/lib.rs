//! Credential resolution from XML-Signature key material.
//!
//! This crate provides the security half of the federation trust engine:
//!
//! - Typed, criteria-driven queries ([`CriteriaSet`]) and the generic
//!   [`Resolver`] contract used by every resolver in the workspace
//! - Credentials and a local trusted-credential store
//! - KeyInfo extraction through an ordered provider chain, with an optional
//!   local-trust specialization that only ever yields locally trusted keys
//! - The XML-Signature object model and a signature validation primitive
//! - Qualified names and per-object namespace bookkeeping
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use fedtrust_xmlsec::{
//!     CollectionCredentialResolver, CriteriaSet, Credential, KeyInfo, KeyInfoCriterion,
//!     LocalKeyInfoCredentialResolver, Resolver,
//! };
//!
//! # fn example(trusted: Credential) -> Result<(), fedtrust_xmlsec::ResolverError> {
//! let store = Arc::new(CollectionCredentialResolver::new(vec![trusted]));
//! let resolver = LocalKeyInfoCredentialResolver::with_default_providers(store);
//!
//! let key_info = KeyInfo::new().with_key_name("MyKey");
//! let criteria = CriteriaSet::new().with(KeyInfoCriterion::new(key_info));
//! if let Some(credential) = resolver.resolve_single(&criteria)? {
//!     println!("resolved trusted credential {:?}", credential.key_names);
//! }
//! # Ok(())
//! # }
//! ```

pub mod credential;
pub mod criteria;
mod encoding;
pub mod error;
pub mod keyinfo;
pub mod resolver;
pub mod signature;
pub mod store;
pub mod xml;

pub use credential::{Credential, KeyAlgorithm, PrivateKey, PublicKey, UsageType, X509Certificate};
pub use criteria::{
    CriteriaSet, Criterion, EntityIdCriterion, KeyInfoCriterion, KeyNameCriterion,
    PublicKeyCriterion, UsageCriterion,
};
pub use error::{ResolverError, ResolverResult, SecurityError, SecurityResult};
pub use keyinfo::{
    default_providers, DerEncodedKeyValueProvider, InlineX509DataProvider, KeyInfo, KeyInfoChild,
    KeyInfoCredentialResolver, KeyInfoProvider, KeyInfoResolutionContext, KeyValue,
    LocalKeyInfoCredentialResolver, ProviderKind, RsaKeyValueProvider, X509Data,
};
pub use resolver::{Resolved, Resolver};
pub use signature::{
    ContentReference, DefaultSignatureValidator, Signature, SignatureValidator,
};
pub use store::CollectionCredentialResolver;
pub use xml::{Namespace, NamespaceManager, QName, SignableXmlObject};
