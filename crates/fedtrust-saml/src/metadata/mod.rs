//! SAML metadata model and resolvers.
//!
//! The XML binding layer produces [`EntityDescriptor`] trees; this crate only
//! reads them. The model is serde-enabled so a store can also be seeded from
//! YAML documents with [`from_yaml`].

mod credential;
mod resolver;
mod role;

pub use credential::MetadataCredentialResolver;
pub use resolver::{ChainingMetadataResolver, InMemoryMetadataResolver, MetadataResolver};
pub use role::PredicateRoleDescriptorResolver;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fedtrust_xmlsec::{
    KeyInfo, NamespaceManager, QName, SecurityError, SecurityResult, Signature,
    SignableXmlObject, UsageType,
};
use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, MetadataResult};

/// `<md:EntityDescriptor>`: one federation participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub entity_id: String,

    /// XML `ID` attribute, target of the signature reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,

    /// Role descriptors in document order.
    #[serde(default)]
    pub roles: Vec<Arc<RoleDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    #[serde(skip)]
    namespaces: NamespaceManager,

    #[serde(skip)]
    cached_serialization: Option<String>,
}

impl EntityDescriptor {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            id: None,
            valid_until: None,
            roles: Vec::new(),
            signature: None,
            namespaces: NamespaceManager::new(),
            cached_serialization: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_role(mut self, role: RoleDescriptor) -> Self {
        self.roles.push(Arc::new(role));
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Record the serialized form produced by the marshaller.
    pub fn set_cached_serialization(&mut self, serialized: impl Into<String>) {
        self.cached_serialization = Some(serialized.into());
    }

    /// Whether the entity is still valid at `now`. No `valid_until` means valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map_or(true, |until| now < until)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> MetadataResult<()> {
        let invalid = |reason: String| MetadataError::InvalidMetadata {
            entity_id: self.entity_id.clone(),
            reason,
        };

        if self.entity_id.trim().is_empty() {
            return Err(invalid("entityID is empty".to_string()));
        }
        for role in &self.roles {
            if role.supported_protocols.is_empty() {
                return Err(invalid(format!(
                    "{} declares no supported protocols",
                    role.element_type
                )));
            }
        }
        Ok(())
    }
}

impl SignableXmlObject for EntityDescriptor {
    fn signature_reference_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn canonical_content(&self) -> SecurityResult<Vec<u8>> {
        enveloped_canonical_form(self)
    }

    fn cached_serialization(&self) -> Option<&str> {
        self.cached_serialization.as_deref()
    }

    fn namespace_manager(&self) -> &NamespaceManager {
        &self.namespaces
    }

    fn namespace_manager_mut(&mut self) -> &mut NamespaceManager {
        &mut self.namespaces
    }
}

/// One role an entity performs (`<md:SPSSODescriptor>`, `<md:IDPSSODescriptor>`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDescriptor {
    /// Element type identifying the role.
    pub element_type: QName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `protocolSupportEnumeration`, split on whitespace.
    pub supported_protocols: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,

    #[serde(default)]
    pub key_descriptors: Vec<KeyDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    #[serde(skip)]
    namespaces: NamespaceManager,

    #[serde(skip)]
    cached_serialization: Option<String>,
}

impl RoleDescriptor {
    pub fn new<I, S>(element_type: QName, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            element_type,
            id: None,
            supported_protocols: protocols.into_iter().map(Into::into).collect(),
            valid_until: None,
            key_descriptors: Vec::new(),
            signature: None,
            namespaces: NamespaceManager::new(),
            cached_serialization: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_key_descriptor(mut self, descriptor: KeyDescriptor) -> Self {
        self.key_descriptors.push(descriptor);
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Exact, case-sensitive protocol membership.
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        self.supported_protocols.iter().any(|p| p == protocol)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map_or(true, |until| now < until)
    }
}

impl SignableXmlObject for RoleDescriptor {
    fn signature_reference_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn canonical_content(&self) -> SecurityResult<Vec<u8>> {
        enveloped_canonical_form(self)
    }

    fn cached_serialization(&self) -> Option<&str> {
        self.cached_serialization.as_deref()
    }

    fn namespace_manager(&self) -> &NamespaceManager {
        &self.namespaces
    }

    fn namespace_manager_mut(&mut self) -> &mut NamespaceManager {
        &mut self.namespaces
    }
}

/// `<md:KeyDescriptor>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    #[serde(default)]
    pub usage: UsageType,

    pub key_info: KeyInfo,
}

impl KeyDescriptor {
    pub fn new(usage: UsageType, key_info: KeyInfo) -> Self {
        Self { usage, key_info }
    }
}

/// RFC 8785 canonical JSON of `object` without its own `signature` member.
///
/// Signatures on nested elements stay in place, as with the XML
/// enveloped-signature transform.
fn enveloped_canonical_form<T: Serialize>(object: &T) -> SecurityResult<Vec<u8>> {
    let failed = |e: serde_json::Error| SecurityError::Canonicalization {
        reason: e.to_string(),
    };
    let mut value = serde_json::to_value(object).map_err(failed)?;
    if let Some(members) = value.as_object_mut() {
        members.remove("signature");
    }
    serde_jcs::to_vec(&value).map_err(failed)
}

/// Parse a YAML list of entity descriptors and check each one.
///
/// Enum-valued nodes such as KeyInfo children are written as single-key maps
/// (`- key_name: sp-signing`). Duplicate entityIDs are rejected here; a store
/// refresh tolerates them.
pub fn from_yaml(input: &str) -> MetadataResult<Vec<EntityDescriptor>> {
    let deserializer = serde_yaml::Deserializer::from_str(input);
    let entities: Vec<EntityDescriptor> =
        serde_yaml::with::singleton_map_recursive::deserialize(deserializer)
            .map_err(|e| MetadataError::config(format!("invalid metadata YAML: {}", e)))?;

    let mut seen = HashSet::new();
    for entity in &entities {
        entity.validate()?;
        if !seen.insert(entity.entity_id.as_str()) {
            return Err(MetadataError::InvalidMetadata {
                entity_id: entity.entity_id.clone(),
                reason: "duplicate entityID in document".to_string(),
            });
        }
    }
    Ok(entities)
}
