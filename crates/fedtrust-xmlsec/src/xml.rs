//! Qualified names, namespaces, and the capabilities a signable object exposes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SecurityResult;
use crate::signature::Signature;

/// An XML qualified name. Equality ignores the prefix.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct QName {
    pub namespace_uri: String,
    pub local_part: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl QName {
    pub fn new(namespace_uri: impl Into<String>, local_part: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_part: local_part.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_part == other.local_part
    }
}

impl std::hash::Hash for QName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_part.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace_uri, self.local_part)
    }
}

/// A namespace binding: URI plus optional prefix (`None` is the default namespace).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl Namespace {
    pub fn new(uri: impl Into<String>, prefix: Option<&str>) -> Self {
        Self {
            uri: uri.into(),
            prefix: prefix.map(str::to_string),
        }
    }
}

/// Namespace bookkeeping for one XML object.
///
/// Visible namespaces are those used by element and attribute names, which
/// exclusive canonicalization renders on its own. Non-visible namespaces are
/// referenced only from content (QName-valued attributes, `xsi:type` values,
/// element text) and disappear from exclusive-c14n output unless declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceManager {
    declarations: BTreeSet<Namespace>,
    visible: BTreeSet<Namespace>,
    content: BTreeSet<Namespace>,
}

impl NamespaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a namespace used by an element or attribute name.
    pub fn register_visible(&mut self, namespace: Namespace) {
        self.visible.insert(namespace);
    }

    /// Record a namespace referenced only from content.
    pub fn register_content_namespace(&mut self, namespace: Namespace) {
        self.content.insert(namespace);
    }

    /// Declare a namespace explicitly on the owning element.
    pub fn register_namespace_declaration(&mut self, namespace: Namespace) {
        self.declarations.insert(namespace);
    }

    /// Namespaces explicitly declared on the owning element.
    pub fn declarations(&self) -> &BTreeSet<Namespace> {
        &self.declarations
    }

    /// Namespaces referenced from content that no element or attribute name uses.
    pub fn non_visible_namespaces(&self) -> BTreeSet<Namespace> {
        self.content.difference(&self.visible).cloned().collect()
    }
}

/// Capabilities of an XML object that can carry an enveloped signature.
pub trait SignableXmlObject {
    /// The object's `ID` attribute, referenced by signature content references.
    fn signature_reference_id(&self) -> Option<&str>;

    fn signature(&self) -> Option<&Signature>;

    /// Canonical octets of the element after the enveloped-signature
    /// transform, which the signature's reference digests cover.
    fn canonical_content(&self) -> SecurityResult<Vec<u8>>;

    /// The cached serialized form, present once the object has been marshalled.
    fn cached_serialization(&self) -> Option<&str>;

    fn namespace_manager(&self) -> &NamespaceManager;

    fn namespace_manager_mut(&mut self) -> &mut NamespaceManager;
}
