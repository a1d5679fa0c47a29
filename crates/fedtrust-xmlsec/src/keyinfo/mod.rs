//! XML-Signature KeyInfo model and credential extraction.
//!
//! A [`KeyInfo`] is an ordered list of heterogeneous children. Several
//! children may describe the same key (a key name next to the certificate that
//! carries it); none of them is authoritative on its own.
//!
//! Extraction runs every child through an ordered chain of
//! [`KeyInfoProvider`]s. [`KeyInfoCredentialResolver`] returns whatever the
//! providers extract. [`LocalKeyInfoCredentialResolver`] maps the extracted
//! candidates onto a local trusted store and returns only trusted entries.

mod local;
mod provider;
mod providers;
mod resolver;

pub use local::LocalKeyInfoCredentialResolver;
pub use provider::{default_providers, KeyInfoProvider, KeyInfoResolutionContext, ProviderKind};
pub use providers::{DerEncodedKeyValueProvider, InlineX509DataProvider, RsaKeyValueProvider};
pub use resolver::KeyInfoCredentialResolver;

use serde::{Deserialize, Serialize};

use crate::credential::X509Certificate;
use crate::encoding::base64_bytes;

/// `<ds:KeyInfo>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub children: Vec<KeyInfoChild>,
}

impl KeyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `<ds:KeyName>` child.
    pub fn with_key_name(self, name: impl Into<String>) -> Self {
        self.with_child(KeyInfoChild::KeyName(name.into()))
    }

    pub fn with_child(mut self, child: KeyInfoChild) -> Self {
        self.children.push(child);
        self
    }

    /// Key names in document order.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|child| match child {
            KeyInfoChild::KeyName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// One child of `<ds:KeyInfo>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyInfoChild {
    KeyName(String),

    KeyValue(KeyValue),

    /// XML-Signature 1.1 `<dsig11:DEREncodedKeyValue>`: a DER SubjectPublicKeyInfo.
    DerEncodedKeyValue(#[serde(with = "base64_bytes")] Vec<u8>),

    X509Data(X509Data),

    /// Any other element, by qualified name. Never extracted from.
    Unknown(String),
}

impl KeyInfoChild {
    /// Element name used in log output.
    pub fn element_name(&self) -> &str {
        match self {
            Self::KeyName(_) => "KeyName",
            Self::KeyValue(KeyValue::Rsa { .. }) => "RSAKeyValue",
            Self::KeyValue(KeyValue::Dsa { .. }) => "DSAKeyValue",
            Self::DerEncodedKeyValue(_) => "DEREncodedKeyValue",
            Self::X509Data(_) => "X509Data",
            Self::Unknown(name) => name,
        }
    }
}

/// `<ds:KeyValue>` content. Integers are unsigned big-endian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyValue {
    Rsa {
        #[serde(with = "base64_bytes")]
        modulus: Vec<u8>,
        #[serde(with = "base64_bytes")]
        exponent: Vec<u8>,
    },
    Dsa {
        #[serde(with = "base64_bytes")]
        p: Vec<u8>,
        #[serde(with = "base64_bytes")]
        q: Vec<u8>,
        #[serde(with = "base64_bytes")]
        g: Vec<u8>,
        #[serde(with = "base64_bytes")]
        y: Vec<u8>,
    },
}

/// `<ds:X509Data>`: certificates in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct X509Data {
    #[serde(default)]
    pub certificates: Vec<X509Certificate>,
}
