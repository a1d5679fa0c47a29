//! SAML-specific criteria.

use fedtrust_xmlsec::{Criterion, QName};

/// Role descriptor element type, matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRoleCriterion(pub QName);

impl EntityRoleCriterion {
    pub fn new(role: QName) -> Self {
        Self(role)
    }

    pub fn role(&self) -> &QName {
        &self.0
    }
}

impl Criterion for EntityRoleCriterion {}

/// Protocol support enumeration URI, matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolCriterion(pub String);

impl ProtocolCriterion {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self(protocol.into())
    }

    pub fn protocol(&self) -> &str {
        &self.0
    }
}

impl Criterion for ProtocolCriterion {}
