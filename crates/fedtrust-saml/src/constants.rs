//! SAML namespaces, protocol identifiers, and role element names.

use fedtrust_xmlsec::QName;

/// SAML 2.0 metadata namespace.
pub const SAML20MD_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// SAML 2.0 protocol support enumeration value.
pub const SAML20P_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// SAML 1.1 protocol support enumeration value.
pub const SAML11P_NS: &str = "urn:oasis:names:tc:SAML:1.1:protocol";

/// SAML 1.0 protocol support enumeration value.
pub const SAML10P_NS: &str = "urn:oasis:names:tc:SAML:1.0:protocol";

fn md(local: &str) -> QName {
    QName::new(SAML20MD_NS, local).with_prefix("md")
}

pub fn idp_sso_descriptor() -> QName {
    md("IDPSSODescriptor")
}

pub fn sp_sso_descriptor() -> QName {
    md("SPSSODescriptor")
}

pub fn attribute_authority_descriptor() -> QName {
    md("AttributeAuthorityDescriptor")
}

pub fn authn_authority_descriptor() -> QName {
    md("AuthnAuthorityDescriptor")
}

pub fn pdp_descriptor() -> QName {
    md("PDPDescriptor")
}
