//! Namespace declarations required by exclusive canonicalization.
//!
//! Exclusive c14n only renders namespaces that are visibly used inside the
//! signed subtree. A namespace referenced solely from content (an `xsi:type`
//! value, a QName-valued attribute) would be dropped from the digest input and
//! the signature would stop verifying once the element moves to another
//! document. Declaring those namespaces on the signed element itself, before it
//! is marshalled, keeps them in the canonical form.

use fedtrust_xmlsec::SignableXmlObject;

/// Declare every non-visible namespace of a signed, not yet marshalled object.
///
/// No-op when the object already has a cached serialization, carries no
/// signature, or its signature has no exclusive-c14n content reference.
/// Returns the number of namespaces newly declared. Repeated calls declare
/// nothing further.
pub fn declare_non_visible_namespaces<O: SignableXmlObject + ?Sized>(object: &mut O) -> usize {
    if object.cached_serialization().is_some() {
        return 0;
    }
    let exclusive = object.signature().is_some_and(|signature| {
        signature
            .references
            .iter()
            .any(|reference| reference.has_exclusive_transform())
    });
    if !exclusive {
        return 0;
    }

    let manager = object.namespace_manager_mut();
    let mut declared = 0;
    for namespace in manager.non_visible_namespaces() {
        if !manager.declarations().contains(&namespace) {
            tracing::debug!(
                uri = %namespace.uri,
                prefix = ?namespace.prefix,
                "declaring namespace for exclusive c14n"
            );
            manager.register_namespace_declaration(namespace);
            declared += 1;
        }
    }
    declared
}
