//! Trusted signer names computed at validation time.
//!
//! Which signer names are acceptable is deployment policy. A
//! [`TrustedNamesFunction`] computes them from the object being validated.
//! Closures implement the trait directly; [`ScriptedTrustedNamesFunction`]
//! evaluates an externally supplied script instead.

mod engine;
mod script;

pub use engine::{
    CompiledScript, JsonPathEngine, JsonPointerEngine, ScriptEngine, ScriptEngineRegistry,
    DEFAULT_SCRIPT_ENGINE,
};
pub use script::{ScriptSource, ScriptedTrustedNamesFunction};

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::error::{MetadataError, MetadataResult};
use crate::metadata::{EntityDescriptor, RoleDescriptor};

/// The signed metadata element under validation.
#[derive(Debug, Clone, Copy)]
pub enum SignedObject<'a> {
    Entity(&'a EntityDescriptor),
    Role {
        entity: &'a EntityDescriptor,
        role: &'a RoleDescriptor,
    },
}

impl<'a> SignedObject<'a> {
    /// The entity the object belongs to.
    pub fn entity(&self) -> &'a EntityDescriptor {
        match *self {
            Self::Entity(entity) | Self::Role { entity, .. } => entity,
        }
    }

    /// JSON form used as evaluation context.
    ///
    /// A role is rendered on its own, with the owning `entity_id` added.
    pub fn to_json(&self) -> MetadataResult<Value> {
        let rendered = match self {
            Self::Entity(entity) => serde_json::to_value(entity),
            Self::Role { entity, role } => serde_json::to_value(role).map(|mut value| {
                if let Value::Object(map) = &mut value {
                    map.insert("entity_id".to_string(), json!(entity.entity_id));
                }
                value
            }),
        };
        rendered.map_err(|e| MetadataError::config(format!("cannot render signed object: {}", e)))
    }
}

/// Computes the names a signer may present for `object`.
///
/// `None` means the names could not be computed; the caller applies its own
/// fallback. Implementations must not panic on malformed input.
pub trait TrustedNamesFunction: Send + Sync {
    fn trusted_names(&self, object: &SignedObject<'_>) -> Option<BTreeSet<String>>;
}

impl<F> TrustedNamesFunction for F
where
    F: Fn(&SignedObject<'_>) -> Option<BTreeSet<String>> + Send + Sync,
{
    fn trusted_names(&self, object: &SignedObject<'_>) -> Option<BTreeSet<String>> {
        self(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{sp_sso_descriptor, SAML20P_NS};

    fn by_entity(object: &SignedObject<'_>) -> Option<BTreeSet<String>> {
        Some(BTreeSet::from([format!("signer-for-{}", object.entity().entity_id)]))
    }

    #[test]
    fn test_plain_function_is_trusted_names_function() {
        let function: &dyn TrustedNamesFunction = &by_entity;

        let entity = EntityDescriptor::new("e");
        let names = function.trusted_names(&SignedObject::Entity(&entity)).unwrap();
        assert!(names.contains("signer-for-e"));
    }

    #[test]
    fn test_role_context_carries_entity_id() {
        let entity = EntityDescriptor::new("https://sp.example.org");
        let role = RoleDescriptor::new(sp_sso_descriptor(), [SAML20P_NS]);

        let json = SignedObject::Role {
            entity: &entity,
            role: &role,
        }
        .to_json()
        .unwrap();

        assert_eq!(json["entity_id"], "https://sp.example.org");
        assert_eq!(json["element_type"]["local_part"], "SPSSODescriptor");
    }
}
