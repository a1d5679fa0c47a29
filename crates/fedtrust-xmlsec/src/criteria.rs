//! Typed query parameters.
//!
//! A [`CriteriaSet`] holds at most one criterion of each type. Adding a
//! criterion of a type already present replaces the earlier value; insertion
//! order carries no meaning.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::credential::{PublicKey, UsageType};
use crate::keyinfo::KeyInfo;

/// Marker for types usable as resolution criteria.
pub trait Criterion: Any + Send + Sync {}

#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Bag of criteria keyed by criterion type.
#[derive(Clone, Default)]
pub struct CriteriaSet {
    entries: HashMap<TypeId, Entry>,
}

impl CriteriaSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion, replacing any earlier criterion of the same type.
    pub fn with<C: Criterion>(mut self, criterion: C) -> Self {
        self.add(criterion);
        self
    }

    /// Add a criterion. Returns true if a criterion of the same type was replaced.
    pub fn add<C: Criterion>(&mut self, criterion: C) -> bool {
        self.entries
            .insert(
                TypeId::of::<C>(),
                Entry {
                    value: Arc::new(criterion),
                    type_name: std::any::type_name::<C>(),
                },
            )
            .is_some()
    }

    /// Get the criterion of type `C`, if present.
    pub fn get<C: Criterion>(&self) -> Option<&C> {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|entry| entry.value.downcast_ref::<C>())
    }

    /// Whether a criterion of type `C` is present.
    pub fn contains<C: Criterion>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    /// Remove the criterion of type `C`. Returns true if one was present.
    pub fn remove<C: Criterion>(&mut self) -> bool {
        self.entries.remove(&TypeId::of::<C>()).is_some()
    }

    /// Copy every criterion of `other` into this set, replacing same-typed entries.
    pub fn extend_from(&mut self, other: &CriteriaSet) {
        for (type_id, entry) in &other.entries {
            self.entries.insert(*type_id, entry.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CriteriaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("CriteriaSet").field("criteria", &names).finish()
    }
}

/// Identifier of a federation entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityIdCriterion(pub String);

impl EntityIdCriterion {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self(entity_id.into())
    }

    pub fn entity_id(&self) -> &str {
        &self.0
    }
}

impl Criterion for EntityIdCriterion {}

/// A key name, matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyNameCriterion(pub String);

impl KeyNameCriterion {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self(key_name.into())
    }

    pub fn key_name(&self) -> &str {
        &self.0
    }
}

impl Criterion for KeyNameCriterion {}

/// A public key, matched by bitwise SPKI equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCriterion(pub PublicKey);

impl PublicKeyCriterion {
    pub fn new(key: PublicKey) -> Self {
        Self(key)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }
}

impl Criterion for PublicKeyCriterion {}

/// Intended key usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCriterion(pub UsageType);

impl UsageCriterion {
    pub fn new(usage: UsageType) -> Self {
        Self(usage)
    }

    pub fn usage(&self) -> UsageType {
        self.0
    }
}

impl Criterion for UsageCriterion {}

/// KeyInfo to extract credentials from.
#[derive(Debug, Clone)]
pub struct KeyInfoCriterion(pub KeyInfo);

impl KeyInfoCriterion {
    pub fn new(key_info: KeyInfo) -> Self {
        Self(key_info)
    }

    pub fn key_info(&self) -> &KeyInfo {
        &self.0
    }
}

impl Criterion for KeyInfoCriterion {}
