//! Entity id include and exclude lists.

use std::collections::BTreeSet;

use super::MetadataFilter;
use crate::error::MetadataResult;
use crate::metadata::EntityDescriptor;

/// Drops entities by entityID.
///
/// With a non-empty include list, only listed entities pass. The exclude list
/// always applies.
#[derive(Debug, Clone, Default)]
pub struct EntityIdPredicateFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl EntityIdPredicateFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = String>,
        E: IntoIterator<Item = String>,
    {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    fn admits(&self, entity_id: &str) -> bool {
        (self.include.is_empty() || self.include.contains(entity_id))
            && !self.exclude.contains(entity_id)
    }
}

impl MetadataFilter for EntityIdPredicateFilter {
    fn name(&self) -> &str {
        "entity_id_predicate"
    }

    fn filter(&self, entity: EntityDescriptor) -> MetadataResult<Option<EntityDescriptor>> {
        Ok(self.admits(&entity.entity_id).then_some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_include_and_exclude() {
        let filter = EntityIdPredicateFilter::new(ids(&["a", "b"]), ids(&["b"]));
        assert!(filter.filter(EntityDescriptor::new("a")).unwrap().is_some());
        assert!(filter.filter(EntityDescriptor::new("b")).unwrap().is_none());
        assert!(filter.filter(EntityDescriptor::new("c")).unwrap().is_none());
    }

    #[test]
    fn test_empty_include_admits_all_but_excluded() {
        let filter = EntityIdPredicateFilter::new(Vec::new(), ids(&["x"]));
        assert!(filter.filter(EntityDescriptor::new("anything")).unwrap().is_some());
        assert!(filter.filter(EntityDescriptor::new("x")).unwrap().is_none());
    }
}
