//! The generic resolution contract.

use crate::criteria::CriteriaSet;
use crate::error::ResolverResult;

/// Finite, single-pass sequence of resolved items.
pub type Resolved<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

/// Resolves items of type `T` matching a [`CriteriaSet`].
///
/// Every implementation defines a total, deterministic order over its results.
/// An empty sequence means "no match"; errors are reserved for bad criteria
/// and backing-store failures.
pub trait Resolver<T>: Send + Sync {
    /// Resolve every item matching `criteria`, in resolver order.
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Resolved<'_, T>>;

    /// The first item [`Resolver::resolve`] would yield, if any.
    fn resolve_single(&self, criteria: &CriteriaSet) -> ResolverResult<Option<T>> {
        Ok(self.resolve(criteria)?.next())
    }
}
