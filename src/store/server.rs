//! Managed-object registry.

use std::collections::{HashMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::store::scope::MoScope;
use crate::store::{ContextKey, ManagedObject};

type ScopeMap = std::collections::BTreeMap<Oid, Arc<dyn ManagedObject>>;

/// Registry of managed objects keyed by (context, scope).
///
/// Scopes within one context never overlap: [`register`](Self::register)
/// rejects an insert whose scope intersects an existing registration, and
/// the caller falls back to finer-grained groups. Mutation happens only
/// during agent startup and shutdown; request dispatch takes shared access.
#[derive(Debug, Default)]
pub struct MoServer {
    contexts: RwLock<HashSet<Bytes>>,
    registry: RwLock<HashMap<ContextKey, ScopeMap>>,
}

impl MoServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a context name so community mappings can reference it.
    pub fn add_context(&self, context: Bytes) {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context);
    }

    /// Whether the context has been announced.
    pub fn has_context(&self, context: &[u8]) -> bool {
        self.contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(context)
    }

    /// Register a managed object under a context (`None` serves every
    /// context).
    ///
    /// Fails if any already-registered scope in the same context intersects
    /// the new one.
    pub fn register(
        &self,
        mo: Arc<dyn ManagedObject>,
        context: Option<&[u8]>,
    ) -> Result<()> {
        let key = ContextKey::from(context);
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let map = registry.entry(key).or_default();
        if lookup_in(map, mo.scope()).is_some() {
            return Err(Error::DuplicateRegistration {
                context: context.map(|c| String::from_utf8_lossy(c).into_owned()),
            });
        }
        map.insert(mo.scope().lower().clone(), mo);
        Ok(())
    }

    /// Find the managed object whose registered scope intersects the query
    /// scope.
    ///
    /// A query for a named context first searches that context, then the
    /// context-independent registrations.
    pub fn lookup(
        &self,
        context: Option<&[u8]>,
        scope: &MoScope,
    ) -> Option<Arc<dyn ManagedObject>> {
        let registry = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(map) = registry.get(&ContextKey::from(context))
            && let Some(mo) = lookup_in(map, scope)
        {
            return Some(mo);
        }
        if context.is_some()
            && let Some(map) = registry.get(&ContextKey::Any)
            && let Some(mo) = lookup_in(map, scope)
        {
            return Some(mo);
        }
        None
    }

    /// Remove every registration in `context` whose scope intersects the
    /// subtree under `root`. Returns the number of removals.
    pub fn unregister_subtree(&self, context: Option<&[u8]>, root: &Oid) -> usize {
        let scope = MoScope::subtree(root);
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(map) = registry.get_mut(&ContextKey::from(context)) else {
            return 0;
        };
        let doomed: Vec<Oid> = map
            .iter()
            .filter(|(_, mo)| mo.scope().intersects(&scope))
            .map(|(lower, _)| lower.clone())
            .collect();
        for lower in &doomed {
            map.remove(lower);
        }
        if !doomed.is_empty() {
            debug!(
                context = ?context.map(String::from_utf8_lossy),
                removed = doomed.len(),
                "unregistered managed objects"
            );
        }
        doomed.len()
    }

    /// Total number of registrations across all contexts.
    pub fn registration_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|map| map.len())
            .sum()
    }
}

/// Search one context's sorted scope map for an intersecting registration.
///
/// Registered scopes are disjoint, so only two entries can intersect a
/// query: the last one starting at or before the query's lower bound, and
/// the first one starting after it.
fn lookup_in(map: &ScopeMap, scope: &MoScope) -> Option<Arc<dyn ManagedObject>> {
    let lower = scope.lower().clone();
    if let Some((_, mo)) = map.range(..=lower.clone()).next_back()
        && mo.scope().intersects(scope)
    {
        return Some(mo.clone());
    }
    if let Some((_, mo)) = map
        .range((Bound::Excluded(lower), Bound::Unbounded))
        .next()
        && mo.scope().intersects(scope)
    {
        return Some(mo.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::store::group::{MoGroup, MoVariable};
    use crate::value::Value;

    fn group(root: Oid, leaf: Oid) -> Arc<MoGroup> {
        let mut bindings = std::collections::BTreeMap::new();
        bindings.insert(leaf, MoVariable::Static(Value::Integer(1)));
        Arc::new(MoGroup::new(root, bindings))
    }

    #[test]
    fn test_register_and_lookup() {
        let server = MoServer::new();
        let system = group(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        server.register(system, Some(b"".as_slice())).unwrap();

        let hit = server.lookup(Some(b"".as_slice()), &MoScope::single(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)));
        assert!(hit.is_some());
        let miss = server.lookup(Some(b"".as_slice()), &MoScope::single(&oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)));
        assert!(miss.is_none());
    }

    #[test]
    fn test_overlapping_registration_rejected() {
        let server = MoServer::new();
        let wide = group(oid!(1, 3, 6, 1, 2, 1), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        let narrow = group(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 1, 2, 0));
        server.register(wide, Some(b"".as_slice())).unwrap();
        let err = server.register(narrow, Some(b"".as_slice())).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { .. }));
    }

    #[test]
    fn test_same_scope_different_contexts() {
        let server = MoServer::new();
        let a = group(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        let b = group(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        server.register(a, Some(b"".as_slice())).unwrap();
        server.register(b, Some(b"10".as_slice())).unwrap();
        assert_eq!(server.registration_count(), 2);
    }

    #[test]
    fn test_named_context_falls_back_to_any() {
        let server = MoServer::new();
        let shared = group(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        server.register(shared, None).unwrap();
        let hit = server.lookup(
            Some(b"10".as_slice()),
            &MoScope::single(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)),
        );
        assert!(hit.is_some());
    }

    #[test]
    fn test_getnext_query_finds_following_group() {
        let server = MoServer::new();
        let interfaces = group(oid!(1, 3, 6, 1, 2, 1, 2), oid!(1, 3, 6, 1, 2, 1, 2, 1, 0));
        server.register(interfaces, Some(b"".as_slice())).unwrap();

        // Query starts before the group's scope.
        let scope = MoScope::from_lower(oid!(1, 3, 6, 1, 2, 1, 1, 9, 0), false);
        let hit = server.lookup(Some(b"".as_slice()), &scope);
        assert!(hit.is_some());
    }

    #[test]
    fn test_unregister_subtree() {
        let server = MoServer::new();
        let system = group(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        let interfaces = group(oid!(1, 3, 6, 1, 2, 1, 2), oid!(1, 3, 6, 1, 2, 1, 2, 1, 0));
        server.register(system, Some(b"".as_slice())).unwrap();
        server.register(interfaces, Some(b"".as_slice())).unwrap();

        let removed = server.unregister_subtree(Some(b"".as_slice()), &oid!(1));
        assert_eq!(removed, 2);
        assert_eq!(server.registration_count(), 0);
        // Idempotent on an empty registry.
        assert_eq!(server.unregister_subtree(Some(b"".as_slice()), &oid!(1)), 0);
    }

    #[test]
    fn test_contexts() {
        let server = MoServer::new();
        server.add_context(Bytes::from_static(b""));
        server.add_context(Bytes::from_static(b"10"));
        assert!(server.has_context(b""));
        assert!(server.has_context(b"10"));
        assert!(!server.has_context(b"20"));
    }
}
