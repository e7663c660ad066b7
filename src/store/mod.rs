//! Managed-object store: scopes, groups, root extraction, and the registry.
//!
//! The engine routes each subrequest to the [`ManagedObject`] whose scope
//! owns its OID; [`MoGroup`] is the walk-backed implementation serving
//! sorted-map lookups with two-phase-commit SET.

pub mod group;
pub mod request;
pub mod roots;
pub mod scope;
pub mod server;

pub use group::{MoGroup, MoVariable, subtree_bindings};
pub use request::{RequestStatus, SubRequest};
pub use roots::subtree_roots;
pub use scope::MoScope;
pub use server::MoServer;

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::oid::Oid;

/// Sorted variable bindings prepared for registration.
pub type MoBindings = BTreeMap<Oid, MoVariable>;

/// Engine-facing callback interface of a managed object.
///
/// The engine invokes these synchronously from worker tasks; implementations
/// guard their own state. `get`/`next` answer retrieval; the four SET
/// methods are the phases of RFC 3416 two-phase commit, driven in order by
/// the engine with `undo` only on commit failure.
pub trait ManagedObject: Send + Sync + std::fmt::Debug {
    /// The registered scope of this object.
    fn scope(&self) -> &MoScope;

    /// The smallest owned OID admitted by `range`, if any.
    fn find(&self, range: &MoScope) -> Option<Oid>;

    /// Answer a GET subrequest (missing instance answers `noSuchInstance`).
    fn get(&self, sub: &mut SubRequest);

    /// Answer a GETNEXT subrequest. Returns false when nothing in range is
    /// left, letting the engine move on (or close the view).
    fn next(&self, sub: &mut SubRequest) -> bool;

    /// Validate a SET varbind and stash undo state.
    fn prepare(&self, sub: &mut SubRequest);

    /// Apply a prepared SET varbind.
    fn commit(&self, sub: &mut SubRequest);

    /// Roll back whatever prepare stashed.
    fn undo(&self, sub: &mut SubRequest);

    /// Release per-request state.
    fn cleanup(&self, sub: &mut SubRequest);
}

/// Registry key distinguishing per-context from context-independent
/// registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ContextKey {
    /// Serves every context.
    Any,
    /// Serves exactly one named context (the empty name is the default
    /// context).
    Named(Bytes),
}

impl From<Option<&[u8]>> for ContextKey {
    fn from(context: Option<&[u8]>) -> Self {
        match context {
            None => Self::Any,
            Some(name) => Self::Named(Bytes::copy_from_slice(name)),
        }
    }
}
