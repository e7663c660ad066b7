//! Walk-backed managed-object group.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::ErrorStatus;
use crate::modifier::ModifiedVariable;
use crate::oid::Oid;
use crate::store::request::SubRequest;
use crate::store::scope::MoScope;
use crate::store::{ManagedObject, MoBindings};
use crate::value::{Syntax, Value};

/// A stored variable: either a fixed value or one that evolves on read.
#[derive(Debug, Clone)]
pub enum MoVariable {
    Static(Value),
    Dynamic(Arc<ModifiedVariable>),
}

impl MoVariable {
    /// The current value. Reading a dynamic variable advances it.
    pub fn read(&self) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Dynamic(variable) => variable.read(),
        }
    }

    /// The syntax tag of this variable.
    pub fn syntax(&self) -> Syntax {
        match self {
            Self::Static(value) => value.syntax(),
            Self::Dynamic(variable) => variable.syntax(),
        }
    }
}

impl From<Value> for MoVariable {
    fn from(value: Value) -> Self {
        Self::Static(value)
    }
}

/// A sorted map of variables under one subtree root, served as a single
/// managed object.
///
/// The group owns scope `[root, root.next_peer())` and answers GET, GETNEXT
/// and two-phase-commit SET inside it. Reads take the binding map's shared
/// lock; the SET phases take the exclusive lock plus the undo buffer's own
/// lock, and the engine serializes SET processing so one PDU's
/// prepare/commit/undo/cleanup runs as a unit per group.
#[derive(Debug)]
pub struct MoGroup {
    root: Oid,
    scope: MoScope,
    bindings: RwLock<BTreeMap<Oid, MoVariable>>,
    undo: Mutex<HashMap<Oid, MoVariable>>,
}

impl MoGroup {
    /// Create a group from the bindings under `root`.
    pub fn new(root: Oid, bindings: BTreeMap<Oid, MoVariable>) -> Self {
        let scope = MoScope::subtree(&root);
        Self {
            root,
            scope,
            bindings: RwLock::new(bindings),
            undo: Mutex::new(HashMap::new()),
        }
    }

    /// Create a group holding a single binding (the registration fallback
    /// for colliding subtrees).
    pub fn single(oid: Oid, variable: MoVariable) -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(oid.clone(), variable);
        Self::new(oid, bindings)
    }

    pub fn root(&self) -> &Oid {
        &self.root
    }

    /// Number of bindings currently stored.
    pub fn len(&self) -> usize {
        self.read_bindings().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_bindings().is_empty()
    }

    fn read_bindings(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<Oid, MoVariable>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_bindings(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<Oid, MoVariable>> {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn undo_buffer(&self) -> std::sync::MutexGuard<'_, HashMap<Oid, MoVariable>> {
        self.undo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The first key admitted by `range`, honoring its lower inclusion flag
    /// and upper bound.
    fn first_in_range(&self, range: &MoScope) -> Option<Oid> {
        let bindings = self.read_bindings();
        let lower_bound = if range.is_lower_included() {
            Bound::Included(range.lower().clone())
        } else {
            Bound::Excluded(range.lower().clone())
        };
        let (key, _) = bindings.range((lower_bound, Bound::Unbounded)).next()?;
        match range.upper() {
            Some(upper) if key > upper => None,
            Some(upper) if key == upper && !range.is_upper_included() => None,
            _ => Some(key.clone()),
        }
    }
}

impl ManagedObject for MoGroup {
    fn scope(&self) -> &MoScope {
        &self.scope
    }

    fn find(&self, range: &MoScope) -> Option<Oid> {
        self.first_in_range(range)
    }

    fn get(&self, sub: &mut SubRequest) {
        let value = {
            let bindings = self.read_bindings();
            bindings.get(&sub.varbind().oid).map(MoVariable::read)
        };
        match value {
            Some(value) => sub.set_variable(value),
            None => sub.set_variable(Value::NoSuchInstance),
        }
        sub.complete();
    }

    fn next(&self, sub: &mut SubRequest) -> bool {
        let Some(oid) = self.first_in_range(sub.scope()) else {
            return false;
        };
        let value = {
            let bindings = self.read_bindings();
            bindings.get(&oid).map(MoVariable::read)
        };
        match value {
            Some(value) => sub.set_variable(value),
            // Key vanished between range scan and read (concurrent SET
            // shrink cannot happen today, but answer something sane).
            None => sub.set_variable(Value::NoSuchInstance),
        }
        sub.set_oid(oid);
        sub.complete();
        true
    }

    fn prepare(&self, sub: &mut SubRequest) {
        if sub.index() > 0 {
            let oid = sub.varbind().oid.clone();
            if self.scope.covers(&oid) {
                let new_value = sub.varbind().value.clone();
                let previous = {
                    let bindings = self.read_bindings();
                    bindings
                        .get(&oid)
                        .cloned()
                        .unwrap_or_else(|| MoVariable::Static(new_value.clone()))
                };
                if new_value.syntax() != previous.syntax() {
                    sub.status_mut()
                        .set_error_status(ErrorStatus::InconsistentValue);
                } else {
                    self.undo_buffer().insert(oid, previous);
                }
            } else {
                sub.status_mut().set_error_status(ErrorStatus::NoCreation);
            }
        }
        sub.status_mut().set_phase_complete();
    }

    fn commit(&self, sub: &mut SubRequest) {
        if sub.index() > 0 {
            if sub.status().error_status().is_ok() {
                let varbind = sub.varbind().clone();
                self.write_bindings()
                    .insert(varbind.oid, MoVariable::Static(varbind.value));
            } else {
                sub.status_mut()
                    .set_error_status(ErrorStatus::CommitFailed);
            }
        }
        sub.status_mut().set_phase_complete();
    }

    fn undo(&self, sub: &mut SubRequest) {
        // Restores whatever prepare stashed; with an empty buffer this is a
        // deliberate no-op.
        let mut undo = self.undo_buffer();
        let mut bindings = self.write_bindings();
        for (oid, variable) in undo.drain() {
            bindings.insert(oid, variable);
        }
        sub.status_mut().set_phase_complete();
    }

    fn cleanup(&self, sub: &mut SubRequest) {
        self.undo_buffer().clear();
        sub.status_mut().set_phase_complete();
    }
}

/// Extract the bindings under `root` from a larger map.
pub fn subtree_bindings(bindings: &MoBindings, root: &Oid) -> BTreeMap<Oid, MoVariable> {
    bindings
        .range(root.clone()..root.next_peer())
        .filter(|(oid, _)| oid.starts_with(root))
        .map(|(oid, variable)| (oid.clone(), variable.clone()))
        .collect()
}
