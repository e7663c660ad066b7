//! View-based access control (RFC 3415).
//!
//! Three tables: security-name-to-group, per-context access entries naming
//! view trees, and the view trees themselves as include/exclude subtree
//! families. The dispatcher consults the read view for retrieval PDUs and
//! the write view for SET.

use std::collections::HashMap;

use bytes::Bytes;

use crate::oid::Oid;

/// Security model a group membership is keyed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityModel {
    Any,
    V1,
    V2c,
    Usm,
}

/// Which view an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Notify,
}

#[derive(Debug, Clone)]
struct AccessEntry {
    read_view: Bytes,
    write_view: Bytes,
    notify_view: Bytes,
}

#[derive(Debug, Clone)]
struct ViewSubtree {
    subtree: Oid,
    included: bool,
}

/// VACM tables.
#[derive(Debug, Default)]
pub struct Vacm {
    groups: HashMap<(SecurityModel, Bytes), Bytes>,
    access: HashMap<(Bytes, Bytes), AccessEntry>,
    views: HashMap<Bytes, Vec<ViewSubtree>>,
}

impl Vacm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a security name (community or USM user) to a group.
    pub fn add_group(
        &mut self,
        model: SecurityModel,
        security_name: impl Into<Bytes>,
        group_name: impl Into<Bytes>,
    ) {
        self.groups
            .insert((model, security_name.into()), group_name.into());
    }

    /// Grant a group its views within one context (exact context match).
    pub fn add_access(
        &mut self,
        group_name: impl Into<Bytes>,
        context: impl Into<Bytes>,
        read_view: impl Into<Bytes>,
        write_view: impl Into<Bytes>,
        notify_view: impl Into<Bytes>,
    ) {
        self.access.insert(
            (group_name.into(), context.into()),
            AccessEntry {
                read_view: read_view.into(),
                write_view: write_view.into(),
                notify_view: notify_view.into(),
            },
        );
    }

    /// Add a subtree family to a view.
    pub fn add_view_tree(&mut self, view: impl Into<Bytes>, subtree: Oid, included: bool) {
        self.views
            .entry(view.into())
            .or_default()
            .push(ViewSubtree { subtree, included });
    }

    /// Whether the security name may perform `access` on `oid` within
    /// `context`.
    pub fn is_access_allowed(
        &self,
        model: SecurityModel,
        security_name: &[u8],
        context: &[u8],
        oid: &Oid,
        access: Access,
    ) -> bool {
        let Some(group) = self.group_of(model, security_name) else {
            return false;
        };
        let Some(entry) = self.access.get(&(group.clone(), Bytes::copy_from_slice(context)))
        else {
            return false;
        };
        let view = match access {
            Access::Read => &entry.read_view,
            Access::Write => &entry.write_view,
            Access::Notify => &entry.notify_view,
        };
        self.view_contains(view, oid)
    }

    fn group_of(&self, model: SecurityModel, security_name: &[u8]) -> Option<&Bytes> {
        let name = Bytes::copy_from_slice(security_name);
        self.groups
            .get(&(model, name.clone()))
            .or_else(|| self.groups.get(&(SecurityModel::Any, name)))
    }

    /// The most specific (longest) matching family decides inclusion.
    fn view_contains(&self, view: &Bytes, oid: &Oid) -> bool {
        let Some(families) = self.views.get(view) else {
            return false;
        };
        families
            .iter()
            .filter(|family| oid.starts_with(&family.subtree))
            .max_by_key(|family| family.subtree.len())
            .map(|family| family.included)
            .unwrap_or(false)
    }
}
