//! Community-context expansion.
//!
//! Unlike the value modifiers, this one does not rewrite a single variable:
//! it explodes one walk OID into per-VLAN rows, each belonging to a
//! community-indexed context (`community@vlan`). Agent assembly diverts
//! bindings under its prefix here instead of wrapping them.

use std::collections::BTreeMap;

use super::properties::ModifierProperties;
use crate::oid::Oid;
use crate::value::Value;

/// Expands a walk OID into VLAN-indexed rows per community context.
///
/// Properties: `vlans` (list of VLAN identifiers). Each VLAN yields the row
/// `<oid>.<vlan> = Gauge32(vlan)` in that VLAN's context; the default
/// (empty) context sees the rows of every configured VLAN.
#[derive(Debug, Clone)]
pub struct CommunityContextModifier {
    vlans: Vec<u64>,
}

impl CommunityContextModifier {
    pub fn init(properties: &ModifierProperties) -> Self {
        Self {
            vlans: properties.get_unsigned_list("vlans").unwrap_or_default(),
        }
    }

    /// The VLAN identifiers this modifier expands over.
    pub fn vlans(&self) -> &[u64] {
        &self.vlans
    }

    /// Expanded bindings for one context and one source OID.
    ///
    /// A context that is neither empty nor one of the configured VLANs gets
    /// nothing: the source OID simply does not exist in that view.
    pub fn expand(&self, context: &[u8], oid: &Oid) -> BTreeMap<Oid, Value> {
        let mut rows = BTreeMap::new();
        if context.is_empty() {
            for &vlan in &self.vlans {
                rows.insert(self.row_oid(oid, vlan), Value::Gauge32(vlan as u32));
            }
        } else if let Some(vlan) = self.context_vlan(context) {
            rows.insert(self.row_oid(oid, vlan), Value::Gauge32(vlan as u32));
        }
        rows
    }

    fn row_oid(&self, oid: &Oid, vlan: u64) -> Oid {
        oid.child(vlan as u32)
    }

    fn context_vlan(&self, context: &[u8]) -> Option<u64> {
        let parsed: u64 = std::str::from_utf8(context).ok()?.parse().ok()?;
        self.vlans.contains(&parsed).then_some(parsed)
    }
}
