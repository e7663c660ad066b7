//! Virtual agent assembly.
//!
//! An agent is one simulated device: a walk, a device descriptor, a UDP
//! endpoint, and a community. Assembly reads the walk once, builds the
//! per-context variable bindings (applying device modifiers), extracts
//! subtree roots, registers one managed-object group per root, and wires
//! communities and VACM so `community` reaches the default context and
//! `community@vlan` each VLAN view.

mod runtime;
pub mod state;

pub use runtime::WORKER_POOL_SIZE;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::device::{Device, DeviceFactory};
use crate::engine::{CommunityTable, RequestProcessor, SecurityModel, Vacm};
use crate::error::Result;
use crate::modifier::ModifiedVariable;
use crate::oid;
use crate::store::{
    MoBindings, MoGroup, MoScope, MoServer, MoVariable, subtree_bindings, subtree_roots,
};
use crate::walk::{self, WalkBindings};

/// One assembled virtual device, ready to serve.
#[derive(Debug)]
pub struct SnmpAgent {
    name: String,
    address: SocketAddr,
    processor: Arc<RequestProcessor>,
}

impl SnmpAgent {
    /// Assemble an agent from its configuration.
    ///
    /// Reads the walk once and builds every context view from it. Fails
    /// only on unusable configuration (bad address, unreadable walk);
    /// registration conflicts degrade per OID instead.
    pub fn assemble(config: &AgentConfig, factory: &DeviceFactory) -> Result<Self> {
        let name = config.name();
        let address = config.socket_addr()?;
        let device = factory.device(config.device.as_deref());
        let raw_bindings = walk::read_walk(&config.walk)?;

        let server = Arc::new(MoServer::new());

        let mut contexts: Vec<Bytes> = Vec::with_capacity(device.vlans().len() + 1);
        contexts.push(Bytes::new());
        for vlan in device.vlans() {
            contexts.push(Bytes::from(vlan.to_string()));
        }

        // Clear anything pre-installed for these contexts before loading
        // walk-backed groups.
        server.unregister_subtree(None, &oid!(1));
        for context in &contexts {
            server.unregister_subtree(Some(context.as_ref()), &oid!(1));
        }

        let mut registered = 0;
        for context in &contexts {
            server.add_context(context.clone());
            let bindings = context_bindings(&device, &raw_bindings, context);
            registered += register_context_bindings(&server, context, bindings);
        }
        info!(
            agent = %name,
            groups = registered,
            contexts = contexts.len(),
            bindings = raw_bindings.len(),
            "assembled agent"
        );

        let communities = community_table(config.community(), &device);
        let vacm = build_vacm(config.community(), &device);

        let boots = state::record_boot(&config.walk, &name);
        state::write_engine_info(&config.walk, &name, address, boots);

        Ok(Self {
            name,
            address,
            processor: Arc::new(RequestProcessor::new(server, vacm, communities)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// The request processor backing this agent.
    pub fn processor(&self) -> &Arc<RequestProcessor> {
        &self.processor
    }
}

/// Build one context's variable bindings from the raw walk.
///
/// Bindings with no applicable modifier pass through untouched. A
/// context-expanding modifier replaces its binding with per-VLAN rows;
/// any other modifier chain wraps the binding in a [`ModifiedVariable`].
fn context_bindings(device: &Device, raw: &WalkBindings, context: &[u8]) -> MoBindings {
    let mut result = MoBindings::new();
    for (oid, value) in raw {
        let modifiers = device.modifiers_for(oid);
        if modifiers.is_empty() {
            result.insert(oid.clone(), MoVariable::Static(value.clone()));
            continue;
        }

        let expanders: Vec<_> = modifiers
            .iter()
            .filter_map(|binding| binding.modifier().as_community_context())
            .collect();
        if expanders.is_empty() {
            debug!(%oid, "wrapping walk binding in modified variable");
            let variable = ModifiedVariable::new(value.clone(), modifiers);
            result.insert(oid.clone(), MoVariable::Dynamic(Arc::new(variable)));
        } else {
            for expander in expanders {
                for (row_oid, row_value) in expander.expand(context, oid) {
                    result.insert(row_oid, MoVariable::Static(row_value));
                }
            }
        }
    }
    result
}

/// Register one context's bindings as managed-object groups.
///
/// Whole subtrees are preferred; when a subtree's scope is already taken,
/// each leaf OID falls back to its own single-entry group, and leaves whose
/// scope is also taken are logged and skipped. Returns how many groups were
/// actually registered.
fn register_context_bindings(server: &MoServer, context: &[u8], bindings: MoBindings) -> usize {
    let mut registered = 0;
    let roots = subtree_roots(bindings.keys());
    for root in roots {
        let subtree = subtree_bindings(&bindings, &root);
        if server.lookup(Some(context), &MoScope::subtree(&root)).is_none() {
            let group = Arc::new(MoGroup::new(root.clone(), subtree));
            match server.register(group, Some(context)) {
                Ok(()) => registered += 1,
                Err(err) => warn!(%root, %err, "could not register subtree group"),
            }
            continue;
        }

        // Scope collision: degrade to one group per leaf OID.
        for (oid, variable) in subtree {
            if server.lookup(Some(context), &MoScope::subtree(&oid)).is_some() {
                warn!(
                    %oid,
                    context = %String::from_utf8_lossy(context),
                    "could not register single OID, scope already taken"
                );
                continue;
            }
            let single = Arc::new(MoGroup::single(oid.clone(), variable));
            match server.register(single, Some(context)) {
                Ok(()) => registered += 1,
                Err(err) => warn!(%oid, %err, "could not register single OID"),
            }
        }
    }
    registered
}

/// Community strings per context: `<base>` for the default context and
/// `<base>@<vlan>` per VLAN.
fn community_table(community: &str, device: &Device) -> CommunityTable {
    let mut table = CommunityTable::new();
    table.add(Bytes::from(community.to_string()), Bytes::new());
    for vlan in device.vlans() {
        table.add(
            Bytes::from(format!("{}@{}", community, vlan)),
            Bytes::from(vlan.to_string()),
        );
    }
    table
}

/// The access-control profile: full views for the community in every
/// context, plus the fixed USM-side profiles for the v3 user roster.
fn build_vacm(community: &str, device: &Device) -> Vacm {
    let mut vacm = Vacm::new();

    for model in [SecurityModel::V1, SecurityModel::V2c] {
        vacm.add_group(model, community.to_string(), "v1v2group");
        for vlan in device.vlans() {
            vacm.add_group(model, format!("{}@{}", community, vlan), "v1v2group");
        }
    }
    vacm.add_group(SecurityModel::Usm, "SHADES", "v3group");
    vacm.add_group(SecurityModel::Usm, "TEST", "v3test");
    vacm.add_group(SecurityModel::Usm, "SHA", "v3restricted");
    vacm.add_group(SecurityModel::Usm, "v3notify", "v3restricted");

    vacm.add_access("v1v2group", "", "fullReadView", "fullWriteView", "fullNotifyView");
    for vlan in device.vlans() {
        vacm.add_access(
            "v1v2group",
            vlan.to_string(),
            "fullReadView",
            "fullWriteView",
            "fullNotifyView",
        );
    }
    vacm.add_access("v3group", "", "fullReadView", "fullWriteView", "fullNotifyView");
    vacm.add_access(
        "v3restricted",
        "",
        "restrictedReadView",
        "restrictedWriteView",
        "restrictedNotifyView",
    );
    vacm.add_access("v3test", "", "testReadView", "testWriteView", "testNotifyView");

    for view in ["fullReadView", "fullWriteView", "fullNotifyView"] {
        vacm.add_view_tree(view, oid!(1), true);
    }
    vacm.add_view_tree("restrictedReadView", oid!(1, 3, 6, 1, 2), true);
    vacm.add_view_tree("restrictedWriteView", oid!(1, 3, 6, 1, 2, 1), true);
    vacm.add_view_tree("restrictedNotifyView", oid!(1, 3, 6, 1, 2), true);
    vacm.add_view_tree("restrictedNotifyView", oid!(1, 3, 6, 1, 6, 3, 1), true);
    vacm.add_view_tree("testReadView", oid!(1, 3, 6, 1, 2), true);
    vacm.add_view_tree("testReadView", oid!(1, 3, 6, 1, 2, 1, 1), false);
    vacm.add_view_tree("testWriteView", oid!(1, 3, 6, 1, 2, 1), true);
    vacm.add_view_tree("testNotifyView", oid!(1, 3, 6, 1, 2), true);

    vacm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Message, Pdu, PduType, Version};
    use crate::oid::Oid;
    use crate::value::Value;
    use crate::varbind::VarBind;
    use std::io::Write as _;

    const WALK: &str = "\
.1.3.6.1.2.1.1.1.0 = STRING: \"simulated device\"
.1.3.6.1.2.1.1.3.0 = Timeticks: (100) 0:00:01.00
.1.3.6.1.2.1.2.2.1.10.1 = Counter32: 1000
";

    const DEVICE: &str = "\
name: switch
vlans: [10, 20]
modifiers:
  - oid: \"1.3.6.1.2.1.1.3\"
    class: SysUpTime
  - oid: \"1.3.6.1.2.1.2.2.1.10\"
    class: Counter32
    properties: {minimumStep: 1, maximumStep: 1}
";

    fn assemble(walk: &str, device: Option<&str>, community: Option<&str>) -> SnmpAgent {
        let dir = tempfile::tempdir().unwrap();
        let walk_path = dir.path().join("device.walk");
        std::fs::write(&walk_path, walk).unwrap();

        let device_path = device.map(|text| {
            let path = dir.path().join("device.yaml");
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(text.as_bytes()).unwrap();
            path
        });

        let yaml = format!(
            "{{walk: {}, ip: 127.0.0.1, port: 16100{}{}}}",
            walk_path.display(),
            device_path
                .map(|p| format!(", device: {}", p.display()))
                .unwrap_or_default(),
            community
                .map(|c| format!(", community: {}", c))
                .unwrap_or_default(),
        );
        let config: AgentConfig = serde_yaml::from_str(&yaml).unwrap();
        SnmpAgent::assemble(&config, &DeviceFactory::new()).unwrap()
    }

    fn query(agent: &SnmpAgent, community: &str, pdu_type: PduType, oid: Oid) -> Message {
        let datagram = Message {
            version: Version::V2c,
            community: Bytes::from(community.to_string()),
            pdu: Pdu {
                pdu_type,
                request_id: 7,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind::null(oid)],
            },
        }
        .encode();
        let reply = agent
            .processor()
            .process(&datagram, "127.0.0.1:49152".parse().unwrap())
            .expect("a response");
        Message::decode(&reply).unwrap()
    }

    #[test]
    fn test_assemble_and_get() {
        let agent = assemble(WALK, None, None);
        assert_eq!(agent.name(), "127.0.0.1:16100");
        let reply = query(
            &agent,
            "public",
            PduType::GetRequest,
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
        );
        assert_eq!(reply.pdu.varbinds[0].value, Value::text("simulated device"));
    }

    #[test]
    fn test_modified_uptime_advances() {
        let agent = assemble(WALK, Some(DEVICE), None);
        let first = query(
            &agent,
            "public",
            PduType::GetRequest,
            oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
        );
        let second = query(
            &agent,
            "public",
            PduType::GetRequest,
            oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
        );
        assert_eq!(first.pdu.varbinds[0].value, Value::TimeTicks(200));
        assert_eq!(second.pdu.varbinds[0].value, Value::TimeTicks(300));
    }

    #[test]
    fn test_vlan_community_reaches_vlan_context() {
        let agent = assemble(WALK, Some(DEVICE), Some("myCom"));
        let reply = query(
            &agent,
            "myCom@10",
            PduType::GetRequest,
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
        );
        assert_eq!(reply.pdu.varbinds[0].value, Value::text("simulated device"));

        // A community for an unconfigured VLAN is unknown and dropped.
        let datagram = Message {
            version: Version::V2c,
            community: Bytes::from_static(b"myCom@30"),
            pdu: Pdu::response(1, Vec::new()),
        }
        .encode();
        assert!(
            agent
                .processor()
                .process(&datagram, "127.0.0.1:49152".parse().unwrap())
                .is_none()
        );
    }

    #[test]
    fn test_empty_walk_registers_nothing() {
        let agent = assemble("", None, None);
        let reply = query(
            &agent,
            "public",
            PduType::GetNextRequest,
            oid!(1),
        );
        assert_eq!(reply.pdu.varbinds[0].value, Value::EndOfMibView);
    }

    #[test]
    fn test_register_fallback_on_scope_collision() {
        let server = MoServer::new();
        // One leaf of the system subtree is already taken.
        let occupying = Arc::new(MoGroup::single(
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            MoVariable::Static(Value::Integer(0)),
        ));
        server.register(occupying, Some(b"".as_slice())).unwrap();

        let mut bindings = MoBindings::new();
        bindings.insert(
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            MoVariable::Static(Value::text("a")),
        );
        bindings.insert(
            oid!(1, 3, 6, 1, 2, 1, 1, 2, 0),
            MoVariable::Static(Value::text("b")),
        );
        let registered = register_context_bindings(&server, b"", bindings);
        // The taken leaf is skipped; the free one lands as its own group.
        assert_eq!(registered, 1);
        assert!(
            server
                .lookup(Some(b"".as_slice()), &MoScope::single(&oid!(1, 3, 6, 1, 2, 1, 1, 2, 0)))
                .is_some()
        );
    }

    #[test]
    fn test_context_bindings_expansion_replaces_source_oid() {
        let device = Device::from_yaml(
            "\
name: bridge
vlans: [10]
modifiers:
  - oid: \"1.3.6.1.2.1.17.7.1.4.2.1.3\"
    class: CommunityContext
    properties: {vlans: [10]}
",
        )
        .unwrap();
        let mut raw = WalkBindings::new();
        raw.insert(
            oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3),
            Value::Gauge32(0),
        );

        let expanded = context_bindings(&device, &raw, b"10");
        assert_eq!(expanded.len(), 1);
        assert!(expanded.contains_key(&oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3, 10)));
        assert!(!expanded.contains_key(&oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3)));
    }
}
