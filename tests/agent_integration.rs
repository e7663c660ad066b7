//! End-to-end tests over real UDP datagrams.

mod common;

use bytes::Bytes;
use common::{TestAgent, get, get_next, request, try_request};
use snmpfleet::engine::{Pdu, PduType, Version};
use snmpfleet::oid;
use snmpfleet::value::Value;
use snmpfleet::varbind::VarBind;
use snmpfleet::engine::Message;

const SINGLE_BINDING_WALK: &str = ".1.3.6.1.2.1.1.1.0 = STRING: \"x\"\n";

const TWO_SUBTREE_WALK: &str = "\
.1.3.6.1.2.1.1.1.0 = STRING: \"x\"
.1.3.6.1.2.1.2.1.0 = INTEGER: 3
";

#[tokio::test]
async fn test_basic_get() {
    let agent = TestAgent::start(SINGLE_BINDING_WALK, None, None).await;
    let reply = get(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await;
    assert_eq!(reply.pdu.error_status, 0);
    assert_eq!(reply.pdu.varbinds.len(), 1);
    assert_eq!(reply.pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    assert_eq!(reply.pdu.varbinds[0].value, Value::text("x"));
}

#[tokio::test]
async fn test_getnext_past_end() {
    let agent = TestAgent::start(SINGLE_BINDING_WALK, None, None).await;
    let reply = get_next(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::EndOfMibView);
}

#[tokio::test]
async fn test_getnext_across_subtree_boundary() {
    let agent = TestAgent::start(TWO_SUBTREE_WALK, None, None).await;

    let reply = get_next(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 1)).await;
    assert_eq!(reply.pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    assert_eq!(reply.pdu.varbinds[0].value, Value::text("x"));

    // Walking on from the last OID of the first subtree reaches the second.
    let reply = get_next(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await;
    assert_eq!(reply.pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 2, 1, 0));
    assert_eq!(reply.pdu.varbinds[0].value, Value::Integer(3));
}

#[tokio::test]
async fn test_get_missing_instance() {
    let agent = TestAgent::start(TWO_SUBTREE_WALK, None, None).await;
    let reply = get(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 1, 9, 9)).await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::NoSuchInstance);
}

#[tokio::test]
async fn test_wrong_community_is_dropped() {
    let agent = TestAgent::start(SINGLE_BINDING_WALK, None, None).await;
    let reply = try_request(
        agent.address,
        "intruder",
        PduType::GetRequest,
        vec![VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0))],
    )
    .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_getbulk_walks_whole_agent() {
    let agent = TestAgent::start(TWO_SUBTREE_WALK, None, None).await;
    let message = Message {
        version: Version::V2c,
        community: Bytes::from_static(b"public"),
        pdu: Pdu {
            pdu_type: PduType::GetBulkRequest,
            request_id: 17,
            error_status: 0,
            error_index: 10,
            varbinds: vec![VarBind::null(oid!(1))],
        },
    };

    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(&message.encode(), agent.address).await.unwrap();
    let mut buf = vec![0u8; 65_535];
    let (len, _) = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        socket.recv_from(&mut buf),
    )
    .await
    .unwrap()
    .unwrap();
    let reply = Message::decode(&buf[..len]).unwrap();

    assert_eq!(reply.pdu.varbinds.len(), 3);
    assert_eq!(reply.pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    assert_eq!(reply.pdu.varbinds[1].oid, oid!(1, 3, 6, 1, 2, 1, 2, 1, 0));
    assert_eq!(reply.pdu.varbinds[2].value, Value::EndOfMibView);
}

#[tokio::test]
async fn test_counter_modifier_evolves_over_reads() {
    let walk = ".1.3.6.1.2.1.2.2.1.10.1 = Counter32: 0\n";
    let device = "\
name: counting
modifiers:
  - oid: \"1.3.6.1.2.1.2.2.1.10\"
    class: Counter32
    properties: {minimumStep: 1, maximumStep: 1}
";
    let agent = TestAgent::start(walk, Some(device), None).await;

    let first = get(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1)).await;
    let second = get(agent.address, "public", oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1)).await;
    assert_eq!(first.pdu.varbinds[0].value, Value::Counter32(1));
    assert_eq!(second.pdu.varbinds[0].value, Value::Counter32(2));
}

#[tokio::test]
async fn test_per_vlan_community_contexts() {
    let walk = "\
.1.3.6.1.2.1.1.1.0 = STRING: \"bridge\"
.1.3.6.1.2.1.17.7.1.4.2.1.3 = Gauge32: 0
";
    let device = "\
name: bridge
vlans: [10, 20]
modifiers:
  - oid: \"1.3.6.1.2.1.17.7.1.4.2.1.3\"
    class: CommunityContext
    properties: {vlans: [10, 20]}
";
    let agent = TestAgent::start(walk, Some(device), Some("myCom")).await;

    // The default context carries every VLAN row.
    let reply = get(
        agent.address,
        "myCom",
        oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3, 10),
    )
    .await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::Gauge32(10));
    let reply = get(
        agent.address,
        "myCom",
        oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3, 20),
    )
    .await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::Gauge32(20));

    // VLAN 10's view has its own row but not VLAN 20's.
    let reply = get(
        agent.address,
        "myCom@10",
        oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3, 10),
    )
    .await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::Gauge32(10));
    let reply = get(
        agent.address,
        "myCom@10",
        oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3, 20),
    )
    .await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::NoSuchInstance);

    // Shared (unexpanded) bindings are visible in every context.
    let reply = get(agent.address, "myCom@20", oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await;
    assert_eq!(reply.pdu.varbinds[0].value, Value::text("bridge"));
}

#[tokio::test]
async fn test_multi_varbind_get() {
    let agent = TestAgent::start(TWO_SUBTREE_WALK, None, None).await;
    let reply = request(
        agent.address,
        "public",
        PduType::GetRequest,
        vec![
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)),
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)),
        ],
    )
    .await;
    assert_eq!(reply.pdu.varbinds.len(), 2);
    assert_eq!(reply.pdu.varbinds[0].value, Value::text("x"));
    assert_eq!(reply.pdu.varbinds[1].value, Value::Integer(3));
}
