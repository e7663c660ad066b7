//! Shared helpers for integration tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use tokio::net::UdpSocket;
use tokio::sync::watch;

use snmpfleet::Oid;
use snmpfleet::agent::SnmpAgent;
use snmpfleet::config::AgentConfig;
use snmpfleet::device::DeviceFactory;
use snmpfleet::engine::{Message, Pdu, PduType, Version};
use snmpfleet::varbind::VarBind;

/// A fleet-of-one test harness: one agent bound to an ephemeral localhost
/// port, plus the files backing it.
pub struct TestAgent {
    pub address: SocketAddr,
    _dir: TempDir,
    _stop: watch::Sender<bool>,
}

impl TestAgent {
    /// Assemble and start an agent from walk text and an optional device
    /// descriptor.
    pub async fn start(walk: &str, device: Option<&str>, community: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let walk_path = dir.path().join("device.walk");
        std::fs::write(&walk_path, walk).expect("write walk");

        let device_path: Option<PathBuf> = device.map(|text| {
            let path = dir.path().join("device.yaml");
            std::fs::write(&path, text).expect("write device");
            path
        });

        let yaml = format!(
            "{{walk: {}, ip: 127.0.0.1, port: 0{}{}}}",
            walk_path.display(),
            device_path
                .as_ref()
                .map(|p| format!(", device: {}", p.display()))
                .unwrap_or_default(),
            community
                .map(|c| format!(", community: {}", c))
                .unwrap_or_default(),
        );
        let config: AgentConfig = serde_yaml::from_str(&yaml).expect("agent config");

        let factory = DeviceFactory::new();
        let agent = Arc::new(SnmpAgent::assemble(&config, &factory).expect("assemble"));

        let socket = agent.bind().await.expect("bind");
        let address = socket.local_addr().expect("local addr");

        let (stop, shutdown) = watch::channel(false);
        tokio::spawn(agent.serve(socket, shutdown));

        Self {
            address,
            _dir: dir,
            _stop: stop,
        }
    }
}

/// Send one request PDU and await the decoded response.
pub async fn request(
    target: SocketAddr,
    community: &str,
    pdu_type: PduType,
    varbinds: Vec<VarBind>,
) -> Message {
    try_request(target, community, pdu_type, varbinds)
        .await
        .expect("response within timeout")
}

/// Send one request PDU; `None` when the agent stays silent (dropped
/// request).
pub async fn try_request(
    target: SocketAddr,
    community: &str,
    pdu_type: PduType,
    varbinds: Vec<VarBind>,
) -> Option<Message> {
    let message = Message {
        version: Version::V2c,
        community: Bytes::from(community.to_string()),
        pdu: Pdu {
            pdu_type,
            request_id: 4242,
            error_status: 0,
            error_index: 0,
            varbinds,
        },
    };

    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("client socket");
    socket
        .send_to(&message.encode(), target)
        .await
        .expect("send");

    let mut buf = vec![0u8; 65_535];
    let received =
        tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await;
    match received {
        Ok(Ok((len, _))) => Some(Message::decode(&buf[..len]).expect("decodable response")),
        _ => None,
    }
}

/// GET a single OID.
pub async fn get(target: SocketAddr, community: &str, oid: Oid) -> Message {
    request(target, community, PduType::GetRequest, vec![VarBind::null(oid)]).await
}

/// GETNEXT from a single OID.
pub async fn get_next(target: SocketAddr, community: &str, oid: Oid) -> Message {
    request(
        target,
        community,
        PduType::GetNextRequest,
        vec![VarBind::null(oid)],
    )
    .await
}
