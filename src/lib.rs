//! snmpfleet - simulate fleets of SNMP-capable network devices.
//!
//! One process exposes many virtual agents, each bound to its own UDP
//! endpoint and answering GET / GETNEXT / GETBULK / SET as if it were a
//! real router or switch. Every agent is seeded from a captured SNMP walk;
//! device descriptors attach modifiers so counters climb and uptime
//! advances between reads, and VLAN lists fan the walk out into
//! community-indexed contexts (`community@vlan`).
//!
//! # Quick tour
//!
//! ```rust,no_run
//! use snmpfleet::agent::SnmpAgent;
//! use snmpfleet::config::AgentConfig;
//! use snmpfleet::device::DeviceFactory;
//! use std::sync::Arc;
//!
//! # async fn example() -> snmpfleet::Result<()> {
//! let config: AgentConfig = serde_yaml::from_str(
//!     "{walk: router.walk, ip: 127.0.0.1, port: 16100}",
//! ).expect("config");
//!
//! let factory = DeviceFactory::new();
//! let agent = Arc::new(SnmpAgent::assemble(&config, &factory)?);
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! agent.run(shutdown).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`walk`]: parse captured walk dumps into ordered bindings.
//! - [`modifier`]: per-OID value mutators and the lazy
//!   [`ModifiedVariable`](modifier::ModifiedVariable) wrapper.
//! - [`store`]: the managed-object store - subtree root extraction,
//!   sorted-map groups with two-phase-commit SET, and the scope registry.
//! - [`engine`]: a small v1/v2c engine - BER codec, community resolution,
//!   VACM views, and PDU dispatch.
//! - [`agent`]: assembly of the above into bound, serving agents.

pub mod agent;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod modifier;
pub mod oid;
pub mod store;
pub mod value;
pub mod varbind;
pub mod walk;

pub use error::{Error, ErrorStatus, Result};
pub use oid::Oid;
pub use value::{Syntax, Value};
pub use varbind::VarBind;
