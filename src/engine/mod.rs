//! Minimal SNMPv1/v2c engine: wire codec, access control, and PDU
//! dispatch.
//!
//! The engine is intentionally small. It speaks community-based v1/v2c
//! only, decodes datagrams into [`Message`]s, resolves the community to a
//! context, checks VACM views, and executes the PDU against the
//! [`MoServer`](crate::store::MoServer) registry through the
//! [`ManagedObject`](crate::store::ManagedObject) callbacks.

pub mod ber;
pub mod dispatcher;
pub mod pdu;
pub mod transport;
pub mod vacm;

pub use dispatcher::{CommunityTable, RequestProcessor};
pub use pdu::{Message, Pdu, PduType, Version};
pub use vacm::{Access, SecurityModel, Vacm};
