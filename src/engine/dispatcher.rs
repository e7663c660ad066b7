//! PDU execution against the managed-object registry.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::engine::pdu::{Message, Pdu, PduType, Version};
use crate::engine::vacm::{Access, SecurityModel, Vacm};
use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::store::{ManagedObject, MoScope, MoServer, SubRequest};
use crate::value::Value;
use crate::varbind::VarBind;

/// Upper bound on GETBULK repetitions, keeping responses datagram-sized.
const MAX_BULK_REPETITIONS: i32 = 64;

/// Maps community strings to the context they select.
#[derive(Debug, Default)]
pub struct CommunityTable {
    contexts: HashMap<Bytes, Bytes>,
}

impl CommunityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `community` as selecting `context`.
    pub fn add(&mut self, community: impl Into<Bytes>, context: impl Into<Bytes>) {
        self.contexts.insert(community.into(), context.into());
    }

    /// The context a community selects, if the community is known.
    pub fn resolve(&self, community: &[u8]) -> Option<&Bytes> {
        self.contexts.get(community)
    }
}

/// Executes decoded PDUs against a [`MoServer`].
///
/// Workers call [`process`](Self::process) concurrently; retrieval runs
/// lock-free over the registry while SETs serialize on one processor-wide
/// lock so each two-phase commit runs as a unit.
#[derive(Debug)]
pub struct RequestProcessor {
    server: Arc<MoServer>,
    vacm: Vacm,
    communities: CommunityTable,
    set_lock: Mutex<()>,
}

impl RequestProcessor {
    pub fn new(server: Arc<MoServer>, vacm: Vacm, communities: CommunityTable) -> Self {
        Self {
            server,
            vacm,
            communities,
            set_lock: Mutex::new(()),
        }
    }

    pub fn server(&self) -> &Arc<MoServer> {
        &self.server
    }

    /// Handle one datagram, returning the encoded response (or nothing, for
    /// datagrams SNMP silently drops).
    pub fn process(&self, datagram: &[u8], source: SocketAddr) -> Option<Vec<u8>> {
        let message = match Message::decode(datagram) {
            Ok(message) => message,
            Err(err) => {
                debug!(%source, %err, "dropping undecodable datagram");
                return None;
            }
        };

        let Some(context) = self.communities.resolve(&message.community) else {
            warn!(
                %source,
                community = %String::from_utf8_lossy(&message.community),
                "dropping request with unknown community"
            );
            return None;
        };
        let context = context.clone();

        trace!(
            %source,
            context = %String::from_utf8_lossy(&context),
            pdu_type = ?message.pdu.pdu_type,
            request_id = message.pdu.request_id,
            "processing request"
        );

        let response = match message.pdu.pdu_type {
            PduType::GetRequest => self.handle_get(&message, &context),
            PduType::GetNextRequest => self.handle_get_next(&message, &context),
            PduType::GetBulkRequest if message.version == Version::V2c => {
                self.handle_get_bulk(&message, &context)
            }
            PduType::SetRequest => self.handle_set(&message, &context),
            _ => {
                debug!(%source, pdu_type = ?message.pdu.pdu_type, "dropping unsupported PDU");
                return None;
            }
        };

        let reply = Message {
            version: message.version,
            community: message.community,
            pdu: response,
        };
        Some(reply.encode())
    }

    fn security_model(version: Version) -> SecurityModel {
        match version {
            Version::V1 => SecurityModel::V1,
            Version::V2c => SecurityModel::V2c,
        }
    }

    fn readable(&self, message: &Message, context: &[u8], oid: &Oid) -> bool {
        self.vacm.is_access_allowed(
            Self::security_model(message.version),
            &message.community,
            context,
            oid,
            Access::Read,
        )
    }

    fn handle_get(&self, message: &Message, context: &Bytes) -> Pdu {
        let request = &message.pdu;
        let mut varbinds = Vec::with_capacity(request.varbinds.len());

        for (position, vb) in request.varbinds.iter().enumerate() {
            let index = position + 1;
            let value = if !self.readable(message, context, &vb.oid) {
                Value::NoSuchObject
            } else {
                match self
                    .server
                    .lookup(Some(context.as_ref()), &MoScope::single(&vb.oid))
                {
                    Some(mo) => {
                        let mut sub = SubRequest::get(index, vb.oid.clone());
                        mo.get(&mut sub);
                        sub.into_varbind().value
                    }
                    None => Value::NoSuchObject,
                }
            };

            if message.version == Version::V1 && value.is_exception() {
                return Pdu::error_response(
                    request.request_id,
                    ErrorStatus::NoSuchName.as_i32(),
                    index as i32,
                    request.varbinds.clone(),
                );
            }
            varbinds.push(VarBind::new(vb.oid.clone(), value));
        }

        Pdu::response(request.request_id, varbinds)
    }

    fn handle_get_next(&self, message: &Message, context: &Bytes) -> Pdu {
        let request = &message.pdu;
        let mut varbinds = Vec::with_capacity(request.varbinds.len());

        for (position, vb) in request.varbinds.iter().enumerate() {
            let index = position + 1;
            match self.next_binding(message, context, &vb.oid, index) {
                Some(binding) => varbinds.push(binding),
                None => {
                    if message.version == Version::V1 {
                        return Pdu::error_response(
                            request.request_id,
                            ErrorStatus::NoSuchName.as_i32(),
                            index as i32,
                            request.varbinds.clone(),
                        );
                    }
                    varbinds.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView));
                }
            }
        }

        Pdu::response(request.request_id, varbinds)
    }

    fn handle_get_bulk(&self, message: &Message, context: &Bytes) -> Pdu {
        let request = &message.pdu;
        let non_repeaters = (request.non_repeaters() as usize).min(request.varbinds.len());
        let repetitions = request.max_repetitions().min(MAX_BULK_REPETITIONS);

        let mut varbinds = Vec::new();

        for (position, vb) in request.varbinds[..non_repeaters].iter().enumerate() {
            let index = position + 1;
            match self.next_binding(message, context, &vb.oid, index) {
                Some(binding) => varbinds.push(binding),
                None => varbinds.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
            }
        }

        // Iteration-major ordering per RFC 3416: each round advances every
        // repeater once.
        let repeaters = &request.varbinds[non_repeaters..];
        let mut cursors: Vec<(Oid, bool)> = repeaters
            .iter()
            .map(|vb| (vb.oid.clone(), false))
            .collect();
        for _ in 0..repetitions {
            if cursors.iter().all(|(_, done)| *done) {
                break;
            }
            for (position, (cursor, done)) in cursors.iter_mut().enumerate() {
                let index = non_repeaters + position + 1;
                if *done {
                    varbinds.push(VarBind::new(cursor.clone(), Value::EndOfMibView));
                    continue;
                }
                match self.next_binding(message, context, cursor, index) {
                    Some(binding) => {
                        *cursor = binding.oid.clone();
                        varbinds.push(binding);
                    }
                    None => {
                        *done = true;
                        varbinds.push(VarBind::new(cursor.clone(), Value::EndOfMibView));
                    }
                }
            }
        }

        Pdu::response(request.request_id, varbinds)
    }

    /// The next readable binding strictly after `start`, crossing group
    /// boundaries as needed.
    fn next_binding(
        &self,
        message: &Message,
        context: &Bytes,
        start: &Oid,
        index: usize,
    ) -> Option<VarBind> {
        let mut lower = start.clone();
        let mut included = false;
        loop {
            let query = MoScope::from_lower(lower.clone(), included);
            let mo = self.server.lookup(Some(context.as_ref()), &query)?;

            let mut sub = SubRequest::next(index, query);
            if mo.next(&mut sub) {
                let binding = sub.into_varbind();
                if self.readable(message, context, &binding.oid) {
                    return Some(binding);
                }
                // Not in view: resume the walk past the hidden OID.
                lower = binding.oid;
                included = false;
                continue;
            }

            // Group exhausted: resume past its scope.
            let scope = mo.scope();
            let upper = scope.upper()?.clone();
            included = !scope.is_upper_included();
            lower = upper;
        }
    }

    fn handle_set(&self, message: &Message, context: &Bytes) -> Pdu {
        let request = &message.pdu;
        let _guard = self.set_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Route every varbind to its owning group up front.
        let mut pending: Vec<(Arc<dyn ManagedObject>, SubRequest)> =
            Vec::with_capacity(request.varbinds.len());
        for (position, vb) in request.varbinds.iter().enumerate() {
            let index = position + 1;

            let allowed = self.vacm.is_access_allowed(
                Self::security_model(message.version),
                &message.community,
                context,
                &vb.oid,
                Access::Write,
            );
            if !allowed {
                let status = match message.version {
                    Version::V1 => ErrorStatus::NoSuchName,
                    Version::V2c => ErrorStatus::NoAccess,
                };
                return Pdu::error_response(
                    request.request_id,
                    status.as_i32(),
                    index as i32,
                    request.varbinds.clone(),
                );
            }

            match self
                .server
                .lookup(Some(context.as_ref()), &MoScope::single(&vb.oid))
            {
                Some(mo) => pending.push((mo, SubRequest::set(index, vb.clone()))),
                None => {
                    let status = match message.version {
                        Version::V1 => ErrorStatus::NoSuchName,
                        Version::V2c => ErrorStatus::NotWritable,
                    };
                    return Pdu::error_response(
                        request.request_id,
                        status.as_i32(),
                        index as i32,
                        request.varbinds.clone(),
                    );
                }
            }
        }

        // Phase 1: prepare everything before touching any value.
        for position in 0..pending.len() {
            let (mo, sub) = &mut pending[position];
            mo.prepare(sub);
            if !sub.status().error_status().is_ok() {
                let status = sub.status().error_status();
                let index = sub.index() as i32;
                self.release(&mut pending);
                return Pdu::error_response(
                    request.request_id,
                    status.as_i32(),
                    index,
                    request.varbinds.clone(),
                );
            }
        }

        // Phase 2: commit; roll everything back if any commit fails.
        for position in 0..pending.len() {
            let (mo, sub) = &mut pending[position];
            sub.status_mut().begin_phase();
            mo.commit(sub);
            if !sub.status().error_status().is_ok() {
                let index = sub.index() as i32;
                for (mo, sub) in pending.iter_mut() {
                    sub.status_mut().begin_phase();
                    mo.undo(sub);
                }
                self.release(&mut pending);
                return Pdu::error_response(
                    request.request_id,
                    ErrorStatus::CommitFailed.as_i32(),
                    index,
                    request.varbinds.clone(),
                );
            }
        }

        self.release(&mut pending);
        Pdu::response(request.request_id, request.varbinds.clone())
    }

    fn release(&self, pending: &mut [(Arc<dyn ManagedObject>, SubRequest)]) {
        for (mo, sub) in pending.iter_mut() {
            sub.status_mut().begin_phase();
            mo.cleanup(sub);
        }
    }
}
