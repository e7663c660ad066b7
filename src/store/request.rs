//! Per-varbind subrequest state handed to managed objects.

use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::store::scope::MoScope;
use crate::value::Value;
use crate::varbind::VarBind;

/// Error and phase-progress state of a subrequest.
#[derive(Debug, Clone)]
pub struct RequestStatus {
    error_status: ErrorStatus,
    phase_complete: bool,
}

impl RequestStatus {
    fn new() -> Self {
        Self {
            error_status: ErrorStatus::NoError,
            phase_complete: false,
        }
    }

    pub fn error_status(&self) -> ErrorStatus {
        self.error_status
    }

    pub fn set_error_status(&mut self, status: ErrorStatus) {
        self.error_status = status;
    }

    pub fn is_phase_complete(&self) -> bool {
        self.phase_complete
    }

    pub fn set_phase_complete(&mut self) {
        self.phase_complete = true;
    }

    /// Reset phase progress between two-phase-commit phases.
    pub fn begin_phase(&mut self) {
        self.phase_complete = false;
    }
}

/// One varbind's worth of request state.
///
/// The engine builds one subrequest per varbind in a PDU and routes it to
/// the managed object owning its OID. Indices are 1-based, matching the
/// SNMP error-index convention.
#[derive(Debug, Clone)]
pub struct SubRequest {
    index: usize,
    varbind: VarBind,
    scope: MoScope,
    status: RequestStatus,
    completed: bool,
}

impl SubRequest {
    /// Subrequest for a GET of one OID.
    pub fn get(index: usize, oid: Oid) -> Self {
        let scope = MoScope::single(&oid);
        Self {
            index,
            varbind: VarBind::null(oid),
            scope,
            status: RequestStatus::new(),
            completed: false,
        }
    }

    /// Subrequest for a GETNEXT-style range query.
    pub fn next(index: usize, scope: MoScope) -> Self {
        let varbind = VarBind::null(scope.lower().clone());
        Self {
            index,
            varbind,
            scope,
            status: RequestStatus::new(),
            completed: false,
        }
    }

    /// Subrequest for one SET varbind.
    pub fn set(index: usize, varbind: VarBind) -> Self {
        let scope = MoScope::single(&varbind.oid);
        Self {
            index,
            varbind,
            scope,
            status: RequestStatus::new(),
            completed: false,
        }
    }

    /// 1-based position of this varbind in its PDU.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn varbind(&self) -> &VarBind {
        &self.varbind
    }

    /// The query scope (GETNEXT range for `next`, the OID itself otherwise).
    pub fn scope(&self) -> &MoScope {
        &self.scope
    }

    pub fn set_oid(&mut self, oid: Oid) {
        self.varbind.oid = oid;
    }

    pub fn set_variable(&mut self, value: Value) {
        self.varbind.value = value;
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut RequestStatus {
        &mut self.status
    }

    /// Mark this subrequest as answered.
    pub fn complete(&mut self) {
        self.completed = true;
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Consume the subrequest, yielding its (possibly rewritten) varbind.
    pub fn into_varbind(self) -> VarBind {
        self.varbind
    }
}
