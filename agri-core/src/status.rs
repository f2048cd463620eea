use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Fetch,
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub const ALL: [MutationKind; 4] = [
        MutationKind::Fetch,
        MutationKind::Create,
        MutationKind::Update,
        MutationKind::Delete,
    ];
}

/// Lane used when the caller does not tell requests apart.
pub const DEFAULT_LANE: u64 = 0;

/// Proof that a request was started on a slot.
///
/// Requests on one slot are grouped into lanes (one per endpoint). Completing
/// with a ticket older than the latest one issued on its lane is a no-op, so
/// a detail fetch never discards a list fetch still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: MutationKind,
    lane: u64,
    seq: u64,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn lane(&self) -> u64 {
        self.lane
    }
}

/// Lifecycle of one mutation kind on one resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slot {
    pub status: Status,
    pub error: Option<ApiError>,
    pub message: Option<String>,
    issued: BTreeMap<u64, u64>,
}

impl Slot {
    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    fn begin(&mut self, kind: MutationKind, lane: u64) -> Ticket {
        let seq = self.issued.entry(lane).or_insert(0);
        *seq += 1;
        self.status = Status::Pending;
        self.error = None;
        Ticket {
            kind,
            lane,
            seq: *seq,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.get(&ticket.lane) == Some(&ticket.seq)
    }

    fn fulfil(&mut self, message: Option<String>) {
        self.status = Status::Fulfilled;
        self.error = None;
        self.message = message;
    }

    fn reject(&mut self, error: ApiError) {
        self.status = Status::Rejected;
        self.error = Some(error);
    }

    /// Clearing the error of a rejected slot returns it to idle.
    fn clear_error(&mut self) {
        self.error = None;
        if self.status == Status::Rejected {
            self.status = Status::Idle;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slots {
    fetch: Slot,
    create: Slot,
    update: Slot,
    delete: Slot,
}

impl Slots {
    pub fn get(&self, kind: MutationKind) -> &Slot {
        match kind {
            MutationKind::Fetch => &self.fetch,
            MutationKind::Create => &self.create,
            MutationKind::Update => &self.update,
            MutationKind::Delete => &self.delete,
        }
    }

    fn get_mut(&mut self, kind: MutationKind) -> &mut Slot {
        match kind {
            MutationKind::Fetch => &mut self.fetch,
            MutationKind::Create => &mut self.create,
            MutationKind::Update => &mut self.update,
            MutationKind::Delete => &mut self.delete,
        }
    }

    pub fn begin(&mut self, kind: MutationKind) -> Ticket {
        self.begin_lane(kind, DEFAULT_LANE)
    }

    pub fn begin_lane(&mut self, kind: MutationKind, lane: u64) -> Ticket {
        self.get_mut(kind).begin(kind, lane)
    }

    /// Whether `ticket` is still the latest request on its slot.
    pub fn accepts(&self, ticket: Ticket) -> bool {
        let current = self.get(ticket.kind).is_current(ticket);
        if !current {
            debug!(kind = ?ticket.kind, lane = ticket.lane, seq = ticket.seq, "discarding stale response");
        }
        current
    }

    pub fn fulfil(&mut self, ticket: Ticket, message: Option<String>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.get_mut(ticket.kind).fulfil(message);
        true
    }

    pub fn reject(&mut self, ticket: Ticket, error: ApiError) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.get_mut(ticket.kind).reject(error);
        true
    }

    pub fn clear_error(&mut self, kind: MutationKind) {
        self.get_mut(kind).clear_error();
    }

    pub fn clear_message(&mut self, kind: MutationKind) {
        self.get_mut(kind).message = None;
    }

    /// Back to idle. Sequence counters survive so responses to requests
    /// issued before the reset are still discarded.
    pub fn reset(&mut self) {
        for kind in MutationKind::ALL {
            let slot = self.get_mut(kind);
            slot.status = Status::Idle;
            slot.error = None;
            slot.message = None;
            for seq in slot.issued.values_mut() {
                *seq += 1;
            }
        }
    }
}
