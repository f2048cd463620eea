use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::status::{MutationKind, Slot, Slots, Status, Ticket, DEFAULT_LANE};

/// Items held in a [`Resource`] are keyed by a server-assigned id.
pub trait Identified {
    fn id(&self) -> String;
}

/// Snapshot of a named remote collection plus its request lifecycle.
///
/// Every completion method takes the [`Ticket`] returned by [`Resource::begin`]
/// and returns `false` without touching anything when a newer request has
/// been started on the same slot since.
#[derive(Debug, Clone)]
pub struct Resource<T> {
    name: String,
    items: Vec<T>,
    current: Option<String>,
    slots: Slots,
    success: bool,
}

pub type SharedResource<T> = Arc<RwLock<Resource<T>>>;

pub fn shared_resource<T>(name: impl Into<String>) -> SharedResource<T> {
    Arc::new(RwLock::new(Resource::new(name)))
}

impl<T> Resource<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            current: None,
            slots: Slots::default(),
            success: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn slot(&self, kind: MutationKind) -> &Slot {
        self.slots.get(kind)
    }

    pub fn status(&self, kind: MutationKind) -> Status {
        self.slots.get(kind).status
    }

    pub fn is_loading(&self, kind: MutationKind) -> bool {
        self.slots.get(kind).is_pending()
    }

    pub fn error(&self, kind: MutationKind) -> Option<&ApiError> {
        self.slots.get(kind).error.as_ref()
    }

    pub fn message(&self, kind: MutationKind) -> Option<&str> {
        self.slots.get(kind).message.as_deref()
    }

    /// Whether the last create or update went through.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn begin(&mut self, kind: MutationKind) -> Ticket {
        self.begin_lane(kind, DEFAULT_LANE)
    }

    /// Start a request on `kind`'s slot. Only a later request on the same
    /// `lane` makes this one stale.
    pub fn begin_lane(&mut self, kind: MutationKind, lane: u64) -> Ticket {
        if matches!(kind, MutationKind::Create | MutationKind::Update) {
            self.success = false;
        }
        self.slots.begin_lane(kind, lane)
    }

    /// Fulfil without touching the collection (actions with no item payload).
    pub fn settled(&mut self, ticket: Ticket, message: Option<String>) -> bool {
        self.slots.fulfil(ticket, message)
    }

    pub fn rejected(&mut self, ticket: Ticket, error: ApiError) -> bool {
        self.slots.reject(ticket, error)
    }

    pub fn clear_error(&mut self, kind: MutationKind) {
        self.slots.clear_error(kind);
    }

    pub fn clear_errors(&mut self) {
        for kind in MutationKind::ALL {
            self.slots.clear_error(kind);
        }
    }

    pub fn clear_message(&mut self, kind: MutationKind) {
        self.slots.clear_message(kind);
    }

    /// Logout / explicit clear.
    pub fn reset(&mut self) {
        self.items.clear();
        self.current = None;
        self.success = false;
        self.slots.reset();
    }
}

impl<T: Identified> Resource<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// The focused item, if it is still part of the collection.
    pub fn current(&self) -> Option<&T> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.current = id.map(ToOwned::to_owned);
    }

    /// Replace the collection with a fetched list. Duplicate ids keep
    /// their first occurrence.
    pub fn fetched(&mut self, ticket: Ticket, items: Vec<T>, message: Option<String>) -> bool {
        if !self.slots.fulfil(ticket, message) {
            return false;
        }
        let mut seen = HashSet::new();
        self.items = items.into_iter().filter(|item| seen.insert(item.id())).collect();
        true
    }

    /// Detail fetch: upsert the item and focus it.
    pub fn fetched_one(&mut self, ticket: Ticket, item: T, message: Option<String>) -> bool {
        if !self.slots.fulfil(ticket, message) {
            return false;
        }
        let id = item.id();
        self.upsert(item);
        self.current = Some(id);
        true
    }

    /// Most recent first: new items go to the front.
    pub fn created(&mut self, ticket: Ticket, item: T, message: Option<String>) -> bool {
        if !self.slots.fulfil(ticket, message) {
            return false;
        }
        let id = item.id();
        self.items.retain(|existing| existing.id() != id);
        self.items.insert(0, item);
        self.success = true;
        true
    }

    pub fn updated(&mut self, ticket: Ticket, item: T, message: Option<String>) -> bool {
        if !self.slots.fulfil(ticket, message) {
            return false;
        }
        self.upsert(item);
        self.success = true;
        true
    }

    pub fn deleted(&mut self, ticket: Ticket, id: &str, message: Option<String>) -> bool {
        if !self.slots.fulfil(ticket, message) {
            return false;
        }
        self.items.retain(|existing| existing.id() != id);
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        true
    }

    /// Item pushed from outside the request cycle (inbound notification).
    pub fn receive(&mut self, item: T) {
        let id = item.id();
        self.items.retain(|existing| existing.id() != id);
        self.items.insert(0, item);
    }

    /// Local edit applied without a round trip (e.g. marking read).
    pub(crate) fn modify(&mut self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    // Replace in place, or put at the front when not yet known.
    fn upsert(&mut self, item: T) {
        match self.position(&item.id()) {
            Some(idx) => self.items[idx] = item,
            None => self.items.insert(0, item),
        }
    }
}
