use std::collections::HashSet;

use agri_core::{ApiError, Identified, MutationKind, Resource, Status};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: String,
    rev: u32,
}

impl Identified for Item {
    fn id(&self) -> String {
        self.id.clone()
    }
}

fn item(id: u8, rev: u32) -> Item {
    Item {
        id: id.to_string(),
        rev,
    }
}

fn network_error() -> ApiError {
    ApiError::Transport("Network error. Check your connection and try again.".into())
}

#[derive(Debug, Clone)]
enum Op {
    Fetch(Vec<u8>),
    Create(u8),
    Update(u8),
    Delete(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(0u8..8, 0..10).prop_map(Op::Fetch),
        (0u8..8).prop_map(Op::Create),
        (0u8..8).prop_map(Op::Update),
        (0u8..8).prop_map(Op::Delete),
    ]
}

proptest! {
    #[test]
    fn collection_never_holds_duplicate_ids(ops in prop::collection::vec(op(), 0..40)) {
        let mut store: Resource<Item> = Resource::new("items");
        for (rev, op) in ops.into_iter().enumerate() {
            let rev = rev as u32;
            match op {
                Op::Fetch(ids) => {
                    let t = store.begin(MutationKind::Fetch);
                    store.fetched(t, ids.into_iter().map(|id| item(id, rev)).collect(), None);
                }
                Op::Create(id) => {
                    let t = store.begin(MutationKind::Create);
                    store.created(t, item(id, rev), None);
                    prop_assert_eq!(store.items()[0].id.clone(), id.to_string());
                }
                Op::Update(id) => {
                    let t = store.begin(MutationKind::Update);
                    store.updated(t, item(id, rev), None);
                    prop_assert_eq!(store.get(&id.to_string()).map(|i| i.rev), Some(rev));
                }
                Op::Delete(id) => {
                    let t = store.begin(MutationKind::Delete);
                    store.deleted(t, &id.to_string(), None);
                    prop_assert!(store.get(&id.to_string()).is_none());
                }
            }
            let ids: HashSet<String> = store.items().iter().map(|i| i.id.clone()).collect();
            prop_assert_eq!(ids.len(), store.len());
        }
    }
}

#[test]
fn mutation_kinds_do_not_touch_each_other() {
    for a in MutationKind::ALL {
        for b in MutationKind::ALL {
            if a == b {
                continue;
            }
            let mut store: Resource<Item> = Resource::new("items");
            let ta = store.begin(a);
            store.rejected(ta, network_error());

            let tb = store.begin(b);
            assert_eq!(store.status(a), Status::Rejected, "{a:?} changed by starting {b:?}");
            assert_eq!(store.error(a), Some(&network_error()));

            store.rejected(tb, ApiError::InvalidInput("nope".into()));
            store.clear_error(b);
            assert_eq!(store.error(a), Some(&network_error()), "{a:?} cleared by clearing {b:?}");
            assert_eq!(store.status(b), Status::Idle);
        }
    }
}

#[test]
fn entering_pending_clears_only_that_slots_error() {
    let mut store: Resource<Item> = Resource::new("items");
    let t = store.begin(MutationKind::Fetch);
    store.rejected(t, network_error());

    let retry = store.begin(MutationKind::Fetch);
    assert!(store.is_loading(MutationKind::Fetch));
    assert!(store.error(MutationKind::Fetch).is_none());

    store.fetched(retry, vec![item(1, 0)], Some("ok".into()));
    assert_eq!(store.status(MutationKind::Fetch), Status::Fulfilled);
    assert_eq!(store.message(MutationKind::Fetch), Some("ok"));
}

#[test]
fn clear_error_is_idempotent() {
    let mut store: Resource<Item> = Resource::new("items");
    let t = store.begin(MutationKind::Create);
    store.rejected(t, network_error());
    let t = store.begin(MutationKind::Fetch);
    store.fetched(t, vec![item(1, 0), item(2, 0)], None);

    let mut once = store.clone();
    once.clear_error(MutationKind::Create);
    let mut twice = store.clone();
    twice.clear_error(MutationKind::Create);
    twice.clear_error(MutationKind::Create);

    assert_eq!(once.items(), twice.items());
    for kind in MutationKind::ALL {
        assert_eq!(once.slot(kind), twice.slot(kind));
    }
}

#[test]
fn stale_completion_is_discarded() {
    let mut store: Resource<Item> = Resource::new("items");
    let first = store.begin(MutationKind::Fetch);
    let second = store.begin(MutationKind::Fetch);

    assert!(store.fetched(second, vec![item(2, 2)], None));
    assert!(!store.fetched(first, vec![item(1, 1)], None));
    assert!(!store.rejected(first, network_error()));

    assert_eq!(store.items(), &[item(2, 2)]);
    assert_eq!(store.status(MutationKind::Fetch), Status::Fulfilled);
}

#[test]
fn requests_on_other_lanes_are_not_stale() {
    let mut store: Resource<Item> = Resource::new("items");
    let list = store.begin_lane(MutationKind::Fetch, 1);
    let detail = store.begin_lane(MutationKind::Fetch, 2);

    assert!(store.fetched_one(detail, item(1, 1), None));
    assert_eq!(store.status(MutationKind::Fetch), Status::Fulfilled);
    assert!(store.fetched(list, vec![item(1, 1), item(2, 0)], None));
    assert_eq!(store.len(), 2);

    let older = store.begin_lane(MutationKind::Fetch, 1);
    let newer = store.begin_lane(MutationKind::Fetch, 1);
    store.reset();
    assert!(!store.fetched(newer, vec![item(3, 0)], None));
    assert!(!store.fetched(older, vec![item(4, 0)], None));
    assert!(store.is_empty());
}

#[test]
fn current_item_is_a_weak_reference() {
    let mut store: Resource<Item> = Resource::new("items");
    let t = store.begin(MutationKind::Fetch);
    store.fetched(t, vec![item(1, 0), item(2, 0)], None);
    store.select(Some("2"));
    assert_eq!(store.current().map(|i| i.id.as_str()), Some("2"));

    let t = store.begin(MutationKind::Fetch);
    store.fetched(t, vec![item(1, 0)], None);
    assert!(store.current().is_none());
}

#[test]
fn reset_empties_the_resource_and_ignores_old_requests() {
    let mut store: Resource<Item> = Resource::new("items");
    let t = store.begin(MutationKind::Fetch);
    store.fetched(t, vec![item(1, 0)], None);
    let in_flight = store.begin(MutationKind::Create);

    store.reset();
    assert!(store.is_empty());
    assert!(!store.created(in_flight, item(9, 0), None));
    assert!(store.is_empty());
    for kind in MutationKind::ALL {
        assert_eq!(store.status(kind), Status::Idle);
    }
}

#[test]
fn create_and_update_set_success() {
    let mut store: Resource<Item> = Resource::new("items");
    let t = store.begin(MutationKind::Create);
    assert!(!store.success());
    store.created(t, item(1, 0), None);
    assert!(store.success());

    let t = store.begin(MutationKind::Update);
    assert!(!store.success());
    store.rejected(t, network_error());
    assert!(!store.success());
}
