//! The active-network set.
//!
//! Externally this is a singly-linked list threaded through [`Network`]
//! entities, because the query layer recovers the set by chasing
//! `next_array_element` edges. Internally each invocation materializes
//! the list into a contiguous `Vec`, edits that, and re-serializes the
//! links on commit.

use crate::entities::{Entity, EntityKind, GlobalState, Network, GLOBAL_STATE_ID};
use crate::exec::{ExecError, InvariantViolation};
use crate::store::StoreCache;

/// Walks the linked list into a `Vec`, in list order.
///
/// The walk is bounded by and checked against
/// [`GlobalState::active_network_count`]; any disagreement (a dangling
/// edge, a cycle, a stale count) is an [`InvariantViolation`].
pub(crate) fn materialize(
    cache: &mut StoreCache<'_>,
    state: &GlobalState,
) -> Result<Vec<Network>, ExecError> {
    let mut networks = Vec::with_capacity(state.active_network_count as usize);
    let mut walked = 0u64;
    let mut next = state.network_array_head.clone();
    while let Some(id) = next {
        walked += 1;
        if walked > state.active_network_count {
            return Err(InvariantViolation::ActiveCountMismatch {
                walked,
                expected: state.active_network_count,
            }
            .into());
        }
        let network = cache
            .get(EntityKind::Network, &id)?
            .and_then(|entity| entity.into_network().ok())
            .ok_or(InvariantViolation::DanglingNetworkLink { id })?;
        next = network.next_array_element.clone();
        if network.removed_at.is_none() {
            networks.push(network);
        }
    }
    if networks.len() as u64 != state.active_network_count {
        return Err(InvariantViolation::ActiveCountMismatch {
            walked: networks.len() as u64,
            expected: state.active_network_count,
        }
        .into());
    }
    Ok(networks)
}

/// Removes the element at `index` in O(1) by swapping the tail into its
/// place. Relative order of everything else is preserved.
pub(crate) fn swap_and_pop(
    list: &mut Vec<Network>,
    index: u64,
) -> Result<Network, InvariantViolation> {
    if index >= list.len() as u64 {
        return Err(InvariantViolation::RemoveIndexOutOfRange {
            index,
            len: list.len(),
        });
    }
    Ok(list.swap_remove(index as usize))
}

/// Re-serializes the edited list back into entity fields and stages
/// every touched network.
///
/// Removed nodes lose their list fields but keep `removed_at`; retained
/// nodes are re-linked and re-indexed in order; the state's head and
/// count are rewritten.
pub(crate) fn commit(
    cache: &mut StoreCache<'_>,
    removed: Vec<Network>,
    mut retained: Vec<Network>,
    state: &mut GlobalState,
) {
    for mut network in removed {
        network.state = None;
        network.next_array_element = None;
        network.array_index = None;
        cache.set(network.id.clone(), Entity::Network(network));
    }

    let ids: Vec<String> = retained.iter().map(|network| network.id.clone()).collect();
    for (position, network) in retained.iter_mut().enumerate() {
        network.state = Some(GLOBAL_STATE_ID.to_owned());
        network.next_array_element = ids.get(position + 1).cloned();
        network.array_index = Some(position as u32);
    }
    state.network_array_head = ids.first().cloned();
    state.active_network_count = retained.len() as u64;
    for network in retained {
        cache.set(network.id.clone(), Entity::Network(network));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn network(id: &str) -> Network {
        Network {
            id: id.to_owned(),
            chain_id: id.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn swap_and_pop_replaces_with_former_tail() {
        let mut list = vec![network("a"), network("b"), network("c"), network("d")];
        let removed = swap_and_pop(&mut list, 1).unwrap();
        assert_eq!(removed.id, "b");
        let ids: Vec<&str> = list.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "d", "c"]);

        assert_eq!(
            swap_and_pop(&mut list, 3),
            Err(InvariantViolation::RemoveIndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn commit_then_materialize_round_trips() {
        let mut store = MemoryStore::default();
        let mut cache = StoreCache::new(&mut store);
        let mut state = GlobalState {
            id: GLOBAL_STATE_ID.to_owned(),
            ..Default::default()
        };

        let retained = vec![network("a"), network("b"), network("c")];
        commit(&mut cache, vec![], retained, &mut state);

        assert_eq!(state.active_network_count, 3);
        assert_eq!(state.network_array_head.as_deref(), Some("a"));

        let walked = materialize(&mut cache, &state).unwrap();
        let ids: Vec<&str> = walked.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        for (position, network) in walked.iter().enumerate() {
            assert_eq!(network.array_index, Some(position as u32));
            assert_eq!(network.state.as_deref(), Some(GLOBAL_STATE_ID));
        }
        assert_eq!(walked[2].next_array_element, None);
    }

    #[test]
    fn stale_count_is_detected() {
        let mut store = MemoryStore::default();
        let mut cache = StoreCache::new(&mut store);
        let mut state = GlobalState::default();

        commit(&mut cache, vec![], vec![network("a")], &mut state);
        state.active_network_count = 2;

        assert!(matches!(
            materialize(&mut cache, &state),
            Err(ExecError::Invariant(InvariantViolation::ActiveCountMismatch { .. }))
        ));
    }
}
