//! Structural diff between two Merkle PATRICIA Tries sharing a node store,
//! the world state trie before and after a block.
//!
//! Given a [`store::TransitionDb`] populated with every node reachable from
//! either root plus the address/storage-key preimages, [`from_tries`] walks
//! both tries in lock-step and returns every account and storage slot whose
//! value changed. Loading the transition data itself, hashing, and RLP
//! primitives are out of scope: this crate only aligns and compares.

pub mod account;
pub mod diff;
pub mod node;
pub mod resolve;
pub mod sink;
pub mod storage;
pub mod store;
pub mod walk;

pub use diff::{Diff, DiffError, StateDiff, StorageDiff};
pub use store::TransitionDb;

use account::AccountSink;
use node::NodeRef;
use walk::walk;

/// Diffs the world state trie rooted at `store.state_root` against the one
/// rooted at `store.post_state_root`, recursing into every changed
/// account's storage trie along the way.
pub fn from_tries(store: &TransitionDb) -> Result<StateDiff, DiffError> {
    let mut diff = StateDiff::new();
    let l_ref = NodeRef::from_root_hash(store.state_root);
    let r_ref = NodeRef::from_root_hash(store.post_state_root);
    let mut sink = AccountSink { diff: &mut diff };
    let mut path = Vec::with_capacity(64);
    walk(&l_ref, &r_ref, &mut path, &mut sink, store)?;
    Ok(diff)
}
