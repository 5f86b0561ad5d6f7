//! The shared, read-only node store a diff walk resolves references against.

use std::collections::HashMap;

use ethers::types::{H160, H256};

/// Every trie node reachable from either the pre- or post-state root, keyed
/// by its own hash, plus the preimages needed to recover addresses and
/// storage keys from hashed trie paths.
///
/// Loading this from a block's transition data (fetching state, decoding
/// `eth_getProof`-style witnesses, building the preimage maps) is out of
/// scope here: callers construct a `TransitionDb` however suits their
/// source, and this crate only ever reads from it.
#[derive(Debug, Default, Clone)]
pub struct TransitionDb {
    /// Every node's raw RLP encoding, keyed by its Keccak256 hash.
    pub nodes: HashMap<H256, Vec<u8>>,
    /// Maps `keccak256(address)` back to the address it hashes from, for
    /// every address touched by either state.
    pub address_preimages: HashMap<H256, H160>,
    /// Maps `keccak256(storage_key)` back to the storage key it hashes from,
    /// for every slot touched by either state.
    pub storage_key_preimages: HashMap<H256, H256>,
    /// The world state trie root before the block.
    pub state_root: H256,
    /// The world state trie root after the block.
    pub post_state_root: H256,
}

impl TransitionDb {
    pub fn new(state_root: H256, post_state_root: H256) -> Self {
        Self {
            state_root,
            post_state_root,
            ..Default::default()
        }
    }
}
