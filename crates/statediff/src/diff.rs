//! The error taxonomy and output accumulator for a two-trie diff.

use std::collections::HashMap;

use archors_verify::{path::PathError, Account};
use ethers::types::{H160, H256, U256};
use thiserror::Error;

/// Every way a diff walk can fail. All variants are fatal: the walk halts
/// immediately and no partial [`StateDiff`] is returned.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A hash reference was not present in the node store and the walker
    /// needed to resolve it (the equal-refs fast path did not apply).
    #[error("node hash {0:#x} is not present in the node store")]
    MissingNode(H256),
    /// An account or storage leaf path had no entry in the preimage store.
    #[error("no preimage found for hashed path {0}")]
    MissingPreimage(String),
    /// A branch node carried a non-empty terminal value.
    #[error("branch node (non-terminal) carries a non-empty value")]
    BadBranch,
    /// A `(left, right)` node pair did not match any case in the dispatch
    /// table (a malformed witness, or a bug).
    #[error("mismatched node types during trie alignment: left={left}, right={right}")]
    ShapeMismatch {
        left: &'static str,
        right: &'static str,
    },
    /// A leaf payload failed to RLP-decode as the expected shape (account or
    /// big-endian integer).
    #[error("leaf payload failed to decode: {0}")]
    BadRlp(#[from] rlp::DecoderError),
    /// A node reference was neither absent, a 32-byte hash, nor an inline
    /// RLP list.
    #[error("node reference is neither absent, a 32-byte hash, nor an inline list")]
    BadNodeRef,
    /// A leaf/extension node's hex-prefix encoded path could not be decoded.
    #[error("trie path error {0}")]
    Path(#[from] PathError),
}

/// Pre/post value pair. `None` on one side means creation (pre) or deletion
/// (post); both `Some` and unequal means a plain update. The walker never
/// emits a pair where both sides are `None` or both sides are equal.
pub type Diff<T> = (Option<T>, Option<T>);

/// Per-address storage diff: storage key -> (pre, post) value.
pub type StorageDiff = HashMap<H256, Diff<U256>>;

/// The result of diffing two state tries: every account and storage slot
/// whose value differs between the `left` (pre) and `right` (post) roots.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateDiff {
    /// address -> (pre account, post account).
    pub account_diffs: HashMap<H160, Diff<Account>>,
    /// address -> storage key -> (pre value, post value).
    pub storage_diffs: HashMap<H160, StorageDiff>,
}

impl StateDiff {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record an account-level diff, creating the entry (there is only ever
    /// one per address: the walker visits each account leaf at most once).
    pub(crate) fn record_account(&mut self, address: H160, diff: Diff<Account>) {
        self.account_diffs.insert(address, diff);
    }

    /// Record a single storage-slot diff for `address`, creating the
    /// per-address map on first write.
    pub(crate) fn record_storage(&mut self, address: H160, key: H256, diff: Diff<U256>) {
        self.storage_diffs
            .entry(address)
            .or_default()
            .insert(key, diff);
    }
}
