//! The [`LeafSink`] that records account-level diffs and recurses into each
//! account's storage trie.

use archors_verify::Account;

use crate::{
    diff::{DiffError, StateDiff},
    node::NodeRef,
    sink::{resolve_address, LeafSink},
    storage::StorageSink,
    store::TransitionDb,
    walk::walk,
};

/// Diffs the world state trie: one `on_leaf` call per changed account,
/// which in turn walks that account's storage trie for changed slots.
pub struct AccountSink<'a> {
    pub diff: &'a mut StateDiff,
}

impl<'a> LeafSink for AccountSink<'a> {
    fn on_leaf(
        &mut self,
        full_key: [u8; 32],
        left: Option<&[u8]>,
        right: Option<&[u8]>,
        store: &TransitionDb,
    ) -> Result<(), DiffError> {
        let address = resolve_address(full_key, store)?;
        let left_account = left.map(rlp::decode::<Account>).transpose()?;
        let right_account = right.map(rlp::decode::<Account>).transpose()?;
        self.diff
            .record_account(address, (left_account, right_account));

        let left_storage_root = left_account.map(|a| NodeRef::from_root_hash(a.storage_root));
        let right_storage_root = right_account.map(|a| NodeRef::from_root_hash(a.storage_root));
        let l_storage_ref = left_storage_root.unwrap_or(NodeRef::Absent);
        let r_storage_ref = right_storage_root.unwrap_or(NodeRef::Absent);

        if l_storage_ref != r_storage_ref {
            let mut storage_sink = StorageSink {
                address,
                diff: &mut *self.diff,
            };
            let mut path = Vec::with_capacity(64);
            walk(&l_storage_ref, &r_storage_ref, &mut path, &mut storage_sink, store)?;
        }
        Ok(())
    }
}
