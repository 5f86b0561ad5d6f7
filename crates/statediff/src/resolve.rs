//! Turns a [`NodeRef`] into the [`Node`] it points at, via the shared store.

use crate::{
    diff::DiffError,
    node::{Node, NodeRef, EMPTY_ROOT_HASH},
    store::TransitionDb,
};

/// Resolves `node_ref` to its node, if any.
///
/// `Absent` and the canonical empty-root hash both resolve to `None` without
/// touching the store: an empty subtrie carries no node. Any other hash is
/// looked up in `store.nodes`; a miss is always [`DiffError::MissingNode`],
/// since callers only resolve a side once the cheap `l_ref == r_ref` check
/// in [`crate::walk::walk`] has already ruled out the one case where a
/// missing lookup could otherwise be read as "unchanged, don't care".
pub fn resolve(node_ref: &NodeRef, store: &TransitionDb) -> Result<Option<Node>, DiffError> {
    match node_ref {
        NodeRef::Absent => Ok(None),
        NodeRef::Hash(hash) if *hash == EMPTY_ROOT_HASH => Ok(None),
        NodeRef::Hash(hash) => {
            let raw = store
                .nodes
                .get(hash)
                .ok_or(DiffError::MissingNode(*hash))?;
            Node::decode(raw).map(Some)
        }
        NodeRef::Inline(raw) => Node::decode(raw).map(Some),
    }
}
