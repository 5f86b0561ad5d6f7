//! Resolved Merkle PATRICIA Trie node shapes and their RLP decoding.

use archors_verify::path::{prefixed_bytes_to_nibbles, PrefixEncoding};
use ethers::types::H256;
use rlp::Rlp;

use crate::diff::DiffError;

/// The canonical empty-trie root: `keccak256(rlp(""))`. An account's
/// `storage_root` equals this when its storage is empty; no node store entry
/// is required for it.
pub const EMPTY_ROOT_HASH: H256 = H256([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// A reference to a child/root node: missing, a hash requiring a store
/// lookup, or the node's own RLP embedded directly (used when a child's
/// encoding is shorter than 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeRef {
    #[default]
    Absent,
    Hash(H256),
    Inline(Vec<u8>),
}

impl NodeRef {
    pub fn from_root_hash(hash: H256) -> Self {
        if hash == EMPTY_ROOT_HASH || hash == H256::zero() {
            NodeRef::Absent
        } else {
            NodeRef::Hash(hash)
        }
    }
}

/// A resolved trie node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Terminal. `path ++ rest_of_key` maps to `value` (RLP-encoded).
    Leaf { rest_of_key: Vec<u8>, value: Vec<u8> },
    /// Path compression: advance the path by `key_segment`, continue at `subnode`.
    Extension { key_segment: Vec<u8>, subnode: NodeRef },
    /// One child per nibble 0-15; `value` is the payload if a key terminates here.
    Branch {
        subnodes: [NodeRef; 16],
        value: Vec<u8>,
    },
}

impl Node {
    /// A short name for error messages (`ShapeMismatch`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Leaf { .. } => "Leaf",
            Node::Extension { .. } => "Extension",
            Node::Branch { .. } => "Branch",
        }
    }

    /// Decodes a node from its raw RLP encoding (a 2-item leaf/extension
    /// list or a 17-item branch list).
    pub fn decode(raw: &[u8]) -> Result<Self, DiffError> {
        let rlp = Rlp::new(raw);
        match rlp.item_count()? {
            17 => decode_branch(&rlp),
            2 => decode_leaf_or_extension(&rlp),
            other => Err(DiffError::ShapeMismatch {
                left: "node",
                right: leak_item_count(other),
            }),
        }
    }
}

/// Asserts a branch's terminal value is empty, per this codebase's usage:
/// a branch never terminates a key in these diffed tries.
pub fn check_branch_node(value: &[u8]) -> Result<(), DiffError> {
    if value.is_empty() {
        Ok(())
    } else {
        Err(DiffError::BadBranch)
    }
}

fn decode_branch(rlp: &Rlp) -> Result<Node, DiffError> {
    let mut subnodes: [NodeRef; 16] = Default::default();
    for (i, slot) in subnodes.iter_mut().enumerate() {
        *slot = decode_child_ref(rlp.at(i)?)?;
    }
    let value = rlp.at(16)?.data()?.to_vec();
    Ok(Node::Branch { subnodes, value })
}

fn decode_leaf_or_extension(rlp: &Rlp) -> Result<Node, DiffError> {
    let path_item = rlp.at(0)?.data()?;
    match PrefixEncoding::try_from(path_item)? {
        PrefixEncoding::ExtensionEven | PrefixEncoding::ExtensionOdd(_) => {
            let key_segment = prefixed_bytes_to_nibbles(path_item)?;
            let subnode = decode_child_ref(rlp.at(1)?)?;
            Ok(Node::Extension {
                key_segment,
                subnode,
            })
        }
        PrefixEncoding::LeafEven | PrefixEncoding::LeafOdd(_) => {
            let rest_of_key = prefixed_bytes_to_nibbles(path_item)?;
            let value = rlp.at(1)?.data()?.to_vec();
            Ok(Node::Leaf {
                rest_of_key,
                value,
            })
        }
    }
}

fn decode_child_ref(item: Rlp) -> Result<NodeRef, DiffError> {
    if item.is_list() {
        return Ok(NodeRef::Inline(item.as_raw().to_vec()));
    }
    let data = item.data()?;
    match data.len() {
        0 => Ok(NodeRef::Absent),
        32 => Ok(NodeRef::Hash(H256::from_slice(data))),
        _ => Err(DiffError::BadNodeRef),
    }
}

// `ShapeMismatch` wants a `&'static str`; item-count mismatches are rare
// enough that a small fixed table is simpler than allocating.
fn leak_item_count(count: usize) -> &'static str {
    match count {
        0 => "0 items",
        1 => "1 item",
        3 => "3 items",
        _ => "invalid item count",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BRANCH_NODE: &str = "f90151a0bf5e7a6355d2aae16870034397bcb78fb7f3677302857c4e3f0f11b2ad183ddaa0441a130e5b3344a0c6d4e01e69cdd8c3d54c9427c22df1c21e823bd5238bcedc80a0de4a8735f0afe745a73341f09b2641b136c4c6ceb33a4c04f868b8c0ae0c572da0616b1953ab56f21db0e3e0a8f04422bbdce75bd530e049560426deb7548c9324a0df7498a408a3cb6f416a60eb97bc61cdd31f9f9c1e3d9f2e131c476cca1a64aaa0b4b838d595815f1af27bc520f9054bbe7b8f1ae901d58ceba455a93a02b38fe3a088c2648a34b76ec09c67666bf1b2ff917c97a960dbebd2c8d56ec2b89c5f5d7ba080f002d80dc9f4e682660964f02c4f70fdfb5aeeee5f5651fca75c06f810c37980a0f6d68b8a203434af63aefd6acbce4e627b80e03c11d9c64334d48655f842ee24a02991191455c868799650d6cd4009a21443c9ac2aebedb76d55d9a01811d59a9c8080808080";
    const ACCOUNT_LEAF: &str = "f8669d33269ec9b8f075a4723d27c611ac1c52a464f3516b25e0105a0d1c2210b846f8440180a03836d7e3afb674e5180b7564e096f6f3e30308878a443fe59012ced093544b7fa02cfdfbdd943ec0153ed07b97f03eb765dc11cc79c6f750effcc2d126f93c4b31";

    #[test]
    fn decodes_branch_node() {
        let bytes = hex::decode(BRANCH_NODE).unwrap();
        let node = Node::decode(&bytes).unwrap();
        match node {
            Node::Branch { subnodes, value } => {
                assert!(value.is_empty());
                assert!(matches!(subnodes[0], NodeRef::Hash(_)));
                assert_eq!(subnodes[14], NodeRef::Absent);
                assert_eq!(subnodes[15], NodeRef::Absent);
            }
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[test]
    fn decodes_account_leaf_node() {
        let bytes = hex::decode(ACCOUNT_LEAF).unwrap();
        let node = Node::decode(&bytes).unwrap();
        match node {
            Node::Leaf { rest_of_key, value } => {
                assert_eq!(rest_of_key.len(), 57);
                assert!(!value.is_empty());
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nonempty_branch_value() {
        assert!(check_branch_node(&[]).is_ok());
        assert!(matches!(
            check_branch_node(&[1]),
            Err(DiffError::BadBranch)
        ));
    }
}
