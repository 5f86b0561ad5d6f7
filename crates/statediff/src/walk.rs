//! The recursive two-trie alignment algorithm.
//!
//! `walk` re-expresses any pair of node shapes encoding the same logical key
//! range into aligned recursive calls, firing `sink.on_leaf` exactly once
//! for every logical key whose value differs between `l_ref` and `r_ref`.

use archors_verify::path::{nibbles_to_bytes, nibbles_to_prefixed_bytes, PathError, TargetNodeEncoding};
use log::trace;

use crate::{
    diff::DiffError,
    node::{check_branch_node, Node, NodeRef},
    resolve::resolve,
    sink::LeafSink,
    store::TransitionDb,
};

/// Diffs the trie rooted at `l_ref` against the one rooted at `r_ref`,
/// appending to `path` (a nibble-per-byte buffer, reused across the whole
/// walk) and restoring its length before returning.
pub fn walk(
    l_ref: &NodeRef,
    r_ref: &NodeRef,
    path: &mut Vec<u8>,
    sink: &mut dyn LeafSink,
    store: &TransitionDb,
) -> Result<(), DiffError> {
    if l_ref == r_ref {
        // Structurally identical subtrees: nothing below can differ, and no
        // node lookup was needed to establish that.
        return Ok(());
    }

    let l_node = resolve(l_ref, store)?;
    let r_node = resolve(r_ref, store)?;
    trace!(
        "walk path={:?} left={:?} right={:?}",
        path,
        l_node.as_ref().map(Node::kind_name),
        r_node.as_ref().map(Node::kind_name)
    );

    match (l_node, r_node) {
        (None, None) => Ok(()),

        (None, Some(Node::Leaf { rest_of_key, value })) => {
            emit(path, &rest_of_key, None, Some(&value), sink, store)
        }
        (Some(Node::Leaf { rest_of_key, value }), None) => {
            emit(path, &rest_of_key, Some(&value), None, sink, store)
        }

        (None, Some(Node::Extension { key_segment, subnode })) => recurse(
            &NodeRef::Absent,
            &subnode,
            path,
            &key_segment,
            sink,
            store,
        ),
        (Some(Node::Extension { key_segment, subnode }), None) => recurse(
            &subnode,
            &NodeRef::Absent,
            path,
            &key_segment,
            sink,
            store,
        ),

        (None, Some(Node::Branch { subnodes, value })) => {
            check_branch_node(&value)?;
            for (i, child) in subnodes.iter().enumerate() {
                recurse(&NodeRef::Absent, child, path, &[i as u8], sink, store)?;
            }
            Ok(())
        }
        (Some(Node::Branch { subnodes, value }), None) => {
            check_branch_node(&value)?;
            for (i, child) in subnodes.iter().enumerate() {
                recurse(child, &NodeRef::Absent, path, &[i as u8], sink, store)?;
            }
            Ok(())
        }

        (
            Some(Node::Leaf { rest_of_key: l_key, value: l_value }),
            Some(Node::Leaf { rest_of_key: r_key, value: r_value }),
        ) => {
            if l_key == r_key {
                if l_value == r_value {
                    Ok(())
                } else {
                    emit(path, &l_key, Some(&l_value), Some(&r_value), sink, store)
                }
            } else {
                emit(path, &l_key, Some(&l_value), None, sink, store)?;
                emit(path, &r_key, None, Some(&r_value), sink, store)
            }
        }

        (
            Some(Node::Leaf { rest_of_key: l_key, value: l_value }),
            Some(Node::Extension { key_segment, subnode }),
        ) => {
            if let Some(shortened) = l_key.strip_prefix(key_segment.as_slice()) {
                let shortened_leaf = NodeRef::Inline(encode_leaf(shortened, &l_value)?);
                recurse(&shortened_leaf, &subnode, path, &key_segment, sink, store)
            } else {
                emit(path, &l_key, Some(&l_value), None, sink, store)?;
                recurse(&NodeRef::Absent, &subnode, path, &key_segment, sink, store)
            }
        }
        (
            Some(Node::Extension { key_segment, subnode }),
            Some(Node::Leaf { rest_of_key: r_key, value: r_value }),
        ) => {
            if let Some(shortened) = r_key.strip_prefix(key_segment.as_slice()) {
                let shortened_leaf = NodeRef::Inline(encode_leaf(shortened, &r_value)?);
                recurse(&subnode, &shortened_leaf, path, &key_segment, sink, store)
            } else {
                emit(path, &r_key, None, Some(&r_value), sink, store)?;
                recurse(&subnode, &NodeRef::Absent, path, &key_segment, sink, store)
            }
        }

        (
            Some(Node::Leaf { rest_of_key: l_key, value: l_value }),
            Some(Node::Branch { subnodes, value }),
        ) => {
            check_branch_node(&value)?;
            let (first, rest) = l_key.split_first().ok_or(DiffError::ShapeMismatch {
                left: "Leaf with empty rest_of_key",
                right: "Branch",
            })?;
            for (i, child) in subnodes.iter().enumerate() {
                if i as u8 == *first {
                    let shortened_leaf = NodeRef::Inline(encode_leaf(rest, &l_value)?);
                    recurse(&shortened_leaf, child, path, &[i as u8], sink, store)?;
                } else {
                    recurse(&NodeRef::Absent, child, path, &[i as u8], sink, store)?;
                }
            }
            Ok(())
        }
        (
            Some(Node::Branch { subnodes, value }),
            Some(Node::Leaf { rest_of_key: r_key, value: r_value }),
        ) => {
            check_branch_node(&value)?;
            let (first, rest) = r_key.split_first().ok_or(DiffError::ShapeMismatch {
                left: "Branch",
                right: "Leaf with empty rest_of_key",
            })?;
            for (i, child) in subnodes.iter().enumerate() {
                if i as u8 == *first {
                    let shortened_leaf = NodeRef::Inline(encode_leaf(rest, &r_value)?);
                    recurse(child, &shortened_leaf, path, &[i as u8], sink, store)?;
                } else {
                    recurse(child, &NodeRef::Absent, path, &[i as u8], sink, store)?;
                }
            }
            Ok(())
        }

        (
            Some(Node::Extension { key_segment: ls, subnode: l_sub }),
            Some(Node::Extension { key_segment: rs, subnode: r_sub }),
        ) => {
            if ls == rs {
                recurse(&l_sub, &r_sub, path, &ls, sink, store)
            } else if ls.starts_with(&rs) {
                let shortened = NodeRef::Inline(encode_extension(&ls[rs.len()..], &l_sub)?);
                recurse(&shortened, &r_sub, path, &rs, sink, store)
            } else if rs.starts_with(&ls) {
                let shortened = NodeRef::Inline(encode_extension(&rs[ls.len()..], &r_sub)?);
                recurse(&l_sub, &shortened, path, &ls, sink, store)
            } else {
                recurse(&l_sub, &NodeRef::Absent, path, &ls, sink, store)?;
                recurse(&NodeRef::Absent, &r_sub, path, &rs, sink, store)
            }
        }

        (
            Some(Node::Extension { key_segment, subnode }),
            Some(Node::Branch { subnodes, value }),
        ) => {
            check_branch_node(&value)?;
            let n = *key_segment.first().ok_or(DiffError::Path(PathError::OddNumberOfNibbles))?;
            for (i, child) in subnodes.iter().enumerate() {
                if i as u8 == n {
                    let l_to_compare = if key_segment.len() == 1 {
                        subnode.clone()
                    } else {
                        NodeRef::Inline(encode_extension(&key_segment[1..], &subnode)?)
                    };
                    recurse(&l_to_compare, child, path, &[i as u8], sink, store)?;
                } else {
                    recurse(&NodeRef::Absent, child, path, &[i as u8], sink, store)?;
                }
            }
            Ok(())
        }
        (
            Some(Node::Branch { subnodes, value }),
            Some(Node::Extension { key_segment, subnode }),
        ) => {
            check_branch_node(&value)?;
            let n = *key_segment.first().ok_or(DiffError::Path(PathError::OddNumberOfNibbles))?;
            for (i, child) in subnodes.iter().enumerate() {
                if i as u8 == n {
                    let r_to_compare = if key_segment.len() == 1 {
                        subnode.clone()
                    } else {
                        NodeRef::Inline(encode_extension(&key_segment[1..], &subnode)?)
                    };
                    recurse(child, &r_to_compare, path, &[i as u8], sink, store)?;
                } else {
                    recurse(child, &NodeRef::Absent, path, &[i as u8], sink, store)?;
                }
            }
            Ok(())
        }

        (
            Some(Node::Branch { subnodes: l_subnodes, value: l_value }),
            Some(Node::Branch { subnodes: r_subnodes, value: r_value }),
        ) => {
            check_branch_node(&l_value)?;
            check_branch_node(&r_value)?;
            for i in 0..16 {
                recurse(&l_subnodes[i], &r_subnodes[i], path, &[i as u8], sink, store)?;
            }
            Ok(())
        }
    }
}

/// Extends `path` by `extra`, recurses, and restores `path`'s length
/// regardless of outcome. A plain function rather than a closure-taking
/// combinator: `sink` is a `&mut dyn LeafSink` used repeatedly inside loops,
/// so threading it through as an ordinary argument (rather than re-capturing
/// it into a fresh closure each iteration) is what the borrow checker wants.
fn recurse(
    l_ref: &NodeRef,
    r_ref: &NodeRef,
    path: &mut Vec<u8>,
    extra: &[u8],
    sink: &mut dyn LeafSink,
    store: &TransitionDb,
) -> Result<(), DiffError> {
    let old_len = path.len();
    path.extend_from_slice(extra);
    let result = walk(l_ref, r_ref, path, sink, store);
    path.truncate(old_len);
    result
}

/// Extends `path` by `rest_of_key`, packs the full 32-byte key, and fires
/// `sink.on_leaf`, restoring `path`'s length regardless of outcome.
fn emit(
    path: &mut Vec<u8>,
    rest_of_key: &[u8],
    left: Option<&[u8]>,
    right: Option<&[u8]>,
    sink: &mut dyn LeafSink,
    store: &TransitionDb,
) -> Result<(), DiffError> {
    let old_len = path.len();
    path.extend_from_slice(rest_of_key);
    let result = pack_path(path).and_then(|full_key| sink.on_leaf(full_key, left, right, store));
    path.truncate(old_len);
    result
}

fn pack_path(path: &[u8]) -> Result<[u8; 32], DiffError> {
    let bytes = nibbles_to_bytes(path)?;
    let array: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| DiffError::ShapeMismatch {
        left: "leaf path",
        right: if bytes.len() < 32 {
            "shorter than 32 bytes"
        } else {
            "longer than 32 bytes"
        },
    })?;
    Ok(array)
}

/// Builds the raw RLP encoding of a leaf node, for constructing a shortened
/// leaf without mutating the original.
fn encode_leaf(rest_of_key: &[u8], value: &[u8]) -> Result<Vec<u8>, DiffError> {
    let path = nibbles_to_prefixed_bytes(rest_of_key, TargetNodeEncoding::Leaf)?;
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(&path);
    stream.append(&value.to_vec());
    Ok(stream.out().to_vec())
}

/// Builds the raw RLP encoding of an extension node, for constructing a
/// shortened extension without mutating the original.
fn encode_extension(key_segment: &[u8], subnode: &NodeRef) -> Result<Vec<u8>, DiffError> {
    let path = nibbles_to_prefixed_bytes(key_segment, TargetNodeEncoding::Extension)?;
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(&path);
    append_node_ref(&mut stream, subnode);
    Ok(stream.out().to_vec())
}

fn append_node_ref(stream: &mut rlp::RlpStream, node_ref: &NodeRef) {
    match node_ref {
        NodeRef::Absent => {
            stream.append_empty_data();
        }
        NodeRef::Hash(hash) => {
            stream.append(&hash.as_bytes().to_vec());
        }
        NodeRef::Inline(raw) => {
            stream.append_raw(raw, 1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct CollectSink(Vec<([u8; 32], Option<Vec<u8>>, Option<Vec<u8>>)>);

    impl LeafSink for CollectSink {
        fn on_leaf(
            &mut self,
            full_key: [u8; 32],
            left: Option<&[u8]>,
            right: Option<&[u8]>,
            _store: &TransitionDb,
        ) -> Result<(), DiffError> {
            self.0
                .push((full_key, left.map(|v| v.to_vec()), right.map(|v| v.to_vec())));
            Ok(())
        }
    }

    fn encode_branch(subnodes: [NodeRef; 16]) -> Vec<u8> {
        let mut stream = rlp::RlpStream::new_list(17);
        for child in &subnodes {
            append_node_ref(&mut stream, child);
        }
        stream.append(&Vec::<u8>::new());
        stream.out().to_vec()
    }

    fn pack(nibbles: &[u8]) -> [u8; 32] {
        pack_path(nibbles).unwrap()
    }

    // S4: pre has a single leaf at K1; post promotes it into an
    // extension+branch with a second leaf K2 sharing a 10-nibble prefix.
    // Exactly one diff entry (K2's creation) should be emitted: K1's value
    // is unchanged and must not be reported.
    #[test]
    fn leaf_to_branch_shape_change_reports_only_the_new_leaf() {
        let store = TransitionDb::default();
        let prefix = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9, 0xa]; // 10 nibbles
        let rest53_k1: Vec<u8> = (0..53).map(|i| (i % 16) as u8).collect();
        let rest53_k2: Vec<u8> = (0..53).map(|i| (15 - i % 16) as u8).collect();

        let mut k1_full = prefix.clone();
        k1_full.push(3);
        k1_full.extend(&rest53_k1);
        let mut k2_full = prefix.clone();
        k2_full.push(7);
        k2_full.extend(&rest53_k2);
        assert_eq!(k1_full.len(), 64);
        assert_eq!(k2_full.len(), 64);

        let val1 = vec![0xaa, 0xbb];
        let val2 = vec![0xcc, 0xdd, 0xee];

        let mut subnodes: [NodeRef; 16] = Default::default();
        subnodes[3] = NodeRef::Inline(encode_leaf(&rest53_k1, &val1).unwrap());
        subnodes[7] = NodeRef::Inline(encode_leaf(&rest53_k2, &val2).unwrap());
        let branch_raw = encode_branch(subnodes);
        let extension_raw = encode_extension(&prefix, &NodeRef::Inline(branch_raw)).unwrap();

        let left_root = NodeRef::Inline(encode_leaf(&k1_full, &val1).unwrap());
        let right_root = NodeRef::Inline(extension_raw);

        let mut sink = CollectSink(vec![]);
        let mut path = vec![];
        walk(&left_root, &right_root, &mut path, &mut sink, &store).unwrap();

        assert_eq!(sink.0.len(), 1);
        let (key, left, right) = &sink.0[0];
        assert_eq!(*key, pack(&k2_full));
        assert_eq!(*left, None);
        assert_eq!(*right, Some(val2));
    }

    // S6: two extension nodes, `key_segment` [1,2,3] vs [1,2], rooted under
    // the same parent, whose children differ. The walker must align the
    // shared [1,2] prefix, shorten the left extension to [3], and attribute
    // the value change to the correctly reconstructed 64-nibble path.
    #[test]
    fn extension_split_aligns_on_the_shared_prefix() {
        let store = TransitionDb::default();
        let rest61: Vec<u8> = (0..61).map(|i| (i % 16) as u8).collect();
        let mut full_key = vec![1u8, 2, 3];
        full_key.extend(&rest61);
        assert_eq!(full_key.len(), 64);

        let val_a = vec![0x01];
        let val_b = vec![0x02];

        let left_leaf = NodeRef::Inline(encode_leaf(&rest61, &val_a).unwrap());
        let left_root = NodeRef::Inline(encode_extension(&[1, 2, 3], &left_leaf).unwrap());

        let mut subnodes: [NodeRef; 16] = Default::default();
        subnodes[3] = NodeRef::Inline(encode_leaf(&rest61, &val_b).unwrap());
        let right_branch = NodeRef::Inline(encode_branch(subnodes));
        let right_root = NodeRef::Inline(encode_extension(&[1, 2], &right_branch).unwrap());

        let mut sink = CollectSink(vec![]);
        let mut path = vec![];
        walk(&left_root, &right_root, &mut path, &mut sink, &store).unwrap();

        assert_eq!(sink.0.len(), 1);
        let (key, left, right) = &sink.0[0];
        assert_eq!(*key, pack(&full_key));
        assert_eq!(*left, Some(val_a));
        assert_eq!(*right, Some(val_b));
    }
}
