//! The [`LeafSink`] that records storage-slot diffs for one account.

use archors_verify::utils::hex_encode;
use ethers::types::{H160, U256};

use crate::{
    diff::{DiffError, StateDiff},
    sink::LeafSink,
    store::TransitionDb,
};

/// Diffs a single account's storage trie: one `on_leaf` call per changed
/// slot, recorded under `address` in the shared [`StateDiff`].
pub struct StorageSink<'a> {
    pub address: H160,
    pub diff: &'a mut StateDiff,
}

impl<'a> LeafSink for StorageSink<'a> {
    fn on_leaf(
        &mut self,
        full_key: [u8; 32],
        left: Option<&[u8]>,
        right: Option<&[u8]>,
        store: &TransitionDb,
    ) -> Result<(), DiffError> {
        let key = store
            .storage_key_preimages
            .get(&full_key.into())
            .copied()
            .ok_or_else(|| DiffError::MissingPreimage(hex_encode(full_key)))?;

        let left_value = left.map(decode_storage_value).transpose()?;
        let right_value = right.map(decode_storage_value).transpose()?;
        self.diff.record_storage(
            self.address,
            key,
            (left_value, right_value),
        );
        Ok(())
    }
}

/// Storage values are RLP-encoded big-endian integers with no leading zero
/// bytes; the empty string encodes zero (a storage slot is never actually
/// stored as literal zero, it's deleted instead, but an absent value is
/// represented the same way downstream of RLP decoding).
fn decode_storage_value(raw: &[u8]) -> Result<U256, DiffError> {
    let bytes: Vec<u8> = rlp::decode(raw)?;
    Ok(U256::from_big_endian(&bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_empty_as_zero() {
        let encoded = rlp::encode(&Vec::<u8>::new());
        assert_eq!(decode_storage_value(&encoded).unwrap(), U256::zero());
    }

    #[test]
    fn decodes_a_nonzero_value() {
        let encoded = rlp::encode(&vec![0x01, 0x00]);
        assert_eq!(decode_storage_value(&encoded).unwrap(), U256::from(256));
    }
}
