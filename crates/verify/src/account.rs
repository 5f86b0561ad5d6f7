//! The canonical Ethereum account record, as stored at the end of every
//! account-trie leaf: `rlp([nonce, balance, storage_root, code_hash])`.
//!
//! Code is deliberately not part of this struct: the account trie leaf never
//! carries the contract body, only its hash.

use ethers::types::{H256, U256, U64};
use rlp_derive::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// A decoded account-trie leaf value.
///
/// Field order matches the RLP list order and must not be reordered.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct Account {
    pub nonce: U64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}
