//! The trait a leaf handler implements to receive diffed key/value pairs.
//!
//! `walk` is generic over what "a leaf changed" means (an account leaf in
//! the world state trie vs. a storage leaf in a per-account storage trie) by
//! dispatching through this trait rather than a boxed closure, matching how
//! this codebase's proof verifier threads trait objects through its own
//! recursive walks instead of allocating closures per call.
use archors_verify::utils::hex_encode;
use ethers::types::H160;

use crate::{diff::DiffError, store::TransitionDb};

/// Receives one (pre, post) pair for every full 32-byte trie key whose value
/// differs between the left and right sides of a walk.
///
/// `full_key` is the hashed path (address hash for an account leaf, storage
/// key hash for a storage leaf), recovering the human-domain key from it is
/// the sink's job, via `store`'s preimage maps.
pub trait LeafSink {
    fn on_leaf(
        &mut self,
        full_key: [u8; 32],
        left: Option<&[u8]>,
        right: Option<&[u8]>,
        store: &TransitionDb,
    ) -> Result<(), DiffError>;
}

/// Looks up the address a hashed account-trie path preimages to, erroring if
/// the caller didn't supply one.
pub(crate) fn resolve_address(full_key: [u8; 32], store: &TransitionDb) -> Result<H160, DiffError> {
    store
        .address_preimages
        .get(&full_key.into())
        .copied()
        .ok_or_else(|| DiffError::MissingPreimage(hex_encode(full_key)))
}
