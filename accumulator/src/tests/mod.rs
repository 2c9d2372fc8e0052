
use crate::Hash;

/// Deterministic leaf for test index `i`.
pub(crate) fn leaf(i: u64) -> Hash {
    Hash::digest(&i.to_be_bytes())
}
