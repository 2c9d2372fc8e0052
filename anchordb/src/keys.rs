//! Bucket layout and key codecs.

use anchordb_accumulator::Hash;
use anchordb_storage::Bucket;

use crate::{Error, Result};

/// Height → serialized accumulator after that height's leaves.
pub const HEIGHT_SNAPSHOTS: Bucket = Bucket::new("merkle_state");
/// Mark boundary → accumulator at `boundary - 1` leaves.
pub const MARKS: Bucket = Bucket::labeled("merkle_state", "mark");
/// Mark boundary → leaf number `boundary - 1`.
pub const MARK_NEXT: Bucket = Bucket::labeled("merkle_state", "mark_next");
/// Object hash → first height it was seen at.
pub const FIRST_SEEN: Bucket = Bucket::new("object");
/// Chain id → first entry hash.
pub const CHAIN_HEAD: Bucket = Bucket::new("chain");
/// Sync cursor.
pub const SYNC: Bucket = Bucket::new("sync");
/// Authority set membership.
pub const IDENTITY: Bucket = Bucket::new("identity");

/// Key of the head record in [`SYNC`].
pub const HEAD_KEY: &[u8] = b"head";
/// Key of the authority set in [`IDENTITY`].
pub const AUTHORITIES_KEY: &[u8] = b"authorities";

/// Big-endian height key, so keys sort by height.
pub fn height_key(height: u64) -> [u8; 8] {
    height.to_be_bytes()
}

/// Decode an 8-byte big-endian height.
pub fn decode_height(bytes: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Codec(format!("height must be 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Decode a stored 32-byte hash.
pub fn decode_hash(bytes: &[u8]) -> Result<Hash> {
    Hash::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn height_keys_sort_numerically() {
        assert!(height_key(255) < height_key(256));
        assert_eq!(decode_height(&height_key(1 << 40)).expect("decode"), 1 << 40);
        assert_matches!(decode_height(&[1, 2, 3]), Err(Error::Codec(_)));
    }

    #[test]
    fn buckets_are_distinct() {
        let buckets = [
            HEIGHT_SNAPSHOTS,
            MARKS,
            MARK_NEXT,
            FIRST_SEEN,
            CHAIN_HEAD,
            SYNC,
            IDENTITY,
        ];
        for (i, a) in buckets.iter().enumerate() {
            for b in &buckets[i + 1..] {
                assert_ne!(a.prefix(), b.prefix(), "{} vs {}", a, b);
            }
        }
    }
}
