//! Inclusion receipts.
//!
//! A [`Receipt`] proves that `object` was appended at `object_height` and
//! is committed to by the accumulator root at `anchor_height`. Checking it
//! needs nothing but SHA-256: fold the object through the steps and
//! compare with the anchor.

mod builder;

use std::fmt;

use anchordb_accumulator::{ApplyStep, Hash, apply_steps};
use bincode::{Decode, Encode};

pub use self::builder::ReceiptBuilder;
use crate::{Error, Result};

/// Upper bound on an encoded receipt accepted by [`Receipt::decode_from_slice`].
const MAX_ENCODED_RECEIPT: usize = 1024 * 1024;

/// Proof that an object is subsumed by an anchor.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Receipt {
    /// The proven leaf.
    pub object: Hash,
    /// Height the object was appended at.
    pub object_height: u64,
    /// Height whose accumulator root is the anchor.
    pub anchor_height: u64,
    /// Siblings combined with the object's derivative, in order.
    pub steps: Vec<ApplyStep>,
    /// Accumulator root at `anchor_height`.
    pub anchor: Hash,
}

impl Receipt {
    /// Fold the object through the steps.
    pub fn computed_anchor(&self) -> Hash {
        apply_steps(self.object, &self.steps)
    }

    /// Whether the steps lead from the object to the anchor.
    pub fn validate(&self) -> bool {
        self.computed_anchor() == self.anchor
    }

    /// Serialize with bincode (big-endian standard config).
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| Error::Codec(format!("failed to encode receipt: {}", e)))
    }

    /// Deserialize a receipt, rejecting trailing bytes.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<MAX_ENCODED_RECEIPT>();
        let (receipt, read) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| Error::Codec(format!("failed to decode receipt: {}", e)))?;
        if read != bytes.len() {
            return Err(Error::Codec(format!(
                "receipt has {} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(receipt)
    }
}

/// Validate `receipt` without any I/O.
pub fn validate_receipt(receipt: &Receipt) -> bool {
    receipt.validate()
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "receipt")?;
        writeln!(f, "  object         {}", self.object)?;
        writeln!(f, "  object height  {}", self.object_height)?;
        writeln!(f, "  anchor height  {}", self.anchor_height)?;
        let mut working = self.object;
        for (i, step) in self.steps.iter().enumerate() {
            working = step.apply(&working);
            writeln!(f, "  {:>3} {} -> {}", i, step, working)?;
        }
        write!(f, "  anchor         {}", self.anchor)
    }
}

#[cfg(test)]
mod tests {
    use anchordb_accumulator::Side;
    use assert_matches::assert_matches;

    use super::*;

    fn sample() -> Receipt {
        let object = Hash::digest(b"a");
        let steps = vec![
            ApplyStep {
                side: Side::Right,
                hash: Hash::digest(b"b"),
            },
            ApplyStep {
                side: Side::Left,
                hash: Hash::digest(b"c"),
            },
        ];
        let anchor = apply_steps(object, &steps);
        Receipt {
            object,
            object_height: 1,
            anchor_height: 2,
            steps,
            anchor,
        }
    }

    #[test]
    fn validate_checks_anchor_and_direction() {
        let receipt = sample();
        assert!(validate_receipt(&receipt));

        let mut flipped = receipt.clone();
        flipped.steps[0].side = Side::Left;
        assert!(!flipped.validate());

        let mut wrong_anchor = receipt;
        wrong_anchor.anchor = Hash::digest(b"nope");
        assert!(!wrong_anchor.validate());
    }

    #[test]
    fn bincode_round_trip_rejects_trailing() {
        let receipt = sample();
        let mut bytes = receipt.encode_to_vec().expect("encode");
        assert_eq!(Receipt::decode_from_slice(&bytes).expect("decode"), receipt);
        bytes.push(0);
        assert_matches!(Receipt::decode_from_slice(&bytes), Err(Error::Codec(_)));
        assert_matches!(Receipt::decode_from_slice(&bytes[..10]), Err(Error::Codec(_)));
    }

    #[test]
    fn display_shows_each_step() {
        let receipt = sample();
        let text = receipt.to_string();
        assert!(text.contains(&receipt.object.to_string()));
        assert!(text.contains(&format!("R {}", Hash::digest(b"b"))));
        assert!(text.ends_with(&receipt.anchor.to_string()));
    }
}
