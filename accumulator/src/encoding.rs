//! Accumulator wire format.
//!
//! ```text
//! count: u64 BE | bitmap: u64 BE | occupied slots (32 bytes each, lowest
//! level first) | leaf log length: u64 BE | leaf log (32 bytes each)
//! ```
//!
//! Bit `i` of the bitmap is set iff `pending[i]` is occupied, so a valid
//! encoding always has `bitmap == count`.

use crate::{Error, HASH_LENGTH, Hash, HashAccumulator, Result};

const U64_LEN: usize = 8;

impl HashAccumulator {
    /// Serialize count, pending slots and the leaf log.
    pub fn marshal(&self) -> Vec<u8> {
        let occupied = self.occupied_slots();
        let mut buf = Vec::with_capacity(
            3 * U64_LEN + (occupied + self.hash_list.len()) * HASH_LENGTH,
        );
        buf.extend_from_slice(&self.count.to_be_bytes());
        buf.extend_from_slice(&self.presence_bitmap().to_be_bytes());
        for slot in self.pending.iter().flatten() {
            buf.extend_from_slice(slot.as_bytes());
        }
        buf.extend_from_slice(&(self.hash_list.len() as u64).to_be_bytes());
        for leaf in &self.hash_list {
            buf.extend_from_slice(leaf.as_bytes());
        }
        buf
    }

    /// Serialize count and pending slots with an empty leaf log.
    pub fn marshal_state(&self) -> Vec<u8> {
        self.without_hash_list().marshal()
    }

    /// Decode bytes produced by [`HashAccumulator::marshal`].
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut reader = Reader { data, offset: 0 };
        let count = reader.u64("count")?;
        let bitmap = reader.u64("presence bitmap")?;
        if bitmap != count {
            return Err(Error::InvalidData(format!(
                "presence bitmap {:#x} does not match count {}",
                bitmap, count
            )));
        }

        let levels = (u64::BITS - bitmap.leading_zeros()) as usize;
        let mut pending = Vec::with_capacity(levels);
        for level in 0..levels {
            if bitmap & (1u64 << level) != 0 {
                pending.push(Some(reader.hash("pending slot")?));
            } else {
                pending.push(None);
            }
        }

        let log_len = reader.u64("leaf log length")?;
        if log_len > count {
            return Err(Error::InvalidData(format!(
                "leaf log length {} exceeds count {}",
                log_len, count
            )));
        }
        let remaining = data.len() - reader.offset;
        let expected = usize::try_from(log_len)
            .ok()
            .and_then(|n| n.checked_mul(HASH_LENGTH))
            .ok_or_else(|| Error::InvalidData(format!("leaf log length {} too large", log_len)))?;
        if remaining != expected {
            return Err(Error::InvalidData(format!(
                "leaf log expects {} bytes, found {}",
                expected, remaining
            )));
        }
        let hash_list = data[reader.offset..]
            .chunks_exact(HASH_LENGTH)
            .map(Hash::from_slice)
            .collect::<Result<Vec<_>>>()?;

        Ok(HashAccumulator {
            count,
            pending,
            hash_list,
        })
    }

    fn presence_bitmap(&self) -> u64 {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .fold(0u64, |bits, (level, _)| bits | (1u64 << level))
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take(&mut self, len: usize, what: &str) -> Result<&[u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "truncated {} at offset {} ({} bytes total)",
                    what,
                    self.offset,
                    self.data.len()
                ))
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let bytes = self.take(U64_LEN, what)?;
        let bytes: [u8; U64_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidData(format!("bad {} bytes", what)))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn hash(&mut self, what: &str) -> Result<Hash> {
        let bytes = self.take(HASH_LENGTH, what)?;
        Hash::from_slice(bytes).map_err(|e| Error::InvalidData(format!("{}: {}", what, e)))
    }
}
