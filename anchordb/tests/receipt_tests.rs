mod common;

use std::sync::Arc;

use anchordb::{
    ApplyStep, BlockRecord, Error, Hash, HashAccumulator, Receipt, ReceiptBuilder, Side,
    accumulator::{MARK_INTERVAL, mark},
    checkpoint::CheckpointStore,
    index::IndexStore,
    keys::{HEIGHT_SNAPSHOTS, MARK_NEXT, MARKS, height_key},
    storage::{Storage, mem_storage::MemStorage},
    validate_receipt,
};
use assert_matches::assert_matches;
use common::{block, chain, index_blocks, leaf};
use proptest::prelude::*;

fn indexed(blocks: Vec<BlockRecord>) -> (Arc<MemStorage>, ReceiptBuilder<MemStorage>) {
    let storage = Arc::new(MemStorage::new());
    let head = index_blocks(Arc::clone(&storage), blocks.clone());
    assert_eq!(head, Some(blocks.len() as u64 - 1));
    let builder = ReceiptBuilder::new(Arc::clone(&storage));
    (storage, builder)
}

fn anchor_root(storage: &Arc<MemStorage>, height: u64) -> Hash {
    IndexStore::new(Arc::clone(storage))
        .committed_snapshot(height)
        .expect("snapshot")
        .root()
        .expect("non-empty")
}

#[test]
fn four_leaf_receipt_has_two_right_steps() {
    let [a, b, c, d] = [b"a", b"b", b"c", b"d"].map(|s| Hash::digest(s));
    let record = BlockRecord {
        height: 0,
        self_hash: a,
        sub_block_hashes: vec![b, c, d],
        ..Default::default()
    };
    let (storage, builder) = indexed(vec![record]);

    let snapshot = IndexStore::new(Arc::clone(&storage))
        .committed_snapshot(0)
        .expect("snapshot");
    let ab = Hash::combine(&a, &b);
    let cd = Hash::combine(&c, &d);
    let root = Hash::combine(&ab, &cd);
    assert_eq!(snapshot.count(), 4);
    assert_eq!(snapshot.pending(), &[None, None, Some(root)]);

    let receipt = builder.get_receipt(a, 0, 0).expect("receipt");
    assert_eq!(
        receipt.steps,
        vec![
            ApplyStep {
                side: Side::Right,
                hash: b
            },
            ApplyStep {
                side: Side::Right,
                hash: cd
            },
        ]
    );
    assert_eq!(receipt.anchor, root);
    assert!(validate_receipt(&receipt));
}

#[test]
fn receipts_validate_across_heights_and_marks() {
    // 60 heights of 54..=104 leaves: well past three mark boundaries.
    let blocks = chain(60, &[50, 75, 100, 64, 88]);
    let last = blocks.len() as u64 - 1;
    let (storage, builder) = indexed(blocks.clone());

    let total = IndexStore::new(Arc::clone(&storage))
        .committed_snapshot(last)
        .expect("snapshot")
        .count();
    assert!(total > 3 * MARK_INTERVAL, "only {} leaves", total);

    let mut checked = 0;
    for record in &blocks {
        let height = record.height;
        for (i, object) in record.leaves().enumerate() {
            if i % 9 != 0 {
                continue;
            }
            for anchor_height in [height, (height + 7).min(last), last] {
                let receipt = builder
                    .get_receipt(object, height, anchor_height)
                    .unwrap_or_else(|e| panic!("receipt {}@{}->{}: {}", i, height, anchor_height, e));
                assert!(receipt.validate(), "{}", receipt);
                assert_eq!(receipt.anchor, anchor_root(&storage, anchor_height));
                checked += 1;
            }
        }
    }
    assert!(checked > 1000);
}

#[test]
fn marks_are_committed_at_each_boundary() {
    let blocks = chain(40, &[60]);
    let (storage, _) = indexed(blocks);
    let index = IndexStore::new(Arc::clone(&storage));
    let total = index.committed_snapshot(39).expect("snapshot").count();
    let checkpoints = CheckpointStore::new(storage.as_ref());
    let mut boundary = MARK_INTERVAL;
    while boundary <= total {
        let mark = checkpoints
            .get_mark(boundary)
            .expect("read mark")
            .expect("mark present");
        assert_eq!(mark.state.count(), boundary - 1);
        boundary += MARK_INTERVAL;
    }
    assert_eq!(checkpoints.get_mark(boundary).expect("read mark"), None);
    assert!(mark::is_boundary(boundary));
}

#[test]
fn rejects_bad_ranges() {
    let (_, builder) = indexed(chain(5, &[3]));
    let object = leaf(2, 0);

    assert_matches!(
        builder.get_receipt(object, 3, 2),
        Err(Error::InvalidRange {
            object_height: 3,
            anchor_height: 2
        })
    );
    let err = builder.get_receipt(object, 2, 5).expect_err("beyond head");
    assert_matches!(err, Error::NotYetAvailable { requested: 5, head: Some(4) });
    assert!(err.is_retryable());
    assert!(!err.is_fatal());
}

#[test]
fn empty_index_is_not_yet_available() {
    let builder = ReceiptBuilder::new(Arc::new(MemStorage::new()));
    assert_matches!(
        builder.get_receipt(leaf(0, 0), 0, 0),
        Err(Error::NotYetAvailable { head: None, .. })
    );
}

#[test]
fn object_missing_from_its_height_is_fatal() {
    let (_, builder) = indexed(chain(5, &[3]));
    let err = builder
        .get_receipt(leaf(3, 0), 2, 4)
        .expect_err("object is at height 3");
    assert_matches!(err, Error::Corrupted(_));
    assert!(err.is_fatal());
}

#[test]
fn tampered_snapshot_is_fatal() {
    let (storage, builder) = indexed(chain(6, &[3]));
    // Height 3 claiming a different leaf log breaks replay continuity.
    let index = IndexStore::new(Arc::clone(&storage));
    let mut forged = index.committed_snapshot(2).expect("snapshot");
    forged.append(Hash::digest(b"forged"));
    storage
        .put(&HEIGHT_SNAPSHOTS, &height_key(3), &forged.marshal())
        .expect("overwrite");

    let err = builder
        .get_receipt(leaf(2, 0), 2, 5)
        .expect_err("replay must notice");
    assert!(err.is_fatal(), "{}", err);
}

/// 40 heights of 64 leaves. A receipt for the first leaf anchored at the
/// last height replays to 1024, jumps through mark 2048 and folds the
/// anchor at 2560 leaves.
fn indexed_past_two_marks() -> (Arc<MemStorage>, ReceiptBuilder<MemStorage>) {
    let (storage, builder) = indexed(chain(40, &[60]));
    builder
        .get_receipt(leaf(0, 0), 0, 39)
        .expect("intact index");
    (storage, builder)
}

fn assert_fatal(result: anchordb::Result<Receipt>) {
    let err = result.expect_err("damaged index must not yield a receipt");
    assert_matches!(err, Error::Corrupted(_));
    assert!(err.is_fatal());
}

#[test]
fn missing_mark_below_anchor_is_fatal() {
    let (storage, builder) = indexed_past_two_marks();
    let key = height_key(2 * MARK_INTERVAL);
    assert!(storage.remove(&MARKS, &key).is_some());
    assert!(storage.remove(&MARK_NEXT, &key).is_some());
    assert_fatal(builder.get_receipt(leaf(0, 0), 0, 39));
}

#[test]
fn mark_without_the_derivative_is_fatal() {
    let (storage, builder) = indexed_past_two_marks();
    let mut other = HashAccumulator::new();
    for i in 0..2 * MARK_INTERVAL - 1 {
        other.append(Hash::digest(&i.to_be_bytes()));
    }
    storage
        .put(&MARKS, &height_key(2 * MARK_INTERVAL), &other.marshal_state())
        .expect("overwrite");
    assert_fatal(builder.get_receipt(leaf(0, 0), 0, 39));
}

#[test]
fn forged_mark_next_is_caught_at_the_anchor() {
    let (storage, builder) = indexed_past_two_marks();
    storage
        .put(
            &MARK_NEXT,
            &height_key(2 * MARK_INTERVAL),
            Hash::digest(b"forged").as_bytes(),
        )
        .expect("overwrite");
    assert_fatal(builder.get_receipt(leaf(0, 0), 0, 39));
    // Receipts that never cross the damaged mark are unaffected.
    assert!(builder.get_receipt(leaf(0, 0), 0, 30).expect("receipt").validate());
}

#[test]
fn receipts_by_first_seen_height() {
    let mut blocks = chain(8, &[2]);
    // Height 6 repeats a leaf first seen at height 1.
    blocks[6].transaction_hashes.push(leaf(1, 1));
    let (_, builder) = indexed(blocks);

    assert_eq!(builder.first_seen_height(&leaf(1, 1)).expect("lookup"), Some(1));
    let receipt = builder
        .get_receipt_for_object(leaf(1, 1), 7)
        .expect("receipt");
    assert_eq!(receipt.object_height, 1);
    assert!(receipt.validate());

    assert_matches!(
        builder.get_receipt_for_object(Hash::digest(b"unknown"), 7),
        Err(Error::ObjectNotFound(_))
    );
    assert_eq!(
        builder.chain_head(&Hash::digest(&4u64.to_be_bytes())).expect("lookup"),
        Some(leaf(4, 100))
    );
    assert_eq!(builder.head().expect("head"), Some(7));
}

#[test]
fn encoded_receipt_still_validates() {
    let (_, builder) = indexed(chain(30, &[40]));
    let receipt = builder.get_receipt(leaf(3, 101), 3, 29).expect("receipt");
    let decoded = Receipt::decode_from_slice(&receipt.encode_to_vec().expect("encode"))
        .expect("decode");
    assert_eq!(decoded, receipt);
    assert!(decoded.validate());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn any_leaf_any_anchor_validates(
        sizes in prop::collection::vec(0u64..300, 1..25),
        pick in any::<prop::sample::Index>(),
        anchor_pick in any::<prop::sample::Index>(),
    ) {
        let blocks: Vec<BlockRecord> = sizes
            .iter()
            .enumerate()
            .map(|(height, entries)| block(height as u64, *entries))
            .collect();
        let last = blocks.len() - 1;
        let (storage, builder) = indexed(blocks.clone());

        let height = pick.index(blocks.len());
        let leaves: Vec<Hash> = blocks[height].leaves().collect();
        let object = leaves[pick.index(leaves.len())];
        let anchor_height = height + anchor_pick.index(last - height + 1);

        let receipt = builder
            .get_receipt(object, height as u64, anchor_height as u64)
            .expect("receipt");
        prop_assert!(receipt.validate());
        prop_assert_eq!(receipt.anchor, anchor_root(&storage, anchor_height as u64));
    }
}
