// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::event::{LedgerRecord, VoidMarker};
use crate::ledger::codec::{decode_ledger, encode_frame, encode_header, CodecError, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::ledger::entry::{genesis_hash, LedgerEntry, LedgerSigner};
use crate::policy::{PolicyEvaluator, PolicySet};
use crate::tests::fixtures::{account, decision_record};

fn ledger_image(n: usize) -> (Vec<u8>, Vec<LedgerEntry>) {
    let signer = LedgerSigner::from_seed([5; 32]);
    let ev = PolicyEvaluator::trusting(PolicySet::baseline()).unwrap();
    let state = account("agent-a", 500);

    let mut bytes = encode_header().to_vec();
    let mut entries: Vec<LedgerEntry> = Vec::new();
    for i in 0..n {
        let payload = if i == n - 1 && n > 1 {
            LedgerRecord::Void(VoidMarker { voided_sequence: 0, reason: "late".into() })
        } else {
            decision_record(&ev, &format!("m-{}", i), &state)
        };
        let prev = entries.last().map(|e| e.entry_hash).unwrap_or_else(genesis_hash);
        let entry = signer.seal(i as u64, prev, payload).unwrap();
        bytes.extend_from_slice(&encode_frame(&entry).unwrap());
        entries.push(entry);
    }
    (bytes, entries)
}

/// Byte offset of the frame holding `entries[index]`.
fn frame_offset(entries: &[LedgerEntry], index: usize) -> usize {
    HEADER_SIZE + entries[..index].iter().map(|e| encode_frame(e).unwrap().len()).sum::<usize>()
}

#[test]
fn test_decode_reads_back_every_entry() {
    let (bytes, entries) = ledger_image(4);
    let decoded = decode_ledger(&bytes).unwrap();
    assert_eq!(decoded.entries, entries);
    assert_eq!(decoded.valid_len, bytes.len());
    assert!(!decoded.torn_tail);
}

#[test]
fn test_torn_tail_is_reported_not_fatal() {
    let (bytes, entries) = ledger_image(3);
    let full = decode_ledger(&bytes).unwrap();

    // cut into the last frame's payload
    let cut = &bytes[..bytes.len() - 5];
    let decoded = decode_ledger(cut).unwrap();
    assert!(decoded.torn_tail);
    assert_eq!(decoded.entries.len(), 2);
    assert_eq!(decoded.entries[..], entries[..2]);
    assert!(decoded.valid_len < full.valid_len);
    assert!(decoded.valid_len > HEADER_SIZE);

    // cut inside a frame header
    let cut = &bytes[..decoded.valid_len + 3];
    let again = decode_ledger(cut).unwrap();
    assert!(again.torn_tail);
    assert_eq!(again.valid_len, decoded.valid_len);
}

#[test]
fn test_flipped_payload_byte_is_corruption() {
    let (mut bytes, _) = ledger_image(2);
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    assert!(matches!(decode_ledger(&bytes), Err(CodecError::ChecksumMismatch { .. })));
}

#[test]
fn test_oversized_length_in_first_frame_is_corruption() {
    let (mut bytes, _) = ledger_image(5);
    // high byte of frame 0's payload_len
    bytes[HEADER_SIZE + 8 + 3] = 0x7f;
    match decode_ledger(&bytes) {
        Err(CodecError::Corrupt { offset, .. }) => assert_eq!(offset, HEADER_SIZE),
        other => panic!("expected corruption, got {:?}", other),
    }
}

#[test]
fn test_overstated_final_length_is_corruption() {
    let (mut bytes, entries) = ledger_image(3);
    let last = frame_offset(&entries, 2);
    let len_at = last + 8;
    let len = u32::from_le_bytes(bytes[len_at..len_at + 4].try_into().unwrap());
    bytes[len_at..len_at + 4].copy_from_slice(&(len + 16).to_le_bytes());

    // the whole entry is still on disk, so this is not an interrupted append
    assert!(matches!(decode_ledger(&bytes), Err(CodecError::Corrupt { offset, .. }) if offset == last));
}

#[test]
fn test_short_frame_with_wrong_label_is_corruption() {
    let (mut bytes, entries) = ledger_image(3);
    let last = frame_offset(&entries, 2);
    bytes[last..last + 8].copy_from_slice(&7u64.to_le_bytes());
    let cut = &bytes[..bytes.len() - 5];
    assert!(matches!(decode_ledger(cut), Err(CodecError::Corrupt { .. })));

    // unlabelled damage past the header still reads as torn
    let cut = &bytes[..last + FRAME_HEADER_SIZE - 1];
    assert!(decode_ledger(cut).unwrap().torn_tail);
}
