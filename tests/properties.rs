//! Property tests for the quantified invariants P1-P6 of the FEC
//! specification. P7 and P8 are plain deterministic tests and live
//! alongside the frame/scheme unit tests instead.

use proptest::collection::vec as pvec;
use proptest::prelude::*;

use quiche_fec::frame::Frame;
use quiche_fec::manager::FecManager;
use quiche_fec::Config;
use quiche_fec::FecSchemeId;

fn rs_manager(k: u64, r: u64) -> FecManager {
    let mut config = Config::new(FecSchemeId::ReedSolomonFecScheme);
    config.enable_fec = true;
    config.rs_k = k;
    config.rs_r = r;
    FecManager::new(&config, || {}).unwrap()
}

fn source_symbol_frames(sender: &FecManager, payloads: &[Vec<u8>]) -> Vec<Frame> {
    payloads
        .iter()
        .map(|p| Frame::SourceSymbol {
            ssid: sender.next_ssid(),
            payload: p.clone(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // P2: dropping at most `r` source symbols out of a block of `k`,
    // while every repair symbol arrives, must still surface every
    // source payload exactly once (either directly or via recovery).
    #[test]
    fn p2_no_loss_within_capacity(
        payloads in pvec(pvec(any::<u8>(), 1..32), 4),
        drop_mask in pvec(any::<bool>(), 4),
    ) {
        let k = 4u64;
        let r = 2u64;

        // cap the number of drops at r so the block stays recoverable.
        let mut drop_indices: Vec<usize> = drop_mask
            .iter()
            .enumerate()
            .filter(|(_, &d)| d)
            .map(|(i, _)| i)
            .collect();
        drop_indices.truncate(r as usize);

        let sender = rs_manager(k, r);
        let mut receiver = rs_manager(k, r);

        let frames = source_symbol_frames(&sender, &payloads);
        let mut sender = sender;
        let mut all_repairs = Vec::new();
        for f in &frames {
            let repairs = sender.add_source_symbol_frame(f).unwrap();
            all_repairs.extend(repairs);
        }

        let mut surfaced: Vec<Option<Vec<u8>>> = vec![None; payloads.len()];

        for (i, f) in frames.iter().enumerate() {
            if drop_indices.contains(&i) {
                continue;
            }
            if let Some(p) = receiver.handle_source_symbol_frame(f).unwrap() {
                surfaced[i] = Some(p);
            }
        }

        for r in &all_repairs {
            if let Some(recovered_concat) = receiver.handle_repair_frame(r).unwrap() {
                // distribute the recovered bytes back onto the missing
                // indices, in ascending order, to compare against the
                // originals.
                let mut offset = 0;
                let mut missing: Vec<usize> = drop_indices.clone();
                missing.sort_unstable();
                for idx in missing {
                    let expected_len = payloads[idx].len();
                    let chunk = recovered_concat[offset..offset + expected_len].to_vec();
                    surfaced[idx] = Some(chunk);
                    offset += expected_len;
                }
            }
        }

        for (i, payload) in payloads.iter().enumerate() {
            prop_assert_eq!(surfaced[i].as_ref(), Some(payload));
        }
    }

    // P3: replaying the same frame any number of times produces the
    // same observable stream of surfaced payloads as presenting it once.
    #[test]
    fn p3_idempotence(
        payloads in pvec(pvec(any::<u8>(), 1..16), 3),
        replay_count in 1usize..5,
    ) {
        let k = 3u64;
        let r = 1u64;

        let sender = rs_manager(k, r);
        let frames = source_symbol_frames(&sender, &payloads);
        let mut sender = sender;
        for f in &frames {
            sender.add_source_symbol_frame(f).unwrap();
        }

        let mut receiver = rs_manager(k, r);
        let mut surfaced = Vec::new();
        for f in &frames {
            for _ in 0..replay_count {
                if let Some(p) = receiver.handle_source_symbol_frame(f).unwrap() {
                    surfaced.push(p);
                }
            }
        }

        prop_assert_eq!(surfaced, payloads);
    }

    // P5: nextSSID returns a strictly increasing sequence starting at 0.
    #[test]
    fn p5_monotonic_ssid(n in 1usize..200) {
        let mgr = rs_manager(4, 2);
        let ids: Vec<u64> = (0..n).map(|_| mgr.next_ssid()).collect();
        let expected: Vec<u64> = (0..n as u64).collect();
        prop_assert_eq!(ids, expected);
    }

    // P6: after any sequence of update() calls, the retained epoch is the
    // maximum successfully-accepted epoch, applied in increasing order.
    #[test]
    fn p6_window_monotonicity(epochs in pvec(1u16..1000, 1..20)) {
        let mut mgr = rs_manager(4, 2);
        let mut sorted_unique: Vec<u16> = epochs.clone();
        sorted_unique.sort_unstable();
        sorted_unique.dedup();

        let mut last_accepted = None;
        for (i, &epoch) in sorted_unique.iter().enumerate() {
            let size = (epoch as u32) * 4;
            mgr.update_window_size(size, epoch).unwrap();
            last_accepted = Some((size, epoch));
            let _ = i;
        }

        if let Some((size, epoch)) = last_accepted {
            prop_assert_eq!(mgr.window_size(), size);
            prop_assert_eq!(mgr.window_epoch(), epoch);
        }
    }
}

// P4: recovered payloads returned from handle_repair_frame appear in
// ascending SSID order. Deterministic (not a proptest) because it only
// needs one representative multi-loss case to pin the ordering contract.
#[test]
fn p4_order_preservation_under_recovery() {
    let k = 4u64;
    let r = 2u64;

    let sender = rs_manager(k, r);
    let payloads = vec![
        vec![1u8, 1, 1],
        vec![2u8, 2],
        vec![3u8, 3, 3, 3],
        vec![4u8],
    ];
    let frames = source_symbol_frames(&sender, &payloads);
    let mut sender = sender;
    let mut repairs = Vec::new();
    for f in &frames {
        repairs.extend(sender.add_source_symbol_frame(f).unwrap());
    }

    let mut receiver = rs_manager(k, r);
    // drop SSID 0 and SSID 2 (the first and third source symbols).
    receiver.handle_source_symbol_frame(&frames[1]).unwrap();
    receiver.handle_source_symbol_frame(&frames[3]).unwrap();

    let mut recovered = None;
    for rep in &repairs {
        if let Some(p) = receiver.handle_repair_frame(rep).unwrap() {
            recovered = Some(p);
        }
    }

    let recovered = recovered.expect("block should have recovered");
    let mut expected = Vec::new();
    expected.extend_from_slice(&payloads[0]);
    expected.extend_from_slice(&payloads[2]);
    assert_eq!(recovered, expected);
}
