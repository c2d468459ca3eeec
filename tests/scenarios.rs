//! End-to-end scenarios S1-S6 from the FEC specification, exercised
//! against the public `FecManager` / `Frame` API rather than any
//! internal module.

use quiche_fec::frame::AckRange;
use quiche_fec::frame::Frame;
use quiche_fec::manager::FecManager;
use quiche_fec::Config;
use quiche_fec::FecSchemeId;

fn xor_manager() -> FecManager {
    let mut config = Config::new(FecSchemeId::XorFecScheme);
    config.enable_fec = true;
    FecManager::new(&config, || {}).unwrap()
}

fn rs_manager(k: u64, r: u64) -> FecManager {
    let mut config = Config::new(FecSchemeId::ReedSolomonFecScheme);
    config.enable_fec = true;
    config.rs_k = k;
    config.rs_r = r;
    FecManager::new(&config, || {}).unwrap()
}

#[test]
fn s1_xor_no_loss() {
    let mut sender = xor_manager();
    let mut receiver = xor_manager();

    let f0 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: vec![0x01, 0x02, 0x03],
    };
    let f1 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: vec![0x04, 0x05, 0x06],
    };

    assert!(sender.add_source_symbol_frame(&f0).unwrap().is_empty());
    let repairs = sender.add_source_symbol_frame(&f1).unwrap();
    assert_eq!(repairs.len(), 1);

    // the sender's own repair queue should carry exactly that frame.
    assert_eq!(sender.repair_queue().len(), 1);
    assert_eq!(sender.repair_queue().peek(), Some(repairs[0].clone()));

    match &repairs[0] {
        Frame::Repair {
            block_id,
            parity_id,
            payload,
        } => {
            assert_eq!(*block_id, 0);
            assert_eq!(*parity_id, 0);
            assert_eq!(payload, &vec![0x05, 0x07, 0x05, 0x00, 0x00]);
        },
        _ => panic!("expected a repair frame"),
    }

    assert_eq!(
        receiver.handle_source_symbol_frame(&f0).unwrap(),
        Some(vec![0x01, 0x02, 0x03])
    );
    assert_eq!(
        receiver.handle_source_symbol_frame(&f1).unwrap(),
        Some(vec![0x04, 0x05, 0x06])
    );

    // no recovery needed: a replayed repair frame surfaces nothing.
    assert_eq!(receiver.handle_repair_frame(&repairs[0]).unwrap(), None);
}

#[test]
fn s2_xor_one_loss_recovers() {
    let mut sender = xor_manager();
    let mut receiver = xor_manager();

    let f0 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: vec![0x01, 0x02, 0x03],
    };
    let f1 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: vec![0x04, 0x05, 0x06],
    };

    sender.add_source_symbol_frame(&f0).unwrap();
    let repairs = sender.add_source_symbol_frame(&f1).unwrap();

    // P1 is lost.
    receiver.handle_source_symbol_frame(&f0).unwrap();
    let recovered = receiver.handle_repair_frame(&repairs[0]).unwrap();
    assert_eq!(recovered, Some(vec![0x04, 0x05, 0x06]));
}

#[test]
fn s3_xor_differing_sizes_recovers_with_correct_length() {
    let mut sender = xor_manager();
    let mut receiver = xor_manager();

    let p0 = vec![0x01u8; 16];
    let p1 = vec![0x02u8; 10];

    let f0 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: p0.clone(),
    };
    let f1 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: p1.clone(),
    };

    sender.add_source_symbol_frame(&f0).unwrap();
    let repairs = sender.add_source_symbol_frame(&f1).unwrap();

    match &repairs[0] {
        Frame::Repair { payload, .. } => assert_eq!(payload.len(), 16 + 2),
        _ => panic!("expected a repair frame"),
    }

    // P0 is lost.
    receiver.handle_source_symbol_frame(&f1).unwrap();
    let recovered = receiver.handle_repair_frame(&repairs[0]).unwrap().unwrap();
    assert_eq!(recovered.len(), 16);
    assert_eq!(recovered, p0);
}

#[test]
fn s4_reed_solomon_two_losses() {
    let mut sender = rs_manager(3, 2);
    let mut receiver = rs_manager(3, 2);

    let f0 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: b"AAAA".to_vec(),
    };
    let f1 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: b"BBBBBB".to_vec(),
    };
    let f2 = Frame::SourceSymbol {
        ssid: sender.next_ssid(),
        payload: b"C".to_vec(),
    };

    sender.add_source_symbol_frame(&f0).unwrap();
    sender.add_source_symbol_frame(&f1).unwrap();
    let repairs = sender.add_source_symbol_frame(&f2).unwrap();
    assert_eq!(repairs.len(), 2);

    // P0 and P2 are lost.
    assert_eq!(receiver.handle_source_symbol_frame(&f1).unwrap(), Some(b"BBBBBB".to_vec()));

    let mut recovered = None;
    for r in &repairs {
        if let Some(payload) = receiver.handle_repair_frame(r).unwrap() {
            recovered = Some(payload);
        }
    }

    assert_eq!(recovered, Some(b"AAAAC".to_vec()));
}

#[test]
fn s5_framing_round_trip() {
    let frame = Frame::Repair {
        block_id: 7,
        parity_id: 3,
        payload: vec![0xde, 0xad, 0xbe, 0xef],
    };

    let mut buf = vec![0; 64];
    let written = {
        let mut w = octets::OctetsMut::with_slice(&mut buf);
        frame.to_bytes(&mut w).unwrap()
    };
    assert_eq!(written, frame.wire_len());

    let mut r = octets::Octets::with_slice(&buf[..written]);
    let frame_type = r.get_varint().unwrap();
    let parsed = Frame::from_bytes(frame_type, &mut r).unwrap();
    assert_eq!(parsed, frame);
}

#[test]
fn s5b_symbol_ack_round_trip_with_ranges() {
    let frame = Frame::SymbolAck {
        ack_ranges: vec![
            AckRange {
                smallest: 40,
                largest: 50,
            },
            AckRange {
                smallest: 10,
                largest: 20,
            },
        ],
    };

    let mut buf = vec![0; 64];
    let written = {
        let mut w = octets::OctetsMut::with_slice(&mut buf);
        frame.to_bytes(&mut w).unwrap()
    };
    assert_eq!(written, frame.wire_len());

    let mut r = octets::Octets::with_slice(&buf[..written]);
    let frame_type = r.get_varint().unwrap();
    let parsed = Frame::from_bytes(frame_type, &mut r).unwrap();
    assert_eq!(parsed, frame);
}

#[test]
fn s6_window_update_sequence() {
    let mut mgr = xor_manager();

    mgr.set_initial_coding_window(64);
    assert_eq!(mgr.window_size(), 64);

    mgr.update_window_size(128, 1).unwrap();
    assert_eq!((mgr.window_size(), mgr.window_epoch()), (128, 1));

    let err = mgr.update_window_size(256, 1).unwrap_err();
    assert_eq!(err, quiche_fec::Error::InvalidFecWindow);
    assert_eq!((mgr.window_size(), mgr.window_epoch()), (128, 1));

    mgr.update_window_size(256, 2).unwrap();
    assert_eq!((mgr.window_size(), mgr.window_epoch()), (256, 2));
}
