//! Pedestal loading and event reduction through the public API

use approx::assert_relative_eq;
use hcal_core::{ChannelKey, ChargeBin, ChargeThresholds, Error};
use hcal_digi::{Digi, DigiReducer, EventRecord, EventSource, JsonLinesEvents, PedestalTable};
use std::io::Write;

fn pulse(scale: f64, pedestal: f64) -> [f64; 8] {
    let shape = [0.0, 0.1, 0.6, 0.25, 0.05, 0.0, 0.0, 0.0];
    let mut out = [0.0; 8];
    for (o, s) in out.iter_mut().zip(shape) {
        *o = pedestal + scale * s;
    }
    out
}

fn event_with(charges: &[(ChannelKey, f64)]) -> EventRecord {
    let mut event = EventRecord::default();
    for &(channel, scale) in charges {
        let digi = Digi::new(
            channel,
            &pulse(scale, 4.0),
            &[1, 10, 60, 25, 5, 1, 1, 1],
            &[0, 1, 2, 3, 0, 1, 2, 3],
            80.0,
            81.0,
            1,
        )
        .unwrap();
        event.push_digi(&digi);
    }
    event
}

fn write_table(dir: &std::path::Path, run: u32, rows: &str) {
    let path = PedestalTable::path_for_run(dir, run);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(rows.as_bytes()).unwrap();
}

#[test]
fn load_by_run_number() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), 325_170, "#U fC\n20 1 1 HE 4 4 4 4 0xa\n-20 1 1 HE 4 4 4 4 0xb\n");

    let table = PedestalTable::load(dir.path(), 325_170).unwrap();
    assert_eq!(table.len(), 2);
    assert!(matches!(
        PedestalTable::load(dir.path(), 1),
        Err(Error::Io(_))
    ));
}

#[test]
fn reduce_event_classifies_each_digi() {
    let table = PedestalTable::parse_str("20 1 1 HE 4 4 4 4 0xa\n-20 1 1 HE 4 4 4 4 0xb\n").unwrap();
    let reducer = DigiReducer::new(&table, ChargeThresholds::default());
    let a = ChannelKey::new(20, 1, 1).unwrap();
    let b = ChannelKey::new(-20, 1, 1).unwrap();

    let event = event_with(&[(a, 6000.0), (b, 9000.0), (a, 20000.0), (b, 1000.0)]);
    let reduced = reducer.reduce_event(&event).unwrap();

    let bins: Vec<ChargeBin> = reduced.digis.iter().map(|d| d.bin).collect();
    assert_eq!(bins, vec![ChargeBin::Low, ChargeBin::Mid, ChargeBin::High]);
    assert_eq!(reduced.diagnostics.digis_seen, 4);
    assert_eq!(reduced.diagnostics.below_threshold, 1);
    assert_eq!(reduced.diagnostics.missing_pedestals, 0);
    assert_relative_eq!(reduced.digis[0].total_charge, 6000.0, epsilon = 1e-9);
    assert_relative_eq!(reduced.digis[0].charge_fraction_ts2, 60.0, epsilon = 1e-9);
    assert_relative_eq!(reduced.digis[0].charge_fraction_ts4, 5.0, epsilon = 1e-9);
}

#[test]
fn batch_reduction_preserves_order() {
    let table = PedestalTable::parse_str("20 1 1 HE 4 4 4 4 0xa\n").unwrap();
    let reducer = DigiReducer::new(&table, ChargeThresholds::default());
    let a = ChannelKey::new(20, 1, 1).unwrap();
    let events: Vec<EventRecord> = (0..64)
        .map(|i| event_with(&[(a, 5100.0 + 250.0 * i as f64)]))
        .collect();

    let reduced = reducer.reduce_events(&events).unwrap();
    assert_eq!(reduced.len(), 64);
    for (i, event) in reduced.iter().enumerate() {
        assert_relative_eq!(
            event.digis[0].total_charge,
            5100.0 + 250.0 * i as f64,
            epsilon = 1e-6
        );
    }
}

#[test]
fn malformed_event_aborts_batch() {
    let table = PedestalTable::new();
    let reducer = DigiReducer::new(&table, ChargeThresholds::default());
    let mut bad = event_with(&[(ChannelKey::new(20, 1, 1).unwrap(), 8000.0)]);
    bad.adc[0].push(0);
    let events = vec![event_with(&[]), bad];
    let err = reducer.reduce_events(&events).unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn json_lines_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let events = vec![
        event_with(&[(ChannelKey::new(20, 1, 1).unwrap(), 8000.0)]),
        event_with(&[(ChannelKey::new(-29, 72, 7).unwrap(), 12000.0)]),
    ];
    let file = std::fs::File::create(&path).unwrap();
    hcal_digi::write_json_lines(file, &events).unwrap();

    let mut source = JsonLinesEvents::open(&path).unwrap();
    let first = source.next_event().unwrap().unwrap();
    assert_eq!(first, events[0]);
    let second = source.next_event().unwrap().unwrap();
    assert_eq!(second.digis().unwrap()[0].channel.depth(), 7);
    assert!(source.next_event().unwrap().is_none());
}

#[test]
fn window_sums_on_bin_edges() {
    let table = PedestalTable::parse_str("20 1 1 HE 4 4 4 4 0xa\n").unwrap();
    let reducer = DigiReducer::new(&table, ChargeThresholds::default());
    let channel = ChannelKey::new(20, 1, 1).unwrap();

    // Window slices 1..=4 sum to the edge exactly after subtracting 4 fC
    let cases = [
        ([1100.0, 6600.0, 2750.0, 550.0], ChargeBin::Mid),
        ([1100.0, 6601.0, 2750.0, 550.0], ChargeBin::High),
        ([700.0, 4200.0, 1750.0, 350.0], ChargeBin::Mid),
        ([700.0, 4199.0, 1750.0, 350.0], ChargeBin::Low),
    ];
    for (window, expected) in cases {
        let mut charges = [4.0; 8];
        for (ts, q) in window.iter().enumerate() {
            charges[ts + 1] = q + 4.0;
        }
        let digi = Digi::new(
            channel,
            &charges,
            &[1, 10, 60, 25, 5, 1, 1, 1],
            &[0, 1, 2, 3, 0, 1, 2, 3],
            80.0,
            81.0,
            1,
        )
        .unwrap();
        let reduced = reducer.reduce(&digi).digi.unwrap();
        assert_eq!(reduced.bin, expected, "window total {}", reduced.total_charge);
    }
}
