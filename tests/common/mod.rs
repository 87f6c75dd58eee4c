//! Shared utilities for integration tests

#![allow(dead_code)]

use hcal_timing::hcal_core::ChannelKey;
use hcal_timing::hcal_digi::{Digi, EventRecord, PedestalEntry, PedestalTable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Per-capacitor baselines used for every synthetic channel
pub const BASELINES: [f64; 4] = [3.5, 4.0, 4.5, 5.0];

/// Pulse shape over the slices of the peak window (slices 1..=4)
pub const PULSE_SHAPE: [f64; 4] = [0.08, 0.62, 0.25, 0.05];

/// Synthetic channels and their true mean TDC time (ns)
pub fn channels() -> Vec<(ChannelKey, f64)> {
    vec![
        (ChannelKey::new(-27, 3, 4).unwrap(), 80.0),
        (ChannelKey::new(-20, 10, 1).unwrap(), 78.0),
        (ChannelKey::new(18, 30, 2).unwrap(), 81.0),
        (ChannelKey::new(25, 55, 3).unwrap(), 84.0),
    ]
}

pub fn pedestals() -> PedestalTable {
    let mut table = PedestalTable::new();
    for (index, (channel, _)) in channels().into_iter().enumerate() {
        table.insert(
            channel,
            PedestalEntry {
                detector: "HE".to_string(),
                baselines: BASELINES,
                widths: None,
                channel_id: format!("0x{:x}", 0x4000 + index),
            },
        );
    }
    table
}

/// One digi whose peak-window charge is exactly `total` above baseline
pub fn make_digi(
    channel: ChannelKey,
    total: f64,
    first_capid: u8,
    tdc_time: f64,
    n_tdc: u32,
) -> Digi {
    let capids: Vec<u8> = (0..8).map(|ts| (first_capid + ts) % 4).collect();
    let charges: Vec<f64> = (0..8)
        .map(|ts| {
            let signal = match ts {
                1..=4 => total * PULSE_SHAPE[ts - 1],
                _ => 0.0,
            };
            signal + BASELINES[capids[ts] as usize]
        })
        .collect();
    let adc: Vec<i32> = charges.iter().map(|q| (q / 50.0) as i32).collect();
    Digi::new(channel, &charges, &adc, &capids, tdc_time - 0.5, tdc_time, n_tdc).unwrap()
}

/// A deterministic event stream over [`channels`]
pub fn synthetic_events(seed: u64, n_events: usize) -> Vec<EventRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let timing: Vec<(ChannelKey, Normal<f64>)> = channels()
        .into_iter()
        .map(|(channel, mean)| (channel, Normal::new(mean, 1.0).unwrap()))
        .collect();

    (0..n_events)
        .map(|index| {
            let mut event = EventRecord {
                run: 362_000,
                lumi_section: 1 + index as u32 / 1000,
                event: index as u64,
                bunch_crossing: rng.gen_range(1..3564),
                ..Default::default()
            };
            for (channel, time) in &timing {
                if rng.gen::<f64>() > 0.8 {
                    continue;
                }
                let total = rng.gen_range(4000.0..13000.0);
                let first_capid = rng.gen_range(0..4u8);
                let n_tdc = if rng.gen::<f64>() < 0.9 { 1 } else { 2 };
                let tdc = time.sample(&mut rng);
                event.push_digi(&make_digi(*channel, total, first_capid, tdc, n_tdc));
            }
            event
        })
        .collect()
}

/// Route test logs through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
