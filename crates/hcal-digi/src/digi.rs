//! One channel's readout for one event

use hcal_core::{ChannelKey, Error, Result, SAMPLES_PER_DIGI};
use std::ops::RangeInclusive;

/// Highest capacitor id
pub const MAX_CAPID: u8 = 3;

/// A validated digi: exactly eight time slices of charge, ADC and capid
#[derive(Debug, Clone, PartialEq)]
pub struct Digi {
    pub channel: ChannelKey,
    pub charge_fc: [f64; SAMPLES_PER_DIGI],
    pub adc: [i32; SAMPLES_PER_DIGI],
    pub capid: [u8; SAMPLES_PER_DIGI],
    /// Charge-weighted time (ns), precomputed upstream
    pub charge_time: f64,
    /// TDC time (ns), precomputed upstream
    pub tdc_time: f64,
    /// Number of TDC fires in the digi
    pub n_tdc: u32,
}

impl Digi {
    /// Build a digi from per-slice sequences
    ///
    /// Fails with a data-shape error unless every sequence has exactly eight
    /// slices, and with an invalid-input error for a capid above 3.
    pub fn new(
        channel: ChannelKey,
        charge_fc: &[f64],
        adc: &[i32],
        capid: &[u8],
        charge_time: f64,
        tdc_time: f64,
        n_tdc: u32,
    ) -> Result<Self> {
        let charge_fc = fixed_slices(charge_fc, "digi charge samples")?;
        let adc = fixed_slices(adc, "digi ADC samples")?;
        let capid = fixed_slices(capid, "digi capid samples")?;
        if let Some(bad) = capid.iter().find(|&&c| c > MAX_CAPID) {
            return Err(Error::InvalidInput(format!(
                "capid {bad} out of range 0..={MAX_CAPID} for {channel}"
            )));
        }
        Ok(Self {
            channel,
            charge_fc,
            adc,
            capid,
            charge_time,
            tdc_time,
            n_tdc,
        })
    }
}

fn fixed_slices<T: Copy>(samples: &[T], context: &str) -> Result<[T; SAMPLES_PER_DIGI]> {
    samples
        .try_into()
        .map_err(|_| Error::data_shape(context, SAMPLES_PER_DIGI, samples.len()))
}

/// Integration window around the pulse peak
///
/// The peak is the first occurrence of the maximum sample. The window spans
/// one slice before the peak to two slices after it, clipped to the
/// sequence. Returns `None` for an empty sequence.
pub fn peak_window<T: PartialOrd>(samples: &[T]) -> Option<RangeInclusive<usize>> {
    let last = samples.len().checked_sub(1)?;
    let mut peak = 0;
    for (i, sample) in samples.iter().enumerate().skip(1) {
        if *sample > samples[peak] {
            peak = i;
        }
    }
    Some(peak.saturating_sub(1)..=(peak + 2).min(last))
}

/// Sum of the samples inside the peak window
pub fn windowed_sum<T>(samples: &[T]) -> f64
where
    T: PartialOrd + Copy + Into<f64>,
{
    peak_window(samples)
        .map(|window| samples[window].iter().map(|&s| s.into()).sum())
        .unwrap_or(0.0)
}
