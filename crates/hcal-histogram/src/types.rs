//! Core types for distribution representation

use hcal_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed, equal-width binning of `[low, high)`
///
/// Bin 0 is the underflow bin, bins `1..=bins` are in range and bin
/// `bins + 1` is the overflow bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    bins: usize,
    low: f64,
    high: f64,
}

impl Axis {
    /// Create a new axis
    pub fn new(bins: usize, low: f64, high: f64) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidParameter("axis needs at least one bin".to_string()));
        }
        if !(low.is_finite() && high.is_finite()) {
            return Err(Error::non_finite("axis range"));
        }
        if low >= high {
            return Err(Error::InvalidParameter(format!(
                "axis range must satisfy low < high, got [{low}, {high})"
            )));
        }
        Ok(Self { bins, low, high })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Width of every in-range bin
    pub fn width(&self) -> f64 {
        (self.high - self.low) / self.bins as f64
    }

    /// Number of storage cells including underflow and overflow
    pub fn cells(&self) -> usize {
        self.bins + 2
    }

    /// Find the bin holding `x`
    ///
    /// NaN lands in the overflow bin.
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.low {
            0
        } else if !(x < self.high) {
            self.bins + 1
        } else {
            let bin = 1 + ((x - self.low) / self.width()) as usize;
            // Rounding at the upper edge
            bin.min(self.bins)
        }
    }

    /// Lower edge of in-range bin `bin` (1-based)
    pub fn low_edge(&self, bin: usize) -> f64 {
        self.low + (bin as f64 - 1.0) * self.width()
    }

    /// Center of in-range bin `bin` (1-based)
    pub fn center(&self, bin: usize) -> f64 {
        self.low_edge(bin) + 0.5 * self.width()
    }

    pub fn is_in_range(&self, bin: usize) -> bool {
        bin >= 1 && bin <= self.bins
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bins in [{}, {})", self.bins, self.low, self.high)
    }
}

/// Running moments of all fills that count towards statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub sumw: f64,
    pub sumw2: f64,
    pub sumwx: f64,
    pub sumwx2: f64,
    pub sumwy: f64,
    pub sumwy2: f64,
}

impl Moments {
    pub(crate) fn add(&mut self, other: &Moments) {
        self.sumw += other.sumw;
        self.sumw2 += other.sumw2;
        self.sumwx += other.sumwx;
        self.sumwx2 += other.sumwx2;
        self.sumwy += other.sumwy;
        self.sumwy2 += other.sumwy2;
    }
}

/// A weighted 1-D or 2-D histogram with per-bin variance tracking
///
/// Storage is allocated on the first fill or merge; until then the
/// distribution only carries its layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    x: Axis,
    y: Option<Axis>,
    stat_overflows: bool,
    entries: u64,
    moments: Moments,
    #[serde(default)]
    sumw: Vec<f64>,
    #[serde(default)]
    sumw2: Vec<f64>,
}

impl Distribution {
    /// Book an empty 1-D distribution
    pub fn new_1d(x: Axis, stat_overflows: bool) -> Self {
        Self {
            x,
            y: None,
            stat_overflows,
            entries: 0,
            moments: Moments::default(),
            sumw: Vec::new(),
            sumw2: Vec::new(),
        }
    }

    /// Book an empty 2-D distribution
    pub fn new_2d(x: Axis, y: Axis, stat_overflows: bool) -> Self {
        Self {
            y: Some(y),
            ..Self::new_1d(x, stat_overflows)
        }
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    pub fn y_axis(&self) -> Option<&Axis> {
        self.y.as_ref()
    }

    pub fn is_2d(&self) -> bool {
        self.y.is_some()
    }

    /// Whether under/overflow fills count towards the moments
    pub fn stat_overflows(&self) -> bool {
        self.stat_overflows
    }

    /// Number of fill calls, independent of weight and range
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn moments(&self) -> &Moments {
        &self.moments
    }

    /// Whether bin storage has been allocated
    pub fn is_allocated(&self) -> bool {
        !self.sumw.is_empty()
    }

    /// Total number of storage cells including flow bins
    pub fn cells(&self) -> usize {
        self.x.cells() * self.y.map_or(1, |y| y.cells())
    }

    /// Global cell index from per-axis bins
    pub fn cell(&self, bin_x: usize, bin_y: usize) -> usize {
        bin_x + self.x.cells() * bin_y
    }

    fn allocate(&mut self) {
        if self.sumw.is_empty() {
            let cells = self.cells();
            self.sumw = vec![0.0; cells];
            self.sumw2 = vec![0.0; cells];
        }
    }

    /// Fill a 1-D distribution with `x` at weight `w`
    pub fn fill(&mut self, x: f64, w: f64) -> Result<()> {
        if self.is_2d() {
            return Err(Error::InvalidParameter(
                "1-D fill on a 2-D distribution".to_string(),
            ));
        }
        let bin = self.x.find_bin(x);
        self.allocate();
        self.entries += 1;
        self.sumw[bin] += w;
        self.sumw2[bin] += w * w;
        if self.stat_overflows || self.x.is_in_range(bin) {
            self.accumulate(x, 0.0, w);
        }
        Ok(())
    }

    /// Fill a 2-D distribution with `(x, y)` at weight `w`
    pub fn fill_2d(&mut self, x: f64, y: f64, w: f64) -> Result<()> {
        let y_axis = self.y.ok_or_else(|| {
            Error::InvalidParameter("2-D fill on a 1-D distribution".to_string())
        })?;
        let bin_x = self.x.find_bin(x);
        let bin_y = y_axis.find_bin(y);
        let cell = self.cell(bin_x, bin_y);
        self.allocate();
        self.entries += 1;
        self.sumw[cell] += w;
        self.sumw2[cell] += w * w;
        if self.stat_overflows || (self.x.is_in_range(bin_x) && y_axis.is_in_range(bin_y)) {
            self.accumulate(x, y, w);
        }
        Ok(())
    }

    fn accumulate(&mut self, x: f64, y: f64, w: f64) {
        let m = &mut self.moments;
        m.sumw += w;
        m.sumw2 += w * w;
        m.sumwx += w * x;
        m.sumwx2 += w * x * x;
        m.sumwy += w * y;
        m.sumwy2 += w * y * y;
    }

    /// Sum of weights in a storage cell
    pub fn cell_content(&self, cell: usize) -> f64 {
        self.sumw.get(cell).copied().unwrap_or(0.0)
    }

    /// Sum of squared weights in a storage cell
    pub fn cell_sumw2(&self, cell: usize) -> f64 {
        self.sumw2.get(cell).copied().unwrap_or(0.0)
    }

    /// Content of a 1-D bin (0 = underflow)
    pub fn bin_content(&self, bin: usize) -> f64 {
        self.cell_content(bin)
    }

    /// Statistical error of a 1-D bin
    pub fn bin_error(&self, bin: usize) -> f64 {
        self.cell_sumw2(bin).sqrt()
    }

    /// Content of a 2-D bin
    pub fn bin_content_2d(&self, bin_x: usize, bin_y: usize) -> f64 {
        self.cell_content(self.cell(bin_x, bin_y))
    }

    /// Raw per-cell sums of weights; empty until allocated
    pub fn contents(&self) -> &[f64] {
        &self.sumw
    }

    /// Raw per-cell sums of squared weights; empty until allocated
    pub fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }

    /// Clear all contents, keeping the layout and releasing storage
    pub fn reset(&mut self) {
        self.entries = 0;
        self.moments = Moments::default();
        self.sumw = Vec::new();
        self.sumw2 = Vec::new();
    }

    /// Check the storage is consistent with the layout
    ///
    /// Used after deserialising a distribution from an external document.
    pub fn validate(&self) -> Result<()> {
        if self.sumw.len() != self.sumw2.len() {
            return Err(Error::data_shape(
                "distribution sumw2 storage",
                self.sumw.len(),
                self.sumw2.len(),
            ));
        }
        if self.is_allocated() && self.sumw.len() != self.cells() {
            return Err(Error::data_shape(
                "distribution storage",
                self.cells(),
                self.sumw.len(),
            ));
        }
        Ok(())
    }

    pub(crate) fn merge_storage(&mut self, other: &Distribution) {
        if other.is_allocated() {
            self.allocate();
            for (a, b) in self.sumw.iter_mut().zip(&other.sumw) {
                *a += b;
            }
            for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
                *a += b;
            }
        }
        self.entries += other.entries;
        self.moments.add(&other.moments);
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.y {
            Some(y) => write!(f, "Distribution2D(x: {}, y: {}, entries={})", self.x, y, self.entries),
            None => write!(f, "Distribution1D({}, entries={})", self.x, self.entries),
        }
    }
}
