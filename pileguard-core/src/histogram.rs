//! Fixed-Range Histograms
//!
//! ## Overview
//!
//! Spectra and PSD plots are plain counting histograms with edges fixed at
//! construction. `Axis` owns the binning, `Histogram1D` counts one quantity
//! (energy, or raw integral inside a calibration window) and `DensityGrid`
//! counts (energy, ratio) pairs.
//!
//! ## Range Semantics
//!
//! Bins are half-open, `[low, low + width)`. A value outside
//! `[min, max)` is not stored anywhere: `fill` returns `false` and the
//! histogram's `out_of_range` counter goes up. There are no underflow or
//! overflow bins, so `integral()` is exactly the in-range mass.
//!
//! ## Variance Tracking
//!
//! Freshly filled histograms hold unit-weight counts, whose variance equals
//! the count. Once a histogram is scaled, the per-bin sum of squared
//! weights is tracked separately (`enable_variance`) and scaled by the
//! square of the factor, so `error()` stays a correct 1σ estimate.
//!
//! ## Memory Layout
//!
//! `DensityGrid` stores counts x-major:
//! ```text
//! index = x_bin * y_bins + y_bin
//! column(x_bin) = counts[x_bin * y_bins .. (x_bin + 1) * y_bins]
//! ```
//! so each energy column is one contiguous slice, which is what the
//! boundary fitter reads.

use alloc::vec;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::errors::{PipelineError, PipelineResult};

/// Uniform binning over `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Axis {
    bins: usize,
    min: f64,
    max: f64,
}

impl Axis {
    /// Create an axis with `bins` equal bins
    pub fn new(bins: usize, min: f64, max: f64) -> PipelineResult<Self> {
        if bins == 0 {
            return Err(PipelineError::InvalidAxis {
                reason: "axis needs at least one bin",
            });
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(PipelineError::InvalidAxis {
                reason: "axis edges must be finite",
            });
        }
        if min >= max {
            return Err(PipelineError::InvalidAxis {
                reason: "axis minimum must be below maximum",
            });
        }
        Ok(Self { bins, min, max })
    }

    /// Number of bins
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Lower edge of the first bin
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper edge of the last bin
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Bin width
    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Bin containing `value`, `None` outside `[min, max)`
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }
        let index = ((value - self.min) / self.width()) as usize;
        // Rounding can push values just below max into a phantom bin
        Some(index.min(self.bins - 1))
    }

    /// Center of bin `index`
    pub fn bin_center(&self, index: usize) -> f64 {
        self.min + (index as f64 + 0.5) * self.width()
    }

    /// Lower edge of bin `index`
    pub fn bin_low_edge(&self, index: usize) -> f64 {
        self.min + index as f64 * self.width()
    }

    /// Inclusive bin range covering `[lower, upper]`, clipped to the axis
    ///
    /// `None` when the interval misses the axis entirely.
    pub fn bin_range(&self, lower: f64, upper: f64) -> Option<(usize, usize)> {
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        if upper < self.min || lower >= self.max {
            return None;
        }
        let first = self.find_bin(lower.max(self.min)).unwrap_or(0);
        let last = self.find_bin(upper).unwrap_or(self.bins - 1);
        Some((first, last))
    }
}

/// One-dimensional counting histogram
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Histogram1D {
    axis: Axis,
    counts: Vec<f64>,
    sum_w2: Option<Vec<f64>>,
    entries: u64,
    out_of_range: u64,
}

impl Histogram1D {
    /// Empty histogram over `axis`
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            counts: vec![0.0; axis.bins()],
            sum_w2: None,
            entries: 0,
            out_of_range: 0,
        }
    }

    /// Binning
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Add one count at `value`; `false` if out of range
    pub fn fill(&mut self, value: f64) -> bool {
        self.fill_weighted(value, 1.0)
    }

    /// Add `weight` at `value`; `false` if out of range
    pub fn fill_weighted(&mut self, value: f64, weight: f64) -> bool {
        match self.axis.find_bin(value) {
            Some(bin) => {
                self.counts[bin] += weight;
                if let Some(sum_w2) = self.sum_w2.as_mut() {
                    sum_w2[bin] += weight * weight;
                }
                self.entries += 1;
                true
            }
            None => {
                self.out_of_range += 1;
                false
            }
        }
    }

    /// Content of `bin`
    pub fn content(&self, bin: usize) -> f64 {
        self.counts.get(bin).copied().unwrap_or(0.0)
    }

    /// Variance of `bin`
    pub fn variance(&self, bin: usize) -> f64 {
        match &self.sum_w2 {
            Some(sum_w2) => sum_w2.get(bin).copied().unwrap_or(0.0),
            None => self.content(bin),
        }
    }

    /// 1σ uncertainty of `bin`
    pub fn error(&self, bin: usize) -> f64 {
        libm::sqrt(self.variance(bin))
    }

    /// All bin contents
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Successful fills since construction or last reset
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Values dropped for falling outside the axis
    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    /// Sum of all bin contents
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Sum of contents over the inclusive bin range
    pub fn integral_range(&self, first: usize, last: usize) -> f64 {
        let last = last.min(self.counts.len().saturating_sub(1));
        if first > last {
            return 0.0;
        }
        self.counts[first..=last].iter().sum()
    }

    /// First bin holding the maximum content in the inclusive range
    pub fn maximum_bin(&self, first: usize, last: usize) -> Option<usize> {
        let last = last.min(self.counts.len().checked_sub(1)?);
        if first > last {
            return None;
        }
        let mut best = first;
        for bin in first..=last {
            if self.counts[bin] > self.counts[best] {
                best = bin;
            }
        }
        Some(best)
    }

    /// Content-weighted mean of bin centers over the inclusive range
    ///
    /// `None` when the range holds no mass.
    pub fn mean_in(&self, first: usize, last: usize) -> Option<f64> {
        let last = last.min(self.counts.len().checked_sub(1)?);
        if first > last {
            return None;
        }
        let mut weight = 0.0;
        let mut moment = 0.0;
        for bin in first..=last {
            weight += self.counts[bin];
            moment += self.counts[bin] * self.axis.bin_center(bin);
        }
        if weight > 0.0 {
            Some(moment / weight)
        } else {
            None
        }
    }

    /// Start tracking squared weights separately from contents
    pub fn enable_variance(&mut self) {
        if self.sum_w2.is_none() {
            self.sum_w2 = Some(self.counts.clone());
        }
    }

    /// Check if squared weights are tracked
    pub fn tracks_variance(&self) -> bool {
        self.sum_w2.is_some()
    }

    /// Multiply contents by `factor`, variances by `factor²`
    pub fn scale(&mut self, factor: f64) {
        self.enable_variance();
        for count in &mut self.counts {
            *count *= factor;
        }
        if let Some(sum_w2) = self.sum_w2.as_mut() {
            for w2 in sum_w2.iter_mut() {
                *w2 *= factor * factor;
            }
        }
    }

    /// Zero every bin and counter; the axis is unchanged
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0.0);
        self.sum_w2 = None;
        self.entries = 0;
        self.out_of_range = 0;
    }
}

/// Two-dimensional counting grid over (energy, ratio)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DensityGrid {
    x_axis: Axis,
    y_axis: Axis,
    counts: Vec<f64>,
    sum_w2: Option<Vec<f64>>,
    entries: u64,
    out_of_range: u64,
}

impl DensityGrid {
    /// Empty grid over `x_axis` × `y_axis`
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            counts: vec![0.0; x_axis.bins() * y_axis.bins()],
            sum_w2: None,
            entries: 0,
            out_of_range: 0,
        }
    }

    /// Energy binning
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Ratio binning
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    fn index(&self, x_bin: usize, y_bin: usize) -> usize {
        x_bin * self.y_axis.bins() + y_bin
    }

    /// Add one count at `(x, y)`; `false` if either coordinate is out of range
    pub fn fill(&mut self, x: f64, y: f64) -> bool {
        self.fill_weighted(x, y, 1.0)
    }

    /// Add `weight` at `(x, y)`; `false` if either coordinate is out of range
    pub fn fill_weighted(&mut self, x: f64, y: f64, weight: f64) -> bool {
        match (self.x_axis.find_bin(x), self.y_axis.find_bin(y)) {
            (Some(x_bin), Some(y_bin)) => {
                let index = self.index(x_bin, y_bin);
                self.counts[index] += weight;
                if let Some(sum_w2) = self.sum_w2.as_mut() {
                    sum_w2[index] += weight * weight;
                }
                self.entries += 1;
                true
            }
            _ => {
                self.out_of_range += 1;
                false
            }
        }
    }

    /// Content of cell `(x_bin, y_bin)`
    pub fn content(&self, x_bin: usize, y_bin: usize) -> f64 {
        if x_bin >= self.x_axis.bins() || y_bin >= self.y_axis.bins() {
            return 0.0;
        }
        self.counts[self.index(x_bin, y_bin)]
    }

    /// Variance of cell `(x_bin, y_bin)`
    pub fn variance(&self, x_bin: usize, y_bin: usize) -> f64 {
        if x_bin >= self.x_axis.bins() || y_bin >= self.y_axis.bins() {
            return 0.0;
        }
        let index = self.index(x_bin, y_bin);
        match &self.sum_w2 {
            Some(sum_w2) => sum_w2[index],
            None => self.counts[index],
        }
    }

    /// Ratio distribution of energy column `x_bin`
    pub fn column(&self, x_bin: usize) -> &[f64] {
        if x_bin >= self.x_axis.bins() {
            return &[];
        }
        let start = self.index(x_bin, 0);
        &self.counts[start..start + self.y_axis.bins()]
    }

    /// Mass of energy column `x_bin`
    pub fn column_total(&self, x_bin: usize) -> f64 {
        self.column(x_bin).iter().sum()
    }

    /// Total mass of the grid
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Mass of cells whose center satisfies `predicate(x, y)`
    pub fn integral_where<P>(&self, mut predicate: P) -> f64
    where
        P: FnMut(f64, f64) -> bool,
    {
        let mut sum = 0.0;
        for x_bin in 0..self.x_axis.bins() {
            let x = self.x_axis.bin_center(x_bin);
            for (y_bin, &count) in self.column(x_bin).iter().enumerate() {
                if count != 0.0 && predicate(x, self.y_axis.bin_center(y_bin)) {
                    sum += count;
                }
            }
        }
        sum
    }

    /// Successful fills since construction or last reset
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Points dropped for falling outside the grid
    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    /// Start tracking squared weights separately from contents
    pub fn enable_variance(&mut self) {
        if self.sum_w2.is_none() {
            self.sum_w2 = Some(self.counts.clone());
        }
    }

    /// Check if squared weights are tracked
    pub fn tracks_variance(&self) -> bool {
        self.sum_w2.is_some()
    }

    /// Multiply contents by `factor`, variances by `factor²`
    pub fn scale(&mut self, factor: f64) {
        self.enable_variance();
        for count in &mut self.counts {
            *count *= factor;
        }
        if let Some(sum_w2) = self.sum_w2.as_mut() {
            for w2 in sum_w2.iter_mut() {
                *w2 *= factor * factor;
            }
        }
    }

    /// Zero every cell and counter; the axes are unchanged
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0.0);
        self.sum_w2 = None;
        self.entries = 0;
        self.out_of_range = 0;
    }
}
