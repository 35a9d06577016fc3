//! Byte-scaled frequency-domain analysis over a live sample stream.
//!
//! A Hann-windowed FFT whose bin magnitudes are exponentially smoothed
//! and mapped to a 0–255 byte scale between a minimum and maximum
//! decibel level. The detection thresholds elsewhere in the crate are
//! calibrated to this byte scale. Consumers read derived bin values
//! only, never raw samples.

use crate::defaults;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Decibel level mapped to byte value 0.
const MIN_DECIBELS: f32 = -100.0;
/// Decibel level mapped to byte value 255.
const MAX_DECIBELS: f32 = -30.0;

/// Spectral analyser producing smoothed, byte-scaled frequency bins.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    sample_rate: u32,
    smoothing: f32,
    /// Ring of the most recent `fft_size` samples, oldest first.
    window: Vec<f32>,
    /// Smoothed linear magnitudes per bin.
    smoothed: Vec<f32>,
    /// Hann window coefficients, precomputed.
    hann: Vec<f32>,
    /// Byte-scaled bin values from the last analysis pass.
    bins: Vec<u8>,
}

impl SpectrumAnalyzer {
    /// Creates an analyser with `fft_size / 2` frequency bins.
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let hann = (0..fft_size)
            .map(|i| {
                let phase = (i as f32) / (fft_size as f32) * std::f32::consts::TAU;
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        Self {
            fft,
            fft_size,
            sample_rate,
            smoothing: defaults::SMOOTHING_CONSTANT,
            window: vec![0.0; fft_size],
            smoothed: vec![0.0; fft_size / 2],
            hann,
            bins: vec![0; fft_size / 2],
        }
    }

    /// Overrides the smoothing constant (0.0 disables smoothing).
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    /// Number of frequency bins.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Center frequency of bin `i` in Hz.
    pub fn bin_frequency(&self, i: usize) -> f32 {
        (i as u32 * self.sample_rate) as f32 / self.fft_size as f32
    }

    /// Feeds new samples and recomputes the frequency bins.
    ///
    /// Keeps the most recent `fft_size` samples; shorter slices slide the
    /// window forward, longer slices replace it entirely.
    pub fn feed(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        if samples.len() >= self.fft_size {
            let tail = &samples[samples.len() - self.fft_size..];
            for (dst, &s) in self.window.iter_mut().zip(tail) {
                *dst = s as f32 / i16::MAX as f32;
            }
        } else {
            self.window.drain(..samples.len());
            self.window
                .extend(samples.iter().map(|&s| s as f32 / i16::MAX as f32));
        }

        self.analyze();
    }

    /// Windowed FFT over the current sample window, then smoothing and
    /// byte scaling.
    fn analyze(&mut self) {
        let mut buffer: Vec<Complex<f32>> = self
            .window
            .iter()
            .zip(&self.hann)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        let norm = 1.0 / self.fft_size as f32;
        for (i, bin) in buffer.iter().take(self.bin_count()).enumerate() {
            let magnitude = bin.norm() * norm;
            self.smoothed[i] =
                self.smoothing * self.smoothed[i] + (1.0 - self.smoothing) * magnitude;
            self.bins[i] = byte_scale(self.smoothed[i]);
        }
    }

    /// Byte-scaled (0–255) magnitudes for all bins.
    pub fn frequency_bins(&self) -> &[u8] {
        &self.bins
    }

    /// Average byte magnitude across all bins: the amplitude sample the
    /// capture state machine polls.
    pub fn average_level(&self) -> f32 {
        if self.bins.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.bins.iter().map(|&b| b as u32).sum();
        sum as f32 / self.bins.len() as f32
    }

    /// Resets all state to silence.
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.smoothed.fill(0.0);
        self.bins.fill(0);
    }
}

/// Maps a linear magnitude onto the 0–255 byte scale between
/// MIN_DECIBELS and MAX_DECIBELS.
fn byte_scale(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
