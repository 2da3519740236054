//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! `cpal` captures at the device's native rate (commonly 48 kHz). The
//! analyzer works on clips at a fixed analysis rate (44.1 kHz by default).
//! `RateConverter` bridges that gap on the collector thread, where
//! allocation is allowed. When the two rates match it is a passthrough and
//! no rubato session is created.
//!
//! Recording can stop in the middle of an accumulation block, so
//! [`RateConverter::flush`] drains the remainder by zero-padding the final
//! block; without it the tail of every clip would be dropped.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{BrainwaveError, Result};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when capture rate == analysis rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer — holds partial input blocks between calls.
    input_buf: Vec<f32>,
    /// How many input samples rubato expects per process call.
    block_size: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a converter from `capture_rate` to `analysis_rate`, processing
    /// `block_size` input frames per rubato call.
    ///
    /// # Errors
    /// Returns `BrainwaveError::AudioDevice` if rubato fails to initialise.
    pub fn new(capture_rate: u32, analysis_rate: u32, block_size: usize) -> Result<Self> {
        if capture_rate == analysis_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                block_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = analysis_rate as f64 / capture_rate as f64;
        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            block_size,
            1, // mono
        )
        .map_err(|e| BrainwaveError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        tracing::info!(capture_rate, analysis_rate, block_size, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            block_size,
            output_buf,
        })
    }

    /// Process incoming samples, returning converted output (may be empty
    /// while a partial block accumulates). Passthrough mode copies input.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.resampler.is_none() {
            return samples.to_vec();
        }
        self.input_buf.extend_from_slice(samples);
        self.drain_full_blocks()
    }

    /// Convert whatever remains in the accumulation buffer by zero-padding
    /// the last block. Call once when recording stops.
    pub fn flush(&mut self) -> Vec<f32> {
        if self.resampler.is_none() || self.input_buf.is_empty() {
            return Vec::new();
        }
        let remainder = self.input_buf.len() % self.block_size;
        if remainder != 0 {
            self.input_buf
                .extend(std::iter::repeat(0.0).take(self.block_size - remainder));
        }
        self.drain_full_blocks()
    }

    fn drain_full_blocks(&mut self) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return Vec::new();
        };

        let mut result = Vec::new();
        while self.input_buf.len() >= self.block_size {
            let block = &self.input_buf[..self.block_size];
            match resampler.process_into_buffer(&[block], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.output_buf[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }
            self.input_buf.drain(..self.block_size);
        }
        result
    }

    /// Returns `true` when no rate conversion occurs.
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
