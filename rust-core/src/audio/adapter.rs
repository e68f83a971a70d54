//! Platform buffer adapters
//!
//! Each capture backend hands over audio in its own layout. These types expose
//! that data as mono `f32` channels so the estimator has one input contract.

use std::borrow::Cow;

/// Scale factor for signed 16-bit PCM
const I16_SCALE: f32 = 1.0 / 32768.0;

/// A captured block of PCM audio
pub trait PcmSource {
    /// Sample rate in Hz
    fn sample_rate(&self) -> f32;

    /// Frames per channel
    fn frame_length(&self) -> usize;

    fn channel_count(&self) -> usize;

    /// Samples of one channel as `f32`, `None` if the channel is missing
    fn channel(&self, index: usize) -> Option<Cow<'_, [f32]>>;
}

/// Interleaved float frames, as delivered by cpal input callbacks
#[derive(Debug, Clone, Copy)]
pub struct InterleavedF32<'a> {
    data: &'a [f32],
    channels: usize,
    sample_rate: f32,
}

impl<'a> InterleavedF32<'a> {
    pub fn new(data: &'a [f32], channels: usize, sample_rate: f32) -> Self {
        Self {
            data,
            channels,
            sample_rate,
        }
    }
}

impl PcmSource for InterleavedF32<'_> {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn channel(&self, index: usize) -> Option<Cow<'_, [f32]>> {
        if index >= self.channels {
            return None;
        }

        // Mono data can be lent out directly
        if self.channels == 1 {
            return Some(Cow::Borrowed(self.data));
        }

        let samples = self
            .data
            .chunks_exact(self.channels)
            .map(|frame| frame[index])
            .collect();

        Some(Cow::Owned(samples))
    }
}

/// One slice per channel, as in a deinterleaved float PCM buffer
#[derive(Debug, Clone, Copy)]
pub struct PlanarF32<'a> {
    channels: &'a [&'a [f32]],
    sample_rate: f32,
}

impl<'a> PlanarF32<'a> {
    pub fn new(channels: &'a [&'a [f32]], sample_rate: f32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }
}

impl PcmSource for PlanarF32<'_> {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channel(&self, index: usize) -> Option<Cow<'_, [f32]>> {
        self.channels.get(index).map(|&c| Cow::Borrowed(c))
    }
}

/// Mono signed 16-bit PCM
#[derive(Debug, Clone, Copy)]
pub struct PcmI16<'a> {
    data: &'a [i16],
    sample_rate: f32,
}

impl<'a> PcmI16<'a> {
    pub fn new(data: &'a [i16], sample_rate: f32) -> Self {
        Self { data, sample_rate }
    }
}

impl PcmSource for PcmI16<'_> {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.data.len()
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn channel(&self, index: usize) -> Option<Cow<'_, [f32]>> {
        if index != 0 {
            return None;
        }
        Some(Cow::Owned(i16_to_f32(self.data)))
    }
}

/// Convert signed 16-bit PCM to floats in [-1, 1)
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| i16_sample_to_f32(s)).collect()
}

#[inline]
pub fn i16_sample_to_f32(sample: i16) -> f32 {
    sample as f32 * I16_SCALE
}
