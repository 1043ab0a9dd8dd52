//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

use arrayvec::ArrayVec;

/// Maximum number of audio channels a DSP unit may expose on either side.
pub const MAX_CHANNELS: usize = 8;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
/// The buffer is sized once and never grows; callers work on a prefix of
/// each plane when a block is shorter than the buffer.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            channels,
            frames,
        }
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Borrow the first `frames` samples of every channel at once.
    pub fn planes(&self, frames: usize) -> ArrayVec<&[f32], MAX_CHANNELS> {
        let frames = frames.min(self.frames);
        if self.frames == 0 {
            return (0..self.channels.min(MAX_CHANNELS))
                .map(|_| Default::default())
                .collect();
        }
        self.data
            .chunks_exact(self.frames)
            .take(MAX_CHANNELS)
            .map(|plane| &plane[..frames])
            .collect()
    }

    /// Mutably borrow the first `frames` samples of every channel at once.
    ///
    /// This is the shape `DspUnit::compute` expects for its outputs, built on
    /// the stack so the render path stays allocation-free.
    pub fn planes_mut(&mut self, frames: usize) -> ArrayVec<&mut [f32], MAX_CHANNELS> {
        let frames = frames.min(self.frames);
        if self.frames == 0 {
            return (0..self.channels.min(MAX_CHANNELS))
                .map(|_| Default::default())
                .collect();
        }
        self.data
            .chunks_exact_mut(self.frames)
            .take(MAX_CHANNELS)
            .map(|plane| &mut plane[..frames])
            .collect()
    }
}
