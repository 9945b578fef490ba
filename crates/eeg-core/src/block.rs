//! Samples, blocks and the block accumulator
//!
//! The accumulator is the only stateful piece of the pipeline front: it is
//! owned by a single caller and turns a stream of samples into contiguous,
//! non-overlapping blocks of a fixed length.

use crate::error::{EegError, EegResult};
use serde::{Deserialize, Serialize};

/// A single amplitude reading as delivered by the device
pub type Sample = i32;

/// Default block length, a power of two for the FFT
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Smallest block that still has a non-DC spectral bin
pub const MIN_BLOCK_SIZE: usize = 2;

/// Fixed-length run of consecutive samples, immutable once formed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block {
    samples: Vec<Sample>,
}

impl Block {
    /// Wrap already-framed samples, checking the expected length
    pub fn new(samples: Vec<Sample>, expected_len: usize) -> EegResult<Self> {
        if samples.len() != expected_len {
            return Err(EegError::BlockLengthMismatch {
                expected: expected_len,
                actual: samples.len(),
            });
        }
        Ok(Block { samples })
    }

    /// Samples in arrival order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples in the block
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if block is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Buffers samples and yields a [`Block`] every `block_size` samples
#[derive(Debug, Clone)]
pub struct BlockAccumulator {
    block_size: usize,
    buffer: Vec<Sample>,
}

impl BlockAccumulator {
    /// Create an accumulator for blocks of `block_size` samples
    pub fn new(block_size: usize) -> EegResult<Self> {
        if block_size < MIN_BLOCK_SIZE {
            return Err(EegError::InvalidBlockSize {
                size: block_size,
                min: MIN_BLOCK_SIZE,
            });
        }

        Ok(BlockAccumulator {
            block_size,
            buffer: Vec::with_capacity(block_size),
        })
    }

    /// Append one sample; returns the oldest full block once one is available.
    ///
    /// Surplus samples beyond the first `block_size` stay buffered for the
    /// next block.
    pub fn accept(&mut self, sample: Sample) -> Option<Block> {
        self.buffer.push(sample);
        self.take_block()
    }

    fn take_block(&mut self) -> Option<Block> {
        if self.buffer.len() < self.block_size {
            return None;
        }

        let samples: Vec<Sample> = self.buffer.drain(..self.block_size).collect();
        Some(Block { samples })
    }

    /// Configured block length
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of samples waiting for the next block
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Samples waiting for the next block, oldest first
    pub fn pending_samples(&self) -> &[Sample] {
        &self.buffer
    }
}
