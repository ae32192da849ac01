/*
    rawtrack
    https://github.com/dbalsom/rawtrack

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/buffers.rs

    Host-owned streaming buffers. The engine never allocates these; the host
    creates them once, sized for its DMA or timer machinery, and passes them
    into every streaming call. Producer/consumer indices are free-running
    counters, masked into the ring on access.
*/

use crate::DATA_CHUNK_SIZE;

/// A ring of raw 16-bit words, indexed in bitcells.
///
/// One word is 16 bitcells; one decoded data byte. Words are stored
/// MSB-first: the first bitcell on disk is bit 15. `prod` and `cons` count
/// bitcells, not words, and run freely - they are reduced modulo the ring
/// size on access.
pub struct BitcellRing {
    words: Vec<u16>,
    /// Producer index, in bitcells.
    pub prod: u32,
    /// Consumer index, in bitcells.
    pub cons: u32,
}

impl BitcellRing {
    /// Create a ring holding `words` raw words. The length must be a power
    /// of two so that free-running indices can be masked.
    pub fn new(words: usize) -> Self {
        assert!(words.is_power_of_two(), "ring length must be a power of two");
        BitcellRing {
            words: vec![0; words],
            prod: 0,
            cons: 0,
        }
    }

    /// Ring capacity in raw words.
    #[inline]
    pub fn word_len(&self) -> u32 {
        self.words.len() as u32
    }

    #[inline]
    pub(crate) fn word_mask(&self) -> u32 {
        self.word_len() - 1
    }

    /// Fetch the raw word at free-running word index `widx`.
    #[inline]
    pub fn get(&self, widx: u32) -> u16 {
        self.words[(widx & self.word_mask()) as usize]
    }

    /// Store a raw word at free-running word index `widx`.
    #[inline]
    pub fn set(&mut self, widx: u32, word: u16) {
        let mask = self.word_mask();
        self.words[(widx & mask) as usize] = word;
    }

    /// Reset both indices. Ring contents are left alone.
    pub fn reset(&mut self) {
        self.prod = 0;
        self.cons = 0;
    }
}

/// The staging buffer for sector data read from the image file.
///
/// Holds at most one chunk ([`DATA_CHUNK_SIZE`] bytes). `prod` and `cons`
/// count chunks: the fetcher refills the buffer only when they are equal,
/// and the encoder bumps `cons` when it has emitted the chunk.
pub struct ReadBuffer {
    pub data: Vec<u8>,
    pub prod: u32,
    pub cons: u32,
}

impl ReadBuffer {
    pub fn new() -> Self {
        ReadBuffer {
            data: vec![0; DATA_CHUNK_SIZE],
            prod: 0,
            cons: 0,
        }
    }

    pub fn reset(&mut self) {
        self.prod = 0;
        self.cons = 0;
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        ReadBuffer::new()
    }
}

/// The full set of buffers a host lends to the engine.
pub struct TrackBuffers {
    /// Sector-data staging buffer for the read path.
    pub read_data: ReadBuffer,
    /// Outgoing raw bitcells (engine produces, host consumes).
    pub read_bc: BitcellRing,
    /// Incoming raw bitcells captured from the host's write machinery
    /// (host produces, engine consumes).
    pub write_bc: BitcellRing,
}

impl TrackBuffers {
    /// Create buffers with the given ring capacities, in raw words.
    pub fn new(read_bc_words: usize, write_bc_words: usize) -> Self {
        TrackBuffers {
            read_data: ReadBuffer::new(),
            read_bc: BitcellRing::new(read_bc_words),
            write_bc: BitcellRing::new(write_bc_words),
        }
    }
}

/// A host-captured write operation.
///
/// The host records when the write gate opened relative to the index pulse
/// and how many bitcells it captured; the engine uses the timestamp to
/// resolve writes that carry no ID Address Mark.
#[derive(Copy, Clone, Debug)]
pub struct WriteCapture {
    /// Timestamp of the start of the write, in system-clock ticks within
    /// the revolution, on the same scale as the start position passed to
    /// track setup.
    pub start: u32,
    /// Bitcell index one past the last captured bitcell.
    pub bc_end: u32,
    /// True once the host has closed the write gate and this capture holds
    /// the final data.
    pub flush: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps() {
        let mut ring = BitcellRing::new(8);
        for i in 0..10u32 {
            ring.set(i, i as u16);
        }
        // Indices 8 and 9 overwrote 0 and 1.
        assert_eq!(ring.get(8), 8);
        assert_eq!(ring.get(0), 8);
        assert_eq!(ring.get(1), 9);
        assert_eq!(ring.get(2), 2);
    }

    #[test]
    #[should_panic]
    fn test_ring_rejects_non_power_of_two() {
        let _ = BitcellRing::new(1000);
    }
}
