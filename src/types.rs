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
*/

//! The `types` module defines the small enums and flag sets shared across
//! the crate.

use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;

/// The bitcell encoding of a track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TrackEncoding {
    #[doc = "Frequency Modulation encoding. Used by 8&quot; diskettes and early micro-diskette systems."]
    Fm,
    #[default]
    #[doc = "Modified Frequency Modulation encoding. Used by almost all 5.25&quot; and 3.5&quot; diskettes."]
    Mfm,
}

impl Display for TrackEncoding {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TrackEncoding::Fm => write!(f, "FM"),
            TrackEncoding::Mfm => write!(f, "MFM"),
        }
    }
}

/// The host system a sector image was written for.
///
/// Raw sector images carry no metadata, so when the file size alone is
/// ambiguous the host hint selects which geometry table is consulted first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumIter, strum::IntoStaticStr)]
pub enum HostSystem {
    #[default]
    Generic,
    Akai,
    Casio,
    Dec,
    Ensoniq,
    Fluke,
    Gem,
    Ibm3174,
    Memotech,
    Msx,
    Nascom,
    Pc98,
    PcDos,
    Ti99,
    Uknc,
}

bitflags! {
    /// Flags describing how (cylinder, side) pairs map to track order in the
    /// image file.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct LayoutFlags: u8 {
        /// All tracks of side 0 precede all tracks of side 1.
        const SEQUENTIAL     = 0b0000_0001;
        /// Side numbering in the file is the inverse of the physical side.
        const SIDES_SWAPPED  = 0b0000_0010;
        /// Side 0 tracks are stored in descending cylinder order.
        const REVERSE_SIDE_0 = 0b0000_0100;
        /// Side 1 tracks are stored in descending cylinder order.
        const REVERSE_SIDE_1 = 0b0000_1000;
    }
}

impl LayoutFlags {
    /// The reverse-order flag for the given physical side.
    pub fn reverse_side(side: u8) -> LayoutFlags {
        match side {
            0 => LayoutFlags::REVERSE_SIDE_0,
            _ => LayoutFlags::REVERSE_SIDE_1,
        }
    }
}

/// The write decoder's notion of which sector an incoming Data Address Mark
/// belongs to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WriteSector {
    /// No ID Address Mark has been seen since the track was set up.
    #[default]
    Idle,
    /// An IDAM was seen but did not resolve to a sector of this track, or a
    /// DAM has already been consumed. Data arriving now is dropped.
    Unresolved,
    /// The logical index of the sector the next DAM will be written to.
    Logical(usize),
}

/// Byte length of a sector with size code `n`.
pub const fn sector_size(n: u8) -> usize {
    128usize << n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_sizes() {
        assert_eq!(sector_size(0), 128);
        assert_eq!(sector_size(2), 512);
        assert_eq!(sector_size(6), 8192);
    }

    #[test]
    fn test_reverse_side_flags() {
        assert_eq!(LayoutFlags::reverse_side(0), LayoutFlags::REVERSE_SIDE_0);
        assert_eq!(LayoutFlags::reverse_side(1), LayoutFlags::REVERSE_SIDE_1);
    }
}
