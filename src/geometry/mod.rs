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

//! The `geometry` module defines the layout tables an opener builds: one
//! [`TrackLayout`] per distinct track format in the image, a pool of
//! [`SectorId`]s the layouts own disjoint slices of, and a track map taking
//! every (cylinder, side) to a layout.
//!
//! The whole structure is immutable once the opener finishes; per-track
//! cursor state lives on the engine, not here.

pub mod tables;

use crate::{
    types::{sector_size, LayoutFlags},
    ImageError,
    MAX_SIZE_CODE,
};

/// Track layout index used for the trailing empty track installed by
/// [`SimpleLayout`]s with `has_empty` set.
pub const SIMPLE_EMPTY_TRACK: u8 = 2;

/// The ID fields emitted for one sector of a track layout.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SectorId {
    /// Sector ID byte (the R field of the IDAM).
    pub r: u8,
    /// Size code; the payload is `128 << n` bytes.
    pub n: u8,
}

impl SectorId {
    /// Payload length in bytes.
    #[inline]
    pub fn data_size(&self) -> usize {
        sector_size(self.n)
    }
}

/// One distinct track format within an image.
///
/// `None` in the gap and rate fields means "determine automatically" during
/// track preparation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackLayout {
    pub nr_sectors: u16,
    /// Index of this layout's first sector in [`Geometry::sectors`].
    pub sec_off: usize,
    pub is_fm: bool,
    pub has_iam: bool,
    /// Complement all data bytes between the file and the bitstream.
    pub invert_data: bool,
    /// Nominal spindle speed; 0 is treated as 300 RPM at seek time.
    pub rpm: u16,
    /// Data rate in kbps, or `None` to infer from the track contents.
    pub data_rate: Option<u32>,
    pub gap_2: Option<u8>,
    pub gap_3: Option<u8>,
    pub gap_4a: Option<u8>,
    pub interleave: u8,
    pub cskew: u8,
    pub hskew: u8,
    /// Head ID override for the IDAM H field; `None` emits the physical
    /// head number.
    pub head: Option<u8>,
}

impl Default for TrackLayout {
    fn default() -> Self {
        TrackLayout {
            nr_sectors: 0,
            sec_off: 0,
            is_fm: false,
            has_iam: false,
            invert_data: false,
            rpm: 0,
            data_rate: None,
            gap_2: None,
            gap_3: None,
            gap_4a: None,
            interleave: 1,
            cskew: 0,
            hskew: 0,
            head: None,
        }
    }
}

/// The complete, immutable geometry of an open image.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub nr_cyls: u16,
    pub nr_sides: u8,
    /// Byte offset within the file where sector data begins.
    pub base_off: u32,
    pub layout: LayoutFlags,
    /// Cylinders emulated per physical head step.
    pub step: u8,
    /// Extra sync words appended after each CRC.
    pub post_crc_syncs: u8,
    pub tracks: Vec<TrackLayout>,
    pub sectors: Vec<SectorId>,
    /// `track_map[cyl * nr_sides + side]` indexes [`Geometry::tracks`].
    pub track_map: Vec<u8>,
}

impl Geometry {
    /// Validate the cylinder/side bounds and allocate the track map, zeroed.
    ///
    /// Any previously built layout tables are discarded, so an opener that
    /// fails partway can be retried on the same geometry.
    pub fn init_track_map(&mut self) -> Result<(), ImageError> {
        if !(1..=2).contains(&self.nr_sides) || !(1..=255).contains(&self.nr_cyls) {
            return Err(ImageError::BadImage);
        }
        self.tracks.clear();
        self.sectors.clear();
        self.track_map = vec![0; self.nr_cyls as usize * self.nr_sides as usize];
        Ok(())
    }

    /// Append a new track layout owning `nr_sectors` fresh sector slots, and
    /// return its index. Sector IDs default to zero and must be filled in
    /// through [`Geometry::track_sectors_mut`].
    pub fn add_track_layout(&mut self, nr_sectors: usize) -> Result<usize, ImageError> {
        if nr_sectors > 256 || self.tracks.len() >= 255 {
            return Err(ImageError::BadImage);
        }
        let sec_off = self.sectors.len();
        self.sectors.extend(std::iter::repeat(SectorId::default()).take(nr_sectors));
        self.tracks.push(TrackLayout {
            nr_sectors: nr_sectors as u16,
            sec_off,
            ..TrackLayout::default()
        });
        Ok(self.tracks.len() - 1)
    }

    /// Check the final track map and layout tables for validity.
    pub fn finalise_track_map(&self) -> Result<(), ImageError> {
        for &trk_idx in &self.track_map {
            let trk = self.tracks.get(trk_idx as usize).ok_or(ImageError::BadImage)?;
            for sec in self.track_sectors(trk) {
                if sec.n > MAX_SIZE_CODE {
                    return Err(ImageError::BadImage);
                }
            }
        }
        Ok(())
    }

    /// The sector IDs owned by `trk`.
    #[inline]
    pub fn track_sectors<'a>(&'a self, trk: &TrackLayout) -> &'a [SectorId] {
        &self.sectors[trk.sec_off..trk.sec_off + trk.nr_sectors as usize]
    }

    /// Mutable access to the sector IDs of the layout at `trk_idx`.
    pub fn track_sectors_mut(&mut self, trk_idx: usize) -> &mut [SectorId] {
        let trk = &self.tracks[trk_idx];
        let (off, nr) = (trk.sec_off, trk.nr_sectors as usize);
        &mut self.sectors[off..off + nr]
    }

    /// Number of image cylinders the track map covers. This differs from
    /// `nr_cyls` once the step factor has been applied at open.
    #[inline]
    pub fn map_cyls(&self) -> usize {
        if self.nr_sides == 0 {
            0
        }
        else {
            self.track_map.len() / self.nr_sides as usize
        }
    }

    /// Layout index mapped for (cyl, side), if within the map.
    pub fn map_entry(&self, cyl: usize, side: usize) -> Option<usize> {
        self.track_map
            .get(cyl * self.nr_sides as usize + side)
            .map(|&i| i as usize)
    }

    /// Materialize a uniform per-side geometry into the layout tables and
    /// track map.
    pub fn apply_simple_layout(&mut self, layout: &SimpleLayout) -> Result<(), ImageError> {
        self.init_track_map()?;

        // Create a track layout per side.
        for side in 0..self.nr_sides as usize {
            let idx = self.add_track_layout(layout.nr_sectors as usize)?;
            let trk = &mut self.tracks[idx];
            trk.is_fm = layout.is_fm;
            trk.rpm = layout.rpm;
            trk.has_iam = layout.has_iam;
            trk.gap_2 = layout.gap_2;
            trk.gap_3 = layout.gap_3;
            trk.gap_4a = layout.gap_4a;
            trk.data_rate = layout.data_rate;
            trk.interleave = layout.interleave;
            trk.cskew = layout.cskew;
            trk.hskew = layout.hskew;
            trk.head = layout.head;
            for (j, sec) in self.track_sectors_mut(idx).iter_mut().enumerate() {
                sec.r = (j as u8).wrapping_add(layout.base[side]);
                sec.n = layout.no;
            }
        }

        if layout.has_empty {
            // Trailing partial cylinders reuse this empty layout.
            let idx = self.add_track_layout(0)?;
            let trk = &mut self.tracks[idx];
            trk.is_fm = layout.is_fm;
            trk.rpm = layout.rpm;
            trk.data_rate = layout.data_rate;
        }

        // Map each side to its respective layout.
        for cyl in 0..self.nr_cyls as usize {
            for side in 0..self.nr_sides as usize {
                self.track_map[cyl * self.nr_sides as usize + side] = side as u8;
            }
        }

        self.finalise_track_map()
    }
}

/// A uniform geometry description: one track layout per side.
#[derive(Clone, Debug)]
pub struct SimpleLayout {
    pub nr_sectors: u16,
    pub rpm: u16,
    pub data_rate: Option<u32>,
    pub gap_2: Option<u8>,
    pub gap_3: Option<u8>,
    pub gap_4a: Option<u8>,
    pub is_fm: bool,
    pub has_iam: bool,
    /// Append an empty track layout for trailing partial cylinders.
    pub has_empty: bool,
    /// Sector size code. Deliberately out of range until a caller picks one.
    pub no: u8,
    /// First sector ID, per side.
    pub base: [u8; 2],
    pub interleave: u8,
    pub cskew: u8,
    pub hskew: u8,
    pub head: Option<u8>,
}

impl Default for SimpleLayout {
    fn default() -> Self {
        SimpleLayout {
            nr_sectors: 0,
            rpm: 300,
            data_rate: None,
            gap_2: None,
            gap_3: None,
            gap_4a: None,
            is_fm: false,
            has_iam: true,
            has_empty: false,
            no: 0xFF,
            base: [1, 1],
            interleave: 1,
            cskew: 0,
            hskew: 0,
            head: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(nr_sectors: u16, no: u8) -> SimpleLayout {
        SimpleLayout {
            nr_sectors,
            no,
            ..SimpleLayout::default()
        }
    }

    #[test]
    fn test_bounds_checks() {
        let mut geom = Geometry {
            nr_cyls: 0,
            nr_sides: 1,
            ..Geometry::default()
        };
        assert!(matches!(geom.init_track_map(), Err(ImageError::BadImage)));

        geom.nr_cyls = 40;
        geom.nr_sides = 3;
        assert!(matches!(geom.init_track_map(), Err(ImageError::BadImage)));

        geom.nr_sides = 2;
        assert!(geom.init_track_map().is_ok());
        assert_eq!(geom.track_map.len(), 80);
        assert!(matches!(geom.add_track_layout(257), Err(ImageError::BadImage)));
    }

    #[test]
    fn test_simple_layout_per_side() {
        let mut geom = Geometry {
            nr_cyls: 40,
            nr_sides: 2,
            ..Geometry::default()
        };
        let mut layout = simple(9, 2);
        layout.base = [1, 1];
        geom.apply_simple_layout(&layout).unwrap();

        assert_eq!(geom.tracks.len(), 2);
        for side in 0..2 {
            let trk = &geom.tracks[side];
            assert_eq!(trk.nr_sectors, 9);
            let secs = geom.track_sectors(trk);
            for (j, sec) in secs.iter().enumerate() {
                assert_eq!(sec.r, j as u8 + 1);
                assert_eq!(sec.n, 2);
            }
        }
        for cyl in 0..40 {
            for side in 0..2 {
                assert_eq!(geom.map_entry(cyl, side), Some(side));
            }
        }
        // Each layout owns a disjoint slice of the sector pool.
        assert_eq!(geom.tracks[0].sec_off, 0);
        assert_eq!(geom.tracks[1].sec_off, 9);
        assert_eq!(geom.sectors.len(), 18);
    }

    #[test]
    fn test_empty_track_layout() {
        let mut geom = Geometry {
            nr_cyls: 10,
            nr_sides: 2,
            ..Geometry::default()
        };
        let mut layout = simple(16, 1);
        layout.has_empty = true;
        geom.apply_simple_layout(&layout).unwrap();
        assert_eq!(geom.tracks.len(), 3);
        assert_eq!(geom.tracks[SIMPLE_EMPTY_TRACK as usize].nr_sectors, 0);
    }

    #[test]
    fn test_finalise_rejects_large_size_code() {
        let mut geom = Geometry {
            nr_cyls: 1,
            nr_sides: 1,
            ..Geometry::default()
        };
        let layout = simple(4, 7);
        assert!(matches!(geom.apply_simple_layout(&layout), Err(ImageError::BadImage)));
    }
}
