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

//! The `tables` module holds the candidate geometries tried against a raw
//! image's file size, per host system. Entries are ordered; the first whose
//! size works wins.

use std::ops::RangeInclusive;

use crate::{geometry::SimpleLayout, types::sector_size};

/// Cylinder count class of a candidate geometry. Real drives format a few
/// cylinders more or less than nominal, so each class matches a small range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CylClass {
    Cyl40,
    Cyl80,
}

impl CylClass {
    pub fn candidates(&self) -> RangeInclusive<u16> {
        match self {
            CylClass::Cyl40 => 38..=42,
            CylClass::Cyl80 => 77..=85,
        }
    }
}

/// One candidate raw-image geometry.
#[derive(Copy, Clone, Debug)]
pub struct RawGeometry {
    pub nr_secs: u8,
    pub nr_sides: u8,
    pub has_iam: bool,
    pub gap_3: u8,
    pub interleave: u8,
    pub no: u8,
    pub base: u8,
    pub cskew: u8,
    pub hskew: u8,
    pub cyls: CylClass,
    pub rpm: u16,
}

impl RawGeometry {
    /// The uniform layout this candidate describes.
    pub fn layout(&self) -> SimpleLayout {
        SimpleLayout {
            nr_sectors: self.nr_secs as u16,
            rpm: self.rpm,
            has_iam: self.has_iam,
            no: self.no,
            gap_3: Some(self.gap_3),
            base: [self.base, self.base],
            interleave: self.interleave,
            cskew: self.cskew,
            hskew: self.hskew,
            ..SimpleLayout::default()
        }
    }
}

/// Walk `table` and return the first candidate, together with a concrete
/// cylinder count, whose total size equals `size`.
pub fn match_size(table: &[RawGeometry], size: u64) -> Option<(u16, u8, &RawGeometry)> {
    for entry in table {
        let cyl_sz = entry.nr_secs as u64 * sector_size(entry.no) as u64 * entry.nr_sides as u64;
        for nr_cyls in entry.cyls.candidates() {
            if nr_cyls as u64 * cyl_sz == size {
                return Some((nr_cyls, entry.nr_sides, entry));
            }
        }
    }
    None
}

const fn raw(
    nr_secs: u8,
    nr_sides: u8,
    has_iam: bool,
    gap_3: u8,
    interleave: u8,
    no: u8,
    base: u8,
    cskew: u8,
    hskew: u8,
    cyls: CylClass,
    rpm: u16,
) -> RawGeometry {
    RawGeometry {
        nr_secs,
        nr_sides,
        has_iam,
        gap_3,
        interleave,
        no,
        base,
        cskew,
        hskew,
        cyls,
        rpm,
    }
}

use CylClass::{Cyl40, Cyl80};

#[rustfmt::skip]
pub const IMG_TYPES: &[RawGeometry] = &[
    raw(  8, 1, true, 84, 1, 2, 1, 0, 0, Cyl40, 300 ), // 160k
    raw(  9, 1, true, 84, 1, 2, 1, 0, 0, Cyl40, 300 ), // 180k
    raw( 10, 1, true, 30, 1, 2, 1, 0, 0, Cyl40, 300 ), // 200k
    raw(  8, 2, true, 84, 1, 2, 1, 0, 0, Cyl40, 300 ), // 320k
    raw(  9, 2, true, 84, 1, 2, 1, 0, 0, Cyl40, 300 ), // 360k (#1)
    raw( 10, 2, true, 30, 1, 2, 1, 0, 0, Cyl40, 300 ), // 400k (#1)
    raw( 15, 2, true, 84, 1, 2, 1, 0, 0, Cyl80, 360 ), // 1.2MB
    raw(  9, 1, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 360k (#2)
    raw( 10, 1, true, 30, 1, 2, 1, 0, 0, Cyl80, 300 ), // 400k (#2)
    raw( 11, 1, true,  3, 2, 2, 1, 0, 0, Cyl80, 300 ), // 440k
    raw(  8, 2, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 640k
    raw(  9, 2, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 720k
    raw( 10, 2, true, 30, 1, 2, 1, 0, 0, Cyl80, 300 ), // 800k
    raw( 11, 2, true,  3, 2, 2, 1, 0, 0, Cyl80, 300 ), // 880k
    raw( 18, 2, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 1.44M
    raw( 19, 2, true, 70, 1, 2, 1, 0, 0, Cyl80, 300 ), // 1.52M
    raw( 21, 2, true, 12, 2, 2, 1, 3, 0, Cyl80, 300 ), // 1.68M
    raw( 20, 2, true, 40, 1, 2, 1, 0, 0, Cyl80, 300 ), // 1.6M
    raw( 36, 2, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 2.88M
];

#[rustfmt::skip]
pub const ADFS_TYPES: &[RawGeometry] = &[
    // ADFS D/E: 5 * 1kB, 800k
    raw(  5, 2, true, 116, 1, 3, 0, 1, 0, Cyl80, 300 ),
    // ADFS F: 10 * 1kB, 1600k
    raw( 10, 2, true, 116, 1, 3, 0, 2, 0, Cyl80, 300 ),
    // ADFS L 640k
    raw( 16, 2, true,  57, 1, 1, 0, 0, 0, Cyl80, 300 ),
    // ADFS M 320k
    raw( 16, 1, true,  57, 1, 1, 0, 0, 0, Cyl80, 300 ),
    // ADFS S 160k
    raw( 16, 1, true,  57, 1, 1, 0, 0, 0, Cyl40, 300 ),
];

#[rustfmt::skip]
pub const AKAI_TYPES: &[RawGeometry] = &[
    // Akai DD:  5*1kB sectors
    raw(  5, 2, true, 116, 1, 3, 1, 2, 0, Cyl80, 300 ),
    // Akai HD: 10*1kB sectors
    raw( 10, 2, true, 116, 1, 3, 1, 5, 0, Cyl80, 300 ),
];

#[rustfmt::skip]
pub const CASIO_TYPES: &[RawGeometry] = &[
    raw( 8, 2, true, 116, 3, 3, 1, 0, 0, Cyl80, 360 ), // 1280k
];

#[rustfmt::skip]
pub const D81_TYPES: &[RawGeometry] = &[
    raw( 10, 2, true, 30, 1, 2, 1, 0, 0, Cyl80, 300 ),
];

#[rustfmt::skip]
pub const DEC_TYPES: &[RawGeometry] = &[
    // RX50 (400k); RX33 (1.2MB) comes from the default list
    raw( 10, 1, true, 30, 1, 2, 1, 0, 0, Cyl80, 300 ),
];

#[rustfmt::skip]
pub const ENSONIQ_TYPES: &[RawGeometry] = &[
    raw( 10, 2, true, 30, 1, 2, 0, 0, 0, Cyl80, 300 ), // 800kB
    raw( 20, 2, true, 40, 1, 2, 0, 0, 0, Cyl80, 300 ), // 1.6MB
];

#[rustfmt::skip]
pub const FLUKE_TYPES: &[RawGeometry] = &[
    raw( 16, 2, true, 57, 2, 1, 0, 0, 0, Cyl80, 300 ),
];

#[rustfmt::skip]
pub const MBD_TYPES: &[RawGeometry] = &[
    raw( 11, 2, true,  30, 1, 3, 1, 0, 0, Cyl80, 300 ),
    raw(  5, 2, true, 116, 1, 3, 1, 0, 0, Cyl80, 300 ),
    raw( 11, 2, true,  30, 1, 3, 1, 0, 0, Cyl40, 300 ),
    raw(  5, 2, true, 116, 1, 3, 1, 0, 0, Cyl40, 300 ),
];

#[rustfmt::skip]
pub const MEMOTECH_TYPES: &[RawGeometry] = &[
    raw( 16, 2, true, 57, 3, 1, 1, 0, 0, Cyl40, 300 ), // Type 03
    raw( 16, 2, true, 57, 3, 1, 1, 0, 0, Cyl80, 300 ), // Type 07
];

#[rustfmt::skip]
pub const MSX_TYPES: &[RawGeometry] = &[
    raw( 8, 1, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 320k
    raw( 9, 1, true, 84, 1, 2, 1, 0, 0, Cyl80, 300 ), // 360k
    // all other formats from the default list
];

#[rustfmt::skip]
pub const NASCOM_TYPES: &[RawGeometry] = &[
    raw( 16, 1, true, 57, 3, 1, 1, 8, 0, Cyl80, 300 ), // 320k
    raw( 16, 2, true, 57, 3, 1, 1, 8, 0, Cyl80, 300 ), // 360k
];

#[rustfmt::skip]
pub const PC98_TYPES: &[RawGeometry] = &[
    raw( 8, 2, true, 116, 1, 3, 1, 0, 0, Cyl80, 360 ), // HD 360RPM
    raw( 8, 2, true,  57, 1, 2, 1, 0, 0, Cyl80, 360 ), // DD 360RPM
];

#[rustfmt::skip]
pub const UKNC_TYPES: &[RawGeometry] = &[
    raw( 10, 2, false, 38, 1, 2, 1, 0, 0, Cyl80, 300 ),
];

/// The ST table is the generic 80-cylinder table with the IAM stripped;
/// TOS formats 720kB disks with skew.
pub fn st_types() -> Vec<RawGeometry> {
    IMG_TYPES
        .iter()
        .filter(|t| t.cyls == CylClass::Cyl80)
        .map(|t| {
            let mut out = *t;
            out.has_iam = false;
            if out.nr_secs == 9 {
                if out.nr_sides == 1 {
                    out.cskew = 2;
                }
                else {
                    out.cskew = 4;
                    out.hskew = 2;
                }
            }
            out
        })
        .collect()
}
